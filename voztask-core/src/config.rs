use serde::{Deserialize, Serialize};

/// Input-processing toggles requested when opening the microphone.
///
/// Hosts that expose no such control simply ignore the toggle; the request
/// itself is part of the capture contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureToggles {
    pub echo_cancellation: bool,
    pub noise_suppression: bool,
    pub auto_gain_control: bool,
}

impl Default for CaptureToggles {
    fn default() -> Self {
        Self {
            echo_cancellation: true,
            noise_suppression: true,
            auto_gain_control: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppConfig {
    pub backend_base_url: String,

    #[serde(default)]
    pub microphone_device: Option<String>,

    #[serde(default)]
    pub capture: CaptureToggles,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            backend_base_url: "http://localhost:5000".into(),
            microphone_device: None,
            capture: CaptureToggles::default(),
        }
    }
}
