//
// CPAL-based microphone capture.
//
// The recorder owns a worker thread holding the input stream; captured
// chunks flow through a consumer that forwards them, while armed, to a
// fragment callback supplied by the session owner. Arming and disarming
// happen over a command channel so the callback never fires after `stop()`
// has acknowledged.

use std::sync::{Arc, Mutex, mpsc};
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Sample, SampleFormat, SizedSample, Stream, SupportedStreamConfig};

use crate::format::negotiate_sample_format;
use voztask_core::config::CaptureToggles;

#[derive(Debug, thiserror::Error)]
pub enum AudioCaptureError {
    #[error("no input device found")]
    NoInputDevice,

    #[error("failed to query supported configs: {0}")]
    SupportedConfigs(#[from] cpal::SupportedStreamConfigsError),

    #[error("failed to get default config: {0}")]
    DefaultConfig(#[from] cpal::DefaultStreamConfigError),

    #[error("failed to build input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),

    #[error("failed to play stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),

    #[error("audio worker failed: {0}")]
    Worker(String),

    #[error("audio worker startup timeout")]
    WorkerTimeout,

    #[error("recording stop timed out")]
    StopTimeout,

    #[error("internal channel error")]
    Channel,
}

type FragmentCallback = Arc<dyn Fn(&[f32]) + Send + Sync + 'static>;

pub struct AudioRecorder {
    cmd_tx: mpsc::Sender<Cmd>,
    worker_handle: Option<std::thread::JoinHandle<()>>,
    sample_rate_hz: u32,
    fragment_cb: Arc<Mutex<Option<FragmentCallback>>>,
}

enum Cmd {
    Start,
    Stop(mpsc::Sender<()>),
    Shutdown,
}

enum WorkerMsg {
    Ready,
    Error(String),
}

impl AudioRecorder {
    /// Opens the named device, or the default input device when the name
    /// is absent or not found.
    pub fn open_named(
        device_name: Option<&str>,
        toggles: CaptureToggles,
    ) -> Result<Self, AudioCaptureError> {
        let host = cpal::default_host();

        if let Some(needle) = device_name {
            let needle = needle.trim();
            if !needle.is_empty() {
                if let Ok(devices) = host.input_devices() {
                    for dev in devices {
                        if let Ok(name) = dev.name() {
                            if name == needle {
                                log::info!("Using input device: {name}");
                                return Self::open(dev, toggles);
                            }
                        }
                    }
                }

                log::warn!("Preferred input device not found, falling back to default: {needle}");
            }
        }

        let device = host
            .default_input_device()
            .ok_or(AudioCaptureError::NoInputDevice)?;
        Self::open(device, toggles)
    }

    pub fn open(device: Device, toggles: CaptureToggles) -> Result<Self, AudioCaptureError> {
        // DSP toggles (echo cancellation etc.) have no per-stream control
        // in cpal; they ride on whatever the OS device profile applies.
        log::debug!("capture toggles requested: {toggles:?}");

        let config = pick_input_config(&device)?;
        let sample_rate_hz = config.sample_rate().0;
        log::info!(
            "capture config: {} Hz, {} ch, {:?}",
            sample_rate_hz,
            config.channels(),
            config.sample_format()
        );

        let (sample_tx, sample_rx) = mpsc::channel::<Vec<f32>>();
        let (cmd_tx, cmd_rx) = mpsc::channel::<Cmd>();
        let (worker_tx, worker_rx) = mpsc::channel::<WorkerMsg>();

        let fragment_cb: Arc<Mutex<Option<FragmentCallback>>> = Arc::new(Mutex::new(None));
        let fragment_cb_worker = fragment_cb.clone();

        let worker_handle = std::thread::spawn(move || {
            let sample_format = config.sample_format();
            let channels = config.channels() as usize;

            let stream = match sample_format {
                SampleFormat::F32 => {
                    build_input_stream::<f32>(&device, &config.clone().into(), channels, sample_tx)
                }
                SampleFormat::I16 => {
                    build_input_stream::<i16>(&device, &config.clone().into(), channels, sample_tx)
                }
                SampleFormat::U16 => {
                    build_input_stream::<u16>(&device, &config.clone().into(), channels, sample_tx)
                }
                _ => build_input_stream::<f32>(&device, &config.clone().into(), channels, sample_tx),
            };

            let stream = match stream {
                Ok(s) => s,
                Err(e) => {
                    let _ = worker_tx.send(WorkerMsg::Error(format!("build stream: {e}")));
                    log::error!("Audio stream build failed: {e}");
                    return;
                }
            };

            if let Err(e) = stream.play() {
                let _ = worker_tx.send(WorkerMsg::Error(format!("play stream: {e}")));
                log::error!("Audio stream play failed: {e}");
                return;
            }

            let _ = worker_tx.send(WorkerMsg::Ready);

            run_consumer(sample_rx, cmd_rx, fragment_cb_worker);
            drop(stream);
        });

        // Block briefly until the worker has either started the stream or failed.
        match worker_rx.recv_timeout(Duration::from_secs(2)) {
            Ok(WorkerMsg::Ready) => {}
            Ok(WorkerMsg::Error(e)) => return Err(AudioCaptureError::Worker(e)),
            Err(mpsc::RecvTimeoutError::Timeout) => return Err(AudioCaptureError::WorkerTimeout),
            Err(_) => return Err(AudioCaptureError::Channel),
        }

        Ok(Self {
            cmd_tx,
            worker_handle: Some(worker_handle),
            sample_rate_hz,
            fragment_cb,
        })
    }

    pub fn sample_rate_hz(&self) -> u32 {
        self.sample_rate_hz
    }

    /// Sets the sink that receives each captured fragment while armed.
    /// Set this before `start()`.
    pub fn set_fragment_callback<F>(&self, cb: F)
    where
        F: Fn(&[f32]) + Send + Sync + 'static,
    {
        let mut guard = self.fragment_cb.lock().unwrap();
        *guard = Some(Arc::new(cb));
    }

    /// Arms fragment delivery.
    pub fn start(&self) -> Result<(), AudioCaptureError> {
        self.cmd_tx
            .send(Cmd::Start)
            .map_err(|_| AudioCaptureError::Channel)
    }

    /// Disarms fragment delivery. Once this returns, the fragment callback
    /// will not fire again.
    pub fn stop(&self) -> Result<(), AudioCaptureError> {
        let (ack_tx, ack_rx) = mpsc::channel();
        self.cmd_tx
            .send(Cmd::Stop(ack_tx))
            .map_err(|_| AudioCaptureError::Channel)?;

        ack_rx
            .recv_timeout(Duration::from_secs(3))
            .map_err(|e| match e {
                mpsc::RecvTimeoutError::Timeout => AudioCaptureError::StopTimeout,
                mpsc::RecvTimeoutError::Disconnected => AudioCaptureError::Channel,
            })
    }

    /// Tears down the stream and releases the device.
    pub fn close(mut self) -> Result<(), AudioCaptureError> {
        let _ = self.cmd_tx.send(Cmd::Shutdown);
        if let Some(h) = self.worker_handle.take() {
            let _ = h.join();
        }
        Ok(())
    }
}

/// Prefers a config in our negotiated sample format; otherwise the
/// device default decides.
fn pick_input_config(device: &Device) -> Result<SupportedStreamConfig, AudioCaptureError> {
    let ranges: Vec<_> = device.supported_input_configs()?.collect();
    let formats: Vec<SampleFormat> = ranges.iter().map(|r| r.sample_format()).collect();

    if let Some(format) = negotiate_sample_format(&formats) {
        if let Some(range) = ranges.into_iter().find(|r| r.sample_format() == format) {
            return Ok(range.with_max_sample_rate());
        }
    }

    Ok(device.default_input_config()?)
}

fn build_input_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    channels: usize,
    sample_tx: mpsc::Sender<Vec<f32>>,
) -> Result<Stream, cpal::BuildStreamError>
where
    T: Sample + SizedSample + Send + 'static,
    f32: cpal::FromSample<T>,
{
    let cb = move |data: &[T], _: &cpal::InputCallbackInfo| {
        let mut buf = Vec::with_capacity(data.len() / channels.max(1));

        if channels == 1 {
            buf.extend(data.iter().map(|&s| s.to_sample::<f32>()));
        } else {
            for frame in data.chunks_exact(channels) {
                let mono =
                    frame.iter().map(|&s| s.to_sample::<f32>()).sum::<f32>() / channels as f32;
                buf.push(mono);
            }
        }

        let _ = sample_tx.send(buf);
    };

    device.build_input_stream(
        config,
        cb,
        |err| {
            // These errors are crucial to debug "recording started but silent".
            log::error!("Audio stream error: {err}");
        },
        None,
    )
}

fn run_consumer(
    sample_rx: mpsc::Receiver<Vec<f32>>,
    cmd_rx: mpsc::Receiver<Cmd>,
    fragment_cb: Arc<Mutex<Option<FragmentCallback>>>,
) {
    let mut armed = false;

    loop {
        // Always drain commands promptly, even if the stream is stalled.
        while let Ok(cmd) = cmd_rx.try_recv() {
            match cmd {
                Cmd::Start => armed = true,
                Cmd::Stop(ack) => {
                    armed = false;
                    let _ = ack.send(());
                }
                Cmd::Shutdown => return,
            }
        }

        match sample_rx.recv_timeout(Duration::from_millis(50)) {
            Ok(chunk) => {
                if armed && !chunk.is_empty() {
                    if let Some(cb) = fragment_cb.lock().unwrap().as_ref() {
                        cb(&chunk);
                    }
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {
                // No audio chunk yet; loop around to check commands again.
                continue;
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => return,
        }
    }
}
