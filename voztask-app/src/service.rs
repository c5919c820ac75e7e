use std::sync::{Arc, Mutex};

use tokio::sync::watch;

use voztask_audio::resample::{UPLOAD_SAMPLE_RATE_HZ, resample_to_upload_rate};
use voztask_audio::wav::{WAV_MEDIA_TYPE, encode_wav_mono};
use voztask_audio::{AudioCaptureError, AudioRecorder};
use voztask_core::config::AppConfig;
use voztask_core::intent::Intent;
use voztask_core::task::{TaskId, TaskStatus};
use voztask_engine::dispatcher::{DispatchOutcome, Dispatcher};
use voztask_engine::expand::{ExpansionFlow, ExpansionOutcome};
use voztask_engine::http::BackendClient;
use voztask_engine::session::{AudioArtifact, RecordedTake, RecordingSession, SessionError};
use voztask_engine::traits::{ConfirmationGate, IntentService, TaskService, TaskView};

pub fn user_facing_audio_error(e: &AudioCaptureError) -> String {
    // Keep messages actionable and short; details are in logs.
    match e {
        AudioCaptureError::NoInputDevice => {
            "No se detectó ningún micrófono. Conecta uno y elígelo en la configuración.".into()
        }
        _ => {
            let raw = e.to_string().to_lowercase();
            if raw.contains("permission") || raw.contains("access") || raw.contains("denied") {
                "No se pudo acceder al micrófono. Verifica los permisos.".into()
            } else {
                "Error de grabación de audio. Revisa los registros para más detalle.".into()
            }
        }
    }
}

/// Application surface the UI talks to.
///
/// Owns the one live recording session and the microphone. Each finalized
/// take is published on a watch channel, which is the completion signal
/// the expansion flow (and anything else) subscribes to instead of polling
/// shared state.
#[derive(Clone)]
pub struct AppService {
    cfg: AppConfig,
    session: Arc<Mutex<RecordingSession>>,
    recorder: Arc<tokio::sync::Mutex<Option<AudioRecorder>>>,
    completed: Arc<watch::Sender<Option<AudioArtifact>>>,
    backend: Arc<BackendClient>,
    view: Arc<dyn TaskView>,
    gate: Arc<dyn ConfirmationGate>,
    dispatcher: Dispatcher,
}

impl AppService {
    pub fn new(cfg: AppConfig, view: Arc<dyn TaskView>, gate: Arc<dyn ConfirmationGate>) -> Self {
        let backend = Arc::new(BackendClient::new(cfg.backend_base_url.clone()));
        let dispatcher = Dispatcher::new(backend.clone(), view.clone(), gate.clone());
        let (completed, _) = watch::channel(None);

        Self {
            cfg,
            session: Arc::new(Mutex::new(RecordingSession::new())),
            recorder: Arc::new(tokio::sync::Mutex::new(None)),
            completed: Arc::new(completed),
            backend,
            view,
            gate,
            dispatcher,
        }
    }

    pub fn is_recording(&self) -> bool {
        self.session.lock().unwrap().is_recording()
    }

    /// Receiver that sees every finalized artifact (`Some`) and every new
    /// take invalidating the previous one (`None`).
    pub fn completion_signal(&self) -> watch::Receiver<Option<AudioArtifact>> {
        self.completed.subscribe()
    }

    /// Opens the microphone and begins a new take. Duplicate start
    /// gestures while recording are ignored.
    pub async fn start_recording(&self) -> anyhow::Result<()> {
        let mut recorder = self.recorder.lock().await;

        if self.session.lock().unwrap().is_recording() {
            return Ok(());
        }

        let opened = match AudioRecorder::open_named(
            self.cfg.microphone_device.as_deref(),
            self.cfg.capture,
        ) {
            Ok(r) => r,
            Err(e) => {
                log::error!("microphone open failed: {e}");
                self.view.notify_error(&user_facing_audio_error(&e)).await;
                return Err(e.into());
            }
        };

        let session = self.session.clone();
        opened.set_fragment_callback(move |chunk| {
            session.lock().unwrap().push_fragment(chunk);
        });

        // A new take invalidates any pending artifact.
        self.completed.send_replace(None);
        self.session.lock().unwrap().start(opened.sample_rate_hz());

        if let Err(e) = opened.start() {
            self.session.lock().unwrap().abort();
            let _ = opened.close();
            log::error!("recorder start failed: {e}");
            self.view.notify_error(&user_facing_audio_error(&e)).await;
            return Err(e.into());
        }

        *recorder = Some(opened);
        log::info!("recording started");
        Ok(())
    }

    /// Finalizes the current take, releases the microphone and publishes
    /// the encoded artifact. No-op (returns `None`) when not recording.
    pub async fn stop_recording(&self) -> anyhow::Result<Option<AudioArtifact>> {
        let mut slot = self.recorder.lock().await;
        let Some(recorder) = slot.take() else {
            return Ok(None);
        };

        // Disarm before finalizing so no fragment lands after the cut.
        if let Err(e) = recorder.stop() {
            log::warn!("recorder stop: {e}");
        }
        let take = self.session.lock().unwrap().stop().cloned();

        // The device is released on every path.
        let _ = recorder.close();

        let Some(take) = take else {
            return Ok(None);
        };
        log::info!(
            "recording stopped: {} samples at {} Hz",
            take.samples.len(),
            take.sample_rate_hz
        );

        let artifact = encode_artifact(&take)?;
        self.completed.send_replace(Some(artifact.clone()));
        Ok(Some(artifact))
    }

    /// Stops and discards the current take without publishing anything.
    pub async fn cancel_recording(&self) {
        let mut slot = self.recorder.lock().await;
        if let Some(recorder) = slot.take() {
            let _ = recorder.stop();
            let _ = recorder.close();
        }
        self.session.lock().unwrap().abort();
    }

    /// The one downstream processing call triggered by a stop gesture.
    pub async fn stop_and_process(&self) -> anyhow::Result<DispatchOutcome> {
        match self.stop_recording().await? {
            Some(artifact) => self.process_artifact(&artifact).await,
            None => {
                // Local precondition failure; the backend is never contacted.
                let e = SessionError::NoArtifact;
                self.view.notify_error(&e.to_string()).await;
                Err(e.into())
            }
        }
    }

    /// Uploads one artifact, shows the transcription, and routes the
    /// parsed intent.
    pub async fn process_artifact(&self, artifact: &AudioArtifact) -> anyhow::Result<DispatchOutcome> {
        let reply = match self.backend.process_audio(artifact).await {
            Ok(r) => r,
            Err(e) => {
                log::error!("audio processing failed: {e:#}");
                self.view
                    .notify_error(&format!("Error procesando audio: {e}"))
                    .await;
                return Err(e);
            }
        };

        self.view.show_transcription(&reply).await;

        if reply.parsed.intent == Intent::Unknown {
            // Informational display only.
            return Ok(DispatchOutcome::Ignored);
        }

        match self.dispatcher.dispatch(&reply.parsed).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                log::error!("dispatch failed: {e:#}");
                self.view.notify_error(&e.to_string()).await;
                Err(e)
            }
        }
    }

    pub async fn show_tasks(&self, status: TaskStatus) -> anyhow::Result<()> {
        if let Err(e) = self.dispatcher.refresh(status).await {
            log::error!("task list fetch failed: {e:#}");
            self.view
                .notify_error(&format!("Error cargando tareas: {e}"))
                .await;
            return Err(e);
        }
        Ok(())
    }

    /// Completion is destructive enough to warrant the yes/no gate.
    pub async fn complete_task(&self, id: TaskId) -> anyhow::Result<()> {
        if !self
            .gate
            .confirm("Confirmar", "¿Marcar esta tarea como completada?")
            .await
        {
            return Ok(());
        }

        match self.backend.complete_task(id).await {
            Ok(_) => {
                self.view.notify_success("Tarea completada").await;
                self.show_tasks(TaskStatus::Pending).await
            }
            Err(e) => {
                log::error!("task completion failed: {e:#}");
                self.view
                    .notify_error(&format!("Error completando tarea: {e}"))
                    .await;
                Err(e)
            }
        }
    }

    /// Opens the expansion flow for one task: instructs the user, waits
    /// for the next finished recording and saves its transcript.
    pub async fn expand_task(&self, id: TaskId) -> anyhow::Result<ExpansionOutcome> {
        let flow = ExpansionFlow::new(self.backend.clone(), self.backend.clone(), self.view.clone());
        match flow.run(id, self.completion_signal()).await {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                log::error!("expansion failed: {e:#}");
                self.view
                    .notify_error(&format!("Error procesando ampliación: {e}"))
                    .await;
                Err(e)
            }
        }
    }
}

fn encode_artifact(take: &RecordedTake) -> anyhow::Result<AudioArtifact> {
    let samples = resample_to_upload_rate(&take.samples, take.sample_rate_hz)?;
    let bytes = encode_wav_mono(&samples, UPLOAD_SAMPLE_RATE_HZ)?;
    Ok(AudioArtifact {
        filename: "recording.wav".into(),
        media_type: WAV_MEDIA_TYPE.into(),
        bytes,
    })
}
