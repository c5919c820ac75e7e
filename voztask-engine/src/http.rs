use crate::session::{AudioArtifact, SessionError};
use crate::traits::{IntentService, TaskService};
use async_trait::async_trait;
use voztask_api::audio_process::{AudioUpload, build_audio_process_request};
use voztask_api::parse::{check_status, parse_task, parse_task_list, parse_transcription};
use voztask_api::runtime;
use voztask_api::tasks::{
    build_complete_task_request, build_create_task_request, build_expand_task_request,
    build_list_tasks_request,
};
use voztask_core::intent::Transcription;
use voztask_core::task::{Task, TaskId, TaskStatus};
use voztask_core::TaskDraft;

/// HTTP-backed implementation of both service seams, talking to the task
/// manager backend at `base_url`.
#[derive(Debug, Clone)]
pub struct BackendClient {
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl IntentService for BackendClient {
    async fn process_audio(&self, audio: &AudioArtifact) -> anyhow::Result<Transcription> {
        // An empty artifact means the caller bypassed the session state
        // machine; fail locally instead of bothering the backend.
        if audio.bytes.is_empty() {
            return Err(SessionError::NoArtifact.into());
        }

        let upload = AudioUpload {
            filename: audio.filename.clone(),
            media_type: audio.media_type.clone(),
            bytes: audio.bytes.clone(),
        };
        let req = build_audio_process_request(&self.base_url, &upload);
        log::debug!("uploading recording: {req:?}");

        let resp = runtime::execute(&req).await?;
        check_status(resp.status, &resp.body, "error procesando audio")?;
        parse_transcription(&resp.body)
    }
}

#[async_trait]
impl TaskService for BackendClient {
    async fn list_tasks(&self, status: TaskStatus) -> anyhow::Result<Vec<Task>> {
        let req = build_list_tasks_request(&self.base_url, status)?;
        let resp = runtime::execute(&req).await?;
        check_status(resp.status, &resp.body, "error cargando tareas")?;
        parse_task_list(&resp.body)
    }

    async fn create_task(&self, draft: &TaskDraft) -> anyhow::Result<Task> {
        let req = build_create_task_request(&self.base_url, draft)?;
        let resp = runtime::execute(&req).await?;
        check_status(resp.status, &resp.body, "error creando tarea")?;
        parse_task(&resp.body)
    }

    async fn complete_task(&self, id: TaskId) -> anyhow::Result<Task> {
        let req = build_complete_task_request(&self.base_url, id);
        let resp = runtime::execute(&req).await?;
        check_status(resp.status, &resp.body, "error completando tarea")?;
        parse_task(&resp.body)
    }

    async fn expand_task(&self, id: TaskId, note: &str) -> anyhow::Result<Task> {
        let req = build_expand_task_request(&self.base_url, id, note);
        let resp = runtime::execute(&req).await?;
        check_status(resp.status, &resp.body, "error guardando ampliación")?;
        parse_task(&resp.body)
    }
}
