use crate::session::AudioArtifact;
use async_trait::async_trait;
use voztask_core::intent::{ParsedIntent, Transcription};
use voztask_core::task::{Task, TaskId, TaskStatus};
use voztask_core::TaskDraft;

/// Uploads one finished recording and returns transcript + parsed intent.
///
/// Exactly one upload per artifact; the implementation never retries.
#[async_trait]
pub trait IntentService: Send + Sync {
    async fn process_audio(&self, audio: &AudioArtifact) -> anyhow::Result<Transcription>;
}

/// Backend task operations consumed by the dispatcher and the flows.
#[async_trait]
pub trait TaskService: Send + Sync {
    async fn list_tasks(&self, status: TaskStatus) -> anyhow::Result<Vec<Task>>;
    async fn create_task(&self, draft: &TaskDraft) -> anyhow::Result<Task>;
    async fn complete_task(&self, id: TaskId) -> anyhow::Result<Task>;
    async fn expand_task(&self, id: TaskId, note: &str) -> anyhow::Result<Task>;
}

/// Rendering boundary. The engine depends only on this interface, never on
/// concrete view elements, so the whole pipeline runs headless in tests.
#[async_trait]
pub trait TaskView: Send + Sync {
    async fn show_transcription(&self, reply: &Transcription);
    async fn render_tasks(&self, status: TaskStatus, tasks: &[Task]);
    async fn notify_success(&self, message: &str);
    async fn notify_error(&self, message: &str);

    /// Hook for the manual-edit path taken when a client confirmation is
    /// declined. The observed product never implemented a UI behind it.
    async fn manual_edit_requested(&self, parsed: &ParsedIntent);
}

/// Yes/no gate shared by the dispatcher (client confirmation/creation)
/// and task completion.
#[async_trait]
pub trait ConfirmationGate: Send + Sync {
    async fn confirm(&self, title: &str, message: &str) -> bool;
}
