use crate::session::AudioArtifact;
use crate::traits::{IntentService, TaskService, TaskView};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, timeout};
use voztask_core::task::{TaskId, TaskStatus};

/// How long the flow waits for a recording before giving up.
pub const EXPANSION_WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpansionOutcome {
    Saved,
    TimedOut,
}

/// Attaches the transcript of the *next* finished recording to a task as
/// its expansion note.
///
/// The session manager publishes every finalized artifact on a watch
/// channel (and clears it on each new start). Waiting on that signal
/// replaces the old fixed-interval poll against a global flag, which could
/// fire on the artifact of the very utterance that opened this flow.
#[derive(Clone)]
pub struct ExpansionFlow {
    intent: Arc<dyn IntentService>,
    tasks: Arc<dyn TaskService>,
    view: Arc<dyn TaskView>,
}

impl ExpansionFlow {
    pub fn new(
        intent: Arc<dyn IntentService>,
        tasks: Arc<dyn TaskService>,
        view: Arc<dyn TaskView>,
    ) -> Self {
        Self {
            intent,
            tasks,
            view,
        }
    }

    pub async fn run(
        &self,
        task_id: TaskId,
        mut completed: watch::Receiver<Option<AudioArtifact>>,
    ) -> anyhow::Result<ExpansionOutcome> {
        self.view
            .notify_success("Mantén pulsado el botón de micrófono y graba la ampliación de la tarea")
            .await;

        // Anything already in the channel predates this flow.
        completed.borrow_and_update();

        let deadline = Instant::now() + EXPANSION_WINDOW;
        let artifact = loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return self.timed_out().await;
            }

            match timeout(remaining, completed.changed()).await {
                Err(_) => return self.timed_out().await,
                Ok(Err(_)) => anyhow::bail!("la sesión de grabación ya no existe"),
                Ok(Ok(())) => {
                    // A new start() publishes None; keep waiting for the stop.
                    if let Some(artifact) = completed.borrow_and_update().clone() {
                        break artifact;
                    }
                }
            }
        };

        let reply = self.intent.process_audio(&artifact).await?;
        self.tasks.expand_task(task_id, &reply.transcript).await?;
        self.view.notify_success("Ampliación guardada").await;

        let tasks = self.tasks.list_tasks(TaskStatus::Pending).await?;
        self.view.render_tasks(TaskStatus::Pending, &tasks).await;
        Ok(ExpansionOutcome::Saved)
    }

    async fn timed_out(&self) -> anyhow::Result<ExpansionOutcome> {
        // The original front end abandoned its poll silently here; surface
        // the abort instead.
        self.view
            .notify_error("No se recibió ninguna grabación para ampliar la tarea")
            .await;
        Ok(ExpansionOutcome::TimedOut)
    }
}
