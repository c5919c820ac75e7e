use crate::traits::{ConfirmationGate, TaskService, TaskView};
use std::sync::Arc;
use voztask_core::intent::{Intent, ParsedIntent};
use voztask_core::task::{TaskId, TaskStatus};
use voztask_core::TaskDraft;

/// What a dispatch ended up doing, for callers that care.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Created(TaskId),
    Listed(TaskStatus),
    ManualEdit,
    Ignored,
}

/// Routes one parsed intent to its handler.
///
/// CERRAR and AMPLIAR only fetch the pending list: the user picks the
/// concrete task afterwards, so both are precursors rather than mutations.
#[derive(Clone)]
pub struct Dispatcher {
    tasks: Arc<dyn TaskService>,
    view: Arc<dyn TaskView>,
    gate: Arc<dyn ConfirmationGate>,
}

impl Dispatcher {
    pub fn new(
        tasks: Arc<dyn TaskService>,
        view: Arc<dyn TaskView>,
        gate: Arc<dyn ConfirmationGate>,
    ) -> Self {
        Self { tasks, view, gate }
    }

    pub async fn dispatch(&self, parsed: &ParsedIntent) -> anyhow::Result<DispatchOutcome> {
        match parsed.intent {
            Intent::Create => self.handle_create(parsed).await,
            Intent::List | Intent::Close | Intent::Expand => {
                self.refresh(TaskStatus::Pending).await?;
                Ok(DispatchOutcome::Listed(TaskStatus::Pending))
            }
            Intent::Reschedule => {
                // The parser emits REPROGRAMAR but no handler exists yet.
                log::info!("intención sin manejador: {}", parsed.intent.as_str());
                Ok(DispatchOutcome::Ignored)
            }
            Intent::Unknown => Ok(DispatchOutcome::Ignored),
        }
    }

    /// Fetches and renders one status filter.
    pub async fn refresh(&self, status: TaskStatus) -> anyhow::Result<()> {
        let tasks = self.tasks.list_tasks(status).await?;
        self.view.render_tasks(status, &tasks).await;
        Ok(())
    }

    async fn handle_create(&self, parsed: &ParsedIntent) -> anyhow::Result<DispatchOutcome> {
        if let Some(client) = parsed.entities.client.as_ref() {
            // Ambiguous match takes precedence over creation when the
            // parser set both flags.
            let prompt = if client.needs_confirmation {
                Some((
                    "Confirmar cliente",
                    format!("¿Es correcto el cliente \"{}\"?", client.name),
                ))
            } else if client.needs_creation {
                Some(("Nuevo cliente", format!("¿Crear cliente \"{}\"?", client.name)))
            } else {
                None
            };

            if let Some((title, message)) = prompt {
                if !self.gate.confirm(title, &message).await {
                    self.view.manual_edit_requested(parsed).await;
                    return Ok(DispatchOutcome::ManualEdit);
                }
            }
        }

        self.create_task(parsed).await
    }

    async fn create_task(&self, parsed: &ParsedIntent) -> anyhow::Result<DispatchOutcome> {
        let draft = TaskDraft::from_parsed(parsed);
        let task = self.tasks.create_task(&draft).await?;
        self.view.notify_success("Tarea creada correctamente").await;
        self.refresh(TaskStatus::Pending).await?;
        Ok(DispatchOutcome::Created(task.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use voztask_core::intent::{ClientRef, EntityBag, Transcription};
    use voztask_core::task::{ClientId, Priority, Task};

    #[derive(Default)]
    struct RecordingTasks {
        created: Mutex<Vec<TaskDraft>>,
        listed: Mutex<Vec<TaskStatus>>,
    }

    #[async_trait]
    impl TaskService for RecordingTasks {
        async fn list_tasks(&self, status: TaskStatus) -> anyhow::Result<Vec<Task>> {
            self.listed.lock().unwrap().push(status);
            Ok(vec![])
        }

        async fn create_task(&self, draft: &TaskDraft) -> anyhow::Result<Task> {
            self.created.lock().unwrap().push(draft.clone());
            Ok(Task {
                id: TaskId(11),
                title: draft.title.clone(),
                client_name: draft.client_name.clone(),
                due_date: draft.due_date.clone(),
                priority: draft.priority,
                status: TaskStatus::Pending,
                expansion: None,
            })
        }

        async fn complete_task(&self, _id: TaskId) -> anyhow::Result<Task> {
            unreachable!("not exercised here")
        }

        async fn expand_task(&self, _id: TaskId, _note: &str) -> anyhow::Result<Task> {
            unreachable!("not exercised here")
        }
    }

    #[derive(Default)]
    struct RecordingView {
        rendered: Mutex<Vec<TaskStatus>>,
        manual_edits: Mutex<Vec<ParsedIntent>>,
    }

    #[async_trait]
    impl TaskView for RecordingView {
        async fn show_transcription(&self, _reply: &Transcription) {}

        async fn render_tasks(&self, status: TaskStatus, _tasks: &[Task]) {
            self.rendered.lock().unwrap().push(status);
        }

        async fn notify_success(&self, _message: &str) {}
        async fn notify_error(&self, _message: &str) {}

        async fn manual_edit_requested(&self, parsed: &ParsedIntent) {
            self.manual_edits.lock().unwrap().push(parsed.clone());
        }
    }

    struct ScriptedGate {
        answer: bool,
        prompts: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedGate {
        fn new(answer: bool) -> Self {
            Self {
                answer,
                prompts: Mutex::new(vec![]),
            }
        }
    }

    #[async_trait]
    impl ConfirmationGate for ScriptedGate {
        async fn confirm(&self, title: &str, message: &str) -> bool {
            self.prompts
                .lock()
                .unwrap()
                .push((title.to_string(), message.to_string()));
            self.answer
        }
    }

    fn create_intent(client: Option<ClientRef>) -> ParsedIntent {
        ParsedIntent {
            intent: Intent::Create,
            original_text: "crear tarea revisar contrato".into(),
            confidence: Some(0.8),
            entities: EntityBag {
                title: Some("revisar contrato".into()),
                client,
                due_date: None,
                priority: None,
            },
        }
    }

    fn dispatcher(
        tasks: &Arc<RecordingTasks>,
        view: &Arc<RecordingView>,
        gate: &Arc<ScriptedGate>,
    ) -> Dispatcher {
        Dispatcher::new(tasks.clone(), view.clone(), gate.clone())
    }

    #[tokio::test]
    async fn ambiguous_client_is_confirmed_before_any_creation() {
        let tasks = Arc::new(RecordingTasks::default());
        let view = Arc::new(RecordingView::default());
        let gate = Arc::new(ScriptedGate::new(true));
        let d = dispatcher(&tasks, &view, &gate);

        let client = ClientRef {
            id: Some(ClientId(3)),
            name: "Acme".into(),
            needs_confirmation: true,
            needs_creation: false,
        };
        let outcome = d.dispatch(&create_intent(Some(client))).await.unwrap();

        let prompts = gate.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert_eq!(prompts[0].0, "Confirmar cliente");
        assert_eq!(prompts[0].1, "¿Es correcto el cliente \"Acme\"?");

        let created = tasks.created.lock().unwrap();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].client_id, Some(ClientId(3)));
        assert_eq!(created[0].client_name.as_deref(), Some("Acme"));
        assert_eq!(outcome, DispatchOutcome::Created(TaskId(11)));
    }

    #[tokio::test]
    async fn declined_confirmation_falls_through_to_manual_edit() {
        let tasks = Arc::new(RecordingTasks::default());
        let view = Arc::new(RecordingView::default());
        let gate = Arc::new(ScriptedGate::new(false));
        let d = dispatcher(&tasks, &view, &gate);

        let client = ClientRef {
            id: None,
            name: "Acme".into(),
            needs_confirmation: false,
            needs_creation: true,
        };
        let outcome = d.dispatch(&create_intent(Some(client))).await.unwrap();

        assert_eq!(outcome, DispatchOutcome::ManualEdit);
        assert!(tasks.created.lock().unwrap().is_empty());
        assert_eq!(view.manual_edits.lock().unwrap().len(), 1);
        assert_eq!(gate.prompts.lock().unwrap()[0].0, "Nuevo cliente");
    }

    #[tokio::test]
    async fn create_without_client_skips_the_gate() {
        let tasks = Arc::new(RecordingTasks::default());
        let view = Arc::new(RecordingView::default());
        let gate = Arc::new(ScriptedGate::new(false));
        let d = dispatcher(&tasks, &view, &gate);

        let mut parsed = create_intent(None);
        parsed.entities.title = None;
        let outcome = d.dispatch(&parsed).await.unwrap();

        assert!(gate.prompts.lock().unwrap().is_empty());
        let created = tasks.created.lock().unwrap();
        assert_eq!(created[0].title, "crear tarea revisar contrato");
        assert_eq!(created[0].priority, Priority::Normal);
        assert_eq!(outcome, DispatchOutcome::Created(TaskId(11)));
    }

    #[tokio::test]
    async fn successful_creation_refreshes_the_pending_list() {
        let tasks = Arc::new(RecordingTasks::default());
        let view = Arc::new(RecordingView::default());
        let gate = Arc::new(ScriptedGate::new(true));
        let d = dispatcher(&tasks, &view, &gate);

        d.dispatch(&create_intent(None)).await.unwrap();

        assert_eq!(*tasks.listed.lock().unwrap(), vec![TaskStatus::Pending]);
        assert_eq!(*view.rendered.lock().unwrap(), vec![TaskStatus::Pending]);
    }

    #[tokio::test]
    async fn list_close_and_expand_fetch_pending_tasks() {
        for intent in [Intent::List, Intent::Close, Intent::Expand] {
            let tasks = Arc::new(RecordingTasks::default());
            let view = Arc::new(RecordingView::default());
            let gate = Arc::new(ScriptedGate::new(true));
            let d = dispatcher(&tasks, &view, &gate);

            let parsed = ParsedIntent {
                intent,
                original_text: "ver tareas pendientes".into(),
                confidence: None,
                entities: EntityBag::default(),
            };
            let outcome = d.dispatch(&parsed).await.unwrap();

            assert_eq!(outcome, DispatchOutcome::Listed(TaskStatus::Pending));
            assert_eq!(*tasks.listed.lock().unwrap(), vec![TaskStatus::Pending]);
            assert!(tasks.created.lock().unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn unknown_and_reschedule_dispatch_nothing() {
        for intent in [Intent::Unknown, Intent::Reschedule] {
            let tasks = Arc::new(RecordingTasks::default());
            let view = Arc::new(RecordingView::default());
            let gate = Arc::new(ScriptedGate::new(true));
            let d = dispatcher(&tasks, &view, &gate);

            let parsed = ParsedIntent {
                intent,
                original_text: "qué hora es".into(),
                confidence: None,
                entities: EntityBag::default(),
            };
            let outcome = d.dispatch(&parsed).await.unwrap();

            assert_eq!(outcome, DispatchOutcome::Ignored);
            assert!(tasks.listed.lock().unwrap().is_empty());
            assert!(tasks.created.lock().unwrap().is_empty());
        }
    }
}
