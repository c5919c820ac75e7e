use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use voztask_core::intent::{Intent, ParsedIntent, Transcription};
use voztask_core::task::{Task, TaskStatus};
use voztask_engine::dispatcher::{DispatchOutcome, Dispatcher};
use voztask_engine::http::BackendClient;
use voztask_engine::session::{AudioArtifact, RecordingSession};
use voztask_engine::traits::{ConfirmationGate, IntentService, TaskView};
use wiremock::matchers::{body_partial_json, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct HeadlessView {
    rendered: Mutex<Vec<(TaskStatus, usize)>>,
    errors: Mutex<Vec<String>>,
}

#[async_trait]
impl TaskView for HeadlessView {
    async fn show_transcription(&self, _reply: &Transcription) {}

    async fn render_tasks(&self, status: TaskStatus, tasks: &[Task]) {
        self.rendered.lock().unwrap().push((status, tasks.len()));
    }

    async fn notify_success(&self, _message: &str) {}

    async fn notify_error(&self, message: &str) {
        self.errors.lock().unwrap().push(message.to_string());
    }

    async fn manual_edit_requested(&self, _parsed: &ParsedIntent) {}
}

struct AlwaysYes;

#[async_trait]
impl ConfirmationGate for AlwaysYes {
    async fn confirm(&self, _title: &str, _message: &str) -> bool {
        true
    }
}

/// Stand-in for the audio layer: finalizes a session and tags the take.
fn record_artifact() -> AudioArtifact {
    let mut session = RecordingSession::new();
    assert!(session.start(16_000));
    session.push_fragment(&[0.0; 160]);
    session.push_fragment(&[0.1; 160]);
    let take = session.stop().expect("take");

    AudioArtifact {
        filename: "recording.wav".into(),
        media_type: "audio/wav".into(),
        bytes: take.samples.iter().flat_map(|s| s.to_le_bytes()).collect(),
    }
}

#[tokio::test]
async fn recorded_crear_utterance_creates_a_task_and_refreshes_the_list() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/audio/process"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{
                "success": true,
                "transcript": "crear tarea revisar contrato para mañana",
                "parsed": {
                    "intent": "CREAR",
                    "original_text": "crear tarea revisar contrato para mañana",
                    "entities": {"title": "revisar contrato", "due_date": "2024-01-02"}
                }
            }"#,
            "application/json",
        ))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/api/tasks"))
        .and(body_partial_json(serde_json::json!({
            "title": "revisar contrato",
            "due_date": "2024-01-02",
            "priority": "normal"
        })))
        .respond_with(ResponseTemplate::new(201).set_body_raw(
            r#"{"success": true, "task": {
                "id": 5,
                "title": "revisar contrato",
                "due_date": "2024-01-02",
                "priority": "normal",
                "status": "pending"
            }}"#,
            "application/json",
        ))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/api/tasks"))
        .and(query_param("status", "pending"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(
            r#"{"success": true, "tasks": [{
                "id": 5,
                "title": "revisar contrato",
                "due_date": "2024-01-02",
                "priority": "normal",
                "status": "pending"
            }]}"#,
            "application/json",
        ))
        .expect(1)
        .mount(&server)
        .await;

    let backend = Arc::new(BackendClient::new(server.uri()));
    let view = Arc::new(HeadlessView::default());
    let dispatcher = Dispatcher::new(backend.clone(), view.clone(), Arc::new(AlwaysYes));

    let artifact = record_artifact();
    let reply = backend.process_audio(&artifact).await.unwrap();
    assert_eq!(reply.transcript, "crear tarea revisar contrato para mañana");
    assert_eq!(reply.parsed.intent, Intent::Create);

    let outcome = dispatcher.dispatch(&reply.parsed).await.unwrap();
    match outcome {
        DispatchOutcome::Created(id) => assert_eq!(id.0, 5),
        other => panic!("unexpected outcome: {other:?}"),
    }

    assert_eq!(
        *view.rendered.lock().unwrap(),
        vec![(TaskStatus::Pending, 1)]
    );
    assert!(view.errors.lock().unwrap().is_empty());
}

#[tokio::test]
async fn backend_error_message_is_surfaced_verbatim() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/audio/process"))
        .respond_with(
            ResponseTemplate::new(500).set_body_raw(r#"{"error":"db down"}"#, "application/json"),
        )
        .expect(1)
        .mount(&server)
        .await;

    let backend = BackendClient::new(server.uri());
    let err = backend.process_audio(&record_artifact()).await.unwrap_err();
    assert_eq!(err.to_string(), "db down");
}

#[tokio::test]
async fn empty_artifact_fails_locally_without_a_request() {
    let server = MockServer::start().await;
    // No mocks mounted: any request would 404 and the mock server's
    // expectation of zero received requests is checked on drop.

    let backend = BackendClient::new(server.uri());
    let artifact = AudioArtifact {
        filename: "recording.wav".into(),
        media_type: "audio/wav".into(),
        bytes: vec![],
    };
    let err = backend.process_audio(&artifact).await.unwrap_err();
    assert_eq!(err.to_string(), "no hay audio para procesar");
    assert!(server.received_requests().await.unwrap().is_empty());
}
