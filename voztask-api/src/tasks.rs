use crate::request::{Body, HttpRequest, join_url};
use anyhow::Context;
use url::Url;
use voztask_core::task::{TaskId, TaskStatus};
use voztask_core::TaskDraft;

/// `GET /api/tasks?status={pending|completed}`.
pub fn build_list_tasks_request(base_url: &str, status: TaskStatus) -> anyhow::Result<HttpRequest> {
    let url = Url::parse_with_params(
        &join_url(base_url, "/api/tasks"),
        &[("status", status.as_str())],
    )
    .with_context(|| format!("invalid backend base url: {base_url}"))?;

    Ok(HttpRequest {
        method: "GET".into(),
        url: url.to_string(),
        headers: vec![("Accept".into(), "application/json".into())],
        body: Body::Empty,
    })
}

/// `POST /api/tasks` with the creation payload.
pub fn build_create_task_request(base_url: &str, draft: &TaskDraft) -> anyhow::Result<HttpRequest> {
    let payload = serde_json::to_string(draft).context("encode task draft")?;
    Ok(HttpRequest {
        method: "POST".into(),
        url: join_url(base_url, "/api/tasks"),
        headers: json_headers(),
        body: Body::Json(payload),
    })
}

/// `POST /api/tasks/{id}/complete`. No body.
pub fn build_complete_task_request(base_url: &str, id: TaskId) -> HttpRequest {
    HttpRequest {
        method: "POST".into(),
        url: join_url(base_url, &format!("/api/tasks/{}/complete", id)),
        headers: vec![("Accept".into(), "application/json".into())],
        body: Body::Empty,
    }
}

/// `POST /api/tasks/{id}/ampliar` with the expansion note.
pub fn build_expand_task_request(base_url: &str, id: TaskId, note: &str) -> HttpRequest {
    let payload = serde_json::json!({ "ampliacion": note }).to_string();
    HttpRequest {
        method: "POST".into(),
        url: join_url(base_url, &format!("/api/tasks/{}/ampliar", id)),
        headers: json_headers(),
        body: Body::Json(payload),
    }
}

fn json_headers() -> Vec<(String, String)> {
    vec![
        ("Content-Type".into(), "application/json".into()),
        ("Accept".into(), "application/json".into()),
    ]
}
