use anyhow::{Context, anyhow};
use serde::Deserialize;
use voztask_core::intent::Transcription;
use voztask_core::task::Task;

#[derive(Debug, Deserialize)]
struct TaskListResponse {
    #[serde(default)]
    tasks: Vec<Task>,
}

#[derive(Debug, Deserialize)]
struct TaskResponse {
    task: Task,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: Option<String>,
}

/// Decodes the `/api/audio/process` success payload.
pub fn parse_transcription(body: &[u8]) -> anyhow::Result<Transcription> {
    serde_json::from_slice(body).context("decode audio-process JSON")
}

pub fn parse_task_list(body: &[u8]) -> anyhow::Result<Vec<Task>> {
    let resp: TaskListResponse = serde_json::from_slice(body).context("decode task list JSON")?;
    Ok(resp.tasks)
}

pub fn parse_task(body: &[u8]) -> anyhow::Result<Task> {
    let resp: TaskResponse = serde_json::from_slice(body).context("decode task JSON")?;
    Ok(resp.task)
}

/// Status-code policy shared by every endpoint: non-2xx is a failure no
/// matter what the body says, and the body's `error` field, when present,
/// is the user-facing message. `fallback` covers bodies with no usable
/// message.
pub fn check_status(status: u16, body: &[u8], fallback: &str) -> anyhow::Result<()> {
    if (200..=299).contains(&status) {
        return Ok(());
    }

    let message = serde_json::from_slice::<ErrorEnvelope>(body)
        .ok()
        .and_then(|e| e.error)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| fallback.to_string());
    Err(anyhow!("{message}"))
}
