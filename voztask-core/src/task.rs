use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub i64);

impl TaskId {
    pub fn new(value: i64) -> Self {
        Self(value)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientId(pub i64);

impl ClientId {
    pub fn new(value: i64) -> Self {
        Self(value)
    }
}

#[derive(Debug, Error)]
#[error("estado de tarea desconocido: {0}")]
pub struct ParseStatusError(pub String);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Completed,
}

impl TaskStatus {
    // Query-string value for `GET /api/tasks?status=...`.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Completed => "completed",
        }
    }
}

impl FromStr for TaskStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "completed" => Ok(TaskStatus::Completed),
            other => Err(ParseStatusError(other.to_string())),
        }
    }
}

/// Task priority as stored by the backend.
///
/// `urgent` is not offered by the web form but the intent parser emits it
/// ("urgente", "inmediato", ...) and the store keeps it verbatim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Normal => "normal",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        }
    }
}

/// One task row as returned by the backend.
///
/// The client never caches these beyond "last fetched list matches last
/// requested status filter"; every mutation triggers a re-fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub priority: Priority,
    pub status: TaskStatus,

    // Free-text expansion note; Spanish field name on the wire.
    #[serde(default, rename = "ampliacion")]
    pub expansion: Option<String>,
}
