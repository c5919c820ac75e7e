use crate::task::{ClientId, Priority};
use serde::{Deserialize, Serialize};

/// Closed set of intents the backend parser can emit.
///
/// Wire tags are the parser's Spanish labels. Anything unrecognized decodes
/// to `Unknown`, so routing over this enum stays exhaustive even when the
/// backend grows new intents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Intent {
    #[serde(rename = "CREAR")]
    Create,
    #[serde(rename = "LISTAR")]
    List,
    #[serde(rename = "CERRAR")]
    Close,
    #[serde(rename = "AMPLIAR")]
    Expand,
    #[serde(rename = "REPROGRAMAR")]
    Reschedule,
    #[serde(other, rename = "UNKNOWN")]
    Unknown,
}

impl Intent {
    /// The parser's wire tag, also what users see in the UI.
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Create => "CREAR",
            Intent::List => "LISTAR",
            Intent::Close => "CERRAR",
            Intent::Expand => "AMPLIAR",
            Intent::Reschedule => "REPROGRAMAR",
            Intent::Unknown => "UNKNOWN",
        }
    }
}

/// A client reference resolved by the parser.
///
/// The two flags are advisory gates consumed once by the dispatcher:
/// `needs_confirmation` when an existing client was matched ambiguously,
/// `needs_creation` when no match existed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientRef {
    #[serde(default)]
    pub id: Option<ClientId>,
    pub name: String,
    #[serde(default)]
    pub needs_confirmation: bool,
    #[serde(default)]
    pub needs_creation: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EntityBag {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub client: Option<ClientRef>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub priority: Option<Priority>,
}

/// Parser output for one utterance. Immutable once received.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedIntent {
    pub intent: Intent,
    pub original_text: String,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub entities: EntityBag,
}

/// What the backend returns for one processed recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcription {
    pub transcript: String,
    pub parsed: ParsedIntent,
}

/// JSON payload for `POST /api/tasks`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDraft {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_id: Option<ClientId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
    pub priority: Priority,
}

impl TaskDraft {
    /// Builds the creation payload from a parsed CREAR intent.
    ///
    /// The title falls back to the spoken text when the parser extracted
    /// none; priority falls back to normal. Client id/name pass through
    /// when a client entity is present.
    pub fn from_parsed(parsed: &ParsedIntent) -> Self {
        let entities = &parsed.entities;
        Self {
            title: entities
                .title
                .clone()
                .unwrap_or_else(|| parsed.original_text.clone()),
            client_id: entities.client.as_ref().and_then(|c| c.id),
            client_name: entities.client.as_ref().map(|c| c.name.clone()),
            due_date: entities.due_date.clone(),
            priority: entities.priority.unwrap_or_default(),
        }
    }
}
