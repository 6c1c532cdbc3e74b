//! Conversation turn and session-state domain types.
//!
//! These are the core value objects that flow through the pipeline:
//! the user submits a turn (text + attached documents) → the
//! orchestrator produces an assistant turn (text + citations +
//! generated artifacts) → both are appended to the session, which is
//! replayed into every subsequent drafting call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The role of a turn's author.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// The end user
    User,
    /// The drafting assistant
    Assistant,
}

impl Role {
    /// Wire-level role string used by the drafting backend.
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// A binary file attached to a turn (an upload or a generated document).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl AttachedFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// One retrieved passage backing an assistant answer.
///
/// Produced only by the orchestrator's post-stream retrieval step,
/// in the order the backend ranked them. Purely informational; never
/// re-consumed by later turns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    /// Backend identifier of the source document.
    pub source_file_id: String,

    /// Human-readable source filename ("(unknown)" when absent).
    pub source_filename: String,

    /// The retrieved passage text.
    pub excerpt: String,

    /// Relevance score, when the backend reports one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,

    /// Backend rank, when reported.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,
}

/// Where a generated artifact came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactOrigin {
    /// Emitted by the backend's sandboxed code-execution tool.
    SandboxExecution,
    /// Produced by the local HTML→PDF conversion function.
    ConversionFunction,
}

/// A binary side-effect of a drafting turn, normalized to (name, bytes).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedArtifact {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub origin: ArtifactOrigin,
}

/// A single turn in the session conversation log.
///
/// Never mutated after creation; cleared wholesale on explicit reset.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Unique turn ID
    pub id: String,

    /// Who authored this turn
    pub role: Role,

    /// The text content (may be empty for a failed assistant turn)
    pub content: String,

    /// Files attached to this turn (uploads or generated documents)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<AttachedFile>,

    /// Retrieval citations backing an assistant answer
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub citations: Vec<Citation>,

    /// Timestamp
    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    /// Create a new user turn.
    pub fn user(content: impl Into<String>, files: Vec<AttachedFile>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::User,
            content: content.into(),
            files,
            citations: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    /// Create a new assistant turn.
    pub fn assistant(
        content: impl Into<String>,
        files: Vec<AttachedFile>,
        citations: Vec<Citation>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role: Role::Assistant,
            content: content.into(),
            files,
            citations,
            timestamp: Utc::now(),
        }
    }
}

/// The ordered conversation log for one user session.
///
/// Owned by the calling surface (CLI, web layer) and passed explicitly
/// into every orchestration call — there is no ambient global state.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionState {
    /// Ordered turns; insertion order defines replay order.
    pub turns: Vec<ConversationTurn>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a turn.
    pub fn push(&mut self, turn: ConversationTurn) {
        self.turns.push(turn);
    }

    /// Clear the whole log (explicit reset).
    pub fn clear(&mut self) {
        self.turns.clear();
    }

    /// The (role, content) transcript replayed into the drafting call.
    ///
    /// Attached bytes and citations stay local; only text crosses the
    /// wire.
    pub fn transcript(&self) -> Vec<(Role, String)> {
        self.turns
            .iter()
            .map(|t| (t.role, t.content.clone()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }
}
