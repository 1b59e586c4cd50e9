use serde::{Deserialize, Serialize};
use std::fmt;

/// Who authored a turn.
///
/// Older clients tagged model replies as `system`; that spelling is still
/// accepted on the wire and read back as [`Role::Assistant`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    #[serde(alias = "system")]
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One message in a conversation. Content is fixed once the turn exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    role: Role,
    content: String,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }
}

/// Position of a turn within its conversation.
///
/// Used to key per-turn UI state so two turns with the same text never
/// share it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct TurnId(usize);

impl TurnId {
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "turn-{}", self.0)
    }
}

/// Append-only list of turns in chronological order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Conversation {
    turns: Vec<Turn>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: Turn) -> TurnId {
        self.turns.push(turn);
        TurnId(self.turns.len() - 1)
    }

    pub fn get(&self, id: TurnId) -> Option<&Turn> {
        self.turns.get(id.0)
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Turns paired with their ids, oldest first.
    pub fn entries(&self) -> impl DoubleEndedIterator<Item = (TurnId, &Turn)> {
        self.turns.iter().enumerate().map(|(i, t)| (TurnId(i), t))
    }

    /// Turns paired with their ids, newest first. This is display order.
    pub fn recent_first(&self) -> impl Iterator<Item = (TurnId, &Turn)> {
        self.entries().rev()
    }

    /// Decode the hidden-field form of a conversation. A blank field is an
    /// empty conversation.
    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::new());
        }
        serde_json::from_str(raw)
    }

    pub fn to_json(&self) -> String {
        // A Vec of plain structs with string fields cannot fail to serialize.
        serde_json::to_string(self).unwrap_or_else(|_| "[]".to_string())
    }
}

impl From<Vec<Turn>> for Conversation {
    fn from(turns: Vec<Turn>) -> Self {
        Self { turns }
    }
}
