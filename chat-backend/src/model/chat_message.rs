//! The chat message, the only thing this service stores.
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use super::{Error, FromRow};

/// A chat message.
///
/// Serialized with camelCase field names and an RFC 3339 timestamp:
///
/// ```json
/// {"id": 1, "message": "hi", "userName": "alice", "createdAt": "2026-10-16T10:00:00.123456Z"}
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Assigned by the database on insert, `None` before that.
    pub id: Option<i64>,
    pub message: String,
    pub user_name: String,
    /// When the server accepted the message.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl ChatMessage {
    /// Table the messages are stored in.
    pub const TABLE: &'static str = "chat_message";

    /// Columns, in the order they are selected.
    pub const COLUMNS: &'static [&'static str] = &["id", "message", "user_name", "created_at"];

    /// Create a message that hasn't been saved yet.
    pub fn new(
        message: impl ToString,
        user_name: impl ToString,
        created_at: OffsetDateTime,
    ) -> Self {
        Self {
            id: None,
            message: message.to_string(),
            user_name: user_name.to_string(),
            created_at,
        }
    }

    /// Do both values represent the same stored message?
    ///
    /// Only saved messages have an identity: two messages without an `id`
    /// are never the same, even if they are the same value.
    pub fn same_identity(&self, other: &ChatMessage) -> bool {
        match (self.id, other.id) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }

    /// Column a JSON property can be sorted by, e.g. `userName` => `user_name`.
    /// Properties that don't exist can't be sorted by.
    pub fn sortable(property: &str) -> Option<&'static str> {
        let column = column_name(property);
        Self::COLUMNS.iter().find(|c| **c == column).copied()
    }
}

/// `userName` => `user_name`.
fn column_name(property: &str) -> String {
    property.chars().fold(String::new(), |mut column, c| {
        if c.is_ascii_uppercase() && !column.is_empty() {
            column.push('_');
        }
        column.push(c.to_ascii_lowercase());
        column
    })
}

/// Equality is identity: see [`ChatMessage::same_identity`].
///
/// This is not reflexive for unsaved messages, so there is no `Eq`.
impl PartialEq for ChatMessage {
    fn eq(&self, other: &Self) -> bool {
        self.same_identity(other)
    }
}

impl Hash for ChatMessage {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl std::fmt::Display for ChatMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let id = match self.id {
            Some(id) => id.to_string(),
            None => "null".to_string(),
        };

        write!(
            f,
            "ChatMessage{{id={}, message='{}', userName='{}', createdAt='{}'}}",
            id, self.message, self.user_name, self.created_at
        )
    }
}

impl FromRow for ChatMessage {
    fn from_row(row: tokio_postgres::Row) -> Result<Self, Error> {
        Ok(Self {
            id: row.try_get("id")?,
            message: row.try_get("message")?,
            user_name: row.try_get("user_name")?,
            created_at: row.try_get("created_at")?,
        })
    }
}
