//! On-disk transcript formats and the upgrade from the legacy format.
//!
//! Current files hold a list of `{role, content}` objects. Older files hold a
//! list of `{query?, response?}` records; a file is treated as legacy when its
//! first element carries a `query` key.

use serde::Deserialize;
use serde_json::Value;

use crate::errors::HistoryResult;
use playground_core::types::ConversationTurn;

const LEGACY_MARKER: &str = "query";

/// Transcript entry in the pre-role format. A `null` field counts as absent;
/// a non-string value fails to decode.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LegacyRecord {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub response: Option<String>,
}

/// A transcript as decoded from storage, before any upgrade
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoredHistory {
    Current(Vec<ConversationTurn>),
    Legacy(Vec<LegacyRecord>),
}

impl StoredHistory {
    /// Decode raw file contents. Blank input and JSON `null` are an empty transcript.
    pub fn from_slice(bytes: &[u8]) -> HistoryResult<Self> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(StoredHistory::Current(Vec::new()));
        }
        let value: Value = serde_json::from_slice(bytes)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> HistoryResult<Self> {
        match value {
            Value::Null => Ok(StoredHistory::Current(Vec::new())),
            Value::Array(items) => {
                let legacy = items
                    .first()
                    .and_then(Value::as_object)
                    .is_some_and(|first| first.contains_key(LEGACY_MARKER));
                let items = Value::Array(items);
                if legacy {
                    Ok(StoredHistory::Legacy(serde_json::from_value(items)?))
                } else {
                    Ok(StoredHistory::Current(serde_json::from_value(items)?))
                }
            }
            // Anything else is not a transcript; let serde describe the mismatch.
            other => Ok(StoredHistory::Current(serde_json::from_value(other)?)),
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, StoredHistory::Legacy(_))
    }

    /// Turns in the current format. Current transcripts pass through untouched.
    pub fn into_turns(self) -> Vec<ConversationTurn> {
        match self {
            StoredHistory::Current(turns) => turns,
            StoredHistory::Legacy(records) => migrate_legacy(&records),
        }
    }
}

/// Convert legacy records in order: `query` becomes a user turn, then
/// `response` becomes an assistant turn. A record may produce zero, one or two turns.
pub fn migrate_legacy(records: &[LegacyRecord]) -> Vec<ConversationTurn> {
    let mut turns = Vec::with_capacity(records.len() * 2);
    for record in records {
        if let Some(query) = &record.query {
            turns.push(ConversationTurn::user(query.clone()));
        }
        if let Some(response) = &record.response {
            turns.push(ConversationTurn::assistant(response.clone()));
        }
    }
    turns
}
