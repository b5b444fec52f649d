use std::collections::BTreeSet;
use std::fmt::Debug;

use async_trait::async_trait;

use crate::errors::{HistoryResult, HistoryStoreError};
use playground_core::types::ConversationTurn;

/// Durable mapping from session id to an ordered transcript
#[async_trait]
pub trait HistoryStore: Send + Sync + Debug {
    /// Snapshot of every persisted session id
    async fn list_sessions(&self) -> HistoryResult<BTreeSet<String>>;

    /// Transcript for `session_id`. Missing, unreadable or corrupt records
    /// load as an empty transcript; this never fails.
    async fn load(&self, session_id: &str) -> Vec<ConversationTurn>;

    /// Replace the record for `session_id` with `turns`, creating it if needed
    async fn save(&self, session_id: &str, turns: &[ConversationTurn]) -> HistoryResult<()>;

    /// Remove each listed session. Ids without a record are skipped.
    /// Returns how many records were actually removed.
    async fn delete(&self, session_ids: &[String]) -> HistoryResult<usize>;
}

/// Check that `session_id` can be used as a file name on its own
pub fn validate_session_id(session_id: &str) -> HistoryResult<()> {
    let invalid = session_id.trim().is_empty()
        || session_id == "."
        || session_id == ".."
        || session_id.contains(['/', '\\', '\0']);

    if invalid {
        Err(HistoryStoreError::InvalidSessionId(session_id.to_string()))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_ids() {
        for id in ["demo", "my chat", "2024-05-01_notes", "ünïcode", ".hidden"] {
            assert!(validate_session_id(id).is_ok(), "{id}");
        }
    }

    #[test]
    fn test_invalid_ids() {
        for id in ["", "   ", ".", "..", "a/b", "..\\up", "nul\0byte"] {
            assert!(
                matches!(
                    validate_session_id(id),
                    Err(HistoryStoreError::InvalidSessionId(_))
                ),
                "{id:?}"
            );
        }
    }
}
