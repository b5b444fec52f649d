use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::errors::{HistoryResult, HistoryStoreError};
use crate::store::{validate_session_id, HistoryStore};
use playground_core::types::ConversationTurn;

/// Process-local store; nothing survives a restart
#[derive(Debug, Default, Clone)]
pub struct InMemoryHistoryStore {
    sessions: Arc<RwLock<HashMap<String, Vec<ConversationTurn>>>>,
}

impl InMemoryHistoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl HistoryStore for InMemoryHistoryStore {
    async fn list_sessions(&self) -> HistoryResult<BTreeSet<String>> {
        let sessions = self.sessions.read().map_err(|e| {
            HistoryStoreError::Storage(format!("Failed to acquire read lock: {}", e))
        })?;
        Ok(sessions.keys().cloned().collect())
    }

    async fn load(&self, session_id: &str) -> Vec<ConversationTurn> {
        match self.sessions.read() {
            Ok(sessions) => sessions.get(session_id).cloned().unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "Session map poisoned, treating as empty");
                Vec::new()
            }
        }
    }

    async fn save(&self, session_id: &str, turns: &[ConversationTurn]) -> HistoryResult<()> {
        validate_session_id(session_id)?;

        let mut sessions = self.sessions.write().map_err(|e| {
            HistoryStoreError::Storage(format!("Failed to acquire write lock: {}", e))
        })?;
        sessions.insert(session_id.to_string(), turns.to_vec());
        debug!(session_id, turns = turns.len(), "Saved session in memory");
        Ok(())
    }

    async fn delete(&self, session_ids: &[String]) -> HistoryResult<usize> {
        for session_id in session_ids {
            validate_session_id(session_id)?;
        }

        let mut sessions = self.sessions.write().map_err(|e| {
            HistoryStoreError::Storage(format!("Failed to acquire write lock: {}", e))
        })?;
        Ok(session_ids
            .iter()
            .filter(|id| sessions.remove(id.as_str()).is_some())
            .count())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_load_delete() {
        let store = InMemoryHistoryStore::new();
        let turns = vec![
            ConversationTurn::user("hi"),
            ConversationTurn::assistant("hello"),
        ];

        assert!(store.load("demo").await.is_empty());
        store.save("demo", &turns).await.unwrap();
        assert_eq!(store.load("demo").await, turns);
        assert!(store.list_sessions().await.unwrap().contains("demo"));

        let ids = vec!["demo".to_string(), "missing".to_string()];
        assert_eq!(store.delete(&ids).await.unwrap(), 1);
        assert!(store.load("demo").await.is_empty());
        assert!(store.list_sessions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clones_share_state() {
        let store = InMemoryHistoryStore::new();
        let handle = store.clone();
        store.save("shared", &[ConversationTurn::user("x")]).await.unwrap();
        assert_eq!(handle.load("shared").await.len(), 1);
    }
}
