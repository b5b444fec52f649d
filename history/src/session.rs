//! The active conversation and the operations the front end performs on it.
//!
//! `SessionController` is an ordinary value owned by whoever drives the UI.
//! It holds the in-memory transcript plus the id it was loaded from or last
//! saved as, and delegates persistence to a `HistoryStore`.

use std::collections::BTreeSet;

use tracing::{debug, info};

use crate::errors::HistoryResult;
use crate::store::{validate_session_id, HistoryStore};
use playground_core::types::{ConversationTurn, Role};

/// The transcript currently on screen
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveSession {
    /// Id the transcript was loaded from or last saved as
    pub id: Option<String>,
    pub turns: Vec<ConversationTurn>,
}

#[derive(Debug)]
pub struct SessionController<S: HistoryStore> {
    store: S,
    active: ActiveSession,
    autosave: Option<String>,
}

impl<S: HistoryStore> SessionController<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            active: ActiveSession::default(),
            autosave: None,
        }
    }

    /// Persist every assistant turn under `session_id` as soon as it is appended.
    /// Starting without an explicit session then resumes this one.
    pub fn with_autosave(mut self, session_id: impl Into<String>) -> Self {
        self.autosave = Some(session_id.into());
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn active_session(&self) -> &ActiveSession {
        &self.active
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active.id.as_deref()
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.active.turns
    }

    /// Load `session_id`, or start empty. With autosave on, `None` resumes the autosave session.
    pub async fn start_or_resume(&mut self, session_id: Option<&str>) -> &[ConversationTurn] {
        let id = session_id
            .map(str::to_string)
            .or_else(|| self.autosave.clone());

        self.active = match id {
            Some(id) => {
                let turns = self.store.load(&id).await;
                info!(session_id = %id, turns = turns.len(), "Resumed session");
                ActiveSession {
                    id: Some(id),
                    turns,
                }
            }
            None => ActiveSession::default(),
        };
        &self.active.turns
    }

    /// Add a turn to the transcript. Only autosave mode persists here, and only for
    /// assistant turns; a failed autosave keeps the turn in memory and returns the error.
    ///
    /// Autosave writes to the active session. A detached transcript (after `clear`)
    /// is attached to the autosave session first.
    pub async fn append_turn(&mut self, turn: ConversationTurn) -> HistoryResult<()> {
        let role = turn.role;
        self.active.turns.push(turn);

        if role != Role::Assistant || self.autosave.is_none() {
            return Ok(());
        }
        let Some(id) = self.active.id.clone().or_else(|| self.autosave.clone()) else {
            return Ok(());
        };
        self.store.save(&id, &self.active.turns).await?;
        debug!(session_id = %id, "Autosaved session");
        self.active.id = Some(id);
        Ok(())
    }

    /// Save the transcript under `session_id`, which becomes the active id
    pub async fn save_as(&mut self, session_id: &str) -> HistoryResult<()> {
        validate_session_id(session_id)?;
        self.store.save(session_id, &self.active.turns).await?;
        self.active.id = Some(session_id.to_string());
        info!(session_id, turns = self.active.turns.len(), "Saved session");
        Ok(())
    }

    /// Delete sessions. Deleting the active session also clears the transcript.
    pub async fn delete(&mut self, session_ids: &[String]) -> HistoryResult<usize> {
        let removed = self.store.delete(session_ids).await?;

        let active_deleted = self
            .active
            .id
            .as_ref()
            .is_some_and(|id| session_ids.contains(id));
        if active_deleted {
            debug!("Active session deleted, clearing transcript");
            self.clear();
        }
        Ok(removed)
    }

    /// Drop the transcript and detach from any session
    pub fn clear(&mut self) {
        self.active = ActiveSession::default();
    }

    pub async fn list_sessions(&self) -> HistoryResult<BTreeSet<String>> {
        self.store.list_sessions().await
    }
}
