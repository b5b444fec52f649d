use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

use crate::errors::HistoryResult;
use crate::migration::StoredHistory;
use crate::store::{validate_session_id, HistoryStore};
use playground_core::types::ConversationTurn;

const SESSION_EXTENSION: &str = "json";
const TEMP_SUFFIX: &str = "tmp";

/// One pretty-printed `<session_id>.json` file per session inside `dir`
#[derive(Debug, Clone)]
pub struct FileHistoryStore {
    dir: PathBuf,
}

impl FileHistoryStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Create the store and make sure its directory exists
    pub async fn open(dir: impl Into<PathBuf>) -> HistoryResult<Self> {
        let store = Self::new(dir);
        fs::create_dir_all(&store.dir).await?;
        Ok(store)
    }

    pub fn session_path(&self, session_id: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", session_id, SESSION_EXTENSION))
    }

    fn temp_path(&self, session_id: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}.{}", session_id, SESSION_EXTENSION, TEMP_SUFFIX))
    }

    async fn read_stored(&self, session_id: &str) -> HistoryResult<Option<StoredHistory>> {
        let path = self.session_path(session_id);
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(StoredHistory::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Write through a temp file and rename, so an interrupted write leaves the old record intact
    async fn write_atomic(&self, session_id: &str, contents: &[u8]) -> HistoryResult<()> {
        fs::create_dir_all(&self.dir).await?;

        let tmp_path = self.temp_path(session_id);
        let result = async {
            let mut tmp_file = fs::File::create(&tmp_path).await?;
            tmp_file.write_all(contents).await?;
            tmp_file.sync_all().await?;
            drop(tmp_file);
            fs::rename(&tmp_path, self.session_path(session_id)).await
        }
        .await;

        if let Err(e) = result {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }
        Ok(())
    }
}

#[async_trait]
impl HistoryStore for FileHistoryStore {
    async fn list_sessions(&self) -> HistoryResult<BTreeSet<String>> {
        let mut sessions = BTreeSet::new();

        let mut entries = match fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(sessions),
            Err(e) => return Err(e.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(SESSION_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) {
                sessions.insert(stem.to_string());
            }
        }

        debug!(count = sessions.len(), dir = %self.dir.display(), "Listed sessions");
        Ok(sessions)
    }

    async fn load(&self, session_id: &str) -> Vec<ConversationTurn> {
        if let Err(e) = validate_session_id(session_id) {
            debug!(error = %e, "Refusing to load session");
            return Vec::new();
        }

        let stored = match self.read_stored(session_id).await {
            Ok(Some(stored)) => stored,
            Ok(None) => {
                debug!(session_id, "No history file, starting empty");
                return Vec::new();
            }
            Err(e) => {
                warn!(session_id, error = %e, "Unreadable history file, treating as empty");
                return Vec::new();
            }
        };

        if !stored.is_legacy() {
            return stored.into_turns();
        }

        let turns = stored.into_turns();
        info!(session_id, turns = turns.len(), "Migrating legacy history file");
        if let Err(e) = self.save(session_id, &turns).await {
            warn!(session_id, error = %e, "Failed to rewrite migrated history");
        }
        turns
    }

    async fn save(&self, session_id: &str, turns: &[ConversationTurn]) -> HistoryResult<()> {
        validate_session_id(session_id)?;

        let json = serde_json::to_vec_pretty(turns)?;
        self.write_atomic(session_id, &json).await?;

        debug!(session_id, turns = turns.len(), "Saved history");
        Ok(())
    }

    async fn delete(&self, session_ids: &[String]) -> HistoryResult<usize> {
        for session_id in session_ids {
            validate_session_id(session_id)?;
        }

        let mut removed = 0;
        for session_id in session_ids {
            match fs::remove_file(self.session_path(session_id)).await {
                Ok(()) => {
                    debug!(session_id = %session_id, "Deleted session");
                    removed += 1;
                }
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        }
        Ok(removed)
    }
}
