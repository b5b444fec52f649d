//! Session history persistence for the playground.
//!
//! A session is a named transcript stored as one JSON file. The crate
//! provides the `HistoryStore` trait with file and in-memory backends, the
//! upgrade path for transcripts written in the old `{query, response}`
//! format, and the `SessionController` that tracks the active session.

pub mod adapters;
pub mod errors;
pub mod migration;
pub mod session;
pub mod store;

pub use adapters::{FileHistoryStore, InMemoryHistoryStore};
pub use errors::{HistoryResult, HistoryStoreError};
pub use migration::{migrate_legacy, LegacyRecord, StoredHistory};
pub use session::{ActiveSession, SessionController};
pub use store::{validate_session_id, HistoryStore};

// Re-export the turn types so callers need only this crate for persistence
pub use playground_core::types::{ConversationTurn, Role};
