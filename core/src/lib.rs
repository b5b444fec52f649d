// Core pieces shared by the playground crates:
// - Completion provider client (model listing + streamed generation)
// - Conversation data structures
// - Cached model directory
// - Configuration loading
// - Shared error types

// Export client module - HTTP client for the completion provider
pub mod client;
pub use client::*;

// Export types module - Conversation turns and wire structures
pub mod types;
pub use types::*;

// Export models module - Model directory with TTL cache
pub mod models;
pub use models::{ModelDirectory, ModelListing};

// Export config module - Configuration loading
pub mod config;
pub use config::*;

// Export errors module - Shared error types
pub mod errors;
pub use errors::*;
