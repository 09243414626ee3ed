// Core Trip Agent client functionality:
// - HTTP client for the Trip Agent API
// - Request/response data structures
// - Chat session state and request lifecycle
// - Markdown rendering of assistant replies
// - Configuration loading
// - Shared error types

// Export client module - API client for Trip Agent
pub mod client;
pub use client::*;

// Export types module - Request/response data structures
pub mod types;
pub use types::*;

// Export config module - Configuration loading
pub mod config;
pub use config::*;

// Export errors module - Shared error types
pub mod errors;
pub use errors::*;

// Export session module - Transcript and request lifecycle
pub mod session;
pub use session::{Author, Message, PendingTurn, Session, SubmitError};

// Export render module - Structured rendering of messages
pub mod render;
pub use render::{render_message, Rendered};
