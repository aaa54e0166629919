pub mod client;
pub mod types;

pub use client::{WorkspaceClient, WorkspaceError};
pub use types::{CreatedEvent, EventDraft, EventSummary, MessageSummary, SentMessage};
