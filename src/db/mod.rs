mod connection;
pub mod helpers;
mod migrations;
pub mod models;
mod repositories;

pub use connection::Database;
pub use repositories::CompletionWrite;
pub use models::{
    FocusDumpItem, FocusSession, FocusSourceKind, InboxItem, ItemSource, Reminder,
};
