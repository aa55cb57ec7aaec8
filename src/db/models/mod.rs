pub mod focus;
pub mod inbox;
pub mod reminder;

pub use focus::{FocusDumpItem, FocusSession, FocusSourceKind};
pub use inbox::{InboxItem, ItemSource};
pub use reminder::Reminder;
