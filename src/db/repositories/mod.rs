mod focus;
mod inbox;
mod preferences;
mod reminders;

pub use focus::CompletionWrite;
