pub mod actions;
pub mod notifications;

pub use actions::{apply_reminder_action, handle_reminder_action, ActionEffect, ReminderAction};
pub use notifications::{
    focus_end_notification, reminder_notification, NotificationCategory, NotificationRequest,
    NotificationTarget,
};
