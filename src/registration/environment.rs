use std::{
    env,
    sync::atomic::{AtomicBool, Ordering},
};

use crate::backend::ApnsEnvironment;

/// Facts about the device that go into a registration.
pub trait DeviceEnvironment: Send + Sync {
    fn push_enabled(&self) -> bool;
    /// IANA identifier, e.g. `Europe/Berlin`.
    fn timezone(&self) -> String;
    fn apns_environment(&self) -> Option<ApnsEnvironment>;
}

#[derive(Debug)]
pub struct SystemEnvironment {
    push_enabled: AtomicBool,
}

impl SystemEnvironment {
    pub fn new(push_enabled: bool) -> Self {
        Self {
            push_enabled: AtomicBool::new(push_enabled),
        }
    }

    /// Called when the user changes notification permission.
    pub fn set_push_enabled(&self, enabled: bool) {
        self.push_enabled.store(enabled, Ordering::Release);
    }
}

impl DeviceEnvironment for SystemEnvironment {
    fn push_enabled(&self) -> bool {
        self.push_enabled.load(Ordering::Acquire)
    }

    fn timezone(&self) -> String {
        resolve_timezone(env::var("TZ").ok(), || iana_time_zone::get_timezone().ok())
    }

    fn apns_environment(&self) -> Option<ApnsEnvironment> {
        if cfg!(debug_assertions) {
            Some(ApnsEnvironment::Sandbox)
        } else {
            Some(ApnsEnvironment::Production)
        }
    }
}

/// `TZ` wins when it names a zone; otherwise the system zone, then UTC.
fn resolve_timezone(tz_var: Option<String>, system: impl FnOnce() -> Option<String>) -> String {
    let from_var = tz_var
        .map(|tz| tz.trim().trim_start_matches(':').to_string())
        // A path such as `/etc/localtime` is not an identifier.
        .filter(|tz| !tz.is_empty() && !tz.starts_with('/'));

    from_var
        .or_else(|| system().filter(|tz| !tz.trim().is_empty()))
        .unwrap_or_else(|| "UTC".to_string())
}
