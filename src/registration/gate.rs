use std::sync::atomic::{AtomicBool, Ordering};

/// Process-wide "registration in flight" flag. A second caller does not wait;
/// it simply fails to acquire.
#[derive(Debug, Default)]
pub struct RegistrationGate {
    in_flight: AtomicBool,
}

impl RegistrationGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn try_acquire(&self) -> Option<GateGuard<'_>> {
        self.in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| GateGuard { gate: self })
    }

    pub fn is_held(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }
}

/// Releases the gate when dropped.
#[derive(Debug)]
pub struct GateGuard<'a> {
    gate: &'a RegistrationGate,
}

impl Drop for GateGuard<'_> {
    fn drop(&mut self) {
        self.gate.in_flight.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_one_holder_at_a_time() {
        let gate = RegistrationGate::new();
        let first = gate.try_acquire();
        assert!(first.is_some());
        assert!(gate.is_held());
        assert!(gate.try_acquire().is_none());

        drop(first);
        assert!(!gate.is_held());
        assert!(gate.try_acquire().is_some());
    }
}
