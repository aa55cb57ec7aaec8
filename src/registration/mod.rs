//! Push-token registration with the backend: dedup, cool-down, single flight
//! and bounded retries.

mod environment;
mod gate;
mod registrar;
mod store;

pub use environment::{DeviceEnvironment, SystemEnvironment};
pub use gate::{GateGuard, RegistrationGate};
pub use registrar::{
    DeviceRegistrar, RegistrationOutcome, RegistrationPolicy, RegistrationTransport, SkipReason,
};
pub use store::RegistrationStore;
