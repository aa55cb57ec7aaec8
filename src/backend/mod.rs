mod client;
mod error;

pub use client::{ApnsEnvironment, BackendClient, DeviceRegisterPayload};
pub use error::BackendError;
