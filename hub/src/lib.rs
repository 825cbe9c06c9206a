//! Call control for a single-call IAX2 endpoint.
//!
//! The hub answers one inbound call at a time: it challenges the caller
//! with a call token, authenticates a signed challenge response against
//! the network's trusted public key, rings, answers, and then bridges
//! voice between the network and local audio hardware on a 20ms cadence.
//! Hardware audio and the directory service sit behind trait boundaries;
//! the binary supplies the real implementations.

pub mod auth;
pub mod clock;
pub mod config;
pub mod device;
mod error;
pub mod registration;
pub mod scheduler;
pub mod session;

pub use clock::EpochMillis;
pub use config::HubConfig;
pub use error::{Error, Result};
pub use scheduler::Scheduler;
pub use session::{CallSession, CallState};
