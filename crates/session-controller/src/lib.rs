//! Fans session/trial commands out across every healthy instance with
//! partial-failure reporting (spec §4.8, component C8).

mod controller;
mod error;

pub use controller::SessionController;
pub use error::{Result, SessionError};
