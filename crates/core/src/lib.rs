//! `headless-core`: identifiers and errors shared by the control plane crates.
//!
//! Nothing in here knows about jobs, uploads or worlds; it only provides the
//! vocabulary the other crates agree on.

pub mod error;
pub mod id;
pub mod panic;

pub use error::{ControlError, ControlResult};
pub use id::{JobId, SessionId};
pub use panic::panic_message;
