//! World lifecycle on top of the job registry.
//!
//! Starting, restarting, stopping and saving a world each become a tracked
//! job. The engine side is reached through the [`WorldHost`] trait; saves go
//! through the sync retry controller.

pub mod controller;
pub mod error;
pub mod host;
pub mod params;


pub use controller::WorldController;
pub use error::WorldError;
pub use host::WorldHost;
pub use params::{AccessLevel, WorldDescriptor, WorldSession, WorldStartParameters};
