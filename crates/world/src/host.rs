//! Collaborator that actually runs worlds.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use headless_core::SessionId;

use crate::error::WorldError;
use crate::params::{WorldSession, WorldStartParameters};

/// The engine-side world/session manager.
///
/// Implementations should observe `cancel` where practical and return
/// [`WorldError::Canceled`] when they stop because of it.
#[async_trait]
pub trait WorldHost: Send + Sync {
    async fn start_world(
        &self,
        params: WorldStartParameters,
        cancel: CancellationToken,
    ) -> Result<WorldSession, WorldError>;

    /// Stop a session, returning its last known state.
    async fn stop_world(&self, session_id: SessionId) -> Result<WorldSession, WorldError>;

    async fn restart_world(
        &self,
        session_id: SessionId,
        cancel: CancellationToken,
    ) -> Result<WorldSession, WorldError>;

    /// Current state of a running session.
    async fn session(&self, session_id: SessionId) -> Result<WorldSession, WorldError>;
}
