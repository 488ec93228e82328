//! Narrow query interface into the game server hosting the engine.

use crate::models::{Action, PlayerKey, ServerInfo};
use thiserror::Error;

/// Errors a host may report while running an effect
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HostError {
    #[error("Player {0} is not online")]
    PlayerOffline(String),

    #[error("Command rejected: {0}")]
    CommandRejected(String),
}

/// Player and server lookups provided by the game server.
///
/// All methods are synchronous and must be cheap; they are called from worker threads.
#[cfg_attr(test, mockall::automock)]
pub trait HostBridge: Send + Sync {
    /// Whether the player can currently receive in-game effects.
    fn is_reachable(&self, player: &PlayerKey) -> bool;

    /// Run an effect for the player. Best effort; the engine only logs failures.
    fn run_effect(&self, player: &PlayerKey, action: &Action) -> Result<(), HostError>;

    /// Free inventory slots, or -1 when the player is unknown or offline.
    fn free_capacity(&self, player: &PlayerKey) -> i32;

    fn is_online_mode(&self) -> bool;

    fn server_info(&self) -> ServerInfo;
}
