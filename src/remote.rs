//! Abstraction over the webstore backend.
//!
//! The engine never speaks HTTP itself. Hosts provide a [`RemoteClient`]
//! implementation; tests substitute stubs or the generated `MockRemoteClient`.

use crate::models::{
    Category, CheckoutUrl, Goal, PendingEvent, PlatformTelemetry, StoreSnapshot,
};
use async_trait::async_trait;
use thiserror::Error;

/// Errors reported by a [`RemoteClient`]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("Secret key rejected by the webstore")]
    Unauthorized,

    #[error("Request failed: {0}")]
    Transport(String),

    #[error("Webstore returned status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("Unexpected response: {0}")]
    InvalidResponse(String),
}

impl RemoteError {
    /// Whether retrying on the next tick can plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            RemoteError::Unauthorized => false,
            RemoteError::Status { status, .. } => *status >= 500 || *status == 429,
            RemoteError::Transport(_) | RemoteError::InvalidResponse(_) => true,
        }
    }
}

pub type RemoteResult<T> = Result<T, RemoteError>;

/// Asynchronous operations offered by the webstore backend.
///
/// Implementations own timeouts and cancellation; the engine applies none.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RemoteClient: Send + Sync {
    async fn fetch_store_snapshot(&self) -> RemoteResult<StoreSnapshot>;

    async fn fetch_catalog(&self) -> RemoteResult<Vec<Category>>;

    async fn fetch_goals(&self) -> RemoteResult<Vec<Goal>>;

    async fn create_payment_link(&self, package_id: u64, buyer_name: &str)
    -> RemoteResult<CheckoutUrl>;

    /// Submit a batch of events. `Ok` means the whole batch was accepted.
    async fn submit_event_batch(&self, events: Vec<PendingEvent>) -> RemoteResult<()>;

    async fn submit_heartbeat(&self) -> RemoteResult<()>;

    async fn submit_telemetry(&self, telemetry: PlatformTelemetry) -> RemoteResult<()>;
}
