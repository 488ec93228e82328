// storelink - Webstore synchronization and delivery engine for game servers
//
// This is the library crate embedded by the game-server plugin. The plugin supplies a
// RemoteClient (webstore API) and a HostBridge (player lookups) and drives everything
// through Integration.

pub mod config;
pub mod host;
pub mod integration;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod remote;
pub mod services;
pub mod state;

// Re-export commonly used types for convenience
pub use crate::config::ConfigManager;
pub use host::{HostBridge, HostError};
pub use integration::{Integration, IntegrationError};
pub use models::{Action, PendingEvent, PlatformConfig, PlayerKey, StoreSnapshot};
pub use remote::{RemoteClient, RemoteError};
pub use state::{ConfigurationGate, StateChange};

/// Crate version, reported in telemetry
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
