//! Data models for the storelink engine.
//!
//! - [`StoreSnapshot`] and [`Category`]: remote store data cached by [`crate::services::CacheStore`]
//! - [`PendingEvent`]: locally generated events buffered by [`crate::services::EventBuffer`]
//! - [`QueuedAction`]: per-player effects held by [`crate::services::CommandQueue`]
//! - [`PlatformConfig`]: settings loaded from `config.yml`
//!
//! Everything here is plain data. Concurrency lives in the services that own these values.

pub mod config;
pub mod event;
pub mod store;
pub mod telemetry;

pub use self::config::{DEFAULT_EVENT_BATCH_SIZE, PlatformConfig, ScheduleSettings, ServerSettings};
pub use event::{Action, EventMetadata, JOIN_EVENT, PendingEvent, PlayerKey, QueuedAction};
pub use store::{
    Category, CheckoutUrl, Goal, GoalStatus, Package, ServerDetails, StoreDetails, StoreSnapshot,
};
pub use telemetry::{PlatformTelemetry, ServerInfo};
