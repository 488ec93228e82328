//! Services module - the background synchronization and delivery engine.
//!
//! # Components
//!
//! - [`CacheStore`]: read-mostly cache of the store snapshot and catalog, refreshed from
//!   the webstore. Each value is swapped atomically; failed refreshes keep stale data.
//! - [`EventBuffer`]: unbounded buffer of locally generated events, delivered in batches
//!   of at most 750 with at-least-once semantics.
//! - [`CommandQueue`]: per-player queues of in-game effects, drained in order when the
//!   player becomes reachable (at-most-once).
//! - [`Scheduler`]: tokio worker pool with one-shot, delayed, periodic and blocking
//!   execution.
//!
//! None of these check the [`ConfigurationGate`](crate::state::ConfigurationGate)
//! themselves; the scheduled tick bodies in [`crate::integration`] do.

pub mod cache;
pub mod commands;
pub mod events;
pub mod scheduler;

pub use cache::{CacheStore, MemoryStoreCache, RefreshOutcome, StoreCache};
pub use commands::{CommandQueue, DrainReport};
pub use events::{EventBuffer, FlushOutcome};
pub use scheduler::{Scheduler, SchedulerError};
