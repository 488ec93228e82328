// State management module
//
// This module provides the ConfigurationGate which tracks whether the integration is
// active and broadcasts change events for front-ends that render cached store data.

use crate::models::PlayerKey;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock};
use thiserror::Error;
use tokio::sync::broadcast;

/// Change events emitted when engine state is modified
///
/// Subscribers (menus, status commands) use these to redraw without polling.
#[derive(Clone, Debug, PartialEq)]
pub enum StateChange {
    /// The integration became active
    Configured,

    /// The integration was halted
    Halted,

    /// A new store snapshot was swapped in
    SnapshotRefreshed,

    /// A new catalog was swapped in
    CatalogRefreshed { categories: usize },

    /// A batch of events was accepted by the webstore
    EventsDelivered { count: usize },

    /// Queued actions were dispatched for a player
    ActionsDispatched { player: PlayerKey, count: usize },
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("No secret key configured. Set your webstore secret key first")]
    MissingCredential,
}

/// Gate consulted by every scheduled task before it does any work
///
/// The active flag is read on every tick and written only on configure/halt, so it
/// is a plain atomic. Halting never cancels timers; their bodies check
/// [`is_active()`](Self::is_active) and return early.
///
/// # Usage
///
/// - [`configure()`](Self::configure) once the webstore accepted the credential
/// - [`halt()`](Self::halt) when the credential was rejected or removed
/// - [`subscribe()`](Self::subscribe) for listening to state changes
pub struct ConfigurationGate {
    active: AtomicBool,

    credential: RwLock<String>,

    /// Broadcast channel for emitting state change events
    state_tx: broadcast::Sender<StateChange>,
}

impl ConfigurationGate {
    /// Create an inactive gate holding the credential read from configuration
    pub fn new(credential: impl Into<String>) -> Self {
        let (state_tx, _) = broadcast::channel(100);
        Self {
            active: AtomicBool::new(false),
            credential: RwLock::new(credential.into()),
            state_tx,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    pub fn credential(&self) -> String {
        self.credential
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn has_credential(&self) -> bool {
        !self.credential().trim().is_empty()
    }

    /// Replace the stored credential without changing the active flag
    pub fn set_credential(&self, credential: impl Into<String>) {
        *self
            .credential
            .write()
            .unwrap_or_else(PoisonError::into_inner) = credential.into();
    }

    /// Mark the integration active
    ///
    /// Returns `true` if this call flipped the gate from inactive to active.
    pub fn configure(&self) -> Result<bool, ConfigurationError> {
        if !self.has_credential() {
            return Err(ConfigurationError::MissingCredential);
        }

        let was_active = self.active.swap(true, Ordering::AcqRel);
        if !was_active {
            self.notify(StateChange::Configured);
        }
        Ok(!was_active)
    }

    /// Mark the integration inactive
    ///
    /// Returns `true` if this call flipped the gate from active to inactive.
    pub fn halt(&self) -> bool {
        let was_active = self.active.swap(false, Ordering::AcqRel);
        if was_active {
            self.notify(StateChange::Halted);
        }
        was_active
    }

    /// Emit a change event; it's OK if no one is listening
    pub fn notify(&self, change: StateChange) {
        let _ = self.state_tx.send(change);
    }

    /// Subscribe to state change events
    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.state_tx.subscribe()
    }
}

impl Default for ConfigurationGate {
    fn default() -> Self {
        Self::new(String::new())
    }
}
