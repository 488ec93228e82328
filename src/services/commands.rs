use crate::host::HostBridge;
use crate::metrics::Metrics;
use crate::models::{Action, PlayerKey, QueuedAction};
use crate::state::{ConfigurationGate, StateChange};
use indexmap::IndexMap;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// What happened to the actions taken in one drain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub dispatched: usize,
    pub failed: usize,
    /// Kept queued for the next reachability event (not enough inventory space)
    pub deferred: usize,
}

impl DrainReport {
    pub fn total(&self) -> usize {
        self.dispatched + self.failed + self.deferred
    }
}

/// Per-player queues of effects waiting for the player to become reachable
///
/// Draining takes the player's whole queue under the lock and runs it outside the
/// lock, in enqueue order. Actions enqueued for that player while a drain runs
/// wait for the next reachability event. Delivery is at-most-once: an effect that
/// fails is logged and dropped.
pub struct CommandQueue {
    queues: Mutex<IndexMap<PlayerKey, VecDeque<QueuedAction>>>,
    host: Arc<dyn HostBridge>,
    state: Arc<ConfigurationGate>,
    metrics: Arc<Metrics>,
}

impl CommandQueue {
    pub fn new(
        host: Arc<dyn HostBridge>,
        state: Arc<ConfigurationGate>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self {
            queues: Mutex::new(IndexMap::new()),
            host,
            state,
            metrics,
        }
    }

    fn lock(&self) -> MutexGuard<'_, IndexMap<PlayerKey, VecDeque<QueuedAction>>> {
        self.queues.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn enqueue(&self, player: PlayerKey, action: Action) {
        tracing::debug!("Queued action for {}: {}", player, action.command);
        self.lock()
            .entry(player.clone())
            .or_default()
            .push_back(QueuedAction::new(player, action));
        self.metrics.record_action_queued();
    }

    /// Number of actions waiting for the player
    pub fn pending_for(&self, player: &PlayerKey) -> usize {
        self.lock().get(player).map_or(0, VecDeque::len)
    }

    pub fn has_pending(&self, player: &PlayerKey) -> bool {
        self.pending_for(player) > 0
    }

    /// Players with queued actions, in the order they were first queued
    pub fn pending_players(&self) -> Vec<PlayerKey> {
        self.lock().keys().cloned().collect()
    }

    /// Remove and return everything queued for the player
    pub fn take(&self, player: &PlayerKey) -> Vec<QueuedAction> {
        self.lock()
            .shift_remove(player)
            .map(Vec::from)
            .unwrap_or_default()
    }

    /// Run every action queued for a player who just became reachable
    pub fn on_reachable(&self, player: &PlayerKey) -> DrainReport {
        let actions = self.take(player);
        if actions.is_empty() {
            return DrainReport::default();
        }

        tracing::info!("Dispatching {} queued actions for {}", actions.len(), player);

        let mut report = DrainReport::default();
        let mut free_slots = self.host.free_capacity(player);
        let mut deferred = Vec::new();

        for action in actions {
            let needed = action.payload.required_slots;
            if needed > 0 && free_slots >= 0 && (free_slots as u32) < needed {
                tracing::info!(
                    "Deferring action for {}: needs {} free slots, has {}",
                    player,
                    needed,
                    free_slots
                );
                self.metrics.record_action_deferred();
                report.deferred += 1;
                deferred.push(action);
                continue;
            }

            match self.host.run_effect(player, &action.payload) {
                Ok(()) => {
                    self.metrics.record_action_dispatched();
                    report.dispatched += 1;
                    if needed > 0 && free_slots >= 0 {
                        free_slots -= needed as i32;
                    }
                }
                Err(e) => {
                    self.metrics.record_action_failed();
                    report.failed += 1;
                    tracing::warn!(
                        "Failed to run queued action for {} ({}): {}",
                        player,
                        action.payload.command,
                        e
                    );
                }
            }
        }

        if !deferred.is_empty() {
            self.requeue_front(player, deferred);
        }

        if report.dispatched > 0 {
            self.state.notify(StateChange::ActionsDispatched {
                player: player.clone(),
                count: report.dispatched,
            });
        }

        report
    }

    /// Put deferred actions back ahead of anything queued during the drain
    fn requeue_front(&self, player: &PlayerKey, deferred: Vec<QueuedAction>) {
        let mut queues = self.lock();
        let queue = queues.entry(player.clone()).or_default();
        for action in deferred.into_iter().rev() {
            queue.push_front(action);
        }
    }
}
