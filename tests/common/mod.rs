//! Stub collaborators shared by the integration tests.
#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use storelink::Integration;
use storelink::host::{HostBridge, HostError};
use storelink::models::{
    Action, Category, CheckoutUrl, Goal, GoalStatus, Package, PendingEvent, PlatformConfig,
    PlatformTelemetry, PlayerKey, ServerDetails, ServerInfo, StoreDetails, StoreSnapshot,
};
use storelink::remote::{RemoteClient, RemoteError, RemoteResult};
use storelink::services::Scheduler;
use tokio::runtime::Handle;
use tokio::sync::Notify;

pub fn config_with_secret(secret: &str) -> PlatformConfig {
    let mut config = PlatformConfig::default();
    config.server.secret_key = secret.to_string();
    config
}

/// Integration spawning onto the test's runtime
pub fn build_integration(
    config: PlatformConfig,
    remote: &Arc<StubRemote>,
    host: &Arc<StubHost>,
) -> Integration {
    let scheduler = Arc::new(Scheduler::with_handle(Handle::current()));
    Integration::new(config, remote.clone(), host.clone(), scheduler)
}

/// Let tasks spawned on a current-thread runtime run to completion
pub async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

pub fn snapshot(name: &str) -> StoreSnapshot {
    StoreSnapshot {
        store: StoreDetails {
            id: 1,
            name: name.to_string(),
            domain: format!("{}.tebex.io", name.to_lowercase()),
            game_type: "Minecraft: Java Edition".to_string(),
            currency: "USD".to_string(),
            online_mode: true,
        },
        server: ServerDetails {
            id: 100,
            name: format!("{} server", name),
        },
    }
}

pub fn catalog(names: &[&str]) -> Vec<Category> {
    names
        .iter()
        .enumerate()
        .map(|(i, name)| Category {
            id: i as u64 + 1,
            name: name.to_string(),
            order: i as i32,
            packages: vec![Package {
                id: 1000 + i as u64,
                name: format!("{} package", name),
                price: 9.99,
                sale_discount: None,
            }],
        })
        .collect()
}

pub fn join_event(n: usize) -> PendingEvent {
    PendingEvent::join(
        PlayerKey::Name(format!("player{}", n)),
        &format!("player{}", n),
        Some("10.0.0.1".to_string()),
    )
}

/// Configurable webstore double that records every call.
#[derive(Default)]
pub struct StubRemote {
    pub snapshot: Mutex<Option<StoreSnapshot>>,
    pub catalog: Mutex<Option<Vec<Category>>>,
    pub goals: Mutex<Vec<Goal>>,

    /// When set, snapshot fetches fail as if the secret key were invalid
    pub reject_key: AtomicBool,

    /// Number of upcoming batch submissions that fail
    pub failing_batches: AtomicUsize,
    /// When set, batch submissions wait for a permit before completing
    pub batch_release: Option<Arc<Notify>>,
    pub batches: Mutex<Vec<Vec<PendingEvent>>>,

    pub snapshot_calls: AtomicUsize,
    pub catalog_calls: AtomicUsize,
    pub batch_calls: AtomicUsize,
    pub heartbeat_calls: AtomicUsize,
    pub telemetry: Mutex<Vec<PlatformTelemetry>>,
    pub link_calls: AtomicUsize,
}

impl StubRemote {
    pub fn healthy() -> Self {
        let remote = Self::default();
        remote.set_snapshot(Some(snapshot("Crafters")));
        remote.set_catalog(Some(catalog(&["Ranks", "Crates"])));
        remote
    }

    pub fn with_held_batches(release: Arc<Notify>) -> Self {
        Self {
            batch_release: Some(release),
            ..Self::default()
        }
    }

    pub fn set_snapshot(&self, snapshot: Option<StoreSnapshot>) {
        *self.snapshot.lock().unwrap() = snapshot;
    }

    pub fn set_catalog(&self, catalog: Option<Vec<Category>>) {
        *self.catalog.lock().unwrap() = catalog;
    }

    pub fn fail_next_batches(&self, count: usize) {
        self.failing_batches.store(count, Ordering::SeqCst);
    }

    pub fn recorded_batches(&self) -> Vec<Vec<PendingEvent>> {
        self.batches.lock().unwrap().clone()
    }

    /// Calls that only happen while the integration is configured
    pub fn gated_calls(&self) -> usize {
        self.snapshot_calls.load(Ordering::SeqCst)
            + self.catalog_calls.load(Ordering::SeqCst)
            + self.batch_calls.load(Ordering::SeqCst)
            + self.heartbeat_calls.load(Ordering::SeqCst)
            + self.telemetry.lock().unwrap().len()
    }
}

#[async_trait]
impl RemoteClient for StubRemote {
    async fn fetch_store_snapshot(&self) -> RemoteResult<StoreSnapshot> {
        self.snapshot_calls.fetch_add(1, Ordering::SeqCst);
        if self.reject_key.load(Ordering::SeqCst) {
            return Err(RemoteError::Unauthorized);
        }
        self.snapshot
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| RemoteError::Transport("connection refused".to_string()))
    }

    async fn fetch_catalog(&self) -> RemoteResult<Vec<Category>> {
        self.catalog_calls.fetch_add(1, Ordering::SeqCst);
        self.catalog
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| RemoteError::Transport("connection refused".to_string()))
    }

    async fn fetch_goals(&self) -> RemoteResult<Vec<Goal>> {
        Ok(self.goals.lock().unwrap().clone())
    }

    async fn create_payment_link(
        &self,
        package_id: u64,
        buyer_name: &str,
    ) -> RemoteResult<CheckoutUrl> {
        self.link_calls.fetch_add(1, Ordering::SeqCst);
        if package_id == 0 {
            return Err(RemoteError::Status {
                status: 404,
                message: "Package not found".to_string(),
            });
        }
        Ok(CheckoutUrl {
            url: format!("https://pay.example/{}/{}", package_id, buyer_name),
            expires: None,
        })
    }

    async fn submit_event_batch(&self, events: Vec<PendingEvent>) -> RemoteResult<()> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(release) = &self.batch_release {
            release.notified().await;
        }

        let failing = self.failing_batches.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_batches.store(failing - 1, Ordering::SeqCst);
            return Err(RemoteError::Status {
                status: 503,
                message: "Service unavailable".to_string(),
            });
        }

        self.batches.lock().unwrap().push(events);
        Ok(())
    }

    async fn submit_heartbeat(&self) -> RemoteResult<()> {
        self.heartbeat_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn submit_telemetry(&self, telemetry: PlatformTelemetry) -> RemoteResult<()> {
        self.telemetry.lock().unwrap().push(telemetry);
        Ok(())
    }
}

/// Game server double: reachable players, free slots and a log of effects run.
pub struct StubHost {
    pub online_mode: bool,
    pub reachable: Mutex<HashSet<PlayerKey>>,
    pub free_slots: Mutex<HashMap<PlayerKey, i32>>,
    pub rejected_commands: Mutex<HashSet<String>>,
    pub effects: Mutex<Vec<(PlayerKey, String)>>,
}

impl StubHost {
    pub fn new(online_mode: bool) -> Self {
        Self {
            online_mode,
            reachable: Mutex::new(HashSet::new()),
            free_slots: Mutex::new(HashMap::new()),
            rejected_commands: Mutex::new(HashSet::new()),
            effects: Mutex::new(Vec::new()),
        }
    }

    pub fn set_reachable(&self, player: PlayerKey, slots: i32) {
        self.reachable.lock().unwrap().insert(player.clone());
        self.free_slots.lock().unwrap().insert(player, slots);
    }

    pub fn reject(&self, command: &str) {
        self.rejected_commands
            .lock()
            .unwrap()
            .insert(command.to_string());
    }

    pub fn commands_run(&self) -> Vec<String> {
        self.effects
            .lock()
            .unwrap()
            .iter()
            .map(|(_, command)| command.clone())
            .collect()
    }
}

impl HostBridge for StubHost {
    fn is_reachable(&self, player: &PlayerKey) -> bool {
        self.reachable.lock().unwrap().contains(player)
    }

    fn run_effect(&self, player: &PlayerKey, action: &Action) -> Result<(), HostError> {
        if self.rejected_commands.lock().unwrap().contains(&action.command) {
            return Err(HostError::CommandRejected(action.command.clone()));
        }
        self.effects
            .lock()
            .unwrap()
            .push((player.clone(), action.command.clone()));
        Ok(())
    }

    fn free_capacity(&self, player: &PlayerKey) -> i32 {
        self.free_slots
            .lock()
            .unwrap()
            .get(player)
            .copied()
            .unwrap_or(-1)
    }

    fn is_online_mode(&self) -> bool {
        self.online_mode
    }

    fn server_info(&self) -> ServerInfo {
        ServerInfo {
            software: "fabric".to_string(),
            version: "1.20.1-fabric (MC: 1.20.1)".to_string(),
            online_mode: self.online_mode,
        }
    }
}

pub fn goal(name: &str, status: GoalStatus) -> Goal {
    Goal {
        id: 1,
        name: name.to_string(),
        current: 10.0,
        target: 100.0,
        status,
    }
}
