//! The surface the rest of the plugin talks to.
//!
//! [`Integration`] owns the engine components and registers three periodic tasks
//! on the [`Scheduler`]:
//!
//! | task             | default period | body                                   |
//! |------------------|----------------|----------------------------------------|
//! | `catalog-refresh`| 30 minutes     | [`CacheStore::refresh`]                |
//! | `heartbeat`      | 10 minutes     | [`RemoteClient::submit_heartbeat`]     |
//! | `event-flush`    | 1 minute       | [`EventBuffer::flush`]                 |
//!
//! Every body checks the [`ConfigurationGate`] first and does nothing while the
//! integration is halted. Halting never cancels the timers themselves.
//!
//! Command handlers and menus only read the cache and enqueue work; they never wait
//! on the network except through the explicit `*_blocking` calls.

use crate::host::HostBridge;
use crate::metrics::Metrics;
use crate::models::{
    Action, Category, CheckoutUrl, Goal, PendingEvent, PlatformConfig, PlatformTelemetry,
    PlayerKey, StoreSnapshot,
};
use crate::remote::{RemoteClient, RemoteError};
use crate::services::{
    CacheStore, CommandQueue, DrainReport, EventBuffer, FlushOutcome, MemoryStoreCache,
    RefreshOutcome, Scheduler, SchedulerError, StoreCache,
};
use crate::state::{ConfigurationError, ConfigurationGate, StateChange};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Errors surfaced to direct, user-triggered calls
///
/// Background tasks never return these; they log and retry on the next tick.
#[derive(Error, Debug)]
pub enum IntegrationError {
    #[error("This server is not connected to a webstore. Set your secret key first")]
    NotConfigured,

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("Webstore request failed: {0}")]
    Remote(#[from] RemoteError),

    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Components shared with scheduled tasks. Holds no reference to the scheduler.
struct Engine {
    config: PlatformConfig,
    state: Arc<ConfigurationGate>,
    cache: CacheStore,
    events: EventBuffer,
    commands: CommandQueue,
    remote: Arc<dyn RemoteClient>,
    host: Arc<dyn HostBridge>,
    metrics: Arc<Metrics>,
}

fn validate_config(config: &PlatformConfig) -> Result<(), IntegrationError> {
    config
        .validate()
        .map_err(|e| IntegrationError::InvalidConfig(e.to_string()))
}

impl Engine {
    fn is_online_mode(&self) -> bool {
        self.config.server.proxy_mode || self.host.is_online_mode()
    }

    fn telemetry(&self) -> PlatformTelemetry {
        let mut info = self.host.server_info();
        info.online_mode = self.is_online_mode();
        PlatformTelemetry::from_server(&info)
    }

    async fn refresh_tick(&self) -> Option<RefreshOutcome> {
        if !self.state.is_active() {
            tracing::debug!("Skipping catalog refresh: integration not configured");
            return None;
        }
        Some(self.cache.refresh().await)
    }

    async fn flush_tick(&self) -> Option<FlushOutcome> {
        if !self.state.is_active() {
            tracing::debug!("Skipping event flush: integration not configured");
            return None;
        }
        Some(self.events.flush().await)
    }

    async fn heartbeat_tick(&self) -> Option<bool> {
        if !self.state.is_active() {
            tracing::debug!("Skipping heartbeat: integration not configured");
            return None;
        }
        match self.remote.submit_heartbeat().await {
            Ok(()) => {
                self.metrics.record_heartbeat();
                Some(true)
            }
            Err(e) => {
                tracing::warn!("Failed to send plugin events: {}", e);
                Some(false)
            }
        }
    }

    async fn send_telemetry(&self) {
        match self.remote.submit_telemetry(self.telemetry()).await {
            Ok(()) => tracing::debug!("Telemetry sent"),
            Err(e) => tracing::warn!("Failed to send telemetry: {}", e),
        }
    }
}

/// Webstore integration for one game server
///
/// Cheap to clone; clones share all state.
#[derive(Clone)]
pub struct Integration {
    engine: Arc<Engine>,
    scheduler: Arc<Scheduler>,
}

impl Integration {
    /// Wire the engine with an in-memory store cache
    pub fn new(
        config: PlatformConfig,
        remote: Arc<dyn RemoteClient>,
        host: Arc<dyn HostBridge>,
        scheduler: Arc<Scheduler>,
    ) -> Self {
        Self::with_cache(config, remote, host, scheduler, Arc::new(MemoryStoreCache::new()))
    }

    /// Wire the engine with a caller-provided store cache
    pub fn with_cache(
        config: PlatformConfig,
        remote: Arc<dyn RemoteClient>,
        host: Arc<dyn HostBridge>,
        scheduler: Arc<Scheduler>,
        cache: Arc<dyn StoreCache>,
    ) -> Self {
        let metrics = Arc::new(Metrics::new());
        let state = Arc::new(ConfigurationGate::new(config.server.secret_key.clone()));

        let engine = Engine {
            cache: CacheStore::new(
                Arc::clone(&remote),
                cache,
                Arc::clone(&state),
                Arc::clone(&metrics),
            ),
            events: EventBuffer::new(
                Arc::clone(&remote),
                Arc::clone(&state),
                Arc::clone(&metrics),
                config.schedule.event_batch_size,
            ),
            commands: CommandQueue::new(Arc::clone(&host), Arc::clone(&state), Arc::clone(&metrics)),
            config,
            state,
            remote,
            host,
            metrics,
        };

        Self {
            engine: Arc::new(engine),
            scheduler,
        }
    }

    /// Build an integration with its own worker pool, start its timers and connect
    /// in the background if a secret key is configured
    pub fn launch(
        config: PlatformConfig,
        remote: Arc<dyn RemoteClient>,
        host: Arc<dyn HostBridge>,
    ) -> Result<Self, IntegrationError> {
        validate_config(&config)?;

        let scheduler = Arc::new(Scheduler::new(config.workers)?);
        let integration = Self::new(config, remote, host, scheduler);
        integration.start()?;

        if integration.engine.state.has_credential() {
            tracing::info!("Loading store information...");
            let this = integration.clone();
            integration.scheduler.run_now(async move {
                if let Err(e) = this.connect().await {
                    tracing::warn!("Failed to connect to the webstore: {}", e);
                }
            })?;
        } else {
            tracing::warn!("No secret key configured. Set your webstore secret key to connect.");
        }

        Ok(integration)
    }

    /// Register the periodic refresh, heartbeat and flush timers
    ///
    /// The refresh timer fires immediately, which doubles as the startup refresh.
    /// Fails without registering anything if the schedule is invalid.
    pub fn start(&self) -> Result<(), IntegrationError> {
        validate_config(&self.engine.config)?;
        let schedule = &self.engine.config.schedule;

        let engine = Arc::clone(&self.engine);
        self.scheduler.run_periodically(
            "catalog-refresh",
            move || {
                let engine = Arc::clone(&engine);
                async move {
                    engine.refresh_tick().await;
                }
            },
            Duration::ZERO,
            schedule.catalog_refresh_period(),
        )?;

        let engine = Arc::clone(&self.engine);
        self.scheduler.run_periodically(
            "heartbeat",
            move || {
                let engine = Arc::clone(&engine);
                async move {
                    engine.heartbeat_tick().await;
                }
            },
            Duration::ZERO,
            schedule.heartbeat_period(),
        )?;

        let engine = Arc::clone(&self.engine);
        self.scheduler.run_periodically(
            "event-flush",
            move || {
                let engine = Arc::clone(&engine);
                async move {
                    engine.flush_tick().await;
                }
            },
            Duration::ZERO,
            schedule.event_flush_period(),
        )?;

        tracing::info!(
            "Started sync timers: refresh every {}s, heartbeat every {}s, flush every {}s",
            schedule.catalog_refresh_secs,
            schedule.heartbeat_secs,
            schedule.event_flush_secs
        );
        Ok(())
    }

    /// Verify the stored secret key against the webstore
    ///
    /// On success the snapshot is cached, the integration is configured and the
    /// catalog is loaded. A network or server error leaves the gate alone and retries
    /// after `schedule.connect_retry_secs`; any other failure halts the integration.
    /// The error is returned either way.
    pub async fn connect(&self) -> Result<Arc<StoreSnapshot>, IntegrationError> {
        let engine = &self.engine;
        if !engine.state.has_credential() {
            engine.state.halt();
            return Err(ConfigurationError::MissingCredential.into());
        }

        match engine.cache.load_snapshot().await {
            Ok(snapshot) => {
                tracing::info!(
                    "Connected to {} ({}) as server {}",
                    snapshot.store.name,
                    snapshot.store.domain,
                    snapshot.server.name
                );
                self.activate()?;
                engine.cache.refresh_catalog().await;
                Ok(snapshot)
            }
            Err(e) if e.is_transient() => {
                tracing::warn!(
                    "Failed to load server information: {}. Retrying in {}s",
                    e,
                    engine.config.schedule.connect_retry_secs
                );
                self.schedule_reconnect();
                Err(e.into())
            }
            Err(e) => {
                engine.state.halt();
                tracing::warn!(
                    "Failed to load server information: {}. Please check that your secret key is valid.",
                    e
                );
                Err(e.into())
            }
        }
    }

    fn schedule_reconnect(&self) {
        let this = self.clone();
        let retry = self.scheduler.run_after(
            async move {
                if this.is_configured() {
                    return;
                }
                if let Err(e) = this.connect().await {
                    tracing::debug!("Reconnect attempt failed: {}", e);
                }
            },
            self.engine.config.schedule.connect_retry_delay(),
        );

        if let Err(e) = retry {
            tracing::warn!("Could not schedule a reconnect: {}", e);
        }
    }

    /// Store a credential the webstore accepted and mark the integration active
    ///
    /// Sends telemetry and refreshes the cache in the background.
    pub fn configure(&self, credential: &str) -> Result<(), IntegrationError> {
        self.engine.state.set_credential(credential);
        self.activate()?;

        let engine = Arc::clone(&self.engine);
        self.scheduler.run_now(async move {
            engine.cache.refresh().await;
        })?;
        Ok(())
    }

    /// Flip the gate on and, if it was off, fire off telemetry
    fn activate(&self) -> Result<(), IntegrationError> {
        if !self.engine.state.configure()? {
            return Ok(());
        }

        let engine = Arc::clone(&self.engine);
        if let Err(e) = self.scheduler.run_now(async move { engine.send_telemetry().await }) {
            tracing::debug!("Telemetry not sent: {}", e);
        }
        Ok(())
    }

    /// Stop scheduled work from having any effect; timers keep running
    pub fn halt(&self) {
        if self.engine.state.halt() {
            tracing::info!("Webstore integration halted");
        }
    }

    pub fn is_configured(&self) -> bool {
        self.engine.state.is_active()
    }

    pub fn is_online_mode(&self) -> bool {
        self.engine.is_online_mode()
    }

    pub fn cached_snapshot(&self) -> Option<Arc<StoreSnapshot>> {
        self.engine.cache.snapshot()
    }

    pub fn cached_catalog(&self) -> Arc<Vec<Category>> {
        self.engine.cache.catalog()
    }

    /// Game type of the connected store, or an empty string before it loads
    pub fn store_type(&self) -> String {
        self.cached_snapshot()
            .map(|s| s.store.game_type.clone())
            .unwrap_or_default()
    }

    pub fn enqueue_action(&self, player: PlayerKey, action: Action) {
        self.engine.commands.enqueue(player, action);
    }

    /// Join hook: record the join event and deliver anything queued for the player
    ///
    /// Returns the key the player is tracked under. The drain runs on the worker pool.
    pub fn player_joined(&self, uuid: Option<Uuid>, name: &str, ip: Option<String>) -> PlayerKey {
        let engine = &self.engine;
        let key = PlayerKey::resolve(engine.is_online_mode(), uuid, name);

        engine
            .events
            .append(PendingEvent::join(key.clone(), name, ip));

        if engine.commands.has_pending(&key) && engine.host.is_reachable(&key) {
            let engine = Arc::clone(engine);
            let player = key.clone();
            if let Err(e) = self
                .scheduler
                .run_now(async move { engine.commands.on_reachable(&player) })
            {
                tracing::warn!("Could not schedule queued actions for {}: {}", key, e);
            }
        }

        key
    }

    /// Drain the player's queue on the calling thread
    pub fn on_reachable(&self, player: &PlayerKey) -> DrainReport {
        self.engine.commands.on_reachable(player)
    }

    pub async fn create_payment_link(
        &self,
        package_id: u64,
        buyer_name: &str,
    ) -> Result<CheckoutUrl, IntegrationError> {
        if !self.is_configured() {
            return Err(IntegrationError::NotConfigured);
        }
        Ok(self
            .engine
            .remote
            .create_payment_link(package_id, buyer_name)
            .await?)
    }

    /// Create a payment link from a synchronous caller (e.g. a command handler)
    pub fn create_payment_link_blocking(
        &self,
        package_id: u64,
        buyer_name: &str,
    ) -> Result<CheckoutUrl, IntegrationError> {
        let this = self.clone();
        let buyer = buyer_name.to_string();
        self.scheduler
            .run_blocking(async move { this.create_payment_link(package_id, &buyer).await })?
    }

    pub async fn fetch_goals(&self) -> Result<Vec<Goal>, IntegrationError> {
        if !self.is_configured() {
            return Err(IntegrationError::NotConfigured);
        }
        Ok(self.engine.remote.fetch_goals().await?)
    }

    /// Goals that are not disabled
    pub async fn active_goals(&self) -> Result<Vec<Goal>, IntegrationError> {
        let goals = self.fetch_goals().await?;
        Ok(goals.into_iter().filter(Goal::is_visible).collect())
    }

    pub fn active_goals_blocking(&self) -> Result<Vec<Goal>, IntegrationError> {
        let this = self.clone();
        self.scheduler
            .run_blocking(async move { this.active_goals().await })?
    }

    /// Run one refresh tick now; `None` when gated off
    pub async fn refresh_tick(&self) -> Option<RefreshOutcome> {
        self.engine.refresh_tick().await
    }

    /// Run one flush tick now; `None` when gated off
    pub async fn flush_tick(&self) -> Option<FlushOutcome> {
        self.engine.flush_tick().await
    }

    /// Run one heartbeat tick now; `None` when gated off
    pub async fn heartbeat_tick(&self) -> Option<bool> {
        self.engine.heartbeat_tick().await
    }

    pub fn pending_events(&self) -> Vec<PendingEvent> {
        self.engine.events.pending()
    }

    pub fn pending_actions(&self, player: &PlayerKey) -> usize {
        self.engine.commands.pending_for(player)
    }

    pub fn pending_players(&self) -> Vec<PlayerKey> {
        self.engine.commands.pending_players()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StateChange> {
        self.engine.state.subscribe()
    }

    pub fn metrics(&self) -> &Metrics {
        &self.engine.metrics
    }

    pub fn config(&self) -> &PlatformConfig {
        &self.engine.config
    }

    /// Stop the timers and log the metrics summary. Buffered events and queued
    /// actions are lost.
    pub fn shutdown(&self) {
        let outstanding = self.engine.events.len();
        if outstanding > 0 {
            tracing::warn!("Shutting down with {} undelivered events", outstanding);
        }
        self.scheduler.shutdown();
        self.engine.metrics.log_summary();
    }
}
