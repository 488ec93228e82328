use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::{Builder, Handle, Runtime};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Errors that can occur when handing work to the [`Scheduler`]
#[derive(Error, Debug)]
pub enum SchedulerError {
    #[error("Scheduler has been shut down")]
    ShutDown,

    #[error("Periodic task '{0}' needs a period greater than zero")]
    InvalidPeriod(&'static str),

    #[error("Blocking call made from a worker thread")]
    BlockingInAsyncContext,

    #[error("Task did not complete: {0}")]
    TaskFailed(String),

    #[error("Failed to start worker pool: {0}")]
    Runtime(#[from] std::io::Error),
}

/// Runs engine work off the host's main thread
///
/// Wraps a tokio worker pool. Every periodic registration gets its own timer
/// task and every tick body is spawned separately, so a slow or panicking body
/// never delays another registration's ticks.
///
/// On [`shutdown()`](Self::shutdown) new work is refused, periodic timers stop,
/// and in-flight tasks are abandoned.
pub struct Scheduler {
    handle: Handle,

    /// Present when the scheduler owns its worker pool
    runtime: Mutex<Option<Runtime>>,

    accepting: AtomicBool,

    /// Flipped to `true` once to stop every periodic timer
    shutdown_tx: watch::Sender<bool>,
}

impl Scheduler {
    /// Create a scheduler with its own multi-threaded worker pool
    pub fn new(worker_threads: usize) -> Result<Self, SchedulerError> {
        let runtime = Builder::new_multi_thread()
            .enable_all()
            .worker_threads(worker_threads.max(1))
            .thread_name("storelink-worker")
            .build()?;

        tracing::info!(
            "Scheduler worker pool initialized with {} threads",
            worker_threads.max(1)
        );

        let handle = runtime.handle().clone();
        Ok(Self::build(handle, Some(runtime)))
    }

    /// Create a scheduler that spawns onto an existing runtime
    pub fn with_handle(handle: Handle) -> Self {
        Self::build(handle, None)
    }

    fn build(handle: Handle, runtime: Option<Runtime>) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            handle,
            runtime: Mutex::new(runtime),
            accepting: AtomicBool::new(true),
            shutdown_tx,
        }
    }

    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    pub fn is_running(&self) -> bool {
        self.accepting.load(Ordering::Acquire)
    }

    fn ensure_running(&self) -> Result<(), SchedulerError> {
        if self.is_running() {
            Ok(())
        } else {
            Err(SchedulerError::ShutDown)
        }
    }

    /// Run a task as soon as a worker is free
    pub fn run_now<F>(&self, task: F) -> Result<JoinHandle<F::Output>, SchedulerError>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.ensure_running()?;
        Ok(self.handle.spawn(task))
    }

    /// Run a task once after `delay`
    pub fn run_after<F>(&self, task: F, delay: Duration) -> Result<JoinHandle<F::Output>, SchedulerError>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.ensure_running()?;
        Ok(self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            task.await
        }))
    }

    /// Run `task` every `period`, starting after `initial_delay`
    ///
    /// The returned handle resolves once the scheduler shuts down. A zero `period`
    /// is rejected.
    pub fn run_periodically<T, Fut>(
        &self,
        name: &'static str,
        task: T,
        initial_delay: Duration,
        period: Duration,
    ) -> Result<JoinHandle<()>, SchedulerError>
    where
        T: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.ensure_running()?;
        if period.is_zero() {
            return Err(SchedulerError::InvalidPeriod(name));
        }

        let mut shutdown_rx = self.shutdown_tx.subscribe();
        let handle = self.handle.clone();

        tracing::debug!(
            "Registered periodic task '{}' (initial delay {:?}, period {:?})",
            name,
            initial_delay,
            period
        );

        Ok(self.handle.spawn(async move {
            let mut interval = tokio::time::interval_at(Instant::now() + initial_delay, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        handle.spawn(task());
                    }
                    _ = shutdown_rx.changed() => {
                        tracing::debug!("Periodic task '{}' stopped", name);
                        break;
                    }
                }
            }
        }))
    }

    /// Run a task on the worker pool and wait for its result
    ///
    /// For synchronous callers on the host's own threads only; calling this from a
    /// worker thread would block the pool and is rejected.
    pub fn run_blocking<F>(&self, task: F) -> Result<F::Output, SchedulerError>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        if Handle::try_current().is_ok() {
            return Err(SchedulerError::BlockingInAsyncContext);
        }

        let (tx, rx) = oneshot::channel();
        self.run_now(async move {
            if tx.send(task.await).is_err() {
                tracing::debug!("Blocking caller stopped waiting for its result");
            }
        })?;

        rx.blocking_recv()
            .map_err(|_| SchedulerError::TaskFailed("task dropped before completing".to_string()))
    }

    /// Wait `delay`, then run a task on the worker pool and wait for its result
    pub fn run_blocking_after<F>(&self, task: F, delay: Duration) -> Result<F::Output, SchedulerError>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        self.run_blocking(async move {
            tokio::time::sleep(delay).await;
            task.await
        })
    }

    /// Stop accepting work and stop every periodic timer
    ///
    /// In-flight tasks are not awaited.
    pub fn shutdown(&self) {
        if !self.accepting.swap(false, Ordering::AcqRel) {
            return;
        }

        let _ = self.shutdown_tx.send(true);

        let runtime = self
            .runtime
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(runtime) = runtime {
            runtime.shutdown_background();
        }

        tracing::info!("Scheduler shut down");
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}
