//! Background task lifecycle.
//!
//! Provides [`Shutdown`] (a cloneable stop trigger), [`ShutdownSignal`]
//! (the receiving side awaited inside a task) and [`BackgroundTask`], which
//! ties a spawned task to its trigger so that stopping it both cancels and
//! awaits the task.
//!
//! # Usage
//!
//! ```rust
//! use switchyard_core::lifecycle::BackgroundTask;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let task = BackgroundTask::spawn("ticker", |mut signal| async move {
//!     signal.wait().await;
//! });
//! assert!(task.is_running());
//! task.stop().await;
//! # }
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

// ============================================================================
// Shutdown
// ============================================================================

/// Cloneable stop trigger shared by everything that must observe shutdown.
///
/// Cheap to clone (Arc internals). Triggering is idempotent.
#[derive(Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<bool>>,
}

impl Shutdown {
    /// Create an untriggered shutdown trigger.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Fire the trigger. Every subscribed [`ShutdownSignal`] resolves.
    pub fn trigger(&self) {
        self.tx.send_replace(true);
    }

    /// Returns `true` once [`trigger`](Self::trigger) has been called.
    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }

    /// Obtain a signal that resolves when the trigger fires.
    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Shutdown {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shutdown")
            .field("triggered", &self.is_triggered())
            .finish()
    }
}

/// Receiving side of a [`Shutdown`] trigger.
#[derive(Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Returns `true` if the trigger has fired.
    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }

    /// Wait until the trigger fires.
    ///
    /// A dropped trigger counts as fired, so a task can never outlive
    /// the owner of its [`Shutdown`].
    pub async fn wait(&mut self) {
        let _ = self.rx.wait_for(|triggered| *triggered).await;
    }

    /// Sleep for `duration`, returning `false` early if shutdown fires first.
    pub async fn sleep(&mut self, duration: Duration) -> bool {
        tokio::select! {
            _ = tokio::time::sleep(duration) => true,
            _ = self.wait() => false,
        }
    }
}

impl fmt::Debug for ShutdownSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShutdownSignal")
            .field("triggered", &self.is_triggered())
            .finish()
    }
}

// ============================================================================
// BackgroundTask
// ============================================================================

/// A spawned task paired with the trigger that stops it.
///
/// Construction of the owning component never spawns anything; callers
/// create a `BackgroundTask` from an explicit start method and keep it until
/// they call [`stop`](Self::stop).
pub struct BackgroundTask {
    name: String,
    shutdown: Shutdown,
    join: JoinHandle<()>,
}

impl BackgroundTask {
    /// Spawn `body` on the current runtime, handing it a shutdown signal.
    pub fn spawn<F, Fut>(name: impl Into<String>, body: F) -> Self
    where
        F: FnOnce(ShutdownSignal) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let name = name.into();
        let shutdown = Shutdown::new();
        let join = tokio::spawn(body(shutdown.subscribe()));
        log::info!("Background task '{name}' started");
        Self {
            name,
            shutdown,
            join,
        }
    }

    /// Task name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` while the task has not finished.
    pub fn is_running(&self) -> bool {
        !self.join.is_finished()
    }

    /// Trigger shutdown and wait for the task to exit.
    ///
    /// A panic inside the task is logged and swallowed; the task is
    /// finished either way when this returns.
    pub async fn stop(self) {
        self.shutdown.trigger();
        match self.join.await {
            Ok(()) => log::info!("Background task '{}' stopped", self.name),
            Err(e) => log::warn!("Background task '{}' ended abnormally: {e}", self.name),
        }
    }
}

impl fmt::Debug for BackgroundTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackgroundTask")
            .field("name", &self.name)
            .field("running", &self.is_running())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
