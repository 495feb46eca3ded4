use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::Mutex;

type CleanupFn = Box<dyn Fn() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Process-wide singleton with at-most-once `InitiateShutdown` semantics
/// (spec §4.9, component C9). SIGINT/SIGTERM handlers, top-level exception
/// branches, and a window-close callback all converge here.
pub struct ShutdownCoordinator {
    hooks: Mutex<Vec<(String, CleanupFn)>>,
    initiated: Mutex<bool>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        ShutdownCoordinator {
            hooks: Mutex::new(Vec::new()),
            initiated: Mutex::new(false),
        }
    }

    /// Registers a cleanup coroutine. Cleanups run in registration order
    /// on the first (and only) `initiate_shutdown` call.
    pub async fn register_cleanup<F, Fut>(&self, name: impl Into<String>, cleanup: F)
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.hooks
            .lock()
            .await
            .push((name.into(), Box::new(move || Box::pin(cleanup()))));
    }

    /// Runs every registered cleanup in order, isolated from one another's
    /// panics, exactly once. Returns `false` on any call after the first.
    pub async fn initiate_shutdown(&self, source: &str) -> bool {
        {
            let mut initiated = self.initiated.lock().await;
            if *initiated {
                return false;
            }
            *initiated = true;
        }
        log::info!("shutdown initiated by {source}");

        let hooks = std::mem::take(&mut *self.hooks.lock().await);
        for (name, cleanup) in hooks {
            if AssertUnwindSafe(cleanup()).catch_unwind().await.is_err() {
                log::warn!("cleanup '{name}' panicked during shutdown, continuing");
            }
        }
        true
    }

    pub async fn is_complete(&self) -> bool {
        *self.initiated.lock().await
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

/// Spawns a task that calls `initiate_shutdown("signal")` on SIGINT or
/// SIGTERM (spec §6 "Signals"). On platforms with no signal loop support
/// this is simply never spawned by the caller.
#[cfg(unix)]
pub fn install_signal_handlers(coordinator: Arc<ShutdownCoordinator>) {
    tokio::spawn(async move {
        let mut terminate = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(stream) => stream,
            Err(err) => {
                log::warn!("failed to install SIGTERM handler: {err}");
                return;
            }
        };
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                if result.is_err() {
                    log::warn!("failed to listen for SIGINT");
                }
            }
            _ = terminate.recv() => {}
        }
        coordinator.initiate_shutdown("signal").await;
    });
}
