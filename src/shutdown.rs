//! Shutdown coordinator singleton: signals every wait-state activation on
//! `SIGINT`/`SIGTERM` (spec.md §5).

use std::sync::Arc;

use tokio::sync::Notify;

pub struct ShutdownCoordinator {
    notify: Arc<Notify>,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self {
            notify: Arc::new(Notify::new()),
        }
    }

    /// Installs `SIGINT`/`SIGTERM` hooks once and returns a handle whose
    /// `wait()` resolves when either fires. Safe to call from multiple
    /// concurrent `Wait`/`Keepalive`/`Block` activations.
    pub fn signal_handle(&self) -> Arc<Notify> {
        self.notify.clone()
    }

    pub async fn install_signal_hooks(&self) {
        let notify = self.notify.clone();
        tokio::spawn(async move {
            let mut sigterm = match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(_) => return,
            };
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = sigterm.recv() => {}
            }
            notify.notify_waiters();
        });
    }

    pub fn trigger(&self) {
        self.notify.notify_waiters();
    }

    pub async fn wait(&self) {
        self.notify.notified().await;
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
