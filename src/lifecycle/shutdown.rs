//! Shutdown coordination for the exporter.

use tokio::sync::broadcast;

/// Coordinator for graceful shutdown.
///
/// Provides a broadcast channel that the serve loop subscribes to. Cloning
/// the coordinator shares the same channel, so an embedding application can
/// keep one handle and give another to the helper.
#[derive(Clone)]
pub struct Shutdown {
    /// Broadcast channel sender.
    tx: broadcast::Sender<()>,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self { tx }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        let _ = self.tx.send(());
    }

    /// Get the number of active subscribers (serve loops still running).
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

type Hook = Box<dyn FnOnce() + Send + 'static>;

/// Ordered list of cleanup actions owned by a listener set.
///
/// Every hook runs at most once: [`ShutdownHooks::run`] drains the list and
/// dropping the list runs whatever is left. Startup failures, signals and
/// normal returns all end up on one of those two paths.
#[derive(Default)]
pub struct ShutdownHooks {
    hooks: Vec<(String, Hook)>,
}

impl ShutdownHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a named cleanup action.
    pub fn register<F>(&mut self, name: impl Into<String>, hook: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.hooks.push((name.into(), Box::new(hook)));
    }

    /// Run and discard all registered hooks, in registration order.
    pub fn run(&mut self) {
        for (name, hook) in self.hooks.drain(..) {
            tracing::debug!(hook = %name, "Running shutdown hook");
            hook();
        }
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }
}

impl Drop for ShutdownHooks {
    fn drop(&mut self) {
        self.run();
    }
}

impl std::fmt::Debug for ShutdownHooks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.hooks.iter().map(|(name, _)| name))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn hooks_run_exactly_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut hooks = ShutdownHooks::new();
        let c = calls.clone();
        hooks.register("count", move || {
            c.fetch_add(1, Ordering::SeqCst);
        });

        hooks.run();
        hooks.run();
        drop(hooks);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn hooks_run_on_drop() {
        let calls = Arc::new(AtomicUsize::new(0));
        {
            let mut hooks = ShutdownHooks::new();
            for _ in 0..3 {
                let c = calls.clone();
                hooks.register("count", move || {
                    c.fetch_add(1, Ordering::SeqCst);
                });
            }
            assert_eq!(hooks.len(), 3);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn trigger_reaches_subscribers() {
        let shutdown = Shutdown::new();
        let mut rx = shutdown.clone().subscribe();
        assert_eq!(shutdown.receiver_count(), 1);

        shutdown.trigger();
        assert!(rx.recv().await.is_ok());
    }
}
