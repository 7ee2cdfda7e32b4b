//! Cancellable handles for live data listeners.

use std::future::Future;

use tokio::task::JoinHandle;
use tracing::debug;

/// Owns a background listener task. Dropping the handle tears the listener down.
#[derive(Debug)]
pub struct Subscription {
    label: &'static str,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    /// Spawn `listener` onto the runtime and return the handle that owns it.
    pub fn spawn<F>(label: &'static str, listener: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        debug!(target = "sithai::subscription", label, "listener started");
        Self {
            label,
            task: Some(tokio::spawn(listener)),
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// `true` while the listener task is still running.
    pub fn is_active(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stop the listener and wait for it to wind down.
    pub async fn unsubscribe(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
            debug!(
                target = "sithai::subscription",
                label = self.label,
                "listener stopped"
            );
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn unsubscribe_stops_the_listener() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();
        let subscription = Subscription::spawn("ticker", async move {
            loop {
                counter.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(subscription.is_active());
        subscription.unsubscribe().await;

        let after_stop = ticks.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(ticks.load(Ordering::SeqCst), after_stop);
    }

    #[tokio::test]
    async fn drop_aborts_the_listener() {
        let (tx, mut rx) = tokio::sync::mpsc::channel::<()>(1);
        let subscription = Subscription::spawn("holder", async move {
            let _keep = tx;
            std::future::pending::<()>().await;
        });

        drop(subscription);
        assert!(rx.recv().await.is_none());
    }
}
