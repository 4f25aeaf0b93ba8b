//! Background Expiry Sweeper
//!
//! This module implements a background thread that periodically scans the
//! keyspace for expired keys and removes them. This is "active expiry" as
//! opposed to "lazy expiry" (which happens on access).
//!
//! ## Why Do We Need This?
//!
//! Lazy expiry is efficient but has a problem: a key that expires and is
//! never accessed again would stay in memory forever, and its `Expired`
//! notification would never fire. The sweeper reaps those keys and is the
//! only path that enqueues expiry notifications.
//!
//! ## Design
//!
//! The engine is embedded in a host process, so the sweeper is a plain OS
//! thread rather than an async task: the host owes us no runtime. Shutdown
//! is an mpsc channel; dropping the handle (or calling [`ExpirySweeper::stop`])
//! wakes the thread and joins it.
//!
//! ## Adaptive Frequency
//!
//! If many keys are expiring, the sweeper runs more frequently.
//! If few keys are expiring, it backs off to save CPU.

use crate::storage::CacheEngine;
use std::sync::mpsc;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tracing::{debug, info, trace};

/// Configuration for the expiry sweeper.
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// Base interval between sweeps (default: 25ms)
    pub base_interval: Duration,

    /// Minimum interval between sweeps (default: 5ms)
    pub min_interval: Duration,

    /// Maximum interval between sweeps (default: 1s)
    pub max_interval: Duration,

    /// If this fraction of live keys expired in a sweep, speed up
    pub speedup_threshold: f64,

    /// If this fraction of live keys expired in a sweep, slow down
    pub slowdown_threshold: f64,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            base_interval: Duration::from_millis(25),
            min_interval: Duration::from_millis(5),
            max_interval: Duration::from_secs(1),
            speedup_threshold: 0.25,  // Speed up if >25% of keys expired
            slowdown_threshold: 0.01, // Slow down if <1% of keys expired
        }
    }
}

/// A handle to the running expiry sweeper.
///
/// When this handle is dropped, the sweeper thread is stopped and joined.
#[derive(Debug)]
pub struct ExpirySweeper {
    shutdown_tx: mpsc::Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl ExpirySweeper {
    /// Starts the expiry sweeper on a background thread.
    ///
    /// # Example
    ///
    /// ```
    /// use embercache::storage::{CacheEngine, ExpirySweeper, SweepConfig};
    /// use std::sync::Arc;
    ///
    /// let engine = Arc::new(CacheEngine::new());
    /// let sweeper = ExpirySweeper::start(Arc::clone(&engine), SweepConfig::default());
    ///
    /// // Sweeper runs in the background...
    ///
    /// // Dropping the handle stops and joins it
    /// drop(sweeper);
    /// ```
    pub fn start(engine: Arc<CacheEngine>, config: SweepConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = mpsc::channel();

        let handle = std::thread::Builder::new()
            .name("embercache-sweeper".to_string())
            .spawn(move || sweeper_loop(engine, config, shutdown_rx))
            .expect("failed to spawn sweeper thread");

        info!("Background expiry sweeper started");

        Self {
            shutdown_tx,
            handle: Some(handle),
        }
    }

    /// Stops the expiry sweeper and joins its thread.
    ///
    /// Called automatically when the handle is dropped.
    pub fn stop(&mut self) {
        let _ = self.shutdown_tx.send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
            info!("Background expiry sweeper stopped");
        }
    }
}

impl Drop for ExpirySweeper {
    fn drop(&mut self) {
        self.stop();
    }
}

/// The main sweeper loop.
fn sweeper_loop(engine: Arc<CacheEngine>, config: SweepConfig, shutdown_rx: mpsc::Receiver<()>) {
    let mut current_interval = config.base_interval;

    loop {
        // Sleeping on the channel doubles as the shutdown wakeup
        match shutdown_rx.recv_timeout(current_interval) {
            Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => {
                debug!("Expiry sweeper received shutdown signal");
                return;
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
        }

        let keys_before = engine.len();
        let expired = engine.sweep_expired();

        // Adjust interval based on the observed expiry rate
        if keys_before > 0 {
            let expiry_rate = expired as f64 / keys_before as f64;

            if expiry_rate > config.speedup_threshold {
                current_interval = (current_interval / 2).max(config.min_interval);
                debug!(
                    expired,
                    rate = %format!("{:.2}%", expiry_rate * 100.0),
                    new_interval_ms = current_interval.as_millis(),
                    "High expiry rate, speeding up sweeper"
                );
            } else if expiry_rate < config.slowdown_threshold && expired == 0 {
                current_interval = (current_interval * 2).min(config.max_interval);
                trace!(
                    new_interval_ms = current_interval.as_millis(),
                    "Low expiry rate, slowing down sweeper"
                );
            }
        }
    }
}

/// Starts the expiry sweeper with default configuration.
///
/// Convenience for embedders that do not tune the interval.
pub fn start_expiry_sweeper(engine: Arc<CacheEngine>) -> ExpirySweeper {
    ExpirySweeper::start(engine, SweepConfig::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::notify::NotificationKind;
    use bytes::Bytes;
    use std::time::Duration;

    #[test]
    fn sweeper_cleans_expired_keys_and_notifies() {
        let engine = Arc::new(CacheEngine::new());

        for i in 0..10 {
            engine.set_with_ttl(
                Bytes::from(format!("key{}", i)),
                Bytes::from("value"),
                Duration::from_millis(40),
            );
        }
        engine.set(Bytes::from("persistent"), Bytes::from("value"));
        assert_eq!(engine.len(), 11);

        let config = SweepConfig {
            base_interval: Duration::from_millis(10),
            ..Default::default()
        };
        let _sweeper = ExpirySweeper::start(Arc::clone(&engine), config);

        std::thread::sleep(Duration::from_millis(250));

        assert_eq!(engine.len(), 1);
        assert!(engine.get(b"persistent").is_some());

        // Each reaped key produced one Expired notification
        let mut seen = 0;
        while let Some(n) = engine.try_poll_notification() {
            assert_eq!(n.kind, NotificationKind::Expired);
            seen += 1;
        }
        assert_eq!(seen, 10);
    }

    #[test]
    fn sweeper_stops_on_drop() {
        let engine = Arc::new(CacheEngine::new());

        let config = SweepConfig {
            base_interval: Duration::from_millis(10),
            ..Default::default()
        };

        {
            let _sweeper = ExpirySweeper::start(Arc::clone(&engine), config);
            std::thread::sleep(Duration::from_millis(50));
            // Sweeper is stopped and joined here
        }

        engine.set_with_ttl(
            Bytes::from("key"),
            Bytes::from("value"),
            Duration::from_millis(10),
        );
        std::thread::sleep(Duration::from_millis(60));

        // No sweeper ran, so no notification was enqueued; lazy expiry
        // still answers the read correctly
        assert!(engine.get(b"key").is_none());
        assert!(engine.try_poll_notification().is_none());
    }

    #[test]
    fn explicit_stop_is_idempotent() {
        let engine = Arc::new(CacheEngine::new());
        let mut sweeper = ExpirySweeper::start(Arc::clone(&engine), SweepConfig::default());
        sweeper.stop();
        sweeper.stop();
    }
}
