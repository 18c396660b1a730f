//! Generic ticker-driven scheduler and command-bus listener.
//!
//! A [`Scheduler`] owns one periodic background task that invokes a drain
//! closure on each tick. It does not know what a "drain" means — that is
//! supplied by the caller as an async closure — so the same type drives
//! both the delivery and the retry pipelines. [`CommandListener`] forwards
//! external start/stop commands to a set of [`Controllable`] targets.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// A target that can be started and stopped by a command bus.
#[async_trait]
pub trait Controllable: Send + Sync {
    async fn start(&self);
    async fn stop(&self);
}

type DrainFuture = Pin<Box<dyn Future<Output = ()> + Send>>;
type DrainFn = dyn Fn() -> DrainFuture + Send + Sync;

/// Idle/running ticker with idempotent `start`/`stop`.
///
/// One in-flight drain, started before `stop()`, is always allowed to run
/// to completion; `stop()` only prevents the *next* tick from firing.
pub struct Scheduler {
    name: &'static str,
    interval: Duration,
    enabled: bool,
    drain: Arc<DrainFn>,
    running: Arc<AtomicBool>,
    handle: Mutex<Option<(JoinHandle<()>, watch::Sender<bool>)>>,
}

impl Scheduler {
    pub fn new<F, Fut>(name: &'static str, interval: Duration, enabled: bool, drain: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self {
            name,
            interval,
            enabled,
            drain: Arc::new(move || Box::pin(drain()) as DrainFuture),
            running: Arc::new(AtomicBool::new(false)),
            handle: Mutex::new(None),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Controllable for Scheduler {
    async fn start(&self) {
        if !self.enabled {
            warn!(scheduler = self.name, "scheduler disabled by config, ignoring start");
            return;
        }
        if self.running.swap(true, Ordering::SeqCst) {
            warn!(scheduler = self.name, "scheduler already running");
            return;
        }

        let (tx, mut rx) = watch::channel(true);
        let drain = self.drain.clone();
        let running = self.running.clone();
        let interval_dur = self.interval;
        let name = self.name;

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval_dur);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await; // first tick fires immediately; skip it

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        if !running.load(Ordering::SeqCst) {
                            break;
                        }
                        debug!(scheduler = name, "tick");
                        (drain)().await;
                    }
                    _ = rx.changed() => {
                        break;
                    }
                }
            }
            info!(scheduler = name, "tick loop exited");
        });

        *self.handle.lock().await = Some((task, tx));
        info!(scheduler = self.name, "scheduler started");
    }

    async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            warn!(scheduler = self.name, "scheduler is not running");
            return;
        }
        if let Some((_task, tx)) = self.handle.lock().await.take() {
            let _ = tx.send(false);
        }
        info!(scheduler = self.name, "scheduler stopped");
    }
}

/// A source of command-bus payloads, abstracted over the underlying pub/sub
/// transport (the scheduler crate has no opinion on what that transport is).
#[async_trait]
pub trait CommandSource: Send {
    async fn recv(&mut self) -> Result<String, String>;
}

/// Subscribes to a [`CommandSource`] and forwards `start`/`stop` payloads to
/// every registered [`Controllable`] target. Unknown payloads are logged and
/// ignored; receive errors (other than shutdown) are retried after 1s.
pub struct CommandListener {
    targets: Vec<Arc<dyn Controllable>>,
}

impl CommandListener {
    pub fn new(targets: Vec<Arc<dyn Controllable>>) -> Self {
        Self { targets }
    }

    pub async fn listen(&self, mut source: impl CommandSource, mut shutdown: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    info!("command listener exiting due to shutdown");
                    return;
                }
                result = source.recv() => {
                    match result {
                        Ok(payload) => self.dispatch(&payload).await,
                        Err(err) => {
                            warn!(error = %err, "error receiving command, retrying in 1s");
                            tokio::time::sleep(Duration::from_secs(1)).await;
                        }
                    }
                }
            }
        }
    }

    async fn dispatch(&self, payload: &str) {
        info!(payload, "received scheduler command");
        match payload {
            "start" => {
                for target in &self.targets {
                    target.start().await;
                }
            }
            "stop" => {
                for target in &self.targets {
                    target.stop().await;
                }
            }
            other => {
                warn!(command = other, "unknown command, ignoring");
            }
        }
    }
}
