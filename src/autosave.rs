//! Autosave worker
//!
//! A background thread that flushes a store (or every store of a manager)
//! on two cadences:
//! - every `autosave_interval`: save unconditionally, bounding data loss on
//!   abnormal termination to one interval
//! - every `flush_delay`: save only what changed since the last save
//!
//! Failed saves are logged and retried on the next tick; memory stays
//! authoritative.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Sender};
use crossbeam::select;

use crate::config::Config;
use crate::error::{Result, StoreError};
use crate::manager::StoreManager;
use crate::store::Store;

/// Something the autosaver can flush
pub trait Persist: Send + Sync {
    /// Write current state durably
    fn persist(&self) -> Result<()>;

    /// Write only what changed since the last save
    fn persist_dirty(&self) -> Result<()> {
        if self.is_dirty() {
            self.persist()
        } else {
            Ok(())
        }
    }

    /// True if memory is ahead of disk
    fn is_dirty(&self) -> bool;

    /// Name used in log lines
    fn describe(&self) -> String;
}

impl Persist for Store {
    fn persist(&self) -> Result<()> {
        self.save()
    }

    fn is_dirty(&self) -> bool {
        Store::is_dirty(self)
    }

    fn describe(&self) -> String {
        format!("store '{}'", self.name())
    }
}

impl Persist for StoreManager {
    fn persist(&self) -> Result<()> {
        self.save_all()
    }

    fn persist_dirty(&self) -> Result<()> {
        self.save_dirty()
    }

    fn is_dirty(&self) -> bool {
        StoreManager::is_dirty(self)
    }

    fn describe(&self) -> String {
        format!("stores in {}", self.data_dir().display())
    }
}

/// Handle to a running autosave thread
///
/// Dropping the handle stops the thread without a final flush; call
/// [`Autosaver::shutdown`] for that.
pub struct Autosaver {
    target: Arc<dyn Persist>,
    shutdown_tx: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Autosaver {
    /// Start autosaving `target` with the cadences from `config`
    pub fn from_config<P: Persist + 'static>(target: Arc<P>, config: &Config) -> Result<Self> {
        Self::spawn(target, config.autosave_interval, config.flush_delay)
    }

    /// Start autosaving `target`
    ///
    /// Both cadences must be non-zero.
    pub fn spawn<P: Persist + 'static>(
        target: Arc<P>,
        interval: Duration,
        flush_delay: Option<Duration>,
    ) -> Result<Self> {
        if interval.is_zero() {
            return Err(StoreError::Config(
                "autosave interval must be non-zero".to_string(),
            ));
        }
        if matches!(flush_delay, Some(d) if d.is_zero()) {
            return Err(StoreError::Config("flush delay must be non-zero".to_string()));
        }

        let target: Arc<dyn Persist> = target;
        let (shutdown_tx, shutdown_rx) = channel::bounded::<()>(1);

        let worker_target = Arc::clone(&target);
        let handle = thread::Builder::new()
            .name("nanostore-autosave".to_string())
            .spawn(move || {
                let autosave = channel::tick(interval);
                let flush = match flush_delay {
                    Some(delay) => channel::tick(delay),
                    None => channel::never(),
                };

                tracing::debug!(
                    "Autosave started for {} (every {:?}, flush delay {:?})",
                    worker_target.describe(),
                    interval,
                    flush_delay
                );

                loop {
                    select! {
                        // Message or disconnect both mean stop
                        recv(shutdown_rx) -> _ => break,
                        recv(autosave) -> _ => {
                            report(&*worker_target, "autosave", worker_target.persist());
                        }
                        recv(flush) -> _ => {
                            if worker_target.is_dirty() {
                                report(&*worker_target, "flush", worker_target.persist_dirty());
                            }
                        }
                    }
                }

                tracing::debug!("Autosave stopped for {}", worker_target.describe());
            })?;

        Ok(Self {
            target,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Stop the thread and flush a final time
    pub fn shutdown(mut self) -> Result<()> {
        self.stop();
        tracing::info!("Final save of {}", self.target.describe());
        self.target.persist()
    }

    fn stop(&mut self) {
        // Dropping the sender disconnects the channel and wakes the worker
        drop(self.shutdown_tx.take());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("Autosave thread panicked");
            }
        }
    }
}

impl Drop for Autosaver {
    fn drop(&mut self) {
        self.stop();
    }
}

fn report(target: &dyn Persist, reason: &str, outcome: Result<()>) {
    match outcome {
        Ok(()) => tracing::trace!("{} of {} complete", reason, target.describe()),
        Err(e) => tracing::warn!(
            "{} of {} failed, will retry: {}",
            reason,
            target.describe(),
            e
        ),
    }
}
