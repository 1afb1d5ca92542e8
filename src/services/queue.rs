use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, anyhow};
use log::{debug, info};
use tokio::runtime::Handle;

use super::tuning::AdaptiveConfigTuner;

/// Fire-and-forget sink for post-settlement tuning requests.
pub trait TuningQueue: Send + Sync {
    fn enqueue(&self, uid: &str) -> Result<()>;
}

/// Runs each tuning request on tokio's blocking pool.
pub struct SpawnedTuningQueue {
    tuner: Arc<AdaptiveConfigTuner>,
    handle: Handle,
}

impl SpawnedTuningQueue {
    /// Must be called from inside a tokio runtime.
    pub fn new(tuner: Arc<AdaptiveConfigTuner>) -> Result<Self> {
        let handle = Handle::try_current().context("Tuning queue requires a tokio runtime")?;
        Ok(Self { tuner, handle })
    }
}

impl TuningQueue for SpawnedTuningQueue {
    fn enqueue(&self, uid: &str) -> Result<()> {
        let tuner = Arc::clone(&self.tuner);
        let uid = uid.to_string();

        self.handle.spawn_blocking(move || {
            let outcome = tuner.apply(&uid);
            if outcome.updated {
                info!("Background tuning updated {}: {}", uid, outcome.changes.join(", "));
            } else {
                debug!("Background tuning left {} unchanged: {}", uid, outcome.reason);
            }
        });

        Ok(())
    }
}

/// Collects requests for the caller to run later; used by the CLI and tests.
#[derive(Default)]
pub struct DeferredTuningQueue {
    pending: Mutex<Vec<String>>,
}

impl DeferredTuningQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn drain(&self) -> Result<Vec<String>> {
        let mut pending = self
            .pending
            .lock()
            .map_err(|_| anyhow!("Tuning queue lock poisoned"))?;
        Ok(std::mem::take(&mut *pending))
    }
}

impl TuningQueue for DeferredTuningQueue {
    fn enqueue(&self, uid: &str) -> Result<()> {
        let mut pending = self
            .pending
            .lock()
            .map_err(|_| anyhow!("Tuning queue lock poisoned"))?;
        if !pending.iter().any(|queued| queued == uid) {
            pending.push(uid.to_string());
        }
        Ok(())
    }
}
