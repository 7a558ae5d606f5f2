//! Periodic motion detection.
//!
//! A single repeating job polls the motion sensor and, on a positive
//! reading, runs the same capture-and-send routine as the photo command.

use crate::capture::{CaptureReason, Snapshotter};
use crate::hardware::MotionSensor;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Result of one detection tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// No motion since the previous tick
    Clear,
    /// Motion detected and the photo delivered
    Captured,
    /// Motion detected but capture or delivery failed
    CaptureFailed,
    /// The sensor could not be read, counted as no motion
    SensorFault,
}

/// One detection check, shared with the spawned job
struct DetectionTick {
    sensor: Arc<dyn MotionSensor>,
    snapshots: Arc<Snapshotter>,
    owner_chat: i64,
}

impl DetectionTick {
    async fn run(&self) -> TickOutcome {
        match self.sensor.poll() {
            Ok(true) => {
                info!("Alarm! Motion detected!");
                match self
                    .snapshots
                    .capture_and_send(self.owner_chat, CaptureReason::Motion)
                    .await
                {
                    Ok(_) => TickOutcome::Captured,
                    Err(e) => {
                        error!("Alarm capture failed: {e}");
                        TickOutcome::CaptureFailed
                    }
                }
            }
            Ok(false) => {
                debug!("No movement detected. All clear.");
                TickOutcome::Clear
            }
            Err(e) => {
                warn!("Motion sensor read failed, assuming no motion: {e}");
                TickOutcome::SensorFault
            }
        }
    }
}

struct DetectionJob {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

/// Enable/disable toggle around the periodic detection job.
///
/// At most one job is live at a time: `start` on a running scheduler is a
/// no-op, and `stop` cancels the job before its next tick without
/// interrupting a tick already in progress.
pub struct DetectionScheduler {
    tick: Arc<DetectionTick>,
    period: Duration,
    job: Mutex<Option<DetectionJob>>,
}

impl DetectionScheduler {
    /// Create a disabled scheduler
    #[must_use]
    pub fn new(
        sensor: Arc<dyn MotionSensor>,
        snapshots: Arc<Snapshotter>,
        owner_chat: i64,
        period: Duration,
    ) -> Self {
        Self {
            tick: Arc::new(DetectionTick {
                sensor,
                snapshots,
                owner_chat,
            }),
            period,
            job: Mutex::new(None),
        }
    }

    /// Tick period
    #[must_use]
    pub const fn period(&self) -> Duration {
        self.period
    }

    /// Start ticking every period, first tick immediately.
    ///
    /// Must be called from within a Tokio runtime. Returns `false` if the
    /// job was already running.
    pub fn start(&self) -> bool {
        let mut job = self.lock_job();
        if job.as_ref().is_some_and(|j| !j.handle.is_finished()) {
            debug!("Detection already running");
            return false;
        }

        let token = CancellationToken::new();
        let handle = tokio::spawn(run_job(self.tick.clone(), self.period, token.clone()));
        *job = Some(DetectionJob { token, handle });

        info!(period_secs = self.period.as_secs(), "Motion detection enabled");
        true
    }

    /// Cancel the periodic job. Returns `false` if it was not running.
    pub fn stop(&self) -> bool {
        match self.lock_job().take() {
            Some(job) => {
                job.token.cancel();
                info!("Motion detection disabled");
                !job.handle.is_finished()
            }
            None => {
                debug!("Detection already stopped");
                false
            }
        }
    }

    /// Cancel the job and wait until it has exited.
    ///
    /// A tick in progress runs to completion first. Afterwards the job no
    /// longer holds the sensor or the snapshotter.
    pub async fn shutdown(&self) {
        let job = self.lock_job().take();
        let Some(job) = job else {
            return;
        };

        job.token.cancel();
        if let Err(e) = job.handle.await {
            warn!("Detection job ended abnormally: {e}");
        }
        info!("Motion detection shut down");
    }

    /// Whether the periodic job is scheduled
    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.lock_job()
            .as_ref()
            .is_some_and(|j| !j.token.is_cancelled() && !j.handle.is_finished())
    }

    /// Run one detection check now
    pub async fn tick(&self) -> TickOutcome {
        self.tick.run().await
    }

    fn lock_job(&self) -> MutexGuard<'_, Option<DetectionJob>> {
        self.job.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for DetectionScheduler {
    fn drop(&mut self) {
        if let Some(job) = self.lock_job().take() {
            job.token.cancel();
        }
    }
}

async fn run_job(tick: Arc<DetectionTick>, period: Duration, token: CancellationToken) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = token.cancelled() => break,
            _ = interval.tick() => {}
        }
        tick.run().await;
    }
    debug!("Detection job finished");
}
