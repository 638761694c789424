use crate::domain::ports::{ScheduledTask, Scheduler, TickFn};
use crate::utils::error::{CacherError, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

/// Runs ticks on a Tokio interval task. The first tick fires one period after scheduling.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn schedule_repeating(&self, period: Duration, tick: TickFn) -> Result<Box<dyn ScheduledTask>> {
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|e| CacherError::SchedulerError {
                message: e.to_string(),
            })?;
        let start = Instant::now()
            .checked_add(period)
            .ok_or_else(|| CacherError::SchedulerError {
                message: format!("Refresh interval {:?} is too long to schedule", period),
            })?;

        let handle = runtime.spawn(async move {
            let mut interval = tokio::time::interval_at(start, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                interval.tick().await;
                tracing::debug!("Refill tick");
                tick();
            }
        });

        Ok(Box::new(TokioTask {
            handle,
            cancelled: AtomicBool::new(false),
        }))
    }
}

struct TokioTask {
    handle: JoinHandle<()>,
    cancelled: AtomicBool,
}

impl ScheduledTask for TokioTask {
    fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.handle.abort();
    }

    fn is_active(&self) -> bool {
        !self.cancelled.load(Ordering::SeqCst) && !self.handle.is_finished()
    }
}

impl Drop for TokioTask {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

struct ManualEntry {
    period: Duration,
    tick: TickFn,
    active: Arc<AtomicBool>,
}

/// Scheduler whose ticks fire only when [`ManualScheduler::fire`] is called.
#[derive(Clone, Default)]
pub struct ManualScheduler {
    entries: Arc<Mutex<Vec<ManualEntry>>>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, Vec<ManualEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fires one tick on every active task and returns how many fired.
    pub fn fire(&self) -> usize {
        // Ticks may reschedule, so run them outside the lock.
        let ticks: Vec<TickFn> = self
            .entries()
            .iter()
            .filter(|entry| entry.active.load(Ordering::SeqCst))
            .map(|entry| Arc::clone(&entry.tick))
            .collect();

        for tick in &ticks {
            tick();
        }
        ticks.len()
    }

    pub fn active_count(&self) -> usize {
        self.entries()
            .iter()
            .filter(|entry| entry.active.load(Ordering::SeqCst))
            .count()
    }

    /// Periods of the active tasks, in scheduling order.
    pub fn periods(&self) -> Vec<Duration> {
        self.entries()
            .iter()
            .filter(|entry| entry.active.load(Ordering::SeqCst))
            .map(|entry| entry.period)
            .collect()
    }
}

impl Scheduler for ManualScheduler {
    fn schedule_repeating(&self, period: Duration, tick: TickFn) -> Result<Box<dyn ScheduledTask>> {
        let active = Arc::new(AtomicBool::new(true));
        let mut entries = self.entries();
        entries.retain(|entry| entry.active.load(Ordering::SeqCst));
        entries.push(ManualEntry {
            period,
            tick,
            active: Arc::clone(&active),
        });
        Ok(Box::new(ManualTask { active }))
    }
}

struct ManualTask {
    active: Arc<AtomicBool>,
}

impl ScheduledTask for ManualTask {
    fn cancel(&self) {
        self.active.store(false, Ordering::SeqCst);
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

impl Drop for ManualTask {
    fn drop(&mut self) {
        self.active.store(false, Ordering::SeqCst);
    }
}
