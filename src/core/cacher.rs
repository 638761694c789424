use crate::adapters::clock::SystemClock;
use crate::adapters::listener::NoopListener;
use crate::adapters::scheduler::TokioScheduler;
use crate::core::queue::AdQueue;
use crate::domain::model::{
    AdFormat, CacheEvent, CachedAd, DisplayOutcome, InventorySnapshot, LoadedAd,
    PlacementConfig, PlacementStatus, PresentationEvent,
};
use crate::domain::ports::{AdProvider, CacheListener, Clock, ScheduledTask, Scheduler, TickFn};
use crate::utils::error::{CacherError, LoadError, Result};
use crate::utils::validation::{validate_unique, Validate};
use chrono::{DateTime, Utc};
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};
use std::time::Duration;

/// Keeps a rolling inventory of pre-loaded ads per placement.
///
/// Cloning is cheap and every clone drives the same inventory. Refill ticks and
/// in-flight loads only hold weak references, so dropping the last clone tears
/// everything down.
pub struct AdCacher<P: AdProvider> {
    inner: Arc<Inner<P>>,
}

impl<P: AdProvider> Clone for AdCacher<P> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

pub struct AdCacherBuilder<P: AdProvider> {
    provider: P,
    listener: Arc<dyn CacheListener>,
    clock: Arc<dyn Clock>,
    scheduler: Arc<dyn Scheduler>,
}

impl<P: AdProvider> AdCacherBuilder<P> {
    pub fn listener(mut self, listener: Arc<dyn CacheListener>) -> Self {
        self.listener = listener;
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn build(self) -> AdCacher<P> {
        AdCacher {
            inner: Arc::new(Inner {
                provider: Arc::new(self.provider),
                listener: self.listener,
                clock: self.clock,
                scheduler: self.scheduler,
                state: Mutex::new(CacherState::default()),
                delivery: Mutex::new(()),
            }),
        }
    }
}

struct Inner<P: AdProvider> {
    provider: Arc<P>,
    listener: Arc<dyn CacheListener>,
    clock: Arc<dyn Clock>,
    scheduler: Arc<dyn Scheduler>,
    state: Mutex<CacherState<P::Handle>>,
    // Held by whichever thread is currently handing the outbox to the listener.
    delivery: Mutex<()>,
}

struct CacherState<H> {
    configs: Vec<PlacementConfig>,
    queue: AdQueue<H>,
    // Placements that have signalled `on_available` and not yet `on_exhausted`.
    available: HashSet<String>,
    ticker: Option<Box<dyn ScheduledTask>>,
    // Listener events in the order their state changes happened.
    outbox: VecDeque<CacheEvent>,
    disposed: bool,
}

impl<H> Default for CacherState<H> {
    fn default() -> Self {
        Self {
            configs: Vec::new(),
            queue: AdQueue::new(),
            available: HashSet::new(),
            ticker: None,
            outbox: VecDeque::new(),
            disposed: false,
        }
    }
}

impl<H> CacherState<H> {
    fn refresh_availability(&mut self, format: AdFormat, placement_id: &str, now: DateTime<Utc>) {
        let has_ads = self.queue.live_count_for(placement_id, now) > 0;
        let signalled = self.available.contains(placement_id);

        if has_ads && !signalled {
            self.available.insert(placement_id.to_string());
            self.outbox.push_back(CacheEvent::Available {
                format,
                placement_id: placement_id.to_string(),
            });
        } else if !has_ads && signalled {
            self.available.remove(placement_id);
            self.outbox.push_back(CacheEvent::Exhausted {
                format,
                placement_id: placement_id.to_string(),
            });
        }
    }

    fn sweep(&mut self, now: DateTime<Utc>) {
        let expired = self.queue.sweep_expired(now);
        if expired.is_empty() {
            return;
        }
        tracing::debug!("Swept {} expired ads", expired.len());

        let mut touched = HashSet::new();
        for ad in &expired {
            if touched.insert(ad.placement_id()) {
                self.refresh_availability(ad.format(), ad.placement_id(), now);
            }
        }
    }

    fn stop_ticker(&mut self) -> bool {
        match self.ticker.take() {
            Some(ticker) => {
                ticker.cancel();
                true
            }
            None => false,
        }
    }
}

impl<P: AdProvider> AdCacher<P> {
    /// Starts a builder with the system clock, the Tokio scheduler and no listener.
    pub fn builder(provider: P) -> AdCacherBuilder<P> {
        AdCacherBuilder {
            provider,
            listener: Arc::new(NoopListener),
            clock: Arc::new(SystemClock),
            scheduler: Arc::new(TokioScheduler),
        }
    }

    pub fn new(provider: P, listener: Arc<dyn CacheListener>) -> Self {
        Self::builder(provider).listener(listener).build()
    }

    /// Replaces the placement set, restarts the refill tick and reconciles once.
    ///
    /// Invalid arguments leave the previous configuration and tick untouched.
    pub fn configure(&self, configs: Vec<PlacementConfig>, interval: Duration) -> Result<()> {
        if interval.is_zero() {
            return Err(CacherError::InvalidConfigValueError {
                field: "interval".to_string(),
                value: format!("{:?}", interval),
                reason: "Refresh interval must be greater than zero".to_string(),
            });
        }
        for config in &configs {
            config.validate()?;
        }
        validate_unique(
            "placements.placement_id",
            configs.iter().map(|c| c.placement_id.as_str()),
        )?;

        if self.inner.state().disposed {
            return Err(disposed_error());
        }

        let weak = Arc::downgrade(&self.inner);
        let tick: TickFn = Arc::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.reconcile();
            }
        });
        let ticker = self.inner.scheduler.schedule_repeating(interval, tick)?;

        {
            let mut state = self.inner.state();
            if state.disposed {
                ticker.cancel();
                return Err(disposed_error());
            }
            if state.stop_ticker() {
                tracing::debug!("Cancelled previous refill tick");
            }
            state.configs = configs;
            state.ticker = Some(ticker);
            tracing::info!(
                "Cacher configured with {} placements, refreshing every {:?}",
                state.configs.len(),
                interval
            );
        }

        self.inner.reconcile();
        Ok(())
    }

    /// Cancels the refill tick. Cached ads stay displayable and in-flight loads still land.
    pub fn stop(&self) {
        if self.inner.state().stop_ticker() {
            tracing::info!("Cacher stopped");
        }
    }

    /// Stops the cacher for good and drops every cached ad without notifying.
    pub fn dispose(&self) {
        let mut state = self.inner.state();
        state.stop_ticker();
        let dropped = state.queue.clear();
        state.available.clear();
        state.configs.clear();
        state.disposed = true;
        tracing::info!("Cacher disposed, dropped {} cached ads", dropped);
    }

    /// Issues load requests for every placement below target, then sweeps expired ads.
    ///
    /// Returns the number of load requests issued.
    pub fn reconcile(&self) -> usize {
        self.inner.reconcile()
    }

    /// Takes the oldest live ad for `placement_id`, presents it and backfills.
    ///
    /// A miss returns `None`; the host decides what to do without an ad. A hit
    /// consumes the ad even when the provider could not present it, so check
    /// [`DisplayOutcome::presented`] before treating it as shown.
    pub fn request_display(&self, placement_id: &str) -> Option<DisplayOutcome<P::Handle>> {
        let inner = &self.inner;
        let now = inner.clock.now();

        let cached = {
            let mut state = inner.state();
            state.sweep(now);
            let cached = state.queue.dequeue_one_for(placement_id);
            if let Some(ad) = &cached {
                state.refresh_availability(ad.format(), placement_id, now);
            }
            cached
        };

        let outcome = match cached {
            Some(cached) => {
                tracing::debug!("Presenting {} ad for {}", cached.format(), placement_id);
                let presented = inner.provider.present(placement_id, cached.ad());
                if let Err(e) = &presented {
                    tracing::warn!(
                        "Failed to present {} ad for {}: {}",
                        cached.format(),
                        placement_id,
                        e
                    );
                }
                Some(DisplayOutcome { cached, presented })
            }
            None => {
                tracing::debug!("No cached ad available for {}", placement_id);
                None
            }
        };

        inner.deliver();
        inner.reconcile();
        outcome
    }

    /// Forwards a presentation lifecycle event to the listener.
    pub fn report_presentation_event(
        &self,
        format: AdFormat,
        placement_id: &str,
        event: PresentationEvent,
    ) {
        if let PresentationEvent::PresentFailed(reason) = &event {
            tracing::warn!("{} ad for {} failed to present: {}", format, placement_id, reason);
        }
        self.inner.state().outbox.push_back(CacheEvent::Presentation {
            format,
            placement_id: placement_id.to_string(),
            event,
        });
        self.inner.deliver();
    }

    pub fn live_count(&self, placement_id: &str) -> usize {
        let now = self.inner.clock.now();
        self.inner.state().queue.live_count_for(placement_id, now)
    }

    pub fn is_available(&self, placement_id: &str) -> bool {
        self.inner.state().available.contains(placement_id)
    }

    pub fn is_running(&self) -> bool {
        self.inner
            .state()
            .ticker
            .as_ref()
            .is_some_and(|ticker| ticker.is_active())
    }

    pub fn configs(&self) -> Vec<PlacementConfig> {
        self.inner.state().configs.clone()
    }

    pub fn snapshot(&self) -> InventorySnapshot {
        let now = self.inner.clock.now();
        let state = self.inner.state();

        let placements = state
            .configs
            .iter()
            .map(|config| PlacementStatus {
                format: config.format,
                placement_id: config.placement_id.clone(),
                target_count: config.target_count,
                live_count: state.queue.live_count_for(&config.placement_id, now),
                available: state.available.contains(&config.placement_id),
            })
            .collect();

        InventorySnapshot {
            taken_at: now,
            running: state.ticker.as_ref().is_some_and(|ticker| ticker.is_active()),
            total_cached: state.queue.live_len(now),
            placements,
        }
    }
}

impl<P: AdProvider> Inner<P> {
    fn state(&self) -> MutexGuard<'_, CacherState<P::Handle>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn reconcile(self: &Arc<Self>) -> usize {
        let now = self.clock.now();

        let requests = {
            let mut state = self.state();
            if state.disposed {
                return 0;
            }

            let mut requests = Vec::new();
            for config in &state.configs {
                let live = state.queue.live_count_for(&config.placement_id, now);
                let deficit = config.target_count.saturating_sub(live);
                if deficit > 0 {
                    tracing::debug!(
                        "Placement {} has {}/{} ads, requesting {}",
                        config.placement_id,
                        live,
                        config.target_count,
                        deficit
                    );
                    requests.push((config.format, config.placement_id.clone(), deficit));
                }
            }

            state.sweep(now);
            requests
        };

        let mut issued = 0;
        for (format, placement_id, deficit) in requests {
            for _ in 0..deficit {
                if self.spawn_load(format, placement_id.clone()) {
                    issued += 1;
                }
            }
        }

        self.deliver();
        issued
    }

    fn spawn_load(self: &Arc<Self>, format: AdFormat, placement_id: String) -> bool {
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                tracing::warn!(
                    "No Tokio runtime, skipping {} load for {}",
                    format,
                    placement_id
                );
                return false;
            }
        };

        let weak = Arc::downgrade(self);
        let provider = Arc::clone(&self.provider);
        runtime.spawn(async move {
            let result = provider.load(format, &placement_id).await;
            match weak.upgrade() {
                Some(inner) => inner.complete_load(format, &placement_id, result),
                None => tracing::debug!("Cacher dropped, discarding load for {}", placement_id),
            }
        });
        true
    }

    fn complete_load(
        &self,
        format: AdFormat,
        placement_id: &str,
        result: std::result::Result<LoadedAd<P::Handle>, LoadError>,
    ) {
        let loaded = match result {
            Ok(ad) if ad.format() == format => ad,
            Ok(ad) => {
                let err = LoadError::FormatMismatch {
                    expected: format,
                    actual: ad.format(),
                };
                tracing::warn!("Discarding ad for {}: {}", placement_id, err);
                return;
            }
            Err(e) => {
                tracing::warn!("Failed to load {} ad for {}: {}", format, placement_id, e);
                return;
            }
        };

        let now = self.clock.now();
        {
            let mut state = self.state();
            if state.disposed {
                tracing::debug!("Cacher disposed, discarding loaded ad for {}", placement_id);
                return;
            }
            state
                .queue
                .enqueue(CachedAd::new(placement_id, loaded, now));
            state.refresh_availability(format, placement_id, now);
        }
        tracing::debug!("Cached {} ad for {}", format, placement_id);

        self.deliver();
    }

    /// Hands queued events to the listener in the order they were recorded.
    ///
    /// One thread delivers at a time. A caller that finds delivery in progress
    /// leaves its events to the current deliverer, which also lets a listener
    /// call back into the cacher.
    fn deliver(&self) {
        loop {
            let delivering = match self.delivery.try_lock() {
                Ok(guard) => guard,
                Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
                Err(TryLockError::WouldBlock) => return,
            };
            loop {
                let next = self.state().outbox.pop_front();
                let Some(event) = next else { break };
                self.notify(&event);
            }
            drop(delivering);

            // Events queued after our last pop but before the unlock.
            let drained = self.state().outbox.is_empty();
            if drained {
                return;
            }
        }
    }

    fn notify(&self, event: &CacheEvent) {
        match event {
            CacheEvent::Available {
                format,
                placement_id,
            } => self.listener.on_available(*format, placement_id),
            CacheEvent::Exhausted {
                format,
                placement_id,
            } => self.listener.on_exhausted(*format, placement_id),
            CacheEvent::Presentation {
                format,
                placement_id,
                event,
            } => self
                .listener
                .on_presentation_event(*format, placement_id, event),
        }
    }
}

fn disposed_error() -> CacherError {
    CacherError::ConfigError {
        message: "Cacher has been disposed".to_string(),
    }
}
