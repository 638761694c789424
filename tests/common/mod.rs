#![allow(dead_code)]

use ad_cacher::adapters::clock::ManualClock;
use ad_cacher::adapters::listener::ChannelListener;
use ad_cacher::adapters::scheduler::ManualScheduler;
use ad_cacher::{AdCacher, AdFormat, AdProvider, CacheEvent, LoadError, LoadedAd, PresentError};
use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::sync::oneshot;

pub struct PendingLoad {
    pub format: AdFormat,
    pub placement_id: String,
    tx: oneshot::Sender<Result<LoadedAd<u32>, LoadError>>,
}

/// Provider whose loads stay pending until the test resolves them.
#[derive(Default)]
pub struct ScriptedProvider {
    pending: Mutex<Vec<PendingLoad>>,
    presented: Mutex<Vec<(String, u32)>>,
    load_calls: AtomicU32,
    next_serial: AtomicU32,
    no_presenter: AtomicBool,
}

impl ScriptedProvider {
    pub fn pending_for(&self, placement_id: &str) -> usize {
        self.pending
            .lock()
            .unwrap()
            .iter()
            .filter(|load| load.placement_id == placement_id)
            .count()
    }

    pub fn load_calls(&self) -> u32 {
        self.load_calls.load(Ordering::SeqCst)
    }

    fn take(&self, placement_id: &str, nth: usize) -> PendingLoad {
        let mut pending = self.pending.lock().unwrap();
        let index = pending
            .iter()
            .enumerate()
            .filter(|(_, load)| load.placement_id == placement_id)
            .map(|(index, _)| index)
            .nth(nth)
            .unwrap_or_else(|| panic!("no pending load #{} for {}", nth, placement_id));
        pending.remove(index)
    }

    /// Resolves the `nth` pending load for `placement_id` successfully and returns its serial.
    pub fn succeed_nth(&self, placement_id: &str, nth: usize) -> u32 {
        let load = self.take(placement_id, nth);
        let serial = self.next_serial.fetch_add(1, Ordering::SeqCst) + 1;
        let _ = load.tx.send(Ok(LoadedAd::new(load.format, serial)));
        serial
    }

    pub fn succeed_next(&self, placement_id: &str) -> u32 {
        self.succeed_nth(placement_id, 0)
    }

    pub fn fail_next(&self, placement_id: &str, error: LoadError) {
        let load = self.take(placement_id, 0);
        let _ = load.tx.send(Err(error));
    }

    pub fn respond_next(&self, placement_id: &str, ad: LoadedAd<u32>) {
        let load = self.take(placement_id, 0);
        let _ = load.tx.send(Ok(ad));
    }

    pub fn presented(&self) -> Vec<(String, u32)> {
        self.presented.lock().unwrap().clone()
    }

    pub fn set_presenter_available(&self, available: bool) {
        self.no_presenter.store(!available, Ordering::SeqCst);
    }
}

#[async_trait]
impl AdProvider for ScriptedProvider {
    type Handle = u32;

    async fn load(&self, format: AdFormat, placement_id: &str) -> Result<LoadedAd<u32>, LoadError> {
        self.load_calls.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().unwrap().push(PendingLoad {
            format,
            placement_id: placement_id.to_string(),
            tx,
        });
        rx.await.unwrap_or(Err(LoadError::Cancelled))
    }

    fn present(&self, placement_id: &str, ad: &LoadedAd<u32>) -> Result<(), PresentError> {
        if self.no_presenter.load(Ordering::SeqCst) {
            return Err(PresentError::NoPresenterAvailable);
        }
        self.presented
            .lock()
            .unwrap()
            .push((placement_id.to_string(), *ad.handle()));
        Ok(())
    }
}

pub struct Harness {
    pub cacher: AdCacher<Arc<ScriptedProvider>>,
    pub provider: Arc<ScriptedProvider>,
    pub clock: Arc<ManualClock>,
    pub scheduler: Arc<ManualScheduler>,
    pub events: UnboundedReceiver<CacheEvent>,
}

impl Harness {
    pub fn new() -> Self {
        let provider = Arc::new(ScriptedProvider::default());
        let clock = Arc::new(ManualClock::default());
        let scheduler = Arc::new(ManualScheduler::new());
        let (listener, events) = ChannelListener::new();

        let cacher = AdCacher::builder(Arc::clone(&provider))
            .listener(Arc::new(listener))
            .clock(clock.clone())
            .scheduler(scheduler.clone())
            .build();

        Self {
            cacher,
            provider,
            clock,
            scheduler,
            events,
        }
    }

    pub fn drain_events(&mut self) -> Vec<CacheEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }
}

/// Polls `condition` on the runtime clock until it holds, for up to five seconds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..500 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not met within 5s");
}

/// Lets spawned load tasks run to their next suspension point.
pub async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

pub fn available(format: AdFormat, placement_id: &str) -> CacheEvent {
    CacheEvent::Available {
        format,
        placement_id: placement_id.to_string(),
    }
}

pub fn exhausted(format: AdFormat, placement_id: &str) -> CacheEvent {
    CacheEvent::Exhausted {
        format,
        placement_id: placement_id.to_string(),
    }
}
