use crate::domain::model::{AdFormat, LoadedAd};
use crate::domain::ports::AdProvider;
use crate::utils::error::{LoadError, PresentError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

/// Stand-in for an ad network SDK with fixed latency and periodic failures.
#[derive(Debug)]
pub struct SimulatedProvider {
    latency: Duration,
    fail_every: Option<u64>,
    requests: AtomicU64,
    presented: AtomicU64,
    has_presenter: AtomicBool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulatedAd {
    pub serial: u64,
    pub placement_id: String,
}

impl SimulatedProvider {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            fail_every: None,
            requests: AtomicU64::new(0),
            presented: AtomicU64::new(0),
            has_presenter: AtomicBool::new(true),
        }
    }

    /// Every `n`th load request fails with no fill. Zero disables failures.
    pub fn with_fail_every(mut self, n: u64) -> Self {
        self.fail_every = (n > 0).then_some(n);
        self
    }

    pub fn set_presenter_available(&self, available: bool) {
        self.has_presenter.store(available, Ordering::SeqCst);
    }

    pub fn requests(&self) -> u64 {
        self.requests.load(Ordering::SeqCst)
    }

    pub fn presented(&self) -> u64 {
        self.presented.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AdProvider for SimulatedProvider {
    type Handle = SimulatedAd;

    async fn load(
        &self,
        format: AdFormat,
        placement_id: &str,
    ) -> Result<LoadedAd<SimulatedAd>, LoadError> {
        let serial = self.requests.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if self.fail_every.is_some_and(|n| serial % n == 0) {
            return Err(LoadError::NoFill);
        }

        Ok(LoadedAd::new(
            format,
            SimulatedAd {
                serial,
                placement_id: placement_id.to_string(),
            },
        ))
    }

    fn present(&self, placement_id: &str, ad: &LoadedAd<SimulatedAd>) -> Result<(), PresentError> {
        if !self.has_presenter.load(Ordering::SeqCst) {
            return Err(PresentError::NoPresenterAvailable);
        }
        self.presented.fetch_add(1, Ordering::SeqCst);
        tracing::info!(
            "🎬 Presenting {} ad #{} on {}",
            ad.format(),
            ad.handle().serial,
            placement_id
        );
        Ok(())
    }
}
