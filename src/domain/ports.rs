use crate::domain::model::{AdFormat, LoadedAd, PresentationEvent};
use crate::utils::error::{LoadError, PresentError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

/// Ad network adapter: performs the network fetch and the full-screen presentation.
///
/// `load` must be safe to issue many times concurrently for the same placement.
#[async_trait]
pub trait AdProvider: Send + Sync + 'static {
    /// Opaque ad object; the cacher only passes it through.
    type Handle: Send + Sync + 'static;

    async fn load(
        &self,
        format: AdFormat,
        placement_id: &str,
    ) -> std::result::Result<LoadedAd<Self::Handle>, LoadError>;

    fn present(
        &self,
        placement_id: &str,
        ad: &LoadedAd<Self::Handle>,
    ) -> std::result::Result<(), PresentError>;
}

#[async_trait]
impl<P: AdProvider> AdProvider for Arc<P> {
    type Handle = P::Handle;

    async fn load(
        &self,
        format: AdFormat,
        placement_id: &str,
    ) -> std::result::Result<LoadedAd<Self::Handle>, LoadError> {
        (**self).load(format, placement_id).await
    }

    fn present(
        &self,
        placement_id: &str,
        ad: &LoadedAd<Self::Handle>,
    ) -> std::result::Result<(), PresentError> {
        (**self).present(placement_id, ad)
    }
}

/// Host-side receiver of inventory transitions.
pub trait CacheListener: Send + Sync {
    fn on_available(&self, format: AdFormat, placement_id: &str);

    fn on_exhausted(&self, format: AdFormat, placement_id: &str);

    fn on_presentation_event(
        &self,
        _format: AdFormat,
        _placement_id: &str,
        _event: &PresentationEvent,
    ) {
    }
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub type TickFn = Arc<dyn Fn() + Send + Sync>;

/// Handle to a running repeating task.
pub trait ScheduledTask: Send {
    fn cancel(&self);

    fn is_active(&self) -> bool;
}

/// Capability to run a callback every `period`, starting one period from now.
pub trait Scheduler: Send + Sync {
    fn schedule_repeating(&self, period: Duration, tick: TickFn) -> Result<Box<dyn ScheduledTask>>;
}
