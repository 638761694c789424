pub mod cacher;
pub mod queue;

pub use crate::domain::model::{AdFormat, CachedAd, LoadedAd, PlacementConfig};
pub use crate::domain::ports::{AdProvider, CacheListener, Clock, Scheduler};
pub use crate::utils::error::Result;
