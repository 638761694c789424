pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::cli::CliConfig;
pub use config::CacherFileConfig;

pub use crate::core::{
    cacher::{AdCacher, AdCacherBuilder},
    queue::AdQueue,
};
pub use domain::model::{
    AdFormat, CacheEvent, CachedAd, DisplayOutcome, InventorySnapshot, LoadedAd, PlacementConfig,
    PlacementStatus, PresentationEvent,
};
pub use domain::ports::{AdProvider, CacheListener};
pub use utils::error::{CacherError, LoadError, PresentError, Result};
