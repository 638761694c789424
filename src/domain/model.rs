use crate::utils::error::{PresentError, Result};
use crate::utils::validation::{validate_non_empty_string, validate_range, Validate};
use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Shape of full-screen ad content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdFormat {
    Interstitial,
    Rewarded,
    RewardedInterstitial,
    AppOpen,
}

impl AdFormat {
    pub const ALL: [AdFormat; 4] = [
        AdFormat::Interstitial,
        AdFormat::Rewarded,
        AdFormat::RewardedInterstitial,
        AdFormat::AppOpen,
    ];

    /// How long a loaded ad of this format stays presentable.
    pub fn lifetime(self) -> TimeDelta {
        match self {
            AdFormat::AppOpen => TimeDelta::hours(4),
            _ => TimeDelta::hours(1),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AdFormat::Interstitial => "interstitial",
            AdFormat::Rewarded => "rewarded",
            AdFormat::RewardedInterstitial => "rewarded_interstitial",
            AdFormat::AppOpen => "app_open",
        }
    }
}

impl fmt::Display for AdFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        AdFormat::ALL
            .into_iter()
            .find(|format| format.as_str() == s)
            .ok_or_else(|| {
                format!(
                    "unknown ad format '{}', expected one of: interstitial, rewarded, rewarded_interstitial, app_open",
                    s
                )
            })
    }
}

/// An ad object returned by a provider, already tagged with its format.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadedAd<H> {
    Interstitial(H),
    Rewarded(H),
    RewardedInterstitial(H),
    AppOpen(H),
}

impl<H> LoadedAd<H> {
    pub fn new(format: AdFormat, handle: H) -> Self {
        match format {
            AdFormat::Interstitial => LoadedAd::Interstitial(handle),
            AdFormat::Rewarded => LoadedAd::Rewarded(handle),
            AdFormat::RewardedInterstitial => LoadedAd::RewardedInterstitial(handle),
            AdFormat::AppOpen => LoadedAd::AppOpen(handle),
        }
    }

    pub fn format(&self) -> AdFormat {
        match self {
            LoadedAd::Interstitial(_) => AdFormat::Interstitial,
            LoadedAd::Rewarded(_) => AdFormat::Rewarded,
            LoadedAd::RewardedInterstitial(_) => AdFormat::RewardedInterstitial,
            LoadedAd::AppOpen(_) => AdFormat::AppOpen,
        }
    }

    pub fn handle(&self) -> &H {
        match self {
            LoadedAd::Interstitial(h)
            | LoadedAd::Rewarded(h)
            | LoadedAd::RewardedInterstitial(h)
            | LoadedAd::AppOpen(h) => h,
        }
    }

    pub fn into_handle(self) -> H {
        match self {
            LoadedAd::Interstitial(h)
            | LoadedAd::Rewarded(h)
            | LoadedAd::RewardedInterstitial(h)
            | LoadedAd::AppOpen(h) => h,
        }
    }
}

/// A loaded, not yet shown ad held in the inventory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedAd<H> {
    placement_id: String,
    ad: LoadedAd<H>,
    expires_at: DateTime<Utc>,
}

impl<H> CachedAd<H> {
    pub fn new(placement_id: impl Into<String>, ad: LoadedAd<H>, loaded_at: DateTime<Utc>) -> Self {
        let expires_at = loaded_at + ad.format().lifetime();
        Self {
            placement_id: placement_id.into(),
            ad,
            expires_at,
        }
    }

    pub fn format(&self) -> AdFormat {
        self.ad.format()
    }

    pub fn placement_id(&self) -> &str {
        &self.placement_id
    }

    pub fn ad(&self) -> &LoadedAd<H> {
        &self.ad
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// What a display request did with the ad it took from the inventory.
#[derive(Debug)]
pub struct DisplayOutcome<H> {
    pub cached: CachedAd<H>,
    /// `Err` means the ad was consumed without being shown.
    pub presented: std::result::Result<(), PresentError>,
}

impl<H> DisplayOutcome<H> {
    pub fn is_presented(&self) -> bool {
        self.presented.is_ok()
    }
}

pub const MIN_TARGET_COUNT: usize = 1;
pub const MAX_TARGET_COUNT: usize = 20;

/// Desired steady-state inventory for one placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementConfig {
    pub format: AdFormat,
    pub placement_id: String,
    pub target_count: usize,
}

impl PlacementConfig {
    pub fn new(format: AdFormat, placement_id: impl Into<String>, target_count: usize) -> Self {
        Self {
            format,
            placement_id: placement_id.into(),
            target_count,
        }
    }
}

impl Validate for PlacementConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("placement_id", &self.placement_id)?;
        validate_range(
            "target_count",
            self.target_count,
            MIN_TARGET_COUNT,
            MAX_TARGET_COUNT,
        )
    }
}

/// Lifecycle events of a presented ad, forwarded by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "event", content = "reason")]
pub enum PresentationEvent {
    WillPresent,
    WillDismiss,
    DidDismiss,
    Impression,
    Click,
    RewardEarned,
    PresentFailed(String),
}

/// Everything a cacher reports to its host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum CacheEvent {
    Available {
        format: AdFormat,
        placement_id: String,
    },
    Exhausted {
        format: AdFormat,
        placement_id: String,
    },
    Presentation {
        format: AdFormat,
        placement_id: String,
        event: PresentationEvent,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementStatus {
    pub format: AdFormat,
    pub placement_id: String,
    pub target_count: usize,
    pub live_count: usize,
    pub available: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySnapshot {
    pub taken_at: DateTime<Utc>,
    pub running: bool,
    pub total_cached: usize,
    pub placements: Vec<PlacementStatus>,
}
