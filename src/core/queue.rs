use crate::domain::model::CachedAd;
use chrono::{DateTime, Utc};

/// Insertion-ordered store of cached ads for every placement.
///
/// Single owner, no locking. Capacity and deduplication are the cacher's job.
#[derive(Debug)]
pub struct AdQueue<H> {
    ads: Vec<CachedAd<H>>,
}

impl<H> Default for AdQueue<H> {
    fn default() -> Self {
        Self { ads: Vec::new() }
    }
}

impl<H> AdQueue<H> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, ad: CachedAd<H>) {
        self.ads.push(ad);
    }

    /// Removes the oldest entry for `placement_id`.
    pub fn dequeue_one_for(&mut self, placement_id: &str) -> Option<CachedAd<H>> {
        let index = self
            .ads
            .iter()
            .position(|ad| ad.placement_id() == placement_id)?;
        Some(self.ads.remove(index))
    }

    /// Entries for `placement_id`, expired or not. Sweep first for a live count.
    pub fn count_for(&self, placement_id: &str) -> usize {
        self.ads
            .iter()
            .filter(|ad| ad.placement_id() == placement_id)
            .count()
    }

    pub fn live_count_for(&self, placement_id: &str, now: DateTime<Utc>) -> usize {
        self.ads
            .iter()
            .filter(|ad| ad.placement_id() == placement_id && !ad.is_expired(now))
            .count()
    }

    /// Drops every entry with `now >= expires_at` and returns them in queue order.
    pub fn sweep_expired(&mut self, now: DateTime<Utc>) -> Vec<CachedAd<H>> {
        let (expired, live): (Vec<_>, Vec<_>) = std::mem::take(&mut self.ads)
            .into_iter()
            .partition(|ad| ad.is_expired(now));
        self.ads = live;
        expired
    }

    /// Entries across all placements with `now < expires_at`.
    pub fn live_len(&self, now: DateTime<Utc>) -> usize {
        self.ads.iter().filter(|ad| !ad.is_expired(now)).count()
    }

    pub fn clear(&mut self) -> usize {
        let removed = self.ads.len();
        self.ads.clear();
        removed
    }

    pub fn len(&self) -> usize {
        self.ads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ads.is_empty()
    }
}
