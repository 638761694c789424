use crate::domain::model::{AdFormat, CacheEvent, PresentationEvent};
use crate::domain::ports::CacheListener;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopListener;

impl CacheListener for NoopListener {
    fn on_available(&self, _format: AdFormat, _placement_id: &str) {}

    fn on_exhausted(&self, _format: AdFormat, _placement_id: &str) {}
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingListener;

impl CacheListener for LoggingListener {
    fn on_available(&self, format: AdFormat, placement_id: &str) {
        tracing::info!("✅ {} ad available for {}", format, placement_id);
    }

    fn on_exhausted(&self, format: AdFormat, placement_id: &str) {
        tracing::info!("⚠️ {} ads exhausted for {}", format, placement_id);
    }

    fn on_presentation_event(&self, format: AdFormat, placement_id: &str, event: &PresentationEvent) {
        tracing::info!("🎬 {} ad on {}: {:?}", format, placement_id, event);
    }
}

/// Forwards every notification as a [`CacheEvent`] into an unbounded channel.
#[derive(Debug, Clone)]
pub struct ChannelListener {
    tx: UnboundedSender<CacheEvent>,
}

impl ChannelListener {
    pub fn new() -> (Self, UnboundedReceiver<CacheEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    fn send(&self, event: CacheEvent) {
        // The host may have dropped the receiver.
        if self.tx.send(event).is_err() {
            tracing::debug!("Cache event receiver dropped");
        }
    }
}

impl CacheListener for ChannelListener {
    fn on_available(&self, format: AdFormat, placement_id: &str) {
        self.send(CacheEvent::Available {
            format,
            placement_id: placement_id.to_string(),
        });
    }

    fn on_exhausted(&self, format: AdFormat, placement_id: &str) {
        self.send(CacheEvent::Exhausted {
            format,
            placement_id: placement_id.to_string(),
        });
    }

    fn on_presentation_event(&self, format: AdFormat, placement_id: &str, event: &PresentationEvent) {
        self.send(CacheEvent::Presentation {
            format,
            placement_id: placement_id.to_string(),
            event: event.clone(),
        });
    }
}
