//! UI-facing event bus.
//!
//! Hotkey actions and capture mode report to whatever surface is attached
//! (a window, the CLI's `listen` command) through a broadcast channel. A
//! send with nobody listening is logged and dropped.

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;

/// Capacity of the broadcast channel; slow receivers see `Lagged`.
pub const EVENT_CHANNEL_CAPACITY: usize = 100;

/// Notification for the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum UiEvent {
    /// Accelerator recorded while capture mode was armed
    HotkeyCaptured(String),
    /// The mute hotkey fired; the UI owns the muted state
    ToggleMute,
    /// Volume changed to this value
    UpdateVolume(u8),
    /// Saved preferences were loaded and applied
    StateRestored,
}

/// Cloneable handle for publishing [`UiEvent`]s.
#[derive(Debug, Clone)]
pub struct EventBroadcaster {
    sender: broadcast::Sender<UiEvent>,
}

impl EventBroadcaster {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Publish an event. Never blocks and never fails.
    pub fn send(&self, event: UiEvent) {
        if self.sender.receiver_count() == 0 {
            debug!("UI event (no subscribers): {:?}", event);
            return;
        }
        if let Err(broadcast::error::SendError(event)) = self.sender.send(event) {
            debug!("UI event dropped, receivers closed: {:?}", event);
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<UiEvent> {
        self.sender.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_without_subscribers_is_silent() {
        let events = EventBroadcaster::new();
        events.send(UiEvent::ToggleMute);
        assert_eq!(events.subscriber_count(), 0);
    }

    #[test]
    fn test_subscribers_receive_in_order() {
        let events = EventBroadcaster::new();
        let mut rx = events.subscribe();
        events.send(UiEvent::UpdateVolume(80));
        events.send(UiEvent::ToggleMute);

        assert_eq!(rx.try_recv().unwrap(), UiEvent::UpdateVolume(80));
        assert_eq!(rx.try_recv().unwrap(), UiEvent::ToggleMute);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_dropped_receiver_does_not_break_sender() {
        let events = EventBroadcaster::new();
        let rx = events.subscribe();
        drop(rx);
        events.send(UiEvent::StateRestored);

        let mut rx = events.subscribe();
        events.send(UiEvent::HotkeyCaptured("Ctrl+M".to_string()));
        assert_eq!(
            rx.try_recv().unwrap(),
            UiEvent::HotkeyCaptured("Ctrl+M".to_string())
        );
    }

    #[test]
    fn test_event_json_shape() {
        let json = serde_json::to_value(UiEvent::UpdateVolume(40)).unwrap();
        assert_eq!(json["type"], "update_volume");
        assert_eq!(json["value"], 40);
        let json = serde_json::to_value(UiEvent::ToggleMute).unwrap();
        assert_eq!(json["type"], "toggle_mute");
    }
}
