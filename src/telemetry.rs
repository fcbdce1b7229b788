//! Observability egress.
//!
//! The controller reports session milestones as [`TelemetryEvent`]s through an
//! [`EventSink`]. Consumers decide what to do with them; [`LogSink`] writes
//! them to the `log` facade and [`MemorySink`] keeps them in memory.

use std::cell::RefCell;
use std::rc::Rc;

use log::info;
use serde::Serialize;

use crate::config::GameMode;
use crate::power_ups::PowerUpKind;
use crate::scoring::EndReason;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventName {
    GameStart,
    GameComplete,
    PowerUpUsed,
}

impl EventName {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventName::GameStart => "game_start",
            EventName::GameComplete => "game_complete",
            EventName::PowerUpUsed => "power_up_used",
        }
    }
}

/// One observability event. Optional fields are left out of the JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TelemetryEvent {
    pub name: EventName,
    pub game_id: String,
    pub mode: GameMode,
    /// Final percentage, on `game_complete` only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentage: Option<u32>,
    /// Why the session ended, on `game_complete` only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<EndReason>,
    /// Answers recorded when the event fired.
    pub answered: u32,
    /// Correct answers when the event fired.
    pub score: u32,
    /// Which power-up, on `power_up_used` only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub power_up: Option<PowerUpKind>,
}

pub trait EventSink {
    fn emit(&self, event: &TelemetryEvent);
}

/// Writes every event as one JSON line at `info` level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl EventSink for LogSink {
    fn emit(&self, event: &TelemetryEvent) {
        match serde_json::to_string(event) {
            Ok(json) => info!("{} {}", event.name.as_str(), json),
            Err(_) => info!("{} {:?}", event.name.as_str(), event),
        }
    }
}

/// Collects events; clones share the same buffer.
#[derive(Debug, Default, Clone)]
pub struct MemorySink {
    events: Rc<RefCell<Vec<TelemetryEvent>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.events.borrow().clone()
    }

    pub fn names(&self) -> Vec<EventName> {
        self.events.borrow().iter().map(|event| event.name).collect()
    }
}

impl EventSink for MemorySink {
    fn emit(&self, event: &TelemetryEvent) {
        self.events.borrow_mut().push(event.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_clones_share_events() {
        let sink = MemorySink::new();
        let handle = sink.clone();
        sink.emit(&TelemetryEvent {
            name: EventName::GameStart,
            game_id: "general".to_string(),
            mode: GameMode::Quick,
            percentage: None,
            reason: None,
            answered: 0,
            score: 0,
            power_up: None,
        });
        assert_eq!(handle.names(), vec![EventName::GameStart]);
    }

    #[test]
    fn serialized_payload_omits_empty_fields() {
        let event = TelemetryEvent {
            name: EventName::GameComplete,
            game_id: "science".to_string(),
            mode: GameMode::Blitz,
            percentage: Some(67),
            reason: Some(EndReason::Timer),
            answered: 3,
            score: 2,
            power_up: None,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["name"], "game_complete");
        assert_eq!(json["mode"], "blitz");
        assert_eq!(json["reason"], "timer");
        assert!(json.get("power_up").is_none());
    }
}
