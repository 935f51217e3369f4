//! Configuration types for listening to events

use serde::{Deserialize, Serialize};

use crate::error::LazyListResult;

/// Options passed along with an event subscription.
///
/// `end` names the terminal event type: when it fires, the primary listener is
/// removed and the terminal payload is delivered as the last buffered item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenOptions {
    pub end: Option<String>,
    /// Listeners registered with `capture` only match removals with the same flag
    pub capture: bool,
}

impl ListenOptions {
    /// Options with no terminal event and capture off
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the terminal event type
    pub fn end(mut self, event_type: impl Into<String>) -> Self {
        self.end = Some(event_type.into());
        self
    }

    /// Set the capture flag passed through to the event source
    pub fn capture(mut self, capture: bool) -> Self {
        self.capture = capture;
        self
    }

    /// Parse options from a JSON object such as `{ "end": "mouseup" }`
    pub fn from_json(json: &str) -> LazyListResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Buffer configuration for event bridges
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub initial_capacity: usize,
    /// Log a warning each time the backlog reaches a multiple of this size.
    /// The buffer is never truncated.
    pub backlog_warning: Option<usize>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 16,
            backlog_warning: Some(1024),
        }
    }
}

impl BridgeConfig {
    pub fn from_json(json: &str) -> LazyListResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
