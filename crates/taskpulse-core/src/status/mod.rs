//! Connection state and the derived status indicator.
//!
//! The indicator is never stored: it is recomputed from the current
//! transport state and unread count whenever someone asks.

use serde::{Deserialize, Serialize};

/// Badge colors, matching the web client's palette.
pub const COLOR_CONNECTED: &str = "#4caf50";
pub const COLOR_UNREAD: &str = "#ff6b6b";
pub const COLOR_DISCONNECTED: &str = "#f44336";

/// Lifecycle state of the active transport.
///
/// Owned exclusively by the transport; every other component reads it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum TransportState {
    /// No transport is running (engine unconfigured or stopped).
    Idle,
    Connecting,
    /// Deliveries are flowing.
    Active,
    /// Connection lost; one reconnect is scheduled.
    Backoff { attempt: u32, next_retry_at: String },
    /// Last attempt failed; the flat-interval timer will retry.
    Failed,
}

impl TransportState {
    pub fn is_active(&self) -> bool {
        matches!(self, TransportState::Active)
    }
}

/// Compact visible indicator: a glyph and its background color.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusIndicator {
    pub glyph: String,
    pub color: String,
}

/// Derive the indicator from transport state and unread count.
pub fn project(state: &TransportState, unread_count: usize) -> StatusIndicator {
    match state {
        TransportState::Active if unread_count == 0 => StatusIndicator {
            glyph: "✓".to_string(),
            color: COLOR_CONNECTED.to_string(),
        },
        TransportState::Active => StatusIndicator {
            glyph: unread_count.to_string(),
            color: COLOR_UNREAD.to_string(),
        },
        TransportState::Idle
        | TransportState::Connecting
        | TransportState::Backoff { .. }
        | TransportState::Failed => StatusIndicator {
            glyph: "✗".to_string(),
            color: COLOR_DISCONNECTED.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_active_no_unread_is_green_check() {
        let indicator = project(&TransportState::Active, 0);
        assert_eq!(indicator.glyph, "✓");
        assert_eq!(indicator.color, COLOR_CONNECTED);
    }

    #[test]
    fn test_active_with_unread_shows_count_in_red() {
        let indicator = project(&TransportState::Active, 3);
        assert_eq!(indicator.glyph, "3");
        assert_eq!(indicator.color, COLOR_UNREAD);
    }

    #[test]
    fn test_backoff_is_red_cross_regardless_of_unread() {
        let state = TransportState::Backoff {
            attempt: 1,
            next_retry_at: "2026-03-01T09:00:05Z".to_string(),
        };
        let indicator = project(&state, 0);
        assert_eq!(indicator.glyph, "✗");
        assert_eq!(indicator.color, COLOR_DISCONNECTED);
    }

    #[test]
    fn test_failed_connecting_and_idle_are_red_cross() {
        for state in [
            TransportState::Failed,
            TransportState::Connecting,
            TransportState::Idle,
        ] {
            let indicator = project(&state, 7);
            assert_eq!(indicator.glyph, "✗");
            assert_eq!(indicator.color, COLOR_DISCONNECTED);
        }
    }

    #[test]
    fn test_transport_state_serializes_tagged() {
        let json = serde_json::to_string(&TransportState::Backoff {
            attempt: 2,
            next_retry_at: "2026-03-01T09:00:05Z".to_string(),
        })
        .unwrap();
        assert!(json.contains(r#""state":"backoff""#));
        assert!(json.contains(r#""attempt":2"#));
    }
}
