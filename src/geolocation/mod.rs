pub mod geodesy;
pub mod gpsd;
pub mod replay;
pub mod watcher;

use std::time::SystemTime;

use serde::{Deserialize, Serialize};

use crate::WayfarerError;

pub use watcher::watch_positions;

/// Provider code for an unclassified failure.
pub const ERROR_UNKNOWN: u16 = 0;
/// Provider code for a permission refusal.
pub const ERROR_PERMISSION_DENIED: u16 = 1;
/// Provider code for a fix that could not be produced.
pub const ERROR_POSITION_UNAVAILABLE: u16 = 2;
/// Provider code for a watch that produced nothing in time.
pub const ERROR_TIMEOUT: u16 = 3;

/// A geographic point in decimal degrees.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// One reported position sample from a provider.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PositionFix {
    pub coord: Coordinate,
    /// Height above the ellipsoid, when the provider reports one
    pub altitude_m: Option<f64>,
    /// Ground speed, when the provider reports one
    pub speed_mps: Option<f64>,
    /// When this sample was received from the provider
    pub received_at: SystemTime,
}

impl PositionFix {
    /// A fix received right now, with no altitude or speed.
    pub fn at(coord: Coordinate) -> Self {
        Self {
            coord,
            altitude_m: None,
            speed_mps: None,
            received_at: SystemTime::now(),
        }
    }
}

/// A failure reported by the position provider, using the provider's
/// numeric code space.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProviderError {
    pub code: u16,
    pub message: String,
}

impl ProviderError {
    pub fn position_unavailable(message: impl Into<String>) -> Self {
        Self {
            code: ERROR_POSITION_UNAVAILABLE,
            message: message.into(),
        }
    }

    pub fn timed_out() -> Self {
        Self {
            code: ERROR_TIMEOUT,
            message: String::new(),
        }
    }

    /// Human-readable text for the error display. Codes 0 and 2 carry the
    /// provider's raw message for diagnostics; 1 and 3 are self-explanatory.
    /// Codes outside the provider code space fall back to the generic text.
    pub fn human_message(&self) -> String {
        let canned = match self.code {
            ERROR_PERMISSION_DENIED => "Permission denied by user",
            ERROR_POSITION_UNAVAILABLE => "Position unavailable",
            ERROR_TIMEOUT => "Location request timed out",
            _ => "Unknown error",
        };
        match self.code {
            ERROR_UNKNOWN | ERROR_POSITION_UNAVAILABLE if !self.message.is_empty() => {
                format!("{} {}", canned, self.message)
            }
            _ => canned.to_string(),
        }
    }
}

/// A typed event delivered by an active watch, in arrival order.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum WatchEvent {
    Fix(PositionFix),
    Error(ProviderError),
}

/// Options consumed when registering a watch.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct WatchOptions {
    /// Ask the provider for its best fixes (a full satellite fix for gpsd)
    pub high_accuracy: bool,
    /// How long a quiet watch may stay quiet before a timeout error is raised
    pub timeout_ms: u64,
    /// Oldest acceptable fix age at delivery; 0 means only fresh fixes
    pub maximum_age_ms: u64,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout_ms: 5000,
            maximum_age_ms: 0,
        }
    }
}

/// Handle for a registered watch.
pub type WatchId = u64;

/// A continuous position provider. `watch` registers a standing
/// subscription, `next_event` is polled for whatever the provider has
/// produced since the last poll, and `clear_watch` cancels the
/// subscription so no further events are produced.
pub trait PositionSource {
    fn watch(&mut self, options: &WatchOptions) -> Result<WatchId, WayfarerError>;

    fn next_event(&mut self) -> Result<Option<WatchEvent>, WayfarerError>;

    fn clear_watch(&mut self, watch: WatchId) -> Result<(), WayfarerError>;
}
