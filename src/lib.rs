// Library interface for wayfarer
// This allows integration tests to access internal modules

pub mod errors;
pub mod geolocation;
pub mod ui;
pub mod writer;

// Re-export commonly used types
pub use errors::WayfarerError;
pub use geolocation::{
    Coordinate, PositionFix, PositionSource, ProviderError, WatchEvent, WatchId, WatchOptions,
};
pub use ui::track::TrackerApp;
