use std::{collections::VecDeque, path::PathBuf, time::SystemTime};

use log::info;

use crate::WayfarerError;

use super::{PositionSource, WatchEvent, WatchId, WatchOptions};

/// Position source that plays back a recorded trace file, one event per
/// poll. Fixes are re-stamped at delivery so the freshness rule treats a
/// replayed trace as live data.
pub struct ReplaySource {
    path: PathBuf,
    events: VecDeque<WatchEvent>,
    watching: bool,
}

impl ReplaySource {
    pub fn from_file(path: &PathBuf) -> Result<Self, WayfarerError> {
        if !path.exists() {
            return Err(WayfarerError::InvalidTraceFile {
                path: format!("{:?}", path),
            });
        }
        let events = serde_jsonlines::json_lines(path)
            .map_err(|e| WayfarerError::TraceLoaderError { source: e })?
            .collect::<Result<Vec<WatchEvent>, std::io::Error>>()
            .map_err(|e| WayfarerError::TraceLoaderError { source: e })?;
        info!("loaded {} trace events from {:?}", events.len(), path);

        Ok(Self {
            path: path.clone(),
            events: events.into(),
            watching: false,
        })
    }
}

impl PositionSource for ReplaySource {
    fn watch(&mut self, _options: &WatchOptions) -> Result<WatchId, WayfarerError> {
        self.watching = true;
        info!("replaying trace {:?}", self.path);
        Ok(1)
    }

    fn next_event(&mut self) -> Result<Option<WatchEvent>, WayfarerError> {
        if !self.watching {
            return Err(WayfarerError::WatchNotRegistered);
        }
        let event = self.events.pop_front().map(|event| match event {
            WatchEvent::Fix(mut fix) => {
                fix.received_at = SystemTime::now();
                WatchEvent::Fix(fix)
            }
            error => error,
        });
        Ok(event)
    }

    fn clear_watch(&mut self, _watch: WatchId) -> Result<(), WayfarerError> {
        self.watching = false;
        Ok(())
    }
}
