use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc::Sender,
    },
    thread,
    time::{Duration, Instant, SystemTime},
};

use log::{debug, warn};

use crate::WayfarerError;

use super::{PositionFix, PositionSource, ProviderError, WatchEvent, WatchOptions};

pub(crate) const POLL_INTERVAL_MS: u64 = 250;

// Fixes spend up to one poll interval in the source before we see them, so
// the freshness bound gets that much slack on top of maximum_age_ms.
const FRESHNESS_SLACK_MS: u64 = POLL_INTERVAL_MS;

/// Runs a standing position watch until the stop flag rises: registers the
/// watch, polls the source, and forwards events in arrival order to the UI
/// channel and, when recording, the trace channel. Provider failures become
/// error events rather than ending the watch; a quiet watch raises a
/// timeout error after `options.timeout_ms`.
pub fn watch_positions(
    mut source: Box<dyn PositionSource + Send>,
    options: WatchOptions,
    event_sender: Sender<WatchEvent>,
    trace_sender: Option<Sender<WatchEvent>>,
    stop: Arc<AtomicBool>,
) -> Result<(), WayfarerError> {
    let watch = match source.watch(&options) {
        Ok(watch) => watch,
        Err(e) => {
            let event = WatchEvent::Error(ProviderError::position_unavailable(e.to_string()));
            broadcast(event, &event_sender, &trace_sender);
            return Err(e);
        }
    };

    let mut last_delivery = Instant::now();
    while !stop.load(Ordering::Relaxed) {
        thread::sleep(Duration::from_millis(POLL_INTERVAL_MS));

        let event = match source.next_event() {
            Ok(Some(WatchEvent::Fix(fix))) if is_stale(&fix, &options) => {
                debug!("dropping stale fix received at {:?}", fix.received_at);
                None
            }
            Ok(event) => event,
            Err(e) => {
                warn!("position source error: {}", e);
                Some(WatchEvent::Error(ProviderError::position_unavailable(
                    e.to_string(),
                )))
            }
        };

        let event = match event {
            Some(event) => event,
            None => {
                if last_delivery.elapsed() >= Duration::from_millis(options.timeout_ms) {
                    last_delivery = Instant::now();
                    WatchEvent::Error(ProviderError::timed_out())
                } else {
                    continue;
                }
            }
        };

        last_delivery = Instant::now();
        if !broadcast(event, &event_sender, &trace_sender) {
            // the UI went away; nothing left to deliver to
            break;
        }
    }

    source.clear_watch(watch)
}

fn is_stale(fix: &PositionFix, options: &WatchOptions) -> bool {
    let age = SystemTime::now()
        .duration_since(fix.received_at)
        .unwrap_or(Duration::ZERO);
    age > Duration::from_millis(options.maximum_age_ms + FRESHNESS_SLACK_MS)
}

fn broadcast(
    event: WatchEvent,
    event_sender: &Sender<WatchEvent>,
    trace_sender: &Option<Sender<WatchEvent>>,
) -> bool {
    if let Some(trace_sender) = trace_sender {
        let _ = trace_sender.send(event.clone());
    }
    event_sender.send(event).is_ok()
}
