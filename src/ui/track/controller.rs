use std::{
    collections::VecDeque,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
        mpsc::Sender,
    },
    thread,
};

use log::{error, info};
use simple_moving_average::{SMA, SumTreeSMA};

use crate::{
    WayfarerError,
    geolocation::{
        Coordinate, PositionFix, PositionSource, WatchEvent, WatchOptions, geodesy, watcher,
    },
    ui::StatusBanner,
};

use super::map_view::MapView;

const SPEED_SMOOTHING_WINDOW: usize = 8;
const SPEED_HISTORY_POINTS: usize = 120;
const MPS_TO_KMH: f64 = 3.6;

/// Builds a fresh position source for each tracking session. A factory
/// error means positioning is not available at all (bad address, missing
/// trace file) and leaves the controller idle.
pub type SourceFactory =
    Box<dyn Fn() -> Result<Box<dyn PositionSource + Send>, WayfarerError> + Send>;

struct WatchSession {
    stop: Arc<AtomicBool>,
}

/// Owns the watch lifecycle and everything derived from it: the path
/// trace, the map state, the distance/speed readouts and the error text.
/// Idle and Tracking are the only two states; `session` is `Some` exactly
/// while Tracking.
pub struct TrackingController {
    source_factory: SourceFactory,
    event_sender: Sender<WatchEvent>,
    trace_sender: Option<Sender<WatchEvent>>,
    session: Option<WatchSession>,
    path: Vec<Coordinate>,
    map: MapView,
    status: StatusBanner,
    landmark: Coordinate,
    landmark_name: String,
    last_fix: Option<PositionFix>,
    distance_to_landmark_km: Option<f64>,
    last_error: Option<String>,
    speed_average: SumTreeSMA<f64, f64, SPEED_SMOOTHING_WINDOW>,
    smoothed_speed_kmh: Option<f64>,
    speed_history: VecDeque<f64>,
}

impl TrackingController {
    pub fn new(
        source_factory: SourceFactory,
        event_sender: Sender<WatchEvent>,
        trace_sender: Option<Sender<WatchEvent>>,
        landmark: Coordinate,
        landmark_name: String,
        map: MapView,
    ) -> Self {
        Self {
            source_factory,
            event_sender,
            trace_sender,
            session: None,
            path: Vec::new(),
            map,
            status: StatusBanner::default(),
            landmark,
            landmark_name,
            last_fix: None,
            distance_to_landmark_km: None,
            last_error: None,
            speed_average: SumTreeSMA::new(),
            smoothed_speed_kmh: None,
            speed_history: VecDeque::new(),
        }
    }

    pub fn is_tracking(&self) -> bool {
        self.session.is_some()
    }

    /// Registers a continuous watch and transitions to Tracking. Calling
    /// this while already Tracking does nothing; the single active session
    /// is kept.
    pub fn start(&mut self) {
        if self.session.is_some() {
            return;
        }

        let source = match (self.source_factory)() {
            Ok(source) => source,
            Err(e) => {
                error!("could not create a position source: {}", e);
                self.last_error = Some(e.to_string());
                return;
            }
        };

        let stop = Arc::new(AtomicBool::new(false));
        let watcher_stop = stop.clone();
        let event_sender = self.event_sender.clone();
        let trace_sender = self.trace_sender.clone();
        thread::spawn(move || {
            if let Err(e) = watcher::watch_positions(
                source,
                WatchOptions::default(),
                event_sender,
                trace_sender,
                watcher_stop,
            ) {
                error!("position watch ended: {}", e);
            }
        });

        self.session = Some(WatchSession { stop });
        self.status.show("Tracking started.");
        info!("tracking started");
    }

    /// Cancels the active watch and returns to Idle. A no-op when Idle.
    pub fn stop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        session.stop.store(true, Ordering::Relaxed);
        self.status.show("Tracking canceled.");
        info!("tracking canceled");
    }

    /// Empties the path trace and removes the rendered polyline. Valid in
    /// either state; markers and the active watch are unaffected.
    pub fn clear_path(&mut self) {
        self.path.clear();
        self.map.clear_trace();
        self.status.show("Path cleared.");
    }

    pub fn handle_event(&mut self, event: WatchEvent) {
        match event {
            WatchEvent::Fix(fix) => self.on_position(fix),
            WatchEvent::Error(e) => self.on_error(e),
        }
    }

    fn on_position(&mut self, fix: PositionFix) {
        if self.session.is_none() {
            // dispatched just before the watch was cleared; the session is
            // gone so the fix no longer applies
            return;
        }

        self.last_error = None;
        self.distance_to_landmark_km = Some(geodesy::distance_km(fix.coord, self.landmark));

        if let Some(speed_mps) = fix.speed_mps {
            let kmh = speed_mps * MPS_TO_KMH;
            self.speed_average.add_sample(kmh);
            self.smoothed_speed_kmh = Some(self.speed_average.get_average());
            self.speed_history.push_back(kmh);
            if self.speed_history.len() > SPEED_HISTORY_POINTS {
                self.speed_history.pop_front();
            }
        }

        self.path.push(fix.coord);
        if !self.map.is_initialized() {
            self.map.initialize(fix.coord);
        } else {
            self.map.track_movement(fix.coord, &self.path);
        }
        self.last_fix = Some(fix);
    }

    fn on_error(&mut self, error: crate::geolocation::ProviderError) {
        if self.session.is_none() {
            return;
        }
        self.last_error = Some(error.human_message());
    }

    pub fn path(&self) -> &[Coordinate] {
        &self.path
    }

    pub fn traveled_km(&self) -> f64 {
        geodesy::path_length_km(&self.path)
    }

    pub fn map(&self) -> &MapView {
        &self.map
    }

    pub(crate) fn map_mut(&mut self) -> &mut MapView {
        &mut self.map
    }

    pub fn status_mut(&mut self) -> &mut StatusBanner {
        &mut self.status
    }

    pub fn last_fix(&self) -> Option<&PositionFix> {
        self.last_fix.as_ref()
    }

    pub fn distance_to_landmark_km(&self) -> Option<f64> {
        self.distance_to_landmark_km
    }

    pub fn landmark_name(&self) -> &str {
        &self.landmark_name
    }

    pub fn error_text(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn speed_kmh(&self) -> Option<f64> {
        self.smoothed_speed_kmh
    }

    pub(crate) fn speed_history(&self) -> &VecDeque<f64> {
        &self.speed_history
    }
}
