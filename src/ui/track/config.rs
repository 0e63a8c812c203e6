use egui::Pos2;
use serde::{Deserialize, Serialize};

use crate::WayfarerError;
use crate::geolocation::Coordinate;

use super::map_view::{BaseLayer, DEFAULT_ZOOM};

const CONFIG_FILE_NAME: &str = "config.json";
const CONFIG_DIR_NAME: &str = "wayfarer";

pub(crate) const REFRESH_RATE_MS: usize = 100;

// The landmark the distance readout points at unless configured otherwise.
pub(crate) const DEFAULT_LANDMARK_NAME: &str = "WickedlySmart HQ";
pub(crate) const DEFAULT_LANDMARK_LATITUDE: f64 = 47.624851;
pub(crate) const DEFAULT_LANDMARK_LONGITUDE: f64 = -122.52099;

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct WindowPosition {
    pub x: f32,
    pub y: f32,
}

impl Default for WindowPosition {
    fn default() -> Self {
        Self { x: 0., y: 0. }
    }
}

impl From<WindowPosition> for Pos2 {
    fn from(value: WindowPosition) -> Self {
        Pos2::new(value.x, value.y)
    }
}

impl From<Pos2> for WindowPosition {
    fn from(value: Pos2) -> Self {
        Self {
            x: value.x,
            y: value.y,
        }
    }
}

#[derive(Serialize, Deserialize, Debug)]
#[serde(default)]
pub struct AppConfig {
    pub refresh_rate_ms: usize,
    pub zoom: u8,
    pub base_layer: BaseLayer,
    pub show_speed_panel: bool,
    pub window_position: WindowPosition,
    pub landmark_name: String,
    pub landmark_latitude: f64,
    pub landmark_longitude: f64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            refresh_rate_ms: REFRESH_RATE_MS,
            zoom: DEFAULT_ZOOM,
            base_layer: BaseLayer::default(),
            show_speed_panel: false,
            window_position: WindowPosition::default(),
            landmark_name: DEFAULT_LANDMARK_NAME.to_string(),
            landmark_latitude: DEFAULT_LANDMARK_LATITUDE,
            landmark_longitude: DEFAULT_LANDMARK_LONGITUDE,
        }
    }
}

impl AppConfig {
    pub fn landmark(&self) -> Coordinate {
        Coordinate::new(self.landmark_latitude, self.landmark_longitude)
    }

    pub fn from_local_file() -> Option<Self> {
        let config_path = dirs::config_dir()?.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME);

        if config_path.exists() {
            let file = std::fs::File::open(config_path).expect("Could not open config file");
            Some(serde_json::from_reader(file).expect("Could not parse config file"))
        } else {
            None
        }
    }

    pub fn save(&self) -> Result<(), WayfarerError> {
        let config_path = dirs::config_dir()
            .ok_or(WayfarerError::NoConfigDir)?
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            std::fs::create_dir_all(config_path.parent().unwrap())
                .map_err(|e| WayfarerError::ConfigIOError { source: e })?;
        }

        let file = std::fs::File::create(config_path)
            .map_err(|e| WayfarerError::ConfigIOError { source: e })?;
        serde_json::to_writer(file, self)
            .map_err(|e| WayfarerError::ConfigSerializeError { source: e })
    }
}

/// Parses a "latitude,longitude" override for the landmark readout.
pub fn parse_landmark(value: &str) -> Result<Coordinate, WayfarerError> {
    let invalid = || WayfarerError::InvalidLandmark {
        value: value.to_string(),
    };

    let (latitude, longitude) = value.split_once(',').ok_or_else(invalid)?;
    let latitude: f64 = latitude.trim().parse().map_err(|_| invalid())?;
    let longitude: f64 = longitude.trim().parse().map_err(|_| invalid())?;
    if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
        return Err(invalid());
    }
    Ok(Coordinate::new(latitude, longitude))
}
