// Error types for wayfarer

use crate::geolocation::WatchEvent;
use snafu::Snafu;
use std::{io, sync::mpsc::SendError};

#[derive(Debug, Snafu)]
pub enum WayfarerError {
    // Errors raised before a watch can be registered
    #[snafu(display("Geolocation is not available: {reason}"))]
    GeolocationUnavailable { reason: String },

    // Errors for the gpsd client
    #[snafu(display("Unable to reach gpsd at {address}"))]
    GpsdConnectionError { address: String, source: io::Error },
    #[snafu(display("Unexpected response from gpsd: {description}"))]
    GpsdProtocolError { description: String },

    // Errors while reading and broadcasting position data
    #[snafu(display("Position watch is not registered"))]
    WatchNotRegistered,
    #[snafu(display("Error broadcasting watch event"))]
    WatchBroadcastError {
        source: Box<SendError<WatchEvent>>,
    },

    // Errors for the trace writer and replay loader
    #[snafu(display("Error writing trace file"))]
    WriterError { source: io::Error },
    #[snafu(display("Invalid trace file: {path}"))]
    InvalidTraceFile { path: String },
    #[snafu(display("Error loading trace file"))]
    TraceLoaderError { source: io::Error },

    // Config management errors
    #[snafu(display("Could not find application data directory to save config file"))]
    NoConfigDir,
    #[snafu(display("Error writing config file"))]
    ConfigIOError { source: io::Error },
    #[snafu(display("Error serializing config file"))]
    ConfigSerializeError { source: serde_json::Error },

    // User input validation errors
    #[snafu(display("Invalid landmark '{value}': expected 'latitude,longitude' in degrees"))]
    InvalidLandmark { value: String },
}

impl From<SendError<WatchEvent>> for WayfarerError {
    fn from(value: SendError<WatchEvent>) -> Self {
        WayfarerError::WatchBroadcastError {
            source: Box::new(value),
        }
    }
}
