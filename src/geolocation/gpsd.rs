use std::{
    io::{BufRead, BufReader, ErrorKind, Write},
    net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs},
    time::{Duration, SystemTime},
};

use log::{debug, info};
use serde::Deserialize;

use crate::WayfarerError;

use super::{
    Coordinate, PositionFix, PositionSource, ProviderError, WatchEvent, WatchId, WatchOptions,
};

pub const DEFAULT_GPSD_ADDRESS: &str = "127.0.0.1:2947";

const WATCH_ENABLE: &[u8] = b"?WATCH={\"enable\":true,\"json\":true};\n";
const WATCH_DISABLE: &[u8] = b"?WATCH={\"enable\":false};\n";

// gpsd fix modes: 0 unknown, 1 no fix, 2 two-dimensional, 3 three-dimensional
const MODE_2D: u8 = 2;
const MODE_3D: u8 = 3;

// Reads block for at most this long so the watch loop stays responsive to
// its stop flag; the watch-level timeout is enforced by the watcher.
const READ_TIMEOUT_MS: u64 = 500;

/// One report line from gpsd. Only the fields the tracker consumes; gpsd
/// sends plenty more.
#[derive(Debug, Deserialize)]
struct GpsdReport {
    class: String,
    #[serde(default)]
    mode: u8,
    lat: Option<f64>,
    lon: Option<f64>,
    #[serde(rename = "altHAE")]
    alt_hae: Option<f64>,
    alt: Option<f64>,
    speed: Option<f64>,
}

/// Position source backed by a gpsd daemon speaking its JSON protocol over
/// TCP. The address is resolved at construction so an unusable address is
/// reported before a watch is ever registered.
pub struct GpsdSource {
    address: String,
    socket_addr: SocketAddr,
    stream: Option<TcpStream>,
    reader: Option<BufReader<TcpStream>>,
    min_fix_mode: u8,
    next_watch_id: WatchId,
}

impl GpsdSource {
    pub fn new(address: &str) -> Result<Self, WayfarerError> {
        let socket_addr = address
            .to_socket_addrs()
            .map_err(|e| WayfarerError::GeolocationUnavailable {
                reason: format!("cannot resolve gpsd address {}: {}", address, e),
            })?
            .next()
            .ok_or_else(|| WayfarerError::GeolocationUnavailable {
                reason: format!("gpsd address {} resolves to nothing", address),
            })?;

        Ok(Self {
            address: address.to_string(),
            socket_addr,
            stream: None,
            reader: None,
            min_fix_mode: MODE_2D,
            next_watch_id: 1,
        })
    }
}

impl PositionSource for GpsdSource {
    fn watch(&mut self, options: &WatchOptions) -> Result<WatchId, WayfarerError> {
        let mut stream = TcpStream::connect_timeout(
            &self.socket_addr,
            Duration::from_millis(options.timeout_ms),
        )
        .map_err(|e| WayfarerError::GpsdConnectionError {
            address: self.address.clone(),
            source: e,
        })?;
        stream
            .set_read_timeout(Some(Duration::from_millis(READ_TIMEOUT_MS)))
            .map_err(|e| WayfarerError::GpsdConnectionError {
                address: self.address.clone(),
                source: e,
            })?;

        stream
            .write_all(WATCH_ENABLE)
            .map_err(|e| WayfarerError::GpsdConnectionError {
                address: self.address.clone(),
                source: e,
            })?;

        let reader_stream =
            stream
                .try_clone()
                .map_err(|e| WayfarerError::GpsdConnectionError {
                    address: self.address.clone(),
                    source: e,
                })?;
        self.reader = Some(BufReader::new(reader_stream));
        self.stream = Some(stream);
        self.min_fix_mode = if options.high_accuracy {
            MODE_3D
        } else {
            MODE_2D
        };

        info!("watching gpsd at {}", self.address);
        let watch = self.next_watch_id;
        self.next_watch_id += 1;
        Ok(watch)
    }

    fn next_event(&mut self) -> Result<Option<WatchEvent>, WayfarerError> {
        let reader = self.reader.as_mut().ok_or(WayfarerError::WatchNotRegistered)?;

        let mut line = String::new();
        match reader.read_line(&mut line) {
            Ok(0) => Err(WayfarerError::GpsdProtocolError {
                description: format!("gpsd at {} closed the connection", self.address),
            }),
            Ok(_) => parse_report(&line, self.min_fix_mode),
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => Ok(None),
            Err(e) => Err(WayfarerError::GpsdConnectionError {
                address: self.address.clone(),
                source: e,
            }),
        }
    }

    fn clear_watch(&mut self, _watch: WatchId) -> Result<(), WayfarerError> {
        self.reader = None;
        if let Some(mut stream) = self.stream.take() {
            // the daemon keeps streaming until told otherwise
            let _ = stream.write_all(WATCH_DISABLE);
            let _ = stream.shutdown(Shutdown::Both);
            info!("stopped watching gpsd at {}", self.address);
        }
        Ok(())
    }
}

/// Turns one gpsd report line into a watch event. Classes other than TPV
/// (VERSION, DEVICES, WATCH, SKY) carry no position and are skipped; a TPV
/// without a usable fix becomes a position-unavailable error.
fn parse_report(line: &str, min_fix_mode: u8) -> Result<Option<WatchEvent>, WayfarerError> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let report: GpsdReport =
        serde_json::from_str(line).map_err(|e| WayfarerError::GpsdProtocolError {
            description: format!("unparseable report: {}", e),
        })?;

    if report.class != "TPV" {
        debug!("skipping gpsd {} report", report.class);
        return Ok(None);
    }

    if report.mode < min_fix_mode {
        let detail = if report.mode < MODE_2D {
            "no satellite fix"
        } else {
            "no 3D fix"
        };
        return Ok(Some(WatchEvent::Error(ProviderError::position_unavailable(
            detail,
        ))));
    }

    let (Some(lat), Some(lon)) = (report.lat, report.lon) else {
        return Ok(Some(WatchEvent::Error(ProviderError::position_unavailable(
            "fix report carries no coordinates",
        ))));
    };

    Ok(Some(WatchEvent::Fix(PositionFix {
        coord: Coordinate::new(lat, lon),
        altitude_m: report.alt_hae.or(report.alt),
        speed_mps: report.speed,
        received_at: SystemTime::now(),
    })))
}

#[cfg(test)]
mod tests {
    use crate::geolocation::ERROR_POSITION_UNAVAILABLE;

    use super::*;

    const TPV_3D: &str = r#"{"class":"TPV","device":"/dev/ttyACM0","mode":3,"time":"2024-05-04T12:00:00.000Z","lat":47.624851,"lon":-122.52099,"altHAE":32.1,"speed":1.25}"#;
    const TPV_2D: &str = r#"{"class":"TPV","device":"/dev/ttyACM0","mode":2,"lat":47.6,"lon":-122.5}"#;
    const TPV_NO_FIX: &str = r#"{"class":"TPV","device":"/dev/ttyACM0","mode":1}"#;
    const VERSION: &str = r#"{"class":"VERSION","release":"3.25","rev":"3.25","proto_major":3,"proto_minor":15}"#;

    #[test]
    fn test_tpv_with_fix_becomes_position_fix() {
        let event = parse_report(TPV_3D, MODE_2D).unwrap().unwrap();
        match event {
            WatchEvent::Fix(fix) => {
                assert_eq!(fix.coord.latitude, 47.624851);
                assert_eq!(fix.coord.longitude, -122.52099);
                assert_eq!(fix.altitude_m, Some(32.1));
                assert_eq!(fix.speed_mps, Some(1.25));
            }
            WatchEvent::Error(e) => panic!("unexpected error: {:?}", e),
        }
    }

    #[test]
    fn test_tpv_without_fix_becomes_unavailable_error() {
        let event = parse_report(TPV_NO_FIX, MODE_2D).unwrap().unwrap();
        match event {
            WatchEvent::Error(e) => {
                assert_eq!(e.code, ERROR_POSITION_UNAVAILABLE);
                assert_eq!(e.message, "no satellite fix");
            }
            WatchEvent::Fix(fix) => panic!("unexpected fix: {:?}", fix),
        }
    }

    #[test]
    fn test_high_accuracy_rejects_two_dimensional_fixes() {
        let event = parse_report(TPV_2D, MODE_3D).unwrap().unwrap();
        match event {
            WatchEvent::Error(e) => {
                assert_eq!(e.code, ERROR_POSITION_UNAVAILABLE);
                assert_eq!(e.message, "no 3D fix");
            }
            WatchEvent::Fix(fix) => panic!("unexpected fix: {:?}", fix),
        }

        // the same report is a fix once 2D is acceptable
        assert!(matches!(
            parse_report(TPV_2D, MODE_2D).unwrap(),
            Some(WatchEvent::Fix(_))
        ));
    }

    #[test]
    fn test_non_tpv_classes_are_skipped() {
        assert!(parse_report(VERSION, MODE_2D).unwrap().is_none());
        assert!(parse_report("", MODE_2D).unwrap().is_none());
        assert!(parse_report("\n", MODE_2D).unwrap().is_none());
    }

    #[test]
    fn test_garbage_line_is_a_protocol_error() {
        let result = parse_report("not json at all", MODE_2D);
        assert!(matches!(
            result,
            Err(WayfarerError::GpsdProtocolError { .. })
        ));
    }

    #[test]
    fn test_unresolvable_address_is_reported_at_construction() {
        let result = GpsdSource::new("definitely-not-a-real-host.invalid:2947");
        assert!(matches!(
            result,
            Err(WayfarerError::GeolocationUnavailable { .. })
        ));
    }

    #[test]
    fn test_next_event_requires_a_registered_watch() {
        let mut source = GpsdSource::new(DEFAULT_GPSD_ADDRESS).unwrap();
        assert!(matches!(
            source.next_event(),
            Err(WayfarerError::WatchNotRegistered)
        ));
    }
}
