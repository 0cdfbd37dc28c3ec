//! Client library for the JSON protocol of the [gpsd](https://gpsd.io/)
//! GPS service daemon.

use std::fmt::Display;

use chrono::{DateTime, Utc};
use serde::{de::Visitor, Deserialize};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{
        tcp::{OwnedReadHalf, OwnedWriteHalf},
        TcpStream,
    },
};

/// Watch command asking the daemon to stream reports as JSON objects, one
/// per line.
const WATCH_ENABLE_JSON: &str = r#"?WATCH={"enable":true,"json":true};"#;

/// NMEA mode, the kind of fix the receiver currently has.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NmeaMode {
    /// Code: 0
    Unknown = 0,
    /// Code: 1
    NoFix = 1,
    /// Code: 2
    TwoDimensional = 2,
    /// Code: 3
    ThreeDimensional = 3,
}

impl NmeaMode {
    /// The numeric code used for this mode on the wire.
    #[must_use]
    pub fn code(&self) -> u8 {
        *self as u8
    }
}

impl<'de> Deserialize<'de> for NmeaMode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct NmeaModeVisitor;

        impl<'de> Visitor<'de> for NmeaModeVisitor {
            type Value = NmeaMode;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("an unsigned integer between 0 and 3")
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                if v.is_negative() {
                    return Err(E::custom(format!("Cannot parse negative integer `{}`", v)));
                }
                self.visit_u64(v as u64)
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                Ok(match v {
                    0 => NmeaMode::Unknown,
                    1 => NmeaMode::NoFix,
                    2 => NmeaMode::TwoDimensional,
                    3 => NmeaMode::ThreeDimensional,
                    _ => return Err(E::custom(format!("Unsupported/invalid NMEA mode: `{}`", v))),
                })
            }
        }
        deserializer.deserialize_u8(NmeaModeVisitor)
    }
}

impl Display for NmeaMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            NmeaMode::Unknown => "unknown",
            NmeaMode::NoFix => "no fix",
            NmeaMode::TwoDimensional => "2D fix",
            NmeaMode::ThreeDimensional => "3D fix",
        })
    }
}

/// A time-position-velocity report.
///
/// Fields other than [`Tpv::mode`] are only present when the receiver has
/// been able to determine them.
#[derive(Debug, Clone, Deserialize)]
pub struct Tpv {
    /// Name of the originating device.
    pub device: Option<String>,
    /// NMEA mode.
    pub mode: NmeaMode,
    /// Time/date stamp, UTC.
    pub time: Option<DateTime<Utc>>,
    /// Estimated timestamp error in seconds.
    pub ept: Option<f64>,
    /// Latitude in degrees: +/- signifies North/South.
    pub lat: Option<f64>,
    /// Longitude in degrees: +/- signifies East/West.
    pub lon: Option<f64>,
    /// Altitude in meters.
    pub alt: Option<f64>,
    /// Longitude error estimate in meters.
    pub epx: Option<f64>,
    /// Latitude error estimate in meters.
    pub epy: Option<f64>,
    /// Estimated vertical error in meters.
    pub epv: Option<f64>,
    /// Course over ground, degrees from true north.
    pub track: Option<f64>,
    /// Speed over ground, meters per second.
    pub speed: Option<f64>,
    /// Climb (positive) or sink (negative) rate, meters per second.
    pub climb: Option<f64>,
    /// Estimated speed error in meters per second.
    pub eps: Option<f64>,
    /// Estimated climb error in meters per second.
    pub epc: Option<f64>,
}

/// A satellite as listed in [`Sky::satellites`].
#[derive(Debug, Clone, Deserialize)]
pub struct Satellite {
    /// PRN id of the satellite.
    #[serde(rename = "PRN")]
    pub prn: i16,
    /// Elevation in degrees.
    pub el: Option<f64>,
    /// Azimuth, degrees from true north.
    pub az: Option<f64>,
    /// Signal to noise ratio in dBHz.
    pub ss: Option<f64>,
    /// Whether this satellite is used in the current solution.
    pub used: bool,
}

/// A sky view report, describing the satellite constellation.
#[derive(Debug, Clone, Deserialize)]
pub struct Sky {
    /// Name of the originating device.
    pub device: Option<String>,
    /// Horizontal dilution of precision.
    pub hdop: Option<f64>,
    /// Vertical dilution of precision.
    pub vdop: Option<f64>,
    /// Position (spherical) dilution of precision.
    pub pdop: Option<f64>,
    /// Satellites in view.
    pub satellites: Option<Vec<Satellite>>,
}

/// The version report the daemon greets each new client with.
#[derive(Debug, Clone, Deserialize)]
pub struct Version {
    /// Public release level.
    pub release: String,
    /// Internal revision-control level.
    pub rev: String,
    /// API major revision level.
    pub proto_major: u8,
    /// API minor revision level.
    pub proto_minor: u8,
}

/// The daemon's response to a watch command, echoing the policy in effect.
#[derive(Debug, Clone, Deserialize)]
pub struct Watch {
    /// Enable (true) or disable (false) watcher mode.
    pub enable: Option<bool>,
    /// Enable (true) or disable (false) dumping of JSON reports.
    pub json: Option<bool>,
    /// Enable (true) or disable (false) dumping of NMEA sentences.
    pub nmea: Option<bool>,
}

/// A device as listed in [`Devices::devices`].
#[derive(Debug, Clone, Deserialize)]
pub struct Device {
    /// Name the device for which the control bits are being reported.
    pub path: Option<String>,
    /// GPSD's name for the device driver type.
    pub driver: Option<String>,
    /// Time the device was activated, or absent if it is inactive.
    pub activated: Option<DateTime<Utc>>,
}

/// A report listing the devices the daemon knows about.
#[derive(Debug, Clone, Deserialize)]
pub struct Devices {
    /// The devices.
    pub devices: Vec<Device>,
}

/// A single report read from the daemon.
#[derive(Debug, Clone)]
pub enum Report {
    /// A time-position-velocity report.
    Tpv(Tpv),
    /// A sky view report.
    Sky(Sky),
    /// The greeting sent when the connection is established.
    Version(Version),
    /// The response to a watch command.
    Watch(Watch),
    /// The device list.
    Devices(Devices),
}

/// Error while communicating with the daemon.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// Establishing the TCP connection failed.
    #[error("Error while connecting to gpsd at {address}")]
    Connect {
        /// The address the connection was attempted to.
        address: String,
        /// The underlying IO error.
        #[source]
        error: std::io::Error,
    },
    /// Reading from or writing to the socket failed.
    #[error("Error while reading from the gpsd socket")]
    Io(#[from] std::io::Error),
    /// A report could not be parsed.
    #[error("Error while parsing json")]
    SerdeJson(#[from] serde_json::Error),
    /// The daemon closed the connection.
    #[error("The gpsd connection was closed by the remote end")]
    ConnectionClosed,
}

#[derive(Deserialize)]
struct ClassProbe {
    class: Option<String>,
}

/// Parse a single line of daemon output. Returns `None` for well-formed
/// reports of a class this crate does not support, or with no class at all.
fn parse_report(line: &str) -> Result<Option<Report>, Error> {
    let probe: ClassProbe = serde_json::from_str(line)?;
    Ok(Some(match probe.class.as_deref() {
        Some("TPV") => Report::Tpv(serde_json::from_str(line)?),
        Some("SKY") => Report::Sky(serde_json::from_str(line)?),
        Some("VERSION") => Report::Version(serde_json::from_str(line)?),
        Some("WATCH") => Report::Watch(serde_json::from_str(line)?),
        Some("DEVICES") => Report::Devices(serde_json::from_str(line)?),
        Some(class) => {
            tracing::trace!("Skipping unsupported report class `{}`", class);
            return Ok(None);
        }
        None => {
            tracing::trace!("Skipping report without a class");
            return Ok(None);
        }
    }))
}

/// A watcher session with a `gpsd` daemon.
///
/// Connecting performs the watch handshake, after which the daemon streams
/// a report whenever the receiver has something new to say. Reports are
/// obtained with [`Gpsd::next_report()`].
pub struct Gpsd {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
    /// The version greeting received from the daemon.
    pub version: Option<Version>,
}

impl Gpsd {
    /// Connect to the daemon listening at `address` (e.g. `localhost:2947`)
    /// and enable watcher mode.
    pub async fn connect(address: &str) -> Result<Self, Error> {
        let stream = TcpStream::connect(address)
            .await
            .map_err(|error| Error::Connect {
                address: address.to_owned(),
                error,
            })?;
        let (read_half, write_half) = stream.into_split();
        let mut session = Self {
            reader: BufReader::new(read_half),
            writer: write_half,
            version: None,
        };

        // The daemon greets each new client with a VERSION report before
        // any command is sent.
        match session.next_report().await? {
            Report::Version(version) => session.version = Some(version),
            report => tracing::warn!("Expected a VERSION greeting, received {:?}", report),
        }

        session.watch().await?;
        Ok(session)
    }

    /// Ask the daemon to start streaming reports.
    async fn watch(&mut self) -> Result<(), Error> {
        tracing::trace!("SEND {}", WATCH_ENABLE_JSON);
        self.writer.write_all(WATCH_ENABLE_JSON.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;
        Ok(())
    }

    /// Read the next report from the daemon, skipping over report classes
    /// this crate does not support.
    pub async fn next_report(&mut self) -> Result<Report, Error> {
        loop {
            let mut line = String::new();
            let n = self.reader.read_line(&mut line).await?;
            if n == 0 {
                return Err(Error::ConnectionClosed);
            }
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            tracing::trace!("RECV {}", line);

            if let Some(report) = parse_report(line)? {
                return Ok(report);
            }
        }
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use crate::{parse_report, NmeaMode, Report, Sky, Tpv, Version};

    #[test]
    fn tpv_deserialize() {
        let tpv_json = json!({
            "class": "TPV",
            "device": "/dev/pts/1",
            "time": "2005-06-08T10:34:48.283Z",
            "ept": 0.005,
            "lat": 46.498293369,
            "lon": 7.567411672,
            "alt": 1343.127,
            "eps": 36.000,
            "epx": 38.677,
            "epv": 50.868,
            "track": 0.0000,
            "speed": 0.000,
            "climb": 0.000,
            "mode": 3
        });

        let tpv: Tpv = serde_json::from_value(tpv_json).unwrap();
        assert_eq!(NmeaMode::ThreeDimensional, tpv.mode);
        assert_eq!(Some("/dev/pts/1".to_owned()), tpv.device);
        assert_eq!(Some(46.498293369), tpv.lat);
        assert_eq!(Some(7.567411672), tpv.lon);
        assert_eq!(Some(1343.127), tpv.alt);
        assert_eq!(
            "2005-06-08T10:34:48.283+00:00",
            tpv.time.unwrap().to_rfc3339()
        );
    }

    #[test]
    fn tpv_deserialize_no_fix() {
        let tpv_json = json!({
            "class": "TPV",
            "device": "/dev/ttyUSB0",
            "mode": 1
        });

        let tpv: Tpv = serde_json::from_value(tpv_json).unwrap();
        assert_eq!(NmeaMode::NoFix, tpv.mode);
        assert!(tpv.time.is_none());
        assert!(tpv.lat.is_none());
        assert!(tpv.lon.is_none());
    }

    #[test]
    fn nmea_mode_deserialize_invalid() {
        let result: Result<NmeaMode, _> = serde_json::from_value(json!(4));
        assert!(result.is_err());
        let result: Result<NmeaMode, _> = serde_json::from_value(json!(-1));
        assert!(result.is_err());
    }

    #[test]
    fn sky_deserialize() {
        let sky_json = json!({
            "class": "SKY",
            "device": "/dev/pts/1",
            "hdop": 1.55,
            "satellites": [
                { "PRN": 23, "el": 6.0, "az": 84.0, "ss": 0.0, "used": false },
                { "PRN": 10, "el": 51.0, "az": 116.0, "ss": 34.0, "used": true }
            ]
        });

        let sky: Sky = serde_json::from_value(sky_json).unwrap();
        assert_eq!(Some(1.55), sky.hdop);
        let satellites = sky.satellites.unwrap();
        assert_eq!(2, satellites.len());
        assert_eq!(23, satellites[0].prn);
        assert!(!satellites[0].used);
        assert!(satellites[1].used);
    }

    #[test]
    fn version_deserialize() {
        let version_json = json!({
            "class": "VERSION",
            "release": "3.17",
            "rev": "3.17",
            "proto_major": 3,
            "proto_minor": 12
        });

        let version: Version = serde_json::from_value(version_json).unwrap();
        assert_eq!("3.17", version.release);
        assert_eq!(3, version.proto_major);
        assert_eq!(12, version.proto_minor);
    }

    #[test]
    fn parse_report_dispatches_on_class() {
        let report = parse_report(
            r#"{"class":"TPV","device":"/dev/ttyUSB0","mode":2,"time":"2022-11-05T09:06:01.000Z","lat":47.0005,"lon":-122.0005}"#,
        )
        .unwrap()
        .unwrap();
        match report {
            Report::Tpv(tpv) => {
                assert_eq!(NmeaMode::TwoDimensional, tpv.mode);
                assert_eq!(Some(47.0005), tpv.lat);
            }
            report => panic!("expected a TPV report, got {:?}", report),
        }
    }

    #[test]
    fn parse_report_skips_unsupported_classes() {
        let report = parse_report(r#"{"class":"AIS","device":"/dev/ttyUSB0","type":1}"#).unwrap();
        assert!(report.is_none());
    }

    #[test]
    fn parse_report_skips_report_without_class() {
        let report =
            parse_report(r#"{"time":"2022-11-05T09:06:01.000Z","lat":47.0,"lon":-122.0}"#).unwrap();
        assert!(report.is_none());
    }

    #[test]
    fn parse_report_rejects_invalid_json() {
        assert!(parse_report("not json").is_err());
    }

    #[tokio::test]
    async fn connect_watch_and_stream() {
        use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

        use crate::{Error, Gpsd, WATCH_ENABLE_JSON};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (read_half, mut write_half) = stream.into_split();

            write_half
                .write_all(
                    br#"{"class":"VERSION","release":"3.17","rev":"3.17","proto_major":3,"proto_minor":12}"#,
                )
                .await
                .unwrap();
            write_half.write_all(b"\n").await.unwrap();

            let mut lines = BufReader::new(read_half).lines();
            let command = lines.next_line().await.unwrap().unwrap();
            assert_eq!(WATCH_ENABLE_JSON, command);

            write_half
                .write_all(b"{\"class\":\"WATCH\",\"enable\":true,\"json\":true}\n")
                .await
                .unwrap();
            write_half
                .write_all(b"{\"class\":\"AIS\",\"type\":1}\n")
                .await
                .unwrap();
            write_half
                .write_all(
                    b"{\"class\":\"TPV\",\"mode\":3,\"time\":\"2022-11-05T09:06:01.000Z\",\"lat\":47.0005,\"lon\":-122.0005}\n",
                )
                .await
                .unwrap();
        });

        let mut gpsd = Gpsd::connect(&address).await.unwrap();
        assert_eq!("3.17", gpsd.version.as_ref().unwrap().release);

        match gpsd.next_report().await.unwrap() {
            Report::Watch(watch) => assert_eq!(Some(true), watch.json),
            report => panic!("expected a WATCH report, got {:?}", report),
        }

        // The AIS report in between is skipped.
        match gpsd.next_report().await.unwrap() {
            Report::Tpv(tpv) => assert_eq!(Some(47.0005), tpv.lat),
            report => panic!("expected a TPV report, got {:?}", report),
        }

        server.await.unwrap();

        // The server has dropped its end of the connection.
        assert!(matches!(
            gpsd.next_report().await,
            Err(Error::ConnectionClosed)
        ));
    }
}

