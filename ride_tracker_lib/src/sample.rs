use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single fix from the location capturer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoLocation {
    pub timestamp: DateTime<Utc>,
    pub latitude: f64,
    pub longitude: f64,
    /// Meters per second. Negative when the sensor does not know.
    pub speed: f64,
    /// Horizontal accuracy in meters.
    pub accuracy: f64,
}

impl GeoLocation {
    pub fn new(timestamp: DateTime<Utc>, latitude: f64, longitude: f64, speed: f64, accuracy: f64) -> Self {
        Self {
            timestamp,
            latitude,
            longitude,
            speed,
            accuracy,
        }
    }

    /// The reported speed, or `None` for the sensor's "unknown" sentinel.
    pub fn known_speed(&self) -> Option<f64> {
        (self.speed >= 0.0).then_some(self.speed)
    }
}

/// A barometer reading, relative to the altitude when the altimeter started.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AltitudeReading {
    pub timestamp: DateTime<Utc>,
    /// Meters.
    pub relative_altitude: f64,
    /// Kilopascal.
    pub pressure: f64,
}

impl AltitudeReading {
    pub fn new(timestamp: DateTime<Utc>, relative_altitude: f64, pressure: f64) -> Self {
        Self {
            timestamp,
            relative_altitude,
            pressure,
        }
    }
}

/// Anything stored in a track carries the time it was captured.
pub trait Timestamped {
    fn timestamp(&self) -> DateTime<Utc>;
}

impl Timestamped for GeoLocation {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

impl Timestamped for AltitudeReading {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_speed_is_unknown() {
        let ts = DateTime::from_timestamp(0, 0).unwrap();
        assert_eq!(GeoLocation::new(ts, 51.0, 13.7, -1.0, 5.0).known_speed(), None);
        assert_eq!(GeoLocation::new(ts, 51.0, 13.7, 0.0, 5.0).known_speed(), Some(0.0));
        assert_eq!(GeoLocation::new(ts, 51.0, 13.7, 4.2, 5.0).known_speed(), Some(4.2));
    }
}
