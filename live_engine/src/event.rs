use chrono::{DateTime, Utc};
use ride_tracker_lib::sample::{AltitudeReading, GeoLocation};
use serde::{Deserialize, Serialize};

/// A message from the capture source, tagged by `kind` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CaptureEvent {
    Location(GeoLocation),
    Altitude(AltitudeReading),
    Started { timestamp: DateTime<Utc> },
    Paused { timestamp: DateTime<Utc> },
    Resumed { timestamp: DateTime<Utc> },
    Stopped { timestamp: DateTime<Utc> },
    /// The location capturer got a fix. Not used for statistics.
    HasFix { timestamp: DateTime<Utc> },
    /// The location capturer lost its fix. Not used for statistics.
    FixLost { timestamp: DateTime<Utc> },
    #[serde(other)]
    Unknown,
}

impl CaptureEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            CaptureEvent::Location(_) => "location",
            CaptureEvent::Altitude(_) => "altitude",
            CaptureEvent::Started { .. } => "started",
            CaptureEvent::Paused { .. } => "paused",
            CaptureEvent::Resumed { .. } => "resumed",
            CaptureEvent::Stopped { .. } => "stopped",
            CaptureEvent::HasFix { .. } => "has_fix",
            CaptureEvent::FixLost { .. } => "fix_lost",
            CaptureEvent::Unknown => "unknown",
        }
    }
}
