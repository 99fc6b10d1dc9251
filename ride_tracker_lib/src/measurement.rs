use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    sample::{AltitudeReading, GeoLocation},
    track::TrackCollection,
};

/// Lifecycle state of a measurement. The UI decides which controls to show based on this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeasurementState {
    /// No measurement is active.
    #[default]
    Stopped,
    Running,
    Paused,
}

impl MeasurementState {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeasurementState::Stopped => "stopped",
            MeasurementState::Running => "running",
            MeasurementState::Paused => "paused",
        }
    }
}

impl fmt::Display for MeasurementState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MeasurementState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stopped" => Ok(MeasurementState::Stopped),
            "running" => Ok(MeasurementState::Running),
            "paused" => Ok(MeasurementState::Paused),
            other => Err(format!("Unknown measurement state: {other}")),
        }
    }
}

/// The samples of one stored track.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoredTrack {
    pub locations: Vec<GeoLocation>,
    pub altitudes: Vec<AltitudeReading>,
}

/// A measurement as the storage collaborator hands it back after a restart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub session_id: i64,
    pub started_at: DateTime<Utc>,
    pub state: MeasurementState,
    pub tracks: Vec<StoredTrack>,
}

impl SessionSnapshot {
    /// Splits the stored tracks into the two parallel collections, one segment per stored track.
    pub fn into_collections(self) -> (TrackCollection<GeoLocation>, TrackCollection<AltitudeReading>) {
        let (locations, altitudes): (Vec<_>, Vec<_>) = self
            .tracks
            .into_iter()
            .map(|track| (track.locations, track.altitudes))
            .unzip();

        (TrackCollection::from_segments(locations), TrackCollection::from_segments(altitudes))
    }
}
