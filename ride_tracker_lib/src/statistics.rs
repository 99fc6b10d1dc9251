//! Pure statistics over recorded tracks.
//!
//! The live engine maintains distance and elevation incrementally. The functions here recompute
//! everything from scratch and are the reference the incremental values are checked against.

use serde::{Deserialize, Serialize};

use crate::{
    sample::{AltitudeReading, GeoLocation, Timestamped},
    track::{Track, TrackCollection},
};

/// Mean earth radius in meters.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Altitude changes at or below this are treated as barometer noise.
pub const DEFAULT_ELEVATION_THRESHOLD_M: f64 = 0.1;

/// Great-circle distance between two fixes in meters.
pub fn haversine_distance(from: &GeoLocation, to: &GeoLocation) -> f64 {
    let d_lat = (to.latitude - from.latitude).to_radians();
    let d_lon = (to.longitude - from.longitude).to_radians();
    let lat1 = from.latitude.to_radians();
    let lat2 = to.latitude.to_radians();

    let a = f64::sin(d_lat / 2.).powi(2) + f64::cos(lat1) * f64::cos(lat2) * f64::sin(d_lon / 2.).powi(2);
    let c = 2. * f64::asin(f64::sqrt(a.min(1.0)));

    EARTH_RADIUS_M * c
}

pub fn track_distance(track: &Track<GeoLocation>) -> f64 {
    track
        .samples()
        .windows(2)
        .map(|pair| haversine_distance(&pair[0], &pair[1]))
        .sum()
}

/// Distance over all tracks. Gaps between tracks (pauses) are not counted.
pub fn total_distance(tracks: &TrackCollection<GeoLocation>) -> f64 {
    tracks.iter().map(track_distance).sum()
}

/// Seconds between the first and last sample of a track. Zero for fewer than two samples.
pub fn track_duration<T: Timestamped>(track: &Track<T>) -> f64 {
    match (track.first(), track.last()) {
        (Some(first), Some(last)) if track.len() >= 2 => {
            let millis = (last.timestamp() - first.timestamp()).num_milliseconds();
            (millis as f64 / 1000.0).max(0.0)
        }
        _ => 0.0,
    }
}

pub fn total_duration<T: Timestamped>(tracks: &TrackCollection<T>) -> f64 {
    tracks.iter().map(track_duration).sum()
}

/// Distance divided by duration. Zero when no time has passed; never negative.
pub fn average_speed(distance_m: f64, duration_s: f64) -> f64 {
    if duration_s <= 0.0 || !duration_s.is_finite() {
        return 0.0;
    }

    let speed = distance_m / duration_s;
    if speed.is_finite() {
        speed.max(0.0)
    } else {
        0.0
    }
}

/// What an altitude sample that is rejected as noise does to the comparison baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElevationBaseline {
    /// Every raw sample becomes the baseline for the next comparison, accepted or not.
    /// A slow climb made of sub-threshold steps therefore gains nothing.
    #[default]
    Advance,
    /// A rejected climb keeps the old baseline, so sub-threshold steps add up until they
    /// exceed the threshold together. Descents always move the baseline down.
    Hold,
}

/// Incremental gain filter for one track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ElevationFilter {
    threshold: f64,
    baseline_policy: ElevationBaseline,
    baseline: Option<f64>,
}

impl ElevationFilter {
    pub fn new(threshold: f64, baseline_policy: ElevationBaseline) -> Self {
        Self {
            threshold,
            baseline_policy,
            baseline: None,
        }
    }

    /// Feeds the next altitude of the track and returns the accepted gain, if any.
    pub fn push(&mut self, altitude: f64) -> f64 {
        let Some(baseline) = self.baseline else {
            self.baseline = Some(altitude);
            return 0.0;
        };

        let delta = altitude - baseline;
        if delta > self.threshold {
            self.baseline = Some(altitude);
            return delta;
        }

        match self.baseline_policy {
            ElevationBaseline::Advance => self.baseline = Some(altitude),
            ElevationBaseline::Hold if delta < 0.0 => self.baseline = Some(altitude),
            ElevationBaseline::Hold => {}
        }

        0.0
    }
}

pub fn track_elevation_gain(track: &Track<AltitudeReading>, threshold: f64, baseline: ElevationBaseline) -> f64 {
    let mut filter = ElevationFilter::new(threshold, baseline);
    track.samples().iter().map(|reading| filter.push(reading.relative_altitude)).sum()
}

/// Cumulative climb over all tracks. Each track starts without a baseline.
pub fn total_elevation_gain(tracks: &TrackCollection<AltitudeReading>, threshold: f64, baseline: ElevationBaseline) -> f64 {
    tracks
        .iter()
        .map(|track| track_elevation_gain(track, threshold, baseline))
        .sum()
}

/// Turns a travelled distance into avoided CO₂.
pub trait EmissionsModel: Send + Sync {
    /// Grams of CO₂ avoided for `distance_m` meters travelled.
    fn avoided_emissions(&self, distance_m: f64) -> f64;
}

/// A fixed emission factor of the car trip that was replaced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerKilometerEmissions {
    pub grams_per_km: f64,
}

pub const DEFAULT_EMISSIONS_GRAMS_PER_KM: f64 = 95.0;

impl Default for PerKilometerEmissions {
    fn default() -> Self {
        Self {
            grams_per_km: DEFAULT_EMISSIONS_GRAMS_PER_KM,
        }
    }
}

impl EmissionsModel for PerKilometerEmissions {
    fn avoided_emissions(&self, distance_m: f64) -> f64 {
        (distance_m.max(0.0) / 1000.0) * self.grams_per_km
    }
}
