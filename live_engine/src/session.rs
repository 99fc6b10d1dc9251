use ride_tracker_lib::{
    measurement::{MeasurementState, SessionSnapshot},
    sample::{AltitudeReading, GeoLocation},
    statistics::{average_speed, total_duration, EmissionsModel},
    track::TrackCollection,
};

use crate::{
    accumulator::{DistanceAccumulator, ElevationAccumulator},
    configuration::Configuration,
    live_statistics::LiveStatistics,
};

/// The measurement that is currently active, together with everything derived from it.
///
/// Both collections always hold the same number of tracks. They are opened and closed together.
#[derive(Debug, Clone)]
pub(crate) struct MeasurementSession {
    id: i64,
    name: String,
    state: MeasurementState,
    locations: TrackCollection<GeoLocation>,
    altitudes: TrackCollection<AltitudeReading>,
    distance: DistanceAccumulator,
    elevation: ElevationAccumulator,
    current_speed: f64,
    /// Samples appended since the current track was last written to storage.
    unsaved: usize,
}

impl MeasurementSession {
    /// A session without any track. Call [`Self::open_track`] to start receiving.
    pub(crate) fn new(id: i64, config: &Configuration) -> Self {
        Self {
            id,
            name: format!("{} {}", config.display_name_prefix, id),
            state: MeasurementState::Paused,
            locations: TrackCollection::new(),
            altitudes: TrackCollection::new(),
            distance: DistanceAccumulator::default(),
            elevation: ElevationAccumulator::new(config.elevation_threshold_m, config.elevation_baseline),
            current_speed: 0.0,
            unsaved: 0,
        }
    }

    /// Rebuilds an interrupted measurement. Stored samples go through the same accumulators as
    /// live ones, and the session ends up paused with every track closed.
    pub(crate) fn rehydrate(snapshot: SessionSnapshot, config: &Configuration) -> Self {
        let mut session = Self::new(snapshot.session_id, config);

        for track in snapshot.tracks {
            session.open_track();
            for location in track.locations {
                session.append_location(location);
            }
            for altitude in track.altitudes {
                session.append_altitude(altitude);
            }
            session.close_track();
        }

        session.unsaved = 0;
        session
    }

    pub(crate) fn id(&self) -> i64 {
        self.id
    }

    pub(crate) fn state(&self) -> MeasurementState {
        self.state
    }

    pub(crate) fn unsaved(&self) -> usize {
        self.unsaved
    }

    pub(crate) fn open_track(&mut self) {
        self.locations.open_track();
        self.altitudes.open_track();
        self.elevation.start_track();
        self.state = MeasurementState::Running;
    }

    pub(crate) fn close_track(&mut self) {
        self.locations.close_current();
        self.altitudes.close_current();
        self.state = MeasurementState::Paused;
    }

    /// Returns false if no track is open and the sample was dropped.
    pub(crate) fn append_location(&mut self, location: GeoLocation) -> bool {
        match self.locations.append(location) {
            Ok(track) => self.distance.on_appended(track),
            Err(_) => return false,
        }

        if let Some(speed) = location.known_speed() {
            self.current_speed = speed;
        }
        self.unsaved += 1;
        true
    }

    /// Returns false if no track is open and the sample was dropped.
    pub(crate) fn append_altitude(&mut self, altitude: AltitudeReading) -> bool {
        if self.altitudes.append(altitude).is_err() {
            return false;
        }

        self.elevation.on_altitude(altitude.relative_altitude);
        self.unsaved += 1;
        true
    }

    /// Index and content of the most recent track, which is the one still being written.
    pub(crate) fn current_track(&self) -> Option<(usize, &[GeoLocation], &[AltitudeReading])> {
        let index = self.locations.current_index()?;
        let locations = self.locations.current()?.samples();
        let altitudes = self.altitudes.get(index).map(|track| track.samples()).unwrap_or_default();
        Some((index, locations, altitudes))
    }

    /// Index the next opened track will get.
    pub(crate) fn next_track_index(&self) -> usize {
        self.locations.count()
    }

    pub(crate) fn mark_saved(&mut self) {
        self.unsaved = 0;
    }

    pub(crate) fn statistics(&self, emissions: &dyn EmissionsModel, last_error: Option<String>) -> LiveStatistics {
        let distance = self.distance.total();
        let duration = total_duration(&self.locations);

        LiveStatistics {
            session_id: Some(self.id),
            name: self.name.clone(),
            state: self.state,
            speed: self.current_speed,
            average_speed: average_speed(distance, duration),
            distance,
            duration,
            elevation_gain: self.elevation.total(),
            avoided_emissions: emissions.avoided_emissions(distance),
            track_count: self.locations.count(),
            location_count: self.locations.sample_count(),
            last_error,
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration, Utc};
    use ride_tracker_lib::{
        measurement::StoredTrack,
        statistics::{total_distance, total_elevation_gain, PerKilometerEmissions},
    };

    use super::*;

    fn at(second: i64) -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap() + Duration::seconds(second)
    }

    fn location(second: i64, speed: f64) -> GeoLocation {
        GeoLocation::new(at(second), 51.0 + second as f64 * 1e-4, 13.0, speed, 4.0)
    }

    #[test]
    fn drops_samples_without_open_track() {
        let mut session = MeasurementSession::new(1, &Configuration::default());
        assert!(!session.append_location(location(0, 2.0)));

        session.open_track();
        assert!(session.append_location(location(0, 2.0)));
        session.close_track();
        assert!(!session.append_altitude(AltitudeReading::new(at(1), 0.5, 101.0)));

        let statistics = session.statistics(&PerKilometerEmissions::default(), None);
        assert_eq!(statistics.location_count, 1);
        assert_eq!(statistics.state, MeasurementState::Paused);
        assert_eq!(statistics.name, "Measurement 1");
    }

    #[test]
    fn unknown_speed_keeps_previous() {
        let mut session = MeasurementSession::new(1, &Configuration::default());
        session.open_track();
        session.append_location(location(0, 4.5));
        session.append_location(location(1, -1.0));

        let statistics = session.statistics(&PerKilometerEmissions::default(), None);
        assert_eq!(statistics.speed, 4.5);
        assert_eq!(session.unsaved(), 2);
    }

    #[test]
    fn rehydrated_statistics_match_recompute() {
        let config = Configuration::default();
        let snapshot = SessionSnapshot {
            session_id: 7,
            started_at: at(0),
            state: MeasurementState::Paused,
            tracks: vec![
                StoredTrack {
                    locations: (0..4).map(|i| location(i, 3.0)).collect(),
                    altitudes: [0.0, 0.3, 0.35, 0.8]
                        .iter()
                        .enumerate()
                        .map(|(i, a)| AltitudeReading::new(at(i as i64), *a, 101.0))
                        .collect(),
                },
                StoredTrack::default(),
                StoredTrack {
                    locations: (10..13).map(|i| location(i, 5.0)).collect(),
                    altitudes: vec![AltitudeReading::new(at(10), 0.0, 101.0), AltitudeReading::new(at(11), 2.0, 101.0)],
                },
            ],
        };

        let session = MeasurementSession::rehydrate(snapshot.clone(), &config);
        let statistics = session.statistics(&PerKilometerEmissions::default(), None);
        let (locations, altitudes) = snapshot.into_collections();

        assert_eq!(statistics.state, MeasurementState::Paused);
        assert_eq!(statistics.track_count, 3);
        assert_eq!(statistics.location_count, 7);
        assert_eq!(statistics.duration, 5.0);
        assert!((statistics.distance - total_distance(&locations)).abs() < 1e-6);
        assert!(
            (statistics.elevation_gain - total_elevation_gain(&altitudes, 0.1, config.elevation_baseline)).abs() < 1e-9
        );
        assert_eq!(session.unsaved(), 0);
        assert!(session.current_track().is_some_and(|(index, _, _)| index == 2));
    }
}
