use ride_tracker_lib::{
    sample::GeoLocation,
    statistics::{haversine_distance, ElevationBaseline, ElevationFilter},
    track::Track,
};

/// Running total of the distance over all tracks.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct DistanceAccumulator {
    total: f64,
}

impl DistanceAccumulator {
    /// Call after a location was appended to `track`. Only the step from the previous sample of
    /// the same track is added, so the first sample of a track adds nothing.
    pub(crate) fn on_appended(&mut self, track: &Track<GeoLocation>) {
        if let Some((previous, latest)) = track.last_pair() {
            self.total += haversine_distance(previous, latest);
        }
    }

    pub(crate) fn total(&self) -> f64 {
        self.total
    }
}

/// Running total of the climb over all altitude tracks.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ElevationAccumulator {
    total: f64,
    filter: ElevationFilter,
    threshold: f64,
    baseline: ElevationBaseline,
}

impl ElevationAccumulator {
    pub(crate) fn new(threshold: f64, baseline: ElevationBaseline) -> Self {
        Self {
            total: 0.0,
            filter: ElevationFilter::new(threshold, baseline),
            threshold,
            baseline,
        }
    }

    /// A new track has no baseline. The first altitude in it only sets one.
    pub(crate) fn start_track(&mut self) {
        self.filter = ElevationFilter::new(self.threshold, self.baseline);
    }

    pub(crate) fn on_altitude(&mut self, relative_altitude: f64) {
        self.total += self.filter.push(relative_altitude);
    }

    pub(crate) fn total(&self) -> f64 {
        self.total
    }
}
