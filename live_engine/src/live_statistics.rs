use ride_tracker_lib::{display, measurement::MeasurementState};
use serde::Serialize;
use tokio::sync::watch;

/// What the live view shows about the active measurement. Units are SI: meters, seconds, m/s, grams.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LiveStatistics {
    pub session_id: Option<i64>,
    pub name: String,
    pub state: MeasurementState,
    pub speed: f64,
    pub average_speed: f64,
    pub distance: f64,
    pub duration: f64,
    pub elevation_gain: f64,
    pub avoided_emissions: f64,
    pub track_count: usize,
    pub location_count: usize,
    /// The last storage failure, until the next transition succeeds.
    pub last_error: Option<String>,
}

impl LiveStatistics {
    /// One line summary for logs and the command line.
    pub fn summary(&self) -> String {
        format!(
            "{} [{}] speed {} | avg {} | {} | {} | rise {} | {} saved | {} tracks",
            if self.name.is_empty() { "-" } else { self.name.as_str() },
            self.state,
            display::speed(self.speed),
            display::speed(self.average_speed),
            display::distance(self.distance),
            display::duration(self.duration),
            display::rise(self.elevation_gain),
            display::emissions(self.avoided_emissions),
            self.track_count,
        )
    }
}

/// Owning side of the statistics channel. Readers only ever get snapshots.
#[derive(Debug)]
pub(crate) struct StatisticsPublisher {
    sender: watch::Sender<LiveStatistics>,
}

impl StatisticsPublisher {
    pub(crate) fn new() -> Self {
        let (sender, _) = watch::channel(LiveStatistics::default());
        Self { sender }
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<LiveStatistics> {
        self.sender.subscribe()
    }

    pub(crate) fn current(&self) -> LiveStatistics {
        self.sender.borrow().clone()
    }

    /// Notifies readers only when something actually changed.
    pub(crate) fn publish(&self, statistics: LiveStatistics) {
        self.sender.send_if_modified(|current| {
            if *current == statistics {
                false
            } else {
                *current = statistics;
                true
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn readers_see_changes_only() {
        let publisher = StatisticsPublisher::new();
        let mut reader = publisher.subscribe();
        assert!(!reader.has_changed().unwrap());

        publisher.publish(LiveStatistics::default());
        assert!(!reader.has_changed().unwrap());

        publisher.publish(LiveStatistics {
            distance: 12.0,
            ..Default::default()
        });
        assert!(reader.has_changed().unwrap());
        assert_eq!(reader.borrow_and_update().distance, 12.0);
        assert_eq!(publisher.current().distance, 12.0);
    }

    #[test]
    fn summary_uses_display_units() {
        let statistics = LiveStatistics {
            name: "Measurement 3".into(),
            state: MeasurementState::Running,
            speed: 5.0,
            distance: 1500.0,
            duration: 61.0,
            ..Default::default()
        };
        let summary = statistics.summary();
        assert!(summary.starts_with("Measurement 3 [running] speed 18.0 km/h"));
        assert!(summary.contains("1.50 km"));
        assert!(summary.contains("0:01:01"));
    }
}
