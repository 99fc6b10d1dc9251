use ride_tracker_lib::sample::{AltitudeReading, GeoLocation};

use crate::{event::CaptureEvent, lifecycle::Command};

/// Where an event goes after demultiplexing.
#[derive(Debug, Clone, PartialEq)]
pub enum Routed {
    Location(GeoLocation),
    Altitude(AltitudeReading),
    /// A pause/resume/start/stop reported by the capture source. Handled exactly like the command.
    Boundary(Command),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EventCounts {
    pub locations: u64,
    pub altitudes: u64,
    pub boundaries: u64,
    pub dropped: u64,
}

/// Splits the single capture stream into per-kind routes. Events come out in the order they went
/// in; the router never buffers or reorders.
#[derive(Debug, Default)]
pub struct EventRouter {
    counts: EventCounts,
}

impl EventRouter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(&mut self, event: CaptureEvent) -> Option<Routed> {
        let routed = match event {
            CaptureEvent::Location(location) => Routed::Location(location),
            CaptureEvent::Altitude(altitude) => Routed::Altitude(altitude),
            CaptureEvent::Started { .. } => Routed::Boundary(Command::Start),
            CaptureEvent::Paused { .. } => Routed::Boundary(Command::Pause),
            CaptureEvent::Resumed { .. } => Routed::Boundary(Command::Resume),
            CaptureEvent::Stopped { .. } => Routed::Boundary(Command::Stop),
            other => {
                tracing::debug!("Encountered unhandled capture event {}", other.kind());
                self.counts.dropped += 1;
                return None;
            }
        };

        match routed {
            Routed::Location(_) => self.counts.locations += 1,
            Routed::Altitude(_) => self.counts.altitudes += 1,
            Routed::Boundary(_) => self.counts.boundaries += 1,
        }

        Some(routed)
    }

    pub fn counts(&self) -> EventCounts {
        self.counts
    }
}
