use async_trait::async_trait;
use ride_tracker_lib::{
    measurement::{MeasurementState, SessionSnapshot},
    sample::{AltitudeReading, GeoLocation},
};

use crate::DataManagerError;

/// Everything the live engine needs from persistent storage.
#[async_trait]
pub trait MeasurementStorage: Send + Sync {
    /// The newest measurement that was interrupted before it was stopped, if any.
    async fn find_unsynchronized_paused_session(&self) -> Result<Option<SessionSnapshot>, DataManagerError>;

    /// Registers a new running measurement and returns its id.
    async fn allocate_session_identifier(&self) -> Result<i64, DataManagerError>;

    /// Overwrites the stored content of one track.
    async fn save_track(
        &self,
        session_id: i64,
        track_index: usize,
        locations: &[GeoLocation],
        altitudes: &[AltitudeReading],
    ) -> Result<(), DataManagerError>;

    async fn set_session_state(&self, session_id: i64, state: MeasurementState) -> Result<(), DataManagerError>;

    /// Marks the measurement as stopped. It will not be offered for resumption again.
    async fn finalize_session(&self, session_id: i64) -> Result<(), DataManagerError>;
}
