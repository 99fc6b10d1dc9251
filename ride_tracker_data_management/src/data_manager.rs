use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use ride_tracker_lib::{
    measurement::{MeasurementState, SessionSnapshot},
    sample::{AltitudeReading, GeoLocation},
};

use crate::{
    database::db::{MeasurementDatabase, MeasurementRecord},
    DataManagerError, MeasurementStorage, DATABASE_PATH, DATA_DIR,
};

#[derive(Clone)]
pub struct DataManager {
    pub(crate) database: MeasurementDatabase,
}

/// The public interface for all stored measurements.
impl DataManager {
    /// Opens the database in the data directory of the project, creating it if needed.
    pub async fn start() -> Result<Self, DataManagerError> {
        let root: PathBuf = project_root::get_project_root()
            .map_err(|e| DataManagerError::Storage(format!("Failed to locate project root: {e}")))?;
        let data_dir = root.join(DATA_DIR);
        if !data_dir.exists() {
            std::fs::create_dir_all(&data_dir)
                .map_err(|_| DataManagerError::Storage(format!("Failed to create data directory: {:?}", data_dir)))?;
        }

        Self::open(&root.join(DATABASE_PATH)).await
    }

    pub async fn open(path: &Path) -> Result<Self, DataManagerError> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|_| DataManagerError::Storage(format!("Failed to create data directory: {:?}", parent)))?;
        }

        tracing::debug!("Opening measurement database at {:?}", path);
        let database = MeasurementDatabase::connect(path).await?;
        Ok(DataManager { database })
    }

    /// A throwaway store, for tests and dry runs.
    pub async fn in_memory() -> Result<Self, DataManagerError> {
        let database = MeasurementDatabase::connect_in_memory().await?;
        Ok(DataManager { database })
    }

    pub async fn get_measurements(&self) -> Result<Vec<MeasurementRecord>, DataManagerError> {
        self.database.get_measurements().await
    }

    pub async fn get_measurement(&self, session_id: i64) -> Result<MeasurementRecord, DataManagerError> {
        self.database.get_measurement(session_id).await
    }

    pub async fn get_track_count(&self, session_id: i64) -> Result<usize, DataManagerError> {
        self.database.count_tracks(session_id).await
    }
}

#[async_trait]
impl MeasurementStorage for DataManager {
    async fn find_unsynchronized_paused_session(&self) -> Result<Option<SessionSnapshot>, DataManagerError> {
        let Some(record) = self.database.get_unfinished_measurement().await? else {
            return Ok(None);
        };

        if record.state == MeasurementState::Running {
            // The process ended while capturing. Nothing is capturing anymore, so it is offered as paused.
            tracing::warn!("Measurement {} was still running when the app stopped", record.session_id);
        }

        let tracks = self.database.get_tracks(record.session_id).await?;
        tracing::info!("Found unfinished measurement {} with {} tracks", record.session_id, tracks.len());

        Ok(Some(SessionSnapshot {
            session_id: record.session_id,
            started_at: record.timestamp,
            state: record.state,
            tracks,
        }))
    }

    async fn allocate_session_identifier(&self) -> Result<i64, DataManagerError> {
        self.database.insert_measurement(Utc::now(), MeasurementState::Running).await
    }

    async fn save_track(
        &self,
        session_id: i64,
        track_index: usize,
        locations: &[GeoLocation],
        altitudes: &[AltitudeReading],
    ) -> Result<(), DataManagerError> {
        self.database.upsert_track(session_id, track_index, locations, altitudes).await
    }

    async fn set_session_state(&self, session_id: i64, state: MeasurementState) -> Result<(), DataManagerError> {
        self.database.set_measurement_state(session_id, state).await
    }

    async fn finalize_session(&self, session_id: i64) -> Result<(), DataManagerError> {
        self.database.set_measurement_state(session_id, MeasurementState::Stopped).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Duration};

    use super::*;

    fn location(seconds: i64) -> GeoLocation {
        let ts = DateTime::from_timestamp(1_700_000_000 + seconds, 0).unwrap();
        GeoLocation::new(ts, 51.05 + seconds as f64 * 1e-4, 13.73, 4.0, 5.0)
    }

    fn altitude(seconds: i64, value: f64) -> AltitudeReading {
        let ts = DateTime::from_timestamp(1_700_000_000, 0).unwrap() + Duration::seconds(seconds);
        AltitudeReading::new(ts, value, 101.2)
    }

    #[tokio::test]
    async fn paused_measurement_is_found_with_tracks() {
        let data_manager = DataManager::in_memory().await.unwrap();

        let id = data_manager.allocate_session_identifier().await.unwrap();
        data_manager.save_track(id, 0, &[location(0), location(1)], &[altitude(0, 1.0)]).await.unwrap();
        data_manager.save_track(id, 1, &[location(5)], &[]).await.unwrap();
        data_manager.set_session_state(id, MeasurementState::Paused).await.unwrap();

        let snapshot = data_manager.find_unsynchronized_paused_session().await.unwrap().unwrap();
        assert_eq!(snapshot.session_id, id);
        assert_eq!(snapshot.state, MeasurementState::Paused);
        assert_eq!(snapshot.tracks.len(), 2);
        assert_eq!(snapshot.tracks[0].locations, vec![location(0), location(1)]);
        assert_eq!(snapshot.tracks[0].altitudes, vec![altitude(0, 1.0)]);
        assert_eq!(snapshot.tracks[1].locations, vec![location(5)]);
    }

    #[tokio::test]
    async fn saving_a_track_again_overwrites_it() {
        let data_manager = DataManager::in_memory().await.unwrap();

        let id = data_manager.allocate_session_identifier().await.unwrap();
        data_manager.save_track(id, 0, &[location(0)], &[]).await.unwrap();
        data_manager.save_track(id, 0, &[location(0), location(1), location(2)], &[]).await.unwrap();

        assert_eq!(data_manager.get_track_count(id).await.unwrap(), 1);
        let tracks = data_manager.database.get_tracks(id).await.unwrap();
        assert_eq!(tracks[0].locations.len(), 3);
    }

    #[tokio::test]
    async fn finalized_measurement_is_not_offered_again() {
        let data_manager = DataManager::in_memory().await.unwrap();

        let id = data_manager.allocate_session_identifier().await.unwrap();
        data_manager.set_session_state(id, MeasurementState::Paused).await.unwrap();
        data_manager.finalize_session(id).await.unwrap();

        assert!(data_manager.find_unsynchronized_paused_session().await.unwrap().is_none());
        assert_eq!(data_manager.get_measurement(id).await.unwrap().state, MeasurementState::Stopped);
    }

    #[tokio::test]
    async fn newest_unfinished_measurement_wins() {
        let data_manager = DataManager::in_memory().await.unwrap();

        let first = data_manager.allocate_session_identifier().await.unwrap();
        data_manager.set_session_state(first, MeasurementState::Paused).await.unwrap();
        let second = data_manager.allocate_session_identifier().await.unwrap();
        data_manager.set_session_state(second, MeasurementState::Paused).await.unwrap();

        let snapshot = data_manager.find_unsynchronized_paused_session().await.unwrap().unwrap();
        assert_eq!(snapshot.session_id, second);
        assert!(snapshot.tracks.is_empty());
    }

    #[tokio::test]
    async fn unknown_measurement_cannot_be_finalized() {
        let data_manager = DataManager::in_memory().await.unwrap();
        assert!(matches!(data_manager.finalize_session(42).await, Err(DataManagerError::Database(_))));
    }

    #[tokio::test]
    async fn measurements_are_listed_in_order() {
        let data_manager = DataManager::in_memory().await.unwrap();
        let a = data_manager.allocate_session_identifier().await.unwrap();
        let b = data_manager.allocate_session_identifier().await.unwrap();
        data_manager.finalize_session(a).await.unwrap();

        let records = data_manager.get_measurements().await.unwrap();
        assert_eq!(records.iter().map(|r| r.session_id).collect::<Vec<_>>(), vec![a, b]);
        assert_eq!(records[0].state, MeasurementState::Stopped);
        assert_eq!(records[1].state, MeasurementState::Running);
        assert!(!records[1].synchronized);
    }
}
