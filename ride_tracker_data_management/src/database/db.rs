use std::{path::Path, str::FromStr};

use chrono::{DateTime, Utc};
use const_format::concatcp;
use ride_tracker_lib::{
    measurement::{MeasurementState, StoredTrack},
    sample::{AltitudeReading, GeoLocation},
};
use sqlx::{
    query, query_as,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Executor, Pool, Sqlite, SqlitePool,
};

use crate::DataManagerError;

use super::constants::*;

/// A stored measurement without its samples.
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementRecord {
    pub session_id: i64,
    pub timestamp: DateTime<Utc>,
    pub state: MeasurementState,
    pub synchronized: bool,
}

impl TryFrom<(i64, DateTime<Utc>, String, bool)> for MeasurementRecord {
    type Error = DataManagerError;

    fn try_from((session_id, timestamp, state, synchronized): (i64, DateTime<Utc>, String, bool)) -> Result<Self, Self::Error> {
        let state = MeasurementState::from_str(&state).map_err(DataManagerError::Database)?;
        Ok(Self {
            session_id,
            timestamp,
            state,
            synchronized,
        })
    }
}

#[derive(Clone)]
pub struct MeasurementDatabase {
    pool: Pool<Sqlite>,
}

impl MeasurementDatabase {
    pub async fn connect(path: &Path) -> Result<Self, DataManagerError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .foreign_keys(true)
            .create_if_missing(true);

        let pool = SqlitePool::connect_with(options)
            .await
            .map_err(|e| DataManagerError::Database(format!("Failed to connect to database {path:?}: {e}")))?;

        let db = Self { pool };
        db.init().await?;
        Ok(db)
    }

    /// A private database living only as long as this handle. The pool keeps its single
    /// connection open, otherwise SQLite would discard the data.
    pub async fn connect_in_memory() -> Result<Self, DataManagerError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| DataManagerError::Database(format!("Invalid in-memory database options: {e}")))?
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| DataManagerError::Database(format!("Failed to open in-memory database: {e}")))?;

        let db = Self { pool };
        db.init().await?;
        Ok(db)
    }

    pub async fn init(&self) -> Result<(), DataManagerError> {
        self.pool.execute(concatcp!("
            CREATE TABLE IF NOT EXISTS ", MEASUREMENTS_TABLE_NAME, "(",
                SESSION_ID,   " INTEGER PRIMARY KEY AUTOINCREMENT,",
                TIMESTAMP,    " TIMESTAMP NOT NULL,",
                STATE,        " TEXT NOT NULL,",
                SYNCHRONIZED, " BOOLEAN NOT NULL);

            CREATE TABLE IF NOT EXISTS ", TRACKS_TABLE_NAME, "(",
                SESSION_ID,  " INTEGER NOT NULL,",
                TRACK_INDEX, " INTEGER NOT NULL,",
                LOCATIONS,   " BLOB NOT NULL,",
                ALTITUDES,   " BLOB NOT NULL,
                PRIMARY KEY(", SESSION_ID, ", ", TRACK_INDEX, "),
                FOREIGN KEY(", SESSION_ID, ") REFERENCES ", MEASUREMENTS_TABLE_NAME, "(", SESSION_ID, ") ON DELETE CASCADE
            )")).await
            .map_err(|e| DataManagerError::Database(format!("Failed to create tables: {e}")))
            .map(|_| ())
    }

    pub async fn insert_measurement(&self, timestamp: DateTime<Utc>, state: MeasurementState) -> Result<i64, DataManagerError> {
        query_as::<_, (i64,)>(concatcp!("
            INSERT INTO ", MEASUREMENTS_TABLE_NAME,
            "(", SESSION_ID, ", ", TIMESTAMP, ", ", STATE, ", ", SYNCHRONIZED, ")
            VALUES (NULL, ?1, ?2, ?3) RETURNING ", SESSION_ID))
                .bind(timestamp)
                .bind(state.as_str())
                .bind(false)
                .fetch_one(&self.pool).await
                .map_err(|e| DataManagerError::Database(format!("Failed to insert measurement: {e}")))
                .map(|row| row.0)
    }

    pub async fn set_measurement_state(&self, session_id: i64, state: MeasurementState) -> Result<(), DataManagerError> {
        let result = query(concatcp!("UPDATE ", MEASUREMENTS_TABLE_NAME, " SET ", STATE, " = ?1 WHERE ", SESSION_ID, " = ?2"))
            .bind(state.as_str())
            .bind(session_id)
            .execute(&self.pool).await
            .map_err(|e| DataManagerError::Database(format!("Failed to set measurement state: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(DataManagerError::Database(format!("No measurement with id {session_id}")));
        }
        Ok(())
    }

    pub async fn upsert_track(
        &self,
        session_id: i64,
        track_index: usize,
        locations: &[GeoLocation],
        altitudes: &[AltitudeReading],
    ) -> Result<(), DataManagerError> {
        let locations_blob = bincode::serialize(locations)
            .map_err(|e| DataManagerError::Storage(format!("Failed to serialize locations: {e}")))?;
        let altitudes_blob = bincode::serialize(altitudes)
            .map_err(|e| DataManagerError::Storage(format!("Failed to serialize altitudes: {e}")))?;

        query(concatcp!("
            INSERT INTO ", TRACKS_TABLE_NAME, "(", SESSION_ID, ", ", TRACK_INDEX, ", ", LOCATIONS, ", ", ALTITUDES, ")
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(", SESSION_ID, ", ", TRACK_INDEX, ") DO UPDATE SET ",
                LOCATIONS, " = excluded.", LOCATIONS, ", ",
                ALTITUDES, " = excluded.", ALTITUDES))
            .bind(session_id)
            .bind(track_index as i64)
            .bind(locations_blob)
            .bind(altitudes_blob)
            .execute(&self.pool).await
            .map_err(|e| DataManagerError::Database(format!("Failed to save track {track_index} of measurement {session_id}: {e}")))
            .map(|_| ())
    }

    pub async fn get_measurement(&self, session_id: i64) -> Result<MeasurementRecord, DataManagerError> {
        query_as::<_, (i64, DateTime<Utc>, String, bool)>(concatcp!(
            "SELECT ", SESSION_ID, ", ", TIMESTAMP, ", ", STATE, ", ", SYNCHRONIZED,
            " FROM ", MEASUREMENTS_TABLE_NAME, " WHERE ", SESSION_ID, " = ?1"))
            .bind(session_id)
            .fetch_one(&self.pool).await
            .map_err(|e| DataManagerError::Database(format!("Failed to get measurement {session_id}: {e}")))
            .and_then(MeasurementRecord::try_from)
    }

    pub async fn get_measurements(&self) -> Result<Vec<MeasurementRecord>, DataManagerError> {
        query_as::<_, (i64, DateTime<Utc>, String, bool)>(concatcp!(
            "SELECT ", SESSION_ID, ", ", TIMESTAMP, ", ", STATE, ", ", SYNCHRONIZED,
            " FROM ", MEASUREMENTS_TABLE_NAME, " ORDER BY ", SESSION_ID))
            .fetch_all(&self.pool).await
            .map_err(|e| DataManagerError::Database(format!("Failed to get measurements: {e}")))?
            .into_iter()
            .map(MeasurementRecord::try_from)
            .collect()
    }

    /// The newest measurement that is neither stopped nor synchronized.
    pub async fn get_unfinished_measurement(&self) -> Result<Option<MeasurementRecord>, DataManagerError> {
        query_as::<_, (i64, DateTime<Utc>, String, bool)>(concatcp!(
            "SELECT ", SESSION_ID, ", ", TIMESTAMP, ", ", STATE, ", ", SYNCHRONIZED,
            " FROM ", MEASUREMENTS_TABLE_NAME,
            " WHERE ", STATE, " != 'stopped' AND ", SYNCHRONIZED, " = FALSE",
            " ORDER BY ", SESSION_ID, " DESC LIMIT 1"))
            .fetch_optional(&self.pool).await
            .map_err(|e| DataManagerError::Database(format!("Failed to look up unfinished measurement: {e}")))?
            .map(MeasurementRecord::try_from)
            .transpose()
    }

    /// All tracks of a measurement in recording order.
    pub async fn get_tracks(&self, session_id: i64) -> Result<Vec<StoredTrack>, DataManagerError> {
        let rows = query_as::<_, (i64, Vec<u8>, Vec<u8>)>(concatcp!(
            "SELECT ", TRACK_INDEX, ", ", LOCATIONS, ", ", ALTITUDES,
            " FROM ", TRACKS_TABLE_NAME, " WHERE ", SESSION_ID, " = ?1 ORDER BY ", TRACK_INDEX))
            .bind(session_id)
            .fetch_all(&self.pool).await
            .map_err(|e| DataManagerError::Database(format!("Failed to get tracks of measurement {session_id}: {e}")))?;

        let mut tracks = Vec::with_capacity(rows.len());
        for (track_index, locations, altitudes) in rows {
            if track_index as usize != tracks.len() {
                // A track that was opened but never saved still counts as a segment.
                tracing::warn!("Measurement {} is missing track {}", session_id, tracks.len());
                while tracks.len() < track_index as usize {
                    tracks.push(StoredTrack::default());
                }
            }

            let locations = bincode::deserialize(&locations)
                .map_err(|e| DataManagerError::Storage(format!("Corrupt locations in track {track_index}: {e}")))?;
            let altitudes = bincode::deserialize(&altitudes)
                .map_err(|e| DataManagerError::Storage(format!("Corrupt altitudes in track {track_index}: {e}")))?;

            tracks.push(StoredTrack { locations, altitudes });
        }

        Ok(tracks)
    }

    pub async fn count_tracks(&self, session_id: i64) -> Result<usize, DataManagerError> {
        query_as::<_, (i64,)>(concatcp!("SELECT COUNT(*) FROM ", TRACKS_TABLE_NAME, " WHERE ", SESSION_ID, " = ?1"))
            .bind(session_id)
            .fetch_one(&self.pool).await
            .map_err(|e| DataManagerError::Database(format!("Failed to count tracks of measurement {session_id}: {e}")))
            .map(|row| row.0 as usize)
    }
}
