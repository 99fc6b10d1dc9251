use const_format::concatcp;

pub mod database;
mod data_manager;
mod storage;

pub use data_manager::*;
pub use storage::MeasurementStorage;

pub const DATA_DIR: &str = "data/";
pub const DATABASE_PATH: &str = concatcp!(DATA_DIR, "measurements.db");

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DataManagerError {
    #[error("Database error: {0}")]
    Database(String),
    #[error("Storage error: {0}")]
    Storage(String),
}
