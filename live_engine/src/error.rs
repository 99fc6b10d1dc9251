use ride_tracker_data_management::DataManagerError;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EngineError {
    /// Storage refused an operation. The in-memory state is left as it was before the attempt.
    #[error("Storage failed: {0}")]
    Collaborator(#[from] DataManagerError),
    #[error("The engine is no longer running")]
    EngineClosed,
}
