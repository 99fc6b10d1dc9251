use tokio::sync::{mpsc, oneshot, watch};

use crate::{error::EngineError, event::CaptureEvent, lifecycle::Command, live_statistics::LiveStatistics};

/// Everything the engine task consumes, in the single order it is processed.
#[derive(Debug)]
pub(crate) enum EngineMessage {
    Command {
        command: Command,
        reply: oneshot::Sender<Result<(), EngineError>>,
    },
    Capture(CaptureEvent),
}

/// Control side of a spawned [`crate::LiveEngine`]. Cheap to clone.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    sender: mpsc::UnboundedSender<EngineMessage>,
    statistics: watch::Receiver<LiveStatistics>,
}

impl EngineHandle {
    pub(crate) fn new(sender: mpsc::UnboundedSender<EngineMessage>, statistics: watch::Receiver<LiveStatistics>) -> Self {
        Self { sender, statistics }
    }

    /// Queues the command behind everything sent before it and waits until it was applied.
    pub async fn execute(&self, command: Command) -> Result<(), EngineError> {
        let (reply, response) = oneshot::channel();
        self.sender
            .send(EngineMessage::Command { command, reply })
            .map_err(|_| EngineError::EngineClosed)?;

        response.await.map_err(|_| EngineError::EngineClosed)?
    }

    pub async fn start(&self) -> Result<(), EngineError> {
        self.execute(Command::Start).await
    }

    pub async fn pause(&self) -> Result<(), EngineError> {
        self.execute(Command::Pause).await
    }

    pub async fn resume(&self) -> Result<(), EngineError> {
        self.execute(Command::Resume).await
    }

    pub async fn stop(&self) -> Result<(), EngineError> {
        self.execute(Command::Stop).await
    }

    pub fn statistics(&self) -> watch::Receiver<LiveStatistics> {
        self.statistics.clone()
    }

    pub fn capture_sink(&self) -> CaptureSink {
        CaptureSink {
            sender: self.sender.clone(),
        }
    }
}

/// Where a capture source pushes its events. Never blocks.
#[derive(Debug, Clone)]
pub struct CaptureSink {
    sender: mpsc::UnboundedSender<EngineMessage>,
}

impl CaptureSink {
    pub fn send(&self, event: CaptureEvent) -> Result<(), EngineError> {
        self.sender
            .send(EngineMessage::Capture(event))
            .map_err(|_| EngineError::EngineClosed)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::DateTime;
    use ride_tracker_data_management::DataManager;
    use ride_tracker_lib::{measurement::MeasurementState, sample::GeoLocation};

    use crate::{Configuration, LiveEngine};

    use super::*;

    fn location(second: i64) -> CaptureEvent {
        let ts = DateTime::from_timestamp(1_714_557_600 + second, 0).unwrap();
        CaptureEvent::Location(GeoLocation::new(ts, 51.05 + second as f64 * 1e-4, 13.73, 3.0, 5.0))
    }

    #[tokio::test]
    async fn commands_and_events_keep_their_order() {
        let storage = Arc::new(DataManager::in_memory().await.unwrap());
        let (handle, task) = LiveEngine::new(storage.clone(), Configuration::default()).spawn();
        let sink = handle.capture_sink();
        let mut statistics = handle.statistics();

        handle.start().await.unwrap();
        for second in 0..3 {
            sink.send(location(second)).unwrap();
        }
        // Queued behind the three locations, so they all land in the first track.
        handle.pause().await.unwrap();
        sink.send(location(3)).unwrap();
        handle.resume().await.unwrap();
        sink.send(location(10)).unwrap();
        sink.send(location(11)).unwrap();
        handle.pause().await.unwrap();

        let current = statistics.borrow_and_update().clone();
        assert_eq!(current.state, MeasurementState::Paused);
        assert_eq!(current.track_count, 2);
        assert_eq!(current.location_count, 5);

        handle.stop().await.unwrap();
        assert_eq!(statistics.borrow_and_update().state, MeasurementState::Stopped);

        drop(sink);
        drop(handle);
        task.await.unwrap();
        assert!(statistics.changed().await.is_err());
    }

    #[tokio::test]
    async fn closed_engine_is_reported() {
        let storage = Arc::new(DataManager::in_memory().await.unwrap());
        let (handle, task) = LiveEngine::new(storage, Configuration::default()).spawn();
        let sink = handle.capture_sink();

        task.abort();
        let _ = task.await;

        assert_eq!(handle.start().await, Err(EngineError::EngineClosed));
        assert_eq!(sink.send(location(0)), Err(EngineError::EngineClosed));
    }

    #[tokio::test]
    async fn open_track_is_saved_when_handles_go_away() {
        let storage = Arc::new(DataManager::in_memory().await.unwrap());
        let (handle, task) = LiveEngine::new(storage.clone(), Configuration::default()).spawn();

        handle.start().await.unwrap();
        let id = handle.statistics().borrow().session_id.unwrap();
        handle.capture_sink().send(location(0)).unwrap();
        drop(handle);
        task.await.unwrap();

        assert_eq!(storage.get_track_count(id).await.unwrap(), 1);
    }
}
