use std::sync::Arc;

use ride_tracker_data_management::MeasurementStorage;
use ride_tracker_lib::{
    measurement::MeasurementState,
    sample::{AltitudeReading, GeoLocation},
    statistics::{EmissionsModel, PerKilometerEmissions},
};
use tokio::{
    sync::{mpsc, watch},
    task::JoinHandle,
};

use crate::{
    configuration::Configuration,
    error::EngineError,
    event::CaptureEvent,
    handle::{EngineHandle, EngineMessage},
    lifecycle::{Command, Transition},
    live_statistics::{LiveStatistics, StatisticsPublisher},
    router::{EventCounts, EventRouter, Routed},
    session::MeasurementSession,
};

/// Owns the active measurement and turns commands and capture events into live statistics.
///
/// Either drive it directly through [`LiveEngine::execute`] and [`LiveEngine::handle_event`], or
/// hand it to [`LiveEngine::spawn`] and talk to it through the returned [`EngineHandle`].
pub struct LiveEngine<S: MeasurementStorage + 'static> {
    storage: Arc<S>,
    config: Configuration,
    emissions: Box<dyn EmissionsModel>,
    session: Option<MeasurementSession>,
    publisher: StatisticsPublisher,
    router: EventRouter,
    last_error: Option<String>,
}

impl<S: MeasurementStorage + 'static> LiveEngine<S> {
    pub fn new(storage: Arc<S>, config: Configuration) -> Self {
        let emissions = PerKilometerEmissions {
            grams_per_km: config.emissions_grams_per_km,
        };

        Self {
            storage,
            config,
            emissions: Box::new(emissions),
            session: None,
            publisher: StatisticsPublisher::new(),
            router: EventRouter::new(),
            last_error: None,
        }
    }

    pub fn with_emissions_model(mut self, emissions: impl EmissionsModel + 'static) -> Self {
        self.emissions = Box::new(emissions);
        self
    }

    pub fn subscribe(&self) -> watch::Receiver<LiveStatistics> {
        self.publisher.subscribe()
    }

    pub fn statistics(&self) -> LiveStatistics {
        self.publisher.current()
    }

    pub fn state(&self) -> MeasurementState {
        self.session
            .as_ref()
            .map(MeasurementSession::state)
            .unwrap_or(MeasurementState::Stopped)
    }

    pub fn event_counts(&self) -> EventCounts {
        self.router.counts()
    }

    /// Picks up a measurement that was interrupted before it was stopped.
    ///
    /// Returns whether a measurement was restored. The restored measurement is paused and its
    /// statistics are published before this returns.
    pub async fn restore_paused_session(&mut self) -> Result<bool, EngineError> {
        if self.session.is_some() {
            return Ok(false);
        }

        let Some(snapshot) = self.storage.find_unsynchronized_paused_session().await? else {
            tracing::debug!("No unfinished measurement to restore");
            return Ok(false);
        };

        let session = MeasurementSession::rehydrate(snapshot, &self.config);
        tracing::info!("Restored measurement {} as paused", session.id());
        self.session = Some(session);
        self.publish();
        Ok(true)
    }

    /// Applies a command. Commands that are not legal in the current state are ignored.
    ///
    /// Fails only when storage fails, in which case the measurement keeps the state it had
    /// before the command.
    pub async fn execute(&mut self, command: Command) -> Result<(), EngineError> {
        let state = self.state();
        let Some(transition) = Transition::plan(state, command) else {
            tracing::debug!("Ignoring {:?} while {}", command, state);
            return Ok(());
        };

        let result = self.apply(transition).await;
        match &result {
            Ok(()) => {
                tracing::info!("Measurement is now {}", transition.target());
                self.last_error = None;
            }
            Err(e) => {
                tracing::error!("Failed to {:?} measurement: {}", command, e);
                self.last_error = Some(e.to_string());
            }
        }

        self.publish();
        result
    }

    pub async fn handle_event(&mut self, event: CaptureEvent) {
        let Some(routed) = self.router.route(event) else {
            return;
        };

        match routed {
            Routed::Location(location) => self.on_location(location).await,
            Routed::Altitude(altitude) => self.on_altitude(altitude).await,
            Routed::Boundary(command) => {
                // Failures are already logged and published as last_error.
                let _ = self.execute(command).await;
            }
        }
    }

    /// Moves the engine onto its own task. The task ends once every handle and sink is dropped.
    pub fn spawn(self) -> (EngineHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let handle = EngineHandle::new(sender, self.subscribe());
        let task = tokio::spawn(self.run(receiver));
        (handle, task)
    }

    async fn run(mut self, mut receiver: mpsc::UnboundedReceiver<EngineMessage>) {
        tracing::debug!("Live engine started");

        while let Some(message) = receiver.recv().await {
            match message {
                EngineMessage::Command { command, reply } => {
                    let result = self.execute(command).await;
                    if reply.send(result).is_err() {
                        tracing::debug!("Caller of {:?} went away before the reply", command);
                    }
                }
                EngineMessage::Capture(event) => self.handle_event(event).await,
            }
        }

        if let Some(session) = self.session.as_mut() {
            if session.unsaved() > 0 {
                if let Err(e) = save_current_track(self.storage.as_ref(), session).await {
                    tracing::error!("Failed to save measurement {} on shutdown: {}", session.id(), e);
                }
            }
        }

        tracing::debug!("Live engine stopped");
    }

    async fn apply(&mut self, transition: Transition) -> Result<(), EngineError> {
        let storage = self.storage.as_ref();

        match transition {
            Transition::Start => {
                let id = storage.allocate_session_identifier().await?;
                let mut session = MeasurementSession::new(id, &self.config);
                storage.save_track(id, session.next_track_index(), &[], &[]).await?;
                session.open_track();
                self.session = Some(session);
            }
            Transition::Pause => {
                let Some(session) = self.session.as_mut() else {
                    return Ok(());
                };
                save_current_track(storage, session).await?;
                storage.set_session_state(session.id(), MeasurementState::Paused).await?;
                session.close_track();
            }
            Transition::Resume => {
                let Some(session) = self.session.as_mut() else {
                    return Ok(());
                };
                // A retried resume overwrites the same empty track.
                storage.save_track(session.id(), session.next_track_index(), &[], &[]).await?;
                storage.set_session_state(session.id(), MeasurementState::Running).await?;
                session.open_track();
            }
            Transition::Stop => {
                let Some(session) = self.session.as_mut() else {
                    return Ok(());
                };
                if session.state() == MeasurementState::Running {
                    save_current_track(storage, session).await?;
                }
                storage.finalize_session(session.id()).await?;
                tracing::info!("Finished measurement {}", session.id());
                self.session = None;
            }
        }

        Ok(())
    }

    async fn on_location(&mut self, location: GeoLocation) {
        let Some(session) = self.session.as_mut() else {
            tracing::debug!("Dropping location, no measurement is active");
            return;
        };
        if !session.append_location(location) {
            tracing::debug!("Dropping location, measurement {} is {}", session.id(), session.state());
            return;
        }

        self.after_append().await;
    }

    async fn on_altitude(&mut self, altitude: AltitudeReading) {
        let Some(session) = self.session.as_mut() else {
            tracing::debug!("Dropping altitude, no measurement is active");
            return;
        };
        if !session.append_altitude(altitude) {
            tracing::debug!("Dropping altitude, measurement {} is {}", session.id(), session.state());
            return;
        }

        self.after_append().await;
    }

    async fn after_append(&mut self) {
        let storage = self.storage.as_ref();
        if let Some(session) = self.session.as_mut() {
            if session.unsaved() >= self.config.storage_batch_size {
                match save_current_track(storage, session).await {
                    Ok(()) => self.last_error = None,
                    Err(e) => {
                        tracing::warn!("Failed to save track of measurement {}: {}", session.id(), e);
                        self.last_error = Some(e.to_string());
                    }
                }
            }
        }

        self.publish();
    }

    fn publish(&self) {
        let statistics = match &self.session {
            Some(session) => session.statistics(self.emissions.as_ref(), self.last_error.clone()),
            None => LiveStatistics {
                last_error: self.last_error.clone(),
                ..Default::default()
            },
        };
        self.publisher.publish(statistics);
    }
}

/// Writes the whole open track. Unsaved samples stay counted when storage fails, so the next
/// attempt retries them.
async fn save_current_track<S: MeasurementStorage + ?Sized>(
    storage: &S,
    session: &mut MeasurementSession,
) -> Result<(), EngineError> {
    let Some((index, locations, altitudes)) = session.current_track() else {
        return Ok(());
    };

    storage.save_track(session.id(), index, locations, altitudes).await?;
    tracing::trace!("Saved track {} of measurement {}", index, session.id());
    session.mark_saved();
    Ok(())
}
