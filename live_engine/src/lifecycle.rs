use ride_tracker_lib::measurement::MeasurementState;
use serde::{Deserialize, Serialize};

/// What the user (or the capture source, through its boundary events) asks the measurement to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Command {
    Start,
    Pause,
    Resume,
    Stop,
}

/// A legal state change together with its side effects on the tracks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Transition {
    /// Stopped -> Running. New session, first track opened, statistics cleared.
    Start,
    /// Running -> Paused. Current track closed.
    Pause,
    /// Paused -> Running. Next track opened.
    Resume,
    /// Running | Paused -> Stopped. Session finalized and released.
    Stop,
}

impl Transition {
    /// `None` means the command is not legal in this state and must be ignored.
    pub(crate) fn plan(state: MeasurementState, command: Command) -> Option<Transition> {
        use MeasurementState::*;

        match (state, command) {
            (Stopped, Command::Start) => Some(Transition::Start),
            (Running, Command::Pause) => Some(Transition::Pause),
            (Paused, Command::Resume) => Some(Transition::Resume),
            (Running | Paused, Command::Stop) => Some(Transition::Stop),
            _ => None,
        }
    }

    pub(crate) fn target(&self) -> MeasurementState {
        match self {
            Transition::Start | Transition::Resume => MeasurementState::Running,
            Transition::Pause => MeasurementState::Paused,
            Transition::Stop => MeasurementState::Stopped,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use MeasurementState::*;

    #[test]
    fn legal_transitions() {
        assert_eq!(Transition::plan(Stopped, Command::Start), Some(Transition::Start));
        assert_eq!(Transition::plan(Running, Command::Pause), Some(Transition::Pause));
        assert_eq!(Transition::plan(Paused, Command::Resume), Some(Transition::Resume));
        assert_eq!(Transition::plan(Running, Command::Stop), Some(Transition::Stop));
        assert_eq!(Transition::plan(Paused, Command::Stop), Some(Transition::Stop));
    }

    #[test]
    fn everything_else_is_ignored() {
        for (state, command) in [
            (Stopped, Command::Pause),
            (Stopped, Command::Resume),
            (Stopped, Command::Stop),
            (Running, Command::Start),
            (Running, Command::Resume),
            (Paused, Command::Start),
            (Paused, Command::Pause),
        ] {
            assert_eq!(Transition::plan(state, command), None, "{state:?} {command:?}");
        }
    }

    #[test]
    fn targets() {
        assert_eq!(Transition::Start.target(), Running);
        assert_eq!(Transition::Pause.target(), Paused);
        assert_eq!(Transition::Resume.target(), Running);
        assert_eq!(Transition::Stop.target(), Stopped);
    }
}
