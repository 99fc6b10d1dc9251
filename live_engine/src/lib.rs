mod accumulator;
mod configuration;
mod engine;
mod error;
mod event;
mod handle;
mod lifecycle;
mod live_statistics;
mod router;
mod session;

pub use configuration::{ConfigError, Configuration};
pub use engine::LiveEngine;
pub use error::EngineError;
pub use event::CaptureEvent;
pub use handle::{CaptureSink, EngineHandle};
pub use lifecycle::Command;
pub use live_statistics::LiveStatistics;
pub use router::{EventCounts, EventRouter, Routed};
