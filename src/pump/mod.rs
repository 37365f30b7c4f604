//! Module de pompage temps réel
//!
//! Boucle du worker, file de contrôle et estimation de latence.

mod control;
mod latency;
mod worker;

pub use control::{
    control_channel, BridgeEvent, ControlError, ControlHandle, ControlMessage, SourceState,
};
pub use latency::{clamp_requested_latency, LatencyReporter, MAX_LATENCY};
pub use worker::{Session, Worker};
