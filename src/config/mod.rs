//! Module de configuration
//!
//! Format audio, cadence du worker et emplacement du socket chansrv.

mod endpoint;
mod settings;

pub use endpoint::{
    display_number, DEFAULT_SOCKET_DIR, DISPLAY_ENV, SOCKET_DIR_ENV, SOCKET_NAME_ENV,
};
pub use settings::{
    BridgeConfig, ConfigError, SampleFormat, SampleSpec, CHANNELS_MAX, DEFAULT_DESCRIPTION,
    DEFAULT_LATENCY_TIME_MS, DEFAULT_OVER_REQUEST_FACTOR, DEFAULT_SOURCE_NAME, RATE_MAX,
};
