//! xrdp-source - Micro de la session RDP comme source de capture locale
//!
//! Se connecte au socket audio de chansrv, pilote l'enregistrement
//! (Start/Stop) et tire les octets au rythme du temps écoulé.

pub mod bridge;
pub mod capture;
pub mod config;
pub mod protocol;
pub mod pump;
pub mod transport;

#[cfg(test)]
mod testing;

pub use bridge::{Bridge, BridgeError};
pub use config::{BridgeConfig, ConfigError};
