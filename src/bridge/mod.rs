//! Module pont
//!
//! Lance le worker de capture sur un thread dédié et expose la poignée
//! de contrôle côté hôte.

mod handle;

pub use handle::{Bridge, BridgeError};
