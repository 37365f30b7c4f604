//! Module transport
//!
//! Connexion au socket Unix de chansrv et entrées/sorties « tout ou rien ».

mod connection;

pub use connection::{Connection, Connector, TransportError, UnixConnector};
