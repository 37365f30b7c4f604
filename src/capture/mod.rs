//! Module de capture
//!
//! Client du protocole xrdp et remise des blocs au pipeline hôte.

mod client;
mod sink;

pub use client::{CaptureClient, ClientError};
pub use sink::{capture_ring, CaptureReader, CaptureSink, RingBufferSink, SinkError};

#[cfg(test)]
pub use sink::MockCaptureSink;
