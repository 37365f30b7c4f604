//! Remise des blocs capturés au pipeline hôte
//!
//! Le ring buffer découple le worker (producteur) du lecteur hôte.

use ringbuf::{traits::*, HeapCons, HeapProd, HeapRb};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

/// Erreurs côté pipeline hôte
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SinkError {
    #[error("Pipeline hôte fermé")]
    Closed,
}

/// Reçoit les blocs audio capturés
#[cfg_attr(test, mockall::automock)]
pub trait CaptureSink: Send {
    /// Poste un bloc tel que reçu du point de terminaison
    fn post(&mut self, chunk: Vec<u8>) -> Result<(), SinkError>;
}

/// Crée un couple producteur/lecteur autour d'un ring buffer d'octets
pub fn capture_ring(capacity: usize) -> (RingBufferSink, CaptureReader) {
    let (producer, consumer) = HeapRb::<u8>::new(capacity).split();
    let closed = Arc::new(AtomicBool::new(false));

    (
        RingBufferSink {
            producer,
            closed: Arc::clone(&closed),
            dropped: 0,
        },
        CaptureReader { consumer, closed },
    )
}

/// Producteur : côté worker
pub struct RingBufferSink {
    producer: HeapProd<u8>,
    closed: Arc<AtomicBool>,
    dropped: u64,
}

impl RingBufferSink {
    /// Octets perdus faute de place depuis la création
    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

impl CaptureSink for RingBufferSink {
    fn post(&mut self, chunk: Vec<u8>) -> Result<(), SinkError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(SinkError::Closed);
        }

        let pushed = self.producer.push_slice(&chunk);
        if pushed < chunk.len() {
            let lost = (chunk.len() - pushed) as u64;
            self.dropped += lost;
            tracing::warn!(
                "Ring buffer plein: {} octets perdus ({} au total)",
                lost,
                self.dropped
            );
        }
        Ok(())
    }
}

/// Lecteur : côté pipeline hôte
pub struct CaptureReader {
    consumer: HeapCons<u8>,
    closed: Arc<AtomicBool>,
}

impl CaptureReader {
    /// Lit les octets disponibles, sans bloquer
    pub fn read(&mut self, buf: &mut [u8]) -> usize {
        self.consumer.pop_slice(buf)
    }

    /// Nombre d'octets en attente
    pub fn available(&self) -> usize {
        self.consumer.occupied_len()
    }
}

impl Drop for CaptureReader {
    fn drop(&mut self) {
        self.closed.store(true, Ordering::Release);
    }
}
