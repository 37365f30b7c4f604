//! Horodatage du dernier pompage et estimation de latence

use std::time::Duration;
use tokio::time::Instant;

/// Latence maximale annoncée au pipeline hôte
pub const MAX_LATENCY: Duration = Duration::from_micros(1000);

/// Suit l'instant du dernier pompage réussi
///
/// L'horodatage ne recule jamais.
#[derive(Debug, Clone, Copy)]
pub struct LatencyReporter {
    last_pump_time: Instant,
}

impl LatencyReporter {
    pub fn new(now: Instant) -> Self {
        Self {
            last_pump_time: now,
        }
    }

    pub fn last_pump_time(&self) -> Instant {
        self.last_pump_time
    }

    /// Temps écoulé depuis le dernier pompage
    pub fn elapsed(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.last_pump_time)
    }

    /// Enregistre une livraison réussie
    pub fn advance(&mut self, now: Instant) {
        self.last_pump_time = self.last_pump_time.max(now);
    }

    /// Repart de zéro à l'entrée en Running
    pub fn reset(&mut self, now: Instant) {
        self.advance(now);
    }

    /// Durée estimée de données en attente de livraison
    pub fn buffered_latency(&self, now: Instant) -> Duration {
        self.last_pump_time.saturating_duration_since(now)
    }
}

/// Ramène une latence demandée dans la plage supportée
pub fn clamp_requested_latency(requested: Duration) -> Duration {
    requested.min(MAX_LATENCY)
}
