//! Messages de contrôle entre l'hôte et le worker
//!
//! Tout passe par une seule file : changements d'état, requêtes de
//! latence et arrêt. L'hôte ne touche jamais directement à la session.

use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

/// État de la source, piloté par l'hôte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceState {
    /// L'hôte veut de l'audio
    Running,
    /// Source suspendue ou inutilisée
    Idle,
}

/// Message reçu par le worker
#[derive(Debug)]
pub enum ControlMessage {
    SetState(SourceState),
    UpdateRequestedLatency(Duration),
    GetLatency(oneshot::Sender<Duration>),
    GetRequestedLatency(oneshot::Sender<Duration>),
    /// Arrêt ; le worker acquitte avant de se terminer
    Shutdown(oneshot::Sender<()>),
}

/// Événement émis par le worker vers l'hôte
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeEvent {
    /// Le worker ne peut plus fonctionner et attend un Shutdown
    UnloadRequested,
}

/// Erreurs côté hôte
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ControlError {
    #[error("Worker de capture arrêté")]
    WorkerGone,
}

/// Poignée de contrôle côté hôte
#[derive(Debug, Clone)]
pub struct ControlHandle {
    tx: mpsc::UnboundedSender<ControlMessage>,
}

/// Crée la file de contrôle du worker
pub fn control_channel() -> (ControlHandle, mpsc::UnboundedReceiver<ControlMessage>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ControlHandle { tx }, rx)
}

impl ControlHandle {
    /// Notifie un changement d'état de la source
    pub fn set_state(&self, state: SourceState) -> Result<(), ControlError> {
        self.send(ControlMessage::SetState(state))
    }

    /// Transmet la latence demandée par les clients de la source
    pub fn update_requested_latency(&self, latency: Duration) -> Result<(), ControlError> {
        self.send(ControlMessage::UpdateRequestedLatency(latency))
    }

    /// Latence actuellement en tampon
    pub async fn latency(&self) -> Result<Duration, ControlError> {
        let (reply, rx) = oneshot::channel();
        self.send(ControlMessage::GetLatency(reply))?;
        rx.await.map_err(|_| ControlError::WorkerGone)
    }

    /// Dernière latence demandée, après bornage
    pub async fn requested_latency(&self) -> Result<Duration, ControlError> {
        let (reply, rx) = oneshot::channel();
        self.send(ControlMessage::GetRequestedLatency(reply))?;
        rx.await.map_err(|_| ControlError::WorkerGone)
    }

    /// Demande l'arrêt et attend l'acquittement
    pub async fn shutdown(&self) -> Result<(), ControlError> {
        let (ack, rx) = oneshot::channel();
        self.send(ControlMessage::Shutdown(ack))?;
        rx.await.map_err(|_| ControlError::WorkerGone)
    }

    /// Demande l'arrêt sans attendre
    pub(crate) fn request_shutdown(&self) {
        let (ack, _) = oneshot::channel();
        let _ = self.tx.send(ControlMessage::Shutdown(ack));
    }

    fn send(&self, message: ControlMessage) -> Result<(), ControlError> {
        self.tx.send(message).map_err(|_| ControlError::WorkerGone)
    }
}
