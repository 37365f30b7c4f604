//! Boucle de pompage
//!
//! En Running, chaque réveil calcule le déficit d'octets depuis le dernier
//! pompage réussi, le demande (avec marge) à chansrv et poste le résultat.
//! En Idle, le minuteur est désactivé et seul un message réveille la boucle.

use super::control::{BridgeEvent, ControlMessage, SourceState};
use super::latency::{clamp_requested_latency, LatencyReporter, MAX_LATENCY};
use crate::capture::{CaptureClient, CaptureSink, SinkError};
use crate::config::{BridgeConfig, SampleSpec};
use crate::transport::Connector;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep_until, Instant};

/// État complet d'une instance du pont, possédé par le worker
pub struct Session<C: Connector> {
    client: CaptureClient<C>,
    reporter: LatencyReporter,
    sample_spec: SampleSpec,
    target_latency: Duration,
    over_request_factor: usize,
    requested_latency: Duration,
    state: SourceState,
    failures: u32,
}

impl<C: Connector> Session<C> {
    pub fn new(connector: C, config: &BridgeConfig) -> Self {
        Self {
            client: CaptureClient::new(connector),
            reporter: LatencyReporter::new(Instant::now()),
            sample_spec: config.sample_spec,
            target_latency: config.latency_time,
            over_request_factor: config.over_request_factor,
            requested_latency: MAX_LATENCY,
            state: SourceState::Idle,
            failures: 0,
        }
    }

    pub fn state(&self) -> SourceState {
        self.state
    }

    pub fn capture_active(&self) -> bool {
        self.client.capture_active()
    }
}

enum Wake {
    Control(Option<ControlMessage>),
    Timer,
}

enum Flow {
    Continue,
    Shutdown(oneshot::Sender<()>),
    Detached,
}

/// Worker unique d'une instance du pont
pub struct Worker<C: Connector, S: CaptureSink> {
    session: Session<C>,
    sink: S,
    control: mpsc::UnboundedReceiver<ControlMessage>,
    events: mpsc::UnboundedSender<BridgeEvent>,
}

impl<C: Connector, S: CaptureSink> Worker<C, S> {
    pub fn new(
        session: Session<C>,
        sink: S,
        control: mpsc::UnboundedReceiver<ControlMessage>,
        events: mpsc::UnboundedSender<BridgeEvent>,
    ) -> Self {
        Self {
            session,
            sink,
            control,
            events,
        }
    }

    /// Exécute la boucle jusqu'au Shutdown
    pub async fn run(mut self) {
        self.session.reporter.reset(Instant::now());
        tracing::debug!("Worker de capture démarré");

        loop {
            let state = self.session.state;
            let deadline = match state {
                SourceState::Running => match self.pump_cycle().await {
                    Ok(deadline) => Some(deadline),
                    Err(e) => {
                        tracing::warn!("{}, demande de déchargement", e);
                        self.fail().await;
                        return;
                    }
                },
                SourceState::Idle => {
                    self.session.client.stop_if_active().await;
                    None
                }
            };

            // Les messages passent avant le minuteur : un passage en Idle
            // est vu avant la requête suivante.
            let wake = tokio::select! {
                biased;
                message = self.control.recv() => Wake::Control(message),
                _ = wait_until(deadline) => Wake::Timer,
            };

            let flow = match wake {
                Wake::Timer => Flow::Continue,
                Wake::Control(Some(message)) => self.handle(message),
                Wake::Control(None) => Flow::Detached,
            };

            match flow {
                Flow::Continue => {}
                Flow::Shutdown(ack) => {
                    self.session.client.close();
                    let _ = ack.send(());
                    tracing::debug!("Worker de capture arrêté");
                    return;
                }
                Flow::Detached => {
                    self.session.client.close();
                    tracing::debug!("File de contrôle fermée, arrêt du worker");
                    return;
                }
            }
        }
    }

    /// Un cycle Running ; retourne l'instant du prochain réveil
    async fn pump_cycle(&mut self) -> Result<Instant, SinkError> {
        let session = &mut self.session;
        let now = Instant::now();
        let deficit = session
            .sample_spec
            .duration_to_bytes(session.reporter.elapsed(now));

        if deficit > 0 {
            let quota = deficit.saturating_mul(session.over_request_factor);
            match session.client.request_data(quota).await {
                Ok(chunk) if !chunk.is_empty() => {
                    session.failures = 0;
                    self.sink.post(chunk)?;
                    session.reporter.advance(now);
                }
                Ok(_) => {
                    session.failures = 0;
                    tracing::trace!("Aucune donnée disponible ({} octets demandés)", quota);
                }
                Err(e) => {
                    session.failures += 1;
                    let count = session.failures;
                    if count == 1 || count.is_power_of_two() {
                        tracing::debug!("Cycle sauté ({} échecs consécutifs): {}", count, e);
                    }
                }
            }
        }

        Ok(now + session.target_latency)
    }

    fn handle(&mut self, message: ControlMessage) -> Flow {
        let session = &mut self.session;
        match message {
            ControlMessage::SetState(state) => {
                if state == SourceState::Running && session.state != SourceState::Running {
                    session.reporter.reset(Instant::now());
                }
                if state != session.state {
                    tracing::debug!("Source: {:?} -> {:?}", session.state, state);
                }
                session.state = state;
            }
            ControlMessage::UpdateRequestedLatency(latency) => {
                session.requested_latency = clamp_requested_latency(latency);
            }
            ControlMessage::GetLatency(reply) => {
                let _ = reply.send(session.reporter.buffered_latency(Instant::now()));
            }
            ControlMessage::GetRequestedLatency(reply) => {
                let _ = reply.send(session.requested_latency);
            }
            ControlMessage::Shutdown(ack) => return Flow::Shutdown(ack),
        }
        Flow::Continue
    }

    /// Demande le déchargement puis attend le Shutdown formel
    async fn fail(mut self) {
        self.session.client.close();
        let _ = self.events.send(BridgeEvent::UnloadRequested);

        while let Some(message) = self.control.recv().await {
            match message {
                ControlMessage::Shutdown(ack) => {
                    let _ = ack.send(());
                    tracing::debug!("Worker de capture arrêté après échec");
                    return;
                }
                ControlMessage::GetLatency(reply) => {
                    let _ = reply.send(Duration::ZERO);
                }
                ControlMessage::GetRequestedLatency(reply) => {
                    let _ = reply.send(self.session.requested_latency);
                }
                ControlMessage::SetState(_) | ControlMessage::UpdateRequestedLatency(_) => {}
            }
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
