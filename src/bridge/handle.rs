//! Cycle de vie d'une instance du pont

use crate::capture::CaptureSink;
use crate::config::{BridgeConfig, ConfigError};
use crate::pump::{control_channel, BridgeEvent, ControlError, ControlHandle, Session, Worker};
use crate::transport::{Connector, UnixConnector};
use std::io;
use std::path::PathBuf;
use std::thread::{self, JoinHandle};
use thiserror::Error;
use tokio::sync::mpsc;

/// Erreurs du pont
#[derive(Error, Debug)]
pub enum BridgeError {
    #[error("Configuration invalide: {0}")]
    Config(#[from] ConfigError),

    #[error("Impossible de lancer le worker: {0}")]
    Spawn(#[source] io::Error),

    #[error(transparent)]
    Control(#[from] ControlError),
}

/// Instance du pont : un worker dédié, une file de contrôle
pub struct Bridge {
    control: ControlHandle,
    events: mpsc::UnboundedReceiver<BridgeEvent>,
    endpoint: String,
    thread: Option<JoinHandle<()>>,
}

impl Bridge {
    /// Démarre un pont vers le socket chansrv résolu depuis la configuration
    pub fn start<S>(config: &BridgeConfig, sink: S) -> Result<Self, BridgeError>
    where
        S: CaptureSink + 'static,
    {
        let path: PathBuf = config.endpoint_path();
        Self::spawn(config, UnixConnector::new(path), sink)
    }

    /// Démarre un pont avec un connecteur quelconque
    pub fn spawn<C, S>(config: &BridgeConfig, connector: C, sink: S) -> Result<Self, BridgeError>
    where
        C: Connector + 'static,
        S: CaptureSink + 'static,
    {
        config.validate()?;

        let endpoint = connector.endpoint();
        tracing::info!(
            "Source {} ({}): {}, réveil toutes les {:?}, socket {}",
            config.source_name,
            config.description,
            config.sample_spec,
            config.latency_time,
            endpoint
        );

        let (control, control_rx) = control_channel();
        let (events_tx, events) = mpsc::unbounded_channel();
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(BridgeError::Spawn)?;

        let config = config.clone();
        let thread = thread::Builder::new()
            .name("xrdp-source".into())
            .spawn(move || {
                let session = Session::new(connector, &config);
                runtime.block_on(Worker::new(session, sink, control_rx, events_tx).run());
            })
            .map_err(BridgeError::Spawn)?;

        Ok(Self {
            control,
            events,
            endpoint,
            thread: Some(thread),
        })
    }

    /// Poignée de contrôle (état, latence)
    pub fn control(&self) -> &ControlHandle {
        &self.control
    }

    /// Point de terminaison visé
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Prochain événement émis par le worker
    pub async fn next_event(&mut self) -> Option<BridgeEvent> {
        self.events.recv().await
    }

    /// Arrête le worker, attend son acquittement puis la fin du thread
    pub async fn shutdown(mut self) -> Result<(), BridgeError> {
        let result = self.control.shutdown().await;

        if let Some(thread) = self.thread.take() {
            match tokio::task::spawn_blocking(move || thread.join()).await {
                Ok(Ok(())) => {}
                _ => tracing::error!("Le thread de capture s'est terminé en erreur"),
            }
        }

        tracing::info!("Pont arrêté");
        result.map_err(BridgeError::from)
    }
}

impl Drop for Bridge {
    fn drop(&mut self) {
        if let Some(thread) = self.thread.take() {
            self.control.request_shutdown();
            let _ = thread.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::capture_ring;
    use crate::protocol::{encode_reply_header, Command, FRAME_LEN};
    use crate::pump::SourceState;
    use crate::testing::FakeEndpoint;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::UnixListener;
    use tokio::time::{sleep, timeout};

    async fn read_command(stream: &mut tokio::net::UnixStream) -> Option<Command> {
        let mut frame = [0u8; FRAME_LEN];
        stream.read_exact(&mut frame).await.ok()?;
        Command::decode(&frame)
    }

    #[tokio::test]
    async fn captures_over_unix_socket() {
        let dir = tempfile::tempdir().unwrap();
        let listener = UnixListener::bind(dir.path().join("mic")).unwrap();

        let server = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            assert_eq!(read_command(&mut stream).await, Some(Command::Start));
            assert!(matches!(
                read_command(&mut stream).await,
                Some(Command::Request(_))
            ));
            stream.write_all(&encode_reply_header(6)).await.unwrap();
            stream.write_all(&[1, 2, 3, 4, 5, 6]).await.unwrap();

            loop {
                match read_command(&mut stream).await {
                    Some(Command::Request(_)) => {
                        stream.write_all(&encode_reply_header(0)).await.unwrap()
                    }
                    other => return other,
                }
            }
        });

        let config = BridgeConfig {
            socket_dir: Some(dir.path().display().to_string()),
            socket_name: Some("mic".into()),
            ..Default::default()
        };
        let (sink, mut reader) = capture_ring(4096);
        let bridge = Bridge::start(&config, sink).unwrap();
        assert_eq!(bridge.endpoint(), dir.path().join("mic").display().to_string());

        bridge.control().set_state(SourceState::Running).unwrap();
        timeout(Duration::from_secs(5), async {
            while reader.available() < 6 {
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();

        let mut buf = [0u8; 16];
        let n = reader.read(&mut buf);
        assert_eq!(&buf[..n], &[1, 2, 3, 4, 5, 6]);

        bridge.control().set_state(SourceState::Idle).unwrap();
        let last = timeout(Duration::from_secs(5), server).await.unwrap().unwrap();
        assert_eq!(last, Some(Command::Stop));

        bridge.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn invalid_config_is_rejected() {
        let mut config = BridgeConfig::default();
        config.sample_spec.channels = 0;
        let (sink, _reader) = capture_ring(64);

        let err = Bridge::spawn(&config, FakeEndpoint::default(), sink)
            .err()
            .unwrap();
        assert!(matches!(
            err,
            BridgeError::Config(ConfigError::InvalidChannels(0))
        ));
    }

    #[tokio::test]
    async fn dropped_reader_requests_unload() {
        let endpoint = FakeEndpoint::default();
        endpoint.push_reply(crate::testing::Reply::Data(vec![0; 32]));
        let (sink, reader) = capture_ring(64);
        drop(reader);

        let mut bridge = Bridge::spawn(&BridgeConfig::default(), endpoint, sink).unwrap();
        bridge.control().set_state(SourceState::Running).unwrap();

        let event = timeout(Duration::from_secs(5), bridge.next_event())
            .await
            .unwrap();
        assert_eq!(event, Some(BridgeEvent::UnloadRequested));
        bridge.shutdown().await.unwrap();
    }

    #[test]
    fn drop_stops_worker() {
        let (sink, _reader) = capture_ring(64);
        let bridge = Bridge::spawn(&BridgeConfig::default(), FakeEndpoint::default(), sink).unwrap();
        bridge.control().set_state(SourceState::Running).unwrap();

        drop(bridge);
    }
}
