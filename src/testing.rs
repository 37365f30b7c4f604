//! Points de terminaison simulés pour les tests

use crate::protocol::{encode_reply_header, Command, FRAME_LEN};
use crate::transport::Connector;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use tokio::io::{duplex, AsyncReadExt, AsyncWriteExt, DuplexStream};

/// Réponse scriptée à une requête de données
#[derive(Debug, Clone)]
pub enum Reply {
    /// En-tête + données complètes
    Data(Vec<u8>),
    /// Données complètes puis fermeture
    DataThenHangup(Vec<u8>),
    /// Coupe la connexion sans répondre
    Hangup,
    /// Annonce `claimed` octets, n'en envoie que `sent` puis coupe
    Truncated { claimed: u16, sent: Vec<u8> },
}

#[derive(Default)]
struct EndpointState {
    commands: Vec<Command>,
    replies: VecDeque<Reply>,
    refuse: bool,
    connects: usize,
}

/// Imitation de chansrv : enregistre les commandes, répond selon un script
///
/// Sans réponse scriptée, une requête reçoit un en-tête à 0.
#[derive(Clone, Default)]
pub struct FakeEndpoint {
    state: Arc<Mutex<EndpointState>>,
}

impl FakeEndpoint {
    pub fn push_reply(&self, reply: Reply) {
        self.state.lock().unwrap().replies.push_back(reply);
    }

    pub fn set_refuse(&self, refuse: bool) {
        self.state.lock().unwrap().refuse = refuse;
    }

    pub fn commands(&self) -> Vec<Command> {
        self.state.lock().unwrap().commands.clone()
    }

    pub fn count(&self, command: Command) -> usize {
        self.commands().iter().filter(|c| **c == command).count()
    }

    pub fn starts(&self) -> usize {
        self.count(Command::Start)
    }

    pub fn stops(&self) -> usize {
        self.count(Command::Stop)
    }

    pub fn connects(&self) -> usize {
        self.state.lock().unwrap().connects
    }

    /// Laisse tourner les tâches serveur jusqu'à `n` commandes reçues
    pub async fn settle(&self, n: usize) {
        for _ in 0..1000 {
            if self.commands().len() >= n {
                return;
            }
            tokio::task::yield_now().await;
        }
    }
}

#[async_trait]
impl Connector for FakeEndpoint {
    type Stream = DuplexStream;

    async fn connect(&self) -> io::Result<DuplexStream> {
        {
            let mut state = self.state.lock().unwrap();
            state.connects += 1;
            if state.refuse {
                return Err(io::Error::from(io::ErrorKind::ConnectionRefused));
            }
        }

        let (client, server) = duplex(1 << 17);
        tokio::spawn(serve(Arc::clone(&self.state), server));
        Ok(client)
    }

    fn endpoint(&self) -> String {
        "fake-chansrv".into()
    }
}

async fn serve(state: Arc<Mutex<EndpointState>>, mut stream: DuplexStream) {
    loop {
        let mut frame = [0u8; FRAME_LEN];
        if stream.read_exact(&mut frame).await.is_err() {
            return;
        }
        let Some(command) = Command::decode(&frame) else {
            return;
        };

        let reply = {
            let mut state = state.lock().unwrap();
            state.commands.push(command);
            match command {
                Command::Request(_) => Some(state.replies.pop_front()),
                _ => None,
            }
        };

        let result = match reply {
            None => Ok(()),
            Some(None) => stream.write_all(&encode_reply_header(0)).await,
            Some(Some(Reply::Data(data))) => {
                let mut out = encode_reply_header(data.len() as u16).to_vec();
                out.extend_from_slice(&data);
                stream.write_all(&out).await
            }
            Some(Some(Reply::DataThenHangup(data))) => {
                let mut out = encode_reply_header(data.len() as u16).to_vec();
                out.extend_from_slice(&data);
                let _ = stream.write_all(&out).await;
                return;
            }
            Some(Some(Reply::Hangup)) => return,
            Some(Some(Reply::Truncated { claimed, sent })) => {
                let mut out = encode_reply_header(claimed).to_vec();
                out.extend_from_slice(&sent);
                let _ = stream.write_all(&out).await;
                return;
            }
        };
        if result.is_err() {
            return;
        }
    }
}
