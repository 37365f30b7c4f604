//! Gestion de la connexion au point de terminaison
//!
//! Connexion paresseuse, envois et réceptions exacts, fermeture idempotente.
//! Un échange incomplet est une perte de connexion, jamais un succès partiel.

use async_trait::async_trait;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::UnixStream;

/// Erreurs de transport
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Connexion impossible à {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: io::Error,
    },

    #[error("Échange incomplet ({op}): {source}")]
    ShortIo {
        op: &'static str,
        #[source]
        source: io::Error,
    },

    #[error("Aucune connexion ouverte")]
    NotConnected,
}

/// Ouvre un flux vers le point de terminaison
#[async_trait]
pub trait Connector: Send + Sync {
    /// Type de flux produit
    type Stream: AsyncRead + AsyncWrite + Unpin + Send;

    /// Ouvre une nouvelle connexion
    async fn connect(&self) -> io::Result<Self::Stream>;

    /// Description du point de terminaison pour les logs
    fn endpoint(&self) -> String;
}

/// Connecteur vers un socket Unix en mode flux
#[derive(Debug, Clone)]
pub struct UnixConnector {
    path: PathBuf,
}

impl UnixConnector {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Connector for UnixConnector {
    type Stream = UnixStream;

    async fn connect(&self) -> io::Result<UnixStream> {
        UnixStream::connect(&self.path).await
    }

    fn endpoint(&self) -> String {
        self.path.display().to_string()
    }
}

/// Connexion au point de terminaison, ouverte à la demande
pub struct Connection<C: Connector> {
    connector: C,
    stream: Option<C::Stream>,
}

impl<C: Connector> Connection<C> {
    /// Crée une connexion fermée
    pub fn new(connector: C) -> Self {
        Self {
            connector,
            stream: None,
        }
    }

    /// Indique si un flux est ouvert
    pub fn is_connected(&self) -> bool {
        self.stream.is_some()
    }

    /// Ouvre le flux si nécessaire
    ///
    /// En cas d'échec la connexion reste fermée.
    pub async fn ensure_connected(&mut self) -> Result<&mut C::Stream, TransportError> {
        if self.stream.is_none() {
            tracing::debug!("Tentative de connexion à {}", self.connector.endpoint());
            let stream = self
                .connector
                .connect()
                .await
                .map_err(|source| TransportError::Connect {
                    endpoint: self.connector.endpoint(),
                    source,
                })?;
            tracing::info!("Connecté à {}", self.connector.endpoint());
            self.stream = Some(stream);
        }

        self.stream.as_mut().ok_or(TransportError::NotConnected)
    }

    /// Envoie tous les octets ou échoue
    pub async fn send_exact(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;
        stream
            .write_all(bytes)
            .await
            .map_err(|source| TransportError::ShortIo { op: "envoi", source })
    }

    /// Reçoit exactement `count` octets ou échoue
    pub async fn recv_exact(&mut self, count: usize) -> Result<Vec<u8>, TransportError> {
        let stream = self.stream.as_mut().ok_or(TransportError::NotConnected)?;
        let mut buf = vec![0u8; count];
        stream
            .read_exact(&mut buf)
            .await
            .map_err(|source| TransportError::ShortIo {
                op: "réception",
                source,
            })?;
        Ok(buf)
    }

    /// Ferme le flux ; sans effet s'il est déjà fermé
    pub fn close(&mut self) {
        if self.stream.take().is_some() {
            tracing::debug!("Connexion à {} fermée", self.connector.endpoint());
        }
    }
}
