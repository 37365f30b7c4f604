//! Client du protocole de capture
//!
//! Démarre l'enregistrement à la première demande, réclame des octets,
//! arrête l'enregistrement quand la source repasse au repos.

use crate::protocol::{decode_reply_header, Command, REPLY_HEADER_LEN};
use crate::transport::{Connection, Connector, TransportError};
use thiserror::Error;

/// Erreurs du client de capture
#[derive(Error, Debug)]
pub enum ClientError {
    /// Connexion absente ou perdue ; le cycle est sauté
    #[error("Déconnecté du point de terminaison: {0}")]
    Disconnected(#[from] TransportError),
}

/// Client du canal audio d'entrée de chansrv
pub struct CaptureClient<C: Connector> {
    connection: Connection<C>,
    capture_active: bool,
}

impl<C: Connector> CaptureClient<C> {
    /// Crée un client non connecté
    pub fn new(connector: C) -> Self {
        Self {
            connection: Connection::new(connector),
            capture_active: false,
        }
    }

    /// Vrai si Start a été envoyé sans Stop ni déconnexion depuis
    pub fn capture_active(&self) -> bool {
        self.capture_active
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_connected()
    }

    /// Demande jusqu'à `max_bytes` octets d'audio
    ///
    /// Un vecteur vide signifie « rien de disponible pour l'instant ».
    /// Toute erreur d'E/S ferme la connexion ; la reconnexion se fait au
    /// prochain appel.
    pub async fn request_data(&mut self, max_bytes: usize) -> Result<Vec<u8>, ClientError> {
        self.connection.ensure_connected().await?;

        if !self.capture_active {
            self.exchange(Command::Start).await?;
            self.capture_active = true;
            tracing::info!("Enregistrement démarré");
        }

        self.exchange(Command::request(max_bytes)).await?;

        let header = self.receive(REPLY_HEADER_LEN).await?;
        let len = decode_reply_header([header[0], header[1]]);
        if len == 0 {
            return Ok(Vec::new());
        }

        self.receive(len as usize).await
    }

    /// Envoie Stop si l'enregistrement est actif
    ///
    /// L'état local repasse à inactif même si l'envoi échoue.
    pub async fn stop_if_active(&mut self) {
        if !self.capture_active {
            return;
        }

        if self.connection.is_connected() {
            if let Err(e) = self.exchange(Command::Stop).await {
                tracing::debug!("Envoi de Stop impossible: {}", e);
            }
        }
        self.capture_active = false;
        tracing::info!("Enregistrement arrêté");
    }

    /// Ferme la connexion et abandonne l'état d'enregistrement
    pub fn close(&mut self) {
        self.connection.close();
        self.capture_active = false;
    }

    async fn exchange(&mut self, command: Command) -> Result<(), ClientError> {
        match self.connection.send_exact(&command.encode()).await {
            Ok(()) => Ok(()),
            Err(e) => {
                self.close();
                Err(e.into())
            }
        }
    }

    async fn receive(&mut self, count: usize) -> Result<Vec<u8>, ClientError> {
        match self.connection.recv_exact(count).await {
            Ok(bytes) => Ok(bytes),
            Err(e) => {
                self.close();
                Err(e.into())
            }
        }
    }
}
