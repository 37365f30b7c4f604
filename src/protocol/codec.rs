//! Encodage des commandes et de l'en-tête de réponse
//!
//! Le format est figé côté chansrv : pas de magic, pas de checksum.
//! Le découpage repose entièrement sur des envois/réceptions exacts.

/// Taille d'une trame de commande (client → chansrv)
pub const FRAME_LEN: usize = 11;

/// Taille de l'en-tête de réponse (chansrv → client)
pub const REPLY_HEADER_LEN: usize = 2;

/// Longueur maximale représentable dans une requête
pub const MAX_REQUEST_LEN: usize = u16::MAX as usize;

const LEN_OFFSET: usize = 4;
const CMD_OFFSET: usize = 8;
const PAYLOAD_OFFSET: usize = 9;

const CMD_START: u8 = 1;
const CMD_STOP: u8 = 2;
const CMD_REQUEST: u8 = 3;

/// Commandes envoyées au point de terminaison
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Démarre l'enregistrement côté client RDP
    Start,
    /// Arrête l'enregistrement
    Stop,
    /// Demande jusqu'à N octets d'audio
    Request(u16),
}

impl Command {
    /// Construit une requête en saturant la longueur à 16 bits
    pub fn request(max_bytes: usize) -> Self {
        Command::Request(max_bytes.min(MAX_REQUEST_LEN) as u16)
    }

    /// Encode la commande dans une trame de 11 octets
    pub fn encode(&self) -> [u8; FRAME_LEN] {
        let mut frame = [0u8; FRAME_LEN];
        frame[LEN_OFFSET] = FRAME_LEN as u8;

        let (code, payload) = match *self {
            Command::Start => (CMD_START, 0u16),
            Command::Stop => (CMD_STOP, 0),
            Command::Request(len) => (CMD_REQUEST, len),
        };
        frame[CMD_OFFSET] = code;
        frame[PAYLOAD_OFFSET..].copy_from_slice(&payload.to_le_bytes());
        frame
    }

    /// Décode une trame ; `None` si la longueur ou la commande est inconnue
    pub fn decode(frame: &[u8; FRAME_LEN]) -> Option<Self> {
        if frame[LEN_OFFSET] as usize != FRAME_LEN {
            return None;
        }

        let payload = u16::from_le_bytes([frame[PAYLOAD_OFFSET], frame[PAYLOAD_OFFSET + 1]]);
        match frame[CMD_OFFSET] {
            CMD_START => Some(Command::Start),
            CMD_STOP => Some(Command::Stop),
            CMD_REQUEST => Some(Command::Request(payload)),
            _ => None,
        }
    }
}

/// Encode l'en-tête de réponse (nombre d'octets audio qui suivent)
pub fn encode_reply_header(len: u16) -> [u8; REPLY_HEADER_LEN] {
    len.to_le_bytes()
}

/// Décode l'en-tête de réponse ; 0 signifie « rien pour l'instant »
pub fn decode_reply_header(header: [u8; REPLY_HEADER_LEN]) -> u16 {
    u16::from_le_bytes(header)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn start_frame_layout() {
        assert_eq!(
            Command::Start.encode(),
            [0, 0, 0, 0, 11, 0, 0, 0, 1, 0, 0]
        );
    }

    #[test]
    fn stop_frame_layout() {
        assert_eq!(Command::Stop.encode(), [0, 0, 0, 0, 11, 0, 0, 0, 2, 0, 0]);
    }

    #[test]
    fn request_length_is_little_endian() {
        assert_eq!(
            Command::Request(0x1234).encode(),
            [0, 0, 0, 0, 11, 0, 0, 0, 3, 0x34, 0x12]
        );
    }

    #[test]
    fn request_length_survives_full_u16_range() {
        for len in (0..=u16::MAX).step_by(257).chain([u16::MAX]) {
            let frame = Command::Request(len).encode();
            assert_eq!(Command::decode(&frame), Some(Command::Request(len)));
        }
    }

    #[test]
    fn start_and_stop_decode_back() {
        assert_eq!(Command::decode(&Command::Start.encode()), Some(Command::Start));
        assert_eq!(Command::decode(&Command::Stop.encode()), Some(Command::Stop));
    }

    #[test]
    fn oversized_request_saturates() {
        assert_eq!(Command::request(70_000), Command::Request(u16::MAX));
        assert_eq!(Command::request(512), Command::Request(512));
    }

    #[test]
    fn unknown_frames_are_rejected() {
        let mut frame = Command::Start.encode();
        frame[CMD_OFFSET] = 9;
        assert_eq!(Command::decode(&frame), None);

        let mut frame = Command::Stop.encode();
        frame[LEN_OFFSET] = 12;
        assert_eq!(Command::decode(&frame), None);
    }

    #[test]
    fn reply_header() {
        assert_eq!(decode_reply_header([0, 0]), 0);
        assert_eq!(decode_reply_header(encode_reply_header(7680)), 7680);
        assert_eq!(encode_reply_header(0x0102), [0x02, 0x01]);
    }
}
