//! Module protocole xrdp
//!
//! Trames fixes échangées avec le canal audio d'entrée de chansrv.

mod codec;

pub use codec::{
    decode_reply_header, encode_reply_header, Command, FRAME_LEN, MAX_REQUEST_LEN,
    REPLY_HEADER_LEN,
};
