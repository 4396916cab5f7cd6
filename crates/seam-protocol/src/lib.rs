#![forbid(unsafe_code)]

//! Client/server wire protocol.
//!
//! Local stream socket carrying length-delimited frames: a 4-byte
//! little-endian type tag, a 4-byte little-endian payload length, then the
//! payload. A frame may carry one file descriptor as SCM_RIGHTS ancillary
//! data (the identify stdin/stdout messages do).
//!
//! The message vocabulary and numeric tag values are fixed; both sides
//! exchange [`PROTOCOL_VERSION`] first and disconnect on mismatch.

pub mod channel;
pub mod frame;
pub mod msg;

pub use channel::Channel;
pub use frame::{Frame, HEADER_LEN, MAX_PAYLOAD};
pub use msg::MsgType;

use thiserror::Error;

/// Protocol version; exchanged in VERSION frames, mismatch disconnects.
pub const PROTOCOL_VERSION: u32 = 8;

/// Protocol-level failures. All of them end the offending connection.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown message type {0}")]
    BadType(u32),

    #[error("payload of {0} bytes exceeds maximum")]
    Oversize(u32),

    #[error("malformed payload for {0:?}")]
    BadPayload(MsgType),

    #[error("peer closed the connection")]
    Closed,

    #[error("protocol version mismatch: peer {peer}, ours {ours}")]
    VersionMismatch { peer: u32, ours: u32 },
}
