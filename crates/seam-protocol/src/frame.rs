//! Frame encoding and payload codecs.
//!
//! A frame is `type:u32le length:u32le payload[length]`, optionally with a
//! descriptor in ancillary data. Payload codecs cover the handful of
//! structured payloads; everything else is a raw byte string.

use std::os::fd::OwnedFd;

use crate::msg::MsgType;
use crate::ProtocolError;

/// Frame header size: type + length.
pub const HEADER_LEN: usize = 8;

/// Upper bound on a frame payload; oversize frames disconnect the peer.
pub const MAX_PAYLOAD: usize = 16 * 1024;

/// A single wire frame.
#[derive(Debug)]
pub struct Frame {
    pub kind: MsgType,
    pub payload: Vec<u8>,
    /// Descriptor passed via SCM_RIGHTS, when the type carries one.
    pub fd: Option<OwnedFd>,
}

impl Frame {
    /// A frame with no payload.
    #[must_use]
    pub fn empty(kind: MsgType) -> Self {
        Self {
            kind,
            payload: Vec::new(),
            fd: None,
        }
    }

    /// A frame with a payload.
    #[must_use]
    pub fn new(kind: MsgType, payload: Vec<u8>) -> Self {
        Self {
            kind,
            payload,
            fd: None,
        }
    }

    /// A frame carrying a descriptor.
    #[must_use]
    pub fn with_fd(kind: MsgType, fd: OwnedFd) -> Self {
        Self {
            kind,
            payload: Vec::new(),
            fd: Some(fd),
        }
    }

    /// Encode the header + payload.
    #[must_use]
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.payload.len());
        out.extend_from_slice(&(self.kind as u32).to_le_bytes());
        out.extend_from_slice(&(self.payload.len() as u32).to_le_bytes());
        out.extend_from_slice(&self.payload);
        out
    }

    /// Try to pop one frame off the front of `buf`.
    ///
    /// Returns the frame and the number of bytes consumed, `None` if the
    /// buffer does not yet hold a complete frame.
    pub fn decode(buf: &[u8]) -> Result<Option<(Frame, usize)>, ProtocolError> {
        if buf.len() < HEADER_LEN {
            return Ok(None);
        }
        let raw_type = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
        let len = u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);
        if len as usize > MAX_PAYLOAD {
            return Err(ProtocolError::Oversize(len));
        }
        let kind = MsgType::from_u32(raw_type).ok_or(ProtocolError::BadType(raw_type))?;
        let total = HEADER_LEN + len as usize;
        if buf.len() < total {
            return Ok(None);
        }
        Ok(Some((
            Frame::new(kind, buf[HEADER_LEN..total].to_vec()),
            total,
        )))
    }
}

// ── Payload codecs ──────────────────────────────────────────────────

/// Encode a u32 payload (VERSION, IDENTIFY_FLAGS, IDENTIFY_CLIENTPID...).
#[must_use]
pub fn encode_u32(value: u32) -> Vec<u8> {
    value.to_le_bytes().to_vec()
}

/// Decode a u32 payload.
pub fn decode_u32(kind: MsgType, payload: &[u8]) -> Result<u32, ProtocolError> {
    let bytes: [u8; 4] = payload
        .try_into()
        .map_err(|_| ProtocolError::BadPayload(kind))?;
    Ok(u32::from_le_bytes(bytes))
}

/// Encode a RESIZE payload: u16 cols, u16 rows.
#[must_use]
pub fn encode_resize(cols: u16, rows: u16) -> Vec<u8> {
    let mut out = Vec::with_capacity(4);
    out.extend_from_slice(&cols.to_le_bytes());
    out.extend_from_slice(&rows.to_le_bytes());
    out
}

/// Decode a RESIZE payload.
pub fn decode_resize(payload: &[u8]) -> Result<(u16, u16), ProtocolError> {
    if payload.len() != 4 {
        return Err(ProtocolError::BadPayload(MsgType::Resize));
    }
    Ok((
        u16::from_le_bytes([payload[0], payload[1]]),
        u16::from_le_bytes([payload[2], payload[3]]),
    ))
}

/// Encode a COMMAND payload: u32 argc + NUL-terminated argv strings.
#[must_use]
pub fn encode_argv(argv: &[String]) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&(argv.len() as u32).to_le_bytes());
    for arg in argv {
        out.extend_from_slice(arg.as_bytes());
        out.push(0);
    }
    out
}

/// Decode a COMMAND payload.
pub fn decode_argv(payload: &[u8]) -> Result<Vec<String>, ProtocolError> {
    let bad = || ProtocolError::BadPayload(MsgType::Command);
    if payload.len() < 4 {
        return Err(bad());
    }
    let argc = u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]) as usize;
    let mut rest = &payload[4..];
    let mut argv = Vec::with_capacity(argc.min(256));
    for _ in 0..argc {
        let nul = rest.iter().position(|&b| b == 0).ok_or_else(bad)?;
        let arg = std::str::from_utf8(&rest[..nul]).map_err(|_| bad())?;
        argv.push(arg.to_string());
        rest = &rest[nul + 1..];
    }
    if !rest.is_empty() {
        return Err(bad());
    }
    Ok(argv)
}

/// Encode a NUL-terminated string payload (IDENTIFY_TERM and friends).
#[must_use]
pub fn encode_cstring(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len() + 1);
    out.extend_from_slice(s.as_bytes());
    out.push(0);
    out
}

/// Decode a NUL-terminated string payload.
pub fn decode_cstring(kind: MsgType, payload: &[u8]) -> Result<String, ProtocolError> {
    match payload.split_last() {
        Some((0, body)) => std::str::from_utf8(body)
            .map(str::to_string)
            .map_err(|_| ProtocolError::BadPayload(kind)),
        _ => Err(ProtocolError::BadPayload(kind)),
    }
}

/// Encode a stream-id-prefixed data payload (READ / WRITE).
#[must_use]
pub fn encode_stream_data(stream: u32, data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(4 + data.len());
    out.extend_from_slice(&stream.to_le_bytes());
    out.extend_from_slice(data);
    out
}

/// Decode a stream-id-prefixed data payload.
pub fn decode_stream_data(kind: MsgType, payload: &[u8]) -> Result<(u32, &[u8]), ProtocolError> {
    if payload.len() < 4 {
        return Err(ProtocolError::BadPayload(kind));
    }
    let stream = u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]);
    Ok((stream, &payload[4..]))
}

/// Encode a stream result payload: stream id + errno-style code.
#[must_use]
pub fn encode_stream_result(stream: u32, error: i32) -> Vec<u8> {
    let mut out = Vec::with_capacity(8);
    out.extend_from_slice(&stream.to_le_bytes());
    out.extend_from_slice(&error.to_le_bytes());
    out
}

/// Decode a stream result payload.
pub fn decode_stream_result(kind: MsgType, payload: &[u8]) -> Result<(u32, i32), ProtocolError> {
    if payload.len() != 8 {
        return Err(ProtocolError::BadPayload(kind));
    }
    Ok((
        u32::from_le_bytes([payload[0], payload[1], payload[2], payload[3]]),
        i32::from_le_bytes([payload[4], payload[5], payload[6], payload[7]]),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_round_trip() {
        let frame = Frame::new(MsgType::Command, b"hello".to_vec());
        let bytes = frame.encode();
        let (decoded, used) = Frame::decode(&bytes).unwrap().unwrap();
        assert_eq!(used, bytes.len());
        assert_eq!(decoded.kind, MsgType::Command);
        assert_eq!(decoded.payload, b"hello");
    }

    #[test]
    fn partial_frame_waits() {
        let frame = Frame::new(MsgType::Ready, vec![1, 2, 3]);
        let bytes = frame.encode();
        assert!(Frame::decode(&bytes[..5]).unwrap().is_none());
        assert!(Frame::decode(&bytes[..HEADER_LEN + 1]).unwrap().is_none());
    }

    #[test]
    fn bad_type_rejected() {
        let mut bytes = Frame::new(MsgType::Ready, vec![]).encode();
        bytes[0] = 0xFF;
        assert!(matches!(
            Frame::decode(&bytes),
            Err(ProtocolError::BadType(_))
        ));
    }

    #[test]
    fn oversize_rejected() {
        let mut bytes = Frame::new(MsgType::Ready, vec![]).encode();
        bytes[4..8].copy_from_slice(&(MAX_PAYLOAD as u32 + 1).to_le_bytes());
        assert!(matches!(
            Frame::decode(&bytes),
            Err(ProtocolError::Oversize(_))
        ));
    }

    #[test]
    fn argv_round_trip() {
        let argv = vec![
            "new-session".to_string(),
            "-s".to_string(),
            "work space".to_string(),
        ];
        let decoded = decode_argv(&encode_argv(&argv)).unwrap();
        assert_eq!(decoded, argv);
    }

    #[test]
    fn argv_empty() {
        assert_eq!(decode_argv(&encode_argv(&[])).unwrap(), Vec::<String>::new());
    }

    #[test]
    fn argv_trailing_garbage_rejected() {
        let mut bytes = encode_argv(&["a".to_string()]);
        bytes.push(b'x');
        assert!(decode_argv(&bytes).is_err());
    }

    #[test]
    fn resize_round_trip() {
        let (cols, rows) = decode_resize(&encode_resize(100, 30)).unwrap();
        assert_eq!((cols, rows), (100, 30));
    }

    #[test]
    fn cstring_round_trip() {
        let s = decode_cstring(
            MsgType::IdentifyTerm,
            &encode_cstring("xterm-256color"),
        )
        .unwrap();
        assert_eq!(s, "xterm-256color");
    }

    #[test]
    fn cstring_missing_nul_rejected() {
        assert!(decode_cstring(MsgType::IdentifyTerm, b"oops").is_err());
    }

    #[test]
    fn stream_data_round_trip() {
        let bytes = encode_stream_data(7, b"chunk");
        let (stream, data) = decode_stream_data(MsgType::Read, &bytes).unwrap();
        assert_eq!(stream, 7);
        assert_eq!(data, b"chunk");
    }

    #[test]
    fn two_frames_back_to_back() {
        let mut bytes = Frame::new(MsgType::Ready, vec![]).encode();
        bytes.extend(Frame::new(MsgType::Exit, vec![0, 0, 0, 0]).encode());
        let (first, used) = Frame::decode(&bytes).unwrap().unwrap();
        assert_eq!(first.kind, MsgType::Ready);
        let (second, used2) = Frame::decode(&bytes[used..]).unwrap().unwrap();
        assert_eq!(second.kind, MsgType::Exit);
        assert_eq!(used + used2, bytes.len());
    }
}
