//! Non-blocking framed channel over a Unix stream socket.
//!
//! Owns the byte buffers on both sides: incoming bytes accumulate until
//! complete frames pop out, outgoing frames queue until the socket drains
//! them. Descriptors ride SCM_RIGHTS ancillary data and are matched to the
//! fd-carrying message types in arrival order.

use std::collections::VecDeque;
use std::io::{IoSlice, IoSliceMut};
use std::os::fd::{AsFd, AsRawFd, OwnedFd, RawFd};
use std::os::unix::net::UnixStream;

use rustix::net::{
    recvmsg, sendmsg, RecvAncillaryBuffer, RecvAncillaryMessage, RecvFlags,
    SendAncillaryBuffer, SendAncillaryMessage, SendFlags,
};

use crate::frame::Frame;
use crate::ProtocolError;

/// Read block size per readiness notification.
const READ_BLOCK: usize = 8 * 1024;

/// One queued outgoing frame: encoded bytes plus an optional descriptor
/// that goes out with the first byte.
#[derive(Debug)]
struct Outgoing {
    bytes: Vec<u8>,
    fd: Option<OwnedFd>,
}

/// Framed, non-blocking message channel.
#[derive(Debug)]
pub struct Channel {
    stream: UnixStream,
    inbuf: Vec<u8>,
    in_fds: VecDeque<OwnedFd>,
    outq: VecDeque<Outgoing>,
    out_off: usize,
}

impl Channel {
    /// Wrap a connected stream, switching it to non-blocking mode.
    pub fn new(stream: UnixStream) -> std::io::Result<Self> {
        stream.set_nonblocking(true)?;
        Ok(Self {
            stream,
            inbuf: Vec::new(),
            in_fds: VecDeque::new(),
            outq: VecDeque::new(),
            out_off: 0,
        })
    }

    /// The underlying stream (for poll registration).
    #[must_use]
    pub fn stream(&self) -> &UnixStream {
        &self.stream
    }

    /// Raw descriptor, for event-loop registration.
    #[must_use]
    pub fn raw_fd(&self) -> RawFd {
        self.stream.as_raw_fd()
    }

    /// Whether there is buffered output waiting for the socket.
    #[must_use]
    pub fn wants_write(&self) -> bool {
        !self.outq.is_empty()
    }

    /// Queue a frame for sending.
    pub fn send(&mut self, frame: Frame) {
        let bytes = frame.encode();
        self.outq.push_back(Outgoing {
            bytes,
            fd: frame.fd,
        });
    }

    /// Drain as much of the output queue as the socket accepts.
    ///
    /// Returns `true` when the queue is fully flushed.
    pub fn flush(&mut self) -> Result<bool, ProtocolError> {
        loop {
            let Some(head) = self.outq.front_mut() else {
                return Ok(true);
            };
            let first_write = self.out_off == 0;
            let mut space = [0u8; rustix::cmsg_space!(ScmRights(1))];
            let mut control = SendAncillaryBuffer::new(&mut space);
            // The descriptor travels with the first byte of its frame.
            let fd_slot;
            if first_write && let Some(fd) = &head.fd {
                fd_slot = [fd.as_fd()];
                let _ = control.push(SendAncillaryMessage::ScmRights(&fd_slot));
            }
            match sendmsg(
                &self.stream,
                &[IoSlice::new(&head.bytes[self.out_off..])],
                &mut control,
                SendFlags::empty(),
            ) {
                Ok(sent) => {
                    if first_write {
                        head.fd = None;
                    }
                    self.out_off += sent;
                    if self.out_off >= head.bytes.len() {
                        self.outq.pop_front();
                        self.out_off = 0;
                    }
                }
                Err(rustix::io::Errno::WOULDBLOCK) => {
                    return Ok(false);
                }
                Err(rustix::io::Errno::INTR) => continue,
                Err(e) => return Err(ProtocolError::Io(e.into())),
            }
        }
    }

    /// Read whatever the socket has and return the completed frames.
    ///
    /// Returns `ProtocolError::Closed` on orderly shutdown by the peer.
    pub fn poll_recv(&mut self) -> Result<Vec<Frame>, ProtocolError> {
        let mut closed = false;
        loop {
            let mut buf = [0u8; READ_BLOCK];
            let mut space = [0u8; rustix::cmsg_space!(ScmRights(8))];
            let mut control = RecvAncillaryBuffer::new(&mut space);
            match recvmsg(
                &self.stream,
                &mut [IoSliceMut::new(&mut buf)],
                &mut control,
                RecvFlags::empty(),
            ) {
                Ok(ret) => {
                    for message in control.drain() {
                        if let RecvAncillaryMessage::ScmRights(fds) = message {
                            self.in_fds.extend(fds);
                        }
                    }
                    if ret.bytes == 0 {
                        closed = true;
                        break;
                    }
                    self.inbuf.extend_from_slice(&buf[..ret.bytes]);
                }
                Err(rustix::io::Errno::WOULDBLOCK) => break,
                Err(rustix::io::Errno::INTR) => continue,
                Err(e) => return Err(ProtocolError::Io(e.into())),
            }
        }

        let mut frames = Vec::new();
        let mut consumed = 0;
        while let Some((mut frame, used)) = Frame::decode(&self.inbuf[consumed..])? {
            consumed += used;
            if frame.kind.carries_fd() {
                frame.fd = self.in_fds.pop_front();
            }
            frames.push(frame);
        }
        if consumed > 0 {
            self.inbuf.drain(..consumed);
        }

        if closed && frames.is_empty() {
            return Err(ProtocolError::Closed);
        }
        Ok(frames)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{decode_argv, encode_argv};
    use crate::msg::MsgType;

    fn pair() -> (Channel, Channel) {
        let (a, b) = UnixStream::pair().unwrap();
        (Channel::new(a).unwrap(), Channel::new(b).unwrap())
    }

    #[test]
    fn frames_cross_the_socket() {
        let (mut tx, mut rx) = pair();
        tx.send(Frame::new(
            MsgType::Command,
            encode_argv(&["list-sessions".to_string()]),
        ));
        assert!(tx.flush().unwrap());
        let frames = rx.poll_recv().unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].kind, MsgType::Command);
        assert_eq!(
            decode_argv(&frames[0].payload).unwrap(),
            vec!["list-sessions".to_string()]
        );
    }

    #[test]
    fn multiple_frames_in_one_read() {
        let (mut tx, mut rx) = pair();
        tx.send(Frame::empty(MsgType::IdentifyDone));
        tx.send(Frame::empty(MsgType::Ready));
        assert!(tx.flush().unwrap());
        let frames = rx.poll_recv().unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].kind, MsgType::IdentifyDone);
        assert_eq!(frames[1].kind, MsgType::Ready);
    }

    #[test]
    fn descriptor_rides_its_frame() {
        let (mut tx, mut rx) = pair();
        let file = std::fs::File::open("/dev/null").unwrap();
        tx.send(Frame::with_fd(MsgType::IdentifyStdin, file.into()));
        assert!(tx.flush().unwrap());
        let frames = rx.poll_recv().unwrap();
        assert_eq!(frames.len(), 1);
        assert!(frames[0].fd.is_some());
    }

    #[test]
    fn close_is_reported() {
        let (tx, mut rx) = pair();
        drop(tx);
        assert!(matches!(rx.poll_recv(), Err(ProtocolError::Closed)));
    }

    #[test]
    fn peer_close_after_data_delivers_data_first() {
        let (mut tx, mut rx) = pair();
        tx.send(Frame::empty(MsgType::Exiting));
        assert!(tx.flush().unwrap());
        drop(tx);
        let frames = rx.poll_recv().unwrap();
        assert_eq!(frames.len(), 1);
        assert!(matches!(rx.poll_recv(), Err(ProtocolError::Closed)));
    }
}
