//! Message type tags.
//!
//! The numeric values are part of the wire contract and never reordered;
//! gaps between the blocks leave room for additions without renumbering.

/// Wire message types.
///
/// `C→S` identify messages flow once at attach; the command/control block
/// flows for the life of the connection; the read/write block implements
/// server-side access to files on the client's side of the socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum MsgType {
    Version = 12,

    IdentifyFlags = 100,
    IdentifyTerm = 101,
    IdentifyTtyName = 102,
    IdentifyOldCwd = 103,
    IdentifyStdin = 104,
    IdentifyEnviron = 105,
    IdentifyDone = 106,
    IdentifyClientPid = 107,
    IdentifyCwd = 108,
    IdentifyFeatures = 109,
    IdentifyStdout = 110,
    IdentifyLongFlags = 111,
    IdentifyTerminfo = 112,

    Command = 200,
    Detach = 201,
    DetachKill = 202,
    Exit = 203,
    Exited = 204,
    Exiting = 205,
    Lock = 206,
    Ready = 207,
    Resize = 208,
    Shell = 209,
    Shutdown = 210,
    OldStderr = 211,
    OldStdin = 212,
    OldStdout = 213,
    Suspend = 214,
    Unlock = 215,
    Wakeup = 216,
    Exec = 217,
    Flags = 218,

    ReadOpen = 300,
    Read = 301,
    ReadDone = 302,
    WriteOpen = 303,
    Write = 304,
    WriteReady = 305,
    WriteClose = 306,
}

impl MsgType {
    /// Decode a wire tag.
    #[must_use]
    pub fn from_u32(value: u32) -> Option<Self> {
        use MsgType::*;
        Some(match value {
            12 => Version,
            100 => IdentifyFlags,
            101 => IdentifyTerm,
            102 => IdentifyTtyName,
            103 => IdentifyOldCwd,
            104 => IdentifyStdin,
            105 => IdentifyEnviron,
            106 => IdentifyDone,
            107 => IdentifyClientPid,
            108 => IdentifyCwd,
            109 => IdentifyFeatures,
            110 => IdentifyStdout,
            111 => IdentifyLongFlags,
            112 => IdentifyTerminfo,
            200 => Command,
            201 => Detach,
            202 => DetachKill,
            203 => Exit,
            204 => Exited,
            205 => Exiting,
            206 => Lock,
            207 => Ready,
            208 => Resize,
            209 => Shell,
            210 => Shutdown,
            211 => OldStderr,
            212 => OldStdin,
            213 => OldStdout,
            214 => Suspend,
            215 => Unlock,
            216 => Wakeup,
            217 => Exec,
            218 => Flags,
            300 => ReadOpen,
            301 => Read,
            302 => ReadDone,
            303 => WriteOpen,
            304 => Write,
            305 => WriteReady,
            306 => WriteClose,
            _ => return None,
        })
    }

    /// Whether this message may legitimately carry a file descriptor.
    #[must_use]
    pub fn carries_fd(self) -> bool {
        matches!(self, MsgType::IdentifyStdin | MsgType::IdentifyStdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_all_tags() {
        for raw in 0..400u32 {
            if let Some(t) = MsgType::from_u32(raw) {
                assert_eq!(t as u32, raw);
            }
        }
    }

    #[test]
    fn known_values_are_stable() {
        assert_eq!(MsgType::Version as u32, 12);
        assert_eq!(MsgType::IdentifyFlags as u32, 100);
        assert_eq!(MsgType::Command as u32, 200);
        assert_eq!(MsgType::ReadOpen as u32, 300);
    }

    #[test]
    fn unknown_tag_rejected() {
        assert!(MsgType::from_u32(99).is_none());
        assert!(MsgType::from_u32(999).is_none());
    }
}
