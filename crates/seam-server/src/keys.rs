//! Keys and mouse events: decoding from the client terminal, encoding to
//! the pane's PTY.
//!
//! The decoder is a small state machine over raw client tty bytes. The
//! encoder emits terminfo-style key strings for the pane's reported
//! terminal, falling back to xterm's modifier encodings (`CSI 1;M x` and
//! `CSI 27;M;code ~`, with M = {Shift=1, Alt=2, Ctrl=4}+1).

use bitflags::bitflags;
use seam_term::Modes;

bitflags! {
    /// Key modifiers, in xterm bit order.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct KeyMods: u8 {
        const SHIFT = 1;
        const ALT   = 2;
        const CTRL  = 4;
    }
}

impl KeyMods {
    /// The xterm modifier parameter (mods + 1).
    #[must_use]
    pub fn xterm_param(self) -> u8 {
        self.bits() + 1
    }
}

/// A decoded key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Char(char),
    Enter,
    Escape,
    Backspace,
    Tab,
    BackTab,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    Insert,
    Delete,
    F(u8),
}

/// A key with its modifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub mods: KeyMods,
}

impl KeyEvent {
    #[must_use]
    pub fn plain(key: Key) -> Self {
        Self {
            key,
            mods: KeyMods::empty(),
        }
    }

    #[must_use]
    pub fn with(key: Key, mods: KeyMods) -> Self {
        Self { key, mods }
    }
}

/// Mouse buttons, in X10 bit encoding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MouseButton {
    Left,
    Middle,
    Right,
    WheelUp,
    WheelDown,
}

impl MouseButton {
    fn code(self) -> u8 {
        match self {
            MouseButton::Left => 0,
            MouseButton::Middle => 1,
            MouseButton::Right => 2,
            MouseButton::WheelUp => 64,
            MouseButton::WheelDown => 65,
        }
    }

    fn from_code(code: u8) -> Self {
        if code & 64 != 0 {
            if code & 1 == 0 {
                MouseButton::WheelUp
            } else {
                MouseButton::WheelDown
            }
        } else {
            match code & 0b11 {
                0 => MouseButton::Left,
                1 => MouseButton::Middle,
                _ => MouseButton::Right,
            }
        }
    }
}

/// A decoded mouse event in client coordinates (0-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MouseEvent {
    pub button: MouseButton,
    pub x: u16,
    pub y: u16,
    pub press: bool,
    pub motion: bool,
    pub mods: KeyMods,
}

/// Everything the client tty can produce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Key(KeyEvent),
    Mouse(MouseEvent),
    Focus(bool),
    Paste(Vec<u8>),
}

// ── Key-name parsing ────────────────────────────────────────────────

/// Parse a key name as used by `send-keys` (`C-a`, `M-Left`, `F5`,
/// `Enter`, `^X`, or any single character).
#[must_use]
pub fn parse_key_name(name: &str) -> Option<KeyEvent> {
    let mut mods = KeyMods::empty();
    let mut rest = name;
    loop {
        if let Some(stripped) = rest.strip_prefix("C-") {
            mods |= KeyMods::CTRL;
            rest = stripped;
        } else if let Some(stripped) = rest.strip_prefix("M-") {
            mods |= KeyMods::ALT;
            rest = stripped;
        } else if let Some(stripped) = rest.strip_prefix("S-") {
            mods |= KeyMods::SHIFT;
            rest = stripped;
        } else {
            break;
        }
    }
    // ^X is shorthand for C-X.
    if let Some(stripped) = rest.strip_prefix('^')
        && stripped.chars().count() == 1
    {
        mods |= KeyMods::CTRL;
        rest = stripped;
    }

    let key = match rest {
        "Enter" | "enter" => Key::Enter,
        "Escape" | "escape" => Key::Escape,
        "Space" | "space" => Key::Char(' '),
        "Tab" | "tab" => Key::Tab,
        "BTab" | "btab" => Key::BackTab,
        "BSpace" | "bspace" => Key::Backspace,
        "Home" | "home" => Key::Home,
        "End" | "end" => Key::End,
        "NPage" | "npage" | "PageDown" | "PgDn" => Key::PageDown,
        "PPage" | "ppage" | "PageUp" | "PgUp" => Key::PageUp,
        "IC" | "Insert" => Key::Insert,
        "DC" | "Delete" => Key::Delete,
        "Up" | "up" => Key::Up,
        "Down" | "down" => Key::Down,
        "Left" | "left" => Key::Left,
        "Right" | "right" => Key::Right,
        _ => {
            if let Some(n) = rest.strip_prefix('F')
                && let Ok(n) = n.parse::<u8>()
                && (1..=12).contains(&n)
            {
                Key::F(n)
            } else {
                let mut chars = rest.chars();
                let ch = chars.next()?;
                if chars.next().is_some() {
                    return None;
                }
                Key::Char(ch)
            }
        }
    };
    Some(KeyEvent::with(key, mods))
}

// ── Encoding keys to pane bytes ─────────────────────────────────────

/// Encode a key for the pane's PTY given the pane's screen modes.
#[must_use]
pub fn encode_key(event: KeyEvent, modes: Modes) -> Vec<u8> {
    let mods = event.mods;
    let app_cursor = modes.contains(Modes::APP_CURSOR);

    // Unmodified (or alt-only) printable characters: the bytes themselves,
    // ESC-prefixed for alt.
    if let Key::Char(ch) = event.key {
        if mods.contains(KeyMods::CTRL) {
            if let Some(ctrl) = control_byte(ch) {
                let mut out = Vec::new();
                if mods.contains(KeyMods::ALT) {
                    out.push(0x1b);
                }
                out.push(ctrl);
                return out;
            }
            // Unmappable control chords go out as xterm's extended form.
            return format!("\x1b[27;{};{}~", mods.xterm_param(), ch as u32).into_bytes();
        }
        let mut out = Vec::new();
        if mods.contains(KeyMods::ALT) {
            out.push(0x1b);
        }
        let mut buf = [0u8; 4];
        out.extend_from_slice(ch.encode_utf8(&mut buf).as_bytes());
        return out;
    }

    // Simple named keys without modifiers use the pane terminal's key
    // strings (the screen/xterm repertoire).
    if mods.is_empty() {
        return match event.key {
            Key::Enter => b"\r".to_vec(),
            Key::Escape => b"\x1b".to_vec(),
            Key::Backspace => b"\x7f".to_vec(),
            Key::Tab => b"\t".to_vec(),
            Key::BackTab => b"\x1b[Z".to_vec(),
            Key::Up => cursor_key(b'A', app_cursor),
            Key::Down => cursor_key(b'B', app_cursor),
            Key::Right => cursor_key(b'C', app_cursor),
            Key::Left => cursor_key(b'D', app_cursor),
            Key::Home => b"\x1b[1~".to_vec(),
            Key::End => b"\x1b[4~".to_vec(),
            Key::Insert => b"\x1b[2~".to_vec(),
            Key::Delete => b"\x1b[3~".to_vec(),
            Key::PageUp => b"\x1b[5~".to_vec(),
            Key::PageDown => b"\x1b[6~".to_vec(),
            Key::F(n) => function_key(n),
            Key::Char(_) => unreachable!(),
        };
    }

    // Modified named keys: xterm CSI 1;M x or CSI code;M ~.
    let m = mods.xterm_param();
    match event.key {
        Key::Up => format!("\x1b[1;{m}A").into_bytes(),
        Key::Down => format!("\x1b[1;{m}B").into_bytes(),
        Key::Right => format!("\x1b[1;{m}C").into_bytes(),
        Key::Left => format!("\x1b[1;{m}D").into_bytes(),
        Key::Home => format!("\x1b[1;{m}H").into_bytes(),
        Key::End => format!("\x1b[1;{m}F").into_bytes(),
        Key::Insert => format!("\x1b[2;{m}~").into_bytes(),
        Key::Delete => format!("\x1b[3;{m}~").into_bytes(),
        Key::PageUp => format!("\x1b[5;{m}~").into_bytes(),
        Key::PageDown => format!("\x1b[6;{m}~").into_bytes(),
        Key::F(n) if (1..=4).contains(&n) => {
            format!("\x1b[1;{}{}", m, (b'P' + n - 1) as char).into_bytes()
        }
        Key::F(n) => {
            let code = function_key_code(n);
            format!("\x1b[{code};{m}~").into_bytes()
        }
        Key::Enter => format!("\x1b[27;{m};13~").into_bytes(),
        Key::Tab => format!("\x1b[27;{m};9~").into_bytes(),
        Key::BackTab => b"\x1b[Z".to_vec(),
        Key::Escape => b"\x1b".to_vec(),
        Key::Backspace => {
            let mut out = Vec::new();
            if mods.contains(KeyMods::ALT) {
                out.push(0x1b);
            }
            out.push(0x7f);
            out
        }
        Key::Char(_) => unreachable!(),
    }
}

fn cursor_key(letter: u8, app_cursor: bool) -> Vec<u8> {
    if app_cursor {
        vec![0x1b, b'O', letter]
    } else {
        vec![0x1b, b'[', letter]
    }
}

fn function_key_code(n: u8) -> u8 {
    match n {
        5 => 15,
        6 => 17,
        7 => 18,
        8 => 19,
        9 => 20,
        10 => 21,
        11 => 23,
        _ => 24,
    }
}

fn function_key(n: u8) -> Vec<u8> {
    match n {
        1..=4 => vec![0x1b, b'O', b'P' + n - 1],
        _ => format!("\x1b[{}~", function_key_code(n)).into_bytes(),
    }
}

fn control_byte(ch: char) -> Option<u8> {
    match ch {
        'a'..='z' => Some(ch as u8 - b'a' + 1),
        'A'..='Z' => Some(ch as u8 - b'A' + 1),
        ' ' | '@' => Some(0),
        '[' => Some(0x1b),
        '\\' => Some(0x1c),
        ']' => Some(0x1d),
        '^' => Some(0x1e),
        '_' | '/' => Some(0x1f),
        '?' => Some(0x7f),
        _ => None,
    }
}

// ── Encoding mouse events for the pane ──────────────────────────────

/// Encode a mouse event for the pane's PTY per its active reporting
/// encoding, with pane-local coordinates. Returns empty when the pane
/// has no mouse mode that wants this event.
#[must_use]
pub fn encode_mouse(event: MouseEvent, modes: Modes) -> Vec<u8> {
    let wants = if event.motion {
        modes.contains(Modes::MOUSE_ALL)
            || (modes.contains(Modes::MOUSE_BUTTON) && event.press)
    } else {
        modes.intersects(Modes::MOUSE_STANDARD | Modes::MOUSE_BUTTON | Modes::MOUSE_ALL)
    };
    if !wants {
        return Vec::new();
    }

    let mut code = event.button.code();
    code |= event.mods.bits() << 2;
    if event.motion {
        code |= 32;
    }

    if modes.contains(Modes::MOUSE_SGR) {
        let fin = if event.press { 'M' } else { 'm' };
        format!("\x1b[<{};{};{}{}", code, event.x + 1, event.y + 1, fin).into_bytes()
    } else if modes.contains(Modes::MOUSE_URXVT) {
        let code = if event.press { code + 32 } else { 32 + 3 };
        format!("\x1b[{};{};{}M", code, event.x + 1, event.y + 1).into_bytes()
    } else {
        // Classic X10: coordinates clamp at 223 to stay in one byte.
        let code = if event.press { code } else { 3 };
        vec![
            0x1b,
            b'[',
            b'M',
            32 + code,
            33 + event.x.min(222) as u8,
            33 + event.y.min(222) as u8,
        ]
    }
}

// ── Decoding client tty input ───────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum DecodeState {
    #[default]
    Ground,
    Escape,
    Csi,
    Ss3,
}

/// Cap on accumulated paste content.
const MAX_PASTE: usize = 1024 * 1024;

/// Decoder for raw client terminal input.
#[derive(Debug, Default)]
pub struct InputDecoder {
    state: DecodeState,
    csi: Vec<u8>,
    utf8: Vec<u8>,
    in_paste: bool,
    paste: Vec<u8>,
}

impl InputDecoder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of tty bytes, returning completed events.
    ///
    /// A lone ESC at the end of a chunk is reported as the Escape key:
    /// interactive escapes arrive in one read together with their
    /// sequence bytes.
    pub fn feed(&mut self, bytes: &[u8]) -> Vec<InputEvent> {
        let mut out = Vec::new();
        for &b in bytes {
            self.feed_byte(b, &mut out);
        }
        if self.state == DecodeState::Escape {
            out.push(InputEvent::Key(KeyEvent::plain(Key::Escape)));
            self.state = DecodeState::Ground;
        }
        out
    }

    fn feed_byte(&mut self, b: u8, out: &mut Vec<InputEvent>) {
        if self.in_paste {
            self.paste.push(b);
            if self.paste.len() > MAX_PASTE {
                self.paste.clear();
                self.in_paste = false;
                return;
            }
            if self.paste.ends_with(b"\x1b[201~") {
                let len = self.paste.len() - 6;
                self.paste.truncate(len);
                out.push(InputEvent::Paste(std::mem::take(&mut self.paste)));
                self.in_paste = false;
            }
            return;
        }

        match self.state {
            DecodeState::Ground => self.ground(b, out),
            DecodeState::Escape => match b {
                b'[' => {
                    self.state = DecodeState::Csi;
                    self.csi.clear();
                }
                b'O' => self.state = DecodeState::Ss3,
                0x1b => out.push(InputEvent::Key(KeyEvent::plain(Key::Escape))),
                _ => {
                    // ESC-prefixed byte: alt modifier on the ground decode.
                    self.state = DecodeState::Ground;
                    let mut sub = Vec::new();
                    self.ground(b, &mut sub);
                    for event in sub {
                        out.push(match event {
                            InputEvent::Key(mut k) => {
                                k.mods |= KeyMods::ALT;
                                InputEvent::Key(k)
                            }
                            other => other,
                        });
                    }
                }
            },
            DecodeState::Csi => {
                if (0x40..=0x7e).contains(&b) {
                    self.csi.push(b);
                    let seq = std::mem::take(&mut self.csi);
                    self.state = DecodeState::Ground;
                    self.dispatch_csi(&seq, out);
                } else {
                    self.csi.push(b);
                    if self.csi.len() > 64 {
                        self.csi.clear();
                        self.state = DecodeState::Ground;
                    }
                }
            }
            DecodeState::Ss3 => {
                self.state = DecodeState::Ground;
                let key = match b {
                    b'A' => Some(Key::Up),
                    b'B' => Some(Key::Down),
                    b'C' => Some(Key::Right),
                    b'D' => Some(Key::Left),
                    b'H' => Some(Key::Home),
                    b'F' => Some(Key::End),
                    b'P'..=b'S' => Some(Key::F(b - b'P' + 1)),
                    _ => None,
                };
                if let Some(key) = key {
                    out.push(InputEvent::Key(KeyEvent::plain(key)));
                }
            }
        }
    }

    fn ground(&mut self, b: u8, out: &mut Vec<InputEvent>) {
        // UTF-8 accumulation.
        if !self.utf8.is_empty() {
            if (0x80..=0xBF).contains(&b) {
                self.utf8.push(b);
                if let Ok(s) = std::str::from_utf8(&self.utf8)
                    && let Some(ch) = s.chars().next()
                {
                    out.push(InputEvent::Key(KeyEvent::plain(Key::Char(ch))));
                    self.utf8.clear();
                }
                if self.utf8.len() >= 4 {
                    self.utf8.clear();
                }
                return;
            }
            self.utf8.clear();
        }

        match b {
            0x1b => self.state = DecodeState::Escape,
            0x0d => out.push(InputEvent::Key(KeyEvent::plain(Key::Enter))),
            0x09 => out.push(InputEvent::Key(KeyEvent::plain(Key::Tab))),
            0x7f | 0x08 => out.push(InputEvent::Key(KeyEvent::plain(Key::Backspace))),
            0x00 => out.push(InputEvent::Key(KeyEvent::with(
                Key::Char(' '),
                KeyMods::CTRL,
            ))),
            0x01..=0x1a => out.push(InputEvent::Key(KeyEvent::with(
                Key::Char((b - 1 + b'a') as char),
                KeyMods::CTRL,
            ))),
            0x1c..=0x1f => out.push(InputEvent::Key(KeyEvent::with(
                Key::Char((b - 0x1c + b'\\') as char),
                KeyMods::CTRL,
            ))),
            0x20..=0x7e => out.push(InputEvent::Key(KeyEvent::plain(Key::Char(b as char)))),
            0x80..=0xff => self.utf8.push(b),
        }
    }

    fn dispatch_csi(&mut self, seq: &[u8], out: &mut Vec<InputEvent>) {
        let (body, fin) = match seq.split_last() {
            Some((f, b)) => (b, *f),
            None => return,
        };
        let text = std::str::from_utf8(body).unwrap_or("");

        // SGR mouse: CSI < code ; x ; y M/m
        if let Some(rest) = text.strip_prefix('<') {
            let mut parts = rest.split(';').filter_map(|p| p.parse::<u16>().ok());
            if let (Some(code), Some(x), Some(y)) = (parts.next(), parts.next(), parts.next())
            {
                let code = code as u8;
                out.push(InputEvent::Mouse(MouseEvent {
                    button: MouseButton::from_code(code & 0b11 | (code & 64)),
                    x: x.saturating_sub(1),
                    y: y.saturating_sub(1),
                    press: fin == b'M',
                    motion: code & 32 != 0,
                    mods: KeyMods::from_bits_truncate((code >> 2) & 0b111),
                }));
            }
            return;
        }

        // Focus reporting.
        if body.is_empty() && fin == b'I' {
            out.push(InputEvent::Focus(true));
            return;
        }
        if body.is_empty() && fin == b'O' {
            out.push(InputEvent::Focus(false));
            return;
        }

        let mut params = text.split(';').filter_map(|p| p.parse::<u16>().ok());
        let p0 = params.next();
        let p1 = params.next();
        let mods = p1
            .map(|m| KeyMods::from_bits_truncate((m.saturating_sub(1)) as u8))
            .unwrap_or_default();

        let key = match fin {
            b'A' => Some(Key::Up),
            b'B' => Some(Key::Down),
            b'C' => Some(Key::Right),
            b'D' => Some(Key::Left),
            b'H' => Some(Key::Home),
            b'F' => Some(Key::End),
            b'Z' => Some(Key::BackTab),
            b'P'..=b'S' => Some(Key::F(fin - b'P' + 1)),
            b'~' => match p0 {
                Some(1) | Some(7) => Some(Key::Home),
                Some(2) => Some(Key::Insert),
                Some(3) => Some(Key::Delete),
                Some(4) | Some(8) => Some(Key::End),
                Some(5) => Some(Key::PageUp),
                Some(6) => Some(Key::PageDown),
                Some(15) => Some(Key::F(5)),
                Some(17) => Some(Key::F(6)),
                Some(18) => Some(Key::F(7)),
                Some(19) => Some(Key::F(8)),
                Some(20) => Some(Key::F(9)),
                Some(21) => Some(Key::F(10)),
                Some(23) => Some(Key::F(11)),
                Some(24) => Some(Key::F(12)),
                Some(200) => {
                    self.in_paste = true;
                    self.paste.clear();
                    None
                }
                _ => None,
            },
            _ => None,
        };
        if let Some(key) = key {
            out.push(InputEvent::Key(KeyEvent::with(key, mods)));
        }
    }
}

/// Wrap paste content in bracketed-paste markers when the pane wants it.
#[must_use]
pub fn encode_paste(data: &[u8], modes: Modes) -> Vec<u8> {
    if modes.contains(Modes::BRACKETED_PASTE) {
        let mut out = Vec::with_capacity(data.len() + 12);
        out.extend_from_slice(b"\x1b[200~");
        out.extend_from_slice(data);
        out.extend_from_slice(b"\x1b[201~");
        out
    } else {
        data.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode(bytes: &[u8]) -> Vec<InputEvent> {
        InputDecoder::new().feed(bytes)
    }

    fn key(k: Key) -> InputEvent {
        InputEvent::Key(KeyEvent::plain(k))
    }

    #[test]
    fn plain_chars_decode() {
        assert_eq!(
            decode(b"ab"),
            vec![key(Key::Char('a')), key(Key::Char('b'))]
        );
    }

    #[test]
    fn ctrl_chars_decode() {
        assert_eq!(
            decode(&[0x03]),
            vec![InputEvent::Key(KeyEvent::with(Key::Char('c'), KeyMods::CTRL))]
        );
    }

    #[test]
    fn utf8_char_decodes() {
        assert_eq!(decode("é".as_bytes()), vec![key(Key::Char('é'))]);
    }

    #[test]
    fn arrows_decode() {
        assert_eq!(decode(b"\x1b[A"), vec![key(Key::Up)]);
        assert_eq!(decode(b"\x1bOD"), vec![key(Key::Left)]);
    }

    #[test]
    fn modified_arrow_decodes() {
        assert_eq!(
            decode(b"\x1b[1;5C"),
            vec![InputEvent::Key(KeyEvent::with(Key::Right, KeyMods::CTRL))]
        );
    }

    #[test]
    fn tilde_keys_decode() {
        assert_eq!(decode(b"\x1b[5~"), vec![key(Key::PageUp)]);
        assert_eq!(decode(b"\x1b[24~"), vec![key(Key::F(12))]);
    }

    #[test]
    fn alt_char_decodes() {
        assert_eq!(
            decode(b"\x1bx"),
            vec![InputEvent::Key(KeyEvent::with(Key::Char('x'), KeyMods::ALT))]
        );
    }

    #[test]
    fn lone_escape_decodes_at_chunk_end() {
        assert_eq!(decode(b"\x1b"), vec![key(Key::Escape)]);
    }

    #[test]
    fn bracketed_paste_collects() {
        let events = decode(b"\x1b[200~hello\x1b[201~");
        assert_eq!(events, vec![InputEvent::Paste(b"hello".to_vec())]);
    }

    #[test]
    fn sgr_mouse_decodes() {
        let events = decode(b"\x1b[<0;10;5M");
        assert_eq!(
            events,
            vec![InputEvent::Mouse(MouseEvent {
                button: MouseButton::Left,
                x: 9,
                y: 4,
                press: true,
                motion: false,
                mods: KeyMods::empty(),
            })]
        );
    }

    #[test]
    fn focus_events_decode() {
        assert_eq!(decode(b"\x1b[I"), vec![InputEvent::Focus(true)]);
        assert_eq!(decode(b"\x1b[O"), vec![InputEvent::Focus(false)]);
    }

    #[test]
    fn key_names_parse() {
        assert_eq!(
            parse_key_name("C-a"),
            Some(KeyEvent::with(Key::Char('a'), KeyMods::CTRL))
        );
        assert_eq!(
            parse_key_name("M-Left"),
            Some(KeyEvent::with(Key::Left, KeyMods::ALT))
        );
        assert_eq!(parse_key_name("F5"), Some(KeyEvent::plain(Key::F(5))));
        assert_eq!(parse_key_name("Enter"), Some(KeyEvent::plain(Key::Enter)));
        assert_eq!(
            parse_key_name("^X"),
            Some(KeyEvent::with(Key::Char('X'), KeyMods::CTRL))
        );
        assert_eq!(parse_key_name("x"), Some(KeyEvent::plain(Key::Char('x'))));
        assert_eq!(parse_key_name("NoSuchKey"), None);
    }

    #[test]
    fn encode_plain_char() {
        assert_eq!(
            encode_key(KeyEvent::plain(Key::Char('a')), Modes::default()),
            b"a"
        );
    }

    #[test]
    fn encode_ctrl_char() {
        assert_eq!(
            encode_key(
                KeyEvent::with(Key::Char('c'), KeyMods::CTRL),
                Modes::default()
            ),
            vec![0x03]
        );
    }

    #[test]
    fn encode_alt_char_prefixes_escape() {
        assert_eq!(
            encode_key(
                KeyEvent::with(Key::Char('x'), KeyMods::ALT),
                Modes::default()
            ),
            b"\x1bx"
        );
    }

    #[test]
    fn encode_arrow_respects_app_cursor() {
        assert_eq!(
            encode_key(KeyEvent::plain(Key::Up), Modes::default()),
            b"\x1b[A"
        );
        assert_eq!(
            encode_key(KeyEvent::plain(Key::Up), Modes::APP_CURSOR),
            b"\x1bOA"
        );
    }

    #[test]
    fn encode_modified_arrow_uses_xterm_form() {
        let bytes = encode_key(
            KeyEvent::with(Key::Right, KeyMods::CTRL),
            Modes::default(),
        );
        assert_eq!(bytes, b"\x1b[1;5C");
    }

    #[test]
    fn encode_modified_enter_uses_code_form() {
        let bytes = encode_key(
            KeyEvent::with(Key::Enter, KeyMods::CTRL),
            Modes::default(),
        );
        assert_eq!(bytes, b"\x1b[27;5;13~");
    }

    #[test]
    fn encode_mouse_sgr() {
        let event = MouseEvent {
            button: MouseButton::Left,
            x: 4,
            y: 2,
            press: true,
            motion: false,
            mods: KeyMods::empty(),
        };
        let modes = Modes::MOUSE_STANDARD | Modes::MOUSE_SGR;
        assert_eq!(encode_mouse(event, modes), b"\x1b[<0;5;3M");
    }

    #[test]
    fn encode_mouse_classic() {
        let event = MouseEvent {
            button: MouseButton::Left,
            x: 0,
            y: 0,
            press: true,
            motion: false,
            mods: KeyMods::empty(),
        };
        assert_eq!(
            encode_mouse(event, Modes::MOUSE_STANDARD),
            vec![0x1b, b'[', b'M', 32, 33, 33]
        );
    }

    #[test]
    fn mouse_without_mode_encodes_nothing() {
        let event = MouseEvent {
            button: MouseButton::Left,
            x: 0,
            y: 0,
            press: true,
            motion: false,
            mods: KeyMods::empty(),
        };
        assert!(encode_mouse(event, Modes::default()).is_empty());
    }

    #[test]
    fn paste_wrapping_follows_mode() {
        assert_eq!(
            encode_paste(b"hi", Modes::BRACKETED_PASTE),
            b"\x1b[200~hi\x1b[201~"
        );
        assert_eq!(encode_paste(b"hi", Modes::default()), b"hi");
    }

    #[test]
    fn wheel_buttons_round_trip() {
        for (btn, code) in [(MouseButton::WheelUp, 64u8), (MouseButton::WheelDown, 65)] {
            assert_eq!(btn.code(), code);
            assert_eq!(MouseButton::from_code(code), btn);
        }
    }
}
