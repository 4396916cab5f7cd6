//! VT/ANSI parser: a table-driven state machine over the output byte stream.
//!
//! The machine follows the canonical DEC ANSI parser state diagram. Each
//! state has a transition table expressed as an array of typed records
//! (byte range → action + next state); the tables are data, the stepper is
//! a single lookup loop. One byte in, at most one event out, delivered to a
//! [`Perform`] implementation.
//!
//! Error policy: unknown sequences drain in `CsiIgnore`; CAN/SUB abort the
//! current sequence and return to ground without emitting; the parser never
//! fails.
//!
//! UTF-8 is handled above the tables: multi-byte sequences are accumulated
//! in ground state and delivered as a single `print`, while inside an OSC
//! string high bytes pass through as raw payload.

use smallvec::SmallVec;

/// Maximum number of CSI parameters; further parameters are dropped.
pub const MAX_PARAMS: usize = 16;

/// Maximum accumulated OSC payload before the rest is discarded.
const MAX_OSC_LEN: usize = 4096;

/// Maximum collected intermediate bytes; more puts the sequence in ignore.
const MAX_INTERMEDIATES: usize = 2;

/// Parameter digits clamp here (four digits per the wire contract).
const PARAM_CLAMP: u16 = 9999;

/// Receiver for parser events.
///
/// The screen writer implements this; tests implement it with a recording
/// stub. Default methods ignore the event so partial consumers stay small.
pub trait Perform {
    /// A printable character (possibly multi-byte, already decoded).
    fn print(&mut self, _ch: char) {}
    /// A C0 control byte (BEL, BS, HT, LF, CR, SO, SI, ...).
    fn execute(&mut self, _byte: u8) {}
    /// A complete CSI sequence.
    fn csi_dispatch(
        &mut self,
        _params: &Params,
        _intermediates: &[u8],
        _private: Option<u8>,
        _final_byte: u8,
    ) {
    }
    /// A complete two-or-three byte escape sequence.
    fn esc_dispatch(&mut self, _intermediates: &[u8], _final_byte: u8) {}
    /// A complete OSC string (payload without terminator).
    fn osc_dispatch(&mut self, _payload: &[u8]) {}
    /// Start of a DCS passthrough sequence.
    fn dcs_hook(&mut self, _params: &Params, _intermediates: &[u8], _final_byte: u8) {}
    /// One byte of DCS passthrough payload.
    fn dcs_put(&mut self, _byte: u8) {}
    /// End of a DCS passthrough sequence.
    fn dcs_unhook(&mut self) {}
}

/// CSI parameter list with `:`-separated subparameters.
///
/// Values are stored flat; `parts` records the (offset, len) span of each
/// semicolon-separated parameter within the flat list.
#[derive(Debug, Clone, Default)]
pub struct Params {
    values: SmallVec<[u16; 32]>,
    parts: SmallVec<[(u8, u8); MAX_PARAMS]>,
}

impl Params {
    /// Number of semicolon-separated parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.parts.len()
    }

    /// Whether no parameters were given.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }

    /// The primary value of parameter `i` (first subparameter).
    #[must_use]
    pub fn get(&self, i: usize) -> Option<u16> {
        let (off, len) = *self.parts.get(i)?;
        if len == 0 {
            return None;
        }
        self.values.get(off as usize).copied()
    }

    /// The primary value of parameter `i`, or `default` if absent.
    ///
    /// Callers wanting the VT default-argument rule (0 means default too)
    /// combine this with `max(1)`.
    #[must_use]
    pub fn get_or(&self, i: usize, default: u16) -> u16 {
        match self.get(i) {
            Some(v) => v,
            None => default,
        }
    }

    /// All subparameters of parameter `i`.
    #[must_use]
    pub fn subparams(&self, i: usize) -> &[u16] {
        match self.parts.get(i) {
            Some(&(off, len)) => &self.values[off as usize..(off + len) as usize],
            None => &[],
        }
    }

    /// Iterate over parameters as subparameter slices.
    pub fn iter(&self) -> impl Iterator<Item = &[u16]> {
        self.parts
            .iter()
            .map(|&(off, len)| &self.values[off as usize..(off + len) as usize])
    }

    fn clear(&mut self) {
        self.values.clear();
        self.parts.clear();
    }

    fn push_part(&mut self, subvalues: &[u16]) {
        if self.parts.len() >= MAX_PARAMS {
            return;
        }
        let off = self.values.len() as u8;
        self.values.extend_from_slice(subvalues);
        self.parts.push((off, subvalues.len() as u8));
    }
}

/// Parser states, one transition table each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Ground,
    Escape,
    EscapeIntermediate,
    CsiEntry,
    CsiParam,
    CsiIntermediate,
    CsiIgnore,
    DcsEntry,
    DcsParam,
    DcsIntermediate,
    DcsPassthrough,
    DcsIgnore,
    OscString,
    SosPmApcString,
}

/// Table actions. `Dispatch`-family actions emit an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Ignore,
    Print,
    Execute,
    Collect,
    Param,
    EscDispatch,
    CsiDispatch,
    Hook,
    Put,
    OscPut,
    OscEnd,
}

/// One transition record: bytes in `[lo, hi]` run `action`, then move to
/// `next` (or stay when `None`).
#[derive(Clone, Copy)]
struct Transition {
    lo: u8,
    hi: u8,
    action: Action,
    next: Option<State>,
}

const fn t(lo: u8, hi: u8, action: Action, next: Option<State>) -> Transition {
    Transition {
        lo,
        hi,
        action,
        next,
    }
}

use Action as A;
use State as S;

/// C0 controls executed immediately inside most states (all except the
/// string-consuming ones): everything below 0x20 minus CAN/SUB/ESC.
const EXECUTE_LO: [Transition; 3] = [
    t(0x00, 0x17, A::Execute, None),
    t(0x19, 0x19, A::Execute, None),
    t(0x1C, 0x1F, A::Execute, None),
];

static GROUND_TABLE: &[Transition] = &[
    t(0x00, 0x17, A::Execute, None),
    t(0x19, 0x19, A::Execute, None),
    t(0x1C, 0x1F, A::Execute, None),
    t(0x20, 0x7F, A::Print, None),
];

static ESCAPE_TABLE: &[Transition] = &[
    EXECUTE_LO[0],
    EXECUTE_LO[1],
    EXECUTE_LO[2],
    t(0x20, 0x2F, A::Collect, Some(S::EscapeIntermediate)),
    t(0x30, 0x4F, A::EscDispatch, Some(S::Ground)),
    t(0x50, 0x50, A::Ignore, Some(S::DcsEntry)),
    t(0x51, 0x57, A::EscDispatch, Some(S::Ground)),
    t(0x58, 0x58, A::Ignore, Some(S::SosPmApcString)),
    t(0x59, 0x5A, A::EscDispatch, Some(S::Ground)),
    t(0x5B, 0x5B, A::Ignore, Some(S::CsiEntry)),
    t(0x5C, 0x5C, A::EscDispatch, Some(S::Ground)),
    t(0x5D, 0x5D, A::Ignore, Some(S::OscString)),
    t(0x5E, 0x5F, A::Ignore, Some(S::SosPmApcString)),
    t(0x60, 0x7E, A::EscDispatch, Some(S::Ground)),
    t(0x7F, 0x7F, A::Ignore, None),
];

static ESCAPE_INTERMEDIATE_TABLE: &[Transition] = &[
    EXECUTE_LO[0],
    EXECUTE_LO[1],
    EXECUTE_LO[2],
    t(0x20, 0x2F, A::Collect, None),
    t(0x30, 0x7E, A::EscDispatch, Some(S::Ground)),
    t(0x7F, 0x7F, A::Ignore, None),
];

static CSI_ENTRY_TABLE: &[Transition] = &[
    EXECUTE_LO[0],
    EXECUTE_LO[1],
    EXECUTE_LO[2],
    t(0x20, 0x2F, A::Collect, Some(S::CsiIntermediate)),
    t(0x30, 0x3B, A::Param, Some(S::CsiParam)),
    t(0x3C, 0x3F, A::Collect, Some(S::CsiParam)),
    t(0x40, 0x7E, A::CsiDispatch, Some(S::Ground)),
    t(0x7F, 0x7F, A::Ignore, None),
];

static CSI_PARAM_TABLE: &[Transition] = &[
    EXECUTE_LO[0],
    EXECUTE_LO[1],
    EXECUTE_LO[2],
    t(0x20, 0x2F, A::Collect, Some(S::CsiIntermediate)),
    t(0x30, 0x3B, A::Param, None),
    t(0x3C, 0x3F, A::Ignore, Some(S::CsiIgnore)),
    t(0x40, 0x7E, A::CsiDispatch, Some(S::Ground)),
    t(0x7F, 0x7F, A::Ignore, None),
];

static CSI_INTERMEDIATE_TABLE: &[Transition] = &[
    EXECUTE_LO[0],
    EXECUTE_LO[1],
    EXECUTE_LO[2],
    t(0x20, 0x2F, A::Collect, None),
    t(0x30, 0x3F, A::Ignore, Some(S::CsiIgnore)),
    t(0x40, 0x7E, A::CsiDispatch, Some(S::Ground)),
    t(0x7F, 0x7F, A::Ignore, None),
];

static CSI_IGNORE_TABLE: &[Transition] = &[
    EXECUTE_LO[0],
    EXECUTE_LO[1],
    EXECUTE_LO[2],
    t(0x20, 0x3F, A::Ignore, None),
    t(0x40, 0x7E, A::Ignore, Some(S::Ground)),
    t(0x7F, 0x7F, A::Ignore, None),
];

static DCS_ENTRY_TABLE: &[Transition] = &[
    t(0x00, 0x1F, A::Ignore, None),
    t(0x20, 0x2F, A::Collect, Some(S::DcsIntermediate)),
    t(0x30, 0x3B, A::Param, Some(S::DcsParam)),
    t(0x3C, 0x3F, A::Collect, Some(S::DcsParam)),
    t(0x40, 0x7E, A::Hook, Some(S::DcsPassthrough)),
    t(0x7F, 0x7F, A::Ignore, None),
];

static DCS_PARAM_TABLE: &[Transition] = &[
    t(0x00, 0x1F, A::Ignore, None),
    t(0x20, 0x2F, A::Collect, Some(S::DcsIntermediate)),
    t(0x30, 0x3B, A::Param, None),
    t(0x3C, 0x3F, A::Ignore, Some(S::DcsIgnore)),
    t(0x40, 0x7E, A::Hook, Some(S::DcsPassthrough)),
    t(0x7F, 0x7F, A::Ignore, None),
];

static DCS_INTERMEDIATE_TABLE: &[Transition] = &[
    t(0x00, 0x1F, A::Ignore, None),
    t(0x20, 0x2F, A::Collect, None),
    t(0x30, 0x3F, A::Ignore, Some(S::DcsIgnore)),
    t(0x40, 0x7E, A::Hook, Some(S::DcsPassthrough)),
    t(0x7F, 0x7F, A::Ignore, None),
];

static DCS_PASSTHROUGH_TABLE: &[Transition] = &[
    t(0x00, 0x17, A::Put, None),
    t(0x19, 0x19, A::Put, None),
    t(0x1C, 0x1F, A::Put, None),
    t(0x20, 0x7E, A::Put, None),
    t(0x7F, 0x7F, A::Ignore, None),
];

static DCS_IGNORE_TABLE: &[Transition] = &[t(0x00, 0x7F, A::Ignore, None)];

static OSC_STRING_TABLE: &[Transition] = &[
    t(0x00, 0x06, A::Ignore, None),
    t(0x07, 0x07, A::OscEnd, Some(S::Ground)),
    t(0x08, 0x17, A::Ignore, None),
    t(0x19, 0x19, A::Ignore, None),
    t(0x1C, 0x1F, A::Ignore, None),
    t(0x20, 0x7E, A::OscPut, None),
    t(0x7F, 0x7F, A::Ignore, None),
];

static SOS_PM_APC_TABLE: &[Transition] = &[t(0x00, 0x7F, A::Ignore, None)];

fn table_for(state: State) -> &'static [Transition] {
    match state {
        S::Ground => GROUND_TABLE,
        S::Escape => ESCAPE_TABLE,
        S::EscapeIntermediate => ESCAPE_INTERMEDIATE_TABLE,
        S::CsiEntry => CSI_ENTRY_TABLE,
        S::CsiParam => CSI_PARAM_TABLE,
        S::CsiIntermediate => CSI_INTERMEDIATE_TABLE,
        S::CsiIgnore => CSI_IGNORE_TABLE,
        S::DcsEntry => DCS_ENTRY_TABLE,
        S::DcsParam => DCS_PARAM_TABLE,
        S::DcsIntermediate => DCS_INTERMEDIATE_TABLE,
        S::DcsPassthrough => DCS_PASSTHROUGH_TABLE,
        S::DcsIgnore => DCS_IGNORE_TABLE,
        S::OscString => OSC_STRING_TABLE,
        S::SosPmApcString => SOS_PM_APC_TABLE,
    }
}

/// VT parser state.
#[derive(Debug, Clone)]
pub struct Parser {
    state: State,
    intermediates: [u8; MAX_INTERMEDIATES],
    n_intermediates: usize,
    intermediates_overflow: bool,
    private: Option<u8>,
    params: Params,
    current_subparams: SmallVec<[u16; 6]>,
    current_value: u16,
    current_has_value: bool,
    osc: Vec<u8>,
    osc_overflow: bool,
    utf8: [u8; 4],
    utf8_len: usize,
    utf8_need: usize,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    /// Create a new parser in ground state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: S::Ground,
            intermediates: [0; MAX_INTERMEDIATES],
            n_intermediates: 0,
            intermediates_overflow: false,
            private: None,
            params: Params::default(),
            current_subparams: SmallVec::new(),
            current_value: 0,
            current_has_value: false,
            osc: Vec::new(),
            osc_overflow: false,
            utf8: [0; 4],
            utf8_len: 0,
            utf8_need: 0,
        }
    }

    /// Feed a chunk of bytes through the machine.
    pub fn feed(&mut self, bytes: &[u8], perform: &mut impl Perform) {
        for &b in bytes {
            self.advance(b, perform);
        }
    }

    /// Advance the parser by exactly one byte.
    pub fn advance(&mut self, byte: u8, perform: &mut impl Perform) {
        // UTF-8 accumulation takes precedence while a sequence is open.
        if self.utf8_need > 0 {
            self.advance_utf8(byte, perform);
            return;
        }

        // Bytes above ASCII: either UTF-8 text (ground) or raw string
        // payload (OSC / DCS passthrough); anywhere else they abort.
        if byte >= 0x80 {
            match self.state {
                S::Ground => self.start_utf8(byte),
                S::OscString => self.osc_put(byte),
                S::DcsPassthrough => perform.dcs_put(byte),
                S::DcsIgnore | S::SosPmApcString => {}
                _ => self.state = S::Ground,
            }
            return;
        }

        // "Anywhere" rules: CAN/SUB abort, ESC restarts.
        match byte {
            0x18 | 0x1A => {
                self.leave_string_state(perform, false);
                self.state = S::Ground;
                perform.execute(byte);
                return;
            }
            0x1B => {
                self.leave_string_state(perform, true);
                self.clear_sequence();
                self.state = S::Escape;
                return;
            }
            _ => {}
        }

        let table = table_for(self.state);
        for tr in table {
            if byte >= tr.lo && byte <= tr.hi {
                self.run_action(tr.action, byte, perform);
                if let Some(next) = tr.next {
                    if next == S::CsiEntry || next == S::DcsEntry {
                        self.clear_sequence();
                    }
                    if next == S::OscString {
                        self.osc.clear();
                        self.osc_overflow = false;
                    }
                    self.state = next;
                }
                return;
            }
        }
        // No entry: the byte is outside every acceptable range; abort.
        self.state = S::Ground;
    }

    fn run_action(&mut self, action: Action, byte: u8, perform: &mut impl Perform) {
        match action {
            A::Ignore => {}
            A::Print => perform.print(byte as char),
            A::Execute => perform.execute(byte),
            A::Collect => self.collect(byte),
            A::Param => self.param(byte),
            A::EscDispatch => {
                perform.esc_dispatch(&self.intermediates[..self.n_intermediates], byte);
            }
            A::CsiDispatch => {
                self.finish_params();
                if !self.intermediates_overflow {
                    perform.csi_dispatch(
                        &self.params,
                        &self.intermediates[..self.n_intermediates],
                        self.private,
                        byte,
                    );
                }
            }
            A::Hook => {
                self.finish_params();
                perform.dcs_hook(
                    &self.params,
                    &self.intermediates[..self.n_intermediates],
                    byte,
                );
            }
            A::Put => perform.dcs_put(byte),
            A::OscPut => self.osc_put(byte),
            A::OscEnd => perform.osc_dispatch(&self.osc),
        }
    }

    fn collect(&mut self, byte: u8) {
        // Private markers arriving before any parameter are recorded apart
        // from the intermediates so CSI consumers can match on `?`.
        if (0x3C..=0x3F).contains(&byte) {
            if self.private.is_none() {
                self.private = Some(byte);
            }
            return;
        }
        if self.n_intermediates == MAX_INTERMEDIATES {
            self.intermediates_overflow = true;
            return;
        }
        self.intermediates[self.n_intermediates] = byte;
        self.n_intermediates += 1;
    }

    fn param(&mut self, byte: u8) {
        match byte {
            b'0'..=b'9' => {
                let digit = u16::from(byte - b'0');
                self.current_value = if self.current_value > PARAM_CLAMP {
                    u16::MAX
                } else {
                    self.current_value.saturating_mul(10).saturating_add(digit)
                };
                self.current_has_value = true;
            }
            b';' => {
                self.end_subparam();
                self.params.push_part(&self.current_subparams);
                self.current_subparams.clear();
            }
            b':' => self.end_subparam(),
            _ => {}
        }
    }

    fn end_subparam(&mut self) {
        let value = if self.current_has_value {
            self.current_value.min(u16::MAX)
        } else {
            0
        };
        if self.current_subparams.len() < self.current_subparams.inline_size() {
            self.current_subparams.push(value);
        }
        self.current_value = 0;
        self.current_has_value = false;
    }

    fn finish_params(&mut self) {
        if self.current_has_value || !self.current_subparams.is_empty() || !self.params.is_empty()
        {
            self.end_subparam();
            self.params.push_part(&self.current_subparams);
            self.current_subparams.clear();
        }
    }

    fn osc_put(&mut self, byte: u8) {
        if self.osc.len() >= MAX_OSC_LEN {
            self.osc_overflow = true;
            return;
        }
        self.osc.push(byte);
    }

    /// Close out a string-consuming state on ESC/CAN/SUB.
    ///
    /// An ESC terminator dispatches the OSC (the ESC is the first half of
    /// ST); CAN/SUB abort without dispatching. DCS always unhooks so the
    /// consumer sees the stream closed.
    fn leave_string_state(&mut self, perform: &mut impl Perform, dispatch: bool) {
        match self.state {
            S::OscString => {
                if dispatch && !self.osc_overflow {
                    perform.osc_dispatch(&self.osc);
                }
                self.osc.clear();
            }
            S::DcsPassthrough => perform.dcs_unhook(),
            _ => {}
        }
    }

    fn clear_sequence(&mut self) {
        self.n_intermediates = 0;
        self.intermediates_overflow = false;
        self.private = None;
        self.params.clear();
        self.current_subparams.clear();
        self.current_value = 0;
        self.current_has_value = false;
    }

    fn start_utf8(&mut self, byte: u8) {
        let need = match byte {
            0xC2..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF4 => 4,
            // Stray continuation or invalid lead byte: drop it.
            _ => return,
        };
        self.utf8[0] = byte;
        self.utf8_len = 1;
        self.utf8_need = need;
    }

    fn advance_utf8(&mut self, byte: u8, perform: &mut impl Perform) {
        if (0x80..=0xBF).contains(&byte) {
            self.utf8[self.utf8_len] = byte;
            self.utf8_len += 1;
            if self.utf8_len == self.utf8_need {
                if let Ok(s) = std::str::from_utf8(&self.utf8[..self.utf8_len]) {
                    if let Some(ch) = s.chars().next() {
                        perform.print(ch);
                    }
                }
                self.utf8_len = 0;
                self.utf8_need = 0;
            }
        } else {
            // Truncated sequence: drop it and reprocess this byte normally.
            self.utf8_len = 0;
            self.utf8_need = 0;
            self.advance(byte, perform);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        prints: String,
        executes: Vec<u8>,
        csi: Vec<(Vec<Vec<u16>>, Vec<u8>, Option<u8>, u8)>,
        esc: Vec<(Vec<u8>, u8)>,
        osc: Vec<Vec<u8>>,
        hooks: usize,
        puts: Vec<u8>,
        unhooks: usize,
    }

    impl Perform for Recorder {
        fn print(&mut self, ch: char) {
            self.prints.push(ch);
        }
        fn execute(&mut self, byte: u8) {
            self.executes.push(byte);
        }
        fn csi_dispatch(
            &mut self,
            params: &Params,
            intermediates: &[u8],
            private: Option<u8>,
            final_byte: u8,
        ) {
            self.csi.push((
                params.iter().map(<[u16]>::to_vec).collect(),
                intermediates.to_vec(),
                private,
                final_byte,
            ));
        }
        fn esc_dispatch(&mut self, intermediates: &[u8], final_byte: u8) {
            self.esc.push((intermediates.to_vec(), final_byte));
        }
        fn osc_dispatch(&mut self, payload: &[u8]) {
            self.osc.push(payload.to_vec());
        }
        fn dcs_hook(&mut self, _params: &Params, _intermediates: &[u8], _final_byte: u8) {
            self.hooks += 1;
        }
        fn dcs_put(&mut self, byte: u8) {
            self.puts.push(byte);
        }
        fn dcs_unhook(&mut self) {
            self.unhooks += 1;
        }
    }

    fn run(input: &[u8]) -> Recorder {
        let mut parser = Parser::new();
        let mut rec = Recorder::default();
        parser.feed(input, &mut rec);
        rec
    }

    #[test]
    fn plain_text_prints() {
        let rec = run(b"hello");
        assert_eq!(rec.prints, "hello");
    }

    #[test]
    fn c0_controls_execute() {
        let rec = run(b"a\rb\nc");
        assert_eq!(rec.prints, "abc");
        assert_eq!(rec.executes, vec![b'\r', b'\n']);
    }

    #[test]
    fn csi_with_params() {
        let rec = run(b"\x1b[1;24r");
        assert_eq!(rec.csi.len(), 1);
        let (params, inter, private, fin) = &rec.csi[0];
        assert_eq!(params, &vec![vec![1], vec![24]]);
        assert!(inter.is_empty());
        assert_eq!(*private, None);
        assert_eq!(*fin, b'r');
    }

    #[test]
    fn csi_no_params() {
        let rec = run(b"\x1b[H");
        let (params, _, _, fin) = &rec.csi[0];
        assert!(params.is_empty());
        assert_eq!(*fin, b'H');
    }

    #[test]
    fn csi_private_marker() {
        let rec = run(b"\x1b[?1049h");
        let (params, _, private, fin) = &rec.csi[0];
        assert_eq!(params, &vec![vec![1049]]);
        assert_eq!(*private, Some(b'?'));
        assert_eq!(*fin, b'h');
    }

    #[test]
    fn csi_colon_subparams() {
        let rec = run(b"\x1b[38:2::255:128:0m");
        let (params, _, _, _) = &rec.csi[0];
        assert_eq!(params, &vec![vec![38, 2, 0, 255, 128, 0]]);
    }

    #[test]
    fn csi_semicolon_24bit() {
        let rec = run(b"\x1b[38;2;255;128;0m");
        let (params, _, _, _) = &rec.csi[0];
        assert_eq!(
            params,
            &vec![vec![38], vec![2], vec![255], vec![128], vec![0]]
        );
    }

    #[test]
    fn param_overflow_clamps() {
        let rec = run(b"\x1b[99999999A");
        let (params, _, _, _) = &rec.csi[0];
        assert_eq!(params[0][0], u16::MAX);
    }

    #[test]
    fn too_many_params_dropped() {
        let mut seq = b"\x1b[".to_vec();
        for _ in 0..40 {
            seq.extend_from_slice(b"1;");
        }
        seq.push(b'm');
        let mut parser = Parser::new();
        let mut rec = Recorder::default();
        parser.feed(&seq, &mut rec);
        let (params, _, _, _) = &rec.csi[0];
        assert_eq!(params.len(), MAX_PARAMS);
    }

    #[test]
    fn esc_dispatch() {
        let rec = run(b"\x1b7\x1b8");
        assert_eq!(rec.esc, vec![(vec![], b'7'), (vec![], b'8')]);
    }

    #[test]
    fn esc_with_intermediate() {
        let rec = run(b"\x1b(B");
        assert_eq!(rec.esc, vec![(vec![b'('], b'B')]);
    }

    #[test]
    fn osc_bel_terminated() {
        let rec = run(b"\x1b]0;my title\x07");
        assert_eq!(rec.osc, vec![b"0;my title".to_vec()]);
    }

    #[test]
    fn osc_st_terminated() {
        let rec = run(b"\x1b]2;abc\x1b\\");
        assert_eq!(rec.osc, vec![b"2;abc".to_vec()]);
        // The trailing ESC \ also arrives as an ST escape dispatch.
        assert_eq!(rec.esc, vec![(vec![], b'\\')]);
    }

    #[test]
    fn osc_can_aborts_without_dispatch() {
        let rec = run(b"\x1b]0;partial\x18after");
        assert!(rec.osc.is_empty());
        assert_eq!(rec.prints, "after");
    }

    #[test]
    fn osc_utf8_payload_passes_through() {
        let rec = run("\x1b]0;héllo\x07".as_bytes());
        assert_eq!(rec.osc, vec!["0;héllo".as_bytes().to_vec()]);
    }

    #[test]
    fn csi_ignore_swallows_unknown() {
        // Private marker after params is invalid; final byte must not fire.
        let rec = run(b"\x1b[1;?5x");
        assert!(rec.csi.is_empty());
    }

    #[test]
    fn can_aborts_csi() {
        let rec = run(b"\x1b[1;2\x18Hx");
        assert!(rec.csi.is_empty());
        assert_eq!(rec.prints, "Hx");
    }

    #[test]
    fn esc_restarts_csi() {
        let rec = run(b"\x1b[12\x1b[3A");
        assert_eq!(rec.csi.len(), 1);
        let (params, _, _, fin) = &rec.csi[0];
        assert_eq!(params, &vec![vec![3]]);
        assert_eq!(*fin, b'A');
    }

    #[test]
    fn dcs_hook_put_unhook() {
        let rec = run(b"\x1bPqdata\x1b\\");
        assert_eq!(rec.hooks, 1);
        assert_eq!(rec.puts, b"data");
        assert_eq!(rec.unhooks, 1);
    }

    #[test]
    fn sos_pm_apc_ignored() {
        let rec = run(b"\x1b_hidden\x1b\\visible");
        assert_eq!(rec.prints, "visible");
    }

    #[test]
    fn utf8_multibyte_prints() {
        let rec = run("caffè 中".as_bytes());
        assert_eq!(rec.prints, "caffè 中");
    }

    #[test]
    fn utf8_interrupted_by_escape() {
        // A truncated UTF-8 sequence followed by ESC: drop the fragment.
        let rec = run(b"\xe4\x1b[A");
        assert_eq!(rec.prints, "");
        assert_eq!(rec.csi.len(), 1);
    }

    #[test]
    fn del_ignored_everywhere() {
        let rec = run(b"a\x7fb\x1b[1\x7f2A");
        assert_eq!(rec.prints, "ab");
        let (params, _, _, _) = &rec.csi[0];
        assert_eq!(params, &vec![vec![12]]);
    }

    #[test]
    fn oversized_osc_truncates() {
        let mut seq = b"\x1b]0;".to_vec();
        seq.extend(std::iter::repeat_n(b'x', MAX_OSC_LEN * 2));
        seq.push(0x07);
        let mut parser = Parser::new();
        let mut rec = Recorder::default();
        parser.feed(&seq, &mut rec);
        assert_eq!(rec.osc[0].len(), MAX_OSC_LEN);
    }
}
