//! Terminal capability table.
//!
//! Stands in for the system terminfo database behind a small query
//! interface: a capability name maps to an escape template, with a
//! built-in xterm table as the baseline and per-client overrides layered
//! on top (from the identify handshake). Emitters fall back to hard-coded
//! sequences only when a capability is absent.
//!
//! Templates support the few parameter escapes the baseline table needs:
//! `%i` (one-based params), `%p1%d` / `%p2%d` (decimal params), and `%%`.

use std::collections::HashMap;

/// How many colors the client terminal can show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum ColorLevel {
    /// No color support at all.
    Mono,
    /// The 16 ANSI colors.
    #[default]
    Ansi16,
    /// The 256-color palette.
    Ansi256,
    /// 24-bit direct color.
    TrueColor,
}

/// String capability names (the terminfo vocabulary subset we use).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cap {
    /// Cursor position.
    Cup,
    /// Erase to end of line.
    El,
    /// Erase to start of line.
    El1,
    /// Erase below.
    Ed,
    /// Reset all attributes.
    Sgr0,
    /// Enter/leave alternate screen.
    Smcup,
    Rmcup,
    /// Cursor invisible / normal.
    Civis,
    Cnorm,
    /// Attribute entry sequences.
    Bold,
    Dim,
    Sitm,
    Ritm,
    Smul,
    Rmul,
    Rev,
    Smxx,
    Rmxx,
    Blink,
    Invis,
    /// Foreground / background color by palette index.
    Setaf,
    Setab,
    /// Enter/exit ACS (line drawing) mode.
    Smacs,
    Rmacs,
}

/// A client terminal's capability table.
#[derive(Debug, Clone)]
pub struct TermCaps {
    /// The TERM name the client identified with.
    pub term: String,
    pub colors: ColorLevel,
    pub utf8: bool,
    overrides: HashMap<Cap, String>,
}

impl Default for TermCaps {
    fn default() -> Self {
        Self::for_term("xterm-256color", true)
    }
}

impl TermCaps {
    /// Build a capability table for a TERM name.
    ///
    /// The baseline is the xterm table; the TERM string only influences
    /// the color level heuristically (a real terminfo entry can override
    /// any capability afterwards).
    #[must_use]
    pub fn for_term(term: &str, utf8: bool) -> Self {
        let colors = if term.contains("truecolor") || term.contains("direct") {
            ColorLevel::TrueColor
        } else if term.contains("256color") {
            ColorLevel::Ansi256
        } else if term.contains("mono") || term == "dumb" {
            ColorLevel::Mono
        } else {
            ColorLevel::Ansi16
        };
        Self {
            term: term.to_string(),
            colors,
            utf8,
            overrides: HashMap::new(),
        }
    }

    /// Force a color level (client flags `-2` / truecolor detection).
    pub fn set_colors(&mut self, colors: ColorLevel) {
        self.colors = colors;
    }

    /// Install an override for one capability (from IDENTIFY_TERMINFO).
    pub fn set_override(&mut self, cap: Cap, template: impl Into<String>) {
        self.overrides.insert(cap, template.into());
    }

    /// Parse a terminfo-style `name=value` override line.
    ///
    /// Unknown names are ignored so clients can ship their full table.
    pub fn apply_override_line(&mut self, line: &str) {
        let Some((name, value)) = line.split_once('=') else {
            return;
        };
        let cap = match name.trim() {
            "cup" => Cap::Cup,
            "el" => Cap::El,
            "el1" => Cap::El1,
            "ed" => Cap::Ed,
            "sgr0" => Cap::Sgr0,
            "smcup" => Cap::Smcup,
            "rmcup" => Cap::Rmcup,
            "civis" => Cap::Civis,
            "cnorm" => Cap::Cnorm,
            "bold" => Cap::Bold,
            "dim" => Cap::Dim,
            "sitm" => Cap::Sitm,
            "ritm" => Cap::Ritm,
            "smul" => Cap::Smul,
            "rmul" => Cap::Rmul,
            "rev" => Cap::Rev,
            "smxx" => Cap::Smxx,
            "rmxx" => Cap::Rmxx,
            "blink" => Cap::Blink,
            "invis" => Cap::Invis,
            "setaf" => Cap::Setaf,
            "setab" => Cap::Setab,
            "smacs" => Cap::Smacs,
            "rmacs" => Cap::Rmacs,
            _ => return,
        };
        self.set_override(cap, unescape_terminfo(value));
    }

    /// Look up a capability template: override first, then the builtin
    /// xterm table. `None` means the terminal lacks the capability.
    #[must_use]
    pub fn get(&self, cap: Cap) -> Option<&str> {
        if let Some(s) = self.overrides.get(&cap) {
            return if s.is_empty() { None } else { Some(s) };
        }
        builtin_xterm(cap)
    }

    /// Expand a capability with up to two numeric parameters.
    #[must_use]
    pub fn expand(&self, cap: Cap, p1: u32, p2: u32) -> Option<String> {
        self.get(cap).map(|tpl| expand_template(tpl, p1, p2))
    }
}

/// The baseline xterm capability strings.
fn builtin_xterm(cap: Cap) -> Option<&'static str> {
    Some(match cap {
        Cap::Cup => "\x1b[%i%p1%d;%p2%dH",
        Cap::El => "\x1b[K",
        Cap::El1 => "\x1b[1K",
        Cap::Ed => "\x1b[J",
        Cap::Sgr0 => "\x1b[m",
        Cap::Smcup => "\x1b[?1049h",
        Cap::Rmcup => "\x1b[?1049l",
        Cap::Civis => "\x1b[?25l",
        Cap::Cnorm => "\x1b[?25h",
        Cap::Bold => "\x1b[1m",
        Cap::Dim => "\x1b[2m",
        Cap::Sitm => "\x1b[3m",
        Cap::Ritm => "\x1b[23m",
        Cap::Smul => "\x1b[4m",
        Cap::Rmul => "\x1b[24m",
        Cap::Rev => "\x1b[7m",
        Cap::Smxx => "\x1b[9m",
        Cap::Rmxx => "\x1b[29m",
        Cap::Blink => "\x1b[5m",
        Cap::Invis => "\x1b[8m",
        Cap::Setaf => "\x1b[38;5;%p1%dm",
        Cap::Setab => "\x1b[48;5;%p1%dm",
        Cap::Smacs => "\x1b(0",
        Cap::Rmacs => "\x1b(B",
    })
}

/// Expand the supported parameter escapes in a capability template.
fn expand_template(tpl: &str, p1: u32, p2: u32) -> String {
    let mut out = String::with_capacity(tpl.len() + 8);
    let mut params = [p1, p2];
    let mut chars = tpl.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch != '%' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('%') => out.push('%'),
            Some('i') => {
                params[0] += 1;
                params[1] += 1;
            }
            Some('p') => {
                let idx = match chars.next() {
                    Some('1') => 0,
                    Some('2') => 1,
                    _ => continue,
                };
                // Expect the %d that prints the pushed parameter.
                if chars.peek() == Some(&'%') {
                    chars.next();
                    if chars.next() == Some('d') {
                        out.push_str(&params[idx].to_string());
                    }
                }
            }
            Some('d') => out.push_str(&params[0].to_string()),
            _ => {}
        }
    }
    out
}

/// Undo the `\E` and `^X` escapes terminfo sources use.
fn unescape_terminfo(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars().peekable();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some('E') | Some('e') => out.push('\x1b'),
                Some('n') => out.push('\n'),
                Some('r') => out.push('\r'),
                Some('t') => out.push('\t'),
                Some('\\') => out.push('\\'),
                Some(other) => out.push(other),
                None => {}
            },
            '^' => match chars.next() {
                Some(c) if c.is_ascii_uppercase() || matches!(c, '@' | '[' | '\\' | ']' | '_') => {
                    out.push((c as u8 & 0x1f) as char)
                }
                Some(other) => {
                    out.push('^');
                    out.push(other);
                }
                None => out.push('^'),
            },
            _ => out.push(ch),
        }
    }
    out
}
