//! Escape emission helpers.
//!
//! Pure byte-generation over the capability table: attribute transitions,
//! color downgrade for low-capability terminals, cursor addressing. No
//! state tracking here — the presenter owns that.

use seam_term::{palette_rgb, AttrFlags, Attrs, Color};

use crate::caps::{Cap, ColorLevel, TermCaps};

/// Downgrade a color to what the client terminal can express.
///
/// 24-bit maps onto the 6x6x6 cube / grayscale ramp; 256 maps onto the
/// 16 named colors by nearest distance; mono drops color entirely.
#[must_use]
pub fn downgrade(color: Color, level: ColorLevel) -> Color {
    match (color, level) {
        (c, ColorLevel::TrueColor) => c,
        (Color::Rgb(r, g, b), ColorLevel::Ansi256) => Color::Indexed(rgb_to_256(r, g, b)),
        (Color::Rgb(r, g, b), ColorLevel::Ansi16) => {
            Color::Named(nearest_named(r, g, b))
        }
        (Color::Indexed(i), ColorLevel::Ansi16) => {
            if i < 16 {
                Color::Named(i)
            } else {
                let (r, g, b) = palette_rgb(i);
                Color::Named(nearest_named(r, g, b))
            }
        }
        (_, ColorLevel::Mono) => Color::Default,
        (c, _) => c,
    }
}

/// Map RGB onto the closest entry of the 256-color cube or gray ramp.
fn rgb_to_256(r: u8, g: u8, b: u8) -> u8 {
    const STEPS: [u8; 6] = [0, 95, 135, 175, 215, 255];
    let nearest = |v: u8| -> u8 {
        let mut best = 0u8;
        let mut dist = u16::MAX;
        for (i, s) in STEPS.iter().enumerate() {
            let d = v.abs_diff(*s) as u16;
            if d < dist {
                dist = d;
                best = i as u8;
            }
        }
        best
    };
    let (qr, qg, qb) = (nearest(r), nearest(g), nearest(b));
    let cube = 16 + 36 * qr + 6 * qg + qb;
    // Consider the gray ramp when the color is near-achromatic.
    let gray_avg = (u16::from(r) + u16::from(g) + u16::from(b)) / 3;
    let gray_idx = if gray_avg > 238 {
        23
    } else {
        (gray_avg.saturating_sub(3) / 10) as u8
    };
    let gray_value = 8 + 10 * u16::from(gray_idx);
    let dist = |x: (u8, u8, u8)| -> u32 {
        let dr = u32::from(x.0.abs_diff(r));
        let dg = u32::from(x.1.abs_diff(g));
        let db = u32::from(x.2.abs_diff(b));
        dr * dr + dg * dg + db * db
    };
    let cube_rgb = (STEPS[qr as usize], STEPS[qg as usize], STEPS[qb as usize]);
    let gv = gray_value.min(255) as u8;
    if dist((gv, gv, gv)) < dist(cube_rgb) {
        232 + gray_idx
    } else {
        cube
    }
}

/// Nearest of the 16 named colors by squared distance.
fn nearest_named(r: u8, g: u8, b: u8) -> u8 {
    let mut best = 0u8;
    let mut best_dist = u32::MAX;
    for i in 0..16u8 {
        let (pr, pg, pb) = palette_rgb(i);
        let dr = u32::from(pr.abs_diff(r));
        let dg = u32::from(pg.abs_diff(g));
        let db = u32::from(pb.abs_diff(b));
        let d = dr * dr + dg * dg + db * db;
        if d < best_dist {
            best_dist = d;
            best = i;
        }
    }
    best
}

/// Emit a cursor-position sequence.
pub fn emit_cup(out: &mut Vec<u8>, caps: &TermCaps, x: u16, y: u16) {
    match caps.expand(Cap::Cup, u32::from(y), u32::from(x)) {
        Some(s) => out.extend_from_slice(s.as_bytes()),
        None => out.extend_from_slice(format!("\x1b[{};{}H", y + 1, x + 1).as_bytes()),
    }
}

fn emit_cap(out: &mut Vec<u8>, caps: &TermCaps, cap: Cap, fallback: &str) {
    match caps.get(cap) {
        Some(s) => out.extend_from_slice(s.as_bytes()),
        None => out.extend_from_slice(fallback.as_bytes()),
    }
}

/// Emit a foreground color change.
fn emit_fg(out: &mut Vec<u8>, caps: &TermCaps, color: Color) {
    match downgrade(color, caps.colors) {
        Color::Default => out.extend_from_slice(b"\x1b[39m"),
        Color::Named(n) if n < 8 => {
            out.extend_from_slice(format!("\x1b[3{n}m").as_bytes());
        }
        Color::Named(n) => {
            out.extend_from_slice(format!("\x1b[9{}m", n - 8).as_bytes());
        }
        Color::Indexed(i) => match caps.expand(Cap::Setaf, u32::from(i), 0) {
            Some(s) => out.extend_from_slice(s.as_bytes()),
            None => out.extend_from_slice(format!("\x1b[38;5;{i}m").as_bytes()),
        },
        Color::Rgb(r, g, b) => {
            out.extend_from_slice(format!("\x1b[38;2;{r};{g};{b}m").as_bytes());
        }
    }
}

/// Emit a background color change.
fn emit_bg(out: &mut Vec<u8>, caps: &TermCaps, color: Color) {
    match downgrade(color, caps.colors) {
        Color::Default => out.extend_from_slice(b"\x1b[49m"),
        Color::Named(n) if n < 8 => {
            out.extend_from_slice(format!("\x1b[4{n}m").as_bytes());
        }
        Color::Named(n) => {
            out.extend_from_slice(format!("\x1b[10{}m", n - 8).as_bytes());
        }
        Color::Indexed(i) => match caps.expand(Cap::Setab, u32::from(i), 0) {
            Some(s) => out.extend_from_slice(s.as_bytes()),
            None => out.extend_from_slice(format!("\x1b[48;5;{i}m").as_bytes()),
        },
        Color::Rgb(r, g, b) => {
            out.extend_from_slice(format!("\x1b[48;2;{r};{g};{b}m").as_bytes());
        }
    }
}

/// Emit the minimal transition from `from` to `to`.
///
/// When attributes must be removed the whole state resets and re-applies
/// (the exit capabilities are not universally present); runs of identical
/// attributes therefore cost a single sequence at their head.
pub fn emit_attrs(out: &mut Vec<u8>, caps: &TermCaps, from: Attrs, to: Attrs) {
    if from == to {
        return;
    }
    let removed = from.flags & !to.flags;
    let needs_reset = !removed.is_empty()
        || (from.fg != Color::Default && to.fg == Color::Default)
        || (from.bg != Color::Default && to.bg == Color::Default);

    let base = if needs_reset {
        emit_cap(out, caps, Cap::Sgr0, "\x1b[m");
        Attrs::default()
    } else {
        from
    };

    let added = to.flags & !base.flags;
    for (flag, cap, fallback) in [
        (AttrFlags::BOLD, Cap::Bold, "\x1b[1m"),
        (AttrFlags::DIM, Cap::Dim, "\x1b[2m"),
        (AttrFlags::ITALIC, Cap::Sitm, "\x1b[3m"),
        (AttrFlags::UNDERLINE, Cap::Smul, "\x1b[4m"),
        (AttrFlags::BLINK, Cap::Blink, "\x1b[5m"),
        (AttrFlags::REVERSE, Cap::Rev, "\x1b[7m"),
        (AttrFlags::HIDDEN, Cap::Invis, "\x1b[8m"),
        (AttrFlags::STRIKETHROUGH, Cap::Smxx, "\x1b[9m"),
    ] {
        if added.contains(flag) {
            emit_cap(out, caps, cap, fallback);
        }
    }
    if added.contains(AttrFlags::DOUBLE_UNDERLINE) {
        out.extend_from_slice(b"\x1b[4:2m");
    }
    if added.contains(AttrFlags::CURLY_UNDERLINE) {
        out.extend_from_slice(b"\x1b[4:3m");
    }

    if to.fg != base.fg {
        emit_fg(out, caps, to.fg);
    }
    if to.bg != base.bg {
        emit_bg(out, caps, to.bg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn emit_to_string(from: Attrs, to: Attrs) -> String {
        let mut out = Vec::new();
        emit_attrs(&mut out, &TermCaps::default(), from, to);
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn no_change_emits_nothing() {
        assert_eq!(emit_to_string(Attrs::default(), Attrs::default()), "");
    }

    #[test]
    fn adding_bold_is_incremental() {
        let to = Attrs {
            flags: AttrFlags::BOLD,
            ..Attrs::default()
        };
        assert_eq!(emit_to_string(Attrs::default(), to), "\x1b[1m");
    }

    #[test]
    fn removing_attr_resets_first() {
        let from = Attrs {
            flags: AttrFlags::BOLD | AttrFlags::UNDERLINE,
            ..Attrs::default()
        };
        let to = Attrs {
            flags: AttrFlags::BOLD,
            ..Attrs::default()
        };
        assert_eq!(emit_to_string(from, to), "\x1b[m\x1b[1m");
    }

    #[test]
    fn truecolor_passes_through_on_capable_terminal() {
        let mut caps = TermCaps::default();
        caps.set_colors(ColorLevel::TrueColor);
        let mut out = Vec::new();
        let to = Attrs {
            fg: Color::Rgb(255, 128, 0),
            ..Attrs::default()
        };
        emit_attrs(&mut out, &caps, Attrs::default(), to);
        assert_eq!(String::from_utf8(out).unwrap(), "\x1b[38;2;255;128;0m");
    }

    #[test]
    fn truecolor_downgrades_to_256() {
        // Pure red maps to cube corner 196.
        assert_eq!(
            downgrade(Color::Rgb(255, 0, 0), ColorLevel::Ansi256),
            Color::Indexed(196)
        );
    }

    #[test]
    fn gray_downgrades_to_ramp() {
        let c = downgrade(Color::Rgb(128, 128, 128), ColorLevel::Ansi256);
        match c {
            Color::Indexed(i) => assert!((232..=255).contains(&i)),
            other => panic!("expected gray ramp, got {other:?}"),
        }
    }

    #[test]
    fn indexed_to_16_keeps_low_indices() {
        assert_eq!(
            downgrade(Color::Indexed(3), ColorLevel::Ansi16),
            Color::Named(3)
        );
    }

    #[test]
    fn mono_drops_color() {
        assert_eq!(
            downgrade(Color::Rgb(1, 2, 3), ColorLevel::Mono),
            Color::Default
        );
    }

    #[test]
    fn named_bright_uses_aix_sequences() {
        let to = Attrs {
            fg: Color::Named(9),
            bg: Color::Named(12),
            ..Attrs::default()
        };
        assert_eq!(emit_to_string(Attrs::default(), to), "\x1b[91m\x1b[104m");
    }
}
