//! Property-based invariant tests for seam-term.
//!
//! These verify the structural invariants that must hold for **any** input:
//!
//! 1. The parser/screen never panic on arbitrary byte streams.
//! 2. The cursor is always within grid bounds after any input.
//! 3. A width-2 cell is always followed by a width-0 continuation cell.
//! 4. Scrollback never exceeds its configured limit.
//! 5. Identical byte sequences produce identical screen state.

use proptest::prelude::*;
use seam_term::{Parser, Screen};

fn dims() -> impl Strategy<Value = (u16, u16)> {
    (2u16..=120, 2u16..=50)
}

/// Byte soup biased toward escape sequences so the machine leaves ground.
fn input_bytes() -> impl Strategy<Value = Vec<u8>> {
    proptest::collection::vec(
        prop_oneof![
            4 => any::<u8>(),
            2 => Just(0x1b_u8),
            1 => Just(b'['),
            1 => Just(b';'),
            1 => Just(b'm'),
            1 => Just(b'H'),
            1 => proptest::num::u8::ANY.prop_map(|b| b % 10 + b'0'),
        ],
        0..512,
    )
}

fn run(sx: u16, sy: u16, history: usize, input: &[u8]) -> Screen {
    let mut screen = Screen::new(sx, sy, history);
    let mut parser = Parser::new();
    parser.feed(input, &mut screen);
    screen
}

proptest! {
    #[test]
    fn cursor_always_in_bounds((sx, sy) in dims(), input in input_bytes()) {
        let screen = run(sx, sy, 32, &input);
        let (cx, cy) = screen.cursor();
        prop_assert!(cx < screen.sx());
        prop_assert!(cy < screen.sy());
    }

    #[test]
    fn scroll_region_well_formed((sx, sy) in dims(), input in input_bytes()) {
        let screen = run(sx, sy, 32, &input);
        let (top, bot) = screen.region();
        prop_assert!(top <= bot);
        prop_assert!(bot < screen.sy());
    }

    #[test]
    fn wide_cells_have_continuations((sx, sy) in dims(), input in input_bytes()) {
        let screen = run(sx, sy, 32, &input);
        for y in 0..screen.sy() {
            for x in 0..screen.sx() {
                let cell = screen.grid().get_cell(x, y);
                if cell.is_wide() {
                    prop_assert!(x + 1 < screen.sx());
                    let next = screen.grid().get_cell(x + 1, y);
                    prop_assert!(next.is_wide_continuation());
                    prop_assert_eq!(next.attrs, cell.attrs);
                }
            }
        }
    }

    #[test]
    fn history_limit_holds((sx, sy) in dims(), input in input_bytes()) {
        let limit = 16usize;
        let screen = run(sx, sy, limit, &input);
        prop_assert!(screen.grid().history_len() <= limit);
    }

    #[test]
    fn parsing_is_deterministic((sx, sy) in dims(), input in input_bytes()) {
        let a = run(sx, sy, 32, &input);
        let b = run(sx, sy, 32, &input);
        prop_assert_eq!(a.cursor(), b.cursor());
        for y in 0..a.sy() {
            prop_assert_eq!(
                a.grid().view_row_as_string(y, 0, a.sx()),
                b.grid().view_row_as_string(y, 0, b.sx())
            );
        }
    }

    #[test]
    fn resize_never_breaks_invariants(
        (sx, sy) in dims(),
        (nx, ny) in dims(),
        input in input_bytes()
    ) {
        let mut screen = run(sx, sy, 32, &input);
        screen.resize(nx, ny);
        let (cx, cy) = screen.cursor();
        prop_assert!(cx < screen.sx());
        prop_assert!(cy < screen.sy());
        let (top, bot) = screen.region();
        prop_assert!(top <= bot && bot < screen.sy());
    }
}
