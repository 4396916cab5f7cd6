//! Property tests for the presenter and color downgrade.

use proptest::prelude::*;
use seam_render::{ColorLevel, FrameBuffer, Presenter, TermCaps};
use seam_term::{Attrs, Cell, Color};

fn arb_color() -> impl Strategy<Value = Color> {
    prop_oneof![
        Just(Color::Default),
        (0u8..16).prop_map(Color::Named),
        any::<u8>().prop_map(Color::Indexed),
        any::<(u8, u8, u8)>().prop_map(|(r, g, b)| Color::Rgb(r, g, b)),
    ]
}

fn arb_frame(w: u16, h: u16) -> impl Strategy<Value = FrameBuffer> {
    proptest::collection::vec(
        ((0u16..w), (0u16..h), 32u8..127, arb_color()),
        0..64,
    )
    .prop_map(move |cells| {
        let mut frame = FrameBuffer::new(w, h);
        for (x, y, ch, fg) in cells {
            let mut cell = Cell::new(ch as char);
            cell.attrs = Attrs {
                fg,
                ..Attrs::default()
            };
            frame.set(x, y, cell);
        }
        frame
    })
}

proptest! {
    /// Presenting the same frame twice emits no cell content the second
    /// time: the diff against an identical last-known screen is empty.
    #[test]
    fn identical_frame_second_present_is_cell_free(frame in arb_frame(24, 8)) {
        let caps = TermCaps::default();
        let mut presenter = Presenter::new(24, 8);
        let mut first = Vec::new();
        presenter.present(&frame, (0, 0), true, &caps, &mut first);
        let mut second = Vec::new();
        presenter.present(&frame, (0, 0), true, &caps, &mut second);
        // Only cursor parking and visibility management may remain.
        let text: String = String::from_utf8_lossy(&second).into_owned();
        let printable: String = text
            .split('\u{1b}')
            .skip(1)
            .map(|chunk| {
                // Strip one CSI sequence from the front of each chunk.
                let end = chunk
                    .char_indices()
                    .find(|(_, c)| c.is_ascii_alphabetic() || *c == '~')
                    .map(|(i, c)| i + c.len_utf8())
                    .unwrap_or(chunk.len());
                &chunk[end..]
            })
            .collect();
        prop_assert!(printable.is_empty(), "unexpected cell output: {printable:?}");
    }

    /// After a present, the last-known frame equals the input frame.
    #[test]
    fn present_records_the_frame(frame in arb_frame(24, 8)) {
        let caps = TermCaps::default();
        let mut presenter = Presenter::new(24, 8);
        let mut out = Vec::new();
        presenter.present(&frame, (0, 0), true, &caps, &mut out);
        prop_assert_eq!(presenter.last_frame(), &frame);
    }

    /// Downgrade always lands within the target repertoire.
    #[test]
    fn downgrade_stays_in_repertoire(color in arb_color()) {
        match seam_render::downgrade(color, ColorLevel::Ansi16) {
            Color::Default | Color::Named(_) => {}
            other => prop_assert!(false, "16-color downgrade produced {other:?}"),
        }
        match seam_render::downgrade(color, ColorLevel::Ansi256) {
            Color::Rgb(..) => prop_assert!(false, "256 downgrade kept RGB"),
            _ => {}
        }
        prop_assert_eq!(
            seam_render::downgrade(color, ColorLevel::Mono),
            Color::Default
        );
    }
}
