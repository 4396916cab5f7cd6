//! Round-trip law: cells emitted for a truecolor terminal, fed back
//! through the parser, reproduce the original cells bit-exactly.
//! (Color-downgraded output for low-capability terminals is lossy by
//! design and not a round trip.)

use seam_render::{ColorLevel, FrameBuffer, Presenter, TermCaps};
use seam_term::{AttrFlags, Attrs, Cell, Color, Glyph, Parser, Screen};

fn truecolor_caps() -> TermCaps {
    let mut caps = TermCaps::for_term("xterm-256color", true);
    caps.set_colors(ColorLevel::TrueColor);
    caps
}

fn replay(frame: &FrameBuffer, caps: &TermCaps) -> Screen {
    let mut presenter = Presenter::new(frame.width(), frame.height());
    let mut out = Vec::new();
    presenter.present(frame, (0, 0), true, caps, &mut out);

    let mut screen = Screen::new(frame.width(), frame.height(), 0);
    let mut parser = Parser::new();
    parser.feed(&out, &mut screen);
    screen
}

#[test]
fn plain_text_round_trips() {
    let mut frame = FrameBuffer::new(20, 3);
    frame.put_str(0, 0, "hello world", Attrs::default(), 20);
    frame.put_str(2, 1, "second row", Attrs::default(), 20);

    let screen = replay(&frame, &truecolor_caps());
    assert_eq!(screen.grid().view_row_as_string(0, 0, 20), "hello world         ");
    assert_eq!(&screen.grid().view_row_as_string(1, 0, 20)[2..12], "second row");
}

#[test]
fn truecolor_cells_round_trip_bit_exact() {
    let attrs = Attrs {
        flags: AttrFlags::BOLD | AttrFlags::ITALIC,
        fg: Color::Rgb(255, 128, 0),
        bg: Color::Rgb(0, 0, 0),
    };
    let mut frame = FrameBuffer::new(10, 2);
    frame.set(3, 0, Cell::with_attrs(Glyph::from_char('X'), attrs));

    let screen = replay(&frame, &truecolor_caps());
    let cell = screen.grid().get_cell(3, 0);
    assert_eq!(cell.glyph().as_str(), "X");
    assert_eq!(cell.attrs, attrs);
    // RGB black stays black, never collapsing to default.
    assert_eq!(cell.attrs.bg, Color::Rgb(0, 0, 0));
}

#[test]
fn indexed_and_named_colors_round_trip() {
    let mut frame = FrameBuffer::new(10, 1);
    for (x, fg) in [
        (0, Color::Named(1)),
        (1, Color::Named(9)),
        (2, Color::Indexed(128)),
    ] {
        let attrs = Attrs {
            fg,
            ..Attrs::default()
        };
        frame.set(x, 0, Cell::with_attrs(Glyph::from_char('c'), attrs));
    }

    let screen = replay(&frame, &truecolor_caps());
    assert_eq!(screen.grid().get_cell(0, 0).attrs.fg, Color::Named(1));
    assert_eq!(screen.grid().get_cell(1, 0).attrs.fg, Color::Named(9));
    assert_eq!(screen.grid().get_cell(2, 0).attrs.fg, Color::Indexed(128));
}

#[test]
fn wide_characters_round_trip() {
    let mut frame = FrameBuffer::new(10, 1);
    frame.put_str(0, 0, "a中b", Attrs::default(), 10);

    let screen = replay(&frame, &truecolor_caps());
    assert_eq!(screen.grid().get_cell(0, 0).glyph().as_str(), "a");
    assert!(screen.grid().get_cell(1, 0).is_wide());
    assert_eq!(screen.grid().get_cell(1, 0).glyph().as_str(), "中");
    assert!(screen.grid().get_cell(2, 0).is_wide_continuation());
    assert_eq!(screen.grid().get_cell(3, 0).glyph().as_str(), "b");
}

#[test]
fn attribute_runs_round_trip() {
    let attrs_a = Attrs {
        flags: AttrFlags::UNDERLINE,
        fg: Color::Named(4),
        ..Attrs::default()
    };
    let attrs_b = Attrs {
        flags: AttrFlags::REVERSE,
        ..Attrs::default()
    };
    let mut frame = FrameBuffer::new(12, 1);
    frame.put_str(0, 0, "aaa", attrs_a, 12);
    frame.put_str(3, 0, "bbb", attrs_b, 12);
    frame.put_str(6, 0, "ccc", attrs_a, 12);

    let screen = replay(&frame, &truecolor_caps());
    for x in 0..3 {
        assert_eq!(screen.grid().get_cell(x, 0).attrs, attrs_a);
        assert_eq!(screen.grid().get_cell(x + 3, 0).attrs, attrs_b);
        assert_eq!(screen.grid().get_cell(x + 6, 0).attrs, attrs_a);
    }
}

#[test]
fn incremental_diff_also_round_trips() {
    let caps = truecolor_caps();
    let mut presenter = Presenter::new(16, 2);
    let mut screen = Screen::new(16, 2, 0);
    let mut parser = Parser::new();

    let mut frame = FrameBuffer::new(16, 2);
    frame.put_str(0, 0, "state one", Attrs::default(), 16);
    let mut out = Vec::new();
    presenter.present(&frame, (0, 0), true, &caps, &mut out);
    parser.feed(&out, &mut screen);

    frame.put_str(0, 0, "state two", Attrs::default(), 16);
    let mut out = Vec::new();
    presenter.present(&frame, (0, 0), true, &caps, &mut out);
    parser.feed(&out, &mut screen);

    assert_eq!(
        screen.grid().view_row_as_string(0, 0, 9),
        "state two"
    );
}
