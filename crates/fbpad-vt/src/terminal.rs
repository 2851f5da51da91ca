use std::sync::{Arc, Mutex};

use alacritty_terminal::event::{Event, EventListener};
use alacritty_terminal::grid::{Dimensions, Scroll};
use alacritty_terminal::term::{Config, Term, TermDamage};
use alacritty_terminal::vte::ansi;

use crate::screen::{CursorShape, CursorState, DamageInfo, DamagedRow, ScreenView};

/// Lines of scrollback kept per terminal.
const SCROLLBACK_LINES: usize = 1000;

/// Collects the replies the emulator owes the program (cursor position and
/// device status reports).
///
/// `Term` takes its listener by value, so the queue sits behind an `Arc`
/// shared with the owning `VtTerminal`.
#[derive(Clone, Default)]
pub struct EventProxy {
    replies: Arc<Mutex<Vec<u8>>>,
}

impl EventListener for EventProxy {
    fn send_event(&self, event: Event) {
        if let Event::PtyWrite(data) = event {
            if let Ok(mut replies) = self.replies.lock() {
                replies.extend_from_slice(data.as_bytes());
            }
        }
    }
}

/// Grid size handed to `Term`; zero is clamped to one.
struct GridSize {
    cols: usize,
    rows: usize,
}

impl GridSize {
    fn new(cols: u16, rows: u16) -> Self {
        Self {
            cols: cols.max(1) as usize,
            rows: rows.max(1) as usize,
        }
    }
}

impl Dimensions for GridSize {
    fn total_lines(&self) -> usize {
        self.rows
    }

    fn screen_lines(&self) -> usize {
        self.rows
    }

    fn columns(&self) -> usize {
        self.cols
    }
}

/// The emulator behind one terminal slot.
///
/// It keeps absorbing output while its slot is hidden; the damage it
/// accumulates meanwhile is painted on the next show.
pub struct VtTerminal {
    term: Term<EventProxy>,
    parser: ansi::Processor,
    events: EventProxy,
}

impl VtTerminal {
    pub fn new(cols: u16, rows: u16) -> Self {
        let config = Config {
            scrolling_history: SCROLLBACK_LINES,
            ..Config::default()
        };
        let events = EventProxy::default();
        let term = Term::new(config, &GridSize::new(cols, rows), events.clone());
        Self {
            term,
            parser: ansi::Processor::new(),
            events,
        }
    }

    /// Feed program output through the escape-sequence parser.
    pub fn write(&mut self, bytes: &[u8]) {
        self.parser.advance(&mut self.term, bytes);
    }

    pub fn resize(&mut self, cols: u16, rows: u16) {
        self.term.resize(GridSize::new(cols, rows));
    }

    pub fn screen(&self) -> ScreenView<'_> {
        ScreenView::new(&self.term)
    }

    pub fn cursor(&self) -> CursorState {
        let content = self.term.renderable_content();
        let cursor = &content.cursor;
        let shape = CursorShape::from(cursor.shape);
        // Grid coordinates are negative in history; shift into the view.
        let row = cursor.point.line.0 + content.display_offset as i32;
        CursorState {
            row: row.max(0) as u16,
            col: cursor.point.column.0 as u16,
            shape,
            visible: shape != CursorShape::Hidden,
        }
    }

    /// Scroll the view into history (positive) or back towards the live
    /// screen (negative).
    pub fn scroll(&mut self, lines: i32) {
        self.term.scroll_display(Scroll::Delta(lines));
    }

    /// Return the view to the live screen.
    pub fn scroll_to_bottom(&mut self) {
        if self.term.grid().display_offset() != 0 {
            self.term.scroll_display(Scroll::Bottom);
        }
    }

    /// Visible screen as text, one line per row, trailing blanks removed.
    pub fn text(&self) -> String {
        let screen = self.screen();
        (0..screen.rows())
            .map(|row| screen.row_text(row) + "\n")
            .collect()
    }

    /// Damage since the last `reset_damage`. The cursor line is always
    /// reported.
    pub fn damage(&mut self) -> DamageInfo {
        match self.term.damage() {
            TermDamage::Full => DamageInfo::Full,
            TermDamage::Partial(lines) => DamageInfo::Partial(
                lines
                    .map(|d| DamagedRow {
                        row: d.line as u16,
                        left: d.left as u16,
                        right: d.right as u16,
                    })
                    .collect(),
            ),
        }
    }

    pub fn reset_damage(&mut self) {
        self.term.reset_damage();
    }

    /// Take the replies queued for the program since the last call.
    pub fn take_replies(&mut self) -> Vec<u8> {
        match self.events.replies.lock() {
            Ok(mut replies) => std::mem::take(&mut *replies),
            Err(_) => Vec::new(),
        }
    }
}
