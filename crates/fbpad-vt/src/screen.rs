use alacritty_terminal::grid::Dimensions;
use alacritty_terminal::index::{Column, Line};
use alacritty_terminal::term::Term;
use alacritty_terminal::vte::ansi::CursorShape as AlacCursorShape;

use crate::cell::VtCell;
use crate::terminal::EventProxy;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CursorShape {
    Block,
    Underline,
    Bar,
    Hidden,
}

impl From<AlacCursorShape> for CursorShape {
    fn from(shape: AlacCursorShape) -> Self {
        match shape {
            AlacCursorShape::Block | AlacCursorShape::HollowBlock => Self::Block,
            AlacCursorShape::Underline => Self::Underline,
            AlacCursorShape::Beam => Self::Bar,
            AlacCursorShape::Hidden => Self::Hidden,
        }
    }
}

/// Cursor position in view coordinates.
#[derive(Clone, Debug)]
pub struct CursorState {
    pub row: u16,
    pub col: u16,
    pub shape: CursorShape,
    pub visible: bool,
}

/// What changed since the last `reset_damage`.
#[derive(Debug)]
pub enum DamageInfo {
    Full,
    Partial(Vec<DamagedRow>),
}

/// Inclusive column span of a changed row.
#[derive(Debug)]
pub struct DamagedRow {
    pub row: u16,
    pub left: u16,
    pub right: u16,
}

/// Read-only view of the rows currently on display, which are history
/// lines while the view is scrolled back.
pub struct ScreenView<'a> {
    term: &'a Term<EventProxy>,
}

impl<'a> ScreenView<'a> {
    pub(crate) fn new(term: &'a Term<EventProxy>) -> Self {
        Self { term }
    }

    pub fn rows(&self) -> u16 {
        self.term.screen_lines() as u16
    }

    pub fn cols(&self) -> u16 {
        self.term.columns() as u16
    }

    /// How many lines the view is scrolled back into history.
    pub fn display_offset(&self) -> usize {
        self.term.grid().display_offset()
    }

    /// The cell at `row`, `col` of the view; blank when out of range.
    pub fn cell(&self, row: u16, col: u16) -> VtCell {
        if row >= self.rows() || col >= self.cols() {
            return VtCell::default();
        }
        let grid = self.term.grid();
        let line = Line(i32::from(row) - self.display_offset() as i32);
        VtCell::from_grid(&grid[line][Column(col as usize)], self.term.colors())
    }

    /// Text of a row with trailing blanks removed; wide-character spacers
    /// are skipped.
    pub fn row_text(&self, row: u16) -> String {
        let text: String = (0..self.cols())
            .map(|col| self.cell(row, col))
            .filter(|cell| cell.width != 0)
            .map(|cell| cell.codepoint)
            .collect();
        text.trim_end().to_string()
    }
}
