//! The screen the multiplexer paints through: a canvas, the pad drawing text
//! into the active region, and the snapshot store.

use std::collections::BTreeMap;

use fbpad_fb::Canvas;
use fbpad_pty::{Region, Screen};
use fbpad_vt::{
    CellFlags, CursorShape, DamageInfo, Rgb, ScreenView, VtCell, VtTerminal, DEFAULT_BG,
};

use crate::pad::{Glyphs, Pad};
use crate::snapshot::SnapshotStore;

/// Background of empty regions and margins.
const BACKGROUND: Rgb = DEFAULT_BG;
/// Thickness of underline and bar cursors.
const CURSOR_THICKNESS: usize = 2;

pub struct Display<C, G> {
    canvas: C,
    pad: Pad<G>,
    snapshots: SnapshotStore,
}

impl<C: Canvas, G: Glyphs> Display<C, G> {
    pub fn new(canvas: C, glyphs: G) -> Self {
        let region = Region::full(canvas.height(), canvas.width());
        Self {
            canvas,
            pad: Pad::new(glyphs, region),
            snapshots: SnapshotStore::new(),
        }
    }

    pub fn canvas(&self) -> &C {
        &self.canvas
    }

    fn paint_cell(&mut self, cell: &VtCell, row: usize, col: usize, inverse: bool) {
        let (fg, bg) = cell.painted_colors();
        let (fg, bg) = if inverse { (bg, fg) } else { (fg, bg) };
        // The spacer after a wide character only carries its background.
        let ch = if cell.width == 0 { ' ' } else { cell.codepoint };
        let bold = cell.flags.contains(CellFlags::BOLD);
        self.pad.put(&mut self.canvas, ch, row, col, fg, bg, bold);
    }

    fn paint_row(&mut self, screen: &ScreenView<'_>, row: u16, left: u16, right: u16) {
        let cols = (screen.cols() as usize).min(self.pad.cols());
        if cols == 0 {
            return;
        }
        let right = (right as usize).min(cols - 1);
        for col in left as usize..=right {
            let cell = screen.cell(row, col as u16);
            self.paint_cell(&cell, row as usize, col, false);
        }
    }
}

impl<C: Canvas, G: Glyphs> Screen for Display<C, G> {
    fn size(&self) -> (usize, usize) {
        (self.canvas.height(), self.canvas.width())
    }

    fn cell_size(&self) -> (usize, usize) {
        self.pad.cell_size()
    }

    fn configure(&mut self, region: Region) {
        self.pad.configure(region);
    }

    fn draw(&mut self, vt: Option<&mut VtTerminal>, full: bool) {
        let Some(vt) = vt else {
            self.pad.clear(&mut self.canvas, BACKGROUND);
            return;
        };

        let damage = vt.damage();
        let cursor = vt.cursor();
        let screen = vt.screen();
        let rows = (screen.rows() as usize).min(self.pad.rows());

        // Row -> damaged column span, merged when a row shows up twice.
        let mut spans: BTreeMap<u16, (u16, u16)> = BTreeMap::new();
        match damage {
            DamageInfo::Partial(damaged) if !full => {
                for d in damaged {
                    let span = spans.entry(d.row).or_insert((d.left, d.right));
                    span.0 = span.0.min(d.left);
                    span.1 = span.1.max(d.right);
                }
            }
            _ => {
                self.pad.clear_margins(&mut self.canvas, BACKGROUND);
                for row in 0..rows as u16 {
                    spans.insert(row, (0, u16::MAX));
                }
            }
        }

        for (&row, &(left, right)) in &spans {
            if (row as usize) < rows {
                self.paint_row(&screen, row, left, right);
            }
        }

        let (row, col) = (cursor.row as usize, cursor.col as usize);
        if cursor.visible && row < rows && col < self.pad.cols() {
            let cell = screen.cell(cursor.row, cursor.col);
            match cursor.shape {
                CursorShape::Block => self.paint_cell(&cell, row, col, true),
                CursorShape::Underline => {
                    let (ch_h, ch_w) = self.pad.cell_size();
                    let y = ch_h.saturating_sub(CURSOR_THICKNESS);
                    let (fg, _) = cell.painted_colors();
                    self.pad
                        .fill_in_cell(&mut self.canvas, row, col, y, 0, CURSOR_THICKNESS, ch_w, fg);
                }
                CursorShape::Bar => {
                    let (ch_h, _) = self.pad.cell_size();
                    let (fg, _) = cell.painted_colors();
                    self.pad
                        .fill_in_cell(&mut self.canvas, row, col, 0, 0, ch_h, CURSOR_THICKNESS, fg);
                }
                CursorShape::Hidden => {}
            }
        }

        vt.reset_damage();
    }

    fn border(&mut self, color: Option<Rgb>, width: usize) {
        self.pad
            .border(&mut self.canvas, color.unwrap_or(BACKGROUND), width);
    }

    fn save_snapshot(&mut self, slot: usize) {
        self.snapshots.save(slot, &self.canvas);
    }

    fn load_snapshot(&mut self, slot: usize) -> bool {
        self.snapshots.load(slot, &mut self.canvas)
    }

    fn drop_snapshot(&mut self, slot: usize) {
        self.snapshots.remove(slot);
    }

    fn put(&mut self, ch: char, row: usize, col: usize, fg: Rgb, bg: Rgb, bold: bool) {
        self.pad.put(&mut self.canvas, ch, row, col, fg, bg, bold);
    }
}
