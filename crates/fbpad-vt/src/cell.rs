use alacritty_terminal::term::cell::{Cell, Flags};
use alacritty_terminal::term::color::Colors;
use bitflags::bitflags;

use crate::color::{self, Rgb, DEFAULT_BG, DEFAULT_FG};

bitflags! {
    /// The attributes the pad renders.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct CellFlags: u8 {
        const BOLD    = 0b0001;
        const DIM     = 0b0010;
        const INVERSE = 0b0100;
        const HIDDEN  = 0b1000;
    }
}

const FLAG_MAP: [(Flags, CellFlags); 4] = [
    (Flags::BOLD, CellFlags::BOLD),
    (Flags::DIM, CellFlags::DIM),
    (Flags::INVERSE, CellFlags::INVERSE),
    (Flags::HIDDEN, CellFlags::HIDDEN),
];

/// One character cell, colors already resolved.
#[derive(Clone, Debug, PartialEq)]
pub struct VtCell {
    pub codepoint: char,
    pub fg: Rgb,
    pub bg: Rgb,
    pub flags: CellFlags,
    /// 2 for a wide character, 0 for the spacer after it, else 1.
    pub width: u8,
}

impl VtCell {
    pub(crate) fn from_grid(cell: &Cell, colors: &Colors) -> Self {
        let flags = FLAG_MAP
            .iter()
            .filter(|(alac, _)| cell.flags.contains(*alac))
            .fold(CellFlags::empty(), |acc, (_, ours)| acc | *ours);
        let width = if cell.flags.contains(Flags::WIDE_CHAR) {
            2
        } else if cell.flags.contains(Flags::WIDE_CHAR_SPACER) {
            0
        } else {
            1
        };
        Self {
            codepoint: cell.c,
            fg: color::resolve(&cell.fg, colors, DEFAULT_FG),
            bg: color::resolve(&cell.bg, colors, DEFAULT_BG),
            flags,
            width,
        }
    }

    /// Colors as painted: inverse swaps them, dim fades the foreground and
    /// hidden paints it in the background color.
    pub fn painted_colors(&self) -> (Rgb, Rgb) {
        let (fg, bg) = if self.flags.contains(CellFlags::INVERSE) {
            (self.bg, self.fg)
        } else {
            (self.fg, self.bg)
        };
        if self.flags.contains(CellFlags::HIDDEN) {
            (bg, bg)
        } else if self.flags.contains(CellFlags::DIM) {
            (fg.dim(), bg)
        } else {
            (fg, bg)
        }
    }
}

impl Default for VtCell {
    fn default() -> Self {
        Self {
            codepoint: ' ',
            fg: DEFAULT_FG,
            bg: DEFAULT_BG,
            flags: CellFlags::empty(),
            width: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inverse_swaps_colors() {
        let cell = VtCell {
            flags: CellFlags::INVERSE,
            ..VtCell::default()
        };
        assert_eq!(cell.painted_colors(), (DEFAULT_BG, DEFAULT_FG));
    }

    #[test]
    fn test_hidden_uses_background() {
        let cell = VtCell {
            flags: CellFlags::HIDDEN,
            ..VtCell::default()
        };
        assert_eq!(cell.painted_colors(), (cell.bg, cell.bg));
    }

    #[test]
    fn test_from_grid_maps_flags() {
        let mut cell = Cell::default();
        cell.c = 'x';
        cell.flags = Flags::BOLD | Flags::ITALIC | Flags::INVERSE;
        let ours = VtCell::from_grid(&cell, &Colors::default());
        assert_eq!(ours.codepoint, 'x');
        assert_eq!(ours.flags, CellFlags::BOLD | CellFlags::INVERSE);
        assert_eq!(ours.width, 1);
        assert_eq!((ours.fg, ours.bg), (DEFAULT_FG, DEFAULT_BG));
    }
}
