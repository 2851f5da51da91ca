use crate::slot::{Role, SplitMode};

/// Width in pixels of the seam border drawn around the active half of a
/// split tag.
pub const BORDER_WIDTH: usize = 2;

/// A pixel rectangle of the screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Region {
    pub row: usize,
    pub col: usize,
    pub height: usize,
    pub width: usize,
}

impl Region {
    pub const fn new(row: usize, col: usize, height: usize, width: usize) -> Self {
        Self {
            row,
            col,
            height,
            width,
        }
    }

    /// Region covering a whole `height` x `width` screen.
    pub const fn full(height: usize, width: usize) -> Self {
        Self::new(0, 0, height, width)
    }

    pub fn bottom(&self) -> usize {
        self.row + self.height
    }

    pub fn right(&self) -> usize {
        self.col + self.width
    }

    pub fn area(&self) -> usize {
        self.height * self.width
    }

    pub fn intersects(&self, other: &Region) -> bool {
        self.row < other.bottom()
            && other.row < self.bottom()
            && self.col < other.right()
            && other.col < self.right()
    }

    /// Whole character cells that fit, as `(cols, rows)`, for a cell of
    /// `(height, width)` pixels.
    pub fn text_size(&self, cell: (usize, usize)) -> (u16, u16) {
        let (ch, cw) = (cell.0.max(1), cell.1.max(1));
        let cols = (self.width / cw).min(u16::MAX as usize) as u16;
        let rows = (self.height / ch).min(u16::MAX as usize) as u16;
        (cols, rows)
    }
}

/// Region of a tag's slot under `split` on a `screen` of `(height, width)`
/// pixels with character cells of `cell` pixels.
///
/// The primary half is rounded down to whole character rows (or columns);
/// the secondary half takes what remains after the border.
pub fn region_for(
    split: SplitMode,
    role: Role,
    screen: (usize, usize),
    cell: (usize, usize),
) -> Region {
    let (height, width) = screen;
    let (ch, cw) = (cell.0.max(1), cell.1.max(1));
    let bw = BORDER_WIDTH;

    match split {
        SplitMode::None => Region::full(height, width),
        SplitMode::Horizontal => {
            let h1 = height / 2 / ch * ch;
            let h2 = height.saturating_sub(h1 + 4 * bw);
            let w = width.saturating_sub(2 * bw);
            match role {
                Role::Primary => Region::new(bw, bw, h1, w),
                Role::Secondary => Region::new(h1 + 3 * bw, bw, h2, w),
            }
        }
        SplitMode::Vertical => {
            let w1 = width / 2 / cw * cw;
            let w2 = width.saturating_sub(w1 + 4 * bw);
            let h = height.saturating_sub(2 * bw);
            match role {
                Role::Primary => Region::new(bw, bw, h, w1),
                Role::Secondary => Region::new(bw, w1 + 3 * bw, h, w2),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCREEN: (usize, usize) = (480, 640);
    const CELL: (usize, usize) = (18, 9);

    #[test]
    fn test_unsplit_is_full_screen() {
        for role in [Role::Primary, Role::Secondary] {
            assert_eq!(
                region_for(SplitMode::None, role, SCREEN, CELL),
                Region::full(480, 640)
            );
        }
    }

    #[test]
    fn test_horizontal_halves() {
        let top = region_for(SplitMode::Horizontal, Role::Primary, SCREEN, CELL);
        let bottom = region_for(SplitMode::Horizontal, Role::Secondary, SCREEN, CELL);

        // 480 / 2 = 240 rounded down to 18 px rows.
        assert_eq!(top, Region::new(2, 2, 234, 636));
        assert_eq!(bottom, Region::new(240, 2, 238, 636));
        assert!(!top.intersects(&bottom));
        assert_eq!(bottom.bottom() + BORDER_WIDTH, 480);
        assert_eq!(top.area() + bottom.area(), (480 - 4 * BORDER_WIDTH) * (640 - 2 * BORDER_WIDTH));
    }

    #[test]
    fn test_vertical_halves() {
        let left = region_for(SplitMode::Vertical, Role::Primary, SCREEN, CELL);
        let right = region_for(SplitMode::Vertical, Role::Secondary, SCREEN, CELL);

        assert_eq!(left.width % CELL.1, 0);
        assert!(!left.intersects(&right));
        assert_eq!(right.col, left.right() + 2 * BORDER_WIDTH);
        assert_eq!(right.right() + BORDER_WIDTH, 640);
    }

    #[test]
    fn test_tiny_screen_saturates() {
        let r = region_for(SplitMode::Horizontal, Role::Secondary, (4, 4), CELL);
        assert_eq!(r.height, 0);
        assert_eq!(r.text_size(CELL), (0, 0));
    }

    #[test]
    fn test_text_size() {
        assert_eq!(Region::full(480, 640).text_size(CELL), (71, 26));
    }
}
