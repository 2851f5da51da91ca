//! Text rendering onto a canvas: a grid of character cells inside a region.

use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use fbpad_fb::canvas::store_pixel;
use fbpad_fb::Canvas;
use fbpad_pty::Region;
use fbpad_vt::Rgb;

#[derive(Debug, thiserror::Error)]
pub enum PadError {
    #[error("cannot find fonts (tried {0:?})")]
    NoFont(Vec<PathBuf>),
    #[error("bad font: {0}")]
    Font(String),
}

/// Source of glyph coverage bitmaps.
pub trait Glyphs {
    /// Cell size in pixels as `(height, width)`.
    fn cell_size(&self) -> (usize, usize);

    /// Coverage of `ch`, one byte per pixel of a cell, row-major.
    fn glyph(&mut self, ch: char) -> &[u8];
}

/// A TrueType/OpenType font rasterized with fontdue.
pub struct Font {
    font: fontdue::Font,
    size: f32,
    cell: (usize, usize),
    /// Distance from the top of a cell to the baseline.
    baseline: i32,
    cache: HashMap<char, Vec<u8>>,
}

impl Font {
    /// Load the first usable font among `paths`.
    pub fn load(paths: &[PathBuf], size: f32) -> Result<Self, PadError> {
        for path in paths {
            let data = match fs::read(path) {
                Ok(data) => data,
                Err(e) => {
                    log::debug!("font {}: {e}", path.display());
                    continue;
                }
            };
            match Self::from_bytes(&data, size) {
                Ok(font) => {
                    log::info!(
                        "font {} at {size}px, cell {}x{}",
                        path.display(),
                        font.cell.1,
                        font.cell.0
                    );
                    return Ok(font);
                }
                Err(e) => log::warn!("font {}: {e}", path.display()),
            }
        }
        Err(PadError::NoFont(paths.to_vec()))
    }

    pub fn from_bytes(data: &[u8], size: f32) -> Result<Self, PadError> {
        let font = fontdue::Font::from_bytes(data, fontdue::FontSettings::default())
            .map_err(|e| PadError::Font(e.to_string()))?;

        let width = font.metrics('M', size).advance_width.ceil().max(1.0) as usize;
        let (height, ascent) = match font.horizontal_line_metrics(size) {
            Some(line) => (line.new_line_size.ceil(), line.ascent),
            None => ((size * 1.2).ceil(), size),
        };

        Ok(Self {
            font,
            size,
            cell: (height.max(1.0) as usize, width),
            baseline: ascent.round() as i32,
            cache: HashMap::new(),
        })
    }
}

impl Glyphs for Font {
    fn cell_size(&self) -> (usize, usize) {
        self.cell
    }

    fn glyph(&mut self, ch: char) -> &[u8] {
        let Font {
            font,
            size,
            cell,
            baseline,
            cache,
        } = self;
        cache
            .entry(ch)
            .or_insert_with(|| rasterize(font, *size, *cell, *baseline, ch))
    }
}

/// Rasterize `ch` into a cell-sized coverage bitmap, clipping what sticks out.
fn rasterize(
    font: &fontdue::Font,
    size: f32,
    cell: (usize, usize),
    baseline: i32,
    ch: char,
) -> Vec<u8> {
    let (height, width) = cell;
    let mut out = vec![0u8; height * width];
    let (metrics, bitmap) = font.rasterize(ch, size);

    let top = baseline - metrics.ymin - metrics.height as i32;
    for gy in 0..metrics.height {
        let y = top + gy as i32;
        if y < 0 || y as usize >= height {
            continue;
        }
        for gx in 0..metrics.width {
            let x = metrics.xmin + gx as i32;
            if x < 0 || x as usize >= width {
                continue;
            }
            out[y as usize * width + x as usize] = bitmap[gy * metrics.width + gx];
        }
    }
    out
}

fn blend(fg: Rgb, bg: Rgb, alpha: u8) -> (u8, u8, u8) {
    let a = alpha as u32;
    let mix = |f: u8, b: u8| ((f as u32 * a + b as u32 * (255 - a)) / 255) as u8;
    (mix(fg.r, bg.r), mix(fg.g, bg.g), mix(fg.b, bg.b))
}

/// Draws characters into a region of a canvas.
pub struct Pad<G> {
    glyphs: G,
    region: Region,
}

impl<G: Glyphs> Pad<G> {
    pub fn new(glyphs: G, region: Region) -> Self {
        Self { glyphs, region }
    }

    pub fn configure(&mut self, region: Region) {
        self.region = region;
    }

    pub fn cell_size(&self) -> (usize, usize) {
        self.glyphs.cell_size()
    }

    /// Text rows that fit in the region.
    pub fn rows(&self) -> usize {
        self.region.text_size(self.cell_size()).1 as usize
    }

    /// Text columns that fit in the region.
    pub fn cols(&self) -> usize {
        self.region.text_size(self.cell_size()).0 as usize
    }

    /// Draw `ch` at text position (`row`, `col`). Bold is drawn by
    /// overstriking the glyph one pixel to the right.
    #[allow(clippy::too_many_arguments)]
    pub fn put<C: Canvas>(
        &mut self,
        canvas: &mut C,
        ch: char,
        row: usize,
        col: usize,
        fg: Rgb,
        bg: Rgb,
        bold: bool,
    ) {
        if row >= self.rows() || col >= self.cols() {
            return;
        }
        let (ch_h, ch_w) = self.cell_size();
        let y0 = self.region.row + row * ch_h;
        let x0 = self.region.col + col * ch_w;
        let bg_px = canvas.encode(bg.r, bg.g, bg.b);

        if ch == ' ' {
            canvas.fill_rect(x0, y0, ch_w, ch_h, bg_px);
            return;
        }

        let fg_px = canvas.encode(fg.r, fg.g, fg.b);
        let glyph = self.glyphs.glyph(ch);
        let visible_w = ch_w.min(canvas.width().saturating_sub(x0));
        let bpp = canvas.bytes_per_pixel();
        let mut values = vec![0u32; visible_w];

        for y in 0..ch_h {
            if y0 + y >= canvas.height() {
                break;
            }
            let line = &glyph[y * ch_w..(y + 1) * ch_w];
            for (x, value) in values.iter_mut().enumerate() {
                let mut alpha = line[x];
                if bold && x > 0 {
                    alpha = alpha.max(line[x - 1]);
                }
                *value = match alpha {
                    0 => bg_px,
                    255 => fg_px,
                    a => {
                        let (r, g, b) = blend(fg, bg, a);
                        canvas.encode(r, g, b)
                    }
                };
            }
            let dst = canvas.row_mut(y0 + y);
            for (x, value) in values.iter().enumerate() {
                let at = (x0 + x) * bpp;
                store_pixel(&mut dst[at..at + bpp], *value);
            }
        }
    }

    /// Fill a pixel rectangle given relative to the cell at (`row`, `col`).
    #[allow(clippy::too_many_arguments)]
    pub fn fill_in_cell<C: Canvas>(
        &self,
        canvas: &mut C,
        row: usize,
        col: usize,
        y: usize,
        x: usize,
        height: usize,
        width: usize,
        color: Rgb,
    ) {
        if row >= self.rows() || col >= self.cols() {
            return;
        }
        let (ch_h, ch_w) = self.cell_size();
        let height = height.min(ch_h.saturating_sub(y));
        let width = width.min(ch_w.saturating_sub(x));
        let value = canvas.encode(color.r, color.g, color.b);
        canvas.fill_rect(
            self.region.col + col * ch_w + x,
            self.region.row + row * ch_h + y,
            width,
            height,
            value,
        );
    }

    /// Fill the whole region.
    pub fn clear<C: Canvas>(&self, canvas: &mut C, color: Rgb) {
        let r = self.region;
        let value = canvas.encode(color.r, color.g, color.b);
        canvas.fill_rect(r.col, r.row, r.width, r.height, value);
    }

    /// Fill the parts of the region right of and below the text grid.
    pub fn clear_margins<C: Canvas>(&self, canvas: &mut C, color: Rgb) {
        let r = self.region;
        let (ch_h, ch_w) = self.cell_size();
        let used_w = self.cols() * ch_w;
        let used_h = self.rows() * ch_h;
        let value = canvas.encode(color.r, color.g, color.b);
        canvas.fill_rect(r.col + used_w, r.row, r.width - used_w, r.height, value);
        canvas.fill_rect(r.col, r.row + used_h, used_w, r.height - used_h, value);
    }

    /// Draw a frame `width` pixels wide just outside the region.
    pub fn border<C: Canvas>(&self, canvas: &mut C, color: Rgb, width: usize) {
        let r = self.region;
        let value = canvas.encode(color.r, color.g, color.b);
        let top = r.row.saturating_sub(width);
        let left = r.col.saturating_sub(width);
        let outer_w = r.right() + width - left;

        canvas.fill_rect(left, top, outer_w, r.row - top, value);
        canvas.fill_rect(left, r.bottom(), outer_w, width, value);
        canvas.fill_rect(left, r.row, r.col - left, r.height, value);
        canvas.fill_rect(r.right(), r.row, width, r.height, value);
    }
}

/// Glyphs for tests: a cell of 8x4 pixels where every visible character
/// is a vertical bar at column `ch % 3`.
#[cfg(test)]
pub(crate) struct TestGlyphs {
    cache: HashMap<char, Vec<u8>>,
}

#[cfg(test)]
impl TestGlyphs {
    pub(crate) const CELL: (usize, usize) = (8, 4);

    pub(crate) fn new() -> Self {
        Self {
            cache: HashMap::new(),
        }
    }
}

#[cfg(test)]
impl Glyphs for TestGlyphs {
    fn cell_size(&self) -> (usize, usize) {
        Self::CELL
    }

    fn glyph(&mut self, ch: char) -> &[u8] {
        self.cache.entry(ch).or_insert_with(|| {
            let (h, w) = Self::CELL;
            let mut out = vec![0u8; h * w];
            if ch != ' ' {
                let x = ch as usize % 3;
                for y in 1..h - 1 {
                    out[y * w + x] = 255;
                }
            }
            out
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fbpad_fb::{MemoryCanvas, PixelFormat};

    const WHITE: Rgb = Rgb::new(255, 255, 255);
    const BLACK: Rgb = Rgb::new(0, 0, 0);

    fn canvas() -> MemoryCanvas {
        MemoryCanvas::new(32, 24, PixelFormat::BGRA8888, 4)
    }

    #[test]
    fn test_put_draws_glyph_in_cell() {
        let mut canvas = canvas();
        let mut pad = Pad::new(TestGlyphs::new(), Region::full(24, 32));
        assert_eq!((pad.rows(), pad.cols()), (3, 8));

        // 'a' is 97, a bar at column 1 of the cell.
        pad.put(&mut canvas, 'a', 1, 2, WHITE, BLACK, false);
        let white = canvas.encode(255, 255, 255);
        let black = canvas.encode(0, 0, 0);
        assert_eq!(canvas.pixel(9, 9), white);
        assert_eq!(canvas.pixel(8, 9), black);
        assert_eq!(canvas.pixel(10, 9), black);
        assert_eq!(canvas.pixel(9, 8), black);
        // Outside the cell nothing changed.
        assert_eq!(canvas.pixel(12, 9), 0);
    }

    #[test]
    fn test_bold_overstrikes() {
        let mut canvas = canvas();
        let mut pad = Pad::new(TestGlyphs::new(), Region::full(24, 32));
        pad.put(&mut canvas, 'a', 0, 0, WHITE, BLACK, true);
        let white = canvas.encode(255, 255, 255);
        assert_eq!(canvas.pixel(1, 3), white);
        assert_eq!(canvas.pixel(2, 3), white);
        assert_ne!(canvas.pixel(3, 3), white);
    }

    #[test]
    fn test_put_outside_region_is_ignored() {
        let mut canvas = canvas();
        let mut pad = Pad::new(TestGlyphs::new(), Region::new(0, 0, 8, 8));
        pad.put(&mut canvas, 'a', 1, 0, WHITE, BLACK, false);
        pad.put(&mut canvas, 'a', 0, 2, WHITE, BLACK, false);
        assert!(canvas.pixels().iter().all(|b| *b == 0));
    }

    #[test]
    fn test_border_surrounds_region() {
        let mut canvas = canvas();
        let pad = Pad::new(TestGlyphs::new(), Region::new(2, 2, 8, 12));
        pad.border(&mut canvas, Rgb::new(255, 0, 0), 2);

        let red = canvas.encode(255, 0, 0);
        assert_eq!(canvas.pixel(0, 0), red);
        assert_eq!(canvas.pixel(15, 11), red);
        assert_eq!(canvas.pixel(1, 5), red);
        assert_eq!(canvas.pixel(14, 5), red);
        // Inside and beyond the frame stay untouched.
        assert_eq!(canvas.pixel(2, 2), 0);
        assert_eq!(canvas.pixel(16, 5), 0);
        assert_eq!(canvas.pixel(5, 12), 0);
    }

    #[test]
    fn test_border_clips_at_screen_edge() {
        let mut canvas = canvas();
        let pad = Pad::new(TestGlyphs::new(), Region::full(24, 32));
        pad.border(&mut canvas, Rgb::new(255, 0, 0), 2);
        assert!(canvas.pixels().iter().all(|b| *b == 0));
    }

    #[test]
    fn test_blend() {
        assert_eq!(blend(WHITE, BLACK, 255), (255, 255, 255));
        assert_eq!(blend(WHITE, BLACK, 0), (0, 0, 0));
        assert_eq!(blend(Rgb::new(200, 0, 0), Rgb::new(0, 0, 100), 128).0, 100);
    }

    #[test]
    fn test_missing_fonts() {
        let err = Font::load(&[PathBuf::from("/nonexistent/font.ttf")], 16.0).err();
        assert!(matches!(err, Some(PadError::NoFont(_))));
        assert!(Font::from_bytes(b"not a font", 16.0).is_err());
    }
}
