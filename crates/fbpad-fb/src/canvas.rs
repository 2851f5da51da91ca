use crate::format::PixelFormat;

/// A pixel surface addressed by scanline.
///
/// Implemented by the memory-mapped [`Framebuffer`](crate::Framebuffer) and by
/// [`MemoryCanvas`], so everything above the driver can run against either.
pub trait Canvas {
    /// Visible width in pixels.
    fn width(&self) -> usize;

    /// Visible height in pixels.
    fn height(&self) -> usize;

    /// Bytes used by one pixel.
    fn bytes_per_pixel(&self) -> usize;

    /// Channel layout used by [`encode`](Self::encode).
    fn format(&self) -> &PixelFormat;

    /// Scanline `y`, `width() * bytes_per_pixel()` bytes long.
    fn row(&self, y: usize) -> &[u8];

    /// Mutable scanline `y`.
    fn row_mut(&mut self, y: usize) -> &mut [u8];

    /// Encode an 8-bit RGB color as a device pixel value.
    fn encode(&self, r: u8, g: u8, b: u8) -> u32 {
        self.format().encode(r, g, b)
    }

    /// Fill a rectangle with an encoded pixel value, clipped to the canvas.
    fn fill_rect(&mut self, x: usize, y: usize, width: usize, height: usize, value: u32) {
        let bpp = self.bytes_per_pixel();
        let x_end = (x + width).min(self.width());
        let y_end = (y + height).min(self.height());
        if x >= x_end {
            return;
        }
        let bytes = value.to_le_bytes();
        for row in y..y_end {
            let line = self.row_mut(row);
            for px in line[x * bpp..x_end * bpp].chunks_exact_mut(bpp) {
                px.copy_from_slice(&bytes[..bpp]);
            }
        }
    }

    /// Read the encoded pixel value at (x, y).
    fn pixel(&self, x: usize, y: usize) -> u32 {
        let bpp = self.bytes_per_pixel();
        let mut bytes = [0u8; 4];
        bytes[..bpp].copy_from_slice(&self.row(y)[x * bpp..(x + 1) * bpp]);
        u32::from_le_bytes(bytes)
    }
}

/// Write one encoded pixel into a pixel-sized slice.
pub fn store_pixel(dst: &mut [u8], value: u32) {
    let bytes = value.to_le_bytes();
    let n = dst.len().min(4);
    dst[..n].copy_from_slice(&bytes[..n]);
}

/// A heap-backed canvas with no device behind it.
#[derive(Clone, Debug)]
pub struct MemoryCanvas {
    width: usize,
    height: usize,
    bpp: usize,
    format: PixelFormat,
    pixels: Vec<u8>,
}

impl MemoryCanvas {
    pub fn new(width: usize, height: usize, format: PixelFormat, bytes_per_pixel: usize) -> Self {
        let bpp = bytes_per_pixel.clamp(1, 4);
        Self {
            width,
            height,
            bpp,
            format,
            pixels: vec![0; width * height * bpp],
        }
    }

    /// Raw pixel memory, row-major without padding.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }
}

impl Canvas for MemoryCanvas {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn bytes_per_pixel(&self) -> usize {
        self.bpp
    }

    fn format(&self) -> &PixelFormat {
        &self.format
    }

    fn row(&self, y: usize) -> &[u8] {
        let stride = self.width * self.bpp;
        &self.pixels[y * stride..(y + 1) * stride]
    }

    fn row_mut(&mut self, y: usize) -> &mut [u8] {
        let stride = self.width * self.bpp;
        &mut self.pixels[y * stride..(y + 1) * stride]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_rect_clips() {
        let mut canvas = MemoryCanvas::new(4, 3, PixelFormat::BGRA8888, 4);
        let red = canvas.encode(255, 0, 0);
        canvas.fill_rect(2, 1, 10, 10, red);

        assert_eq!(canvas.pixel(1, 1), 0);
        assert_eq!(canvas.pixel(2, 1), red);
        assert_eq!(canvas.pixel(3, 2), red);
        assert_eq!(canvas.pixel(3, 0), 0);
    }

    #[test]
    fn test_three_byte_pixels() {
        let fmt: PixelFormat = "8/16,8/8,8/0,0/0".parse().unwrap();
        let mut canvas = MemoryCanvas::new(2, 1, fmt, 3);
        let v = canvas.encode(0x12, 0x34, 0x56);
        canvas.fill_rect(1, 0, 1, 1, v);

        assert_eq!(canvas.row(0), &[0, 0, 0, 0x56, 0x34, 0x12]);
        assert_eq!(canvas.pixel(1, 0), 0x12_3456);
    }
}
