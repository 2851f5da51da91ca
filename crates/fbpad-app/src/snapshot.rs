use std::collections::HashMap;

use fbpad_fb::Canvas;

/// A copy of the whole canvas.
struct Frame {
    width: usize,
    height: usize,
    bpp: usize,
    pixels: Vec<u8>,
}

impl Frame {
    fn matches<C: Canvas>(&self, canvas: &C) -> bool {
        self.width == canvas.width()
            && self.height == canvas.height()
            && self.bpp == canvas.bytes_per_pixel()
    }
}

/// Off-screen copies of the screen, one per terminal slot, used to show a
/// hidden terminal again without repainting every cell.
#[derive(Default)]
pub struct SnapshotStore {
    frames: HashMap<usize, Frame>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy `canvas` into the snapshot for `slot`, reusing its buffer.
    pub fn save<C: Canvas>(&mut self, slot: usize, canvas: &C) {
        let (width, height, bpp) = (canvas.width(), canvas.height(), canvas.bytes_per_pixel());
        let stride = width * bpp;
        let frame = self.frames.entry(slot).or_insert_with(|| Frame {
            width,
            height,
            bpp,
            pixels: Vec::new(),
        });
        frame.width = width;
        frame.height = height;
        frame.bpp = bpp;
        frame.pixels.resize(stride * height, 0);

        for (y, dst) in frame.pixels.chunks_exact_mut(stride.max(1)).enumerate().take(height) {
            dst.copy_from_slice(&canvas.row(y)[..stride]);
        }
        log::trace!("saved snapshot of slot {slot}");
    }

    /// Copy the snapshot for `slot` back onto `canvas`.
    ///
    /// Fails when there is none or the canvas geometry changed since.
    pub fn load<C: Canvas>(&self, slot: usize, canvas: &mut C) -> bool {
        let Some(frame) = self.frames.get(&slot) else {
            return false;
        };
        if !frame.matches(canvas) {
            log::debug!("snapshot of slot {slot} does not fit the screen");
            return false;
        }
        let stride = frame.width * frame.bpp;
        for (y, src) in frame.pixels.chunks_exact(stride.max(1)).enumerate().take(frame.height) {
            canvas.row_mut(y)[..stride].copy_from_slice(src);
        }
        true
    }

    pub fn remove(&mut self, slot: usize) {
        self.frames.remove(&slot);
    }

    pub fn contains(&self, slot: usize) -> bool {
        self.frames.contains_key(&slot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fbpad_fb::{MemoryCanvas, PixelFormat};

    fn canvas(width: usize, height: usize) -> MemoryCanvas {
        MemoryCanvas::new(width, height, PixelFormat::BGRA8888, 4)
    }

    #[test]
    fn test_save_and_load() {
        let mut screen = canvas(8, 6);
        let red = screen.encode(255, 0, 0);
        screen.fill_rect(1, 1, 3, 2, red);
        let before = screen.pixels().to_vec();

        let mut store = SnapshotStore::new();
        store.save(3, &screen);
        assert!(store.contains(3));

        screen.fill_rect(0, 0, 8, 6, 0);
        assert!(store.load(3, &mut screen));
        assert_eq!(screen.pixels(), &before[..]);
    }

    #[test]
    fn test_load_without_snapshot() {
        let store = SnapshotStore::new();
        assert!(!store.load(0, &mut canvas(4, 4)));
    }

    #[test]
    fn test_geometry_change_rejects_snapshot() {
        let mut store = SnapshotStore::new();
        store.save(0, &canvas(8, 6));
        assert!(!store.load(0, &mut canvas(6, 8)));
        assert!(!store.load(0, &mut MemoryCanvas::new(8, 6, PixelFormat::RGB565, 2)));
    }

    #[test]
    fn test_remove() {
        let mut store = SnapshotStore::new();
        let mut screen = canvas(4, 4);
        store.save(1, &screen);
        store.remove(1);
        assert!(!store.contains(1));
        assert!(!store.load(1, &mut screen));
    }

    #[test]
    fn test_save_overwrites() {
        let mut store = SnapshotStore::new();
        let mut screen = canvas(4, 4);
        store.save(0, &screen);

        let blue = screen.encode(0, 0, 255);
        screen.fill_rect(0, 0, 4, 4, blue);
        store.save(0, &screen);

        screen.fill_rect(0, 0, 4, 4, 0);
        assert!(store.load(0, &mut screen));
        assert_eq!(screen.pixel(3, 3), blue);
    }
}
