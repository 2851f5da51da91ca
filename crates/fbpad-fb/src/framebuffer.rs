use std::fs::{File, OpenOptions};
use std::io;
use std::os::fd::AsRawFd;
use std::ptr;

use crate::canvas::Canvas;
use crate::device::{DeviceSpec, SubWindow};
use crate::error::FbError;
use crate::ffi::{self, FbCmap, FbFixScreeninfo, FbVarScreeninfo};
use crate::format::{Channel, PixelFormat};

/// Largest palette the driver saves or installs.
const MAX_LEVELS: usize = 256;

/// A memory-mapped Linux framebuffer device.
///
/// Dropping the framebuffer restores the palette it replaced, unmaps the
/// device memory and closes the device.
pub struct Framebuffer {
    file: File,
    map: *mut u8,
    len: usize,
    var: FbVarScreeninfo,
    fix: FbFixScreeninfo,
    bpp: usize,
    format: PixelFormat,
    window: Option<SubWindow>,
    saved_palette: Option<Palette>,
}

impl Framebuffer {
    /// Open and map the device.
    ///
    /// `format` overrides the channel layout reported by the driver, which is
    /// sometimes wrong. The descriptor is close-on-exec, so shells spawned
    /// later never inherit it.
    pub fn open(spec: &DeviceSpec, format: Option<PixelFormat>) -> Result<Self, FbError> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&spec.path)
            .map_err(|source| FbError::Open {
                path: spec.path.clone(),
                source,
            })?;
        let fd = file.as_raw_fd();

        let mut var = FbVarScreeninfo::default();
        // SAFETY: `var` matches the kernel's fb_var_screeninfo layout.
        let ret = unsafe {
            libc::ioctl(fd, ffi::FBIOGET_VSCREENINFO as _, &mut var as *mut FbVarScreeninfo)
        };
        if ret < 0 {
            return Err(FbError::Query {
                request: "FBIOGET_VSCREENINFO",
                source: io::Error::last_os_error(),
            });
        }
        log::debug!(
            "fb_var_screeninfo: {}x{} (virtual {}x{}, offset {}+{}), {} bpp, \
             red {}/{} green {}/{} blue {}/{} alpha {}/{}",
            var.xres,
            var.yres,
            var.xres_virtual,
            var.yres_virtual,
            var.xoffset,
            var.yoffset,
            var.bits_per_pixel,
            var.red.length,
            var.red.offset,
            var.green.length,
            var.green.offset,
            var.blue.length,
            var.blue.offset,
            var.transp.length,
            var.transp.offset,
        );

        let mut fix = FbFixScreeninfo::default();
        // SAFETY: `fix` matches the kernel's fb_fix_screeninfo layout.
        let ret = unsafe {
            libc::ioctl(fd, ffi::FBIOGET_FSCREENINFO as _, &mut fix as *mut FbFixScreeninfo)
        };
        if ret < 0 {
            return Err(FbError::Query {
                request: "FBIOGET_FSCREENINFO",
                source: io::Error::last_os_error(),
            });
        }
        log::debug!(
            "fb_fix_screeninfo: type {}, visual {}, line_length {}",
            fix.type_,
            fix.visual,
            fix.line_length
        );

        let bpp = (var.bits_per_pixel as usize).div_ceil(8).clamp(1, 4);
        let len = fix.line_length as usize * var.yres_virtual as usize;
        check_window(&var, &fix, bpp, len, spec.window)?;

        // SAFETY: mapping a device we hold open; the result is checked below.
        let map = unsafe {
            libc::mmap(
                ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                fd,
                0,
            )
        };
        if map == libc::MAP_FAILED {
            return Err(FbError::Map {
                len,
                source: io::Error::last_os_error(),
            });
        }

        let format = format.unwrap_or(PixelFormat {
            red: Channel::new(var.red.length, var.red.offset),
            green: Channel::new(var.green.length, var.green.offset),
            blue: Channel::new(var.blue.length, var.blue.offset),
            alpha: Channel::new(var.transp.length, var.transp.offset),
        });

        let mut fb = Self {
            file,
            map: map as *mut u8,
            len,
            var,
            fix,
            bpp,
            format,
            window: spec.window,
            saved_palette: None,
        };
        fb.install_palette();
        log::info!("framebuffer {} ready: {}", spec, fb.describe());
        Ok(fb)
    }

    /// Device geometry as one line of text.
    pub fn describe(&self) -> String {
        format!(
            "{}x{} of {}x{} (virtual {}x{}), {} bytes/pixel, line {} bytes, format {}",
            self.width(),
            self.height(),
            self.var.xres,
            self.var.yres,
            self.var.xres_virtual,
            self.var.yres_virtual,
            self.bpp,
            self.fix.line_length,
            self.format
        )
    }

    /// Byte offset of scanline `row` inside the mapping, relative to the
    /// sub-window origin and the driver's pan offset.
    pub fn row_offset(&self, row: usize) -> usize {
        scanline_offset(&self.var, self.fix.line_length, self.bpp, self.window, row)
    }

    /// Whether the device uses an indexed (palette) visual.
    pub fn is_indexed(&self) -> bool {
        self.fix.visual != ffi::FB_VISUAL_TRUECOLOR
    }

    fn palette_len(&self) -> usize {
        let f = &self.format;
        f.red
            .levels()
            .max(f.green.levels())
            .max(f.blue.levels())
            .min(MAX_LEVELS)
    }

    /// Save the current palette and install a linear ramp.
    fn install_palette(&mut self) {
        if !self.is_indexed() {
            return;
        }
        let len = self.palette_len();
        let mut saved = Palette::zeroed(len);
        if let Err(e) = saved.ioctl(self.file.as_raw_fd(), ffi::FBIOGETCMAP) {
            log::warn!("failed to read the palette: {e}");
            return;
        }
        self.saved_palette = Some(saved);

        let mut ramp = Palette::linear(len, &self.format);
        if let Err(e) = ramp.ioctl(self.file.as_raw_fd(), ffi::FBIOPUTCMAP) {
            log::warn!("failed to install the palette: {e}");
        }
    }

    fn restore_palette(&mut self) {
        if let Some(mut palette) = self.saved_palette.take() {
            if let Err(e) = palette.ioctl(self.file.as_raw_fd(), ffi::FBIOPUTCMAP) {
                log::warn!("failed to restore the palette: {e}");
            }
        }
    }
}

impl Canvas for Framebuffer {
    fn width(&self) -> usize {
        self.window.map_or(self.var.xres, |w| w.width) as usize
    }

    fn height(&self) -> usize {
        self.window.map_or(self.var.yres, |w| w.height) as usize
    }

    fn bytes_per_pixel(&self) -> usize {
        self.bpp
    }

    fn format(&self) -> &PixelFormat {
        &self.format
    }

    fn row(&self, y: usize) -> &[u8] {
        let start = self.row_offset(y);
        let n = self.width() * self.bpp;
        assert!(y < self.height() && start + n <= self.len);
        // SAFETY: bounds checked against the mapping; `check_window` ensured
        // every visible row of the window lies inside it.
        unsafe { std::slice::from_raw_parts(self.map.add(start), n) }
    }

    fn row_mut(&mut self, y: usize) -> &mut [u8] {
        let start = self.row_offset(y);
        let n = self.width() * self.bpp;
        assert!(y < self.height() && start + n <= self.len);
        // SAFETY: as in `row`; `&mut self` guarantees exclusive access.
        unsafe { std::slice::from_raw_parts_mut(self.map.add(start), n) }
    }
}

impl Drop for Framebuffer {
    fn drop(&mut self) {
        self.restore_palette();
        // SAFETY: `map`/`len` came from a successful mmap and are unmapped once.
        unsafe {
            libc::munmap(self.map as *mut libc::c_void, self.len);
        }
        log::debug!("framebuffer released");
    }
}

fn scanline_offset(
    var: &FbVarScreeninfo,
    line_length: u32,
    bpp: usize,
    window: Option<SubWindow>,
    row: usize,
) -> usize {
    let (x, y) = window.map_or((0, 0), |w| (w.x as usize, w.y as usize));
    (row + var.yoffset as usize + y) * line_length as usize + (var.xoffset as usize + x) * bpp
}

/// Reject sub-windows that reach past the mapped memory.
fn check_window(
    var: &FbVarScreeninfo,
    fix: &FbFixScreeninfo,
    bpp: usize,
    len: usize,
    window: Option<SubWindow>,
) -> Result<(), FbError> {
    let Some(w) = window else {
        return Ok(());
    };
    // Summed in u64 so a huge window cannot wrap into range.
    let (x, y, width, height) = (
        u64::from(w.x),
        u64::from(w.y),
        u64::from(w.width),
        u64::from(w.height),
    );
    let line_length = u64::from(fix.line_length);
    let last_row = height + y + u64::from(var.yoffset);
    let row_end = (width + x + u64::from(var.xoffset)) * bpp as u64;
    let fits = x + width <= u64::from(var.xres_virtual)
        && row_end <= line_length
        && last_row.saturating_mul(line_length) <= len as u64;
    if fits {
        Ok(())
    } else {
        Err(FbError::WindowOutOfBounds {
            window: w.to_string(),
            width: var.xres_virtual,
            height: var.yres_virtual,
        })
    }
}

/// A saved or generated color map.
struct Palette {
    red: Vec<u16>,
    green: Vec<u16>,
    blue: Vec<u16>,
}

impl Palette {
    fn zeroed(len: usize) -> Self {
        Self {
            red: vec![0; len],
            green: vec![0; len],
            blue: vec![0; len],
        }
    }

    /// Evenly spaced levels per channel, sized to each channel's depth.
    fn linear(len: usize, format: &PixelFormat) -> Self {
        Self {
            red: ramp(len, format.red),
            green: ramp(len, format.green),
            blue: ramp(len, format.blue),
        }
    }

    fn ioctl(&mut self, fd: i32, request: libc::c_ulong) -> io::Result<()> {
        let mut cmap = FbCmap {
            start: 0,
            len: self.red.len() as u32,
            red: self.red.as_mut_ptr(),
            green: self.green.as_mut_ptr(),
            blue: self.blue.as_mut_ptr(),
            transp: ptr::null_mut(),
        };
        // SAFETY: the three arrays hold `len` entries each and outlive the call.
        if unsafe { libc::ioctl(fd, request as _, &mut cmap as *mut FbCmap) } < 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }
}

/// `level_i = round(65535 / (N - 1) * i)`, saturating past the last level.
fn ramp(len: usize, channel: Channel) -> Vec<u16> {
    let levels = channel.levels();
    if levels < 2 {
        return vec![0; len];
    }
    let step = 65535.0 / (levels - 1) as f64;
    (0..len)
        .map(|i| (step * i.min(levels - 1) as f64).round() as u16)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ramp_endpoints() {
        let levels = ramp(8, Channel::new(3, 5));
        assert_eq!(levels.len(), 8);
        assert_eq!(levels[0], 0);
        assert_eq!(levels[7], 65535);
        assert_eq!(levels[1], 9362);
    }

    #[test]
    fn test_ramp_saturates_short_channel() {
        let levels = ramp(8, Channel::new(2, 0));
        assert_eq!(&levels[..4], &[0, 21845, 43690, 65535]);
        assert!(levels[4..].iter().all(|&v| v == 65535));
    }

    #[test]
    fn test_ramp_unused_channel() {
        assert_eq!(ramp(4, Channel::new(0, 0)), vec![0; 4]);
    }

    #[test]
    fn test_scanline_offset() {
        let var = FbVarScreeninfo {
            xoffset: 8,
            yoffset: 768,
            ..Default::default()
        };
        assert_eq!(scanline_offset(&var, 4096, 4, None, 0), 768 * 4096 + 32);
        let window = SubWindow {
            width: 100,
            height: 100,
            x: 10,
            y: 20,
        };
        assert_eq!(
            scanline_offset(&var, 4096, 4, Some(window), 5),
            (5 + 768 + 20) * 4096 + (8 + 10) * 4
        );
    }

    #[test]
    fn test_window_must_fit() {
        let var = FbVarScreeninfo {
            xres: 1024,
            yres: 768,
            xres_virtual: 1024,
            yres_virtual: 768,
            ..Default::default()
        };
        let fix = FbFixScreeninfo {
            line_length: 4096,
            ..Default::default()
        };
        let len = 4096 * 768;
        let inside = SubWindow {
            width: 512,
            height: 384,
            x: 512,
            y: 384,
        };
        let outside = SubWindow { x: 513, ..inside };
        assert!(check_window(&var, &fix, 4, len, Some(inside)).is_ok());
        assert!(check_window(&var, &fix, 4, len, Some(outside)).is_err());
        assert!(check_window(&var, &fix, 4, len, None).is_ok());
    }

    #[test]
    fn test_huge_window_is_rejected() {
        let var = FbVarScreeninfo {
            xres: 1024,
            yres: 768,
            xres_virtual: 1024,
            yres_virtual: 768,
            ..Default::default()
        };
        let fix = FbFixScreeninfo {
            line_length: 4096,
            ..Default::default()
        };
        let len = 4096 * 768;
        for spec in ["4294967295x10+1+0", "10x4294967295+0+1", "10x10+4294967295+0"] {
            let window: SubWindow = spec.parse().unwrap();
            assert!(
                matches!(
                    check_window(&var, &fix, 4, len, Some(window)),
                    Err(FbError::WindowOutOfBounds { .. })
                ),
                "{spec}"
            );
        }
    }

    #[test]
    fn test_open_missing_device() {
        let spec = DeviceSpec::new("/nonexistent/fb9");
        match Framebuffer::open(&spec, None) {
            Err(FbError::Open { path, .. }) => assert_eq!(path, spec.path),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("opening a missing device succeeded"),
        }
    }
}
