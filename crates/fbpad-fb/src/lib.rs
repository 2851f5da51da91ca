//! fbpad-fb: Linux framebuffer access for fbpad.
//!
//! Opens a framebuffer device (or a sub-window of it), maps its memory and
//! encodes colors into the device's pixel layout. Everything above this crate
//! draws through the [`Canvas`] trait, so it can run against an in-memory
//! [`MemoryCanvas`] as well as real hardware.

pub mod canvas;
pub mod device;
pub mod error;
mod ffi;
pub mod format;
pub mod framebuffer;

pub use canvas::{Canvas, MemoryCanvas};
pub use device::{DeviceSpec, SubWindow, DEFAULT_DEVICE};
pub use error::FbError;
pub use format::{Channel, PixelFormat};
pub use framebuffer::Framebuffer;
