//! fbpad-vt: Terminal emulation engine for fbpad.
//!
//! Wraps `alacritty_terminal` to parse PTY output, keep the cell grid and
//! scrollback, and hand out cell data, cursor state and damage so the pad
//! renderer can repaint only what changed.

pub mod cell;
pub mod color;
pub mod screen;
pub mod terminal;

pub use cell::{CellFlags, VtCell};
pub use color::{Rgb, DEFAULT_BG, DEFAULT_FG};
pub use screen::{CursorShape, CursorState, DamageInfo, DamagedRow, ScreenView};
pub use terminal::VtTerminal;
