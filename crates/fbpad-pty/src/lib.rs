//! fbpad-pty: terminal sessions and the session multiplexer for fbpad.
//!
//! This crate sits between the PTY (the real program) and the VT terminal
//! (screen state), and decides which terminals are on screen.
//!
//! # Architecture
//!
//! - [`PtyHandle`]: low-level PTY process management (spawn, read, write,
//!   resize, signal).
//! - [`TerminalSession`]: pairs a `PtyHandle` with a `VtTerminal`; one per
//!   occupied slot.
//! - [`Multiplexer`]: tags, their two slots each, split layouts, snapshots
//!   and locking, painting through a [`Screen`].

pub mod layout;
pub mod lock;
pub mod multiplexer;
pub mod pty;
pub mod session;
pub mod slot;

pub use layout::{region_for, Region, BORDER_WIDTH};
pub use lock::ScreenLock;
pub use multiplexer::{MuxError, MuxOptions, Multiplexer, Screen, Terminal};
pub use pty::{default_shell, PtyError, PtyHandle};
pub use session::TerminalSession;
pub use slot::{Role, SlotId, SplitMode, Tag, TagState};
