use std::io::{self, Write};

use crossterm::cursor::{Hide, Show};
use crossterm::execute;
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};

/// Keeps the controlling terminal in raw mode with its text cursor hidden;
/// both are undone on drop.
pub struct RawTerminal {
    _private: (),
}

impl RawTerminal {
    pub fn enter() -> io::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        if let Err(e) = execute!(stdout, Hide) {
            let _ = disable_raw_mode();
            return Err(e);
        }
        stdout.flush()?;
        Ok(Self { _private: () })
    }
}

impl Drop for RawTerminal {
    fn drop(&mut self) {
        let mut stdout = io::stdout();
        if let Err(e) = execute!(stdout, Show) {
            log::warn!("failed to show the cursor: {e}");
        }
        if let Err(e) = disable_raw_mode() {
            log::warn!("failed to leave raw mode: {e}");
        }
    }
}
