use std::os::fd::RawFd;

use fbpad_vt::VtTerminal;

use crate::multiplexer::Terminal;
use crate::pty::{PtyError, PtyHandle};

/// Size of a single PTY read.
const READ_CHUNK: usize = 4096;

/// A terminal session that pairs a PTY process with a VT terminal emulator.
///
/// Reads program output from the PTY, feeds it into the VtTerminal, and
/// writes user input back to the program. One session lives in each
/// occupied terminal slot.
pub struct TerminalSession {
    vt: VtTerminal,
    pty: PtyHandle,
    switch_signals: bool,
}

impl TerminalSession {
    /// Spawn `argv` (or the default shell when empty) at the given size.
    ///
    /// With `switch_signals`, the program receives SIGUSR1 whenever its slot
    /// is hidden and SIGUSR2 when it is shown again, so programs drawing to
    /// the framebuffer themselves can pause.
    pub fn spawn(
        argv: &[String],
        cols: u16,
        rows: u16,
        switch_signals: bool,
    ) -> Result<Self, PtyError> {
        let pty = PtyHandle::spawn(argv, cols, rows)?;
        let vt = VtTerminal::new(cols, rows);
        log::info!(
            "spawned {:?} (pid {:?}) at {cols}x{rows}",
            argv.first().map(String::as_str).unwrap_or("shell"),
            pty.pid()
        );

        Ok(Self {
            vt,
            pty,
            switch_signals,
        })
    }

    /// Descriptor to poll for output and hang-up.
    pub fn raw_fd(&self) -> Option<RawFd> {
        self.pty.raw_fd()
    }

    /// Read one chunk of program output into the emulator.
    ///
    /// Call only after the descriptor was reported readable. Returns the
    /// byte count; zero means the program side closed.
    pub fn process_pty_output(&mut self) -> Result<usize, PtyError> {
        let mut buf = [0u8; READ_CHUNK];
        let n = self.pty.read(&mut buf)?;

        if n > 0 {
            self.vt.write(&buf[..n]);
            self.send_replies()?;
        }

        Ok(n)
    }

    /// Answer status queries the program made in its last output.
    fn send_replies(&mut self) -> Result<(), PtyError> {
        let replies = self.vt.take_replies();
        if !replies.is_empty() {
            self.pty.write(&replies)?;
        }
        Ok(())
    }
}

impl Terminal for TerminalSession {
    fn vt(&self) -> &VtTerminal {
        &self.vt
    }

    fn vt_mut(&mut self) -> &mut VtTerminal {
        &mut self.vt
    }

    fn resize(&mut self, cols: u16, rows: u16) -> Result<(), PtyError> {
        self.pty.resize(cols, rows)?;
        self.vt.resize(cols, rows);
        Ok(())
    }

    fn write_input(&mut self, data: &[u8]) -> Result<(), PtyError> {
        self.pty.write(data)
    }

    fn set_shown(&mut self, shown: bool) {
        if self.switch_signals {
            self.pty
                .signal(if shown { libc::SIGUSR2 } else { libc::SIGUSR1 });
        }
    }
}
