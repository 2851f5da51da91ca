use std::io::{Read, Write};
use std::os::fd::RawFd;

use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, PtySize};

/// Terminal type advertised to spawned programs.
const TERM_NAME: &str = "xterm-256color";

#[derive(Debug, thiserror::Error)]
pub enum PtyError {
    #[error("cannot open a pseudo-terminal: {0}")]
    Open(String),
    #[error("cannot start {program}: {reason}")]
    SpawnFailed { program: String, reason: String },
    #[error("PTY I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("PTY resize failed: {0}")]
    ResizeFailed(String),
}

fn pty_size(cols: u16, rows: u16) -> PtySize {
    PtySize {
        rows,
        cols,
        pixel_width: 0,
        pixel_height: 0,
    }
}

/// The master side of a pseudo-terminal and the program running on it.
pub struct PtyHandle {
    master: Box<dyn MasterPty + Send>,
    reader: Box<dyn Read + Send>,
    writer: Box<dyn Write + Send>,
    child: Box<dyn Child + Send + Sync>,
}

impl PtyHandle {
    /// Start `argv` on a new `cols` x `rows` pseudo-terminal; an empty
    /// `argv` starts the default shell.
    pub fn spawn(argv: &[String], cols: u16, rows: u16) -> Result<Self, PtyError> {
        let pair = native_pty_system()
            .openpty(pty_size(cols, rows))
            .map_err(|e| PtyError::Open(e.to_string()))?;

        let program = argv.first().cloned().unwrap_or_else(default_shell);
        let spawn_err = |reason: String| PtyError::SpawnFailed {
            program: program.clone(),
            reason,
        };

        let mut cmd = CommandBuilder::new(&program);
        cmd.args(argv.iter().skip(1));
        cmd.env("TERM", TERM_NAME);
        if let Ok(cwd) = std::env::current_dir() {
            cmd.cwd(cwd);
        }

        let child = pair
            .slave
            .spawn_command(cmd)
            .map_err(|e| spawn_err(e.to_string()))?;
        let reader = pair
            .master
            .try_clone_reader()
            .map_err(|e| spawn_err(format!("no reader: {e}")))?;
        let writer = pair
            .master
            .take_writer()
            .map_err(|e| spawn_err(format!("no writer: {e}")))?;

        Ok(Self {
            master: pair.master,
            reader,
            writer,
            child,
        })
    }

    pub fn resize(&self, cols: u16, rows: u16) -> Result<(), PtyError> {
        self.master
            .resize(pty_size(cols, rows))
            .map_err(|e| PtyError::ResizeFailed(e.to_string()))
    }

    /// Send keyboard input to the program.
    pub fn write(&mut self, data: &[u8]) -> Result<(), PtyError> {
        self.writer.write_all(data)?;
        self.writer.flush()?;
        Ok(())
    }

    /// Read program output. Blocks unless `poll(2)` reported the master
    /// readable.
    pub fn read(&mut self, buf: &mut [u8]) -> Result<usize, PtyError> {
        Ok(self.reader.read(buf)?)
    }

    /// Descriptor of the master side, for `poll(2)`.
    pub fn raw_fd(&self) -> Option<RawFd> {
        self.master.as_raw_fd()
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.process_id()
    }

    /// Deliver `signal` to the spawned program's process group.
    ///
    /// The child leads its own session, so its pid is also its group id.
    pub fn signal(&self, signal: libc::c_int) {
        if let Some(pid) = self.pid() {
            // SAFETY: kill(2) has no memory-safety preconditions.
            if unsafe { libc::kill(-(pid as libc::pid_t), signal) } < 0 {
                log::debug!(
                    "signal {signal} to pid {pid} failed: {}",
                    std::io::Error::last_os_error()
                );
            }
        }
    }
}

/// `$SHELL`, or `/bin/sh` when unset.
pub fn default_shell() -> String {
    std::env::var("SHELL")
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "/bin/sh".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn argv(args: &[&str]) -> Vec<String> {
        args.iter().map(|s| s.to_string()).collect()
    }

    /// Read until `needle` shows up, the program exits or time runs out.
    fn read_until(handle: &mut PtyHandle, needle: &str) -> String {
        let deadline = Instant::now() + Duration::from_secs(5);
        let mut output = Vec::new();
        let mut buf = [0u8; 4096];
        while Instant::now() < deadline {
            match handle.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => output.extend_from_slice(&buf[..n]),
            }
            if String::from_utf8_lossy(&output).contains(needle) {
                break;
            }
        }
        String::from_utf8_lossy(&output).into_owned()
    }

    #[test]
    fn test_spawn_pty() {
        let handle = PtyHandle::spawn(&argv(&["/bin/sh"]), 80, 24).unwrap();
        assert!(handle.pid().is_some());
        assert!(handle.raw_fd().is_some());
    }

    #[test]
    fn test_write_read_echo() {
        let mut handle = PtyHandle::spawn(&argv(&["/bin/sh"]), 80, 24).unwrap();
        handle.write(b"echo FBPAD_$((40+2))\n").unwrap();
        let text = read_until(&mut handle, "FBPAD_42");
        assert!(text.contains("FBPAD_42"), "got: {text}");
    }

    #[test]
    fn test_spawn_with_arguments() {
        let mut handle =
            PtyHandle::spawn(&argv(&["/bin/sh", "-c", "echo ARGS_$((1+2))"]), 80, 24).unwrap();
        assert!(read_until(&mut handle, "ARGS_3").contains("ARGS_3"));
    }

    #[test]
    fn test_term_is_advertised() {
        let mut handle =
            PtyHandle::spawn(&argv(&["/bin/sh", "-c", "echo TERM=$TERM."]), 80, 24).unwrap();
        let text = read_until(&mut handle, "256color.");
        assert!(text.contains("TERM=xterm-256color."), "got: {text}");
    }

    #[test]
    fn test_size_is_applied() {
        let mut handle =
            PtyHandle::spawn(&argv(&["/bin/sh", "-c", "stty size; sleep 1"]), 77, 21).unwrap();
        assert!(read_until(&mut handle, "21 77").contains("21 77"));
        handle.resize(120, 40).unwrap();
    }

    #[test]
    fn test_missing_program() {
        let result = PtyHandle::spawn(&argv(&["/nonexistent/fbpad-test"]), 80, 24);
        if let Err(e) = result {
            assert!(e.to_string().contains("/nonexistent/fbpad-test"));
        }
    }
}
