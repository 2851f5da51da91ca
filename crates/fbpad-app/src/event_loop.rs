//! The single-threaded poll loop: keyboard input on stdin, program output on
//! every live terminal.

use std::fs;
use std::io;
use std::os::fd::RawFd;

use anyhow::{bail, Context};
use fbpad_pty::{Multiplexer, PtyError, Screen, SlotId, Terminal, TerminalSession};

use crate::config::Config;
use crate::input::{Command, Dispatcher, Program};

/// Poll timeout; it only bounds how long an exit request can go unnoticed.
const POLL_TIMEOUT_MS: libc::c_int = 1000;
/// Size of one keyboard read.
const INPUT_CHUNK: usize = 256;

pub struct EventLoop<S> {
    mux: Multiplexer<TerminalSession, S>,
    dispatcher: Dispatcher,
    config: Config,
    input_fd: RawFd,
}

impl<S: Screen> EventLoop<S> {
    pub fn new(mux: Multiplexer<TerminalSession, S>, config: Config) -> Self {
        Self {
            mux,
            dispatcher: Dispatcher::new(),
            config,
            input_fd: libc::STDIN_FILENO,
        }
    }

    pub fn mux(&self) -> &Multiplexer<TerminalSession, S> {
        &self.mux
    }

    /// Paint the empty screen and start `command`, or the shell when it is
    /// empty, in the first slot.
    pub fn start(&mut self, command: &[String]) -> anyhow::Result<()> {
        self.mux.redraw();
        let argv = if command.is_empty() {
            self.config.shell.clone()
        } else {
            command.to_vec()
        };
        self.spawn(&argv, false)
            .with_context(|| format!("failed to start {argv:?}"))?;
        if self.mux.live_slots().is_empty() {
            bail!("no terminal after starting {argv:?}");
        }
        Ok(())
    }

    /// Run until exit is requested or no terminal is left.
    pub fn run(&mut self) -> anyhow::Result<()> {
        while !self.mux.exit_requested() && !self.mux.live_slots().is_empty() {
            self.poll_once(POLL_TIMEOUT_MS).context("poll failed")?;
        }
        log::info!("leaving the event loop");
        Ok(())
    }

    /// Wait up to `timeout_ms` for input or output and handle what arrived.
    pub fn poll_once(&mut self, timeout_ms: libc::c_int) -> io::Result<()> {
        let mut fds = vec![pollfd(self.input_fd)];
        let mut polled = Vec::new();
        for slot in self.mux.live_slots() {
            if let Some(fd) = self.mux.terminal(slot).and_then(TerminalSession::raw_fd) {
                fds.push(pollfd(fd));
                polled.push(slot);
            }
        }

        // SAFETY: `fds` is a valid array of `fds.len()` pollfd structs.
        let ret = unsafe { libc::poll(fds.as_mut_ptr(), fds.len() as libc::nfds_t, timeout_ms) };
        if ret < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(());
            }
            return Err(err);
        }
        if ret == 0 {
            return Ok(());
        }

        let input = fds[0].revents;
        if input & libc::POLLIN != 0 {
            self.read_input();
        } else if input & (libc::POLLHUP | libc::POLLERR | libc::POLLNVAL) != 0 {
            log::info!("input closed");
            self.mux.request_exit();
        }

        for (pfd, slot) in fds[1..].iter().zip(polled) {
            if pfd.revents == 0 || !self.mux.is_live(slot) {
                continue;
            }
            if pfd.revents & libc::POLLIN != 0 {
                self.handle_output(slot);
            } else {
                self.mux.close(slot);
            }
        }
        Ok(())
    }

    fn read_input(&mut self) {
        let mut buf = [0u8; INPUT_CHUNK];
        // SAFETY: `buf` is valid for writes of its whole length.
        let n = unsafe { libc::read(self.input_fd, buf.as_mut_ptr().cast(), buf.len()) };
        match n {
            0 => {
                log::info!("end of input");
                self.mux.request_exit();
            }
            n if n > 0 => self.handle_input(&buf[..n as usize]),
            _ => {
                let err = io::Error::last_os_error();
                if !matches!(
                    err.kind(),
                    io::ErrorKind::Interrupted | io::ErrorKind::WouldBlock
                ) {
                    log::warn!("reading input failed: {err}");
                    self.mux.request_exit();
                }
            }
        }
    }

    /// Feed keyboard bytes through the screen lock or the dispatcher.
    pub fn handle_input(&mut self, bytes: &[u8]) {
        for &byte in bytes {
            if self.mux.is_locked() {
                self.mux.feed_lock(byte);
                continue;
            }
            if let Some(command) = self.dispatcher.feed(byte, &self.config.tags) {
                self.apply(command);
            }
        }
    }

    fn handle_output(&mut self, slot: SlotId) {
        let Some(term) = self.mux.terminal_mut(slot) else {
            return;
        };
        match term.process_pty_output() {
            Ok(0) => {
                self.mux.close(slot);
            }
            Ok(_) => self.mux.refresh(slot),
            Err(e) => {
                log::debug!("terminal {slot:?} read failed: {e}");
                self.mux.close(slot);
            }
        }
    }

    fn apply(&mut self, command: Command) {
        log::trace!("command {command:?}");
        match command {
            Command::Spawn(program) => self.spawn_program(program),
            Command::ToggleSlot => {
                self.mux.toggle_slot();
            }
            Command::LastTag => {
                self.mux.switch_to_last();
            }
            Command::ListTags => self.mux.list_tags(),
            Command::NextTerminal => {
                self.mux.switch_to_next();
            }
            Command::Exit => self.mux.request_exit(),
            Command::Screenshot => self.screenshot(),
            Command::Redraw => self.mux.redraw(),
            Command::Lock => self.mux.lock_screen(),
            Command::ToggleTagLock => self.mux.toggle_tag_lock(),
            Command::ScrollUp => {
                let half = i32::from(self.mux.text_rows() / 2);
                self.mux.scroll(half);
            }
            Command::ScrollDown => {
                let half = i32::from(self.mux.text_rows() / 2);
                self.mux.scroll(-half);
            }
            Command::ToggleSplit => self.mux.toggle_split(),
            Command::ClearSplit => self.mux.set_split(fbpad_pty::SplitMode::None),
            Command::Tag(ch) => {
                if let Some(tag) = self.mux.tag_index(ch) {
                    self.mux.switch_to(self.mux.top_slot(tag));
                }
            }
            Command::Forward(bytes) => {
                self.mux.send(&bytes);
            }
        }
    }

    fn spawn_program(&mut self, program: Program) {
        let (argv, signals) = match program {
            Program::Shell => (self.config.shell.clone(), false),
            Program::SignalledShell => (self.config.shell.clone(), true),
            Program::Mail => (self.config.mail.clone(), false),
            Program::Editor => (self.config.editor.clone(), false),
        };
        if let Err(e) = self.spawn(&argv, signals) {
            log::error!("failed to start {argv:?}: {e}");
        }
    }

    fn spawn(&mut self, argv: &[String], signals: bool) -> Result<bool, PtyError> {
        self.mux
            .spawn(|cols, rows| TerminalSession::spawn(argv, cols, rows, signals))
    }

    /// Write the active terminal's visible text to the screenshot file.
    fn screenshot(&self) {
        let Some(term) = self.mux.current_terminal() else {
            return;
        };
        let path = &self.config.screenshot;
        match fs::write(path, term.vt().text()) {
            Ok(()) => log::info!("screenshot written to {}", path.display()),
            Err(e) => log::warn!("screenshot to {} failed: {e}", path.display()),
        }
    }
}

fn pollfd(fd: RawFd) -> libc::pollfd {
    libc::pollfd {
        fd,
        events: libc::POLLIN,
        revents: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::Display;
    use crate::pad::TestGlyphs;
    use fbpad_fb::{Canvas, MemoryCanvas, PixelFormat};
    use fbpad_pty::TagState;
    use std::time::{Duration, Instant};

    type TestLoop = EventLoop<Display<MemoryCanvas, TestGlyphs>>;

    fn event_loop(config: Config) -> TestLoop {
        let display = Display::new(
            MemoryCanvas::new(320, 240, PixelFormat::BGRA8888, 4),
            TestGlyphs::new(),
        );
        let mux = Multiplexer::new(config.mux_options(), display).unwrap();
        let mut el = EventLoop::new(mux, config);
        // Tests never read the real stdin; poll skips negative descriptors.
        el.input_fd = -1;
        el
    }

    fn config() -> Config {
        Config {
            shell: vec!["/bin/sh".to_string()],
            ..Config::default()
        }
    }

    fn started() -> TestLoop {
        let mut el = event_loop(config());
        el.start(&[]).unwrap();
        el
    }

    #[test]
    fn test_start_spawns_shell_full_screen() {
        let el = started();
        let mux = el.mux();
        assert_eq!(mux.current_slot(), SlotId::primary(0));
        assert_eq!(mux.tag_state(0), TagState::SingleFullscreen);
        let screen = mux.current_terminal().unwrap().vt().screen();
        assert_eq!((screen.cols(), screen.rows()), (80, 30));
    }

    #[test]
    fn test_start_failure() {
        let mut empty = event_loop(Config {
            shell: vec!["/nonexistent/fbpad-shell".to_string()],
            ..Config::default()
        });
        // Whether the failure shows at spawn time or as an early exit, the
        // loop must not keep running without a terminal.
        if empty.start(&[]).is_ok() {
            let deadline = Instant::now() + Duration::from_secs(5);
            while Instant::now() < deadline && !empty.mux().exit_requested() {
                empty.poll_once(100).unwrap();
            }
            assert!(empty.mux().exit_requested());
        }
    }

    #[test]
    fn test_next_terminal_with_one_live_is_noop() {
        let mut el = started();
        let before = el.mux().screen().canvas().pixels().to_vec();
        el.handle_input(b"\x1b\t");
        assert_eq!(el.mux().current_slot(), SlotId::primary(0));
        assert_eq!(el.mux().screen().canvas().pixels(), &before[..]);
    }

    #[test]
    fn test_split_then_spawn_partner() {
        let mut el = started();
        el.handle_input(b"\x1b=\x1bj\x1bc");

        let mux = el.mux();
        assert_eq!(mux.tag_state(0), TagState::SplitHorizontal);
        assert_eq!(mux.current_slot(), SlotId::secondary(0));
        assert!(mux.is_live(SlotId::primary(0)));
        assert!(mux.is_live(SlotId::secondary(0)));

        let canvas = mux.screen().canvas();
        let red = canvas.encode(255, 0, 0);
        let bottom = mux.region(SlotId::secondary(0));
        assert_eq!(canvas.pixel(100, bottom.row - 1), red);
    }

    #[test]
    fn test_tag_commands() {
        let mut el = started();
        el.handle_input(b"\x1bn");
        assert_eq!(el.mux().current_tag(), 1);
        el.handle_input(b"\x1bo");
        assert_eq!(el.mux().current_tag(), 0);

        el.handle_input(b"\x1b\x0f\x1bn");
        assert_eq!(el.mux().current_tag(), 0);
        assert!(el.mux().tag_lock_enabled());
    }

    #[test]
    fn test_lock_swallows_input() {
        let mut el = event_loop(Config {
            passphrase: Some("pw".to_string()),
            ..config()
        });
        el.start(&[]).unwrap();

        el.handle_input(b"\x1b\x0c");
        assert!(el.mux().is_locked());
        el.handle_input(b"\x1bnls\r");
        assert!(el.mux().is_locked());
        assert_eq!(el.mux().current_tag(), 0);

        el.handle_input(b"pw\r");
        assert!(!el.mux().is_locked());
    }

    #[test]
    fn test_exit_command() {
        let mut el = started();
        el.handle_input(b"\x1b\x11");
        assert!(el.mux().exit_requested());
    }

    #[test]
    fn test_screenshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scr");
        let mut el = event_loop(Config {
            screenshot: path.clone(),
            ..config()
        });
        el.start(&[]).unwrap();

        el.handle_input(b"\x1bs");
        let text = fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 30);
    }

    #[test]
    fn test_output_is_painted_and_exit_closes() {
        let mut el = event_loop(config());
        let argv: Vec<String> = ["/bin/sh", "-c", "echo READY_$((6*7)); sleep 1"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        el.start(&argv).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline && !el.mux().exit_requested() {
            if let Some(term) = el.mux().current_terminal() {
                if term.vt().text().contains("READY_42") {
                    break;
                }
            }
            el.poll_once(100).unwrap();
        }
        let seen = el
            .mux()
            .current_terminal()
            .map(|t| t.vt().text().contains("READY_42"));
        assert_eq!(seen, Some(true));

        // The program ends; its slot closes and the loop is asked to stop.
        let deadline = Instant::now() + Duration::from_secs(5);
        while Instant::now() < deadline && !el.mux().exit_requested() {
            el.poll_once(100).unwrap();
        }
        assert!(el.mux().exit_requested());
        assert!(el.mux().live_slots().is_empty());
    }
}
