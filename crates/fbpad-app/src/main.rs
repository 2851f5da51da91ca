mod cli;
mod config;
mod display;
mod event_loop;
mod input;
mod pad;
mod reaper;
mod snapshot;
mod tty;

use std::ffi::OsString;
use std::fs::OpenOptions;

use anyhow::Context;
use clap::Parser;
use fbpad_fb::Framebuffer;
use fbpad_pty::Multiplexer;
use simplelog::{ColorChoice, LevelFilter, TermLogger, TerminalMode, WriteLogger};

use cli::Cli;
use config::Config;
use display::Display;
use event_loop::EventLoop;
use pad::Font;
use tty::RawTerminal;

fn main() {
    std::process::exit(launch(std::env::args_os(), run));
}

/// Parse `args` and hand the result to `start`, returning the exit status.
///
/// Bad arguments are reported before `start` runs, so the device is never
/// touched for a usage error.
fn launch<I, T, F>(args: I, start: F) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
    F: FnOnce(Cli) -> anyhow::Result<()>,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() { 1 } else { 0 };
        }
    };
    match start(cli) {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("fbpad: {e:#}");
            1
        }
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load().context("failed to load configuration")?;
    init_logging(&cli, &config)?;

    let spec = config
        .device_spec()
        .context("invalid framebuffer device")?;
    let fb = Framebuffer::open(&spec, cli.rgba).context("failed to initialize the framebuffer")?;
    if cli.verbose {
        eprintln!("fbpad: {}", fb.describe());
    }

    let font = Font::load(&config.fonts, config.font_size).context("failed to load a font")?;
    let display = Display::new(fb, font);
    let mux = Multiplexer::new(config.mux_options(), display).context("invalid tags")?;

    reaper::install().context("failed to install the SIGCHLD handler")?;
    let _raw = RawTerminal::enter().context("failed to put the terminal in raw mode")?;

    let mut event_loop = EventLoop::new(mux, config);
    event_loop.start(&cli.command)?;
    event_loop.run()
}

/// `-v` logs to stderr; otherwise only a configured log file gets records.
fn init_logging(cli: &Cli, config: &Config) -> anyhow::Result<()> {
    let log_config = simplelog::Config::default();
    if cli.verbose {
        TermLogger::init(
            LevelFilter::Debug,
            log_config,
            TerminalMode::Stderr,
            ColorChoice::Auto,
        )
        .context("failed to initialize logging")?;
    } else if let Some(path) = &config.log_file {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open log file {}", path.display()))?;
        WriteLogger::init(LevelFilter::Info, log_config, file)
            .context("failed to initialize logging")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fbpad_fb::DeviceSpec;

    #[test]
    fn test_usage_error_never_starts() {
        let mut started = false;
        let status = launch(["fbpad", "--rgba", "8/0,8/8,8/16"], |_| {
            started = true;
            Ok(())
        });
        assert_eq!(status, 1);
        assert!(!started);

        let status = launch(["fbpad", "--bogus"], |_| {
            started = true;
            Ok(())
        });
        assert_eq!(status, 1);
        assert!(!started);
    }

    #[test]
    fn test_help_exits_zero_without_starting() {
        let mut started = false;
        let status = launch(["fbpad", "--help"], |_| {
            started = true;
            Ok(())
        });
        assert_eq!(status, 0);
        assert!(!started);
    }

    #[test]
    fn test_init_failure_exits_one() {
        let mut tried = false;
        let status = launch(["fbpad", "-v", "/bin/true"], |cli| {
            assert_eq!(cli.command, ["/bin/true"]);
            tried = true;
            let spec = DeviceSpec::new("/nonexistent/fb9");
            Framebuffer::open(&spec, cli.rgba).context("failed to initialize the framebuffer")?;
            Ok(())
        });
        assert_eq!(status, 1);
        assert!(tried);
    }

    #[test]
    fn test_clean_start_exits_zero() {
        assert_eq!(launch(["fbpad"], |_| Ok(())), 0);
    }
}
