use clap::Parser;
use fbpad_fb::PixelFormat;

const FORMAT_HELP: &str = "\
Normally the pixel format is read with the FBIOGET_VSCREENINFO ioctl, but it may lie.
Override it with --rgba, where FORMAT is the same as printed by fbset:

  Rl/Ro,Gl/Go,Bl/Bo,Al/Ao
  Rl, Gl, Bl, Al - length in bits of the red, green, blue, alpha component
  Ro, Go, Bo, Ao - offset in bits of the red, green, blue, alpha component
  0/0 means the component is not used (e.g. alpha)
  E.g. 8/0,8/8,8/16,8/24 - pixels are 4-byte sequences of RGBA
       8/16,8/8,8/0,8/24 - pixels are 4-byte sequences of BGRA
       8/16,8/8,8/0,0/0  - pixels are 3-byte sequences of BGR (depth 24)
                           or 4-byte BGRA (depth 32) with alpha ignored";

/// Framebuffer virtual terminal.
#[derive(Debug, Parser)]
#[command(name = "fbpad", version, after_help = FORMAT_HELP)]
pub struct Cli {
    /// Print diagnostic info to standard error
    #[arg(short = 'v')]
    pub verbose: bool,

    /// Override the pixel format
    #[arg(long, value_name = "FORMAT")]
    pub rgba: Option<PixelFormat>,

    /// Program to run in the first terminal instead of the shell
    #[arg(trailing_var_arg = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}
