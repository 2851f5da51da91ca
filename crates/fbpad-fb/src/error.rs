use std::io;
use std::path::PathBuf;

/// Errors raised while bringing up or describing the framebuffer.
#[derive(Debug, thiserror::Error)]
pub enum FbError {
    #[error("failed to open {path}: {source}")]
    Open { path: PathBuf, source: io::Error },
    #[error("{request} failed: {source}")]
    Query {
        request: &'static str,
        source: io::Error,
    },
    #[error("failed to map {len} bytes of framebuffer memory: {source}")]
    Map { len: usize, source: io::Error },
    #[error("sub-window {window} does not fit the {width}x{height} framebuffer")]
    WindowOutOfBounds {
        window: String,
        width: u32,
        height: u32,
    },
    #[error("invalid pixel format {0:?}, expected Rl/Ro,Gl/Go,Bl/Bo,Al/Ao")]
    InvalidFormat(String),
    #[error("invalid device geometry {0:?}, expected WxH+X+Y")]
    InvalidGeometry(String),
}
