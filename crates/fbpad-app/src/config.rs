//! User configuration, read from a JSON file.
//!
//! Every field has a default, so a missing file or a partial file is fine.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use fbpad_fb::{DeviceSpec, FbError, DEFAULT_DEVICE};
use fbpad_pty::MuxOptions;
use fbpad_vt::Rgb;
use serde::{Deserialize, Serialize};

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "FBPAD_CONFIG";
/// Environment variable overriding the framebuffer device.
pub const DEVICE_ENV: &str = "FBDEV";

const DEFAULT_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSansMono.ttf",
    "/usr/share/fonts/TTF/DejaVuSansMono.ttf",
    "/usr/share/fonts/dejavu/DejaVuSansMono.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationMono-Regular.ttf",
    "/usr/share/fonts/liberation-mono/LiberationMono-Regular.ttf",
];

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("cannot parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// One character per tag.
    pub tags: String,
    /// Tags whose terminals keep a snapshot while hidden.
    pub snapshot_tags: String,
    pub shell: Vec<String>,
    pub mail: Vec<String>,
    pub editor: Vec<String>,
    /// Framebuffer device, optionally with a `:WxH+X+Y` sub-window.
    pub device: String,
    /// Where the screenshot command writes.
    pub screenshot: PathBuf,
    /// Screen lock passphrase; locking is disabled without one.
    pub passphrase: Option<String>,
    /// Candidate font files; the first that loads is used.
    pub fonts: Vec<PathBuf>,
    pub font_size: f32,
    /// Seam border color as `0xRRGGBB`.
    pub border_color: u32,
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tags: "xnlhtr01uiva-".to_string(),
            snapshot_tags: String::new(),
            shell: vec![fbpad_pty::default_shell()],
            mail: vec!["mailx".into(), "-f".into(), "+inbox".into()],
            editor: vec!["vi".into()],
            device: DEFAULT_DEVICE.to_string(),
            screenshot: PathBuf::from("/tmp/scr"),
            passphrase: None,
            fonts: DEFAULT_FONTS.iter().map(PathBuf::from).collect(),
            font_size: 16.0,
            border_color: 0xff0000,
            log_file: None,
        }
    }
}

impl Config {
    /// Load from `$FBPAD_CONFIG`, else `~/.config/fbpad/config.json`.
    pub fn load() -> Result<Self, ConfigError> {
        match config_path() {
            Some(path) => Self::load_from(&path),
            None => Ok(Self::default()),
        }
    }

    /// Load from `path`; a missing file yields the defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                log::debug!("no configuration at {}", path.display());
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };
        let config: Config = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tags.is_empty() {
            return Err(ConfigError::Invalid("no tags".into()));
        }
        for (i, ch) in self.tags.chars().enumerate() {
            if self.tags.chars().skip(i + 1).any(|c| c == ch) {
                return Err(ConfigError::Invalid(format!("tag {ch:?} appears twice")));
            }
        }
        if let Some(ch) = self.snapshot_tags.chars().find(|c| !self.tags.contains(*c)) {
            return Err(ConfigError::Invalid(format!(
                "snapshot tag {ch:?} is not a tag"
            )));
        }
        if !(self.font_size > 0.0) {
            return Err(ConfigError::Invalid("font_size must be positive".into()));
        }
        if self.border_color > 0xff_ffff {
            return Err(ConfigError::Invalid(format!(
                "border_color {:#x} is not 0xRRGGBB",
                self.border_color
            )));
        }
        Ok(())
    }

    /// Device to open: `$FBDEV` if set, else the configured device.
    pub fn device_spec(&self) -> Result<DeviceSpec, FbError> {
        match std::env::var(DEVICE_ENV) {
            Ok(dev) if !dev.is_empty() => dev.parse(),
            _ => self.device.parse(),
        }
    }

    pub fn mux_options(&self) -> MuxOptions {
        MuxOptions {
            tags: self.tags.clone(),
            snapshot_tags: self.snapshot_tags.clone(),
            passphrase: self.passphrase.clone(),
            border_color: Rgb::from_u32(self.border_color),
        }
    }
}

fn config_path() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
        return Some(PathBuf::from(path));
    }
    let home = std::env::var_os("HOME").filter(|h| !h.is_empty())?;
    Some(PathBuf::from(home).join(".config/fbpad/config.json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(text: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.tags, "xnlhtr01uiva-");
        assert!(config.snapshot_tags.is_empty());
        assert_eq!(config.mail, vec!["mailx", "-f", "+inbox"]);
        assert_eq!(config.screenshot, PathBuf::from("/tmp/scr"));
        assert!(config.passphrase.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("nope.json")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_partial_file() {
        let file = write_config(r#"{ "tags": "abc", "snapshot_tags": "b", "passphrase": "pw" }"#);
        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.tags, "abc");
        assert_eq!(config.snapshot_tags, "b");
        assert_eq!(config.passphrase.as_deref(), Some("pw"));
        assert_eq!(config.editor, vec!["vi"]);

        let options = config.mux_options();
        assert_eq!(options.tags, "abc");
        assert_eq!(options.border_color, Rgb::new(255, 0, 0));
    }

    #[test]
    fn test_malformed_file() {
        let file = write_config("{ tags: ");
        assert!(matches!(
            Config::load_from(file.path()),
            Err(ConfigError::Parse { .. })
        ));

        let file = write_config(r#"{ "colour": 1 }"#);
        assert!(Config::load_from(file.path()).is_err());
    }

    #[test]
    fn test_validation() {
        for text in [
            r#"{ "tags": "" }"#,
            r#"{ "tags": "abca" }"#,
            r#"{ "tags": "abc", "snapshot_tags": "z" }"#,
            r#"{ "font_size": 0 }"#,
            r#"{ "border_color": 16777216 }"#,
        ] {
            let file = write_config(text);
            assert!(
                matches!(Config::load_from(file.path()), Err(ConfigError::Invalid(_))),
                "{text} should be rejected"
            );
        }
    }

    #[test]
    fn test_device_spec_from_config() {
        let config = Config {
            device: "/dev/fb1:640x480+10+20".into(),
            ..Config::default()
        };
        if std::env::var_os(DEVICE_ENV).is_none() {
            let spec = config.device_spec().unwrap();
            assert_eq!(spec.path, PathBuf::from("/dev/fb1"));
            let window = spec.window.unwrap();
            assert_eq!((window.width, window.height, window.x, window.y), (640, 480, 10, 20));
        }
    }
}
