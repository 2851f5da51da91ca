use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::FbError;

/// Device used when neither `$FBDEV` nor the configuration names one.
pub const DEFAULT_DEVICE: &str = "/dev/fb0";

/// A rectangle of the physical framebuffer treated as the whole display.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubWindow {
    pub width: u32,
    pub height: u32,
    pub x: u32,
    pub y: u32,
}

impl fmt::Display for SubWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}+{}+{}", self.width, self.height, self.x, self.y)
    }
}

impl FromStr for SubWindow {
    type Err = FbError;

    /// Parse `WxH`, `WxH+X` or `WxH+X+Y`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || FbError::InvalidGeometry(s.to_string());
        let (width, rest) = s.split_once('x').ok_or_else(invalid)?;
        let mut parts = rest.split('+');
        let height = parts.next().ok_or_else(invalid)?;
        let x = parts.next().unwrap_or("0");
        let y = parts.next().unwrap_or("0");
        if parts.next().is_some() {
            return Err(invalid());
        }
        let num = |v: &str| v.trim().parse::<u32>().map_err(|_| invalid());
        let window = SubWindow {
            width: num(width)?,
            height: num(height)?,
            x: num(x)?,
            y: num(y)?,
        };
        if window.width == 0 || window.height == 0 {
            return Err(invalid());
        }
        Ok(window)
    }
}

/// A framebuffer device path with an optional `:WxH+X+Y` sub-window suffix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeviceSpec {
    pub path: PathBuf,
    pub window: Option<SubWindow>,
}

impl DeviceSpec {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            window: None,
        }
    }
}

impl Default for DeviceSpec {
    fn default() -> Self {
        Self::new(DEFAULT_DEVICE)
    }
}

impl fmt::Display for DeviceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())?;
        if let Some(window) = &self.window {
            write!(f, ":{window}")?;
        }
        Ok(())
    }
}

impl FromStr for DeviceSpec {
    type Err = FbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once(':') {
            Some((path, geometry)) => Ok(Self {
                path: PathBuf::from(path),
                window: Some(geometry.parse()?),
            }),
            None => Ok(Self::new(s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_path() {
        let spec: DeviceSpec = "/dev/fb1".parse().unwrap();
        assert_eq!(spec.path, PathBuf::from("/dev/fb1"));
        assert_eq!(spec.window, None);
    }

    #[test]
    fn test_path_with_window() {
        let spec: DeviceSpec = "/dev/fb0:800x600+100+50".parse().unwrap();
        assert_eq!(spec.path, PathBuf::from("/dev/fb0"));
        assert_eq!(
            spec.window,
            Some(SubWindow {
                width: 800,
                height: 600,
                x: 100,
                y: 50
            })
        );
        assert_eq!(spec.to_string(), "/dev/fb0:800x600+100+50");
    }

    #[test]
    fn test_window_without_origin() {
        let window: SubWindow = "640x480".parse().unwrap();
        assert_eq!((window.x, window.y), (0, 0));
    }

    #[test]
    fn test_bad_geometry() {
        assert!("/dev/fb0:800".parse::<DeviceSpec>().is_err());
        assert!("/dev/fb0:0x600".parse::<DeviceSpec>().is_err());
        assert!("/dev/fb0:800x600+1+2+3".parse::<DeviceSpec>().is_err());
        assert!("/dev/fb0:axb".parse::<DeviceSpec>().is_err());
    }
}
