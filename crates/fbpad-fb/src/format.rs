use std::fmt;
use std::str::FromStr;

use crate::error::FbError;

/// Bit position and width of one color component inside a pixel.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Channel {
    /// Width in bits. Zero marks the component as unused.
    pub length: u32,
    /// Offset of the least significant bit.
    pub offset: u32,
}

impl Channel {
    pub const fn new(length: u32, offset: u32) -> Self {
        Self { length, offset }
    }

    /// Quantize an 8-bit sample to this channel's depth and shift it into place.
    pub fn encode(&self, sample: u8) -> u32 {
        if self.length == 0 {
            return 0;
        }
        let v = sample as u32;
        let v = if self.length >= 8 {
            v << (self.length - 8)
        } else {
            v >> (8 - self.length)
        };
        v << self.offset
    }

    /// Extract this channel from a pixel and scale it back to 8 bits.
    pub fn decode(&self, pixel: u32) -> u8 {
        if self.length == 0 {
            return 0;
        }
        let mask = if self.length >= 32 {
            u32::MAX
        } else {
            (1u32 << self.length) - 1
        };
        let v = (pixel >> self.offset) & mask;
        let v = if self.length >= 8 {
            v >> (self.length - 8)
        } else {
            v << (8 - self.length)
        };
        v as u8
    }

    /// Number of distinct levels the channel can represent.
    pub fn levels(&self) -> usize {
        1usize << self.length.min(16)
    }
}

/// Channel layout of a framebuffer pixel, in the same terms as `fbset`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PixelFormat {
    pub red: Channel,
    pub green: Channel,
    pub blue: Channel,
    pub alpha: Channel,
}

impl PixelFormat {
    /// 32-bit pixels with blue in the lowest byte (`8/16,8/8,8/0,8/24`).
    pub const BGRA8888: PixelFormat = PixelFormat {
        red: Channel::new(8, 16),
        green: Channel::new(8, 8),
        blue: Channel::new(8, 0),
        alpha: Channel::new(8, 24),
    };

    /// 16-bit `5/11,6/5,5/0,0/0` pixels.
    pub const RGB565: PixelFormat = PixelFormat {
        red: Channel::new(5, 11),
        green: Channel::new(6, 5),
        blue: Channel::new(5, 0),
        alpha: Channel::new(0, 0),
    };

    /// Encode an opaque color.
    pub fn encode(&self, r: u8, g: u8, b: u8) -> u32 {
        self.red.encode(r) | self.green.encode(g) | self.blue.encode(b) | self.alpha.encode(0xff)
    }

    /// Inverse of [`encode`](Self::encode), up to quantization.
    pub fn decode(&self, pixel: u32) -> (u8, u8, u8) {
        (
            self.red.decode(pixel),
            self.green.decode(pixel),
            self.blue.decode(pixel),
        )
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{},{}/{},{}/{},{}/{}",
            self.red.length,
            self.red.offset,
            self.green.length,
            self.green.offset,
            self.blue.length,
            self.blue.offset,
            self.alpha.length,
            self.alpha.offset,
        )
    }
}

impl FromStr for PixelFormat {
    type Err = FbError;

    /// Parse `Rl/Ro,Gl/Go,Bl/Bo,Al/Ao`. Exactly eight integers are required.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || FbError::InvalidFormat(s.to_string());
        let channels: Vec<&str> = s.trim().split(',').collect();
        if channels.len() != 4 {
            return Err(invalid());
        }
        let mut parsed = [Channel::default(); 4];
        for (slot, part) in parsed.iter_mut().zip(&channels) {
            let (length, offset) = part.split_once('/').ok_or_else(invalid)?;
            let length: u32 = length.trim().parse().map_err(|_| invalid())?;
            let offset: u32 = offset.trim().parse().map_err(|_| invalid())?;
            if length > 32 || offset >= 32 {
                return Err(invalid());
            }
            *slot = Channel::new(length, offset);
        }
        Ok(PixelFormat {
            red: parsed[0],
            green: parsed[1],
            blue: parsed[2],
            alpha: parsed[3],
        })
    }
}
