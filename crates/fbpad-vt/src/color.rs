use alacritty_terminal::term::color::Colors;
use alacritty_terminal::vte::ansi::{Color, NamedColor};

/// 24-bit color as the pad paints it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Build from a `0xRRGGBB` value.
    pub const fn from_u32(v: u32) -> Self {
        Self {
            r: (v >> 16) as u8,
            g: (v >> 8) as u8,
            b: v as u8,
        }
    }

    pub const fn to_u32(self) -> u32 {
        (self.r as u32) << 16 | (self.g as u32) << 8 | self.b as u32
    }

    /// Two thirds of each channel, for faint text.
    pub(crate) const fn dim(self) -> Self {
        Self {
            r: (self.r as u16 * 2 / 3) as u8,
            g: (self.g as u16 * 2 / 3) as u8,
            b: (self.b as u16 * 2 / 3) as u8,
        }
    }
}

pub const DEFAULT_FG: Rgb = Rgb::from_u32(0xffffff);
pub const DEFAULT_BG: Rgb = Rgb::from_u32(0x000000);

/// The sixteen console colors, normal then bright.
const CONSOLE: [u32; 16] = [
    0x000000, 0xcd0000, 0x00cd00, 0xcdcd00, 0x0000ee, 0xcd00cd, 0x00cdcd, 0xe5e5e5,
    0x7f7f7f, 0xff0000, 0x00ff00, 0xffff00, 0x5c5cff, 0xff00ff, 0x00ffff, 0xffffff,
];

/// Color `idx` of the 256-color palette: console colors, the 6x6x6 cube,
/// then the gray ramp.
pub fn indexed(idx: u8) -> Rgb {
    match idx {
        0..=15 => Rgb::from_u32(CONSOLE[idx as usize]),
        16..=231 => {
            let n = idx - 16;
            let level = |v: u8| if v == 0 { 0 } else { 55 + 40 * v };
            Rgb::new(level(n / 36), level(n / 6 % 6), level(n % 6))
        }
        _ => {
            let v = 8 + 10 * (idx - 232);
            Rgb::new(v, v, v)
        }
    }
}

/// Resolve a cell color; palette entries the program redefined through OSC
/// sequences win over the built-in ones.
pub(crate) fn resolve(color: &Color, colors: &Colors, fallback: Rgb) -> Rgb {
    match color {
        Color::Spec(rgb) => Rgb::new(rgb.r, rgb.g, rgb.b),
        Color::Indexed(idx) => match colors[*idx as usize] {
            Some(rgb) => Rgb::new(rgb.r, rgb.g, rgb.b),
            None => indexed(*idx),
        },
        Color::Named(named) => {
            if let Some(rgb) = colors[*named] {
                return Rgb::new(rgb.r, rgb.g, rgb.b);
            }
            named_default(*named, fallback)
        }
    }
}

fn named_default(named: NamedColor, fallback: Rgb) -> Rgb {
    let idx = named as usize;
    if idx < CONSOLE.len() {
        return Rgb::from_u32(CONSOLE[idx]);
    }
    match named {
        NamedColor::Foreground | NamedColor::BrightForeground | NamedColor::Cursor => DEFAULT_FG,
        NamedColor::Background => DEFAULT_BG,
        NamedColor::DimForeground => DEFAULT_FG.dim(),
        NamedColor::DimBlack
        | NamedColor::DimRed
        | NamedColor::DimGreen
        | NamedColor::DimYellow
        | NamedColor::DimBlue
        | NamedColor::DimMagenta
        | NamedColor::DimCyan
        | NamedColor::DimWhite => {
            let normal = named as usize - NamedColor::DimBlack as usize;
            Rgb::from_u32(CONSOLE[normal]).dim()
        }
        _ => fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_u32() {
        assert_eq!(Rgb::from_u32(0xff0000), Rgb::new(255, 0, 0));
        assert_eq!(Rgb::from_u32(0x516f7b), Rgb::new(0x51, 0x6f, 0x7b));
        assert_eq!(Rgb::from_u32(0x516f7b).to_u32(), 0x516f7b);
    }

    #[test]
    fn test_indexed_palette() {
        assert_eq!(indexed(1), Rgb::from_u32(0xcd0000));
        assert_eq!(indexed(16), Rgb::new(0, 0, 0));
        assert_eq!(indexed(231), Rgb::new(255, 255, 255));
        assert_eq!(indexed(196), Rgb::new(255, 0, 0));
        assert_eq!(indexed(232), Rgb::new(8, 8, 8));
        assert_eq!(indexed(255), Rgb::new(238, 238, 238));
    }

    #[test]
    fn test_named_colors() {
        let colors = Colors::default();
        let fallback = Rgb::new(1, 2, 3);
        assert_eq!(
            resolve(&Color::Named(NamedColor::Red), &colors, fallback),
            indexed(1)
        );
        assert_eq!(
            resolve(&Color::Named(NamedColor::DimRed), &colors, fallback),
            Rgb::new(136, 0, 0)
        );
        assert_eq!(
            resolve(&Color::Named(NamedColor::Background), &colors, fallback),
            DEFAULT_BG
        );
    }
}
