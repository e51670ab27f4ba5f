/// English Metric Unit, the native integer length of deck geometry.
/// 914400 EMU per inch; never fractional, never NaN.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Emu(i64);

pub const EMU_PER_INCH: i64 = 914_400;

impl Emu {
    pub const ZERO: Emu = Emu(0);

    pub fn new(value: i64) -> Emu {
        Emu(value)
    }

    pub fn from_inches(value: f32) -> Emu {
        if !value.is_finite() {
            return Emu::ZERO;
        }
        let raw = (value as f64 * EMU_PER_INCH as f64).round();
        Emu(raw.clamp(i64::MIN as f64, i64::MAX as f64) as i64)
    }

    pub fn value(self) -> i64 {
        self.0
    }

    pub fn max(self, other: Emu) -> Emu {
        if self >= other { self } else { other }
    }
}

impl std::ops::Add for Emu {
    type Output = Emu;
    fn add(self, rhs: Emu) -> Emu {
        Emu(self.0.saturating_add(rhs.0))
    }
}

impl std::ops::Sub for Emu {
    type Output = Emu;
    fn sub(self, rhs: Emu) -> Emu {
        Emu(self.0.saturating_sub(rhs.0))
    }
}

impl std::ops::Div<i64> for Emu {
    type Output = Emu;
    fn div(self, rhs: i64) -> Emu {
        if rhs == 0 { Emu::ZERO } else { Emu(self.0 / rhs) }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Size {
    pub width: Emu,
    pub height: Emu,
}

impl Size {
    // 13.333in x 7.5in, the common 16:9 deck surface.
    pub fn widescreen() -> Self {
        Self {
            width: Emu::new(12_192_000),
            height: Emu::new(6_858_000),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rect {
    pub x: Emu,
    pub y: Emu,
    pub width: Emu,
    pub height: Emu,
}

impl Rect {
    pub const ZERO: Rect = Rect {
        x: Emu::ZERO,
        y: Emu::ZERO,
        width: Emu::ZERO,
        height: Emu::ZERO,
    };

    pub fn new(x: i64, y: i64, width: i64, height: i64) -> Rect {
        Rect {
            x: Emu::new(x),
            y: Emu::new(y),
            width: Emu::new(width),
            height: Emu::new(height),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const BLACK: Color = Color { r: 0, g: 0, b: 0 };
    pub const WHITE: Color = Color {
        r: 255,
        g: 255,
        b: 255,
    };

    pub fn rgb(r: u8, g: u8, b: u8) -> Color {
        Color { r, g, b }
    }

    /// Parses an `RRGGBB` hex triplet, with or without a leading `#`.
    pub fn from_hex(raw: &str) -> Option<Color> {
        let raw = raw.trim().trim_start_matches('#');
        if raw.len() != 6 || !raw.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let r = u8::from_str_radix(&raw[0..2], 16).ok()?;
        let g = u8::from_str_radix(&raw[2..4], 16).ok()?;
        let b = u8::from_str_radix(&raw[4..6], 16).ok()?;
        Some(Color { r, g, b })
    }

    pub fn to_hex(self) -> String {
        format!("{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emu_from_inches_rounds() {
        assert_eq!(Emu::from_inches(1.0), Emu::new(EMU_PER_INCH));
        assert_eq!(Emu::from_inches(0.5), Emu::new(457_200));
        assert_eq!(Emu::from_inches(f32::NAN), Emu::ZERO);
    }

    #[test]
    fn color_hex_round_trip() {
        let c = Color::from_hex("1F2a3B").unwrap();
        assert_eq!(c, Color::rgb(0x1F, 0x2A, 0x3B));
        assert_eq!(c.to_hex(), "1F2A3B");
        assert_eq!(Color::from_hex("#FFFFFF"), Some(Color::WHITE));
        assert_eq!(Color::from_hex("12345"), None);
        assert_eq!(Color::from_hex("GG0000"), None);
    }
}
