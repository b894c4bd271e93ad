//! sRGB colors, WCAG relative luminance and contrast.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use storecraft_core::DomainError;

/// WCAG AA minimum for normal text.
pub const MIN_CONTRAST: f64 = 4.5;

/// An opaque sRGB color, written `#RRGGBB`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct HexColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl HexColor {
    pub const BLACK: HexColor = HexColor::rgb(0, 0, 0);
    pub const WHITE: HexColor = HexColor::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// WCAG 2.x relative luminance in `[0, 1]`.
    pub fn relative_luminance(self) -> f64 {
        fn channel(c: u8) -> f64 {
            let c = c as f64 / 255.0;
            if c <= 0.03928 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        }
        0.2126 * channel(self.r) + 0.7152 * channel(self.g) + 0.0722 * channel(self.b)
    }

    /// `(hue in degrees, saturation, lightness)`, the latter two in `[0, 1]`.
    pub fn to_hsl(self) -> (f64, f64, f64) {
        let r = self.r as f64 / 255.0;
        let g = self.g as f64 / 255.0;
        let b = self.b as f64 / 255.0;
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let l = (max + min) / 2.0;
        let d = max - min;
        if d == 0.0 {
            return (0.0, 0.0, l);
        }
        let s = d / (1.0 - (2.0 * l - 1.0).abs());
        let h = if max == r {
            60.0 * (((g - b) / d).rem_euclid(6.0))
        } else if max == g {
            60.0 * ((b - r) / d + 2.0)
        } else {
            60.0 * ((r - g) / d + 4.0)
        };
        (h, s.clamp(0.0, 1.0), l)
    }

    pub fn from_hsl(h: f64, s: f64, l: f64) -> Self {
        let s = s.clamp(0.0, 1.0);
        let l = l.clamp(0.0, 1.0);
        let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
        let hp = h.rem_euclid(360.0) / 60.0;
        let x = c * (1.0 - (hp % 2.0 - 1.0).abs());
        let (r1, g1, b1) = match hp as u32 {
            0 => (c, x, 0.0),
            1 => (x, c, 0.0),
            2 => (0.0, c, x),
            3 => (0.0, x, c),
            4 => (x, 0.0, c),
            _ => (c, 0.0, x),
        };
        let m = l - c / 2.0;
        let to_u8 = |v: f64| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
        Self::rgb(to_u8(r1), to_u8(g1), to_u8(b1))
    }
}

/// `(L1 + 0.05) / (L2 + 0.05)` with `L1` the lighter of the two.
pub fn contrast_ratio(a: HexColor, b: HexColor) -> f64 {
    let (la, lb) = (a.relative_luminance(), b.relative_luminance());
    let (hi, lo) = if la >= lb { (la, lb) } else { (lb, la) };
    (hi + 0.05) / (lo + 0.05)
}

/// Move `fg`'s HSL lightness (hue and saturation kept) towards whichever of black or
/// white contrasts more with `bg`, stopping at the smallest change that reaches
/// `min_ratio`. Returns the pure extreme when even that falls short.
pub fn correct_foreground(fg: HexColor, bg: HexColor, min_ratio: f64) -> HexColor {
    if contrast_ratio(fg, bg) >= min_ratio {
        return fg;
    }
    let (h, s, l) = fg.to_hsl();
    let towards_white = contrast_ratio(HexColor::WHITE, bg) >= contrast_ratio(HexColor::BLACK, bg);
    let extreme = if towards_white { 1.0 } else { 0.0 };
    let extreme_color = HexColor::from_hsl(h, s, extreme);
    if contrast_ratio(extreme_color, bg) < min_ratio {
        return extreme_color;
    }

    // `failing` never meets the ratio; `passing` always does.
    let (mut failing, mut passing) = (l, extreme);
    for _ in 0..24 {
        let mid = (failing + passing) / 2.0;
        if contrast_ratio(HexColor::from_hsl(h, s, mid), bg) >= min_ratio {
            passing = mid;
        } else {
            failing = mid;
        }
    }
    HexColor::from_hsl(h, s, passing)
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl FromStr for HexColor {
    type Err = DomainError;

    /// Accepts `#RGB` and `#RRGGBB`, any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || DomainError::validation(format!("invalid hex color: {s:?}"));
        let hex = s.trim().strip_prefix('#').ok_or_else(invalid)?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| invalid());
        let nibble = |i: usize| {
            u8::from_str_radix(&hex[i..i + 1], 16)
                .map(|n| n * 17)
                .map_err(|_| invalid())
        };
        match hex.len() {
            6 => Ok(Self::rgb(byte(0)?, byte(2)?, byte(4)?)),
            3 => Ok(Self::rgb(nibble(0)?, nibble(1)?, nibble(2)?)),
            _ => Err(invalid()),
        }
    }
}

impl Serialize for HexColor {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for HexColor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn hex(s: &str) -> HexColor {
        s.parse().unwrap()
    }

    #[test]
    fn parses_short_and_long_forms() {
        assert_eq!(hex("#fff"), HexColor::WHITE);
        assert_eq!(hex("#1a1A1a"), HexColor::rgb(0x1A, 0x1A, 0x1A));
        assert_eq!(hex("#1A1A1A").to_string(), "#1A1A1A");
        assert!("1A1A1A".parse::<HexColor>().is_err());
        assert!("#12345".parse::<HexColor>().is_err());
        assert!("#GGGGGG".parse::<HexColor>().is_err());
    }

    #[test]
    fn black_on_white_is_21_to_1() {
        let ratio = contrast_ratio(HexColor::BLACK, HexColor::WHITE);
        assert!((ratio - 21.0).abs() < 1e-9);
        assert!((contrast_ratio(HexColor::WHITE, HexColor::BLACK) - ratio).abs() < 1e-12);
    }

    #[test]
    fn white_on_near_white_is_darkened() {
        let fixed = correct_foreground(hex("#FFFFFF"), hex("#FAFAFA"), MIN_CONTRAST);
        assert!(contrast_ratio(fixed, hex("#FAFAFA")) >= MIN_CONTRAST);
        assert!(fixed.relative_luminance() < 1.0);
    }

    #[test]
    fn black_on_near_black_is_lightened() {
        let fixed = correct_foreground(hex("#000000"), hex("#1A1A1A"), MIN_CONTRAST);
        assert!(contrast_ratio(fixed, hex("#1A1A1A")) >= MIN_CONTRAST);
        assert!(fixed.relative_luminance() > 0.0);
    }

    #[test]
    fn compliant_foreground_is_untouched() {
        let fg = hex("#222222");
        assert_eq!(correct_foreground(fg, HexColor::WHITE, MIN_CONTRAST), fg);
    }

    #[test]
    fn correction_keeps_hue_family() {
        let brand = hex("#7DD3FC");
        let fixed = correct_foreground(brand, HexColor::WHITE, MIN_CONTRAST);
        assert!(contrast_ratio(fixed, HexColor::WHITE) >= MIN_CONTRAST);
        assert!(fixed.b > fixed.r);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 256,
            ..ProptestConfig::default()
        })]

        /// Property: any foreground on any background is corrected to at least 4.5:1.
        #[test]
        fn correction_always_reaches_aa(
            fg in any::<(u8, u8, u8)>(),
            bg in any::<(u8, u8, u8)>(),
        ) {
            let fg = HexColor::rgb(fg.0, fg.1, fg.2);
            let bg = HexColor::rgb(bg.0, bg.1, bg.2);
            let fixed = correct_foreground(fg, bg, MIN_CONTRAST);
            prop_assert!(contrast_ratio(fixed, bg) >= MIN_CONTRAST);
        }
    }
}
