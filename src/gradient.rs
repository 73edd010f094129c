//! Severity colors.
//!
//! A gradient is an ascending list of [`Breakpoint`]s; values between two
//! thresholds are linearly interpolated per channel and values past the last
//! threshold take the last color.

use std::fmt;
use std::str::FromStr;

use crate::models::{Allergen, Concentration};
use crate::reference::ReferenceData;

#[derive(serde::Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(try_from = "String")]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Rgb { r, g, b }
    }

    fn channels(self) -> [u8; 3] {
        [self.r, self.g, self.b]
    }

    fn lerp(self, other: Rgb, factor: f64) -> Rgb {
        let [r, g, b] = [0, 1, 2].map(|i| {
            let from = f64::from(self.channels()[i]);
            let to = f64::from(other.channels()[i]);
            (from + factor * (to - from)).round().clamp(0.0, 255.0) as u8
        });
        Rgb { r, g, b }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
#[error("`{0}` is not a #RRGGBB color")]
pub struct ParseColorError(String);

impl FromStr for Rgb {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s
            .strip_prefix('#')
            .filter(|hex| hex.len() == 6)
            .ok_or_else(|| ParseColorError(s.to_string()))?;
        let value = u32::from_str_radix(hex, 16).map_err(|_| ParseColorError(s.to_string()))?;
        Ok(Rgb::new(
            (value >> 16 & 0xFF) as u8,
            (value >> 8 & 0xFF) as u8,
            (value & 0xFF) as u8,
        ))
    }
}

impl TryFrom<String> for Rgb {
    type Error = ParseColorError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Breakpoint {
    pub threshold: f64,
    pub color: Rgb,
}

impl Breakpoint {
    pub fn new(threshold: f64, color: Rgb) -> Self {
        Breakpoint { threshold, color }
    }
}

/// Color of `value` on the gradient described by `breakpoints`, which must be
/// sorted ascending by threshold. `None` only when there are no breakpoints.
///
/// Two consecutive breakpoints with the same threshold select the lower one's
/// color. Values under the first threshold extrapolate the first segment,
/// with every channel clamped to `0..=255`.
pub fn color_for(value: f64, breakpoints: &[Breakpoint]) -> Option<Rgb> {
    let last = breakpoints.last()?;
    let Some(i) = (1..breakpoints.len()).find(|&i| value <= breakpoints[i].threshold) else {
        return Some(last.color);
    };

    let lower = breakpoints[i - 1];
    let upper = breakpoints[i];
    let span = upper.threshold - lower.threshold;
    let factor = if span > 0.0 {
        (value - lower.threshold) / span
    } else {
        0.0
    };
    Some(lower.color.lerp(upper.color, factor))
}

#[derive(serde::Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Palette {
    #[serde(default = "Palette::default_floor")]
    pub floor: Rgb,
    #[serde(default = "Palette::default_mid")]
    pub mid: Rgb,
    #[serde(default = "Palette::default_ceiling")]
    pub ceiling: Rgb,
    /// Used for values that cannot be classified.
    #[serde(default = "Palette::default_unclassified")]
    pub unclassified: Rgb,
}

impl Palette {
    fn default_floor() -> Rgb {
        Rgb::new(0x00, 0xFF, 0x00)
    }

    fn default_mid() -> Rgb {
        Rgb::new(0xFF, 0xFF, 0x00)
    }

    fn default_ceiling() -> Rgb {
        Rgb::new(0xFF, 0x00, 0x00)
    }

    fn default_unclassified() -> Rgb {
        Rgb::new(0xFF, 0xFF, 0xFF)
    }

    pub fn breakpoints(&self, allergen: &Allergen) -> [Breakpoint; 3] {
        [
            Breakpoint::new(0.0, self.floor),
            Breakpoint::new(allergen.margin_low, self.mid),
            Breakpoint::new(allergen.margin_high, self.ceiling),
        ]
    }
}

impl Default for Palette {
    fn default() -> Self {
        Palette {
            floor: Self::default_floor(),
            mid: Self::default_mid(),
            ceiling: Self::default_ceiling(),
            unclassified: Self::default_unclassified(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Classification {
    Color(Rgb),
    /// The concentration's allergen is not in the reference data.
    Unclassified,
}

impl Classification {
    pub fn or_neutral(self, palette: &Palette) -> Rgb {
        match self {
            Classification::Color(color) => color,
            Classification::Unclassified => palette.unclassified,
        }
    }
}

pub fn classify(
    concentration: &Concentration,
    reference: &ReferenceData,
    palette: &Palette,
) -> Classification {
    reference
        .allergen(concentration.allergen)
        .and_then(|allergen| color_for(concentration.value, &palette.breakpoints(allergen)))
        .map_or(Classification::Unclassified, Classification::Color)
}
