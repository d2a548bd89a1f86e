use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Linear RGB color with components in `0.0..=1.0`.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ColorRepr", into = "String")]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
}

impl Color {
    pub const BLACK: Color = Color::rgb(0.0, 0.0, 0.0);
    pub const WHITE: Color = Color::rgb(1.0, 1.0, 1.0);

    pub const fn rgb(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b }
    }

    /// Parses `#rrggbb`, `rrggbb` or the short `#rgb` form.
    pub fn from_hex(text: &str) -> Result<Self> {
        let digits = text.trim().trim_start_matches('#');
        let expanded: String = match digits.len() {
            3 => digits.chars().flat_map(|c| [c, c]).collect(),
            6 => digits.to_string(),
            _ => {
                return Err(Error::InvalidParameter(format!(
                    "color `{text}` must have 3 or 6 hex digits"
                )));
            }
        };
        let value = u32::from_str_radix(&expanded, 16)
            .map_err(|_| Error::InvalidParameter(format!("color `{text}` is not hex")))?;
        Ok(Self::rgb(
            ((value >> 16) & 0xff) as f32 / 255.0,
            ((value >> 8) & 0xff) as f32 / 255.0,
            (value & 0xff) as f32 / 255.0,
        ))
    }

    pub fn to_hex(&self) -> String {
        let channel = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        format!(
            "#{:02x}{:02x}{:02x}",
            channel(self.r),
            channel(self.g),
            channel(self.b)
        )
    }

    pub fn to_array(&self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }
}

impl From<[f32; 3]> for Color {
    fn from(value: [f32; 3]) -> Self {
        Self::rgb(value[0], value[1], value[2])
    }
}

impl From<Color> for String {
    fn from(value: Color) -> Self {
        value.to_hex()
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ColorRepr {
    Hex(String),
    Rgb([f32; 3]),
}

impl TryFrom<ColorRepr> for Color {
    type Error = Error;

    fn try_from(value: ColorRepr) -> Result<Self> {
        match value {
            ColorRepr::Hex(text) => Color::from_hex(&text),
            ColorRepr::Rgb(rgb) => Ok(Color::from(rgb)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_round_trip() -> Result<()> {
        let color = Color::from_hex("#ff8000")?;
        assert_eq!(color.r, 1.0);
        assert_eq!(color.b, 0.0);
        assert_eq!(color.to_hex(), "#ff8000");
        Ok(())
    }

    #[test]
    fn short_hex_expands() -> Result<()> {
        assert_eq!(Color::from_hex("#fff")?, Color::WHITE);
        Ok(())
    }

    #[test]
    fn rejects_bad_hex() {
        assert!(Color::from_hex("#12345").is_err());
        assert!(Color::from_hex("zzzzzz").is_err());
    }

    #[test]
    fn deserializes_from_hex_or_array() -> Result<()> {
        let a: Color = serde_json::from_str("\"#000000\"")?;
        let b: Color = serde_json::from_str("[0.0, 0.0, 0.0]")?;
        assert_eq!(a, b);
        Ok(())
    }
}
