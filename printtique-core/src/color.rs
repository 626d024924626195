//! Straight (non-premultiplied) sRGB colors, as the canvas and the catalog speak them.

/// An 8-bit-per-channel sRGB color with straight alpha.
///
/// Written and parsed as CSS-ish strings: `#rgb`, `#rrggbb`, `#rrggbbaa` or `rgba(r, g, b, a)`
/// where `a` is in `[0, 1]`.
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}
impl Color {
    pub const TRANSPARENT: Self = Self::rgba(0, 0, 0, 0);
    pub const WHITE: Self = Self::rgb(255, 255, 255);
    pub const BLACK: Self = Self::rgb(0, 0, 0);
    #[must_use]
    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }
    #[must_use]
    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }
    /// Opaque white. Garments of this color are drawn untinted.
    #[must_use]
    pub fn is_white(&self) -> bool {
        *self == Self::WHITE
    }
    #[must_use]
    pub fn as_array(&self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}
impl Default for Color {
    fn default() -> Self {
        Self::BLACK
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ColorParseError {
    #[error("expected `#rgb`, `#rrggbb`, `#rrggbbaa` or `rgba(..)`")]
    UnrecognizedFormat,
    #[error("invalid hex digits")]
    InvalidHex,
    #[error("invalid channel `{0}`")]
    InvalidChannel(String),
}

impl std::str::FromStr for Color {
    type Err = ColorParseError;
    fn from_str(str: &str) -> Result<Self, Self::Err> {
        let str = str.trim();
        if let Some(hex) = str.strip_prefix('#') {
            parse_hex(hex)
        } else if let Some(body) = str
            .strip_prefix("rgba(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            parse_rgba(body)
        } else {
            Err(ColorParseError::UnrecognizedFormat)
        }
    }
}
fn parse_hex(hex: &str) -> Result<Color, ColorParseError> {
    if !hex.is_ascii() {
        return Err(ColorParseError::InvalidHex);
    }
    let byte = |digits: &str| u8::from_str_radix(digits, 16).map_err(|_| ColorParseError::InvalidHex);
    match hex.len() {
        3 => {
            // Each nibble is doubled, `#abc` == `#aabbcc`
            let nibble = |idx: usize| byte(&hex[idx..=idx]).map(|n| n * 0x11);
            Ok(Color::rgb(nibble(0)?, nibble(1)?, nibble(2)?))
        }
        6 => Ok(Color::rgb(byte(&hex[0..2])?, byte(&hex[2..4])?, byte(&hex[4..6])?)),
        8 => Ok(Color::rgba(
            byte(&hex[0..2])?,
            byte(&hex[2..4])?,
            byte(&hex[4..6])?,
            byte(&hex[6..8])?,
        )),
        _ => Err(ColorParseError::UnrecognizedFormat),
    }
}
fn parse_rgba(body: &str) -> Result<Color, ColorParseError> {
    let parts: smallvec::SmallVec<[&str; 4]> = body.split(',').map(str::trim).collect();
    let &[r, g, b, a] = parts.as_slice() else {
        return Err(ColorParseError::UnrecognizedFormat);
    };
    let channel = |part: &str| {
        part.parse::<u8>()
            .map_err(|_| ColorParseError::InvalidChannel(part.to_owned()))
    };
    let alpha = a
        .parse::<f32>()
        .ok()
        .filter(|a| (0.0..=1.0).contains(a))
        .ok_or_else(|| ColorParseError::InvalidChannel(a.to_owned()))?;
    Ok(Color::rgba(
        channel(r)?,
        channel(g)?,
        channel(b)?,
        // In range by the filter above.
        (alpha * 255.0).round() as u8,
    ))
}
impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)?;
        if self.a != 255 {
            write!(f, "{:02x}", self.a)?;
        }
        Ok(())
    }
}
impl serde::Serialize for Color {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.collect_str(self)
    }
}
impl<'de> serde::Deserialize<'de> for Color {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let str =
            <std::borrow::Cow<'de, str> as serde::Deserialize<'de>>::deserialize(deserializer)?;
        str.parse().map_err(serde::de::Error::custom)
    }
}
