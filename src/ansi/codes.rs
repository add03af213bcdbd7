//! ANSI escape handling and terminal color palette
//!
//! Stripping works on the raw text with a precompiled regex so the alt text
//! loses nothing but escape sequences. Colors follow the xterm palette.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    /// Precompiled regex for ANSI escape sequences
    ///
    /// Covers CSI, OSC terminated by BEL or ST, the DCS/SOS/PM/APC strings
    /// and plain escapes with intermediates such as `ESC ( B`.
    static ref ANSI_REGEX: Regex = Regex::new(concat!(
        r"\x1B(?:",
        r"\[[0-?]*[ -/]*[@-~]",
        r"|\][^\x07\x1B]*(?:\x07|\x1B\\)",
        r"|[PX^_][^\x1B]*\x1B\\",
        r"|[ -/]*[0-~]",
        r")"
    ))
    .expect("ANSI regex is valid");
}

/// 8-bit RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const BLACK: Self = Self::new(0, 0, 0);
    pub const WHITE: Self = Self::new(255, 255, 255);

    #[inline]
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Create from hex color (e.g., 0xFF0000 for red)
    #[inline]
    pub const fn from_hex(hex: u32) -> Self {
        Self::new(
            ((hex >> 16) & 0xFF) as u8,
            ((hex >> 8) & 0xFF) as u8,
            (hex & 0xFF) as u8,
        )
    }

    /// Parse `#rrggbb` or `#rgb` (leading `#` optional)
    pub fn parse_hex(text: &str) -> Option<Self> {
        let hex = text.trim().trim_start_matches('#');
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }

        match hex.len() {
            6 => u32::from_str_radix(hex, 16).ok().map(Self::from_hex),
            3 => {
                let mut channels = hex.chars().map(|c| {
                    let v = c.to_digit(16).unwrap_or(0) as u8;
                    v * 16 + v
                });
                Some(Self::new(channels.next()?, channels.next()?, channels.next()?))
            }
            _ => None,
        }
    }

    /// Linear blend toward `other` by `t` in 0.0..=1.0
    #[inline]
    pub fn mix(self, other: Rgb, t: f32) -> Rgb {
        let t = t.clamp(0.0, 1.0);
        let lerp = |a: u8, b: u8| (f32::from(a) + (f32::from(b) - f32::from(a)) * t).round() as u8;
        Rgb::new(lerp(self.r, other.r), lerp(self.g, other.g), lerp(self.b, other.b))
    }
}

impl std::fmt::Display for Rgb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl From<Rgb> for image::Rgb<u8> {
    fn from(color: Rgb) -> Self {
        image::Rgb([color.r, color.g, color.b])
    }
}

/// The 16 base colors: 0-7 standard, 8-15 bright
const BASE_COLORS: [Rgb; 16] = [
    Rgb::new(0, 0, 0),
    Rgb::new(128, 0, 0),
    Rgb::new(0, 128, 0),
    Rgb::new(128, 128, 0),
    Rgb::new(0, 0, 128),
    Rgb::new(128, 0, 128),
    Rgb::new(0, 128, 128),
    Rgb::new(192, 192, 192),
    Rgb::new(128, 128, 128),
    Rgb::new(255, 0, 0),
    Rgb::new(0, 255, 0),
    Rgb::new(255, 255, 0),
    Rgb::new(0, 0, 255),
    Rgb::new(255, 0, 255),
    Rgb::new(0, 255, 255),
    Rgb::new(255, 255, 255),
];

/// Channel levels of the 6x6x6 color cube
const CUBE_LEVELS: [u8; 6] = [0, 95, 135, 175, 215, 255];

/// Convert an ANSI 256-color index into RGB
pub fn ansi_256_to_rgb(code: u8) -> Rgb {
    match code {
        0..=15 => BASE_COLORS[code as usize],
        16..=231 => {
            let idx = code - 16;
            Rgb::new(
                CUBE_LEVELS[(idx / 36) as usize],
                CUBE_LEVELS[((idx % 36) / 6) as usize],
                CUBE_LEVELS[(idx % 6) as usize],
            )
        }
        232..=255 => {
            let gray = 8 + (code - 232) * 10;
            Rgb::new(gray, gray, gray)
        }
    }
}

/// Strip all ANSI escape sequences from text
///
/// Nothing but escape sequences is removed, so text without escapes comes
/// back unchanged. Removal repeats until no sequence is left, since a dangling
/// `ESC [` can join with the text after a removed sequence.
pub fn strip_ansi_codes(text: &str) -> String {
    let mut stripped = ANSI_REGEX.replace_all(text, "").into_owned();
    while ANSI_REGEX.is_match(&stripped) {
        stripped = ANSI_REGEX.replace_all(&stripped, "").into_owned();
    }
    stripped
}

/// Whether the text contains at least one ANSI escape introducer
pub fn contains_ansi(text: &str) -> bool {
    text.contains("\x1B[")
}
