/*
 *  theme.rs
 *
 *  SMeterS - every dB counts
 *  (c) 2024-26 SMeterS contributors
 *
 *  Theme-aware color resolution for the meter bitmap
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use embedded_graphics::pixelcolor::{Rgb888, RgbColor};

use crate::constants::{
    COLOR_MARKER, COLOR_PEAK_LINE, COLOR_REFERENCE_LINE, COLOR_SCALE_BACKGROUND,
    LUMINANCE_THRESHOLD,
};
use crate::host::ThemeColors;

/// Parse a host-reported CSS color. Hosts hand these back either as
/// `rgb(r, g, b)` / `rgba(r, g, b, a)` or as `#rrggbb`.
pub fn parse_css_color(value: &str) -> Option<Rgb888> {
    let value = value.trim();
    if let Some(hex) = value.strip_prefix('#') {
        if hex.len() == 6 {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            return Some(Rgb888::new(r, g, b));
        }
        if hex.len() == 3 {
            let channel = |i: usize| {
                u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|v| v * 17)
            };
            return Some(Rgb888::new(channel(0)?, channel(1)?, channel(2)?));
        }
        return None;
    }

    // rgb()/rgba(): take the first three numeric runs, ignore the rest
    let mut channels = [0u8; 3];
    let mut found = 0usize;
    let mut current = String::new();
    for ch in value.chars().chain(std::iter::once(',')) {
        if ch.is_ascii_digit() {
            current.push(ch);
        } else if !current.is_empty() {
            if found < 3 {
                channels[found] = current.parse().ok()?;
                found += 1;
            }
            current.clear();
        }
    }
    if found == 3 {
        Some(Rgb888::new(channels[0], channels[1], channels[2]))
    } else {
        None
    }
}

/// Relative luminance of an RGB color, channels scaled to 0..1.
pub fn relative_luminance(color: Rgb888) -> f32 {
    let r = color.r() as f32 / 255.0;
    let g = color.g() as f32 / 255.0;
    let b = color.b() as f32 / 255.0;
    0.2126 * r + 0.7152 * g + 0.0722 * b
}

/// Whether the drawn frame must be channel-inverted to stay legible: the
/// host text color being dark implies a light theme background.
pub fn needs_inversion(text_color: Rgb888) -> bool {
    relative_luminance(text_color) < LUMINANCE_THRESHOLD
}

/// The subset of meter colors that follow the host theme. Needle, tick,
/// and label colors stay fixed regardless of theme.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeterPalette {
    pub scale_background: Rgb888,
    pub reference_line: Rgb888,
    pub peak_line: Rgb888,
    pub marker: Rgb888,
}

impl Default for MeterPalette {
    fn default() -> Self {
        Self {
            scale_background: COLOR_SCALE_BACKGROUND,
            reference_line: COLOR_REFERENCE_LINE,
            peak_line: COLOR_PEAK_LINE,
            marker: COLOR_MARKER,
        }
    }
}

impl MeterPalette {
    /// Resolve the palette from host theme custom properties, falling back
    /// to the fixed colors field-by-field when a property is absent or
    /// unparseable.
    pub fn from_theme(theme: &ThemeColors) -> Self {
        let fallback = Self::default();
        Self {
            scale_background: theme
                .scale_background
                .as_deref()
                .and_then(parse_css_color)
                .unwrap_or(fallback.scale_background),
            reference_line: theme
                .reference_line
                .as_deref()
                .and_then(parse_css_color)
                .unwrap_or(fallback.reference_line),
            peak_line: theme
                .peak_line
                .as_deref()
                .and_then(parse_css_color)
                .unwrap_or(fallback.peak_line),
            marker: theme
                .marker
                .as_deref()
                .and_then(parse_css_color)
                .unwrap_or(fallback.marker),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rgb_forms() {
        assert_eq!(parse_css_color("rgb(255, 238, 51)"), Some(Rgb888::new(255, 238, 51)));
        assert_eq!(parse_css_color("rgba(16,17,18,0.5)"), Some(Rgb888::new(16, 17, 18)));
        assert_eq!(parse_css_color("#FEEE33"), Some(Rgb888::new(0xFE, 0xEE, 0x33)));
        assert_eq!(parse_css_color("#fff"), Some(Rgb888::new(255, 255, 255)));
        assert_eq!(parse_css_color("not-a-color"), None);
    }

    #[test]
    fn test_luminance_threshold() {
        // White text on a dark theme: no inversion
        assert!(!needs_inversion(Rgb888::new(255, 255, 255)));
        // Near-black text means a light background: invert
        assert!(needs_inversion(Rgb888::new(20, 20, 20)));
        // Pure green sits above the threshold on its own
        assert!(!needs_inversion(Rgb888::new(0, 255, 0)));
    }

    #[test]
    fn test_palette_falls_back_per_field() {
        let theme = ThemeColors {
            text: Some("rgb(240,240,240)".into()),
            scale_background: Some("#101010".into()),
            reference_line: None,
            peak_line: Some("bogus".into()),
            marker: None,
        };
        let palette = MeterPalette::from_theme(&theme);
        assert_eq!(palette.scale_background, Rgb888::new(0x10, 0x10, 0x10));
        assert_eq!(palette.reference_line, COLOR_REFERENCE_LINE);
        assert_eq!(palette.peak_line, COLOR_PEAK_LINE);
        assert_eq!(palette.marker, COLOR_MARKER);
    }
}
