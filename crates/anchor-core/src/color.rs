//! Stable display colours for labels
//!
//! A label colour comes from, in order: an explicit hex string, a named
//! palette swatch, or a hue derived from the label name. The derived hue is a
//! pure function of the name, so the same label gets the same colour in every
//! session without persisted state.

use crate::types::{find_label, AnnotationColor, Label};

/// Alpha used for translucent highlight fills
pub const HIGHLIGHT_ALPHA: f32 = 0.35;

const DERIVED_SATURATION: f64 = 0.68;
const DERIVED_LIGHTNESS: f64 = 0.52;

/// Named swatches accepted as label colour tokens
const PALETTE: &[(&str, [u8; 3])] = &[
    ("red", [0xef, 0x44, 0x44]),
    ("orange", [0xf9, 0x73, 0x16]),
    ("amber", [0xf5, 0x9e, 0x0b]),
    ("yellow", [0xea, 0xb3, 0x08]),
    ("lime", [0x84, 0xcc, 0x16]),
    ("green", [0x22, 0xc5, 0x5e]),
    ("emerald", [0x10, 0xb9, 0x81]),
    ("teal", [0x14, 0xb8, 0xa6]),
    ("cyan", [0x06, 0xb6, 0xd4]),
    ("sky", [0x0e, 0xa5, 0xe9]),
    ("blue", [0x3b, 0x82, 0xf6]),
    ("indigo", [0x63, 0x66, 0xf1]),
    ("violet", [0x8b, 0x5c, 0xf6]),
    ("purple", [0xa8, 0x55, 0xf7]),
    ("fuchsia", [0xd9, 0x46, 0xef]),
    ("pink", [0xec, 0x48, 0x99]),
    ("rose", [0xf4, 0x3f, 0x5e]),
    ("slate", [0x64, 0x74, 0x8b]),
    ("gray", [0x6b, 0x72, 0x80]),
];

impl AnnotationColor {
    pub fn from_rgb8(rgb: [u8; 3]) -> Self {
        let [r, g, b] = rgb;
        Self {
            rgb: [r as f32 / 255.0, g as f32 / 255.0, b as f32 / 255.0],
            hex: format!("#{:02x}{:02x}{:02x}", r, g, b),
            translucent: format!("rgba({}, {}, {}, {})", r, g, b, HIGHLIGHT_ALPHA),
        }
    }
}

/// Colour for a label definition
pub fn resolve_color(label: &Label) -> AnnotationColor {
    label
        .color
        .as_deref()
        .and_then(|c| parse_hex(c).or_else(|| palette_lookup(c)))
        .map(AnnotationColor::from_rgb8)
        .unwrap_or_else(|| color_from_name(&label.name))
}

/// Colour for an annotation's label reference, which may not resolve to
/// any label definition
pub fn resolve_label_color(label_id: &str, labels: &[Label]) -> AnnotationColor {
    match find_label(labels, label_id) {
        Some(label) => resolve_color(label),
        None => color_from_name(label_id),
    }
}

/// Deterministic colour derived from a name: HSL(hash mod 360, 68%, 52%)
pub fn color_from_name(name: &str) -> AnnotationColor {
    let hue = (name_hash(name) as i64).abs() % 360;
    let rgb = hsl_to_rgb(hue as f64, DERIVED_SATURATION, DERIVED_LIGHTNESS);
    AnnotationColor::from_rgb8(rgb.map(|v| (v * 255.0).round().clamp(0.0, 255.0) as u8))
}

/// 32-bit signed rolling hash (`h * 31 + unit`) over UTF-16 code units
pub fn name_hash(name: &str) -> i32 {
    name.encode_utf16().fold(0i32, |h, unit| {
        h.wrapping_shl(5).wrapping_sub(h).wrapping_add(unit as i32)
    })
}

/// Parse `#rgb` or `#rrggbb` (leading `#` optional)
pub fn parse_hex(color: &str) -> Option<[u8; 3]> {
    let hex = color.trim().trim_start_matches('#');
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        6 => Some([
            u8::from_str_radix(&hex[0..2], 16).ok()?,
            u8::from_str_radix(&hex[2..4], 16).ok()?,
            u8::from_str_radix(&hex[4..6], 16).ok()?,
        ]),
        3 => {
            let mut out = [0u8; 3];
            for (i, c) in hex.chars().enumerate() {
                let v = c.to_digit(16)? as u8;
                out[i] = v * 16 + v;
            }
            Some(out)
        }
        _ => None,
    }
}

/// Look up a palette token such as `blue`, `blue-500` or `bg-blue-500`
fn palette_lookup(token: &str) -> Option<[u8; 3]> {
    let token = token.trim().to_ascii_lowercase();
    let mut name = token.as_str();
    for prefix in ["bg-", "text-", "border-"] {
        if let Some(rest) = name.strip_prefix(prefix) {
            name = rest;
        }
    }
    if let Some((base, shade)) = name.rsplit_once('-') {
        if shade.chars().all(|c| c.is_ascii_digit()) {
            name = base;
        }
    }
    PALETTE
        .iter()
        .find(|(swatch, _)| *swatch == name)
        .map(|(_, rgb)| *rgb)
}

fn hsl_to_rgb(hue: f64, saturation: f64, lightness: f64) -> [f64; 3] {
    let chroma = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
    let h = hue.rem_euclid(360.0) / 60.0;
    let x = chroma * (1.0 - (h % 2.0 - 1.0).abs());
    let (r, g, b) = match h as u32 {
        0 => (chroma, x, 0.0),
        1 => (x, chroma, 0.0),
        2 => (0.0, chroma, x),
        3 => (0.0, x, chroma),
        4 => (x, 0.0, chroma),
        _ => (chroma, 0.0, x),
    };
    let m = lightness - chroma / 2.0;
    [r + m, g + m, b + m]
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: colour derivation is deterministic
        #[test]
        fn derived_color_is_deterministic(name in ".{0,40}") {
            prop_assert_eq!(color_from_name(&name).hex, color_from_name(&name).hex);
        }

        /// Property: hex and rgb forms always agree
        #[test]
        fn hex_and_rgb_agree(name in "[a-zA-Z ]{1,30}") {
            let color = color_from_name(&name);
            let parsed = parse_hex(&color.hex).unwrap();
            for (byte, float) in parsed.iter().zip(color.rgb.iter()) {
                prop_assert!((*byte as f32 / 255.0 - float).abs() < 1e-6);
            }
        }
    }
}
