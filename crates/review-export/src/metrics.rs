//! Standard 14 font metrics and text wrapping
//!
//! Advance widths (1/1000 em) of Helvetica and Helvetica-Bold for the
//! printable ASCII range, taken from the Adobe core font AFM files. Other
//! characters fall back to the width of a digit.

const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, // ' '..'/'
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, // '0'..'?'
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, // '@'..'O'
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556, // 'P'..'_'
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556, // '`'..'o'
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584, // 'p'..'~'
];

const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

const FALLBACK_WIDTH: u16 = 556;

/// WinAnsiEncoding codes 0x80-0x9F that differ from Latin-1, with their
/// Helvetica and Helvetica-Bold advance widths
const WIN_ANSI_HIGH: [(u8, char, u16, u16); 27] = [
    (0x80, '\u{20AC}', 556, 556), // Euro
    (0x82, '\u{201A}', 222, 278), // quotesinglbase
    (0x83, '\u{0192}', 556, 556), // florin
    (0x84, '\u{201E}', 333, 500), // quotedblbase
    (0x85, '\u{2026}', 1000, 1000), // ellipsis
    (0x86, '\u{2020}', 556, 556), // dagger
    (0x87, '\u{2021}', 556, 556), // daggerdbl
    (0x88, '\u{02C6}', 333, 333), // circumflex
    (0x89, '\u{2030}', 1000, 1000), // perthousand
    (0x8A, '\u{0160}', 667, 667), // Scaron
    (0x8B, '\u{2039}', 333, 333), // guilsinglleft
    (0x8C, '\u{0152}', 1000, 1000), // OE
    (0x8E, '\u{017D}', 611, 611), // Zcaron
    (0x91, '\u{2018}', 222, 278), // quoteleft
    (0x92, '\u{2019}', 222, 278), // quoteright
    (0x93, '\u{201C}', 333, 500), // quotedblleft
    (0x94, '\u{201D}', 333, 500), // quotedblright
    (0x95, '\u{2022}', 350, 350), // bullet
    (0x96, '\u{2013}', 556, 556), // endash
    (0x97, '\u{2014}', 1000, 1000), // emdash
    (0x98, '\u{02DC}', 333, 333), // tilde
    (0x99, '\u{2122}', 1000, 1000), // trademark
    (0x9A, '\u{0161}', 500, 556), // scaron
    (0x9B, '\u{203A}', 333, 333), // guilsinglright
    (0x9C, '\u{0153}', 944, 944), // oe
    (0x9E, '\u{017E}', 500, 500), // zcaron
    (0x9F, '\u{0178}', 667, 667), // Ydieresis
];

/// Unicode character of a WinAnsiEncoding code. Codes with no glyph map to
/// the Latin-1 character of the same value.
pub fn win_ansi_char(code: u8) -> char {
    WIN_ANSI_HIGH
        .iter()
        .find(|(c, ..)| *c == code)
        .map(|(_, ch, ..)| *ch)
        .unwrap_or(code as char)
}

/// WinAnsiEncoding code of `c`, if the encoding has a glyph for it
pub fn win_ansi_code(c: char) -> Option<u8> {
    match c as u32 {
        0x20..=0x7E | 0xA0..=0xFF => Some(c as u32 as u8),
        _ => WIN_ANSI_HIGH
            .iter()
            .find(|(_, ch, ..)| *ch == c)
            .map(|(code, ..)| *code),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Font {
    Helvetica,
    HelveticaBold,
}

impl Font {
    /// Resource name used in generated content streams
    pub fn resource_name(self) -> &'static str {
        match self {
            Font::Helvetica => "F1",
            Font::HelveticaBold => "F2",
        }
    }

    pub fn base_font(self) -> &'static str {
        match self {
            Font::Helvetica => "Helvetica",
            Font::HelveticaBold => "Helvetica-Bold",
        }
    }

    /// Advance width of `c` in 1/1000 em
    pub fn char_width(self, c: char) -> u16 {
        let table = match self {
            Font::Helvetica => &HELVETICA,
            Font::HelveticaBold => &HELVETICA_BOLD,
        };
        let code = c as u32;
        if (32..=126).contains(&code) {
            return table[(code - 32) as usize];
        }
        WIN_ANSI_HIGH
            .iter()
            .find(|(_, ch, ..)| *ch == c)
            .map(|&(_, _, regular, bold)| match self {
                Font::Helvetica => regular,
                Font::HelveticaBold => bold,
            })
            .unwrap_or(FALLBACK_WIDTH)
    }

    /// Width of `text` in points at `size`
    pub fn text_width(self, text: &str, size: f64) -> f64 {
        let units: u32 = text.chars().map(|c| self.char_width(c) as u32).sum();
        units as f64 * size / 1000.0
    }
}

/// Encode text for a WinAnsi simple font. Characters the encoding has no
/// glyph for become `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| win_ansi_code(c).unwrap_or(b'?'))
        .collect()
}

/// Greedy word wrap of `text` to lines no wider than `max_width`
///
/// Explicit newlines start a new line. Words wider than a whole line are
/// broken between characters. Blank input yields no lines.
pub fn wrap_text(text: &str, font: Font, size: f64, max_width: f64) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in text.lines() {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if line.is_empty() {
                word.to_string()
            } else {
                format!("{} {}", line, word)
            };
            if font.text_width(&candidate, size) <= max_width {
                line = candidate;
                continue;
            }
            if !line.is_empty() {
                lines.push(std::mem::take(&mut line));
            }
            if font.text_width(word, size) <= max_width {
                line = word.to_string();
            } else {
                for c in word.chars() {
                    line.push(c);
                    if font.text_width(&line, size) > max_width && line.chars().count() > 1 {
                        line.pop();
                        lines.push(std::mem::take(&mut line));
                        line.push(c);
                    }
                }
            }
        }
        if !line.is_empty() {
            lines.push(line);
        }
    }
    lines
}

/// Shorten `text` with a trailing ellipsis so it fits in `max_width`
pub fn truncate_to_width(text: &str, font: Font, size: f64, max_width: f64) -> String {
    if font.text_width(text, size) <= max_width {
        return text.to_string();
    }
    let mut out: String = text.to_string();
    while !out.is_empty() && font.text_width(&format!("{}...", out), size) > max_width {
        out.pop();
    }
    format!("{}...", out.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_known_widths() {
        assert_eq!(Font::Helvetica.char_width(' '), 278);
        assert_eq!(Font::Helvetica.char_width('W'), 944);
        assert_eq!(Font::Helvetica.char_width('~'), 584);
        assert_eq!(Font::HelveticaBold.char_width('m'), 889);
        assert_eq!(Font::Helvetica.char_width('\u{00E9}'), FALLBACK_WIDTH);
    }

    #[test]
    fn test_text_width_scales_with_size() {
        // "Hi" = 722 + 222
        assert!((Font::Helvetica.text_width("Hi", 10.0) - 9.44).abs() < 1e-9);
        assert!((Font::Helvetica.text_width("Hi", 20.0) - 18.88).abs() < 1e-9);
    }

    #[test]
    fn test_win_ansi_encoding() {
        assert_eq!(encode_win_ansi("caf\u{00E9}"), vec![b'c', b'a', b'f', 0xE9]);
        assert_eq!(encode_win_ansi("\u{2713} ok"), b"? ok".to_vec());
        assert_eq!(
            encode_win_ansi("Tenant\u{2019}s \u{201C}deposit\u{201D} \u{2013} \u{20AC}5\u{2014}"),
            b"Tenant\x92s \x93deposit\x94 \x96 \x805\x97".to_vec()
        );
        // C1 controls have no glyph
        assert_eq!(encode_win_ansi("\u{0092}"), b"?".to_vec());
    }

    #[test]
    fn test_win_ansi_round_trip_and_widths() {
        assert_eq!(win_ansi_char(0x92), '\u{2019}');
        assert_eq!(win_ansi_char(0x41), 'A');
        assert_eq!(win_ansi_char(0x81), '\u{0081}');
        assert_eq!(Font::Helvetica.char_width('\u{2014}'), 1000);
        assert_eq!(Font::Helvetica.char_width('\u{2019}'), 222);
        assert_eq!(Font::HelveticaBold.char_width('\u{201C}'), 500);
    }

    #[test]
    fn test_wrap_respects_width() {
        let text = "the quick brown fox jumps over the lazy dog";
        let lines = wrap_text(text, Font::Helvetica, 10.0, 80.0);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(Font::Helvetica.text_width(line, 10.0) <= 80.0);
        }
        assert_eq!(lines.join(" "), text);
    }

    #[test]
    fn test_wrap_breaks_long_words() {
        let lines = wrap_text(&"x".repeat(100), Font::Helvetica, 10.0, 50.0);
        assert!(lines.len() > 1);
        assert_eq!(lines.concat().len(), 100);
    }

    #[test]
    fn test_wrap_blank_and_newlines() {
        assert!(wrap_text("   ", Font::Helvetica, 10.0, 100.0).is_empty());
        assert_eq!(
            wrap_text("one\ntwo", Font::Helvetica, 10.0, 100.0),
            vec!["one".to_string(), "two".to_string()]
        );
    }

    #[test]
    fn test_truncate() {
        let text = "A very long description that will not fit";
        let out = truncate_to_width(text, Font::Helvetica, 9.0, 60.0);
        assert!(out.ends_with("..."));
        assert!(Font::Helvetica.text_width(&out, 9.0) <= 60.0);
        assert_eq!(truncate_to_width("short", Font::Helvetica, 9.0, 60.0), "short");
    }
}
