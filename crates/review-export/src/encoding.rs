//! Character codes to Unicode for text-showing operators
//!
//! Simple fonts decode one byte per glyph through their base encoding and
//! `/Differences`; composite (Type0) fonts decode two bytes per glyph. A
//! `/ToUnicode` CMap, when present, takes precedence over both.

use crate::metrics::win_ansi_char;
use crate::pdf::{decode_text, resolve};
use lopdf::{Dictionary, Document, Object};
use std::collections::HashMap;

/// Decoded glyph: the raw character code and the text it stands for
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    pub code: u32,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BaseEncoding {
    WinAnsi,
    /// StandardEncoding differs from WinAnsi only in the quote glyphs of the
    /// ASCII range that matter for matching
    Standard,
    MacRoman,
}

impl BaseEncoding {
    fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"WinAnsiEncoding" => Some(Self::WinAnsi),
            b"StandardEncoding" => Some(Self::Standard),
            b"MacRomanEncoding" => Some(Self::MacRoman),
            _ => None,
        }
    }

    fn decode(self, code: u8) -> char {
        match (self, code) {
            (Self::Standard, 0x27) => '\u{2019}',
            (Self::Standard, 0x60) => '\u{2018}',
            (Self::MacRoman, 0x80..=0xFF) => mac_roman_char(code),
            _ => win_ansi_char(code),
        }
    }
}

/// Upper half of MacRomanEncoding
fn mac_roman_char(code: u8) -> char {
    const HIGH: [u16; 128] = [
        0xC4, 0xC5, 0xC7, 0xC9, 0xD1, 0xD6, 0xDC, 0xE1, 0xE0, 0xE2, 0xE4, 0xE3, 0xE5, 0xE7, 0xE9,
        0xE8, 0xEA, 0xEB, 0xED, 0xEC, 0xEE, 0xEF, 0xF1, 0xF3, 0xF2, 0xF4, 0xF6, 0xF5, 0xFA, 0xF9,
        0xFB, 0xFC, 0x2020, 0xB0, 0xA2, 0xA3, 0xA7, 0x2022, 0xB6, 0xDF, 0xAE, 0xA9, 0x2122, 0xB4,
        0xA8, 0x2260, 0xC6, 0xD8, 0x221E, 0xB1, 0x2264, 0x2265, 0xA5, 0xB5, 0x2202, 0x2211, 0x220F,
        0x3C0, 0x222B, 0xAA, 0xBA, 0x3A9, 0xE6, 0xF8, 0xBF, 0xA1, 0xAC, 0x221A, 0x192, 0x2248,
        0x2206, 0xAB, 0xBB, 0x2026, 0xA0, 0xC0, 0xC3, 0xD5, 0x152, 0x153, 0x2013, 0x2014, 0x201C,
        0x201D, 0x2018, 0x2019, 0xF7, 0x25CA, 0xFF, 0x178, 0x2044, 0x20AC, 0x2039, 0x203A, 0xFB01,
        0xFB02, 0x2021, 0xB7, 0x201A, 0x201E, 0x2030, 0xC2, 0xCA, 0xC1, 0xCB, 0xC8, 0xCD, 0xCE,
        0xCF, 0xCC, 0xD3, 0xD4, 0xF8FF, 0xD2, 0xDA, 0xDB, 0xD9, 0x131, 0x2C6, 0x2DC, 0xAF, 0x2D8,
        0x2D9, 0x2DA, 0xB8, 0x2DD, 0x2DB, 0x2C7,
    ];
    let unit = HIGH[(code - 0x80) as usize];
    char::from_u32(unit as u32).unwrap_or('\u{FFFD}')
}

/// Unicode text of an Adobe glyph name
///
/// Covers single-character names, `uniXXXX`/`uXXXX[XX]` names and the
/// punctuation and ligature names PDF producers commonly put in
/// `/Differences`.
pub fn glyph_name_text(name: &str) -> Option<String> {
    if let Some(hex) = name.strip_prefix("uni") {
        if hex.len() >= 4 && hex.len() % 4 == 0 {
            let units: Option<Vec<u16>> = hex
                .as_bytes()
                .chunks(4)
                .map(|c| std::str::from_utf8(c).ok().and_then(|s| u16::from_str_radix(s, 16).ok()))
                .collect();
            return units.map(|u| String::from_utf16_lossy(&u));
        }
    }
    if let Some(hex) = name.strip_prefix('u') {
        if (4..=6).contains(&hex.len()) {
            if let Some(c) = u32::from_str_radix(hex, 16).ok().and_then(char::from_u32) {
                return Some(c.to_string());
            }
        }
    }
    let mut chars = name.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        if c.is_ascii_alphabetic() {
            return Some(c.to_string());
        }
    }
    let text = match name {
        "space" | "nbspace" => " ",
        "exclam" => "!",
        "quotedbl" => "\"",
        "numbersign" => "#",
        "dollar" => "$",
        "percent" => "%",
        "ampersand" => "&",
        "quotesingle" => "'",
        "parenleft" => "(",
        "parenright" => ")",
        "asterisk" => "*",
        "plus" => "+",
        "comma" => ",",
        "hyphen" | "minus" => "-",
        "period" => ".",
        "slash" => "/",
        "zero" => "0",
        "one" => "1",
        "two" => "2",
        "three" => "3",
        "four" => "4",
        "five" => "5",
        "six" => "6",
        "seven" => "7",
        "eight" => "8",
        "nine" => "9",
        "colon" => ":",
        "semicolon" => ";",
        "less" => "<",
        "equal" => "=",
        "greater" => ">",
        "question" => "?",
        "at" => "@",
        "bracketleft" => "[",
        "backslash" => "\\",
        "bracketright" => "]",
        "underscore" => "_",
        "braceleft" => "{",
        "bar" => "|",
        "braceright" => "}",
        "quoteleft" => "\u{2018}",
        "quoteright" => "\u{2019}",
        "quotedblleft" => "\u{201C}",
        "quotedblright" => "\u{201D}",
        "quotesinglbase" => "\u{201A}",
        "quotedblbase" => "\u{201E}",
        "endash" => "\u{2013}",
        "emdash" => "\u{2014}",
        "bullet" => "\u{2022}",
        "ellipsis" => "\u{2026}",
        "section" => "\u{00A7}",
        "paragraph" => "\u{00B6}",
        "degree" => "\u{00B0}",
        "copyright" => "\u{00A9}",
        "registered" => "\u{00AE}",
        "trademark" => "\u{2122}",
        "Euro" => "\u{20AC}",
        "sterling" => "\u{00A3}",
        "yen" => "\u{00A5}",
        "cent" => "\u{00A2}",
        "fi" => "fi",
        "fl" => "fl",
        "ff" => "ff",
        "ffi" => "ffi",
        "ffl" => "ffl",
        "eacute" => "\u{00E9}",
        "egrave" => "\u{00E8}",
        "aacute" => "\u{00E1}",
        "agrave" => "\u{00E0}",
        "adieresis" => "\u{00E4}",
        "odieresis" => "\u{00F6}",
        "udieresis" => "\u{00FC}",
        "germandbls" => "\u{00DF}",
        "ccedilla" => "\u{00E7}",
        "ntilde" => "\u{00F1}",
        _ => return None,
    };
    Some(text.to_string())
}

/// Parsed `/ToUnicode` CMap
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToUnicode {
    /// Bytes per code, from the first `codespacerange`
    code_len: Option<usize>,
    map: HashMap<u32, String>,
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Hex(Vec<u8>),
    Open,
    Close,
    Word(String),
}

fn tokenize(data: &[u8]) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut i = 0;
    while i < data.len() {
        let b = data[i];
        match b {
            b'%' => {
                while i < data.len() && data[i] != b'\n' && data[i] != b'\r' {
                    i += 1;
                }
            }
            b'<' if data.get(i + 1) == Some(&b'<') => {
                tokens.push(Token::Word("<<".to_string()));
                i += 2;
            }
            b'>' if data.get(i + 1) == Some(&b'>') => {
                tokens.push(Token::Word(">>".to_string()));
                i += 2;
            }
            b'<' => {
                let start = i + 1;
                let end = data[start..]
                    .iter()
                    .position(|&c| c == b'>')
                    .map_or(data.len(), |p| start + p);
                let digits: Vec<u8> = data[start..end]
                    .iter()
                    .copied()
                    .filter(u8::is_ascii_hexdigit)
                    .collect();
                tokens.push(Token::Hex(hex_bytes(&digits)));
                i = end + 1;
            }
            b'[' => {
                tokens.push(Token::Open);
                i += 1;
            }
            b']' => {
                tokens.push(Token::Close);
                i += 1;
            }
            _ if b.is_ascii_whitespace() => i += 1,
            _ => {
                let start = i;
                while i < data.len()
                    && !data[i].is_ascii_whitespace()
                    && !matches!(data[i], b'<' | b'>' | b'[' | b']' | b'%')
                {
                    i += 1;
                }
                if i == start {
                    i += 1;
                    continue;
                }
                tokens.push(Token::Word(String::from_utf8_lossy(&data[start..i]).into_owned()));
            }
        }
    }
    tokens
}

fn hex_bytes(digits: &[u8]) -> Vec<u8> {
    let value = |d: u8| (d as char).to_digit(16).unwrap_or(0) as u8;
    digits
        .chunks(2)
        .map(|pair| match pair {
            [hi, lo] => value(*hi) << 4 | value(*lo),
            [hi] => value(*hi) << 4,
            _ => 0,
        })
        .collect()
}

fn code_value(bytes: &[u8]) -> u32 {
    bytes.iter().fold(0u32, |acc, &b| acc << 8 | b as u32)
}

fn utf16_text(bytes: &[u8]) -> String {
    let units: Vec<u16> = bytes
        .chunks(2)
        .map(|pair| match pair {
            [hi, lo] => u16::from_be_bytes([*hi, *lo]),
            [lo] => *lo as u16,
            _ => 0,
        })
        .collect();
    String::from_utf16_lossy(&units)
}

/// Add `offset` to the last UTF-16 unit of a bfrange destination
fn offset_text(base: &[u8], offset: u32) -> String {
    let mut bytes = base.to_vec();
    if bytes.len() >= 2 {
        let n = bytes.len();
        let last = u16::from_be_bytes([bytes[n - 2], bytes[n - 1]]).wrapping_add(offset as u16);
        bytes[n - 2..].copy_from_slice(&last.to_be_bytes());
    }
    utf16_text(&bytes)
}

/// Ranges wider than this are truncated
const MAX_RANGE: u32 = 0xFFFF;

impl ToUnicode {
    pub fn parse(data: &[u8]) -> Self {
        let tokens = tokenize(data);
        let mut cmap = ToUnicode::default();
        let mut i = 0;
        while i < tokens.len() {
            match &tokens[i] {
                Token::Word(w) if w == "begincodespacerange" => {
                    if let (None, Some(Token::Hex(lo))) = (cmap.code_len, tokens.get(i + 1)) {
                        cmap.code_len = Some(lo.len().max(1));
                    }
                    i += 1;
                }
                Token::Word(w) if w == "beginbfchar" => {
                    i += 1;
                    while let (Some(Token::Hex(src)), Some(Token::Hex(dst))) =
                        (tokens.get(i), tokens.get(i + 1))
                    {
                        cmap.map.insert(code_value(src), utf16_text(dst));
                        i += 2;
                    }
                }
                Token::Word(w) if w == "beginbfrange" => {
                    i += 1;
                    while let (Some(Token::Hex(lo)), Some(Token::Hex(hi))) =
                        (tokens.get(i), tokens.get(i + 1))
                    {
                        let (lo, hi) = (code_value(lo), code_value(hi));
                        let hi = hi.min(lo.saturating_add(MAX_RANGE));
                        match tokens.get(i + 2) {
                            Some(Token::Hex(dst)) => {
                                for code in lo..=hi {
                                    cmap.map.insert(code, offset_text(dst, code - lo));
                                }
                                i += 3;
                            }
                            Some(Token::Open) => {
                                i += 3;
                                let mut code = lo;
                                while let Some(Token::Hex(dst)) = tokens.get(i) {
                                    if code <= hi {
                                        cmap.map.insert(code, utf16_text(dst));
                                    }
                                    code += 1;
                                    i += 1;
                                }
                                if tokens.get(i) == Some(&Token::Close) {
                                    i += 1;
                                }
                            }
                            _ => break,
                        }
                    }
                }
                _ => i += 1,
            }
        }
        cmap
    }

    pub fn get(&self, code: u32) -> Option<&str> {
        self.map.get(&code).map(String::as_str)
    }
}

/// How a font's string operands map to Unicode
#[derive(Debug, Clone, PartialEq)]
pub struct FontDecoder {
    /// Bytes per character code
    code_len: usize,
    base: BaseEncoding,
    differences: HashMap<u32, String>,
    to_unicode: Option<ToUnicode>,
    /// No font dictionary: fall back to guessing the string's encoding
    unknown: bool,
}

impl Default for FontDecoder {
    fn default() -> Self {
        Self::simple()
    }
}

impl FontDecoder {
    /// Single-byte WinAnsi decoding
    pub fn simple() -> Self {
        Self {
            code_len: 1,
            base: BaseEncoding::WinAnsi,
            differences: HashMap::new(),
            to_unicode: None,
            unknown: false,
        }
    }

    /// Decoder for text drawn with a font that cannot be resolved
    pub fn unknown() -> Self {
        Self {
            unknown: true,
            ..Self::simple()
        }
    }

    pub fn from_font(doc: &Document, font: &Dictionary) -> Self {
        let composite = matches!(
            font.get(b"Subtype").map(|o| resolve(doc, o)),
            Ok(Object::Name(n)) if n == b"Type0"
        );
        let to_unicode = font
            .get(b"ToUnicode")
            .ok()
            .and_then(|o| resolve(doc, o).as_stream().ok())
            .map(|s| {
                let data = s.decompressed_content().unwrap_or_else(|_| s.content.clone());
                ToUnicode::parse(&data)
            });

        let mut base = BaseEncoding::WinAnsi;
        let mut differences = HashMap::new();
        if !composite {
            match font.get(b"Encoding").map(|o| resolve(doc, o)) {
                Ok(Object::Name(name)) => {
                    base = BaseEncoding::from_name(name).unwrap_or(base);
                }
                Ok(Object::Dictionary(enc)) => {
                    if let Ok(Object::Name(name)) = enc.get(b"BaseEncoding").map(|o| resolve(doc, o)) {
                        base = BaseEncoding::from_name(name).unwrap_or(base);
                    }
                    if let Ok(Object::Array(items)) = enc.get(b"Differences").map(|o| resolve(doc, o)) {
                        differences = parse_differences(items);
                    }
                }
                _ => {}
            }
        }

        let code_len = if composite {
            to_unicode
                .as_ref()
                .and_then(|t| t.code_len)
                .unwrap_or(2)
        } else {
            1
        };

        Self {
            code_len,
            base,
            differences,
            to_unicode,
            unknown: false,
        }
    }

    pub fn is_composite(&self) -> bool {
        self.code_len > 1
    }

    pub fn decode(&self, bytes: &[u8]) -> Vec<Glyph> {
        if self.unknown {
            return decode_text(bytes)
                .chars()
                .map(|c| Glyph {
                    code: c as u32,
                    text: c.to_string(),
                })
                .collect();
        }
        bytes
            .chunks(self.code_len)
            .map(|chunk| {
                let code = code_value(chunk);
                Glyph {
                    code,
                    text: self.code_text(code),
                }
            })
            .collect()
    }

    fn code_text(&self, code: u32) -> String {
        if let Some(text) = self.to_unicode.as_ref().and_then(|t| t.get(code)) {
            return text.to_string();
        }
        if self.is_composite() {
            return '\u{FFFD}'.to_string();
        }
        if let Some(text) = self.differences.get(&code) {
            return text.clone();
        }
        self.base.decode(code as u8).to_string()
    }
}

fn parse_differences(items: &[Object]) -> HashMap<u32, String> {
    let mut map = HashMap::new();
    let mut code = 0u32;
    for item in items {
        match item {
            Object::Integer(n) => code = (*n).max(0) as u32,
            Object::Name(name) => {
                if let Some(text) = glyph_name_text(&String::from_utf8_lossy(name)) {
                    map.insert(code, text);
                }
                code += 1;
            }
            _ => {}
        }
    }
    map
}
