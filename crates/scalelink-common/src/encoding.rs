//! Text encodings understood by scale terminals
//!
//! Each encoding fixes the line terminator of every generated file and the
//! byte representation used on the wire. Encoding to bytes is lossy: a
//! character the target charset cannot represent is dropped.

use serde::{Deserialize, Serialize};

use crate::error::ScaleError;

/// Curly quotes replaced by their ASCII counterparts before a line is
/// encoded to a single-byte charset.
pub const QUOTE_TRANSLATION: [(char, char); 4] = [
    ('\u{2018}', '\''),
    ('\u{2019}', '\''),
    ('\u{201C}', '"'),
    ('\u{201D}', '"'),
];

/// Windows-1252 code points in 0x80..=0x9F. The five undefined bytes
/// (0x81, 0x8D, 0x8F, 0x90, 0x9D) have no entry.
const CP1252_HIGH: [(char, u8); 27] = [
    ('\u{20AC}', 0x80),
    ('\u{201A}', 0x82),
    ('\u{0192}', 0x83),
    ('\u{201E}', 0x84),
    ('\u{2026}', 0x85),
    ('\u{2020}', 0x86),
    ('\u{2021}', 0x87),
    ('\u{02C6}', 0x88),
    ('\u{2030}', 0x89),
    ('\u{0160}', 0x8A),
    ('\u{2039}', 0x8B),
    ('\u{0152}', 0x8C),
    ('\u{017D}', 0x8E),
    ('\u{2018}', 0x91),
    ('\u{2019}', 0x92),
    ('\u{201C}', 0x93),
    ('\u{201D}', 0x94),
    ('\u{2022}', 0x95),
    ('\u{2013}', 0x96),
    ('\u{2014}', 0x97),
    ('\u{02DC}', 0x98),
    ('\u{2122}', 0x99),
    ('\u{0161}', 0x9A),
    ('\u{203A}', 0x9B),
    ('\u{0153}', 0x9C),
    ('\u{017E}', 0x9E),
    ('\u{0178}', 0x9F),
];

/// Charset configured on a scale system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum TextEncoding {
    /// ISO-8859-1, CRLF terminated
    #[serde(rename = "iso-8859-1")]
    Latin1,
    /// CP1252, LF terminated
    #[serde(rename = "cp1252")]
    Windows1252,
    /// UTF-8, LF terminated
    #[default]
    #[serde(rename = "utf-8")]
    Utf8,
}

impl TextEncoding {
    /// Line terminator appended to every record written in this encoding
    pub fn line_terminator(self) -> &'static str {
        match self {
            TextEncoding::Latin1 => "\r\n",
            TextEncoding::Windows1252 => "\n",
            TextEncoding::Utf8 => "\n",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TextEncoding::Latin1 => "iso-8859-1",
            TextEncoding::Windows1252 => "cp1252",
            TextEncoding::Utf8 => "utf-8",
        }
    }

    /// Encode one line for the wire.
    ///
    /// Single-byte charsets get the curly quote translation first, then every
    /// character without a byte in the charset is silently dropped.
    pub fn encode_line(self, line: &str) -> Vec<u8> {
        match self {
            TextEncoding::Utf8 => line.as_bytes().to_vec(),
            TextEncoding::Latin1 => translate_quotes(line)
                .chars()
                .filter_map(|c| u8::try_from(u32::from(c)).ok())
                .collect(),
            TextEncoding::Windows1252 => translate_quotes(line)
                .chars()
                .filter_map(encode_cp1252_char)
                .collect(),
        }
    }
}

impl std::str::FromStr for TextEncoding {
    type Err = ScaleError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().replace('_', "-").as_str() {
            "iso-8859-1" | "latin-1" | "latin1" => Ok(TextEncoding::Latin1),
            "cp1252" | "windows-1252" => Ok(TextEncoding::Windows1252),
            "utf-8" | "utf8" => Ok(TextEncoding::Utf8),
            _ => Err(ScaleError::UnknownEncoding(s.to_string())),
        }
    }
}

impl std::fmt::Display for TextEncoding {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Replace typographic quotes with ASCII quotes
pub fn translate_quotes(text: &str) -> String {
    text.chars()
        .map(|c| {
            QUOTE_TRANSLATION
                .iter()
                .find(|(from, _)| *from == c)
                .map(|(_, to)| *to)
                .unwrap_or(c)
        })
        .collect()
}

fn encode_cp1252_char(c: char) -> Option<u8> {
    let code = u32::from(c);
    match code {
        0x00..=0x7F | 0xA0..=0xFF => u8::try_from(code).ok(),
        _ => CP1252_HIGH
            .iter()
            .find(|(from, _)| *from == c)
            .map(|(_, byte)| *byte),
    }
}
