//! Character sets used to convert between captured bytes and text.
//!
//! Only a small, fixed family of encodings is supported. Captured output is
//! always decoded lossily: undecodable sequences become U+FFFD and `\r\n`
//! pairs collapse to `\n`, so assertions never fail on a decoding error.

use std::{fmt, str::FromStr};

use serde::Deserialize;
use thiserror::Error;

use crate::error::RunnerError;

/// Character set applied to text-form input and captured output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "String")]
pub enum Charset {
    /// UTF-8, the default.
    #[default]
    Utf8,
    /// ISO-8859-1: every byte maps to the code point of the same value.
    Latin1,
    /// 7-bit US-ASCII.
    Ascii,
}

/// How characters the charset cannot represent are handled when encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EncodeErrors {
    /// Fail with [`EncodeError`].
    #[default]
    Strict,
    /// Substitute `\xNN`, `\uNNNN` or `\UNNNNNNNN` escapes.
    BackslashReplace,
}

/// A character could not be represented in the target charset.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{charset}' codec can't encode character {ch:?} in position {position}")]
pub struct EncodeError {
    /// Charset that rejected the character.
    pub charset: Charset,
    /// The offending character.
    pub ch: char,
    /// Character index within the input text.
    pub position: usize,
}

/// Bytes were not valid in the source charset.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("'{charset}' codec can't decode byte 0x{byte:02x} in position {position}")]
pub struct DecodeError {
    /// Charset that rejected the byte.
    pub charset: Charset,
    /// First invalid byte.
    pub byte: u8,
    /// Byte offset of the invalid sequence.
    pub position: usize,
}

impl Charset {
    /// Canonical label, as accepted by [`Charset::from_str`].
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Utf8 => "utf-8",
            Self::Latin1 => "latin-1",
            Self::Ascii => "ascii",
        }
    }

    const fn max_code_point(self) -> u32 {
        match self {
            Self::Utf8 => char::MAX as u32,
            Self::Latin1 => 0xff,
            Self::Ascii => 0x7f,
        }
    }

    /// Encode `text`, applying `errors` to unrepresentable characters.
    ///
    /// # Errors
    ///
    /// Returns [`EncodeError`] for the first unrepresentable character when
    /// `errors` is [`EncodeErrors::Strict`].
    pub fn encode(self, text: &str, errors: EncodeErrors) -> Result<Vec<u8>, EncodeError> {
        if self == Self::Utf8 {
            return Ok(text.as_bytes().to_vec());
        }
        let limit = self.max_code_point();
        let mut out = Vec::with_capacity(text.len());
        for (position, ch) in text.chars().enumerate() {
            match u8::try_from(u32::from(ch)) {
                Ok(byte) if u32::from(byte) <= limit => out.push(byte),
                _ => match errors {
                    EncodeErrors::Strict => {
                        return Err(EncodeError {
                            charset: self,
                            ch,
                            position,
                        });
                    }
                    EncodeErrors::BackslashReplace => {
                        out.extend_from_slice(backslash_escape(ch).as_bytes());
                    }
                },
            }
        }
        Ok(out)
    }

    /// Decode `bytes`, failing on the first invalid sequence.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError`] when `bytes` are not valid in this charset.
    pub fn decode(self, bytes: &[u8]) -> Result<String, DecodeError> {
        match self {
            Self::Utf8 => std::str::from_utf8(bytes)
                .map(str::to_owned)
                .map_err(|err| {
                    let position = err.valid_up_to();
                    DecodeError {
                        charset: self,
                        byte: bytes.get(position).copied().unwrap_or_default(),
                        position,
                    }
                }),
            Self::Latin1 => Ok(bytes.iter().copied().map(char::from).collect()),
            Self::Ascii => bytes
                .iter()
                .position(|byte| !byte.is_ascii())
                .map_or_else(
                    || Ok(bytes.iter().copied().map(char::from).collect()),
                    |position| {
                        Err(DecodeError {
                            charset: self,
                            byte: bytes.get(position).copied().unwrap_or_default(),
                            position,
                        })
                    },
                ),
        }
    }

    /// Decode `bytes` for display, replacing invalid sequences with U+FFFD
    /// and normalising `\r\n` to `\n`.
    #[must_use]
    pub fn decode_lossy(self, bytes: &[u8]) -> String {
        let text: String = match self {
            Self::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
            Self::Latin1 => bytes.iter().copied().map(char::from).collect(),
            Self::Ascii => bytes
                .iter()
                .map(|&byte| {
                    if byte.is_ascii() {
                        char::from(byte)
                    } else {
                        char::REPLACEMENT_CHARACTER
                    }
                })
                .collect(),
        };
        text.replace("\r\n", "\n")
    }
}

fn backslash_escape(ch: char) -> String {
    let code = u32::from(ch);
    if code <= 0xff {
        format!("\\x{code:02x}")
    } else if code <= 0xffff {
        format!("\\u{code:04x}")
    } else {
        format!("\\U{code:08x}")
    }
}

impl fmt::Display for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Charset {
    type Err = RunnerError;

    fn from_str(label: &str) -> Result<Self, Self::Err> {
        let normalised = label.trim().to_ascii_lowercase().replace('_', "-");
        match normalised.as_str() {
            "utf-8" | "utf8" => Ok(Self::Utf8),
            "latin-1" | "latin1" | "iso-8859-1" | "iso8859-1" | "l1" => Ok(Self::Latin1),
            "ascii" | "us-ascii" => Ok(Self::Ascii),
            _ => Err(RunnerError::UnknownCharset {
                label: label.to_owned(),
            }),
        }
    }
}

impl TryFrom<String> for Charset {
    type Error = RunnerError;

    fn try_from(label: String) -> Result<Self, Self::Error> {
        label.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("utf-8", Charset::Utf8)]
    #[case("UTF8", Charset::Utf8)]
    #[case("latin_1", Charset::Latin1)]
    #[case("ISO-8859-1", Charset::Latin1)]
    #[case("us-ascii", Charset::Ascii)]
    fn parses_labels(#[case] label: &str, #[case] expected: Charset) {
        assert_eq!(label.parse::<Charset>().expect("known label"), expected);
    }

    #[test]
    fn unknown_label_is_rejected() {
        let err = "ebcdic".parse::<Charset>().expect_err("unknown label");
        assert!(matches!(err, RunnerError::UnknownCharset { ref label } if label == "ebcdic"));
    }

    #[test]
    fn strict_encoding_reports_first_unrepresentable_char() {
        let err = Charset::Ascii
            .encode("abcé", EncodeErrors::Strict)
            .expect_err("non-ascii");
        assert_eq!(err.ch, 'é');
        assert_eq!(err.position, 3);
    }

    #[rstest]
    #[case(Charset::Ascii, "é", "\\xe9")]
    #[case(Charset::Latin1, "\u{20ac}", "\\u20ac")]
    #[case(Charset::Latin1, "\u{1f600}", "\\U0001f600")]
    fn backslash_replace_escapes(#[case] charset: Charset, #[case] text: &str, #[case] expected: &str) {
        let bytes = charset
            .encode(text, EncodeErrors::BackslashReplace)
            .expect("never fails");
        assert_eq!(bytes, expected.as_bytes());
    }

    #[test]
    fn latin1_round_trips_high_bytes() {
        let bytes = Charset::Latin1
            .encode("café", EncodeErrors::Strict)
            .expect("representable");
        assert_eq!(bytes, b"caf\xe9");
        assert_eq!(Charset::Latin1.decode(&bytes).expect("decodes"), "café");
    }

    #[test]
    fn lossy_decode_replaces_and_normalises_newlines() {
        let text = Charset::Utf8.decode_lossy(b"ok\r\n\xffdone\r\n");
        assert_eq!(text, "ok\n\u{fffd}done\n");
    }

    #[test]
    fn strict_utf8_decode_reports_offset() {
        let err = Charset::Utf8.decode(b"ab\xffc").expect_err("invalid");
        assert_eq!(err.position, 2);
        assert_eq!(err.byte, 0xff);
    }
}
