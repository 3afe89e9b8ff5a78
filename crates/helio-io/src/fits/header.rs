//! FITS header cards and blocks.
//!
//! A header is a sequence of 80-byte cards terminated by `END` and padded
//! with blanks to a 2880-byte boundary. Values use the fixed format:
//! logicals and numbers right-justified to column 30, strings quoted from
//! column 11 with embedded quotes doubled.

use std::io::{Read, Write};

use crate::error::{IoError, IoResult};
use crate::fits::{padding_for, BLOCK_SIZE};

/// Length of one header card.
const CARD_SIZE: usize = 80;

/// A typed FITS card value.
#[derive(Debug, Clone, PartialEq)]
pub enum CardValue {
    /// Logical `T`/`F`.
    Logical(bool),
    /// Integer value.
    Int(i64),
    /// Floating-point value.
    Real(f64),
    /// String value.
    Str(String),
}

impl CardValue {
    /// Integer view, accepting integral reals.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            CardValue::Int(v) => Some(*v),
            CardValue::Real(v) if v.fract() == 0.0 => Some(*v as i64),
            _ => None,
        }
    }

    /// Floating-point view of a numeric card.
    pub fn as_real(&self) -> Option<f64> {
        match self {
            CardValue::Int(v) => Some(*v as f64),
            CardValue::Real(v) => Some(*v),
            _ => None,
        }
    }

    /// String view.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            CardValue::Str(v) => Some(v),
            _ => None,
        }
    }
}

/// One keyword/value header card.
#[derive(Debug, Clone, PartialEq)]
pub struct Card {
    /// Keyword, at most 8 ASCII characters.
    pub keyword: String,
    /// Typed value.
    pub value: CardValue,
    /// Optional comment.
    pub comment: Option<String>,
}

impl Card {
    /// Creates a logical card.
    pub fn logical(keyword: &str, value: bool) -> Self {
        Self {
            keyword: keyword.to_string(),
            value: CardValue::Logical(value),
            comment: None,
        }
    }

    /// Creates an integer card.
    pub fn int(keyword: &str, value: i64) -> Self {
        Self {
            keyword: keyword.to_string(),
            value: CardValue::Int(value),
            comment: None,
        }
    }

    /// Creates a floating-point card.
    pub fn real(keyword: &str, value: f64) -> Self {
        Self {
            keyword: keyword.to_string(),
            value: CardValue::Real(value),
            comment: None,
        }
    }

    /// Creates a string card.
    pub fn string(keyword: &str, value: &str) -> Self {
        Self {
            keyword: keyword.to_string(),
            value: CardValue::Str(value.to_string()),
            comment: None,
        }
    }

    /// Attaches a comment.
    pub fn with_comment(mut self, comment: &str) -> Self {
        self.comment = Some(comment.to_string());
        self
    }

    /// Formats the card into its 80-byte representation.
    fn format(&self) -> [u8; CARD_SIZE] {
        let mut out = [b' '; CARD_SIZE];
        let kw = self.keyword.as_bytes();
        out[..kw.len().min(8)].copy_from_slice(&kw[..kw.len().min(8)]);
        out[8] = b'=';
        // out[9] stays blank.

        let body = match &self.value {
            CardValue::Logical(v) => format!("{:>20}", if *v { "T" } else { "F" }),
            CardValue::Int(v) => format!("{v:>20}"),
            CardValue::Real(v) => format!("{:>20}", format_real(*v)),
            CardValue::Str(v) => {
                let escaped = v.replace('\'', "''");
                // Strings open at column 11; pad short values to the
                // conventional 8-character minimum.
                format!("'{escaped:<8}'")
            }
        };
        let mut text = body;
        if let Some(comment) = &self.comment {
            text.push_str(" / ");
            text.push_str(comment);
        }
        let bytes = text.as_bytes();
        let n = bytes.len().min(CARD_SIZE - 10);
        out[10..10 + n].copy_from_slice(&bytes[..n]);
        out
    }

    /// Parses a value card; returns `None` for comments, blanks and `END`.
    fn parse(bytes: &[u8]) -> Option<Card> {
        let keyword = String::from_utf8_lossy(&bytes[..8]).trim_end().to_string();
        if keyword.is_empty()
            || keyword == "END"
            || keyword == "COMMENT"
            || keyword == "HISTORY"
            || bytes[8] != b'='
        {
            return None;
        }
        let rest = String::from_utf8_lossy(&bytes[10..]).to_string();
        let trimmed = rest.trim_start();

        let (value, after_value) = if let Some(stripped) = trimmed.strip_prefix('\'') {
            // Scan for the closing quote, honoring doubled quotes.
            let mut text = String::new();
            let mut chars = stripped.chars().peekable();
            loop {
                match chars.next() {
                    Some('\'') => {
                        if chars.peek() == Some(&'\'') {
                            chars.next();
                            text.push('\'');
                        } else {
                            break;
                        }
                    }
                    Some(c) => text.push(c),
                    None => break,
                }
            }
            (
                CardValue::Str(text.trim_end().to_string()),
                chars.collect::<String>(),
            )
        } else {
            let (value_part, comment_part) = match trimmed.split_once('/') {
                Some((v, c)) => (v.trim(), format!("/{c}")),
                None => (trimmed.trim(), String::new()),
            };
            let value = match value_part {
                "T" => CardValue::Logical(true),
                "F" => CardValue::Logical(false),
                other => {
                    if let Ok(v) = other.parse::<i64>() {
                        CardValue::Int(v)
                    } else if let Ok(v) = other.parse::<f64>() {
                        CardValue::Real(v)
                    } else {
                        return None;
                    }
                }
            };
            (value, comment_part)
        };

        let comment = after_value
            .split_once('/')
            .map(|(_, c)| c.trim().to_string())
            .filter(|c| !c.is_empty());

        Some(Card {
            keyword,
            value,
            comment,
        })
    }
}

/// Formats a real in a FITS-parseable fixed/exponent notation.
fn format_real(v: f64) -> String {
    if v == v.trunc() && v.abs() < 1e15 {
        format!("{v:.1}")
    } else {
        format!("{v:.10E}")
    }
}

/// A parsed or under-construction header block.
#[derive(Debug, Clone, Default)]
pub struct Header {
    cards: Vec<Card>,
}

impl Header {
    /// Creates an empty header.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a card.
    pub fn push(&mut self, card: Card) {
        self.cards.push(card);
    }

    /// Borrows all cards.
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    /// Value of the first card with `keyword`.
    pub fn get(&self, keyword: &str) -> Option<&CardValue> {
        self.cards
            .iter()
            .find(|c| c.keyword == keyword)
            .map(|c| &c.value)
    }

    /// Integer value of `keyword`.
    pub fn get_int(&self, keyword: &str) -> Option<i64> {
        self.get(keyword).and_then(CardValue::as_int)
    }

    /// Floating-point value of `keyword`.
    pub fn get_real(&self, keyword: &str) -> Option<f64> {
        self.get(keyword).and_then(CardValue::as_real)
    }

    /// String value of `keyword`.
    pub fn get_str(&self, keyword: &str) -> Option<&str> {
        self.get(keyword).and_then(CardValue::as_str)
    }

    /// Required integer value of `keyword`.
    pub fn require_int(&self, keyword: &str) -> IoResult<i64> {
        self.get_int(keyword)
            .ok_or_else(|| IoError::MissingData(format!("header card {keyword}")))
    }

    /// Serializes the cards, the `END` card and the block padding.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> IoResult<()> {
        let mut written = 0usize;
        for card in &self.cards {
            writer.write_all(&card.format())?;
            written += CARD_SIZE;
        }
        let mut end = [b' '; CARD_SIZE];
        end[..3].copy_from_slice(b"END");
        writer.write_all(&end)?;
        written += CARD_SIZE;

        let pad = padding_for(written);
        writer.write_all(&vec![b' '; pad])?;
        Ok(())
    }

    /// Reads whole blocks until the `END` card.
    ///
    /// Returns `Ok(None)` at a clean end of file (no further HDU).
    pub fn read_from<R: Read>(reader: &mut R) -> IoResult<Option<Header>> {
        let mut header = Header::new();
        let mut block = [0u8; BLOCK_SIZE];
        loop {
            match reader.read_exact(&mut block) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    return if header.cards.is_empty() {
                        Ok(None)
                    } else {
                        Err(IoError::DecodeError(
                            "header block truncated before END".to_string(),
                        ))
                    };
                }
                Err(e) => return Err(e.into()),
            }
            for card_bytes in block.chunks_exact(CARD_SIZE) {
                if &card_bytes[..3] == b"END" && card_bytes[3..8].iter().all(|&b| b == b' ') {
                    return Ok(Some(header));
                }
                if let Some(card) = Card::parse(card_bytes) {
                    header.push(card);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip(card: Card) -> Card {
        let bytes = card.format();
        Card::parse(&bytes).expect("card should parse back")
    }

    #[test]
    fn test_card_size() {
        assert_eq!(Card::int("NAXIS1", 1024).format().len(), 80);
    }

    #[test]
    fn test_int_roundtrip() {
        let card = roundtrip(Card::int("BITPIX", 16));
        assert_eq!(card.keyword, "BITPIX");
        assert_eq!(card.value, CardValue::Int(16));
    }

    #[test]
    fn test_logical_roundtrip() {
        assert_eq!(
            roundtrip(Card::logical("SIMPLE", true)).value,
            CardValue::Logical(true)
        );
    }

    #[test]
    fn test_real_roundtrip() {
        let card = roundtrip(Card::real("WAVELNTH", 656.28));
        let CardValue::Real(v) = card.value else { panic!() };
        assert!((v - 656.28).abs() < 1e-8);
    }

    #[test]
    fn test_string_roundtrip_with_quote() {
        let card = roundtrip(Card::string("CREATOR", "JSol'Ex"));
        assert_eq!(card.value, CardValue::Str("JSol'Ex".to_string()));
    }

    #[test]
    fn test_comment_preserved() {
        let card = roundtrip(Card::int("BZERO", 32768).with_comment("offset"));
        assert_eq!(card.comment.as_deref(), Some("offset"));
        assert_eq!(card.value, CardValue::Int(32768));
    }

    #[test]
    fn test_header_block_roundtrip() {
        let mut header = Header::new();
        header.push(Card::logical("SIMPLE", true));
        header.push(Card::int("BITPIX", 16));
        header.push(Card::int("NAXIS", 2));
        header.push(Card::string("OBJECT", "Sun"));

        let mut bytes = Vec::new();
        header.write_to(&mut bytes).unwrap();
        assert_eq!(bytes.len() % BLOCK_SIZE, 0);

        let parsed = Header::read_from(&mut bytes.as_slice()).unwrap().unwrap();
        assert_eq!(parsed.get_int("BITPIX"), Some(16));
        assert_eq!(parsed.get_str("OBJECT"), Some("Sun"));
    }

    #[test]
    fn test_empty_stream_is_none() {
        let empty: &[u8] = &[];
        assert!(Header::read_from(&mut &*empty).unwrap().is_none());
    }
}
