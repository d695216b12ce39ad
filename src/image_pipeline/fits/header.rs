//! Header cards to be written with an HDU.
//!
//! Cards keep their insertion order. Values are checked when they are set so
//! that a bad card fails at the call site rather than halfway through a write.

use std::fmt;

use crate::image_pipeline::common::error::{ConversionError, Result};

const KEYWORD_LEN: usize = 8;
/// Longest string that fits a single fixed-format card
const MAX_STRING_LEN: usize = 68;

#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    Str(String),
    Int(i64),
    Float(f64),
    Logical(bool),
    Undefined,
}

impl HeaderValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            HeaderValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            HeaderValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            HeaderValue::Float(f) => Some(*f),
            HeaderValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            HeaderValue::Logical(b) => Some(*b),
            _ => None,
        }
    }

    fn validate(&self) -> Result<()> {
        match self {
            HeaderValue::Str(s) => {
                check_ascii(s, "string value")?;
                // quotes are doubled on disk
                let stored = s.len() + s.matches('\'').count();
                if stored > MAX_STRING_LEN {
                    return Err(ConversionError::InvalidParameter(format!(
                        "string value too long for a header card ({} chars)",
                        s.len()
                    )));
                }
                Ok(())
            }
            HeaderValue::Float(f) if !f.is_finite() => Err(ConversionError::InvalidParameter(format!(
                "header values must be finite, got {f}"
            ))),
            _ => Ok(()),
        }
    }
}

impl fmt::Display for HeaderValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeaderValue::Str(s) => write!(f, "{s}"),
            HeaderValue::Int(i) => write!(f, "{i}"),
            HeaderValue::Float(x) => write!(f, "{x}"),
            HeaderValue::Logical(b) => write!(f, "{}", if *b { "T" } else { "F" }),
            HeaderValue::Undefined => Ok(()),
        }
    }
}

fn check_ascii(text: &str, what: &str) -> Result<()> {
    if text.bytes().all(|b| (0x20..=0x7e).contains(&b)) {
        Ok(())
    } else {
        Err(ConversionError::InvalidParameter(format!(
            "{what} {text:?} contains characters outside printable ASCII"
        )))
    }
}

fn normalize_keyword(keyword: &str) -> Result<String> {
    let upper = keyword.to_ascii_uppercase();
    let valid = !upper.is_empty()
        && upper.len() <= KEYWORD_LEN
        && upper
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'-' || b == b'_');
    if valid {
        Ok(upper)
    } else {
        Err(ConversionError::InvalidParameter(format!(
            "invalid header keyword {keyword:?}"
        )))
    }
}

macro_rules! int_header_value {
    ($($t:ty),*) => {
        $(impl From<$t> for HeaderValue {
            fn from(value: $t) -> Self {
                HeaderValue::Int(value as i64)
            }
        })*
    };
}

int_header_value!(i32, i64, u16, u32);

impl From<f64> for HeaderValue {
    fn from(value: f64) -> Self {
        HeaderValue::Float(value)
    }
}

impl From<bool> for HeaderValue {
    fn from(value: bool) -> Self {
        HeaderValue::Logical(value)
    }
}

impl From<&str> for HeaderValue {
    fn from(value: &str) -> Self {
        HeaderValue::Str(value.to_string())
    }
}

impl From<String> for HeaderValue {
    fn from(value: String) -> Self {
        HeaderValue::Str(value)
    }
}

impl<T: Into<HeaderValue>> From<Option<T>> for HeaderValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(HeaderValue::Undefined, Into::into)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeaderCard {
    pub keyword: String,
    pub value: HeaderValue,
    pub comment: String,
}

/// Ordered keyword records of one HDU.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FitsHeader {
    cards: Vec<HeaderCard>,
}

impl FitsHeader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `keyword`, replacing an existing card in place.
    pub fn set(&mut self, keyword: &str, value: impl Into<HeaderValue>, comment: &str) -> Result<()> {
        let keyword = normalize_keyword(keyword)?;
        if keyword == "END" {
            return Err(ConversionError::InvalidParameter("END is not a value keyword".to_string()));
        }
        let value = value.into();
        value.validate()?;
        check_ascii(comment, "comment")?;

        let card = HeaderCard {
            keyword,
            value,
            comment: comment.to_string(),
        };
        match self.cards.iter_mut().find(|c| c.keyword == card.keyword) {
            Some(existing) => *existing = card,
            None => self.cards.push(card),
        }
        Ok(())
    }

    pub fn get(&self, keyword: &str) -> Option<&HeaderValue> {
        let keyword = keyword.to_ascii_uppercase();
        self.cards.iter().find(|c| c.keyword == keyword).map(|c| &c.value)
    }

    pub fn cards(&self) -> &[HeaderCard] {
        &self.cards
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }
}
