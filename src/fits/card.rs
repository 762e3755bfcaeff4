use thiserror::Error;

/// Length of a single header card in bytes.
pub const CARD_LEN: usize = 80;

/// Byte index where a fixed-format value field ends (exclusive).
const FIXED_VALUE_END: usize = 30;

/// Error raised when a single header card cannot be built or assigned.
///
/// These are recovered locally during metadata copy: a card that cannot
/// be represented is skipped and counted, never fatal.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CardError {
    #[error("invalid header keyword: {keyword:?}")]
    InvalidKeyword { keyword: String },

    #[error("value for keyword {keyword} does not fit in a header card")]
    ValueTooLong { keyword: String },
}

/// A typed header card value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Logical(bool),
    Integer(i64),
    Real(f64),
    String(String),
    /// Value field present but empty, or not parseable as any typed form.
    Undefined,
}

/// One 80-byte header record.
///
/// Cards parsed from a file keep their raw image so copied metadata
/// round-trips byte-exactly, including the original comment and value
/// formatting. Cards built programmatically are rendered in FITS fixed
/// format on serialization.
#[derive(Debug, Clone)]
pub struct Card {
    keyword: String,
    value: Option<Value>,
    comment: Option<String>,
    raw: Option<[u8; CARD_LEN]>,
}

impl Card {
    /// Build a value card, validating the keyword and value length.
    pub fn new(keyword: &str, value: Value, comment: Option<&str>) -> Result<Self, CardError> {
        let keyword = keyword.trim().to_uppercase();
        validate_keyword(&keyword)?;

        let card = Self {
            keyword,
            value: Some(value),
            comment: comment.map(|c| c.to_string()),
            raw: None,
        };

        // Render once so oversize values surface here, not at write time.
        card.render()?;
        Ok(card)
    }

    /// Build a commentary card (COMMENT, HISTORY, or blank keyword).
    pub fn commentary(keyword: &str, text: &str) -> Result<Self, CardError> {
        let keyword = keyword.trim().to_uppercase();
        if !keyword.is_empty() && keyword != "COMMENT" && keyword != "HISTORY" {
            return Err(CardError::InvalidKeyword { keyword });
        }

        let mut image = [b' '; CARD_LEN];
        image[..keyword.len()].copy_from_slice(keyword.as_bytes());
        let text_bytes: Vec<u8> = text
            .bytes()
            .take(CARD_LEN - 8)
            .map(|b| if b.is_ascii_graphic() || b == b' ' { b } else { b' ' })
            .collect();
        image[8..8 + text_bytes.len()].copy_from_slice(&text_bytes);

        Ok(Self {
            keyword,
            value: None,
            comment: Some(text.to_string()),
            raw: Some(image),
        })
    }

    /// The END card closing a header.
    pub fn end() -> Self {
        let mut image = [b' '; CARD_LEN];
        image[..3].copy_from_slice(b"END");
        Self {
            keyword: "END".to_string(),
            value: None,
            comment: None,
            raw: Some(image),
        }
    }

    /// Parse a card from its 80-byte image. Lenient: anything that does
    /// not follow the value syntax is kept verbatim with an undefined
    /// value, so a header with unusual cards still round-trips.
    pub fn parse(image: &[u8; CARD_LEN]) -> Self {
        let keyword = String::from_utf8_lossy(&image[..8]).trim_end().to_string();

        let has_value = &image[8..10] == b"= "
            && !keyword.is_empty()
            && keyword != "COMMENT"
            && keyword != "HISTORY"
            && keyword != "END";

        let (value, comment) = if has_value {
            let (value, comment) = parse_value_field(&image[10..]);
            (Some(value), comment)
        } else {
            let text = String::from_utf8_lossy(&image[8..]).trim_end().to_string();
            let comment = if text.is_empty() { None } else { Some(text) };
            (None, comment)
        };

        Self {
            keyword,
            value,
            comment,
            raw: Some(*image),
        }
    }

    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn value(&self) -> Option<&Value> {
        self.value.as_ref()
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn is_end(&self) -> bool {
        self.keyword == "END"
    }

    /// Re-keyword a parsed card, keeping its value and comment. Used to
    /// re-index per-column keywords for the destination schema. The raw
    /// image is dropped since the keyword changed.
    pub fn with_keyword(&self, keyword: &str) -> Result<Self, CardError> {
        let value = self.value.clone().unwrap_or(Value::Undefined);
        Card::new(keyword, value, self.comment.as_deref())
    }

    /// The 80-byte serialized form.
    pub fn image(&self) -> [u8; CARD_LEN] {
        if let Some(raw) = self.raw {
            return raw;
        }
        // Cards built through `new` were rendered once already.
        self.render().unwrap_or_else(|_| {
            let mut blank = [b' '; CARD_LEN];
            blank[..self.keyword.len().min(8)]
                .copy_from_slice(&self.keyword.as_bytes()[..self.keyword.len().min(8)]);
            blank
        })
    }

    fn render(&self) -> Result<[u8; CARD_LEN], CardError> {
        let mut out = String::with_capacity(CARD_LEN);
        out.push_str(&format!("{:<8}", self.keyword));
        out.push_str("= ");

        let value = self.value.as_ref().unwrap_or(&Value::Undefined);
        match value {
            Value::Logical(v) => {
                out.push_str(&format!("{:>20}", if *v { "T" } else { "F" }));
            }
            Value::Integer(v) => {
                out.push_str(&format!("{:>20}", v));
            }
            Value::Real(v) => {
                out.push_str(&format!("{:>20}", format_real(*v)));
            }
            Value::String(v) => {
                let escaped = v.replace('\'', "''");
                if escaped.len() > 68 {
                    return Err(CardError::ValueTooLong {
                        keyword: self.keyword.clone(),
                    });
                }
                // Opening quote at byte 10, closing quote no earlier than
                // byte 19 (content padded to at least 8 characters).
                out.push('\'');
                out.push_str(&format!("{:<8}", escaped));
                out.push('\'');
            }
            Value::Undefined => {
                out.push_str(&" ".repeat(FIXED_VALUE_END - 10));
            }
        }

        if let Some(ref comment) = self.comment {
            if out.len() + 3 < CARD_LEN {
                out.push_str(" / ");
                let room = CARD_LEN - out.len();
                out.push_str(&comment.chars().take(room).collect::<String>());
            }
        }

        if out.len() > CARD_LEN {
            return Err(CardError::ValueTooLong {
                keyword: self.keyword.clone(),
            });
        }

        let mut image = [b' '; CARD_LEN];
        for (i, b) in out.bytes().enumerate() {
            image[i] = if b.is_ascii_graphic() || b == b' ' { b } else { b' ' };
        }
        Ok(image)
    }
}

/// Keywords are at most 8 characters from the restricted FITS set.
pub fn validate_keyword(keyword: &str) -> Result<(), CardError> {
    if keyword.is_empty() || keyword.len() > 8 {
        return Err(CardError::InvalidKeyword {
            keyword: keyword.to_string(),
        });
    }
    let valid = keyword
        .chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '-' || c == '_');
    if !valid {
        return Err(CardError::InvalidKeyword {
            keyword: keyword.to_string(),
        });
    }
    Ok(())
}

fn parse_value_field(field: &[u8]) -> (Value, Option<String>) {
    let text = String::from_utf8_lossy(field).to_string();
    let trimmed = text.trim_start();

    if let Some(rest) = trimmed.strip_prefix('\'') {
        // Quoted string; '' is a literal quote. Trailing blanks inside
        // the quotes are not significant.
        let mut content = String::new();
        let mut chars = rest.chars().peekable();
        let mut closed = false;
        while let Some(c) = chars.next() {
            if c == '\'' {
                if chars.peek() == Some(&'\'') {
                    content.push('\'');
                    chars.next();
                } else {
                    closed = true;
                    break;
                }
            } else {
                content.push(c);
            }
        }
        if !closed {
            return (Value::Undefined, None);
        }
        let remainder: String = chars.collect();
        let comment = extract_comment(&remainder);
        return (Value::String(content.trim_end().to_string()), comment);
    }

    let (value_part, comment) = match trimmed.find('/') {
        Some(pos) => (&trimmed[..pos], extract_comment(&trimmed[pos..])),
        None => (trimmed, None),
    };

    let token = value_part.trim();
    let value = if token.is_empty() {
        Value::Undefined
    } else if token == "T" {
        Value::Logical(true)
    } else if token == "F" {
        Value::Logical(false)
    } else if let Ok(v) = token.parse::<i64>() {
        Value::Integer(v)
    } else {
        // FITS reals may use D exponents.
        let normalized = token.replace(['D', 'd'], "E");
        match normalized.parse::<f64>() {
            Ok(v) => Value::Real(v),
            Err(_) => Value::Undefined,
        }
    };

    (value, comment)
}

fn extract_comment(rest: &str) -> Option<String> {
    let rest = rest.trim_start();
    let rest = rest.strip_prefix('/')?;
    let comment = rest.trim().to_string();
    if comment.is_empty() {
        None
    } else {
        Some(comment)
    }
}

fn format_real(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{:.1}", v)
    } else {
        format!("{:E}", v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image_of(text: &str) -> [u8; CARD_LEN] {
        let mut image = [b' '; CARD_LEN];
        image[..text.len()].copy_from_slice(text.as_bytes());
        image
    }

    #[test]
    fn test_parse_integer_card() {
        let card = Card::parse(&image_of("NAXIS2  =               250000 / number of rows"));
        assert_eq!(card.keyword(), "NAXIS2");
        assert_eq!(card.value(), Some(&Value::Integer(250000)));
        assert_eq!(card.comment(), Some("number of rows"));
    }

    #[test]
    fn test_parse_string_card_with_escaped_quote() {
        let card = Card::parse(&image_of("OBSERVER= 'O''BRIEN '"));
        assert_eq!(card.value(), Some(&Value::String("O'BRIEN".to_string())));
    }

    #[test]
    fn test_parse_logical_and_real_cards() {
        let card = Card::parse(&image_of("SIMPLE  =                    T"));
        assert_eq!(card.value(), Some(&Value::Logical(true)));

        let card = Card::parse(&image_of("EQUINOX =               2000.0"));
        assert_eq!(card.value(), Some(&Value::Real(2000.0)));

        let card = Card::parse(&image_of("TZERO3  =        1.5D3 / D exponent"));
        assert_eq!(card.value(), Some(&Value::Real(1500.0)));
    }

    #[test]
    fn test_parse_commentary_card() {
        let card = Card::parse(&image_of("HISTORY produced by the survey pipeline"));
        assert_eq!(card.keyword(), "HISTORY");
        assert!(card.value().is_none());
    }

    #[test]
    fn test_round_trip_preserves_raw_image() {
        let original = image_of("TELESCOP= 'DESI    '           / telescope name");
        let card = Card::parse(&original);
        assert_eq!(card.image(), original);
    }

    #[test]
    fn test_new_card_fixed_format() {
        let card = Card::new("NAXIS1", Value::Integer(32), Some("bytes per row")).unwrap();
        let image = card.image();
        let text = String::from_utf8_lossy(&image).to_string();
        assert!(text.starts_with("NAXIS1  = "));
        // Fixed-format integer value ends at byte 30.
        assert_eq!(&text[10..30], "                  32");
        assert!(text.contains("/ bytes per row"));

        let reparsed = Card::parse(&image);
        assert_eq!(reparsed.value(), Some(&Value::Integer(32)));
    }

    #[test]
    fn test_new_string_card_round_trips() {
        let card = Card::new("TTYPE1", Value::String("RA".to_string()), None).unwrap();
        let reparsed = Card::parse(&card.image());
        assert_eq!(reparsed.value(), Some(&Value::String("RA".to_string())));
    }

    #[test]
    fn test_invalid_keyword_rejected() {
        assert!(Card::new("bad key", Value::Integer(1), None).is_err());
        assert!(Card::new("WAYTOOLONGKEY", Value::Integer(1), None).is_err());
        assert!(Card::new("", Value::Integer(1), None).is_err());
        assert!(Card::new("TTYPE1", Value::Integer(1), None).is_ok());
    }

    #[test]
    fn test_oversize_string_value_rejected() {
        let long = "x".repeat(70);
        let result = Card::new("LONGVAL", Value::String(long), None);
        assert!(matches!(result, Err(CardError::ValueTooLong { .. })));
    }

    #[test]
    fn test_with_keyword_reindexes() {
        let card = Card::parse(&image_of("TUNIT3  = 'deg     '           / unit of field"));
        let moved = card.with_keyword("TUNIT1").unwrap();
        assert_eq!(moved.keyword(), "TUNIT1");
        assert_eq!(moved.value(), Some(&Value::String("deg".to_string())));
        assert_eq!(moved.comment(), Some("unit of field"));
    }

    #[test]
    fn test_end_card() {
        let card = Card::end();
        assert!(card.is_end());
        assert_eq!(&card.image()[..3], b"END");
    }
}
