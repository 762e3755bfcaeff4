use crate::error::{FitsColsError, Result};

/// A parsed binary-table column format (TFORM keyword), `rT` with an
/// optional repeat count and a single type code. Additional characters
/// after the code (array bounds for variable-length forms) are kept in
/// the raw string but do not affect the field width.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnFormat {
    pub repeat: usize,
    pub code: char,
    raw: String,
}

impl ColumnFormat {
    pub fn parse(tform: &str) -> Result<Self> {
        let raw = tform.trim().to_string();
        let digits: String = raw.chars().take_while(|c| c.is_ascii_digit()).collect();
        let repeat = if digits.is_empty() {
            1
        } else {
            digits.parse::<usize>().map_err(|_| FitsColsError::Format {
                message: format!("invalid repeat count in TFORM {:?}", raw),
            })?
        };

        let code = raw.chars().nth(digits.len()).ok_or_else(|| FitsColsError::Format {
            message: format!("TFORM {:?} has no type code", raw),
        })?;

        if !matches!(
            code,
            'L' | 'X' | 'B' | 'I' | 'J' | 'K' | 'A' | 'E' | 'D' | 'C' | 'M' | 'P' | 'Q'
        ) {
            return Err(FitsColsError::Format {
                message: format!("unknown TFORM type code {:?} in {:?}", code, raw),
            });
        }

        Ok(Self { repeat, code, raw })
    }

    /// Width of the field in bytes within a table row.
    pub fn byte_width(&self) -> usize {
        match self.code {
            // Bit fields pack eight per byte.
            'X' => self.repeat.div_ceil(8),
            'L' | 'B' | 'A' => self.repeat,
            'I' => 2 * self.repeat,
            'J' | 'E' => 4 * self.repeat,
            'K' | 'D' | 'C' => 8 * self.repeat,
            'M' => 16 * self.repeat,
            // Variable-length array descriptors; the data lives in the heap.
            'P' => 8 * self.repeat,
            'Q' => 16 * self.repeat,
            _ => unreachable!("parse admits a fixed set of type codes"),
        }
    }

    /// Variable-length forms point into a heap the extractor does not copy.
    pub fn is_variable_length(&self) -> bool {
        self.code == 'P' || self.code == 'Q'
    }

    /// The original TFORM string, carried verbatim into the destination.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl std::fmt::Display for ColumnFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_widths() {
        assert_eq!(ColumnFormat::parse("L").unwrap().byte_width(), 1);
        assert_eq!(ColumnFormat::parse("1B").unwrap().byte_width(), 1);
        assert_eq!(ColumnFormat::parse("I").unwrap().byte_width(), 2);
        assert_eq!(ColumnFormat::parse("1J").unwrap().byte_width(), 4);
        assert_eq!(ColumnFormat::parse("K").unwrap().byte_width(), 8);
        assert_eq!(ColumnFormat::parse("E").unwrap().byte_width(), 4);
        assert_eq!(ColumnFormat::parse("1D").unwrap().byte_width(), 8);
        assert_eq!(ColumnFormat::parse("C").unwrap().byte_width(), 8);
        assert_eq!(ColumnFormat::parse("M").unwrap().byte_width(), 16);
    }

    #[test]
    fn test_repeat_counts() {
        assert_eq!(ColumnFormat::parse("8A").unwrap().byte_width(), 8);
        assert_eq!(ColumnFormat::parse("3E").unwrap().byte_width(), 12);
        assert_eq!(ColumnFormat::parse("2D").unwrap().byte_width(), 16);
    }

    #[test]
    fn test_bit_fields_round_up() {
        assert_eq!(ColumnFormat::parse("1X").unwrap().byte_width(), 1);
        assert_eq!(ColumnFormat::parse("8X").unwrap().byte_width(), 1);
        assert_eq!(ColumnFormat::parse("9X").unwrap().byte_width(), 2);
    }

    #[test]
    fn test_variable_length_detection() {
        let p = ColumnFormat::parse("1PE(100)").unwrap();
        assert!(p.is_variable_length());
        assert_eq!(p.byte_width(), 8);

        let q = ColumnFormat::parse("1QD(5)").unwrap();
        assert!(q.is_variable_length());
        assert_eq!(q.byte_width(), 16);

        assert!(!ColumnFormat::parse("1D").unwrap().is_variable_length());
    }

    #[test]
    fn test_raw_string_preserved() {
        let format = ColumnFormat::parse(" 8A ").unwrap();
        assert_eq!(format.as_str(), "8A");
        assert_eq!(format.to_string(), "8A");
    }

    #[test]
    fn test_invalid_tforms_rejected() {
        assert!(ColumnFormat::parse("").is_err());
        assert!(ColumnFormat::parse("3").is_err());
        assert!(ColumnFormat::parse("4Z").is_err());
    }
}
