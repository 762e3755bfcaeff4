use super::card::{Card, CardError, Value, CARD_LEN};
use crate::error::{FitsColsError, Result};

/// FITS block size; headers and data regions are padded to multiples of it.
pub const BLOCK_LEN: usize = 2880;

const CARDS_PER_BLOCK: usize = BLOCK_LEN / CARD_LEN;

/// An ordered list of header cards, without the terminating END.
#[derive(Debug, Clone, Default)]
pub struct Header {
    cards: Vec<Card>,
}

impl Header {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse one header unit from the start of `data`, consuming whole
    /// blocks until the END card. Returns the header and the number of
    /// bytes consumed (always a multiple of the block size).
    pub fn parse(data: &[u8]) -> Result<(Self, usize)> {
        let mut cards = Vec::new();
        let mut offset = 0;

        loop {
            if offset + CARD_LEN > data.len() {
                return Err(FitsColsError::Format {
                    message: "header truncated before END card".to_string(),
                });
            }

            let image: [u8; CARD_LEN] = data[offset..offset + CARD_LEN]
                .try_into()
                .expect("card slice has fixed length");
            offset += CARD_LEN;

            let card = Card::parse(&image);
            if card.is_end() {
                break;
            }
            cards.push(card);
        }

        // Skip padding to the end of the block.
        let consumed = offset.div_ceil(BLOCK_LEN) * BLOCK_LEN;
        if consumed > data.len() {
            return Err(FitsColsError::Format {
                message: "header block truncated after END card".to_string(),
            });
        }

        Ok((Self { cards }, consumed))
    }

    /// Serialize to whole blocks: cards, END, space padding.
    pub fn to_bytes(&self) -> Vec<u8> {
        let total_cards = self.cards.len() + 1;
        let blocks = total_cards.div_ceil(CARDS_PER_BLOCK);
        let mut out = Vec::with_capacity(blocks * BLOCK_LEN);

        for card in &self.cards {
            out.extend_from_slice(&card.image());
        }
        out.extend_from_slice(&Card::end().image());
        out.resize(blocks * BLOCK_LEN, b' ');
        out
    }

    /// Append a card that is already known to be valid.
    pub fn push(&mut self, card: Card) {
        debug_assert!(!card.is_end());
        self.cards.push(card);
    }

    /// Append a card after re-validating its keyword. This is the
    /// narrow recoverable branch used while copying source metadata:
    /// a card with a malformed keyword is rejected, not written.
    pub fn push_checked(&mut self, card: Card) -> std::result::Result<(), CardError> {
        if card.value().is_some() {
            super::card::validate_keyword(card.keyword())?;
        }
        self.cards.push(card);
        Ok(())
    }

    pub fn cards(&self) -> impl Iterator<Item = &Card> {
        self.cards.iter()
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn contains(&self, keyword: &str) -> bool {
        self.get(keyword).is_some()
    }

    /// First card with the given keyword, if any.
    pub fn get(&self, keyword: &str) -> Option<&Card> {
        self.cards.iter().find(|c| c.keyword() == keyword)
    }

    pub fn get_integer(&self, keyword: &str) -> Option<i64> {
        match self.get(keyword)?.value()? {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn get_string(&self, keyword: &str) -> Option<String> {
        match self.get(keyword)?.value()? {
            Value::String(v) => Some(v.clone()),
            _ => None,
        }
    }

    pub fn get_logical(&self, keyword: &str) -> Option<bool> {
        match self.get(keyword)?.value()? {
            Value::Logical(v) => Some(*v),
            _ => None,
        }
    }

    /// Integer keyword that must be present and non-negative.
    pub fn require_integer(&self, keyword: &str) -> Result<i64> {
        match self.get_integer(keyword) {
            Some(v) if v >= 0 => Ok(v),
            Some(v) => Err(FitsColsError::Format {
                message: format!("{} has invalid value {}", keyword, v),
            }),
            None => Err(FitsColsError::Format {
                message: format!("missing required keyword {}", keyword),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_header() -> Header {
        let mut header = Header::new();
        header.push(Card::new("XTENSION", Value::String("BINTABLE".into()), None).unwrap());
        header.push(Card::new("BITPIX", Value::Integer(8), None).unwrap());
        header.push(Card::new("NAXIS", Value::Integer(2), None).unwrap());
        header.push(Card::new("NAXIS1", Value::Integer(16), Some("bytes per row")).unwrap());
        header.push(Card::new("NAXIS2", Value::Integer(100), Some("rows")).unwrap());
        header
    }

    #[test]
    fn test_serialize_pads_to_block() {
        let header = sample_header();
        let bytes = header.to_bytes();
        assert_eq!(bytes.len(), BLOCK_LEN);
        assert_eq!(&bytes[bytes.len() - 80..bytes.len() - 77], b"   ");
    }

    #[test]
    fn test_parse_round_trip() {
        let header = sample_header();
        let bytes = header.to_bytes();

        let (parsed, consumed) = Header::parse(&bytes).unwrap();
        assert_eq!(consumed, BLOCK_LEN);
        assert_eq!(parsed.len(), header.len());
        assert_eq!(parsed.get_string("XTENSION"), Some("BINTABLE".to_string()));
        assert_eq!(parsed.get_integer("NAXIS1"), Some(16));
        assert_eq!(parsed.get_integer("NAXIS2"), Some(100));
    }

    #[test]
    fn test_parse_multi_block_header() {
        let mut header = Header::new();
        for i in 0..40 {
            header.push(Card::new(&format!("KEY{}", i), Value::Integer(i), None).unwrap());
        }
        let bytes = header.to_bytes();
        assert_eq!(bytes.len(), 2 * BLOCK_LEN);

        let (parsed, consumed) = Header::parse(&bytes).unwrap();
        assert_eq!(consumed, 2 * BLOCK_LEN);
        assert_eq!(parsed.len(), 40);
        assert_eq!(parsed.get_integer("KEY39"), Some(39));
    }

    #[test]
    fn test_truncated_header_is_an_error() {
        let header = sample_header();
        let bytes = header.to_bytes();
        let result = Header::parse(&bytes[..200]);
        assert!(matches!(result, Err(FitsColsError::Format { .. })));
    }

    #[test]
    fn test_require_integer() {
        let header = sample_header();
        assert_eq!(header.require_integer("NAXIS1").unwrap(), 16);
        assert!(header.require_integer("TFIELDS").is_err());
    }

    #[test]
    fn test_push_checked_rejects_bad_keyword() {
        // Forge a card with a lowercase keyword via the lenient parser.
        let mut image = [b' '; 80];
        image[..8].copy_from_slice(b"badkey  ");
        image[8..10].copy_from_slice(b"= ");
        image[28..30].copy_from_slice(b" 1");
        let card = Card::parse(&image);

        let mut header = Header::new();
        assert!(header.push_checked(card).is_err());
        assert!(header.is_empty());
    }
}
