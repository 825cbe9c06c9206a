//! Information element encoding and decoding.
//!
//! Certain full frames carry a sequence of tagged sub-fields, each
//! serialized as a 1-byte element id, a 1-byte length, and `length` bytes
//! of value. Zero-length elements are legal.

use crate::error::{Error, Result};

/// Element id: username / system identification string.
pub const USERNAME: u8 = 6;
/// Element id: desired media format (4-byte big-endian bitmask).
pub const FORMAT: u8 = 9;
/// Element id: protocol version (2-byte big-endian).
pub const VERSION: u8 = 14;
/// Element id: authentication challenge text.
pub const CHALLENGE: u8 = 15;
/// Element id: RSA-signed challenge response, base64 text.
pub const RSA_RESULT: u8 = 17;
/// Element id: call token.
pub const CALL_TOKEN: u8 = 54;
/// Element id: extended capability flags block.
pub const CAPABILITY2: u8 = 56;

/// An ordered list of information elements.
///
/// Elements are kept in encode order so that a decode of an encode yields
/// the identical list. Lookups scan linearly; element counts are tiny.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InfoElements(Vec<(u8, Vec<u8>)>);

impl InfoElements {
    /// Creates an empty element list.
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends an element. Values are limited to 255 bytes by the 1-byte
    /// length field.
    pub fn push(&mut self, id: u8, value: Vec<u8>) {
        debug_assert!(value.len() <= 255, "element {id} value too long");
        self.0.push((id, value));
    }

    /// Returns the value of the first element with the given id.
    pub fn get(&self, id: u8) -> Option<&[u8]> {
        self.0
            .iter()
            .find(|(eid, _)| *eid == id)
            .map(|(_, v)| v.as_slice())
    }

    /// Returns the number of elements.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the list holds no elements.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Serializes all elements as repeated (id, length, value) triples.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for (id, value) in &self.0 {
            out.push(*id);
            out.push(value.len() as u8);
            out.extend_from_slice(value);
        }
        out
    }

    /// Parses an element stream.
    ///
    /// The scan must end exactly on an element boundary; a stream that
    /// runs out mid-element is malformed and rejected whole.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut out = Self::new();
        let mut i = 0;
        while i < data.len() {
            let id = data[i];
            let Some(&len) = data.get(i + 1) else {
                return Err(Error::TruncatedElement { id });
            };
            let end = i + 2 + len as usize;
            if data.len() < end {
                return Err(Error::TruncatedElement { id });
            }
            out.push(id, data[i + 2..end].to_vec());
            i = end;
        }
        Ok(out)
    }
}

impl FromIterator<(u8, Vec<u8>)> for InfoElements {
    fn from_iter<T: IntoIterator<Item = (u8, Vec<u8>)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let mut ies = InfoElements::new();
        ies.push(CALL_TOKEN, b"1700000000?deadbeef".to_vec());
        ies.push(VERSION, vec![0x00, 0x04]);
        ies.push(CHALLENGE, b"123456789".to_vec());

        let encoded = ies.encode();
        let decoded = InfoElements::decode(&encoded).unwrap();
        assert_eq!(decoded, ies);
    }

    #[test]
    fn test_zero_length_value() {
        let mut ies = InfoElements::new();
        ies.push(USERNAME, Vec::new());
        ies.push(FORMAT, vec![4]);

        let encoded = ies.encode();
        assert_eq!(encoded, vec![USERNAME, 0, FORMAT, 1, 4]);

        let decoded = InfoElements::decode(&encoded).unwrap();
        assert_eq!(decoded.get(USERNAME), Some(&[][..]));
        assert_eq!(decoded.get(FORMAT), Some(&[4][..]));
    }

    #[test]
    fn test_all_ids_round_trip() {
        // Every id, with value lengths spanning the whole 0..=255 range.
        let ies: InfoElements = (0..=255u8)
            .map(|id| (id, vec![id; id as usize]))
            .collect();
        let decoded = InfoElements::decode(&ies.encode()).unwrap();
        assert_eq!(decoded, ies);
    }

    #[test]
    fn test_truncated_missing_length() {
        // Lone id byte with no length byte.
        assert_eq!(
            InfoElements::decode(&[CHALLENGE]),
            Err(Error::TruncatedElement { id: CHALLENGE })
        );
    }

    #[test]
    fn test_truncated_short_value() {
        // Claims 4 value bytes, provides 2.
        let data = [CALL_TOKEN, 4, 0xAA, 0xBB];
        assert_eq!(
            InfoElements::decode(&data),
            Err(Error::TruncatedElement { id: CALL_TOKEN })
        );
    }

    #[test]
    fn test_empty_stream() {
        assert!(InfoElements::decode(&[]).unwrap().is_empty());
    }
}
