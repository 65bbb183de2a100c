//! Primary-table row id layout
//!
//! ```text
//! insertion key | adapter id | data id | adapter len (u32 BE) | data len (u32 BE) | duplicates (u32 BE)
//! ```
//!
//! The trailer makes the id self-describing, so an alternate-table entry
//! (which stores only the row id) can be traced back to its adapter and
//! entity without consulting the primary table.

use super::errors::{IndexError, IndexResult};
use crate::types::ByteArrayId;

const TRAILER_LEN: usize = 12;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowId {
    pub insertion_key: Vec<u8>,
    pub adapter_id: ByteArrayId,
    pub data_id: ByteArrayId,
    /// Number of other rows the same entity was written to in this index
    pub duplicates: u32,
}

impl RowId {
    pub fn new(
        insertion_key: impl Into<Vec<u8>>,
        adapter_id: ByteArrayId,
        data_id: ByteArrayId,
        duplicates: u32,
    ) -> Self {
        Self {
            insertion_key: insertion_key.into(),
            adapter_id,
            data_id,
            duplicates,
        }
    }

    pub fn encode(&self) -> ByteArrayId {
        let mut bytes = Vec::with_capacity(
            self.insertion_key.len() + self.adapter_id.len() + self.data_id.len() + TRAILER_LEN,
        );
        bytes.extend_from_slice(&self.insertion_key);
        bytes.extend_from_slice(self.adapter_id.as_bytes());
        bytes.extend_from_slice(self.data_id.as_bytes());
        bytes.extend_from_slice(&(self.adapter_id.len() as u32).to_be_bytes());
        bytes.extend_from_slice(&(self.data_id.len() as u32).to_be_bytes());
        bytes.extend_from_slice(&self.duplicates.to_be_bytes());
        ByteArrayId::new(bytes)
    }

    pub fn decode(id: &ByteArrayId) -> IndexResult<Self> {
        let bytes = id.as_bytes();
        let len = bytes.len();
        if len < TRAILER_LEN {
            return Err(IndexError::malformed_row_id(len, "shorter than length trailer"));
        }

        let trailer = &bytes[len - TRAILER_LEN..];
        let adapter_len = read_u32(&trailer[0..4]) as usize;
        let data_len = read_u32(&trailer[4..8]) as usize;
        let duplicates = read_u32(&trailer[8..12]);

        let body_len = len - TRAILER_LEN;
        let ids_len = adapter_len
            .checked_add(data_len)
            .filter(|n| *n <= body_len)
            .ok_or_else(|| IndexError::malformed_row_id(len, "id lengths exceed row id"))?;

        let key_end = body_len - ids_len;
        let adapter_end = key_end + adapter_len;

        Ok(Self {
            insertion_key: bytes[..key_end].to_vec(),
            adapter_id: ByteArrayId::from(&bytes[key_end..adapter_end]),
            data_id: ByteArrayId::from(&bytes[adapter_end..body_len]),
            duplicates,
        })
    }
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(bytes);
    u32::from_be_bytes(buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_recovers_components() {
        let row_id = RowId::new(
            vec![0x07, 0x01],
            ByteArrayId::from_str("roads"),
            ByteArrayId::from_str("road-17"),
            2,
        );
        let decoded = RowId::decode(&row_id.encode()).unwrap();
        assert_eq!(decoded, row_id);
    }

    #[test]
    fn test_empty_insertion_key() {
        let row_id = RowId::new(Vec::new(), ByteArrayId::from_str("a"), ByteArrayId::from_str("d"), 0);
        let encoded = row_id.encode();
        assert_eq!(encoded.len(), 2 + 12);
        assert_eq!(RowId::decode(&encoded).unwrap().insertion_key, Vec::<u8>::new());
    }

    #[test]
    fn test_decode_rejects_short_id() {
        let err = RowId::decode(&ByteArrayId::new(vec![1, 2, 3])).unwrap_err();
        assert!(err.message().contains("trailer"));
    }

    #[test]
    fn test_decode_rejects_inconsistent_lengths() {
        let mut bytes = vec![b'x'];
        bytes.extend_from_slice(&100u32.to_be_bytes());
        bytes.extend_from_slice(&0u32.to_be_bytes());
        bytes.extend_from_slice(&0u32.to_be_bytes());
        assert!(RowId::decode(&ByteArrayId::new(bytes)).is_err());
    }
}
