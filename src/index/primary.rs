//! Primary index definitions

use super::row_id::RowId;
use crate::adapter::AdapterEncoding;
use crate::types::ByteArrayId;

/// Suffix appended to a primary table name to form its alternate table
pub const ALT_INDEX_TABLE_SUFFIX: &str = "_ALT_INDEX";

/// An immutable index definition: identity plus row-id derivation
pub trait PrimaryIndex: Send + Sync {
    fn id(&self) -> &ByteArrayId;

    /// Row ids an encoded entity occupies in this index; never empty
    fn row_ids(&self, adapter_id: &ByteArrayId, encoding: &AdapterEncoding) -> Vec<ByteArrayId>;

    /// Primary table name
    fn table_name(&self) -> String {
        self.id().to_string_lossy()
    }

    /// Alternate (data id keyed) table name
    fn alt_table_name(&self) -> String {
        format!("{}{}", self.table_name(), ALT_INDEX_TABLE_SUFFIX)
    }
}

/// Index whose rows sort by the adapter-supplied insertion keys.
///
/// One row per insertion key; an encoding without insertion keys lands on a
/// single row with an empty key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortedKeyIndex {
    id: ByteArrayId,
}

impl SortedKeyIndex {
    pub fn new(id: impl Into<ByteArrayId>) -> Self {
        Self { id: id.into() }
    }
}

impl PrimaryIndex for SortedKeyIndex {
    fn id(&self) -> &ByteArrayId {
        &self.id
    }

    fn row_ids(&self, adapter_id: &ByteArrayId, encoding: &AdapterEncoding) -> Vec<ByteArrayId> {
        if encoding.insertion_keys.is_empty() {
            return vec![RowId::new(Vec::new(), adapter_id.clone(), encoding.data_id.clone(), 0)
                .encode()];
        }

        let duplicates = (encoding.insertion_keys.len() - 1) as u32;
        encoding
            .insertion_keys
            .iter()
            .map(|key| {
                RowId::new(
                    key.clone(),
                    adapter_id.clone(),
                    encoding.data_id.clone(),
                    duplicates,
                )
                .encode()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoding(keys: &[&[u8]]) -> AdapterEncoding {
        AdapterEncoding::new(ByteArrayId::from_str("e1"))
            .with_insertion_keys(keys.iter().map(|k| k.to_vec()).collect())
    }

    #[test]
    fn test_table_names() {
        let index = SortedKeyIndex::new("roads_idx");
        assert_eq!(index.table_name(), "roads_idx");
        assert_eq!(index.alt_table_name(), "roads_idx_ALT_INDEX");
    }

    #[test]
    fn test_one_row_per_insertion_key() {
        let index = SortedKeyIndex::new("idx");
        let adapter = ByteArrayId::from_str("roads");
        let ids = index.row_ids(&adapter, &encoding(&[b"b", b"a", b"c"]));

        assert_eq!(ids.len(), 3);
        let first = RowId::decode(&ids[0]).unwrap();
        assert_eq!(first.insertion_key, b"b".to_vec());
        assert_eq!(first.duplicates, 2);
        assert_eq!(first.data_id, ByteArrayId::from_str("e1"));
    }

    #[test]
    fn test_no_insertion_keys_yields_single_row() {
        let index = SortedKeyIndex::new("idx");
        let ids = index.row_ids(&ByteArrayId::from_str("roads"), &encoding(&[]));
        assert_eq!(ids.len(), 1);
        assert_eq!(RowId::decode(&ids[0]).unwrap().duplicates, 0);
    }
}
