//! Adapter encodings and the rows derived from them

use crate::backend::Row;
use crate::types::ByteArrayId;

/// One named, already-serialized field of an entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldValue {
    pub name: String,
    pub value: Vec<u8>,
}

impl FieldValue {
    pub fn new(name: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// What an adapter produces for one entity against one index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterEncoding {
    /// Entity identity within its adapter; keys the alternate table
    pub data_id: ByteArrayId,
    /// Index-space keys the entity is inserted under
    pub insertion_keys: Vec<Vec<u8>>,
    pub fields: Vec<FieldValue>,
}

impl AdapterEncoding {
    pub fn new(data_id: ByteArrayId) -> Self {
        Self {
            data_id,
            insertion_keys: Vec::new(),
            fields: Vec::new(),
        }
    }

    pub fn with_insertion_keys(mut self, keys: Vec<Vec<u8>>) -> Self {
        self.insertion_keys = keys;
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        self.fields.push(FieldValue::new(name, value));
        self
    }
}

/// The outcome of writing one entity: where it landed and what it carried.
///
/// Handed to statistics so they can observe both the entity and its rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryInfo {
    pub adapter_id: ByteArrayId,
    pub data_id: ByteArrayId,
    /// Primary row ids, in index derivation order
    pub row_ids: Vec<ByteArrayId>,
    pub fields: Vec<FieldValue>,
}

impl EntryInfo {
    pub fn new(adapter_id: ByteArrayId, row_ids: Vec<ByteArrayId>, encoding: AdapterEncoding) -> Self {
        Self {
            adapter_id,
            data_id: encoding.data_id,
            row_ids,
            fields: encoding.fields,
        }
    }

    /// Primary-table cells: one per (row id, field), family = adapter id.
    /// A field-less entity still occupies each of its rows.
    pub fn primary_rows(&self) -> Vec<Row> {
        let family = self.adapter_id.as_bytes();
        let mut rows = Vec::with_capacity(self.row_ids.len() * self.fields.len().max(1));
        for row_id in &self.row_ids {
            if self.fields.is_empty() {
                rows.push(Row::new(row_id.as_bytes(), family, Vec::new(), Vec::new()));
                continue;
            }
            for field in &self.fields {
                rows.push(Row::new(
                    row_id.as_bytes(),
                    family,
                    field.name.as_bytes(),
                    field.value.clone(),
                ));
            }
        }
        rows
    }

    /// Alternate-table cells: data id -> each primary row id
    pub fn alternate_rows(&self) -> Vec<Row> {
        self.row_ids
            .iter()
            .map(|row_id| {
                Row::new(
                    self.data_id.as_bytes(),
                    self.adapter_id.as_bytes(),
                    row_id.as_bytes(),
                    Vec::new(),
                )
            })
            .collect()
    }
}
