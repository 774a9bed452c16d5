use tempora_id::TemporalId;

use crate::{Data, Document, Record, Result};

/// Serialized type name of the tombstone marker.
pub const DELETED_TYPE_NAME: &str = "DeletedRecord";

/// A tombstone: a record whose only state is its key.
///
/// A tombstone returned by a lookup means "not found" for that dataset, and
/// hides any earlier record with the same key in imported datasets. It is
/// stored in the same collection as its live counterpart so hiding composes
/// with the ordinary lookup pipeline.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DeletedRecord {
    pub id: TemporalId,
    pub data_set: TemporalId,
    pub key: String,
}

impl DeletedRecord {
    pub fn new(key: String) -> Self {
        Self {
            key,
            ..Default::default()
        }
    }

    pub fn from_document(doc: &Document) -> Result<Self> {
        Ok(Self {
            id: TemporalId::ZERO,
            data_set: TemporalId::ZERO,
            key: doc.read_str(DELETED_TYPE_NAME, crate::KEY_FIELD)?,
        })
    }
}

impl Data for DeletedRecord {
    fn type_name(&self) -> &'static str {
        DELETED_TYPE_NAME
    }

    fn write_fields(&self, _doc: &mut Document) -> Result<()> {
        Ok(())
    }
}

impl Record for DeletedRecord {
    crate::impl_record_accessors!();

    fn key(&self) -> Result<String> {
        Ok(self.key.clone())
    }
}
