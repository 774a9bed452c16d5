//! Record ↔ document mapping.
//!
//! The stored envelope is `_t` (type name), `_id`, `_dataset`, `_key`,
//! followed by the record's declared fields with Pascal-cased names. Field
//! encoding is the responsibility of each type's `write_fields` /
//! `from_document` pair; this module adds and strips the envelope.

use crate::{
    registry, Data, DeletedRecord, Document, Record, Result, DATASET_FIELD, DELETED_TYPE_NAME,
    ID_FIELD, KEY_FIELD, TYPE_FIELD,
};

/// Serialize a record into its stored document form.
pub fn serialize(record: &dyn Record) -> Result<Document> {
    let mut doc = Document::new();
    doc.set(TYPE_FIELD, record.type_name());
    doc.set(ID_FIELD, record.id());
    doc.set(DATASET_FIELD, record.data_set());
    doc.set(KEY_FIELD, record.key()?);
    record.write_fields(&mut doc)?;
    Ok(doc)
}

/// Deserialize a stored document, dispatching on its `_t` field.
///
/// Tombstones are special-cased: they share collections with live records,
/// so they cannot be reached through the per-collection registry entries.
pub fn deserialize(doc: &Document) -> Result<Box<dyn Record>> {
    let type_name = doc.read_str("Record", TYPE_FIELD)?;

    let mut record: Box<dyn Record> = if type_name == DELETED_TYPE_NAME {
        Box::new(DeletedRecord::from_document(doc)?)
    } else {
        (registry::spec_of(&type_name)?.from_document)(doc)?
    };

    record.set_id(doc.read_id("Record", ID_FIELD)?);
    record.set_data_set(doc.read_id("Record", DATASET_FIELD)?);
    Ok(record)
}

#[cfg(test)]
mod tests {
    use tempora_id::TemporalId;

    use super::*;
    use crate::DataSet;

    #[test]
    fn envelope_round_trip() {
        let mut data_set = DataSet::new("Sample", &[TemporalId::new()]);
        data_set.id = TemporalId::new();
        data_set.data_set = TemporalId::ZERO;

        let doc = serialize(&data_set).unwrap();
        assert_eq!(doc.get(TYPE_FIELD).unwrap().as_str(), Some("DataSet"));
        assert_eq!(doc.get(KEY_FIELD).unwrap().as_str(), Some("Sample"));

        let parsed = deserialize(&doc).unwrap();
        assert_eq!(parsed.type_name(), "DataSet");
        assert_eq!(parsed.id(), data_set.id);
        assert_eq!(parsed.key().unwrap(), "Sample");
    }

    #[test]
    fn tombstones_round_trip() {
        let mut tombstone = crate::DeletedRecord::new("A;0".to_owned());
        tombstone.id = TemporalId::new();
        tombstone.data_set = TemporalId::new();

        let doc = serialize(&tombstone).unwrap();
        let parsed = deserialize(&doc).unwrap();
        assert!(crate::is_deleted(parsed.as_ref()));
        assert_eq!(parsed.key().unwrap(), "A;0");
    }

    #[test]
    fn unknown_type_is_rejected() {
        let mut doc = Document::new();
        doc.set(TYPE_FIELD, "Mystery");
        doc.set(ID_FIELD, TemporalId::new());
        doc.set(DATASET_FIELD, TemporalId::ZERO);
        doc.set(KEY_FIELD, "k");
        assert!(matches!(
            deserialize(&doc),
            Err(crate::Error::UnknownType(_))
        ));
    }
}
