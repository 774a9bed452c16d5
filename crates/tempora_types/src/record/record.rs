use std::any::Any;

use tempora_id::TemporalId;

use crate::{Data, Document, Error, KeyMeta, Result};

// ----------------------------------------------------------------------------

/// A key-bearing, dataset-owned storage citizen.
///
/// Records are immutable once stored: an "update" is a new record with the
/// same key and a greater temporal id. `id` and `data_set` are assigned by
/// the data source on save, overwriting any caller-supplied values.
pub trait Record: Data {
    /// Temporal id of this revision; zero until assigned on save.
    fn id(&self) -> TemporalId;

    fn set_id(&mut self, id: TemporalId);

    /// Temporal id of the owning dataset; zero for the root dataset.
    fn data_set(&self) -> TemporalId;

    fn set_data_set(&mut self, data_set: TemporalId);

    /// The semicolon-delimited key, computed from the same fields the
    /// record's key type carries.
    fn key(&self) -> Result<String>;

    /// Hook invoked after deserialization and before a save is serialized.
    ///
    /// Implementations validate or normalize their state; the default does
    /// nothing.
    fn init(&mut self) -> Result<()> {
        Ok(())
    }

    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl dyn Record {
    /// `true` when the concrete type of this record is `T`.
    pub fn is<T: Record>(&self) -> bool {
        self.as_any().is::<T>()
    }
}

/// Downcast a dynamic record to its concrete type.
pub fn downcast_record<T: Record>(record: Box<dyn Record>) -> Result<Box<T>> {
    let type_name = record.type_name();
    record.into_any().downcast::<T>().map_err(|_| {
        Error::Validation(format!(
            "stored record of type {type_name} cannot be viewed as {}",
            std::any::type_name::<T>()
        ))
    })
}

/// `true` when the record is a tombstone.
pub fn is_deleted(record: &dyn Record) -> bool {
    record.as_any().is::<super::DeletedRecord>()
}

// ----------------------------------------------------------------------------

/// Compile-time metadata for a concrete record type: its serialized name,
/// its ancestor chain, the key type it pairs with, and its deserializer.
///
/// Registering the type ([`crate::registry::register`]) publishes this
/// metadata for name-driven deserialization and key-to-record binding.
pub trait RecordMeta: Record + Sized {
    const TYPE_NAME: &'static str;

    /// Ancestor chain of serialized names, this type first, root type last.
    ///
    /// The root type names the storage collection: one collection holds a
    /// root type and all of its descendants.
    const ANCESTORS: &'static [&'static str];

    /// Record type collapses to latest-only within any dataset.
    const NON_TEMPORAL: bool = false;

    type Key: KeyMeta;

    /// Decode the declared fields from a stored document. The envelope
    /// fields (`_id`, `_dataset`) are applied by the caller.
    fn from_document(doc: &Document) -> Result<Self>;

    fn root_type_name() -> &'static str {
        Self::ANCESTORS.last().expect("ancestor chain is never empty")
    }
}

/// Implements the id/dataset accessors and `Any` plumbing of [`Record`] for
/// a struct with `id` and `data_set` fields.
#[macro_export]
macro_rules! impl_record_accessors {
    () => {
        fn id(&self) -> $crate::TemporalId {
            self.id
        }

        fn set_id(&mut self, id: $crate::TemporalId) {
            self.id = id;
        }

        fn data_set(&self) -> $crate::TemporalId {
            self.data_set
        }

        fn set_data_set(&mut self, data_set: $crate::TemporalId) {
            self.data_set = data_set;
        }

        fn as_any(&self) -> &dyn ::std::any::Any {
            self
        }

        fn into_any(self: ::std::boxed::Box<Self>) -> ::std::boxed::Box<dyn ::std::any::Any> {
            self
        }
    };
}
