//! The record, key and document model of the tempora record store.
//!
//! This crate defines everything the storage layer persists and everything
//! callers hand to it:
//!
//! * [`Value`] / [`Document`]: the self-describing document model;
//! * civil time scalars ([`LocalDate`], [`LocalTime`], [`LocalMinute`],
//!   [`LocalDateTime`]) with their integer storage encodings;
//! * the record model: [`Data`], [`Key`], [`Record`] and the tombstone
//!   [`DeletedRecord`];
//! * the [`registry`] mapping serialized type names to deserializers, key
//!   types to record types, and record types to their storage collection;
//! * the built-in metadata records: [`DataSet`], [`DataSetDetail`],
//!   [`DbNameKey`] and [`DataSourceInfo`].

pub mod case;
pub mod registry;
pub mod serialize;

mod data_set;
mod db_name;
mod error;
mod record;
mod time;
mod value;

pub use self::data_set::{DataSet, DataSetDetail, DataSetDetailKey, DataSetFlags, DataSetKey};
pub use self::db_name::{DataSourceInfo, DataSourceInfoKey, DbNameKey, InstanceType};
pub use self::error::{Error, Result};
pub use self::record::{
    downcast_record, is_deleted, Data, DeletedRecord, Key, KeyMeta, KeyWriter, Record, RecordMeta,
    TokenReader, DELETED_TYPE_NAME,
};
pub use self::time::{LocalDate, LocalDateTime, LocalMinute, LocalTime};
pub use self::value::{
    cmp_opt, Document, Value, ValueKind, DATASET_FIELD, ID_FIELD, KEY_FIELD, TYPE_FIELD,
};

// Re-exports
#[doc(no_inline)]
pub use tempora_id::TemporalId;
