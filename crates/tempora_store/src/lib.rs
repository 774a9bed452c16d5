//! The tempora record store: a temporal, hierarchical, dataset-scoped
//! archive of records over an embedded document storage engine.
//!
//! Records are append-only: an update is a new revision with the same key
//! and a greater [`TemporalId`], and a delete is a tombstone. Records live
//! in immutable, named datasets that compose into a DAG through ordered
//! `imports` lists. A read through a dataset sees the most recent,
//! non-deleted revision visible through that dataset and its transitive
//! imports, optionally frozen to a point in time by a cutoff.
//!
//! * See [`TemporalDataSource`] for the concrete source and its caches.
//! * See [`DataSource`] for the public load/save/delete contract.
//! * See [`TemporalQuery`] for key-range queries across dataset hierarchies.

mod context;
mod engine;
mod error;
mod query;
mod source;

#[doc(hidden)]
pub mod test_util;

pub use self::context::Context;
pub use self::engine::{Collection, Database, Filter, Pipeline, SortOrder, Stage, StorageClient};
pub use self::error::{Error, Result};
pub use self::query::{RecordIter, TemporalQuery};
pub use self::source::{DataSource, DataSourceConfig, TemporalDataSource, COMMON_DATA_SET_NAME};

// Re-exports
#[doc(no_inline)]
pub use tempora_id::TemporalId;
#[doc(no_inline)]
pub use tempora_types::{DataSet, DataSetDetail, DataSetFlags, DbNameKey, InstanceType};
