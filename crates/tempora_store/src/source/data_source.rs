use tempora_id::TemporalId;
use tempora_types::{DataSet, DataSetFlags, KeyMeta, Record, RecordMeta};

use crate::{Error, Result};

// ----------------------------------------------------------------------------

/// Name of the conventional top-level dataset stored in the root dataset.
pub const COMMON_DATA_SET_NAME: &str = "Common";

/// Behavior switches of a data source, fixed at construction.
///
/// `cutoff_time` freezes the source to a historical view: loads ignore
/// records at or above the cutoff, and every write is refused. Because the
/// cutoff cannot change after construction, the dataset and lookup-list
/// caches never go stale.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DataSourceConfig {
    /// Refuse every write operation.
    pub readonly: bool,

    /// Keep only the latest revision of each record, in every dataset.
    pub non_temporal: bool,

    /// Upper visibility bound; unset means "now".
    pub cutoff_time: Option<TemporalId>,

    /// Resolve query results against the frozen import hierarchy
    /// (latest revision in the nearest dataset). Disabling falls back to
    /// plain latest-per-key in cursor order.
    pub freeze_imports: bool,
}

impl DataSourceConfig {
    pub const DEFAULT: Self = Self {
        readonly: false,
        non_temporal: false,
        cutoff_time: None,
        freeze_imports: true,
    };
}

impl Default for DataSourceConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

// ----------------------------------------------------------------------------

/// The public contract of a data source.
///
/// A data source is a logical database: it stores and resolves datasets,
/// stores records in a specific dataset, and answers lookups across a
/// dataset and its transitively imported datasets.
pub trait DataSource {
    /// Unique name of this data source.
    fn source_name(&self) -> &str;

    /// `true` when every write operation is refused.
    fn is_readonly(&self) -> bool;

    /// Allocate an id strictly greater than every id previously returned by
    /// this instance. Across processes, ordering holds to one-second
    /// resolution only.
    fn create_ordered_id(&self) -> Result<TemporalId>;

    /// Load a record by temporal id.
    ///
    /// Returns `None` when there is no record, when the record is hidden by
    /// a cutoff, or when it is a tombstone; fails with `TypeMismatch` when a
    /// record exists but is not an instance of `T`.
    fn load_or_null<T: RecordMeta>(&self, id: TemporalId) -> Result<Option<Box<dyn Record>>>;

    /// Load a record by key from a dataset or its imports.
    ///
    /// The lookup descends datasets in falling temporal id order and record
    /// revisions within each dataset the same way: the latest revision in
    /// the nearest dataset wins, and a tombstone hides anything below it.
    fn load_or_null_by_key<K: KeyMeta>(
        &self,
        key: &K,
        load_from: TemporalId,
    ) -> Result<Option<Box<dyn Record>>>;

    /// Non-null variant of [`DataSource::load_or_null`].
    fn load<T: RecordMeta>(&self, id: TemporalId) -> Result<Box<dyn Record>> {
        self.load_or_null::<T>(id)?.ok_or_else(|| {
            Error::NotFound(format!("record with temporal id {id} is not found"))
        })
    }

    /// Non-null variant of [`DataSource::load_or_null_by_key`].
    fn load_by_key<K: KeyMeta>(&self, key: &K, load_from: TemporalId) -> Result<Box<dyn Record>> {
        let record = self.load_or_null_by_key(key, load_from)?;
        match record {
            Some(record) => Ok(record),
            None => Err(Error::not_found_by_key(&key.value()?, load_from)),
        }
    }

    /// Save records into a dataset in input order.
    ///
    /// Each record receives a freshly allocated id (strictly greater than
    /// `save_to`) and `save_to` as its dataset, and has its `init` hook run,
    /// before the batch is inserted.
    fn save_many<'a, I>(&self, records: I, save_to: TemporalId) -> Result<()>
    where
        I: IntoIterator<Item = &'a mut dyn Record>;

    /// Save a single record. See [`DataSource::save_many`].
    fn save_one(&self, record: &mut dyn Record, save_to: TemporalId) -> Result<()> {
        self.save_many(std::iter::once(record), save_to)
    }

    /// Write a tombstone for the key into a dataset.
    ///
    /// The tombstone is written unconditionally, even when no live record
    /// exists, to avoid a lookup round trip.
    fn delete<K: KeyMeta>(&self, key: &K, delete_in: TemporalId) -> Result<()>;

    /// Drop the backing database.
    ///
    /// Refused for read-only sources and for `PROD`/`UAT` instance types.
    fn delete_db(&self) -> Result<()>;

    /// Resolve a dataset name to its temporal id, or `None`.
    fn data_set_of(&self, name: &str, load_from: TemporalId) -> Result<Option<TemporalId>>;

    /// Non-null variant of [`DataSource::data_set_of`].
    fn data_set(&self, name: &str, load_from: TemporalId) -> Result<TemporalId> {
        self.data_set_of(name, load_from)?.ok_or_else(|| {
            Error::NotFound(format!(
                "dataset {name} is not found in data source {}",
                self.source_name()
            ))
        })
    }

    /// Save a dataset record and refresh the dataset caches.
    fn save_data_set(&self, data_set: &mut DataSet, save_to: TemporalId) -> Result<()>;

    /// Create and save a dataset with the given imports.
    fn create_data_set(
        &self,
        name: &str,
        save_to: TemporalId,
        imports: &[TemporalId],
    ) -> Result<TemporalId> {
        self.create_data_set_with_flags(name, save_to, imports, DataSetFlags::DEFAULT)
    }

    /// Create and save a dataset, with creation flags.
    fn create_data_set_with_flags(
        &self,
        name: &str,
        save_to: TemporalId,
        imports: &[TemporalId],
        flags: DataSetFlags,
    ) -> Result<TemporalId> {
        let mut data_set = DataSet::new(name, imports);
        if flags.non_temporal {
            data_set.non_temporal = Some(true);
        }
        self.save_data_set(&mut data_set, save_to)?;
        Ok(data_set.id)
    }

    /// Create the conventional `Common` dataset in the root dataset.
    fn create_common(&self) -> Result<TemporalId> {
        self.create_data_set(COMMON_DATA_SET_NAME, TemporalId::ZERO, &[])
    }

    /// Resolve the conventional `Common` dataset.
    fn common(&self) -> Result<TemporalId> {
        self.data_set(COMMON_DATA_SET_NAME, TemporalId::ZERO)
    }

    /// The dataset itself plus the transitive closure of its imports, in
    /// ascending temporal id order, with duplicates removed, cycles caught,
    /// and datasets beyond the effective cutoff elided.
    fn lookup_list(&self, data_set: TemporalId) -> Result<Vec<TemporalId>>;
}
