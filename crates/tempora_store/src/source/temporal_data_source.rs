use std::collections::BTreeSet;
use std::sync::Arc;

use ahash::HashMap;
use parking_lot::Mutex;
use tempora_id::TemporalId;
use tempora_log::Log;
use tempora_types::{
    downcast_record, is_deleted, registry, registry::RecordSpec, serialize, Data, DataSet,
    DataSetDetail, DataSetDetailKey, DataSetKey, DbNameKey, Document, InstanceType, Key, KeyMeta,
    Record, RecordMeta, DATASET_FIELD, ID_FIELD, KEY_FIELD,
};

use crate::{
    Collection, DataSource, DataSourceConfig, Database, Error, Filter, Pipeline, Result,
    SortOrder, StorageClient, TemporalQuery,
};

// ----------------------------------------------------------------------------

/// Characters a database name must not contain.
const PROHIBITED_NAME_CHARS: &[char] = &[
    '/', '\\', '.', ' ', '"', '$', '*', '<', '>', ':', '|', '?',
];

/// Longest permitted database name.
const MAX_DB_NAME_LEN: usize = 64;

/// Caches owned by a data source, plus the monotonic-allocator slot.
///
/// Entries are computed on first demand and never invalidated: datasets are
/// immutable and the source's cutoff is fixed at construction, so a cached
/// answer stays correct. The lock is held only for individual map accesses;
/// a miss is recomputed outside the lock, and since recomputation is
/// deterministic a concurrent duplicate computation is benign.
#[derive(Default)]
struct SourceState {
    collections: HashMap<&'static str, Arc<Collection>>,
    data_set_by_name: HashMap<String, TemporalId>,
    parent_by_id: HashMap<TemporalId, TemporalId>,
    detail_by_id: HashMap<TemporalId, Option<DataSetDetail>>,
    lookup_by_id: HashMap<TemporalId, BTreeSet<TemporalId>>,
    prev_id: TemporalId,
}

// ----------------------------------------------------------------------------

/// A data source with full temporal semantics: per-record history, dataset
/// hierarchies with transitive imports, tombstone deletion, and historical
/// views through cutoffs.
pub struct TemporalDataSource {
    name: String,
    instance_type: InstanceType,
    db_name: String,
    client: Arc<StorageClient>,
    db: Arc<Database>,
    config: DataSourceConfig,
    log: Arc<dyn Log>,
    state: Mutex<SourceState>,
}

impl TemporalDataSource {
    /// Validate the database name and open the backing database.
    pub fn connect(
        client: &Arc<StorageClient>,
        name: impl Into<String>,
        db_name: &DbNameKey,
        config: DataSourceConfig,
        log: Arc<dyn Log>,
    ) -> Result<Self> {
        if db_name.instance_type == InstanceType::Empty {
            return Err(Error::Validation(
                "database instance type is not specified".to_owned(),
            ));
        }
        if db_name.instance_name.is_empty() {
            return Err(Error::Validation(
                "database instance name is not specified".to_owned(),
            ));
        }
        if db_name.env_name.is_empty() {
            return Err(Error::Validation(
                "database environment name is not specified".to_owned(),
            ));
        }

        let db_name_value = db_name.value()?;
        if db_name_value.contains(PROHIBITED_NAME_CHARS) {
            return Err(Error::Validation(format!(
                "database name {db_name_value} contains a space or another prohibited \
                 character from the following list: /\\.\"$*<>:|?"
            )));
        }
        if db_name_value.len() > MAX_DB_NAME_LEN {
            return Err(Error::Validation(format!(
                "database name {db_name_value} exceeds the maximum length \
                 of {MAX_DB_NAME_LEN} characters"
            )));
        }

        let db = client.database(&db_name_value);
        Ok(Self {
            name: name.into(),
            instance_type: db_name.instance_type,
            db_name: db_name_value,
            client: client.clone(),
            db,
            config,
            log,
            state: Mutex::new(SourceState::default()),
        })
    }

    pub fn config(&self) -> &DataSourceConfig {
        &self.config
    }

    pub fn log(&self) -> &Arc<dyn Log> {
        &self.log
    }

    /// The validated database name this source stores into.
    pub fn db_name(&self) -> &str {
        &self.db_name
    }

    /// A query over `T` and its registered descendants, resolved against
    /// `load_from` and its imports.
    pub fn get_query<T: RecordMeta>(&self, load_from: TemporalId) -> Result<TemporalQuery<'_>> {
        registry::register::<T>();
        TemporalQuery::new(self, T::TYPE_NAME, load_from)
    }

    // --- Collection resolution ---

    /// The collection holding `collection_name`; the handle is cached and
    /// write-once.
    pub(crate) fn collection_for_name(&self, collection_name: &'static str) -> Arc<Collection> {
        let mut state = self.state.lock();
        if let Some(collection) = state.collections.get(collection_name) {
            return collection.clone();
        }
        let collection = self.db.collection(collection_name);
        state.collections.insert(collection_name, collection.clone());
        collection
    }

    // --- Cutoff resolution ---

    /// Effective cutoff scoped to a dataset: the smaller of the source's own
    /// cutoff and the dataset detail's cutoff, with unset meaning "none".
    pub(crate) fn cutoff_time(&self, data_set: TemporalId) -> Result<Option<TemporalId>> {
        let detail_cutoff = self
            .data_set_detail_or_none(data_set)?
            .and_then(|detail| detail.cutoff_time);
        Ok(match (self.config.cutoff_time, detail_cutoff) {
            (Some(source), Some(detail)) => Some(source.min(detail)),
            (source, detail) => source.or(detail),
        })
    }

    /// Cutoff applied only to datasets reached through the imports list.
    pub(crate) fn imports_cutoff_time(&self, data_set: TemporalId) -> Result<Option<TemporalId>> {
        Ok(self
            .data_set_detail_or_none(data_set)?
            .and_then(|detail| detail.imports_cutoff_time))
    }

    /// Per-dataset overrides, memoized; the root dataset has none.
    fn data_set_detail_or_none(&self, data_set: TemporalId) -> Result<Option<DataSetDetail>> {
        if data_set.is_zero() {
            return Ok(None);
        }
        if let Some(detail) = self.state.lock().detail_by_id.get(&data_set) {
            return Ok(detail.clone());
        }

        let parent = self.parent_of(data_set)?;
        let key = DataSetDetailKey {
            data_set_id: data_set,
        };
        let detail = match self.load_or_null_by_key(&key, parent)? {
            Some(record) => Some(*downcast_record::<DataSetDetail>(record)?),
            None => None,
        };

        self.state
            .lock()
            .detail_by_id
            .insert(data_set, detail.clone());
        Ok(detail)
    }

    /// The dataset a dataset record is stored in, memoized.
    fn parent_of(&self, data_set: TemporalId) -> Result<TemporalId> {
        if let Some(parent) = self.state.lock().parent_by_id.get(&data_set) {
            return Ok(*parent);
        }
        let record = self.load_data_set_record_anywhere(data_set)?.ok_or_else(|| {
            Error::NotFound(format!("dataset with temporal id {data_set} is not found"))
        })?;
        let parent = record.data_set;
        self.state.lock().parent_by_id.insert(data_set, parent);
        Ok(parent)
    }

    // --- Dataset graph resolution ---

    /// The dataset record under `id`, wherever it is stored.
    fn load_data_set_record_anywhere(&self, id: TemporalId) -> Result<Option<DataSet>> {
        match self.load_or_null::<DataSet>(id)? {
            Some(record) => Ok(Some(*downcast_record::<DataSet>(record)?)),
            None => Ok(None),
        }
    }

    /// The dataset record under `id`, verified to be stored in the root
    /// dataset (the only place the lookup traversal accepts them from).
    fn load_data_set_record(&self, id: TemporalId) -> Result<DataSet> {
        let data_set = self.load_data_set_record_anywhere(id)?.ok_or_else(|| {
            Error::NotFound(format!("dataset with temporal id {id} is not found"))
        })?;
        if !data_set.data_set.is_zero() {
            return Err(Error::Validation(format!(
                "dataset with temporal id {id} is not stored in the root dataset"
            )));
        }
        Ok(data_set)
    }

    /// The lookup list as an ordered set, memoized per dataset.
    pub(crate) fn lookup_set(&self, load_from: TemporalId) -> Result<BTreeSet<TemporalId>> {
        if load_from.is_zero() {
            return Ok(BTreeSet::from([TemporalId::ZERO]));
        }
        if let Some(set) = self.state.lock().lookup_by_id.get(&load_from) {
            return Ok(set.clone());
        }

        let data_set = self.load_data_set_record(load_from)?;
        let mut result = BTreeSet::new();
        self.fill_lookup_set(&data_set, &mut result)?;

        self.state
            .lock()
            .lookup_by_id
            .insert(load_from, result.clone());
        Ok(result)
    }

    /// Depth-first union of a dataset and its transitive imports.
    ///
    /// A dataset is inserted before its imports are walked, so membership in
    /// `result` terminates cycles without relying on recursion limits. A
    /// dataset at or above the effective cutoff contributes nothing: an
    /// import added after a cutoff is invisible at that cutoff.
    fn fill_lookup_set(
        &self,
        data_set: &DataSet,
        result: &mut BTreeSet<TemporalId>,
    ) -> Result<()> {
        if data_set.id.is_zero() {
            return Err(Error::Validation(
                "required temporal id value is not set on a dataset record".to_owned(),
            ));
        }
        if data_set.data_set_name.is_empty() {
            return Err(Error::Validation(
                "required dataset name is not set on a dataset record".to_owned(),
            ));
        }

        let cutoff = self.cutoff_time(data_set.data_set)?;
        if cutoff.is_some_and(|cutoff| data_set.id >= cutoff) {
            return Ok(());
        }
        result.insert(data_set.id);

        let imports_cutoff = self.imports_cutoff_time(data_set.id)?;
        for &import_id in &data_set.imports {
            if import_id == data_set.id {
                return Err(Error::OrderViolation(format!(
                    "dataset {} with temporal id {} includes itself in the list of its imports",
                    data_set.data_set_name, data_set.id
                )));
            }
            if imports_cutoff.is_some_and(|cutoff| import_id >= cutoff) {
                continue;
            }
            if result.contains(&import_id) {
                continue;
            }
            if import_id.is_zero() {
                result.insert(import_id);
                continue;
            }
            if let Some(cached) = self.state.lock().lookup_by_id.get(&import_id).cloned() {
                result.extend(cached);
                continue;
            }
            let import = self.load_data_set_record(import_id)?;
            self.fill_lookup_set(&import, result)?;
        }
        Ok(())
    }

    /// Append the dataset-membership and cutoff stages.
    ///
    /// These must follow every user predicate and precede any user sort;
    /// the query builder preserves that ordering.
    pub(crate) fn apply_final_constraints(
        &self,
        pipeline: Pipeline,
        load_from: TemporalId,
    ) -> Result<Pipeline> {
        let lookup = self
            .lookup_set(load_from)?
            .into_iter()
            .map(tempora_types::Value::Id)
            .collect();
        let mut pipeline = pipeline.match_stage(Filter::is_in(DATASET_FIELD, lookup));

        if let Some(cutoff) = self.cutoff_time(load_from)? {
            pipeline = pipeline.match_stage(Filter::lte(ID_FIELD, cutoff));
        }
        Ok(pipeline)
    }

    // --- Write-path gates ---

    /// Reject writes into read-only or historical views. Each refusal gets
    /// its own message so callers can tell which gate fired.
    fn check_not_readonly(&self, data_set: TemporalId) -> Result<()> {
        if self.config.readonly {
            return Err(Error::ReadOnly(format!(
                "attempting write operation for data source {} \
                 where the read-only flag is set",
                self.name
            )));
        }

        let detail = self.data_set_detail_or_none(data_set)?;
        if detail
            .as_ref()
            .is_some_and(|detail| detail.read_only.unwrap_or(false))
        {
            return Err(Error::ReadOnly(format!(
                "attempting write operation for dataset {data_set} \
                 where the read-only flag is set"
            )));
        }

        if self.config.cutoff_time.is_some() {
            return Err(Error::ReadOnly(format!(
                "attempting write operation for data source {} where cutoff time is set; \
                 a historical view of the data cannot be written to",
                self.name
            )));
        }
        if detail
            .as_ref()
            .is_some_and(|detail| detail.cutoff_time.is_some())
        {
            return Err(Error::ReadOnly(format!(
                "attempting write operation for dataset {data_set} where cutoff time is set; \
                 a historical view of the data cannot be written to"
            )));
        }
        Ok(())
    }

    /// Latest-only semantics apply when the source, the record type, or the
    /// target dataset is non-temporal.
    fn is_non_temporal(&self, spec: &RecordSpec, data_set: TemporalId) -> Result<bool> {
        if self.config.non_temporal || spec.non_temporal {
            return Ok(true);
        }
        if data_set.is_zero() {
            return Ok(false);
        }
        Ok(self
            .load_data_set_record_anywhere(data_set)?
            .is_some_and(|record| record.is_non_temporal()))
    }

    fn deserialize_record(&self, doc: &Document) -> Result<Box<dyn Record>> {
        serialize::deserialize(doc).map_err(Error::from)
    }
}

// ----------------------------------------------------------------------------

impl DataSource for TemporalDataSource {
    fn source_name(&self) -> &str {
        &self.name
    }

    fn is_readonly(&self) -> bool {
        self.config.readonly
    }

    /// Allocate the next id, retrying until it exceeds the previous one.
    ///
    /// The id's time field advances at one-second granularity on its own, so
    /// the loop never sleeps; a retry is logged once, and recovery reports
    /// the retry count.
    fn create_ordered_id(&self) -> Result<TemporalId> {
        if self.config.readonly {
            return Err(Error::ReadOnly(format!(
                "attempting ordered id allocation for data source {} \
                 where the read-only flag is set",
                self.name
            )));
        }

        let mut state = self.state.lock();
        let mut result = TemporalId::new();
        let mut retries = 0_u32;
        while result <= state.prev_id {
            if retries == 0 {
                self.log
                    .warning("generated temporal id is not in increasing order, retrying");
            }
            retries += 1;
            result = TemporalId::new();
        }
        if retries > 0 {
            self.log.append(
                tempora_log::LogKind::Status,
                None,
                "generated temporal id in increasing order after {} retries",
                &[retries.to_string()],
            );
        }

        state.prev_id = result;
        Ok(result)
    }

    fn load_or_null<T: RecordMeta>(&self, id: TemporalId) -> Result<Option<Box<dyn Record>>> {
        registry::register::<T>();

        if let Some(cutoff) = self.config.cutoff_time {
            if id >= cutoff {
                return Ok(None);
            }
        }

        let spec = registry::spec_of(T::TYPE_NAME)?;
        let collection = self.collection_for_name(spec.collection_name());
        let pipeline = Pipeline::new()
            .match_stage(Filter::eq(ID_FIELD, id))
            .limit(1);

        let Some(doc) = collection.aggregate(&pipeline).into_iter().next() else {
            return Ok(None);
        };
        let mut record = self.deserialize_record(&doc)?;
        if is_deleted(record.as_ref()) {
            return Ok(None);
        }

        if let Some(cutoff) = self.cutoff_time(record.data_set())? {
            if id >= cutoff {
                return Ok(None);
            }
        }

        if !registry::is_subtype(record.type_name(), T::TYPE_NAME)? {
            return Err(Error::TypeMismatch {
                stored: record.type_name().to_owned(),
                requested: T::TYPE_NAME.to_owned(),
                location: format!("temporal id {id} and key {}", record.key()?),
            });
        }

        record.init()?;
        Ok(Some(record))
    }

    fn load_or_null_by_key<K: KeyMeta>(
        &self,
        key: &K,
        load_from: TemporalId,
    ) -> Result<Option<Box<dyn Record>>> {
        let key_value = key.value()?;
        let record_spec = registry::record_spec_for_key(K::TYPE_NAME)?;
        let collection = self.collection_for_name(record_spec.collection_name());

        let pipeline = Pipeline::new().match_stage(Filter::eq(KEY_FIELD, key_value.as_str()));
        let pipeline = self
            .apply_final_constraints(pipeline, load_from)?
            .sort_stage(&[
                (DATASET_FIELD, SortOrder::Descending),
                (ID_FIELD, SortOrder::Descending),
            ])
            .limit(1);

        let Some(doc) = collection.aggregate(&pipeline).into_iter().next() else {
            return Ok(None);
        };
        let mut record = self.deserialize_record(&doc)?;
        if is_deleted(record.as_ref()) {
            return Ok(None);
        }

        if !registry::is_subtype(record.type_name(), record_spec.type_name)? {
            return Err(Error::TypeMismatch {
                stored: record.type_name().to_owned(),
                requested: record_spec.type_name.to_owned(),
                location: format!("key {key_value} in dataset {load_from}"),
            });
        }

        record.init()?;
        Ok(Some(record))
    }

    fn save_many<'a, I>(&self, records: I, save_to: TemporalId) -> Result<()>
    where
        I: IntoIterator<Item = &'a mut dyn Record>,
    {
        self.check_not_readonly(save_to)?;

        let mut batches: Vec<(&'static str, Vec<Document>)> = Vec::new();
        for record in records {
            let record_id = self.create_ordered_id()?;
            if record_id <= save_to {
                return Err(Error::OrderViolation(format!(
                    "temporal id {record_id} of a record must be greater than \
                     temporal id {save_to} of the dataset where it is being saved"
                )));
            }
            record.set_id(record_id);
            record.set_data_set(save_to);
            record.init()?;

            let spec = registry::spec_of(record.type_name())?;
            let doc = serialize::serialize(record)?;

            if self.is_non_temporal(&spec, save_to)? {
                // Latest-only: replace any prior revision of the same key
                // within this dataset, then insert the fresh one.
                let collection = self.collection_for_name(spec.collection_name());
                collection.remove_by_key_in_data_set(&record.key()?, save_to);
                collection.insert_one(doc)?;
            } else {
                match batches.last_mut() {
                    Some((name, docs)) if *name == spec.collection_name() => docs.push(doc),
                    _ => batches.push((spec.collection_name(), vec![doc])),
                }
            }
        }

        for (collection_name, docs) in batches {
            self.collection_for_name(collection_name).insert_many(docs)?;
        }
        Ok(())
    }

    fn delete<K: KeyMeta>(&self, key: &K, delete_in: TemporalId) -> Result<()> {
        self.check_not_readonly(delete_in)?;

        let record_id = self.create_ordered_id()?;
        if record_id <= delete_in {
            return Err(Error::OrderViolation(format!(
                "temporal id {record_id} of a tombstone must be greater than \
                 temporal id {delete_in} of the dataset where it is being written"
            )));
        }

        let mut tombstone = tempora_types::DeletedRecord::new(key.value()?);
        tombstone.id = record_id;
        tombstone.data_set = delete_in;

        let record_spec = registry::record_spec_for_key(K::TYPE_NAME)?;
        let collection = self.collection_for_name(record_spec.collection_name());
        collection.insert_one(serialize::serialize(&tombstone)?)
    }

    fn delete_db(&self) -> Result<()> {
        if self.config.readonly {
            return Err(Error::ReadOnly(format!(
                "attempting to drop the database for data source {} \
                 where the read-only flag is set",
                self.name
            )));
        }
        if !self.instance_type.allows_drop() {
            return Err(Error::Validation(format!(
                "database {} cannot be dropped because this operation is not \
                 permitted for database instance type {}",
                self.db_name, self.instance_type
            )));
        }
        self.client.drop_database(&self.db_name);
        Ok(())
    }

    fn data_set_of(&self, name: &str, load_from: TemporalId) -> Result<Option<TemporalId>> {
        if let Some(id) = self.state.lock().data_set_by_name.get(name) {
            return Ok(Some(*id));
        }

        let key = DataSetKey::new(name);
        let Some(record) = self.load_or_null_by_key(&key, load_from)? else {
            return Ok(None);
        };
        let data_set = *downcast_record::<DataSet>(record)?;

        {
            let mut state = self.state.lock();
            state
                .data_set_by_name
                .insert(name.to_owned(), data_set.id);
            state.parent_by_id.insert(data_set.id, data_set.data_set);
        }

        if !self.state.lock().lookup_by_id.contains_key(&data_set.id) {
            let mut set = BTreeSet::new();
            self.fill_lookup_set(&data_set, &mut set)?;
            self.state.lock().lookup_by_id.insert(data_set.id, set);
        }

        Ok(Some(data_set.id))
    }

    fn save_data_set(&self, data_set: &mut DataSet, save_to: TemporalId) -> Result<()> {
        if data_set.data_set_name.is_empty() {
            return Err(Error::Validation(
                "dataset name is empty; a dataset must be saved under a non-empty name"
                    .to_owned(),
            ));
        }

        self.save_one(data_set, save_to)?;

        {
            let mut state = self.state.lock();
            state
                .data_set_by_name
                .insert(data_set.data_set_name.clone(), data_set.id);
            state.parent_by_id.insert(data_set.id, data_set.data_set);
        }

        let mut set = BTreeSet::new();
        self.fill_lookup_set(data_set, &mut set)?;
        self.state.lock().lookup_by_id.insert(data_set.id, set);
        Ok(())
    }

    fn lookup_list(&self, data_set: TemporalId) -> Result<Vec<TemporalId>> {
        Ok(self.lookup_set(data_set)?.into_iter().collect())
    }
}
