//! The query engine: a builder of predicate/sort stages and a lazy,
//! restartable iterator resolving *latest revision per key* across a dataset
//! hierarchy.
//!
//! Matching documents can hold many revisions of the same key spread over
//! several datasets. Deduplicating naively would either buffer the entire
//! result set or cost one round trip per key, so the iterator works in
//! batches of [`BATCH_SIZE`] distinct keys:
//!
//! 1. **Key discovery**: walk the user's pipeline projected down to
//!    `(_id, _key)`, remembering every id in cursor order;
//! 2. **Latest resolution**: re-query just those keys sorted by
//!    `(_key asc, _dataset desc, _id desc)` and pick, per key, the revision
//!    from the nearest visible dataset;
//! 3. **Materialization**: fetch the chosen ids and emit them in the order
//!    phase 1 produced, skipping tombstones.

use std::collections::VecDeque;
use std::sync::Arc;

use ahash::{HashMap, HashSet};
use tempora_id::TemporalId;
use tempora_types::{
    is_deleted, registry, serialize, Document, Record, Value, DATASET_FIELD, ID_FIELD, KEY_FIELD,
    TYPE_FIELD,
};

use crate::{Collection, Error, Filter, Pipeline, Result, SortOrder, TemporalDataSource};

/// Distinct keys resolved per round trip.
const BATCH_SIZE: usize = 1000;

// ----------------------------------------------------------------------------

/// A value-style query builder: `where_*` and `sort_by*` return the extended
/// query, leaving the original untouched.
///
/// Every `where_*` clause must precede the first `sort_by*` clause: the
/// dataset-membership and cutoff stages are appended between predicates and
/// user sort, so a late predicate would land on the wrong side of them.
pub struct TemporalQuery<'a> {
    source: &'a TemporalDataSource,
    collection: Arc<Collection>,
    load_from: TemporalId,
    pipeline: Pipeline,
}

impl<'a> TemporalQuery<'a> {
    pub(crate) fn new(
        source: &'a TemporalDataSource,
        type_name: &'static str,
        load_from: TemporalId,
    ) -> Result<Self> {
        let spec = registry::spec_of(type_name)?;
        let collection = source.collection_for_name(spec.collection_name());

        // The collection holds the whole root-type family; restrict to the
        // queried type and its registered descendants.
        let descendants = registry::descendants_of(type_name)
            .into_iter()
            .map(Value::from)
            .collect();
        let pipeline = Pipeline::new().match_stage(Filter::is_in(TYPE_FIELD, descendants));

        Ok(Self {
            source,
            collection,
            load_from,
            pipeline,
        })
    }

    fn with_pipeline(&self, pipeline: Pipeline) -> Self {
        Self {
            source: self.source,
            collection: self.collection.clone(),
            load_from: self.load_from,
            pipeline,
        }
    }

    fn push_predicate(&self, filter: Filter) -> Result<Self> {
        if self.pipeline.has_sort() {
            return Err(Error::QueryOrdering);
        }
        Ok(self.with_pipeline(self.pipeline.clone().match_stage(filter)))
    }

    /// Equality predicate on a scalar field.
    ///
    /// The field name is re-cased to the stored naming, and the literal goes
    /// through the same type mapping the serializer uses (civil time scalars
    /// to their integer encodings, enums to member names).
    pub fn where_eq(&self, field: &str, value: impl Into<Value>) -> Result<Self> {
        self.push_predicate(Filter::eq(storage_field(field), value))
    }

    /// Membership predicate on a scalar field.
    pub fn where_in(&self, field: &str, values: Vec<Value>) -> Result<Self> {
        self.push_predicate(Filter::is_in(storage_field(field), values))
    }

    /// Ordered predicate (`<=`) on a scalar field.
    pub fn where_lte(&self, field: &str, value: impl Into<Value>) -> Result<Self> {
        self.push_predicate(Filter::lte(storage_field(field), value))
    }

    /// Ascending sort on a field; a second sort refines the first.
    pub fn sort_by(&self, field: &str) -> Result<Self> {
        self.push_sort(field, SortOrder::Ascending)
    }

    /// Descending sort on a field; a second sort refines the first.
    pub fn sort_by_desc(&self, field: &str) -> Result<Self> {
        self.push_sort(field, SortOrder::Descending)
    }

    fn push_sort(&self, field: &str, order: SortOrder) -> Result<Self> {
        let pipeline = if self.pipeline.has_sort() {
            self.pipeline.clone()
        } else {
            // First sort: the final constraints must precede it, and are
            // not re-applied when the iterator runs.
            self.source
                .apply_final_constraints(self.pipeline.clone(), self.load_from)?
        };
        Ok(self.with_pipeline(pipeline.merge_sort_field(&storage_field(field), order)))
    }

    /// The lazy record stream. Emission order is the user sort when one was
    /// supplied, otherwise ascending id (cursor-native order).
    pub fn as_iterable(&self) -> RecordIter<'a> {
        RecordIter {
            source: self.source,
            collection: self.collection.clone(),
            load_from: self.load_from,
            pipeline: self.pipeline.clone(),
            scan: None,
            scan_pos: 0,
            pending: VecDeque::new(),
            finished: false,
        }
    }
}

/// Caller-facing field names are snake_case; stored names are Pascal-cased.
fn storage_field(field: &str) -> String {
    tempora_types::case::to_pascal_case(field)
}

// ----------------------------------------------------------------------------

/// Iterator over query results; each item is a fully deserialized record.
///
/// Errors surface as the next item and end the stream.
pub struct RecordIter<'a> {
    source: &'a TemporalDataSource,
    collection: Arc<Collection>,
    load_from: TemporalId,
    pipeline: Pipeline,
    /// Phase-1 cursor: `(_id, _key)` projections in query order. `None`
    /// until the first `next` call opens it.
    scan: Option<Vec<Document>>,
    scan_pos: usize,
    pending: VecDeque<Box<dyn Record>>,
    finished: bool,
}

impl RecordIter<'_> {
    fn open_scan(&mut self) -> Result<()> {
        let pipeline = if self.pipeline.has_sort() {
            // Final constraints were applied when the first sort stage was
            // appended; the user's sort defines emission order.
            self.pipeline.clone()
        } else {
            self.source
                .apply_final_constraints(self.pipeline.clone(), self.load_from)?
        };
        let pipeline = pipeline.project(&[ID_FIELD, KEY_FIELD]);
        self.scan = Some(self.collection.aggregate(&pipeline));
        Ok(())
    }

    /// Run one batch through phases 1-3, filling `pending`.
    fn advance_batch(&mut self) -> Result<()> {
        if self.scan.is_none() {
            self.open_scan()?;
        }
        let scan = self.scan.as_ref().expect("scan opened above");

        // Phase 1: accumulate distinct keys (and every id, in cursor order)
        // until the batch is full.
        let mut batch_keys: HashSet<String> = HashSet::default();
        let mut batch_ids: HashSet<TemporalId> = HashSet::default();
        let mut batch_ids_ordered: Vec<TemporalId> = Vec::new();

        while self.scan_pos < scan.len() {
            let doc = &scan[self.scan_pos];
            let key = doc
                .get(KEY_FIELD)
                .and_then(Value::as_str)
                .ok_or_else(|| Error::Store("projected cursor row carries no _key".to_owned()))?;
            let id = doc
                .get(ID_FIELD)
                .and_then(|value| value.as_id())
                .ok_or_else(|| Error::Store("projected cursor row carries no _id".to_owned()))?;

            batch_keys.insert(key.to_owned());
            batch_ids.insert(id);
            batch_ids_ordered.push(id);
            self.scan_pos += 1;

            if batch_keys.len() == BATCH_SIZE {
                break;
            }
        }

        if batch_ids_ordered.is_empty() {
            self.finished = true;
            return Ok(());
        }

        // Phase 2: per key, choose the revision from the nearest visible
        // dataset (largest dataset id, then largest record id).
        let key_filter = batch_keys.iter().map(|key| Value::from(key.clone())).collect();
        let pipeline = Pipeline::new().match_stage(Filter::is_in(KEY_FIELD, key_filter));
        let pipeline = self
            .source
            .apply_final_constraints(pipeline, self.load_from)?
            .sort_stage(&[
                (KEY_FIELD, SortOrder::Ascending),
                (DATASET_FIELD, SortOrder::Descending),
                (ID_FIELD, SortOrder::Descending),
            ])
            .project(&[ID_FIELD, DATASET_FIELD, KEY_FIELD]);
        let candidates = self.collection.aggregate(&pipeline);

        let freeze_imports = self.source.config().freeze_imports;
        let descending_lookup: Vec<TemporalId> = if freeze_imports {
            self.source
                .lookup_set(self.load_from)?
                .into_iter()
                .rev()
                .collect()
        } else {
            Vec::new()
        };

        let mut record_ids: Vec<TemporalId> = Vec::new();
        let mut current_key: Option<String> = None;
        for doc in &candidates {
            let obj_key = doc
                .get(KEY_FIELD)
                .and_then(Value::as_str)
                .ok_or_else(|| Error::Store("candidate row carries no _key".to_owned()))?;
            if current_key.as_deref() == Some(obj_key) {
                continue;
            }
            let record_id = doc
                .get(ID_FIELD)
                .and_then(|value| value.as_id())
                .ok_or_else(|| Error::Store("candidate row carries no _id".to_owned()))?;

            if freeze_imports {
                let record_data_set = doc
                    .get(DATASET_FIELD)
                    .and_then(|value| value.as_id())
                    .ok_or_else(|| {
                        Error::Store("candidate row carries no _dataset".to_owned())
                    })?;
                for &data_set_id in &descending_lookup {
                    if data_set_id == record_data_set {
                        current_key = Some(obj_key.to_owned());
                        if batch_ids.contains(&record_id) {
                            record_ids.push(record_id);
                        }
                    }
                    // Datasets precede their records; once the lookup walk
                    // descends below the record id, no match can follow.
                    if data_set_id < record_id {
                        break;
                    }
                }
            } else {
                current_key = Some(obj_key.to_owned());
                if batch_ids.contains(&record_id) {
                    record_ids.push(record_id);
                }
            }
        }

        if record_ids.is_empty() {
            self.finished = true;
            return Ok(());
        }

        // Phase 3: materialize the chosen revisions and emit them in
        // phase-1 cursor order. Tombstones are dropped here, so a batch can
        // legitimately yield fewer records than keys.
        let id_filter = record_ids.iter().map(|id| Value::Id(*id)).collect();
        let pipeline = Pipeline::new().match_stage(Filter::is_in(ID_FIELD, id_filter));
        let mut by_id: HashMap<TemporalId, Box<dyn Record>> = HashMap::default();
        for doc in self.collection.aggregate(&pipeline) {
            let mut record = serialize::deserialize(&doc)?;
            if is_deleted(record.as_ref()) {
                continue;
            }
            record.init()?;
            by_id.insert(record.id(), record);
        }

        for id in batch_ids_ordered {
            if let Some(record) = by_id.remove(&id) {
                self.pending.push_back(record);
            }
        }

        if self.scan_pos >= scan.len() && self.pending.is_empty() {
            self.finished = true;
        }
        Ok(())
    }
}

impl Iterator for RecordIter<'_> {
    type Item = Result<Box<dyn Record>>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(record) = self.pending.pop_front() {
                return Some(Ok(record));
            }
            if self.finished {
                return None;
            }
            if let Err(err) = self.advance_batch() {
                self.finished = true;
                return Some(Err(err));
            }
        }
    }
}
