use std::collections::BTreeMap;

use parking_lot::RwLock;
use tempora_id::TemporalId;
use tempora_types::{Document, DATASET_FIELD, ID_FIELD, KEY_FIELD};

use crate::{Error, Pipeline, Result};

/// A named set of documents with a sorted primary key.
///
/// The primary key is the document's `_id` (a [`TemporalId`]), so a plain
/// scan is already in chronological insertion order: the cursor-native
/// ordering the query layer relies on.
pub struct Collection {
    name: String,
    rows: RwLock<BTreeMap<TemporalId, Document>>,
}

impl Collection {
    pub(crate) fn new(name: String) -> Self {
        Self {
            name,
            rows: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.rows.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.read().is_empty()
    }

    /// Insert one document; its `_id` must be present and unused.
    pub fn insert_one(&self, doc: Document) -> Result<()> {
        self.insert_many(vec![doc])
    }

    /// Insert a batch of documents in order.
    pub fn insert_many(&self, docs: Vec<Document>) -> Result<()> {
        let mut rows = self.rows.write();
        for doc in docs {
            let id = doc
                .get(ID_FIELD)
                .and_then(|value| value.as_id())
                .ok_or_else(|| {
                    Error::Store(format!(
                        "document inserted into collection {} carries no _id",
                        self.name
                    ))
                })?;
            if id.is_zero() {
                return Err(Error::Store(format!(
                    "document inserted into collection {} carries an empty _id",
                    self.name
                )));
            }
            if rows.insert(id, doc).is_some() {
                return Err(Error::Store(format!(
                    "duplicate _id {id} in collection {}",
                    self.name
                )));
            }
        }
        Ok(())
    }

    /// Remove every document with the given `_key` inside one dataset.
    ///
    /// This is the replace-by-key primitive behind non-temporal saves:
    /// prior revisions are dropped before the fresh one is inserted, so the
    /// dataset holds at most one row per key. Returns the number removed.
    pub fn remove_by_key_in_data_set(&self, key: &str, data_set: TemporalId) -> usize {
        let mut rows = self.rows.write();
        let before = rows.len();
        rows.retain(|_, doc| {
            doc.get(KEY_FIELD).and_then(|v| v.as_str()) != Some(key)
                || doc.get(DATASET_FIELD).and_then(|v| v.as_id()) != Some(data_set)
        });
        before - rows.len()
    }

    /// Run an aggregation pipeline over a snapshot of the collection.
    pub fn aggregate(&self, pipeline: &Pipeline) -> Vec<Document> {
        let rows = self.rows.read();
        pipeline.run(rows.values())
    }
}
