use tempora_id::TemporalId;

use crate::{
    Data, Document, Key, KeyMeta, KeyWriter, Record, RecordMeta, Result, TokenReader, Value,
};

// ----------------------------------------------------------------------------

/// A named, immutable container of records, stored in its *parent* dataset.
///
/// The dataset's temporal id doubles as its identity and as an upper bound on
/// the visibility of the records it contains. `imports` composes datasets
/// into a DAG: every import's id is strictly less than this dataset's id.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DataSet {
    pub id: TemporalId,
    pub data_set: TemporalId,
    pub data_set_name: String,
    pub imports: Vec<TemporalId>,
    pub non_temporal: Option<bool>,
}

impl DataSet {
    pub fn new(name: impl Into<String>, imports: &[TemporalId]) -> Self {
        Self {
            data_set_name: name.into(),
            imports: imports.to_vec(),
            ..Default::default()
        }
    }

    pub fn is_non_temporal(&self) -> bool {
        self.non_temporal.unwrap_or(false)
    }
}

impl Data for DataSet {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn write_fields(&self, doc: &mut Document) -> Result<()> {
        doc.set("DataSetName", self.data_set_name.as_str());
        if !self.imports.is_empty() {
            let imports: Vec<Value> = self.imports.iter().map(|id| Value::Id(*id)).collect();
            doc.set("Imports", imports);
        }
        if let Some(non_temporal) = self.non_temporal {
            doc.set("NonTemporal", non_temporal);
        }
        Ok(())
    }
}

impl Record for DataSet {
    crate::impl_record_accessors!();

    fn key(&self) -> Result<String> {
        DataSetKey {
            data_set_name: self.data_set_name.clone(),
        }
        .value()
    }
}

impl RecordMeta for DataSet {
    const TYPE_NAME: &'static str = "DataSet";
    const ANCESTORS: &'static [&'static str] = &["DataSet"];
    type Key = DataSetKey;

    fn from_document(doc: &Document) -> Result<Self> {
        let mut imports = Vec::new();
        if let Some(value) = doc.get("Imports") {
            for element in value.as_array().unwrap_or(&[]) {
                if let Some(id) = element.as_id() {
                    imports.push(id);
                }
            }
        }
        Ok(Self {
            id: TemporalId::ZERO,
            data_set: TemporalId::ZERO,
            data_set_name: doc.read_str(Self::TYPE_NAME, "DataSetName")?,
            imports,
            non_temporal: doc.read_opt_bool(Self::TYPE_NAME, "NonTemporal")?,
        })
    }
}

/// Key of a [`DataSet`]: the dataset name alone.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DataSetKey {
    pub data_set_name: String,
}

impl DataSetKey {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            data_set_name: name.into(),
        }
    }
}

impl Key for DataSetKey {
    fn write_tokens(&self, writer: &mut KeyWriter) -> Result<()> {
        writer.string(&self.data_set_name)
    }

    fn read_tokens(&mut self, reader: &mut TokenReader<'_>) -> Result<()> {
        self.data_set_name = reader.string()?;
        Ok(())
    }
}

impl KeyMeta for DataSetKey {
    const TYPE_NAME: &'static str = "DataSetKey";
}

// ----------------------------------------------------------------------------

/// Creation options for a dataset.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DataSetFlags {
    /// Hold latest-only data in this dataset even when the data source is
    /// temporal. The dataset *record* stays temporal either way.
    pub non_temporal: bool,
}

impl DataSetFlags {
    pub const DEFAULT: Self = Self {
        non_temporal: false,
    };

    pub const NON_TEMPORAL: Self = Self { non_temporal: true };
}

// ----------------------------------------------------------------------------

/// Per-dataset overrides, keyed by the dataset's temporal id and stored in
/// the parent of the dataset they describe.
///
/// Datasets themselves are immutable; mutable aspects (read-only marking,
/// historical cutoffs) live here so they can be changed after creation.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DataSetDetail {
    pub id: TemporalId,
    pub data_set: TemporalId,
    pub data_set_id: TemporalId,
    pub read_only: Option<bool>,
    pub cutoff_time: Option<TemporalId>,
    pub imports_cutoff_time: Option<TemporalId>,
}

impl DataSetDetail {
    pub fn new(data_set_id: TemporalId) -> Self {
        Self {
            data_set_id,
            ..Default::default()
        }
    }
}

impl Data for DataSetDetail {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn write_fields(&self, doc: &mut Document) -> Result<()> {
        doc.set("DataSetId", self.data_set_id);
        if let Some(read_only) = self.read_only {
            doc.set("ReadOnly", read_only);
        }
        if let Some(cutoff_time) = self.cutoff_time {
            doc.set("CutoffTime", cutoff_time);
        }
        if let Some(imports_cutoff_time) = self.imports_cutoff_time {
            doc.set("ImportsCutoffTime", imports_cutoff_time);
        }
        Ok(())
    }
}

impl Record for DataSetDetail {
    crate::impl_record_accessors!();

    fn key(&self) -> Result<String> {
        DataSetDetailKey {
            data_set_id: self.data_set_id,
        }
        .value()
    }
}

impl RecordMeta for DataSetDetail {
    const TYPE_NAME: &'static str = "DataSetDetail";
    const ANCESTORS: &'static [&'static str] = &["DataSetDetail"];
    type Key = DataSetDetailKey;

    fn from_document(doc: &Document) -> Result<Self> {
        Ok(Self {
            id: TemporalId::ZERO,
            data_set: TemporalId::ZERO,
            data_set_id: doc.read_id(Self::TYPE_NAME, "DataSetId")?,
            read_only: doc.read_opt_bool(Self::TYPE_NAME, "ReadOnly")?,
            cutoff_time: doc.read_opt_id(Self::TYPE_NAME, "CutoffTime")?,
            imports_cutoff_time: doc.read_opt_id(Self::TYPE_NAME, "ImportsCutoffTime")?,
        })
    }
}

/// Key of a [`DataSetDetail`]: the described dataset's temporal id.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DataSetDetailKey {
    pub data_set_id: TemporalId,
}

impl Key for DataSetDetailKey {
    fn write_tokens(&self, writer: &mut KeyWriter) -> Result<()> {
        writer.id(self.data_set_id);
        Ok(())
    }

    fn read_tokens(&mut self, reader: &mut TokenReader<'_>) -> Result<()> {
        self.data_set_id = reader.id()?;
        Ok(())
    }
}

impl KeyMeta for DataSetDetailKey {
    const TYPE_NAME: &'static str = "DataSetDetailKey";
}

// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::serialize::{deserialize, serialize};
    use crate::{downcast_record, is_deleted};

    #[test]
    fn data_set_key_is_its_name() {
        let data_set = DataSet::new("DataSet0", &[]);
        assert_eq!(data_set.key().unwrap(), "DataSet0");
    }

    #[test]
    fn data_set_round_trip() {
        let imports = [TemporalId::new(), TemporalId::new()];
        let mut data_set = DataSet::new("DataSet1", &imports);
        data_set.id = TemporalId::new();

        let parsed = deserialize(&serialize(&data_set).unwrap()).unwrap();
        assert!(!is_deleted(parsed.as_ref()));
        let parsed = downcast_record::<DataSet>(parsed).unwrap();
        assert_eq!(*parsed, data_set);
    }

    #[test]
    fn detail_round_trip_preserves_unset_fields() {
        let mut detail = DataSetDetail::new(TemporalId::new());
        detail.id = TemporalId::new();
        detail.cutoff_time = Some(TemporalId::new());

        let doc = serialize(&detail).unwrap();
        assert!(doc.get("ReadOnly").is_none());
        assert!(doc.get("ImportsCutoffTime").is_none());

        let parsed = downcast_record::<DataSetDetail>(deserialize(&doc).unwrap()).unwrap();
        assert_eq!(*parsed, detail);
    }

    #[test]
    fn detail_key_is_the_dataset_id() {
        let id = TemporalId::new();
        let key = DataSetDetailKey { data_set_id: id };
        assert_eq!(key.value().unwrap(), id.to_string());

        let mut parsed = DataSetDetailKey::default();
        parsed.populate_from_string(&id.to_string()).unwrap();
        assert_eq!(parsed.data_set_id, id);
    }
}
