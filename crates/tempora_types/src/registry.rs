//! The process-wide type registry.
//!
//! The registry is an explicit, startup-built replacement for runtime
//! reflection: each record type is registered once (idempotently) and the
//! registry then answers four questions:
//!
//! * serialized name → deserializer (for reading stored documents);
//! * key type name → record type (for key-driven loads);
//! * record type → root type (for collection naming);
//! * record type → descendants (for type-filtered queries).

use ahash::HashMap;
use once_cell::sync::Lazy;
use parking_lot::RwLock;

use crate::{Document, Error, Record, RecordMeta, Result};

// ----------------------------------------------------------------------------

/// Everything the registry knows about one record type.
#[derive(Clone, Copy)]
pub struct RecordSpec {
    pub type_name: &'static str,

    /// Ancestor chain of serialized names, the type itself first, root last.
    pub ancestors: &'static [&'static str],

    pub key_type_name: &'static str,

    /// Record type collapses to latest-only within any dataset.
    pub non_temporal: bool,

    pub from_document: fn(&Document) -> Result<Box<dyn Record>>,
}

impl RecordSpec {
    pub fn root_type_name(&self) -> &'static str {
        self.ancestors.last().copied().unwrap_or(self.type_name)
    }

    /// The storage collection name: the root type's mapped name.
    pub fn collection_name(&self) -> &'static str {
        mapped_name(self.root_type_name())
    }

    pub fn is_subtype_of(&self, type_name: &str) -> bool {
        self.ancestors.contains(&type_name)
    }
}

/// Strip the conventional `Data` suffix carried over from serialized type
/// names, so `BaseSampleData` and `BaseSample` share a collection.
fn mapped_name(root_type_name: &'static str) -> &'static str {
    match root_type_name.strip_suffix("Data") {
        Some(stripped) if !stripped.is_empty() => stripped,
        _ => root_type_name,
    }
}

// ----------------------------------------------------------------------------

#[derive(Default)]
struct RegistryState {
    by_name: HashMap<&'static str, RecordSpec>,
    record_by_key: HashMap<&'static str, &'static str>,
}

static REGISTRY: Lazy<RwLock<RegistryState>> = Lazy::new(|| {
    let state = RwLock::new(RegistryState::default());
    {
        let mut state = state.write();
        register_into::<crate::DataSet>(&mut state);
        register_into::<crate::DataSetDetail>(&mut state);
        register_into::<crate::DataSourceInfo>(&mut state);
    }
    state
});

fn register_into<T: RecordMeta>(state: &mut RegistryState) {
    let spec = RecordSpec {
        type_name: T::TYPE_NAME,
        ancestors: T::ANCESTORS,
        key_type_name: <T::Key as crate::KeyMeta>::TYPE_NAME,
        non_temporal: T::NON_TEMPORAL,
        from_document: |doc| T::from_document(doc).map(|record| Box::new(record) as _),
    };
    state.by_name.insert(T::TYPE_NAME, spec);
    state.record_by_key.insert(spec.key_type_name, T::TYPE_NAME);
}

/// Register a record type. Idempotent; call once per type at startup.
pub fn register<T: RecordMeta>() {
    register_into::<T>(&mut REGISTRY.write());
}

/// The spec registered under a serialized type name.
pub fn spec_of(type_name: &str) -> Result<RecordSpec> {
    REGISTRY
        .read()
        .by_name
        .get(type_name)
        .copied()
        .ok_or_else(|| Error::UnknownType(type_name.to_owned()))
}

/// The record type bound to a key type.
pub fn record_spec_for_key(key_type_name: &str) -> Result<RecordSpec> {
    let state = REGISTRY.read();
    let record_name = state
        .record_by_key
        .get(key_type_name)
        .ok_or_else(|| Error::UnboundKey(key_type_name.to_owned()))?;
    state
        .by_name
        .get(record_name)
        .copied()
        .ok_or_else(|| Error::UnknownType((*record_name).to_owned()))
}

/// `true` when `type_name` is `of` or one of its descendants.
pub fn is_subtype(type_name: &str, of: &str) -> Result<bool> {
    Ok(spec_of(type_name)?.is_subtype_of(of))
}

/// Serialized names of `type_name` and every registered descendant.
pub fn descendants_of(type_name: &str) -> Vec<&'static str> {
    REGISTRY
        .read()
        .by_name
        .values()
        .filter(|spec| spec.is_subtype_of(type_name))
        .map(|spec| spec.type_name)
        .collect()
}

// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DataSet, DataSetDetail};

    #[test]
    fn built_ins_are_registered() {
        let spec = spec_of("DataSet").unwrap();
        assert_eq!(spec.collection_name(), "DataSet");
        assert_eq!(spec.key_type_name, "DataSetKey");

        let bound = record_spec_for_key("DataSetDetailKey").unwrap();
        assert_eq!(bound.type_name, DataSetDetail::TYPE_NAME);
    }

    #[test]
    fn unknown_names_are_rejected() {
        assert!(matches!(spec_of("NoSuchType"), Err(Error::UnknownType(_))));
        assert!(matches!(
            record_spec_for_key("NoSuchKey"),
            Err(Error::UnboundKey(_))
        ));
    }

    #[test]
    fn subtype_relation_includes_self() {
        assert!(is_subtype(DataSet::TYPE_NAME, DataSet::TYPE_NAME).unwrap());
        assert!(!is_subtype(DataSet::TYPE_NAME, DataSetDetail::TYPE_NAME).unwrap());
    }

    #[test]
    fn mapped_name_strips_data_suffix() {
        assert_eq!(super::mapped_name("BaseSampleData"), "BaseSample");
        assert_eq!(super::mapped_name("DataSet"), "DataSet");
        assert_eq!(super::mapped_name("Data"), "Data");
    }
}
