//! Dataset graph, cutoff, read-only and database-lifecycle tests.

mod common;

use std::sync::Arc;

use common::save_minimal_record;
use tempora_id::TemporalId;
use tempora_log::InMemoryLog;
use tempora_store::test_util::{BaseSample, BaseSampleKey, TestContext};
use tempora_store::{
    DataSource, DataSourceConfig, DbNameKey, Error, InstanceType, TemporalDataSource,
};
use tempora_types::{
    downcast_record, DataSet, DataSetDetail, DataSetFlags, DataSourceInfo, DataSourceInfoKey,
    Record,
};

/// A second source over the same backing database, with fresh caches.
fn reconnect(test: &TestContext, config: DataSourceConfig) -> TemporalDataSource {
    let mut tokens = test.source().db_name().split(';');
    let _ = tokens.next();
    let instance_name = tokens.next().expect("db name has an instance token");
    let env_name = tokens.next().expect("db name has an environment token");
    let db_name = DbNameKey::new(InstanceType::Test, instance_name, env_name);
    TemporalDataSource::connect(
        &test.client,
        "tempora_test",
        &db_name,
        config,
        Arc::new(InMemoryLog::new()),
    )
    .expect("test database name is valid")
}

// ----------------------------------------------------------------------------

#[test]
fn lookup_list_is_the_transitive_closure() -> anyhow::Result<()> {
    let test = TestContext::new("lookup_list_is_the_transitive_closure");
    let source = test.source();

    let a = source.create_data_set("A", TemporalId::ZERO, &[])?;
    let b = source.create_data_set("B", TemporalId::ZERO, &[a])?;
    let c = source.create_data_set("C", TemporalId::ZERO, &[b])?;
    let d = source.create_data_set("D", TemporalId::ZERO, &[a, c])?;

    // Transitive closure with duplicates removed, ascending id order.
    assert_eq!(source.lookup_list(d)?, vec![a, b, c, d]);
    assert_eq!(source.lookup_list(a)?, vec![a]);

    // The root dataset resolves to itself alone.
    assert_eq!(source.lookup_list(TemporalId::ZERO)?, vec![TemporalId::ZERO]);
    Ok(())
}

#[test]
fn self_import_is_rejected() -> anyhow::Result<()> {
    let test = TestContext::new("self_import_is_rejected");
    let source = test.source();

    // A self-import cannot be produced through the API (the dataset id does
    // not exist until the save assigns it), so store a corrupt dataset
    // record directly and check the traversal guard.
    let id = source.create_ordered_id()?;
    let mut corrupt = DataSet::new("Corrupt", &[id]);
    corrupt.id = id;
    let doc = tempora_types::serialize::serialize(&corrupt)?;
    test.client
        .database(source.db_name())
        .collection("DataSet")
        .insert_one(doc)?;

    assert!(matches!(
        source.lookup_list(id),
        Err(Error::OrderViolation(_))
    ));
    Ok(())
}

#[test]
fn cyclic_imports_terminate() -> anyhow::Result<()> {
    let test = TestContext::new("cyclic_imports_terminate");
    let source = test.source();

    // B imports A; a newer revision of A imports B, closing a name-level
    // cycle. The id-level graph stays acyclic, and resolution terminates.
    let a = source.create_data_set("A", TemporalId::ZERO, &[])?;
    let b = source.create_data_set("B", TemporalId::ZERO, &[a])?;
    let mut a2 = DataSet::new("A", &[b]);
    source.save_data_set(&mut a2, TemporalId::ZERO)?;

    let lookup = source.lookup_list(a2.id)?;
    assert!(lookup.contains(&a2.id));
    assert!(lookup.contains(&b));
    assert!(lookup.contains(&a));
    Ok(())
}

// ----------------------------------------------------------------------------

#[test]
fn read_only_source_refuses_writes_and_allocation() -> anyhow::Result<()> {
    let test = TestContext::with_config(
        "read_only_source_refuses_writes",
        DataSourceConfig {
            readonly: true,
            ..DataSourceConfig::DEFAULT
        },
    );
    let source = test.source();

    assert!(source.is_readonly());
    assert!(matches!(source.create_ordered_id(), Err(Error::ReadOnly(_))));

    let mut record = BaseSample::minimal("A", 0, 0);
    assert!(matches!(
        source.save_one(&mut record, TemporalId::ZERO),
        Err(Error::ReadOnly(_))
    ));
    assert!(matches!(
        source.delete(&BaseSampleKey::new("A", 0), TemporalId::ZERO),
        Err(Error::ReadOnly(_))
    ));
    assert!(matches!(source.delete_db(), Err(Error::ReadOnly(_))));
    Ok(())
}

#[test]
fn source_cutoff_refuses_writes() -> anyhow::Result<()> {
    let test = TestContext::with_config(
        "source_cutoff_refuses_writes",
        DataSourceConfig {
            cutoff_time: Some(TemporalId::new()),
            ..DataSourceConfig::DEFAULT
        },
    );

    let mut record = BaseSample::minimal("A", 0, 0);
    assert!(matches!(
        test.source().save_one(&mut record, TemporalId::ZERO),
        Err(Error::ReadOnly(_))
    ));
    Ok(())
}

#[test]
fn data_set_detail_read_only_refuses_writes() -> anyhow::Result<()> {
    let test = TestContext::new("data_set_detail_read_only_refuses_writes");
    let source = test.source();

    let frozen = source.create_data_set("Frozen", TemporalId::ZERO, &[])?;
    let mut detail = DataSetDetail::new(frozen);
    detail.read_only = Some(true);
    source.save_one(&mut detail, TemporalId::ZERO)?;

    let mut record = BaseSample::minimal("A", 0, 0);
    assert!(matches!(
        source.save_one(&mut record, frozen),
        Err(Error::ReadOnly(_))
    ));
    Ok(())
}

#[test]
fn data_set_detail_cutoff_refuses_writes_and_hides_records() -> anyhow::Result<()> {
    let test = TestContext::new("data_set_detail_cutoff");
    let source = test.source();

    let data_set = source.create_data_set("History", TemporalId::ZERO, &[])?;
    let mut first = BaseSample::minimal("K", 0, 0);
    source.save_one(&mut first, data_set)?;

    let cutoff = TemporalId::new();
    let mut second = BaseSample::minimal("K", 0, 1);
    source.save_one(&mut second, data_set)?;

    let mut detail = DataSetDetail::new(data_set);
    detail.cutoff_time = Some(cutoff);
    source.save_one(&mut detail, TemporalId::ZERO)?;

    // Fresh caches so the detail is picked up.
    let fresh = reconnect(&test, DataSourceConfig::DEFAULT);
    let key = BaseSampleKey::new("K", 0);
    let record = fresh
        .load_or_null_by_key(&key, data_set)?
        .expect("the pre-cutoff revision is visible");
    let record = downcast_record::<BaseSample>(record)?;
    assert_eq!(record.version, Some(0), "the newer revision is beyond the cutoff");

    // Point loads beyond the cutoff return null.
    assert!(fresh.load_or_null::<BaseSample>(second.id)?.is_none());
    assert!(fresh.load_or_null::<BaseSample>(first.id)?.is_some());

    // A dataset with a cutoff is a historical view: writes are refused.
    let mut third = BaseSample::minimal("K", 0, 2);
    assert!(matches!(
        fresh.save_one(&mut third, data_set),
        Err(Error::ReadOnly(_))
    ));
    Ok(())
}

#[test]
fn source_cutoff_composes_with_detail_cutoff() -> anyhow::Result<()> {
    let test = TestContext::new("source_cutoff_composes_with_detail_cutoff");
    let source = test.source();

    let data_set = source.create_data_set("History", TemporalId::ZERO, &[])?;
    let mut v0 = BaseSample::minimal("K", 0, 0);
    source.save_one(&mut v0, data_set)?;
    let source_cutoff = TemporalId::new();
    let mut v1 = BaseSample::minimal("K", 0, 1);
    source.save_one(&mut v1, data_set)?;
    let detail_cutoff = TemporalId::new();
    let mut v2 = BaseSample::minimal("K", 0, 2);
    source.save_one(&mut v2, data_set)?;

    let mut detail = DataSetDetail::new(data_set);
    detail.cutoff_time = Some(detail_cutoff);
    source.save_one(&mut detail, TemporalId::ZERO)?;

    // The effective cutoff is the smaller of the two.
    let fresh = reconnect(
        &test,
        DataSourceConfig {
            cutoff_time: Some(source_cutoff),
            ..DataSourceConfig::DEFAULT
        },
    );
    let record = fresh
        .load_or_null_by_key(&BaseSampleKey::new("K", 0), data_set)?
        .expect("the revision below both cutoffs is visible");
    assert_eq!(downcast_record::<BaseSample>(record)?.version, Some(0));

    // With only the detail cutoff, one more revision is visible.
    let fresh = reconnect(&test, DataSourceConfig::DEFAULT);
    let record = fresh
        .load_or_null_by_key(&BaseSampleKey::new("K", 0), data_set)?
        .expect("the revision below the detail cutoff is visible");
    assert_eq!(downcast_record::<BaseSample>(record)?.version, Some(1));
    Ok(())
}

#[test]
fn import_beyond_imports_cutoff_is_invisible() -> anyhow::Result<()> {
    let test = TestContext::new("import_beyond_imports_cutoff_is_invisible");
    let source = test.source();

    let early = source.create_data_set("Early", TemporalId::ZERO, &[])?;
    save_minimal_record(&test.context, "Early", "K", 0, 0)?;
    let imports_cutoff = TemporalId::new();
    let late = source.create_data_set("Late", TemporalId::ZERO, &[])?;
    save_minimal_record(&test.context, "Late", "L", 1, 0)?;
    let reader = source.create_data_set("Reader", TemporalId::ZERO, &[early, late])?;

    // Without the cutoff, both imports resolve.
    assert_eq!(source.lookup_list(reader)?, vec![early, late, reader]);

    // The imports cutoff elides only datasets reached through the imports
    // list; the reader's own records are unaffected.
    let mut detail = DataSetDetail::new(reader);
    detail.imports_cutoff_time = Some(imports_cutoff);
    source.save_one(&mut detail, TemporalId::ZERO)?;

    let fresh = reconnect(&test, DataSourceConfig::DEFAULT);
    assert_eq!(fresh.lookup_list(reader)?, vec![early, reader]);
    assert!(fresh
        .load_or_null_by_key(&BaseSampleKey::new("K", 0), reader)?
        .is_some());
    assert!(fresh
        .load_or_null_by_key(&BaseSampleKey::new("L", 1), reader)?
        .is_none());
    Ok(())
}

#[test]
fn reader_created_after_source_cutoff_is_not_found() -> anyhow::Result<()> {
    let test = TestContext::new("reader_created_after_source_cutoff");
    let source = test.source();

    let early = source.create_data_set("Early", TemporalId::ZERO, &[])?;
    let cutoff = TemporalId::new();
    let reader = source.create_data_set("Reader", TemporalId::ZERO, &[early])?;

    // The reader dataset itself postdates the cutoff, so a historical view
    // cannot even resolve it.
    let fresh = reconnect(
        &test,
        DataSourceConfig {
            cutoff_time: Some(cutoff),
            ..DataSourceConfig::DEFAULT
        },
    );
    assert!(matches!(fresh.lookup_list(reader), Err(Error::NotFound(_))));
    assert!(fresh.lookup_list(early).is_ok());
    Ok(())
}

// ----------------------------------------------------------------------------

#[test]
fn non_temporal_data_set_keeps_latest_only() -> anyhow::Result<()> {
    let test = TestContext::new("non_temporal_data_set_keeps_latest_only");
    let source = test.source();

    let data_set = source.create_data_set_with_flags(
        "Latest",
        TemporalId::ZERO,
        &[],
        DataSetFlags::NON_TEMPORAL,
    )?;

    let mut v0 = BaseSample::minimal("K", 0, 0);
    source.save_one(&mut v0, data_set)?;
    let mut v1 = BaseSample::minimal("K", 0, 1);
    source.save_one(&mut v1, data_set)?;

    // The prior revision is gone from storage, not merely shadowed.
    assert!(source.load_or_null::<BaseSample>(v0.id)?.is_none());
    let record = source
        .load_or_null_by_key(&BaseSampleKey::new("K", 0), data_set)?
        .expect("latest revision is present");
    assert_eq!(downcast_record::<BaseSample>(record)?.version, Some(1));

    // In a temporal dataset both revisions stay addressable.
    let temporal = source.create_data_set("Temporal", TemporalId::ZERO, &[])?;
    let mut t0 = BaseSample::minimal("K", 0, 0);
    source.save_one(&mut t0, temporal)?;
    let mut t1 = BaseSample::minimal("K", 0, 1);
    source.save_one(&mut t1, temporal)?;
    assert!(source.load_or_null::<BaseSample>(t0.id)?.is_some());
    Ok(())
}

// ----------------------------------------------------------------------------

#[test]
fn data_set_helpers_resolve_names() -> anyhow::Result<()> {
    let test = TestContext::new("data_set_helpers_resolve_names");
    let source = test.source();

    // Common was created by the test context.
    assert_eq!(source.common()?, test.data_set());

    assert!(source.data_set_of("Missing", TemporalId::ZERO)?.is_none());
    assert!(matches!(
        source.data_set("Missing", TemporalId::ZERO),
        Err(Error::NotFound(_))
    ));

    let created = source.create_data_set("Named", test.data_set(), &[])?;
    assert_eq!(source.data_set("Named", test.data_set())?, created);
    Ok(())
}

#[test]
fn empty_data_set_name_is_rejected() {
    let test = TestContext::new("empty_data_set_name_is_rejected");
    let mut nameless = DataSet::new("", &[]);
    assert!(matches!(
        test.source().save_data_set(&mut nameless, TemporalId::ZERO),
        Err(Error::Validation(_))
    ));
}

/// Data source descriptors are ordinary records stored in the root dataset.
#[test]
fn data_source_descriptor_lives_in_the_root_dataset() -> anyhow::Result<()> {
    let test = TestContext::new("data_source_descriptor");
    let source = test.source();

    let db_name = DbNameKey::new(InstanceType::Test, "TemporalStoreTest", "descriptor");
    let mut info = DataSourceInfo::new("primary", &db_name)?;
    source.save_one(&mut info, TemporalId::ZERO)?;

    let key = DataSourceInfoKey {
        data_source_name: "primary".to_owned(),
    };
    let loaded = source
        .load_or_null_by_key(&key, TemporalId::ZERO)?
        .expect("descriptor exists");
    assert!(loaded.data_set().is_zero());
    assert_eq!(loaded.key()?, "primary");
    Ok(())
}

// ----------------------------------------------------------------------------

#[test]
fn delete_db_guards() -> anyhow::Result<()> {
    // TEST instances may be dropped.
    let test = TestContext::new("delete_db_guards");
    save_minimal_record(&test.context, "Common", "A", 0, 0)?;
    test.source().delete_db()?;
    assert!(test.client.database_names().is_empty());

    // PROD and UAT instances may not, even when writable.
    for instance_type in [InstanceType::Prod, InstanceType::Uat] {
        let client = tempora_store::StorageClient::new();
        let db_name = DbNameKey::new(instance_type, "endpoint", "env");
        let source = TemporalDataSource::connect(
            &client,
            "guarded",
            &db_name,
            DataSourceConfig::DEFAULT,
            Arc::new(InMemoryLog::new()),
        )?;
        assert!(matches!(source.delete_db(), Err(Error::Validation(_))));
    }
    Ok(())
}

#[test]
fn db_name_validation() {
    let client = tempora_store::StorageClient::new();
    let log: Arc<InMemoryLog> = Arc::new(InMemoryLog::new());

    // Prohibited character.
    let bad = DbNameKey::new(InstanceType::Test, "has space", "env");
    assert!(matches!(
        TemporalDataSource::connect(&client, "s", &bad, DataSourceConfig::DEFAULT, log.clone()),
        Err(Error::Validation(_))
    ));

    // Over-long name.
    let long = DbNameKey::new(InstanceType::Test, "x".repeat(70), "env");
    assert!(matches!(
        TemporalDataSource::connect(&client, "s", &long, DataSourceConfig::DEFAULT, log.clone()),
        Err(Error::Validation(_))
    ));

    // Unspecified instance type.
    let empty = DbNameKey::new(InstanceType::Empty, "name", "env");
    assert!(matches!(
        TemporalDataSource::connect(&client, "s", &empty, DataSourceConfig::DEFAULT, log),
        Err(Error::Validation(_))
    ));
}
