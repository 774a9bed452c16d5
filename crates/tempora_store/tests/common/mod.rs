//! Shared helpers for the scenario tests.
#![allow(dead_code)] // not every test binary uses every helper

use tempora_id::TemporalId;
use tempora_store::test_util::{BaseSample, BaseSampleKey, DerivedSample, ElementSample, SampleEnum};
use tempora_store::{Context, DataSource};
use tempora_types::{Data, LocalDate, LocalDateTime, LocalMinute, LocalTime, Record};

/// Save a fully populated [`BaseSample`] into the named dataset.
pub fn save_base_record(
    context: &Context,
    data_set_name: &str,
    record_id: &str,
    record_index: i64,
) -> anyhow::Result<TemporalId> {
    let mut record = BaseSample {
        record_id: record_id.to_owned(),
        record_index,
        double_element: Some(100.0),
        local_date_element: Some(LocalDate::new(2003, 5, 1)?),
        local_time_element: Some(LocalTime::new(10, 15, 30, 0)?),
        local_minute_element: Some(LocalMinute::new(10, 15)?),
        local_date_time_element: Some(LocalDateTime::from_components(2003, 5, 1, 10, 15, 0, 0)?),
        enum_value: Some(SampleEnum::EnumValue2),
        ..Default::default()
    };

    let data_set = context
        .data_source
        .data_set(data_set_name, context.data_set)?;
    context.data_source.save_one(&mut record, data_set)?;
    Ok(record.id)
}

/// Save a fully populated [`DerivedSample`] into the named dataset.
pub fn save_derived_record(
    context: &Context,
    data_set_name: &str,
    record_id: &str,
    record_index: i64,
) -> anyhow::Result<TemporalId> {
    let mut record = DerivedSample {
        base: BaseSample {
            record_id: record_id.to_owned(),
            record_index,
            double_element: Some(200.0),
            local_date_element: Some(LocalDate::new(2003, 5, 1)?),
            local_time_element: Some(LocalTime::new(10, 15, 30, 0)?),
            local_minute_element: Some(LocalMinute::new(10, 15)?),
            local_date_time_element: Some(LocalDateTime::from_components(
                2003, 5, 1, 10, 15, 0, 0,
            )?),
            ..Default::default()
        },
        string_element2: Some(String::new()),
        list_of_string: vec!["A".to_owned(), "B".to_owned(), "C".to_owned()],
        list_of_double: vec![1.0, 2.0, 3.0],
        data_element: Some(ElementSample {
            double_element3: Some(1.0),
            string_element3: Some("AA".to_owned()),
        }),
        data_element_list: vec![
            ElementSample {
                double_element3: Some(1.0),
                string_element3: Some("A0".to_owned()),
            },
            ElementSample {
                double_element3: Some(2.0),
                string_element3: Some("A1".to_owned()),
            },
        ],
        key_element: Some(BaseSampleKey::new("BB", 2)),
        key_element_list: vec![BaseSampleKey::new("B0", 3), BaseSampleKey::new("B1", 4)],
        ..Default::default()
    };

    let data_set = context
        .data_source
        .data_set(data_set_name, context.data_set)?;
    context.data_source.save_one(&mut record, data_set)?;
    Ok(record.id())
}

/// Save a [`BaseSample`] carrying only its key fields and a version.
pub fn save_minimal_record(
    context: &Context,
    data_set_name: &str,
    record_id: &str,
    record_index: i64,
    version: i64,
) -> anyhow::Result<TemporalId> {
    let mut record = BaseSample::minimal(record_id, record_index, version);
    let data_set = context
        .data_source
        .data_set(data_set_name, context.data_set)?;
    context.data_source.save_one(&mut record, data_set)?;
    Ok(record.id)
}

/// Describe the outcome of a keyed lookup the way the scenario tables do.
pub fn verify_load(context: &Context, data_set_name: &str, key: &BaseSampleKey) -> String {
    let data_set = context
        .data_source
        .data_set(data_set_name, context.data_set)
        .expect("dataset exists");
    match context
        .data_source
        .load_or_null_by_key(key, data_set)
        .expect("lookup succeeds")
    {
        None => "Not found".to_owned(),
        Some(record) => format!("Found. Type = {}", record.type_name()),
    }
}
