//! Test support: a throwaway storage endpoint per test plus the sample
//! record family the scenario tests exercise.
//!
//! Everything here is `#[doc(hidden)]` public so integration tests and
//! benches can share it.

use std::sync::Arc;

use tempora_id::TemporalId;
use tempora_log::InMemoryLog;
use tempora_types::{
    registry, Data, Document, Error as TypesError, Key, KeyMeta, KeyWriter, LocalDate,
    LocalDateTime, LocalMinute, LocalTime, Record, RecordMeta, Result as TypesResult, TokenReader,
    Value,
};

use crate::{
    Context, DataSource, DataSourceConfig, DbNameKey, InstanceType, StorageClient,
    TemporalDataSource,
};

// ----------------------------------------------------------------------------

/// A fresh storage endpoint, TEST-instance database, in-memory log and
/// `Common` dataset, namespaced by the test name.
pub struct TestContext {
    pub client: Arc<StorageClient>,
    pub log: Arc<InMemoryLog>,
    pub context: Context,
}

impl TestContext {
    pub fn new(test_name: &str) -> Self {
        Self::with_config(test_name, DataSourceConfig::DEFAULT)
    }

    pub fn with_config(test_name: &str, config: DataSourceConfig) -> Self {
        register_sample_types();

        let client = StorageClient::new();
        let log = Arc::new(InMemoryLog::new());
        let db_name = DbNameKey::new(InstanceType::Test, "TemporaTest", test_name);
        let source = Arc::new(
            TemporalDataSource::connect(&client, "tempora_test", &db_name, config, log.clone())
                .expect("test database name is valid"),
        );

        // A read-only or frozen source cannot create datasets; leave the
        // default dataset at the root in that case.
        let data_set = if config.readonly || config.cutoff_time.is_some() {
            TemporalId::ZERO
        } else {
            source.create_common().expect("create the Common dataset")
        };

        Self {
            client,
            log,
            context: Context::new(source, data_set),
        }
    }

    pub fn source(&self) -> &Arc<TemporalDataSource> {
        &self.context.data_source
    }

    pub fn data_set(&self) -> TemporalId {
        self.context.data_set
    }
}

/// Register the sample record family. Idempotent.
pub fn register_sample_types() {
    registry::register::<BaseSample>();
    registry::register::<DerivedSample>();
    registry::register::<NullableElementsSample>();
    registry::register::<CompositeKeySample>();
}

// ----------------------------------------------------------------------------

/// Enum with a member-name token form, as sample records use in keys.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SampleEnum {
    #[default]
    Empty,
    EnumValue1,
    EnumValue2,
}

impl SampleEnum {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Empty => "Empty",
            Self::EnumValue1 => "EnumValue1",
            Self::EnumValue2 => "EnumValue2",
        }
    }
}

impl std::str::FromStr for SampleEnum {
    type Err = TypesError;

    fn from_str(s: &str) -> TypesResult<Self> {
        match s {
            "Empty" => Ok(Self::Empty),
            "EnumValue1" => Ok(Self::EnumValue1),
            "EnumValue2" => Ok(Self::EnumValue2),
            _ => Err(TypesError::Validation(format!(
                "{s:?} is not a member of SampleEnum"
            ))),
        }
    }
}

impl From<SampleEnum> for Value {
    fn from(value: SampleEnum) -> Self {
        Value::String(value.name().to_owned())
    }
}

// ----------------------------------------------------------------------------

/// A nested data element with no identity of its own.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ElementSample {
    pub double_element3: Option<f64>,
    pub string_element3: Option<String>,
}

impl ElementSample {
    pub fn from_document(doc: &Document) -> TypesResult<Self> {
        Ok(Self {
            double_element3: doc.read_opt_double("ElementSample", "DoubleElement3")?,
            string_element3: doc.read_opt_str("ElementSample", "StringElement3")?,
        })
    }
}

impl Data for ElementSample {
    fn type_name(&self) -> &'static str {
        "ElementSample"
    }

    fn write_fields(&self, doc: &mut Document) -> TypesResult<()> {
        if let Some(double_element3) = self.double_element3 {
            doc.set("DoubleElement3", double_element3);
        }
        if let Some(string_element3) = &self.string_element3 {
            doc.set("StringElement3", string_element3.as_str());
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------

/// Key of [`BaseSample`] and its descendants: `record_id;record_index`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BaseSampleKey {
    pub record_id: String,
    pub record_index: i64,
}

impl BaseSampleKey {
    pub fn new(record_id: &str, record_index: i64) -> Self {
        Self {
            record_id: record_id.to_owned(),
            record_index,
        }
    }
}

impl Key for BaseSampleKey {
    fn write_tokens(&self, writer: &mut KeyWriter) -> TypesResult<()> {
        writer.string(&self.record_id)?;
        writer.int(self.record_index);
        Ok(())
    }

    fn read_tokens(&mut self, reader: &mut TokenReader<'_>) -> TypesResult<()> {
        self.record_id = reader.string()?;
        self.record_index = reader.int()?;
        Ok(())
    }
}

impl KeyMeta for BaseSampleKey {
    const TYPE_NAME: &'static str = "BaseSampleKey";
}

/// The base sample record: scalar fields of every supported element type.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BaseSample {
    pub id: TemporalId,
    pub data_set: TemporalId,
    pub record_id: String,
    pub record_index: i64,
    pub double_element: Option<f64>,
    pub local_date_element: Option<LocalDate>,
    pub local_time_element: Option<LocalTime>,
    pub local_minute_element: Option<LocalMinute>,
    pub local_date_time_element: Option<LocalDateTime>,
    pub enum_value: Option<SampleEnum>,
    pub version: Option<i64>,
}

impl BaseSample {
    pub fn minimal(record_id: &str, record_index: i64, version: i64) -> Self {
        Self {
            record_id: record_id.to_owned(),
            record_index,
            version: Some(version),
            ..Default::default()
        }
    }

    fn write_base_fields(&self, doc: &mut Document) -> TypesResult<()> {
        doc.set("RecordId", self.record_id.as_str());
        doc.set("RecordIndex", self.record_index);
        if let Some(double_element) = self.double_element {
            doc.set("DoubleElement", double_element);
        }
        if let Some(local_date_element) = self.local_date_element {
            doc.set("LocalDateElement", local_date_element);
        }
        if let Some(local_time_element) = self.local_time_element {
            doc.set("LocalTimeElement", local_time_element);
        }
        if let Some(local_minute_element) = self.local_minute_element {
            doc.set("LocalMinuteElement", local_minute_element);
        }
        if let Some(local_date_time_element) = self.local_date_time_element {
            doc.set("LocalDateTimeElement", local_date_time_element);
        }
        if let Some(enum_value) = self.enum_value {
            doc.set("EnumValue", enum_value);
        }
        if let Some(version) = self.version {
            doc.set("Version", version);
        }
        Ok(())
    }

    fn read_base_fields(doc: &Document) -> TypesResult<Self> {
        const T: &str = "BaseSample";
        Ok(Self {
            id: TemporalId::ZERO,
            data_set: TemporalId::ZERO,
            record_id: doc.read_str(T, "RecordId")?,
            record_index: doc.read_int(T, "RecordIndex")?,
            double_element: doc.read_opt_double(T, "DoubleElement")?,
            local_date_element: doc
                .read_opt_int(T, "LocalDateElement")?
                .map(LocalDate::from_iso_int)
                .transpose()?,
            local_time_element: doc
                .read_opt_int(T, "LocalTimeElement")?
                .map(LocalTime::from_iso_int)
                .transpose()?,
            local_minute_element: doc
                .read_opt_int(T, "LocalMinuteElement")?
                .map(LocalMinute::from_iso_int)
                .transpose()?,
            local_date_time_element: doc
                .read_opt_int(T, "LocalDateTimeElement")?
                .map(LocalDateTime::from_iso_int)
                .transpose()?,
            enum_value: doc
                .read_opt_str(T, "EnumValue")?
                .map(|name| name.parse())
                .transpose()?,
            version: doc.read_opt_int(T, "Version")?,
        })
    }

    pub fn to_key(&self) -> BaseSampleKey {
        BaseSampleKey::new(&self.record_id, self.record_index)
    }
}

impl Data for BaseSample {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn write_fields(&self, doc: &mut Document) -> TypesResult<()> {
        self.write_base_fields(doc)
    }
}

impl Record for BaseSample {
    tempora_types::impl_record_accessors!();

    fn key(&self) -> TypesResult<String> {
        self.to_key().value()
    }
}

impl RecordMeta for BaseSample {
    const TYPE_NAME: &'static str = "BaseSample";
    const ANCESTORS: &'static [&'static str] = &["BaseSample"];
    type Key = BaseSampleKey;

    fn from_document(doc: &Document) -> TypesResult<Self> {
        Self::read_base_fields(doc)
    }
}

// ----------------------------------------------------------------------------

/// A descendant of [`BaseSample`] adding lists, nested data elements and
/// embedded keys; shares the base's key and collection.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DerivedSample {
    pub base: BaseSample,
    pub double_element2: Option<f64>,
    pub string_element2: Option<String>,
    pub list_of_string: Vec<String>,
    pub list_of_double: Vec<f64>,
    pub data_element: Option<ElementSample>,
    pub data_element_list: Vec<ElementSample>,
    pub key_element: Option<BaseSampleKey>,
    pub key_element_list: Vec<BaseSampleKey>,
}

impl Data for DerivedSample {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn write_fields(&self, doc: &mut Document) -> TypesResult<()> {
        self.base.write_base_fields(doc)?;
        if let Some(double_element2) = self.double_element2 {
            doc.set("DoubleElement2", double_element2);
        }
        if let Some(string_element2) = &self.string_element2 {
            doc.set("StringElement2", string_element2.as_str());
        }
        if !self.list_of_string.is_empty() {
            let values: Vec<Value> = self
                .list_of_string
                .iter()
                .map(|s| Value::from(s.as_str()))
                .collect();
            doc.set("ListOfString", values);
        }
        if !self.list_of_double.is_empty() {
            let values: Vec<Value> = self.list_of_double.iter().map(|d| Value::from(*d)).collect();
            doc.set("ListOfDouble", values);
        }
        if let Some(data_element) = &self.data_element {
            doc.set("DataElement", data_element.to_document()?);
        }
        if !self.data_element_list.is_empty() {
            let values: Vec<Value> = self
                .data_element_list
                .iter()
                .map(|element| element.to_document().map(Value::from))
                .collect::<TypesResult<_>>()?;
            doc.set("DataElementList", values);
        }
        if let Some(key_element) = &self.key_element {
            doc.set("KeyElement", key_element.value()?);
        }
        if !self.key_element_list.is_empty() {
            let values: Vec<Value> = self
                .key_element_list
                .iter()
                .map(|key| key.value().map(Value::from))
                .collect::<TypesResult<_>>()?;
            doc.set("KeyElementList", values);
        }
        Ok(())
    }
}

impl Record for DerivedSample {
    fn id(&self) -> TemporalId {
        self.base.id
    }

    fn set_id(&mut self, id: TemporalId) {
        self.base.id = id;
    }

    fn data_set(&self) -> TemporalId {
        self.base.data_set
    }

    fn set_data_set(&mut self, data_set: TemporalId) {
        self.base.data_set = data_set;
    }

    fn key(&self) -> TypesResult<String> {
        self.base.to_key().value()
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn std::any::Any> {
        self
    }
}

impl RecordMeta for DerivedSample {
    const TYPE_NAME: &'static str = "DerivedSample";
    const ANCESTORS: &'static [&'static str] = &["DerivedSample", "BaseSample"];
    type Key = BaseSampleKey;

    fn from_document(doc: &Document) -> TypesResult<Self> {
        const T: &str = "DerivedSample";
        let mut list_of_string = Vec::new();
        if let Some(value) = doc.get("ListOfString") {
            for element in value.as_array().unwrap_or(&[]) {
                if let Some(s) = element.as_str() {
                    list_of_string.push(s.to_owned());
                }
            }
        }
        let mut list_of_double = Vec::new();
        if let Some(value) = doc.get("ListOfDouble") {
            for element in value.as_array().unwrap_or(&[]) {
                if let Some(d) = element.as_double() {
                    list_of_double.push(d);
                }
            }
        }
        let mut data_element_list = Vec::new();
        if let Some(value) = doc.get("DataElementList") {
            for element in value.as_array().unwrap_or(&[]) {
                if let Some(nested) = element.as_doc() {
                    data_element_list.push(ElementSample::from_document(nested)?);
                }
            }
        }
        let mut key_element_list = Vec::new();
        if let Some(value) = doc.get("KeyElementList") {
            for element in value.as_array().unwrap_or(&[]) {
                if let Some(s) = element.as_str() {
                    let mut key = BaseSampleKey::default();
                    key.populate_from_string(s)?;
                    key_element_list.push(key);
                }
            }
        }

        Ok(Self {
            base: BaseSample::read_base_fields(doc)?,
            double_element2: doc.read_opt_double(T, "DoubleElement2")?,
            string_element2: doc.read_opt_str(T, "StringElement2")?,
            list_of_string,
            list_of_double,
            data_element: doc
                .get("DataElement")
                .and_then(Value::as_doc)
                .map(ElementSample::from_document)
                .transpose()?,
            data_element_list,
            key_element: doc
                .read_opt_str(T, "KeyElement")?
                .map(|s| {
                    let mut key = BaseSampleKey::default();
                    key.populate_from_string(&s).map(|_| key)
                })
                .transpose()?,
            key_element_list,
        })
    }
}

// ----------------------------------------------------------------------------

/// Key of [`NullableElementsSample`]: one token per supported element type.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NullableElementsSampleKey {
    pub string_token: String,
    pub bool_token: bool,
    pub int_token: i64,
    pub local_date_token: Option<LocalDate>,
    pub local_time_token: Option<LocalTime>,
    pub local_minute_token: Option<LocalMinute>,
    pub local_date_time_token: Option<LocalDateTime>,
    pub enum_token: SampleEnum,
}

impl Key for NullableElementsSampleKey {
    fn write_tokens(&self, writer: &mut KeyWriter) -> TypesResult<()> {
        writer.string(&self.string_token)?;
        writer.bool(self.bool_token);
        writer.int(self.int_token);
        writer.date(require(self.local_date_token, "local_date_token")?);
        writer.time(require(self.local_time_token, "local_time_token")?);
        writer.minute(require(self.local_minute_token, "local_minute_token")?);
        writer.date_time(require(self.local_date_time_token, "local_date_time_token")?);
        writer.enum_name(self.enum_token.name())
    }

    fn read_tokens(&mut self, reader: &mut TokenReader<'_>) -> TypesResult<()> {
        self.string_token = reader.string()?;
        self.bool_token = reader.bool()?;
        self.int_token = reader.int()?;
        self.local_date_token = Some(reader.date()?);
        self.local_time_token = Some(reader.time()?);
        self.local_minute_token = Some(reader.minute()?);
        self.local_date_time_token = Some(reader.date_time()?);
        self.enum_token = reader.string()?.parse()?;
        Ok(())
    }
}

impl KeyMeta for NullableElementsSampleKey {
    const TYPE_NAME: &'static str = "NullableElementsSampleKey";
}

/// Null elements are not permitted in a key.
fn require<T>(element: Option<T>, name: &str) -> TypesResult<T> {
    element.ok_or_else(|| {
        TypesError::KeyFormat(format!(
            "key element {name} is null; null elements are not permitted in a key"
        ))
    })
}

/// A record whose key spans every supported element type, with the elements
/// themselves nullable until the key is computed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NullableElementsSample {
    pub id: TemporalId,
    pub data_set: TemporalId,
    pub string_token: Option<String>,
    pub bool_token: Option<bool>,
    pub int_token: Option<i64>,
    pub local_date_token: Option<LocalDate>,
    pub local_time_token: Option<LocalTime>,
    pub local_minute_token: Option<LocalMinute>,
    pub local_date_time_token: Option<LocalDateTime>,
    pub enum_token: Option<SampleEnum>,
    pub record_index: Option<i64>,
}

impl NullableElementsSample {
    pub fn to_key(&self) -> TypesResult<NullableElementsSampleKey> {
        Ok(NullableElementsSampleKey {
            string_token: require(self.string_token.clone(), "string_token")?,
            bool_token: require(self.bool_token, "bool_token")?,
            int_token: require(self.int_token, "int_token")?,
            local_date_token: self.local_date_token,
            local_time_token: self.local_time_token,
            local_minute_token: self.local_minute_token,
            local_date_time_token: self.local_date_time_token,
            enum_token: require(self.enum_token, "enum_token")?,
        })
    }
}

impl Data for NullableElementsSample {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn write_fields(&self, doc: &mut Document) -> TypesResult<()> {
        if let Some(string_token) = &self.string_token {
            doc.set("StringToken", string_token.as_str());
        }
        if let Some(bool_token) = self.bool_token {
            doc.set("BoolToken", bool_token);
        }
        if let Some(int_token) = self.int_token {
            doc.set("IntToken", int_token);
        }
        if let Some(local_date_token) = self.local_date_token {
            doc.set("LocalDateToken", local_date_token);
        }
        if let Some(local_time_token) = self.local_time_token {
            doc.set("LocalTimeToken", local_time_token);
        }
        if let Some(local_minute_token) = self.local_minute_token {
            doc.set("LocalMinuteToken", local_minute_token);
        }
        if let Some(local_date_time_token) = self.local_date_time_token {
            doc.set("LocalDateTimeToken", local_date_time_token);
        }
        if let Some(enum_token) = self.enum_token {
            doc.set("EnumToken", enum_token);
        }
        if let Some(record_index) = self.record_index {
            doc.set("RecordIndex", record_index);
        }
        Ok(())
    }
}

impl Record for NullableElementsSample {
    tempora_types::impl_record_accessors!();

    fn key(&self) -> TypesResult<String> {
        self.to_key()?.value()
    }
}

impl RecordMeta for NullableElementsSample {
    const TYPE_NAME: &'static str = "NullableElementsSample";
    const ANCESTORS: &'static [&'static str] = &["NullableElementsSample"];
    type Key = NullableElementsSampleKey;

    fn from_document(doc: &Document) -> TypesResult<Self> {
        const T: &str = "NullableElementsSample";
        Ok(Self {
            id: TemporalId::ZERO,
            data_set: TemporalId::ZERO,
            string_token: doc.read_opt_str(T, "StringToken")?,
            bool_token: doc.read_opt_bool(T, "BoolToken")?,
            int_token: doc.read_opt_int(T, "IntToken")?,
            local_date_token: doc
                .read_opt_int(T, "LocalDateToken")?
                .map(LocalDate::from_iso_int)
                .transpose()?,
            local_time_token: doc
                .read_opt_int(T, "LocalTimeToken")?
                .map(LocalTime::from_iso_int)
                .transpose()?,
            local_minute_token: doc
                .read_opt_int(T, "LocalMinuteToken")?
                .map(LocalMinute::from_iso_int)
                .transpose()?,
            local_date_time_token: doc
                .read_opt_int(T, "LocalDateTimeToken")?
                .map(LocalDateTime::from_iso_int)
                .transpose()?,
            enum_token: doc
                .read_opt_str(T, "EnumToken")?
                .map(|name| name.parse())
                .transpose()?,
            record_index: doc.read_opt_int(T, "RecordIndex")?,
        })
    }
}

// ----------------------------------------------------------------------------

/// Key with an embedded key element, token-expanded in place.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CompositeKeySampleKey {
    pub key_element1: String,
    pub key_element2: BaseSampleKey,
    pub key_element3: String,
}

impl Key for CompositeKeySampleKey {
    fn write_tokens(&self, writer: &mut KeyWriter) -> TypesResult<()> {
        writer.string(&self.key_element1)?;
        writer.key(&self.key_element2)?;
        writer.string(&self.key_element3)
    }

    fn read_tokens(&mut self, reader: &mut TokenReader<'_>) -> TypesResult<()> {
        self.key_element1 = reader.string()?;
        self.key_element2 = reader.key()?;
        self.key_element3 = reader.string()?;
        Ok(())
    }
}

impl KeyMeta for CompositeKeySampleKey {
    const TYPE_NAME: &'static str = "CompositeKeySampleKey";
}

/// Record carrying a composite key.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CompositeKeySample {
    pub id: TemporalId,
    pub data_set: TemporalId,
    pub key_element1: String,
    pub key_element2: BaseSampleKey,
    pub key_element3: String,
}

impl CompositeKeySample {
    pub fn to_key(&self) -> CompositeKeySampleKey {
        CompositeKeySampleKey {
            key_element1: self.key_element1.clone(),
            key_element2: self.key_element2.clone(),
            key_element3: self.key_element3.clone(),
        }
    }
}

impl Data for CompositeKeySample {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn write_fields(&self, doc: &mut Document) -> TypesResult<()> {
        doc.set("KeyElement1", self.key_element1.as_str());
        doc.set("KeyElement2", self.key_element2.value()?);
        doc.set("KeyElement3", self.key_element3.as_str());
        Ok(())
    }
}

impl Record for CompositeKeySample {
    tempora_types::impl_record_accessors!();

    fn key(&self) -> TypesResult<String> {
        self.to_key().value()
    }
}

impl RecordMeta for CompositeKeySample {
    const TYPE_NAME: &'static str = "CompositeKeySample";
    const ANCESTORS: &'static [&'static str] = &["CompositeKeySample"];
    type Key = CompositeKeySampleKey;

    fn from_document(doc: &Document) -> TypesResult<Self> {
        const T: &str = "CompositeKeySample";
        let mut key_element2 = BaseSampleKey::default();
        key_element2.populate_from_string(&doc.read_str(T, "KeyElement2")?)?;
        Ok(Self {
            id: TemporalId::ZERO,
            data_set: TemporalId::ZERO,
            key_element1: doc.read_str(T, "KeyElement1")?,
            key_element2,
            key_element3: doc.read_str(T, "KeyElement3")?,
        })
    }
}
