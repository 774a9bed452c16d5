use tempora_id::TemporalId;

use crate::{
    Data, Document, Error, Key, KeyMeta, KeyWriter, Record, RecordMeta, Result, TokenReader,
};

// ----------------------------------------------------------------------------

/// Instance type of a database; some operations are restricted by it.
///
/// `Prod` and `Uat` refuse database deletion through the API. `User` is a
/// personal instance; `Test` is reserved for unit tests.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstanceType {
    #[default]
    Empty,
    Prod,
    Uat,
    Dev,
    User,
    Test,
}

impl InstanceType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Empty => "",
            Self::Prod => "PROD",
            Self::Uat => "UAT",
            Self::Dev => "DEV",
            Self::User => "USER",
            Self::Test => "TEST",
        }
    }

    /// `true` for instance types whose databases may be dropped.
    pub fn allows_drop(&self) -> bool {
        matches!(self, Self::Dev | Self::User | Self::Test)
    }
}

impl std::fmt::Display for InstanceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for InstanceType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "PROD" => Ok(Self::Prod),
            "UAT" => Ok(Self::Uat),
            "DEV" => Ok(Self::Dev),
            "USER" => Ok(Self::User),
            "TEST" => Ok(Self::Test),
            _ => Err(Error::Validation(format!(
                "{s:?} is not a valid instance type; \
                 expected PROD, UAT, DEV, USER or TEST"
            ))),
        }
    }
}

// ----------------------------------------------------------------------------

/// Strict database naming: `instance_type;instance_name;env_name`.
///
/// The meaning of the two names depends on the instance type: for `Prod`,
/// `Uat` and `Dev` the instance name identifies the endpoint; for `User` it
/// is the user alias; for `Test` it is the test module, with the test name
/// as the environment name.
#[derive(Debug, Default, Clone, PartialEq, Eq, Hash)]
pub struct DbNameKey {
    pub instance_type: InstanceType,
    pub instance_name: String,
    pub env_name: String,
}

impl DbNameKey {
    pub fn new(
        instance_type: InstanceType,
        instance_name: impl Into<String>,
        env_name: impl Into<String>,
    ) -> Self {
        Self {
            instance_type,
            instance_name: instance_name.into(),
            env_name: env_name.into(),
        }
    }
}

impl Key for DbNameKey {
    fn write_tokens(&self, writer: &mut KeyWriter) -> Result<()> {
        writer.enum_name(self.instance_type.name())?;
        writer.string(&self.instance_name)?;
        writer.string(&self.env_name)
    }

    fn read_tokens(&mut self, reader: &mut TokenReader<'_>) -> Result<()> {
        self.instance_type = reader.string()?.parse()?;
        self.instance_name = reader.string()?;
        self.env_name = reader.string()?;
        Ok(())
    }
}

impl KeyMeta for DbNameKey {
    const TYPE_NAME: &'static str = "DbNameKey";
}

// ----------------------------------------------------------------------------

/// Descriptor record of a data source, stored in the root dataset of the
/// database that hosts the source's metadata.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DataSourceInfo {
    pub id: TemporalId,
    pub data_set: TemporalId,
    pub data_source_name: String,
    /// The database name key's string form.
    pub db_name: String,
    pub read_only: Option<bool>,
    pub non_temporal: Option<bool>,
}

impl DataSourceInfo {
    pub fn new(data_source_name: impl Into<String>, db_name: &DbNameKey) -> Result<Self> {
        Ok(Self {
            data_source_name: data_source_name.into(),
            db_name: db_name.value()?,
            ..Default::default()
        })
    }
}

impl Data for DataSourceInfo {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn write_fields(&self, doc: &mut Document) -> Result<()> {
        doc.set("DataSourceName", self.data_source_name.as_str());
        doc.set("DbName", self.db_name.as_str());
        if let Some(read_only) = self.read_only {
            doc.set("ReadOnly", read_only);
        }
        if let Some(non_temporal) = self.non_temporal {
            doc.set("NonTemporal", non_temporal);
        }
        Ok(())
    }
}

impl Record for DataSourceInfo {
    crate::impl_record_accessors!();

    fn key(&self) -> Result<String> {
        DataSourceInfoKey {
            data_source_name: self.data_source_name.clone(),
        }
        .value()
    }
}

impl RecordMeta for DataSourceInfo {
    const TYPE_NAME: &'static str = "DataSource";
    const ANCESTORS: &'static [&'static str] = &["DataSource"];
    type Key = DataSourceInfoKey;

    fn from_document(doc: &Document) -> Result<Self> {
        Ok(Self {
            id: TemporalId::ZERO,
            data_set: TemporalId::ZERO,
            data_source_name: doc.read_str(Self::TYPE_NAME, "DataSourceName")?,
            db_name: doc.read_str(Self::TYPE_NAME, "DbName")?,
            read_only: doc.read_opt_bool(Self::TYPE_NAME, "ReadOnly")?,
            non_temporal: doc.read_opt_bool(Self::TYPE_NAME, "NonTemporal")?,
        })
    }
}

/// Key of a [`DataSourceInfo`]: the unique data source name.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct DataSourceInfoKey {
    pub data_source_name: String,
}

impl Key for DataSourceInfoKey {
    fn write_tokens(&self, writer: &mut KeyWriter) -> Result<()> {
        writer.string(&self.data_source_name)
    }

    fn read_tokens(&mut self, reader: &mut TokenReader<'_>) -> Result<()> {
        self.data_source_name = reader.string()?;
        Ok(())
    }
}

impl KeyMeta for DataSourceInfoKey {
    const TYPE_NAME: &'static str = "DataSourceKey";
}

// ----------------------------------------------------------------------------
