mod data_source;
mod temporal_data_source;

pub use data_source::{DataSource, DataSourceConfig, COMMON_DATA_SET_NAME};
pub use temporal_data_source::TemporalDataSource;
