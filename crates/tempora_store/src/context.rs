use std::sync::Arc;

use tempora_id::TemporalId;
use tempora_log::Log;

use crate::TemporalDataSource;

/// Per-caller execution context: a data source, the default dataset reads
/// and writes go to, and the log sink store operations report into.
#[derive(Clone)]
pub struct Context {
    pub data_source: Arc<TemporalDataSource>,
    pub data_set: TemporalId,
    pub log: Arc<dyn Log>,
}

impl Context {
    pub fn new(data_source: Arc<TemporalDataSource>, data_set: TemporalId) -> Self {
        let log = data_source.log().clone();
        Self {
            data_source,
            data_set,
            log,
        }
    }
}
