mod data;
mod deleted;
mod key;
mod record;

pub use data::Data;
pub use deleted::{DeletedRecord, DELETED_TYPE_NAME};
pub use key::{Key, KeyMeta, KeyWriter, TokenReader};
pub use record::{downcast_record, is_deleted, Record, RecordMeta};
