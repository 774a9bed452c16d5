use tempora_id::TemporalId;

/// Errors raised by the store.
///
/// `NotFound` is the only kind routinely expected by callers; every other
/// kind indicates a programmer error, a data-integrity problem, or a refusal
/// to write through a historical or read-only view.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// A non-null load did not find a record, or a dataset name lookup
    /// returned nothing.
    #[error("{0}")]
    NotFound(String),

    /// The runtime type of a stored record is not a subtype of the
    /// requested type.
    #[error(
        "stored type {stored} for {location} is not an instance of the requested type {requested}"
    )]
    TypeMismatch {
        stored: String,
        requested: String,
        location: String,
    },

    /// An allocated id failed an ordering requirement, or a dataset imports
    /// itself.
    #[error("{0}")]
    OrderViolation(String),

    /// The data source or dataset is read-only, or a cutoff makes it a
    /// historical view.
    #[error("{0}")]
    ReadOnly(String),

    /// Malformed database name, empty dataset name, or similar misuse.
    #[error("{0}")]
    Validation(String),

    /// `where` clause supplied after a sort stage.
    #[error(
        "all where(...) clauses of the query must precede \
         sort_by(...) or sort_by_desc(...) clauses of the same query"
    )]
    QueryOrdering,

    /// Record model error: key grammar, document decoding, registry lookup.
    #[error(transparent)]
    Types(#[from] tempora_types::Error),

    /// The underlying storage engine signalled failure.
    #[error("{0}")]
    Store(String),
}

impl Error {
    pub(crate) fn not_found_by_key(key: &str, data_set: TemporalId) -> Self {
        Self::NotFound(format!(
            "record with key {key} is not found in dataset with temporal id {data_set}"
        ))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
