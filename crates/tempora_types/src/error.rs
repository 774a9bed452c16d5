use crate::ValueKind;

/// Errors raised by the record model: key grammar violations, malformed
/// documents, unregistered types.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Validation(String),

    #[error("document for type {type_name} is missing required field {field}")]
    MissingField {
        type_name: &'static str,
        field: &'static str,
    },

    #[error("field {field} of {type_name} holds a {actual:?} value, expected {expected:?}")]
    WrongValueKind {
        type_name: &'static str,
        field: &'static str,
        expected: ValueKind,
        actual: ValueKind,
    },

    #[error("serialized type {0} is not registered")]
    UnknownType(String),

    #[error("no record type is registered for key type {0}")]
    UnboundKey(String),

    #[error("{0}")]
    KeyFormat(String),
}

pub type Result<T> = std::result::Result<T, Error>;
