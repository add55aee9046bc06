use alloc::string::String;

use crate::sharding::ShardingError;

/// Errors raised by the repeat primitive.
///
/// The two argument variants follow the reference library's split between a `TypeError`
/// (an argument of the wrong kind) and a `ValueError` (the right kind, with an invalid value).
/// Every error is raised during planning, before any output is produced.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RepeatError {
    /// An argument has the wrong kind, e.g. a missing `repeats` or a non-integer axis.
    #[error("TypeError: {0}")]
    TypeKind(String),
    /// An argument has the right kind but an invalid value.
    #[error("ValueError: {0}")]
    InvalidValue(String),
    /// The array could not be laid out over the device mesh.
    #[error("sharding error: {0}")]
    Sharding(#[from] ShardingError),
}

impl RepeatError {
    /// Returns `true` for errors of the `TypeError` kind.
    pub fn is_type_error(&self) -> bool {
        matches!(self, Self::TypeKind(_))
    }

    /// Returns `true` for errors of the `ValueError` kind.
    pub fn is_value_error(&self) -> bool {
        matches!(self, Self::InvalidValue(_))
    }
}
