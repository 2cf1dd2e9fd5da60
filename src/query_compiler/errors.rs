use thiserror::Error;

use crate::schema::MetadataError;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CompileError {
    #[error("Populate nesting exceeds the configured maximum depth of {max}")]
    DepthExceeded { max: usize },

    #[error("Record `{record}` has no relationship named '{name}'")]
    UnknownPopulate { record: String, name: String },

    #[error(transparent)]
    Metadata(#[from] MetadataError),
}
