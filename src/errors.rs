//! # ODM Error Types
//!
//! Operation-level failures are returned to the immediate caller as-is.
//! Driver sentinels for not-found and duplicate-key are translated to typed
//! variants so callers can branch on them without inspecting the driver.

use thiserror::Error;

use crate::driver::DriverError;
use crate::query_compiler::CompileError;
use crate::schema::MetadataError;

#[derive(Debug, Error)]
pub enum OdmError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate document: {0}")]
    DuplicateKey(String),

    #[error("Invalid params: {0}")]
    InvalidParams(String),

    /// Raised by lifecycle hooks
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Metadata(#[from] MetadataError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error("Driver error: {0}")]
    Driver(DriverError),

    #[error("Encode error: {0}")]
    Encode(#[from] serde_json::Error),
}

impl OdmError {
    /// Attach the collection to a driver failure
    pub fn from_driver(collection: &str, err: DriverError) -> Self {
        match err {
            DriverError::NotFound => OdmError::NotFound(collection.to_string()),
            DriverError::DuplicateKey(key) => {
                OdmError::DuplicateKey(format!("{} ({})", collection, key))
            }
            other => OdmError::Driver(other),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, OdmError::NotFound(_))
    }

    pub fn is_duplicate_key(&self) -> bool {
        matches!(self, OdmError::DuplicateKey(_))
    }
}

impl From<DriverError> for OdmError {
    fn from(err: DriverError) -> Self {
        match err {
            DriverError::NotFound => OdmError::NotFound("document".to_string()),
            DriverError::DuplicateKey(key) => OdmError::DuplicateKey(key),
            other => OdmError::Driver(other),
        }
    }
}
