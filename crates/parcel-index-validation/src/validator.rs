// crates/parcel-index-validation/src/validator.rs
// ============================================================================
// Module: JSON Schema Update Validator
// Description: Compiled Draft 2020-12 schema applied to incoming updates.
// Purpose: Reject malformed parcel updates with structured error details.
// Dependencies: jsonschema, parcel-index-core, serde_json, thiserror
// ============================================================================

//! ## Overview
//! The schema is compiled at construction; validation returns the complete
//! list of error messages, so there is no error state to clear between calls.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io::Read;
use std::path::Path;

use jsonschema::Draft;
use jsonschema::Validator;
use parcel_index_core::UpdateRejection;
use parcel_index_core::UpdateValidator;
use serde_json::Value;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum schema file size (bytes).
pub const MAX_SCHEMA_BYTES: usize = 1024 * 1024;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Schema loading and compilation errors.
#[derive(Debug, Error)]
pub enum ValidatorError {
    /// Schema file could not be read.
    #[error("update schema io error: {0}")]
    Io(String),
    /// Schema file is not valid JSON.
    #[error("update schema parse error: {0}")]
    Parse(String),
    /// Schema file exceeds the size limit.
    #[error("update schema too large: {actual_bytes} bytes (max {max_bytes})")]
    TooLarge {
        /// Maximum allowed bytes.
        max_bytes: usize,
        /// Bytes read before giving up.
        actual_bytes: usize,
    },
    /// Schema failed to compile.
    #[error("update schema compile error: {0}")]
    Compile(String),
}

// ============================================================================
// SECTION: Validator
// ============================================================================

/// Update validator backed by a compiled JSON Schema.
pub struct JsonSchemaUpdateValidator {
    /// Compiled schema.
    validator: Validator,
}

impl JsonSchemaUpdateValidator {
    /// Compiles a schema document.
    ///
    /// # Errors
    ///
    /// Returns [`ValidatorError::Compile`] when the schema is invalid.
    pub fn new(schema: &Value) -> Result<Self, ValidatorError> {
        let validator = jsonschema::options()
            .with_draft(Draft::Draft202012)
            .build(schema)
            .map_err(|err| ValidatorError::Compile(err.to_string()))?;
        Ok(Self {
            validator,
        })
    }

    /// Loads and compiles a schema file.
    ///
    /// # Errors
    ///
    /// Returns [`ValidatorError`] when the file cannot be read, parsed, or compiled.
    pub fn from_path(path: &Path) -> Result<Self, ValidatorError> {
        let file = fs::File::open(path).map_err(|err| ValidatorError::Io(err.to_string()))?;
        let limit = u64::try_from(MAX_SCHEMA_BYTES).unwrap_or(u64::MAX).saturating_add(1);
        let mut bytes = Vec::new();
        file.take(limit)
            .read_to_end(&mut bytes)
            .map_err(|err| ValidatorError::Io(err.to_string()))?;
        if bytes.len() > MAX_SCHEMA_BYTES {
            return Err(ValidatorError::TooLarge {
                max_bytes: MAX_SCHEMA_BYTES,
                actual_bytes: bytes.len(),
            });
        }
        let schema: Value =
            serde_json::from_slice(&bytes).map_err(|err| ValidatorError::Parse(err.to_string()))?;
        Self::new(&schema)
    }
}

impl UpdateValidator for JsonSchemaUpdateValidator {
    fn validate(&self, update: &Value) -> Result<(), UpdateRejection> {
        let errors: Vec<String> =
            self.validator.iter_errors(update).map(|err| err.to_string()).collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(UpdateRejection {
                errors,
            })
        }
    }
}
