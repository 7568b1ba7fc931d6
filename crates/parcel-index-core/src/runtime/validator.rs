// crates/parcel-index-core/src/runtime/validator.rs
// ============================================================================
// Module: Accept-All Validator
// Description: Update validator that accepts every object update.
// Purpose: Default validator when no update schema is configured.
// Dependencies: crate::interfaces, serde_json
// ============================================================================

//! ## Overview
//! [`AcceptAllValidator`] only requires each update to be a JSON object.
//! Parcel number and index membership checks happen in the pipeline.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde_json::Value;

use crate::interfaces::UpdateRejection;
use crate::interfaces::UpdateValidator;

// ============================================================================
// SECTION: Validator
// ============================================================================

/// Validator that only requires updates to be JSON objects.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AcceptAllValidator;

impl UpdateValidator for AcceptAllValidator {
    fn validate(&self, update: &Value) -> Result<(), UpdateRejection> {
        if update.is_object() {
            Ok(())
        } else {
            Err(UpdateRejection::message("update must be a JSON object"))
        }
    }
}
