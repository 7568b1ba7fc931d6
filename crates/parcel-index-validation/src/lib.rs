// crates/parcel-index-validation/src/lib.rs
// ============================================================================
// Module: Parcel Update Validation
// Description: JSON Schema backed update validator.
// Purpose: Adapt a compiled JSON Schema to the UpdateValidator interface.
// Dependencies: parcel-index-core, jsonschema
// ============================================================================

//! ## Overview
//! [`JsonSchemaUpdateValidator`] compiles a Draft 2020-12 schema once and
//! returns every validation error for an update in a single call.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod validator;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use validator::JsonSchemaUpdateValidator;
pub use validator::MAX_SCHEMA_BYTES;
pub use validator::ValidatorError;
