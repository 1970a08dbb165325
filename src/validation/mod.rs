//! Post-load consistency checks.
//!
//! Validation is read-only: it inspects the store and the cross-reference
//! index and reports findings as data.

mod rules;
mod validator;

pub use rules::{required_fields, RequiredField};
pub use validator::{
    validate, MissingField, ParentConflict, ResourceValidation, UnresolvedReference,
    ValidationReport, Validator,
};
