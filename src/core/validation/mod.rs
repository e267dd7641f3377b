//! Validation and filtering system
//!
//! Rules are parsed from Laravel-style expressions, checked by the
//! [`StandardValidator`] (or any [`RuleValidator`]) over a merged spec, and
//! input can be normalised beforehand with the [`Prepare`] filter chain.

pub mod engine;
pub mod extractor;
pub mod filters;
pub mod rules;
pub mod validators;

pub use engine::{FieldErrors, RuleValidator, StandardValidator, ValidationOutcome};
pub use extractor::{Form, FormServices};
pub use filters::Prepare;
pub use rules::Rule;
