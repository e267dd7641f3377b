//! Validation execution: one pass over a merged spec
//!
//! [`RuleValidator`] is the seam the coordinator calls exactly once per
//! invocation. [`StandardValidator`] implements it with the rules from
//! [`super::rules`], collecting every failing rule of every field before
//! reporting.

use indexmap::IndexMap;
use serde_json::Value;

use super::rules::{Rule, parse_all};
use super::validators;
use crate::core::error::ValidationError;
use crate::core::merger::MergedValidationSpec;

/// Error messages keyed by concrete field path, in rule order
pub type FieldErrors = IndexMap<String, Vec<String>>;

/// Result of a validation pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationOutcome {
    errors: FieldErrors,
}

impl ValidationOutcome {
    pub fn passed() -> Self {
        Self::default()
    }

    pub fn failed(errors: FieldErrors) -> Self {
        Self { errors }
    }

    pub fn passes(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn fails(&self) -> bool {
        !self.passes()
    }

    pub fn errors(&self) -> &FieldErrors {
        &self.errors
    }

    pub fn into_errors(self) -> FieldErrors {
        self.errors
    }
}

/// Executes a merged validation spec
pub trait RuleValidator: Send + Sync {
    /// Validate `spec.data` against `spec.rules`
    ///
    /// Rule failures are reported in the outcome; `Err` is reserved for
    /// rules the validator cannot run.
    fn validate(&self, spec: &MergedValidationSpec) -> Result<ValidationOutcome, ValidationError>;
}

/// Built-in validator for the standard rule set
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardValidator;

impl StandardValidator {
    pub fn new() -> Self {
        Self
    }
}

impl RuleValidator for StandardValidator {
    fn validate(&self, spec: &MergedValidationSpec) -> Result<ValidationOutcome, ValidationError> {
        let mut errors = FieldErrors::new();

        for (pattern, expressions) in spec.rules.iter() {
            let rules = parse_all(pattern, expressions)?;
            let numeric = rules.iter().any(Rule::is_numeric);
            let nullable = rules.iter().any(|r| matches!(r, Rule::Nullable));
            let sometimes = rules.iter().any(|r| matches!(r, Rule::Sometimes));
            let bail = rules.iter().any(|r| matches!(r, Rule::Bail));

            for field in spec.data.expand(pattern) {
                let value = spec.data.get(&field);
                if sometimes && value.is_none() {
                    continue;
                }

                // Absent fields only run implicit rules; null ones too when nullable
                let skip_explicit = match value {
                    None => true,
                    Some(Value::Null) => nullable,
                    Some(_) => false,
                };
                for rule in rules.iter().filter(|r| !r.is_marker()) {
                    if skip_explicit && !rule.is_implicit() {
                        continue;
                    }
                    if passes(rule, &field, value, numeric, spec) {
                        continue;
                    }
                    let message = render_message(spec, pattern, &field, rule, value, numeric);
                    errors.entry(field.clone()).or_default().push(message);
                    if bail {
                        break;
                    }
                }
            }
        }

        tracing::debug!(
            fields = spec.rules.len(),
            failed = errors.len(),
            "validation pass complete"
        );
        Ok(ValidationOutcome::failed(errors))
    }
}

fn passes(
    rule: &Rule,
    field: &str,
    value: Option<&Value>,
    numeric: bool,
    spec: &MergedValidationSpec,
) -> bool {
    if let Rule::Required = rule {
        return validators::required(value);
    }
    let Some(value) = value else {
        return true;
    };
    let size = || validators::size_of(value, numeric);
    match rule {
        Rule::String => validators::string(value),
        Rule::Integer => validators::integer(value),
        Rule::Numeric => validators::numeric(value),
        Rule::Boolean => validators::boolean(value),
        Rule::Array => validators::array(value),
        Rule::Email => validators::email(value),
        Rule::Url => validators::url(value),
        Rule::Uuid => validators::uuid(value),
        Rule::Min(min) => size().is_some_and(|s| s >= *min),
        Rule::Max(max) => size().is_some_and(|s| s <= *max),
        Rule::Between(min, max) => size().is_some_and(|s| s >= *min && s <= *max),
        Rule::Size(expected) => size().is_some_and(|s| s == *expected),
        Rule::In(allowed) => validators::in_list(allowed, value),
        Rule::NotIn(denied) => !validators::in_list(denied, value),
        Rule::DateFormat(format) => validators::date_format(format, value),
        Rule::Regex(pattern) => validators::regex(pattern, value),
        Rule::Confirmed => {
            let confirmation = format!("{}_confirmation", field);
            validators::same_value(Some(value), spec.data.get(&confirmation))
        }
        Rule::Same(other) => validators::same_value(Some(value), spec.data.get(other)),
        Rule::Different(other) => !validators::same_value(Some(value), spec.data.get(other)),
        Rule::Required | Rule::Nullable | Rule::Sometimes | Rule::Bail => true,
    }
}

/// Resolve the message for a failed rule
///
/// Custom messages are looked up as `field.rule` (concrete path, then rule
/// pattern) and then `rule`; built-in templates are used otherwise.
fn render_message(
    spec: &MergedValidationSpec,
    pattern: &str,
    field: &str,
    rule: &Rule,
    value: Option<&Value>,
    numeric: bool,
) -> String {
    let key = rule.key();
    let template = spec
        .messages
        .get(&format!("{}.{}", field, key))
        .or_else(|| spec.messages.get(&format!("{}.{}", pattern, key)))
        .or_else(|| spec.messages.get(key))
        .cloned()
        .unwrap_or_else(|| default_template(rule, value, numeric).to_string());

    let mut message = template.replace(":attribute", &attribute_label(spec, pattern, field));
    match rule {
        Rule::Min(min) => message = message.replace(":min", &format_number(*min)),
        Rule::Max(max) => message = message.replace(":max", &format_number(*max)),
        Rule::Between(min, max) => {
            message = message
                .replace(":min", &format_number(*min))
                .replace(":max", &format_number(*max));
        }
        Rule::Size(size) => message = message.replace(":size", &format_number(*size)),
        Rule::In(values) | Rule::NotIn(values) => {
            message = message.replace(":values", &values.join(", "))
        }
        Rule::DateFormat(format) => message = message.replace(":format", format),
        Rule::Same(other) | Rule::Different(other) => {
            message = message.replace(":other", &attribute_label(spec, other, other))
        }
        _ => {}
    }
    message
}

fn attribute_label(spec: &MergedValidationSpec, pattern: &str, field: &str) -> String {
    spec.attributes
        .get(field)
        .or_else(|| spec.attributes.get(pattern))
        .cloned()
        .unwrap_or_else(|| field.replace('_', " "))
}

#[derive(Clone, Copy)]
enum SizeKind {
    Numeric,
    String,
    Array,
}

fn size_kind(value: Option<&Value>, numeric: bool) -> SizeKind {
    match value {
        Some(Value::Array(_)) | Some(Value::Object(_)) => SizeKind::Array,
        Some(Value::Number(_)) => SizeKind::Numeric,
        Some(Value::String(_)) if numeric => SizeKind::Numeric,
        _ => SizeKind::String,
    }
}

fn default_template(rule: &Rule, value: Option<&Value>, numeric: bool) -> &'static str {
    let kind = size_kind(value, numeric);
    match rule {
        Rule::Required => "The :attribute field is required.",
        Rule::String => "The :attribute must be a string.",
        Rule::Integer => "The :attribute must be an integer.",
        Rule::Numeric => "The :attribute must be a number.",
        Rule::Boolean => "The :attribute field must be true or false.",
        Rule::Array => "The :attribute must be an array.",
        Rule::Email => "The :attribute must be a valid email address.",
        Rule::Url => "The :attribute must be a valid URL.",
        Rule::Uuid => "The :attribute must be a valid UUID.",
        Rule::Min(_) => match kind {
            SizeKind::Numeric => "The :attribute must be at least :min.",
            SizeKind::String => "The :attribute must be at least :min characters.",
            SizeKind::Array => "The :attribute must have at least :min items.",
        },
        Rule::Max(_) => match kind {
            SizeKind::Numeric => "The :attribute may not be greater than :max.",
            SizeKind::String => "The :attribute may not be greater than :max characters.",
            SizeKind::Array => "The :attribute may not have more than :max items.",
        },
        Rule::Between(_, _) => match kind {
            SizeKind::Numeric => "The :attribute must be between :min and :max.",
            SizeKind::String => "The :attribute must be between :min and :max characters.",
            SizeKind::Array => "The :attribute must have between :min and :max items.",
        },
        Rule::Size(_) => match kind {
            SizeKind::Numeric => "The :attribute must be :size.",
            SizeKind::String => "The :attribute must be :size characters.",
            SizeKind::Array => "The :attribute must contain :size items.",
        },
        Rule::In(_) | Rule::NotIn(_) => "The selected :attribute is invalid.",
        Rule::DateFormat(_) => "The :attribute does not match the format :format.",
        Rule::Regex(_) => "The :attribute format is invalid.",
        Rule::Confirmed => "The :attribute confirmation does not match.",
        Rule::Same(_) => "The :attribute and :other must match.",
        Rule::Different(_) => "The :attribute and :other must be different.",
        Rule::Nullable | Rule::Sometimes | Rule::Bail => "The :attribute is invalid.",
    }
}

fn format_number(n: f64) -> String {
    if n.fract() == 0.0 {
        format!("{}", n as i64)
    } else {
        n.to_string()
    }
}
