//! Input filters for preparation hooks
//!
//! These filters transform field values before validation. They are meant to
//! be chained with [`Prepare`] inside `FormRequest::prepare_for_validation`:
//!
//! ```rust,ignore
//! fn prepare_for_validation(&self, input: &mut InputData) -> anyhow::Result<()> {
//!     Prepare::new()
//!         .trim("name")
//!         .lowercase("email")
//!         .default_value("role", json!("member"))
//!         .apply(input)
//! }
//! ```

use anyhow::{Result, bail};
use serde_json::{Value, json};
use std::sync::Arc;

use crate::core::request::InputData;

/// A field filter: receives the field path and its current value
pub type Filter = Arc<dyn Fn(&str, Value) -> Result<Value> + Send + Sync>;

/// Filter: trim whitespace from string
pub fn trim() -> impl Fn(&str, Value) -> Result<Value> + Send + Sync + Clone {
    |_: &str, value: Value| match value {
        Value::String(s) => Ok(Value::String(s.trim().to_string())),
        other => Ok(other),
    }
}

/// Filter: convert string to uppercase
pub fn uppercase() -> impl Fn(&str, Value) -> Result<Value> + Send + Sync + Clone {
    |_: &str, value: Value| match value {
        Value::String(s) => Ok(Value::String(s.to_uppercase())),
        other => Ok(other),
    }
}

/// Filter: convert string to lowercase
pub fn lowercase() -> impl Fn(&str, Value) -> Result<Value> + Send + Sync + Clone {
    |_: &str, value: Value| match value {
        Value::String(s) => Ok(Value::String(s.to_lowercase())),
        other => Ok(other),
    }
}

/// Filter: blank strings become null
pub fn empty_to_null() -> impl Fn(&str, Value) -> Result<Value> + Send + Sync + Clone {
    |_: &str, value: Value| match value {
        Value::String(s) if s.trim().is_empty() => Ok(Value::Null),
        other => Ok(other),
    }
}

/// Filter: round number (or numeric string) to specified decimal places
///
/// Non-numeric strings are an error so that broken input surfaces from the
/// preparation hook instead of being silently kept.
pub fn round_decimals(decimals: u32) -> impl Fn(&str, Value) -> Result<Value> + Send + Sync + Clone {
    move |field: &str, value: Value| {
        let num = match &value {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => match s.trim().parse::<f64>() {
                Ok(n) => Some(n),
                Err(_) => bail!("'{}' is not a number: {}", field, s),
            },
            _ => None,
        };
        match num {
            Some(num) => {
                let factor = 10_f64.powi(decimals as i32);
                Ok(json!((num * factor).round() / factor))
            }
            None => Ok(value),
        }
    }
}

enum Step {
    Filter { path: String, filter: Filter },
    Default { path: String, value: Value },
    Rename { from: String, to: String },
}

/// Ordered chain of input transformations
#[derive(Default)]
pub struct Prepare {
    steps: Vec<Step>,
}

impl Prepare {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply any filter to a field; absent fields are left alone
    pub fn filter<F>(mut self, path: impl Into<String>, filter: F) -> Self
    where
        F: Fn(&str, Value) -> Result<Value> + Send + Sync + 'static,
    {
        self.steps.push(Step::Filter {
            path: path.into(),
            filter: Arc::new(filter),
        });
        self
    }

    pub fn trim(self, path: impl Into<String>) -> Self {
        self.filter(path, trim())
    }

    pub fn uppercase(self, path: impl Into<String>) -> Self {
        self.filter(path, uppercase())
    }

    pub fn lowercase(self, path: impl Into<String>) -> Self {
        self.filter(path, lowercase())
    }

    pub fn empty_to_null(self, path: impl Into<String>) -> Self {
        self.filter(path, empty_to_null())
    }

    pub fn round(self, path: impl Into<String>, decimals: u32) -> Self {
        self.filter(path, round_decimals(decimals))
    }

    /// Set a value when the field is absent or null
    pub fn default_value(mut self, path: impl Into<String>, value: Value) -> Self {
        self.steps.push(Step::Default {
            path: path.into(),
            value,
        });
        self
    }

    /// Move a field to another path
    pub fn rename(mut self, from: impl Into<String>, to: impl Into<String>) -> Self {
        self.steps.push(Step::Rename {
            from: from.into(),
            to: to.into(),
        });
        self
    }

    /// Run every step in order
    pub fn apply(&self, input: &mut InputData) -> Result<()> {
        for step in &self.steps {
            match step {
                Step::Filter { path, filter } => {
                    for concrete in input.expand(path) {
                        if let Some(value) = input.get(&concrete).cloned() {
                            let filtered = filter(&concrete, value)?;
                            input.set(&concrete, filtered);
                        }
                    }
                }
                Step::Default { path, value } => {
                    if matches!(input.get(path), None | Some(Value::Null)) {
                        input.set(path, value.clone());
                    }
                }
                Step::Rename { from, to } => {
                    if let Some(value) = input.remove(from) {
                        input.set(to, value);
                    }
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn input(value: Value) -> InputData {
        InputData::from_value(value).expect("object")
    }

    // === trim() ===

    #[test]
    fn test_trim_removes_whitespace() {
        let f = trim();
        let result = f("name", json!("  hello  ")).expect("should not fail");
        assert_eq!(result, json!("hello"));
    }

    #[test]
    fn test_trim_non_string_passthrough() {
        let f = trim();
        let result = f("age", json!(42)).expect("should not fail");
        assert_eq!(result, json!(42));
    }

    // === uppercase() / lowercase() ===

    #[test]
    fn test_uppercase_converts_string() {
        let f = uppercase();
        let result = f("code", json!("Hello World")).expect("should not fail");
        assert_eq!(result, json!("HELLO WORLD"));
    }

    #[test]
    fn test_lowercase_converts_string() {
        let f = lowercase();
        let result = f("email", json!("Hello@WORLD.com")).expect("should not fail");
        assert_eq!(result, json!("hello@world.com"));
    }

    // === empty_to_null() ===

    #[test]
    fn test_empty_to_null() {
        let f = empty_to_null();
        assert_eq!(f("nickname", json!("  ")).expect("ok"), json!(null));
        assert_eq!(f("nickname", json!("x")).expect("ok"), json!("x"));
    }

    // === round_decimals() ===

    #[test]
    fn test_round_decimals_two_places() {
        let f = round_decimals(2);
        let result = f("price", json!(3.14159)).expect("should not fail");
        assert_eq!(result, json!(3.14));
    }

    #[test]
    fn test_round_decimals_numeric_string() {
        let f = round_decimals(1);
        let result = f("price", json!("2.55")).expect("should not fail");
        assert_eq!(result, json!(2.6));
    }

    #[test]
    fn test_round_decimals_rejects_non_numeric_string() {
        let f = round_decimals(2);
        let err = f("price", json!("cheap")).unwrap_err();
        assert!(err.to_string().contains("price"));
    }

    // === Prepare ===

    #[test]
    fn test_prepare_chain_applies_in_order() {
        let mut data = input(json!({"name": "  Ada ", "email": "ADA@EXAMPLE.COM"}));
        Prepare::new()
            .trim("name")
            .lowercase("email")
            .default_value("role", json!("member"))
            .apply(&mut data)
            .expect("prepare");
        assert_eq!(
            data.into_value(),
            json!({"name": "Ada", "email": "ada@example.com", "role": "member"})
        );
    }

    #[test]
    fn test_prepare_skips_absent_fields() {
        let mut data = InputData::new();
        Prepare::new().trim("name").apply(&mut data).expect("prepare");
        assert!(data.is_empty());
    }

    #[test]
    fn test_prepare_default_keeps_existing_value() {
        let mut data = input(json!({"role": "admin"}));
        Prepare::new()
            .default_value("role", json!("member"))
            .apply(&mut data)
            .expect("prepare");
        assert_eq!(data.get("role"), Some(&json!("admin")));
    }

    #[test]
    fn test_prepare_wildcard_filter() {
        let mut data = input(json!({"items": [{"sku": " a1 "}, {"sku": "b2 "}]}));
        Prepare::new()
            .trim("items.*.sku")
            .uppercase("items.*.sku")
            .apply(&mut data)
            .expect("prepare");
        assert_eq!(data.get("items.0.sku"), Some(&json!("A1")));
        assert_eq!(data.get("items.1.sku"), Some(&json!("B2")));
    }

    #[test]
    fn test_prepare_rename() {
        let mut data = input(json!({"full_name": "Ada"}));
        Prepare::new()
            .rename("full_name", "name")
            .apply(&mut data)
            .expect("prepare");
        assert_eq!(data.into_value(), json!({"name": "Ada"}));
    }

    #[test]
    fn test_prepare_propagates_filter_error() {
        let mut data = input(json!({"price": "cheap"}));
        let result = Prepare::new().round("price", 2).apply(&mut data);
        assert!(result.is_err());
    }
}
