//! Parsing of rule expressions such as `required`, `min:3` or `in:a,b`

use regex::Regex;

use crate::core::error::ValidationError;

/// A parsed validation rule
#[derive(Debug, Clone)]
pub enum Rule {
    Required,
    Nullable,
    Sometimes,
    Bail,
    String,
    Integer,
    Numeric,
    Boolean,
    Array,
    Email,
    Url,
    Uuid,
    Min(f64),
    Max(f64),
    Between(f64, f64),
    Size(f64),
    In(Vec<String>),
    NotIn(Vec<String>),
    DateFormat(String),
    Regex(Regex),
    Confirmed,
    Same(String),
    Different(String),
}

impl Rule {
    /// Parse one rule expression for `field`
    pub fn parse(field: &str, expression: &str) -> Result<Self, ValidationError> {
        let (name, parameters) = match expression.split_once(':') {
            Some((name, parameters)) => (name.trim(), Some(parameters)),
            None => (expression.trim(), None),
        };

        let invalid = |message: &str| ValidationError::InvalidRule {
            field: field.to_string(),
            rule: expression.to_string(),
            message: message.to_string(),
        };
        let required_parameter = || {
            parameters
                .filter(|p| !p.is_empty())
                .ok_or_else(|| invalid("missing parameter"))
        };
        let number = |raw: &str| {
            raw.trim()
                .parse::<f64>()
                .map_err(|_| invalid("expected a number"))
        };
        let list = |raw: &str| {
            raw.split(',')
                .map(|v| v.trim().to_string())
                .collect::<Vec<_>>()
        };

        let rule = match name {
            "required" => Rule::Required,
            "nullable" => Rule::Nullable,
            "sometimes" => Rule::Sometimes,
            "bail" => Rule::Bail,
            "string" => Rule::String,
            "integer" | "int" => Rule::Integer,
            "numeric" => Rule::Numeric,
            "boolean" | "bool" => Rule::Boolean,
            "array" => Rule::Array,
            "email" => Rule::Email,
            "url" => Rule::Url,
            "uuid" => Rule::Uuid,
            "min" => Rule::Min(number(required_parameter()?)?),
            "max" => Rule::Max(number(required_parameter()?)?),
            "size" => Rule::Size(number(required_parameter()?)?),
            "between" => {
                let raw = required_parameter()?;
                let (min, max) = raw
                    .split_once(',')
                    .ok_or_else(|| invalid("expected two numbers"))?;
                Rule::Between(number(min)?, number(max)?)
            }
            "in" => Rule::In(list(required_parameter()?)),
            "not_in" => Rule::NotIn(list(required_parameter()?)),
            "date_format" => Rule::DateFormat(required_parameter()?.to_string()),
            "regex" => Rule::Regex(parse_regex(required_parameter()?).map_err(|e| invalid(&e))?),
            "confirmed" => Rule::Confirmed,
            "same" => Rule::Same(required_parameter()?.trim().to_string()),
            "different" => Rule::Different(required_parameter()?.trim().to_string()),
            _ => {
                return Err(ValidationError::UnknownRule {
                    field: field.to_string(),
                    rule: name.to_string(),
                });
            }
        };
        Ok(rule)
    }

    /// Name used for message lookup (`age.integer`, `integer`)
    pub fn key(&self) -> &'static str {
        match self {
            Rule::Required => "required",
            Rule::Nullable => "nullable",
            Rule::Sometimes => "sometimes",
            Rule::Bail => "bail",
            Rule::String => "string",
            Rule::Integer => "integer",
            Rule::Numeric => "numeric",
            Rule::Boolean => "boolean",
            Rule::Array => "array",
            Rule::Email => "email",
            Rule::Url => "url",
            Rule::Uuid => "uuid",
            Rule::Min(_) => "min",
            Rule::Max(_) => "max",
            Rule::Between(_, _) => "between",
            Rule::Size(_) => "size",
            Rule::In(_) => "in",
            Rule::NotIn(_) => "not_in",
            Rule::DateFormat(_) => "date_format",
            Rule::Regex(_) => "regex",
            Rule::Confirmed => "confirmed",
            Rule::Same(_) => "same",
            Rule::Different(_) => "different",
        }
    }

    /// Implicit rules run even when the field is absent
    pub fn is_implicit(&self) -> bool {
        matches!(self, Rule::Required)
    }

    /// Markers change how other rules run but never fail themselves
    pub fn is_marker(&self) -> bool {
        matches!(self, Rule::Nullable | Rule::Sometimes | Rule::Bail)
    }

    /// Rules that make size rules compare numeric values
    pub fn is_numeric(&self) -> bool {
        matches!(self, Rule::Integer | Rule::Numeric)
    }
}

/// Parse all expressions of one field
pub fn parse_all(field: &str, expressions: &[String]) -> Result<Vec<Rule>, ValidationError> {
    expressions.iter().map(|e| Rule::parse(field, e)).collect()
}

/// Accept `/pattern/flags` as well as a bare pattern
fn parse_regex(raw: &str) -> Result<Regex, String> {
    let pattern = match raw.strip_prefix('/').and_then(|rest| rest.rsplit_once('/')) {
        Some((body, flags)) if flags.chars().all(|c| "imsux".contains(c)) => {
            // Patterns are always unicode aware
            let flags = flags.replace('u', "");
            if flags.is_empty() {
                body.to_string()
            } else {
                format!("(?{}){}", flags, body)
            }
        }
        _ => raw.to_string(),
    };
    Regex::new(&pattern).map_err(|e| e.to_string())
}
