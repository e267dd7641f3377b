//! Typed error handling for multiform-rs
//!
//! Every failure the coordinator can produce is one variant of
//! [`MultiFormError`], so a rejected `Form<T>` extractor renders a consistent
//! JSON body and status code, and library users can match on the exact cause.
//!
//! # Error Categories
//!
//! - [`DiscoveryError`]: the handler's form parameters could not be resolved
//! - [`AuthorizationError`]: a participating form request denied access
//! - [`ValidationError`]: the merged rules rejected the merged data
//! - [`PreparationError`]: a form request's preparation hook failed
//! - [`ConfigError`]: configuration parsing errors
//! - [`RequestError`]: the inbound request could not be captured
//!
//! # Example
//!
//! ```rust,ignore
//! match coordinator.resolve::<NameRequest>(&context, &snapshot, &mut state) {
//!     Ok(form) => println!("name = {:?}", form.input("name")),
//!     Err(MultiFormError::Validation(ValidationError::Failed(errors))) => {
//!         println!("{} invalid fields", errors.len());
//!     }
//!     Err(e) => eprintln!("Other error: {}", e),
//! }
//! ```

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::fmt;

use super::validation::FieldErrors;

/// The main error type for multiform-rs
#[derive(Debug)]
pub enum MultiFormError {
    /// Handler metadata could not be resolved
    Discovery(DiscoveryError),

    /// A form request denied access
    Authorization(AuthorizationError),

    /// Validation errors
    Validation(ValidationError),

    /// A preparation hook failed
    Preparation(PreparationError),

    /// Configuration errors
    Config(ConfigError),

    /// Request capture errors
    Request(RequestError),

    /// Internal errors (should not happen in normal operation)
    Internal(String),
}

impl fmt::Display for MultiFormError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MultiFormError::Discovery(e) => write!(f, "{}", e),
            MultiFormError::Authorization(e) => write!(f, "{}", e),
            MultiFormError::Validation(e) => write!(f, "{}", e),
            MultiFormError::Preparation(e) => write!(f, "{}", e),
            MultiFormError::Config(e) => write!(f, "{}", e),
            MultiFormError::Request(e) => write!(f, "{}", e),
            MultiFormError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for MultiFormError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MultiFormError::Discovery(e) => Some(e),
            MultiFormError::Authorization(e) => Some(e),
            MultiFormError::Validation(e) => Some(e),
            MultiFormError::Preparation(e) => Some(e),
            MultiFormError::Config(e) => Some(e),
            MultiFormError::Request(e) => Some(e),
            MultiFormError::Internal(_) => None,
        }
    }
}

/// Error response structure for HTTP responses
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error code for programmatic handling
    pub code: String,
    /// Human-readable error message
    pub message: String,
    /// Optional additional details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl MultiFormError {
    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            MultiFormError::Discovery(_) => StatusCode::INTERNAL_SERVER_ERROR,
            MultiFormError::Authorization(_) => StatusCode::FORBIDDEN,
            MultiFormError::Validation(e) => e.status_code(),
            MultiFormError::Preparation(_) => StatusCode::INTERNAL_SERVER_ERROR,
            MultiFormError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
            MultiFormError::Request(e) => e.status_code(),
            MultiFormError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code for this error
    pub fn error_code(&self) -> &'static str {
        match self {
            MultiFormError::Discovery(_) => "DISCOVERY_ERROR",
            MultiFormError::Authorization(_) => "UNAUTHORIZED_FORM_REQUEST",
            MultiFormError::Validation(e) => e.error_code(),
            MultiFormError::Preparation(_) => "PREPARATION_FAILED",
            MultiFormError::Config(_) => "CONFIG_ERROR",
            MultiFormError::Request(e) => e.error_code(),
            MultiFormError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Convert to an error response
    pub fn to_response(&self) -> ErrorResponse {
        ErrorResponse {
            code: self.error_code().to_string(),
            message: self.to_string(),
            details: self.details(),
        }
    }

    /// Field errors when this is a failed validation
    pub fn field_errors(&self) -> Option<&FieldErrors> {
        match self {
            MultiFormError::Validation(ValidationError::Failed(errors)) => Some(errors),
            _ => None,
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match self {
            MultiFormError::Validation(ValidationError::Failed(errors)) => {
                Some(serde_json::json!({ "fields": errors }))
            }
            MultiFormError::Validation(ValidationError::UnknownRule { field, rule })
            | MultiFormError::Validation(ValidationError::InvalidRule { field, rule, .. }) => {
                Some(serde_json::json!({ "field": field, "rule": rule }))
            }
            _ => None,
        }
    }
}

impl IntoResponse for MultiFormError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = Json(self.to_response());
        (status, body).into_response()
    }
}

// =============================================================================
// Discovery Errors
// =============================================================================

/// Errors raised while resolving the form parameters of a handler
#[derive(Debug)]
pub enum DiscoveryError {
    /// The route was not bound through `FormRoutes`, so no invocation data exists
    MissingContext {
        descriptor: String,
    },

    /// No signature is registered for the handler
    UnknownHandler {
        handler: String,
    },

    /// A configuration entry names a form request that was never registered
    UnknownDescriptor {
        handler: String,
        descriptor: String,
    },

    /// A configuration entry names a form request registered by several types
    AmbiguousDescriptor {
        handler: String,
        descriptor: String,
    },

    /// A form request is extracted by a handler that does not declare it
    UndeclaredDescriptor {
        handler: String,
        descriptor: String,
    },
}

impl fmt::Display for DiscoveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscoveryError::MissingContext { descriptor } => {
                write!(
                    f,
                    "No invocation context available for '{}': bind the route with FormRoutes",
                    descriptor
                )
            }
            DiscoveryError::UnknownHandler { handler } => {
                write!(f, "No form signature registered for handler '{}'", handler)
            }
            DiscoveryError::UnknownDescriptor {
                handler,
                descriptor,
            } => {
                write!(
                    f,
                    "Handler '{}' declares unknown form request '{}'",
                    handler, descriptor
                )
            }
            DiscoveryError::AmbiguousDescriptor {
                handler,
                descriptor,
            } => {
                write!(
                    f,
                    "Handler '{}' declares form request '{}', which is registered by more than one type",
                    handler, descriptor
                )
            }
            DiscoveryError::UndeclaredDescriptor {
                handler,
                descriptor,
            } => {
                write!(
                    f,
                    "Form request '{}' is not declared in the signature of handler '{}'",
                    descriptor, handler
                )
            }
        }
    }
}

impl std::error::Error for DiscoveryError {}

impl From<DiscoveryError> for MultiFormError {
    fn from(err: DiscoveryError) -> Self {
        MultiFormError::Discovery(err)
    }
}

// =============================================================================
// Authorization Errors
// =============================================================================

/// Errors raised by the authorization gate
#[derive(Debug)]
pub enum AuthorizationError {
    /// The named form request refused the request
    Denied {
        descriptor: String,
    },
}

impl fmt::Display for AuthorizationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthorizationError::Denied { .. } => write!(f, "This action is unauthorized."),
        }
    }
}

impl std::error::Error for AuthorizationError {}

impl AuthorizationError {
    /// Name of the form request that denied access
    pub fn descriptor(&self) -> &str {
        match self {
            AuthorizationError::Denied { descriptor } => descriptor,
        }
    }
}

impl From<AuthorizationError> for MultiFormError {
    fn from(err: AuthorizationError) -> Self {
        MultiFormError::Authorization(err)
    }
}

// =============================================================================
// Validation Errors
// =============================================================================

/// Errors related to the merged validation pass
#[derive(Debug)]
pub enum ValidationError {
    /// The merged rules rejected the merged data
    Failed(FieldErrors),

    /// A rule name is not understood by the validator
    UnknownRule {
        field: String,
        rule: String,
    },

    /// A rule is known but its parameters are malformed
    InvalidRule {
        field: String,
        rule: String,
        message: String,
    },

    /// Validated data could not be converted to the requested type
    InvalidData {
        message: String,
    },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::Failed(errors) => {
                let msgs: Vec<String> = errors
                    .iter()
                    .flat_map(|(field, messages)| {
                        messages.iter().map(move |m| format!("{}: {}", field, m))
                    })
                    .collect();
                write!(f, "The given data was invalid: {}", msgs.join(", "))
            }
            ValidationError::UnknownRule { field, rule } => {
                write!(f, "Unknown validation rule '{}' on field '{}'", rule, field)
            }
            ValidationError::InvalidRule {
                field,
                rule,
                message,
            } => {
                write!(
                    f,
                    "Invalid validation rule '{}' on field '{}': {}",
                    rule, field, message
                )
            }
            ValidationError::InvalidData { message } => {
                write!(f, "Invalid data: {}", message)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

impl ValidationError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ValidationError::Failed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ValidationError::UnknownRule { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ValidationError::InvalidRule { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ValidationError::InvalidData { .. } => StatusCode::BAD_REQUEST,
        }
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            ValidationError::Failed(_) => "VALIDATION_FAILED",
            ValidationError::UnknownRule { .. } => "INVALID_RULE",
            ValidationError::InvalidRule { .. } => "INVALID_RULE",
            ValidationError::InvalidData { .. } => "INVALID_DATA",
        }
    }
}

impl From<ValidationError> for MultiFormError {
    fn from(err: ValidationError) -> Self {
        MultiFormError::Validation(err)
    }
}

// =============================================================================
// Preparation Errors
// =============================================================================

/// Errors raised by a form request's preparation hook
#[derive(Debug)]
pub enum PreparationError {
    HookFailed {
        descriptor: String,
        message: String,
    },
}

impl fmt::Display for PreparationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PreparationError::HookFailed {
                descriptor,
                message,
            } => {
                write!(f, "Failed to prepare '{}' for validation: {}", descriptor, message)
            }
        }
    }
}

impl std::error::Error for PreparationError {}

impl From<PreparationError> for MultiFormError {
    fn from(err: PreparationError) -> Self {
        MultiFormError::Preparation(err)
    }
}

// =============================================================================
// Config Errors
// =============================================================================

/// Errors related to configuration
#[derive(Debug)]
pub enum ConfigError {
    /// Failed to parse configuration file
    ParseError {
        file: Option<String>,
        message: String,
    },

    /// Invalid value in configuration
    InvalidValue {
        field: String,
        value: String,
        message: String,
    },

    /// Configuration file not found
    FileNotFound {
        path: String,
    },

    /// IO error while reading configuration
    IoError {
        message: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ParseError { file, message } => {
                if let Some(file) = file {
                    write!(f, "Failed to parse config file '{}': {}", file, message)
                } else {
                    write!(f, "Failed to parse config: {}", message)
                }
            }
            ConfigError::InvalidValue {
                field,
                value,
                message,
            } => {
                write!(
                    f,
                    "Invalid value '{}' for field '{}': {}",
                    value, field, message
                )
            }
            ConfigError::FileNotFound { path } => {
                write!(f, "Configuration file not found: {}", path)
            }
            ConfigError::IoError { message } => {
                write!(f, "IO error: {}", message)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for MultiFormError {
    fn from(err: ConfigError) -> Self {
        MultiFormError::Config(err)
    }
}

// =============================================================================
// Request Errors
// =============================================================================

/// Errors raised while capturing the inbound request
#[derive(Debug)]
pub enum RequestError {
    /// The body could not be read or decoded
    InvalidBody {
        message: String,
    },

    /// The query string could not be decoded
    InvalidQuery {
        message: String,
    },
}

impl fmt::Display for RequestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestError::InvalidBody { message } => {
                write!(f, "Invalid request body: {}", message)
            }
            RequestError::InvalidQuery { message } => {
                write!(f, "Invalid query string: {}", message)
            }
        }
    }
}

impl std::error::Error for RequestError {}

impl RequestError {
    pub fn status_code(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }

    pub fn error_code(&self) -> &'static str {
        match self {
            RequestError::InvalidBody { .. } => "INVALID_BODY",
            RequestError::InvalidQuery { .. } => "INVALID_QUERY",
        }
    }
}

impl From<RequestError> for MultiFormError {
    fn from(err: RequestError) -> Self {
        MultiFormError::Request(err)
    }
}

// =============================================================================
// Conversions from external errors
// =============================================================================

impl From<serde_json::Error> for MultiFormError {
    fn from(err: serde_json::Error) -> Self {
        MultiFormError::Validation(ValidationError::InvalidData {
            message: err.to_string(),
        })
    }
}

impl From<std::io::Error> for MultiFormError {
    fn from(err: std::io::Error) -> Self {
        MultiFormError::Config(ConfigError::IoError {
            message: err.to_string(),
        })
    }
}

impl From<serde_yaml::Error> for MultiFormError {
    fn from(err: serde_yaml::Error) -> Self {
        MultiFormError::Config(ConfigError::ParseError {
            file: None,
            message: err.to_string(),
        })
    }
}

impl From<anyhow::Error> for MultiFormError {
    fn from(err: anyhow::Error) -> Self {
        MultiFormError::Internal(format!("{:#}", err))
    }
}

// =============================================================================
// Result type alias
// =============================================================================

/// A specialized Result type for multiform-rs operations
pub type MultiFormResult<T> = Result<T, MultiFormError>;

// =============================================================================
// Tests
// =============================================================================
