//! Tests for the typed error handling system
//!
//! These tests verify that:
//! - Errors return correct HTTP status codes
//! - Error responses are properly formatted
//! - Error conversions work correctly
//! - Error matching allows clients to handle specific cases

use axum::body::to_bytes;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use multiform::core::error::{ConfigError, RequestError};
use multiform::prelude::*;

fn field_errors(field: &str, message: &str) -> FieldErrors {
    let mut errors = FieldErrors::new();
    errors.insert(field.to_string(), vec![message.to_string()]);
    errors
}

// =============================================================================
// HTTP Status Code Tests
// =============================================================================

mod status_code_tests {
    use super::*;

    #[test]
    fn test_validation_failed_returns_422() {
        let err = MultiFormError::Validation(ValidationError::Failed(field_errors(
            "age",
            "The age must be an integer.",
        )));
        assert_eq!(err.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[test]
    fn test_authorization_denied_returns_403() {
        let err = MultiFormError::Authorization(AuthorizationError::Denied {
            descriptor: "admin_request".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_discovery_errors_return_500() {
        let errors = [
            DiscoveryError::MissingContext {
                descriptor: "name_request".to_string(),
            },
            DiscoveryError::UnknownHandler {
                handler: "store".to_string(),
            },
            DiscoveryError::UnknownDescriptor {
                handler: "store".to_string(),
                descriptor: "ghost".to_string(),
            },
            DiscoveryError::AmbiguousDescriptor {
                handler: "store".to_string(),
                descriptor: "name_request".to_string(),
            },
            DiscoveryError::UndeclaredDescriptor {
                handler: "store".to_string(),
                descriptor: "age_request".to_string(),
            },
        ];
        for err in errors {
            let err = MultiFormError::Discovery(err);
            assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        }
    }

    #[test]
    fn test_invalid_data_returns_400() {
        let err = MultiFormError::Validation(ValidationError::InvalidData {
            message: "missing field `name`".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_preparation_error_returns_500() {
        let err = MultiFormError::Preparation(PreparationError::HookFailed {
            descriptor: "slug_request".to_string(),
            message: "cannot derive slug".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_request_errors_return_400() {
        let err = MultiFormError::Request(RequestError::InvalidQuery {
            message: "bad encoding".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_config_error_returns_500() {
        let err = MultiFormError::Config(ConfigError::IoError {
            message: "permission denied".to_string(),
        });
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}

// =============================================================================
// Error Code Tests
// =============================================================================

mod error_code_tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let cases: Vec<(MultiFormError, &str)> = vec![
            (
                ValidationError::Failed(FieldErrors::new()).into(),
                "VALIDATION_FAILED",
            ),
            (
                ValidationError::UnknownRule {
                    field: "age".to_string(),
                    rule: "prime".to_string(),
                }
                .into(),
                "INVALID_RULE",
            ),
            (
                AuthorizationError::Denied {
                    descriptor: "x".to_string(),
                }
                .into(),
                "UNAUTHORIZED_FORM_REQUEST",
            ),
            (
                DiscoveryError::UnknownHandler {
                    handler: "h".to_string(),
                }
                .into(),
                "DISCOVERY_ERROR",
            ),
            (
                RequestError::InvalidBody {
                    message: "eof".to_string(),
                }
                .into(),
                "INVALID_BODY",
            ),
            (MultiFormError::Internal("boom".to_string()), "INTERNAL_ERROR"),
        ];

        for (err, code) in cases {
            assert_eq!(err.error_code(), code, "wrong code for {}", err);
        }
    }
}

// =============================================================================
// Error Response Tests
// =============================================================================

mod error_response_tests {
    use super::*;

    #[test]
    fn test_error_response_has_code_and_message() {
        let err = MultiFormError::Discovery(DiscoveryError::UnknownHandler {
            handler: "store_person".to_string(),
        });

        let response = err.to_response();

        assert_eq!(response.code, "DISCOVERY_ERROR");
        assert!(response.message.contains("store_person"));
        assert!(response.details.is_none());
    }

    #[test]
    fn test_validation_errors_include_field_details() {
        let err = MultiFormError::Validation(ValidationError::Failed(field_errors(
            "email",
            "The email must be a valid email address.",
        )));

        let response = err.to_response();

        let details = response.details.expect("details");
        assert_eq!(
            details["fields"]["email"],
            json!(["The email must be a valid email address."])
        );
    }

    #[test]
    fn test_authorization_response_does_not_leak_descriptor() {
        let err = MultiFormError::Authorization(AuthorizationError::Denied {
            descriptor: "internal_audit_request".to_string(),
        });

        let response = err.to_response();

        assert_eq!(response.message, "This action is unauthorized.");
        assert!(response.details.is_none());
    }
}

// =============================================================================
// Error Conversion Tests
// =============================================================================

mod error_conversion_tests {
    use super::*;

    #[test]
    fn test_serde_json_error_converts_to_invalid_data() {
        let json_err = serde_json::from_str::<Value>("{oops").unwrap_err();
        let err: MultiFormError = json_err.into();
        assert!(matches!(
            err,
            MultiFormError::Validation(ValidationError::InvalidData { .. })
        ));
    }

    #[test]
    fn test_yaml_error_converts_to_config_error() {
        let yaml_err = serde_yaml::from_str::<Value>("a: [").unwrap_err();
        let err: MultiFormError = yaml_err.into();
        assert!(matches!(
            err,
            MultiFormError::Config(ConfigError::ParseError { file: None, .. })
        ));
    }

    #[test]
    fn test_anyhow_error_converts_to_internal() {
        let err: MultiFormError = anyhow::anyhow!("outer")
            .context("context")
            .into();
        match err {
            MultiFormError::Internal(message) => {
                assert!(message.contains("context"));
                assert!(message.contains("outer"));
            }
            other => panic!("Expected Internal, got {:?}", other),
        }
    }
}

// =============================================================================
// Error Matching Tests
// =============================================================================

mod error_matching_tests {
    use super::*;

    #[test]
    fn test_can_match_validation_failures() {
        let err = MultiFormError::Validation(ValidationError::Failed(field_errors(
            "age",
            "The age must be an integer.",
        )));

        match &err {
            MultiFormError::Validation(ValidationError::Failed(errors)) => {
                assert!(errors.contains_key("age"));
            }
            _ => panic!("Expected validation failure"),
        }
        assert_eq!(err.field_errors().map(|e| e.len()), Some(1));
    }

    #[test]
    fn test_can_match_discovery_errors() {
        let err = MultiFormError::Discovery(DiscoveryError::UndeclaredDescriptor {
            handler: "store".to_string(),
            descriptor: "age_request".to_string(),
        });

        match err {
            MultiFormError::Discovery(DiscoveryError::UndeclaredDescriptor {
                handler,
                descriptor,
            }) => {
                assert_eq!(handler, "store");
                assert_eq!(descriptor, "age_request");
            }
            other => panic!("Expected UndeclaredDescriptor, got {:?}", other),
        }
    }
}

// =============================================================================
// IntoResponse Tests
// =============================================================================

mod into_response_tests {
    use super::*;

    #[tokio::test]
    async fn test_validation_failure_into_response() {
        let err = MultiFormError::Validation(ValidationError::Failed(field_errors(
            "age",
            "The age must be an integer.",
        )));

        let response = err.into_response();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let body: Value = serde_json::from_slice(&bytes).expect("json body");
        assert_eq!(body["code"], "VALIDATION_FAILED");
        assert_eq!(body["details"]["fields"]["age"][0], "The age must be an integer.");
    }

    #[test]
    fn test_authorization_into_response_status() {
        let err = MultiFormError::Authorization(AuthorizationError::Denied {
            descriptor: "admin_request".to_string(),
        });

        let response = err.into_response();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
