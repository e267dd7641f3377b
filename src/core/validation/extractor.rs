//! Axum extractor for form requests
//!
//! `Form<T>` reads the invocation data that `capture_invocation` stored in
//! the request extensions and hands it to the [`Coordinator`]. The first
//! declared form request validates every form request of the handler in one
//! pass; the others reuse the recorded outcome.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use super::engine::RuleValidator;
use crate::core::coordinator::{Coordinator, InvocationState};
use crate::core::discovery::{Discovery, InvocationContext};
use crate::core::error::{DiscoveryError, MultiFormError};
use crate::core::form::{FormInstance, FormRequest};
use crate::core::request::RequestSnapshot;

/// Services shared by every invocation of a bound route
#[derive(Clone)]
pub struct FormServices {
    pub discovery: Arc<dyn Discovery>,
    pub validator: Arc<dyn RuleValidator>,
}

impl FormServices {
    pub fn new(discovery: Arc<dyn Discovery>, validator: Arc<dyn RuleValidator>) -> Self {
        Self {
            discovery,
            validator,
        }
    }
}

/// Axum extractor resolving a validated form request
///
/// # Usage
///
/// ```rust,ignore
/// async fn store(
///     Form(name): Form<NameRequest>,
///     Form(age): Form<AgeRequest>,
/// ) -> impl IntoResponse {
///     // both are validated together, each sees only its own fields
/// }
/// ```
pub struct Form<T: FormRequest>(pub FormInstance<T>);

impl<T: FormRequest> Form<T> {
    pub fn into_inner(self) -> FormInstance<T> {
        self.0
    }
}

impl<T: FormRequest> Deref for Form<T> {
    type Target = FormInstance<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T: FormRequest> DerefMut for Form<T> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}

impl<S, T> FromRequestParts<S> for Form<T>
where
    S: Send + Sync,
    T: FormRequest,
{
    type Rejection = MultiFormError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let missing = || DiscoveryError::MissingContext {
            descriptor: T::name().to_string(),
        };

        let context = parts
            .extensions
            .get::<InvocationContext>()
            .cloned()
            .ok_or_else(missing)?;
        let snapshot = parts
            .extensions
            .get::<Arc<RequestSnapshot>>()
            .cloned()
            .ok_or_else(missing)?;
        let services = parts
            .extensions
            .get::<FormServices>()
            .cloned()
            .ok_or_else(missing)?;

        let mut state = parts
            .extensions
            .remove::<InvocationState>()
            .unwrap_or_default();
        let coordinator = Coordinator::new(services.discovery.as_ref(), services.validator.as_ref());
        let result = coordinator.resolve::<T>(&context, &snapshot, &mut state);
        parts.extensions.insert(state);

        result.map(Form)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::discovery::{HandlerSignature, SignatureDiscovery};
    use crate::core::error::ValidationError;
    use crate::core::form::Rules;
    use crate::core::validation::StandardValidator;
    use axum::http::Request;
    use serde_json::json;

    struct NameRequest;
    struct AgeRequest;

    impl FormRequest for NameRequest {
        fn from_request(_: &RequestSnapshot) -> Self {
            NameRequest
        }

        fn rules(&self) -> Rules {
            Rules::new().field("name", "required")
        }
    }

    impl FormRequest for AgeRequest {
        fn from_request(_: &RequestSnapshot) -> Self {
            AgeRequest
        }

        fn rules(&self) -> Rules {
            Rules::new().field("age", "required|integer")
        }
    }

    fn parts(body: serde_json::Value) -> Parts {
        let (mut parts, _) = Request::builder()
            .uri("/people")
            .body(())
            .expect("request")
            .into_parts();
        let signature = HandlerSignature::new("store")
            .form::<NameRequest>()
            .form::<AgeRequest>();
        parts
            .extensions
            .insert(InvocationContext::new("store").with_signature(Arc::new(signature)));
        parts
            .extensions
            .insert(Arc::new(RequestSnapshot::new().with_body(body)));
        parts.extensions.insert(FormServices::new(
            Arc::new(SignatureDiscovery),
            Arc::new(StandardValidator),
        ));
        parts
    }

    #[tokio::test]
    async fn test_extractors_share_one_outcome() {
        let mut parts = parts(json!({"name": "A", "age": "5"}));

        let Form(name) = Form::<NameRequest>::from_request_parts(&mut parts, &())
            .await
            .expect("name");
        let Form(age) = Form::<AgeRequest>::from_request_parts(&mut parts, &())
            .await
            .expect("age");

        assert_eq!(name.all().clone().into_value(), json!({"name": "A"}));
        assert_eq!(age.all().clone().into_value(), json!({"age": "5"}));
        let state = parts
            .extensions
            .get::<InvocationState>()
            .expect("state kept");
        assert!(state.outcome().is_some_and(|r| r.outcome.passes()));
    }

    #[tokio::test]
    async fn test_extractor_rejects_invalid_input() {
        let mut parts = parts(json!({"name": "A", "age": "x"}));

        let result = Form::<NameRequest>::from_request_parts(&mut parts, &()).await;

        match result {
            Err(MultiFormError::Validation(ValidationError::Failed(errors))) => {
                assert_eq!(errors.keys().collect::<Vec<_>>(), vec!["age"]);
            }
            _ => panic!("Expected validation failure"),
        }
    }

    #[tokio::test]
    async fn test_extractor_without_context_fails() {
        let (mut parts, _) = Request::builder()
            .body(())
            .expect("request")
            .into_parts();

        let result = Form::<NameRequest>::from_request_parts(&mut parts, &()).await;

        assert!(matches!(
            result,
            Err(MultiFormError::Discovery(DiscoveryError::MissingContext { .. }))
        ));
    }
}
