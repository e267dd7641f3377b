//! Binding of axum routes to form request handlers

use axum::middleware;
use axum::routing::MethodRouter;
use std::sync::Arc;

use super::capture::{Capture, capture_invocation};
use super::registry::DescriptorRegistry;
use crate::config::{DEFAULT_BODY_LIMIT, MultiFormConfig};
use crate::core::discovery::Discovery;
use crate::core::validation::{FormServices, RuleValidator, StandardValidator};

/// Binds routes so that their `Form<T>` parameters are validated together
///
/// ```rust,ignore
/// let forms = FormRoutes::new(registry);
/// let app = Router::new().route("/people", forms.bind("store_person", post(store_person)));
/// ```
#[derive(Clone)]
pub struct FormRoutes {
    registry: Arc<DescriptorRegistry>,
    validator: Arc<dyn RuleValidator>,
    body_limit: usize,
}

impl FormRoutes {
    pub fn new(registry: DescriptorRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            validator: Arc::new(StandardValidator),
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    /// Use another validation backend
    pub fn with_validator(mut self, validator: impl RuleValidator + 'static) -> Self {
        self.validator = Arc::new(validator);
        self
    }

    pub fn with_body_limit(mut self, body_limit: usize) -> Self {
        self.body_limit = body_limit;
        self
    }

    /// Apply the request settings of a configuration
    pub fn with_config(self, config: &MultiFormConfig) -> Self {
        self.with_body_limit(config.body_limit())
    }

    pub fn registry(&self) -> &DescriptorRegistry {
        &self.registry
    }

    /// Attach the invocation capture to the method router of `handler`
    pub fn bind<S>(&self, handler: &str, route: MethodRouter<S>) -> MethodRouter<S>
    where
        S: Clone + Send + Sync + 'static,
    {
        let signature = self.registry.signature(handler);
        if signature.is_none() {
            tracing::warn!(handler, "binding handler without a registered form signature");
        }

        let discovery: Arc<dyn Discovery> = self.registry.clone();
        let capture = Capture {
            handler: Arc::from(handler),
            signature,
            services: FormServices::new(discovery, Arc::clone(&self.validator)),
            body_limit: self.body_limit,
        };
        route.route_layer(middleware::from_fn_with_state(capture, capture_invocation))
    }
}
