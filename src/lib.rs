//! # MultiForm-RS
//!
//! Composite form request validation for axum handlers.
//!
//! ## Features
//!
//! - **Form Requests**: rules, messages, attribute labels, authorization and
//!   preparation hooks bundled per request slice
//! - **Several per Handler**: every `Form<T>` parameter of a handler is
//!   validated in one combined pass, with a single error set
//! - **Scoped Data**: after validation each form request only sees the fields
//!   its own rules declare
//! - **Configuration-Based**: handler signatures can be declared in YAML
//! - **Pluggable Validation**: the built-in rule engine sits behind the
//!   `RuleValidator` trait
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use multiform::prelude::*;
//!
//! form_request! {
//!     pub struct NameRequest => "name_request" {
//!         rules: { "name" => "required|string" }
//!     }
//! }
//!
//! form_request! {
//!     pub struct AgeRequest => "age_request" {
//!         rules: { "age" => "required|integer" }
//!     }
//! }
//!
//! async fn store_person(Form(name): Form<NameRequest>, Form(age): Form<AgeRequest>) -> String {
//!     format!("{:?} {:?}", name.input("name"), age.input("age"))
//! }
//!
//! let mut registry = DescriptorRegistry::new();
//! registry.handler(
//!     HandlerSignature::new("store_person")
//!         .form::<NameRequest>()
//!         .form::<AgeRequest>(),
//! );
//! let forms = FormRoutes::new(registry);
//! let app: Router = Router::new().route("/people", forms.bind("store_person", post(store_person)));
//! ```

pub mod config;
pub mod core;
pub mod forms;
pub mod server;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Core Traits ===
    pub use crate::core::{
        coordinator::{Coordinator, InvocationState},
        discovery::{Discovery, HandlerSignature, InvocationContext, Parameter},
        form::{Attributes, DescriptorType, DynForm, FormInstance, FormRequest, Messages, Rules},
        merger::{MergedValidationSpec, merge},
        request::{InputData, RequestSnapshot, UploadedFile},
    };

    // === Validation ===
    pub use crate::core::validation::{
        FieldErrors, Form, Prepare, RuleValidator, StandardValidator, ValidationOutcome,
    };

    // === Errors ===
    pub use crate::core::error::{
        AuthorizationError, DiscoveryError, MultiFormError, MultiFormResult, PreparationError,
        ValidationError,
    };

    // === Macros ===
    pub use crate::form_request;

    // === Config ===
    pub use crate::config::MultiFormConfig;

    // === Server ===
    pub use crate::server::{DescriptorRegistry, FormRoutes};

    // === External dependencies ===
    pub use serde::{Deserialize, Serialize};
    pub use serde_json::{Value, json};

    // === Axum ===
    pub use axum::{
        Router,
        routing::{delete, get, patch, post, put},
    };
}
