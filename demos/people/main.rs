//! People API example
//!
//! This example demonstrates:
//! - Several form requests on one handler, validated in a single pass
//! - Handler signatures loaded from YAML (`forms.yaml`)
//! - A hand-written form request with preparation and authorization hooks
//! - Request tracing with `tower_http`
//!
//! Try it:
//!
//! ```text
//! curl -X POST localhost:3000/people -H 'content-type: application/json' \
//!   -d '{"name": " Ada ", "age": "36", "email": "ADA@EXAMPLE.COM"}'
//! curl -X POST localhost:3000/people -d 'name=Ada&age=x'
//! ```

use anyhow::Result;
use multiform::prelude::*;
use std::net::SocketAddr;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

form_request! {
    struct NameRequest => "name_request" {
        rules: { "name" => "required|string|between:2,60" },
        attributes: { "name" => "full name" },
    }
}

form_request! {
    struct AgeRequest => "age_request" {
        rules: { "age" => "required|integer|between:0,150" },
        messages: { "age.integer" => "Please give your age in whole years." },
    }
}

/// Contact details; blocked for requests flagged as coming from a bot
struct ContactRequest;

impl FormRequest for ContactRequest {
    fn from_request(_: &RequestSnapshot) -> Self {
        ContactRequest
    }

    fn rules(&self) -> Rules {
        Rules::new()
            .field("email", "required|email")
            .field("phone", "sometimes|regex:/^\\+?[0-9 ]{6,20}$/")
    }

    fn authorize(&self, request: &RequestSnapshot) -> bool {
        request.header("x-bot").is_none()
    }

    fn prepare_for_validation(&self, input: &mut InputData) -> Result<()> {
        Prepare::new()
            .trim("email")
            .lowercase("email")
            .empty_to_null("phone")
            .apply(input)
    }

    fn passed_validation(&self, input: &mut InputData) {
        tracing::info!(email = ?input.get("email"), "contact accepted");
    }

    fn name() -> &'static str {
        "contact_request"
    }
}

async fn store_person(
    Form(name): Form<NameRequest>,
    Form(age): Form<AgeRequest>,
    Form(contact): Form<ContactRequest>,
) -> axum::Json<Value> {
    axum::Json(json!({
        "person": {
            "name": name.all(),
            "age": age.all(),
            "contact": contact.all(),
        }
    }))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("people=info,multiform=debug,tower_http=info")),
        )
        .init();

    // Load configuration
    let config = MultiFormConfig::from_yaml_file(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/demos/people/forms.yaml"
    ))?;

    let mut registry = DescriptorRegistry::new();
    registry
        .register::<NameRequest>()
        .register::<AgeRequest>()
        .register::<ContactRequest>();
    registry.load_config(&config)?;
    let forms = FormRoutes::new(registry).with_config(&config);

    let app = Router::new()
        .route("/people", forms.bind("store_person", post(store_person)))
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    tracing::info!(%addr, "people demo listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
