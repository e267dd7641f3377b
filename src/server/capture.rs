//! Route middleware capturing the inbound request for form requests
//!
//! The body is buffered once, decoded into a [`RequestSnapshot`] and
//! re-attached to the request so that other extractors still see it.

use axum::body::{Body, Bytes, to_bytes};
use axum::extract::{FromRequest, FromRequestParts, Multipart, Query, RawPathParams, Request, State};
use axum::http::header::{CONTENT_TYPE, COOKIE};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::Instrument;

use crate::core::coordinator::InvocationState;
use crate::core::discovery::{HandlerSignature, InvocationContext};
use crate::core::error::{MultiFormError, RequestError};
use crate::core::request::{InputData, RequestSnapshot, UploadedFile};
use crate::core::validation::FormServices;

/// Per-route settings of the capture middleware
#[derive(Clone)]
pub(crate) struct Capture {
    pub handler: Arc<str>,
    pub signature: Option<Arc<HandlerSignature>>,
    pub services: FormServices,
    pub body_limit: usize,
}

pub(crate) async fn capture_invocation(
    State(capture): State<Capture>,
    request: Request,
    next: Next,
) -> Response {
    let (mut parts, body) = request.into_parts();
    let bytes = match to_bytes(body, capture.body_limit).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::debug!(error = %e, "failed to buffer request body");
            return MultiFormError::from(RequestError::InvalidBody {
                message: e.to_string(),
            })
            .into_response();
        }
    };

    let snapshot = match snapshot(&mut parts, bytes.clone()).await {
        Ok(snapshot) => snapshot,
        Err(e) => {
            tracing::debug!(error = %e, "failed to decode request");
            return e.into_response();
        }
    };

    let mut context = InvocationContext::new(capture.handler.as_ref());
    if let Some(signature) = &capture.signature {
        context = context.with_signature(Arc::clone(signature));
    }
    let span = tracing::debug_span!(
        "invocation",
        id = %context.id,
        handler = %context.handler
    );

    parts.extensions.insert(Arc::new(snapshot));
    parts.extensions.insert(context);
    parts.extensions.insert(capture.services.clone());
    parts.extensions.insert(InvocationState::new());

    next.run(Request::from_parts(parts, Body::from(bytes)))
        .instrument(span)
        .await
}

/// Decode everything form requests may read from the request
pub(crate) async fn snapshot(parts: &mut Parts, bytes: Bytes) -> Result<RequestSnapshot, MultiFormError> {
    let mut snapshot = RequestSnapshot::new()
        .with_method(parts.method.clone())
        .with_path(parts.uri.path())
        .with_query(Value::Object(query(parts)?))
        .with_headers(parts.headers.clone());

    for (name, value) in cookies(parts) {
        snapshot = snapshot.with_cookie(name, value);
    }
    if let Ok(params) = RawPathParams::from_request_parts(parts, &()).await {
        for (name, value) in params.iter() {
            snapshot = snapshot.with_route_param(name, value);
        }
    }

    let content_type = parts
        .headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_ascii_lowercase();

    if bytes.is_empty() {
        return Ok(snapshot);
    }

    if content_type.starts_with("application/json") || content_type.contains("+json") {
        let body: Value = serde_json::from_slice(&bytes).map_err(|e| RequestError::InvalidBody {
            message: e.to_string(),
        })?;
        if !body.is_object() {
            return Err(RequestError::InvalidBody {
                message: "JSON body must be an object".to_string(),
            }
            .into());
        }
        snapshot = snapshot.with_body(body);
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        let request = rebuild(parts, bytes.clone())?;
        let axum::Form(pairs) = axum::Form::<Vec<(String, String)>>::from_request(request, &())
            .await
            .map_err(|e| RequestError::InvalidBody {
                message: e.body_text(),
            })?;
        snapshot = snapshot.with_body(Value::Object(fields(pairs)));
    } else if content_type.starts_with("multipart/form-data") {
        let request = rebuild(parts, bytes.clone())?;
        let (body, files) = multipart(request).await?;
        snapshot = snapshot.with_body(Value::Object(body));
        for file in files {
            snapshot = snapshot.with_file(file);
        }
    }

    Ok(snapshot.with_content(bytes))
}

fn query(parts: &Parts) -> Result<Map<String, Value>, MultiFormError> {
    let Query(pairs) = Query::<Vec<(String, String)>>::try_from_uri(&parts.uri).map_err(|e| {
        RequestError::InvalidQuery {
            message: e.body_text(),
        }
    })?;
    Ok(fields(pairs))
}

fn cookies(parts: &Parts) -> Vec<(String, String)> {
    parts
        .headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|header| header.split(';'))
        .filter_map(|pair| pair.split_once('='))
        .map(|(name, value)| (name.trim().to_string(), value.trim().to_string()))
        .filter(|(name, _)| !name.is_empty())
        .collect()
}

/// A standalone request carrying the buffered body, for body extractors
fn rebuild(parts: &Parts, bytes: Bytes) -> Result<Request, MultiFormError> {
    let mut builder = Request::builder()
        .method(parts.method.clone())
        .uri(parts.uri.clone());
    if let Some(headers) = builder.headers_mut() {
        headers.extend(parts.headers.clone());
    }
    builder
        .body(Body::from(bytes))
        .map_err(|e| MultiFormError::Internal(e.to_string()))
}

async fn multipart(request: Request) -> Result<(Map<String, Value>, Vec<UploadedFile>), MultiFormError> {
    let invalid = |message: String| RequestError::InvalidBody { message };
    let mut multipart = Multipart::from_request(request, &())
        .await
        .map_err(|e| invalid(e.body_text()))?;

    let mut pairs = Vec::new();
    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| invalid(e.body_text()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);

        match file_name {
            Some(file_name) => {
                let bytes = field.bytes().await.map_err(|e| invalid(e.body_text()))?;
                let mut file = UploadedFile::new(name, bytes).with_file_name(file_name);
                if let Some(content_type) = content_type {
                    file = file.with_content_type(content_type);
                }
                files.push(file);
            }
            None => {
                let text = field.text().await.map_err(|e| invalid(e.body_text()))?;
                pairs.push((name, text));
            }
        }
    }
    Ok((fields(pairs), files))
}

/// Build a field map from decoded pairs
///
/// `tags[]` keys collect into arrays and `user[name]` keys nest; for any
/// other repeated key the last value wins.
fn fields(pairs: Vec<(String, String)>) -> Map<String, Value> {
    let mut data = InputData::new();
    for (key, value) in pairs {
        let (key, push) = match key.strip_suffix("[]") {
            Some(key) => (key, true),
            None => (key.as_str(), false),
        };
        let path = key.replace("][", ".").replace(['[', ']'], ".");
        let path = path.trim_end_matches('.');
        if path.is_empty() {
            continue;
        }

        let value = Value::String(value);
        if push {
            match data.get(path).cloned() {
                Some(Value::Array(mut items)) => {
                    items.push(value);
                    data.set(path, Value::Array(items));
                }
                _ => data.set(path, Value::Array(vec![value])),
            }
        } else {
            data.set(path, value);
        }
    }
    data.into_value().as_object().cloned().unwrap_or_default()
}
