//! Discovery of the form request parameters declared by a handler

use std::sync::Arc;
use uuid::Uuid;

use super::error::DiscoveryError;
use super::form::{DescriptorType, FormRequest};

/// One parameter of a handler signature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parameter {
    /// A form request parameter
    Form(DescriptorType),
    /// Anything else (state, path, headers...), ignored by discovery
    Other(&'static str),
}

/// Ordered parameter list of one handler
///
/// ```rust,ignore
/// let signature = HandlerSignature::new("store_person")
///     .other("State")
///     .form::<NameRequest>()
///     .form::<AgeRequest>();
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerSignature {
    handler: String,
    parameters: Vec<Parameter>,
}

impl HandlerSignature {
    pub fn new(handler: impl Into<String>) -> Self {
        Self {
            handler: handler.into(),
            parameters: Vec::new(),
        }
    }

    /// Append a form request parameter
    pub fn form<T: FormRequest>(self) -> Self {
        self.descriptor(DescriptorType::of::<T>())
    }

    pub fn descriptor(mut self, descriptor: DescriptorType) -> Self {
        self.parameters.push(Parameter::Form(descriptor));
        self
    }

    /// Append a parameter that is not a form request
    pub fn other(mut self, name: &'static str) -> Self {
        self.parameters.push(Parameter::Other(name));
        self
    }

    pub fn handler(&self) -> &str {
        &self.handler
    }

    pub fn parameters(&self) -> &[Parameter] {
        &self.parameters
    }

    /// Form request parameters in declaration order
    pub fn descriptors(&self) -> Vec<DescriptorType> {
        self.parameters
            .iter()
            .filter_map(|p| match p {
                Parameter::Form(descriptor) => Some(*descriptor),
                Parameter::Other(_) => None,
            })
            .collect()
    }
}

/// Read-only facts about the current handler invocation
#[derive(Debug, Clone)]
pub struct InvocationContext {
    pub id: Uuid,
    pub handler: String,
    pub signature: Option<Arc<HandlerSignature>>,
}

impl InvocationContext {
    /// Context for a new invocation with a fresh id
    pub fn new(handler: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            handler: handler.into(),
            signature: None,
        }
    }

    pub fn with_signature(mut self, signature: Arc<HandlerSignature>) -> Self {
        self.signature = Some(signature);
        self
    }
}

/// Resolves the form request types a handler declares
pub trait Discovery: Send + Sync {
    /// Every form request type of the handler, in declaration order
    fn discover(&self, context: &InvocationContext) -> Result<Vec<DescriptorType>, DiscoveryError>;
}

/// Discovery reading only the signature carried by the context
#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureDiscovery;

impl Discovery for SignatureDiscovery {
    fn discover(&self, context: &InvocationContext) -> Result<Vec<DescriptorType>, DiscoveryError> {
        context
            .signature
            .as_ref()
            .map(|signature| signature.descriptors())
            .ok_or_else(|| DiscoveryError::UnknownHandler {
                handler: context.handler.clone(),
            })
    }
}
