//! Descriptor registry: form request types and handler signatures

use indexmap::IndexMap;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::config::MultiFormConfig;
use crate::core::discovery::{Discovery, HandlerSignature, InvocationContext};
use crate::core::error::{DiscoveryError, MultiFormResult};
use crate::core::form::{DescriptorType, FormRequest};

/// Registry for the form requests of an application
///
/// Form request types are registered by name so that handler signatures can
/// be declared in configuration files; signatures can also be declared in
/// code with [`HandlerSignature`].
#[derive(Debug, Default)]
pub struct DescriptorRegistry {
    descriptors: IndexMap<String, DescriptorType>,
    handlers: HashMap<String, Arc<HandlerSignature>>,
    /// Names claimed by more than one type
    conflicts: HashSet<String>,
}

impl DescriptorRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a form request type under its name
    ///
    /// The first type registered under a name keeps it. A different type
    /// claiming the same name is logged, and configuration entries using
    /// that name are rejected by [`load_config`](Self::load_config).
    pub fn register<T: FormRequest>(&mut self) -> &mut Self {
        self.insert(DescriptorType::of::<T>());
        self
    }

    /// Declare the signature of a handler; registers its form request types too
    pub fn handler(&mut self, signature: HandlerSignature) -> &mut Self {
        for descriptor in signature.descriptors() {
            self.insert(descriptor);
        }
        self.handlers
            .insert(signature.handler().to_string(), Arc::new(signature));
        self
    }

    /// Declare the handlers listed in a configuration
    ///
    /// Every form request name must already be registered.
    pub fn load_config(&mut self, config: &MultiFormConfig) -> MultiFormResult<()> {
        for (handler, names) in &config.handlers {
            let mut signature = HandlerSignature::new(handler.clone());
            for name in names {
                if self.conflicts.contains(name) {
                    return Err(DiscoveryError::AmbiguousDescriptor {
                        handler: handler.clone(),
                        descriptor: name.clone(),
                    }
                    .into());
                }
                let descriptor = self.descriptor(name).ok_or_else(|| {
                    DiscoveryError::UnknownDescriptor {
                        handler: handler.clone(),
                        descriptor: name.clone(),
                    }
                })?;
                signature = signature.descriptor(descriptor);
            }
            tracing::debug!(handler = %handler, forms = names.len(), "loaded handler signature");
            self.handlers.insert(handler.clone(), Arc::new(signature));
        }
        Ok(())
    }

    fn insert(&mut self, descriptor: DescriptorType) {
        match self.descriptors.get(descriptor.name()) {
            Some(existing) if *existing == descriptor => {}
            Some(_) => {
                tracing::warn!(
                    descriptor = descriptor.name(),
                    "form request name already registered by another type"
                );
                self.conflicts.insert(descriptor.name().to_string());
            }
            None => {
                self.descriptors
                    .insert(descriptor.name().to_string(), descriptor);
            }
        }
    }

    pub fn descriptor(&self, name: &str) -> Option<DescriptorType> {
        self.descriptors.get(name).copied()
    }

    pub fn signature(&self, handler: &str) -> Option<Arc<HandlerSignature>> {
        self.handlers.get(handler).cloned()
    }

    /// Names of all registered form request types
    pub fn descriptor_names(&self) -> Vec<&str> {
        self.descriptors.keys().map(String::as_str).collect()
    }

    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }
}

impl Discovery for DescriptorRegistry {
    fn discover(&self, context: &InvocationContext) -> Result<Vec<DescriptorType>, DiscoveryError> {
        if let Some(signature) = &context.signature {
            return Ok(signature.descriptors());
        }
        self.handlers
            .get(&context.handler)
            .map(|signature| signature.descriptors())
            .ok_or_else(|| DiscoveryError::UnknownHandler {
                handler: context.handler.clone(),
            })
    }
}
