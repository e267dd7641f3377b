//! Server glue: registry, route binding and request capture
//!
//! This module provides:
//! - `DescriptorRegistry` holding form request types and handler signatures
//! - `FormRoutes` binding handlers so their form requests are validated together
//! - the middleware capturing each request into a snapshot

mod capture;
pub mod registry;
pub mod router;

pub use registry::DescriptorRegistry;
pub use router::FormRoutes;
