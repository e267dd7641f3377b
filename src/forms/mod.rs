//! Declarative form requests

pub mod macros;
