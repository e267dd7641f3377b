//! Core module containing the form request model and the validation coordinator

pub mod coordinator;
pub mod discovery;
pub mod error;
pub mod form;
pub mod merger;
pub mod request;
pub mod validation;

pub use coordinator::{Coordinator, InvocationState, RecordedOutcome};
pub use discovery::{Discovery, HandlerSignature, InvocationContext, Parameter, SignatureDiscovery};
pub use error::{MultiFormError, MultiFormResult};
pub use form::{Attributes, DescriptorType, DynForm, FormInstance, FormRequest, Messages, Rules};
pub use merger::{MergedValidationSpec, merge};
pub use request::{InputData, RequestSnapshot, UploadedFile};
