//! Form requests: the validation units a handler declares as parameters
//!
//! A form request describes one slice of a request: its rules, custom
//! messages, attribute labels, an authorization check and optional data
//! preparation. Several of them can be declared on the same handler; the
//! coordinator merges them into a single validation pass.

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::any::TypeId;
use std::fmt;
use std::sync::Arc;

use super::error::{MultiFormError, PreparationError, ValidationError};
use super::request::{InputData, RequestSnapshot};
use super::validation::FieldErrors;

/// Custom messages, keyed by `field.rule` or `rule`
pub type Messages = IndexMap<String, String>;

/// Display names for fields, keyed by field path
pub type Attributes = IndexMap<String, String>;

/// Ordered rule set: field path -> rule expressions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Rules(IndexMap<String, Vec<String>>);

impl Rules {
    pub fn new() -> Self {
        Self(IndexMap::new())
    }

    /// Add rules from a pipe separated expression (`"required|integer"`)
    pub fn field(mut self, path: impl Into<String>, rules: &str) -> Self {
        let rules = rules
            .split('|')
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(str::to_string)
            .collect();
        self.0.insert(path.into(), rules);
        self
    }

    /// Add rules one by one, needed when a rule contains `|` (`regex:/a|b/`)
    pub fn field_rules<I, S>(mut self, path: impl Into<String>, rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.0
            .insert(path.into(), rules.into_iter().map(Into::into).collect());
        self
    }

    /// Insert or replace the rules of one field
    pub fn insert(&mut self, path: impl Into<String>, rules: Vec<String>) {
        self.0.insert(path.into(), rules);
    }

    pub fn get(&self, path: &str) -> Option<&[String]> {
        self.0.get(path).map(Vec::as_slice)
    }

    /// Field paths in declaration order
    pub fn fields(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }

    /// Field paths plus the fields cross-field rules compare against
    ///
    /// `confirmed` on `password` adds `password_confirmation`, `same:x` and
    /// `different:x` add `x`.
    pub fn data_fields(&self) -> Vec<String> {
        let mut fields: Vec<String> = self.0.keys().cloned().collect();
        for (field, expressions) in &self.0 {
            for expression in expressions {
                let referenced = match expression.split_once(':') {
                    Some(("same" | "different", other)) => other.trim().to_string(),
                    None if expression == "confirmed" => format!("{}_confirmation", field),
                    _ => continue,
                };
                if !referenced.is_empty() && !fields.contains(&referenced) {
                    fields.push(referenced);
                }
            }
        }
        fields
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.0.iter()
    }

    /// Merge another rule set; `other` wins on shared fields
    pub fn extend(&mut self, other: Rules) {
        self.0.extend(other.0);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A validation unit attached to one handler parameter
///
/// # Example
///
/// ```rust,ignore
/// struct AgeRequest;
///
/// impl FormRequest for AgeRequest {
///     fn from_request(_: &RequestSnapshot) -> Self {
///         AgeRequest
///     }
///
///     fn rules(&self) -> Rules {
///         Rules::new().field("age", "required|integer")
///     }
/// }
/// ```
pub trait FormRequest: Sized + Send + Sync + 'static {
    /// Build a fresh instance for the given request
    fn from_request(request: &RequestSnapshot) -> Self;

    fn rules(&self) -> Rules;

    fn messages(&self) -> Messages {
        Messages::new()
    }

    fn attributes(&self) -> Attributes {
        Attributes::new()
    }

    /// Whether the request may proceed
    fn authorize(&self, request: &RequestSnapshot) -> bool {
        let _ = request;
        true
    }

    /// Adjust the input before validation
    fn prepare_for_validation(&self, input: &mut InputData) -> anyhow::Result<()> {
        let _ = input;
        Ok(())
    }

    /// Called once the merged validation passed
    fn passed_validation(&self, input: &mut InputData) {
        let _ = input;
    }

    /// Called with the complete error set when the merged validation failed
    fn failed_validation(&self, errors: &FieldErrors) {
        let _ = errors;
    }

    /// Identity used in logs, errors and configuration files
    fn name() -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Type-erased form request instance, used for siblings built by the coordinator
pub trait DynForm: Send + Sync {
    fn descriptor(&self) -> DescriptorType;

    fn rules(&self) -> Rules;

    fn messages(&self) -> Messages;

    fn attributes(&self) -> Attributes;

    fn authorize(&self) -> bool;

    /// Run the preparation hook, then keep only the fields named by the rules
    fn prepare(&mut self) -> Result<(), PreparationError>;

    fn data(&self) -> &InputData;

    fn replace(&mut self, data: InputData);

    fn passed(&mut self);

    fn failed(&self, errors: &FieldErrors);
}

/// Handle on a form request type
#[derive(Clone, Copy)]
pub struct DescriptorType {
    id: TypeId,
    name: fn() -> &'static str,
    construct: fn(Arc<RequestSnapshot>) -> Box<dyn DynForm>,
}

impl DescriptorType {
    pub fn of<T: FormRequest>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: T::name,
            construct: construct_boxed::<T>,
        }
    }

    pub fn name(&self) -> &'static str {
        (self.name)()
    }

    pub fn type_id(&self) -> TypeId {
        self.id
    }

    pub fn is<T: FormRequest>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }

    /// Construct a fresh, unprepared instance seeded with `snapshot`
    pub fn construct(&self, snapshot: Arc<RequestSnapshot>) -> Box<dyn DynForm> {
        (self.construct)(snapshot)
    }
}

impl PartialEq for DescriptorType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for DescriptorType {}

impl fmt::Debug for DescriptorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("DescriptorType").field(&self.name()).finish()
    }
}

fn construct_boxed<T: FormRequest>(snapshot: Arc<RequestSnapshot>) -> Box<dyn DynForm> {
    Box::new(FormInstance::<T>::new(snapshot))
}

/// One form request bound to the current invocation
pub struct FormInstance<T: FormRequest> {
    form: T,
    data: InputData,
    snapshot: Arc<RequestSnapshot>,
    discovered: Vec<DescriptorType>,
}

impl<T: FormRequest> FormInstance<T> {
    /// Build an instance holding every input of the request
    pub fn new(snapshot: Arc<RequestSnapshot>) -> Self {
        let form = T::from_request(&snapshot);
        let data = snapshot.all();
        Self {
            form,
            data,
            snapshot,
            discovered: Vec::new(),
        }
    }

    /// The form request value itself
    pub fn form(&self) -> &T {
        &self.form
    }

    /// Current data of this form request
    pub fn all(&self) -> &InputData {
        &self.data
    }

    pub fn input(&self, path: &str) -> Option<&Value> {
        self.data.get(path)
    }

    pub fn has(&self, path: &str) -> bool {
        self.data.contains(path)
    }

    pub fn only<I, S>(&self, paths: I) -> InputData
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.data.only(paths)
    }

    /// Deserialize the data into a typed payload
    pub fn deserialize<D: DeserializeOwned>(&self) -> Result<D, MultiFormError> {
        serde_json::from_value(self.data.clone().into_value()).map_err(|e| {
            ValidationError::InvalidData {
                message: e.to_string(),
            }
            .into()
        })
    }

    pub fn into_data(self) -> InputData {
        self.data
    }

    /// The raw request this instance was built from
    pub fn request(&self) -> &RequestSnapshot {
        &self.snapshot
    }

    /// Every form request type declared by the handler, in declaration order
    pub fn discovered(&self) -> &[DescriptorType] {
        &self.discovered
    }

    /// The other form request types declared by the handler
    pub fn siblings(&self) -> Vec<DescriptorType> {
        let own = DescriptorType::of::<T>();
        self.discovered
            .iter()
            .copied()
            .filter(|d| *d != own)
            .collect()
    }

    pub(crate) fn set_discovered(&mut self, discovered: Vec<DescriptorType>) {
        self.discovered = discovered;
    }
}

impl<T: FormRequest> fmt::Debug for FormInstance<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormInstance")
            .field("form", &T::name())
            .field("data", &self.data)
            .finish()
    }
}

impl<T: FormRequest> DynForm for FormInstance<T> {
    fn descriptor(&self) -> DescriptorType {
        DescriptorType::of::<T>()
    }

    fn rules(&self) -> Rules {
        self.form.rules()
    }

    fn messages(&self) -> Messages {
        self.form.messages()
    }

    fn attributes(&self) -> Attributes {
        self.form.attributes()
    }

    fn authorize(&self) -> bool {
        self.form.authorize(&self.snapshot)
    }

    fn prepare(&mut self) -> Result<(), PreparationError> {
        self.form
            .prepare_for_validation(&mut self.data)
            .map_err(|e| PreparationError::HookFailed {
                descriptor: T::name().to_string(),
                message: format!("{:#}", e),
            })?;
        self.data = self.data.only(self.form.rules().data_fields());
        Ok(())
    }

    fn data(&self) -> &InputData {
        &self.data
    }

    fn replace(&mut self, data: InputData) {
        self.data = data;
    }

    fn passed(&mut self) {
        self.form.passed_validation(&mut self.data);
    }

    fn failed(&self, errors: &FieldErrors) {
        self.form.failed_validation(errors);
    }
}
