//! Combined validation of every form request declared by a handler
//!
//! The first declared form request is canonical: its failure hook receives
//! the errors and its data has the lowest merge precedence. Whichever form
//! request is resolved first builds fresh instances of the other declared
//! types, authorizes and prepares all of them, merges them in declaration
//! order and runs a single validation pass. The outcome is recorded in
//! [`InvocationState`] so that the other form requests of the same invocation
//! reuse it instead of validating again.

use std::iter;
use std::sync::Arc;

use super::discovery::{Discovery, InvocationContext};
use super::error::{AuthorizationError, DiscoveryError, MultiFormError, ValidationError};
use super::form::{DescriptorType, DynForm, FormInstance, FormRequest};
use super::merger::merge;
use super::request::{InputData, RequestSnapshot};
use super::validation::{RuleValidator, ValidationOutcome};

/// Outcome of the validation pass of one invocation
#[derive(Debug, Clone)]
pub struct RecordedOutcome {
    /// Merged data the pass ran against
    pub data: InputData,
    pub outcome: ValidationOutcome,
}

/// Per-invocation bookkeeping shared by the extractors of one request
#[derive(Debug, Clone, Default)]
pub struct InvocationState {
    descriptors: Option<Vec<DescriptorType>>,
    outcome: Option<RecordedOutcome>,
}

impl InvocationState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Descriptor types discovered so far
    pub fn descriptors(&self) -> Option<&[DescriptorType]> {
        self.descriptors.as_deref()
    }

    /// The recorded validation outcome, once the first form request ran
    pub fn outcome(&self) -> Option<&RecordedOutcome> {
        self.outcome.as_ref()
    }
}

/// Resolves form request instances for one invocation
pub struct Coordinator<'a> {
    discovery: &'a dyn Discovery,
    validator: &'a dyn RuleValidator,
}

impl<'a> Coordinator<'a> {
    pub fn new(discovery: &'a dyn Discovery, validator: &'a dyn RuleValidator) -> Self {
        Self {
            discovery,
            validator,
        }
    }

    /// Build the validated instance of `T` for this invocation
    pub fn resolve<T: FormRequest>(
        &self,
        context: &InvocationContext,
        snapshot: &Arc<RequestSnapshot>,
        state: &mut InvocationState,
    ) -> Result<FormInstance<T>, MultiFormError> {
        let own = DescriptorType::of::<T>();
        let descriptors = self.descriptors(context, state)?;

        if !descriptors.is_empty() && !descriptors.contains(&own) {
            tracing::error!(
                handler = %context.handler,
                descriptor = own.name(),
                "form request is not declared by the handler"
            );
            return Err(DiscoveryError::UndeclaredDescriptor {
                handler: context.handler.clone(),
                descriptor: own.name().to_string(),
            }
            .into());
        }

        let canonical = descriptors.first().is_none_or(|first| *first == own);
        tracing::debug!(
            descriptor = own.name(),
            canonical,
            declared = descriptors.len(),
            "resolving form request"
        );

        let mut instance = FormInstance::<T>::new(Arc::clone(snapshot));
        instance.set_discovered(descriptors.clone());
        authorize(&instance)?;

        let Some(recorded) = state.outcome.clone() else {
            return self.validate_all(instance, &descriptors, snapshot, state);
        };
        instance.prepare().inspect_err(log_preparation)?;
        if recorded.outcome.fails() {
            return Err(ValidationError::Failed(recorded.outcome.errors().clone()).into());
        }
        accept(&mut instance, recorded.data);
        Ok(instance)
    }

    fn descriptors(
        &self,
        context: &InvocationContext,
        state: &mut InvocationState,
    ) -> Result<Vec<DescriptorType>, MultiFormError> {
        if let Some(descriptors) = &state.descriptors {
            return Ok(descriptors.clone());
        }
        let descriptors = self.discovery.discover(context).inspect_err(|e| {
            tracing::error!(handler = %context.handler, error = %e, "discovery failed");
        })?;
        tracing::debug!(
            handler = %context.handler,
            descriptors = ?descriptors,
            "discovered form requests"
        );
        state.descriptors = Some(descriptors.clone());
        Ok(descriptors)
    }

    fn validate_all<T: FormRequest>(
        &self,
        mut instance: FormInstance<T>,
        descriptors: &[DescriptorType],
        snapshot: &Arc<RequestSnapshot>,
        state: &mut InvocationState,
    ) -> Result<FormInstance<T>, MultiFormError> {
        let mut siblings = construct_siblings(descriptors, instance.descriptor(), snapshot);
        for sibling in &siblings {
            authorize(sibling.as_ref())?;
        }

        instance.prepare().inspect_err(log_preparation)?;
        for sibling in siblings.iter_mut() {
            sibling.prepare().inspect_err(log_preparation)?;
        }

        let own = instance.descriptor();
        let mut ordered: Vec<&dyn DynForm> = Vec::with_capacity(siblings.len() + 1);
        for descriptor in declaration_order(descriptors, own) {
            if descriptor == own {
                ordered.push(&instance);
            } else if let Some(sibling) = siblings.iter().find(|s| s.descriptor() == descriptor) {
                ordered.push(sibling.as_ref());
            }
        }
        let spec = merge(ordered);
        let outcome = self.validator.validate(&spec).inspect_err(|e| {
            tracing::error!(error = %e, "validation could not run");
        })?;
        tracing::debug!(
            descriptors = ?spec.descriptors,
            passed = outcome.passes(),
            "validation pass recorded"
        );

        state.outcome = Some(RecordedOutcome {
            data: spec.data.clone(),
            outcome: outcome.clone(),
        });

        if outcome.fails() {
            let errors = outcome.into_errors();
            let canonical = descriptors.first().copied().unwrap_or(own);
            match siblings.iter().find(|s| s.descriptor() == canonical) {
                Some(sibling) => sibling.failed(&errors),
                None => instance.failed(&errors),
            }
            return Err(ValidationError::Failed(errors).into());
        }

        accept(&mut instance, spec.data);
        Ok(instance)
    }
}

/// Declared types without repeats; an empty declaration is just `own`
fn declaration_order(descriptors: &[DescriptorType], own: DescriptorType) -> Vec<DescriptorType> {
    let mut ordered = Vec::with_capacity(descriptors.len().max(1));
    for descriptor in descriptors.iter().copied().chain(iter::once(own)) {
        if !ordered.contains(&descriptor) {
            ordered.push(descriptor);
        }
    }
    ordered
}

/// Fresh instances of every other declared type, first occurrence order
fn construct_siblings(
    descriptors: &[DescriptorType],
    own: DescriptorType,
    snapshot: &Arc<RequestSnapshot>,
) -> Vec<Box<dyn DynForm>> {
    declaration_order(descriptors, own)
        .into_iter()
        .filter(|descriptor| *descriptor != own)
        .map(|descriptor| descriptor.construct(Arc::clone(snapshot)))
        .collect()
}

fn authorize(form: &dyn DynForm) -> Result<(), AuthorizationError> {
    if form.authorize() {
        return Ok(());
    }
    let descriptor = form.descriptor().name();
    tracing::info!(descriptor, "form request authorization denied");
    Err(AuthorizationError::Denied {
        descriptor: descriptor.to_string(),
    })
}

/// Hand validated data to an instance: merged data, success hook, own fields
fn accept(form: &mut dyn DynForm, merged: InputData) {
    form.replace(merged);
    form.passed();
    let own = form.data().only(form.rules().fields());
    form.replace(own);
}

fn log_preparation(error: &super::error::PreparationError) {
    tracing::error!(error = %error, "preparation hook failed");
}
