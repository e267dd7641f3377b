//! Merging of several form requests into one validation spec
//!
//! Rules, messages and attributes are folded left to right in declaration
//! order and the later form request wins on a shared key. Data follows the
//! same order: every form request contributes its prepared data (already
//! reduced to its own rule fields) and contributions merge recursively, the
//! later value winning on a shared leaf.

use crate::core::form::{Attributes, DynForm, Messages, Rules};
use crate::core::request::InputData;

/// Everything the single validation pass needs
#[derive(Debug, Clone, Default)]
pub struct MergedValidationSpec {
    pub data: InputData,
    pub rules: Rules,
    pub messages: Messages,
    pub attributes: Attributes,
    /// Names of the merged form requests, in merge order
    pub descriptors: Vec<&'static str>,
}

/// Merge form requests given in declaration order
pub fn merge<'a, I>(forms: I) -> MergedValidationSpec
where
    I: IntoIterator<Item = &'a dyn DynForm>,
{
    let mut spec = MergedValidationSpec::default();
    for form in forms {
        spec.data.merge(form.data().clone());
        spec.rules.extend(form.rules());
        spec.messages.extend(form.messages());
        spec.attributes.extend(form.attributes());
        spec.descriptors.push(form.descriptor().name());
    }
    spec
}
