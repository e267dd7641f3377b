//! Macros for reducing boilerplate when defining form requests
//!
//! Form requests that only declare rules, messages and attribute labels do
//! not need a hand-written `FormRequest` impl.

/// Declare a stateless form request
///
/// Generates a unit struct and its `FormRequest` impl. `messages` and
/// `attributes` are optional. Form requests needing hooks or authorization
/// implement `FormRequest` by hand.
///
/// # Example
/// ```rust,ignore
/// form_request! {
///     pub struct AgeRequest => "age_request" {
///         rules: {
///             "age" => "required|integer|min:0",
///         },
///         messages: {
///             "age.integer" => "Age must be a whole number.",
///         },
///         attributes: {
///             "age" => "your age",
///         },
///     }
/// }
/// ```
#[macro_export]
macro_rules! form_request {
    (
        $(#[$meta:meta])*
        $vis:vis struct $type:ident => $name:literal {
            rules: { $( $field:expr => $rules:expr ),* $(,)? }
            $(, messages: { $( $message_key:expr => $message:expr ),* $(,)? } )?
            $(, attributes: { $( $attribute_key:expr => $label:expr ),* $(,)? } )?
            $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default)]
        $vis struct $type;

        impl $crate::core::form::FormRequest for $type {
            fn from_request(_: &$crate::core::request::RequestSnapshot) -> Self {
                $type
            }

            fn rules(&self) -> $crate::core::form::Rules {
                $crate::core::form::Rules::new()
                    $( .field($field, $rules) )*
            }

            fn messages(&self) -> $crate::core::form::Messages {
                #[allow(unused_mut)]
                let mut messages = $crate::core::form::Messages::new();
                $( $(
                    messages.insert(($message_key).to_string(), ($message).to_string());
                )* )?
                messages
            }

            fn attributes(&self) -> $crate::core::form::Attributes {
                #[allow(unused_mut)]
                let mut attributes = $crate::core::form::Attributes::new();
                $( $(
                    attributes.insert(($attribute_key).to_string(), ($label).to_string());
                )* )?
                attributes
            }

            fn name() -> &'static str {
                $name
            }
        }
    };
}
