mod binding;
mod controller;
mod draft;
mod rules;
mod schema;
mod traversal;
mod validation;
mod value;

#[cfg(test)]
mod tests;

pub use binding::{FieldBinding, MultipleBinding};
pub use controller::{
    EditMode, FormController, FormError, FormId, FormOptions, FormResult, FormSnapshot,
    FormStatus, ServerErrorReporter, ValidationTicket,
};
pub use draft::FormDraft;
pub use rules::{RuleFn, RuleKind, ValidateRule, check_rules};
pub use schema::{
    AsyncFieldValidatorFn, AsyncMultipleValidatorFn, BoxedPatchFuture, BoxedValidationFuture,
    ChangeInternals, ContainerField, ContainerKind, CustomMultipleField, CustomRenderFn,
    DecorativeField, DecorativeRenderFn, FieldChangeFn, FieldDescriptor, FieldKind,
    FieldValidatorFn, MultipleRenderFn, MultipleValidatorFn, Schema, SelectOption, TreeOption,
    ValueField, Visibility, VisibilityFn,
};
pub use traversal::{collect_checkable, collect_custom_multiple, collect_value_keys, find_field};
pub use validation::{PendingValidation, validate_custom_multiple, validate_field};
pub use value::{ErrorPatch, FieldKey, FieldValue, FormErrors, FormValues};
