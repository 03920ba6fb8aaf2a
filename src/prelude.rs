pub use crate::form::{
    CustomMultipleField, DecorativeField, EditMode, ErrorPatch, FieldBinding, FieldDescriptor,
    FieldKey, FieldKind, FieldValue, FormController, FormDraft, FormErrors, FormOptions,
    FormResult, FormStatus, FormValues, MultipleBinding, PendingValidation, Schema, SelectOption,
    TreeOption, ValidateRule, ValueField,
};
pub use crate::i18n::{I18nManager, Locale};
pub use crate::renderer::RendererRegistry;
