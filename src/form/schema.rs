use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use gpui::{AnyElement, App, Pixels, SharedString, Window};
use rust_decimal::Decimal;

use super::binding::{FieldBinding, MultipleBinding};
use super::draft::FormDraft;
use super::rules::ValidateRule;
use super::value::{ErrorPatch, FieldKey, FieldValue, FormErrors, FormValues};

pub type BoxedValidationFuture = Pin<Box<dyn Future<Output = Option<SharedString>> + Send>>;
pub type BoxedPatchFuture = Pin<Box<dyn Future<Output = ErrorPatch> + Send>>;

pub type VisibilityFn = Arc<dyn Fn(&FormValues) -> bool + Send + Sync>;
pub type FieldValidatorFn =
    Arc<dyn Fn(&FieldValue, &ValueField, &FormValues) -> Option<SharedString> + Send + Sync>;
pub type AsyncFieldValidatorFn =
    Arc<dyn Fn(FieldValue, ValueField, FormValues) -> BoxedValidationFuture + Send + Sync>;
pub type FieldChangeFn = Arc<dyn Fn(&FieldValue, &mut FormDraft, &ChangeInternals<'_>) + Send + Sync>;
pub type MultipleValidatorFn =
    Arc<dyn Fn(&FormValues, &CustomMultipleField) -> ErrorPatch + Send + Sync>;
pub type AsyncMultipleValidatorFn =
    Arc<dyn Fn(FormValues, CustomMultipleField) -> BoxedPatchFuture + Send + Sync>;
pub type CustomRenderFn =
    Arc<dyn Fn(FieldBinding, &mut Window, &mut App) -> AnyElement + Send + Sync>;
pub type MultipleRenderFn =
    Arc<dyn Fn(MultipleBinding, &mut Window, &mut App) -> AnyElement + Send + Sync>;
pub type DecorativeRenderFn =
    Arc<dyn Fn(&FormValues, &mut Window, &mut App) -> AnyElement + Send + Sync>;

pub struct ChangeInternals<'a> {
    pub field: &'a ValueField,
    pub previous: &'a FormValues,
    pub errors: &'a FormErrors,
}

#[derive(Clone, Default)]
pub struct Visibility {
    should_hide: Option<VisibilityFn>,
    only_show: Option<VisibilityFn>,
}

impl Visibility {
    pub fn is_visible(&self, form: &FormValues) -> bool {
        if let Some(should_hide) = &self.should_hide
            && should_hide(form)
        {
            return false;
        }
        self.only_show.as_ref().is_none_or(|only_show| only_show(form))
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SelectOption {
    pub value: SharedString,
    pub label: SharedString,
    pub disabled: bool,
}

impl SelectOption {
    pub fn new(value: impl Into<SharedString>, label: impl Into<SharedString>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
            disabled: false,
        }
    }

    pub fn disabled(mut self, value: bool) -> Self {
        self.disabled = value;
        self
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TreeOption {
    pub value: SharedString,
    pub label: SharedString,
    pub children: Vec<TreeOption>,
}

impl TreeOption {
    pub fn new(value: impl Into<SharedString>, label: impl Into<SharedString>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
            children: Vec::new(),
        }
    }
}

/// Rendering parameters of a value-bearing field. The engine never reads
/// them except to dispatch `Custom` and `Registered` render calls.
#[derive(Clone)]
pub enum FieldKind {
    Input {
        placeholder: Option<SharedString>,
    },
    Textarea {
        placeholder: Option<SharedString>,
    },
    Number {
        min: Option<Decimal>,
        max: Option<Decimal>,
        step: Option<Decimal>,
    },
    Select {
        options: Vec<SelectOption>,
        multiple: bool,
    },
    DropdownSelect {
        options: Vec<SelectOption>,
        multiple: bool,
    },
    Radio {
        options: Vec<SelectOption>,
    },
    Switch,
    DatePicker {
        format: Option<SharedString>,
    },
    TreeSelect {
        nodes: Vec<TreeOption>,
        multiple: bool,
    },
    DropdownTree {
        nodes: Vec<TreeOption>,
    },
    Custom {
        render: CustomRenderFn,
    },
    Registered {
        render_type: SharedString,
        render_options: FieldValue,
    },
}

#[derive(Clone)]
pub struct ValueField {
    pub name: FieldKey,
    pub label: Option<SharedString>,
    pub required: bool,
    pub disabled: bool,
    pub kind: FieldKind,
    pub validate_rules: Vec<ValidateRule>,
    pub async_debounce: Duration,
    pub(crate) visibility: Visibility,
    pub(crate) validator: Option<FieldValidatorFn>,
    pub(crate) async_validator: Option<AsyncFieldValidatorFn>,
    pub(crate) on_change: Option<FieldChangeFn>,
}

impl ValueField {
    pub fn new(name: impl Into<FieldKey>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            label: None,
            required: false,
            disabled: false,
            kind,
            validate_rules: Vec::new(),
            async_debounce: Duration::ZERO,
            visibility: Visibility::default(),
            validator: None,
            async_validator: None,
            on_change: None,
        }
    }

    pub fn input(name: impl Into<FieldKey>) -> Self {
        Self::new(name, FieldKind::Input { placeholder: None })
    }

    pub fn number(name: impl Into<FieldKey>) -> Self {
        Self::new(
            name,
            FieldKind::Number {
                min: None,
                max: None,
                step: None,
            },
        )
    }

    pub fn select(name: impl Into<FieldKey>, options: Vec<SelectOption>) -> Self {
        Self::new(
            name,
            FieldKind::Select {
                options,
                multiple: false,
            },
        )
    }

    pub fn switch(name: impl Into<FieldKey>) -> Self {
        Self::new(name, FieldKind::Switch)
    }

    pub fn custom(
        name: impl Into<FieldKey>,
        render: impl Fn(FieldBinding, &mut Window, &mut App) -> AnyElement + Send + Sync + 'static,
    ) -> Self {
        Self::new(
            name,
            FieldKind::Custom {
                render: Arc::new(render),
            },
        )
    }

    pub fn registered(
        name: impl Into<FieldKey>,
        render_type: impl Into<SharedString>,
        render_options: FieldValue,
    ) -> Self {
        Self::new(
            name,
            FieldKind::Registered {
                render_type: render_type.into(),
                render_options,
            },
        )
    }

    pub fn label(mut self, value: impl Into<SharedString>) -> Self {
        self.label = Some(value.into());
        self
    }

    pub fn placeholder(mut self, value: impl Into<SharedString>) -> Self {
        if let FieldKind::Input { placeholder } | FieldKind::Textarea { placeholder } =
            &mut self.kind
        {
            *placeholder = Some(value.into());
        }
        self
    }

    pub fn required(mut self, value: bool) -> Self {
        self.required = value;
        self
    }

    pub fn disabled(mut self, value: bool) -> Self {
        self.disabled = value;
        self
    }

    pub fn rule(mut self, rule: ValidateRule) -> Self {
        self.validate_rules.push(rule);
        self
    }

    pub fn should_hide(
        mut self,
        predicate: impl Fn(&FormValues) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.visibility.should_hide = Some(Arc::new(predicate));
        self
    }

    pub fn only_show(
        mut self,
        predicate: impl Fn(&FormValues) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.visibility.only_show = Some(Arc::new(predicate));
        self
    }

    pub fn validator(
        mut self,
        validator: impl Fn(&FieldValue, &ValueField, &FormValues) -> Option<SharedString>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        self.validator = Some(Arc::new(validator));
        self
    }

    pub fn async_validator<F, Fut>(mut self, validator: F) -> Self
    where
        F: Fn(FieldValue, ValueField, FormValues) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Option<SharedString>> + Send + 'static,
    {
        let wrapped: AsyncFieldValidatorFn = Arc::new(
            move |value: FieldValue, field: ValueField, form: FormValues| -> BoxedValidationFuture {
                Box::pin(validator(value, field, form))
            },
        );
        self.async_validator = Some(wrapped);
        self
    }

    /// Delays the async validator; a newer check issued during the delay
    /// supersedes this one before the validator runs.
    pub fn async_debounce(mut self, delay: Duration) -> Self {
        self.async_debounce = delay;
        self
    }

    pub fn on_change(
        mut self,
        handler: impl Fn(&FieldValue, &mut FormDraft, &ChangeInternals<'_>) + Send + Sync + 'static,
    ) -> Self {
        self.on_change = Some(Arc::new(handler));
        self
    }

    pub fn display_label(&self) -> SharedString {
        self.label
            .clone()
            .unwrap_or_else(|| self.name.as_shared().clone())
    }

    pub fn is_visible(&self, form: &FormValues) -> bool {
        self.visibility.is_visible(form)
    }
}

#[derive(Clone)]
pub struct CustomMultipleField {
    pub names: Vec<FieldKey>,
    pub label: Option<SharedString>,
    pub(crate) visibility: Visibility,
    pub(crate) render_multiple: Option<MultipleRenderFn>,
    pub(crate) validate_multiple: Option<MultipleValidatorFn>,
    pub(crate) async_validate_multiple: Option<AsyncMultipleValidatorFn>,
}

impl CustomMultipleField {
    pub fn new<K>(names: impl IntoIterator<Item = K>) -> Self
    where
        K: Into<FieldKey>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            label: None,
            visibility: Visibility::default(),
            render_multiple: None,
            validate_multiple: None,
            async_validate_multiple: None,
        }
    }

    pub fn label(mut self, value: impl Into<SharedString>) -> Self {
        self.label = Some(value.into());
        self
    }

    pub fn should_hide(
        mut self,
        predicate: impl Fn(&FormValues) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.visibility.should_hide = Some(Arc::new(predicate));
        self
    }

    pub fn only_show(
        mut self,
        predicate: impl Fn(&FormValues) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.visibility.only_show = Some(Arc::new(predicate));
        self
    }

    pub fn render_multiple(
        mut self,
        render: impl Fn(MultipleBinding, &mut Window, &mut App) -> AnyElement + Send + Sync + 'static,
    ) -> Self {
        self.render_multiple = Some(Arc::new(render));
        self
    }

    pub fn validate_multiple(
        mut self,
        validator: impl Fn(&FormValues, &CustomMultipleField) -> ErrorPatch + Send + Sync + 'static,
    ) -> Self {
        self.validate_multiple = Some(Arc::new(validator));
        self
    }

    pub fn async_validate_multiple<F, Fut>(mut self, validator: F) -> Self
    where
        F: Fn(FormValues, CustomMultipleField) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ErrorPatch> + Send + 'static,
    {
        let wrapped: AsyncMultipleValidatorFn = Arc::new(
            move |form: FormValues, field: CustomMultipleField| -> BoxedPatchFuture {
                Box::pin(validator(form, field))
            },
        );
        self.async_validate_multiple = Some(wrapped);
        self
    }

    pub fn is_visible(&self, form: &FormValues) -> bool {
        self.visibility.is_visible(form)
    }

    pub(crate) fn ticket_key(&self) -> FieldKey {
        let joined = self
            .names
            .iter()
            .map(FieldKey::as_str)
            .collect::<Vec<_>>()
            .join("+");
        FieldKey::new(format!("[{joined}]"))
    }
}

#[derive(Clone, Default)]
pub struct DecorativeField {
    pub(crate) visibility: Visibility,
    pub(crate) render: Option<DecorativeRenderFn>,
}

impl DecorativeField {
    pub fn new(
        render: impl Fn(&FormValues, &mut Window, &mut App) -> AnyElement + Send + Sync + 'static,
    ) -> Self {
        Self {
            visibility: Visibility::default(),
            render: Some(Arc::new(render)),
        }
    }

    pub fn should_hide(
        mut self,
        predicate: impl Fn(&FormValues) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.visibility.should_hide = Some(Arc::new(predicate));
        self
    }

    pub fn is_visible(&self, form: &FormValues) -> bool {
        self.visibility.is_visible(form)
    }
}

/// Structural wrapper. `Group` carries layout hints, `Nested` and `Fragment`
/// only scope their children.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ContainerKind {
    Group,
    Nested,
    Fragment,
}

#[derive(Clone)]
pub struct ContainerField {
    pub kind: ContainerKind,
    pub children: Vec<FieldDescriptor>,
    pub horizontal: bool,
    pub item_width: Option<Pixels>,
    pub(crate) visibility: Visibility,
}

impl ContainerField {
    pub fn new(kind: ContainerKind, children: Vec<FieldDescriptor>) -> Self {
        Self {
            kind,
            children,
            horizontal: false,
            item_width: None,
            visibility: Visibility::default(),
        }
    }

    pub fn horizontal(mut self, value: bool) -> Self {
        self.horizontal = value;
        self
    }

    pub fn item_width(mut self, value: Pixels) -> Self {
        self.item_width = Some(value);
        self
    }

    pub fn should_hide(
        mut self,
        predicate: impl Fn(&FormValues) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.visibility.should_hide = Some(Arc::new(predicate));
        self
    }

    pub fn only_show(
        mut self,
        predicate: impl Fn(&FormValues) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.visibility.only_show = Some(Arc::new(predicate));
        self
    }

    pub fn is_visible(&self, form: &FormValues) -> bool {
        self.visibility.is_visible(form)
    }
}

#[derive(Clone)]
pub enum FieldDescriptor {
    Field(ValueField),
    CustomMultiple(CustomMultipleField),
    Decorative(DecorativeField),
    Group(ContainerField),
    Nested(ContainerField),
    Fragment(ContainerField),
}

impl FieldDescriptor {
    pub fn group(children: Vec<FieldDescriptor>) -> ContainerField {
        ContainerField::new(ContainerKind::Group, children)
    }

    pub fn nested(children: Vec<FieldDescriptor>) -> ContainerField {
        ContainerField::new(ContainerKind::Nested, children)
    }

    pub fn fragment(children: Vec<FieldDescriptor>) -> ContainerField {
        ContainerField::new(ContainerKind::Fragment, children)
    }

    pub fn is_visible(&self, form: &FormValues) -> bool {
        match self {
            FieldDescriptor::Field(field) => field.is_visible(form),
            FieldDescriptor::CustomMultiple(field) => field.is_visible(form),
            FieldDescriptor::Decorative(field) => field.is_visible(form),
            FieldDescriptor::Group(container)
            | FieldDescriptor::Nested(container)
            | FieldDescriptor::Fragment(container) => container.is_visible(form),
        }
    }

    pub fn children(&self) -> Option<&[FieldDescriptor]> {
        match self {
            FieldDescriptor::Group(container)
            | FieldDescriptor::Nested(container)
            | FieldDescriptor::Fragment(container) => Some(&container.children),
            _ => None,
        }
    }
}

impl From<ValueField> for FieldDescriptor {
    fn from(value: ValueField) -> Self {
        FieldDescriptor::Field(value)
    }
}

impl From<CustomMultipleField> for FieldDescriptor {
    fn from(value: CustomMultipleField) -> Self {
        FieldDescriptor::CustomMultiple(value)
    }
}

impl From<DecorativeField> for FieldDescriptor {
    fn from(value: DecorativeField) -> Self {
        FieldDescriptor::Decorative(value)
    }
}

impl From<ContainerField> for FieldDescriptor {
    fn from(value: ContainerField) -> Self {
        match value.kind {
            ContainerKind::Group => FieldDescriptor::Group(value),
            ContainerKind::Nested => FieldDescriptor::Nested(value),
            ContainerKind::Fragment => FieldDescriptor::Fragment(value),
        }
    }
}

pub type Schema = Vec<FieldDescriptor>;
