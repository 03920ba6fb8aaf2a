use gpui::{AnyElement, App, IntoElement, ParentElement, SharedString, Window, div};
use tracing::warn;

use super::controller::{FormController, FormResult};
use super::draft::FormDraft;
use super::schema::{CustomMultipleField, FieldDescriptor, FieldKind, ValueField};
use super::validation::PendingValidation;
use super::value::{FieldValue, FormErrors, FormValues};
use crate::renderer::RendererRegistry;

#[derive(Clone)]
pub struct FieldBinding {
    pub field: ValueField,
    pub value: FieldValue,
    pub error: Option<SharedString>,
    pub form: FormValues,
    controller: FormController,
}

impl FieldBinding {
    pub fn is_disabled(&self) -> bool {
        self.field.disabled
    }

    pub fn on_change(&self, value: impl Into<FieldValue>) -> FormResult<()> {
        self.controller.update_item(value, &self.field)
    }

    pub fn on_check(
        &self,
        value: impl Into<FieldValue>,
    ) -> FormResult<Option<PendingValidation>> {
        self.controller.check_item_with_value(value, &self.field)
    }
}

#[derive(Clone)]
pub struct MultipleBinding {
    pub field: CustomMultipleField,
    pub form: FormValues,
    pub errors: FormErrors,
    controller: FormController,
}

impl MultipleBinding {
    pub fn modify_form(&self, recipe: impl FnOnce(&mut FormDraft)) -> FormResult<()> {
        self.controller.modify_form(recipe)
    }

    pub fn check_form(&self, patch: FormValues) -> FormResult<Option<PendingValidation>> {
        self.controller.check_item_custom_multiple(patch, &self.field)
    }
}

impl FormController {
    pub fn field_binding(&self, field: &ValueField) -> FormResult<FieldBinding> {
        let snapshot = self.snapshot()?;
        Ok(FieldBinding {
            field: field.clone(),
            value: snapshot.values.get(&field.name).clone(),
            error: snapshot.errors.get(&field.name).cloned(),
            form: snapshot.values,
            controller: self.clone(),
        })
    }

    pub fn multiple_binding(&self, field: &CustomMultipleField) -> FormResult<MultipleBinding> {
        let snapshot = self.snapshot()?;
        Ok(MultipleBinding {
            field: field.clone(),
            form: snapshot.values,
            errors: snapshot.errors,
            controller: self.clone(),
        })
    }

    /// Renders a node that carries its own render function: custom and
    /// registered fields, custom-multiple groups and decorative content.
    ///
    /// Returns `None` for hidden nodes, structural nodes and built-in field
    /// kinds, which the widget layer draws itself. A registered field whose
    /// renderer is missing yields a placeholder.
    pub fn render_field(
        &self,
        node: &FieldDescriptor,
        registry: &RendererRegistry,
        window: &mut Window,
        cx: &mut App,
    ) -> FormResult<Option<AnyElement>> {
        let form = self.values()?;
        if !node.is_visible(&form) {
            return Ok(None);
        }

        match node {
            FieldDescriptor::Field(field) => match &field.kind {
                FieldKind::Custom { render } => {
                    let binding = self.field_binding(field)?;
                    Ok(Some(render(binding, window, cx)))
                }
                FieldKind::Registered {
                    render_type,
                    render_options,
                } => {
                    let Some(render) = registry.lookup(render_type) else {
                        let type_name: &str = render_type;
                        let message = self
                            .i18n
                            .t_with("form.placeholder_missing_renderer", &[("type", type_name)]);
                        return Ok(Some(div().child(message).into_any_element()));
                    };
                    let binding = self.field_binding(field)?;
                    Ok(Some(render(binding, render_options, window, cx)))
                }
                _ => Ok(None),
            },
            FieldDescriptor::CustomMultiple(group) => {
                let Some(render) = group.render_multiple.clone() else {
                    warn!(names = ?group.names, "custom-multiple field has no renderer");
                    return Ok(None);
                };
                let binding = self.multiple_binding(group)?;
                Ok(Some(render(binding, window, cx)))
            }
            FieldDescriptor::Decorative(decorative) => Ok(decorative
                .render
                .as_ref()
                .map(|render| render(&form, window, cx))),
            FieldDescriptor::Group(_) | FieldDescriptor::Nested(_) | FieldDescriptor::Fragment(_) => {
                Ok(None)
            }
        }
    }
}
