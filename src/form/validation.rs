use std::collections::BTreeMap;
use std::future::Future;
use std::time::Duration;

use futures_timer::Delay;
use gpui::SharedString;
use tracing::debug;

use super::controller::{
    EditMode, FormController, FormResult, ValidationTicket, read_lock, write_lock,
};
use super::rules::check_rules;
use super::schema::{BoxedPatchFuture, CustomMultipleField, ValueField};
use super::traversal::{collect_checkable, collect_custom_multiple};
use super::value::{ErrorPatch, FieldKey, FieldValue, FormErrors, FormValues};
use crate::i18n::I18nManager;

/// Synchronous check of one field: the field's validator, then its rules,
/// then the required gate. The first message wins.
pub fn validate_field(
    value: &FieldValue,
    field: &ValueField,
    form: &FormValues,
    i18n: &I18nManager,
) -> Option<SharedString> {
    if let Some(validator) = &field.validator
        && let Some(message) = validator(value, field, form)
    {
        return Some(message);
    }

    let label = field.display_label();
    let label: &str = &label;
    if let Some(message) = check_rules(&field.validate_rules, value, label, i18n) {
        return Some(message);
    }

    if field.required && value.is_blank() {
        return Some(i18n.t_with("form.required", &[("label", label)]));
    }
    None
}

pub fn validate_custom_multiple(form: &FormValues, field: &CustomMultipleField) -> ErrorPatch {
    field
        .validate_multiple
        .as_ref()
        .map(|validator| validator(form, field))
        .unwrap_or_default()
}

type StartFn = Box<dyn FnOnce() -> BoxedPatchFuture + Send>;

/// An asynchronous validation issued by a single-field or custom-multiple
/// check.
///
/// The check itself returns immediately; the caller drives this handle on
/// its executor. A group check guards its own key and every member name, so
/// the result is written only if no later field or group check touched any
/// of those names in the meantime.
#[must_use = "the async validator only runs when the pending validation is awaited"]
pub struct PendingValidation {
    controller: FormController,
    key: FieldKey,
    guards: Vec<FieldKey>,
    names: Vec<FieldKey>,
    ticket: ValidationTicket,
    debounce: Duration,
    start: StartFn,
}

impl PendingValidation {
    pub fn key(&self) -> &FieldKey {
        &self.key
    }

    pub fn ticket(&self) -> ValidationTicket {
        self.ticket
    }

    pub fn run(self) -> impl Future<Output = FormResult<bool>> + Send + 'static {
        let PendingValidation {
            controller,
            key,
            guards,
            names,
            ticket,
            debounce,
            start,
        } = self;
        async move {
            if !debounce.is_zero() {
                Delay::new(debounce).await;
                if !controller.is_latest_ticket(&guards, ticket)? {
                    debug!(field = %key, ?ticket, "async validation superseded during debounce");
                    return Ok(false);
                }
            }
            let patch = start().await;
            controller.finish_async_validation(&key, &guards, ticket, &names, patch)
        }
    }
}

impl FormController {
    pub fn check_item(&self, field: &ValueField) -> FormResult<Option<PendingValidation>> {
        let form = self.values()?;
        if self.options.edit_mode == EditMode::SubmitOnEdit {
            self.on_check_submit(Some(form))?;
            return Ok(None);
        }
        let value = form.get(&field.name).clone();
        self.check_value(value, field, form)
    }

    pub fn check_item_with_value(
        &self,
        value: impl Into<FieldValue>,
        field: &ValueField,
    ) -> FormResult<Option<PendingValidation>> {
        let value = value.into();
        let form = self.values()?;
        if self.options.edit_mode == EditMode::SubmitOnEdit {
            let name = field.name.clone();
            let hypothetical = form.produce(|draft| draft.set(name, value));
            self.on_check_submit(Some(hypothetical))?;
            return Ok(None);
        }
        self.check_value(value, field, form)
    }

    pub fn check_item_custom_multiple(
        &self,
        patch: FormValues,
        field: &CustomMultipleField,
    ) -> FormResult<Option<PendingValidation>> {
        let draft = self.values()?.produce(|draft| draft.merge(&patch));
        if self.options.edit_mode == EditMode::SubmitOnEdit {
            self.on_check_submit(Some(draft))?;
            return Ok(None);
        }

        let results = validate_custom_multiple(&draft, field);
        let passed = results.values().all(Option::is_none);
        let ticket_key = field.ticket_key();
        let guards = std::iter::once(ticket_key.clone())
            .chain(field.names.iter().cloned())
            .collect::<Vec<_>>();
        let ticket = {
            let mut state = write_lock(&self.state, "writing custom-multiple validation result")?;
            let ticket = state.issue_ticket(guards.iter().cloned());
            state.errors = state.errors.replace_group(&field.names, results);
            ticket
        };

        let Some(validator) = field.async_validate_multiple.clone().filter(|_| passed) else {
            return Ok(None);
        };
        let group = field.clone();
        Ok(Some(PendingValidation {
            controller: self.clone(),
            key: ticket_key,
            guards,
            names: field.names.clone(),
            ticket,
            debounce: Duration::ZERO,
            start: Box::new(move || validator(draft, group)),
        }))
    }

    /// Validates every visible field and custom-multiple group of `snapshot`
    /// (the current values when `None`) and replaces the whole error map.
    ///
    /// On a clean pass the registered submit handler receives the snapshot
    /// and the modified flag is cleared. Returns whether the pass was clean.
    pub fn on_check_submit(&self, snapshot: Option<FormValues>) -> FormResult<bool> {
        let values = match snapshot {
            Some(values) => values,
            None => self.values()?,
        };

        let mut entries = BTreeMap::new();
        for field in collect_checkable(&self.schema, &values) {
            let message = validate_field(values.get(&field.name), field, &values, &self.i18n);
            entries.insert(field.name.clone(), message);
        }
        for group in collect_custom_multiple(&self.schema, &values) {
            entries.extend(validate_custom_multiple(&values, group));
        }
        let errors = FormErrors::from_entries(entries);
        let passed = !errors.has_errors();

        let form_id = {
            let mut state = write_lock(&self.state, "applying submit validation result")?;
            if !passed {
                debug!(
                    form = %state.id,
                    first_error = ?errors.first_error(),
                    "submit blocked by validation errors"
                );
            }
            state.errors = errors;
            state.tickets.clear();
            state.submit_count = state.submit_count.saturating_add(1);
            if passed {
                state.modified = false;
            }
            state.id
        };

        if passed {
            let handler = read_lock(&self.submit_handler, "reading submit handler")?.clone();
            match handler {
                Some(handler) => {
                    debug!(form = %form_id, "submitting form values");
                    handler(values, self.server_error_reporter());
                }
                None => debug!(form = %form_id, "form validated without a submit handler"),
            }
        }
        Ok(passed)
    }

    fn check_value(
        &self,
        value: FieldValue,
        field: &ValueField,
        form: FormValues,
    ) -> FormResult<Option<PendingValidation>> {
        let message = validate_field(&value, field, &form, &self.i18n);
        let passed = message.is_none();
        let ticket = {
            let mut state = write_lock(&self.state, "writing field validation result")?;
            let ticket = state.issue_ticket([field.name.clone()]);
            state.errors = state.errors.with_entry(field.name.clone(), message);
            ticket
        };

        let Some(validator) = field.async_validator.clone().filter(|_| passed) else {
            return Ok(None);
        };
        let key = field.name.clone();
        let owned = field.clone();
        let start_key = key.clone();
        Ok(Some(PendingValidation {
            controller: self.clone(),
            key: key.clone(),
            guards: vec![key.clone()],
            names: vec![key],
            ticket,
            debounce: field.async_debounce,
            start: Box::new(move || -> BoxedPatchFuture {
                let pending = validator(value, owned, form);
                Box::pin(async move {
                    let mut patch = ErrorPatch::new();
                    patch.insert(start_key, pending.await);
                    patch
                })
            }),
        }))
    }

    fn is_latest_ticket(&self, guards: &[FieldKey], ticket: ValidationTicket) -> FormResult<bool> {
        Ok(read_lock(&self.state, "checking latest validation ticket")?.holds_ticket(guards, ticket))
    }

    fn finish_async_validation(
        &self,
        key: &FieldKey,
        guards: &[FieldKey],
        ticket: ValidationTicket,
        names: &[FieldKey],
        patch: ErrorPatch,
    ) -> FormResult<bool> {
        let mut state = write_lock(&self.state, "finishing async validation")?;
        if !state.holds_ticket(guards, ticket) {
            debug!(field = %key, ?ticket, "dropping stale async validation result");
            return Ok(false);
        }
        for guard in guards {
            state.tickets.remove(guard);
        }
        state.errors = state.errors.replace_group(names, patch);
        Ok(true)
    }
}
