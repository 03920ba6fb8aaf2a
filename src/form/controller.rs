use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

use gpui::SharedString;
use tracing::debug;

use super::draft::FormDraft;
use super::schema::{ChangeInternals, Schema, ValueField};
use super::traversal::{collect_checkable, collect_custom_multiple, collect_value_keys, find_field};
use super::value::{FieldKey, FieldValue, FormErrors, FormValues};
use crate::i18n::I18nManager;

static FORM_ID_ALLOCATOR: AtomicU64 = AtomicU64::new(1);

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FormId(pub u64);

impl FormId {
    pub fn next() -> Self {
        Self(FORM_ID_ALLOCATOR.fetch_add(1, Ordering::SeqCst))
    }
}

impl Display for FormId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "form-{}", self.0)
    }
}

/// Generation token of one asynchronous validation. Only the latest ticket
/// issued for a key may write its result.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct ValidationTicket(pub u64);

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum EditMode {
    #[default]
    Deferred,
    SubmitOnEdit,
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct FormOptions {
    pub edit_mode: EditMode,
    pub clear_hidden_errors: bool,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum FormStatus {
    Clean,
    Editing,
    Invalid,
}

#[derive(Clone, Debug)]
pub struct FormSnapshot {
    pub id: FormId,
    pub values: FormValues,
    pub errors: FormErrors,
    pub modified: bool,
    pub status: FormStatus,
    pub submit_count: u32,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum FormError {
    StatePoisoned(&'static str),
    UnknownField(FieldKey),
}

impl Display for FormError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FormError::StatePoisoned(context) => {
                write!(f, "form state lock poisoned while {context}")
            }
            FormError::UnknownField(key) => write!(f, "schema has no value field named `{key}`"),
        }
    }
}

impl std::error::Error for FormError {}

pub type FormResult<T> = Result<T, FormError>;

pub(super) type SubmitHandlerFn = Arc<dyn Fn(FormValues, ServerErrorReporter) + Send + Sync>;
pub(super) type FieldChangeHookFn =
    Arc<dyn Fn(&FieldKey, &FieldValue, &FormValues, &mut FormDraft) + Send + Sync>;

pub(super) struct FormState {
    pub(super) id: FormId,
    pub(super) values: FormValues,
    pub(super) errors: FormErrors,
    pub(super) modified: bool,
    pub(super) submit_count: u32,
    pub(super) tickets: BTreeMap<FieldKey, ValidationTicket>,
    pub(super) next_ticket: u64,
}

impl FormState {
    pub(super) fn issue_ticket(
        &mut self,
        keys: impl IntoIterator<Item = FieldKey>,
    ) -> ValidationTicket {
        self.next_ticket += 1;
        let ticket = ValidationTicket(self.next_ticket);
        for key in keys {
            self.tickets.insert(key, ticket);
        }
        ticket
    }

    pub(super) fn holds_ticket(&self, keys: &[FieldKey], ticket: ValidationTicket) -> bool {
        keys.iter()
            .all(|key| self.tickets.get(key).copied() == Some(ticket))
    }

    fn status(&self) -> FormStatus {
        if self.errors.has_errors() {
            FormStatus::Invalid
        } else if self.modified {
            FormStatus::Editing
        } else {
            FormStatus::Clean
        }
    }
}

/// Owns the value and error maps of one form.
///
/// The controller is a cheap handle; clones share the same state. Every
/// operation swaps in complete new snapshots, so readers never observe a
/// half-applied change. Field `on_change` callbacks and the field change hook
/// run while the state is locked and must only touch the draft they are
/// given.
#[derive(Clone)]
pub struct FormController {
    pub(super) options: FormOptions,
    pub(super) schema: Arc<Schema>,
    pub(super) i18n: I18nManager,
    pub(super) state: Arc<RwLock<FormState>>,
    pub(super) submit_handler: Arc<RwLock<Option<SubmitHandlerFn>>>,
    pub(super) field_change_hook: Arc<RwLock<Option<FieldChangeHookFn>>>,
}

impl FormController {
    pub fn new(schema: Schema, initial: FormValues, options: FormOptions) -> Self {
        Self {
            options,
            schema: Arc::new(schema),
            i18n: I18nManager::default(),
            state: Arc::new(RwLock::new(FormState {
                id: FormId::next(),
                values: initial,
                errors: FormErrors::new(),
                modified: false,
                submit_count: 0,
                tickets: BTreeMap::new(),
                next_ticket: 0,
            })),
            submit_handler: Arc::new(RwLock::new(None)),
            field_change_hook: Arc::new(RwLock::new(None)),
        }
    }

    pub fn with_i18n(mut self, i18n: I18nManager) -> Self {
        self.i18n = i18n;
        self
    }

    pub fn options(&self) -> FormOptions {
        self.options
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn i18n(&self) -> &I18nManager {
        &self.i18n
    }

    pub fn form_id(&self) -> FormResult<FormId> {
        Ok(read_lock(&self.state, "reading form id")?.id)
    }

    pub fn field(&self, name: impl Into<FieldKey>) -> FormResult<ValueField> {
        let key = name.into();
        find_field(&self.schema, &key)
            .cloned()
            .ok_or(FormError::UnknownField(key))
    }

    pub fn register_submit_handler(
        &self,
        handler: impl Fn(FormValues, ServerErrorReporter) + Send + Sync + 'static,
    ) -> FormResult<()> {
        let mut slot = write_lock(&self.submit_handler, "registering submit handler")?;
        *slot = Some(Arc::new(handler));
        Ok(())
    }

    pub fn clear_submit_handler(&self) -> FormResult<()> {
        let mut slot = write_lock(&self.submit_handler, "clearing submit handler")?;
        *slot = None;
        Ok(())
    }

    pub fn register_field_change_hook(
        &self,
        hook: impl Fn(&FieldKey, &FieldValue, &FormValues, &mut FormDraft) + Send + Sync + 'static,
    ) -> FormResult<()> {
        let mut slot = write_lock(&self.field_change_hook, "registering field change hook")?;
        *slot = Some(Arc::new(hook));
        Ok(())
    }

    pub fn update_item(&self, value: impl Into<FieldValue>, field: &ValueField) -> FormResult<()> {
        let value = value.into();
        let hook = read_lock(&self.field_change_hook, "reading field change hook")?.clone();

        let mut state = write_lock(&self.state, "updating field value")?;
        let previous = state.values.clone();
        let errors = state.errors.clone();
        let next = previous.produce(|draft| {
            draft.set(field.name.clone(), value.clone());
            if let Some(on_change) = &field.on_change {
                let internals = ChangeInternals {
                    field,
                    previous: &previous,
                    errors: &errors,
                };
                on_change(&value, draft, &internals);
            }
            if let Some(hook) = &hook {
                hook(&field.name, &value, &previous, draft);
            }
        });

        if self.options.clear_hidden_errors {
            state.errors = self.without_hidden_errors(&errors, &next);
        }
        state.values = next;
        state.modified = true;
        Ok(())
    }

    pub fn modify_form(&self, recipe: impl FnOnce(&mut FormDraft)) -> FormResult<()> {
        let mut state = write_lock(&self.state, "modifying form values")?;
        let next = state.values.produce(recipe);
        if self.options.clear_hidden_errors {
            state.errors = self.without_hidden_errors(&state.errors, &next);
        }
        state.values = next;
        state.modified = true;
        Ok(())
    }

    pub fn reset_form(&self) -> FormResult<()> {
        let mut state = write_lock(&self.state, "resetting form")?;
        state.values = state.values.produce(FormDraft::clear_values);
        state.errors = FormErrors::new();
        state.modified = false;
        state.tickets.clear();
        debug!(form = %state.id, "form reset");
        Ok(())
    }

    pub fn values(&self) -> FormResult<FormValues> {
        Ok(read_lock(&self.state, "reading form values")?.values.clone())
    }

    pub fn value(&self, key: &FieldKey) -> FormResult<FieldValue> {
        Ok(read_lock(&self.state, "reading field value")?
            .values
            .get(key)
            .clone())
    }

    pub fn errors(&self) -> FormResult<FormErrors> {
        Ok(read_lock(&self.state, "reading form errors")?.errors.clone())
    }

    pub fn error(&self, key: &FieldKey) -> FormResult<Option<SharedString>> {
        Ok(read_lock(&self.state, "reading field error")?
            .errors
            .get(key)
            .cloned())
    }

    pub fn is_modified(&self) -> FormResult<bool> {
        Ok(read_lock(&self.state, "reading modified flag")?.modified)
    }

    pub fn status(&self) -> FormResult<FormStatus> {
        Ok(read_lock(&self.state, "reading form status")?.status())
    }

    pub fn snapshot(&self) -> FormResult<FormSnapshot> {
        let state = read_lock(&self.state, "creating form snapshot")?;
        Ok(FormSnapshot {
            id: state.id,
            values: state.values.clone(),
            errors: state.errors.clone(),
            modified: state.modified,
            status: state.status(),
            submit_count: state.submit_count,
        })
    }

    pub(super) fn server_error_reporter(&self) -> ServerErrorReporter {
        ServerErrorReporter {
            state: Arc::downgrade(&self.state),
        }
    }

    fn without_hidden_errors(&self, errors: &FormErrors, values: &FormValues) -> FormErrors {
        let mut visible = collect_checkable(&self.schema, values)
            .into_iter()
            .map(|field| field.name.clone())
            .collect::<BTreeSet<_>>();
        for group in collect_custom_multiple(&self.schema, values) {
            visible.extend(group.names.iter().cloned());
        }
        let known = collect_value_keys(&self.schema);

        let hidden = errors
            .messages()
            .map(|(key, _)| key)
            .filter(|key| known.contains(key) && !visible.contains(*key))
            .cloned()
            .collect::<Vec<_>>();
        if hidden.is_empty() {
            return errors.clone();
        }
        let mut entries = errors.entries().clone();
        for key in hidden {
            entries.remove(&key);
        }
        FormErrors::from_entries(entries)
    }
}

/// Lets a submit handler report errors produced after submission, for
/// example by a server. Reporting after the form is gone does nothing.
#[derive(Clone)]
pub struct ServerErrorReporter {
    state: Weak<RwLock<FormState>>,
}

impl ServerErrorReporter {
    pub fn report(&self, errors: impl Into<FormErrors>) -> FormResult<()> {
        let Some(state) = self.state.upgrade() else {
            return Ok(());
        };
        let mut state = write_lock(&state, "applying server errors")?;
        state.errors = errors.into();
        state.tickets.clear();
        debug!(form = %state.id, "server errors applied");
        Ok(())
    }
}

pub(super) fn read_lock<'a, T>(
    lock: &'a RwLock<T>,
    context: &'static str,
) -> FormResult<RwLockReadGuard<'a, T>> {
    lock.read().map_err(|_| FormError::StatePoisoned(context))
}

pub(super) fn write_lock<'a, T>(
    lock: &'a RwLock<T>,
    context: &'static str,
) -> FormResult<RwLockWriteGuard<'a, T>> {
    lock.write().map_err(|_| FormError::StatePoisoned(context))
}
