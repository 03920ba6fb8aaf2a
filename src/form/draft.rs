use std::collections::BTreeMap;

use super::value::{EMPTY, FieldKey, FieldValue, FormValues};

/// Mutable working copy of a [`FormValues`] snapshot.
///
/// All mutations performed while handling one operation (the field write,
/// the field's own `on_change`, the global change hook) land in the same
/// draft and become visible together when the draft is finished.
pub struct FormDraft {
    base: FormValues,
    pending: Option<BTreeMap<FieldKey, FieldValue>>,
}

impl FormDraft {
    pub(super) fn from_values(values: &FormValues) -> Self {
        Self {
            base: values.clone(),
            pending: None,
        }
    }

    pub fn get(&self, key: &FieldKey) -> &FieldValue {
        match &self.pending {
            Some(entries) => entries.get(key).unwrap_or(&EMPTY),
            None => self.base.get(key),
        }
    }

    pub fn get_named(&self, name: &'static str) -> &FieldValue {
        self.get(&FieldKey::new(name))
    }

    pub fn set(&mut self, key: impl Into<FieldKey>, value: impl Into<FieldValue>) {
        self.entries_mut().insert(key.into(), value.into());
    }

    pub fn merge(&mut self, patch: &FormValues) {
        if patch.is_empty() {
            return;
        }
        let entries = self.entries_mut();
        for (key, value) in patch.iter() {
            entries.insert(key.clone(), value.clone());
        }
    }

    pub fn clear_values(&mut self) {
        for value in self.entries_mut().values_mut() {
            *value = FieldValue::Empty;
        }
    }

    pub fn snapshot(&self) -> FormValues {
        match &self.pending {
            Some(entries) => FormValues::from_entries(entries.clone()),
            None => self.base.clone(),
        }
    }

    pub(super) fn finish(self) -> FormValues {
        match self.pending {
            Some(entries) => FormValues::from_entries(entries),
            None => self.base,
        }
    }

    fn entries_mut(&mut self) -> &mut BTreeMap<FieldKey, FieldValue> {
        self.pending
            .get_or_insert_with(|| self.base.entries().clone())
    }
}
