use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

use gpui::SharedString;
use rust_decimal::Decimal;

use super::draft::FormDraft;

#[derive(Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct FieldKey(SharedString);

impl FieldKey {
    pub fn new(value: impl Into<SharedString>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        self.0.as_ref()
    }

    pub fn as_shared(&self) -> &SharedString {
        &self.0
    }
}

impl Display for FieldKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&'static str> for FieldKey {
    fn from(value: &'static str) -> Self {
        Self::new(value)
    }
}

impl From<String> for FieldKey {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl From<SharedString> for FieldKey {
    fn from(value: SharedString) -> Self {
        Self(value)
    }
}

/// A single form value. `Empty` stands for an absent, null or undefined value.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub enum FieldValue {
    #[default]
    Empty,
    Bool(bool),
    Number(Decimal),
    Text(SharedString),
    List(Vec<FieldValue>),
    Map(BTreeMap<SharedString, FieldValue>),
}

impl FieldValue {
    pub fn text(value: impl Into<SharedString>) -> Self {
        Self::Text(value.into())
    }

    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Empty => true,
            FieldValue::Text(text) => text.is_empty(),
            _ => false,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text.as_ref()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<Decimal> {
        match self {
            FieldValue::Number(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[FieldValue]> {
        match self {
            FieldValue::List(items) => Some(items),
            _ => None,
        }
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<Decimal> for FieldValue {
    fn from(value: Decimal) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Number(Decimal::from(value))
    }
}

impl From<&'static str> for FieldValue {
    fn from(value: &'static str) -> Self {
        Self::Text(value.into())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value.into())
    }
}

impl From<SharedString> for FieldValue {
    fn from(value: SharedString) -> Self {
        Self::Text(value)
    }
}

impl<T> From<Option<T>> for FieldValue
where
    T: Into<FieldValue>,
{
    fn from(value: Option<T>) -> Self {
        value.map_or(FieldValue::Empty, Into::into)
    }
}

impl From<Vec<FieldValue>> for FieldValue {
    fn from(value: Vec<FieldValue>) -> Self {
        Self::List(value)
    }
}

pub(super) static EMPTY: FieldValue = FieldValue::Empty;

/// Immutable snapshot of the form's values.
///
/// Snapshots are never mutated in place: [`FormValues::produce`] builds the
/// next snapshot from a draft, so a reader holding an older snapshot keeps a
/// consistent view.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FormValues {
    entries: Arc<BTreeMap<FieldKey, FieldValue>>,
}

impl FormValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &FieldKey) -> &FieldValue {
        self.entries.get(key).unwrap_or(&EMPTY)
    }

    pub fn get_named(&self, name: &'static str) -> &FieldValue {
        self.get(&FieldKey::new(name))
    }

    pub fn contains_key(&self, key: &FieldKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &FieldKey> {
        self.entries.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&FieldKey, &FieldValue)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn produce(&self, recipe: impl FnOnce(&mut FormDraft)) -> Self {
        let mut draft = FormDraft::from_values(self);
        recipe(&mut draft);
        draft.finish()
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.entries, &other.entries)
    }

    pub(super) fn from_entries(entries: BTreeMap<FieldKey, FieldValue>) -> Self {
        Self {
            entries: Arc::new(entries),
        }
    }

    pub(super) fn entries(&self) -> &BTreeMap<FieldKey, FieldValue> {
        &self.entries
    }
}

impl<K, V> FromIterator<(K, V)> for FormValues
where
    K: Into<FieldKey>,
    V: Into<FieldValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self::from_entries(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

/// Partial error map returned by custom-multiple validators and server
/// error reports. `None` clears an entry.
pub type ErrorPatch = BTreeMap<FieldKey, Option<SharedString>>;

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FormErrors {
    entries: Arc<BTreeMap<FieldKey, Option<SharedString>>>,
}

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &FieldKey) -> Option<&SharedString> {
        self.entries.get(key).and_then(Option::as_ref)
    }

    pub fn get_named(&self, name: &'static str) -> Option<&SharedString> {
        self.get(&FieldKey::new(name))
    }

    pub fn contains_key(&self, key: &FieldKey) -> bool {
        self.entries.contains_key(key)
    }

    pub fn has_errors(&self) -> bool {
        self.entries.values().any(Option::is_some)
    }

    pub fn messages(&self) -> impl Iterator<Item = (&FieldKey, &SharedString)> {
        self.entries
            .iter()
            .filter_map(|(key, message)| message.as_ref().map(|message| (key, message)))
    }

    pub fn first_error(&self) -> Option<&FieldKey> {
        self.messages().next().map(|(key, _)| key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn with_entry(&self, key: FieldKey, message: Option<SharedString>) -> Self {
        let mut next = (*self.entries).clone();
        next.insert(key, message);
        Self::from_entries(next)
    }

    pub fn replace_group<'a>(
        &self,
        names: impl IntoIterator<Item = &'a FieldKey>,
        patch: ErrorPatch,
    ) -> Self {
        let mut next = (*self.entries).clone();
        for name in names {
            next.insert(name.clone(), None);
        }
        next.extend(patch);
        Self::from_entries(next)
    }

    pub(super) fn from_entries(entries: BTreeMap<FieldKey, Option<SharedString>>) -> Self {
        Self {
            entries: Arc::new(entries),
        }
    }

    pub(super) fn entries(&self) -> &BTreeMap<FieldKey, Option<SharedString>> {
        &self.entries
    }
}

impl From<ErrorPatch> for FormErrors {
    fn from(value: ErrorPatch) -> Self {
        Self::from_entries(value)
    }
}
