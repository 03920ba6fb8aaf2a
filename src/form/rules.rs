use std::sync::Arc;

use gpui::SharedString;
use rust_decimal::Decimal;

use super::value::FieldValue;
use crate::i18n::{I18nManager, format_string};

pub type RuleFn = Arc<dyn Fn(&FieldValue) -> bool + Send + Sync>;

#[derive(Clone)]
pub enum RuleKind {
    NotBlank,
    MinLength(usize),
    MaxLength(usize),
    Min(Decimal),
    Max(Decimal),
    OneOf(Vec<FieldValue>),
    Custom(RuleFn),
}

/// One declarative check attached to a value field.
///
/// Blank values pass every rule except [`RuleKind::NotBlank`]; missing
/// values are the required gate's concern. A custom message may use the
/// `{label}`, `{min}` and `{max}` placeholders.
#[derive(Clone)]
pub struct ValidateRule {
    pub kind: RuleKind,
    pub message: Option<SharedString>,
}

impl ValidateRule {
    pub fn new(kind: RuleKind) -> Self {
        Self {
            kind,
            message: None,
        }
    }

    pub fn not_blank() -> Self {
        Self::new(RuleKind::NotBlank)
    }

    pub fn min_length(value: usize) -> Self {
        Self::new(RuleKind::MinLength(value))
    }

    pub fn max_length(value: usize) -> Self {
        Self::new(RuleKind::MaxLength(value))
    }

    pub fn min(value: impl Into<Decimal>) -> Self {
        Self::new(RuleKind::Min(value.into()))
    }

    pub fn max(value: impl Into<Decimal>) -> Self {
        Self::new(RuleKind::Max(value.into()))
    }

    pub fn one_of(values: impl IntoIterator<Item = FieldValue>) -> Self {
        Self::new(RuleKind::OneOf(values.into_iter().collect()))
    }

    pub fn custom(
        predicate: impl Fn(&FieldValue) -> bool + Send + Sync + 'static,
        message: impl Into<SharedString>,
    ) -> Self {
        Self {
            kind: RuleKind::Custom(Arc::new(predicate)),
            message: Some(message.into()),
        }
    }

    pub fn message(mut self, value: impl Into<SharedString>) -> Self {
        self.message = Some(value.into());
        self
    }

    pub fn check(
        &self,
        value: &FieldValue,
        label: &str,
        i18n: &I18nManager,
    ) -> Option<SharedString> {
        let (passed, key, bound) = match &self.kind {
            RuleKind::NotBlank => (
                value.as_text().is_none_or(|text| !text.trim().is_empty())
                    && !matches!(value, FieldValue::Empty),
                "rules.not_blank",
                None,
            ),
            RuleKind::MinLength(min) => (
                value.is_blank() || value_length(value).is_none_or(|len| len >= *min),
                "rules.min_length",
                Some(("min", min.to_string())),
            ),
            RuleKind::MaxLength(max) => (
                value.is_blank() || value_length(value).is_none_or(|len| len <= *max),
                "rules.max_length",
                Some(("max", max.to_string())),
            ),
            RuleKind::Min(min) => (
                value.as_number().is_none_or(|number| number >= *min),
                "rules.min",
                Some(("min", min.to_string())),
            ),
            RuleKind::Max(max) => (
                value.as_number().is_none_or(|number| number <= *max),
                "rules.max",
                Some(("max", max.to_string())),
            ),
            RuleKind::OneOf(allowed) => (
                value.is_blank() || allowed.contains(value),
                "rules.one_of",
                None,
            ),
            RuleKind::Custom(predicate) => (value.is_blank() || predicate(value), "", None),
        };
        if passed {
            return None;
        }

        let mut params = vec![("label", label)];
        if let Some((name, bound)) = &bound {
            params.push((*name, bound.as_str()));
        }
        Some(match &self.message {
            Some(message) => format_string(message, &params).into(),
            None => i18n.t_with(key, &params),
        })
    }
}

fn value_length(value: &FieldValue) -> Option<usize> {
    match value {
        FieldValue::Text(text) => Some(text.chars().count()),
        FieldValue::List(items) => Some(items.len()),
        _ => None,
    }
}

pub fn check_rules(
    rules: &[ValidateRule],
    value: &FieldValue,
    label: &str,
    i18n: &I18nManager,
) -> Option<SharedString> {
    rules
        .iter()
        .find_map(|rule| rule.check(value, label, i18n))
}
