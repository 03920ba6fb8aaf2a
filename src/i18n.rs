use std::collections::{HashMap, HashSet};
use std::sync::{Arc, OnceLock, RwLock};

use gpui::SharedString;
use rust_embed::RustEmbed;
use tracing::warn;

pub const DEFAULT_LOCALE: &str = "en-US";

#[derive(RustEmbed)]
#[folder = "locales/"]
struct LocaleAssets;

#[derive(Clone, Debug, Eq, PartialEq, Default)]
pub enum Locale {
    #[default]
    System,
    Tag(String),
}

impl From<String> for Locale {
    fn from(value: String) -> Self {
        if value.trim().eq_ignore_ascii_case("system") {
            return Self::System;
        }
        Self::Tag(value.trim().to_string())
    }
}

impl From<&str> for Locale {
    fn from(value: &str) -> Self {
        Self::from(value.to_string())
    }
}

/// Message templates for the active locale.
///
/// Templates come from the embedded catalogs; applications may override
/// single keys at runtime. Missing keys resolve to the key itself.
#[derive(Clone)]
pub struct I18nManager {
    catalog: &'static I18nCatalog,
    locale: Arc<RwLock<Locale>>,
    overrides: Arc<RwLock<HashMap<String, SharedString>>>,
}

impl Default for I18nManager {
    fn default() -> Self {
        Self::new()
    }
}

impl I18nManager {
    pub fn new() -> Self {
        static CATALOG: OnceLock<I18nCatalog> = OnceLock::new();
        Self {
            catalog: CATALOG.get_or_init(I18nCatalog::load),
            locale: Arc::new(RwLock::new(Locale::System)),
            overrides: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn with_locale(self, locale: impl Into<Locale>) -> Self {
        self.set_locale(locale);
        self
    }

    pub fn locale(&self) -> Locale {
        match self.locale.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn set_locale(&self, locale: impl Into<Locale>) {
        let mut state = match self.locale.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        *state = locale.into();
    }

    /// Replaces the template of `key` for every locale.
    pub fn override_message(&self, key: impl Into<String>, template: impl Into<SharedString>) {
        let mut overrides = match self.overrides.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        overrides.insert(key.into(), template.into());
    }

    pub fn default_locale(&self) -> &'static str {
        self.catalog.default_locale
    }

    pub fn resolved_locale(&self) -> &'static str {
        self.catalog
            .resolve_locale(self.requested_locale().as_deref())
    }

    pub fn available_locales(&self) -> Vec<&'static str> {
        let mut locales = self.catalog.locales.keys().copied().collect::<Vec<_>>();
        locales.sort_unstable();
        locales
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    pub fn t(&self, key: &str) -> SharedString {
        self.lookup(key)
            .unwrap_or_else(|| key.to_string().into())
    }

    pub fn t_with(&self, key: &str, params: &[(&str, &str)]) -> SharedString {
        let template = self.lookup(key);
        if params.is_empty() {
            return template.unwrap_or_else(|| key.to_string().into());
        }

        match template {
            Some(template) => format_string(&template, params).into(),
            None => format_string(key, params).into(),
        }
    }

    #[cfg(feature = "i18n")]
    fn requested_locale(&self) -> Option<String> {
        match self.locale() {
            Locale::System => sys_locale::get_locale(),
            Locale::Tag(tag) => Some(tag),
        }
    }

    #[cfg(not(feature = "i18n"))]
    fn requested_locale(&self) -> Option<String> {
        match self.locale() {
            Locale::System => None,
            Locale::Tag(tag) => Some(tag),
        }
    }

    fn lookup(&self, key: &str) -> Option<SharedString> {
        let overridden = match self.overrides.read() {
            Ok(guard) => guard.get(key).cloned(),
            Err(poisoned) => poisoned.into_inner().get(key).cloned(),
        };
        if overridden.is_some() {
            return overridden;
        }
        let resolved = self.resolved_locale();
        self.catalog
            .lookup(resolved, key)
            .or_else(|| self.catalog.lookup(self.catalog.default_locale, key))
            .map(SharedString::from)
    }
}

struct I18nCatalog {
    default_locale: &'static str,
    locales: HashMap<&'static str, HashMap<String, &'static str>>,
    normalized_locale_lookup: HashMap<String, &'static str>,
    language_lookup: HashMap<String, &'static str>,
}

impl I18nCatalog {
    fn load() -> Self {
        let mut locales = HashMap::new();
        let mut normalized_locale_lookup = HashMap::new();
        let mut language_lookup = HashMap::new();
        let mut ambiguous_languages = HashSet::new();

        for path in LocaleAssets::iter() {
            let Some(locale) = path.strip_suffix(".toml") else {
                continue;
            };
            let locale: &'static str = Box::leak(locale.to_string().into_boxed_str());
            let Some(entries) = load_entries(&path) else {
                continue;
            };

            let normalized = normalize_locale_tag(locale);
            normalized_locale_lookup.insert(normalized.clone(), locale);

            let language = normalized.split('-').next().unwrap_or_default().to_string();
            if let Some(existing) = language_lookup.get(&language) {
                if *existing != locale {
                    ambiguous_languages.insert(language.clone());
                }
            } else {
                language_lookup.insert(language, locale);
            }

            locales.insert(locale, entries);
        }

        for language in ambiguous_languages {
            language_lookup.remove(&language);
        }

        if !locales.contains_key(DEFAULT_LOCALE) {
            warn!(locale = DEFAULT_LOCALE, "default locale catalog is missing");
            locales.insert(DEFAULT_LOCALE, HashMap::new());
            normalized_locale_lookup.insert(normalize_locale_tag(DEFAULT_LOCALE), DEFAULT_LOCALE);
            let language = normalize_locale_tag(DEFAULT_LOCALE)
                .split('-')
                .next()
                .unwrap_or_default()
                .to_string();
            language_lookup.entry(language).or_insert(DEFAULT_LOCALE);
        }

        Self {
            default_locale: DEFAULT_LOCALE,
            locales,
            normalized_locale_lookup,
            language_lookup,
        }
    }

    fn resolve_locale(&self, requested: Option<&str>) -> &'static str {
        let Some(requested) = requested else {
            return self.default_locale;
        };

        let normalized = normalize_locale_tag(requested);
        if let Some(locale) = self.normalized_locale_lookup.get(&normalized) {
            return *locale;
        }

        let language = normalized.split('-').next().unwrap_or_default();
        if let Some(locale) = self.language_lookup.get(language) {
            return *locale;
        }

        self.default_locale
    }

    fn lookup(&self, locale: &'static str, key: &str) -> Option<&'static str> {
        self.locales
            .get(locale)
            .and_then(|entries| entries.get(key).copied())
    }
}

fn load_entries(path: &str) -> Option<HashMap<String, &'static str>> {
    let file = LocaleAssets::get(path)?;
    let text = match std::str::from_utf8(&file.data) {
        Ok(text) => text,
        Err(error) => {
            warn!(path, %error, "locale catalog is not valid UTF-8");
            return None;
        }
    };
    let table = match toml::from_str::<toml::Table>(text) {
        Ok(table) => table,
        Err(error) => {
            warn!(path, %error, "failed to parse locale catalog");
            return None;
        }
    };

    let mut entries = HashMap::new();
    flatten_table("", &table, &mut entries);
    Some(entries)
}

fn flatten_table(prefix: &str, table: &toml::Table, entries: &mut HashMap<String, &'static str>) {
    for (key, value) in table {
        let full_key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            toml::Value::String(text) => {
                entries.insert(full_key, Box::leak(text.clone().into_boxed_str()));
            }
            toml::Value::Table(nested) => flatten_table(&full_key, nested, entries),
            _ => warn!(key = %full_key, "ignoring non-string locale entry"),
        }
    }
}

fn normalize_locale_tag(tag: &str) -> String {
    let trimmed = tag.trim();
    let without_encoding = trimmed.split('.').next().unwrap_or(trimmed);
    let without_variant = without_encoding
        .split('@')
        .next()
        .unwrap_or(without_encoding);
    without_variant
        .replace('_', "-")
        .split('-')
        .filter(|segment| !segment.is_empty())
        .map(|segment| segment.to_ascii_lowercase())
        .collect::<Vec<_>>()
        .join("-")
}

/// Replaces every `{key}` in `template` with the matching parameter.
///
/// Substitution is literal: unknown tokens and unterminated braces are
/// copied through unchanged.
pub fn format_string(template: &str, params: &[(&str, &str)]) -> String {
    let values = params.iter().copied().collect::<HashMap<&str, &str>>();
    let mut output = String::with_capacity(template.len());
    let mut cursor = 0;

    while cursor < template.len() {
        let tail = &template[cursor..];
        let Some(open_rel) = tail.find('{') else {
            output.push_str(tail);
            break;
        };

        let open = cursor + open_rel;
        output.push_str(&template[cursor..open]);

        let token_start = open + 1;
        let Some(close_rel) = template[token_start..].find('}') else {
            output.push_str(&template[open..]);
            break;
        };
        let close = token_start + close_rel;
        let token = &template[token_start..close];

        if let Some(value) = values.get(token) {
            output.push_str(value);
        } else {
            output.push_str(&template[open..=close]);
        }

        cursor = close + 1;
    }

    output
}
