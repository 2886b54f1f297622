//! Internationalization (i18n) support
//!
//! UI strings ship embedded for `pt-BR` and `en`. Lookups fall back from the
//! full tag to its primary subtag, then to English, then to the key itself.

use anyhow::Result;
use std::collections::HashMap;

const BUILTIN: &[(&str, &str)] = &[
    ("pt-BR", include_str!("pt-BR.yml")),
    ("en", include_str!("en.yml")),
];

/// Internationalization handler
#[derive(Debug, Clone)]
pub struct I18n {
    /// Current language
    language: String,
    /// Language data: lang -> key -> translation
    translations: HashMap<String, HashMap<String, serde_yaml::Value>>,
}

impl I18n {
    /// Create a handler with the embedded languages loaded
    pub fn new(language: &str) -> Result<Self> {
        let mut translations = HashMap::new();
        for (lang, source) in BUILTIN {
            let data: HashMap<String, serde_yaml::Value> = serde_yaml::from_str(source)?;
            translations.insert(lang.to_string(), data);
        }

        Ok(Self {
            language: language.to_string(),
            translations,
        })
    }

    /// Languages tried for a lookup, most specific first
    fn candidates(&self) -> Vec<String> {
        let mut langs = vec![self.language.clone()];
        if let Some((primary, _)) = self.language.split_once('-') {
            langs.push(primary.to_string());
        }
        // "pt" should still reach "pt-BR"
        let primary = self.language.split('-').next().unwrap_or_default();
        langs.extend(
            self.translations
                .keys()
                .filter(|k| k.split('-').next() == Some(primary))
                .cloned(),
        );
        langs.push("en".to_string());
        langs
    }

    /// Get a translation by key
    /// Key can be nested like "post.edited"
    pub fn get(&self, key: &str) -> String {
        for lang in self.candidates() {
            if let Some(lang_data) = self.translations.get(&lang) {
                if let Some(value) = get_nested_value(lang_data, key) {
                    return yaml_value_to_string(value);
                }
            }
        }

        // Return key as fallback
        key.to_string()
    }

    /// Get a translation and fill its `{name}` placeholders
    pub fn format(&self, key: &str, args: &[(&str, &str)]) -> String {
        args.iter()
            .fold(self.get(key), |acc, (name, value)| {
                acc.replace(&format!("{{{}}}", name), value)
            })
    }

    /// All translations for the current language as a flat HashMap
    /// Nested keys use dot notation (e.g., "post.prev")
    pub fn get_all_translations(&self) -> HashMap<String, String> {
        let mut result = HashMap::new();

        for lang in self.candidates() {
            if let Some(lang_data) = self.translations.get(&lang) {
                let mut flat = HashMap::new();
                flatten_translations(lang_data, "", &mut flat);
                for (k, v) in flat {
                    result.entry(k).or_insert(v);
                }
            }
        }

        result
    }
}

/// Get a nested value from a YAML map using dot notation
fn get_nested_value<'a>(
    data: &'a HashMap<String, serde_yaml::Value>,
    key: &str,
) -> Option<&'a serde_yaml::Value> {
    let mut parts = key.split('.');
    let mut current: Option<&serde_yaml::Value> = data.get(parts.next()?);

    for part in parts {
        match current {
            Some(serde_yaml::Value::Mapping(map)) => {
                current = map.get(serde_yaml::Value::String(part.to_string()));
            }
            _ => return None,
        }
    }

    current
}

/// Convert a YAML value to a string
fn yaml_value_to_string(value: &serde_yaml::Value) -> String {
    match value {
        serde_yaml::Value::String(s) => s.clone(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Null => String::new(),
        _ => format!("{:?}", value),
    }
}

/// Flatten translations into a HashMap with dot-notation keys
fn flatten_translations(
    data: &HashMap<String, serde_yaml::Value>,
    prefix: &str,
    result: &mut HashMap<String, String>,
) {
    for (key, value) in data {
        let full_key = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{}.{}", prefix, key)
        };

        match value {
            serde_yaml::Value::Mapping(map) => {
                let nested: HashMap<String, serde_yaml::Value> = map
                    .iter()
                    .filter_map(|(k, v)| Some((k.as_str()?.to_string(), v.clone())))
                    .collect();
                flatten_translations(&nested, &full_key, result);
            }
            serde_yaml::Value::Sequence(_) | serde_yaml::Value::Tagged(_) => {}
            other => {
                result.insert(full_key, yaml_value_to_string(other));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_portuguese() {
        let i18n = I18n::new("pt-BR").unwrap();
        assert_eq!(i18n.get("listing.load_more"), "Carregar mais posts");
        assert_eq!(i18n.get("post.prev"), "Post anterior");
    }

    #[test]
    fn test_primary_subtag_reaches_regional_table() {
        let i18n = I18n::new("pt").unwrap();
        assert_eq!(i18n.get("post.next"), "Próximo post");
    }

    #[test]
    fn test_unknown_language_falls_back_to_english() {
        let i18n = I18n::new("de-DE").unwrap();
        assert_eq!(i18n.get("preview.exit"), "Exit preview mode");
        assert_eq!(i18n.get("unknown.key"), "unknown.key");
        assert_eq!(i18n.get("error.not_found.title"), "Page not found");
    }

    #[test]
    fn test_format_placeholders() {
        let i18n = I18n::new("pt-BR").unwrap();
        assert_eq!(
            i18n.format("post.edited", &[("date", "19 mar 2021"), ("time", "15:49")]),
            "* editado em 19 mar 2021, às 15:49"
        );
        assert_eq!(i18n.format("post.reading_time", &[("minutes", "4")]), "4 min");
    }

    #[test]
    fn test_get_all_translations() {
        let i18n = I18n::new("pt-BR").unwrap();
        let all = i18n.get_all_translations();
        assert_eq!(all.get("back_home"), Some(&"Voltar para o início".to_string()));
        assert_eq!(all.get("preview.exit"), Some(&"Sair do modo Preview".to_string()));
    }

    #[test]
    fn test_every_language_has_the_same_keys() {
        let pt = I18n::new("pt-BR").unwrap().get_all_translations();
        let en = I18n::new("en").unwrap();
        let mut en_flat = HashMap::new();
        flatten_translations(&en.translations["en"], "", &mut en_flat);
        let mut pt_keys: Vec<_> = pt.keys().collect();
        let mut en_keys: Vec<_> = en_flat.keys().collect();
        pt_keys.sort();
        en_keys.sort();
        assert_eq!(pt_keys, en_keys);
    }
}
