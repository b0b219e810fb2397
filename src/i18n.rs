use std::collections::HashMap;
use std::sync::OnceLock;

/// Global localization state
static LOCALIZER: OnceLock<Localizer> = OnceLock::new();

fn localizer() -> &'static Localizer {
    LOCALIZER.get_or_init(Localizer::new)
}

/// Load messages up front. Lookups initialize lazily too, so calling this is
/// only needed to pay the cost before any output is produced.
pub fn init() {
    localizer();
}

/// Get a localized message by key
pub fn t(key: &str) -> String {
    localizer().get(key)
}

/// Get a localized message by key with `{$name}` arguments substituted
pub fn t_with_args(key: &str, args: &[(&str, &dyn std::fmt::Display)]) -> String {
    localizer().get_with_args(key, args)
}

#[derive(Debug)]
pub struct Localizer {
    messages: HashMap<String, String>,
    fallback: HashMap<String, String>,
}

impl Localizer {
    fn new() -> Self {
        Self::for_language(&Self::detect_language())
    }

    fn for_language(language: &str) -> Self {
        Self {
            messages: Self::load_messages(language),
            fallback: Self::load_messages("en"),
        }
    }

    fn detect_language() -> String {
        for var in ["LC_ALL", "LC_MESSAGES", "LANG"] {
            if let Ok(value) = std::env::var(var) {
                // "nn_NO.UTF-8" -> "nn"
                let lang_code = value
                    .split(['.', '_', '-'])
                    .next()
                    .unwrap_or_default()
                    .to_lowercase();

                match lang_code.as_str() {
                    "nn" | "nno" => return "nn".to_string(),
                    "en" => return "en".to_string(),
                    _ => continue,
                }
            }
        }

        "en".to_string()
    }

    fn load_messages(language: &str) -> HashMap<String, String> {
        let content = match language {
            "nn" => include_str!("../locales/nn.ftl"),
            _ => include_str!("../locales/en.ftl"),
        };

        // Simple `key = value` lines; `#` starts a comment
        content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .filter_map(|line| line.split_once(" = "))
            .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
            .collect()
    }

    fn get(&self, key: &str) -> String {
        self.messages
            .get(key)
            .or_else(|| self.fallback.get(key))
            .cloned()
            .unwrap_or_else(|| {
                tracing::warn!("missing translation key: {key}");
                format!("MISSING: {key}")
            })
    }

    fn get_with_args(&self, key: &str, args: &[(&str, &dyn std::fmt::Display)]) -> String {
        let mut message = self.get(key);

        for (var_name, value) in args {
            let placeholder = format!("{{${var_name}}}");
            message = message.replace(&placeholder, &format!("{value}"));
        }

        message
    }
}

// Convenience macros for common usage patterns
#[macro_export]
macro_rules! t {
    ($key:expr) => {
        $crate::i18n::t($key)
    };
}

#[macro_export]
macro_rules! t_args {
    ($key:expr, $($name:expr => $value:expr),* $(,)?) => {{
        let args: &[(&str, &dyn std::fmt::Display)] = &[
            $(
                ($name, &$value),
            )*
        ];
        $crate::i18n::t_with_args($key, args)
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_nynorsk_key_exists_in_english_and_back() {
        let en = Localizer::load_messages("en");
        let nn = Localizer::load_messages("nn");
        let mut missing: Vec<_> = en.keys().filter(|k| !nn.contains_key(*k)).collect();
        missing.extend(nn.keys().filter(|k| !en.contains_key(*k)));
        assert!(missing.is_empty(), "keys not in both locales: {missing:?}");
    }

    #[test]
    fn arguments_are_substituted() {
        let l = Localizer::for_language("en");
        let msg = l.get_with_args("html-folder", &[("folder", &"testcases/CWE366")]);
        assert!(msg.contains("testcases/CWE366"));
        assert!(!msg.contains("{$folder}"));
    }

    #[test]
    fn language_detection_does_not_panic() {
        let _lang = Localizer::detect_language();
    }
}
