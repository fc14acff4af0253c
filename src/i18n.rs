//! Localized reply templates
//!
//! Every user-facing line the bot sends is looked up by key in a per-locale
//! table and rendered by substituting `{name}` placeholders.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;
use tokio::fs;
use tracing::{debug, info, warn};

/// The English table shipped with the binary
const EMBEDDED_EN: &str = include_str!("../locales/en.json");
const EMBEDDED_LOCALE: &str = "en";

/// Lookup table of reply templates keyed by locale, then by message key
pub struct Localizer {
    /// Locale used when a table or key is missing
    default_locale: String,
    /// Locale -> (key -> template)
    tables: HashMap<String, HashMap<String, String>>,
}

impl Localizer {
    /// Create a localizer with the embedded English table loaded
    ///
    /// # Arguments
    /// * `default_locale` - The locale to fall back to for missing keys
    ///
    /// # Returns
    /// A Result containing the Localizer, or an error if the embedded table is malformed
    pub fn new(default_locale: &str) -> Result<Self> {
        let mut localizer = Localizer {
            default_locale: default_locale.to_string(),
            tables: HashMap::new(),
        };
        localizer.load_table(EMBEDDED_LOCALE, EMBEDDED_EN)?;
        Ok(localizer)
    }

    /// Parse a flat JSON object of key -> template and merge it into a locale
    pub fn load_table(&mut self, locale: &str, json: &str) -> Result<()> {
        let table: HashMap<String, String> = serde_json::from_str(json)
            .with_context(|| format!("invalid translation table for locale '{}'", locale))?;

        debug!("Loaded {} templates for locale {}", table.len(), locale);
        self.tables
            .entry(locale.to_string())
            .or_default()
            .extend(table);
        Ok(())
    }

    /// Load every `<locale>.json` file in a directory
    ///
    /// # Returns
    /// The number of tables loaded
    pub async fn load_dir(&mut self, dir: &Path) -> Result<usize> {
        let mut entries = fs::read_dir(dir)
            .await
            .with_context(|| format!("cannot read locale directory {}", dir.display()))?;
        let mut loaded = 0;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("json") {
                continue;
            }
            let Some(locale) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };

            let content = fs::read_to_string(&path).await?;
            self.load_table(locale, &content)?;
            loaded += 1;
        }

        info!("Loaded {} locale tables from {}", loaded, dir.display());
        Ok(loaded)
    }

    /// Find the raw template for a key
    ///
    /// Falls back to the default locale, then to the embedded English table.
    pub fn template(&self, locale: &str, key: &str) -> Option<&str> {
        [locale, self.default_locale.as_str(), EMBEDDED_LOCALE]
            .into_iter()
            .find_map(|candidate| self.tables.get(candidate)?.get(key))
            .map(String::as_str)
    }

    /// Render a template with its substitutions
    ///
    /// An unknown key renders as the key itself so the reply is never lost.
    pub fn render(&self, locale: &str, key: &str, substitutions: &[(&str, String)]) -> String {
        let Some(template) = self.template(locale, key) else {
            warn!("No template for key {} in locale {}", key, locale);
            return key.to_string();
        };

        substitute(template, substitutions)
    }
}

/// Replace each `{name}` in a template with its value in one pass
///
/// Inserted values are written verbatim and never rescanned, so braces in
/// user-supplied text survive. Placeholders without a value are kept as-is.
fn substitute(template: &str, substitutions: &[(&str, String)]) -> String {
    let mut text = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        text.push_str(&rest[..open]);
        let after = &rest[open + 1..];

        let Some(close) = after.find(['{', '}']) else {
            text.push_str(&rest[open..]);
            return text;
        };
        if after[close..].starts_with('{') {
            // "{{name}": the first brace is literal
            text.push('{');
            rest = after;
            continue;
        }

        let name = &after[..close];
        match substitutions.iter().find(|(key, _)| *key == name) {
            Some((_, value)) => text.push_str(value),
            None => text.push_str(&rest[open..open + close + 2]),
        }
        rest = &after[close + 1..];
    }

    text.push_str(rest);
    text
}

/// Join items the way a sentence would: "a", "a and b", "a, b and c"
pub fn english_list<S: AsRef<str>>(items: &[S]) -> String {
    match items {
        [] => String::new(),
        [only] => only.as_ref().to_string(),
        [init @ .., last] => {
            let head: Vec<&str> = init.iter().map(AsRef::as_ref).collect();
            format!("{} and {}", head.join(", "), last.as_ref())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    #[test]
    fn test_render_substitutes_placeholders() {
        let localizer = Localizer::new("en").unwrap();
        let text = localizer.render(
            "en",
            "command.publiconly",
            &[("command", "rescue".to_string())],
        );
        assert_eq!(text, "rescue can only be used in a channel.");
    }

    #[test]
    fn test_substituted_values_are_not_expanded() {
        let localizer = Localizer::new("en").unwrap();
        let text = localizer.render(
            "en",
            "command.toomanyparams",
            &[
                ("command", "{usage}".to_string()),
                ("usage", "Usage: rescue <case id>.".to_string()),
                ("example", "{command}".to_string()),
            ],
        );
        assert_eq!(
            text,
            "Too many parameters for {usage}. Usage: rescue <case id>. {command}"
        );
    }

    #[test]
    fn test_substitute_keeps_unmatched_braces() {
        let subs = [("name", "Alice".to_string())];
        assert_eq!(substitute("hi {name}", &subs), "hi Alice");
        assert_eq!(substitute("{other} {name}", &subs), "{other} Alice");
        assert_eq!(substitute("{{name}}", &subs), "{Alice}");
        assert_eq!(substitute("open { brace", &subs), "open { brace");
        assert_eq!(substitute("", &subs), "");
    }

    #[test]
    fn test_unknown_key_renders_key() {
        let localizer = Localizer::new("en").unwrap();
        assert_eq!(localizer.render("en", "no.such.key", &[]), "no.such.key");
    }

    #[test]
    fn test_missing_locale_falls_back_to_default() {
        let mut localizer = Localizer::new("en").unwrap();
        localizer
            .load_table("de", r#"{"help.empty": "Keine Befehle registriert."}"#)
            .unwrap();

        assert_eq!(localizer.render("de", "help.empty", &[]), "Keine Befehle registriert.");
        assert_eq!(
            localizer.render("de", "help.notfound", &[("topic", "fly".to_string())]),
            "There is no command or category called fly."
        );
    }

    #[test]
    fn test_unknown_default_locale_still_renders_english() {
        let localizer = Localizer::new("xx").unwrap();
        assert_eq!(localizer.render("xx", "help.empty", &[]), "No commands are registered.");
    }

    #[test]
    fn test_malformed_table_is_rejected() {
        let mut localizer = Localizer::new("en").unwrap();
        assert!(localizer.load_table("fr", "[1, 2, 3]").is_err());
    }

    #[tokio::test]
    async fn test_load_dir_reads_json_files() -> Result<()> {
        let dir = TempDir::new()?;
        let mut file = std::fs::File::create(dir.path().join("es.json"))?;
        write!(file, r#"{{"help.empty": "No hay comandos."}}"#)?;
        std::fs::write(dir.path().join("notes.txt"), "ignored")?;

        let mut localizer = Localizer::new("en")?;
        let loaded = localizer.load_dir(dir.path()).await?;

        assert_eq!(loaded, 1);
        assert_eq!(localizer.template("es", "help.empty"), Some("No hay comandos."));
        Ok(())
    }

    #[test]
    fn test_english_list() {
        assert_eq!(english_list::<&str>(&[]), "");
        assert_eq!(english_list(&["all"]), "all");
        assert_eq!(english_list(&["all", "quiet"]), "all and quiet");
        assert_eq!(english_list(&["a", "b", "c"]), "a, b and c");
    }
}
