//! Config data model.

use std::path::PathBuf;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ConfigError, Result};

/// Entry points of a build.
///
/// Deserializes from a string, a list of strings, or a map of chunk name to
/// entry specifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InputOption {
    Single(String),
    Multiple(Vec<String>),
    /// Chunk name -> entry specifier, in declaration order.
    Named(IndexMap<String, String>),
}

impl InputOption {
    /// `(explicit chunk name, specifier)` pairs in declaration order.
    pub fn entries(&self) -> Vec<(Option<&str>, &str)> {
        match self {
            InputOption::Single(entry) => vec![(None, entry.as_str())],
            InputOption::Multiple(entries) => {
                entries.iter().map(|entry| (None, entry.as_str())).collect()
            }
            InputOption::Named(entries) => entries
                .iter()
                .map(|(name, entry)| (Some(name.as_str()), entry.as_str()))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            InputOption::Single(_) => 1,
            InputOption::Multiple(entries) => entries.len(),
            InputOption::Named(entries) => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for InputOption {
    fn default() -> Self {
        InputOption::Multiple(Vec::new())
    }
}

impl From<&str> for InputOption {
    fn from(entry: &str) -> Self {
        InputOption::Single(entry.to_string())
    }
}

impl From<String> for InputOption {
    fn from(entry: String) -> Self {
        InputOption::Single(entry)
    }
}

impl From<Vec<String>> for InputOption {
    fn from(entries: Vec<String>) -> Self {
        InputOption::Multiple(entries)
    }
}

impl From<Vec<&str>> for InputOption {
    fn from(entries: Vec<&str>) -> Self {
        InputOption::Multiple(entries.into_iter().map(str::to_string).collect())
    }
}

impl From<IndexMap<String, String>> for InputOption {
    fn from(entries: IndexMap<String, String>) -> Self {
        InputOption::Named(entries)
    }
}

/// Settings of the `[build]` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildSettings {
    #[serde(default)]
    pub input: InputOption,

    /// Base directory for entries, aliases and relative ids. Discovery fills
    /// this with the directory the config was found in.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cwd: Option<PathBuf>,

    #[serde(default)]
    pub sourcemap: bool,

    #[serde(default = "default_true")]
    pub treeshake: bool,

    /// Packages left as imports (exact name or `name/` prefix)
    #[serde(default)]
    pub external: Vec<String>,

    /// Fail on ambiguous star re-exports instead of dropping the name
    #[serde(default)]
    pub strict: bool,

    /// Path aliases such as `"@" = "./src"`
    #[serde(default)]
    pub alias: IndexMap<String, String>,

    #[serde(default = "default_out_dir")]
    pub out_dir: PathBuf,

    /// Output file name pattern; must contain `[name]`
    #[serde(default = "default_entry_file_names")]
    pub entry_file_names: String,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            input: InputOption::default(),
            cwd: None,
            sourcemap: false,
            treeshake: true,
            external: Vec::new(),
            strict: false,
            alias: IndexMap::new(),
            out_dir: default_out_dir(),
            entry_file_names: default_entry_file_names(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_out_dir() -> PathBuf {
    PathBuf::from("dist")
}

fn default_entry_file_names() -> String {
    "[name].js".to_string()
}

/// Top-level knit configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KnitConfig {
    #[serde(default)]
    pub build: BuildSettings,
}

impl KnitConfig {
    /// Create from a JSON value, for configs that come from an API rather
    /// than a file.
    ///
    /// ```
    /// use knit_config::{InputOption, KnitConfig};
    /// use serde_json::json;
    ///
    /// let config = KnitConfig::from_value(json!({
    ///     "build": { "input": "src/main.js", "sourcemap": true }
    /// }))
    /// .unwrap();
    /// assert_eq!(config.build.input, InputOption::Single("src/main.js".into()));
    /// assert!(config.build.treeshake);
    /// ```
    pub fn from_value(value: Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| ConfigError::InvalidValue {
            field: "config".to_string(),
            hint: Some(e.to_string()),
        })
    }

    pub fn to_value(&self) -> Result<Value> {
        serde_json::to_value(self).map_err(|e| ConfigError::InvalidValue {
            field: "config".to_string(),
            hint: Some(e.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn input_accepts_string_list_and_map() {
        let single: InputOption = serde_json::from_value(json!("main.js")).unwrap();
        assert_eq!(single, InputOption::Single("main.js".into()));

        let multiple: InputOption = serde_json::from_value(json!(["a.js", "b.js"])).unwrap();
        assert_eq!(multiple.len(), 2);
        assert_eq!(multiple.entries(), vec![(None, "a.js"), (None, "b.js")]);

        let named: InputOption =
            serde_json::from_value(json!({ "app": "src/app.js", "admin": "src/admin.js" }))
                .unwrap();
        assert_eq!(
            named.entries(),
            vec![(Some("app"), "src/app.js"), (Some("admin"), "src/admin.js")]
        );
    }

    #[test]
    fn missing_fields_take_defaults() {
        let config = KnitConfig::from_value(json!({ "build": { "input": "a.js" } })).unwrap();
        assert!(config.build.treeshake);
        assert!(!config.build.sourcemap);
        assert!(!config.build.strict);
        assert_eq!(config.build.out_dir, PathBuf::from("dist"));
        assert_eq!(config.build.entry_file_names, "[name].js");
    }

    #[test]
    fn wrong_types_are_invalid_values() {
        let err = KnitConfig::from_value(json!({ "build": { "treeshake": "yes" } })).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn round_trips_through_value() {
        let mut config = KnitConfig::default();
        config.build.input = InputOption::from(vec!["a.js", "b.js"]);
        config.build.alias.insert("@".into(), "./src".into());

        let value = config.to_value().unwrap();
        assert_eq!(value["build"]["input"], json!(["a.js", "b.js"]));
        assert_eq!(KnitConfig::from_value(value).unwrap(), config);
    }
}
