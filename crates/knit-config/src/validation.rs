//! Schema validation for build settings.
//!
//! Checks only the shape of the settings; whether entries exist is decided
//! by the resolver at build time.

use crate::config::{BuildSettings, InputOption};
use crate::error::{ConfigError, Result};

/// Upper bound on entries per build.
pub const MAX_ENTRIES: usize = 1000;

/// Entries must number between 1 and [`MAX_ENTRIES`]; chunk names and
/// specifiers must be non-empty.
pub fn validate_input(input: &InputOption) -> Result<()> {
    if input.is_empty() {
        return Err(ConfigError::invalid(
            "build.input",
            "specify at least one entry, e.g. input = \"src/index.js\"",
        ));
    }
    if input.len() > MAX_ENTRIES {
        return Err(ConfigError::invalid(
            "build.input",
            format!(
                "{} entries given, at most {} are supported",
                input.len(),
                MAX_ENTRIES
            ),
        ));
    }
    for (name, specifier) in input.entries() {
        if name.is_some_and(|name| name.trim().is_empty()) {
            return Err(ConfigError::invalid(
                "build.input",
                "chunk names cannot be empty",
            ));
        }
        if specifier.trim().is_empty() {
            return Err(ConfigError::invalid(
                "build.input",
                "entry specifiers cannot be empty",
            ));
        }
    }
    Ok(())
}

/// The output file pattern must contain the `[name]` placeholder.
pub fn validate_file_pattern(pattern: &str) -> Result<()> {
    if !pattern.contains("[name]") {
        return Err(ConfigError::invalid(
            "build.entry_file_names",
            format!("'{}' must contain the [name] placeholder", pattern),
        ));
    }
    Ok(())
}

impl BuildSettings {
    pub fn validate(&self) -> Result<()> {
        validate_input(&self.input)?;
        validate_file_pattern(&self.entry_file_names)?;

        if self.external.iter().any(|external| external.trim().is_empty()) {
            return Err(ConfigError::invalid(
                "build.external",
                "remove empty strings from the external list",
            ));
        }
        if self.alias.keys().any(|alias| alias.is_empty()) {
            return Err(ConfigError::invalid(
                "build.alias",
                "alias prefixes cannot be empty",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn settings(input: InputOption) -> BuildSettings {
        BuildSettings {
            input,
            ..BuildSettings::default()
        }
    }

    #[test]
    fn accepts_minimal_settings() {
        settings(InputOption::from("src/index.js")).validate().unwrap();
    }

    #[test]
    fn rejects_empty_and_oversized_input() {
        assert!(settings(InputOption::default()).validate().is_err());

        let many: Vec<String> = (0..=MAX_ENTRIES).map(|i| format!("e{}.js", i)).collect();
        let err = validate_input(&InputOption::Multiple(many)).unwrap_err();
        assert!(err.to_string().contains("at most 1000"));
    }

    #[test]
    fn rejects_blank_chunk_names() {
        let mut named = IndexMap::new();
        named.insert(" ".to_string(), "a.js".to_string());
        assert!(validate_input(&InputOption::Named(named)).is_err());
    }

    #[test]
    fn pattern_needs_name_placeholder() {
        assert!(validate_file_pattern("[name].mjs").is_ok());
        assert!(validate_file_pattern("assets/[name]-bundle.js").is_ok());
        assert!(validate_file_pattern("bundle.js").is_err());
    }

    #[test]
    fn rejects_empty_externals() {
        let mut build = settings(InputOption::from("a.js"));
        build.external = vec!["react".into(), " ".into()];
        assert!(matches!(
            build.validate(),
            Err(ConfigError::InvalidValue { field, .. }) if field == "build.external"
        ));
    }
}
