//! Error types for configuration loading and validation.

use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// Neither `knit.toml` nor a `knit` field in `package.json` was found.
    #[error("config not found in '{}'", .0.display())]
    NotFound(PathBuf),

    #[error("invalid config value for '{field}'{}", display_hint(.hint.as_deref()))]
    InvalidValue { field: String, hint: Option<String> },

    /// A config file or layered source could not be parsed.
    #[error("failed to parse '{source_name}': {message}")]
    Parse {
        source_name: String,
        message: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    pub(crate) fn invalid(field: impl Into<String>, hint: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field: field.into(),
            hint: Some(hint.into()),
        }
    }
}

fn display_hint(hint: Option<&str>) -> String {
    hint.map(|hint| format!(": {}", hint)).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_value_includes_hint() {
        let error = ConfigError::invalid("build.input", "add at least one entry");
        assert_eq!(
            error.to_string(),
            "invalid config value for 'build.input': add at least one entry"
        );

        let bare = ConfigError::InvalidValue {
            field: "build".into(),
            hint: None,
        };
        assert_eq!(bare.to_string(), "invalid config value for 'build'");
    }
}
