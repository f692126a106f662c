//! File-based config discovery.
//!
//! Sources are layered with figment, later layers winning:
//!
//! 1. built-in defaults
//! 2. `knit.toml`, or the `knit` object of `package.json`
//! 3. `KNIT_`-prefixed environment variables, with `__` separating nested
//!    keys (`KNIT_BUILD__SOURCEMAP=true`)

use std::path::{Path, PathBuf};

use figment::error::Kind;
use figment::providers::{Env, Format, Json, Serialized, Toml};
use figment::value::Value;
use figment::Figment;

use crate::config::KnitConfig;
use crate::error::{ConfigError, Result};

pub const CONFIG_FILE: &str = "knit.toml";
pub const PACKAGE_JSON_FIELD: &str = "knit";
pub const ENV_PREFIX: &str = "KNIT_";

/// Finds and loads knit configuration below a root directory.
///
/// ```no_run
/// use knit_config::ConfigDiscovery;
///
/// let config = ConfigDiscovery::new(".").load().unwrap();
/// println!("{:?}", config.build.input);
/// ```
#[derive(Debug, Clone)]
pub struct ConfigDiscovery {
    root: PathBuf,
}

impl ConfigDiscovery {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Locate a config file.
    ///
    /// `knit.toml` wins over a `package.json` with a non-null `knit` field.
    pub fn find(&self) -> Option<PathBuf> {
        let toml_path = self.root.join(CONFIG_FILE);
        if toml_path.is_file() {
            return Some(toml_path);
        }

        let pkg_path = self.root.join("package.json");
        if !pkg_path.is_file() {
            return None;
        }
        match Figment::from(Json::file(&pkg_path)).find_value(PACKAGE_JSON_FIELD) {
            Ok(Value::Empty(..)) | Err(_) => None,
            Ok(_) => Some(pkg_path),
        }
    }

    /// Load the discovered file layered between defaults and the environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NotFound`] if no config file exists.
    pub fn load(&self) -> Result<KnitConfig> {
        let path = self
            .find()
            .ok_or_else(|| ConfigError::NotFound(self.root.clone()))?;
        tracing::debug!(path = %path.display(), "loading knit config");
        self.extract(Some(&path))
    }

    /// Like [`load`](Self::load), but falls back to defaults plus environment
    /// when no config file exists.
    pub fn load_or_default(&self) -> Result<KnitConfig> {
        match self.find() {
            Some(path) => self.extract(Some(&path)),
            None => self.extract(None),
        }
    }

    /// `knit.toml` as a whole, or only the `knit` object of `package.json`.
    fn file_layer(&self, path: &Path) -> Result<Figment> {
        if path.file_name() != Some(std::ffi::OsStr::new("package.json")) {
            return Ok(Figment::from(Toml::file(path)));
        }

        let package = Figment::from(Json::file(path));
        match package.find_value(PACKAGE_JSON_FIELD) {
            Ok(Value::Dict(..)) => Ok(package.focus(PACKAGE_JSON_FIELD)),
            Ok(_) => Err(ConfigError::invalid(
                PACKAGE_JSON_FIELD,
                "the 'knit' field of package.json must be an object",
            )),
            Err(e) => Err(extract_error(e, path)),
        }
    }

    fn extract(&self, file: Option<&Path>) -> Result<KnitConfig> {
        let mut figment = Figment::new().merge(Serialized::defaults(KnitConfig::default()));
        if let Some(path) = file {
            figment = figment.merge(self.file_layer(path)?);
        }
        figment = figment.merge(Env::prefixed(ENV_PREFIX).split("__"));

        let mut config: KnitConfig = figment
            .extract()
            .map_err(|e| extract_error(e, file.unwrap_or(&self.root)))?;

        config.build.cwd = Some(match config.build.cwd.take() {
            Some(cwd) if cwd.is_relative() => self.root.join(cwd),
            Some(cwd) => cwd,
            None => self.root.clone(),
        });
        Ok(config)
    }
}

/// Syntax errors surface as messages without a key path; everything else is
/// a bad value at `path`.
fn extract_error(error: figment::Error, file: &Path) -> ConfigError {
    if error.path.is_empty() {
        if let Kind::Message(message) = &error.kind {
            let source_name = error
                .metadata
                .as_ref()
                .and_then(|metadata| metadata.source.as_ref())
                .map(|source| source.to_string())
                .unwrap_or_else(|| file.display().to_string());
            return ConfigError::Parse {
                source_name,
                message: message.clone(),
            };
        }
    }
    let field = if error.path.is_empty() {
        "config".to_string()
    } else {
        error.path.join(".")
    };
    ConfigError::InvalidValue {
        field,
        hint: Some(error.kind.to_string()),
    }
}

/// Discover config from the current directory.
pub fn discover() -> Result<KnitConfig> {
    let root = std::env::current_dir()?;
    ConfigDiscovery::new(root).load()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn find_returns_none_without_config() {
        let dir = TempDir::new().unwrap();
        assert!(ConfigDiscovery::new(dir.path()).find().is_none());
    }

    #[test]
    fn package_json_without_knit_field_is_ignored() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("package.json"), r#"{ "name": "app" }"#).unwrap();
        assert!(ConfigDiscovery::new(dir.path()).find().is_none());

        fs::write(dir.path().join("package.json"), r#"{ "knit": null }"#).unwrap();
        assert!(ConfigDiscovery::new(dir.path()).find().is_none());
    }

    #[test]
    fn load_reports_not_found() {
        let dir = TempDir::new().unwrap();
        let err = ConfigDiscovery::new(dir.path()).load().unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }

    #[test]
    fn malformed_toml_is_a_parse_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "[build\ninput = ").unwrap();
        let err = ConfigDiscovery::new(dir.path()).load().unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn malformed_package_json_is_not_discovered() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("package.json"), r#"{ "knit": { "build": "#).unwrap();
        assert!(ConfigDiscovery::new(dir.path()).find().is_none());
    }

    #[test]
    fn non_object_knit_field_is_invalid() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("package.json"), r#"{ "knit": "src/main.js" }"#).unwrap();
        let err = ConfigDiscovery::new(dir.path()).load().unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }
}
