use std::path::{Path, PathBuf};
use std::sync::Arc;

use knit_config::{ConfigDiscovery, InputOption, KnitConfig};
use knit_graph::{AbortSignal, Runtime};
use rustc_hash::FxHashMap;

use crate::output::BuildOutput;
use crate::{Error, Result};

/// Configuration of one build invocation.
///
/// Use the builder methods, or construct directly for full control.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    /// Entry point(s); one chunk is produced per entry.
    pub input: InputOption,

    /// Base directory for entries, aliases and relative ids (default: the
    /// runtime's working directory).
    pub cwd: Option<PathBuf>,

    /// Generate a v3 source map per chunk (default: false).
    pub sourcemap: bool,

    /// Drop statements unreachable from the entry's exports and side effects
    /// (default: true).
    pub treeshake: bool,

    /// Fail on ambiguous star re-exports instead of dropping the name with a
    /// warning (default: false).
    pub strict: bool,

    /// Packages left as imports (exact name or `name/` prefix).
    pub external: Vec<String>,

    /// Path aliases such as `"@" -> "./src"`, resolved relative to `cwd`.
    pub alias: FxHashMap<String, String>,

    /// Output file name pattern; `[name]` is replaced by the chunk name
    /// (default: `[name].js`).
    pub entry_file_names: String,

    /// Runtime for filesystem access (default: `NativeRuntime` on native
    /// targets; must be provided on wasm).
    pub runtime: Option<Arc<dyn Runtime>>,

    /// Cancels the build between module batches.
    pub abort_signal: Option<AbortSignal>,
}

impl BuildOptions {
    /// Create options for the given input.
    ///
    /// ```no_run
    /// use knit_bundler::{BuildOptions, InputOption};
    ///
    /// let single = BuildOptions::new("./src/index.js");
    /// let multiple = BuildOptions::new(vec!["./src/a.js", "./src/b.js"]);
    /// ```
    pub fn new(input: impl Into<InputOption>) -> Self {
        Self {
            input: input.into(),
            cwd: None,
            sourcemap: false,
            treeshake: true,
            strict: false,
            external: Vec::new(),
            alias: FxHashMap::default(),
            entry_file_names: "[name].js".to_string(),
            runtime: None,
            abort_signal: None,
        }
    }

    /// Options from loaded configuration.
    pub fn from_config(config: &KnitConfig) -> Self {
        let build = &config.build;
        let mut options = Self::new(build.input.clone())
            .sourcemap(build.sourcemap)
            .treeshake(build.treeshake)
            .strict(build.strict)
            .external(build.external.iter().cloned())
            .entry_file_names(build.entry_file_names.clone());
        for (alias, target) in &build.alias {
            options = options.alias(alias.clone(), target.clone());
        }
        if let Some(cwd) = &build.cwd {
            options = options.cwd(cwd.clone());
        }
        options
    }

    /// Discover `knit.toml` / `package.json#knit` in `root` and build
    /// options from it, with `KNIT_*` environment overrides applied.
    pub fn discover(root: impl AsRef<Path>) -> Result<Self> {
        let config = ConfigDiscovery::new(root).load()?;
        Ok(Self::from_config(&config))
    }

    pub fn input(mut self, input: impl Into<InputOption>) -> Self {
        self.input = input.into();
        self
    }

    /// Set the working directory for module resolution.
    pub fn cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn sourcemap(mut self, enabled: bool) -> Self {
        self.sourcemap = enabled;
        self
    }

    pub fn treeshake(mut self, enabled: bool) -> Self {
        self.treeshake = enabled;
        self
    }

    pub fn strict(mut self, enabled: bool) -> Self {
        self.strict = enabled;
        self
    }

    /// Add external packages that should not be bundled.
    pub fn external<I, S>(mut self, packages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for pkg in packages {
            let value = pkg.into();
            if !self.external.contains(&value) {
                self.external.push(value);
            }
        }
        self
    }

    /// Add a path alias.
    ///
    /// ```no_run
    /// use knit_bundler::BuildOptions;
    ///
    /// let options = BuildOptions::new("./src/index.js")
    ///     .alias("@", "./src"); // @/button.js -> ./src/button.js
    /// ```
    pub fn alias(mut self, alias: impl Into<String>, target: impl Into<String>) -> Self {
        self.alias.insert(alias.into(), target.into());
        self
    }

    pub fn entry_file_names(mut self, pattern: impl Into<String>) -> Self {
        self.entry_file_names = pattern.into();
        self
    }

    /// Set the runtime for filesystem operations.
    pub fn runtime(mut self, runtime: Arc<dyn Runtime>) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn abort_signal(mut self, signal: AbortSignal) -> Self {
        self.abort_signal = Some(signal);
        self
    }

    /// Validate the options for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] when:
    /// - there are no entries, or more than 1000
    /// - a chunk name or entry specifier is empty
    /// - `entry_file_names` lacks the `[name]` placeholder
    pub fn validate(&self) -> Result<()> {
        knit_config::validate_input(&self.input)
            .and_then(|()| knit_config::validate_file_pattern(&self.entry_file_names))
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;

        if self.external.iter().any(|external| external.trim().is_empty()) {
            return Err(Error::InvalidConfig(
                "external package names cannot be empty".into(),
            ));
        }
        Ok(())
    }

    /// Execute the build with these options.
    ///
    /// This is a convenience method that calls [`build`](crate::build).
    pub async fn build(self) -> Result<BuildOutput> {
        crate::build(self).await
    }
}

impl Default for BuildOptions {
    fn default() -> Self {
        Self::new(InputOption::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use knit_config::BuildSettings;

    #[test]
    fn defaults() {
        let options = BuildOptions::new("src/index.js");
        assert_eq!(options.input, InputOption::Single("src/index.js".into()));
        assert!(options.treeshake);
        assert!(!options.sourcemap);
        assert!(!options.strict);
        assert_eq!(options.entry_file_names, "[name].js");
        options.validate().unwrap();
    }

    #[test]
    fn external_deduplicates() {
        let options = BuildOptions::new("a.js").external(["react", "react", "vue"]);
        assert_eq!(options.external, vec!["react", "vue"]);
    }

    #[test]
    fn validate_rejects_bad_options() {
        assert!(matches!(
            BuildOptions::default().validate(),
            Err(Error::InvalidConfig(_))
        ));
        assert!(
            BuildOptions::new("a.js")
                .entry_file_names("bundle.js")
                .validate()
                .is_err()
        );
        assert!(
            BuildOptions::new(vec!["a.js", ""])
                .validate()
                .is_err()
        );
        assert!(BuildOptions::new("a.js").external([""]).validate().is_err());
    }

    #[test]
    fn converts_config_settings() {
        let mut build = BuildSettings {
            input: InputOption::from("src/main.js"),
            sourcemap: true,
            treeshake: false,
            strict: true,
            external: vec!["react".into()],
            cwd: Some(PathBuf::from("/repo")),
            entry_file_names: "[name].mjs".into(),
            ..BuildSettings::default()
        };
        build.alias.insert("@".into(), "./src".into());

        let options = BuildOptions::from_config(&KnitConfig { build });
        assert!(options.sourcemap);
        assert!(!options.treeshake);
        assert!(options.strict);
        assert_eq!(options.external, vec!["react"]);
        assert_eq!(options.alias.get("@").map(String::as_str), Some("./src"));
        assert_eq!(options.cwd, Some(PathBuf::from("/repo")));
        assert_eq!(options.entry_file_names, "[name].mjs");
    }
}
