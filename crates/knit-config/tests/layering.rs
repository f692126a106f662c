//! Environment variables layered over config files.
//!
//! Every test runs inside a figment `Jail`, which serializes access to the
//! process environment and restores it afterwards.

use figment::Jail;
use knit_config::{ConfigDiscovery, InputOption};

#[test]
fn env_overrides_file_values() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "knit.toml",
            r#"
[build]
input = "src/main.js"
sourcemap = false
strict = false
"#,
        )?;
        jail.set_env("KNIT_BUILD__SOURCEMAP", "true");
        jail.set_env("KNIT_BUILD__OUT_DIR", "build");

        let config = ConfigDiscovery::new(jail.directory())
            .load()
            .map_err(|e| e.to_string())?;
        assert!(config.build.sourcemap);
        assert!(!config.build.strict);
        assert_eq!(config.build.out_dir, std::path::PathBuf::from("build"));
        assert_eq!(config.build.input, InputOption::Single("src/main.js".into()));
        Ok(())
    });
}

#[test]
fn env_overrides_package_json() {
    Jail::expect_with(|jail| {
        jail.create_file(
            "package.json",
            r#"{ "knit": { "build": { "input": "a.js", "treeshake": true } } }"#,
        )?;
        jail.set_env("KNIT_BUILD__TREESHAKE", "false");
        jail.set_env("KNIT_BUILD__INPUT", "b.js");

        let config = ConfigDiscovery::new(jail.directory())
            .load()
            .map_err(|e| e.to_string())?;
        assert!(!config.build.treeshake);
        assert_eq!(config.build.input, InputOption::Single("b.js".into()));
        Ok(())
    });
}

#[test]
fn env_alone_configures_a_build() {
    Jail::expect_with(|jail| {
        jail.set_env("KNIT_BUILD__INPUT", "main.js");
        jail.set_env("KNIT_BUILD__STRICT", "true");

        let config = ConfigDiscovery::new(jail.directory())
            .load_or_default()
            .map_err(|e| e.to_string())?;
        assert!(config.build.strict);
        config.build.validate().map_err(|e| e.to_string())?;
        Ok(())
    });
}
