//! Tests for config file discovery and loading

use std::fs;
use std::path::PathBuf;

use knit_config::{ConfigDiscovery, InputOption};
use tempfile::TempDir;

#[test]
fn discovers_knit_toml() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("knit.toml"),
        r#"
[build]
input = "src/main.js"
sourcemap = true
external = ["react"]

[build.alias]
"@" = "./src"
"#,
    )
    .unwrap();

    let discovery = ConfigDiscovery::new(dir.path());
    assert_eq!(discovery.find().unwrap().file_name().unwrap(), "knit.toml");

    let config = discovery.load().unwrap();
    assert_eq!(config.build.input, InputOption::Single("src/main.js".into()));
    assert!(config.build.sourcemap);
    assert!(config.build.treeshake);
    assert_eq!(config.build.external, vec!["react".to_string()]);
    assert_eq!(config.build.alias.get("@").map(String::as_str), Some("./src"));
    assert_eq!(config.build.cwd, Some(dir.path().to_path_buf()));
}

#[test]
fn discovers_package_json_field() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("package.json"),
        r#"{
  "name": "app",
  "knit": {
    "build": {
      "input": { "app": "src/app.js", "admin": "src/admin.js" },
      "treeshake": false
    }
  }
}"#,
    )
    .unwrap();

    let discovery = ConfigDiscovery::new(dir.path());
    assert_eq!(discovery.find().unwrap().file_name().unwrap(), "package.json");

    let config = discovery.load().unwrap();
    assert_eq!(
        config.build.input.entries(),
        vec![(Some("app"), "src/app.js"), (Some("admin"), "src/admin.js")]
    );
    assert!(!config.build.treeshake);
}

#[test]
fn toml_takes_precedence_over_package_json() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("knit.toml"),
        "[build]\ninput = \"toml.js\"\n",
    )
    .unwrap();
    fs::write(
        dir.path().join("package.json"),
        r#"{ "knit": { "build": { "input": "pkg.js" } } }"#,
    )
    .unwrap();

    let config = ConfigDiscovery::new(dir.path()).load().unwrap();
    assert_eq!(config.build.input, InputOption::Single("toml.js".into()));
}

#[test]
fn relative_cwd_is_anchored_at_the_config_root() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("knit.toml"),
        "[build]\ninput = [\"main.js\"]\ncwd = \"packages/web\"\nout_dir = \"build\"\n",
    )
    .unwrap();

    let config = ConfigDiscovery::new(dir.path()).load().unwrap();
    assert_eq!(config.build.cwd, Some(dir.path().join("packages/web")));
    assert_eq!(config.build.out_dir, PathBuf::from("build"));
}

#[test]
fn wrong_field_type_names_the_field() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("knit.toml"),
        "[build]\ninput = \"main.js\"\nsourcemap = \"sometimes\"\n",
    )
    .unwrap();

    let err = ConfigDiscovery::new(dir.path()).load().unwrap_err();
    assert!(err.to_string().contains("sourcemap"), "{}", err);
}

#[test]
fn load_or_default_without_file() {
    let dir = TempDir::new().unwrap();
    let config = ConfigDiscovery::new(dir.path()).load_or_default().unwrap();
    assert!(config.build.input.is_empty());
    assert_eq!(config.build.entry_file_names, "[name].js");
}
