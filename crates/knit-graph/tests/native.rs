//! Graph construction against the real filesystem.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use knit_graph::{
    AbortSignal, Error, GraphBuilder, ImportedName, ModuleGraph, ModuleId, ModuleResolver,
    NativeRuntime, ResolveOptions, Result,
};
use rustc_hash::FxHashMap;
use tempfile::TempDir;

fn write(root: &Path, files: &[(&str, &str)]) {
    for (path, contents) in files {
        let path = root.join(path);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }
}

async fn build(root: &Path, options: ResolveOptions, entries: &[&str]) -> Result<ModuleGraph> {
    let options = ResolveOptions {
        cwd: Some(root.to_path_buf()),
        ..options
    };
    let entries: Vec<String> = entries.iter().map(|entry| entry.to_string()).collect();
    GraphBuilder::new(ModuleResolver::new(options), Arc::new(NativeRuntime::new()))
        .build(&entries, &AbortSignal::new())
        .await
}

#[tokio::test]
async fn resolves_extensions_and_directory_indexes() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        &[
            (
                "src/main.ts",
                "import { Button } from './components';\nimport { fmt } from './fmt';\nButton(fmt);",
            ),
            ("src/components/index.jsx", "export function Button() {}"),
            ("src/fmt.js", "export const fmt = (v) => String(v);"),
        ],
    );

    let graph = build(dir.path(), ResolveOptions::default(), &["src/main.ts"])
        .await
        .unwrap();

    let ids: Vec<String> = graph
        .modules()
        .iter()
        .map(|module| graph.relative_id(module.idx()))
        .collect();
    assert_eq!(ids, vec!["src/main.ts", "src/components/index.jsx", "src/fmt.js"]);
    assert_eq!(graph.entries(), &[graph.modules()[0].idx()]);
}

#[tokio::test]
async fn records_imports_and_externals() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        &[(
            "main.js",
            "import React, { useState } from 'react';\nimport * as fs from 'node:fs';\nuseState(React, fs);",
        )],
    );

    let graph = build(dir.path(), ResolveOptions::default(), &["main.js"])
        .await
        .unwrap();
    assert_eq!(graph.len(), 3);
    assert!(graph.get(&ModuleId::External("react".into())).is_some());
    assert!(graph.get(&ModuleId::External("node:fs".into())).is_some());

    let main = graph.normal(graph.entries()[0]).unwrap();
    let imported: Vec<&ImportedName> = main
        .scanned
        .imports
        .iter()
        .map(|record| &record.imported)
        .collect();
    assert_eq!(
        imported,
        vec![
            &ImportedName::Named("default".into()),
            &ImportedName::Named("useState".into()),
            &ImportedName::Namespace,
        ]
    );
}

#[tokio::test]
async fn aliases_and_explicit_externals() {
    let dir = TempDir::new().unwrap();
    write(
        dir.path(),
        &[
            ("main.js", "import { x } from '@/lib/x';\nimport './vendor/shim.js';\nx();"),
            ("src/lib/x.js", "export function x() {}"),
        ],
    );

    let mut aliases = FxHashMap::default();
    aliases.insert("@".to_string(), "./src".to_string());
    let options = ResolveOptions {
        aliases,
        external: vec!["./vendor/shim.js".to_string()],
        cwd: None,
    };
    let graph = build(dir.path(), options, &["main.js"]).await.unwrap();

    assert!(graph
        .get(&ModuleId::Local(dir.path().join("src/lib/x.js")))
        .is_some());
    assert!(graph
        .get(&ModuleId::External("./vendor/shim.js".into()))
        .is_some());
}

#[tokio::test]
async fn unresolved_imports_name_the_importer() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), &[("main.js", "import './missing.js';")]);

    let err = build(dir.path(), ResolveOptions::default(), &["main.js"])
        .await
        .unwrap_err();
    match &err {
        Error::Resolution {
            specifier, importer, ..
        } => {
            assert_eq!(specifier, "./missing.js");
            assert_eq!(importer.as_deref(), Some(dir.path().join("main.js").as_path()));
        }
        other => panic!("expected a resolution error, got {other:?}"),
    }
}

#[tokio::test]
async fn parse_errors_carry_locations() {
    let dir = TempDir::new().unwrap();
    write(dir.path(), &[("main.js", "const ok = 1;\nconst = ;\n")]);

    let err = build(dir.path(), ResolveOptions::default(), &["main.js"])
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Parse { .. }));
    assert_eq!(err.module_path(), Some(dir.path().join("main.js").as_path()));
    assert_eq!(err.location().map(|location| location.line), Some(2));
}
