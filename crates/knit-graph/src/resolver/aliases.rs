//! Path alias handling (e.g. `"@" -> "./src"`).

use rustc_hash::FxHashMap;

/// Rewrite `specifier` through the longest matching alias.
///
/// An alias matches the whole specifier or a prefix followed by `/`, so `@`
/// maps `@/components` but leaves `@scope/pkg` alone. The returned path is
/// relative to the working directory unless the alias target is absolute.
pub fn resolve_path_alias(specifier: &str, aliases: &FxHashMap<String, String>) -> Option<String> {
    let (alias, target) = aliases
        .iter()
        .filter(|(alias, _)| {
            specifier == alias.as_str()
                || specifier
                    .strip_prefix(alias.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })
        .max_by(|a, b| a.0.len().cmp(&b.0.len()).then_with(|| b.0.cmp(a.0)))?;

    let rest = specifier[alias.len()..].trim_start_matches('/');
    let target = target.trim_end_matches('/');
    if rest.is_empty() {
        Some(target.to_string())
    } else {
        Some(format!("{target}/{rest}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aliases(pairs: &[(&str, &str)]) -> FxHashMap<String, String> {
        pairs
            .iter()
            .map(|(a, t)| (a.to_string(), t.to_string()))
            .collect()
    }

    #[test]
    fn longest_alias_wins() {
        let map = aliases(&[("@", "./src"), ("@/ui", "./packages/ui")]);
        assert_eq!(
            resolve_path_alias("@/ui/button", &map).as_deref(),
            Some("./packages/ui/button")
        );
        assert_eq!(
            resolve_path_alias("@/util", &map).as_deref(),
            Some("./src/util")
        );
    }

    #[test]
    fn scoped_packages_are_not_aliased() {
        let map = aliases(&[("@", "./src")]);
        assert_eq!(resolve_path_alias("@scope/pkg", &map), None);
    }

    #[test]
    fn exact_alias_maps_to_target() {
        let map = aliases(&[("~lib", "lib/")]);
        assert_eq!(resolve_path_alias("~lib", &map).as_deref(), Some("lib"));
    }
}
