//! Compose file variable references.

use std::sync::LazyLock;

use regex::Regex;

static VAR_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\$|\$\{([A-Za-z_][A-Za-z0-9_]*)(?:[:]?[-?+][^}]*)?\}|\$([A-Za-z_][A-Za-z0-9_]*)")
        .expect("variable reference pattern is valid")
});

/// Variable names referenced by `${VAR}`, `${VAR:-default}`, `${VAR-default}`
/// or `$VAR`, in order of first appearance. `$$` escapes are skipped.
pub fn referenced_vars(content: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for cap in VAR_REF.captures_iter(content) {
        let Some(name) = cap.get(1).or_else(|| cap.get(2)) else {
            continue;
        };
        if !names.iter().any(|n| n == name.as_str()) {
            names.push(name.as_str().to_string());
        }
    }
    names
}
