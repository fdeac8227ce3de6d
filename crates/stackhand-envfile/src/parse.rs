//! `.env` line parsing.

/// Parse `KEY=value` pairs from env file content.
///
/// Blank lines, comments and lines without a valid key are skipped. An
/// `export ` prefix is accepted and surrounding quotes are stripped.
/// Pairs are returned in file order; a later duplicate wins when the
/// result is applied to a process environment.
pub fn parse(content: &str) -> Vec<(String, String)> {
    content
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                return None;
            }
            let (key, value) = split_assignment(line)?;
            Some((key.to_string(), unquote(value).to_string()))
        })
        .collect()
}

/// Whether `key` is usable as an environment variable name.
pub fn is_valid_key(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Split a trimmed, non-comment line into key and raw value.
pub(crate) fn split_assignment(line: &str) -> Option<(&str, &str)> {
    let line = strip_export(line);
    let (key, value) = line.split_once('=')?;
    let key = key.trim();
    if !is_valid_key(key) {
        return None;
    }
    Some((key, value.trim()))
}

pub(crate) fn strip_export(line: &str) -> &str {
    line.strip_prefix("export ")
        .map(str::trim_start)
        .unwrap_or(line)
}

pub(crate) fn unquote(value: &str) -> &str {
    for quote in ['"', '\''] {
        if value.len() >= 2 && value.starts_with(quote) && value.ends_with(quote) {
            return &value[1..value.len() - 1];
        }
    }
    value
}
