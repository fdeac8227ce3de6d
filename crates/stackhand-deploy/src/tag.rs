//! Image tag validation.

use crate::error::DeployError;

/// Check that `tag` can be written as a bare env value.
pub fn validate_tag(tag: &str) -> Result<(), DeployError> {
    let invalid = |reason| {
        Err(DeployError::InvalidTag {
            tag: tag.to_string(),
            reason,
        })
    };

    if tag.is_empty() {
        return invalid("must not be empty");
    }
    if tag.chars().any(char::is_whitespace) {
        return invalid("must not contain whitespace");
    }
    if tag.chars().any(char::is_control) {
        return invalid("must not contain control characters");
    }
    if tag.contains('#') {
        return invalid("must not contain '#'");
    }
    Ok(())
}
