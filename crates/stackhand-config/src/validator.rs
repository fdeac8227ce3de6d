//! Configuration validation.

use stackhand_protocols::StackOperation;

use crate::error::ConfigError;
use crate::schema::Config;

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Collapse the errors into a single [`ConfigError::Invalid`].
    pub fn into_result(self) -> Result<Vec<ValidationWarning>, ConfigError> {
        if self.errors.is_empty() {
            return Ok(self.warnings);
        }
        let message = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.path, e.message))
            .collect::<Vec<_>>()
            .join("; ");
        Err(ConfigError::Invalid(message))
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> Result<ValidationResult, ConfigError> {
        let mut result = ValidationResult::default();

        Self::validate_paths(config, &mut result);
        Self::validate_executor(config, &mut result);
        Self::validate_http(config, &mut result);
        Self::validate_deploy(config, &mut result);
        Self::validate_env(config, &mut result);

        Ok(result)
    }

    fn validate_paths(config: &Config, result: &mut ValidationResult) {
        if config.stacks_dir.as_os_str().is_empty() {
            result.add_error(ValidationError::new("stacks_dir", "stacks_dir cannot be empty"));
        } else if !config.stacks_dir.is_dir() {
            result.add_warning(ValidationWarning::new(
                "stacks_dir",
                format!("Stacks directory does not exist: {:?}", config.stacks_dir),
            ));
        }

        if config.env_file.as_os_str().is_empty() {
            result.add_error(ValidationError::new("env_file", "env_file cannot be empty"));
        }
    }

    fn validate_executor(config: &Config, result: &mut ValidationResult) {
        if config.executor.command_timeout_secs == 0 {
            result.add_error(ValidationError::new(
                "executor.command_timeout_secs",
                "command_timeout_secs must be greater than 0",
            ));
        }

        if config.executor.docker.trim().is_empty() {
            result.add_error(ValidationError::new(
                "executor.docker",
                "Docker binary cannot be empty",
            ));
        }

        let compose = &config.executor.compose_file;
        if compose.is_empty() || compose.contains('/') {
            result.add_error(ValidationError::new(
                "executor.compose_file",
                "compose_file must be a plain file name",
            ));
        }
    }

    fn validate_http(config: &Config, result: &mut ValidationResult) {
        if config.http.port == 0 {
            result.add_error(ValidationError::new("http.port", "Port cannot be 0"));
        }

        if config.http.host.is_empty() {
            result.add_error(ValidationError::new("http.host", "Host cannot be empty"));
        }

        if config.http.token.as_deref().is_none_or(str::is_empty) {
            result.add_warning(ValidationWarning::new(
                "http.token",
                "No token set; the HTTP server will refuse to start",
            ));
        }
    }

    fn validate_deploy(config: &Config, result: &mut ValidationResult) {
        for (stack, deploy) in &config.deploy {
            let tag_env = deploy.tag_env.trim();
            if !tag_env.is_empty() && !is_env_key(tag_env) {
                result.add_error(ValidationError::new(
                    format!("deploy.{}.tag_env", stack),
                    format!("'{}' is not a valid variable name", tag_env),
                ));
            }

            for arg in &deploy.args {
                if arg.trim().parse::<StackOperation>().is_err() && arg.trim() != stack {
                    result.add_warning(ValidationWarning::new(
                        format!("deploy.{}.args", stack),
                        format!("Unknown operation '{}' will be ignored", arg),
                    ));
                }
            }
        }
    }

    fn validate_env(config: &Config, result: &mut ValidationResult) {
        let scoped = config
            .env
            .stacks
            .iter()
            .flat_map(|(stack, vars)| vars.keys().map(move |key| (format!("env.stacks.{}", stack), key)));
        let global = config.env.global.keys().map(|key| ("env.global".to_string(), key));

        for (path, key) in global.chain(scoped) {
            if !is_env_key(key) {
                result.add_error(ValidationError::new(
                    path,
                    format!("'{}' is not a valid variable name", key),
                ));
            }
        }

        let pools = config.paths.pools.iter().map(|(name, dir)| ("paths.pools", name, dir));
        let custom = config.paths.custom.iter().map(|(name, dir)| ("paths.custom", name, dir));
        for (section, name, dir) in pools.chain(custom) {
            if name.trim().is_empty() || dir.as_os_str().is_empty() {
                result.add_error(ValidationError::new(
                    section,
                    format!("Entry '{}' needs a name and a path", name),
                ));
            }
        }
    }
}

fn is_env_key(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
