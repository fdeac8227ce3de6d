//! Configuration loader.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;

use crate::error::ConfigError;
use crate::schema::Config;

/// Default config file name, looked up in the repository root.
pub const DEFAULT_CONFIG_FILE: &str = "stackhand.toml";

/// Configuration loader with environment variable substitution.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound(path.display().to_string()));
        }
        let content = fs::read_to_string(path)?;
        Self::load_str(&content)
    }

    /// Load configuration from a string.
    pub fn load_str(content: &str) -> Result<Config, ConfigError> {
        let expanded = Self::expand_env_vars(content)?;
        let config: Config = toml::from_str(&expanded)?;
        Ok(config)
    }

    /// Load the configuration for a repository root.
    ///
    /// An explicit `file` must exist. Without one, `<root>/stackhand.toml`
    /// is used when present and defaults otherwise. `STACKHAND_*`
    /// environment overrides are applied, then relative paths are
    /// resolved against `root`.
    pub fn load_for_root(root: &Path, file: Option<&Path>) -> Result<Config, ConfigError> {
        let mut config = match file {
            Some(file) => Self::load(&root.join(file))?,
            None => {
                let default = root.join(DEFAULT_CONFIG_FILE);
                if default.exists() {
                    Self::load(&default)?
                } else {
                    Config::default()
                }
            }
        };
        Self::apply_overrides(&mut config, |key| std::env::var(key).ok())?;
        config.resolve_paths(root);
        Ok(config)
    }

    /// Resolve the repository root: the given directory, or the current one.
    pub fn resolve_root(root: Option<&Path>) -> Result<PathBuf, ConfigError> {
        let root = match root {
            Some(root) => PathBuf::from(Self::expand_path(&root.to_string_lossy())),
            None => std::env::current_dir()?,
        };
        if !root.is_dir() {
            return Err(ConfigError::InvalidValue {
                field: "root".to_string(),
                message: format!("{} is not a directory", root.display()),
            });
        }
        Ok(root)
    }

    /// Apply `STACKHAND_*` overrides read through `lookup`.
    pub fn apply_overrides<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(dir) = get("STACKHAND_STACKS_DIR") {
            config.stacks_dir = PathBuf::from(dir);
        }
        if let Some(file) = get("STACKHAND_ENV_FILE") {
            config.env_file = PathBuf::from(file);
        }
        if let Some(token) = get("STACKHAND_TOKEN") {
            config.http.token = Some(token);
        }
        if let Some(host) = get("STACKHAND_HOST") {
            config.http.host = host;
        }
        if let Some(port) = get("STACKHAND_PORT") {
            config.http.port = port.parse().map_err(|_| ConfigError::InvalidValue {
                field: "STACKHAND_PORT".to_string(),
                message: format!("'{}' is not a valid port", port),
            })?;
        }
        Ok(())
    }

    /// Expand environment variables in the format `${VAR}`.
    fn expand_env_vars(content: &str) -> Result<String, ConfigError> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ConfigError::Invalid(e.to_string()))?;
        let mut result = content.to_string();

        for cap in re.captures_iter(content) {
            let var_name = &cap[1];
            let var_value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotSet(var_name.to_string()))?;
            result = result.replace(&cap[0], &var_value);
        }

        Ok(result)
    }

    /// Expand shell-style paths (e.g., `~/stacks`).
    pub fn expand_path(path: &str) -> String {
        shellexpand::tilde(path).to_string()
    }
}
