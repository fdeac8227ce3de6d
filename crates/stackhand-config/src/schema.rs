//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::time::Duration;

use stackhand_protocols::{StackDeployment, StackEnvironment};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding one subdirectory per stack.
    #[serde(default = "default_stacks_dir")]
    pub stacks_dir: PathBuf,

    /// The shared env file holding image tags and stack variables.
    #[serde(default = "default_env_file")]
    pub env_file: PathBuf,

    #[serde(default)]
    pub executor: ExecutorConfig,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    /// Per-stack deployment metadata, keyed by stack name.
    #[serde(default)]
    pub deploy: HashMap<String, DeployConfig>,

    /// Extra variables for stack commands.
    #[serde(default)]
    pub env: EnvConfig,

    /// Storage pools and custom paths exposed to stack commands.
    #[serde(default)]
    pub paths: PathsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            stacks_dir: default_stacks_dir(),
            env_file: default_env_file(),
            executor: ExecutorConfig::default(),
            http: HttpConfig::default(),
            logging: LoggingConfig::default(),
            deploy: HashMap::new(),
            env: EnvConfig::default(),
            paths: PathsConfig::default(),
        }
    }
}

fn default_stacks_dir() -> PathBuf {
    PathBuf::from("stacks")
}

fn default_env_file() -> PathBuf {
    PathBuf::from(".env")
}

impl Config {
    /// Deployment metadata for `stack`, falling back to the
    /// `<STACK>_IMAGE_TAG` variable and a plain update.
    pub fn stack_deployment(&self, stack: &str) -> StackDeployment {
        let mut deployment = StackDeployment::for_stack(stack);
        if let Some(meta) = self.deploy.get(stack) {
            let tag_env = meta.tag_env.trim();
            if !tag_env.is_empty() {
                deployment = deployment.with_tag_env(tag_env);
            }
            if !meta.args.is_empty() {
                deployment = deployment.with_args(meta.args.clone());
            }
        }
        deployment
    }

    /// Variables and paths every stack command runs with.
    pub fn stack_environment(&self) -> StackEnvironment {
        StackEnvironment {
            global: self.env.global.clone(),
            stacks: self.env.stacks.clone(),
            pools: self.paths.pools.clone(),
            custom_paths: self.paths.custom.clone(),
        }
    }

    /// Ceiling applied to every executor invocation.
    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.executor.command_timeout_secs)
    }

    /// Make every relative path absolute against `root`.
    pub fn resolve_paths(&mut self, root: &Path) {
        self.stacks_dir = resolve(root, &self.stacks_dir);
        self.env_file = resolve(root, &self.env_file);
        self.executor.backup_dir = resolve(root, &self.executor.backup_dir);
        if let Some(dir) = &self.logging.dir {
            self.logging.dir = Some(resolve(root, dir));
        }
        for dir in self.paths.pools.values_mut().chain(self.paths.custom.values_mut()) {
            *dir = resolve(root, dir);
        }
    }
}

fn resolve(root: &Path, path: &Path) -> PathBuf {
    let expanded = PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).as_ref());
    if expanded.is_absolute() {
        expanded
    } else {
        root.join(expanded)
    }
}

/// Stack executor configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Docker CLI binary.
    #[serde(default = "default_docker")]
    pub docker: String,

    /// Compose file name inside each stack directory.
    #[serde(default = "default_compose_file")]
    pub compose_file: String,

    #[serde(default = "default_backup_dir")]
    pub backup_dir: PathBuf,

    /// Timeout for cron job runs and deployments.
    #[serde(default = "default_command_timeout")]
    pub command_timeout_secs: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            docker: default_docker(),
            compose_file: default_compose_file(),
            backup_dir: default_backup_dir(),
            command_timeout_secs: default_command_timeout(),
        }
    }
}

fn default_docker() -> String {
    "docker".to_string()
}

fn default_compose_file() -> String {
    "docker-compose.yml".to_string()
}

fn default_backup_dir() -> PathBuf {
    PathBuf::from("backups")
}

fn default_command_timeout() -> u64 {
    900 // 15 minutes
}

/// HTTP control surface configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Bearer token required by every route except `/health`.
    #[serde(default, skip_serializing)]
    pub token: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            token: None,
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    9000
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Directory for daily-rotated log files. Console only when unset.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

/// Deployment metadata for one stack as written in the config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeployConfig {
    #[serde(default)]
    pub tag_env: String,

    #[serde(default)]
    pub args: Vec<String>,
}

/// `[env]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EnvConfig {
    /// Set for every stack.
    #[serde(default)]
    pub global: BTreeMap<String, String>,

    /// Set for one stack, overriding `global`.
    #[serde(default)]
    pub stacks: BTreeMap<String, BTreeMap<String, String>>,
}

/// `[paths]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Volume pools; each becomes `STACK_STORAGE_<NAME>=<dir>/<stack>`.
    #[serde(default = "default_pools")]
    pub pools: BTreeMap<String, PathBuf>,

    /// Named paths; each becomes `STACK_PATH_<NAME>=<path>`.
    #[serde(default)]
    pub custom: BTreeMap<String, PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            pools: default_pools(),
            custom: BTreeMap::new(),
        }
    }
}

fn default_pools() -> BTreeMap<String, PathBuf> {
    BTreeMap::from([
        ("SSD".to_string(), PathBuf::from(".vols_ssd/stack_volumes")),
        ("HDD".to_string(), PathBuf::from(".vols_hdd/stack_volumes")),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use stackhand_protocols::StackOperation;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.stacks_dir, PathBuf::from("stacks"));
        assert_eq!(config.env_file, PathBuf::from(".env"));
        assert_eq!(config.executor.compose_file, "docker-compose.yml");
        assert_eq!(config.command_timeout(), Duration::from_secs(900));
        assert_eq!(config.http.port, 9000);
        assert!(config.http.token.is_none());
    }

    #[test]
    fn test_stack_deployment_defaults() {
        let config = Config::default();
        let deployment = config.stack_deployment("alpha");
        assert_eq!(deployment.tag_env, "ALPHA_IMAGE_TAG");
        assert!(deployment.operations().contains(&StackOperation::Update));
    }

    #[test]
    fn test_stack_deployment_override() {
        let mut config = Config::default();
        config.deploy.insert(
            "web".to_string(),
            DeployConfig {
                tag_env: " WEB_TAG ".to_string(),
                args: vec!["tear-down".to_string(), "update".to_string()],
            },
        );
        let deployment = config.stack_deployment("web");
        assert_eq!(deployment.tag_env, "WEB_TAG");
        assert_eq!(deployment.operations().len(), 2);
    }

    #[test]
    fn test_stack_deployment_blank_override_keeps_defaults() {
        let mut config = Config::default();
        config.deploy.insert("web".to_string(), DeployConfig::default());
        let deployment = config.stack_deployment("web");
        assert_eq!(deployment.tag_env, "WEB_IMAGE_TAG");
        assert_eq!(deployment.args, vec!["update".to_string()]);
    }

    #[test]
    fn test_resolve_paths() {
        let mut config = Config::default();
        config.env_file = PathBuf::from("/etc/stackhand/.env");
        config.resolve_paths(Path::new("/srv/repo"));
        assert_eq!(config.stacks_dir, PathBuf::from("/srv/repo/stacks"));
        assert_eq!(config.env_file, PathBuf::from("/etc/stackhand/.env"));
        assert_eq!(config.executor.backup_dir, PathBuf::from("/srv/repo/backups"));
        assert!(config.logging.dir.is_none());
        assert_eq!(
            config.paths.pools["SSD"],
            PathBuf::from("/srv/repo/.vols_ssd/stack_volumes")
        );
    }

    #[test]
    fn test_stack_environment_from_sections() {
        let mut config = Config::default();
        config.env.global.insert("TZ".to_string(), "UTC".to_string());
        config
            .env
            .stacks
            .entry("mail".to_string())
            .or_default()
            .insert("TZ".to_string(), "Europe/Berlin".to_string());
        config
            .paths
            .custom
            .insert("media".to_string(), PathBuf::from("/mnt/media"));
        config.resolve_paths(Path::new("/srv/repo"));

        let env = config.stack_environment();
        assert_eq!(env.vars_for("mail"), vec![("TZ".to_string(), "Europe/Berlin".to_string())]);
        assert_eq!(
            env.paths_for("mail"),
            vec![
                (
                    "STACK_STORAGE_HDD".to_string(),
                    "/srv/repo/.vols_hdd/stack_volumes/mail".to_string()
                ),
                (
                    "STACK_STORAGE_SSD".to_string(),
                    "/srv/repo/.vols_ssd/stack_volumes/mail".to_string()
                ),
                ("STACK_PATH_MEDIA".to_string(), "/mnt/media".to_string()),
            ]
        );
    }

    #[test]
    fn test_token_not_serialized() {
        let mut config = Config::default();
        config.http.token = Some("secret".to_string());
        let rendered = toml::to_string(&config).unwrap();
        assert!(!rendered.contains("secret"));
    }
}
