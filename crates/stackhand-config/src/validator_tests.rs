    use super::*;
    use crate::schema::DeployConfig;

    #[test]
    fn test_validate_default_config() {
        let config = Config::default();
        let result = ConfigValidator::validate(&config).unwrap();
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.path == "http.token"));
    }

    #[test]
    fn test_validate_invalid_port() {
        let mut config = Config::default();
        config.http.port = 0;

        let result = ConfigValidator::validate(&config).unwrap();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.path == "http.port"));
    }

    #[test]
    fn test_validate_zero_timeout() {
        let mut config = Config::default();
        config.executor.command_timeout_secs = 0;

        let result = ConfigValidator::validate(&config).unwrap();
        assert!(!result.is_valid());
        assert!(result
            .errors
            .iter()
            .any(|e| e.path == "executor.command_timeout_secs"));
    }

    #[test]
    fn test_validate_compose_file_with_separator() {
        let mut config = Config::default();
        config.executor.compose_file = "nested/compose.yml".to_string();

        let result = ConfigValidator::validate(&config).unwrap();
        assert!(result.errors.iter().any(|e| e.path == "executor.compose_file"));
    }

    #[test]
    fn test_validate_token_present_no_warning() {
        let mut config = Config::default();
        config.http.token = Some("tok".to_string());

        let result = ConfigValidator::validate(&config).unwrap();
        assert!(!result.warnings.iter().any(|w| w.path == "http.token"));
    }

    #[test]
    fn test_validate_bad_tag_env() {
        let mut config = Config::default();
        config.deploy.insert(
            "web".to_string(),
            DeployConfig {
                tag_env: "1WEB-TAG".to_string(),
                args: vec![],
            },
        );

        let result = ConfigValidator::validate(&config).unwrap();
        assert!(result.errors.iter().any(|e| e.path == "deploy.web.tag_env"));
    }

    #[test]
    fn test_validate_unknown_deploy_arg_warns() {
        let mut config = Config::default();
        config.deploy.insert(
            "web".to_string(),
            DeployConfig {
                tag_env: String::new(),
                args: vec!["web".to_string(), "restart".to_string()],
            },
        );

        let result = ConfigValidator::validate(&config).unwrap();
        assert!(result.is_valid());
        let warnings: Vec<_> = result
            .warnings
            .iter()
            .filter(|w| w.path == "deploy.web.args")
            .collect();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("restart"));
    }

    #[test]
    fn test_into_result_joins_errors() {
        let mut config = Config::default();
        config.http.port = 0;
        config.http.host = String::new();

        let err = ConfigValidator::validate(&config)
            .unwrap()
            .into_result()
            .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("http.port"));
        assert!(message.contains("http.host"));
    }

    #[test]
    fn test_is_env_key() {
        assert!(is_env_key("ALPHA_IMAGE_TAG"));
        assert!(is_env_key("_x1"));
        assert!(!is_env_key("9LIVES"));
        assert!(!is_env_key("A-B"));
        assert!(!is_env_key(""));
    }

    #[test]
    fn test_validate_env_keys() {
        let mut config = Config::default();
        config.env.global.insert("TZ".to_string(), "UTC".to_string());
        config
            .env
            .stacks
            .entry("mail".to_string())
            .or_default()
            .insert("BAD KEY".to_string(), "x".to_string());

        let result = ConfigValidator::validate(&config).unwrap();
        assert!(!result.is_valid());
        assert_eq!(result.errors.len(), 1);
        assert_eq!(result.errors[0].path, "env.stacks.mail");
    }

    #[test]
    fn test_validate_empty_pool_path() {
        let mut config = Config::default();
        config.paths.pools.insert("NVME".to_string(), std::path::PathBuf::new());

        let result = ConfigValidator::validate(&config).unwrap();
        assert!(result.errors.iter().any(|e| e.path == "paths.pools"));
    }
