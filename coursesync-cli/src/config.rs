use coursesync_core::FailurePolicy;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Source of a configuration value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfigSource {
    Default,
    File,
    Environment,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "default"),
            ConfigSource::File => write!(f, "file"),
            ConfigSource::Environment => write!(f, "environment"),
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }
}

/// Course backend connection settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ServerConfig {
    /// Server URL (e.g., "http://localhost:8080")
    pub url: Option<String>,
    /// Bearer token sent with every request
    #[serde(skip_serializing)]
    pub api_token: Option<String>,
    /// Per-request timeout in seconds (default: 30)
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl ServerConfig {
    pub fn timeout(&self) -> Duration {
        self.timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(coursesync_core::api::DEFAULT_TIMEOUT)
    }
}

/// Application configuration with source tracking
#[derive(Debug, Clone, Serialize)]
pub struct Config {
    /// Directory holding the per-course working copies
    pub data_dir: ConfigValue<PathBuf>,
    /// What `push` does after a failed call
    pub failure_policy: ConfigValue<FailurePolicy>,
    /// Config file path used (if any)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub config_file: Option<PathBuf>,
    pub server: ServerConfig,
}

/// Internal struct for deserializing config file
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    data_dir: Option<PathBuf>,
    failure_policy: Option<FailurePolicy>,
    server: Option<ServerConfig>,
}

impl Config {
    /// Load configuration with priority: env vars > config file > defaults
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let mut data_dir = ConfigValue::new(Self::default_data_dir(), ConfigSource::Default);
        let mut failure_policy = ConfigValue::new(FailurePolicy::default(), ConfigSource::Default);
        let mut config_file = None;
        let mut server = ServerConfig::default();

        let path = config_path.unwrap_or_else(Self::default_config_path);
        if path.exists() {
            let contents = std::fs::read_to_string(&path)
                .map_err(|e| ConfigError::ReadError(path.clone(), e))?;
            let file_config: ConfigFile = serde_yaml::from_str(&contents)
                .map_err(|e| ConfigError::ParseError(path.clone(), e))?;

            config_file = Some(path.clone());

            if let Some(dir) = file_config.data_dir {
                // Resolve relative paths against config file's directory
                let resolved = if dir.is_relative() {
                    path.parent().map(|p| p.join(&dir)).unwrap_or(dir)
                } else {
                    dir
                };
                data_dir = ConfigValue::new(resolved, ConfigSource::File);
            }
            if let Some(policy) = file_config.failure_policy {
                failure_policy = ConfigValue::new(policy, ConfigSource::File);
            }
            if let Some(server_config) = file_config.server {
                server = server_config;
            }
        }

        if let Ok(dir) = std::env::var("COURSE_DATA_DIR") {
            data_dir = ConfigValue::new(PathBuf::from(dir), ConfigSource::Environment);
        }
        if let Ok(policy) = std::env::var("COURSE_FAILURE_POLICY") {
            let policy = policy
                .parse::<FailurePolicy>()
                .map_err(|e| ConfigError::InvalidValue("COURSE_FAILURE_POLICY", format!("{}", e)))?;
            failure_policy = ConfigValue::new(policy, ConfigSource::Environment);
        }
        if let Ok(url) = std::env::var("COURSE_SERVER_URL") {
            server.url = Some(url);
        }
        if let Ok(token) = std::env::var("COURSE_API_TOKEN") {
            server.api_token = Some(token);
        }

        Ok(Self {
            data_dir,
            failure_policy,
            config_file,
            server,
        })
    }

    /// Default config directory (platform-specific):
    /// - Linux: ~/.config/course/
    /// - macOS: ~/Library/Application Support/course/
    /// - Windows: %APPDATA%/course/
    pub fn default_config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("course")
    }

    /// Default data directory (platform-specific):
    /// - Linux: ~/.local/share/course/
    /// - macOS: ~/Library/Application Support/course/
    /// - Windows: %APPDATA%/course/
    pub fn default_data_dir() -> PathBuf {
        dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("course")
    }

    /// Default config file path (platform-specific config dir + config.yaml)
    pub fn default_config_path() -> PathBuf {
        Self::default_config_dir().join("config.yaml")
    }
}

#[derive(Debug)]
pub enum ConfigError {
    ReadError(PathBuf, std::io::Error),
    ParseError(PathBuf, serde_yaml::Error),
    InvalidValue(&'static str, String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ReadError(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::ParseError(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
            ConfigError::InvalidValue(var, e) => write!(f, "Invalid {}: {}", var, e),
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_default_config() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("nonexistent.yaml");

        let config = Config::load(Some(config_path)).unwrap();
        assert!(config.data_dir.value.ends_with("course"));
        assert_eq!(config.data_dir.source, ConfigSource::Default);
        assert_eq!(config.failure_policy.value, FailurePolicy::Abort);
        assert_eq!(config.failure_policy.source, ConfigSource::Default);
        assert!(config.config_file.is_none());
        assert_eq!(config.server.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "data_dir: /custom/courses").unwrap();
        writeln!(file, "failure_policy: best-effort").unwrap();
        writeln!(file, "server:").unwrap();
        writeln!(file, "  url: http://courses.local:9000").unwrap();
        writeln!(file, "  api_token: secret").unwrap();
        writeln!(file, "  timeout_secs: 5").unwrap();

        let config = Config::load(Some(config_path.clone())).unwrap();
        assert_eq!(config.data_dir.value, PathBuf::from("/custom/courses"));
        assert_eq!(config.data_dir.source, ConfigSource::File);
        assert_eq!(config.failure_policy.value, FailurePolicy::BestEffort);
        assert_eq!(config.failure_policy.source, ConfigSource::File);
        assert_eq!(
            config.server.url.as_deref(),
            Some("http://courses.local:9000")
        );
        assert_eq!(config.server.api_token.as_deref(), Some("secret"));
        assert_eq!(config.server.timeout(), Duration::from_secs(5));
        assert_eq!(config.config_file, Some(config_path));
    }

    #[test]
    fn test_relative_data_dir_resolves_against_config_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        std::fs::write(&config_path, "data_dir: working\n").unwrap();

        let config = Config::load(Some(config_path)).unwrap();
        assert_eq!(config.data_dir.value, temp_dir.path().join("working"));
    }

    #[test]
    fn test_token_is_not_serialized() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        std::fs::write(&config_path, "server:\n  api_token: secret\n").unwrap();

        let config = Config::load(Some(config_path)).unwrap();
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
    }

    #[test]
    #[ignore] // Run with --ignored; env vars can pollute parallel tests
    fn test_env_var_overrides_file() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        std::fs::write(&config_path, "failure_policy: abort\n").unwrap();

        std::env::set_var("COURSE_FAILURE_POLICY", "best-effort");

        let config = Config::load(Some(config_path)).unwrap();
        assert_eq!(config.failure_policy.value, FailurePolicy::BestEffort);
        assert_eq!(config.failure_policy.source, ConfigSource::Environment);

        std::env::remove_var("COURSE_FAILURE_POLICY");
    }

    #[test]
    fn test_invalid_yaml_error() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");

        let mut file = std::fs::File::create(&config_path).unwrap();
        writeln!(file, "invalid: yaml: content: [").unwrap();

        let err = Config::load(Some(config_path)).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }

    #[test]
    fn test_unknown_policy_in_file_is_rejected() {
        let temp_dir = tempdir().unwrap();
        let config_path = temp_dir.path().join("config.yaml");
        std::fs::write(&config_path, "failure_policy: retry\n").unwrap();

        assert!(Config::load(Some(config_path)).is_err());
    }
}
