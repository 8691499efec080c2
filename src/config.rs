/// Server configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Port to listen on
    pub port: u16,
    /// Bearer token required on CRUD routes; open access when unset
    pub api_token: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            api_token: None,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let port = lookup("COURSESYNC_PORT")
            .and_then(|p| p.parse().ok())
            .unwrap_or(Self::default().port);

        let api_token = lookup("COURSESYNC_API_TOKEN").filter(|t| !t.is_empty());

        Self { port, api_token }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        assert_eq!(Config::from_lookup(lookup(&[])), Config::default());
    }

    #[test]
    fn test_env_values() {
        let config = Config::from_lookup(lookup(&[
            ("COURSESYNC_PORT", "9090"),
            ("COURSESYNC_API_TOKEN", "secret"),
        ]));
        assert_eq!(config.port, 9090);
        assert_eq!(config.api_token.as_deref(), Some("secret"));
    }

    #[test]
    fn test_invalid_port_and_empty_token_fall_back() {
        let config = Config::from_lookup(lookup(&[
            ("COURSESYNC_PORT", "not-a-port"),
            ("COURSESYNC_API_TOKEN", ""),
        ]));
        assert_eq!(config.port, 8080);
        assert_eq!(config.api_token, None);
    }
}
