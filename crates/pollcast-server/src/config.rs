use pollcast_core::{AppConfig, Limits, RealtimeSettings};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid configuration:\n  - {}", .0.join("\n  - "))]
    Invalid(Vec<String>),
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub api: ApiConfig,
    pub auth: AuthConfig,
    pub limits: Limits,
    pub realtime: RealtimeConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            allowed_origins: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Base URL of the remote poll API, including any stage path.
    pub base_url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Secret the session tokens are signed with.
    pub secret: String,
    pub google_client_id: String,
    pub google_client_secret: String,
    pub whitelist_enabled: bool,
    pub whitelist_users: Vec<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RealtimeConfig {
    pub endpoint: String,
    pub authorizer_name: String,
    /// Key the remote publishers present to `/api/push`.
    pub publish_key: String,
}

impl Config {
    /// Read `path` (if it exists), apply `POLLCAST_*` overrides from the
    /// process environment and validate the result.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let mut config = if path.exists() {
            Self::from_toml(&std::fs::read_to_string(path)?)?
        } else {
            tracing::warn!(
                "config file {} not found, using defaults and environment",
                path.display()
            );
            Self::default()
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Override fields from environment variables looked up through `var`.
    /// Values that fail to parse are all reported together.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        let mut issues = Vec::new();
        let mut env = EnvOverrides {
            var: &var,
            issues: &mut issues,
        };

        env.string("POLLCAST_BIND_ADDRESS", &mut self.server.bind_address);
        env.list("POLLCAST_ALLOWED_ORIGINS", &mut self.server.allowed_origins);
        env.string("POLLCAST_API_BASE_URL", &mut self.api.base_url);

        env.string("POLLCAST_AUTH_SECRET", &mut self.auth.secret);
        env.string("POLLCAST_GOOGLE_CLIENT_ID", &mut self.auth.google_client_id);
        env.string("POLLCAST_GOOGLE_CLIENT_SECRET", &mut self.auth.google_client_secret);
        env.parsed("POLLCAST_WHITELIST_ENABLED", &mut self.auth.whitelist_enabled);
        env.list("POLLCAST_WHITELIST_USERS", &mut self.auth.whitelist_users);

        let limits = &mut self.limits;
        env.string("POLLCAST_NANO_ID_ALPHABET", &mut limits.nano_id_alphabet);
        env.parsed("POLLCAST_NANO_ID_LENGTH", &mut limits.nano_id_length);
        env.parsed("POLLCAST_PROMPT_MIN_LENGTH", &mut limits.prompt_min_length);
        env.parsed("POLLCAST_PROMPT_MAX_LENGTH", &mut limits.prompt_max_length);
        env.parsed("POLLCAST_OPTION_MIN_LENGTH", &mut limits.option_min_length);
        env.parsed("POLLCAST_OPTION_MAX_LENGTH", &mut limits.option_max_length);
        env.parsed("POLLCAST_MIN_OPTIONS", &mut limits.min_options);
        env.parsed("POLLCAST_MAX_OPTIONS", &mut limits.max_options);
        env.parsed("POLLCAST_MIN_DURATION", &mut limits.min_duration);
        env.parsed("POLLCAST_MAX_DURATION", &mut limits.max_duration);

        env.string("POLLCAST_REALTIME_ENDPOINT", &mut self.realtime.endpoint);
        env.string("POLLCAST_REALTIME_AUTHORIZER_NAME", &mut self.realtime.authorizer_name);
        env.string("POLLCAST_PUBLISH_KEY", &mut self.realtime.publish_key);

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(issues))
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let issues = self.issues();
        if issues.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(issues))
        }
    }

    fn issues(&self) -> Vec<String> {
        let mut issues = Vec::new();

        let required = [
            ("server.bind_address", &self.server.bind_address),
            ("api.base_url", &self.api.base_url),
            ("auth.secret", &self.auth.secret),
            ("auth.google_client_id", &self.auth.google_client_id),
            ("auth.google_client_secret", &self.auth.google_client_secret),
            ("realtime.endpoint", &self.realtime.endpoint),
            ("realtime.authorizer_name", &self.realtime.authorizer_name),
            ("realtime.publish_key", &self.realtime.publish_key),
        ];
        for (name, value) in required {
            if value.trim().is_empty() {
                issues.push(format!("{name} is required"));
            }
        }

        if !self.api.base_url.trim().is_empty() {
            match url::Url::parse(&self.api.base_url) {
                Ok(url) if matches!(url.scheme(), "http" | "https") => {}
                _ => issues.push("api.base_url must be an http(s) URL".to_string()),
            }
        }

        issues.extend(self.limits.issues().into_iter().map(|i| format!("limits: {i}")));

        if self.auth.whitelist_enabled && self.whitelist_users().next().is_none() {
            issues.push("auth.whitelist_users must list at least one user when the whitelist is enabled".to_string());
        }

        issues
    }

    fn whitelist_users(&self) -> impl Iterator<Item = &str> {
        self.auth
            .whitelist_users
            .iter()
            .map(|u| u.trim())
            .filter(|u| !u.is_empty())
    }

    pub fn app_config(&self) -> AppConfig {
        AppConfig {
            limits: self.limits.clone(),
            session_secret: self.auth.secret.clone(),
            whitelist: self
                .auth
                .whitelist_enabled
                .then(|| self.whitelist_users().map(str::to_string).collect::<HashSet<_>>()),
            publish_key: self.realtime.publish_key.clone(),
            allowed_origins: self.server.allowed_origins.clone(),
            realtime: RealtimeSettings {
                endpoint: self.realtime.endpoint.clone(),
                authorizer_name: self.realtime.authorizer_name.clone(),
            },
        }
    }
}

struct EnvOverrides<'a, F> {
    var: &'a F,
    issues: &'a mut Vec<String>,
}

impl<F: Fn(&str) -> Option<String>> EnvOverrides<'_, F> {
    fn string(&mut self, key: &str, target: &mut String) {
        if let Some(value) = (self.var)(key) {
            *target = value;
        }
    }

    /// Comma separated.
    fn list(&mut self, key: &str, target: &mut Vec<String>) {
        if let Some(value) = (self.var)(key) {
            *target = value
                .split(',')
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .collect();
        }
    }

    fn parsed<T: FromStr>(&mut self, key: &str, target: &mut T)
    where
        T::Err: std::fmt::Display,
    {
        let Some(value) = (self.var)(key) else {
            return;
        };
        match value.trim().parse() {
            Ok(parsed) => *target = parsed,
            Err(e) => self.issues.push(format!("{key}: {e}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    const VALID: &str = r#"
[server]
bind_address = "127.0.0.1:8080"
allowed_origins = ["https://polls.example.com"]

[api]
base_url = "https://api.example.com/prod"

[auth]
secret = "session-secret"
google_client_id = "client-id"
google_client_secret = "client-secret"

[limits]
max_options = 6

[realtime]
endpoint = "wss://realtime.example.com/mqtt"
authorizer_name = "pollcast-authorizer"
publish_key = "publish-key"
"#;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    fn messages(err: ConfigError) -> Vec<String> {
        match err {
            ConfigError::Invalid(issues) => issues,
            other => panic!("unexpected error {other}"),
        }
    }

    #[test]
    fn parses_valid_file() {
        let config = Config::from_toml(VALID).unwrap();
        config.validate().unwrap();
        assert_eq!(config.limits.max_options, 6);
        assert_eq!(config.limits.min_options, 2);
        assert_eq!(config.app_config().allowed_origins, vec!["https://polls.example.com"]);
        assert!(config.app_config().whitelist.is_none());
    }

    #[test]
    fn env_overrides_file_values() {
        let mut config = Config::from_toml(VALID).unwrap();
        config
            .apply_env(env(&[
                ("POLLCAST_MAX_DURATION", "3600"),
                ("POLLCAST_WHITELIST_ENABLED", "true"),
                ("POLLCAST_WHITELIST_USERS", "google-1, google-2,"),
                ("POLLCAST_AUTH_SECRET", "from-env"),
            ]))
            .unwrap();
        config.validate().unwrap();

        assert_eq!(config.limits.max_duration, 3600);
        let app = config.app_config();
        assert_eq!(app.session_secret, "from-env");
        let whitelist = app.whitelist.unwrap();
        assert_eq!(whitelist.len(), 2);
        assert!(whitelist.contains("google-2"));
    }

    #[test]
    fn unparseable_env_values_are_reported() {
        let mut config = Config::from_toml(VALID).unwrap();
        let issues = messages(
            config
                .apply_env(env(&[
                    ("POLLCAST_MIN_OPTIONS", "two"),
                    ("POLLCAST_WHITELIST_ENABLED", "yes please"),
                ]))
                .unwrap_err(),
        );
        assert_eq!(issues.len(), 2);
        assert!(issues[0].starts_with("POLLCAST_WHITELIST_ENABLED"));
        assert!(issues[1].starts_with("POLLCAST_MIN_OPTIONS"));
    }

    #[test]
    fn min_above_max_fails_validation() {
        let mut config = Config::from_toml(VALID).unwrap();
        config.limits.min_duration = 7200;
        config.limits.max_duration = 3600;
        let issues = messages(config.validate().unwrap_err());
        assert_eq!(issues.len(), 1);
        assert!(issues[0].starts_with("limits: "));
    }

    #[test]
    fn every_missing_setting_is_reported() {
        let issues = messages(Config::default().validate().unwrap_err());
        assert!(issues.contains(&"api.base_url is required".to_string()));
        assert!(issues.contains(&"auth.secret is required".to_string()));
        assert!(issues.contains(&"realtime.publish_key is required".to_string()));
        assert_eq!(issues.len(), 7);
    }

    #[test]
    fn base_url_must_be_http() {
        let mut config = Config::from_toml(VALID).unwrap();
        config.api.base_url = "ftp://api.example.com".into();
        let issues = messages(config.validate().unwrap_err());
        assert_eq!(issues, vec!["api.base_url must be an http(s) URL"]);
    }

    #[test]
    fn enabled_whitelist_needs_users() {
        let mut config = Config::from_toml(VALID).unwrap();
        config.auth.whitelist_enabled = true;
        config.auth.whitelist_users = vec!["  ".into()];
        let issues = messages(config.validate().unwrap_err());
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("whitelist"));
    }

    #[test]
    fn load_reads_file_from_disk() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(VALID.as_bytes()).unwrap();
        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.api.base_url, "https://api.example.com/prod");
    }

    #[test]
    fn load_rejects_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"[server\nbind_address = 1").unwrap();
        assert!(matches!(
            Config::load(file.path()),
            Err(ConfigError::Parse(_))
        ));
    }
}
