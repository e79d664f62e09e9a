use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

use crate::capability::Capability;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub platform: PlatformConfig,
    pub completion: CompletionConfig,
    pub routing: RoutingConfig,
    pub session: SessionConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

/// Remote agent platform tier. Optional: when endpoint or credential are
/// absent the tier reports ConfigurationMissing instead of failing startup.
#[derive(Clone, Debug)]
pub struct PlatformConfig {
    pub endpoint: Option<String>,
    pub api_key: Option<SecretString>,
    pub agent_prefix: String,
    pub connect_timeout_secs: u64,
    pub poll_interval_secs: u64,
    pub wait_budget_secs: u64,
}

/// Remote completion service tier. Optional in the same way.
#[derive(Clone, Debug)]
pub struct CompletionConfig {
    pub endpoint: Option<String>,
    pub api_key: Option<SecretString>,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Debug)]
pub struct RoutingConfig {
    pub default_capability: Capability,
}

#[derive(Clone, Debug)]
pub struct SessionConfig {
    pub history_cap: usize,
    pub max_artifact_bytes: usize,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub port: u16,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

impl PlatformConfig {
    pub fn is_configured(&self) -> bool {
        self.endpoint.as_deref().map(|value| !value.trim().is_empty()).unwrap_or(false)
            && self
                .api_key
                .as_ref()
                .map(|value| !value.expose_secret().trim().is_empty())
                .unwrap_or(false)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn wait_budget(&self) -> Duration {
        Duration::from_secs(self.wait_budget_secs)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl CompletionConfig {
    pub fn is_configured(&self) -> bool {
        self.endpoint.as_deref().map(|value| !value.trim().is_empty()).unwrap_or(false)
            && self
                .api_key
                .as_ref()
                .map(|value| !value.expose_secret().trim().is_empty())
                .unwrap_or(false)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub platform_endpoint: Option<String>,
    pub platform_api_key: Option<String>,
    pub completion_endpoint: Option<String>,
    pub completion_api_key: Option<String>,
    pub default_capability: Option<Capability>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            platform: PlatformConfig {
                endpoint: None,
                api_key: None,
                agent_prefix: "Scrummate-".to_string(),
                connect_timeout_secs: 8,
                poll_interval_secs: 2,
                wait_budget_secs: 26,
            },
            completion: CompletionConfig {
                endpoint: None,
                api_key: None,
                model: "gpt-4".to_string(),
                timeout_secs: 10,
            },
            routing: RoutingConfig { default_capability: Capability::Coaching },
            session: SessionConfig { history_cap: 10, max_artifact_bytes: 64 * 1024 },
            server: ServerConfig { bind_address: "127.0.0.1".to_string(), port: 8005 },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("scrummate.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(platform) = patch.platform {
            if let Some(endpoint) = platform.endpoint {
                self.platform.endpoint = Some(endpoint);
            }
            if let Some(platform_api_key_value) = platform.api_key {
                self.platform.api_key = Some(secret_value(platform_api_key_value));
            }
            if let Some(agent_prefix) = platform.agent_prefix {
                self.platform.agent_prefix = agent_prefix;
            }
            if let Some(connect_timeout_secs) = platform.connect_timeout_secs {
                self.platform.connect_timeout_secs = connect_timeout_secs;
            }
            if let Some(poll_interval_secs) = platform.poll_interval_secs {
                self.platform.poll_interval_secs = poll_interval_secs;
            }
            if let Some(wait_budget_secs) = platform.wait_budget_secs {
                self.platform.wait_budget_secs = wait_budget_secs;
            }
        }

        if let Some(completion) = patch.completion {
            if let Some(endpoint) = completion.endpoint {
                self.completion.endpoint = Some(endpoint);
            }
            if let Some(completion_api_key_value) = completion.api_key {
                self.completion.api_key = Some(secret_value(completion_api_key_value));
            }
            if let Some(model) = completion.model {
                self.completion.model = model;
            }
            if let Some(timeout_secs) = completion.timeout_secs {
                self.completion.timeout_secs = timeout_secs;
            }
        }

        if let Some(routing) = patch.routing {
            if let Some(default_capability) = routing.default_capability {
                self.routing.default_capability = default_capability;
            }
        }

        if let Some(session) = patch.session {
            if let Some(history_cap) = session.history_cap {
                self.session.history_cap = history_cap;
            }
            if let Some(max_artifact_bytes) = session.max_artifact_bytes {
                self.session.max_artifact_bytes = max_artifact_bytes;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(port) = server.port {
                self.server.port = port;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("SCRUMMATE_PLATFORM_ENDPOINT") {
            self.platform.endpoint = Some(value);
        }
        if let Some(value) = read_env("SCRUMMATE_PLATFORM_API_KEY") {
            self.platform.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("SCRUMMATE_PLATFORM_AGENT_PREFIX") {
            self.platform.agent_prefix = value;
        }
        if let Some(value) = read_env("SCRUMMATE_PLATFORM_CONNECT_TIMEOUT_SECS") {
            self.platform.connect_timeout_secs =
                parse_u64("SCRUMMATE_PLATFORM_CONNECT_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("SCRUMMATE_PLATFORM_POLL_INTERVAL_SECS") {
            self.platform.poll_interval_secs =
                parse_u64("SCRUMMATE_PLATFORM_POLL_INTERVAL_SECS", &value)?;
        }
        if let Some(value) = read_env("SCRUMMATE_PLATFORM_WAIT_BUDGET_SECS") {
            self.platform.wait_budget_secs =
                parse_u64("SCRUMMATE_PLATFORM_WAIT_BUDGET_SECS", &value)?;
        }

        if let Some(value) = read_env("SCRUMMATE_COMPLETION_ENDPOINT") {
            self.completion.endpoint = Some(value);
        }
        if let Some(value) = read_env("SCRUMMATE_COMPLETION_API_KEY") {
            self.completion.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("SCRUMMATE_COMPLETION_MODEL") {
            self.completion.model = value;
        }
        if let Some(value) = read_env("SCRUMMATE_COMPLETION_TIMEOUT_SECS") {
            self.completion.timeout_secs =
                parse_u64("SCRUMMATE_COMPLETION_TIMEOUT_SECS", &value)?;
        }

        if let Some(value) = read_env("SCRUMMATE_DEFAULT_CAPABILITY") {
            self.routing.default_capability =
                value.parse().map_err(|_| ConfigError::InvalidEnvOverride {
                    key: "SCRUMMATE_DEFAULT_CAPABILITY".to_string(),
                    value,
                })?;
        }

        if let Some(value) = read_env("SCRUMMATE_SESSION_HISTORY_CAP") {
            self.session.history_cap = parse_usize("SCRUMMATE_SESSION_HISTORY_CAP", &value)?;
        }
        if let Some(value) = read_env("SCRUMMATE_SESSION_MAX_ARTIFACT_BYTES") {
            self.session.max_artifact_bytes =
                parse_usize("SCRUMMATE_SESSION_MAX_ARTIFACT_BYTES", &value)?;
        }

        if let Some(value) = read_env("SCRUMMATE_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("SCRUMMATE_SERVER_PORT") {
            self.server.port = parse_u16("SCRUMMATE_SERVER_PORT", &value)?;
        }

        let log_level =
            read_env("SCRUMMATE_LOGGING_LEVEL").or_else(|| read_env("SCRUMMATE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("SCRUMMATE_LOGGING_FORMAT").or_else(|| read_env("SCRUMMATE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(platform_endpoint) = overrides.platform_endpoint {
            self.platform.endpoint = Some(platform_endpoint);
        }
        if let Some(platform_api_key) = overrides.platform_api_key {
            self.platform.api_key = Some(secret_value(platform_api_key));
        }
        if let Some(completion_endpoint) = overrides.completion_endpoint {
            self.completion.endpoint = Some(completion_endpoint);
        }
        if let Some(completion_api_key) = overrides.completion_api_key {
            self.completion.api_key = Some(secret_value(completion_api_key));
        }
        if let Some(default_capability) = overrides.default_capability {
            self.routing.default_capability = default_capability;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_platform(&self.platform)?;
        validate_completion(&self.completion)?;
        validate_session(&self.session)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("scrummate.toml"), PathBuf::from("config/scrummate.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

// Absent remote credentials are allowed: the tier degrades at request time
// rather than blocking startup. Validation only enforces ranges.
fn validate_platform(platform: &PlatformConfig) -> Result<(), ConfigError> {
    if let Some(endpoint) = &platform.endpoint {
        validate_endpoint("platform.endpoint", endpoint)?;
    }

    if platform.connect_timeout_secs == 0 || platform.connect_timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "platform.connect_timeout_secs must be in range 1..=300".to_string(),
        ));
    }
    if platform.poll_interval_secs == 0 || platform.poll_interval_secs > 60 {
        return Err(ConfigError::Validation(
            "platform.poll_interval_secs must be in range 1..=60".to_string(),
        ));
    }
    if platform.wait_budget_secs < platform.poll_interval_secs || platform.wait_budget_secs > 300 {
        return Err(ConfigError::Validation(
            "platform.wait_budget_secs must be in range poll_interval..=300".to_string(),
        ));
    }
    if platform.agent_prefix.trim().is_empty() {
        return Err(ConfigError::Validation(
            "platform.agent_prefix must not be empty".to_string(),
        ));
    }

    Ok(())
}

fn validate_completion(completion: &CompletionConfig) -> Result<(), ConfigError> {
    if let Some(endpoint) = &completion.endpoint {
        validate_endpoint("completion.endpoint", endpoint)?;
    }

    if completion.timeout_secs == 0 || completion.timeout_secs > 300 {
        return Err(ConfigError::Validation(
            "completion.timeout_secs must be in range 1..=300".to_string(),
        ));
    }
    if completion.model.trim().is_empty() {
        return Err(ConfigError::Validation("completion.model must not be empty".to_string()));
    }

    Ok(())
}

fn validate_endpoint(field: &str, endpoint: &str) -> Result<(), ConfigError> {
    if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

fn validate_session(session: &SessionConfig) -> Result<(), ConfigError> {
    if session.history_cap == 0 {
        return Err(ConfigError::Validation(
            "session.history_cap must be greater than zero".to_string(),
        ));
    }
    if session.max_artifact_bytes == 0 {
        return Err(ConfigError::Validation(
            "session.max_artifact_bytes must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.port == 0 {
        return Err(ConfigError::Validation("server.port must be greater than zero".to_string()));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u16(key: &str, value: &str) -> Result<u16, ConfigError> {
    value.parse::<u16>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_usize(key: &str, value: &str) -> Result<usize, ConfigError> {
    value.parse::<usize>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    platform: Option<PlatformPatch>,
    completion: Option<CompletionPatch>,
    routing: Option<RoutingPatch>,
    session: Option<SessionPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct PlatformPatch {
    endpoint: Option<String>,
    api_key: Option<String>,
    agent_prefix: Option<String>,
    connect_timeout_secs: Option<u64>,
    poll_interval_secs: Option<u64>,
    wait_budget_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct CompletionPatch {
    endpoint: Option<String>,
    api_key: Option<String>,
    model: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct RoutingPatch {
    default_capability: Option<Capability>,
}

#[derive(Debug, Default, Deserialize)]
struct SessionPatch {
    history_cap: Option<usize>,
    max_artifact_bytes: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
    use crate::capability::Capability;

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    #[test]
    fn defaults_leave_remote_tiers_unconfigured_but_valid() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        let config = AppConfig::load(LoadOptions::default())
            .map_err(|err| format!("config load failed: {err}"))?;

        ensure(!config.platform.is_configured(), "platform should default to unconfigured")?;
        ensure(!config.completion.is_configured(), "completion should default to unconfigured")?;
        ensure(
            config.routing.default_capability == Capability::Coaching,
            "default capability should be coaching",
        )?;
        ensure(config.session.history_cap == 10, "default history cap should be 10")?;
        Ok(())
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("TEST_PLATFORM_API_KEY", "key-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("scrummate.toml");
            fs::write(
                &path,
                r#"
[platform]
endpoint = "https://agents.example.com/api/projects/scrummate"
api_key = "${TEST_PLATFORM_API_KEY}"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.platform.is_configured(), "platform should be configured from file")?;
            let api_key = config
                .platform
                .api_key
                .as_ref()
                .map(|value| value.expose_secret().to_string())
                .unwrap_or_default();
            ensure(api_key == "key-from-env", "api key should come from the environment")?;
            Ok(())
        })();

        clear_vars(&["TEST_PLATFORM_API_KEY"]);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SCRUMMATE_COMPLETION_MODEL", "gpt-4o-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("scrummate.toml");
            fs::write(
                &path,
                r#"
[completion]
model = "gpt-35-from-file"

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.completion.model == "gpt-4o-from-env", "env model should win over file")?;
            ensure(config.logging.level == "debug", "override log level should win over file")?;
            Ok(())
        })();

        clear_vars(&["SCRUMMATE_COMPLETION_MODEL"]);
        result
    }

    #[test]
    fn invalid_wait_budget_fails_validation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SCRUMMATE_PLATFORM_WAIT_BUDGET_SECS", "1");
        env::set_var("SCRUMMATE_PLATFORM_POLL_INTERVAL_SECS", "2");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("wait_budget_secs")
            );
            ensure(has_message, "validation failure should mention wait_budget_secs")
        })();

        clear_vars(&[
            "SCRUMMATE_PLATFORM_WAIT_BUDGET_SECS",
            "SCRUMMATE_PLATFORM_POLL_INTERVAL_SECS",
        ]);
        result
    }

    #[test]
    fn non_http_endpoint_is_rejected() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SCRUMMATE_PLATFORM_ENDPOINT", "ftp://agents.example.com");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions::default()) {
                Ok(_) => return Err("expected endpoint validation failure".to_string()),
                Err(error) => error,
            };
            let has_message = matches!(
                error,
                ConfigError::Validation(ref message) if message.contains("platform.endpoint")
            );
            ensure(has_message, "validation failure should mention platform.endpoint")
        })();

        clear_vars(&["SCRUMMATE_PLATFORM_ENDPOINT"]);
        result
    }

    #[test]
    fn secret_values_are_not_leaked_by_debug() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;

        env::set_var("SCRUMMATE_PLATFORM_API_KEY", "platform-secret-value");
        env::set_var("SCRUMMATE_COMPLETION_API_KEY", "completion-secret-value");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions::default())
                .map_err(|err| format!("config load failed: {err}"))?;
            let debug = format!("{config:?}");

            ensure(
                !debug.contains("platform-secret-value"),
                "debug output should not contain the platform key",
            )?;
            ensure(
                !debug.contains("completion-secret-value"),
                "debug output should not contain the completion key",
            )?;
            ensure(
                matches!(config.logging.format, LogFormat::Compact),
                "default logging format should be compact",
            )?;
            Ok(())
        })();

        clear_vars(&["SCRUMMATE_PLATFORM_API_KEY", "SCRUMMATE_COMPLETION_API_KEY"]);
        result
    }
}
