use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::identity::DEFAULT_BOT_NAME;

const CONFIG_PATH_VAR: &str = "MCDOWELL_CONFIG";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub slack: SlackConfig,
    pub bot: BotConfig,
    pub rtm: RtmConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct SlackConfig {
    pub bot_token: SecretString,
    pub api_base_url: String,
}

#[derive(Clone, Debug)]
pub struct BotConfig {
    pub name: String,
    pub dev_mode: bool,
}

#[derive(Clone, Debug)]
pub struct RtmConfig {
    pub max_retries: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub health_check_port: u16,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub slack_bot_token: Option<String>,
    pub slack_api_base_url: Option<String>,
    pub bot_name: Option<String>,
    pub dev_mode: Option<bool>,
    pub log_level: Option<String>,
    pub health_check_port: Option<u16>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    /// Explicit config file, else `MCDOWELL_CONFIG`. Either one must point at an existing file.
    pub config_path: Option<PathBuf>,
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
            slack: SlackConfig {
                bot_token: String::new().into(),
                api_base_url: "https://slack.com/api".to_string(),
            },
            bot: BotConfig { name: DEFAULT_BOT_NAME.to_string(), dev_mode: false },
            rtm: RtmConfig { max_retries: 5, base_delay_ms: 250, max_delay_ms: 5_000 },
            server: ServerConfig { bind_address: "0.0.0.0".to_string(), health_check_port: 8088 },
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
        let explicit_path =
            options.config_path.or_else(|| read_env(CONFIG_PATH_VAR).map(PathBuf::from));

        if let Some(path) = resolve_config_path(explicit_path)? {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    /// Level handed to the log subscriber. Dev mode always wins.
    pub fn effective_log_level(&self) -> &str {
        if self.bot.dev_mode {
            "debug"
        } else {
            self.logging.level.as_str()
        }
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(slack) = patch.slack {
            if let Some(slack_bot_token_value) = slack.bot_token {
                self.slack.bot_token = secret_value(slack_bot_token_value);
            }
            if let Some(api_base_url) = slack.api_base_url {
                self.slack.api_base_url = api_base_url;
            }
        }

        if let Some(bot) = patch.bot {
            if let Some(name) = bot.name {
                self.bot.name = name;
            }
            if let Some(dev_mode) = bot.dev_mode {
                self.bot.dev_mode = dev_mode;
            }
        }

        if let Some(rtm) = patch.rtm {
            if let Some(max_retries) = rtm.max_retries {
                self.rtm.max_retries = max_retries;
            }
            if let Some(base_delay_ms) = rtm.base_delay_ms {
                self.rtm.base_delay_ms = base_delay_ms;
            }
            if let Some(max_delay_ms) = rtm.max_delay_ms {
                self.rtm.max_delay_ms = max_delay_ms;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(health_check_port) = server.health_check_port {
                self.server.health_check_port = health_check_port;
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
        let bot_token =
            read_env("MCDOWELL_SLACK_BOT_TOKEN").or_else(|| read_env("ABT_SLACK_BOT_TOKEN"));
        if let Some(value) = bot_token {
            self.slack.bot_token = secret_value(value);
        }
        if let Some(value) = read_env("MCDOWELL_SLACK_API_BASE_URL") {
            self.slack.api_base_url = value;
        }

        if let Some(value) = read_env("MCDOWELL_BOT_NAME") {
            self.bot.name = value;
        }
        let dev_mode = read_env("MCDOWELL_DEV_MODE")
            .map(|value| ("MCDOWELL_DEV_MODE", value))
            .or_else(|| {
                read_env("ABT_SLACK_BOT_DEV_MODE").map(|value| ("ABT_SLACK_BOT_DEV_MODE", value))
            });
        if let Some((key, value)) = dev_mode {
            self.bot.dev_mode = parse_bool(key, &value)?;
        }

        if let Some(value) = read_env("MCDOWELL_RTM_MAX_RETRIES") {
            self.rtm.max_retries = parse_u32("MCDOWELL_RTM_MAX_RETRIES", &value)?;
        }
        if let Some(value) = read_env("MCDOWELL_RTM_BASE_DELAY_MS") {
            self.rtm.base_delay_ms = parse_u64("MCDOWELL_RTM_BASE_DELAY_MS", &value)?;
        }
        if let Some(value) = read_env("MCDOWELL_RTM_MAX_DELAY_MS") {
            self.rtm.max_delay_ms = parse_u64("MCDOWELL_RTM_MAX_DELAY_MS", &value)?;
        }

        if let Some(value) = read_env("MCDOWELL_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("MCDOWELL_SERVER_HEALTH_CHECK_PORT") {
            self.server.health_check_port =
                parse_u16("MCDOWELL_SERVER_HEALTH_CHECK_PORT", &value)?;
        }

        let log_level =
            read_env("MCDOWELL_LOGGING_LEVEL").or_else(|| read_env("MCDOWELL_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("MCDOWELL_LOGGING_FORMAT").or_else(|| read_env("MCDOWELL_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(slack_bot_token) = overrides.slack_bot_token {
            self.slack.bot_token = secret_value(slack_bot_token);
        }
        if let Some(api_base_url) = overrides.slack_api_base_url {
            self.slack.api_base_url = api_base_url;
        }
        if let Some(bot_name) = overrides.bot_name {
            self.bot.name = bot_name;
        }
        if let Some(dev_mode) = overrides.dev_mode {
            self.bot.dev_mode = dev_mode;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(health_check_port) = overrides.health_check_port {
            self.server.health_check_port = health_check_port;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_slack(&self.slack)?;
        validate_bot(&self.bot)?;
        validate_rtm(&self.rtm)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<PathBuf>) -> Result<Option<PathBuf>, ConfigError> {
    if let Some(path) = explicit_path {
        if !path.exists() {
            return Err(ConfigError::MissingConfigFile(path));
        }
        return Ok(Some(path));
    }

    Ok([PathBuf::from("mcdowell.toml"), PathBuf::from("config/mcdowell.toml")]
        .into_iter()
        .find(|path| path.exists()))
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

fn validate_slack(slack: &SlackConfig) -> Result<(), ConfigError> {
    let bot_token = slack.bot_token.expose_secret();
    if bot_token.trim().is_empty() {
        return Err(ConfigError::Validation(
            "slack.bot_token is required for proper operation. Get it from \
             https://api.slack.com/apps > Your App > OAuth & Permissions > Bot User OAuth Token"
                .to_string(),
        ));
    }
    if !bot_token.starts_with("xoxb-") {
        let hint = if bot_token.starts_with("xapp-") {
            " (hint: you may have used an app-level token instead of the bot token)"
        } else {
            ""
        };
        return Err(ConfigError::Validation(format!(
            "slack.bot_token must start with `xoxb-`{hint}. Get it from https://api.slack.com/apps"
        )));
    }

    let base_url = slack.api_base_url.trim();
    if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
        return Err(ConfigError::Validation(
            "slack.api_base_url must start with http:// or https://".to_string(),
        ));
    }

    Ok(())
}

fn validate_bot(bot: &BotConfig) -> Result<(), ConfigError> {
    if bot.name.trim().is_empty() {
        return Err(ConfigError::Validation(
            "bot.name must match the bot user's Slack username".to_string(),
        ));
    }

    Ok(())
}

fn validate_rtm(rtm: &RtmConfig) -> Result<(), ConfigError> {
    if rtm.base_delay_ms > rtm.max_delay_ms {
        return Err(ConfigError::Validation(
            "rtm.base_delay_ms must not exceed rtm.max_delay_ms".to_string(),
        ));
    }

    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.health_check_port == 0 {
        return Err(ConfigError::Validation(
            "server.health_check_port must be greater than zero".to_string(),
        ));
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

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
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

fn parse_bool(key: &str, value: &str) -> Result<bool, ConfigError> {
    value.trim().to_ascii_lowercase().parse::<bool>().map_err(|_| {
        ConfigError::InvalidEnvOverride { key: key.to_string(), value: value.to_string() }
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    slack: Option<SlackPatch>,
    bot: Option<BotPatch>,
    rtm: Option<RtmPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct SlackPatch {
    bot_token: Option<String>,
    api_base_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct BotPatch {
    name: Option<String>,
    dev_mode: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
struct RtmPatch {
    max_retries: Option<u32>,
    base_delay_ms: Option<u64>,
    max_delay_ms: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    health_check_port: Option<u16>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
