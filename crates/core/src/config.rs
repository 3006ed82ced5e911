use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::solar::{SolarConstants, SolarSizingEstimator};
use crate::tariff::{
    TariffBand, TariffCalculator, TariffError, TariffSchedule, STANDARD_LEGAL_RATE,
};

pub const DEFAULT_REGISTRATION_URL: &str = "https://forms.gle/Tszp1DBT3vw4SB8A7";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub telegram: TelegramConfig,
    pub tariff: TariffConfig,
    pub solar: SolarConstants,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug)]
pub struct TelegramConfig {
    pub bot_token: SecretString,
    pub api_base_url: String,
    /// Long-poll window passed to `getUpdates`.
    pub poll_timeout_secs: u64,
    pub registration_url: String,
}

#[derive(Clone, Debug)]
pub struct TariffConfig {
    pub bands: Vec<TariffBand>,
    pub legal_rate: Decimal,
}

impl TariffConfig {
    pub fn calculator(&self) -> Result<TariffCalculator, TariffError> {
        let schedule = TariffSchedule::new(self.bands.clone())?;
        Ok(TariffCalculator::new(schedule, self.legal_rate))
    }
}

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub bind_address: String,
    pub health_check_port: u16,
    pub graceful_shutdown_secs: u64,
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
    pub log_level: Option<String>,
    pub log_format: Option<LogFormat>,
    pub telegram_bot_token: Option<String>,
    pub registration_url: Option<String>,
    pub bind_address: Option<String>,
    pub health_check_port: Option<u16>,
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
            telegram: TelegramConfig {
                bot_token: String::new().into(),
                api_base_url: "https://api.telegram.org".to_string(),
                poll_timeout_secs: 30,
                registration_url: DEFAULT_REGISTRATION_URL.to_string(),
            },
            tariff: TariffConfig {
                bands: TariffSchedule::standard().bands().to_vec(),
                legal_rate: Decimal::from(STANDARD_LEGAL_RATE),
            },
            solar: SolarConstants::default(),
            server: ServerConfig {
                bind_address: "127.0.0.1".to_string(),
                health_check_port: 8080,
                graceful_shutdown_secs: 15,
            },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

impl FromStr for LogFormat {
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
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("quvvat.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.validate()?;

        Ok(config)
    }

    pub fn tariff_calculator(&self) -> Result<TariffCalculator, ConfigError> {
        self.tariff
            .calculator()
            .map_err(|error| ConfigError::Validation(format!("tariff.bands: {error}")))
    }

    pub fn solar_estimator(&self) -> SolarSizingEstimator {
        SolarSizingEstimator::new(self.solar)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(telegram) = patch.telegram {
            if let Some(token) = telegram.bot_token {
                self.telegram.bot_token = token.into();
            }
            if let Some(api_base_url) = telegram.api_base_url {
                self.telegram.api_base_url = api_base_url;
            }
            if let Some(poll_timeout_secs) = telegram.poll_timeout_secs {
                self.telegram.poll_timeout_secs = poll_timeout_secs;
            }
            if let Some(registration_url) = telegram.registration_url {
                self.telegram.registration_url = registration_url;
            }
        }

        if let Some(tariff) = patch.tariff {
            if let Some(bands) = tariff.bands {
                self.tariff.bands = bands;
            }
            if let Some(legal_rate) = tariff.legal_rate {
                self.tariff.legal_rate = legal_rate;
            }
        }

        if let Some(solar) = patch.solar {
            if let Some(value) = solar.annual_yield_kwh_per_kw {
                self.solar.annual_yield_kwh_per_kw = value;
            }
            if let Some(value) = solar.area_m2_per_kw {
                self.solar.area_m2_per_kw = value;
            }
            if let Some(value) = solar.cost_per_kw {
                self.solar.cost_per_kw = value;
            }
        }

        if let Some(server) = patch.server {
            if let Some(bind_address) = server.bind_address {
                self.server.bind_address = bind_address;
            }
            if let Some(health_check_port) = server.health_check_port {
                self.server.health_check_port = health_check_port;
            }
            if let Some(graceful_shutdown_secs) = server.graceful_shutdown_secs {
                self.server.graceful_shutdown_secs = graceful_shutdown_secs;
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
        if let Some(value) = read_env("QUVVAT_TELEGRAM_BOT_TOKEN") {
            self.telegram.bot_token = value.into();
        }
        if let Some(value) = read_env("QUVVAT_TELEGRAM_API_BASE_URL") {
            self.telegram.api_base_url = value;
        }
        if let Some(value) = read_env("QUVVAT_TELEGRAM_POLL_TIMEOUT_SECS") {
            self.telegram.poll_timeout_secs = parse_env("QUVVAT_TELEGRAM_POLL_TIMEOUT_SECS", &value)?;
        }
        if let Some(value) = read_env("QUVVAT_TELEGRAM_REGISTRATION_URL") {
            self.telegram.registration_url = value;
        }

        if let Some(value) = read_env("QUVVAT_TARIFF_LEGAL_RATE") {
            self.tariff.legal_rate = parse_env("QUVVAT_TARIFF_LEGAL_RATE", &value)?;
        }

        if let Some(value) = read_env("QUVVAT_SOLAR_ANNUAL_YIELD_KWH_PER_KW") {
            self.solar.annual_yield_kwh_per_kw =
                parse_env("QUVVAT_SOLAR_ANNUAL_YIELD_KWH_PER_KW", &value)?;
        }
        if let Some(value) = read_env("QUVVAT_SOLAR_AREA_M2_PER_KW") {
            self.solar.area_m2_per_kw = parse_env("QUVVAT_SOLAR_AREA_M2_PER_KW", &value)?;
        }
        if let Some(value) = read_env("QUVVAT_SOLAR_COST_PER_KW") {
            self.solar.cost_per_kw = parse_env("QUVVAT_SOLAR_COST_PER_KW", &value)?;
        }

        if let Some(value) = read_env("QUVVAT_SERVER_BIND_ADDRESS") {
            self.server.bind_address = value;
        }
        if let Some(value) = read_env("QUVVAT_SERVER_HEALTH_CHECK_PORT") {
            self.server.health_check_port = parse_env("QUVVAT_SERVER_HEALTH_CHECK_PORT", &value)?;
        }
        if let Some(value) = read_env("QUVVAT_SERVER_GRACEFUL_SHUTDOWN_SECS") {
            self.server.graceful_shutdown_secs =
                parse_env("QUVVAT_SERVER_GRACEFUL_SHUTDOWN_SECS", &value)?;
        }

        let log_level = read_env("QUVVAT_LOGGING_LEVEL").or_else(|| read_env("QUVVAT_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("QUVVAT_LOGGING_FORMAT").or_else(|| read_env("QUVVAT_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
        if let Some(log_format) = overrides.log_format {
            self.logging.format = log_format;
        }
        if let Some(token) = overrides.telegram_bot_token {
            self.telegram.bot_token = token.into();
        }
        if let Some(registration_url) = overrides.registration_url {
            self.telegram.registration_url = registration_url;
        }
        if let Some(bind_address) = overrides.bind_address {
            self.server.bind_address = bind_address;
        }
        if let Some(health_check_port) = overrides.health_check_port {
            self.server.health_check_port = health_check_port;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_telegram(&self.telegram)?;
        validate_tariff(&self.tariff)?;
        validate_solar(&self.solar)?;
        validate_server(&self.server)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("quvvat.toml"), PathBuf::from("config/quvvat.toml")]
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

fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

fn validate_telegram(telegram: &TelegramConfig) -> Result<(), ConfigError> {
    let token = telegram.bot_token.expose_secret();
    if token.is_empty() {
        return Err(ConfigError::Validation(
            "telegram.bot_token is required. Create a bot with @BotFather and copy the token it issues"
                .to_string(),
        ));
    }

    let well_formed = match token.split_once(':') {
        Some((bot_id, secret)) => {
            !bot_id.is_empty()
                && bot_id.chars().all(|ch| ch.is_ascii_digit())
                && !secret.trim().is_empty()
        }
        None => false,
    };
    if !well_formed {
        return Err(ConfigError::Validation(
            "telegram.bot_token must look like `<bot id>:<secret>` as issued by @BotFather"
                .to_string(),
        ));
    }

    if !is_http_url(&telegram.api_base_url) {
        return Err(ConfigError::Validation(
            "telegram.api_base_url must start with http:// or https://".to_string(),
        ));
    }

    if telegram.poll_timeout_secs == 0 || telegram.poll_timeout_secs > 50 {
        return Err(ConfigError::Validation(
            "telegram.poll_timeout_secs must be in range 1..=50".to_string(),
        ));
    }

    if !is_http_url(&telegram.registration_url) {
        return Err(ConfigError::Validation(
            "telegram.registration_url must start with http:// or https://".to_string(),
        ));
    }

    Ok(())
}

fn validate_tariff(tariff: &TariffConfig) -> Result<(), ConfigError> {
    if tariff.legal_rate <= Decimal::ZERO {
        return Err(ConfigError::Validation(
            "tariff.legal_rate must be greater than zero".to_string(),
        ));
    }

    TariffSchedule::new(tariff.bands.clone())
        .map(|_| ())
        .map_err(|error| ConfigError::Validation(format!("tariff.bands: {error}")))
}

fn validate_solar(solar: &SolarConstants) -> Result<(), ConfigError> {
    let fields = [
        ("solar.annual_yield_kwh_per_kw", solar.annual_yield_kwh_per_kw),
        ("solar.area_m2_per_kw", solar.area_m2_per_kw),
        ("solar.cost_per_kw", solar.cost_per_kw),
    ];
    for (name, value) in fields {
        if value <= Decimal::ZERO {
            return Err(ConfigError::Validation(format!("{name} must be greater than zero")));
        }
    }
    Ok(())
}

fn validate_server(server: &ServerConfig) -> Result<(), ConfigError> {
    if server.health_check_port == 0 {
        return Err(ConfigError::Validation(
            "server.health_check_port must be greater than zero".to_string(),
        ));
    }

    if server.graceful_shutdown_secs == 0 {
        return Err(ConfigError::Validation(
            "server.graceful_shutdown_secs must be greater than zero".to_string(),
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

fn parse_env<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value.trim().parse::<T>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    telegram: Option<TelegramPatch>,
    tariff: Option<TariffPatch>,
    solar: Option<SolarPatch>,
    server: Option<ServerPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct TelegramPatch {
    bot_token: Option<String>,
    api_base_url: Option<String>,
    poll_timeout_secs: Option<u64>,
    registration_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct TariffPatch {
    bands: Option<Vec<TariffBand>>,
    legal_rate: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
struct SolarPatch {
    annual_yield_kwh_per_kw: Option<Decimal>,
    area_m2_per_kw: Option<Decimal>,
    cost_per_kw: Option<Decimal>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerPatch {
    bind_address: Option<String>,
    health_check_port: Option<u16>,
    graceful_shutdown_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}
