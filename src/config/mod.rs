//! Configuration loading for the notes service.
//!
//! Loads layered `.env` files and environment variables prefixed with
//! `NOTES_`, producing a typed [`AppConfig`].

use std::{collections::BTreeMap, env, net::SocketAddr, path::PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Role;

/// Signing secret used when none is configured. Only accepted in `local` and `test` profiles.
pub const DEFAULT_JWT_SECRET: &str = "your-secret-key-change-in-production";

/// Application configuration derived from `NOTES_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub struct AppConfig {
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default = "default_api_bind_addr")]
    pub api_bind_addr: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default = "default_log_format")]
    pub log_format: String,
    #[serde(default = "default_data_file")]
    pub data_file: String,
    #[serde(default = "default_jwt_secret")]
    pub jwt_secret: String,
    #[serde(default = "default_token_ttl_seconds")]
    pub token_ttl_seconds: u64,
    #[serde(default = "default_free_plan_note_limit")]
    pub free_plan_note_limit: usize,
    #[serde(default = "default_upgrade_roles")]
    pub upgrade_roles: Vec<Role>,
    #[serde(default = "default_payment_roles")]
    pub payment_roles: Vec<Role>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_secret_key: Option<String>,
    #[serde(default = "default_pro_plan_price")]
    pub pro_plan_price: u64,
    #[serde(default = "default_payment_currency")]
    pub payment_currency: String,
    #[serde(default = "default_payment_auto_succeed")]
    pub payment_auto_succeed: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cors_allowed_origins: Vec<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profile: default_profile(),
            api_bind_addr: default_api_bind_addr(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            data_file: default_data_file(),
            jwt_secret: default_jwt_secret(),
            token_ttl_seconds: default_token_ttl_seconds(),
            free_plan_note_limit: default_free_plan_note_limit(),
            upgrade_roles: default_upgrade_roles(),
            payment_roles: default_payment_roles(),
            payment_secret_key: None,
            pro_plan_price: default_pro_plan_price(),
            payment_currency: default_payment_currency(),
            payment_auto_succeed: default_payment_auto_succeed(),
            cors_allowed_origins: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Returns the configured bind address as a socket address.
    pub fn bind_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        self.api_bind_addr.parse()
    }

    /// Path of the persisted data snapshot.
    pub fn data_path(&self) -> PathBuf {
        PathBuf::from(&self.data_file)
    }

    /// Whether the signing secret is still the built-in development value.
    pub fn uses_default_jwt_secret(&self) -> bool {
        self.jwt_secret == DEFAULT_JWT_SECRET
    }

    /// Pro plan price in minor currency units (cents), or `None` on overflow.
    pub fn pro_plan_price_minor_units(&self) -> Option<u64> {
        self.pro_plan_price.checked_mul(100)
    }

    fn is_dev_profile(&self) -> bool {
        matches!(self.profile.as_str(), "local" | "test")
    }

    /// Returns a redacted JSON representation (secrets are redacted).
    pub fn redacted_json(&self) -> serde_json::Result<String> {
        let mut config = self.clone();
        config.jwt_secret = "[REDACTED]".to_string();
        if config.payment_secret_key.is_some() {
            config.payment_secret_key = Some("[REDACTED]".to_string());
        }
        serde_json::to_string_pretty(&config)
    }

    /// Validates the configuration, returning an error for unusable settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.is_empty() {
            return Err(ConfigError::EmptyJwtSecret);
        }

        if self.uses_default_jwt_secret() && !self.is_dev_profile() {
            return Err(ConfigError::InsecureJwtSecret {
                profile: self.profile.clone(),
            });
        }

        if self.token_ttl_seconds == 0 {
            return Err(ConfigError::InvalidTokenTtl {
                value: self.token_ttl_seconds,
            });
        }

        if self.free_plan_note_limit == 0 {
            return Err(ConfigError::InvalidFreePlanLimit {
                value: self.free_plan_note_limit,
            });
        }

        if self.upgrade_roles.is_empty() {
            return Err(ConfigError::EmptyRoleList {
                field: "UPGRADE_ROLES".to_string(),
            });
        }

        if self.payment_roles.is_empty() {
            return Err(ConfigError::EmptyRoleList {
                field: "PAYMENT_ROLES".to_string(),
            });
        }

        if self.pro_plan_price == 0 || self.pro_plan_price_minor_units().is_none() {
            return Err(ConfigError::InvalidProPlanPrice {
                value: self.pro_plan_price,
            });
        }

        // Only the in-process mock gateway exists; a live key would suggest real charges.
        if self
            .payment_secret_key
            .as_deref()
            .is_some_and(|key| key.starts_with("sk_live_"))
        {
            return Err(ConfigError::LivePaymentKey);
        }

        if !matches!(self.log_format.as_str(), "json" | "pretty") {
            return Err(ConfigError::InvalidLogFormat {
                value: self.log_format.clone(),
            });
        }

        if self.data_file.trim().is_empty() {
            return Err(ConfigError::EmptyDataFile);
        }

        Ok(())
    }
}

fn default_profile() -> String {
    "local".to_string()
}

fn default_api_bind_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "json".to_string()
}

fn default_data_file() -> String {
    "data.json".to_string()
}

fn default_jwt_secret() -> String {
    DEFAULT_JWT_SECRET.to_string()
}

fn default_token_ttl_seconds() -> u64 {
    24 * 60 * 60
}

fn default_free_plan_note_limit() -> usize {
    3
}

fn default_upgrade_roles() -> Vec<Role> {
    vec![Role::Admin]
}

fn default_payment_roles() -> Vec<Role> {
    vec![Role::Admin, Role::Member]
}

fn default_pro_plan_price() -> u64 {
    2000
}

fn default_payment_currency() -> String {
    "usd".to_string()
}

fn default_payment_auto_succeed() -> bool {
    true
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load environment file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        source: dotenvy::Error,
    },
    #[error("invalid api bind address '{value}': {source}")]
    InvalidBindAddr {
        value: String,
        source: std::net::AddrParseError,
    },
    #[error("JWT signing secret is empty; set NOTES_JWT_SECRET")]
    EmptyJwtSecret,
    #[error(
        "the default JWT signing secret is not allowed in profile '{profile}'; set NOTES_JWT_SECRET"
    )]
    InsecureJwtSecret { profile: String },
    #[error("token TTL must be positive, got {value}")]
    InvalidTokenTtl { value: u64 },
    #[error("free plan note limit must be at least 1, got {value}")]
    InvalidFreePlanLimit { value: usize },
    #[error("{field} must list at least one role")]
    EmptyRoleList { field: String },
    #[error("invalid role '{value}' in {field}; expected admin or member")]
    InvalidRole { field: String, value: String },
    #[error("pro plan price must be positive and fit in minor units, got {value}")]
    InvalidProPlanPrice { value: u64 },
    #[error("a live payment key is configured but only the mock payment provider is available")]
    LivePaymentKey,
    #[error("invalid numeric value '{value}' for {field}")]
    InvalidNumber { field: String, value: String },
    #[error("invalid boolean value '{value}' for {field}")]
    InvalidBool { field: String, value: String },
    #[error("log format must be 'json' or 'pretty', got '{value}'")]
    InvalidLogFormat { value: String },
    #[error("data file path cannot be empty")]
    EmptyDataFile,
}

/// Unprefixed variable names honoured for compatibility with existing deployments.
const LEGACY_ALIASES: &[(&str, &str)] = &[
    ("JWT_SECRET", "JWT_SECRET"),
    ("STRIPE_SECRET_KEY", "PAYMENT_SECRET_KEY"),
];

/// Loads configuration using layered `.env` files and `NOTES_*` env vars.
pub struct ConfigLoader {
    base_dir: PathBuf,
}

impl ConfigLoader {
    /// Creates a new loader rooted at the current working directory.
    pub fn new() -> Self {
        Self {
            base_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
        }
    }

    /// Creates a loader rooted at the provided directory (useful for tests).
    pub fn with_base_dir(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Loads and validates configuration.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        let (mut layered, profile_hint) = self.collect_layered_env()?;

        // Legacy names first, so an explicit NOTES_* value still wins.
        for (legacy, key) in LEGACY_ALIASES {
            if let Ok(value) = env::var(legacy)
                && !value.is_empty()
            {
                layered.insert((*key).to_string(), value);
            }
        }

        // Overlay process environment last so it wins.
        for (key, value) in env::vars() {
            if let Some(stripped) = key.strip_prefix("NOTES_") {
                layered.insert(stripped.to_string(), value);
            }
        }

        let profile = take_string(&mut layered, "PROFILE").unwrap_or(profile_hint);
        let api_bind_addr =
            take_string(&mut layered, "API_BIND_ADDR").unwrap_or_else(default_api_bind_addr);
        let log_level = take_string(&mut layered, "LOG_LEVEL").unwrap_or_else(default_log_level);
        let log_format =
            take_string(&mut layered, "LOG_FORMAT").unwrap_or_else(default_log_format);
        let data_file = take_string(&mut layered, "DATA_FILE").unwrap_or_else(default_data_file);
        let jwt_secret =
            take_string(&mut layered, "JWT_SECRET").unwrap_or_else(default_jwt_secret);
        let token_ttl_seconds = take_number(&mut layered, "TOKEN_TTL_SECONDS")?
            .unwrap_or_else(default_token_ttl_seconds);
        let free_plan_note_limit = take_number(&mut layered, "FREE_PLAN_NOTE_LIMIT")?
            .unwrap_or_else(default_free_plan_note_limit);
        let upgrade_roles = take_roles(&mut layered, "UPGRADE_ROLES")?
            .unwrap_or_else(default_upgrade_roles);
        let payment_roles = take_roles(&mut layered, "PAYMENT_ROLES")?
            .unwrap_or_else(default_payment_roles);
        let payment_secret_key = take_string(&mut layered, "PAYMENT_SECRET_KEY");
        let pro_plan_price =
            take_number(&mut layered, "PRO_PLAN_PRICE")?.unwrap_or_else(default_pro_plan_price);
        let payment_currency = take_string(&mut layered, "PAYMENT_CURRENCY")
            .map(|currency| currency.to_lowercase())
            .unwrap_or_else(default_payment_currency);
        let payment_auto_succeed = take_bool(&mut layered, "PAYMENT_AUTO_SUCCEED")?
            .unwrap_or_else(default_payment_auto_succeed);
        let cors_allowed_origins = take_string(&mut layered, "CORS_ALLOWED_ORIGINS")
            .map(|origins| {
                origins
                    .split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let config = AppConfig {
            profile,
            api_bind_addr,
            log_level,
            log_format,
            data_file,
            jwt_secret,
            token_ttl_seconds,
            free_plan_note_limit,
            upgrade_roles,
            payment_roles,
            payment_secret_key,
            pro_plan_price,
            payment_currency,
            payment_auto_succeed,
            cors_allowed_origins,
        };

        config.validate()?;

        match config.bind_addr() {
            Ok(_) => Ok(config),
            Err(source) => Err(ConfigError::InvalidBindAddr {
                value: config.api_bind_addr.clone(),
                source,
            }),
        }
    }

    fn collect_layered_env(&self) -> Result<(BTreeMap<String, String>, String), ConfigError> {
        let mut values = BTreeMap::new();

        self.merge_dotenv(self.base_dir.join(".env"), &mut values)?;
        self.merge_dotenv(self.base_dir.join(".env.local"), &mut values)?;

        let profile = env::var("NOTES_PROFILE")
            .ok()
            .filter(|v| !v.is_empty())
            .or_else(|| values.get("PROFILE").cloned())
            .unwrap_or_else(default_profile);

        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}", &profile)),
            &mut values,
        )?;
        self.merge_dotenv(
            self.base_dir.join(format!(".env.{}.local", &profile)),
            &mut values,
        )?;

        Ok((values, profile))
    }

    fn merge_dotenv(
        &self,
        path: PathBuf,
        values: &mut BTreeMap<String, String>,
    ) -> Result<(), ConfigError> {
        match dotenvy::from_path_iter(&path) {
            Ok(iter) => {
                let mut prefixed = Vec::new();
                for item in iter {
                    let (key, value) = item.map_err(|source| ConfigError::EnvFile {
                        path: path.clone(),
                        source,
                    })?;
                    if let Some(stripped) = key.strip_prefix("NOTES_") {
                        prefixed.push((stripped.to_string(), value));
                    } else if let Some((_, alias)) =
                        LEGACY_ALIASES.iter().find(|(legacy, _)| *legacy == key)
                        && !value.is_empty()
                    {
                        values.insert((*alias).to_string(), value);
                    }
                }
                // Within one file a NOTES_* value beats its legacy alias.
                values.extend(prefixed);
                Ok(())
            }
            Err(dotenvy::Error::Io(ref io_err))
                if io_err.kind() == std::io::ErrorKind::NotFound =>
            {
                Ok(())
            }
            Err(err) => Err(ConfigError::EnvFile { path, source: err }),
        }
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

fn take_string(values: &mut BTreeMap<String, String>, key: &str) -> Option<String> {
    values
        .remove(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn take_number<T: std::str::FromStr>(
    values: &mut BTreeMap<String, String>,
    key: &str,
) -> Result<Option<T>, ConfigError> {
    take_string(values, key)
        .map(|raw| {
            raw.parse::<T>().map_err(|_| ConfigError::InvalidNumber {
                field: key.to_string(),
                value: raw,
            })
        })
        .transpose()
}

fn take_bool(values: &mut BTreeMap<String, String>, key: &str) -> Result<Option<bool>, ConfigError> {
    take_string(values, key)
        .map(|raw| match raw.to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidBool {
                field: key.to_string(),
                value: raw,
            }),
        })
        .transpose()
}

fn take_roles(
    values: &mut BTreeMap<String, String>,
    key: &str,
) -> Result<Option<Vec<Role>>, ConfigError> {
    let Some(raw) = take_string(values, key) else {
        return Ok(None);
    };

    let mut roles = Vec::new();
    for entry in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let role = entry.parse::<Role>().map_err(|_| ConfigError::InvalidRole {
            field: key.to_string(),
            value: entry.to_string(),
        })?;
        if !roles.contains(&role) {
            roles.push(role);
        }
    }

    Ok(Some(roles))
}
