// ============================
// finance-backend-lib/src/config.rs
// ============================
//! Configuration management.
use std::fmt;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroize;

use crate::error::AppError;

/// Development signing secret. Every deployment must override it.
pub const DEFAULT_SECRET: &str = "FinanceAppSecretKey2024!@#$%^&*()FinanceAppSecretKey2024!@#$%^&*()FinanceAppSecretKey2024!@#$%^&*()FinanceAppSecretKey2024!@#$%^&*()";

/// Default token lifetime: one hour
pub const DEFAULT_EXPIRATION_MS: u64 = 60 * 60 * 1000;

/// Prefix for environment overrides, e.g. `FINANCE_JWT__SECRET`
pub const ENV_PREFIX: &str = "FINANCE_";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// String that never shows up in `Debug` output and is wiped on drop.
#[derive(Clone, PartialEq, Eq)]
pub struct SecretString(String);

impl SecretString {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Explicit access to the wrapped value
    pub fn expose_secret(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

impl Drop for SecretString {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl Serialize for SecretString {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for SecretString {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(SecretString)
    }
}

/// Application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Server bind address
    pub bind_addr: SocketAddr,
    /// Log level, overridden by `RUST_LOG` when set
    pub log_level: String,
    /// Emit JSON log lines instead of the human format
    pub log_json: bool,
    /// Token signing settings
    pub jwt: JwtSettings,
    /// Account seeded at startup when absent
    pub bootstrap_user: Option<BootstrapUser>,
}

/// Token signing settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JwtSettings {
    /// Secret the signing key is derived from
    pub secret: SecretString,
    /// Token lifetime in milliseconds
    pub expiration_ms: u64,
}

/// Account created by the binary on first start
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BootstrapUser {
    pub username: String,
    pub email: String,
    pub password: SecretString,
    #[serde(default = "default_bootstrap_roles")]
    pub roles: String,
}

fn default_bootstrap_roles() -> String {
    "USER".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::LOCALHOST, 8080)),
            log_level: "info".to_string(),
            log_json: false,
            jwt: JwtSettings::default(),
            bootstrap_user: None,
        }
    }
}

impl Default for JwtSettings {
    fn default() -> Self {
        Self {
            secret: SecretString::new(DEFAULT_SECRET),
            expiration_ms: DEFAULT_EXPIRATION_MS,
        }
    }
}

impl JwtSettings {
    /// Whether the built-in development secret is still in place
    pub fn uses_default_secret(&self) -> bool {
        self.secret.expose_secret() == DEFAULT_SECRET
    }
}

impl Settings {
    /// Load settings from `config.toml` in the working directory plus the environment
    pub fn load() -> Result<Self, AppError> {
        Self::load_from("config.toml")
    }

    /// Load settings from a specific TOML file plus the environment.
    /// A missing file is not an error; defaults and env vars still apply.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, AppError> {
        let settings: Settings = Figment::from(Serialized::defaults(Settings::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Reject settings the server cannot run with
    pub fn validate(&self) -> Result<(), AppError> {
        if !LOG_LEVELS.contains(&self.log_level.to_ascii_lowercase().as_str()) {
            return Err(AppError::InvalidInput(format!(
                "unknown log level '{}'",
                self.log_level
            )));
        }

        if self.jwt.expiration_ms == 0 {
            return Err(AppError::InvalidInput(
                "jwt.expiration_ms must be greater than zero".to_string(),
            ));
        }

        if self.jwt.secret.expose_secret().is_empty() {
            return Err(AppError::InvalidInput(
                "jwt.secret must not be empty".to_string(),
            ));
        }

        Ok(())
    }
}
