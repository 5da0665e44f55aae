//! Server configuration from `BELAY_*` environment variables.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use belay_auth::config::lifetime;
use belay_auth::{AuthConfig, SuperuserSeed};
use belay_db::DbConfig;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} is invalid: {message}")]
    Invalid { var: &'static str, message: String },

    #[error("set all of BELAY_SUPERUSER_USERNAME, BELAY_SUPERUSER_EMAIL and BELAY_SUPERUSER_PASSWORD, or none")]
    PartialSuperuser,
}

/// Everything the binary needs to start.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    pub db: DbConfig,
    pub auth: AuthConfig,
    /// Adds `Secure` to the session cookie. Turn off only for plain-HTTP
    /// local development.
    pub cookie_secure: bool,
    /// How often expired sessions are purged.
    pub session_sweep_interval: Duration,
    /// Operator account created at startup if missing.
    pub superuser: Option<SuperuserSeed>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 3000)),
            db: DbConfig::default(),
            auth: AuthConfig::default(),
            cookie_secure: true,
            session_sweep_interval: Duration::from_secs(300),
            superuser: None,
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source; unset variables keep
    /// their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = parsed(&lookup, "BELAY_BIND_ADDR")? {
            config.bind_addr = addr;
        }
        if let Some(url) = lookup("BELAY_DB_URL") {
            config.db.url = url;
        }
        if let Some(ns) = lookup("BELAY_DB_NAMESPACE") {
            config.db.namespace = ns;
        }
        if let Some(name) = lookup("BELAY_DB_DATABASE") {
            config.db.database = name;
        }
        if let Some(user) = lookup("BELAY_DB_USERNAME") {
            config.db.username = Some(user).filter(|u| !u.is_empty());
        }
        if let Some(pass) = lookup("BELAY_DB_PASSWORD") {
            config.db.password = Some(pass).filter(|p| !p.is_empty());
        }
        if config.db.url.starts_with("mem://") {
            config.db.username = None;
            config.db.password = None;
        }

        if let Some(secs) = parsed(&lookup, "BELAY_SESSION_LIFETIME_SECS")? {
            in_range("BELAY_SESSION_LIFETIME_SECS", secs)?;
            config.auth.session_lifetime_secs = secs;
        }
        // Zero issues linking codes that never lapse.
        if let Some(secs) = parsed::<_, u64>(&lookup, "BELAY_LINKING_CODE_LIFETIME_SECS")? {
            config.auth.linking_code_lifetime_secs = match secs {
                0 => None,
                secs => Some(in_range("BELAY_LINKING_CODE_LIFETIME_SECS", secs)?),
            };
        }
        if let Some(secs) = parsed(&lookup, "BELAY_SESSION_SWEEP_SECS")? {
            config.session_sweep_interval =
                Duration::from_secs(in_range("BELAY_SESSION_SWEEP_SECS", secs)?);
        }
        if let Some(len) = parsed(&lookup, "BELAY_MIN_PASSWORD_LENGTH")? {
            config.auth.min_password_length = len;
        }
        config.auth.pepper = lookup("BELAY_PASSWORD_PEPPER").filter(|p| !p.is_empty());
        if let Some(secure) = parsed(&lookup, "BELAY_COOKIE_SECURE")? {
            config.cookie_secure = secure;
        }

        let non_empty = |var: &str| lookup(var).filter(|v| !v.trim().is_empty());
        config.superuser = match (
            non_empty("BELAY_SUPERUSER_USERNAME"),
            non_empty("BELAY_SUPERUSER_EMAIL"),
            non_empty("BELAY_SUPERUSER_PASSWORD"),
        ) {
            (Some(username), Some(email), Some(password)) => Some(SuperuserSeed {
                username,
                email,
                password,
            }),
            (None, None, None) => None,
            _ => return Err(ConfigError::PartialSuperuser),
        };

        Ok(config)
    }
}

fn in_range(var: &'static str, secs: u64) -> Result<u64, ConfigError> {
    lifetime("configured", secs)
        .map(|_| secs)
        .map_err(|e| ConfigError::Invalid {
            var,
            message: e.to_string(),
        })
}

fn parsed<F, T>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    lookup(var)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
                var,
                message: e.to_string(),
            })
        })
        .transpose()
}
