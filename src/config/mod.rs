//! Runtime settings read from the environment; the binary loads `.env` first.

use crate::error::ConfigError;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://database/campus.db";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";

/// Which application answers requests.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AppMode {
    /// Regular front controller.
    #[default]
    Normal,
    /// Front controller that also logs every incoming request.
    Debug,
    /// Answers every request with a fixed page.
    Fake,
}

impl FromStr for AppMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "normal" => Ok(AppMode::Normal),
            "debug" => Ok(AppMode::Debug),
            "fake" => Ok(AppMode::Fake),
            _ => Err(ConfigError::InvalidValue {
                key: "APP_MODE",
                value: s.to_string(),
            }),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    /// Directory whose `*.html` files override the built-in templates.
    pub template_dir: Option<PathBuf>,
    pub mode: AppMode,
    /// Fill empty tables with demo rows on startup.
    pub seed: bool,
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key lookup; `from_env` passes the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").unwrap_or_else(|| DEFAULT_DATABASE_URL.into());
        let bind_raw = lookup("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.into());
        let bind_addr = bind_raw.parse().map_err(|_| ConfigError::InvalidValue {
            key: "BIND_ADDR",
            value: bind_raw.clone(),
        })?;
        let template_dir = lookup("TEMPLATE_DIR").filter(|s| !s.is_empty()).map(PathBuf::from);
        let mode = match lookup("APP_MODE") {
            Some(v) => v.parse()?,
            None => AppMode::Normal,
        };
        let seed = match lookup("SEED") {
            Some(v) => parse_bool("SEED", &v)?,
            None => true,
        };
        Ok(Settings {
            database_url,
            bind_addr,
            template_dir,
            mode,
            seed,
        })
    }
}

fn parse_bool(key: &'static str, v: &str) -> Result<bool, ConfigError> {
    match v.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            key,
            value: v.to_string(),
        }),
    }
}
