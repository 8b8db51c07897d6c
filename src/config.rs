//! Process configuration, read once at startup.
//!
//! Values come from the environment, optionally pre-populated from a `.env`
//! file. The resulting [`Settings`] are immutable and handed to the server by
//! value; nothing reads the environment after startup.

use std::net::SocketAddr;
use std::path::PathBuf;
use thiserror::Error;

/// Required: the only directory whose files may be analyzed.
pub const SAFE_ROOT_VAR: &str = "MUSIC_ANALYZER_SAFE_ROOT";

/// Optional: listen address for the HTTP server.
pub const BIND_VAR: &str = "MUSIC_ANALYZER_BIND";

pub const DEFAULT_BIND: &str = "127.0.0.1:8000";

/// Fatal startup errors. The process refuses to serve when any of these occur.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error(
        "{SAFE_ROOT_VAR} environment variable must be set. \
         Please create a .env file in the project root with this variable."
    )]
    MissingSafeRoot,

    #[error("{SAFE_ROOT_VAR} '{path}' cannot be resolved: {source}")]
    UnresolvableSafeRoot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{SAFE_ROOT_VAR} '{0}' is not a directory")]
    SafeRootNotDirectory(PathBuf),

    #[error("{BIND_VAR} '{value}' is not a valid socket address: {reason}")]
    InvalidBind { value: String, reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Safe root as configured (canonicalized later by the path guard)
    pub safe_root: PathBuf,
    pub bind: SocketAddr,
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read settings through an arbitrary variable lookup.
    ///
    /// Tests pass a closure over a map instead of mutating the process
    /// environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let safe_root = lookup(SAFE_ROOT_VAR)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .ok_or(ConfigError::MissingSafeRoot)?;

        let bind_value = lookup(BIND_VAR)
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind = bind_value
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidBind {
                value: bind_value.clone(),
                reason: e.to_string(),
            })?;

        Ok(Settings {
            safe_root: PathBuf::from(safe_root),
            bind,
        })
    }
}

/// Outcome of looking for a `.env` file, reported once logging is up.
#[derive(Debug)]
pub enum EnvFile {
    Loaded(PathBuf),
    Absent,
    Invalid(String),
}

/// Populate the environment from the nearest `.env` file, if any.
///
/// Variables already present in the environment win over the file.
pub fn load_env_file() -> EnvFile {
    match dotenvy::dotenv() {
        Ok(path) => EnvFile::Loaded(path),
        Err(e) if e.not_found() => EnvFile::Absent,
        Err(e) => EnvFile::Invalid(e.to_string()),
    }
}
