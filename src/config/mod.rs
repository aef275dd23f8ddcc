//! Configuration for vectors and intern tables
//!
//! Every configuration type implements [`Config`], which gives it validation,
//! initialization from environment variables and JSON persistence.
//!
//! # Environment Initialization
//!
//! ```rust
//! use mmvec::config::{Config, InternConfig};
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Reads MMVEC_INTERN_BITS and MMVEC_INTERN_PROBE_WARN
//! let config = InternConfig::from_env()?;
//!
//! // Same fields under a custom prefix
//! let config = InternConfig::from_env_with_prefix("MYAPP_")?;
//! # Ok(())
//! # }
//! ```

use crate::error::{MmvecError, Result};
use serde::{de::DeserializeOwned, Serialize};
use std::env;
use std::fmt;
use std::path::Path;

pub mod intern;
pub mod vector;


pub use intern::InternConfig;
pub use vector::VectorConfig;

/// Default prefix for environment variables
pub const ENV_PREFIX: &str = "MMVEC_";

/// Common configuration trait providing validation, environment
/// initialization and file persistence.
pub trait Config: Clone + fmt::Debug + Serialize + DeserializeOwned {
    /// Validate the configuration for correctness and consistency.
    fn validate(&self) -> Result<()>;

    /// Initialize configuration from environment variables.
    ///
    /// Variables use the format `MMVEC_{COMPONENT}_{FIELD}`, for example
    /// `MMVEC_INTERN_BITS=20`.
    fn from_env() -> Result<Self>
    where
        Self: Default,
    {
        Self::from_env_with_prefix(ENV_PREFIX)
    }

    /// Initialize configuration from environment variables with a custom prefix.
    ///
    /// Unset or unparsable variables keep their default values. The result
    /// is validated before it is returned.
    fn from_env_with_prefix(prefix: &str) -> Result<Self>
    where
        Self: Default;

    /// Save configuration to a JSON file.
    fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let serialized = serde_json::to_string_pretty(self)
            .map_err(|e| MmvecError::configuration(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, serialized)
            .map_err(|e| MmvecError::configuration(format!("Failed to write config file: {}", e)))?;
        Ok(())
    }

    /// Load and validate configuration from a JSON file.
    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| MmvecError::configuration(format!("Failed to read config file: {}", e)))?;
        let config: Self = serde_json::from_str(&content)
            .map_err(|e| MmvecError::configuration(format!("Failed to parse config file: {}", e)))?;
        config.validate()?;
        Ok(config)
    }
}

/// Parse an environment variable, falling back to `default` when it is
/// unset or does not parse.
pub fn parse_env_var<T>(var_name: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    env::var(var_name)
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .unwrap_or(default)
}

/// Parse a boolean environment variable.
///
/// Accepts "true", "1", "yes", "on" (case-insensitive) as true,
/// everything else as false.
pub fn parse_env_bool(var_name: &str, default: bool) -> bool {
    env::var(var_name)
        .ok()
        .map(|s| {
            let s = s.trim().to_lowercase();
            matches!(s.as_str(), "true" | "1" | "yes" | "on")
        })
        .unwrap_or(default)
}
