//! File-backed vector configuration.

use super::{parse_env_bool, Config};
use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Configuration applied to memory-mapped vectors
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorConfig {
    /// Prefault pages when a file is mapped (MAP_POPULATE on Linux)
    pub populate_pages: bool,
    /// `msync` the mapping before a writable vector is released
    pub flush_on_release: bool,
}

impl VectorConfig {
    /// Configuration for vectors that are scanned right after opening
    pub fn read_mostly() -> Self {
        Self {
            populate_pages: true,
            ..Self::default()
        }
    }

    /// Configuration that forces dirty pages to disk on release
    pub fn durable() -> Self {
        Self {
            flush_on_release: true,
            ..Self::default()
        }
    }
}

impl Config for VectorConfig {
    fn validate(&self) -> Result<()> {
        Ok(())
    }

    fn from_env_with_prefix(prefix: &str) -> Result<Self> {
        let mut config = Self::default();
        config.populate_pages =
            parse_env_bool(&format!("{}VECTOR_POPULATE_PAGES", prefix), config.populate_pages);
        config.flush_on_release =
            parse_env_bool(&format!("{}VECTOR_FLUSH_ON_RELEASE", prefix), config.flush_on_release);
        config.validate()?;
        Ok(config)
    }
}
