//! Intern table configuration.

use super::{parse_env_var, Config};
use crate::error::{MmvecError, Result};
use serde::{Deserialize, Serialize};

/// Smallest accepted `bits`
pub const MIN_BITS: u32 = 1;
/// Largest accepted `bits`
pub const MAX_BITS: u32 = 31;

/// Configuration for [`InternTable`](crate::hash_map::InternTable)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InternConfig {
    /// log2 of the slot count; the table never grows past `2^bits` keys
    pub bits: u32,
    /// Probe length above which a warning is logged
    pub probe_warn_threshold: usize,
}

impl Default for InternConfig {
    fn default() -> Self {
        Self {
            bits: 16,
            probe_warn_threshold: 64,
        }
    }
}

impl InternConfig {
    /// Configuration with `2^bits` slots and the default warning threshold
    pub fn with_bits(bits: u32) -> Self {
        Self {
            bits,
            ..Self::default()
        }
    }

    /// Number of slots this configuration allocates
    pub fn slot_count(&self) -> usize {
        1usize << self.bits
    }
}

impl Config for InternConfig {
    fn validate(&self) -> Result<()> {
        if !(MIN_BITS..=MAX_BITS).contains(&self.bits) {
            return Err(MmvecError::configuration(format!(
                "bits must be in {}..={}, got {}",
                MIN_BITS, MAX_BITS, self.bits
            )));
        }
        if self.probe_warn_threshold == 0 {
            return Err(MmvecError::configuration(
                "probe_warn_threshold must be greater than 0",
            ));
        }
        Ok(())
    }

    fn from_env_with_prefix(prefix: &str) -> Result<Self> {
        let mut config = Self::default();
        config.bits = parse_env_var(&format!("{}INTERN_BITS", prefix), config.bits);
        config.probe_warn_threshold = parse_env_var(
            &format!("{}INTERN_PROBE_WARN", prefix),
            config.probe_warn_threshold,
        );
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = InternConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.slot_count(), 65536);
    }

    #[test]
    fn test_bits_range() {
        assert!(InternConfig::with_bits(0).validate().is_err());
        assert!(InternConfig::with_bits(1).validate().is_ok());
        assert!(InternConfig::with_bits(31).validate().is_ok());
        assert!(InternConfig::with_bits(32).validate().is_err());
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let config = InternConfig {
            probe_warn_threshold: 0,
            ..InternConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert_eq!(err.category(), "config");
    }

    #[test]
    fn test_from_env_rejects_invalid_bits() {
        unsafe {
            std::env::set_var("ICFGTEST_INTERN_BITS", "40");
        }
        assert!(InternConfig::from_env_with_prefix("ICFGTEST_").is_err());
        unsafe {
            std::env::set_var("ICFGTEST_INTERN_BITS", "12");
            std::env::set_var("ICFGTEST_INTERN_PROBE_WARN", "8");
        }
        let config = InternConfig::from_env_with_prefix("ICFGTEST_").unwrap();
        assert_eq!(config.bits, 12);
        assert_eq!(config.probe_warn_threshold, 8);
        unsafe {
            std::env::remove_var("ICFGTEST_INTERN_BITS");
            std::env::remove_var("ICFGTEST_INTERN_PROBE_WARN");
        }
    }
}
