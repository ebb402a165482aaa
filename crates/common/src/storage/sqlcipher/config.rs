//! SQLCipher connection pool configuration.

use std::time::Duration;

/// r2d2-specific pool settings layered on top of the SQLCipher key material.
#[derive(Debug, Clone)]
pub struct SqlCipherPoolConfig {
    pub max_size: u32,
    pub connection_timeout: Duration,
    pub busy_timeout: Duration,
    pub enable_wal: bool,
    pub enable_foreign_keys: bool,
}

impl Default for SqlCipherPoolConfig {
    fn default() -> Self {
        Self {
            max_size: 10,
            connection_timeout: Duration::from_secs(5),
            busy_timeout: Duration::from_millis(5000),
            enable_wal: true,
            enable_foreign_keys: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_matches_production_defaults() {
        let config = SqlCipherPoolConfig::default();

        assert_eq!(config.max_size, 10);
        assert_eq!(config.connection_timeout, Duration::from_secs(5));
        assert_eq!(config.busy_timeout, Duration::from_millis(5000));
        assert!(config.enable_wal);
        assert!(config.enable_foreign_keys);
    }
}
