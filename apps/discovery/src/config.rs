//! Service configuration derived from environment variables.
//!
//! Configuration is loaded once at startup and validated before the service starts.
//!
//! ## Environment Variables
//!
//! - `DISCOVERY_HOST`: Bind address (default: :: for dual-stack IPv4/IPv6)
//! - `DISCOVERY_PORT`: HTTP port (default: 5000)
//! - `DISCOVERY_DB_PATH`: Path to ReDB database file
//! - `DISCOVERY_BODY_LIMIT_KB`: Maximum accepted request body
//! - `DISCOVERY_PROPOSAL_TTL_SECS`: Hide proposals from nodes silent for longer
//!   than this (0 disables the cutoff)
//! - `DISCOVERY_AVAILABILITY_WINDOW_MINUTES`: Default availability window
//! - `RATE_LIMIT_PER_SECOND`, `RATE_LIMIT_BURST`: Per-IP request limits
//! - `RUST_LOG`: Log level filter

use std::env;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_PORT: u16 = 5000;
const DEFAULT_DB_PATH: &str = "./.data/discovery.redb";
const DEFAULT_BODY_LIMIT_KB: usize = 256;
const DEFAULT_AVAILABILITY_WINDOW_MINUTES: u32 = 60;

/// Upper bound for availability windows (one week).
pub const MAX_AVAILABILITY_WINDOW_MINUTES: u32 = 7 * 24 * 60;

fn env_trim(name: &str) -> String {
    env::var(name).unwrap_or_default().trim().to_string()
}

/// Service configuration.
#[derive(Debug, Clone)]
pub struct Settings {
    port: u16,
    host: IpAddr,
    db_path: PathBuf,
    body_limit_bytes: usize,
    proposal_ttl_secs: u64,
    availability_window_minutes: u32,
}

impl Settings {
    /// Load settings from environment variables.
    pub fn from_env() -> Self {
        let port = env_trim("DISCOVERY_PORT")
            .parse::<u16>()
            .unwrap_or(DEFAULT_PORT);

        let host = env_trim("DISCOVERY_HOST")
            .parse::<IpAddr>()
            .unwrap_or(IpAddr::V6(Ipv6Addr::UNSPECIFIED));

        let db_path = Some(env_trim("DISCOVERY_DB_PATH"))
            .filter(|value| !value.is_empty())
            .map_or_else(|| PathBuf::from(DEFAULT_DB_PATH), PathBuf::from);

        let body_limit_kb = env_trim("DISCOVERY_BODY_LIMIT_KB")
            .parse::<usize>()
            .unwrap_or(DEFAULT_BODY_LIMIT_KB);

        let proposal_ttl_secs = env_trim("DISCOVERY_PROPOSAL_TTL_SECS")
            .parse::<u64>()
            .unwrap_or(0);

        let availability_window_minutes = env_trim("DISCOVERY_AVAILABILITY_WINDOW_MINUTES")
            .parse::<u32>()
            .unwrap_or(DEFAULT_AVAILABILITY_WINDOW_MINUTES);

        Self {
            port,
            host,
            db_path,
            body_limit_bytes: body_limit_kb.saturating_mul(1024),
            proposal_ttl_secs,
            availability_window_minutes,
        }
    }

    /// Create settings for tests.
    pub fn for_tests() -> Self {
        Self {
            port: DEFAULT_PORT,
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            db_path: PathBuf::from("./.data/test-discovery.redb"),
            body_limit_bytes: DEFAULT_BODY_LIMIT_KB * 1024,
            proposal_ttl_secs: 0,
            availability_window_minutes: DEFAULT_AVAILABILITY_WINDOW_MINUTES,
        }
    }

    /// Validate settings.
    ///
    /// Returns an error message if validation fails.
    pub fn validate(&self) -> Result<(), String> {
        if self.body_limit_bytes == 0 {
            return Err("DISCOVERY_BODY_LIMIT_KB must be greater than zero.".to_string());
        }

        if self.availability_window_minutes == 0
            || self.availability_window_minutes > MAX_AVAILABILITY_WINDOW_MINUTES
        {
            return Err(format!(
                "DISCOVERY_AVAILABILITY_WINDOW_MINUTES must be between 1 and \
                 {MAX_AVAILABILITY_WINDOW_MINUTES}."
            ));
        }

        Ok(())
    }

    // Getters

    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn db_path(&self) -> &PathBuf {
        &self.db_path
    }

    pub fn body_limit_bytes(&self) -> usize {
        self.body_limit_bytes
    }

    /// Read-time staleness cutoff for discovery, if enabled.
    pub fn proposal_ttl(&self) -> Option<Duration> {
        (self.proposal_ttl_secs > 0).then(|| Duration::from_secs(self.proposal_ttl_secs))
    }

    pub fn availability_window_minutes(&self) -> u32 {
        self.availability_window_minutes
    }

    pub fn with_proposal_ttl_secs(mut self, secs: u64) -> Self {
        self.proposal_ttl_secs = secs;
        self
    }

    pub fn with_body_limit_bytes(mut self, bytes: usize) -> Self {
        self.body_limit_bytes = bytes;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_validation() {
        assert!(Settings::for_tests().validate().is_ok());
        assert!(
            Settings::for_tests()
                .with_body_limit_bytes(0)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn test_default_socket_addr() {
        assert_eq!(Settings::for_tests().socket_addr().port(), DEFAULT_PORT);
    }

    #[test]
    fn test_proposal_ttl_disabled_by_default() {
        let settings = Settings::for_tests();
        assert!(settings.proposal_ttl().is_none());

        let settings = settings.with_proposal_ttl_secs(120);
        assert_eq!(settings.proposal_ttl(), Some(Duration::from_secs(120)));
    }

    #[test]
    fn test_rejects_oversized_availability_window() {
        let mut settings = Settings::for_tests();
        settings.availability_window_minutes = MAX_AVAILABILITY_WINDOW_MINUTES + 1;
        assert!(settings.validate().is_err());
    }
}
