// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::time::Duration;

use clap::Parser;

/// Dispatch core configuration. Every field has an environment-variable
/// fallback so the process can be configured identically from a shell or
/// from an orchestrator's env block.
#[derive(Debug, Clone, Parser)]
#[command(name = "ride-dispatch-core", version, about = "Ride-hailing dispatch and auction core.")]
pub struct Config {
    /// HTTP/WebSocket port to listen on.
    #[arg(long, default_value_t = 10_000, env = "PORT")]
    pub port: u16,

    /// Host address to bind to.
    #[arg(long, default_value = "0.0.0.0", env = "HOST")]
    pub host: String,

    /// Drivers offered per auction round.
    #[arg(long, default_value_t = 3, env = "BATCH_SIZE")]
    pub batch_size: usize,

    /// Offer time-to-live, in milliseconds, before a round advances.
    #[arg(long, default_value_t = 12_000, env = "OFFER_TTL_MS")]
    pub offer_ttl_ms: u64,

    /// Maximum number of auction rounds before a ride is reported exhausted.
    #[arg(long, default_value_t = 3, env = "MAX_ROUNDS")]
    pub max_rounds: u32,

    /// Age, in milliseconds, beyond which a driver's last known location is stale.
    #[arg(long, default_value_t = 30_000, env = "DRIVER_STALE_MS")]
    pub driver_stale_ms: u64,

    /// Ignore availability and freshness when selecting candidates. Development only.
    #[arg(long, default_value_t = false, env = "QUICK_TEST_MODE")]
    pub quick_test_mode: bool,

    /// Log format: `json` or `text`.
    #[arg(long, default_value = "json", env = "LOG_FORMAT")]
    pub log_format: String,

    /// Log level filter (trace, debug, info, warn, error).
    #[arg(long, default_value = "info", env = "LOG_LEVEL")]
    pub log_level: String,
}

impl Config {
    /// Validate the configuration after parsing.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.batch_size == 0 {
            anyhow::bail!("--batch-size must be at least 1");
        }
        if self.max_rounds == 0 {
            anyhow::bail!("--max-rounds must be at least 1");
        }
        if self.offer_ttl_ms == 0 {
            anyhow::bail!("--offer-ttl-ms must be greater than zero");
        }
        match self.log_format.as_str() {
            "json" | "text" => {}
            other => anyhow::bail!("invalid log format: {other} (expected json or text)"),
        }
        Ok(())
    }

    pub fn offer_ttl(&self) -> Duration {
        Duration::from_millis(self.offer_ttl_ms)
    }

    pub fn driver_stale(&self) -> Duration {
        Duration::from_millis(self.driver_stale_ms)
    }
}

/// Retry delay between empty auction rounds.
pub const RETRY_DELAY: Duration = Duration::from_secs(2);

/// Linger before a terminal ride's room is torn down.
pub const LINGER: Duration = Duration::from_secs(3);

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Config {
        Config {
            port: 10_000,
            host: "0.0.0.0".into(),
            batch_size: 3,
            offer_ttl_ms: 12_000,
            max_rounds: 3,
            driver_stale_ms: 30_000,
            quick_test_mode: false,
            log_format: "json".into(),
            log_level: "info".into(),
        }
    }

    #[test]
    fn default_config_is_valid() {
        assert!(base().validate().is_ok());
    }

    #[test]
    fn rejects_zero_batch_size() {
        let mut cfg = base();
        cfg.batch_size = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn rejects_bad_log_format() {
        let mut cfg = base();
        cfg.log_format = "xml".into();
        assert!(cfg.validate().is_err());
    }
}
