use anyhow::{ bail, Context, Result };
use dotenv::dotenv;
use serde::{ Deserialize, Serialize };
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

use crate::error::ArbitrageError;
use crate::utils::serde_helpers::{ serialize_level, deserialize_level };

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub debug: bool,
    /// Never printed with the rest of the config
    #[serde(skip_serializing, default)]
    pub api_key: Option<String>,
    pub rest_url: String,
    pub ws_url: String,

    /// Asset every path starts and ends in
    pub anchor_asset: String,
    /// Starting notional, in anchor asset
    pub swap_amount: f64,
    /// Minimum expected profit fraction for a candidate
    pub order_profit: f64,
    /// Unset selects push mode
    pub poll_interval_secs: Option<f64>,
    /// Minimum gap between push snapshots; unset emits on every update
    pub push_throttle_secs: Option<f64>,

    pub active_only: bool,
    pub topology_refresh_secs: Option<f64>,
    pub max_consecutive_failures: u32,
    pub sink: SinkKind,

    #[serde(serialize_with = "serialize_level", deserialize_with = "deserialize_level")]
    pub log_level: Level,
    pub log_config: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogConfig {
    pub directory: PathBuf,
    pub filename_prefix: String,
    pub rotation: LogRotation,
    pub max_files: Option<usize>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum LogRotation {
    Hourly,
    Daily,
    Never,
}

/// Where selected candidates go
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SinkKind {
    /// Print to stdout
    Console,
    /// Hand off over a bounded channel to an execution task
    Channel,
}

/// How the snapshot source obtains market data
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SourceMode {
    Push,
    Poll(Duration),
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // Load environment variables from .env file
        match dotenv() {
            Ok(path) => {
                println!("✅ Loaded .env file from: {}", path.display());
            }
            Err(e) => {
                println!("⚠️  Warning: Could not load .env file: {}", e);
            }
        }

        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Parse configuration from any key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self> where F: Fn(&str) -> Option<String> {
        let var = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let debug = var("TRI_DEBUG", "false")
            .parse::<bool>()
            .context("Failed to parse TRI_DEBUG environment variable")?;

        let api_key = lookup("TRI_API_KEY").filter(|s| !s.is_empty());
        let rest_url = var("TRI_REST_URL", "https://api.binance.com/api/");
        let ws_url = var("TRI_WS_URL", "wss://stream.binance.com:9443/ws");

        let anchor_asset = var("TRI_ANCHOR_ASSET", "USDT").trim().to_uppercase();

        let swap_amount = var("TRI_SWAP_AMOUNT", "100")
            .parse::<f64>()
            .context("Failed to parse TRI_SWAP_AMOUNT environment variable")?;

        let order_profit = var("TRI_ORDER_PROFIT", "0.00001")
            .parse::<f64>()
            .context("Failed to parse TRI_ORDER_PROFIT environment variable")?;

        let poll_interval_secs = lookup("TRI_POLL_INTERVAL_SECS")
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.trim().parse::<f64>())
            .transpose()
            .context("Failed to parse TRI_POLL_INTERVAL_SECS environment variable")?;

        let push_throttle_secs = lookup("TRI_PUSH_THROTTLE_SECS")
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.trim().parse::<f64>())
            .transpose()
            .context("Failed to parse TRI_PUSH_THROTTLE_SECS environment variable")?;

        let active_only = var("TRI_ACTIVE_ONLY", "true")
            .parse::<bool>()
            .context("Failed to parse TRI_ACTIVE_ONLY environment variable")?;

        let topology_refresh_secs = lookup("TRI_TOPOLOGY_REFRESH_SECS")
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.trim().parse::<f64>())
            .transpose()
            .context("Failed to parse TRI_TOPOLOGY_REFRESH_SECS environment variable")?;

        let max_consecutive_failures = var("TRI_MAX_CONSECUTIVE_FAILURES", "5")
            .parse::<u32>()
            .context("Failed to parse TRI_MAX_CONSECUTIVE_FAILURES environment variable")?;

        let sink = match var("TRI_SINK", "console").trim().to_lowercase().as_str() {
            "console" => SinkKind::Console,
            "channel" => SinkKind::Channel,
            other => bail!("Unknown TRI_SINK '{}', expected console or channel", other),
        };

        let log_level = match var("TRI_LOG_LEVEL", "info").to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::INFO,
        };

        let rotation = match var("TRI_LOG_ROTATION", "daily").to_lowercase().as_str() {
            "hourly" => LogRotation::Hourly,
            "never" => LogRotation::Never,
            _ => LogRotation::Daily,
        };

        let log_config = LogConfig {
            directory: PathBuf::from(var("TRI_LOG_DIRECTORY", "logs")),
            filename_prefix: var("TRI_LOG_FILENAME_PREFIX", "triangular_arbitrage"),
            rotation,
            max_files: lookup("TRI_LOG_MAX_FILES").and_then(|s| s.parse::<usize>().ok()),
        };

        let config = Config {
            debug,
            api_key,
            rest_url,
            ws_url,
            anchor_asset,
            swap_amount,
            order_profit,
            poll_interval_secs,
            push_throttle_secs,
            active_only,
            topology_refresh_secs,
            max_consecutive_failures,
            sink,
            log_level,
            log_config,
        };

        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ArbitrageError> {
        if self.anchor_asset.is_empty() {
            return Err(ArbitrageError::Config("anchor asset cannot be empty".to_string()));
        }

        if !self.swap_amount.is_finite() || self.swap_amount <= 0.0 {
            return Err(ArbitrageError::Config("swap amount must be positive".to_string()));
        }

        if !self.order_profit.is_finite() {
            return Err(ArbitrageError::Config("order profit must be a finite number".to_string()));
        }

        for (name, value) in [
            ("poll interval", self.poll_interval_secs),
            ("topology refresh interval", self.topology_refresh_secs),
            ("push throttle", self.push_throttle_secs),
        ] {
            if let Some(secs) = value {
                if !secs.is_finite() || secs <= 0.0 {
                    return Err(ArbitrageError::Config(format!("{} must be positive", name)));
                }
            }
        }

        if self.max_consecutive_failures == 0 {
            return Err(
                ArbitrageError::Config("max consecutive failures must be at least 1".to_string())
            );
        }

        Ok(())
    }

    pub fn source_mode(&self) -> SourceMode {
        match self.poll_interval_secs {
            Some(secs) => SourceMode::Poll(Duration::from_secs_f64(secs)),
            None => SourceMode::Push,
        }
    }

    /// Only meaningful in push mode
    pub fn push_throttle(&self) -> Option<Duration> {
        self.push_throttle_secs.map(Duration::from_secs_f64)
    }

    pub fn topology_refresh(&self) -> Option<Duration> {
        self.topology_refresh_secs.map(Duration::from_secs_f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_select_push_mode() {
        let config = Config::from_lookup(lookup_from(&[])).unwrap();

        assert_eq!(config.anchor_asset, "USDT");
        assert_eq!(config.swap_amount, 100.0);
        assert_eq!(config.order_profit, 0.00001);
        assert_eq!(config.source_mode(), SourceMode::Push);
        assert!(config.active_only);
        assert!(config.topology_refresh().is_none());
        assert!(config.push_throttle().is_none());
        assert_eq!(config.sink, SinkKind::Console);
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.log_config.rotation, LogRotation::Daily);
    }

    #[test]
    fn poll_interval_selects_poll_mode() {
        let config = Config::from_lookup(
            lookup_from(&[("TRI_POLL_INTERVAL_SECS", "0.5"), ("TRI_ANCHOR_ASSET", " busd ")])
        ).unwrap();

        assert_eq!(config.source_mode(), SourceMode::Poll(Duration::from_millis(500)));
        assert_eq!(config.anchor_asset, "BUSD");
    }

    #[test]
    fn push_throttle_is_parsed_and_validated() {
        let config = Config::from_lookup(lookup_from(&[("TRI_PUSH_THROTTLE_SECS", "0.25")])).unwrap();
        assert_eq!(config.source_mode(), SourceMode::Push);
        assert_eq!(config.push_throttle(), Some(Duration::from_millis(250)));

        assert!(Config::from_lookup(lookup_from(&[("TRI_PUSH_THROTTLE_SECS", "-1")])).is_err());
        assert!(Config::from_lookup(lookup_from(&[("TRI_PUSH_THROTTLE_SECS", "inf")])).is_err());
    }

    #[test]
    fn selects_sink_by_name() {
        let config = Config::from_lookup(lookup_from(&[("TRI_SINK", " Channel ")])).unwrap();
        assert_eq!(config.sink, SinkKind::Channel);

        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["sink"], "channel");

        assert!(Config::from_lookup(lookup_from(&[("TRI_SINK", "kafka")])).is_err());
    }

    #[test]
    fn rejects_non_positive_swap_amount() {
        let result = Config::from_lookup(lookup_from(&[("TRI_SWAP_AMOUNT", "0")]));
        assert!(result.is_err());
    }

    #[test]
    fn rejects_zero_poll_interval() {
        let result = Config::from_lookup(lookup_from(&[("TRI_POLL_INTERVAL_SECS", "0")]));
        assert!(result.is_err());
    }

    #[test]
    fn rejects_unparsable_threshold() {
        let result = Config::from_lookup(lookup_from(&[("TRI_ORDER_PROFIT", "lots")]));
        assert!(result.is_err());
    }

    #[test]
    fn serializes_level_as_lowercase_string() {
        let config = Config::from_lookup(lookup_from(&[("TRI_LOG_LEVEL", "DEBUG")])).unwrap();
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["log_level"], "debug");

        let parsed: Config = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.log_level, Level::DEBUG);
    }

    #[test]
    fn api_key_is_not_serialized() {
        let config = Config::from_lookup(lookup_from(&[("TRI_API_KEY", "secret")])).unwrap();
        assert_eq!(config.api_key.as_deref(), Some("secret"));

        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("secret"));
    }
}
