//! Config loading (§6): `key=value` lines with optional `[section]`
//! headers producing dotted keys (`section.key`). Comments begin with `#`
//! or `;`. Hand-rolled per SPEC_FULL.md §11 -- simple enough that the
//! teacher would write this directly rather than add a dependency.

use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

/// Errors raised while loading or interpreting config.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// A mandatory key was absent.
    #[error("missing required config key '{0}'")]
    MissingKey(String),

    /// A key's value couldn't be parsed as the type the caller expected.
    #[error("config key '{key}' has invalid value '{value}'")]
    InvalidValue {
        /// The dotted key.
        key: String,
        /// The raw string value that failed to parse.
        value: String,
    },
}

/// A parsed `key=value`/`[section]` config file: a flat map from dotted
/// key (`section.key`) to raw string value. Typed accessors live on
/// [`EngineConfig`]; this type is the untyped intermediate.
#[derive(Debug, Clone, Default)]
pub struct Config {
    values: BTreeMap<String, String>,
}

impl Config {
    /// Parse `text` into a dotted-key map. Unknown keys are kept (callers
    /// decide what's mandatory); malformed lines (no `=`) are skipped.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut values = BTreeMap::new();
        let mut section = String::new();
        for raw_line in text.lines() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
                continue;
            }
            if let Some(stripped) = line.strip_prefix('[').and_then(|s| s.strip_suffix(']')) {
                section = stripped.trim().to_string();
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim();
            let dotted = if section.is_empty() {
                key.to_string()
            } else {
                format!("{section}.{key}")
            };
            values.insert(dotted, value.to_string());
        }
        Self { values }
    }

    /// Raw string value for a dotted key.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Required string value.
    pub fn require_str(&self, key: &str) -> Result<&str, ConfigError> {
        self.get(key).ok_or_else(|| ConfigError::MissingKey(key.to_string()))
    }

    /// Parse a `u64`, with a default if the key is absent.
    pub fn u64_or(&self, key: &str, default: u64) -> Result<u64, ConfigError> {
        match self.get(key) {
            None => Ok(default),
            Some(v) => v.parse().map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: v.to_string(),
            }),
        }
    }

    /// Parse an `f64`, with a default if the key is absent.
    pub fn f64_or(&self, key: &str, default: f64) -> Result<f64, ConfigError> {
        match self.get(key) {
            None => Ok(default),
            Some(v) => v.parse().map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: v.to_string(),
            }),
        }
    }

    /// Parse a `u32`, with a default if the key is absent.
    pub fn u32_or(&self, key: &str, default: u32) -> Result<u32, ConfigError> {
        match self.get(key) {
            None => Ok(default),
            Some(v) => v.parse().map_err(|_| ConfigError::InvalidValue {
                key: key.to_string(),
                value: v.to_string(),
            }),
        }
    }

    /// Parse a boolean (`true`/`false`/`1`/`0`), with a default.
    pub fn bool_or(&self, key: &str, default: bool) -> Result<bool, ConfigError> {
        match self.get(key) {
            None => Ok(default),
            Some("true" | "1") => Ok(true),
            Some("false" | "0") => Ok(false),
            Some(v) => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                value: v.to_string(),
            }),
        }
    }
}

/// Run mode: `sim` processes no live order flow (used for dry-run /
/// backtesting harnesses); `live` routes approved intents to the venue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineMode {
    /// No orders leave the process.
    Sim,
    /// Orders are routed live.
    Live,
}

impl fmt::Display for EngineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Sim => "sim",
            Self::Live => "live",
        })
    }
}

/// `fix.*` section: session identity and venue connectivity.
#[derive(Debug, Clone)]
pub struct FixConfig {
    /// `fix.sender_comp_id`.
    pub sender_comp_id: String,
    /// `fix.target_comp_id`.
    pub target_comp_id: String,
    /// `fix.heartbeat_secs`.
    pub heartbeat_secs: u64,
    /// `fix.primary_host`.
    pub primary_host: String,
    /// `fix.primary_port`.
    pub primary_port: u16,
    /// `fix.backup_host`, if a backup venue is configured.
    pub backup_host: Option<String>,
    /// `fix.backup_port`, if a backup venue is configured.
    pub backup_port: Option<u16>,
}

/// Fully typed, validated configuration for one `Engine` instance.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// `server.http_port`.
    pub http_port: u16,
    /// `server.ws_port`.
    pub ws_port: u16,
    /// `engine.mode`.
    pub mode: EngineMode,
    /// `engine.symbol`, comma-separated in the file, split here.
    pub symbols: Vec<String>,
    /// `engine.log_path`.
    pub log_path: String,
    /// `fix.*`.
    pub fix: FixConfig,
    /// `risk.*`, with spec.md §4.8 defaults where unset.
    pub risk: risk::RiskLimits,
}

impl EngineConfig {
    /// Build a validated [`EngineConfig`] from a parsed [`Config`].
    pub fn from_config(cfg: &Config) -> Result<Self, ConfigError> {
        let mode = match cfg.require_str("engine.mode")? {
            "sim" => EngineMode::Sim,
            "live" => EngineMode::Live,
            other => {
                return Err(ConfigError::InvalidValue {
                    key: "engine.mode".to_string(),
                    value: other.to_string(),
                })
            }
        };
        let symbols: Vec<String> = cfg
            .require_str("engine.symbol")?
            .split(',')
            .map(|s| s.trim().to_ascii_uppercase())
            .filter(|s| !s.is_empty())
            .collect();
        if symbols.is_empty() {
            return Err(ConfigError::MissingKey("engine.symbol".to_string()));
        }

        let has_backup = cfg.get("fix.backup_host").is_some();
        let fix = FixConfig {
            sender_comp_id: cfg.require_str("fix.sender_comp_id")?.to_string(),
            target_comp_id: cfg.require_str("fix.target_comp_id")?.to_string(),
            heartbeat_secs: cfg.u64_or("fix.heartbeat_secs", 30)?,
            primary_host: cfg.require_str("fix.primary_host")?.to_string(),
            primary_port: cfg.u32_or("fix.primary_port", 0)? as u16,
            backup_host: has_backup.then(|| cfg.get("fix.backup_host").unwrap().to_string()),
            backup_port: has_backup.then(|| cfg.u32_or("fix.backup_port", 0).unwrap_or(0) as u16),
        };

        let defaults = risk::RiskLimits::defaults();
        let risk = risk::RiskLimits {
            cooldown_ms: cfg.u64_or("risk.cooldown_ms", defaults.cooldown_ms)?,
            max_ops_per_sec: cfg.u32_or("risk.max_ops_per_sec", defaults.max_ops_per_sec)?,
            max_position_size: cfg.f64_or("risk.max_position_size", defaults.max_position_size)?,
            max_global_notional: cfg.f64_or("risk.max_global_notional", defaults.max_global_notional)?,
            max_notional_per_symbol: cfg.f64_or(
                "risk.max_notional_per_symbol",
                defaults.max_notional_per_symbol,
            )?,
            max_drawdown_pct: cfg.f64_or("risk.max_drawdown_pct", defaults.max_drawdown_pct)?,
            max_daily_loss: cfg.f64_or("risk.max_daily_loss", defaults.max_daily_loss)?,
            min_confidence: cfg.f64_or("risk.min_confidence", defaults.min_confidence)?,
        };

        Ok(Self {
            http_port: cfg.u32_or("server.http_port", 8080)? as u16,
            ws_port: cfg.u32_or("server.ws_port", 8081)? as u16,
            mode,
            symbols,
            log_path: cfg.get("engine.log_path").unwrap_or("shrivenq.log").to_string(),
            fix,
            risk,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "
        # top-level comment
        [server]
        http_port=9090
        ws_port=9091

        [engine]
        mode=sim
        symbol = btcusdt, ethusdt
        log_path=/tmp/shrivenq.log

        ; semicolon comment
        [fix]
        sender_comp_id=US
        target_comp_id=VENUE
        heartbeat_secs=30
        primary_host=fix.venue.test
        primary_port=9878

        [risk]
        cooldown_ms=100
        max_ops_per_sec=20
    ";

    #[test]
    fn parses_sections_into_dotted_keys() {
        let cfg = Config::parse(SAMPLE);
        assert_eq!(cfg.get("server.http_port"), Some("9090"));
        assert_eq!(cfg.get("engine.mode"), Some("sim"));
        assert_eq!(cfg.get("fix.sender_comp_id"), Some("US"));
    }

    #[test]
    fn comments_and_blank_lines_are_ignored() {
        let cfg = Config::parse(SAMPLE);
        assert_eq!(cfg.values.len(), 12);
    }

    #[test]
    fn engine_config_builds_from_parsed_sample() {
        let cfg = Config::parse(SAMPLE);
        let engine_cfg = EngineConfig::from_config(&cfg).unwrap();
        assert_eq!(engine_cfg.http_port, 9090);
        assert_eq!(engine_cfg.mode, EngineMode::Sim);
        assert_eq!(engine_cfg.symbols, vec!["BTCUSDT", "ETHUSDT"]);
        assert_eq!(engine_cfg.fix.sender_comp_id, "US");
        assert_eq!(engine_cfg.risk.cooldown_ms, 100);
        assert_eq!(engine_cfg.risk.max_ops_per_sec, 20);
        // Unset risk keys fall back to spec.md defaults.
        assert_eq!(engine_cfg.risk.max_daily_loss, risk::RiskLimits::defaults().max_daily_loss);
    }

    #[test]
    fn missing_mandatory_key_is_reported() {
        let cfg = Config::parse("[engine]\nmode=sim\n");
        let err = EngineConfig::from_config(&cfg).unwrap_err();
        assert_eq!(err, ConfigError::MissingKey("engine.symbol".to_string()));
    }

    #[test]
    fn invalid_mode_is_reported() {
        let cfg = Config::parse("[engine]\nmode=turbo\nsymbol=BTCUSDT\n");
        let err = EngineConfig::from_config(&cfg).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key, .. } if key == "engine.mode"));
    }
}
