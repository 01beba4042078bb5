//! Engine supervisor (C11): config loading, the process-wide audit
//! logger, and the per-symbol worker supervisor that ties the pipeline,
//! risk, and OMS crates together into one running process.

#![deny(dead_code)]
#![forbid(unsafe_code)]

pub mod config;
pub mod logger;
pub mod supervisor;

pub use config::{Config, ConfigError, EngineConfig, EngineMode, FixConfig};
pub use logger::{AuditLogger, LogLevel, LogRecord};
pub use supervisor::Engine;
