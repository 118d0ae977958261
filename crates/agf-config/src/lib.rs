//! Aggregate fetch configuration loading and validation.
//!
//! This crate provides:
//! - The serde form of a fetch configuration (JSON or TOML)
//! - Resolution into a validated [`FetchConfig`] with typed filters
//! - CSV column and order-by vocabularies
//! - Channel-id, module, alarm and time-range filters

pub mod columns;
pub mod error;
pub mod fetch;
pub mod filter;
pub mod order;

pub use columns::{csv_header, CsvColumn};
pub use error::ConfigError;
pub use fetch::{FetchConfig, FetchConfigFile, TimeRangeFile};
pub use filter::{
    AlarmDomain, AlarmFilter, AlarmRule, ChannelIdFilter, ModuleFilter, TimeBasis, TimeRange,
};
pub use order::OrderByType;

/// Default regex of wildcard characters stripped from module patterns.
pub const DEFAULT_MODULE_STRIP_REGEX: &str = "[*%?]";

/// Default prefix for sorted batch files.
pub const DEFAULT_OUTPUT_PREFIX: &str = "aggregate";
