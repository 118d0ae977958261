//! Fetch configuration: file form and resolved form.
//!
//! A [`FetchConfigFile`] is what users write (JSON or TOML). Resolving it
//! parses every textual filter once, so batch processors share typed,
//! already-validated state through an `Arc<FetchConfig>`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use agf_common::time::MAX_PRECISION;
use agf_common::TimeFormat;
use serde::{Deserialize, Serialize};

use crate::columns::CsvColumn;
use crate::error::ConfigError;
use crate::filter::{AlarmFilter, ChannelIdFilter, ModuleFilter, TimeBasis, TimeRange};
use crate::order::OrderByType;
use crate::{DEFAULT_MODULE_STRIP_REGEX, DEFAULT_OUTPUT_PREFIX};

/// Columns rendered when a configuration names none.
pub const DEFAULT_COLUMNS: [CsvColumn; 12] = [
    CsvColumn::SessionId,
    CsvColumn::ChannelId,
    CsvColumn::Name,
    CsvColumn::Module,
    CsvColumn::Ert,
    CsvColumn::Scet,
    CsvColumn::Sclk,
    CsvColumn::Dn,
    CsvColumn::Eu,
    CsvColumn::Status,
    CsvColumn::DnAlarmState,
    CsvColumn::EuAlarmState,
];

// ── File form ───────────────────────────────────────────────────────────

/// Time range as written in a config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRangeFile {
    pub basis: TimeBasis,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub stop: Option<String>,
}

/// Serde form of a fetch configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfigFile {
    pub csv_columns: Vec<CsvColumn>,
    pub order_by: OrderByType,
    pub channel_ids: Option<Vec<String>>,
    pub alarm_filter: Option<String>,
    pub module_filter: Option<String>,
    pub module_strip_regex: String,
    pub time_range: Option<TimeRangeFile>,
    pub template: Option<String>,
    pub template_globals: BTreeMap<String, String>,
    pub output_dir: PathBuf,
    pub output_prefix: String,
    pub include_packet_info: bool,
    pub use_lst: bool,
    pub show_column_headers: bool,
    pub changes_only: bool,
    pub parallel_threads: Option<usize>,
    pub processor_queue_size: Option<usize>,
    pub time_format: TimeFormat,
}

impl Default for FetchConfigFile {
    fn default() -> Self {
        Self {
            csv_columns: Vec::new(),
            order_by: OrderByType::None,
            channel_ids: None,
            alarm_filter: None,
            module_filter: None,
            module_strip_regex: DEFAULT_MODULE_STRIP_REGEX.to_string(),
            time_range: None,
            template: None,
            template_globals: BTreeMap::new(),
            output_dir: PathBuf::from("."),
            output_prefix: DEFAULT_OUTPUT_PREFIX.to_string(),
            include_packet_info: false,
            use_lst: false,
            show_column_headers: false,
            changes_only: false,
            parallel_threads: None,
            processor_queue_size: None,
            time_format: TimeFormat::default(),
        }
    }
}

// ── Resolved form ───────────────────────────────────────────────────────

/// Validated configuration shared by every processor of one fetch.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub csv_columns: Vec<CsvColumn>,
    pub order_by: OrderByType,
    pub channel_ids: Option<ChannelIdFilter>,
    pub alarm_filter: Option<AlarmFilter>,
    pub module_filter: Option<ModuleFilter>,
    pub time_range: Option<TimeRange>,
    pub template: Option<String>,
    pub template_globals: BTreeMap<String, String>,
    pub output_dir: PathBuf,
    pub output_prefix: String,
    pub include_packet_info: bool,
    pub use_lst: bool,
    pub show_column_headers: bool,
    pub changes_only: bool,
    pub parallel_threads: usize,
    pub processor_queue_size: usize,
    pub time_format: TimeFormat,
}

fn default_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

impl Default for FetchConfig {
    fn default() -> Self {
        let threads = default_threads();
        Self {
            csv_columns: DEFAULT_COLUMNS.to_vec(),
            order_by: OrderByType::None,
            channel_ids: None,
            alarm_filter: None,
            module_filter: None,
            time_range: None,
            template: None,
            template_globals: BTreeMap::new(),
            output_dir: PathBuf::from("."),
            output_prefix: DEFAULT_OUTPUT_PREFIX.to_string(),
            include_packet_info: false,
            use_lst: false,
            show_column_headers: false,
            changes_only: false,
            parallel_threads: threads,
            processor_queue_size: threads * 2,
            time_format: TimeFormat::default(),
        }
    }
}

impl FetchConfig {
    /// Parse filters and fill defaults, then validate.
    pub fn resolve(file: FetchConfigFile) -> Result<Self, ConfigError> {
        let channel_ids = match file.channel_ids {
            Some(ids) => {
                let filter = ChannelIdFilter::new(ids);
                if filter.is_empty() {
                    return Err(ConfigError::InvalidValue {
                        field: "channel_ids",
                        reason: "list is present but names no channel".to_string(),
                    });
                }
                Some(filter)
            }
            None => None,
        };

        let alarm_filter = file
            .alarm_filter
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(AlarmFilter::parse)
            .transpose()?;

        let module_filter = file
            .module_filter
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .map(|raw| ModuleFilter::new(raw, &file.module_strip_regex))
            .transpose()?;

        let time_range = file
            .time_range
            .as_ref()
            .map(|tr| TimeRange::parse(tr.basis, tr.start.as_deref(), tr.stop.as_deref()))
            .transpose()?;

        let csv_columns = if file.csv_columns.is_empty() {
            DEFAULT_COLUMNS.to_vec()
        } else {
            file.csv_columns
        };

        let parallel_threads = file.parallel_threads.unwrap_or_else(default_threads);
        let processor_queue_size = file
            .processor_queue_size
            .unwrap_or_else(|| parallel_threads.saturating_mul(2));

        let config = Self {
            csv_columns,
            order_by: file.order_by,
            channel_ids,
            alarm_filter,
            module_filter,
            time_range,
            template: file.template.filter(|t| !t.is_empty()),
            template_globals: file.template_globals,
            output_dir: file.output_dir,
            output_prefix: file.output_prefix,
            include_packet_info: file.include_packet_info,
            use_lst: file.use_lst,
            show_column_headers: file.show_column_headers,
            changes_only: file.changes_only,
            parallel_threads,
            processor_queue_size,
            time_format: file.time_format,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let file: FetchConfigFile = serde_json::from_str(json)?;
        Self::resolve(file)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let file: FetchConfigFile = toml::from_str(text)?;
        Self::resolve(file)
    }

    /// Load from a `.json` or `.toml` file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::from_json_str(&content),
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Self::from_toml_str(&content),
            other => Err(ConfigError::UnsupportedFormat(
                other.unwrap_or_default().to_string(),
            )),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.parallel_threads == 0 {
            return Err(ConfigError::InvalidValue {
                field: "parallel_threads",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.processor_queue_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "processor_queue_size",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.changes_only && self.template.is_some() {
            return Err(ConfigError::InvalidValue {
                field: "changes_only",
                reason: "cannot be combined with a template".to_string(),
            });
        }
        if self.channel_ids.as_ref().is_some_and(|f| f.is_empty()) {
            return Err(ConfigError::InvalidValue {
                field: "channel_ids",
                reason: "list is present but names no channel".to_string(),
            });
        }
        for (field, precision) in [
            ("time_format.ert_precision", self.time_format.ert_precision),
            ("time_format.scet_precision", self.time_format.scet_precision),
        ] {
            if precision > MAX_PRECISION {
                return Err(ConfigError::InvalidValue {
                    field,
                    reason: format!("precision {} exceeds {}", precision, MAX_PRECISION),
                });
            }
        }
        Ok(())
    }

    /// Executor admission bound.
    pub fn bound(&self) -> usize {
        self.processor_queue_size
    }

    pub fn threads(&self) -> usize {
        self.parallel_threads
    }

    // ── Builders ──

    pub fn with_columns(mut self, columns: &[CsvColumn]) -> Self {
        self.csv_columns = columns.to_vec();
        self
    }

    pub fn with_order_by(mut self, order_by: OrderByType) -> Self {
        self.order_by = order_by;
        self
    }

    pub fn with_channel_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.channel_ids = Some(ChannelIdFilter::new(ids));
        self
    }

    pub fn with_alarm_filter(mut self, filter: AlarmFilter) -> Self {
        self.alarm_filter = Some(filter);
        self
    }

    pub fn with_module_filter(mut self, filter: ModuleFilter) -> Self {
        self.module_filter = Some(filter);
        self
    }

    pub fn with_time_range(mut self, range: TimeRange) -> Self {
        self.time_range = Some(range);
        self
    }

    pub fn with_template(mut self, source: impl Into<String>) -> Self {
        self.template = Some(source.into());
        self
    }

    pub fn with_template_global(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.template_globals.insert(key.into(), value.into());
        self
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_output_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.output_prefix = prefix.into();
        self
    }

    pub fn with_packet_info(mut self, include: bool) -> Self {
        self.include_packet_info = include;
        self
    }

    pub fn with_lst(mut self, use_lst: bool) -> Self {
        self.use_lst = use_lst;
        self
    }

    pub fn with_changes_only(mut self, changes_only: bool) -> Self {
        self.changes_only = changes_only;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.parallel_threads = threads;
        self
    }

    pub fn with_queue_size(mut self, bound: usize) -> Self {
        self.processor_queue_size = bound;
        self
    }

    pub fn with_time_format(mut self, format: TimeFormat) -> Self {
        self.time_format = format;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_json_resolves_to_defaults() {
        let config = FetchConfig::from_json_str("{}").unwrap();
        assert_eq!(config.csv_columns, DEFAULT_COLUMNS.to_vec());
        assert_eq!(config.order_by, OrderByType::None);
        assert_eq!(config.output_prefix, "aggregate");
        assert!(config.threads() >= 1);
        assert_eq!(config.bound(), config.threads() * 2);
        assert_eq!(config.time_format.ert_precision, 7);
        assert_eq!(config.time_format.scet_precision, 3);
    }

    #[test]
    fn test_full_json_resolves_filters() {
        let json = r#"{
            "csv_columns": ["channel_id", "DN"],
            "order_by": "ERT",
            "channel_ids": ["a-0001"],
            "alarm_filter": "DN-RED",
            "module_filter": "PWR*",
            "time_range": {"basis": "sclk", "start": "10-0"},
            "parallel_threads": 3,
            "processor_queue_size": 5
        }"#;
        let config = FetchConfig::from_json_str(json).unwrap();
        assert_eq!(config.csv_columns, vec![CsvColumn::ChannelId, CsvColumn::Dn]);
        assert_eq!(config.order_by, OrderByType::Ert);
        assert!(config.channel_ids.as_ref().unwrap().contains("A-0001"));
        assert_eq!(config.module_filter.as_ref().unwrap().pattern(), "PWR");
        assert_eq!(config.time_range.unwrap().basis_name(), "SCLK");
        assert_eq!(config.threads(), 3);
        assert_eq!(config.bound(), 5);
    }

    #[test]
    fn test_rejects_unknown_column() {
        let err = FetchConfig::from_json_str(r#"{"csv_columns": ["FLUX"]}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn test_rejects_zero_threads_and_bound() {
        assert!(FetchConfig::from_json_str(r#"{"parallel_threads": 0}"#).is_err());
        assert!(FetchConfig::from_json_str(r#"{"processor_queue_size": 0}"#).is_err());
    }

    #[test]
    fn test_rejects_empty_channel_list() {
        let err = FetchConfig::from_json_str(r#"{"channel_ids": []}"#).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { field: "channel_ids", .. }));
    }

    #[test]
    fn test_rejects_bad_strip_regex() {
        let json = r#"{"module_filter": "X", "module_strip_regex": "("}"#;
        let err = FetchConfig::from_json_str(json).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidModuleRegex(_)));
    }

    #[test]
    fn test_rejects_changes_only_with_template() {
        let json = r#"{"changes_only": true, "template": "${channel_id}"}"#;
        assert!(FetchConfig::from_json_str(json).is_err());
    }

    #[test]
    fn test_load_toml_file() {
        let mut file = NamedTempFile::with_suffix(".toml").unwrap();
        writeln!(
            file,
            r#"
csv_columns = ["CHANNEL_ID", "ERT"]
order_by = "scet"
output_prefix = "run7"

[time_range]
basis = "ert"
start = "2024-001T00:00:00"
stop = "2024-002T00:00:00"
"#
        )
        .unwrap();
        let config = FetchConfig::load(file.path()).unwrap();
        assert_eq!(config.order_by, OrderByType::Scet);
        assert_eq!(config.output_prefix, "run7");
        assert_eq!(config.time_range.unwrap().basis(), TimeBasis::Ert);
    }

    #[test]
    fn test_load_rejects_unknown_extension() {
        let file = NamedTempFile::with_suffix(".yaml").unwrap();
        let err = FetchConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat(_)));
    }

    #[test]
    fn test_load_missing_file_reports_path() {
        let err = FetchConfig::load(Path::new("/nonexistent/fetch.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/fetch.json"));
    }
}
