//! Post-hoc "changes only" filtering over the rendered, ordered stream.

use std::collections::HashMap;

use agf_config::{ConfigError, CsvColumn, FetchConfig};

use crate::error::Result;
use crate::format::parse_csv_line;

/// A filter applied to rendered output lines after batches are merged.
pub trait StreamFilter: Send {
    /// Whether `line` should be written.
    fn accept(&mut self, line: &str) -> bool;

    fn filter(&mut self, lines: Vec<String>) -> Vec<String> {
        lines.into_iter().filter(|line| self.accept(line)).collect()
    }
}

/// Drops a record whose value equals the last value seen for the same
/// `(channel id, type)` pair. State spans the whole stream.
#[derive(Debug, Clone)]
pub struct ChangesOnlyFilter {
    channel_pos: usize,
    value_pos: usize,
    type_pos: Option<usize>,
    expect_header: bool,
    header_seen: bool,
    last_values: HashMap<(String, String), String>,
}

impl ChangesOnlyFilter {
    /// Locate the channel id, DN and (optional) type columns in `columns`.
    ///
    /// With `expect_header` set, the first line not starting with `"` is
    /// passed through as the column header.
    pub fn new(columns: &[CsvColumn], expect_header: bool) -> Result<Self> {
        let position = |wanted: CsvColumn| columns.iter().position(|c| *c == wanted);
        let missing = |column: CsvColumn| ConfigError::InvalidValue {
            field: "csv_columns",
            reason: format!("changes-only output requires the {} column", column),
        };
        let channel_pos =
            position(CsvColumn::ChannelId).ok_or_else(|| missing(CsvColumn::ChannelId))?;
        let value_pos = position(CsvColumn::Dn).ok_or_else(|| missing(CsvColumn::Dn))?;
        Ok(Self::with_positions(
            channel_pos,
            value_pos,
            position(CsvColumn::Type),
            expect_header,
        ))
    }

    /// Filter for a fetch, or `None` when changes-only output is off.
    pub fn from_config(config: &FetchConfig) -> Result<Option<Self>> {
        if !config.changes_only {
            return Ok(None);
        }
        Self::new(&config.csv_columns, config.show_column_headers).map(Some)
    }

    /// Build from zero-based column positions.
    pub fn with_positions(
        channel_pos: usize,
        value_pos: usize,
        type_pos: Option<usize>,
        expect_header: bool,
    ) -> Self {
        Self {
            channel_pos,
            value_pos,
            type_pos,
            expect_header,
            header_seen: false,
            last_values: HashMap::new(),
        }
    }

    /// Number of distinct channels tracked so far.
    pub fn tracked_channels(&self) -> usize {
        self.last_values.len()
    }
}

fn column(fields: &[String], pos: usize) -> String {
    match fields.get(pos).map(String::as_str) {
        None | Some("null") => String::new(),
        Some(value) => value.to_string(),
    }
}

impl StreamFilter for ChangesOnlyFilter {
    fn accept(&mut self, line: &str) -> bool {
        if self.expect_header && !self.header_seen && !line.starts_with('"') {
            self.header_seen = true;
            return true;
        }

        let fields = parse_csv_line(line);
        let channel_id = column(&fields, self.channel_pos);
        let channel_type = self
            .type_pos
            .map(|pos| column(&fields, pos))
            .unwrap_or_default();
        let value = column(&fields, self.value_pos);

        let key = (channel_id, channel_type);
        match self.last_values.get(&key) {
            Some(last) if *last == value => false,
            _ => {
                self.last_values.insert(key, value);
                true
            }
        }
    }
}
