//! CSV rendering of channel sample records.

use agf_common::TimeFormat;
use agf_config::{csv_header, CsvColumn, FetchConfig};

use crate::record::{ChannelSampleRecord, FieldValue};

/// Render one field: text quoted with embedded quotes doubled, numbers and
/// booleans bare, absent values empty.
pub fn csv_field(value: &FieldValue) -> String {
    match value {
        FieldValue::Text(s) => format!("\"{}\"", s.replace('"', "\"\"")),
        other => other.display(),
    }
}

/// Render `record` as one CSV line over `columns`.
pub fn to_csv_line(
    record: &ChannelSampleRecord,
    columns: &[CsvColumn],
    time_format: &TimeFormat,
) -> String {
    let mut line = String::with_capacity(columns.len() * 12);
    for (i, column) in columns.iter().enumerate() {
        if i > 0 {
            line.push(',');
        }
        line.push_str(&csv_field(&record.value_of(*column, time_format)));
    }
    line
}

/// Column header row for a fetch, when headers are enabled and records are
/// rendered as CSV.
pub fn header_line(config: &FetchConfig) -> Option<String> {
    (config.show_column_headers && config.template.is_none())
        .then(|| csv_header(&config.csv_columns))
}

/// Split a CSV line into unquoted fields.
///
/// Commas inside quotes do not split and `""` inside quotes is a literal
/// quote. A malformed trailing quote is tolerated.
pub fn parse_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match (c, in_quotes) {
            ('"', true) => {
                if chars.next_if_eq(&'"').is_some() {
                    current.push('"');
                } else {
                    in_quotes = false;
                }
            }
            ('"', false) => in_quotes = true,
            (',', false) => fields.push(std::mem::take(&mut current)),
            (c, _) => current.push(c),
        }
    }
    fields.push(current);
    fields
}
