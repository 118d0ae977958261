//! Record rendering: CSV lines, printf-style numbers and templates.

pub mod csv;
pub mod sprintf;
pub mod template;

pub use csv::{csv_field, header_line, parse_csv_line, to_csv_line};
pub use sprintf::{FormatSpec, NumberFormatter};
pub use template::{NullTool, PlaceholderTemplate, RecordTemplate, TemplateContext, TemplateError};
