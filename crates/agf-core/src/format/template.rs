//! Record templates.
//!
//! [`PlaceholderTemplate`] substitutes `${field}` and `${field:%fmt}`. Field
//! names are CSV column names in any case, plus `dn_format`, `eu_format`,
//! `body` and the fetch's template globals.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use agf_common::TimeFormat;
use agf_config::CsvColumn;
use regex::Regex;
use thiserror::Error;

use crate::format::sprintf::{FormatSpec, NumberFormatter};
use crate::record::{ChannelSampleRecord, FieldValue};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("template syntax error: {0}")]
    Syntax(String),

    #[error("unknown template field: {0}")]
    UnknownField(String),

    #[error("bad format '{spec}': {reason}")]
    BadFormat { spec: String, reason: String },

    #[error("format '{spec}' cannot render value '{value}'")]
    TypeMismatch { spec: String, value: String },
}

/// Renders absent values as empty strings.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullTool;

impl NullTool {
    pub fn is_null(&self, value: &FieldValue) -> bool {
        value.is_absent()
    }

    pub fn safe(&self, value: &FieldValue) -> String {
        if self.is_null(value) {
            String::new()
        } else {
            value.display()
        }
    }
}

/// Everything a template can see while rendering one record.
#[derive(Debug, Clone, Copy)]
pub struct TemplateContext<'a> {
    pub globals: &'a BTreeMap<String, String>,
    pub record: &'a ChannelSampleRecord,
    pub formatter: &'a NumberFormatter,
    pub null_tool: NullTool,
    pub time_format: &'a TimeFormat,
    /// Rendering a body row rather than a header or trailer.
    pub body: bool,
}

impl<'a> TemplateContext<'a> {
    pub fn new(
        globals: &'a BTreeMap<String, String>,
        record: &'a ChannelSampleRecord,
        formatter: &'a NumberFormatter,
        time_format: &'a TimeFormat,
    ) -> Self {
        Self {
            globals,
            record,
            formatter,
            null_tool: NullTool,
            time_format,
            body: true,
        }
    }

    /// Resolve a field name; record fields shadow globals.
    pub fn lookup(&self, name: &str) -> Option<FieldValue> {
        if let Some(column) = CsvColumn::parse(name) {
            return Some(self.record.value_of(column, self.time_format));
        }
        match name.to_ascii_lowercase().as_str() {
            "dn_format" | "dnformat" => {
                return Some(text_or_absent(self.record.dn_format.as_deref()))
            }
            "eu_format" | "euformat" => {
                return Some(text_or_absent(self.record.eu_format.as_deref()))
            }
            "body" => return Some(FieldValue::Bool(self.body)),
            _ => {}
        }
        self.globals
            .get(name)
            .map(|v| FieldValue::Text(v.clone()))
    }
}

fn text_or_absent(value: Option<&str>) -> FieldValue {
    value.map_or(FieldValue::Absent, |v| FieldValue::Text(v.to_string()))
}

/// A compiled output template.
pub trait RecordTemplate: Send + Sync {
    fn render(&self, ctx: &TemplateContext<'_>) -> Result<String, TemplateError>;
}

#[derive(Debug, Clone)]
enum Segment {
    Literal(String),
    Field {
        name: String,
        format: Option<(String, FormatSpec)>,
    },
}

/// `${field}` / `${field:%fmt}` substitution template.
#[derive(Debug, Clone)]
pub struct PlaceholderTemplate {
    segments: Vec<Segment>,
}

fn placeholder_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::(%[^}]*))?\}")
            .expect("placeholder regex is valid")
    })
}

impl PlaceholderTemplate {
    pub fn compile(source: &str) -> Result<Self, TemplateError> {
        let mut segments = Vec::new();
        let mut last = 0;
        for caps in placeholder_regex().captures_iter(source) {
            let Some(whole) = caps.get(0) else { continue };
            push_literal(&mut segments, &source[last..whole.start()])?;
            let name = caps[1].to_string();
            let format = match caps.get(2) {
                Some(spec) => {
                    let raw = spec.as_str().to_string();
                    let parsed = FormatSpec::parse(&raw)?;
                    Some((raw, parsed))
                }
                None => None,
            };
            segments.push(Segment::Field { name, format });
            last = whole.end();
        }
        push_literal(&mut segments, &source[last..])?;
        Ok(Self { segments })
    }
}

fn push_literal(segments: &mut Vec<Segment>, text: &str) -> Result<(), TemplateError> {
    if let Some(pos) = text.find("${") {
        let snippet: String = text[pos..].chars().take(24).collect();
        return Err(TemplateError::Syntax(format!(
            "malformed placeholder near '{}'",
            snippet
        )));
    }
    if !text.is_empty() {
        segments.push(Segment::Literal(text.to_string()));
    }
    Ok(())
}

impl RecordTemplate for PlaceholderTemplate {
    fn render(&self, ctx: &TemplateContext<'_>) -> Result<String, TemplateError> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Field { name, format } => {
                    let value = ctx
                        .lookup(name)
                        .ok_or_else(|| TemplateError::UnknownField(name.clone()))?;
                    match format {
                        Some((raw, spec)) if !ctx.null_tool.is_null(&value) => {
                            out.push_str(&ctx.formatter.format_with(spec, raw, &value)?)
                        }
                        _ => out.push_str(&ctx.null_tool.safe(&value)),
                    }
                }
            }
        }
        Ok(out)
    }
}
