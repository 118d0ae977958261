//! printf-style numeric formatting for template placeholders.
//!
//! Supports `%[-0+][width][.precision]conv` with conversions
//! `d i u x X o f e E g s`.

use crate::format::TemplateError;
use crate::record::FieldValue;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Conversion {
    Signed,
    Unsigned,
    HexLower,
    HexUpper,
    Octal,
    Fixed,
    ExpLower,
    ExpUpper,
    General,
    Str,
}

/// A parsed conversion specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatSpec {
    left_align: bool,
    zero_pad: bool,
    plus_sign: bool,
    width: usize,
    precision: Option<usize>,
    conversion: Conversion,
}

impl FormatSpec {
    pub fn parse(spec: &str) -> Result<Self, TemplateError> {
        let bad = |reason: &str| TemplateError::BadFormat {
            spec: spec.to_string(),
            reason: reason.to_string(),
        };
        let body = spec.strip_prefix('%').ok_or_else(|| bad("must start with '%'"))?;
        let mut chars = body.chars().peekable();

        let mut parsed = FormatSpec {
            left_align: false,
            zero_pad: false,
            plus_sign: false,
            width: 0,
            precision: None,
            conversion: Conversion::Str,
        };

        while let Some(&c) = chars.peek() {
            match c {
                '-' => parsed.left_align = true,
                '0' => parsed.zero_pad = true,
                '+' => parsed.plus_sign = true,
                _ => break,
            }
            chars.next();
        }

        let mut width = String::new();
        while let Some(c) = chars.next_if(|c| c.is_ascii_digit()) {
            width.push(c);
        }
        if !width.is_empty() {
            parsed.width = width.parse().map_err(|_| bad("width out of range"))?;
        }

        if chars.next_if_eq(&'.').is_some() {
            let mut precision = String::new();
            while let Some(c) = chars.next_if(|c| c.is_ascii_digit()) {
                precision.push(c);
            }
            parsed.precision = Some(if precision.is_empty() {
                0
            } else {
                precision.parse().map_err(|_| bad("precision out of range"))?
            });
        }

        parsed.conversion = match chars.next() {
            Some('d') | Some('i') => Conversion::Signed,
            Some('u') => Conversion::Unsigned,
            Some('x') => Conversion::HexLower,
            Some('X') => Conversion::HexUpper,
            Some('o') => Conversion::Octal,
            Some('f') => Conversion::Fixed,
            Some('e') => Conversion::ExpLower,
            Some('E') => Conversion::ExpUpper,
            Some('g') => Conversion::General,
            Some('s') => Conversion::Str,
            Some(other) => return Err(bad(&format!("unsupported conversion '{}'", other))),
            None => return Err(bad("missing conversion character")),
        };
        if chars.next().is_some() {
            return Err(bad("trailing characters after conversion"));
        }
        Ok(parsed)
    }

    fn is_numeric(&self) -> bool {
        self.conversion != Conversion::Str
    }
}

/// Formats field values with C printf conventions.
#[derive(Debug, Default, Clone, Copy)]
pub struct NumberFormatter;

impl NumberFormatter {
    pub fn new() -> Self {
        Self
    }

    /// Format `value` according to `spec`, e.g. `"%08.3f"`.
    pub fn format(&self, spec: &str, value: &FieldValue) -> Result<String, TemplateError> {
        let parsed = FormatSpec::parse(spec)?;
        self.format_with(&parsed, spec, value)
    }

    pub fn format_with(
        &self,
        spec: &FormatSpec,
        raw_spec: &str,
        value: &FieldValue,
    ) -> Result<String, TemplateError> {
        let mismatch = || TemplateError::TypeMismatch {
            spec: raw_spec.to_string(),
            value: value.display(),
        };

        let body = match spec.conversion {
            Conversion::Str => {
                let mut text = value.display();
                if let Some(p) = spec.precision {
                    text = text.chars().take(p).collect();
                }
                text
            }
            Conversion::Signed => {
                let v = as_i128(value).ok_or_else(mismatch)?;
                with_sign(v < 0, spec.plus_sign, v.unsigned_abs().to_string())
            }
            Conversion::Unsigned => as_u64(value).ok_or_else(mismatch)?.to_string(),
            Conversion::HexLower => format!("{:x}", as_u64(value).ok_or_else(mismatch)?),
            Conversion::HexUpper => format!("{:X}", as_u64(value).ok_or_else(mismatch)?),
            Conversion::Octal => format!("{:o}", as_u64(value).ok_or_else(mismatch)?),
            Conversion::Fixed | Conversion::ExpLower | Conversion::ExpUpper | Conversion::General => {
                let v = as_f64(value).ok_or_else(mismatch)?;
                let precision = spec.precision.unwrap_or(6);
                let digits = match spec.conversion {
                    Conversion::Fixed => format!("{:.*}", precision, v.abs()),
                    Conversion::ExpLower => c_exponent(v.abs(), precision, false),
                    Conversion::ExpUpper => c_exponent(v.abs(), precision, true),
                    _ => c_general(v.abs(), precision),
                };
                with_sign(v.is_sign_negative() && v != 0.0, spec.plus_sign, digits)
            }
        };

        Ok(pad(spec, body))
    }
}

fn with_sign(negative: bool, plus: bool, digits: String) -> String {
    if negative {
        format!("-{}", digits)
    } else if plus {
        format!("+{}", digits)
    } else {
        digits
    }
}

fn pad(spec: &FormatSpec, body: String) -> String {
    let len = body.chars().count();
    if len >= spec.width {
        return body;
    }
    let fill = spec.width - len;
    if spec.left_align {
        return format!("{}{}", body, " ".repeat(fill));
    }
    if spec.zero_pad && spec.is_numeric() && body.chars().all(|c| c != 'n' && c != 'N') {
        let (sign, digits) = match body.chars().next() {
            Some(c @ ('-' | '+')) => (c.to_string(), &body[1..]),
            _ => (String::new(), body.as_str()),
        };
        return format!("{}{}{}", sign, "0".repeat(fill), digits);
    }
    format!("{}{}", " ".repeat(fill), body)
}

/// `1.500000e+02` style exponent notation.
fn c_exponent(v: f64, precision: usize, upper: bool) -> String {
    let rust = format!("{:.*e}", precision, v);
    let (mantissa, exponent) = rust.split_once('e').unwrap_or((rust.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let sign = if exponent < 0 { '-' } else { '+' };
    let e = if upper { 'E' } else { 'e' };
    format!("{}{}{}{:02}", mantissa, e, sign, exponent.abs())
}

/// `%g`: shortest of fixed or exponent form, trailing zeros removed.
fn c_general(v: f64, precision: usize) -> String {
    if !v.is_finite() {
        return v.to_string();
    }
    let p = precision.max(1);
    let exponent = if v == 0.0 {
        0
    } else {
        v.log10().floor() as i64
    };
    if exponent < -4 || exponent >= p as i64 {
        let formatted = c_exponent(v, p - 1, false);
        match formatted.split_once('e') {
            Some((mantissa, exp)) => format!("{}e{}", trim_fraction(mantissa), exp),
            None => formatted,
        }
    } else {
        let decimals = (p as i64 - 1 - exponent).max(0) as usize;
        trim_fraction(&format!("{:.*}", decimals, v)).to_string()
    }
}

fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}

fn as_i128(value: &FieldValue) -> Option<i128> {
    match value {
        FieldValue::Int(v) => Some(i128::from(*v)),
        FieldValue::UInt(v) => Some(i128::from(*v)),
        FieldValue::Float(v) if v.is_finite() => Some(v.trunc() as i128),
        FieldValue::Bool(v) => Some(i128::from(*v)),
        FieldValue::Text(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_u64(value: &FieldValue) -> Option<u64> {
    match value {
        FieldValue::Int(v) => Some(*v as u64),
        FieldValue::UInt(v) => Some(*v),
        FieldValue::Float(v) if v.is_finite() => Some(v.trunc() as i64 as u64),
        FieldValue::Bool(v) => Some(u64::from(*v)),
        FieldValue::Text(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_f64(value: &FieldValue) -> Option<f64> {
    match value {
        FieldValue::Int(v) => Some(*v as f64),
        FieldValue::UInt(v) => Some(*v as f64),
        FieldValue::Float(v) => Some(*v),
        FieldValue::Bool(v) => Some(f64::from(u8::from(*v))),
        FieldValue::Text(s) => s.trim().parse().ok(),
        FieldValue::Absent => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fmt(spec: &str, value: FieldValue) -> String {
        NumberFormatter::new().format(spec, &value).unwrap()
    }

    #[test]
    fn test_integers() {
        assert_eq!(fmt("%d", FieldValue::Int(-5)), "-5");
        assert_eq!(fmt("%5d", FieldValue::Int(42)), "   42");
        assert_eq!(fmt("%-5d", FieldValue::Int(42)), "42   ");
        assert_eq!(fmt("%05d", FieldValue::Int(-42)), "-0042");
        assert_eq!(fmt("%+d", FieldValue::UInt(7)), "+7");
        assert_eq!(fmt("%x", FieldValue::UInt(255)), "ff");
        assert_eq!(fmt("%04X", FieldValue::UInt(255)), "00FF");
        assert_eq!(fmt("%o", FieldValue::UInt(8)), "10");
        assert_eq!(fmt("%u", FieldValue::Int(3)), "3");
    }

    #[test]
    fn test_floats() {
        assert_eq!(fmt("%.2f", FieldValue::Float(3.14159)), "3.14");
        assert_eq!(fmt("%8.3f", FieldValue::Float(-1.5)), "  -1.500");
        assert_eq!(fmt("%f", FieldValue::Int(2)), "2.000000");
        assert_eq!(fmt("%e", FieldValue::Float(150.0)), "1.500000e+02");
        assert_eq!(fmt("%.1E", FieldValue::Float(0.00123)), "1.2E-03");
        assert_eq!(fmt("%g", FieldValue::Float(0.5)), "0.5");
        assert_eq!(fmt("%g", FieldValue::Float(1234567.0)), "1.23457e+06");
        assert_eq!(fmt("%g", FieldValue::Float(250.0)), "250");
    }

    #[test]
    fn test_strings() {
        assert_eq!(fmt("%s", FieldValue::Text("PWR".into())), "PWR");
        assert_eq!(fmt("%-6s", FieldValue::Text("PWR".into())), "PWR   ");
        assert_eq!(fmt("%.2s", FieldValue::Text("PWR".into())), "PW");
        assert_eq!(fmt("%s", FieldValue::Bool(true)), "true");
    }

    #[test]
    fn test_rejects_bad_specs() {
        let f = NumberFormatter::new();
        assert!(f.format("d", &FieldValue::Int(1)).is_err());
        assert!(f.format("%q", &FieldValue::Int(1)).is_err());
        assert!(f.format("%", &FieldValue::Int(1)).is_err());
        assert!(matches!(
            f.format("%d", &FieldValue::Text("abc".into())),
            Err(TemplateError::TypeMismatch { .. })
        ));
    }
}
