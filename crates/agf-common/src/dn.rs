//! Channel DN (data number) values.
//!
//! A stored sample carries its DN as a [`RawDn`]: a channel type code, a bit
//! width and the little-endian payload bytes. [`DnValue::decode`] resolves it
//! into a typed value with one case per type and width; anything else is a
//! hard error.
//!
//! 24-bit values occupy three payload bytes and are held in the next larger
//! integer type. Unsigned, digital and time channels always display as
//! unsigned decimal text.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{Error, Result};

/// Declared channel data type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChannelType {
    Ascii,
    Boolean,
    SignedInt,
    UnsignedInt,
    Digital,
    Time,
    Float,
    Status,
}

impl ChannelType {
    /// Wire code for this type.
    pub fn code(self) -> u8 {
        match self {
            ChannelType::Ascii => 1,
            ChannelType::Boolean => 2,
            ChannelType::SignedInt => 3,
            ChannelType::UnsignedInt => 4,
            ChannelType::Digital => 5,
            ChannelType::Time => 6,
            ChannelType::Float => 7,
            ChannelType::Status => 8,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(ChannelType::Ascii),
            2 => Some(ChannelType::Boolean),
            3 => Some(ChannelType::SignedInt),
            4 => Some(ChannelType::UnsignedInt),
            5 => Some(ChannelType::Digital),
            6 => Some(ChannelType::Time),
            7 => Some(ChannelType::Float),
            8 => Some(ChannelType::Status),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ChannelType::Ascii => "ASCII",
            ChannelType::Boolean => "BOOLEAN",
            ChannelType::SignedInt => "SIGNED_INT",
            ChannelType::UnsignedInt => "UNSIGNED_INT",
            ChannelType::Digital => "DIGITAL",
            ChannelType::Time => "TIME",
            ChannelType::Float => "FLOAT",
            ChannelType::Status => "STATUS",
        }
    }
}

impl fmt::Display for ChannelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// DN as stored: type code, width in bits, little-endian payload.
///
/// ASCII payloads are UTF-8 bytes and carry width 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDn {
    pub type_code: u8,
    pub width: u8,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolDn {
    B8(bool),
    B16(bool),
    B32(bool),
    B64(bool),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignedDn {
    I8(i8),
    I16(i16),
    /// 24-bit two's complement held in an `i32`.
    I24(i32),
    I32(i32),
    I64(i64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsignedDn {
    U8(u8),
    U16(u16),
    /// 24-bit unsigned held in a `u32`.
    U24(u32),
    U32(u32),
    U64(u64),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FloatDn {
    F32(f32),
    F64(f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusDn {
    S8(i8),
    S16(i16),
    S32(i32),
    S64(i64),
}

/// Channel types that share the unsigned representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnsignedKind {
    UnsignedInt,
    Digital,
    Time,
}

impl UnsignedKind {
    fn channel_type(self) -> ChannelType {
        match self {
            UnsignedKind::UnsignedInt => ChannelType::UnsignedInt,
            UnsignedKind::Digital => ChannelType::Digital,
            UnsignedKind::Time => ChannelType::Time,
        }
    }
}

pub const I24_MIN: i32 = -(1 << 23);
pub const I24_MAX: i32 = (1 << 23) - 1;
pub const U24_MAX: u32 = (1 << 24) - 1;

impl SignedDn {
    /// Checked 24-bit constructor.
    pub fn i24(value: i32) -> Result<Self> {
        if !(I24_MIN..=I24_MAX).contains(&value) {
            return Err(Error::OutOfRange {
                kind: "24-bit signed DN",
                value: i128::from(value),
            });
        }
        Ok(SignedDn::I24(value))
    }

    pub fn as_i64(self) -> i64 {
        match self {
            SignedDn::I8(v) => i64::from(v),
            SignedDn::I16(v) => i64::from(v),
            SignedDn::I24(v) | SignedDn::I32(v) => i64::from(v),
            SignedDn::I64(v) => v,
        }
    }
}

impl UnsignedDn {
    /// Checked 24-bit constructor.
    pub fn u24(value: u32) -> Result<Self> {
        if value > U24_MAX {
            return Err(Error::OutOfRange {
                kind: "24-bit unsigned DN",
                value: i128::from(value),
            });
        }
        Ok(UnsignedDn::U24(value))
    }

    pub fn as_u64(self) -> u64 {
        match self {
            UnsignedDn::U8(v) => u64::from(v),
            UnsignedDn::U16(v) => u64::from(v),
            UnsignedDn::U24(v) | UnsignedDn::U32(v) => u64::from(v),
            UnsignedDn::U64(v) => v,
        }
    }
}

impl StatusDn {
    pub fn as_i64(self) -> i64 {
        match self {
            StatusDn::S8(v) => i64::from(v),
            StatusDn::S16(v) => i64::from(v),
            StatusDn::S32(v) => i64::from(v),
            StatusDn::S64(v) => v,
        }
    }
}

impl BoolDn {
    pub fn value(self) -> bool {
        match self {
            BoolDn::B8(v) | BoolDn::B16(v) | BoolDn::B32(v) | BoolDn::B64(v) => v,
        }
    }
}

impl FloatDn {
    /// Value widened to `f64`; 32-bit values keep their binary value.
    pub fn as_f64(self) -> f64 {
        match self {
            FloatDn::F32(v) => f64::from(v),
            FloatDn::F64(v) => v,
        }
    }
}

/// Typed DN value.
#[derive(Debug, Clone, PartialEq)]
pub enum DnValue {
    Ascii(String),
    Boolean(BoolDn),
    SignedInt(SignedDn),
    Unsigned(UnsignedKind, UnsignedDn),
    Float(FloatDn),
    Status(StatusDn),
}

impl DnValue {
    pub fn channel_type(&self) -> ChannelType {
        match self {
            DnValue::Ascii(_) => ChannelType::Ascii,
            DnValue::Boolean(_) => ChannelType::Boolean,
            DnValue::SignedInt(_) => ChannelType::SignedInt,
            DnValue::Unsigned(kind, _) => kind.channel_type(),
            DnValue::Float(_) => ChannelType::Float,
            DnValue::Status(_) => ChannelType::Status,
        }
    }

    /// Width in bits; 0 for ASCII.
    pub fn width(&self) -> u8 {
        match self {
            DnValue::Ascii(_) => 0,
            DnValue::Boolean(b) => match b {
                BoolDn::B8(_) => 8,
                BoolDn::B16(_) => 16,
                BoolDn::B32(_) => 32,
                BoolDn::B64(_) => 64,
            },
            DnValue::SignedInt(s) => match s {
                SignedDn::I8(_) => 8,
                SignedDn::I16(_) => 16,
                SignedDn::I24(_) => 24,
                SignedDn::I32(_) => 32,
                SignedDn::I64(_) => 64,
            },
            DnValue::Unsigned(_, u) => match u {
                UnsignedDn::U8(_) => 8,
                UnsignedDn::U16(_) => 16,
                UnsignedDn::U24(_) => 24,
                UnsignedDn::U32(_) => 32,
                UnsignedDn::U64(_) => 64,
            },
            DnValue::Float(f) => match f {
                FloatDn::F32(_) => 32,
                FloatDn::F64(_) => 64,
            },
            DnValue::Status(s) => match s {
                StatusDn::S8(_) => 8,
                StatusDn::S16(_) => 16,
                StatusDn::S32(_) => 32,
                StatusDn::S64(_) => 64,
            },
        }
    }

    /// True when the value renders as text rather than a number.
    pub fn is_text(&self) -> bool {
        matches!(self, DnValue::Ascii(_))
    }

    /// Display text of the value.
    pub fn display(&self) -> String {
        match self {
            DnValue::Ascii(s) => s.clone(),
            DnValue::Boolean(b) => u8::from(b.value()).to_string(),
            DnValue::SignedInt(s) => s.as_i64().to_string(),
            DnValue::Unsigned(_, u) => u.as_u64().to_string(),
            DnValue::Float(f) => f.as_f64().to_string(),
            DnValue::Status(s) => s.as_i64().to_string(),
        }
    }

    /// Resolve a stored DN into a typed value.
    pub fn decode(raw: &RawDn) -> Result<Self> {
        let unsupported = || Error::UnsupportedDn {
            type_code: raw.type_code,
            width: raw.width,
        };
        let channel_type = ChannelType::from_code(raw.type_code).ok_or_else(unsupported)?;

        if channel_type == ChannelType::Ascii {
            let text = String::from_utf8(raw.payload.clone())
                .map_err(|e| Error::MalformedDn(format!("ASCII DN is not UTF-8: {}", e)))?;
            return Ok(DnValue::Ascii(text));
        }

        let expected_len = match raw.width {
            8 | 16 | 24 | 32 | 64 => usize::from(raw.width / 8),
            _ => return Err(unsupported()),
        };
        if raw.payload.len() != expected_len {
            return Err(Error::MalformedDn(format!(
                "{} DN of width {} needs {} bytes, got {}",
                channel_type,
                raw.width,
                expected_len,
                raw.payload.len()
            )));
        }
        let p = raw.payload.as_slice();

        let value = match (channel_type, raw.width) {
            (ChannelType::Boolean, 8) => DnValue::Boolean(BoolDn::B8(read_u64(p) != 0)),
            (ChannelType::Boolean, 16) => DnValue::Boolean(BoolDn::B16(read_u64(p) != 0)),
            (ChannelType::Boolean, 32) => DnValue::Boolean(BoolDn::B32(read_u64(p) != 0)),
            (ChannelType::Boolean, 64) => DnValue::Boolean(BoolDn::B64(read_u64(p) != 0)),

            (ChannelType::SignedInt, 8) => DnValue::SignedInt(SignedDn::I8(p[0] as i8)),
            (ChannelType::SignedInt, 16) => {
                DnValue::SignedInt(SignedDn::I16(i16::from_le_bytes([p[0], p[1]])))
            }
            (ChannelType::SignedInt, 24) => DnValue::SignedInt(SignedDn::I24(read_i24(p))),
            (ChannelType::SignedInt, 32) => {
                DnValue::SignedInt(SignedDn::I32(i32::from_le_bytes([p[0], p[1], p[2], p[3]])))
            }
            (ChannelType::SignedInt, 64) => DnValue::SignedInt(SignedDn::I64(read_u64(p) as i64)),

            (ChannelType::UnsignedInt | ChannelType::Digital | ChannelType::Time, width) => {
                let kind = match channel_type {
                    ChannelType::Digital => UnsignedKind::Digital,
                    ChannelType::Time => UnsignedKind::Time,
                    _ => UnsignedKind::UnsignedInt,
                };
                let raw_value = read_u64(p);
                let value = match width {
                    8 => UnsignedDn::U8(raw_value as u8),
                    16 => UnsignedDn::U16(raw_value as u16),
                    24 => UnsignedDn::U24(raw_value as u32),
                    32 => UnsignedDn::U32(raw_value as u32),
                    _ => UnsignedDn::U64(raw_value),
                };
                DnValue::Unsigned(kind, value)
            }

            (ChannelType::Float, 32) => {
                DnValue::Float(FloatDn::F32(f32::from_le_bytes([p[0], p[1], p[2], p[3]])))
            }
            (ChannelType::Float, 64) => DnValue::Float(FloatDn::F64(f64::from_bits(read_u64(p)))),

            (ChannelType::Status, 8) => DnValue::Status(StatusDn::S8(p[0] as i8)),
            (ChannelType::Status, 16) => {
                DnValue::Status(StatusDn::S16(i16::from_le_bytes([p[0], p[1]])))
            }
            (ChannelType::Status, 32) => {
                DnValue::Status(StatusDn::S32(i32::from_le_bytes([p[0], p[1], p[2], p[3]])))
            }
            (ChannelType::Status, 64) => DnValue::Status(StatusDn::S64(read_u64(p) as i64)),

            _ => return Err(unsupported()),
        };
        Ok(value)
    }

    /// Encode into the stored form.
    pub fn encode(&self) -> RawDn {
        let type_code = self.channel_type().code();
        let width = self.width();
        let payload = match self {
            DnValue::Ascii(s) => s.as_bytes().to_vec(),
            DnValue::Boolean(b) => {
                let bytes = u64::from(b.value()).to_le_bytes();
                bytes[..usize::from(width / 8)].to_vec()
            }
            DnValue::SignedInt(s) => {
                let bytes = s.as_i64().to_le_bytes();
                bytes[..usize::from(width / 8)].to_vec()
            }
            DnValue::Unsigned(_, u) => {
                let bytes = u.as_u64().to_le_bytes();
                bytes[..usize::from(width / 8)].to_vec()
            }
            DnValue::Float(FloatDn::F32(v)) => v.to_le_bytes().to_vec(),
            DnValue::Float(FloatDn::F64(v)) => v.to_le_bytes().to_vec(),
            DnValue::Status(s) => {
                let bytes = s.as_i64().to_le_bytes();
                bytes[..usize::from(width / 8)].to_vec()
            }
        };
        RawDn {
            type_code,
            width,
            payload,
        }
    }
}

impl fmt::Display for DnValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display())
    }
}

/// Zero-extend up to eight little-endian bytes.
fn read_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    let n = bytes.len().min(8);
    buf[..n].copy_from_slice(&bytes[..n]);
    u64::from_le_bytes(buf)
}

/// Sign-extend three little-endian bytes.
fn read_i24(bytes: &[u8]) -> i32 {
    let sign = if bytes[2] & 0x80 != 0 { 0xFF } else { 0x00 };
    i32::from_le_bytes([bytes[0], bytes[1], bytes[2], sign])
}
