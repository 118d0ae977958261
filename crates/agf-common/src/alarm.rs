//! Alarm levels and per-sample alarm indications.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Alarm severity. Ordering is the severity ordinal; `None` is the baseline.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlarmLevel {
    #[default]
    None,
    Yellow,
    Red,
}

impl AlarmLevel {
    pub fn code(self) -> u8 {
        match self {
            AlarmLevel::None => 0,
            AlarmLevel::Yellow => 1,
            AlarmLevel::Red => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(AlarmLevel::None),
            1 => Some(AlarmLevel::Yellow),
            2 => Some(AlarmLevel::Red),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            AlarmLevel::None => "NONE",
            AlarmLevel::Yellow => "YELLOW",
            AlarmLevel::Red => "RED",
        }
    }
}

impl fmt::Display for AlarmLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One alarm indication attached to a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmValue {
    pub level: AlarmLevel,
    pub in_alarm: bool,
    /// True when the alarm was evaluated on the EU rather than the DN.
    pub on_eu: bool,
}

/// Worst `(dn, eu)` levels across an alarm set.
///
/// An indication counts toward the EU level only when it is in alarm on the
/// EU. Every other indication counts toward the DN level.
pub fn worst_levels(alarms: &[AlarmValue]) -> (AlarmLevel, AlarmLevel) {
    let mut worst_dn = AlarmLevel::None;
    let mut worst_eu = AlarmLevel::None;
    for alarm in alarms {
        let slot = if alarm.in_alarm && alarm.on_eu {
            &mut worst_eu
        } else {
            &mut worst_dn
        };
        if alarm.level > *slot {
            *slot = alarm.level;
        }
    }
    (worst_dn, worst_eu)
}
