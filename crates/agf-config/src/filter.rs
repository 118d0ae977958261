//! Member filters bound into every batch processor.

use std::collections::BTreeSet;

use agf_common::{AccurateTime, AlarmLevel, Sclk};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ── Channel ids ─────────────────────────────────────────────────────────

/// Allow-list of channel ids, compared upper-case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelIdFilter {
    ids: BTreeSet<String>,
}

impl ChannelIdFilter {
    pub fn new<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            ids: ids
                .into_iter()
                .map(|id| id.as_ref().trim().to_uppercase())
                .filter(|id| !id.is_empty())
                .collect(),
        }
    }

    pub fn ids(&self) -> &BTreeSet<String> {
        &self.ids
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn contains(&self, channel_id: &str) -> bool {
        self.ids.contains(&channel_id.to_uppercase())
    }

    /// True when any id of a group's channel-id superset is allowed.
    pub fn matches_superset<'a, I>(&self, superset: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        superset.into_iter().any(|id| self.contains(id))
    }
}

// ── Module ──────────────────────────────────────────────────────────────

/// Literal substring match on the module name.
///
/// Wildcard characters matched by the strip regex are removed from the
/// pattern first, so `"PWR*"` matches any module containing `"PWR"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleFilter {
    pattern: String,
}

impl ModuleFilter {
    pub fn new(raw: &str, strip_regex: &str) -> Result<Self, ConfigError> {
        let strip = Regex::new(strip_regex)?;
        Ok(Self {
            pattern: strip.replace_all(raw.trim(), "").into_owned(),
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// A missing module is matched as the empty string.
    pub fn matches(&self, module: Option<&str>) -> bool {
        module.unwrap_or("").contains(self.pattern.as_str())
    }
}

// ── Alarms ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmDomain {
    Any,
    Dn,
    Eu,
}

/// Minimum alarm level required in one domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlarmRule {
    pub domain: AlarmDomain,
    pub min_level: AlarmLevel,
}

impl AlarmRule {
    fn parse(token: &str) -> Result<Self, ConfigError> {
        let upper = token.trim().to_uppercase();
        let (domain, level) = match upper.split_once('-') {
            Some((domain, level)) => (domain, Some(level)),
            None => (upper.as_str(), None),
        };
        let (domain, level) = match (domain, level) {
            ("ANY", None) => (AlarmDomain::Any, AlarmLevel::Yellow),
            ("RED", None) => (AlarmDomain::Any, AlarmLevel::Red),
            ("YELLOW", None) => (AlarmDomain::Any, AlarmLevel::Yellow),
            ("DN", None) => (AlarmDomain::Dn, AlarmLevel::Yellow),
            ("EU", None) => (AlarmDomain::Eu, AlarmLevel::Yellow),
            ("DN", Some("RED")) => (AlarmDomain::Dn, AlarmLevel::Red),
            ("DN", Some("YELLOW")) => (AlarmDomain::Dn, AlarmLevel::Yellow),
            ("EU", Some("RED")) => (AlarmDomain::Eu, AlarmLevel::Red),
            ("EU", Some("YELLOW")) => (AlarmDomain::Eu, AlarmLevel::Yellow),
            _ => return Err(ConfigError::InvalidAlarmFilter(token.to_string())),
        };
        Ok(Self {
            domain,
            min_level: level,
        })
    }

    pub fn matches(&self, dn: AlarmLevel, eu: AlarmLevel) -> bool {
        match self.domain {
            AlarmDomain::Any => dn >= self.min_level || eu >= self.min_level,
            AlarmDomain::Dn => dn >= self.min_level,
            AlarmDomain::Eu => eu >= self.min_level,
        }
    }
}

/// Any-match set of alarm rules, e.g. `"DN-RED,EU-YELLOW"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmFilter {
    rules: Vec<AlarmRule>,
}

impl AlarmFilter {
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let rules = text
            .split(',')
            .filter(|t| !t.trim().is_empty())
            .map(AlarmRule::parse)
            .collect::<Result<Vec<_>, _>>()?;
        if rules.is_empty() {
            return Err(ConfigError::InvalidAlarmFilter(text.to_string()));
        }
        Ok(Self { rules })
    }

    pub fn rules(&self) -> &[AlarmRule] {
        &self.rules
    }

    /// Apply to the worst DN and EU levels of one sample.
    pub fn matches(&self, dn: AlarmLevel, eu: AlarmLevel) -> bool {
        self.rules.iter().any(|rule| rule.matches(dn, eu))
    }
}

// ── Time range ──────────────────────────────────────────────────────────

/// Basis name used in configuration files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeBasis {
    Ert,
    Scet,
    Sclk,
}

/// Inclusive time window on one basis. `None` bounds are open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeRange {
    Ert {
        start: Option<AccurateTime>,
        stop: Option<AccurateTime>,
    },
    Scet {
        start: Option<AccurateTime>,
        stop: Option<AccurateTime>,
    },
    Sclk {
        start: Option<Sclk>,
        stop: Option<Sclk>,
    },
}

impl TimeRange {
    /// Parse textual bounds. An empty bound is treated as open.
    pub fn parse(
        basis: TimeBasis,
        start: Option<&str>,
        stop: Option<&str>,
    ) -> Result<Self, ConfigError> {
        let start = start.map(str::trim).filter(|s| !s.is_empty());
        let stop = stop.map(str::trim).filter(|s| !s.is_empty());
        let range = match basis {
            TimeBasis::Ert | TimeBasis::Scet => {
                let start = start.map(AccurateTime::parse).transpose()?;
                let stop = stop.map(AccurateTime::parse).transpose()?;
                if basis == TimeBasis::Ert {
                    TimeRange::Ert { start, stop }
                } else {
                    TimeRange::Scet { start, stop }
                }
            }
            TimeBasis::Sclk => TimeRange::Sclk {
                start: start.map(Sclk::parse).transpose()?,
                stop: stop.map(Sclk::parse).transpose()?,
            },
        };
        range.validate()?;
        Ok(range)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let inverted = match self {
            TimeRange::Ert { start, stop } | TimeRange::Scet { start, stop } => {
                matches!((start, stop), (Some(a), Some(b)) if a > b)
            }
            TimeRange::Sclk { start, stop } => {
                matches!((start, stop), (Some(a), Some(b)) if a > b)
            }
        };
        if inverted {
            return Err(ConfigError::InvalidTimeRange(format!(
                "{} start is after stop",
                self.basis_name()
            )));
        }
        Ok(())
    }

    pub fn basis(&self) -> TimeBasis {
        match self {
            TimeRange::Ert { .. } => TimeBasis::Ert,
            TimeRange::Scet { .. } => TimeBasis::Scet,
            TimeRange::Sclk { .. } => TimeBasis::Sclk,
        }
    }

    pub fn basis_name(&self) -> &'static str {
        match self.basis() {
            TimeBasis::Ert => "ERT",
            TimeBasis::Scet => "SCET",
            TimeBasis::Sclk => "SCLK",
        }
    }

    /// True when the sample's value on this range's basis lies in the window.
    pub fn contains(&self, ert: &AccurateTime, scet: &AccurateTime, sclk: &Sclk) -> bool {
        match self {
            TimeRange::Ert { start, stop } => within(ert, start.as_ref(), stop.as_ref()),
            TimeRange::Scet { start, stop } => within(scet, start.as_ref(), stop.as_ref()),
            TimeRange::Sclk { start, stop } => within(sclk, start.as_ref(), stop.as_ref()),
        }
    }
}

fn within<T: PartialOrd>(value: &T, start: Option<&T>, stop: Option<&T>) -> bool {
    if start.is_some_and(|s| value < s) {
        return false;
    }
    if stop.is_some_and(|s| value > s) {
        return false;
    }
    true
}
