//! CSV column vocabulary for channel sample output.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// One output column of a channel sample row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CsvColumn {
    SessionId,
    SessionHost,
    SessionFragment,
    ChannelId,
    DssId,
    Vcid,
    Name,
    Module,
    Ert,
    Scet,
    Lst,
    Sclk,
    Dn,
    Eu,
    Status,
    DnAlarmState,
    EuAlarmState,
    Realtime,
    Type,
    FromSse,
    Scid,
    Rct,
    Apid,
    ApidName,
    Spsc,
    PacketRct,
    Vcfc,
}

impl CsvColumn {
    pub const ALL: [CsvColumn; 27] = [
        CsvColumn::SessionId,
        CsvColumn::SessionHost,
        CsvColumn::SessionFragment,
        CsvColumn::ChannelId,
        CsvColumn::DssId,
        CsvColumn::Vcid,
        CsvColumn::Name,
        CsvColumn::Module,
        CsvColumn::Ert,
        CsvColumn::Scet,
        CsvColumn::Lst,
        CsvColumn::Sclk,
        CsvColumn::Dn,
        CsvColumn::Eu,
        CsvColumn::Status,
        CsvColumn::DnAlarmState,
        CsvColumn::EuAlarmState,
        CsvColumn::Realtime,
        CsvColumn::Type,
        CsvColumn::FromSse,
        CsvColumn::Scid,
        CsvColumn::Rct,
        CsvColumn::Apid,
        CsvColumn::ApidName,
        CsvColumn::Spsc,
        CsvColumn::PacketRct,
        CsvColumn::Vcfc,
    ];

    /// Canonical upper-case column name.
    pub fn name(self) -> &'static str {
        match self {
            CsvColumn::SessionId => "SESSION_ID",
            CsvColumn::SessionHost => "SESSION_HOST",
            CsvColumn::SessionFragment => "SESSION_FRAGMENT",
            CsvColumn::ChannelId => "CHANNEL_ID",
            CsvColumn::DssId => "DSS_ID",
            CsvColumn::Vcid => "VCID",
            CsvColumn::Name => "NAME",
            CsvColumn::Module => "MODULE",
            CsvColumn::Ert => "ERT",
            CsvColumn::Scet => "SCET",
            CsvColumn::Lst => "LST",
            CsvColumn::Sclk => "SCLK",
            CsvColumn::Dn => "DN",
            CsvColumn::Eu => "EU",
            CsvColumn::Status => "STATUS",
            CsvColumn::DnAlarmState => "DN_ALARM_STATE",
            CsvColumn::EuAlarmState => "EU_ALARM_STATE",
            CsvColumn::Realtime => "REALTIME",
            CsvColumn::Type => "TYPE",
            CsvColumn::FromSse => "FROM_SSE",
            CsvColumn::Scid => "SCID",
            CsvColumn::Rct => "RCT",
            CsvColumn::Apid => "APID",
            CsvColumn::ApidName => "APID_NAME",
            CsvColumn::Spsc => "SPSC",
            CsvColumn::PacketRct => "PACKET_RCT",
            CsvColumn::Vcfc => "VCFC",
        }
    }

    /// Look a column up by name, ignoring case, underscores and spaces.
    ///
    /// `CHANNEL_ID`, `channelId` and `channelid` all name the same column.
    pub fn parse(name: &str) -> Option<Self> {
        let wanted = normalize(name);
        Self::ALL
            .iter()
            .copied()
            .find(|col| normalize(col.name()) == wanted)
    }
}

fn normalize(name: &str) -> String {
    name.chars()
        .filter(|c| *c != '_' && !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

impl fmt::Display for CsvColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for CsvColumn {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CsvColumn::parse(s).ok_or_else(|| ConfigError::UnknownColumn(s.to_string()))
    }
}

impl Serialize for CsvColumn {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for CsvColumn {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Header row for the given column list.
pub fn csv_header(columns: &[CsvColumn]) -> String {
    columns
        .iter()
        .map(|c| c.name())
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_is_spelling_insensitive() {
        assert_eq!(CsvColumn::parse("CHANNEL_ID"), Some(CsvColumn::ChannelId));
        assert_eq!(CsvColumn::parse("channelId"), Some(CsvColumn::ChannelId));
        assert_eq!(CsvColumn::parse("dn alarm state"), Some(CsvColumn::DnAlarmState));
        assert_eq!(CsvColumn::parse("bogus"), None);
    }

    #[test]
    fn test_every_name_parses_back() {
        for col in CsvColumn::ALL {
            assert_eq!(CsvColumn::parse(col.name()), Some(col));
        }
    }

    #[test]
    fn test_header_row() {
        let header = csv_header(&[CsvColumn::ChannelId, CsvColumn::Dn]);
        assert_eq!(header, "CHANNEL_ID,DN");
    }

    #[test]
    fn test_deserialize_rejects_unknown() {
        let ok: Vec<CsvColumn> = serde_json::from_str(r#"["ert","Channel_Id"]"#).unwrap();
        assert_eq!(ok, vec![CsvColumn::Ert, CsvColumn::ChannelId]);
        assert!(serde_json::from_str::<Vec<CsvColumn>>(r#"["nope"]"#).is_err());
    }
}
