//! Order-by vocabulary.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// Field used to produce a global order across the batches of one fetch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum OrderByType {
    #[default]
    None,
    Ert,
    Rct,
    Scet,
    Sclk,
    ChannelId,
    Module,
}

impl OrderByType {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderByType::None => "none",
            OrderByType::Ert => "ert",
            OrderByType::Rct => "rct",
            OrderByType::Scet => "scet",
            OrderByType::Sclk => "sclk",
            OrderByType::ChannelId => "channel_id",
            OrderByType::Module => "module",
        }
    }

    pub fn is_sorting(self) -> bool {
        self != OrderByType::None
    }
}

impl fmt::Display for OrderByType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OrderByType {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_')
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match normalized.as_str() {
            "" | "none" => Ok(OrderByType::None),
            "ert" => Ok(OrderByType::Ert),
            "rct" => Ok(OrderByType::Rct),
            "scet" => Ok(OrderByType::Scet),
            "sclk" => Ok(OrderByType::Sclk),
            "channelid" => Ok(OrderByType::ChannelId),
            "module" => Ok(OrderByType::Module),
            _ => Err(ConfigError::UnknownOrderBy(s.to_string())),
        }
    }
}

impl Serialize for OrderByType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for OrderByType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_variants() {
        assert_eq!("NONE".parse::<OrderByType>().unwrap(), OrderByType::None);
        assert_eq!("channelId".parse::<OrderByType>().unwrap(), OrderByType::ChannelId);
        assert_eq!("CHANNEL_ID".parse::<OrderByType>().unwrap(), OrderByType::ChannelId);
        assert_eq!("Scet".parse::<OrderByType>().unwrap(), OrderByType::Scet);
        assert!("velocity".parse::<OrderByType>().is_err());
    }

    #[test]
    fn test_only_none_is_unsorted() {
        assert!(!OrderByType::None.is_sorting());
        assert!(OrderByType::Module.is_sorting());
    }
}
