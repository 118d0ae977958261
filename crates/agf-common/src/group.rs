//! Channel sample groups and the aggregate records that carry them.

use std::collections::HashMap;

use crate::alarm::AlarmValue;
use crate::dn::RawDn;
use crate::id::BatchId;
use crate::time::{AccurateTime, Sclk, SclkEncoding};

/// Channel definition category shared by every member of a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DefinitionCategory {
    Regular,
    Monitor,
    Header,
}

impl DefinitionCategory {
    pub fn code(self) -> u8 {
        match self {
            DefinitionCategory::Regular => 0,
            DefinitionCategory::Monitor => 1,
            DefinitionCategory::Header => 2,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(DefinitionCategory::Regular),
            1 => Some(DefinitionCategory::Monitor),
            2 => Some(DefinitionCategory::Header),
            _ => None,
        }
    }
}

/// Properties shared by all members of one aggregate group.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GroupDiscriminator {
    pub realtime: bool,
    pub from_sse: bool,
    pub category: DefinitionCategory,
    pub vcid: Option<u32>,
    pub dss_id: u32,
    pub apid: u32,
    pub sclk_encoding: SclkEncoding,
}

impl Default for GroupDiscriminator {
    fn default() -> Self {
        Self {
            realtime: true,
            from_sse: false,
            category: DefinitionCategory::Regular,
            vcid: None,
            dss_id: 0,
            apid: 0,
            sclk_encoding: SclkEncoding::default(),
        }
    }
}

/// Group-wide flags that drive output nullability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GroupFlags {
    pub monitor: bool,
    pub header: bool,
    pub realtime: bool,
    pub sse: bool,
}

impl From<&GroupDiscriminator> for GroupFlags {
    fn from(disc: &GroupDiscriminator) -> Self {
        Self {
            monitor: disc.category == DefinitionCategory::Monitor,
            header: disc.category == DefinitionCategory::Header,
            realtime: disc.realtime,
            sse: disc.from_sse,
        }
    }
}

/// One channel sample inside a group.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSampleMember {
    pub channel_id: String,
    pub name: String,
    /// Absent when the stored module is empty.
    pub module: Option<String>,
    pub packet_id: u64,
    pub dn: RawDn,
    pub eu: Option<f64>,
    pub status: Option<String>,
    pub dn_format: Option<String>,
    pub eu_format: Option<String>,
    pub alarms: Vec<AlarmValue>,
    pub ert: AccurateTime,
    pub rct: AccurateTime,
    pub scet: Option<AccurateTime>,
    pub sclk: Option<Sclk>,
}

/// One decompressed aggregate unit.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSampleGroup {
    pub discriminator: GroupDiscriminator,
    pub members: Vec<ChannelSampleMember>,
}

/// Packet metadata referenced by member packet ids.
#[derive(Debug, Clone, PartialEq)]
pub struct PacketInfo {
    pub apid: u32,
    pub apid_name: String,
    pub spsc: u32,
    pub rct: AccurateTime,
    pub vcfc: u32,
}

/// One stored aggregate row as pulled from the archive.
#[derive(Debug, Clone, Default)]
pub struct AggregateRecord {
    /// Compressed serialized [`ChannelSampleGroup`].
    pub payload: Vec<u8>,
    /// Colon-delimited superset of member channel ids.
    pub channel_ids: String,
    pub packet_info: HashMap<u64, PacketInfo>,
    pub host: String,
    pub host_id: i32,
    pub session_id: i64,
    pub session_fragment: i32,
    pub spacecraft_id: i32,
    pub vcid: Option<u32>,
    pub dss_id: u32,
}

impl AggregateRecord {
    /// Channel ids named by the superset string.
    pub fn channel_id_superset(&self) -> impl Iterator<Item = &str> {
        self.channel_ids.split(':').filter(|id| !id.is_empty())
    }
}

/// A bounded set of aggregate records processed as one unit of work.
#[derive(Debug, Clone)]
pub struct RecordBatch {
    pub batch_id: BatchId,
    pub records: Vec<AggregateRecord>,
}

impl RecordBatch {
    pub fn new(batch_id: impl Into<BatchId>, records: Vec<AggregateRecord>) -> Self {
        Self {
            batch_id: batch_id.into(),
            records,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_from_discriminator() {
        let disc = GroupDiscriminator {
            category: DefinitionCategory::Monitor,
            from_sse: true,
            realtime: false,
            ..GroupDiscriminator::default()
        };
        let flags = GroupFlags::from(&disc);
        assert!(flags.monitor);
        assert!(!flags.header);
        assert!(flags.sse);
        assert!(!flags.realtime);
    }

    #[test]
    fn test_superset_skips_empty_tokens() {
        let rec = AggregateRecord {
            channel_ids: "A-0001::B-0002:".to_string(),
            ..AggregateRecord::default()
        };
        let ids: Vec<&str> = rec.channel_id_superset().collect();
        assert_eq!(ids, vec!["A-0001", "B-0002"]);
    }

    #[test]
    fn test_category_codes_roundtrip() {
        for cat in [
            DefinitionCategory::Regular,
            DefinitionCategory::Monitor,
            DefinitionCategory::Header,
        ] {
            assert_eq!(DefinitionCategory::from_code(cat.code()), Some(cat));
        }
        assert_eq!(DefinitionCategory::from_code(9), None);
    }
}
