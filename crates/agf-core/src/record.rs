//! Output-ready channel sample records.
//!
//! A [`ChannelSampleRecord`] is built once per surviving group member and is
//! immutable afterwards. Group-level nullability is applied at construction:
//!
//! | group flag        | absent fields |
//! |-------------------|---------------|
//! | monitor           | SCET, SCLK, module, VCID |
//! | header            | module |
//! | SSE               | VCID |

use agf_common::{
    worst_levels, AccurateTime, AggregateRecord, AlarmLevel, ChannelSampleMember, ChannelType,
    DnValue, GroupDiscriminator, GroupFlags, Result, Sclk, SclkEncoding, TimeFormat,
};
use agf_config::{CsvColumn, OrderByType};

/// Packet fields copied from the aggregate's packet-info map.
#[derive(Debug, Clone, PartialEq)]
pub struct PacketMetadata {
    pub apid: u32,
    pub apid_name: String,
    pub spsc: u32,
    pub rct: AccurateTime,
    pub vcfc: u32,
}

/// Times resolved for one member before the range check.
///
/// A missing SCET or SCLK is carried as a dummy so range checks and sort keys
/// have a value to work with; dummies render as empty strings.
#[derive(Debug, Clone, PartialEq)]
pub struct SampleTimes {
    pub ert: AccurateTime,
    pub rct: AccurateTime,
    pub scet: AccurateTime,
    pub sclk: Sclk,
    pub lst: Option<String>,
}

impl SampleTimes {
    pub fn from_member(member: &ChannelSampleMember) -> Self {
        Self {
            ert: member.ert,
            rct: member.rct,
            scet: member.scet.unwrap_or_else(AccurateTime::dummy),
            sclk: member.sclk.unwrap_or_else(Sclk::dummy),
            lst: None,
        }
    }
}

/// One renderable channel sample.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSampleRecord {
    pub session_id: i64,
    pub session_host: String,
    pub session_fragment: i32,
    pub spacecraft_id: i32,
    pub channel_id: String,
    pub name: String,
    pub module: Option<String>,
    pub dss_id: u32,
    pub vcid: Option<u32>,
    pub realtime: bool,
    pub from_sse: bool,
    pub ert: AccurateTime,
    pub rct: AccurateTime,
    pub scet: Option<AccurateTime>,
    pub sclk: Option<Sclk>,
    pub sclk_encoding: SclkEncoding,
    pub lst: Option<String>,
    pub dn: DnValue,
    pub eu: Option<f64>,
    pub status: Option<String>,
    pub dn_format: Option<String>,
    pub eu_format: Option<String>,
    pub dn_alarm: AlarmLevel,
    pub eu_alarm: AlarmLevel,
    pub packet: Option<PacketMetadata>,
}

/// Build a record from a group member.
///
/// `channel_id` is the already upper-cased id. Fails only when the member's
/// DN cannot be resolved into a typed value.
pub fn build_record(
    aggregate: &AggregateRecord,
    discriminator: &GroupDiscriminator,
    member: &ChannelSampleMember,
    channel_id: String,
    times: SampleTimes,
    include_packet_info: bool,
) -> Result<ChannelSampleRecord> {
    let dn = DnValue::decode(&member.dn)?;
    let flags = GroupFlags::from(discriminator);
    let (dn_alarm, eu_alarm) = worst_levels(&member.alarms);

    let status = match dn.channel_type() {
        ChannelType::Status | ChannelType::Boolean => member.status.clone(),
        _ => None,
    };

    let (scet, sclk) = if flags.monitor {
        (None, None)
    } else {
        (Some(times.scet), Some(times.sclk))
    };
    let module = if flags.monitor || flags.header {
        None
    } else {
        member.module.clone().filter(|m| !m.is_empty())
    };
    let vcid = if flags.monitor || flags.sse {
        None
    } else {
        aggregate.vcid
    };

    let packet = if include_packet_info {
        aggregate
            .packet_info
            .get(&member.packet_id)
            .map(|info| PacketMetadata {
                apid: info.apid,
                apid_name: info.apid_name.clone(),
                spsc: info.spsc,
                rct: info.rct,
                vcfc: info.vcfc,
            })
    } else {
        None
    };

    Ok(ChannelSampleRecord {
        session_id: aggregate.session_id,
        session_host: aggregate.host.clone(),
        session_fragment: aggregate.session_fragment,
        spacecraft_id: aggregate.spacecraft_id,
        channel_id,
        name: member.name.clone(),
        module,
        dss_id: aggregate.dss_id,
        vcid,
        realtime: flags.realtime,
        from_sse: flags.sse,
        ert: times.ert,
        rct: times.rct,
        scet,
        sclk,
        sclk_encoding: discriminator.sclk_encoding,
        lst: times.lst,
        dn,
        eu: member.eu,
        status,
        dn_format: member.dn_format.clone().filter(|f| !f.is_empty()),
        eu_format: member.eu_format.clone().filter(|f| !f.is_empty()),
        dn_alarm,
        eu_alarm,
        packet,
    })
}

/// A single rendered field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Absent,
    Text(String),
    Int(i64),
    UInt(u64),
    Float(f64),
    Bool(bool),
}

impl FieldValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, FieldValue::Absent)
    }

    fn text(value: Option<impl Into<String>>) -> Self {
        value.map_or(FieldValue::Absent, |v| FieldValue::Text(v.into()))
    }

    /// Plain rendering without CSV quoting.
    pub fn display(&self) -> String {
        match self {
            FieldValue::Absent => String::new(),
            FieldValue::Text(s) => s.clone(),
            FieldValue::Int(v) => v.to_string(),
            FieldValue::UInt(v) => v.to_string(),
            FieldValue::Float(v) => v.to_string(),
            FieldValue::Bool(v) => v.to_string(),
        }
    }
}

impl From<&DnValue> for FieldValue {
    fn from(dn: &DnValue) -> Self {
        match dn {
            DnValue::Ascii(s) => FieldValue::Text(s.clone()),
            DnValue::Boolean(b) => FieldValue::Int(i64::from(b.value())),
            DnValue::SignedInt(s) => FieldValue::Int(s.as_i64()),
            DnValue::Unsigned(_, u) => FieldValue::UInt(u.as_u64()),
            DnValue::Float(f) => FieldValue::Float(f.as_f64()),
            DnValue::Status(s) => FieldValue::Int(s.as_i64()),
        }
    }
}

fn real_time(time: Option<&AccurateTime>) -> Option<&AccurateTime> {
    time.filter(|t| !t.is_dummy())
}

impl ChannelSampleRecord {
    pub fn channel_type(&self) -> ChannelType {
        self.dn.channel_type()
    }

    pub fn formatted_scet(&self, format: &TimeFormat) -> Option<String> {
        real_time(self.scet.as_ref()).map(|t| format.format_scet(t))
    }

    pub fn formatted_sclk(&self) -> Option<String> {
        self.sclk
            .filter(|s| !s.is_dummy())
            .map(|s| s.format(&self.sclk_encoding))
    }

    /// Value of one output column.
    pub fn value_of(&self, column: CsvColumn, format: &TimeFormat) -> FieldValue {
        let packet = self.packet.as_ref();
        match column {
            CsvColumn::SessionId => FieldValue::Int(self.session_id),
            CsvColumn::SessionHost => FieldValue::Text(self.session_host.clone()),
            CsvColumn::SessionFragment => FieldValue::Int(i64::from(self.session_fragment)),
            CsvColumn::ChannelId => FieldValue::Text(self.channel_id.clone()),
            CsvColumn::DssId => FieldValue::UInt(u64::from(self.dss_id)),
            CsvColumn::Vcid => self
                .vcid
                .map_or(FieldValue::Absent, |v| FieldValue::UInt(u64::from(v))),
            CsvColumn::Name => FieldValue::Text(self.name.clone()),
            CsvColumn::Module => FieldValue::text(self.module.clone()),
            CsvColumn::Ert => FieldValue::Text(format.format_ert(&self.ert)),
            CsvColumn::Scet => FieldValue::text(self.formatted_scet(format)),
            CsvColumn::Lst => FieldValue::text(self.lst.clone()),
            CsvColumn::Sclk => FieldValue::text(self.formatted_sclk()),
            CsvColumn::Dn => FieldValue::from(&self.dn),
            CsvColumn::Eu => self.eu.map_or(FieldValue::Absent, FieldValue::Float),
            CsvColumn::Status => FieldValue::text(self.status.clone()),
            CsvColumn::DnAlarmState => FieldValue::Text(self.dn_alarm.as_str().to_string()),
            CsvColumn::EuAlarmState => FieldValue::Text(self.eu_alarm.as_str().to_string()),
            CsvColumn::Realtime => FieldValue::Bool(self.realtime),
            CsvColumn::Type => FieldValue::Text(self.channel_type().as_str().to_string()),
            CsvColumn::FromSse => FieldValue::Bool(self.from_sse),
            CsvColumn::Scid => FieldValue::Int(i64::from(self.spacecraft_id)),
            CsvColumn::Rct => FieldValue::Text(format.format_ert(&self.rct)),
            CsvColumn::Apid => packet.map_or(FieldValue::Absent, |p| FieldValue::UInt(p.apid.into())),
            CsvColumn::ApidName => FieldValue::text(packet.map(|p| p.apid_name.clone())),
            CsvColumn::Spsc => packet.map_or(FieldValue::Absent, |p| FieldValue::UInt(p.spsc.into())),
            CsvColumn::PacketRct => FieldValue::text(packet.map(|p| format.format_ert(&p.rct))),
            CsvColumn::Vcfc => packet.map_or(FieldValue::Absent, |p| FieldValue::UInt(p.vcfc.into())),
        }
    }

    /// Sort field for the configured order-by type.
    ///
    /// Absent module, SCET or SCLK sort as the empty string.
    pub fn sort_field(&self, order_by: OrderByType, format: &TimeFormat) -> String {
        match order_by {
            OrderByType::None | OrderByType::Ert => format.format_ert(&self.ert),
            OrderByType::Rct => format.format_ert(&self.rct),
            OrderByType::Scet => self.formatted_scet(format).unwrap_or_default(),
            OrderByType::Sclk => self.formatted_sclk().unwrap_or_default(),
            OrderByType::ChannelId => self.channel_id.clone(),
            OrderByType::Module => self.module.clone().unwrap_or_default(),
        }
    }
}
