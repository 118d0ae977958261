//! Aggregate fetch common types, IDs, and errors.
//!
//! This crate provides the data model shared by the fetch crates:
//! - Batch and channel identity types
//! - Accurate times, SCLK values and their display rules
//! - The typed DN (data number) union and its raw wire form
//! - Alarm levels and worst-level reduction
//! - Channel sample groups, discriminators and aggregate records
//! - Common error types

pub mod alarm;
pub mod dn;
pub mod error;
pub mod group;
pub mod id;
pub mod time;

pub use alarm::{worst_levels, AlarmLevel, AlarmValue};
pub use dn::{
    BoolDn, ChannelType, DnValue, FloatDn, RawDn, SignedDn, StatusDn, UnsignedDn, UnsignedKind,
};
pub use error::{Error, Result};
pub use group::{
    AggregateRecord, ChannelSampleGroup, ChannelSampleMember, DefinitionCategory,
    GroupDiscriminator, GroupFlags, PacketInfo, RecordBatch,
};
pub use id::BatchId;
pub use time::{AccurateTime, Sclk, SclkEncoding, TimeFormat};
