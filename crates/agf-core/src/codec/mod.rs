//! Aggregate payload codec: binary group layout plus zstd compression.

pub mod compress;
pub mod wire;

pub use compress::{compress, decompress, DEFAULT_LEVEL};
pub use wire::{decode_group, encode_group, GROUP_MAGIC, GROUP_VERSION};

use agf_common::ChannelSampleGroup;

use crate::error::Result;

/// Serialize and compress a group into a stored aggregate payload.
pub fn pack_group(group: &ChannelSampleGroup) -> Result<Vec<u8>> {
    let encoded = encode_group(group)?;
    compress(&encoded, DEFAULT_LEVEL)
}
