//! zstd framing for aggregate payloads.

use crate::error::{FetchError, Result};

/// Compression level used by [`super::pack_group`].
pub const DEFAULT_LEVEL: i32 = 3;

pub fn compress(bytes: &[u8], level: i32) -> Result<Vec<u8>> {
    zstd::stream::encode_all(bytes, level).map_err(|e| FetchError::Compress(e.to_string()))
}

pub fn decompress(bytes: &[u8]) -> Result<Vec<u8>> {
    zstd::stream::decode_all(bytes).map_err(|e| FetchError::Decompress(e.to_string()))
}
