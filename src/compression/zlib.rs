//! zlib (deflate) compression via `flate2`.
//!
//! `xbc1` payloads are complete zlib streams: a two byte header, raw deflate
//! data and an Adler-32 trailer. Replacement blobs are always written at the
//! best compression level.

use std::io::{Read, Write};

use flate2::Compression;
use flate2::read::ZlibDecoder;
use flate2::write::ZlibEncoder;

use crate::{Error, Result};

/// Upper bound of the deflate expansion ratio.
const MAX_RATIO: usize = 1032;

/// Decompress a complete zlib stream.
///
/// `size_hint` pre-sizes the output buffer; it is usually the decompressed
/// size recorded next to the stream. It is capped at what `data` can
/// expand to. Returns [`Error::Deflate`] on a corrupt or truncated stream.
pub fn decompress_zlib(data: &[u8], size_hint: usize) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(size_hint.min(data.len().saturating_mul(MAX_RATIO)));
    ZlibDecoder::new(data)
        .read_to_end(&mut out)
        .map_err(Error::Deflate)?;
    Ok(out)
}

/// Compress `data` into a zlib stream at [`Compression::best`].
pub fn compress_zlib(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::best());
    encoder.write_all(data).map_err(Error::Deflate)?;
    encoder.finish().map_err(Error::Deflate)
}
