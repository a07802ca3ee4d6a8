//! XBC1 - single-file zlib wrapper used for every blob stored in an MSRD.
//!
//! ## Layout
//! ```text
//! [0x00] Magic "xbc1"                       (4 bytes)
//! [0x04] FileCount (always 1)               (u32 LE)
//! [0x08] UncompressedSize                   (u32 LE)
//! [0x0C] CompressedSize                     (u32 LE)
//! [0x10] Hash (written as 0)                (u32 LE)
//! [0x14] Name                               (0x1C bytes, null padded)
//! [0x30] zlib stream                        (CompressedSize bytes)
//! ```
//!
//! Blobs stored in a container are zero-padded to 16 bytes; the padding is
//! ignored because only `CompressedSize` bytes of the stream are consumed.
//!
//! The embedded name is never invented: replacement blobs copy the name of
//! the blob they replace.

use std::fmt;
use std::io::Read;

use crate::compression::zlib::{compress_zlib, decompress_zlib};
use crate::utils::{bytesa, le_u32, len_u32, magic, range};
use crate::{Error, Result};

/// Size of the fixed XBC1 header.
pub const HEADER_SIZE: usize = 0x30;

/// Length of the embedded name field.
pub const NAME_LEN: usize = 0x1C;

/// The 0x1C byte name field of an XBC1 header.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct Xbc1Name(pub [u8; NAME_LEN]);

impl Xbc1Name {
    /// Build a name from a string, truncating to the field width.
    pub fn new(name: &str) -> Self {
        let mut raw = [0u8; NAME_LEN];
        let len = name.len().min(NAME_LEN);
        raw[..len].copy_from_slice(&name.as_bytes()[..len]);
        Self(raw)
    }
}

impl fmt::Display for Xbc1Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&crate::utils::fixed_string(&self.0))
    }
}

impl fmt::Debug for Xbc1Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Xbc1Name({:?})", self.to_string())
    }
}

/// Parsed XBC1 header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Xbc1Header {
    /// Number of embedded files. Only 1 is supported.
    pub file_count: u32,
    /// Size of the payload after decompression.
    pub uncompressed_size: u32,
    /// Size of the zlib stream following the header.
    pub compressed_size: u32,
    /// Opaque hash field, preserved on read.
    pub hash: u32,
    /// Embedded name.
    pub name: Xbc1Name,
}

impl Xbc1Header {
    /// Parse and validate the header at the start of `data`.
    ///
    /// Fails with [`Error::BadMagic`] on a wrong signature and with
    /// [`Error::UnsupportedFileCount`] when the blob holds more than one file.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut r = data;
        Self::read(&mut r)
    }

    fn read<R: Read>(r: &mut R) -> Result<Self> {
        magic(r, b"xbc1")?;
        let file_count = le_u32(r)?;
        let uncompressed_size = le_u32(r)?;
        let compressed_size = le_u32(r)?;
        let hash = le_u32(r)?;
        let name = Xbc1Name(bytesa::<NAME_LEN>(r)?);

        if file_count != 1 {
            return Err(Error::UnsupportedFileCount(file_count));
        }

        Ok(Self {
            file_count,
            uncompressed_size,
            compressed_size,
            hash,
            name,
        })
    }

    fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut out = [0u8; HEADER_SIZE];
        out[0x00..0x04].copy_from_slice(b"xbc1");
        out[0x04..0x08].copy_from_slice(&self.file_count.to_le_bytes());
        out[0x08..0x0C].copy_from_slice(&self.uncompressed_size.to_le_bytes());
        out[0x0C..0x10].copy_from_slice(&self.compressed_size.to_le_bytes());
        out[0x10..0x14].copy_from_slice(&self.hash.to_le_bytes());
        out[0x14..HEADER_SIZE].copy_from_slice(&self.name.0);
        out
    }
}

/// Decompress an XBC1 blob, returning its header and payload.
pub fn decompress(data: &[u8]) -> Result<(Xbc1Header, Vec<u8>)> {
    let header = Xbc1Header::parse(data)?;
    let stream = range(data, HEADER_SIZE, header.compressed_size as usize)?;
    let payload = decompress_zlib(stream, header.uncompressed_size as usize)?;
    if payload.len() != header.uncompressed_size as usize {
        return Err(Error::Parse("xbc1 payload size mismatch"));
    }
    Ok((header, payload))
}

/// Compress `payload` into a new XBC1 blob carrying `name`.
pub fn compress(name: Xbc1Name, payload: &[u8]) -> Result<Vec<u8>> {
    let stream = compress_zlib(payload)?;
    let header = Xbc1Header {
        file_count: 1,
        uncompressed_size: len_u32(payload.len())?,
        compressed_size: len_u32(stream.len())?,
        hash: 0,
        name,
    };

    let mut out = Vec::with_capacity(HEADER_SIZE + stream.len());
    out.extend_from_slice(&header.to_bytes());
    out.extend_from_slice(&stream);
    Ok(out)
}
