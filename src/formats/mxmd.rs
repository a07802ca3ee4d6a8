//! MXMD - model metadata (`.wimdo`), the companion of an MSRD.
//!
//! Only the header is interpreted. The file embeds a copy of the MSRD
//! metadata region at `UncachedTexturesOffset`; that copy has to be refreshed
//! whenever the MSRD tables change. Everything else passes through unchanged.
//!
//! ## Header Layout
//! ```text
//! [0x00] Magic "DMXM"                       (u32 LE, reads as 'MXMD')
//! [0x04] Version                            (u32 LE)
//! [0x08] ModelsOffset                       (u32 LE)
//! [0x0C] MaterialsOffset                    (u32 LE)
//! [0x10] Unknown                            (u32 LE)
//! [0x14] VertexBufferOffset                 (u32 LE)
//! [0x18] ShadersOffset                      (u32 LE)
//! [0x1C] CachedTexturesOffset               (u32 LE)
//! [0x20] Unknown                            (u32 LE)
//! [0x24] UncachedTexturesOffset             (u32 LE)
//! ```

use crate::utils::{get_u32, put_bytes};
use crate::{Error, Result};

/// Magic value of the MXMD header, `DMXM` on disk.
pub const MAGIC: u32 = u32::from_be_bytes(*b"MXMD");

pub const HEADER_SIZE: usize = 0x28;

/// MXMD file header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MxmdHeader {
    pub version: u32,
    pub models_offset: u32,
    pub materials_offset: u32,
    pub unk0: u32,
    pub vertex_buffer_offset: u32,
    pub shaders_offset: u32,
    pub cached_textures_offset: u32,
    pub unk1: u32,
    /// Where the MSRD metadata copy starts. Zero when the model has no
    /// streamed textures.
    pub uncached_textures_offset: u32,
}

impl MxmdHeader {
    /// Parse the header at the start of `data`.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_SIZE {
            return Err(Error::UnexpectedEof);
        }
        if get_u32(data, 0x00)? != MAGIC {
            return Err(Error::BadMagic);
        }
        Ok(Self {
            version: get_u32(data, 0x04)?,
            models_offset: get_u32(data, 0x08)?,
            materials_offset: get_u32(data, 0x0C)?,
            unk0: get_u32(data, 0x10)?,
            vertex_buffer_offset: get_u32(data, 0x14)?,
            shaders_offset: get_u32(data, 0x18)?,
            cached_textures_offset: get_u32(data, 0x1C)?,
            unk1: get_u32(data, 0x20)?,
            uncached_textures_offset: get_u32(data, 0x24)?,
        })
    }
}

/// A companion metadata file held in memory.
#[derive(Debug, Clone)]
pub struct Mxmd {
    pub header: MxmdHeader,
    data: Vec<u8>,
}

impl Mxmd {
    /// Take ownership of a complete MXMD file and validate its header.
    pub fn parse(data: Vec<u8>) -> Result<Self> {
        let header = MxmdHeader::parse(&data)?;
        Ok(Self { header, data })
    }

    /// Offset of the embedded MSRD metadata copy.
    ///
    /// Fails when the header leaves it unset, which means the model keeps no
    /// textures in an MSRD at all.
    pub fn uncached_textures_offset(&self) -> Result<usize> {
        match self.header.uncached_textures_offset {
            0 => Err(Error::Parse("companion has no uncached texture table")),
            offset => Ok(offset as usize),
        }
    }

    /// Overwrite the embedded MSRD metadata copy with `metadata`.
    ///
    /// The file never grows: a block that would run past the end fails with
    /// [`Error::InvalidRange`] and leaves the file untouched.
    pub fn patch_uncached_textures(&mut self, metadata: &[u8]) -> Result<()> {
        let offset = self.uncached_textures_offset()?;
        put_bytes(&mut self.data, offset, metadata)
    }

    /// The file contents, including any patch applied.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }
}
