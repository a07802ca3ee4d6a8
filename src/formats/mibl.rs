//! MIBL - swizzled mip chain with a trailing `LBIM` footer.
//!
//! A MIBL holds one or more mip levels of a single texture, each padded to the
//! minimum tile size and swizzled (see [`crate::swizzle`]), followed by zero
//! padding up to a 4096 byte boundary. The footer occupies the last 0x28 bytes.
//!
//! ## Footer (0x28 bytes, at end of buffer)
//! ```text
//! [0x00] DataSize (whole buffer incl. footer)  (u32 LE)
//! [0x04] AlignSize (0x1000)                    (u32 LE)
//! [0x08] Width                                 (u32 LE)
//! [0x0C] Height                                (u32 LE)
//! [0x10] LastMipWidth                          (u32 LE)
//! [0x14] LastMipHeight                         (u32 LE)
//! [0x18] Format (surface code)                 (u32 LE)
//! [0x1C] MipCount                              (u32 LE)
//! [0x20] Version (10001)                       (u32 LE)
//! [0x24] Magic "LBIM"                          (4 bytes)
//! ```
//!
//! The meaning of the last-mip fields and the minimum tile size were reverse
//! engineered; they are written exactly as the game's own files carry them.

use crate::formats::dds::DxgiFormat;
use crate::swizzle::swizzle_blocks;
use crate::utils::{align, get_u32, len_u32, range};
use crate::{Error, Result};

/// Size of the trailing footer.
pub const FOOTER_SIZE: usize = 0x28;

/// The whole buffer is padded to this boundary.
pub const ALIGN_SIZE: u32 = 0x1000;

/// Footer version written by the game.
pub const VERSION: u32 = 10001;

/// Footer magic, `LBIM` on disk.
pub const MAGIC: u32 = u32::from_be_bytes(*b"MIBL");

/// Every mip is padded to at least this many pixels horizontally...
pub const MIN_WIDTH: u32 = 16;
/// ...and vertically.
pub const MIN_HEIGHT: u32 = 32;

/// Surface format code stored in the footer for a DXGI format.
///
/// Returns [`Error::UnsupportedPixelFormat`] for formats with no known code.
pub fn surface_format(format: DxgiFormat) -> Result<u32> {
    match format {
        DxgiFormat::R8G8B8A8_UNORM => Ok(37),
        DxgiFormat::BC1_UNORM => Ok(66),
        DxgiFormat::BC2_UNORM => Ok(67),
        DxgiFormat::BC3_UNORM => Ok(68),
        DxgiFormat::BC4_UNORM => Ok(73),
        DxgiFormat::BC5_UNORM => Ok(75),
        DxgiFormat::BC7_UNORM => Ok(77),
        _ => Err(Error::UnsupportedPixelFormat(format.0)),
    }
}

/// Parsed MIBL footer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiblFooter {
    pub data_size: u32,
    pub align_size: u32,
    pub width: u32,
    pub height: u32,
    pub last_mip_width: u32,
    pub last_mip_height: u32,
    pub format: u32,
    pub mip_count: u32,
    pub version: u32,
    pub magic: u32,
}

impl MiblFooter {
    /// Read the footer from the last [`FOOTER_SIZE`] bytes of `surface`.
    pub fn parse(surface: &[u8]) -> Result<Self> {
        let base = surface
            .len()
            .checked_sub(FOOTER_SIZE)
            .ok_or(Error::Parse("MIBL shorter than its footer"))?;
        let f = range(surface, base, FOOTER_SIZE)?;
        Ok(Self {
            data_size: get_u32(f, 0x00)?,
            align_size: get_u32(f, 0x04)?,
            width: get_u32(f, 0x08)?,
            height: get_u32(f, 0x0C)?,
            last_mip_width: get_u32(f, 0x10)?,
            last_mip_height: get_u32(f, 0x14)?,
            format: get_u32(f, 0x18)?,
            mip_count: get_u32(f, 0x1C)?,
            version: get_u32(f, 0x20)?,
            magic: get_u32(f, 0x24)?,
        })
    }

    fn to_bytes(&self) -> [u8; FOOTER_SIZE] {
        let fields = [
            self.data_size,
            self.align_size,
            self.width,
            self.height,
            self.last_mip_width,
            self.last_mip_height,
            self.format,
            self.mip_count,
            self.version,
            self.magic,
        ];
        let mut out = [0u8; FOOTER_SIZE];
        for (chunk, value) in out.chunks_exact_mut(4).zip(fields) {
            chunk.copy_from_slice(&value.to_le_bytes());
        }
        out
    }
}

/// Dimensions of mip `level` for a `width` x `height` base: halved per
/// level and never below one pixel.
pub fn mip_dimensions(width: u32, height: u32, level: u32) -> (u32, u32) {
    let shift = |v: u32| v.checked_shr(level).unwrap_or(0).max(1);
    (shift(width), shift(height))
}

/// Padded dimensions a mip occupies inside a MIBL.
///
/// The minimum tile floor and block alignment are applied to the already
/// halved dimensions.
pub fn padded_dimensions(width: u32, height: u32, block_side: u32) -> (u32, u32) {
    (
        align(width.max(MIN_WIDTH), block_side),
        align(height.max(MIN_HEIGHT), block_side),
    )
}

/// Build a MIBL from linear mip buffers.
///
/// `mips[0]` is the full `width` x `height` level. Levels before
/// `starting_mip` are skipped; the footer describes the chain from
/// `starting_mip` onward.
pub fn encode(
    mips: &[Vec<u8>],
    width: u32,
    height: u32,
    format: DxgiFormat,
    starting_mip: usize,
) -> Result<Vec<u8>> {
    let surface_code = surface_format(format)?;
    let info = format.info()?;
    if starting_mip >= mips.len() {
        return Err(Error::OutOfRange {
            index: starting_mip,
            len: mips.len(),
        });
    }

    let bytes_per_block = info.bytes_per_block() as usize;
    let mut out = Vec::new();
    let (mut mip_width, mut mip_height) = (width, height);

    for (level, mip) in mips.iter().enumerate().skip(starting_mip) {
        (mip_width, mip_height) = mip_dimensions(width, height, level as u32);
        let (padded_width, padded_height) = padded_dimensions(mip_width, mip_height, info.block_side);
        let mut padded = vec![0u8; info.surface_size(padded_width, padded_height)];

        if mip_width < MIN_WIDTH {
            // Re-stride each block row into the wider padded row.
            let row_size = info.blocks(mip_width) as usize * bytes_per_block;
            let padded_row = info.blocks(padded_width) as usize * bytes_per_block;
            for row in 0..info.blocks(mip_height) as usize {
                let src = range(mip, row * row_size, row_size)?;
                padded[row * padded_row..row * padded_row + row_size].copy_from_slice(src);
            }
        } else {
            let len = mip.len().min(padded.len());
            padded[..len].copy_from_slice(&mip[..len]);
        }

        out.extend_from_slice(&swizzle_blocks(
            &padded,
            info.blocks(padded_width),
            info.blocks(padded_height),
            info.bytes_per_block(),
        )?);
    }

    let data_size = align(len_u32(out.len() + FOOTER_SIZE)?, ALIGN_SIZE);
    let (base_width, base_height) = mip_dimensions(width, height, starting_mip as u32);
    let footer = MiblFooter {
        data_size,
        align_size: ALIGN_SIZE,
        width: base_width,
        height: base_height,
        last_mip_width: mip_width,
        last_mip_height: mip_height,
        format: surface_code,
        mip_count: len_u32(mips.len() - starting_mip)?,
        version: VERSION,
        magic: MAGIC,
    };

    out.resize(data_size as usize - FOOTER_SIZE, 0);
    out.extend_from_slice(&footer.to_bytes());
    Ok(out)
}
