//! DDS (DirectDraw Surface) - source texture reader.
//!
//! Replacement textures are supplied as DDS files holding already
//! block-compressed data. This reader only splits the file into linear
//! per-surface, per-mip buffers; it never decodes pixels.
//!
//! ## Layout
//! ```text
//! [0x00] Magic "DDS "                       (4 bytes)
//! [0x04] Header                             (124 bytes, Size field = 124)
//!        [0x4C] PixelFormat                 (32 bytes, FourCC at +0x08)
//! [0x80] DX10 header, if FourCC == "DX10"   (20 bytes)
//! [...]  Surface 0 mip 0, mip 1, ... surface 1 mip 0, ...
//! ```
//!
//! Files without a DX10 header are accepted when their FourCC is one of the
//! legacy block-compression codes (`DXT1`-`DXT5`, `ATI1`, `ATI2`). Trailing
//! data after the last mip is rejected.

use std::io::Read;

use crate::formats::mibl::mip_dimensions;
use crate::utils::{bytesa, bytesv, le_u32, magic};
use crate::{Error, Result};

/// Value of [`DdsHeader::size`] in every valid file.
pub const HEADER_SIZE: u32 = 124;

/// Largest mip chain a 32 bit dimension can have.
pub const MAX_MIP_COUNT: u32 = 32;

/// Largest texture array the D3D11 format allows.
pub const MAX_ARRAY_SIZE: u32 = 2048;

const FOURCC_DX10: [u8; 4] = *b"DX10";

/// A DXGI format code as stored in the DX10 header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DxgiFormat(pub u32);

impl DxgiFormat {
    pub const UNKNOWN: Self = Self(0);
    pub const R8G8B8A8_UNORM: Self = Self(28);
    pub const BC1_UNORM: Self = Self(71);
    pub const BC2_UNORM: Self = Self(74);
    pub const BC3_UNORM: Self = Self(77);
    pub const BC4_UNORM: Self = Self(80);
    pub const BC5_UNORM: Self = Self(83);
    pub const BC7_UNORM: Self = Self(98);

    /// Block layout of this format.
    ///
    /// Returns [`Error::UnsupportedPixelFormat`] for formats this tool cannot
    /// place into a surface.
    pub fn info(self) -> Result<FormatInfo> {
        let (block_side, bits_per_pixel) = match self {
            Self::R8G8B8A8_UNORM => (1, 32),
            Self::BC1_UNORM | Self::BC4_UNORM => (4, 4),
            Self::BC2_UNORM | Self::BC3_UNORM | Self::BC5_UNORM | Self::BC7_UNORM => (4, 8),
            _ => return Err(Error::UnsupportedPixelFormat(self.0)),
        };
        Ok(FormatInfo {
            block_side,
            bits_per_pixel,
        })
    }

    /// Map a legacy FourCC to its DXGI equivalent.
    pub fn from_fourcc(fourcc: [u8; 4]) -> Result<Self> {
        match &fourcc {
            b"DXT1" => Ok(Self::BC1_UNORM),
            b"DXT2" | b"DXT3" => Ok(Self::BC2_UNORM),
            b"DXT4" | b"DXT5" => Ok(Self::BC3_UNORM),
            b"ATI1" => Ok(Self::BC4_UNORM),
            b"ATI2" => Ok(Self::BC5_UNORM),
            _ => Err(Error::UnsupportedFourCc(fourcc)),
        }
    }
}

/// Block geometry of a pixel format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FormatInfo {
    /// Side length of one block in pixels (1 for uncompressed formats).
    pub block_side: u32,
    /// Bits per pixel.
    pub bits_per_pixel: u32,
}

impl FormatInfo {
    /// Bytes occupied by one block.
    pub fn bytes_per_block(&self) -> u32 {
        self.bits_per_pixel * self.block_side * self.block_side / 8
    }

    /// Number of blocks needed to cover `pixels`.
    pub fn blocks(&self, pixels: u32) -> u32 {
        pixels.div_ceil(self.block_side)
    }

    /// Byte size of a linear `width` x `height` surface, saturating at
    /// `usize::MAX`.
    pub fn surface_size(&self, width: u32, height: u32) -> usize {
        (self.blocks(width) as usize)
            .saturating_mul(self.blocks(height) as usize)
            .saturating_mul(self.bytes_per_block() as usize)
    }
}

/// The DDS pixel format block.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DdsPixelFormat {
    pub size: u32,
    pub flags: u32,
    pub fourcc: [u8; 4],
    pub rgb_bit_count: u32,
    pub r_bit_mask: u32,
    pub g_bit_mask: u32,
    pub b_bit_mask: u32,
    pub a_bit_mask: u32,
}

/// The 124 byte DDS header.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DdsHeader {
    pub size: u32,
    pub flags: u32,
    pub height: u32,
    pub width: u32,
    pub pitch_or_linear_size: u32,
    pub depth: u32,
    pub mipmap_count: u32,
    pub pixel_format: DdsPixelFormat,
    pub caps: u32,
    pub caps2: u32,
    pub caps3: u32,
    pub caps4: u32,
}

/// The DX10 extended header.
///
/// For legacy files only `dxgi_format` is filled in, from the FourCC.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DdsHeaderDx10 {
    pub dxgi_format: u32,
    pub resource_dimension: u32,
    pub misc_flag: u32,
    pub array_size: u32,
    pub misc_flags2: u32,
}

/// A decoded DDS file.
#[derive(Debug, Clone)]
pub struct Dds {
    pub header: DdsHeader,
    pub dx10: DdsHeaderDx10,
    /// `surfaces[array_index][mip]`, each a linear block buffer.
    pub surfaces: Vec<Vec<Vec<u8>>>,
}

impl Dds {
    /// Read a DDS file from `r`, consuming the whole stream.
    pub fn read<R: Read>(r: &mut R) -> Result<Self> {
        magic(r, b"DDS ")?;
        let header = read_header(r)?;
        if header.size != HEADER_SIZE {
            return Err(Error::Parse("invalid DDS header size"));
        }

        let dx10 = if header.pixel_format.fourcc == FOURCC_DX10 {
            DdsHeaderDx10 {
                dxgi_format: le_u32(r)?,
                resource_dimension: le_u32(r)?,
                misc_flag: le_u32(r)?,
                array_size: le_u32(r)?,
                misc_flags2: le_u32(r)?,
            }
        } else {
            DdsHeaderDx10 {
                dxgi_format: DxgiFormat::from_fourcc(header.pixel_format.fourcc)?.0,
                ..Default::default()
            }
        };

        let info = DxgiFormat(dx10.dxgi_format).info()?;
        let array_size = dx10.array_size.max(1);
        let mip_count = header.mipmap_count.max(1);
        if mip_count > MAX_MIP_COUNT {
            return Err(Error::Parse("too many DDS mip levels"));
        }
        if array_size > MAX_ARRAY_SIZE {
            return Err(Error::Parse("DDS array too large"));
        }

        let mut surfaces = Vec::new();
        for _ in 0..array_size {
            let mut mips = Vec::new();
            for level in 0..mip_count {
                let (width, height) = mip_dimensions(header.width, header.height, level);
                mips.push(bytesv(r, info.surface_size(width, height))?);
            }
            surfaces.push(mips);
        }

        let mut extra = [0u8; 1];
        if r.read(&mut extra)? != 0 {
            return Err(Error::Parse("unexpected data after DDS surfaces"));
        }

        Ok(Self {
            header,
            dx10,
            surfaces,
        })
    }

    /// Parse a DDS file held in memory.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let mut r = data;
        Self::read(&mut r)
    }

    /// The resolved pixel format.
    pub fn format(&self) -> DxgiFormat {
        DxgiFormat(self.dx10.dxgi_format)
    }

    /// Mip chain of the first array surface.
    pub fn mips(&self) -> &[Vec<u8>] {
        self.surfaces.first().map(Vec::as_slice).unwrap_or(&[])
    }
}

fn read_header<R: Read>(r: &mut R) -> Result<DdsHeader> {
    let size = le_u32(r)?;
    let flags = le_u32(r)?;
    let height = le_u32(r)?;
    let width = le_u32(r)?;
    let pitch_or_linear_size = le_u32(r)?;
    let depth = le_u32(r)?;
    let mipmap_count = le_u32(r)?;
    let _reserved1 = bytesa::<44>(r)?;
    let pixel_format = DdsPixelFormat {
        size: le_u32(r)?,
        flags: le_u32(r)?,
        fourcc: bytesa::<4>(r)?,
        rgb_bit_count: le_u32(r)?,
        r_bit_mask: le_u32(r)?,
        g_bit_mask: le_u32(r)?,
        b_bit_mask: le_u32(r)?,
        a_bit_mask: le_u32(r)?,
    };
    let caps = le_u32(r)?;
    let caps2 = le_u32(r)?;
    let caps3 = le_u32(r)?;
    let caps4 = le_u32(r)?;
    let _reserved2 = le_u32(r)?;

    Ok(DdsHeader {
        size,
        flags,
        height,
        width,
        pitch_or_linear_size,
        depth,
        mipmap_count,
        pixel_format,
        caps,
        caps2,
        caps3,
        caps4,
    })
}

/// Serialise a DDS file. Used by tests and tooling that produce fixtures.
pub fn write_dds(
    width: u32,
    height: u32,
    format: DxgiFormat,
    fourcc: [u8; 4],
    surfaces: &[Vec<Vec<u8>>],
) -> Vec<u8> {
    let mip_count = surfaces.first().map(Vec::len).unwrap_or(0) as u32;
    let mut out = Vec::new();
    let mut put = |v: u32| out.extend_from_slice(&v.to_le_bytes());
    // magic, then the 124 byte header
    put(u32::from_le_bytes(*b"DDS "));
    put(HEADER_SIZE);
    put(0x000A_1007);
    put(height);
    put(width);
    put(0);
    put(1);
    put(mip_count);
    for _ in 0..11 {
        put(0);
    }
    put(32);
    put(0x4);
    put(u32::from_le_bytes(fourcc));
    for _ in 0..5 {
        put(0);
    }
    put(0x1000);
    for _ in 0..4 {
        put(0);
    }
    if fourcc == FOURCC_DX10 {
        put(format.0);
        put(3);
        put(0);
        put(surfaces.len() as u32);
        put(0);
    }
    for mip in surfaces.iter().flatten() {
        out.extend_from_slice(mip);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn chain(info: FormatInfo, width: u32, height: u32, mips: u32) -> Vec<Vec<u8>> {
        (0..mips)
            .map(|level| {
                let size = info.surface_size((width >> level).max(1), (height >> level).max(1));
                vec![level as u8 + 1; size]
            })
            .collect()
    }

    #[rstest]
    #[case(*b"DXT1", DxgiFormat::BC1_UNORM)]
    #[case(*b"DXT2", DxgiFormat::BC2_UNORM)]
    #[case(*b"DXT3", DxgiFormat::BC2_UNORM)]
    #[case(*b"DXT4", DxgiFormat::BC3_UNORM)]
    #[case(*b"DXT5", DxgiFormat::BC3_UNORM)]
    #[case(*b"ATI1", DxgiFormat::BC4_UNORM)]
    #[case(*b"ATI2", DxgiFormat::BC5_UNORM)]
    fn legacy_fourcc_maps_to_dxgi(#[case] fourcc: [u8; 4], #[case] expected: DxgiFormat) {
        let info = expected.info().unwrap();
        let surfaces = vec![chain(info, 8, 8, 2)];
        let data = write_dds(8, 8, expected, fourcc, &surfaces);
        let dds = Dds::parse(&data).unwrap();
        assert_eq!(dds.format(), expected);
        assert_eq!(dds.surfaces, surfaces);
    }

    #[test]
    fn reads_dx10_mip_chain_with_block_aligned_sizes() {
        let info = DxgiFormat::BC7_UNORM.info().unwrap();
        let surfaces = vec![chain(info, 16, 8, 5)];
        let data = write_dds(16, 8, DxgiFormat::BC7_UNORM, FOURCC_DX10, &surfaces);
        let dds = Dds::parse(&data).unwrap();
        let sizes: Vec<usize> = dds.mips().iter().map(Vec::len).collect();
        // 16x8, 8x4, 4x2, 2x1, 1x1 -> blocks floored at one
        assert_eq!(sizes, [128, 32, 16, 16, 16]);
        assert_eq!(dds.header.width, 16);
        assert_eq!(dds.header.mipmap_count, 5);
    }

    #[test]
    fn reads_every_array_surface() {
        let info = DxgiFormat::BC1_UNORM.info().unwrap();
        let surfaces = vec![chain(info, 8, 8, 2), chain(info, 8, 8, 2)];
        let data = write_dds(8, 8, DxgiFormat::BC1_UNORM, FOURCC_DX10, &surfaces);
        assert_eq!(Dds::parse(&data).unwrap().surfaces.len(), 2);
    }

    #[test]
    fn rejects_trailing_data() {
        let info = DxgiFormat::BC1_UNORM.info().unwrap();
        let mut data = write_dds(8, 8, DxgiFormat::BC1_UNORM, *b"DXT1", &[chain(info, 8, 8, 1)]);
        data.push(0);
        assert!(matches!(Dds::parse(&data), Err(Error::Parse(_))));
    }

    #[test]
    fn rejects_short_mip_data() {
        let info = DxgiFormat::BC1_UNORM.info().unwrap();
        let mut data = write_dds(8, 8, DxgiFormat::BC1_UNORM, *b"DXT1", &[chain(info, 8, 8, 2)]);
        data.pop();
        assert!(matches!(Dds::parse(&data), Err(Error::UnexpectedEof)));
    }

    #[test]
    fn rejects_unknown_formats() {
        let data = write_dds(4, 4, DxgiFormat(2), FOURCC_DX10, &[vec![vec![0; 64]]]);
        assert!(matches!(
            Dds::parse(&data),
            Err(Error::UnsupportedPixelFormat(2))
        ));
        let data = write_dds(4, 4, DxgiFormat::UNKNOWN, *b"RGBG", &[vec![vec![0; 8]]]);
        assert!(matches!(Dds::parse(&data), Err(Error::UnsupportedFourCc(_))));
    }

    #[test]
    fn rejects_mip_chain_longer_than_a_dimension_allows() {
        let data = write_dds(1, 1, DxgiFormat::BC1_UNORM, FOURCC_DX10, &[vec![vec![0; 8]; 33]]);
        assert!(matches!(Dds::parse(&data), Err(Error::Parse(_))));

        let data = write_dds(1, 1, DxgiFormat::BC1_UNORM, FOURCC_DX10, &[vec![vec![0; 8]; 32]]);
        assert_eq!(Dds::parse(&data).unwrap().mips().len(), 32);
    }

    #[rstest]
    #[case::over_the_limit(MAX_ARRAY_SIZE + 1)]
    #[case::all_bits_set(u32::MAX)]
    fn rejects_oversized_arrays(#[case] array_size: u32) {
        let mut data = write_dds(4, 4, DxgiFormat::BC1_UNORM, FOURCC_DX10, &[vec![vec![0; 8]]]);
        // DX10 array size
        data[140..144].copy_from_slice(&array_size.to_le_bytes());
        assert!(matches!(Dds::parse(&data), Err(Error::Parse(_))));
    }

    #[test]
    fn huge_dimensions_fail_at_end_of_data() {
        let mut data = write_dds(4, 4, DxgiFormat::R8G8B8A8_UNORM, FOURCC_DX10, &[vec![vec![0; 64]]]);
        // height and width
        data[12..20].copy_from_slice(&[0xFF; 8]);
        assert!(matches!(Dds::parse(&data), Err(Error::UnexpectedEof)));
    }

    #[test]
    fn short_array_fails_at_end_of_data() {
        let mut data = write_dds(4, 4, DxgiFormat::BC1_UNORM, FOURCC_DX10, &[vec![vec![0; 8]]]);
        data[140..144].copy_from_slice(&MAX_ARRAY_SIZE.to_le_bytes());
        assert!(matches!(Dds::parse(&data), Err(Error::UnexpectedEof)));
    }

    #[test]
    fn rejects_bad_magic_and_header_size() {
        let mut data = write_dds(4, 4, DxgiFormat::BC1_UNORM, *b"DXT1", &[vec![vec![0; 8]]]);
        data[4] = 100;
        assert!(matches!(Dds::parse(&data), Err(Error::Parse(_))));
        data[0] = b'X';
        assert!(matches!(Dds::parse(&data), Err(Error::BadMagic)));
    }
}
