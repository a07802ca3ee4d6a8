//! Block-linear swizzling for Tegra X1 surfaces.
//!
//! Compressed blocks are stored in GOBs (groups of bytes) 64 bytes wide and 8
//! block rows tall; GOBs are stacked vertically into block columns whose height
//! depends on the surface height. The shift applied to the horizontal GOB index
//! is `3 + n`, where `n` counts which of the bits `8, 16, 32, 64` are set in
//! `height_in_blocks - 1`.
//!
//! The offset formula is kept bit-for-bit as reverse engineered. Surfaces
//! written with any other layout load without error and render as garbage, so
//! changes here are compatibility regressions.
//!
//! Only the forward (linear to tiled) direction is needed to write textures.

use crate::formats::dds::DxgiFormat;
use crate::{Error, Result};

/// Swizzle a linear surface given in block units.
///
/// `data` holds `width_blocks * height_blocks` blocks of `bytes_per_block`
/// bytes in row-major order. Returns a buffer of the same length in
/// block-linear order. Fails with [`Error::InvalidRange`] if `data` is too
/// short or a block would land outside the buffer.
pub fn swizzle_blocks(
    data: &[u8],
    width_blocks: u32,
    height_blocks: u32,
    bytes_per_block: u32,
) -> Result<Vec<u8>> {
    let block = bytes_per_block as usize;
    let needed = width_blocks as usize * height_blocks as usize * block;
    if data.len() < needed {
        return Err(Error::InvalidRange);
    }

    let x_shift = x_bits_shift(height_blocks);
    let row_bytes = width_blocks * bytes_per_block;

    let mut swizzled = vec![0u8; data.len()];
    let mut src = 0usize;
    for y in 0..height_blocks {
        for x in 0..width_blocks {
            let x_raw = x * bytes_per_block;
            let dst = (((y & 0xff80) * row_bytes)
                | ((y & 0x78) << 6)
                | ((y & 6) << 5)
                | ((y & 1) << 4)
                | ((x_raw & 0xffc0) << x_shift)
                | ((x_raw & 0x20) << 3)
                | ((x_raw & 0x10) << 1)
                | (x_raw & 0xf)) as usize;

            let target = swizzled
                .get_mut(dst..dst + block)
                .ok_or(Error::InvalidRange)?;
            target.copy_from_slice(&data[src..src + block]);
            src += block;
        }
    }

    Ok(swizzled)
}

/// Swizzle a linear surface of `width` x `height` pixels in `format`.
pub fn swizzle_surface(data: &[u8], width: u32, height: u32, format: DxgiFormat) -> Result<Vec<u8>> {
    let info = format.info()?;
    swizzle_blocks(
        data,
        info.blocks(width),
        info.blocks(height),
        info.bytes_per_block(),
    )
}

fn x_bits_shift(height_blocks: u32) -> u32 {
    let mut shift = 3;
    for i in 0..4 {
        if (height_blocks.wrapping_sub(1) & (8 << i)) != 0 {
            shift += 1;
        }
    }
    shift
}
