//! Low-level I/O primitives shared by all codecs.
//!
//! Two families live here:
//!
//! * **Stream readers** (`le_u32`, `bytesa`, ...) read exactly the bytes they
//!   promise from a [`Read`] or return an error - there is no partial-read
//!   ambiguity.
//! * **Slice accessors** (`get_u32`, `put_u32`, ...) address fixed offsets
//!   inside an in-memory region such as the MSRD metadata blob. Every access
//!   is bounds-checked and fails with [`Error::InvalidRange`].
//!
//! All multi-byte values are little-endian; the target platform is fixed.

use std::io::Read;

use crate::{Error, Result};

/// Read a little-endian `u32`.
#[inline]
pub(crate) fn le_u32<R: Read>(r: &mut R) -> Result<u32> {
    let mut b = [0u8; 4];
    r.read_exact(&mut b)?;
    Ok(u32::from_le_bytes(b))
}

/// Read exactly `N` bytes into a fixed-size array.
#[inline]
pub(crate) fn bytesa<const N: usize>(r: &mut impl Read) -> Result<[u8; N]> {
    let mut b = [0u8; N];
    r.read_exact(&mut b)?;
    Ok(b)
}

/// Read exactly `len` bytes into a `Vec`.
///
/// The buffer grows with the data actually read, so a `len` taken from an
/// untrusted header cannot allocate more than the stream holds.
#[inline]
pub(crate) fn bytesv<R: Read>(r: &mut R, len: usize) -> Result<Vec<u8>> {
    let mut b = Vec::new();
    r.by_ref().take(len as u64).read_to_end(&mut b)?;
    if b.len() != len {
        return Err(Error::UnexpectedEof);
    }
    Ok(b)
}

/// Verify that the next `N` bytes in the stream match `expected`.
///
/// Returns [`Error::BadMagic`] on mismatch.
#[inline]
pub(crate) fn magic<R: Read, const N: usize>(r: &mut R, expected: &[u8; N]) -> Result<()> {
    let got = bytesa::<N>(r)?;
    if &got != expected {
        return Err(Error::BadMagic);
    }
    Ok(())
}

/// Borrow `len` bytes at `offset`.
#[inline]
pub(crate) fn range(buf: &[u8], offset: usize, len: usize) -> Result<&[u8]> {
    let end = offset.checked_add(len).ok_or(Error::InvalidRange)?;
    buf.get(offset..end).ok_or(Error::InvalidRange)
}

/// Mutably borrow `len` bytes at `offset`.
#[inline]
pub(crate) fn range_mut(buf: &mut [u8], offset: usize, len: usize) -> Result<&mut [u8]> {
    let end = offset.checked_add(len).ok_or(Error::InvalidRange)?;
    buf.get_mut(offset..end).ok_or(Error::InvalidRange)
}

/// Read a little-endian `u16` at `offset`.
#[inline]
pub(crate) fn get_u16(buf: &[u8], offset: usize) -> Result<u16> {
    let b = range(buf, offset, 2)?;
    Ok(u16::from_le_bytes([b[0], b[1]]))
}

/// Read a little-endian `u32` at `offset`.
#[inline]
pub(crate) fn get_u32(buf: &[u8], offset: usize) -> Result<u32> {
    let b = range(buf, offset, 4)?;
    Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
}

/// Copy `N` bytes at `offset` into an array.
#[inline]
pub(crate) fn get_array<const N: usize>(buf: &[u8], offset: usize) -> Result<[u8; N]> {
    let mut out = [0u8; N];
    out.copy_from_slice(range(buf, offset, N)?);
    Ok(out)
}

/// Write a little-endian `u16` at `offset`.
#[inline]
pub(crate) fn put_u16(buf: &mut [u8], offset: usize, value: u16) -> Result<()> {
    range_mut(buf, offset, 2)?.copy_from_slice(&value.to_le_bytes());
    Ok(())
}

/// Write a little-endian `u32` at `offset`.
#[inline]
pub(crate) fn put_u32(buf: &mut [u8], offset: usize, value: u32) -> Result<()> {
    range_mut(buf, offset, 4)?.copy_from_slice(&value.to_le_bytes());
    Ok(())
}

/// Overwrite `bytes.len()` bytes at `offset`.
#[inline]
pub(crate) fn put_bytes(buf: &mut [u8], offset: usize, bytes: &[u8]) -> Result<()> {
    range_mut(buf, offset, bytes.len())?.copy_from_slice(bytes);
    Ok(())
}

/// Round `value` up to a multiple of `alignment` (a power of two).
#[inline]
pub(crate) const fn align(value: u32, alignment: u32) -> u32 {
    (value + alignment - 1) & !(alignment - 1)
}

/// Convert a length to the `u32` used by on-disk size fields.
#[inline]
pub(crate) fn len_u32(len: usize) -> Result<u32> {
    u32::try_from(len).map_err(|_| Error::InvalidRange)
}

/// Extract a null-terminated string from a fixed-size field.
///
/// Fields without a terminator are returned whole.
#[inline]
pub(crate) fn fixed_string(buf: &[u8]) -> String {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    String::from_utf8_lossy(&buf[..end]).into_owned()
}
