//! Codecs for the binary formats involved in a texture replacement.
//!
//! Each submodule targets one format. They share a few conventions:
//!
//! * **Whole-file readers** ([`msrd::Msrd`], [`dds::Dds`]) are generic over
//!   [`std::io::Read`] (plus [`std::io::Seek`] for MSRD) and also offer a
//!   slice constructor for data already in memory.
//! * **Blob codecs** ([`xbc1`], [`mibl`], [`mxmd`]) operate on byte slices,
//!   since their inputs are always fully buffered.
//! * **Bounds-checked writes** - tables are written back at fixed offsets
//!   through [`crate::utils`] accessors; nothing is ever written out of range
//!   or silently truncated.
//! * **Compression is separate** - [`xbc1`] wraps [`crate::compression`];
//!   the other codecs see decompressed bytes.
//!
//! ## Format overview
//!
//! | Module   | Format | Description |
//! |----------|--------|-------------|
//! | [`msrd`] | MSRD (`.wismt`) | Model resource container; metadata tables plus XBC1 slots |
//! | [`mxmd`] | MXMD (`.wimdo`) | Model metadata; embeds a copy of the MSRD metadata |
//! | [`xbc1`] | XBC1   | Single-file zlib wrapper used for every MSRD slot |
//! | [`mibl`] | MIBL   | Swizzled GPU surface with a trailing footer |
//! | [`dds`]  | DDS    | Source textures with linear mip chains |

pub mod dds;
pub mod mibl;
pub mod msrd;
pub mod mxmd;
pub mod xbc1;
