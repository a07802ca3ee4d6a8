//! **retex** - replace textures inside MSRD/MXMD model resource pairs.
//!
//! A model ships as an MSRD container (`.wismt`) holding compressed texture
//! surfaces and an MXMD file (`.wimdo`) that mirrors the MSRD's metadata
//! tables. [`replace::run`] swaps textures in from DDS files (or raw XBC1
//! blobs) and writes a consistent new pair.
//!
//! # Supported formats
//! | Module | Format |
//! |--------|--------|
//! | [`formats::msrd`] | MSRD - model resource container |
//! | [`formats::mxmd`] | MXMD - companion model metadata |
//! | [`formats::xbc1`] | XBC1 - zlib blob wrapper |
//! | [`formats::mibl`] | MIBL - swizzled GPU surface |
//! | [`formats::dds`]  | DDS - source textures |

pub mod compression;
pub mod error;
pub mod formats;
pub mod replace;
pub mod swizzle;
pub(crate) mod utils;

pub use error::{Error, Result};
