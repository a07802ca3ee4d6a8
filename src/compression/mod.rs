//! Compression and decompression helpers.
//!
//! Every blob stored inside an MSRD container is a zlib stream wrapped in an
//! `xbc1` header (see [`crate::formats::xbc1`]). This module holds the raw
//! stream primitives; the wrapper format lives with the other formats.
//!
//! ## Submodules
//!
//! | Module | Algorithm | Typical use in retex |
//! |--------|-----------|----------------------|
//! | [`zlib`] | zlib (deflate) | `xbc1` payloads |

pub mod zlib;
