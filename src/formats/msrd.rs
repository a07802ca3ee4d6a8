//! MSRD - model resource container (`.wismt`).
//!
//! An MSRD bundles a set of XBC1-compressed blobs ("slots") behind a metadata
//! region whose tables address regions inside those blobs. The same metadata
//! region is mirrored into the companion MXMD file (see
//! [`crate::formats::mxmd`]), so any change to it must be written to both.
//!
//! ## Layout
//! ```text
//! [0x00] MSRD header   (0x10 bytes)
//! [MetadataOffset]
//!        Metadata      (MetadataSize bytes, tables addressed relative to it)
//! [...]  Slots         (XBC1 blobs, each zero padded to 16 bytes)
//! ```
//!
//! ## MSRD Header (0x10 bytes)
//! ```text
//! [0x00] Magic "DRSM"                       (u32 LE, reads as 'MSRD')
//! [0x04] Version                            (u32 LE)
//! [0x08] MetadataSize                       (u32 LE)
//! [0x0C] MetadataOffset                     (u32 LE)
//! ```
//!
//! ## Meta Header (0x40 bytes, at metadata + 0)
//! ```text
//! [0x00] Tag                                (u32 LE)
//! [0x04] Revision                           (u32 LE)
//! [0x08] DataItemsCount                     (u32 LE)
//! [0x0C] DataItemsOffset                    (u32 LE)
//! [0x10] FileCount                          (u32 LE)
//! [0x14] FileTableOffset                    (u32 LE)
//! [0x18] Unknown                            (0x1C bytes)
//! [0x34] TextureIdsCount                    (u32 LE)
//! [0x38] TextureIdsOffset                   (u32 LE)
//! [0x3C] TextureInfoHeaderOffset            (u32 LE)
//! ```
//!
//! ## Data Item (0x14 bytes)
//! ```text
//! [0x00] Offset                             (u32 LE)
//! [0x04] Size                               (u32 LE)
//! [0x08] FileIndexPlusOne                   (u16 LE)
//! [0x0A] Kind                               (u16 LE)
//! [0x0C] Unknown                            (8 bytes)
//! ```
//!
//! ## File Item (0x0C bytes)
//! ```text
//! [0x00] CompressedSize                     (u32 LE)
//! [0x04] UncompressedSize                   (u32 LE)
//! [0x08] Offset (absolute in the MSRD)      (u32 LE)
//! ```
//!
//! ## Texture Ids
//! `TextureIdsCount` x `u16 LE`. The texture with id `ids[i]` keeps its
//! full-size mip 0 in slot `2 + i`.
//!
//! ## Texture Info Header (0x10 bytes) and Texture Info (0x10 bytes each)
//! ```text
//! [0x00] TextureCount                       (u32 LE)
//! [0x04] InfosOffset (rel. to this header)  (u32 LE)
//! [0x08] Unknown                            (u32 LE)
//! [0x0C] StringsOffset                      (u32 LE)
//!
//! [0x00] Unknown (usage)                    (u32 LE)
//! [0x04] CacheSize                          (u32 LE)
//! [0x08] CacheOffset (rel. to cache item)   (u32 LE)
//! [0x0C] NameOffset                         (u32 LE)
//! ```
//!
//! ## Slot roles
//! * Slot 0 holds the texture cache: the smallest mips of every texture,
//!   addressed by the texture info table relative to the `TextureCache` item.
//! * Slot 1 holds the joint mips: the remaining mips of every texture with a
//!   texture id, addressed by the `Texture` data items.
//! * Slots 2.. hold one swizzled mip 0 per texture id.
//!
//! The metadata region never changes size. Tables are rewritten in place at
//! their original offsets.

use std::collections::HashSet;
use std::io::{Cursor, Read, Seek, SeekFrom, Write};

use crate::formats::xbc1::{self, Xbc1Header, Xbc1Name};
use crate::utils::{
    bytesv, get_array, get_u16, get_u32, le_u32, len_u32, put_bytes, put_u16, put_u32, range,
};
use crate::{Error, Result};

/// Magic value of the MSRD header, `DRSM` on disk.
pub const MAGIC: u32 = u32::from_be_bytes(*b"MSRD");

pub const HEADER_SIZE: usize = 0x10;
pub const META_HEADER_SIZE: usize = 0x40;
pub const DATA_ITEM_SIZE: usize = 0x14;
pub const FILE_ITEM_SIZE: usize = 0x0C;
pub const TEXTURE_ID_SIZE: usize = 0x02;
pub const TEXTURE_INFO_HEADER_SIZE: usize = 0x10;
pub const TEXTURE_INFO_SIZE: usize = 0x10;

/// Alignment of every slot in the file.
pub const FILE_ALIGN: usize = 0x10;

/// Slot holding the texture cache.
pub const SLOT_TEXTURE_CACHE: usize = 0;
/// Slot holding the joint mips.
pub const SLOT_JOINT_MIPS: usize = 1;
/// First per-texture slot.
pub const SLOT_TEXTURE_START: usize = 2;

/// MSRD file header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsrdHeader {
    pub version: u32,
    pub metadata_size: u32,
    pub metadata_offset: u32,
}

/// Fixed header at the start of the metadata region.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetaHeader {
    pub tag: u32,
    pub revision: u32,
    pub data_items_count: u32,
    pub data_items_offset: u32,
    pub file_count: u32,
    pub file_table_offset: u32,
    pub unk1: [u8; 0x1C],
    pub texture_ids_count: u32,
    pub texture_ids_offset: u32,
    pub texture_info_header_offset: u32,
}

/// What a data item's region contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataItemKind {
    Model,
    ShaderBundle,
    TextureCache,
    Texture,
    /// A kind this tool does not interpret; written back unchanged.
    Unknown(u16),
}

impl From<u16> for DataItemKind {
    fn from(v: u16) -> Self {
        match v {
            0 => Self::Model,
            1 => Self::ShaderBundle,
            2 => Self::TextureCache,
            3 => Self::Texture,
            n => Self::Unknown(n),
        }
    }
}

impl From<DataItemKind> for u16 {
    fn from(kind: DataItemKind) -> Self {
        match kind {
            DataItemKind::Model => 0,
            DataItemKind::ShaderBundle => 1,
            DataItemKind::TextureCache => 2,
            DataItemKind::Texture => 3,
            DataItemKind::Unknown(n) => n,
        }
    }
}

/// A typed region inside a slot's decompressed payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataItem {
    pub offset: u32,
    pub size: u32,
    /// Owning slot index plus one.
    pub file_index_plus_one: u16,
    pub kind: DataItemKind,
    pub unk: [u8; 8],
}

/// Location of one slot in the container file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileItem {
    pub compressed_size: u32,
    pub uncompressed_size: u32,
    pub offset: u32,
}

/// Header of the texture info table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureInfoHeader {
    pub texture_count: u32,
    pub infos_offset: u32,
    pub unk: u32,
    pub strings_offset: u32,
}

/// Where one texture's cache surface lives inside the texture cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextureInfo {
    pub unk: u32,
    pub cache_size: u32,
    pub cache_offset: u32,
    pub name_offset: u32,
}

/// A parsed MSRD container held fully in memory.
#[derive(Debug, Clone)]
pub struct Msrd {
    pub header: MsrdHeader,
    metadata: Vec<u8>,
    pub meta_header: MetaHeader,
    data_items: Vec<DataItem>,
    texture_ids: Vec<u16>,
    pub texture_info_header: TextureInfoHeader,
    texture_infos: Vec<TextureInfo>,
    slots: Vec<Vec<u8>>,
    /// Decompressed size of each slot, kept in step with `slots`.
    uncompressed_sizes: Vec<u32>,
}

impl Msrd {
    /// Parse an MSRD container from `r`.
    ///
    /// The stream must start at the MSRD magic. Slot contents are read from
    /// the absolute offsets recorded in the file table.
    pub fn parse<R: Read + Seek>(r: &mut R) -> Result<Self> {
        if le_u32(r)? != MAGIC {
            return Err(Error::BadMagic);
        }
        let header = MsrdHeader {
            version: le_u32(r)?,
            metadata_size: le_u32(r)?,
            metadata_offset: le_u32(r)?,
        };

        r.seek(SeekFrom::Start(header.metadata_offset as u64))?;
        let metadata = bytesv(r, header.metadata_size as usize)?;

        let meta_header = read_meta_header(&metadata)?;

        let data_items = (0..meta_header.data_items_count as usize)
            .map(|i| {
                read_data_item(
                    &metadata,
                    meta_header.data_items_offset as usize + i * DATA_ITEM_SIZE,
                )
            })
            .collect::<Result<Vec<_>>>()?;

        let file_items = (0..meta_header.file_count as usize)
            .map(|i| {
                read_file_item(
                    &metadata,
                    meta_header.file_table_offset as usize + i * FILE_ITEM_SIZE,
                )
            })
            .collect::<Result<Vec<_>>>()?;

        let texture_ids = (0..meta_header.texture_ids_count as usize)
            .map(|i| {
                get_u16(
                    &metadata,
                    meta_header.texture_ids_offset as usize + i * TEXTURE_ID_SIZE,
                )
            })
            .collect::<Result<Vec<_>>>()?;

        let mut seen = HashSet::with_capacity(texture_ids.len());
        if !texture_ids.iter().all(|id| seen.insert(*id)) {
            return Err(Error::Parse("duplicate texture id"));
        }
        if !texture_ids.is_empty() && SLOT_TEXTURE_START + texture_ids.len() > file_items.len() {
            return Err(Error::Parse("more texture ids than texture slots"));
        }

        let info_base = meta_header.texture_info_header_offset as usize;
        let texture_info_header = read_texture_info_header(&metadata, info_base)?;
        let infos_base = info_base + texture_info_header.infos_offset as usize;
        let texture_infos = (0..texture_info_header.texture_count as usize)
            .map(|i| read_texture_info(&metadata, infos_base + i * TEXTURE_INFO_SIZE))
            .collect::<Result<Vec<_>>>()?;

        let mut slots = Vec::with_capacity(file_items.len());
        for item in &file_items {
            r.seek(SeekFrom::Start(item.offset as u64))?;
            slots.push(bytesv(r, item.compressed_size as usize)?);
        }
        let uncompressed_sizes = file_items.iter().map(|item| item.uncompressed_size).collect();

        Ok(Self {
            header,
            metadata,
            meta_header,
            data_items,
            texture_ids,
            texture_info_header,
            texture_infos,
            slots,
            uncompressed_sizes,
        })
    }

    /// Parse an MSRD container held in memory.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::parse(&mut Cursor::new(data))
    }

    /// Write the container to `w`.
    ///
    /// The file table is recomputed from the current slots; every other
    /// table is rewritten at its original offset inside the metadata region.
    /// Slots that were never replaced keep their recorded decompressed size,
    /// so their headers are not read again.
    pub fn write<W: Write>(&self, w: &mut W) -> Result<()> {
        let metadata = self.metadata_bytes()?;
        let metadata_offset = self.header.metadata_offset as usize;
        if metadata_offset < HEADER_SIZE {
            return Err(Error::Parse("metadata overlaps the MSRD header"));
        }

        w.write_all(&MAGIC.to_le_bytes())?;
        w.write_all(&self.header.version.to_le_bytes())?;
        w.write_all(&self.header.metadata_size.to_le_bytes())?;
        w.write_all(&self.header.metadata_offset.to_le_bytes())?;
        w.write_all(&vec![0u8; metadata_offset - HEADER_SIZE])?;
        w.write_all(&metadata)?;
        for slot in &self.slots {
            w.write_all(slot)?;
            w.write_all(&vec![0u8; padding(slot.len())])?;
        }
        Ok(())
    }

    /// Serialise the container into a new buffer.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        self.write(&mut out)?;
        Ok(out)
    }

    /// The metadata region with every table re-embedded.
    ///
    /// This is also the block copied into the companion MXMD file. Fails with
    /// [`Error::InvalidRange`] if a table would overflow the region.
    pub fn metadata_bytes(&self) -> Result<Vec<u8>> {
        let mut metadata = self.metadata.clone();
        let meta = &self.meta_header;

        write_meta_header(&mut metadata, meta)?;

        for (i, item) in self.data_items.iter().enumerate() {
            write_data_item(
                &mut metadata,
                meta.data_items_offset as usize + i * DATA_ITEM_SIZE,
                item,
            )?;
        }

        let mut file_offset =
            self.header.metadata_offset as usize + self.header.metadata_size as usize;
        let sizes = self.slots.iter().zip(&self.uncompressed_sizes);
        for (i, (slot, &uncompressed_size)) in sizes.enumerate() {
            let stored_size = slot.len() + padding(slot.len());
            let item = FileItem {
                compressed_size: len_u32(stored_size)?,
                uncompressed_size,
                offset: len_u32(file_offset)?,
            };
            write_file_item(
                &mut metadata,
                meta.file_table_offset as usize + i * FILE_ITEM_SIZE,
                &item,
            )?;
            file_offset += stored_size;
        }

        for (i, id) in self.texture_ids.iter().enumerate() {
            put_u16(
                &mut metadata,
                meta.texture_ids_offset as usize + i * TEXTURE_ID_SIZE,
                *id,
            )?;
        }

        let info_base = meta.texture_info_header_offset as usize;
        write_texture_info_header(&mut metadata, info_base, &self.texture_info_header)?;
        let infos_base = info_base + self.texture_info_header.infos_offset as usize;
        for (i, info) in self.texture_infos.iter().enumerate() {
            write_texture_info(&mut metadata, infos_base + i * TEXTURE_INFO_SIZE, info)?;
        }

        Ok(metadata)
    }

    /// Number of slots in the container.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Raw (compressed) bytes of slot `index`.
    pub fn slot(&self, index: usize) -> Option<&[u8]> {
        self.slots.get(index).map(Vec::as_slice)
    }

    /// Embedded XBC1 name of slot `index`.
    pub fn slot_name(&self, index: usize) -> Result<Xbc1Name> {
        let slot = self.slots.get(index).ok_or(Error::OutOfRange {
            index,
            len: self.slots.len(),
        })?;
        Ok(Xbc1Header::parse(slot)?.name)
    }

    /// Replace slot `index` wholesale with an XBC1 blob.
    ///
    /// The blob's header must be readable; its decompressed size goes into
    /// the file table. The blob is zero padded to [`FILE_ALIGN`].
    pub fn replace_slot(&mut self, index: usize, mut blob: Vec<u8>) -> Result<()> {
        let len = self.slots.len();
        if index >= len {
            return Err(Error::OutOfRange { index, len });
        }
        let header = Xbc1Header::parse(&blob)?;
        blob.resize(blob.len() + padding(blob.len()), 0);
        self.slots[index] = blob;
        self.uncompressed_sizes[index] = header.uncompressed_size;
        Ok(())
    }

    /// All data items in table order.
    pub fn data_items(&self) -> &[DataItem] {
        &self.data_items
    }

    /// Texture ids in table order.
    pub fn texture_ids(&self) -> &[u16] {
        &self.texture_ids
    }

    /// Texture info entries, one per texture.
    pub fn texture_infos(&self) -> &[TextureInfo] {
        &self.texture_infos
    }

    /// Number of textures declared by the texture info header.
    pub fn texture_count(&self) -> usize {
        self.texture_infos.len()
    }

    /// Slot holding the full-size mip 0 of `texture_id`, if it has one.
    pub fn texture_slot(&self, texture_id: u16) -> Option<usize> {
        self.texture_ids
            .iter()
            .position(|&id| id == texture_id)
            .map(|i| SLOT_TEXTURE_START + i)
    }

    /// Cache surfaces of every texture, in texture info order.
    pub fn get_cached_textures(&self) -> Result<Vec<Vec<u8>>> {
        let cache = &self.data_items[self.texture_cache_item()?];
        let (_, payload) = xbc1::decompress(self.required_slot(SLOT_TEXTURE_CACHE)?)?;

        self.texture_infos
            .iter()
            .map(|info| {
                let start = cache.offset as usize + info.cache_offset as usize;
                range(&payload, start, info.cache_size as usize).map(<[u8]>::to_vec)
            })
            .collect()
    }

    /// Replace the cache surfaces of every texture.
    ///
    /// The cache region must be the tail of slot 0's payload; it is rebuilt
    /// by concatenating `surfaces` and the texture info table is updated to
    /// match.
    pub fn set_cached_textures(&mut self, surfaces: &[Vec<u8>]) -> Result<()> {
        if surfaces.len() != self.texture_infos.len() {
            return Err(Error::Parse("cached texture count mismatch"));
        }
        let item_index = self.texture_cache_item()?;
        let cache = &self.data_items[item_index];
        let (header, mut payload) = xbc1::decompress(self.required_slot(SLOT_TEXTURE_CACHE)?)?;

        let start = cache.offset as usize;
        if start + cache.size as usize != payload.len() {
            return Err(Error::Parse("texture cache is not at the end of its file"));
        }
        payload.truncate(start);

        let mut placements = Vec::with_capacity(surfaces.len());
        let mut cache_offset = 0usize;
        for surface in surfaces {
            placements.push((len_u32(cache_offset)?, len_u32(surface.len())?));
            payload.extend_from_slice(surface);
            cache_offset += surface.len();
        }
        let cache_size = len_u32(cache_offset)?;
        let blob = xbc1::compress(header.name, &payload)?;

        for (info, (offset, size)) in self.texture_infos.iter_mut().zip(placements) {
            info.cache_offset = offset;
            info.cache_size = size;
        }
        self.data_items[item_index].size = cache_size;
        self.replace_slot(SLOT_TEXTURE_CACHE, blob)
    }

    /// Joint mip surfaces of every texture with an id.
    ///
    /// `mips[i]` belongs to the texture in slot `2 + i`, which is the order
    /// [`Msrd::set_split_mips`] expects.
    pub fn get_split_mips(&self) -> Result<Vec<Vec<u8>>> {
        let (_, payload) = xbc1::decompress(self.required_slot(SLOT_JOINT_MIPS)?)?;

        let mut mips = vec![None; self.texture_ids.len()];
        for item in self.data_items.iter().filter(|item| item.kind == DataItemKind::Texture) {
            let index = texture_index(item, mips.len())?;
            if mips[index].is_some() {
                return Err(Error::Parse("texture slot has more than one joint mip item"));
            }
            mips[index] = Some(range(&payload, item.offset as usize, item.size as usize)?.to_vec());
        }

        mips.into_iter()
            .map(|mip| mip.ok_or(Error::Parse("texture slot has no joint mip item")))
            .collect()
    }

    /// Replace the joint mips.
    ///
    /// `surfaces[i]` belongs to the texture in slot `2 + i`. Each `Texture`
    /// data item is pointed at its surface inside the rebuilt slot 1.
    pub fn set_split_mips(&mut self, surfaces: &[Vec<u8>]) -> Result<()> {
        if surfaces.len() != self.texture_ids.len() {
            return Err(Error::Parse("joint mip count mismatch"));
        }

        let mut payload = Vec::with_capacity(surfaces.iter().map(Vec::len).sum());
        let mut offsets = Vec::with_capacity(surfaces.len());
        for surface in surfaces {
            offsets.push(len_u32(payload.len())?);
            payload.extend_from_slice(surface);
        }

        let mut updates = Vec::new();
        for (i, item) in self.data_items.iter().enumerate() {
            if item.kind != DataItemKind::Texture {
                continue;
            }
            let t = texture_index(item, surfaces.len())?;
            updates.push((i, offsets[t], len_u32(surfaces[t].len())?));
        }

        let name = self.slot_name(SLOT_JOINT_MIPS)?;
        let blob = xbc1::compress(name, &payload)?;
        self.replace_slot(SLOT_JOINT_MIPS, blob)?;

        for (i, offset, size) in updates {
            self.data_items[i].offset = offset;
            self.data_items[i].size = size;
        }
        Ok(())
    }

    fn texture_cache_item(&self) -> Result<usize> {
        let mut caches = self
            .data_items
            .iter()
            .enumerate()
            .filter(|(_, item)| item.kind == DataItemKind::TextureCache)
            .map(|(i, _)| i);
        match (caches.next(), caches.next()) {
            (Some(i), None) => Ok(i),
            _ => Err(Error::Parse("expected exactly one texture cache item")),
        }
    }

    fn required_slot(&self, index: usize) -> Result<&[u8]> {
        self.slot(index).ok_or(Error::OutOfRange {
            index,
            len: self.slots.len(),
        })
    }
}

/// Position of a `Texture` item's owning slot in the texture id table.
fn texture_index(item: &DataItem, texture_count: usize) -> Result<usize> {
    (item.file_index_plus_one as usize)
        .checked_sub(1 + SLOT_TEXTURE_START)
        .filter(|&i| i < texture_count)
        .ok_or(Error::OutOfRange {
            index: item.file_index_plus_one as usize,
            len: texture_count,
        })
}

/// Bytes of zero padding after a slot of `len` bytes.
fn padding(len: usize) -> usize {
    len.next_multiple_of(FILE_ALIGN) - len
}

fn read_meta_header(m: &[u8]) -> Result<MetaHeader> {
    Ok(MetaHeader {
        tag: get_u32(m, 0x00)?,
        revision: get_u32(m, 0x04)?,
        data_items_count: get_u32(m, 0x08)?,
        data_items_offset: get_u32(m, 0x0C)?,
        file_count: get_u32(m, 0x10)?,
        file_table_offset: get_u32(m, 0x14)?,
        unk1: get_array::<0x1C>(m, 0x18)?,
        texture_ids_count: get_u32(m, 0x34)?,
        texture_ids_offset: get_u32(m, 0x38)?,
        texture_info_header_offset: get_u32(m, 0x3C)?,
    })
}

fn write_meta_header(m: &mut [u8], h: &MetaHeader) -> Result<()> {
    put_u32(m, 0x00, h.tag)?;
    put_u32(m, 0x04, h.revision)?;
    put_u32(m, 0x08, h.data_items_count)?;
    put_u32(m, 0x0C, h.data_items_offset)?;
    put_u32(m, 0x10, h.file_count)?;
    put_u32(m, 0x14, h.file_table_offset)?;
    put_bytes(m, 0x18, &h.unk1)?;
    put_u32(m, 0x34, h.texture_ids_count)?;
    put_u32(m, 0x38, h.texture_ids_offset)?;
    put_u32(m, 0x3C, h.texture_info_header_offset)
}

fn read_data_item(m: &[u8], at: usize) -> Result<DataItem> {
    Ok(DataItem {
        offset: get_u32(m, at)?,
        size: get_u32(m, at + 0x04)?,
        file_index_plus_one: get_u16(m, at + 0x08)?,
        kind: DataItemKind::from(get_u16(m, at + 0x0A)?),
        unk: get_array::<8>(m, at + 0x0C)?,
    })
}

fn write_data_item(m: &mut [u8], at: usize, item: &DataItem) -> Result<()> {
    put_u32(m, at, item.offset)?;
    put_u32(m, at + 0x04, item.size)?;
    put_u16(m, at + 0x08, item.file_index_plus_one)?;
    put_u16(m, at + 0x0A, item.kind.into())?;
    put_bytes(m, at + 0x0C, &item.unk)
}

fn read_file_item(m: &[u8], at: usize) -> Result<FileItem> {
    Ok(FileItem {
        compressed_size: get_u32(m, at)?,
        uncompressed_size: get_u32(m, at + 0x04)?,
        offset: get_u32(m, at + 0x08)?,
    })
}

fn write_file_item(m: &mut [u8], at: usize, item: &FileItem) -> Result<()> {
    put_u32(m, at, item.compressed_size)?;
    put_u32(m, at + 0x04, item.uncompressed_size)?;
    put_u32(m, at + 0x08, item.offset)
}

fn read_texture_info_header(m: &[u8], at: usize) -> Result<TextureInfoHeader> {
    Ok(TextureInfoHeader {
        texture_count: get_u32(m, at)?,
        infos_offset: get_u32(m, at + 0x04)?,
        unk: get_u32(m, at + 0x08)?,
        strings_offset: get_u32(m, at + 0x0C)?,
    })
}

fn write_texture_info_header(m: &mut [u8], at: usize, h: &TextureInfoHeader) -> Result<()> {
    put_u32(m, at, h.texture_count)?;
    put_u32(m, at + 0x04, h.infos_offset)?;
    put_u32(m, at + 0x08, h.unk)?;
    put_u32(m, at + 0x0C, h.strings_offset)
}

fn read_texture_info(m: &[u8], at: usize) -> Result<TextureInfo> {
    Ok(TextureInfo {
        unk: get_u32(m, at)?,
        cache_size: get_u32(m, at + 0x04)?,
        cache_offset: get_u32(m, at + 0x08)?,
        name_offset: get_u32(m, at + 0x0C)?,
    })
}

fn write_texture_info(m: &mut [u8], at: usize, info: &TextureInfo) -> Result<()> {
    put_u32(m, at, info.unk)?;
    put_u32(m, at + 0x04, info.cache_size)?;
    put_u32(m, at + 0x08, info.cache_offset)?;
    put_u32(m, at + 0x0C, info.name_offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn data_item_kind_round_trips_unknown_values() {
        for raw in [0u16, 1, 2, 3, 9] {
            assert_eq!(u16::from(DataItemKind::from(raw)), raw);
        }
        assert_eq!(DataItemKind::from(9), DataItemKind::Unknown(9));
    }

    #[test]
    fn data_item_record_layout() {
        let mut m = vec![0u8; 0x20];
        let item = DataItem {
            offset: 0x1000,
            size: 0x200,
            file_index_plus_one: 3,
            kind: DataItemKind::Texture,
            unk: [1, 2, 3, 4, 5, 6, 7, 8],
        };
        write_data_item(&mut m, 4, &item).unwrap();
        assert_eq!(&m[4..12], &[0x00, 0x10, 0, 0, 0x00, 0x02, 0, 0]);
        assert_eq!(&m[12..16], &[3, 0, 3, 0]);
        assert_eq!(read_data_item(&m, 4).unwrap(), item);
    }

    #[test]
    fn table_writes_past_region_fail() {
        let mut m = vec![0u8; 0x10];
        let info = TextureInfo {
            unk: 0,
            cache_size: 1,
            cache_offset: 2,
            name_offset: 3,
        };
        assert!(matches!(
            write_texture_info(&mut m, 4, &info),
            Err(Error::InvalidRange)
        ));
    }

    #[test]
    fn slot_padding_rounds_to_alignment() {
        assert_eq!(padding(0), 0);
        assert_eq!(padding(1), 15);
        assert_eq!(padding(16), 0);
        assert_eq!(padding(0x31), 15);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut data = vec![0u8; 0x40];
        data[..4].copy_from_slice(b"MSRD");
        assert!(matches!(Msrd::from_bytes(&data), Err(Error::BadMagic)));
    }

    #[rstest]
    #[case::short(0x100)]
    #[case::beyond_any_file(u32::MAX)]
    fn rejects_truncated_metadata(#[case] metadata_size: u32) {
        let mut data = Vec::new();
        data.extend_from_slice(&MAGIC.to_le_bytes());
        data.extend_from_slice(&1u32.to_le_bytes());
        data.extend_from_slice(&metadata_size.to_le_bytes());
        data.extend_from_slice(&0x10u32.to_le_bytes());
        data.extend_from_slice(&[0u8; 0x20]);
        assert!(matches!(Msrd::from_bytes(&data), Err(Error::UnexpectedEof)));
    }
}
