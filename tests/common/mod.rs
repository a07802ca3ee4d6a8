//! Builders for small but structurally complete MSRD/MXMD pairs.

#![allow(dead_code)]

use retex::formats::dds::{DxgiFormat, write_dds};
use retex::formats::mibl;
use retex::formats::msrd::{self, DataItemKind};
use retex::formats::xbc1::{self, Xbc1Name};

pub const METADATA_OFFSET: usize = msrd::HEADER_SIZE;
pub const COMPANION_METADATA_OFFSET: usize = 0x80;
const MODEL_DATA: &[u8] = &[0x5A; 0x40];

/// BC1 mip chain for a `width` x `height` texture, filled with `seed + level`.
pub fn bc1_mips(width: u32, height: u32, mip_count: u32, seed: u8) -> Vec<Vec<u8>> {
    let info = DxgiFormat::BC1_UNORM.info().unwrap();
    (0..mip_count)
        .map(|level| {
            let (w, h) = mibl::mip_dimensions(width, height, level);
            vec![seed.wrapping_add(level as u8); info.surface_size(w, h)]
        })
        .collect()
}

pub fn bc1_dds(width: u32, height: u32, mip_count: u32, seed: u8) -> Vec<u8> {
    let mips = bc1_mips(width, height, mip_count, seed);
    write_dds(width, height, DxgiFormat::BC1_UNORM, *b"DX10", &[mips])
}

/// A 32x32 single mip cache surface.
pub fn cache_mibl(seed: u8) -> Vec<u8> {
    mibl::encode(&bc1_mips(32, 32, 1, seed), 32, 32, DxgiFormat::BC1_UNORM, 0).unwrap()
}

/// Joint mips of a 128x128 texture.
pub fn joint_mibl(seed: u8) -> Vec<u8> {
    mibl::encode(&bc1_mips(128, 128, 4, seed), 128, 128, DxgiFormat::BC1_UNORM, 1).unwrap()
}

/// Description of a container to build.
pub struct Fixture {
    /// One cache surface per texture.
    pub caches: Vec<Vec<u8>>,
    /// Texture ids owning slots `2..`.
    pub texture_ids: Vec<u16>,
    /// Joint mips per texture id, in texture id order.
    pub joints: Vec<Vec<u8>>,
    /// Raw mip 0 payload per texture id.
    pub base_mips: Vec<Vec<u8>>,
    /// Number of `TextureCache` data items, all describing the same region.
    pub cache_items: usize,
    /// Bytes following the cache region in slot 0.
    pub trailing: Vec<u8>,
}

impl Fixture {
    /// `texture_count` textures, the ones in `texture_ids` owning slots.
    pub fn new(texture_count: usize, texture_ids: &[u16]) -> Self {
        Self {
            caches: (0..texture_count).map(|i| cache_mibl(i as u8)).collect(),
            texture_ids: texture_ids.to_vec(),
            joints: texture_ids.iter().map(|&id| joint_mibl(id as u8)).collect(),
            base_mips: texture_ids.iter().map(|&id| vec![id as u8; 0x200]).collect(),
            cache_items: 1,
            trailing: Vec::new(),
        }
    }

    fn slot_payloads(&self) -> Vec<(Xbc1Name, Vec<u8>)> {
        let mut slot0 = MODEL_DATA.to_vec();
        slot0.extend(self.caches.iter().flatten());
        slot0.extend_from_slice(&self.trailing);
        let mut slots = vec![
            (Xbc1Name::new("file0"), slot0),
            (Xbc1Name::new("mips"), self.joints.concat()),
        ];
        for (i, base) in self.base_mips.iter().enumerate() {
            slots.push((Xbc1Name::new(&format!("tex{i:02}")), base.clone()));
        }
        slots
    }

    /// Every slot as `(uncompressed size, XBC1 blob)`.
    pub fn build_blobs(&self) -> Vec<(usize, Vec<u8>)> {
        self.slot_payloads()
            .into_iter()
            .map(|(name, payload)| (payload.len(), xbc1::compress(name, &payload).unwrap()))
            .collect()
    }

    /// Serialise to an MSRD, with every slot compressed.
    pub fn build(&self) -> Vec<u8> {
        self.build_with_blobs(self.build_blobs())
    }

    /// Serialise to an MSRD using the given `(uncompressed size, blob)` slots.
    pub fn build_with_blobs(&self, blobs: Vec<(usize, Vec<u8>)>) -> Vec<u8> {
        let n_ids = self.texture_ids.len();
        let data_items_offset = msrd::META_HEADER_SIZE;
        let data_items_count = 1 + self.cache_items + n_ids;
        let file_table_offset = data_items_offset + data_items_count * msrd::DATA_ITEM_SIZE;
        let file_count = blobs.len();
        let texture_ids_offset = file_table_offset + file_count * msrd::FILE_ITEM_SIZE;
        let texture_info_header_offset =
            (texture_ids_offset + n_ids * msrd::TEXTURE_ID_SIZE).next_multiple_of(4);
        let infos_offset = msrd::TEXTURE_INFO_HEADER_SIZE;
        let strings_offset = infos_offset + self.caches.len() * msrd::TEXTURE_INFO_SIZE;
        let metadata_size = (texture_info_header_offset + strings_offset + 0x20).next_multiple_of(16);

        let mut m = vec![0u8; metadata_size];

        // meta header
        put(&mut m, 0x00, 0x1234);
        put(&mut m, 0x04, 7);
        put(&mut m, 0x08, data_items_count as u32);
        put(&mut m, 0x0C, data_items_offset as u32);
        put(&mut m, 0x10, file_count as u32);
        put(&mut m, 0x14, file_table_offset as u32);
        put(&mut m, 0x34, n_ids as u32);
        put(&mut m, 0x38, texture_ids_offset as u32);
        put(&mut m, 0x3C, texture_info_header_offset as u32);

        // data items
        let cache_size: usize = self.caches.iter().map(Vec::len).sum();
        let mut items = vec![(0, MODEL_DATA.len(), 1u16, DataItemKind::Model)];
        for _ in 0..self.cache_items {
            items.push((MODEL_DATA.len(), cache_size, 1, DataItemKind::TextureCache));
        }
        let mut joint_offset = 0;
        for (i, joint) in self.joints.iter().enumerate() {
            items.push((joint_offset, joint.len(), (3 + i) as u16, DataItemKind::Texture));
            joint_offset += joint.len();
        }
        for (i, (offset, size, file_index_plus_one, kind)) in items.into_iter().enumerate() {
            let at = data_items_offset + i * msrd::DATA_ITEM_SIZE;
            put(&mut m, at, offset as u32);
            put(&mut m, at + 4, size as u32);
            m[at + 8..at + 10].copy_from_slice(&file_index_plus_one.to_le_bytes());
            m[at + 10..at + 12].copy_from_slice(&u16::from(kind).to_le_bytes());
            put(&mut m, at + 12, 0xCAFE_0000 | i as u32);
        }

        // file table
        let mut file_offset = METADATA_OFFSET + metadata_size;
        let mut stored = Vec::new();
        for (i, (uncompressed_size, mut blob)) in blobs.into_iter().enumerate() {
            blob.resize(blob.len().next_multiple_of(msrd::FILE_ALIGN), 0);
            let at = file_table_offset + i * msrd::FILE_ITEM_SIZE;
            put(&mut m, at, blob.len() as u32);
            put(&mut m, at + 4, uncompressed_size as u32);
            put(&mut m, at + 8, file_offset as u32);
            file_offset += blob.len();
            stored.push(blob);
        }

        // texture ids and infos
        for (i, id) in self.texture_ids.iter().enumerate() {
            let at = texture_ids_offset + i * msrd::TEXTURE_ID_SIZE;
            m[at..at + 2].copy_from_slice(&id.to_le_bytes());
        }
        put(&mut m, texture_info_header_offset, self.caches.len() as u32);
        put(&mut m, texture_info_header_offset + 4, infos_offset as u32);
        put(&mut m, texture_info_header_offset + 8, 0xBEEF);
        put(&mut m, texture_info_header_offset + 12, strings_offset as u32);
        let mut cache_offset = 0;
        for (i, cache) in self.caches.iter().enumerate() {
            let at = texture_info_header_offset + infos_offset + i * msrd::TEXTURE_INFO_SIZE;
            put(&mut m, at, 0x1000 + i as u32);
            put(&mut m, at + 4, cache.len() as u32);
            put(&mut m, at + 8, cache_offset as u32);
            put(&mut m, at + 12, (i * 8) as u32);
            cache_offset += cache.len();
        }

        let mut out = Vec::new();
        out.extend_from_slice(b"DRSM");
        out.extend_from_slice(&10001u32.to_le_bytes());
        out.extend_from_slice(&(metadata_size as u32).to_le_bytes());
        out.extend_from_slice(&(METADATA_OFFSET as u32).to_le_bytes());
        out.extend_from_slice(&m);
        for blob in stored {
            out.extend_from_slice(&blob);
        }
        out
    }
}

fn put(m: &mut [u8], at: usize, v: u32) {
    m[at..at + 4].copy_from_slice(&v.to_le_bytes());
}

/// A companion with room for `metadata_size` bytes at
/// [`COMPANION_METADATA_OFFSET`]. Everything outside the header is `0xEE`.
pub fn companion(metadata_size: usize, uncached_textures_offset: u32) -> Vec<u8> {
    let mut data = vec![0xEEu8; COMPANION_METADATA_OFFSET + metadata_size + 0x40];
    data[0x00..0x04].copy_from_slice(b"DMXM");
    for (i, at) in (0x04..0x24).step_by(4).enumerate() {
        data[at..at + 4].copy_from_slice(&(0x100 * i as u32).to_le_bytes());
    }
    data[0x24..0x28].copy_from_slice(&uncached_textures_offset.to_le_bytes());
    data
}

/// Metadata size recorded in an MSRD header.
pub fn metadata_size(container: &[u8]) -> usize {
    u32::from_le_bytes(container[0x08..0x0C].try_into().unwrap()) as usize
}
