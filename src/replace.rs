//! Texture replacement pipeline.
//!
//! One run moves through five phases:
//!
//! 1. **Load** - parse the MSRD and its MXMD companion, extract the cache
//!    surfaces and joint mips.
//! 2. **Dispatch** - map every `<id>.<name>.dds` in the texture directory to
//!    a texture id, and every `<slot>.<name>` in the raw subdirectory to a
//!    slot index. Unusable names are skipped with a warning.
//! 3. **Collect** - each dispatched file is decoded and encoded on the rayon
//!    pool. Workers report through a channel sized to the task count;
//!    failures are logged and skipped.
//! 4. **Patch** - the collected surfaces are written back into the container.
//! 5. **Emit** - the container and the companion are serialised and written.
//!
//! Errors in Load, Patch and Emit abort the run. A run in which nothing was
//! replaced fails with [`Error::NoReplacementsApplied`] and writes nothing.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::mpsc::sync_channel;

use tracing::{debug, info, warn};

use crate::formats::dds::Dds;
use crate::formats::mibl::{self, MiblFooter};
use crate::formats::msrd::{Msrd, SLOT_TEXTURE_START};
use crate::formats::mxmd::Mxmd;
use crate::formats::xbc1::{self, Xbc1Name};
use crate::swizzle::swizzle_surface;
use crate::{Error, Result};

/// Default name of the raw blob subdirectory.
pub const DEFAULT_RAW_DIR: &str = "raw";

/// Default extension of the companion metadata file.
pub const DEFAULT_COMPANION_EXT: &str = "wimdo";

/// Separator between the numeric key and the rest of a file name.
const KEY_SEPARATOR: char = '.';

/// Inputs and outputs of one replacement run.
#[derive(Debug, Clone)]
pub struct ReplaceOptions {
    /// Container to read (`.wismt`).
    pub input: PathBuf,
    /// Directory holding `<id>.<name>.dds` files.
    pub texture_dir: PathBuf,
    /// Container to write.
    pub output: PathBuf,
    /// Subdirectory of `texture_dir` holding `<slot>.<name>` uncompressed
    /// payloads, each wrapped in a new XBC1 blob for its slot.
    pub raw_dir: String,
    /// Extension of the companion file next to `input` and `output`.
    pub companion_ext: String,
}

impl ReplaceOptions {
    pub fn new(
        input: impl Into<PathBuf>,
        texture_dir: impl Into<PathBuf>,
        output: impl Into<PathBuf>,
    ) -> Self {
        Self {
            input: input.into(),
            texture_dir: texture_dir.into(),
            output: output.into(),
            raw_dir: DEFAULT_RAW_DIR.to_owned(),
            companion_ext: DEFAULT_COMPANION_EXT.to_owned(),
        }
    }

    /// Companion file read alongside the input container.
    pub fn input_companion(&self) -> PathBuf {
        companion_path(&self.input, &self.companion_ext)
    }

    /// Companion file written alongside the output container.
    pub fn output_companion(&self) -> PathBuf {
        companion_path(&self.output, &self.companion_ext)
    }
}

/// Same-stem companion of `container`.
pub fn companion_path(container: &Path, ext: &str) -> PathBuf {
    container.with_extension(ext)
}

/// Full-size data produced for a texture that owns a slot.
#[derive(Debug)]
pub struct BaseMip {
    /// Slot receiving `blob`.
    pub slot: usize,
    /// XBC1 blob holding the swizzled mip 0.
    pub blob: Vec<u8>,
    /// MIBL holding mip 1 onward.
    pub joint: Vec<u8>,
}

/// Result of one successful task.
#[derive(Debug)]
pub enum Outcome {
    Texture {
        texture_id: u16,
        /// New cache surface (MIBL).
        cache: Vec<u8>,
        /// `None` for textures without a texture id entry.
        base: Option<BaseMip>,
    },
    Raw {
        slot: usize,
        blob: Vec<u8>,
    },
}

/// One unit of dispatched work.
#[derive(Debug)]
enum Task<'a> {
    Texture {
        path: PathBuf,
        texture_id: u16,
        /// Existing cache surface, used to size the new one.
        cache: &'a [u8],
        /// Target slot and the name of the blob it currently holds.
        slot: Option<(usize, Xbc1Name)>,
    },
    Raw {
        path: PathBuf,
        slot: usize,
        name: Xbc1Name,
    },
}

impl Task<'_> {
    fn path(&self) -> &Path {
        match self {
            Task::Texture { path, .. } | Task::Raw { path, .. } => path,
        }
    }

    fn run(&self) -> Result<Outcome> {
        match self {
            Task::Texture {
                path,
                texture_id,
                cache,
                slot,
            } => {
                let dds = Dds::read(&mut BufReader::new(File::open(path)?))?;
                let (cache, base) = encode_texture(&dds, cache, *slot)?;
                Ok(Outcome::Texture {
                    texture_id: *texture_id,
                    cache,
                    base,
                })
            }
            Task::Raw { path, slot, name } => {
                let payload = fs::read(path)?;
                Ok(Outcome::Raw {
                    slot: *slot,
                    blob: xbc1::compress(*name, &payload)?,
                })
            }
        }
    }
}

/// Message a worker sends back to the coordinator.
struct TaskReport {
    path: PathBuf,
    outcome: Result<Outcome>,
}

/// Run one replacement. Returns the number of files placed.
pub fn run(opts: &ReplaceOptions) -> Result<usize> {
    // Load
    info!("reading container {}", opts.input.display());
    let mut msrd = Msrd::parse(&mut BufReader::new(File::open(&opts.input)?))?;
    let mut cached = msrd.get_cached_textures()?;
    let mut split_mips = msrd.get_split_mips()?;

    let companion = opts.input_companion();
    info!("reading companion {}", companion.display());
    let mut mxmd = Mxmd::parse(fs::read(&companion)?)?;
    mxmd.uncached_textures_offset()?;

    // Dispatch
    info!("dispatching file reads");
    let tasks = dispatch(opts, &msrd, &cached)?;
    let task_count = tasks.len();
    debug!(task_count, "tasks dispatched");

    // Collect
    let (tx, rx) = sync_channel::<TaskReport>(task_count);
    rayon::scope(|s| {
        for task in &tasks {
            let tx = tx.clone();
            s.spawn(move |_| {
                let report = TaskReport {
                    path: task.path().to_path_buf(),
                    outcome: task.run(),
                };
                // The receiver outlives the scope.
                let _ = tx.send(report);
            });
        }
    });
    drop(tx);
    drop(tasks);

    let mut replaced = 0usize;
    for report in rx.iter().take(task_count) {
        let outcome = match report.outcome {
            Ok(outcome) => outcome,
            Err(e) if e.is_recoverable() => {
                warn!("skipped {}: {e}", report.path.display());
                continue;
            }
            Err(e) => return Err(e),
        };

        match outcome {
            Outcome::Texture {
                texture_id,
                cache,
                base,
            } => {
                cached[texture_id as usize] = cache;
                if let Some(base) = base {
                    split_mips[base.slot - SLOT_TEXTURE_START] = base.joint;
                    msrd.replace_slot(base.slot, base.blob)?;
                }
            }
            Outcome::Raw { slot, blob } => msrd.replace_slot(slot, blob)?,
        }
        replaced += 1;
        info!("placed {}", report.path.display());
    }

    if replaced == 0 {
        return Err(Error::NoReplacementsApplied);
    }

    // Patch
    info!("rebuilding texture cache and joint mips");
    msrd.set_cached_textures(&cached)?;
    msrd.set_split_mips(&split_mips)?;
    mxmd.patch_uncached_textures(&msrd.metadata_bytes()?)?;

    // Emit
    let container = msrd.to_bytes()?;
    info!("writing container {}", opts.output.display());
    fs::write(&opts.output, container)?;
    let companion = opts.output_companion();
    info!("writing companion {}", companion.display());
    fs::write(&companion, mxmd.as_bytes())?;

    info!("replaced {replaced} files");
    Ok(replaced)
}

/// Numeric key of a `<key>.<rest>` file name.
fn file_key(name: &str) -> Option<usize> {
    let (key, _) = name.split_once(KEY_SEPARATOR)?;
    key.parse().ok()
}

/// Regular files in `dir`, sorted by name.
fn list_files(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        files.push((entry.file_name().to_string_lossy().into_owned(), entry.path()));
    }
    files.sort();
    Ok(files)
}

fn dispatch<'a>(opts: &ReplaceOptions, msrd: &Msrd, cached: &'a [Vec<u8>]) -> Result<Vec<Task<'a>>> {
    let mut tasks = Vec::new();

    for (name, path) in list_files(&opts.texture_dir)? {
        let Some(key) = file_key(&name) else {
            warn!("skipping {name}: no id number found, expected <id>.<name>.dds");
            continue;
        };
        let Some(texture_id) = u16::try_from(key).ok().filter(|_| key < msrd.texture_count()) else {
            warn!("skipping {name}: id {key} is out of range");
            continue;
        };

        let slot = match msrd.texture_slot(texture_id) {
            Some(slot) => match msrd.slot_name(slot) {
                Ok(slot_name) => Some((slot, slot_name)),
                Err(e) => {
                    warn!("skipping {name}: {e}");
                    continue;
                }
            },
            None => None,
        };

        tasks.push(Task::Texture {
            path,
            texture_id,
            cache: &cached[texture_id as usize],
            slot,
        });
    }

    let raw_dir = opts.texture_dir.join(&opts.raw_dir);
    let raw_files = match list_files(&raw_dir) {
        Ok(files) => files,
        Err(e) => {
            debug!("no raw files read from {}: {e}", raw_dir.display());
            Vec::new()
        }
    };
    for (name, path) in raw_files {
        let Some(slot) = file_key(&name) else {
            warn!("skipping {name}: no slot index found, expected <slot>.<name>");
            continue;
        };
        if slot >= msrd.slot_count() {
            warn!("skipping {name}: slot {slot} is out of range");
            continue;
        }
        match msrd.slot_name(slot) {
            Ok(slot_name) => tasks.push(Task::Raw {
                path,
                slot,
                name: slot_name,
            }),
            Err(e) => warn!("skipping {name}: {e}"),
        }
    }

    Ok(tasks)
}

/// Encode a source texture against the existing cache surface.
///
/// Returns the new cache surface and, when `slot` is set, the compressed
/// mip 0 and joint mips for that slot.
fn encode_texture(
    dds: &Dds,
    cache: &[u8],
    slot: Option<(usize, Xbc1Name)>,
) -> Result<(Vec<u8>, Option<BaseMip>)> {
    let mips = dds.mips();
    if mips.len() <= 1 {
        return Err(Error::Parse("missing mipmaps"));
    }

    let (width, height) = (dds.header.width, dds.header.height);
    let format = dds.format();
    let footer = MiblFooter::parse(cache)?;
    if footer.width == 0 || footer.width > width || footer.height > height {
        return Err(Error::Parse("texture size mismatch"));
    }

    let level = (width / footer.width).ilog2();
    if height.checked_shr(level).unwrap_or(0) != footer.height {
        return Err(Error::Parse("texture ratio mismatch"));
    }

    let start = level as usize;
    let end = start + footer.mip_count as usize;
    let cache_mips = mips.get(start..end).ok_or(Error::OutOfRange {
        index: end,
        len: mips.len(),
    })?;
    let cache = mibl::encode(cache_mips, footer.width, footer.height, format, 0)?;

    let Some((slot, name)) = slot else {
        return Ok((cache, None));
    };

    let blob = xbc1::compress(name, &swizzle_surface(&mips[0], width, height, format)?)?;
    let joint = mibl::encode(mips, width, height, format, 1)?;
    Ok((cache, Some(BaseMip { slot, blob, joint })))
}
