//! One atlas build, from source directory to output files.
//!
//! [`build_atlas`] reads the source directory and computes everything in
//! memory. [`pack_atlas`] then compares the content hash with the existing
//! metadata file and writes the outputs only when it differs. The metadata
//! file, which carries the hash, is written last.

use std::fs;
use std::path::{Component, Path, PathBuf};

use image::RgbaImage;
use serde::Serialize;

use crate::change::{content_hash, is_unchanged};
use crate::compositor::{composite, PlacedFrames};
use crate::discovery::{discover_frames, load_frames, Animation};
use crate::error::{AtlasError, AtlasResult};
use crate::layout::{AtlasLayout, GridDims};
use crate::metadata::{render_metadata, with_hash_header};
use crate::palette::{load_base_palette, palettize, PalettizeResult, BASE_PALETTE_FILE_NAME};
use crate::png::{write_rgba, PngConfig};
use crate::settings::{read_settings, AtlasSettings};

/// Default directory for generated atlases.
pub const DEFAULT_OUTPUT_DIR: &str = "anims";

/// Suffix of the generated palette image, after the atlas name.
pub const PALETTE_SUFFIX: &str = "_Palette_Base";

/// Inputs of one atlas build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackRequest {
    /// Atlas name, used for output file names and the `name` metadata line.
    pub name: String,
    /// Atlas source directory.
    pub source_dir: PathBuf,
    /// Directory receiving the output files.
    pub output_dir: PathBuf,
}

impl PackRequest {
    /// Request named after the source directory's final component.
    ///
    /// The source path is normalized first, so `Hero/Walk/..` is named `Hero`.
    /// A path with no final component (such as `/`) gives an empty name,
    /// which [`build_atlas`] rejects.
    pub fn new(source_dir: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        let source_dir = normalize_path(&source_dir.into());
        let name = source_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            name,
            source_dir,
            output_dir: output_dir.into(),
        }
    }

    /// `<out>/<name>.png`
    pub fn atlas_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}.png", self.name))
    }

    /// `<out>/<name>_Palette_Base.png`
    pub fn palette_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}{}.png", self.name, PALETTE_SUFFIX))
    }

    /// `<out>/<name>.txt`
    pub fn metadata_path(&self) -> PathBuf {
        self.output_dir.join(format!("{}.txt", self.name))
    }

    /// `<src>/Palette_Base.png`
    pub fn base_palette_path(&self) -> PathBuf {
        self.source_dir.join(BASE_PALETTE_FILE_NAME)
    }
}

/// Lexically clean a path: drop `.` components and fold `..` into the
/// preceding normal component. Leading `..` of a relative path are kept.
pub fn normalize_path(path: &Path) -> PathBuf {
    let mut cleaned = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match cleaned.components().next_back() {
                Some(Component::Normal(_)) => {
                    cleaned.pop();
                }
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => cleaned.push(".."),
            },
            other => cleaned.push(other.as_os_str()),
        }
    }
    cleaned
}

fn check_name(request: &PackRequest) -> AtlasResult<()> {
    if request.name.is_empty() {
        return Err(AtlasError::UnnamedAtlas {
            path: request.source_dir.clone(),
        });
    }
    Ok(())
}

/// Everything computed for one atlas before any file is written.
#[derive(Debug, Clone)]
pub struct AtlasBuild {
    pub settings: AtlasSettings,
    pub layout: AtlasLayout,
    pub placed: PlacedFrames,
    /// Source frame paths in atlas index order.
    pub frame_paths: Vec<PathBuf>,
    /// Final atlas pixels: composited RGBA, or palette indices when palettized.
    pub image: RgbaImage,
    /// Palettization output, when enabled.
    pub palette: Option<PalettizeResult>,
    /// Whether the palette came from the source directory's base palette.
    pub reused_base_palette: bool,
    /// Metadata body, without the hash line.
    pub metadata: String,
    /// Content hash, lowercase hex.
    pub hash: String,
}

/// Outcome of a pack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PackStatus {
    /// Output files were (re)written.
    Written,
    /// The stored hash matched; nothing was written.
    Unchanged,
}

/// Summary of one atlas build.
#[derive(Debug, Clone, Serialize)]
pub struct PackReport {
    pub name: String,
    pub hash: String,
    pub num_sprites: u32,
    pub num_animations: usize,
    pub dims_image: (u32, u32),
    pub dims_frame: (u32, u32),
    pub dims_grid: GridDims,
    pub palettized: bool,
    pub animations: Vec<Animation<u32>>,
    pub status: PackStatus,
    /// Files written by this build. Empty when unchanged.
    pub files: Vec<PathBuf>,
}

impl PackReport {
    fn new(request: &PackRequest, build: &AtlasBuild, status: PackStatus, files: Vec<PathBuf>) -> Self {
        Self {
            name: request.name.clone(),
            hash: build.hash.clone(),
            num_sprites: build.placed.total_frames() as u32,
            num_animations: build.placed.animations.len(),
            dims_image: build.layout.image_dims,
            dims_frame: build.layout.frame_dims,
            dims_grid: build.layout.grid,
            palettized: build.palette.is_some(),
            animations: build.placed.animations.clone(),
            status,
            files,
        }
    }
}

/// Read an atlas source directory and compute its outputs in memory.
pub fn build_atlas(request: &PackRequest) -> AtlasResult<AtlasBuild> {
    check_name(request)?;

    let discovered = discover_frames(&request.source_dir)?;
    let settings = read_settings(&request.source_dir)?;
    let frames = load_frames(&discovered)?;

    let sprite_dims = frames.sprite_dims().ok_or(AtlasError::NoFrames)?;
    let layout = AtlasLayout::compute(frames.total_images(), sprite_dims, &settings.config)?;
    let composited = composite(&frames, &layout);
    let frame_paths = frames
        .animations
        .iter()
        .flat_map(|anim| anim.frames.iter().map(|frame| frame.path.clone()))
        .collect();

    let (image, palette, reused_base_palette) = if settings.config.palettize {
        let base = load_base_palette(&request.source_dir)?;
        let reused = base.is_some();
        let result = palettize(&composited.image, base.as_ref());
        (result.indexed.clone(), Some(result), reused)
    } else {
        (composited.image, None, false)
    };

    let metadata = render_metadata(&request.name, &layout, &settings, &composited.placed);
    let hash = content_hash(
        &metadata,
        &image,
        palette.as_ref().map(|p| &p.palette_image),
    );

    Ok(AtlasBuild {
        settings,
        layout,
        placed: composited.placed,
        frame_paths,
        image,
        palette,
        reused_base_palette,
        metadata,
        hash,
    })
}

fn create_output_dir(dir: &Path) -> AtlasResult<()> {
    fs::create_dir_all(dir).map_err(|e| AtlasError::io(dir, e))
}

/// Write the outputs of a build. Returns the written paths, metadata last.
pub fn write_atlas(request: &PackRequest, build: &AtlasBuild) -> AtlasResult<Vec<PathBuf>> {
    check_name(request)?;

    let config = PngConfig::default();
    let mut files = Vec::new();

    create_output_dir(&request.output_dir)?;

    let atlas_path = request.atlas_path();
    write_rgba(&build.image, &atlas_path, &config)?;
    files.push(atlas_path);

    if let Some(palette) = &build.palette {
        let palette_path = request.palette_path();
        write_rgba(&palette.palette_image, &palette_path, &config)?;
        files.push(palette_path);

        // Seed the source directory so later builds keep the same indices.
        if !build.reused_base_palette {
            let base_path = request.base_palette_path();
            if !base_path.exists() {
                write_rgba(&palette.palette_image, &base_path, &config)?;
                files.push(base_path);
            }
        }
    }

    let metadata_path = request.metadata_path();
    let document = with_hash_header(&build.hash, &build.metadata);
    fs::write(&metadata_path, document).map_err(|e| AtlasError::io(&metadata_path, e))?;
    files.push(metadata_path);

    Ok(files)
}

/// Write a computed build unless the stored hash already matches.
pub fn finish_atlas(request: &PackRequest, build: &AtlasBuild) -> AtlasResult<PackReport> {
    if is_unchanged(&request.metadata_path(), &build.hash)? {
        return Ok(PackReport::new(request, build, PackStatus::Unchanged, Vec::new()));
    }

    let files = write_atlas(request, build)?;
    Ok(PackReport::new(request, build, PackStatus::Written, files))
}

/// Build one atlas and write it unless the stored hash already matches.
pub fn pack_atlas(request: &PackRequest) -> AtlasResult<PackReport> {
    let build = build_atlas(request)?;
    finish_atlas(request, &build)
}
