//! Frame discovery and loading.
//!
//! An atlas source directory holds either loose `.png` frames (each one a
//! single-frame animation named after the file stem) or subdirectories (each
//! one an animation whose frames are the `.png` files inside it). Entries
//! whose name contains `Palette_` are skipped.
//!
//! Traversal order is fixed: within every directory, subdirectories come
//! before files and each group is sorted by file name. The walk is depth
//! first, so frame indices are stable across platforms and runs.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use image::RgbaImage;
use serde::Serialize;
use walkdir::{DirEntry, WalkDir};

use crate::error::{AtlasError, AtlasResult};

/// File extension of frame images.
pub const FRAME_EXTENSION: &str = "png";

/// Entries whose name contains this marker are never treated as frames.
pub const EXCLUDE_MARKER: &str = "Palette_";

/// A named animation and its frames, in playback order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Animation<F> {
    /// Animation name (subdirectory name or loose file stem).
    pub name: String,
    /// Frames in discovery order.
    pub frames: Vec<F>,
}

impl<F> Animation<F> {
    /// Create an animation with no frames.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            frames: Vec::new(),
        }
    }
}

/// Frame paths grouped by animation, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveredFrames {
    pub animations: Vec<Animation<PathBuf>>,
}

impl DiscoveredFrames {
    /// Total number of frame references across all animations.
    pub fn total_frames(&self) -> usize {
        self.animations.iter().map(|a| a.frames.len()).sum()
    }

    fn insert(&mut self, name: String) -> AtlasResult<&mut Animation<PathBuf>> {
        if self.animations.iter().any(|a| a.name == name) {
            return Err(AtlasError::DuplicateAnimation { name });
        }
        self.animations.push(Animation::new(name));
        let last = self.animations.len() - 1;
        Ok(&mut self.animations[last])
    }

    fn find_mut(&mut self, name: &str) -> Option<&mut Animation<PathBuf>> {
        self.animations.iter_mut().rev().find(|a| a.name == name)
    }
}

/// A decoded frame image.
#[derive(Debug, Clone)]
pub struct LoadedFrame {
    /// Source path.
    pub path: PathBuf,
    /// Decoded pixels.
    pub image: RgbaImage,
}

/// Decoded frames grouped by animation. All frames share one size.
#[derive(Debug, Clone, Default)]
pub struct LoadedFrames {
    pub animations: Vec<Animation<LoadedFrame>>,
    sprite_dims: Option<(u32, u32)>,
}

impl LoadedFrames {
    /// Common frame size, or `None` when no frame was loaded.
    pub fn sprite_dims(&self) -> Option<(u32, u32)> {
        self.sprite_dims
    }

    /// Total number of frames across all animations.
    pub fn total_images(&self) -> u32 {
        self.animations.iter().map(|a| a.frames.len() as u32).sum()
    }
}

fn is_excluded(entry: &DirEntry) -> bool {
    entry.file_name().to_string_lossy().contains(EXCLUDE_MARKER)
}

fn is_frame_file(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == FRAME_EXTENSION)
}

/// Directories first, then files, each by name.
fn traversal_order(a: &DirEntry, b: &DirEntry) -> Ordering {
    b.file_type()
        .is_dir()
        .cmp(&a.file_type().is_dir())
        .then_with(|| a.file_name().cmp(b.file_name()))
}

/// Walk an atlas source directory and collect frame paths by animation.
pub fn discover_frames(root: &Path) -> AtlasResult<DiscoveredFrames> {
    let mut discovered = DiscoveredFrames::default();

    let walker = WalkDir::new(root)
        .min_depth(1)
        .follow_links(true)
        .sort_by(traversal_order)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_excluded(e));

    for entry in walker {
        let entry = entry?;
        let path = entry.path();

        if entry.file_type().is_dir() {
            let name = entry.file_name().to_string_lossy().into_owned();
            discovered.insert(name)?;
            continue;
        }

        if !is_frame_file(path) {
            continue;
        }

        if entry.depth() == 1 {
            let stem = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            discovered.insert(stem)?.frames.push(path.to_path_buf());
        } else {
            let parent = path
                .parent()
                .and_then(Path::file_name)
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            // The parent directory was visited, and registered, before its files.
            if let Some(anim) = discovered.find_mut(&parent) {
                anim.frames.push(path.to_path_buf());
            }
        }
    }

    Ok(discovered)
}

/// Decode every discovered frame, checking that all frames share one size.
pub fn load_frames(discovered: &DiscoveredFrames) -> AtlasResult<LoadedFrames> {
    let mut sprite_dims: Option<(u32, u32)> = None;
    let mut animations = Vec::with_capacity(discovered.animations.len());

    for anim in &discovered.animations {
        let mut frames = Vec::with_capacity(anim.frames.len());
        for path in &anim.frames {
            let image = image::open(path)
                .map_err(|source| AtlasError::Decode {
                    path: path.clone(),
                    source,
                })?
                .to_rgba8();

            let dims = image.dimensions();
            match sprite_dims {
                None => sprite_dims = Some(dims),
                Some(expected) if expected != dims => {
                    return Err(AtlasError::DimensionMismatch {
                        path: path.clone(),
                        expected,
                        found: dims,
                    });
                }
                Some(_) => {}
            }

            frames.push(LoadedFrame {
                path: path.clone(),
                image,
            });
        }
        animations.push(Animation {
            name: anim.name.clone(),
            frames,
        });
    }

    Ok(LoadedFrames {
        animations,
        sprite_dims,
    })
}
