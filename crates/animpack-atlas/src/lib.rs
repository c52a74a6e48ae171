//! Sprite Animation Atlas Packer
//!
//! This crate packs a directory of sprite animation frames into a single
//! texture atlas plus a plain-text metadata file describing where every frame
//! landed. Optionally the atlas is palettized to 256 colors and stored as
//! palette indices alongside the palette image.
//!
//! # Features
//!
//! - **Discovery**: Subdirectories become animations, loose frames become
//!   single-frame animations, in a fixed traversal order
//! - **Layout**: Grid chosen to keep the atlas as close to square as possible,
//!   with optional power-of-two dimensions
//! - **Palettization**: Base palette reuse or deterministic median-cut palette
//! - **Change Detection**: Content hash stored in the metadata file; unchanged
//!   atlases are not rewritten
//!
//! # Example
//!
//! ```no_run
//! use animpack_atlas::{pack_atlas, PackRequest, PackStatus};
//!
//! let request = PackRequest::new("anims_src/Hero", "anims");
//! let report = pack_atlas(&request).unwrap();
//! if report.status == PackStatus::Written {
//!     println!("{} -> {} sprites", report.name, report.num_sprites);
//! }
//! ```
//!
//! # Determinism
//!
//! - Same source files = byte-identical atlas, palette and metadata
//! - Directory traversal is sorted, never filesystem order
//! - PNG encoding uses fixed compression settings
//! - File timestamps never affect the output

pub mod change;
pub mod compositor;
pub mod discovery;
pub mod error;
pub mod layout;
pub mod metadata;
pub mod palette;
pub mod pipeline;
pub mod png;
pub mod settings;

// Re-export main types for convenience
pub use change::{content_hash, ATLAS_FORMAT_VERSION};
pub use compositor::{composite, CompositeResult, PlacedFrames};
pub use discovery::{discover_frames, load_frames, Animation, DiscoveredFrames, LoadedFrames};
pub use error::{AtlasError, AtlasResult};
pub use layout::{AtlasLayout, GridDims};
pub use metadata::render_metadata;
pub use palette::{derive_palette, palettize, Palette, PalettizeResult};
pub use pipeline::{
    build_atlas, finish_atlas, normalize_path, pack_atlas, write_atlas, AtlasBuild, PackReport,
    PackRequest, PackStatus, DEFAULT_OUTPUT_DIR,
};
pub use png::{PngConfig, PngError};
pub use settings::{parse_settings, AtlasConfig, AtlasSettings};
