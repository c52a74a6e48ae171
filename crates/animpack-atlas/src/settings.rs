//! Atlas settings read from the free-form `_meta.txt` file.
//!
//! The file is plain text. Recognized tags (`padding`, `power_of_two`,
//! `framerate`, `palettize`) are each followed by a decimal integer and may
//! appear anywhere, in any letter case. The first occurrence of a tag wins.
//! The whole text is kept verbatim and re-emitted into the atlas metadata.

use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::{AtlasError, AtlasResult};

/// Name of the settings file inside an atlas source directory.
pub const SETTINGS_FILE_NAME: &str = "_meta.txt";

/// Default border around each frame, in pixels.
pub const DEFAULT_PADDING: u32 = 1;

/// Default animation frame rate.
pub const DEFAULT_FRAME_RATE: u32 = 30;

const TAG_PATTERN: &str = r"(?i)(padding|power_of_two|framerate|palettize)[ \t]+(\d+)";

static TAG_REGEX: OnceLock<Regex> = OnceLock::new();

fn tag_regex() -> &'static Regex {
    TAG_REGEX.get_or_init(|| Regex::new(TAG_PATTERN).expect("invalid regex pattern"))
}

/// Effective packing configuration for one atlas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtlasConfig {
    /// Transparent border around each frame cell.
    pub padding: u32,
    /// Round each image axis up to a power of two.
    pub power_of_two: bool,
    /// Playback rate written into the metadata.
    pub frame_rate: u32,
    /// Convert the atlas to palette indices.
    pub palettize: bool,
}

impl Default for AtlasConfig {
    fn default() -> Self {
        Self {
            padding: DEFAULT_PADDING,
            power_of_two: false,
            frame_rate: DEFAULT_FRAME_RATE,
            palettize: false,
        }
    }
}

/// Which tags were present in the settings text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExplicitSettings {
    pub padding: bool,
    pub power_of_two: bool,
    pub frame_rate: bool,
    pub palettize: bool,
}

/// Parsed settings plus the source text they came from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AtlasSettings {
    pub config: AtlasConfig,
    pub explicit: ExplicitSettings,
    /// The settings file contents, verbatim. Empty when there is no file.
    pub source_text: String,
}

/// Read `_meta.txt` from an atlas source directory. A missing file yields defaults.
pub fn read_settings(atlas_dir: &Path) -> AtlasResult<AtlasSettings> {
    let path = atlas_dir.join(SETTINGS_FILE_NAME);
    let text = match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(AtlasError::io(path, e)),
    };
    parse_settings(text)
}

/// Parse settings text.
pub fn parse_settings(text: impl Into<String>) -> AtlasResult<AtlasSettings> {
    let text = text.into();
    let mut padding = None;
    let mut power_of_two = None;
    let mut frame_rate = None;
    let mut palettize = None;

    for caps in tag_regex().captures_iter(&text) {
        let tag = caps[1].to_ascii_lowercase();
        let (slot, name): (&mut Option<u32>, &'static str) = match tag.as_str() {
            "padding" => (&mut padding, "padding"),
            "power_of_two" => (&mut power_of_two, "power_of_two"),
            "framerate" => (&mut frame_rate, "framerate"),
            _ => (&mut palettize, "palettize"),
        };
        if slot.is_some() {
            continue;
        }
        let raw = &caps[2];
        let value = raw.parse::<u32>().map_err(|_| AtlasError::InvalidSetting {
            tag: name,
            value: raw.to_string(),
        })?;
        *slot = Some(value);
    }

    let explicit = ExplicitSettings {
        padding: padding.is_some(),
        power_of_two: power_of_two.is_some(),
        frame_rate: frame_rate.is_some(),
        palettize: palettize.is_some(),
    };
    let config = AtlasConfig {
        padding: padding.unwrap_or(DEFAULT_PADDING),
        power_of_two: power_of_two.is_some_and(|v| v != 0),
        frame_rate: frame_rate.unwrap_or(DEFAULT_FRAME_RATE),
        palettize: palettize.is_some_and(|v| v != 0),
    };

    Ok(AtlasSettings {
        config,
        explicit,
        source_text: text,
    })
}
