//! Atlas palettization.
//!
//! Converts a composited RGBA atlas into palette indices. The palette is
//! either the atlas's base palette image (reused verbatim so indices stay
//! stable across rebuilds and atlases can share a palette) or derived from
//! the atlas with a deterministic median cut.
//!
//! The indexed result is stored as RGBA with every channel equal to the
//! index, next to a one-row palette image whose alpha channel carries the
//! per-index transparency.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use image::{Rgba, RgbaImage};

use crate::error::{AtlasError, AtlasResult};

/// Maximum palette size.
pub const NUM_COLORS: usize = 256;

/// Name of the optional base palette image inside an atlas source directory.
pub const BASE_PALETTE_FILE_NAME: &str = "Palette_Base.png";

/// Index reserved for fully transparent pixels in derived palettes.
pub const DERIVED_TRANSPARENT_INDEX: u8 = 0;

/// Per-index transparency reported by a quantizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transparency {
    /// One fully transparent index; every other index is opaque.
    Index(u8),
    /// Explicit alpha for each index. Missing entries are opaque.
    Table(Vec<u8>),
}

impl Transparency {
    /// Expand to a full alpha table of [`NUM_COLORS`] entries.
    pub fn alpha_table(&self) -> Vec<u8> {
        match self {
            Transparency::Index(index) => {
                let mut table = vec![u8::MAX; NUM_COLORS];
                table[*index as usize] = 0;
                table
            }
            Transparency::Table(alphas) => {
                let mut table = alphas.clone();
                table.resize(NUM_COLORS, u8::MAX);
                table
            }
        }
    }
}

/// Ordered RGBA color table of at most [`NUM_COLORS`] entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    colors: Vec<[u8; 4]>,
    transparent_index: Option<u8>,
}

impl Palette {
    /// Build a palette from RGB entries and their transparency.
    pub fn from_rgb(rgb: &[[u8; 3]], transparency: &Transparency) -> Self {
        let alphas = transparency.alpha_table();
        let colors = rgb
            .iter()
            .take(NUM_COLORS)
            .zip(alphas)
            .map(|(c, a)| [c[0], c[1], c[2], a])
            .collect();
        Self::from_rgba(colors)
    }

    /// Read a palette image: texels in row-major order, alpha as transparency.
    pub fn from_image(image: &RgbaImage) -> Self {
        let rgb: Vec<[u8; 3]> = image
            .pixels()
            .take(NUM_COLORS)
            .map(|p| [p[0], p[1], p[2]])
            .collect();
        let alphas = image.pixels().take(NUM_COLORS).map(|p| p[3]).collect();
        Self::from_rgb(&rgb, &Transparency::Table(alphas))
    }

    fn from_rgba(colors: Vec<[u8; 4]>) -> Self {
        let transparent_index = colors
            .iter()
            .position(|c| c[3] == 0)
            .map(|i| i as u8);
        Self {
            colors,
            transparent_index,
        }
    }

    /// Palette entries as RGBA.
    pub fn colors(&self) -> &[[u8; 4]] {
        &self.colors
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// First index with alpha 0, if any.
    pub fn transparent_index(&self) -> Option<u8> {
        self.transparent_index
    }

    /// Palette index for a pixel.
    ///
    /// Transparent pixels use the transparency index. Other pixels use the
    /// nearest non-transparent entry by RGBA distance; the lowest index wins
    /// ties.
    pub fn nearest_index(&self, pixel: [u8; 4]) -> u8 {
        if pixel[3] == 0 {
            if let Some(index) = self.transparent_index {
                return index;
            }
            return self.nearest_by(|c| rgba_distance_sq(*c, pixel), |_| true);
        }

        let has_visible = self.colors.iter().any(|c| c[3] != 0);
        self.nearest_by(
            |c| rgba_distance_sq(*c, pixel),
            |c| !has_visible || c[3] != 0,
        )
    }

    fn nearest_by(
        &self,
        distance: impl Fn(&[u8; 4]) -> u32,
        allowed: impl Fn(&[u8; 4]) -> bool,
    ) -> u8 {
        let mut best = 0usize;
        let mut best_dist = u32::MAX;
        for (i, color) in self.colors.iter().enumerate() {
            if !allowed(color) {
                continue;
            }
            let dist = distance(color);
            if dist < best_dist {
                best_dist = dist;
                best = i;
            }
        }
        best as u8
    }

    /// One-row RGBA image of the palette entries.
    pub fn to_image(&self) -> RgbaImage {
        let width = self.colors.len().max(1) as u32;
        RgbaImage::from_fn(width, 1, |x, _| {
            Rgba(self.colors.get(x as usize).copied().unwrap_or([0, 0, 0, 0]))
        })
    }
}

fn rgb_distance_sq(a: [u8; 4], b: [u8; 4]) -> u32 {
    (0..3)
        .map(|i| {
            let d = i32::from(a[i]) - i32::from(b[i]);
            (d * d) as u32
        })
        .sum()
}

fn rgba_distance_sq(a: [u8; 4], b: [u8; 4]) -> u32 {
    let da = i32::from(a[3]) - i32::from(b[3]);
    rgb_distance_sq(a, b) + (da * da) as u32
}

/// Load `Palette_Base.png` from an atlas source directory, if present.
///
/// A present but unreadable palette is an error rather than a silent
/// fallback to a derived palette.
pub fn load_base_palette(atlas_dir: &Path) -> AtlasResult<Option<Palette>> {
    let path = atlas_dir.join(BASE_PALETTE_FILE_NAME);
    if !path.is_file() {
        return Ok(None);
    }
    let image = image::open(&path)
        .map_err(|source| AtlasError::Decode { path, source })?
        .to_rgba8();
    Ok(Some(Palette::from_image(&image)))
}

/// A weighted set of distinct RGBA colors for median cut.
#[derive(Debug, Clone)]
struct ColorBox {
    colors: Vec<([u8; 4], u64)>,
    /// Channel with the widest value range.
    channel: usize,
    /// Value range of `channel`.
    range: u8,
}

impl ColorBox {
    fn new(colors: Vec<([u8; 4], u64)>) -> Self {
        let mut channel = 0;
        let mut range = 0;
        for c in 0..4 {
            let min = colors.iter().map(|(color, _)| color[c]).min().unwrap_or(0);
            let max = colors.iter().map(|(color, _)| color[c]).max().unwrap_or(0);
            if max - min > range {
                channel = c;
                range = max - min;
            }
        }
        Self {
            colors,
            channel,
            range,
        }
    }

    /// Split at the weighted median of the widest channel.
    fn split(mut self) -> (ColorBox, ColorBox) {
        let channel = self.channel;
        self.colors.sort_by_key(|(c, _)| (c[channel], *c));

        let total: u64 = self.colors.iter().map(|(_, w)| w).sum();
        let mut acc = 0u64;
        let mut cut = 1;
        for (i, (_, weight)) in self.colors.iter().enumerate() {
            acc += weight;
            if acc * 2 >= total {
                cut = i + 1;
                break;
            }
        }
        let cut = cut.clamp(1, self.colors.len() - 1);

        let upper = self.colors.split_off(cut);
        (ColorBox::new(self.colors), ColorBox::new(upper))
    }

    /// Weighted mean color, rounded. Alpha stays non-zero since every member
    /// is visible.
    fn mean(&self) -> [u8; 4] {
        let total: u64 = self.colors.iter().map(|(_, w)| w).sum::<u64>().max(1);
        let mut out = [0u8; 4];
        for (channel, value) in out.iter_mut().enumerate() {
            let sum: u64 = self
                .colors
                .iter()
                .map(|(c, w)| u64::from(c[channel]) * w)
                .sum();
            *value = ((sum + total / 2) / total) as u8;
        }
        out
    }
}

/// Reduce weighted colors to at most `target` representatives.
fn median_cut(colors: Vec<([u8; 4], u64)>, target: usize) -> Vec<[u8; 4]> {
    let mut boxes = vec![ColorBox::new(colors)];

    while boxes.len() < target {
        let mut pick: Option<(usize, u8)> = None;
        for (i, b) in boxes.iter().enumerate() {
            if b.colors.len() < 2 {
                continue;
            }
            if pick.map_or(true, |(_, best)| b.range > best) {
                pick = Some((i, b.range));
            }
        }
        let Some((index, _)) = pick else {
            break;
        };

        let (lower, upper) = boxes.remove(index).split();
        boxes.insert(index, lower);
        boxes.push(upper);
    }

    boxes.iter().map(ColorBox::mean).collect()
}

/// Derive a palette from the visible pixels of an atlas.
///
/// Index 0 is the transparency index. Atlases with at most 255 distinct
/// visible RGBA colors keep them exactly, in ascending RGBA order; larger
/// sets are reduced by median cut over all four channels. Translucent
/// entries keep their alpha. Unused entries are opaque black.
pub fn derive_palette(atlas: &RgbaImage) -> Palette {
    let mut counts: BTreeMap<[u8; 4], u64> = BTreeMap::new();
    for pixel in atlas.pixels() {
        if pixel[3] != 0 {
            *counts.entry(pixel.0).or_insert(0) += 1;
        }
    }

    let max_visible = NUM_COLORS - 1;
    let visible: Vec<[u8; 4]> = if counts.len() <= max_visible {
        counts.into_keys().collect()
    } else {
        median_cut(counts.into_iter().collect(), max_visible)
    };

    let mut entries = Vec::with_capacity(NUM_COLORS);
    entries.push([0, 0, 0, 0]);
    entries.extend(visible);
    entries.resize(NUM_COLORS, [0, 0, 0, 255]);

    let rgb: Vec<[u8; 3]> = entries.iter().map(|c| [c[0], c[1], c[2]]).collect();
    let transparency = if entries[1..].iter().all(|c| c[3] == u8::MAX) {
        Transparency::Index(DERIVED_TRANSPARENT_INDEX)
    } else {
        Transparency::Table(entries.iter().map(|c| c[3]).collect())
    };
    Palette::from_rgb(&rgb, &transparency)
}

/// Output of palettization.
#[derive(Debug, Clone)]
pub struct PalettizeResult {
    /// Atlas with every channel of every pixel set to its palette index.
    pub indexed: RgbaImage,
    /// Palette the indices refer to.
    pub palette: Palette,
    /// One-row palette image.
    pub palette_image: RgbaImage,
}

/// Convert an RGBA atlas to palette indices.
///
/// Uses `base` when given, otherwise derives a palette from the atlas.
pub fn palettize(atlas: &RgbaImage, base: Option<&Palette>) -> PalettizeResult {
    let palette = match base {
        Some(palette) => palette.clone(),
        None => derive_palette(atlas),
    };

    let mut cache: HashMap<[u8; 4], u8> = HashMap::new();
    let mut indexed = RgbaImage::new(atlas.width(), atlas.height());
    for (src, dst) in atlas.pixels().zip(indexed.pixels_mut()) {
        let index = *cache
            .entry(src.0)
            .or_insert_with(|| palette.nearest_index(src.0));
        *dst = Rgba([index; 4]);
    }

    let palette_image = palette.to_image();
    PalettizeResult {
        indexed,
        palette,
        palette_image,
    }
}

/// Map an indexed atlas back to colors through its palette.
pub fn expand(indexed: &RgbaImage, palette: &Palette) -> RgbaImage {
    RgbaImage::from_fn(indexed.width(), indexed.height(), |x, y| {
        let index = indexed.get_pixel(x, y)[0] as usize;
        Rgba(palette.colors().get(index).copied().unwrap_or([0, 0, 0, 0]))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn checker(colors: &[[u8; 4]], width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            Rgba(colors[((y * width + x) as usize) % colors.len()])
        })
    }

    #[test]
    fn test_index_transparency_table() {
        let table = Transparency::Index(3).alpha_table();
        assert_eq!(table.len(), NUM_COLORS);
        assert_eq!(table[3], 0);
        assert_eq!(table.iter().filter(|&&a| a == 0).count(), 1);
        assert!(table.iter().enumerate().all(|(i, &a)| i == 3 || a == 255));
    }

    #[test]
    fn test_table_transparency_padded() {
        let table = Transparency::Table(vec![10, 0]).alpha_table();
        assert_eq!(table.len(), NUM_COLORS);
        assert_eq!(&table[..3], &[10, 0, 255]);
    }

    #[test]
    fn test_derived_palette_has_one_transparent_index() {
        let atlas = checker(&[[255, 0, 0, 255], [0, 0, 0, 0], [0, 80, 0, 255]], 9, 9);
        let palette = derive_palette(&atlas);

        assert_eq!(palette.len(), NUM_COLORS);
        assert_eq!(palette.transparent_index(), Some(0));
        assert_eq!(palette.colors().iter().filter(|c| c[3] == 0).count(), 1);
        assert_eq!(palette.colors()[1], [0, 80, 0, 255]);
        assert_eq!(palette.colors()[2], [255, 0, 0, 255]);
    }

    #[test]
    fn test_small_palette_round_trips_exactly() {
        let colors = [
            [12, 34, 56, 255],
            [0, 0, 0, 0],
            [200, 10, 10, 255],
            [0, 0, 0, 255],
            [90, 90, 91, 255],
        ];
        let atlas = checker(&colors, 16, 8);
        let result = palettize(&atlas, None);

        assert_eq!(expand(&result.indexed, &result.palette), atlas);
        for pixel in result.indexed.pixels() {
            assert!(pixel.0.iter().all(|&c| c == pixel[0]));
        }
    }

    #[test]
    fn test_translucent_pixels_keep_alpha() {
        let atlas = checker(&[[0, 0, 0, 128], [255, 0, 0, 255]], 2, 1);
        let result = palettize(&atlas, None);

        assert_eq!(expand(&result.indexed, &result.palette), atlas);
        assert_eq!(result.palette.colors()[1], [0, 0, 0, 128]);
        assert_eq!(result.palette_image.get_pixel(1, 0).0, [0, 0, 0, 128]);
        assert_eq!(result.palette.transparent_index(), Some(0));
        assert_eq!(
            result.palette.colors().iter().filter(|c| c[3] == 0).count(),
            1
        );
    }

    #[test]
    fn test_same_rgb_different_alpha_are_distinct_entries() {
        let atlas = checker(&[[30, 60, 90, 255], [30, 60, 90, 64], [0, 0, 0, 0]], 3, 1);
        let result = palettize(&atlas, None);

        let indices: Vec<u8> = result.indexed.pixels().map(|p| p[0]).collect();
        assert_eq!(indices, vec![2, 1, 0]);
        assert_eq!(expand(&result.indexed, &result.palette), atlas);
    }

    #[test]
    fn test_many_translucent_colors_keep_alpha_roughly() {
        let atlas = RgbaImage::from_fn(64, 64, |x, y| {
            Rgba([(x * 4) as u8, 100, 50, (y * 4 + 3) as u8])
        });
        let palette = derive_palette(&atlas);
        assert_eq!(palette.colors().iter().filter(|c| c[3] == 0).count(), 1);

        let result = palettize(&atlas, Some(&palette));
        let expanded = expand(&result.indexed, &result.palette);
        for (a, b) in atlas.pixels().zip(expanded.pixels()) {
            assert_ne!(b[3], 0);
            assert!(rgba_distance_sq(a.0, b.0) < 32 * 32, "{:?} -> {:?}", a, b);
        }
    }

    #[test]
    fn test_many_colors_quantized_to_limit() {
        let atlas = RgbaImage::from_fn(64, 64, |x, y| {
            Rgba([(x * 4) as u8, (y * 4) as u8, ((x + y) * 2) as u8, 255])
        });
        let palette = derive_palette(&atlas);
        assert_eq!(palette.len(), NUM_COLORS);

        let result = palettize(&atlas, Some(&palette));
        let expanded = expand(&result.indexed, &result.palette);
        for (a, b) in atlas.pixels().zip(expanded.pixels()) {
            assert_eq!(b[3], 255);
            let dist = rgb_distance_sq(a.0, b.0);
            assert!(dist < 48 * 48, "{:?} -> {:?}", a, b);
        }
    }

    #[test]
    fn test_derivation_is_deterministic() {
        let atlas = RgbaImage::from_fn(40, 40, |x, y| {
            Rgba([(x * 6) as u8, (y * 6) as u8, (x * y) as u8, 255])
        });
        assert_eq!(derive_palette(&atlas), derive_palette(&atlas));
    }

    #[test]
    fn test_base_palette_reused_verbatim() {
        let base = Palette::from_image(&checker(
            &[[0, 0, 0, 255], [255, 255, 255, 255], [10, 10, 10, 0], [250, 0, 0, 128]],
            4,
            1,
        ));
        assert_eq!(base.transparent_index(), Some(2));

        let atlas = checker(&[[240, 240, 240, 255], [0, 0, 0, 0], [200, 20, 20, 255]], 3, 3);
        let result = palettize(&atlas, Some(&base));

        assert_eq!(result.palette, base);
        assert_eq!(result.palette_image.dimensions(), (4, 1));
        assert_eq!(result.indexed.get_pixel(0, 0)[0], 1);
        assert_eq!(result.indexed.get_pixel(1, 0)[0], 2);
        assert_eq!(result.indexed.get_pixel(2, 0)[0], 3);
    }

    #[test]
    fn test_transparent_pixel_without_transparent_entry() {
        let base = Palette::from_image(&checker(&[[0, 0, 0, 255], [9, 9, 9, 40]], 2, 1));
        assert_eq!(base.transparent_index(), None);
        assert_eq!(base.nearest_index([0, 0, 0, 0]), 1);
    }

    #[test]
    fn test_palette_image_layout() {
        let atlas = checker(&[[1, 2, 3, 255]], 1, 1);
        let palette = derive_palette(&atlas);
        let image = palette.to_image();
        assert_eq!(image.dimensions(), (256, 1));
        assert_eq!(image.get_pixel(0, 0).0, [0, 0, 0, 0]);
        assert_eq!(image.get_pixel(1, 0).0, [1, 2, 3, 255]);
        assert_eq!(image.get_pixel(255, 0).0, [0, 0, 0, 255]);
    }

    #[test]
    fn test_load_base_palette() {
        let tmp = TempDir::new().unwrap();
        assert_eq!(load_base_palette(tmp.path()).unwrap(), None);

        checker(&[[5, 6, 7, 255], [0, 0, 0, 0]], 2, 1)
            .save(tmp.path().join(BASE_PALETTE_FILE_NAME))
            .unwrap();
        let palette = load_base_palette(tmp.path()).unwrap().unwrap();
        assert_eq!(palette.colors(), &[[5, 6, 7, 255], [0, 0, 0, 0]]);
    }

    #[test]
    fn test_unreadable_base_palette_is_error() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(BASE_PALETTE_FILE_NAME), b"garbage").unwrap();
        assert!(matches!(
            load_base_palette(tmp.path()),
            Err(AtlasError::Decode { .. })
        ));
    }
}
