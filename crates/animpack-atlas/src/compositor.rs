//! Atlas compositing.
//!
//! Frames are pasted into a transparent RGBA image in animation order, then
//! frame order within each animation. Each frame receives the next linear
//! index, and its cell is `(index % columns, index / columns)`.

use image::{imageops, RgbaImage};

use crate::discovery::{Animation, LoadedFrames};
use crate::layout::AtlasLayout;

/// Atlas indices grouped by animation, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlacedFrames {
    pub animations: Vec<Animation<u32>>,
}

impl PlacedFrames {
    /// Total number of placed frames.
    pub fn total_frames(&self) -> usize {
        self.animations.iter().map(|a| a.frames.len()).sum()
    }
}

/// Composited atlas pixels and the index of every frame.
#[derive(Debug, Clone)]
pub struct CompositeResult {
    /// RGBA atlas image of `layout.image_dims`.
    pub image: RgbaImage,
    /// Frame indices by animation.
    pub placed: PlacedFrames,
}

/// Paste all frames into a new atlas image.
///
/// Pixels are copied as-is, alpha included, without blending. Cells past the
/// last frame and all padding stay fully transparent.
pub fn composite(frames: &LoadedFrames, layout: &AtlasLayout) -> CompositeResult {
    let (width, height) = layout.image_dims;
    let mut image = RgbaImage::new(width, height);
    let mut animations = Vec::with_capacity(frames.animations.len());
    let mut next_index = 0u32;

    for anim in &frames.animations {
        let mut indices = Vec::with_capacity(anim.frames.len());
        for frame in &anim.frames {
            let (x, y) = layout.frame_origin(next_index);
            imageops::replace(&mut image, &frame.image, i64::from(x), i64::from(y));
            indices.push(next_index);
            next_index += 1;
        }
        animations.push(Animation {
            name: anim.name.clone(),
            frames: indices,
        });
    }

    CompositeResult {
        image,
        placed: PlacedFrames { animations },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::LoadedFrame;
    use crate::settings::AtlasConfig;
    use image::Rgba;
    use std::path::PathBuf;

    fn frame(color: [u8; 4], dims: (u32, u32)) -> LoadedFrame {
        LoadedFrame {
            path: PathBuf::from("frame.png"),
            image: RgbaImage::from_pixel(dims.0, dims.1, Rgba(color)),
        }
    }

    fn loaded(anims: Vec<(&str, Vec<[u8; 4]>)>, dims: (u32, u32)) -> LoadedFrames {
        let mut frames = LoadedFrames::default();
        frames.animations = anims
            .into_iter()
            .map(|(name, colors)| Animation {
                name: name.to_string(),
                frames: colors.into_iter().map(|c| frame(c, dims)).collect(),
            })
            .collect();
        frames
    }

    #[test]
    fn test_indices_follow_animation_order() {
        let frames = loaded(
            vec![
                ("Walk", vec![[255, 0, 0, 255], [0, 255, 0, 255], [0, 0, 255, 255]]),
                ("Idle", vec![[9, 9, 9, 128]]),
            ],
            (4, 4),
        );
        let layout = AtlasLayout::compute(4, (4, 4), &AtlasConfig::default()).unwrap();
        let result = composite(&frames, &layout);

        assert_eq!(
            result.placed.animations,
            vec![
                Animation {
                    name: "Walk".to_string(),
                    frames: vec![0, 1, 2],
                },
                Animation {
                    name: "Idle".to_string(),
                    frames: vec![3],
                },
            ]
        );
        assert_eq!(result.placed.total_frames(), 4);
    }

    #[test]
    fn test_pixels_land_in_cells() {
        let colors = vec![[255, 0, 0, 255], [0, 255, 0, 255], [0, 0, 255, 255], [1, 2, 3, 40]];
        let frames = loaded(vec![("Spin", colors.clone())], (4, 4));
        let layout = AtlasLayout::compute(4, (4, 4), &AtlasConfig::default()).unwrap();
        let result = composite(&frames, &layout);

        assert_eq!(result.image.dimensions(), (12, 12));
        for (index, color) in colors.iter().enumerate() {
            let (x0, y0) = layout.frame_origin(index as u32);
            for y in 0..4 {
                for x in 0..4 {
                    assert_eq!(result.image.get_pixel(x0 + x, y0 + y).0, *color);
                }
            }
        }
    }

    #[test]
    fn test_padding_and_spare_cells_transparent() {
        let frames = loaded(vec![("A", vec![[200, 100, 50, 255]; 3])], (2, 2));
        let layout = AtlasLayout::compute(3, (2, 2), &AtlasConfig::default()).unwrap();
        let result = composite(&frames, &layout);

        // 3 square frames -> 2x2 grid, one spare cell
        assert_eq!(layout.grid.columns * layout.grid.rows, 4);
        let (w, h) = result.image.dimensions();
        for y in 0..h {
            for x in 0..w {
                let cx = x / layout.padded_dims.0;
                let cy = y / layout.padded_dims.1;
                let lx = x % layout.padded_dims.0;
                let ly = y % layout.padded_dims.1;
                let in_frame = lx >= 1 && lx < 3 && ly >= 1 && ly < 3;
                let occupied = cy * layout.grid.columns + cx < 3;
                let pixel = result.image.get_pixel(x, y).0;
                if in_frame && occupied {
                    assert_eq!(pixel, [200, 100, 50, 255]);
                } else {
                    assert_eq!(pixel, [0, 0, 0, 0], "pixel ({}, {})", x, y);
                }
            }
        }
    }

    #[test]
    fn test_translucent_pixels_copied_without_blending() {
        let frames = loaded(vec![("Ghost", vec![[10, 20, 30, 7]])], (1, 1));
        let layout = AtlasLayout::compute(1, (1, 1), &AtlasConfig::default()).unwrap();
        let result = composite(&frames, &layout);
        assert_eq!(result.image.get_pixel(1, 1).0, [10, 20, 30, 7]);
    }
}
