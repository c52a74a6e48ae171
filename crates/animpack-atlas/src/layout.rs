//! Grid layout for same-sized frames.
//!
//! Every frame occupies one cell of a `columns x rows` grid. The grid shape
//! is the one whose packed image is closest to square, which keeps
//! power-of-two rounding cheap.

use serde::Serialize;

use crate::error::{AtlasError, AtlasResult};
use crate::settings::AtlasConfig;

/// Grid shape hosting all frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GridDims {
    pub columns: u32,
    pub rows: u32,
}

impl GridDims {
    /// Grid cell of a linear frame index.
    pub fn cell(&self, index: u32) -> (u32, u32) {
        (index % self.columns, index / self.columns)
    }
}

/// Full atlas geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AtlasLayout {
    /// Size of one frame.
    pub frame_dims: (u32, u32),
    /// Border around each frame.
    pub padding: u32,
    /// Size of one cell (frame plus padding on both sides).
    pub padded_dims: (u32, u32),
    /// Grid shape.
    pub grid: GridDims,
    /// Final image size, after optional power-of-two rounding.
    pub image_dims: (u32, u32),
}

impl AtlasLayout {
    /// Compute the layout for `total_images` frames of `frame_dims`.
    pub fn compute(
        total_images: u32,
        frame_dims: (u32, u32),
        config: &AtlasConfig,
    ) -> AtlasResult<Self> {
        let grid = choose_grid(total_images, frame_dims).ok_or(AtlasError::NoFrames)?;
        let padding = config.padding;

        let overflow = || AtlasError::AtlasTooLarge {
            columns: grid.columns,
            rows: grid.rows,
            cell_width: frame_dims.0.saturating_add(padding.saturating_mul(2)),
            cell_height: frame_dims.1.saturating_add(padding.saturating_mul(2)),
        };

        let border = padding.checked_mul(2).ok_or_else(overflow)?;
        let padded_dims = (
            frame_dims.0.checked_add(border).ok_or_else(overflow)?,
            frame_dims.1.checked_add(border).ok_or_else(overflow)?,
        );
        let mut image_dims = (
            grid.columns.checked_mul(padded_dims.0).ok_or_else(overflow)?,
            grid.rows.checked_mul(padded_dims.1).ok_or_else(overflow)?,
        );
        if config.power_of_two {
            image_dims = (
                next_power_of_two(image_dims.0).ok_or_else(overflow)?,
                next_power_of_two(image_dims.1).ok_or_else(overflow)?,
            );
        }

        Ok(Self {
            frame_dims,
            padding,
            padded_dims,
            grid,
            image_dims,
        })
    }

    /// Top-left pixel of the frame with the given linear index.
    pub fn frame_origin(&self, index: u32) -> (u32, u32) {
        let (cx, cy) = self.grid.cell(index);
        (
            cx * self.padded_dims.0 + self.padding,
            cy * self.padded_dims.1 + self.padding,
        )
    }
}

/// Distance of a grid's packed aspect ratio from a square.
fn aspect_score(columns: u32, rows: u32, frame_dims: (u32, u32)) -> f64 {
    let width = columns as f64 * frame_dims.0 as f64;
    let height = rows as f64 * frame_dims.1 as f64;
    (1.0 - width / height).abs()
}

/// Pick the grid closest to square for `total_images` frames.
///
/// Every column count from 1 to `total_images` is tried with just enough
/// rows to hold all frames; the first lowest score wins. Returns `None` when
/// there are no frames.
pub fn choose_grid(total_images: u32, frame_dims: (u32, u32)) -> Option<GridDims> {
    let mut best: Option<(GridDims, f64)> = None;

    for columns in 1..=total_images {
        let rows = total_images.div_ceil(columns);
        let score = aspect_score(columns, rows, frame_dims);
        if best.map_or(true, |(_, best_score)| score < best_score) {
            best = Some((GridDims { columns, rows }, score));
        }
    }

    best.map(|(grid, _)| grid)
}

/// Smallest power of two >= `value`; 0 maps to 1.
pub fn next_power_of_two(value: u32) -> Option<u32> {
    value.checked_next_power_of_two()
}
