//! Height samples derived from a grayscale texture.

use anyhow::ensure;
use image::{DynamicImage, GenericImageView};

/// A row-major grid of heights in `[-1, 1]`, one sample per texture pixel.
///
/// Row `r` corresponds to texture line `r` (the z axis of the terrain), column `c` to
/// pixel `c` of that line (the x axis). The grid is immutable once built.
#[derive(Clone, Debug, PartialEq)]
pub struct HeightGrid {
    rows: usize,
    cols: usize,
    heights: Vec<f32>,
}

impl HeightGrid {
    pub const MIN_HEIGHT: f32 = -1.0;
    pub const MAX_HEIGHT: f32 = 1.0;

    /// Build a grid from flattened row-major samples.
    ///
    /// Samples outside `[-1, 1]` are clamped so the collision shape bounds always hold.
    pub fn new(rows: usize, cols: usize, heights: Vec<f32>) -> anyhow::Result<Self> {
        ensure!(rows > 0 && cols > 0, "height grid must not be empty ({rows}x{cols})");
        ensure!(
            heights.len() == rows * cols,
            "height grid of {rows}x{cols} needs {} samples, got {}",
            rows * cols,
            heights.len()
        );
        let heights = heights
            .into_iter()
            .map(|h| h.clamp(Self::MIN_HEIGHT, Self::MAX_HEIGHT))
            .collect();
        Ok(Self {
            rows,
            cols,
            heights,
        })
    }

    /// Build a grid from nested rows. All rows must have the same length.
    pub fn from_rows(rows: Vec<Vec<f32>>) -> anyhow::Result<Self> {
        let cols = rows.first().map_or(0, Vec::len);
        ensure!(
            rows.iter().all(|row| row.len() == cols),
            "height grid rows differ in length"
        );
        let row_count = rows.len();
        Self::new(row_count, cols, rows.into_iter().flatten().collect())
    }

    /// Sample the red channel of every pixel.
    pub fn from_image(image: &DynamicImage) -> anyhow::Result<Self> {
        let (width, height) = image.dimensions();
        let rgba = image.to_rgba8();
        let heights = rgba
            .pixels()
            .map(|pixel| Self::height_from_pixel(pixel.0[0]))
            .collect();
        Self::new(height as usize, width as usize, heights)
    }

    /// Map a channel value in `[0, 255]` linearly onto `[-1, 1]`.
    pub fn height_from_pixel(value: u8) -> f32 {
        value as f32 / 255.0 * 2.0 - 1.0
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f32> {
        if row < self.rows && col < self.cols {
            self.heights.get(row * self.cols + col).copied()
        } else {
            None
        }
    }

    /// The samples, flattened row by row.
    pub fn as_slice(&self) -> &[f32] {
        &self.heights
    }
}
