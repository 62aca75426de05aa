//! Bounding boxes and per-frame index rows.

use std::ops::Range;

use serde::{Deserialize, Serialize};

use crate::types::{Frame, Label};

/// Axis-aligned box tightly enclosing all pixels of one label within one
/// frame. Half-open on both axes: pixels lie in `[min_y, max_y)` and
/// `[min_x, max_x)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_y: usize,
    pub min_x: usize,
    pub max_y: usize,
    pub max_x: usize,
}

impl BoundingBox {
    #[must_use]
    pub fn new(min_y: usize, min_x: usize, max_y: usize, max_x: usize) -> Self {
        Self {
            min_y,
            min_x,
            max_y,
            max_x,
        }
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.max_y - self.min_y
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.max_x - self.min_x
    }

    #[must_use]
    pub fn y_range(&self) -> Range<usize> {
        self.min_y..self.max_y
    }

    #[must_use]
    pub fn x_range(&self) -> Range<usize> {
        self.min_x..self.max_x
    }

    /// Grow the box to cover the pixel at `(y, x)`.
    pub fn cover(&mut self, y: usize, x: usize) {
        self.min_y = self.min_y.min(y);
        self.min_x = self.min_x.min(x);
        self.max_y = self.max_y.max(y + 1);
        self.max_x = self.max_x.max(x + 1);
    }

    /// Degenerate seed covering exactly the pixel at `(y, x)`.
    #[must_use]
    pub fn pixel(y: usize, x: usize) -> Self {
        Self::new(y, x, y + 1, x + 1)
    }
}

/// One row of the bounding-box table: the tight box for `label` at `frame`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BBoxRow {
    pub frame: Frame,
    pub label: Label,
    pub bbox: BoundingBox,
}

/// Inclusive frame extent of a track: the first and last frames holding an
/// index entry for its label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackExtent {
    pub start: Frame,
    pub end: Frame,
}
