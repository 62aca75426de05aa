//! Public types exposed by the `trackvol-core` crate.

pub mod bbox;

pub use bbox::{BBoxRow, BoundingBox, TrackExtent};

/// Time index into the volume's leading axis.
pub type Frame = usize;

/// Positive integer identifying one segmented object instance. Unique within
/// a frame; the same value across consecutive frames denotes track
/// continuity unless explicitly remapped.
pub type Label = u32;

/// Pixel value for unlabeled background. Never a valid [`Label`].
pub const BACKGROUND: Label = 0;
