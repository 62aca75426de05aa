//! Bounding-box extraction: labeled volume → table of tight per-label boxes.
//!
//! Pure with respect to the index and graph. Used once at bootstrap and by
//! [`crate::BBoxIndex::validate`] to detect drift between the maintained
//! index and the raw pixel data.

use std::collections::BTreeMap;

use crate::error::Result;
use crate::types::{BACKGROUND, BBoxRow, BoundingBox, Label};
use crate::volume::VolumeRead;

/// Scan every frame of `volume` and return one row per `(frame, label)` with
/// nonzero pixels, each box tight around those pixels. Rows are sorted by
/// `(frame, label)`.
pub fn bbox_table(volume: &impl VolumeRead) -> Result<Vec<BBoxRow>> {
    let height = volume.height();
    let width = volume.width();
    let mut rows = Vec::new();

    for frame in 0..volume.frames() {
        let pixels = volume.read_window(frame, 0..height, 0..width)?;
        let mut boxes: BTreeMap<Label, BoundingBox> = BTreeMap::new();
        for ((y, x), &label) in pixels.indexed_iter() {
            if label == BACKGROUND {
                continue;
            }
            boxes
                .entry(label)
                .and_modify(|bbox| bbox.cover(y, x))
                .or_insert_with(|| BoundingBox::pixel(y, x));
        }
        rows.extend(
            boxes
                .into_iter()
                .map(|(label, bbox)| BBoxRow { frame, label, bbox }),
        );
    }
    Ok(rows)
}
