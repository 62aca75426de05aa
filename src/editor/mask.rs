//! Mask operations: add, delete, update, terminate.

use ndarray::{Array2, ArrayView2};
use tracing::instrument;

use super::TrackEditor;
use crate::error::{Result, TrackError};
use crate::types::{BACKGROUND, BoundingBox, Frame, Label};
use crate::volume::VolumeTxn;

/// Tight sub-window of the set bits of `mask` placed at `origin`, validated
/// against the frame extent. The placement bound is the full mask window,
/// not the tight one.
fn stage_mask(
    origin: (usize, usize),
    mask: ArrayView2<'_, bool>,
    height: usize,
    width: usize,
) -> Result<(BoundingBox, Array2<bool>)> {
    let (rows, cols) = mask.dim();
    if origin.0 + rows > height || origin.1 + cols > width {
        return Err(TrackError::Bounds {
            reason: format!(
                "mask of {rows}x{cols} at origin ({}, {}) exceeds frame extent {height}x{width}",
                origin.0, origin.1
            ),
        });
    }

    let mut tight: Option<BoundingBox> = None;
    for ((y, x), &set) in mask.indexed_iter() {
        if set {
            match tight.as_mut() {
                Some(bbox) => bbox.cover(y, x),
                None => tight = Some(BoundingBox::pixel(y, x)),
            }
        }
    }
    let local = tight.ok_or_else(|| TrackError::Validation {
        reason: "mask has no set pixels".into(),
    })?;

    let bbox = BoundingBox::new(
        origin.0 + local.min_y,
        origin.1 + local.min_x,
        origin.0 + local.max_y,
        origin.1 + local.max_x,
    );
    let selection = mask.slice(ndarray::s![local.y_range(), local.x_range()]).to_owned();
    Ok((bbox, selection))
}

impl TrackEditor {
    /// Write `label` into the pixels selected by `mask` (a dense boolean
    /// window positioned at `origin`) and insert a new index entry with the
    /// tight box of the set bits. Fails with `Bounds` if placement exceeds
    /// the frame extent, `Validation` if no bit is set, and `Conflict` if
    /// `(frame, label)` already has an entry — delete it first.
    pub fn add_mask(
        &mut self,
        frame: Frame,
        label: Label,
        origin: (usize, usize),
        mask: ArrayView2<'_, bool>,
        txn: &mut impl VolumeTxn,
    ) -> Result<()> {
        if self.index.get(frame, label).is_ok() {
            return Err(TrackError::Conflict { frame, label });
        }
        let (bbox, selection) = stage_mask(origin, mask, txn.height(), txn.width())?;
        txn.write_where(frame, bbox.y_range(), bbox.x_range(), &selection, label)?;
        log::debug!("add mask for label {label} at frame {frame}");
        self.index.insert(frame, label, bbox)
    }

    /// Zero the bbox-bounded pixels equal to `label` at `frame` and remove
    /// the index entry. If this was the label's last entry anywhere, the
    /// label's annotation and lineage membership are dropped and any split
    /// thereby reduced to one daughter is collapsed.
    #[instrument(target = "trackvol::editor", skip(self, txn))]
    pub fn delete_mask(
        &mut self,
        frame: Frame,
        label: Label,
        txn: &mut impl VolumeTxn,
    ) -> Result<()> {
        self.delete_mask_inner(frame, label, txn, true)
    }

    fn delete_mask_inner(
        &mut self,
        frame: Frame,
        label: Label,
        txn: &mut impl VolumeTxn,
        cascade: bool,
    ) -> Result<()> {
        let bbox = self.index.get(frame, label)?;
        let window = txn.read_window(frame, bbox.y_range(), bbox.x_range())?;
        let selection = window.mapv(|pixel| pixel == label);
        txn.write_where(frame, bbox.y_range(), bbox.x_range(), &selection, BACKGROUND)?;
        self.index.remove(frame, label)?;

        if cascade && self.index.frames_of(label).is_empty() {
            log::debug!("label {label} has no entries left; dropping lineage state");
            self.lineage.clear_annotation(label);
            self.lineage.remove_label(label);
            self.collapse_single_daughter_splits(txn)?;
        }
        Ok(())
    }

    /// Replace the mask of an existing `(frame, label)` entry: delete then
    /// add under one transaction, skipping the emptiness cascade of a plain
    /// delete since the label is guaranteed to persist.
    pub fn update_mask(
        &mut self,
        frame: Frame,
        label: Label,
        new_origin: (usize, usize),
        new_mask: ArrayView2<'_, bool>,
        txn: &mut impl VolumeTxn,
    ) -> Result<()> {
        // Validate the replacement before the old mask is zeroed so a
        // malformed request leaves the entry intact.
        let (bbox, selection) = stage_mask(new_origin, new_mask, txn.height(), txn.width())?;
        self.delete_mask_inner(frame, label, txn, false)?;
        txn.write_where(frame, bbox.y_range(), bbox.x_range(), &selection, label)?;
        self.index.insert(frame, label, bbox)
    }

    /// Retroactively truncate `label`'s track: delete every entry at frames
    /// strictly greater than `frame`, then record the termination reason and
    /// drop any split `label` owned as parent.
    #[instrument(target = "trackvol::editor", skip(self, txn, annotation))]
    pub fn terminate_track(
        &mut self,
        frame: Frame,
        label: Label,
        annotation: impl Into<String>,
        txn: &mut impl VolumeTxn,
    ) -> Result<()> {
        let truncated: Vec<Frame> = self
            .index
            .frames_of(label)
            .into_iter()
            .filter(|&f| f > frame)
            .collect();
        for f in truncated {
            self.delete_mask_inner(f, label, txn, true)?;
        }
        self.lineage.terminate(label, annotation);
        tracing::info!(target = "trackvol::editor", label, frame, "track terminated");
        Ok(())
    }
}
