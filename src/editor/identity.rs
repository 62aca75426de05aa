//! Identity operations: relabel, swap, break, split registration.

use ndarray::Array2;
use tracing::instrument;

use super::TrackEditor;
use crate::error::{Result, TrackError};
use crate::types::{BoundingBox, Frame, Label};
use crate::volume::VolumeTxn;

impl TrackEditor {
    /// Rewrite pixels equal to `old` within its bounding box at `frame` to
    /// `new` and rename the index key. Fails with `Conflict` before any
    /// pixel is touched if `(frame, new)` is already occupied. The lineage
    /// graph is untouched.
    pub fn relabel(
        &mut self,
        frame: Frame,
        old: Label,
        new: Label,
        txn: &mut impl VolumeTxn,
    ) -> Result<()> {
        if self.index.get(frame, new).is_ok() {
            return Err(TrackError::Conflict { frame, label: new });
        }
        log::debug!("relabel frame {frame}: {old} -> {new}");
        self.relabel_entry(frame, old, new, txn)
    }

    /// Exchange the identities `a` and `b` everywhere: pixels, index rows,
    /// lineage parent/daughter occurrences, and termination annotations. No
    /// pixel changes membership; only the numeric ids trade places.
    ///
    /// The masks of **both** identities across **all** affected frames are
    /// read and recorded before either is written. The two tracks may share
    /// frames with overlapping boxes, so writing one identity before
    /// reading the other would corrupt the second read.
    #[instrument(target = "trackvol::editor", skip(self, txn))]
    pub fn swap_identities(&mut self, a: Label, b: Label, txn: &mut impl VolumeTxn) -> Result<()> {
        let masks_a = self.read_track_masks(a, txn)?;
        let masks_b = self.read_track_masks(b, txn)?;

        for (frame, bbox, selection) in &masks_a {
            txn.write_where(*frame, bbox.y_range(), bbox.x_range(), selection, b)?;
        }
        for (frame, bbox, selection) in &masks_b {
            txn.write_where(*frame, bbox.y_range(), bbox.x_range(), selection, a)?;
        }

        self.index.remap(|label| {
            if label == a {
                b
            } else if label == b {
                a
            } else {
                label
            }
        })?;
        self.lineage.swap_labels(a, b);
        Ok(())
    }

    fn read_track_masks(
        &self,
        label: Label,
        txn: &impl VolumeTxn,
    ) -> Result<Vec<(Frame, BoundingBox, Array2<bool>)>> {
        let mut masks = Vec::new();
        for frame in self.index.frames_of(label) {
            let bbox = self.index.get(frame, label)?;
            let window = txn.read_window(frame, bbox.y_range(), bbox.x_range())?;
            masks.push((frame, bbox, window.mapv(|pixel| pixel == label)));
        }
        Ok(masks)
    }

    /// Sever `label`'s track at `new_start_frame` and move one portion onto
    /// a freshly minted label, which is returned. With `change_after` the
    /// suffix (frames `>= new_start_frame`) is relabeled and inherits the
    /// forward lineage: any split `label` owned as parent is re-owned by the
    /// new label and `label`'s termination annotation moves with it.
    /// Otherwise the prefix (frames `< new_start_frame`) is relabeled and
    /// inherits the backward lineage: the new label replaces `label`
    /// wherever `label` appears as a daughter.
    #[instrument(target = "trackvol::editor", skip(self, txn))]
    pub fn break_track(
        &mut self,
        new_start_frame: Frame,
        label: Label,
        change_after: bool,
        txn: &mut impl VolumeTxn,
    ) -> Result<Label> {
        let minted = self.index.mint_label();
        let frames: Vec<Frame> = self
            .index
            .frames_of(label)
            .into_iter()
            .filter(|&frame| {
                if change_after {
                    frame >= new_start_frame
                } else {
                    frame < new_start_frame
                }
            })
            .collect();
        for frame in frames {
            self.relabel_entry(frame, label, minted, txn)?;
        }

        if change_after {
            self.lineage.reassign_parent(label, minted);
            self.lineage.move_annotation(label, minted);
        } else {
            self.lineage.substitute_daughter(label, minted);
        }
        tracing::info!(
            target = "trackvol::editor",
            label,
            minted,
            new_start_frame,
            change_after,
            "track broken"
        );
        Ok(minted)
    }

    /// Register a split of `parent` into `daughters` starting at
    /// `daughter_start_frame`. The parent's track is truncated at that frame
    /// via [`Self::break_track`], yielding a continuation label which
    /// substitutes for `parent` if `parent` listed itself as a daughter.
    /// Every other listed daughter has its pre-existing track severed at the
    /// same frame, the severed past becoming a fresh branch label, and is
    /// detached from any split it previously belonged to before the final
    /// list is registered. Degenerate splits produced along the way are
    /// collapsed before returning.
    ///
    /// A `daughters` list that is empty or contains duplicates fails with
    /// `Validation` before any pixel or structure is touched. Returns the
    /// parent's continuation label.
    #[instrument(target = "trackvol::editor", skip(self, txn))]
    pub fn add_split(
        &mut self,
        daughter_start_frame: Frame,
        parent: Label,
        daughters: &[Label],
        txn: &mut impl VolumeTxn,
    ) -> Result<Label> {
        if daughters.is_empty() {
            return Err(TrackError::Validation {
                reason: format!("split under parent {parent} has no daughters"),
            });
        }
        for (i, daughter) in daughters.iter().enumerate() {
            if daughters[..i].contains(daughter) {
                return Err(TrackError::Validation {
                    reason: format!("daughter {daughter} listed twice under parent {parent}"),
                });
            }
        }

        let continuation = self.break_track(daughter_start_frame, parent, true, txn)?;
        let daughters: Vec<Label> = daughters
            .iter()
            .map(|&daughter| {
                if daughter == parent {
                    continuation
                } else {
                    daughter
                }
            })
            .collect();

        for &daughter in &daughters {
            // The continuation starts at daughter_start_frame by
            // construction; there is no earlier portion to sever.
            if daughter == continuation {
                continue;
            }
            self.break_track(daughter_start_frame, daughter, false, txn)?;
            self.lineage.detach_daughter(daughter);
        }

        self.lineage.add_split(parent, &daughters)?;
        self.collapse_single_daughter_splits(txn)?;
        Ok(continuation)
    }
}
