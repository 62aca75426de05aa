//! Core `TrackEditor` type orchestrating index, lineage, and pixel edits.
//!
//! Every mutating operation takes a transaction handle from the external
//! volume store and composes pixel reads/writes with index and graph updates
//! into one logical unit. Within each operation the pixel writes are issued
//! first; the in-memory structures are only touched once the store has
//! accepted them, so a store error mid-operation leaves the index and graph
//! unchanged for that step. Composite operations (`add_split`,
//! `terminate_track`, collapse) apply sub-step edits as sub-steps complete:
//! if the caller ultimately discards the transaction, the editor instance is
//! stale and must be rebuilt with [`TrackEditor::from_volume`].
//!
//! Single-writer: the editor is not internally synchronized and must be
//! externally serialized if shared.

mod identity;
mod mask;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::extract::bbox_table;
use crate::index::BBoxIndex;
use crate::lineage::LineageGraph;
use crate::types::{Frame, Label};
use crate::volume::{VolumeRead, VolumeTxn};

/// Editing and indexing layer over a frame-sequenced labeled volume.
#[derive(Debug, Clone)]
pub struct TrackEditor {
    index: BBoxIndex,
    lineage: LineageGraph,
}

/// Summary counters over the maintained structures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorStats {
    pub rows: usize,
    pub tracks: usize,
    pub splits: usize,
    pub annotations: usize,
}

impl TrackEditor {
    /// Assemble an editor from previously persisted parts. The caller is
    /// responsible for the parts describing the same volume state.
    #[must_use]
    pub fn new(index: BBoxIndex, lineage: LineageGraph) -> Self {
        Self { index, lineage }
    }

    /// Bootstrap from the raw volume: derive the bounding-box index with the
    /// extraction collaborator and pair it with the caller's lineage state.
    pub fn from_volume(volume: &impl VolumeRead, lineage: LineageGraph) -> Result<Self> {
        let index = BBoxIndex::from_rows(bbox_table(volume)?)?;
        Ok(Self { index, lineage })
    }

    #[must_use]
    pub fn index(&self) -> &BBoxIndex {
        &self.index
    }

    #[must_use]
    pub fn lineage(&self) -> &LineageGraph {
        &self.lineage
    }

    #[must_use]
    pub fn into_parts(self) -> (BBoxIndex, LineageGraph) {
        (self.index, self.lineage)
    }

    #[must_use]
    pub fn stats(&self) -> EditorStats {
        EditorStats {
            rows: self.index.len(),
            tracks: self.index.labels().len(),
            splits: self.lineage.splits().count(),
            annotations: self.lineage.annotations().count(),
        }
    }

    /// Check the maintained index against a fresh extraction from the raw
    /// volume. Drift is reported as [`crate::TrackError::Integrity`] with
    /// the symmetric difference.
    pub fn validate(&self, volume: &impl VolumeRead) -> Result<()> {
        self.index.validate(volume)
    }

    /// Rewrite the pixels of one `(frame, label)` entry to `new` and rename
    /// the index key. The shared primitive behind relabel, break, and fold.
    pub(crate) fn relabel_entry(
        &mut self,
        frame: Frame,
        old: Label,
        new: Label,
        txn: &mut impl VolumeTxn,
    ) -> Result<()> {
        let bbox = self.index.get(frame, old)?;
        let window = txn.read_window(frame, bbox.y_range(), bbox.x_range())?;
        let selection = window.mapv(|pixel| pixel == old);
        txn.write_where(frame, bbox.y_range(), bbox.x_range(), &selection, new)?;
        self.index.rename(frame, old, new)
    }

    /// Fold a degenerate branch back into continuous parent identity: every
    /// frame-entry under `daughter` is relabeled to `parent`, the daughter's
    /// annotation (if any) moves with it, and the split record is dropped.
    fn fold_identity(
        &mut self,
        parent: Label,
        daughter: Label,
        txn: &mut impl VolumeTxn,
    ) -> Result<()> {
        tracing::debug!(parent, daughter, "folding single-daughter split");
        for frame in self.index.frames_of(daughter) {
            self.relabel_entry(frame, daughter, parent, txn)?;
        }
        self.lineage.move_annotation(daughter, parent);
        self.lineage.drop_split(parent);
        Ok(())
    }

    /// Collapse every split currently holding exactly one daughter.
    /// Idempotent and safe to call repeatedly; folds cannot create new
    /// single-daughter splits, so the loop converges in one pass.
    pub fn collapse_single_daughter_splits(&mut self, txn: &mut impl VolumeTxn) -> Result<()> {
        loop {
            let degenerate = self.lineage.single_daughter_splits();
            if degenerate.is_empty() {
                return Ok(());
            }
            for (parent, daughter) in degenerate {
                self.fold_identity(parent, daughter, txn)?;
            }
        }
    }
}
