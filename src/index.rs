//! In-memory bounding-box index: `(frame, label)` → tight box.
//!
//! Rows live in a table keyed by a stable surrogate id; the `(frame, label)`
//! lookup is a secondary map rebuilt wholesale on bulk remaps so multi-entry
//! renames never trip over transient key collisions. The index also carries
//! the label high-water mark: freshly minted ids are `max ever observed + 1`
//! and are never reused, even after the originating track is deleted.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};

use crate::error::{Result, TrackError};
use crate::extract::bbox_table;
use crate::types::{BBoxRow, BoundingBox, Frame, Label, TrackExtent};
use crate::volume::VolumeRead;

type RowId = u64;

/// Mapping `(frame, label)` → bounding box, independently re-derivable from
/// the raw volume for validation.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct BBoxIndex {
    rows: BTreeMap<RowId, BBoxRow>,
    #[serde(skip)]
    lookup: HashMap<(Frame, Label), RowId>,
    next_row: RowId,
    high_water: Label,
}

impl BBoxIndex {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an index from extraction rows, e.g. the output of
    /// [`crate::extract::bbox_table`] over an untouched volume.
    pub fn from_rows(rows: impl IntoIterator<Item = BBoxRow>) -> Result<Self> {
        let mut index = Self::new();
        for row in rows {
            index.insert(row.frame, row.label, row.bbox)?;
        }
        Ok(index)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BBoxRow> {
        self.rows.values()
    }

    pub fn get(&self, frame: Frame, label: Label) -> Result<BoundingBox> {
        self.lookup
            .get(&(frame, label))
            .and_then(|id| self.rows.get(id))
            .map(|row| row.bbox)
            .ok_or(TrackError::NotFound { frame, label })
    }

    /// Sorted frames currently holding an entry for `label`.
    #[must_use]
    pub fn frames_of(&self, label: Label) -> Vec<Frame> {
        let mut frames: Vec<Frame> = self
            .rows
            .values()
            .filter(|row| row.label == label)
            .map(|row| row.frame)
            .collect();
        frames.sort_unstable();
        frames
    }

    /// Distinct labels present in any frame.
    #[must_use]
    pub fn labels(&self) -> BTreeSet<Label> {
        self.rows.values().map(|row| row.label).collect()
    }

    /// Inclusive `(min frame, max frame)` extent of `label`'s entries.
    pub fn extent(&self, label: Label) -> Result<TrackExtent> {
        let frames = self.frames_of(label);
        match (frames.first(), frames.last()) {
            (Some(&start), Some(&end)) => Ok(TrackExtent { start, end }),
            _ => Err(TrackError::UnknownLabel { label }),
        }
    }

    pub fn insert(&mut self, frame: Frame, label: Label, bbox: BoundingBox) -> Result<()> {
        if self.lookup.contains_key(&(frame, label)) {
            return Err(TrackError::Conflict { frame, label });
        }
        let id = self.next_row;
        self.next_row += 1;
        self.rows.insert(id, BBoxRow { frame, label, bbox });
        self.lookup.insert((frame, label), id);
        self.high_water = self.high_water.max(label);
        Ok(())
    }

    pub fn remove(&mut self, frame: Frame, label: Label) -> Result<BoundingBox> {
        let id = self
            .lookup
            .remove(&(frame, label))
            .ok_or(TrackError::NotFound { frame, label })?;
        let row = self.rows.remove(&id).ok_or(TrackError::NotFound { frame, label })?;
        Ok(row.bbox)
    }

    /// Atomic key substitution `(frame, old)` → `(frame, new)`. The row and
    /// its surrogate id survive; only the label changes.
    pub fn rename(&mut self, frame: Frame, old: Label, new: Label) -> Result<()> {
        if self.lookup.contains_key(&(frame, new)) {
            return Err(TrackError::Conflict { frame, label: new });
        }
        let id = self
            .lookup
            .remove(&(frame, old))
            .ok_or(TrackError::NotFound { frame, label: old })?;
        if let Some(row) = self.rows.get_mut(&id) {
            row.label = new;
        }
        self.lookup.insert((frame, new), id);
        self.high_water = self.high_water.max(new);
        Ok(())
    }

    /// Bulk label substitution. Applies `map` to every row's label, then
    /// rebuilds the secondary lookup from scratch; fails with `Conflict` if
    /// the mapping collapses two rows of one frame onto the same label (the
    /// rows themselves are left remapped only on success).
    pub fn remap(&mut self, map: impl Fn(Label) -> Label) -> Result<()> {
        let mut lookup = HashMap::with_capacity(self.rows.len());
        let mut high_water = self.high_water;
        for (id, row) in &self.rows {
            let label = map(row.label);
            high_water = high_water.max(label);
            if lookup.insert((row.frame, label), *id).is_some() {
                return Err(TrackError::Conflict {
                    frame: row.frame,
                    label,
                });
            }
        }
        for row in self.rows.values_mut() {
            row.label = map(row.label);
        }
        self.lookup = lookup;
        self.high_water = high_water;
        Ok(())
    }

    /// Mint a fresh label id: one past the highest label ever observed by
    /// this index. Minted ids are never handed out twice.
    pub fn mint_label(&mut self) -> Label {
        self.high_water += 1;
        self.high_water
    }

    /// Recompute the full table from the raw volume and compare it, as a
    /// set, against the maintained rows. A mismatch is reported as
    /// [`TrackError::Integrity`] carrying the symmetric difference.
    pub fn validate(&self, volume: &impl VolumeRead) -> Result<()> {
        let derived: BTreeSet<BBoxRow> = bbox_table(volume)?.into_iter().collect();
        let maintained: BTreeSet<BBoxRow> = self.rows.values().copied().collect();
        if derived == maintained {
            return Ok(());
        }
        Err(TrackError::Integrity {
            missing: derived.difference(&maintained).copied().collect(),
            unexpected: maintained.difference(&derived).copied().collect(),
        })
    }

    /// Rebuild the secondary lookup from the row table. Needed after
    /// deserializing, since the lookup is not persisted.
    pub fn rebuild_lookup(&mut self) -> Result<()> {
        let mut lookup = HashMap::with_capacity(self.rows.len());
        for (id, row) in &self.rows {
            if lookup.insert((row.frame, row.label), *id).is_some() {
                return Err(TrackError::Conflict {
                    frame: row.frame,
                    label: row.label,
                });
            }
        }
        self.lookup = lookup;
        Ok(())
    }
}
