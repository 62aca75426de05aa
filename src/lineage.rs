//! Lineage graph: parent → daughters splits plus termination annotations.
//!
//! The maps are private; every mutation goes through methods that enforce
//! the graph invariants: a daughters list has no duplicates, a label is
//! never its own daughter, and a label is a daughter of at most one split at
//! a time. Degenerate (single-daughter) splits are reported to the editor,
//! which folds the daughter's pixels back into the parent before the record
//! is dropped. The whole graph round-trips through serde so callers can
//! persist it across sessions in whatever format they like.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::error::{Result, TrackError};
use crate::types::Label;

/// Ordered daughter list of one split. Nearly always two entries.
pub type Daughters = SmallVec<[Label; 2]>;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineageGraph {
    splits: BTreeMap<Label, Daughters>,
    annotations: BTreeMap<Label, String>,
}

impl LineageGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.splits.is_empty() && self.annotations.is_empty()
    }

    pub fn splits(&self) -> impl Iterator<Item = (Label, &[Label])> {
        self.splits.iter().map(|(&parent, d)| (parent, d.as_slice()))
    }

    pub fn annotations(&self) -> impl Iterator<Item = (Label, &str)> {
        self.annotations.iter().map(|(&label, a)| (label, a.as_str()))
    }

    #[must_use]
    pub fn daughters(&self, parent: Label) -> Option<&[Label]> {
        self.splits.get(&parent).map(SmallVec::as_slice)
    }

    /// The split that `daughter` currently belongs to, if any.
    #[must_use]
    pub fn parent_of(&self, daughter: Label) -> Option<Label> {
        self.splits
            .iter()
            .find(|(_, daughters)| daughters.contains(&daughter))
            .map(|(&parent, _)| parent)
    }

    #[must_use]
    pub fn annotation(&self, label: Label) -> Option<&str> {
        self.annotations.get(&label).map(String::as_str)
    }

    /// True if `label` appears anywhere in the graph, as parent, daughter,
    /// or annotation subject.
    #[must_use]
    pub fn references(&self, label: Label) -> bool {
        self.splits.contains_key(&label)
            || self.annotations.contains_key(&label)
            || self.parent_of(label).is_some()
    }

    /// Register `daughters` under `parent`, replacing any prior split owned
    /// by `parent`. Each daughter is first detached from whatever split it
    /// previously belonged to. Rejects an empty list, duplicates, and a list
    /// containing `parent` itself.
    pub fn add_split(&mut self, parent: Label, daughters: &[Label]) -> Result<()> {
        if daughters.is_empty() {
            return Err(TrackError::Validation {
                reason: format!("split under parent {parent} has no daughters"),
            });
        }
        if daughters.contains(&parent) {
            return Err(TrackError::Validation {
                reason: format!("label {parent} cannot be its own daughter"),
            });
        }
        for (i, daughter) in daughters.iter().enumerate() {
            if daughters[..i].contains(daughter) {
                return Err(TrackError::Validation {
                    reason: format!("daughter {daughter} listed twice under parent {parent}"),
                });
            }
        }
        for &daughter in daughters {
            self.detach_daughter(daughter);
        }
        self.splits.insert(parent, Daughters::from_slice(daughters));
        Ok(())
    }

    /// Remove `label` from every daughters list it appears in. A list
    /// emptied by the removal takes its split record with it.
    pub fn detach_daughter(&mut self, label: Label) {
        self.splits.retain(|_, daughters| {
            daughters.retain(|&mut d| d != label);
            !daughters.is_empty()
        });
    }

    /// Drop every occurrence of `label`: the split it owns as parent and its
    /// membership in any daughters list. Annotations are untouched; callers
    /// clear those explicitly when a track ceases to exist.
    pub fn remove_label(&mut self, label: Label) {
        self.splits.remove(&label);
        self.detach_daughter(label);
    }

    pub fn clear_annotation(&mut self, label: Label) {
        self.annotations.remove(&label);
    }

    /// Record why `label`'s track is not continued, overwriting any prior
    /// reason, and drop the split `label` owns as parent. Existing daughters
    /// of that split are only detached, never deleted.
    pub fn terminate(&mut self, label: Label, annotation: impl Into<String>) {
        self.annotations.insert(label, annotation.into());
        self.splits.remove(&label);
    }

    /// Exchange every occurrence of `a` and `b`: split ownership, daughter
    /// membership, and annotations.
    pub fn swap_labels(&mut self, a: Label, b: Label) {
        let exchange = |label: Label| {
            if label == a {
                b
            } else if label == b {
                a
            } else {
                label
            }
        };
        self.splits = self
            .splits
            .iter()
            .map(|(&parent, daughters)| {
                (
                    exchange(parent),
                    daughters.iter().map(|&d| exchange(d)).collect(),
                )
            })
            .collect();

        let annotation_a = self.annotations.remove(&a);
        let annotation_b = self.annotations.remove(&b);
        if let Some(annotation) = annotation_a {
            self.annotations.insert(b, annotation);
        }
        if let Some(annotation) = annotation_b {
            self.annotations.insert(a, annotation);
        }
    }

    /// Replace `old` with `new` wherever `old` appears as a daughter,
    /// keeping list positions. Used when a track's past is severed into a
    /// fresh branch label that inherits the backward lineage.
    pub fn substitute_daughter(&mut self, old: Label, new: Label) {
        for daughters in self.splits.values_mut() {
            for daughter in daughters.iter_mut() {
                if *daughter == old {
                    *daughter = new;
                }
            }
        }
    }

    /// Re-own the split of `old` under `new`. Used when a track's future is
    /// severed into a fresh label that inherits the forward lineage.
    pub fn reassign_parent(&mut self, old: Label, new: Label) {
        if let Some(daughters) = self.splits.remove(&old) {
            self.splits.insert(new, daughters);
        }
    }

    /// Move `old`'s annotation to `new`, if one exists.
    pub fn move_annotation(&mut self, old: Label, new: Label) {
        if let Some(annotation) = self.annotations.remove(&old) {
            self.annotations.insert(new, annotation);
        }
    }

    /// Splits currently holding exactly one daughter, as
    /// `(parent, daughter)` pairs. These are degenerate and must be folded
    /// back into the parent identity by the editor.
    #[must_use]
    pub fn single_daughter_splits(&self) -> Vec<(Label, Label)> {
        self.splits
            .iter()
            .filter(|(_, daughters)| daughters.len() == 1)
            .map(|(&parent, daughters)| (parent, daughters[0]))
            .collect()
    }

    /// Discard the split owned by `parent`, if any.
    pub fn drop_split(&mut self, parent: Label) {
        self.splits.remove(&parent);
    }
}
