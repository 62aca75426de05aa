//! Error taxonomy for the track-volume editing core.
//!
//! None of these are recovered internally; every variant propagates to the
//! caller unchanged. `Integrity` is the structured report produced by
//! [`crate::BBoxIndex::validate`] and carries the symmetric difference
//! between the maintained index and a fresh extraction, not a bare flag.

use thiserror::Error;

use crate::types::{BBoxRow, Frame, Label};

pub type Result<T> = std::result::Result<T, TrackError>;

#[derive(Debug, Error)]
pub enum TrackError {
    /// No index entry exists for `(frame, label)`.
    #[error("no index entry for label {label} at frame {frame}")]
    NotFound { frame: Frame, label: Label },

    /// The label has no entry in any frame.
    #[error("label {label} has no entries in any frame")]
    UnknownLabel { label: Label },

    /// The destination key of an insert or rename is already occupied.
    #[error("index entry for label {label} at frame {frame} already exists")]
    Conflict { frame: Frame, label: Label },

    /// A window or mask placement exceeds the volume extent.
    #[error("window out of bounds: {reason}")]
    Bounds { reason: String },

    /// A malformed request: empty or duplicate daughter list, a label listed
    /// as its own daughter, a mask with no set pixels.
    #[error("invalid request: {reason}")]
    Validation { reason: String },

    /// The maintained index has drifted from the raw volume. `missing` rows
    /// exist in the volume but not in the index; `unexpected` rows exist in
    /// the index but not in the volume.
    #[error("index drift: {} row(s) missing, {} row(s) unexpected", .missing.len(), .unexpected.len())]
    Integrity {
        missing: Vec<BBoxRow>,
        unexpected: Vec<BBoxRow>,
    },

    /// The external volume store rejected or aborted the enclosing
    /// transaction. Surfaced by [`crate::volume::VolumeTxn`] implementations.
    #[error("volume store: {reason}")]
    Store { reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
