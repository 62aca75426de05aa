#![deny(clippy::all, clippy::pedantic)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![allow(clippy::module_name_repetitions)]
//
// Strategic lint exceptions, allowed project-wide for pragmatic reasons:
//
// Documentation lints: internal/self-documenting functions don't need
// extensive docs. Public APIs should still have proper documentation.
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]
//
// Cast safety: casts here are bounded by real-world constraints (frame
// counts, image extents); try_into() everywhere would add complexity
// without safety benefit.
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::len_without_is_empty)]
#![allow(clippy::similar_names)]
// e.g., min_y, min_x, max_y, max_x are intentionally similar
//
// Performance/ergonomics trade-offs that are acceptable for this codebase:
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::explicit_iter_loop)]
#![allow(clippy::iter_without_into_iter)]
//
// Return value wrapping: some functions use Result for consistency even when
// they currently can't fail, allowing future error conditions to be added
// without breaking API.
#![allow(clippy::unnecessary_wraps)]

/*!
Editing and indexing core for persisted, chunked, frame-sequenced
labeled-image volumes used for object tracking (e.g., cell lineages across
a time-lapse).

The crate keeps two in-memory structures — the bounding-box index
([`BBoxIndex`]) and the lineage graph ([`LineageGraph`]) — in bijective
correspondence with the pixel data held by an external transactional volume
store, while [`TrackEditor`] composes pixel edits, index remaps, and graph
updates into logically atomic operations.

```rust
use trackvol_core::{ArrayVolume, LineageGraph, TrackEditor};
use ndarray::Array3;

let mut data = Array3::zeros((3, 8, 8));
data[(0, 2, 2)] = 1;
data[(1, 2, 3)] = 1;
data[(2, 3, 3)] = 1;
let mut volume = ArrayVolume::from_array(data);

let mut editor = TrackEditor::from_volume(&volume, LineageGraph::new())?;
let mut txn = volume.begin();
editor.terminate_track(1, 1, "left field of view", &mut txn)?;
txn.commit();

editor.validate(&volume)?;
# Ok::<(), trackvol_core::TrackError>(())
```
*/

/// The trackvol-core crate version (matches `Cargo.toml`).
pub const TRACKVOL_CORE_VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod editor;
pub mod error;
pub mod extract;
pub mod index;
pub mod lineage;
pub mod types;
pub mod volume;

pub use editor::{EditorStats, TrackEditor};
pub use error::{Result, TrackError};
pub use extract::bbox_table;
pub use index::BBoxIndex;
pub use lineage::{Daughters, LineageGraph};
pub use types::{BACKGROUND, BBoxRow, BoundingBox, Frame, Label, TrackExtent};
pub use volume::{ArrayVolume, ArrayVolumeTxn, VolumeRead, VolumeTxn};
