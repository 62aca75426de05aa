//! Interface to the external transactional volume store, plus an in-memory
//! reference implementation.
//!
//! The editing core never owns the persisted chunked array; it issues
//! bounded-region reads and selection writes against a caller-supplied
//! transaction handle. [`ArrayVolume`] models that contract in memory with a
//! stage-then-commit transaction: reads through the handle observe staged
//! writes, `commit` publishes them to the base array, and dropping the
//! handle (or calling `discard`) throws them away.

use std::ops::Range;

use ndarray::{Array2, Array3, s};

use crate::error::{Result, TrackError};
use crate::types::{Frame, Label};

/// Read access to a labeled volume: shape queries plus bounded-region reads.
pub trait VolumeRead {
    fn frames(&self) -> usize;
    fn height(&self) -> usize;
    fn width(&self) -> usize;

    /// Dense copy of the `(ys, xs)` window of `frame`.
    fn read_window(&self, frame: Frame, ys: Range<usize>, xs: Range<usize>)
    -> Result<Array2<Label>>;
}

/// A transaction handle over a volume store. Writes take a boolean selection
/// addressed relative to the window's own origin and a fill value; reads
/// through the same handle must observe earlier writes in the transaction.
pub trait VolumeTxn: VolumeRead {
    fn write_where(
        &mut self,
        frame: Frame,
        ys: Range<usize>,
        xs: Range<usize>,
        selection: &Array2<bool>,
        fill: Label,
    ) -> Result<()>;
}

fn check_window(
    frames: usize,
    height: usize,
    width: usize,
    frame: Frame,
    ys: &Range<usize>,
    xs: &Range<usize>,
) -> Result<()> {
    if frame >= frames {
        return Err(TrackError::Bounds {
            reason: format!("frame {frame} outside volume of {frames} frame(s)"),
        });
    }
    if ys.end > height || xs.end > width || ys.start > ys.end || xs.start > xs.end {
        return Err(TrackError::Bounds {
            reason: format!(
                "window y={}..{} x={}..{} outside frame extent {height}x{width}",
                ys.start, ys.end, xs.start, xs.end
            ),
        });
    }
    Ok(())
}

/// In-memory labeled volume backed by a dense `(frame, y, x)` array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayVolume {
    data: Array3<Label>,
}

impl ArrayVolume {
    /// All-background volume of the given shape.
    #[must_use]
    pub fn zeros(frames: usize, height: usize, width: usize) -> Self {
        Self {
            data: Array3::zeros((frames, height, width)),
        }
    }

    #[must_use]
    pub fn from_array(data: Array3<Label>) -> Self {
        Self { data }
    }

    #[must_use]
    pub fn as_array(&self) -> &Array3<Label> {
        &self.data
    }

    /// Begin a transaction. Writes are staged against a private copy until
    /// [`ArrayVolumeTxn::commit`]; dropping the handle discards them.
    pub fn begin(&mut self) -> ArrayVolumeTxn<'_> {
        let staged = self.data.clone();
        ArrayVolumeTxn { base: self, staged }
    }
}

impl VolumeRead for ArrayVolume {
    fn frames(&self) -> usize {
        self.data.shape()[0]
    }

    fn height(&self) -> usize {
        self.data.shape()[1]
    }

    fn width(&self) -> usize {
        self.data.shape()[2]
    }

    fn read_window(
        &self,
        frame: Frame,
        ys: Range<usize>,
        xs: Range<usize>,
    ) -> Result<Array2<Label>> {
        check_window(self.frames(), self.height(), self.width(), frame, &ys, &xs)?;
        Ok(self.data.slice(s![frame, ys, xs]).to_owned())
    }
}

/// Staged transaction over an [`ArrayVolume`].
#[derive(Debug)]
pub struct ArrayVolumeTxn<'a> {
    base: &'a mut ArrayVolume,
    staged: Array3<Label>,
}

impl ArrayVolumeTxn<'_> {
    /// Publish all staged writes to the base volume.
    pub fn commit(self) {
        self.base.data = self.staged;
    }

    /// Drop all staged writes. Equivalent to dropping the handle.
    pub fn discard(self) {}
}

impl VolumeRead for ArrayVolumeTxn<'_> {
    fn frames(&self) -> usize {
        self.staged.shape()[0]
    }

    fn height(&self) -> usize {
        self.staged.shape()[1]
    }

    fn width(&self) -> usize {
        self.staged.shape()[2]
    }

    fn read_window(
        &self,
        frame: Frame,
        ys: Range<usize>,
        xs: Range<usize>,
    ) -> Result<Array2<Label>> {
        check_window(self.frames(), self.height(), self.width(), frame, &ys, &xs)?;
        Ok(self.staged.slice(s![frame, ys, xs]).to_owned())
    }
}

impl VolumeTxn for ArrayVolumeTxn<'_> {
    fn write_where(
        &mut self,
        frame: Frame,
        ys: Range<usize>,
        xs: Range<usize>,
        selection: &Array2<bool>,
        fill: Label,
    ) -> Result<()> {
        check_window(self.frames(), self.height(), self.width(), frame, &ys, &xs)?;
        let window_shape = (ys.end - ys.start, xs.end - xs.start);
        if selection.dim() != window_shape {
            return Err(TrackError::Bounds {
                reason: format!(
                    "selection shape {:?} does not match window shape {window_shape:?}",
                    selection.dim()
                ),
            });
        }
        let mut window = self.staged.slice_mut(s![frame, ys, xs]);
        for ((y, x), selected) in selection.indexed_iter() {
            if *selected {
                window[(y, x)] = fill;
            }
        }
        Ok(())
    }
}
