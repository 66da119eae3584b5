//! Bulk operations on a frame's cell region.
//!
//! These work on every cell-bound and free slot at once, in layout order
//! (cell-bound region first, then free region). Cloning and snapshotting
//! facilities use them to relocate closure state independently of any
//! overlay.

use crate::cell::CellBox;
use crate::frame::FrameSlots;
use smallvec::SmallVec;
use tracing::debug;

/// Cell boxes of a frame in layout order. `None` marks a slot with no box.
pub type CellSnapshot<V> = SmallVec<[Option<CellBox<V>>; 8]>;

/// Gives every cell slot a fresh box holding a copy of its current value.
///
/// Afterwards the frame shares no cell with any other frame. Slots without
/// a box stay without one.
pub fn recreate_cells<V, F>(frame: &mut F)
where
    V: Clone,
    F: FrameSlots<V> + ?Sized,
{
    let mut recreated = 0;
    for index in 0..frame.cell_count() {
        let Some(fresh) = frame.cell_at(index).map(CellBox::duplicate) else {
            continue;
        };
        drop(frame.replace_cell(index, Some(fresh)));
        recreated += 1;
    }
    debug!("Recreated {} cell(s)", recreated);
}

/// Returns the boxes held by every cell slot, in layout order.
pub fn get_cells<V, F>(frame: &F) -> CellSnapshot<V>
where
    F: FrameSlots<V> + ?Sized,
{
    (0..frame.cell_count())
        .map(|index| frame.cell_at(index).cloned())
        .collect()
}

/// Installs `snapshot` into the cell slots, in layout order.
///
/// # Panics
/// If `snapshot` does not have exactly one entry per cell slot. Passing a
/// snapshot taken from a frame of different code is a caller bug.
pub fn set_cells<V, F>(frame: &mut F, snapshot: CellSnapshot<V>)
where
    F: FrameSlots<V> + ?Sized,
{
    assert_eq!(
        snapshot.len(),
        frame.cell_count(),
        "Cell snapshot length does not match the frame's cell slots"
    );
    for (index, cell) in snapshot.into_iter().enumerate() {
        drop(frame.replace_cell(index, cell));
    }
}
