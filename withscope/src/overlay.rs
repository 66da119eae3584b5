//! Overlay application and reversal.
//!
//! [`apply`] substitutes named bindings of a live frame and returns a
//! [`RevertRecord`] holding everything it displaced. [`revert`] puts the
//! displaced bindings back. Bindings are *moved* between the frame, the
//! overlay and the record, so each slot touched gains exactly one owner and
//! loses exactly one, and a shared [`CellBox`] comes back with the same
//! identity it left with.
//!
//! Absence is tracked with `Option::None`, which no host value can collide
//! with. A slot that was unbound before `apply` is unbound again after
//! `revert`, even if the host has its own "none" value.

use crate::cell::CellBox;
use crate::frame::{FrameSlots, SlotKind};
use smallvec::SmallVec;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, trace};

/// Replacement for one named binding.
#[derive(Debug, Clone)]
pub enum Replacement<V> {
    /// A plain value. Installed as-is into a local slot; wrapped in a fresh
    /// box for a cell slot.
    Value(V),
    /// A cell. Swapped into a cell slot; read out into a local slot under
    /// [`CellMode::Unwrap`].
    Cell(CellBox<V>),
    /// Leaves the slot unbound.
    Clear,
}

/// How a [`Replacement::Cell`] lands in a local slot.
///
/// Cell slots always receive the box itself. The mode only matters for
/// local slots, and applies to every entry of one [`apply`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CellMode {
    /// Cells only replace cell slots. A local named by a cell entry is left
    /// alone.
    #[default]
    Swap,
    /// Locals named by a cell entry receive the cell's current contents.
    Unwrap,
}

/// Named replacements to apply to a frame.
///
/// Names the frame has no slot for are ignored, so one overlay can be
/// applied to frames with different variable sets.
#[derive(Debug, Clone)]
pub struct Overlay<V> {
    entries: BTreeMap<String, Replacement<V>>,
}

impl<V> Default for Overlay<V> {
    fn default() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }
}

impl<V> Overlay<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the entry for `name`.
    pub fn insert(&mut self, name: impl Into<String>, replacement: Replacement<V>) {
        self.entries.insert(name.into(), replacement);
    }

    pub fn value(mut self, name: impl Into<String>, value: V) -> Self {
        self.insert(name, Replacement::Value(value));
        self
    }

    pub fn cell(mut self, name: impl Into<String>, cell: CellBox<V>) -> Self {
        self.insert(name, Replacement::Cell(cell));
        self
    }

    pub fn clear(mut self, name: impl Into<String>) -> Self {
        self.insert(name, Replacement::Clear);
        self
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V, S: Into<String>> FromIterator<(S, Replacement<V>)> for Overlay<V> {
    fn from_iter<I: IntoIterator<Item = (S, Replacement<V>)>>(iter: I) -> Self {
        let mut overlay = Self::new();
        for (name, replacement) in iter {
            overlay.insert(name, replacement);
        }
        overlay
    }
}

impl<V> IntoIterator for Overlay<V> {
    type Item = (String, Replacement<V>);
    type IntoIter = std::collections::btree_map::IntoIter<String, Replacement<V>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Bindings displaced by [`apply`].
///
/// `None` entries record slots that were unbound.
#[derive(Debug)]
pub struct RevertRecord<V> {
    locals: SmallVec<[(String, Option<V>); 4]>,
    cells: SmallVec<[(String, Option<CellBox<V>>); 4]>,
}

impl<V> Default for RevertRecord<V> {
    fn default() -> Self {
        Self {
            locals: SmallVec::new(),
            cells: SmallVec::new(),
        }
    }
}

impl<V> RevertRecord<V> {
    /// Saved binding of a local, or `None` if the record has no entry.
    /// `Some(None)` means the local was unbound.
    pub fn local(&self, name: &str) -> Option<Option<&V>> {
        self.locals
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, saved)| saved.as_ref())
    }

    /// Saved box of a cell slot, or `None` if the record has no entry.
    /// `Some(None)` means the slot held no box.
    pub fn cell(&self, name: &str) -> Option<Option<&CellBox<V>>> {
        self.cells
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, saved)| saved.as_ref())
    }

    pub fn local_names(&self) -> impl Iterator<Item = &str> {
        self.locals.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.locals.len() + self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locals.is_empty() && self.cells.is_empty()
    }

    /// Turns the record into an overlay that swaps the saved bindings back
    /// in.
    ///
    /// Applying it with [`CellMode::Swap`] has the same effect as
    /// [`revert`], and returns a record that swaps the overlaid bindings in
    /// again. Hosts use this to toggle between two states of a frame.
    pub fn into_overlay(self) -> Overlay<V> {
        let locals = self.locals.into_iter().map(|(name, saved)| {
            let replacement = match saved {
                Some(value) => Replacement::Value(value),
                None => Replacement::Clear,
            };
            (name, replacement)
        });
        let cells = self.cells.into_iter().map(|(name, saved)| {
            let replacement = match saved {
                Some(cell) => Replacement::Cell(cell),
                None => Replacement::Clear,
            };
            (name, replacement)
        });
        locals.chain(cells).collect()
    }
}

impl<V: fmt::Display> fmt::Display for RevertRecord<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let locals: Vec<String> = self
            .locals
            .iter()
            .map(|(name, saved)| match saved {
                Some(value) => format!("{name}={value}"),
                None => format!("{name}=<absent>"),
            })
            .collect();
        let cells: Vec<String> = self
            .cells
            .iter()
            .map(|(name, saved)| match saved {
                Some(cell) => format!("{name}={cell}"),
                None => format!("{name}=<no cell>"),
            })
            .collect();
        write!(
            f,
            "locals {{{}}} cells {{{}}}",
            locals.join(", "),
            cells.join(", ")
        )
    }
}

/// Applies `overlay` to `frame` and returns what it displaced.
///
/// Every entry naming a slot of the frame is installed; other entries are
/// ignored and do not appear in the record. See [`Replacement`] and
/// [`CellMode`] for how each kind of entry lands in each kind of slot.
///
/// # Arguments
/// * `frame` - The frame to modify in place
/// * `overlay` - The replacements; ownership moves into the frame
/// * `mode` - How cell entries land in local slots
///
/// # Returns
/// The record to pass to [`revert`] to restore the frame.
pub fn apply<V, F>(frame: &mut F, overlay: Overlay<V>, mode: CellMode) -> RevertRecord<V>
where
    V: Clone,
    F: FrameSlots<V> + ?Sized,
{
    let mut record = RevertRecord::default();

    for (name, replacement) in overlay {
        let Some(slot) = frame.resolve(&name) else {
            trace!("Overlay name '{}' has no slot in frame, ignored", name);
            continue;
        };

        match slot.kind {
            SlotKind::Local => {
                let binding = match replacement {
                    Replacement::Value(value) => Some(value),
                    Replacement::Clear => None,
                    Replacement::Cell(cell) => match mode {
                        CellMode::Unwrap => cell.get(),
                        CellMode::Swap => {
                            trace!("Cell entry '{}' skipped for local slot in swap mode", name);
                            continue;
                        }
                    },
                };
                let previous = frame.replace_local(slot.index, binding);
                record.locals.push((name, previous));
            }
            SlotKind::CellBound | SlotKind::FreeCaptured => {
                let cell = match replacement {
                    Replacement::Cell(cell) => Some(cell),
                    Replacement::Value(value) => Some(CellBox::with_value(value)),
                    Replacement::Clear => None,
                };
                let previous = frame.replace_cell(slot.index, cell);
                record.cells.push((name, previous));
            }
        }
    }

    debug!(
        "Applied overlay: {} local(s), {} cell(s) replaced",
        record.locals.len(),
        record.cells.len()
    );
    record
}

/// Restores the bindings displaced by [`apply`].
///
/// `record` must come from an `apply` on this same frame, and must not
/// have been reverted already. Names the frame no longer resolves, or that
/// resolve to a slot of a different kind, are skipped.
pub fn revert<V, F>(frame: &mut F, record: RevertRecord<V>)
where
    F: FrameSlots<V> + ?Sized,
{
    let (locals, cells) = (record.locals.len(), record.cells.len());

    for (name, saved) in record.locals {
        match frame.resolve(&name) {
            Some(slot) if slot.kind == SlotKind::Local => {
                drop(frame.replace_local(slot.index, saved));
            }
            _ => debug!("Revert record local '{}' does not match frame, skipped", name),
        }
    }

    for (name, saved) in record.cells {
        match frame.resolve(&name) {
            Some(slot) if slot.kind.is_cell() => {
                drop(frame.replace_cell(slot.index, saved));
            }
            _ => debug!("Revert record cell '{}' does not match frame, skipped", name),
        }
    }

    debug!("Reverted overlay: {} local(s), {} cell(s) restored", locals, cells);
}
