//! Execution frame model.
//!
//! A frame holds the named slots of one active invocation. Slots are laid
//! out in three contiguous regions fixed by the invoked code's
//! [`CodeLayout`]:
//!
//! - `Local` slots own their value directly.
//! - `CellBound` slots hold a [`CellBox`] created by this invocation and
//!   captured by nested functions.
//! - `FreeCaptured` slots hold a [`CellBox`] received from an enclosing
//!   invocation.
//!
//! The overlay engine never touches [`Frame`] directly. It is written
//! against the [`FrameSlots`] capability trait, so an interpreter with its
//! own frame layout only needs an adapter implementing that trait.

use crate::cell::CellBox;
use anyhow::{Result, anyhow, bail};
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

/// Global bindings visible to a frame.
pub type Namespace<V> = BTreeMap<String, V>;

/// Category of a frame slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SlotKind {
    /// Plain local variable, owned by the frame.
    Local,
    /// Cell created by this invocation for its nested closures.
    CellBound,
    /// Cell captured from an enclosing invocation.
    FreeCaptured,
}

impl SlotKind {
    /// Returns `true` for the slot kinds that hold a [`CellBox`].
    pub fn is_cell(self) -> bool {
        matches!(self, SlotKind::CellBound | SlotKind::FreeCaptured)
    }
}

/// Resolved position of a named slot.
///
/// For `Local` slots `index` addresses the local region. For cell slots it
/// addresses the combined cell region: `CellBound` slots first, then
/// `FreeCaptured` slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotRef {
    pub kind: SlotKind,
    pub index: usize,
}

/// Slot names of a piece of code, per region.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeLayout {
    locals: Vec<String>,
    cellvars: Vec<String>,
    freevars: Vec<String>,
}

impl CodeLayout {
    pub fn new<L, C, F>(locals: L, cellvars: C, freevars: F) -> Self
    where
        L: IntoIterator,
        L::Item: AsRef<str>,
        C: IntoIterator,
        C::Item: AsRef<str>,
        F: IntoIterator,
        F::Item: AsRef<str>,
    {
        fn names<I: IntoIterator<Item: AsRef<str>>>(names: I) -> Vec<String> {
            names.into_iter().map(|n| n.as_ref().to_string()).collect()
        }
        Self {
            locals: names(locals),
            cellvars: names(cellvars),
            freevars: names(freevars),
        }
    }

    pub fn locals(&self) -> &[String] {
        &self.locals
    }

    pub fn cellvars(&self) -> &[String] {
        &self.cellvars
    }

    pub fn freevars(&self) -> &[String] {
        &self.freevars
    }

    /// Number of slots in the combined cell region.
    pub fn cell_count(&self) -> usize {
        self.cellvars.len() + self.freevars.len()
    }

    /// Finds the slot for `name`, searching locals, then cell-bound, then
    /// free variables.
    pub fn resolve(&self, name: &str) -> Option<SlotRef> {
        if let Some(index) = self.locals.iter().position(|n| n == name) {
            return Some(SlotRef {
                kind: SlotKind::Local,
                index,
            });
        }
        if let Some(index) = self.cellvars.iter().position(|n| n == name) {
            return Some(SlotRef {
                kind: SlotKind::CellBound,
                index,
            });
        }
        self.freevars
            .iter()
            .position(|n| n == name)
            .map(|index| SlotRef {
                kind: SlotKind::FreeCaptured,
                index: self.cellvars.len() + index,
            })
    }
}

/// Named-slot access needed by the overlay engine.
///
/// Implementations must keep slot identity (name and kind) fixed for the
/// lifetime of the frame. Indices passed back into the `replace_*` methods
/// always come from [`FrameSlots::resolve`] or are below
/// [`FrameSlots::cell_count`].
pub trait FrameSlots<V> {
    /// Finds the slot bound to `name`, if the frame has one.
    fn resolve(&self, name: &str) -> Option<SlotRef>;

    /// Installs `binding` into a local slot and returns the previous binding.
    fn replace_local(&mut self, index: usize, binding: Option<V>) -> Option<V>;

    /// Installs `cell` into a cell slot and returns the previous box.
    fn replace_cell(&mut self, index: usize, cell: Option<CellBox<V>>) -> Option<CellBox<V>>;

    /// Returns the box held by a cell slot.
    fn cell_at(&self, index: usize) -> Option<&CellBox<V>>;

    /// Size of the combined cell region.
    fn cell_count(&self) -> usize;
}

/// Reference frame implementation.
///
/// Cloning a frame copies its locals and globals but shares its cells, the
/// same way two invocations closing over the same variables would. Use
/// [`Frame::detached`] for a copy with independent cells.
#[derive(Debug, Clone)]
pub struct Frame<V> {
    layout: Rc<CodeLayout>,
    locals: Vec<Option<V>>,
    cells: Vec<Option<CellBox<V>>>,
    globals: Namespace<V>,
}

impl<V> Frame<V> {
    /// Creates a frame for the given code layout.
    ///
    /// Locals start unbound. Every cell-bound slot gets a fresh empty box;
    /// free slots start without a box until [`Frame::bind_cell`] or
    /// [`Frame::enclosed_by`] provides one.
    pub fn new(layout: impl Into<Rc<CodeLayout>>) -> Self {
        let layout = layout.into();
        let locals = std::iter::repeat_with(|| None)
            .take(layout.locals.len())
            .collect();
        let cells = (0..layout.cell_count())
            .map(|index| (index < layout.cellvars.len()).then(CellBox::empty))
            .collect();

        Self {
            layout,
            locals,
            cells,
            globals: Namespace::new(),
        }
    }

    pub fn layout(&self) -> &CodeLayout {
        &self.layout
    }

    /// Returns the value of a local slot.
    ///
    /// # Returns
    /// * `Ok(Some(&value))` - The local is bound
    /// * `Ok(None)` - The local exists but is unbound
    /// * `Err(anyhow::Error)` - `name` is not a local of this frame
    pub fn local(&self, name: &str) -> Result<Option<&V>> {
        let index = self.local_index(name)?;
        Ok(self.locals[index].as_ref())
    }

    /// Binds a local slot to `value`.
    pub fn set_local(&mut self, name: &str, value: V) -> Result<()> {
        let index = self.local_index(name)?;
        self.locals[index] = Some(value);
        Ok(())
    }

    /// Unbinds a local slot, returning its previous value.
    pub fn clear_local(&mut self, name: &str) -> Result<Option<V>> {
        let index = self.local_index(name)?;
        Ok(self.locals[index].take())
    }

    /// Returns the box held by a cell-bound or free slot.
    pub fn cell(&self, name: &str) -> Result<Option<&CellBox<V>>> {
        let index = self.cell_index(name)?;
        Ok(self.cells[index].as_ref())
    }

    /// Installs `cell` into a cell-bound or free slot.
    pub fn bind_cell(&mut self, name: &str, cell: CellBox<V>) -> Result<()> {
        let index = self.cell_index(name)?;
        self.cells[index] = Some(cell);
        Ok(())
    }

    pub fn globals(&self) -> &Namespace<V> {
        &self.globals
    }

    pub fn globals_mut(&mut self) -> &mut Namespace<V> {
        &mut self.globals
    }

    /// Swaps in a new globals namespace and returns the old one.
    pub fn replace_globals(&mut self, globals: Namespace<V>) -> Namespace<V> {
        std::mem::replace(&mut self.globals, globals)
    }

    /// Writes `value` to whatever `name` refers to: a local, the contents of
    /// a cell, or a global when the frame has no slot for it.
    pub fn assign(&mut self, name: &str, value: V) -> Result<()> {
        match self.layout.resolve(name) {
            Some(SlotRef {
                kind: SlotKind::Local,
                index,
            }) => self.locals[index] = Some(value),
            Some(SlotRef { index, .. }) => match &self.cells[index] {
                Some(cell) => cell.set(value),
                None => bail!("Cell slot '{}' has no cell bound", name),
            },
            None => {
                self.globals.insert(name.to_string(), value);
            }
        }
        Ok(())
    }

    /// Removes the binding `name` refers to.
    ///
    /// Fails if the name is unbound, like deleting an undefined variable.
    pub fn delete(&mut self, name: &str) -> Result<()> {
        let removed = match self.layout.resolve(name) {
            Some(SlotRef {
                kind: SlotKind::Local,
                index,
            }) => self.locals[index].take().is_some(),
            Some(SlotRef { index, .. }) => self.cells[index]
                .as_ref()
                .is_some_and(|cell| cell.clear().is_some()),
            None => self.globals.remove(name).is_some(),
        };
        if !removed {
            bail!("Name '{}' is not bound", name);
        }
        Ok(())
    }

    fn local_index(&self, name: &str) -> Result<usize> {
        match self.layout.resolve(name) {
            Some(SlotRef {
                kind: SlotKind::Local,
                index,
            }) => Ok(index),
            Some(slot) => bail!("'{}' is a {:?} slot, not a local", name, slot.kind),
            None => bail!("No slot named '{}'", name),
        }
    }

    fn cell_index(&self, name: &str) -> Result<usize> {
        match self.layout.resolve(name) {
            Some(slot) if slot.kind.is_cell() => Ok(slot.index),
            Some(_) => bail!("'{}' is a local, not a cell slot", name),
            None => bail!("No slot named '{}'", name),
        }
    }
}

impl<V: Clone> Frame<V> {
    /// Creates a frame for a nested function, binding each of its free
    /// variables to the cell `parent` holds under the same name.
    pub fn enclosed_by(layout: impl Into<Rc<CodeLayout>>, parent: &Frame<V>) -> Result<Self> {
        let mut frame = Self::new(layout);
        let layout = Rc::clone(&frame.layout);
        for name in layout.freevars() {
            let cell = parent
                .cell(name)
                .map_err(|e| anyhow!("Cannot capture '{}': {}", name, e))?
                .ok_or_else(|| anyhow!("Cannot capture '{}': enclosing slot has no cell", name))?;
            frame.bind_cell(name, cell.clone())?;
        }
        Ok(frame)
    }

    /// Reads whatever `name` refers to: a local, the contents of a cell, or
    /// a global when the frame has no slot for it.
    pub fn lookup(&self, name: &str) -> Option<V> {
        match self.layout.resolve(name) {
            Some(SlotRef {
                kind: SlotKind::Local,
                index,
            }) => self.locals[index].clone(),
            Some(SlotRef { index, .. }) => self.cells[index].as_ref().and_then(CellBox::get),
            None => self.globals.get(name).cloned(),
        }
    }

    /// Returns a copy of this frame whose cells no longer alias anything.
    pub fn detached(&self) -> Self {
        let mut frame = self.clone();
        crate::cells::recreate_cells(&mut frame);
        frame
    }
}

impl<V> FrameSlots<V> for Frame<V> {
    fn resolve(&self, name: &str) -> Option<SlotRef> {
        self.layout.resolve(name)
    }

    fn replace_local(&mut self, index: usize, binding: Option<V>) -> Option<V> {
        std::mem::replace(&mut self.locals[index], binding)
    }

    fn replace_cell(&mut self, index: usize, cell: Option<CellBox<V>>) -> Option<CellBox<V>> {
        std::mem::replace(&mut self.cells[index], cell)
    }

    fn cell_at(&self, index: usize) -> Option<&CellBox<V>> {
        self.cells[index].as_ref()
    }

    fn cell_count(&self) -> usize {
        self.cells.len()
    }
}

impl<V: fmt::Display> fmt::Display for Frame<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let locals = self.layout.locals.iter().zip(&self.locals).map(|(name, value)| match value {
            Some(value) => format!("{name}={value}"),
            None => format!("{name}=<absent>"),
        });
        let cells = self
            .layout
            .cellvars
            .iter()
            .chain(&self.layout.freevars)
            .zip(&self.cells)
            .map(|(name, cell)| match cell {
                Some(cell) => format!("{name}={cell}"),
                None => format!("{name}=<no cell>"),
            });
        let slots: Vec<String> = locals.chain(cells).collect();
        write!(f, "{{{}}}", slots.join(", "))
    }
}
