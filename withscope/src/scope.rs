//! Lexical scopes layered over a running frame.
//!
//! A [`Scope`] owns one [`CellBox`] per name it defines. Entering the scope
//! overlays those names onto a frame: local slots receive the current
//! values, cell slots receive the boxes themselves (so closures created
//! while the scope is active capture the scope's variables), and names the
//! frame has no slot for are injected as globals. Exiting writes local and
//! injected values back into the boxes and restores the frame.
//!
//! The boxes outlive any one entry, so a scope can be entered again later
//! and will see the values it was left with.

use crate::cell::CellBox;
use crate::frame::Frame;
use crate::overlay::{self, CellMode, Replacement, RevertRecord};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::rc::Rc;
use tracing::{debug, warn};

/// Misuse of a [`Scope`]'s enter/exit protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeError {
    /// The scope is already active. Use [`Scope::alias`] to enter the same
    /// bindings twice.
    InUse,
    /// The scope was exited without being entered.
    NotActive,
}

impl fmt::Display for ScopeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeError::InUse => write!(f, "scope is already in use"),
            ScopeError::NotActive => write!(f, "scope is not active"),
        }
    }
}

impl std::error::Error for ScopeError {}

#[derive(Debug)]
struct ActiveScope<V> {
    record: RevertRecord<V>,
    /// Injected global names with the global value each one shadowed.
    injected: Vec<(String, Option<V>)>,
}

/// A reusable set of named bindings that can be layered over a frame.
#[derive(Debug)]
pub struct Scope<V> {
    cells: Rc<BTreeMap<String, CellBox<V>>>,
    active: Option<ActiveScope<V>>,
}

impl<V: Clone> Scope<V> {
    pub fn new<I, S>(bindings: I) -> Self
    where
        I: IntoIterator<Item = (S, V)>,
        S: Into<String>,
    {
        let cells = bindings
            .into_iter()
            .map(|(name, value)| (name.into(), CellBox::with_value(value)))
            .collect();
        Self {
            cells: Rc::new(cells),
            active: None,
        }
    }

    /// Creates a scope sharing this scope's boxes but with its own active
    /// state, so it can be entered while this one is active.
    pub fn alias(&self) -> Self {
        Self {
            cells: Rc::clone(&self.cells),
            active: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    /// Current value of `name` in this scope.
    pub fn get(&self, name: &str) -> Option<V> {
        self.cells.get(name).and_then(CellBox::get)
    }

    pub fn cell(&self, name: &str) -> Option<&CellBox<V>> {
        self.cells.get(name)
    }

    /// Names that currently have a value. A name whose value was deleted
    /// while the scope was active is no longer defined.
    pub fn defined(&self) -> impl Iterator<Item = &str> {
        self.cells
            .iter()
            .filter(|(_, cell)| !cell.is_empty())
            .map(|(name, _)| name.as_str())
    }

    /// Layers this scope's bindings over `frame`.
    pub fn enter(&mut self, frame: &mut Frame<V>) -> Result<(), ScopeError> {
        if self.active.is_some() {
            return Err(ScopeError::InUse);
        }

        let mut injected = Vec::new();
        let mut overlay = overlay::Overlay::new();
        for (name, cell) in self.cells.iter() {
            let Some(value) = cell.get() else {
                continue;
            };
            if frame.layout().resolve(name).is_some() {
                overlay.insert(name.clone(), Replacement::Cell(cell.clone()));
            } else {
                let shadowed = frame.globals_mut().insert(name.clone(), value);
                injected.push((name.clone(), shadowed));
            }
        }

        let record = overlay::apply(frame, overlay, CellMode::Unwrap);
        debug!(
            "Entered scope: {} slot(s) overlaid, {} global(s) injected",
            record.len(),
            injected.len()
        );
        self.active = Some(ActiveScope { record, injected });
        Ok(())
    }

    /// Removes this scope's bindings from `frame`, keeping the values they
    /// ended up with for the next entry.
    ///
    /// `frame` must be the frame passed to [`Scope::enter`].
    pub fn exit(&mut self, frame: &mut Frame<V>) -> Result<(), ScopeError> {
        let ActiveScope { record, injected } = self.active.take().ok_or(ScopeError::NotActive)?;

        for name in record.local_names() {
            let current = frame.local(name).ok().flatten().cloned();
            if let Some(cell) = self.cells.get(name) {
                cell.replace(current);
            }
        }

        let globals = frame.globals_mut();
        for (name, shadowed) in injected {
            let current = match shadowed {
                Some(value) => globals.insert(name.clone(), value),
                None => globals.remove(&name),
            };
            if let Some(cell) = self.cells.get(&name) {
                cell.replace(current);
            }
        }

        overlay::revert(frame, record);
        debug!("Exited scope");
        Ok(())
    }

    /// Enters the scope and returns a guard that exits it when dropped,
    /// including during unwinding.
    pub fn guard<'a>(&'a mut self, frame: &'a mut Frame<V>) -> Result<ScopeGuard<'a, V>, ScopeError> {
        self.enter(frame)?;
        Ok(ScopeGuard { scope: self, frame })
    }

    /// Runs `f` with this scope layered over `frame`.
    pub fn with<R>(
        &mut self,
        frame: &mut Frame<V>,
        f: impl FnOnce(&mut Frame<V>) -> R,
    ) -> Result<R, ScopeError> {
        let mut guard = self.guard(frame)?;
        Ok(f(&mut *guard))
    }
}

/// An active scope. Derefs to the frame it is layered over.
#[must_use = "the scope exits when the guard is dropped"]
pub struct ScopeGuard<'a, V: Clone> {
    scope: &'a mut Scope<V>,
    frame: &'a mut Frame<V>,
}

impl<V: Clone> Deref for ScopeGuard<'_, V> {
    type Target = Frame<V>;

    fn deref(&self) -> &Frame<V> {
        &*self.frame
    }
}

impl<V: Clone> DerefMut for ScopeGuard<'_, V> {
    fn deref_mut(&mut self) -> &mut Frame<V> {
        &mut *self.frame
    }
}

impl<V: Clone> Drop for ScopeGuard<'_, V> {
    fn drop(&mut self) {
        if let Err(e) = self.scope.exit(&mut *self.frame) {
            warn!("Failed to exit scope: {}", e);
        }
    }
}
