//! Shared closure cells.
//!
//! A [`CellBox`] is a single storage location shared by every frame that
//! captured it. Two frames see each other's writes only if they hold the
//! *same* box, so identity matters more than contents: the overlay engine
//! compares and restores boxes by identity, never by value.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A shared, mutable storage location holding at most one value.
///
/// Cloning a `CellBox` clones the handle, not the contents. Use
/// [`CellBox::duplicate`] to get an independent box.
pub struct CellBox<V>(Rc<RefCell<Option<V>>>);

impl<V> CellBox<V> {
    /// Creates a box with the given initial contents.
    pub fn new(initial: Option<V>) -> Self {
        Self(Rc::new(RefCell::new(initial)))
    }

    /// Creates a box holding `value`.
    pub fn with_value(value: V) -> Self {
        Self::new(Some(value))
    }

    /// Creates an empty box.
    pub fn empty() -> Self {
        Self::new(None)
    }

    /// Stores `value`, dropping whatever the box held before.
    pub fn set(&self, value: V) {
        *self.0.borrow_mut() = Some(value);
    }

    /// Empties the box and returns its previous contents.
    pub fn clear(&self) -> Option<V> {
        self.0.borrow_mut().take()
    }

    /// Replaces the contents, returning the previous ones.
    pub fn replace(&self, contents: Option<V>) -> Option<V> {
        std::mem::replace(&mut *self.0.borrow_mut(), contents)
    }

    pub fn is_empty(&self) -> bool {
        self.0.borrow().is_none()
    }

    /// Runs `f` against the current contents without cloning them.
    ///
    /// # Panics
    /// If `f` writes to this same box (through `set`, `clear` or `replace`
    /// on any handle to it), since the contents stay borrowed while `f` runs.
    pub fn with<R>(&self, f: impl FnOnce(Option<&V>) -> R) -> R {
        f(self.0.borrow().as_ref())
    }

    /// Returns `true` if both handles refer to the same box.
    pub fn same_cell(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }

    /// Number of live handles to this box.
    pub fn holders(&self) -> usize {
        Rc::strong_count(&self.0)
    }

    /// Address of the box, stable for its lifetime. Only meaningful for
    /// diagnostics.
    pub fn address(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }
}

impl<V: Clone> CellBox<V> {
    /// Reads the current contents. An empty box yields `None`.
    pub fn get(&self) -> Option<V> {
        self.0.borrow().clone()
    }

    /// Creates a new box, with a new identity, holding a copy of the current
    /// contents.
    pub fn duplicate(&self) -> Self {
        Self::new(self.get())
    }
}

impl<V> Clone for CellBox<V> {
    fn clone(&self) -> Self {
        Self(Rc::clone(&self.0))
    }
}

impl<V: fmt::Debug> fmt::Debug for CellBox<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.try_borrow() {
            Ok(contents) => write!(f, "CellBox@{:#x}({:?})", self.address(), *contents),
            Err(_) => write!(f, "CellBox@{:#x}(<borrowed>)", self.address()),
        }
    }
}

impl<V: fmt::Display> fmt::Display for CellBox<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.with(|contents| match contents {
            Some(value) => write!(f, "cell({value})"),
            None => write!(f, "cell(<empty>)"),
        })
    }
}
