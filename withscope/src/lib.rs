//! WithScope Library
//!
//! Temporarily overlays named bindings onto a running frame and restores
//! the frame exactly afterwards. This is the machinery behind lexical
//! `with let(...)` scopes injected into code that is already executing,
//! including recursive and closure-capturing code.
//!
//! The engine ([`apply`], [`revert`], and the bulk cell operations) is
//! stateless and written against the [`FrameSlots`] trait. [`Frame`] is the
//! reference host adapter and [`Scope`] is a scope manager built on top.
//!
//! ```
//! use withscope::{CellBox, CellMode, CodeLayout, Frame, Overlay, apply, revert};
//!
//! let mut frame = Frame::new(CodeLayout::new(["a", "b"], ["c"], [] as [&str; 0]));
//! frame.set_local("a", 1).unwrap();
//! frame.bind_cell("c", CellBox::with_value(10)).unwrap();
//!
//! let overlay = Overlay::new().value("a", 99).clear("b").cell("c", CellBox::with_value(42));
//! let record = apply(&mut frame, overlay, CellMode::Swap);
//! assert_eq!(frame.lookup("a"), Some(99));
//! assert_eq!(frame.lookup("c"), Some(42));
//!
//! revert(&mut frame, record);
//! assert_eq!(frame.lookup("a"), Some(1));
//! assert_eq!(frame.lookup("b"), None);
//! assert_eq!(frame.lookup("c"), Some(10));
//! ```

pub mod cell;
pub mod cells;
pub mod frame;
pub mod overlay;
pub mod scope;
pub mod value;

pub use crate::cell::CellBox;
pub use crate::cells::{CellSnapshot, get_cells, recreate_cells, set_cells};
pub use crate::frame::{CodeLayout, Frame, FrameSlots, Namespace, SlotKind, SlotRef};
pub use crate::overlay::{CellMode, Overlay, Replacement, RevertRecord, apply, revert};
pub use crate::scope::{Scope, ScopeError, ScopeGuard};
pub use crate::value::Value;
