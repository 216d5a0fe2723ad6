//! DOM snapshot extraction.
//!
//! Produces an address-stable view of the currently visible, enabled
//! interactable elements on the live page. Snapshots are always recomputed
//! fresh; a navigation or DOM mutation invalidates every previously returned
//! selector, so nothing here is cached.

pub mod model;
pub mod perceiver;
pub mod probe;

pub use model::{DomElement, DomSnapshot, ElementKind, SelectOptionItem};
pub use perceiver::DomPerceiver;
