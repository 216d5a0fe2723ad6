//! Visual element locator.
//!
//! A fallback used only when a structural selector is unknown or has failed:
//! a screenshot plus a natural-language description goes to a vision model,
//! pixel coordinates come back. Coordinates outside the viewport are
//! discarded and reported as not-found.

pub mod api;
pub mod parse;
pub mod vlm;

pub use api::{DisabledLocator, LocateError, LocatedPoint, MockLocator, VisualLocator};
pub use vlm::{VlmLocator, VlmLocatorConfig};
