//! Browser driver boundary.
//!
//! Everything above this crate talks to the browser exclusively through the
//! [`BrowserDriver`] trait. Two implementations ship here: [`ChromeDriver`]
//! (headless_chrome over CDP) and [`ScriptedDriver`] (deterministic double
//! for tests and offline development).

pub mod api;
pub mod chrome;
pub mod errors;
pub mod page_ops;
pub mod scripted;

pub use api::{BrowserDriver, SelectTarget};
pub use chrome::{ChromeDriver, ChromeDriverConfig};
pub use errors::DriverError;
pub use scripted::{DriverCall, ScriptedDriver};
