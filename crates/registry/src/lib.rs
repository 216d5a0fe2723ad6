//! In-memory session registry for the HTTP front end.
//!
//! Each live conversation owns a pair of queues: callers push user messages
//! into the session's input sender and await replies on its output receiver.
//! The registry tracks last activity per session and a background reaper
//! closes sessions idle past their TTL.

pub mod model;
pub mod state;

pub use model::SessionCtx;
pub use state::{SessionRegistry, DEFAULT_IDLE_TTL, REAPER_SWEEP_INTERVAL};
