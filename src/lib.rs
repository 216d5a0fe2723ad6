//! FormPilot: an automation agent for multi-step government web portals.
//!
//! The binary wraps the workspace crates into two entry points: a queue-based
//! HTTP API (`serve`) for chat frontends, and an interactive terminal mode
//! (`run`). Plans come from [`formpilot_recipes`], execution from
//! [`agent_flow`], browser control from [`browser_adapter`].

pub mod cli;
pub mod config;
pub mod server;
