//! Decision service boundary.
//!
//! Given the active intent, a fresh DOM snapshot, the originating plan step
//! and the known profile facts, the decision service answers with exactly one
//! of: perform an action, ask the user something, or declare the form ready
//! to submit. Malformed service output is always coerced to an ASK_USER
//! decision; it never crashes the reasoning loop.

pub mod errors;
pub mod model;
pub mod parse;
pub mod prompt;
pub mod provider;

pub use errors::DecisionError;
pub use model::{ActionVerb, DecisionContext, ReasoningDecision};
pub use parse::decode_decision;
pub use provider::{
    DecisionProvider, MockDecisionProvider, OpenAiDecisionConfig, OpenAiDecisionProvider,
    UnconfiguredProvider,
};
