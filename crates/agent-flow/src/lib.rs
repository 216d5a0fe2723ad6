//! Plan execution core.
//!
//! A plan is an ordered list of [`ActionStep`]s. The [`StepExecutor`] runs
//! them strictly in order: deterministic steps go straight to the browser
//! driver with a bounded recover-retry-handoff chain around each one, and the
//! open-ended `agentic_loop` step hands control to the [`ReasoningLoop`],
//! which interleaves DOM observation, decision-service calls, and user
//! questions over the session's queue pair.

pub mod errors;
pub mod events;
pub mod executor;
pub mod fallback;
pub mod handlers;
pub mod handoff;
pub mod navigator;
pub mod plan;
pub mod planner;
pub mod reasoning;
pub mod results;
pub mod session;
pub mod tasks;

pub use errors::FlowError;
pub use events::{EventSink, RecordingSink, StepEvent, TracingSink};
pub use executor::{StepExecutor, StepExecutorConfig};
pub use handlers::{HandlerRegistry, ProfileSetup, TaskHandler};
pub use handoff::{Handoff, QueueHandoff, StdinHandoff};
pub use navigator::Navigator;
pub use plan::{ActionStep, ExecutionPlan};
pub use planner::build_plan;
pub use reasoning::{LoopConfig, LoopState, ReasoningLoop};
pub use results::ResultAccumulator;
pub use session::{session_channel, AgentReply, SessionHandle, SessionQueues, USER_INPUT_TIMEOUT};
pub use tasks::{builtin_handlers, ApplicationStatusHandler};
