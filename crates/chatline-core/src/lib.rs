//! Turn orchestration for chatline.
//!
//! [`orchestrator::ResponseOrchestrator`] runs the stream, synchronous and
//! canned strategies in order for each turn. [`config`] and [`logging`] hold
//! the ambient setup shared by every front end.

pub mod cancel;
pub mod config;
pub mod logging;
pub mod orchestrator;
pub mod session;

pub use cancel::{CancelReason, RequestToken};
pub use config::Config;
pub use orchestrator::{Attempt, Outcome, Reply, ResponseOrchestrator, Strategy};
pub use session::StreamSession;
