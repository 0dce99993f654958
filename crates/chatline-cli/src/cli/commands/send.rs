use anyhow::Result;
use chatline_core::{Config, Outcome};
use chatline_types::ChatRequest;

use crate::cli::build_orchestrator;
use crate::cli::interrupt::{self, InterruptedError};
use crate::cli::surface::TerminalSurface;

pub async fn run(
    config: &Config,
    user: &str,
    message: &str,
    raw: bool,
    progress: bool,
) -> Result<()> {
    let mut orchestrator = build_orchestrator(config)?;
    let request = ChatRequest::new(user, message);
    let mut surface = TerminalSurface::new(progress);

    let token = interrupt::begin_turn(config.attempt_timeout());
    let outcome = orchestrator.respond(&request, &mut surface, &token).await;
    interrupt::end_turn();

    match outcome {
        Outcome::Replied(reply) => {
            for attempt in &reply.attempts {
                if let Some(error) = &attempt.error {
                    tracing::debug!(strategy = %attempt.strategy, %error, "attempt failed");
                }
            }
            println!("{}", if raw { &reply.text } else { &reply.markup });
            Ok(())
        }
        Outcome::Cancelled { partial } => {
            if !partial.is_empty() {
                eprintln!();
            }
            Err(InterruptedError.into())
        }
    }
}
