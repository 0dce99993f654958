//! Line-oriented chat loop over stdin.

use std::io::{IsTerminal, Write};

use anyhow::{Context, Result};
use chatline_core::{Config, Outcome};
use chatline_types::ChatRequest;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::cli::build_orchestrator;
use crate::cli::interrupt;
use crate::cli::surface::TerminalSurface;

const QUIT: &str = ":q";

pub async fn run(config: &Config, user: &str, raw: bool) -> Result<()> {
    let mut orchestrator = build_orchestrator(config)?;
    let interactive = std::io::stdin().is_terminal();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        if interactive {
            eprint!("> ");
            let _ = std::io::stderr().flush();
        }
        let Some(line) = lines.next_line().await.context("read stdin")? else {
            break;
        };
        let message = line.trim();
        if message.is_empty() {
            continue;
        }
        if message == QUIT {
            break;
        }

        let request = ChatRequest::new(user, message);
        let mut surface = TerminalSurface::new(false);
        let token = interrupt::begin_turn(config.attempt_timeout());
        let outcome = orchestrator.respond(&request, &mut surface, &token).await;
        interrupt::end_turn();

        match outcome {
            Outcome::Replied(reply) => {
                println!("{}", if raw { &reply.text } else { &reply.markup });
            }
            Outcome::Cancelled { .. } => eprintln!("\n[interrupted]"),
        }
    }

    Ok(())
}
