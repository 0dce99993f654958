//! Ctrl+C handling.
//!
//! The first Ctrl+C cancels the turn in flight; a second one, or one with no
//! turn running, exits with status 130.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use anyhow::{Context, Result};
use chatline_core::RequestToken;

static ACTIVE: Mutex<Option<RequestToken>> = Mutex::new(None);

#[derive(Debug)]
pub struct InterruptedError;

impl std::fmt::Display for InterruptedError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Interrupted")
    }
}

impl std::error::Error for InterruptedError {}

pub fn init() -> Result<()> {
    ctrlc::set_handler(trigger_ctrl_c).context("install Ctrl+C handler")
}

fn trigger_ctrl_c() {
    let active = ACTIVE.lock().unwrap_or_else(PoisonError::into_inner);
    match active.as_ref() {
        Some(token) if !token.is_cancelled() => token.cancel(),
        _ => std::process::exit(130),
    }
}

/// Registers a fresh token for the next turn.
pub fn begin_turn(timeout: Option<Duration>) -> RequestToken {
    let token = RequestToken::new().with_timeout(timeout);
    *ACTIVE.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.clone());
    token
}

pub fn end_turn() {
    *ACTIVE.lock().unwrap_or_else(PoisonError::into_inner) = None;
}
