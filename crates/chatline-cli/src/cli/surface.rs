use std::io::{self, IsTerminal, Write};

use chatline_render::{PartialView, Surface};

/// Echoes streamed text to stderr as it arrives.
///
/// Final markup is printed by the caller, so stdout only ever carries
/// committed replies.
pub struct TerminalSurface {
    echo: bool,
    shown: usize,
}

impl TerminalSurface {
    /// Echoes when `force` is set or stderr is a terminal.
    pub fn new(force: bool) -> Self {
        Self {
            echo: force || io::stderr().is_terminal(),
            shown: 0,
        }
    }
}

impl Surface for TerminalSurface {
    fn show_partial(&mut self, view: &PartialView<'_>) {
        if !self.echo {
            return;
        }
        let mut stderr = io::stderr().lock();
        // A new strategy restarted the view.
        if view.text.len() < self.shown {
            let _ = writeln!(stderr);
            self.shown = 0;
        }
        if let Some(delta) = view.text.get(self.shown..) {
            let _ = stderr.write_all(delta.as_bytes());
            let _ = stderr.flush();
        }
        self.shown = view.text.len();
    }

    fn commit(&mut self, _markup: &str) {
        if self.echo && self.shown > 0 {
            let _ = writeln!(io::stderr());
        }
        self.shown = 0;
    }
}
