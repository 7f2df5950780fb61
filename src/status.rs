use std::io::Write;
use std::sync::{Arc, Mutex};

pub const SELECT_START: &str = "Select a starting point.";
pub const START_SELECTED: &str = "Start point selected. Choose the destination.";
pub const COMPUTING_ROUTE: &str = "Computing route...";
pub const ROUTE_FOUND: &str = "Route found!";
pub const CANNOT_CONNECT: &str = "Error: could not connect to the server.";

/// A single line of status text. Last write wins; there is no history.
pub trait StatusReporter {
    fn report(&mut self, message: &str);
}

/// Keeps the latest message in memory. Clones share the line.
#[derive(Clone, Debug, Default)]
pub struct StatusLine {
    current: Arc<Mutex<Option<String>>>,
}

impl StatusLine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<String> {
        self.current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl StatusReporter for StatusLine {
    fn report(&mut self, message: &str) {
        tracing::info!(status = message);

        *self
            .current
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(message.to_owned());
    }
}

/// Writes every status line to a terminal-like sink.
pub struct ConsoleStatus<W: Write> {
    out: W,
}

impl ConsoleStatus<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self {
            out: std::io::stdout(),
        }
    }
}

impl<W: Write> ConsoleStatus<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> StatusReporter for ConsoleStatus<W> {
    fn report(&mut self, message: &str) {
        tracing::info!(status = message);

        if let Err(err) = writeln!(self.out, "[status] {}", message).and_then(|_| self.out.flush())
        {
            tracing::warn!("failed to write status line: {}", err);
        }
    }
}

#[test]
fn last_write_wins_test() {
    let mut line = StatusLine::new();
    let view = line.clone();

    assert_eq!(view.current(), None);

    line.report(START_SELECTED);
    line.report(COMPUTING_ROUTE);

    assert_eq!(view.current().as_deref(), Some(COMPUTING_ROUTE));
}

#[test]
fn console_status_writes_lines_test() {
    let mut console = ConsoleStatus::new(Vec::new());

    console.report(ROUTE_FOUND);

    assert_eq!(
        String::from_utf8(console.into_inner()).unwrap(),
        "[status] Route found!\n"
    );
}
