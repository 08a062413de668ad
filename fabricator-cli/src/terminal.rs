//! Terminal implementations of the library's view seams.

use parking_lot::Mutex;
use std::io::{IsTerminal, Write};

use fabricator::monitor::{classify_line, render_text, LineClass, MonitorView, RunRenderer};
use fabricator::routes::{Navigator, Route};
use fabricator::submission::{SubmissionObserver, SubmissionPhase};
use fabricator::upload::UploadProgress;

const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const RESET: &str = "\x1b[0m";

/// Prints each view, skipping polls that changed nothing.
pub struct TerminalRenderer {
    color: bool,
    last: Mutex<Option<String>>,
}

impl TerminalRenderer {
    pub fn new() -> Self {
        Self {
            color: std::io::stdout().is_terminal(),
            last: Mutex::new(None),
        }
    }

    fn paint(&self, line: &str) -> String {
        if !self.color {
            return line.to_string();
        }
        match classify_line(line) {
            LineClass::Error => format!("{RED}{line}{RESET}"),
            LineClass::Success => format!("{GREEN}{line}{RESET}"),
            LineClass::Plain => line.to_string(),
        }
    }
}

impl RunRenderer for TerminalRenderer {
    fn render(&self, view: &MonitorView) {
        let text = render_text(view);
        {
            let mut last = self.last.lock();
            if last.as_deref() == Some(text.as_str()) {
                return;
            }
            *last = Some(text.clone());
        }

        let mut out = std::io::stdout().lock();
        let _ = writeln!(out, "{}", "=".repeat(60));
        for line in text.lines() {
            let _ = writeln!(out, "{}", self.paint(line));
        }
        let _ = out.flush();
    }
}

/// Reports submission phases and upload progress on stderr.
pub struct ConsoleObserver {
    last_decile: Mutex<Option<u64>>,
}

impl ConsoleObserver {
    pub fn new() -> Self {
        Self {
            last_decile: Mutex::new(None),
        }
    }
}

impl SubmissionObserver for ConsoleObserver {
    fn on_phase(&self, phase: &SubmissionPhase) {
        match phase {
            SubmissionPhase::Failed { message } => eprintln!("⚠️ {message}"),
            other => eprintln!("{}", other.label()),
        }
    }

    fn on_progress(&self, progress: UploadProgress) {
        let decile = (progress.fraction() * 10.0).floor() as u64;
        let mut last = self.last_decile.lock();
        if *last == Some(decile) {
            return;
        }
        *last = Some(decile);
        eprintln!(
            "  {:>3.0}% ({} / {})",
            progress.percent(),
            fabricator::utils::format_bytes(progress.bytes_sent),
            fabricator::utils::format_bytes(progress.total_bytes)
        );
    }
}

/// Remembers where the flow asked to go next.
pub struct PendingRoute {
    base_path: String,
    route: Mutex<Option<Route>>,
}

impl PendingRoute {
    pub fn new(base_path: impl Into<String>) -> Self {
        Self {
            base_path: base_path.into(),
            route: Mutex::new(None),
        }
    }

    pub fn take(&self) -> Option<Route> {
        self.route.lock().take()
    }
}

impl Navigator for PendingRoute {
    fn navigate(&self, route: &Route) {
        eprintln!("→ {}", route.to_path(&self.base_path));
        *self.route.lock() = Some(route.clone());
    }
}
