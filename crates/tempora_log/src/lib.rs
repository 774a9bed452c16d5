//! Append-only, verbosity-gated logging for the tempora record store.
//!
//! This is *store* logging, not text logging for debugging the library
//! itself: entries form an auditable trail of warnings and status messages
//! that tests and host applications inspect. Every accepted entry is also
//! forwarded to the [`log`] crate facade so host applications see store
//! diagnostics through their normal subscriber.
//!
//! * `Error`: recorded when an error is about to be raised
//! * `Warning`: problems the store recovered from
//! * `Status`: informational messages
//! * `Progress`: progress ratios or messages
//! * `Verify`: approval-test verification records

use parking_lot::Mutex;

// ----------------------------------------------------------------------------

/// Entry kind, doubling as the verbosity level of a sink.
///
/// Verbosity is the highest entry kind a sink accepts. [`LogKind::Empty`]
/// verbosity means "unset" and accepts everything.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LogKind {
    Empty,
    Error,
    Warning,
    Status,
    Progress,
    Verify,
}

impl LogKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Empty => "Empty",
            Self::Error => "Error",
            Self::Warning => "Warning",
            Self::Status => "Status",
            Self::Progress => "Progress",
            Self::Verify => "Verify",
        }
    }

    fn level(&self) -> log::Level {
        match self {
            Self::Empty | Self::Error => log::Level::Error,
            Self::Warning => log::Level::Warn,
            Self::Status => log::Level::Info,
            Self::Progress => log::Level::Debug,
            Self::Verify => log::Level::Trace,
        }
    }
}

// ----------------------------------------------------------------------------

/// Message arguments longer than this are middle-elided before substitution.
const MAX_ARG_LEN: usize = 255;

/// One formatted log entry: `Kind.subkind: message`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LogEntry {
    pub kind: LogKind,
    pub text: String,
}

impl LogEntry {
    /// Format an entry from a `{}`-placeholder template and its arguments.
    ///
    /// The subkind is an optional tag in dot-delimited format.
    pub fn new(kind: LogKind, subkind: Option<&str>, template: &str, args: &[String]) -> Self {
        let message = format_message(template, args);
        let text = match subkind {
            Some(subkind) if !subkind.is_empty() => {
                format!("{}.{}: {}", kind.name(), subkind, message)
            }
            _ => format!("{}: {}", kind.name(), message),
        };
        Self { kind, text }
    }
}

impl std::fmt::Display for LogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

/// Substitute `{}` placeholders left to right, eliding over-long arguments.
///
/// A template without arguments is returned verbatim even if it contains
/// `{}` characters.
fn format_message(template: &str, args: &[String]) -> String {
    if args.is_empty() {
        return template.to_owned();
    }

    let mut result = String::with_capacity(template.len());
    let mut rest = template;
    let mut args = args.iter();
    while let Some(at) = rest.find("{}") {
        result.push_str(&rest[..at]);
        match args.next() {
            Some(arg) => result.push_str(&truncate_arg(arg)),
            None => result.push_str("{}"),
        }
        rest = &rest[at + 2..];
    }
    result.push_str(rest);

    // If the message ends with four dots because a truncated argument was
    // followed by a literal dot, normalize down to a three-dot ellipsis.
    if result.ends_with("....") {
        result.pop();
    }

    result
}

/// Middle-elide arguments whose textual form exceeds [`MAX_ARG_LEN`].
fn truncate_arg(arg: &str) -> std::borrow::Cow<'_, str> {
    if arg.len() <= MAX_ARG_LEN {
        return arg.into();
    }

    let keep = (MAX_ARG_LEN - 5) / 2;
    let head_end = (1..=keep).rev().find(|&i| arg.is_char_boundary(i)).unwrap_or(0);
    let tail_start = (arg.len() - keep..arg.len())
        .find(|&i| arg.is_char_boundary(i))
        .unwrap_or(arg.len());
    format!("{} ... {}", &arg[..head_end], &arg[tail_start..]).into()
}

// ----------------------------------------------------------------------------

/// An error built by [`Log::exception`]; carries the formatted message that
/// was appended as an `Error` entry.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct LoggedError(pub String);

/// Append-only log sink bound to a context.
///
/// `append` is expected to be called only when the entry kind passes the
/// verbosity gate; use the provided helpers, which gate and forward to the
/// [`log`] facade for free.
pub trait Log: Send + Sync {
    fn verbosity(&self) -> LogKind;

    fn set_verbosity(&self, verbosity: LogKind);

    /// Record an already-gated entry.
    fn append_entry(&self, entry: LogEntry);

    /// Flush buffered contents to permanent storage.
    fn flush(&self) {}

    /// Close the sink and release any handle to permanent storage.
    fn close(&self) {}

    /// `true` when `kind` passes the verbosity gate.
    fn is_enabled(&self, kind: LogKind) -> bool {
        let verbosity = self.verbosity();
        verbosity == LogKind::Empty || kind <= verbosity
    }

    /// Gate on verbosity, format, forward to the [`log`] facade, and record.
    fn append(&self, kind: LogKind, subkind: Option<&str>, template: &str, args: &[String]) {
        if !self.is_enabled(kind) {
            return;
        }
        let entry = LogEntry::new(kind, subkind, template, args);
        log::log!(target: "tempora", kind.level(), "{}", entry.text);
        self.append_entry(entry);
    }

    /// Record a warning.
    fn warning(&self, message: &str) {
        self.append(LogKind::Warning, None, message, &[]);
    }

    /// Record a status message.
    fn status(&self, message: &str) {
        self.append(LogKind::Status, None, message, &[]);
    }

    /// Record an `Error` entry and return an error carrying the same
    /// formatted message, for the caller to raise.
    fn exception(&self, template: &str, args: &[String]) -> LoggedError {
        self.append(LogKind::Error, None, template, args);
        LoggedError(format_message(template, args))
    }
}

// ----------------------------------------------------------------------------

/// A [`Log`] that renders to an in-memory multi-line string.
///
/// The accumulated text is available through `Display`; tests assert on it.
#[derive(Default)]
pub struct InMemoryLog {
    state: Mutex<InMemoryLogState>,
}

#[derive(Default)]
struct InMemoryLogState {
    verbosity: Option<LogKind>,
    buffer: String,
}

impl InMemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// The full multi-line log text.
    pub fn text(&self) -> String {
        self.state.lock().buffer.clone()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().buffer.is_empty()
    }
}

impl std::fmt::Display for InMemoryLog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.state.lock().buffer)
    }
}

impl Log for InMemoryLog {
    fn verbosity(&self) -> LogKind {
        self.state.lock().verbosity.unwrap_or(LogKind::Empty)
    }

    fn set_verbosity(&self, verbosity: LogKind) {
        self.state.lock().verbosity = Some(verbosity);
    }

    fn append_entry(&self, entry: LogEntry) {
        let mut state = self.state.lock();
        state.buffer.push_str(&entry.text);
        state.buffer.push('\n');
    }
}

// ----------------------------------------------------------------------------

/// Install an `env_logger` subscriber so forwarded entries reach stderr.
#[cfg(feature = "setup")]
pub fn setup_logging() {
    _ = env_logger::builder().is_test(false).try_init();
}

// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_prefix_and_subkind() {
        let entry = LogEntry::new(LogKind::Warning, None, "something happened", &[]);
        assert_eq!(entry.text, "Warning: something happened");

        let entry = LogEntry::new(LogKind::Status, Some("save"), "saved {}", &["A;0".to_owned()]);
        assert_eq!(entry.text, "Status.save: saved A;0");
    }

    #[test]
    fn template_without_args_is_verbatim() {
        let entry = LogEntry::new(LogKind::Status, None, "literal {} braces", &[]);
        assert_eq!(entry.text, "Status: literal {} braces");
    }

    #[test]
    fn long_args_are_middle_elided() {
        let long = "x".repeat(600);
        let formatted = format_message("value {}", &[long]);
        assert!(formatted.len() < 300);
        assert!(formatted.contains(" ... "));
        assert!(formatted.starts_with("value xxx"));
    }

    #[test]
    fn four_dots_collapse_to_three() {
        // An argument ending in an ellipsis, followed by a literal dot in
        // the template, would render four dots; normalize down to three.
        let formatted = format_message("ends {}.", &["a...".to_owned()]);
        assert_eq!(formatted, "ends a...");
        assert!(!formatted.ends_with("...."));

        // A dot that does not complete a four-dot run is left alone.
        let formatted = format_message("ends {}.", &["a".to_owned()]);
        assert_eq!(formatted, "ends a.");
    }

    #[test]
    fn verbosity_gates_entries() {
        let log = InMemoryLog::new();
        log.set_verbosity(LogKind::Error);
        log.warning("dropped");
        assert!(log.is_empty());

        log.set_verbosity(LogKind::Warning);
        log.warning("kept");
        assert_eq!(log.text(), "Warning: kept\n");
    }

    #[test]
    fn empty_verbosity_accepts_everything() {
        let log = InMemoryLog::new();
        log.status("status");
        log.warning("warning");
        let text = log.text();
        assert!(text.contains("Status: status"));
        assert!(text.contains("Warning: warning"));
    }

    #[test]
    fn exception_returns_the_formatted_message() {
        let log = InMemoryLog::new();
        let err = log.exception("bad dataset {}", &["Sample".to_owned()]);
        assert_eq!(err.to_string(), "bad dataset Sample");
        assert!(log.text().contains("Error: bad dataset Sample"));
    }
}
