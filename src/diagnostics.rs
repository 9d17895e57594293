//! Collation of compiler output into per-file diagnostics.
//!
//! The interactive compiler is line-oriented: it prints a batch of output
//! for each command, then its idle prompt (`"- "`) and waits. This module
//! is the pure half of that protocol: buffering output until the prompt
//! appears, splitting a batch into logical messages, and parsing the
//! `path:line.col[-line.col] Error: text` shape into position records.
//! Process plumbing lives with the caller.
//!
//! Nothing here aborts a batch: a line that is not a diagnostic is skipped,
//! and a path that does not resolve drops only its own diagnostic.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::LazyLock;

/// The compiler's idle prompt. Only counts at the very end of the buffered
/// output: the process prints it and waits, so anything after a `"- "` means
/// it was data, not the prompt.
pub const PROMPT: &str = "- ";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
}

/// A 0-based line/column position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Position {
    pub line: u32,
    pub column: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub start: Position,
    /// Defaults to `start` when the compiler reports no end position.
    pub end: Position,
    pub severity: Severity,
    pub message: String,
}

/// Accumulates subprocess stdout and yields one batch per completed command.
#[derive(Debug, Default)]
pub struct OutputBuffer {
    pending: String,
}

impl OutputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a chunk of output. Returns the completed batch (prompt
    /// stripped) once the idle prompt terminates the buffer.
    pub fn feed(&mut self, chunk: &str) -> Option<String> {
        self.pending.push_str(chunk);

        let batch_len = if self.pending == PROMPT {
            Some(0)
        } else {
            self.pending
                .strip_suffix(PROMPT)
                .and_then(|rest| rest.ends_with('\n').then_some(rest.len()))
        };

        let batch_len = batch_len?;
        let batch = self.pending[..batch_len].to_owned();
        self.pending.clear();
        Some(batch)
    }

    /// Output received since the last completed batch.
    pub fn pending(&self) -> &str {
        &self.pending
    }
}

/// Split a batch into logical messages: a newline followed by whitespace is
/// a continuation of the current message (the compiler indents the detail
/// lines of a multi-line report), a newline followed by anything else
/// starts a new one.
pub fn split_messages(batch: &str) -> Vec<&str> {
    let mut messages = Vec::new();
    let bytes = batch.as_bytes();
    let mut start = 0;

    for (i, &b) in bytes.iter().enumerate() {
        if b != b'\n' {
            continue;
        }
        let next = bytes.get(i + 1);
        let continues = matches!(next, Some(c) if c.is_ascii_whitespace());
        if !continues {
            if i > start {
                messages.push(&batch[start..i]);
            }
            start = i + 1;
        }
    }
    if start < batch.len() {
        messages.push(&batch[start..]);
    }

    messages
}

static DIAGNOSTIC_RE: LazyLock<onig::Regex> = LazyLock::new(|| {
    // path : line.col [- line.col] (Error|Warning): message (dot matches
    // newline so indented continuation lines stay in the message)
    onig::Regex::new(
        "\\A([^:\\n]+):([0-9]+)\\.([0-9]+)(?:-([0-9]+)\\.([0-9]+))?\\s+(Error|Warning):\\s*((?m:.*))\\z",
    )
    .expect("diagnostic pattern is valid")
});

/// Parse one logical message. Returns the raw path text and the diagnostic,
/// or `None` when the message does not have the diagnostic shape.
pub fn parse_message(message: &str) -> Option<(&str, Diagnostic)> {
    let captures = DIAGNOSTIC_RE.captures(message.trim_end_matches('\n'))?;

    let path = captures.at(1)?;
    let start = Position {
        line: number_at(&captures, 2)?.saturating_sub(1),
        column: number_at(&captures, 3)?.saturating_sub(1),
    };
    let end = match (number_at(&captures, 4), number_at(&captures, 5)) {
        (Some(line), Some(column)) => Position {
            line: line.saturating_sub(1),
            column: column.saturating_sub(1),
        },
        _ => start,
    };
    let severity = match captures.at(6) {
        Some("Warning") => Severity::Warning,
        _ => Severity::Error,
    };
    let message = captures.at(7).unwrap_or("").trim_end().to_owned();

    Some((path, Diagnostic { start, end, severity, message }))
}

fn number_at(captures: &onig::Captures<'_>, index: usize) -> Option<u32> {
    captures.at(index)?.parse().ok()
}

/// Collate a completed batch into per-file diagnostics, in path order.
///
/// `resolve` maps the compiler's path text to a real file; returning `None`
/// drops that diagnostic and only that diagnostic.
pub fn collate_batch(
    batch: &str,
    resolve: impl Fn(&str) -> Option<PathBuf>,
) -> BTreeMap<PathBuf, Vec<Diagnostic>> {
    let mut by_file: BTreeMap<PathBuf, Vec<Diagnostic>> = BTreeMap::new();

    for message in split_messages(batch) {
        let Some((path, diagnostic)) = parse_message(message) else {
            continue;
        };
        let Some(resolved) = resolve(path) else {
            continue;
        };
        by_file.entry(resolved).or_default().push(diagnostic);
    }

    by_file
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_terminates_a_batch() {
        let mut buffer = OutputBuffer::new();
        assert_eq!(buffer.feed("foo.sml:3.10-3.15 Error: type mismatch\n"), None);
        assert_eq!(buffer.feed("  expected: int\n"), None);
        let batch = buffer.feed("  found: string\n- ").unwrap();
        assert!(batch.ends_with("found: string\n"));
        assert!(buffer.pending().is_empty());
    }

    #[test]
    fn prompt_in_the_middle_is_data() {
        let mut buffer = OutputBuffer::new();
        assert_eq!(buffer.feed("- x\n"), None);
        assert!(buffer.feed("- ").is_some());
    }

    #[test]
    fn bare_prompt_yields_empty_batch() {
        let mut buffer = OutputBuffer::new();
        assert_eq!(buffer.feed(PROMPT), Some(String::new()));
    }

    #[test]
    fn continuation_lines_stay_attached() {
        let batch = "a.sml:1.2 Error: one\n  detail\nb.sml:2.3 Error: two\n";
        let messages = split_messages(batch);
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0], "a.sml:1.2 Error: one\n  detail");
        assert_eq!(messages[1], "b.sml:2.3 Error: two");
    }

    #[test]
    fn parses_range_and_converts_to_zero_based() {
        let (path, diagnostic) =
            parse_message("foo.sml:3.10-3.15 Error: type mismatch\n  expected: int").unwrap();
        assert_eq!(path, "foo.sml");
        assert_eq!(diagnostic.start, Position { line: 2, column: 9 });
        assert_eq!(diagnostic.end, Position { line: 2, column: 14 });
        assert_eq!(diagnostic.severity, Severity::Error);
        assert!(diagnostic.message.contains("type mismatch"));
        assert!(diagnostic.message.contains("expected: int"));
    }

    #[test]
    fn end_defaults_to_start() {
        let (_, diagnostic) = parse_message("foo.sml:7.1 Error: syntax error").unwrap();
        assert_eq!(diagnostic.start, diagnostic.end);
        assert_eq!(diagnostic.start, Position { line: 6, column: 0 });
    }

    #[test]
    fn warnings_get_their_own_severity() {
        let (_, diagnostic) = parse_message("foo.sml:1.1 Warning: match nonexhaustive").unwrap();
        assert_eq!(diagnostic.severity, Severity::Warning);
    }

    #[test]
    fn non_diagnostic_lines_are_skipped() {
        assert!(parse_message("[autoloading]").is_none());
        assert!(parse_message("val it = 3 : int").is_none());
    }

    #[test]
    fn batch_round_trip() {
        let mut buffer = OutputBuffer::new();
        let batch = buffer
            .feed("foo.sml:3.10-3.15 Error: type mismatch\n  expected: int\n  found: string\n- ")
            .unwrap();

        let collated = collate_batch(&batch, |path| Some(PathBuf::from(path)));
        assert_eq!(collated.len(), 1);
        let diagnostics = &collated[&PathBuf::from("foo.sml")];
        assert_eq!(diagnostics.len(), 1);
        let d = &diagnostics[0];
        assert_eq!(d.start, Position { line: 2, column: 9 });
        assert_eq!(d.end, Position { line: 2, column: 14 });
        assert!(d.message.contains("expected: int"));
        assert!(d.message.contains("found: string"));
    }

    #[test]
    fn unresolvable_paths_drop_only_their_diagnostic() {
        let batch = "gone.sml:1.1 Error: a\nhere.sml:2.2 Error: b\n";
        let collated = collate_batch(batch, |path| {
            (path == "here.sml").then(|| PathBuf::from(path))
        });
        assert_eq!(collated.len(), 1);
        assert!(collated.contains_key(&PathBuf::from("here.sml")));
    }

    #[test]
    fn multiple_diagnostics_group_by_file() {
        let batch = "a.sml:1.1 Error: one\na.sml:5.2 Error: two\nb.sml:2.2 Warning: three\n";
        let collated = collate_batch(batch, |p| Some(PathBuf::from(p)));
        assert_eq!(collated[&PathBuf::from("a.sml")].len(), 2);
        assert_eq!(collated[&PathBuf::from("b.sml")].len(), 1);
    }
}
