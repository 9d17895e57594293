//! Round trip of the compiler-output protocol: bytes in, per-file
//! diagnostics out.

use std::path::PathBuf;

use smeraldo::diagnostics::{OutputBuffer, Position, Severity, collate_batch};

#[test]
fn one_command_one_batch_one_diagnostic() {
    let mut buffer = OutputBuffer::new();

    // output arrives in arbitrary chunks; nothing completes until the
    // prompt shows up at the end
    assert!(buffer.feed("foo.sml:3.10-3.15 Error: ty").is_none());
    assert!(buffer.feed("pe mismatch\n  expected: int\n").is_none());
    let batch = buffer.feed("  found: string\n- ").unwrap();

    let collated = collate_batch(&batch, |path| Some(PathBuf::from(path)));
    assert_eq!(collated.len(), 1);

    let diagnostics = &collated[&PathBuf::from("foo.sml")];
    assert_eq!(diagnostics.len(), 1);

    let d = &diagnostics[0];
    assert_eq!(d.start, Position { line: 2, column: 9 });
    assert_eq!(d.end, Position { line: 2, column: 14 });
    assert_eq!(d.severity, Severity::Error);
    assert!(d.message.contains("type mismatch"));
    assert!(d.message.contains("expected: int"));
    assert!(d.message.contains("found: string"));

    // the buffer is ready for the next command
    assert!(buffer.pending().is_empty());
}

#[test]
fn noise_between_diagnostics_is_dropped_not_fatal() {
    let mut buffer = OutputBuffer::new();
    let batch = buffer
        .feed(concat!(
            "[library loaded]\n",
            "a.sml:1.2 Error: first\n",
            "val it = () : unit\n",
            "b.sml:10.4-11.1 Warning: second\n",
            "- ",
        ))
        .unwrap();

    let collated = collate_batch(&batch, |path| Some(PathBuf::from(path)));
    assert_eq!(collated.len(), 2);
    assert_eq!(collated[&PathBuf::from("a.sml")][0].severity, Severity::Error);
    let warning = &collated[&PathBuf::from("b.sml")][0];
    assert_eq!(warning.severity, Severity::Warning);
    assert_eq!(warning.start, Position { line: 9, column: 3 });
    assert_eq!(warning.end, Position { line: 10, column: 0 });
}
