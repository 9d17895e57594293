use std::fmt;

use crate::grammar::{ROOT_RULE_ID, RuleId};
use crate::scope::Scope;

/// One activation of a region rule (or the document root) on the scan stack.
#[derive(Clone, Debug)]
pub struct StackFrame {
    /// Rule whose context this frame scans in.
    pub rule: RuleId,
    /// Scopes applied to the region's own delimiters.
    pub name_scopes: Vec<Scope>,
    /// Scopes applied to text between the delimiters. Starts equal to
    /// `name_scopes` and diverges once the begin match has been consumed.
    pub content_scopes: Vec<Scope>,
    /// Offset at which the begin pattern matched, for no-progress detection.
    pub enter_offset: Option<usize>,
}

/// The nesting state of one scan: root frame plus one frame per open region.
/// Owned exclusively by the scan that created it; nothing survives the scan.
#[derive(Clone)]
pub struct ScanStack {
    frames: Vec<StackFrame>,
}

impl ScanStack {
    pub fn new(root_scope: Scope) -> Self {
        Self {
            frames: vec![StackFrame {
                rule: ROOT_RULE_ID,
                name_scopes: vec![root_scope],
                content_scopes: vec![root_scope],
                enter_offset: None,
            }],
        }
    }

    /// Enter a region whose begin pattern matched at `enter_offset`.
    pub fn push(&mut self, rule: RuleId, scopes: Vec<Scope>, enter_offset: usize) {
        self.frames.push(StackFrame {
            rule,
            name_scopes: scopes.clone(),
            content_scopes: scopes,
            enter_offset: Some(enter_offset),
        });
    }

    /// Leave the innermost region. The root frame is never popped.
    pub fn pop(&mut self) -> Option<StackFrame> {
        if self.frames.len() > 1 {
            self.frames.pop()
        } else {
            None
        }
    }

    /// Put a popped frame back; used when a push/pop cycle made no progress
    /// and the region should stay open while the scan steps forward.
    pub fn restore(&mut self, frame: StackFrame) {
        self.frames.push(frame);
    }

    pub fn set_content_scopes(&mut self, scopes: Vec<Scope>) {
        self.top_mut().content_scopes = scopes;
    }

    /// Whether some open frame entered `rule` at exactly `offset`; guards
    /// against zero-width begin patterns re-entering the same region forever.
    pub fn has_open_frame_at(&self, rule: RuleId, offset: usize) -> bool {
        self.frames
            .iter()
            .any(|f| f.rule == rule && f.enter_offset == Some(offset))
    }

    pub fn top(&self) -> &StackFrame {
        self.frames.last().expect("scan stack never empty")
    }

    pub fn top_mut(&mut self) -> &mut StackFrame {
        self.frames.last_mut().expect("scan stack never empty")
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}

impl fmt::Debug for ScanStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "ScanStack:")?;
        for (depth, frame) in self.frames.iter().enumerate() {
            write!(f, "{}rule={}", "  ".repeat(depth), frame.rule.0)?;
            if !frame.content_scopes.is_empty() {
                write!(f, " content=[")?;
                for (i, scope) in frame.content_scopes.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", scope.build_string())?;
                }
                write!(f, "]")?;
            }
            if let Some(offset) = frame.enter_offset {
                write!(f, " entered_at={offset}")?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
