use std::collections::BTreeMap;
use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, SmeraldoResult};
use crate::grammar::compiled::CompiledGrammar;
use crate::pattern::Pattern;

/// Capture-group index (1-based, 0 = whole match) to scope assignment.
/// A value may name several scopes separated by whitespace; all of them are
/// applied to the captured span.
///
/// # Examples
/// ```json
/// {
///   "1": "keyword.other.sml",
///   "2": "entity.name.function.sml"
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaptureMap(BTreeMap<u32, String>);

impl CaptureMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign `scopes` to capture group `index`. Chainable.
    pub fn set(mut self, index: u32, scopes: &str) -> Self {
        self.0.insert(index, scopes.to_owned());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&u32, &String)> {
        self.0.iter()
    }

    pub fn max_index(&self) -> Option<u32> {
        self.0.keys().next_back().copied()
    }
}

/// One rule of the grammar, in its declarative form.
///
/// The populated fields decide what the rule is:
/// - `match`: a match rule, consuming its span without changing nesting;
/// - `begin` + `end`: a region rule, pushing a nested scanning context that
///   only its own end pattern (or end of input) closes;
/// - `include`: a symbolic reference to a repository entry (`#name`) or to
///   the grammar root (`$self`), resolved at compile time but never inlined,
///   so rules may reference each other cyclically;
/// - bare `patterns`: an ordered container of sub-rules.
///
/// # Examples
/// ```json
/// {
///   "name": "comment.block.sml",
///   "begin": "\\(\\*",
///   "end": "\\*\\)",
///   "patterns": [{ "include": "#comment" }]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawRule {
    /// Scope name(s) for the whole match or region, delimiters included.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Scope name(s) for region content only, between the delimiters.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_name: Option<String>,
    #[serde(rename = "match", skip_serializing_if = "Option::is_none")]
    pub match_: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub begin: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
    /// Captures for a match rule.
    #[serde(skip_serializing_if = "CaptureMap::is_empty")]
    pub captures: CaptureMap,
    #[serde(skip_serializing_if = "CaptureMap::is_empty")]
    pub begin_captures: CaptureMap,
    #[serde(skip_serializing_if = "CaptureMap::is_empty")]
    pub end_captures: CaptureMap,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub include: Option<String>,
    /// Ordered sub-rules tried while inside this rule's context.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub patterns: Vec<RawRule>,
    /// Try the region's own end pattern before its nested rules instead of
    /// after them. Same-offset tie-breaking is order-sensitive, so this is
    /// part of a rule's observable contract.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub try_end_first: bool,
}

impl RawRule {
    /// A match rule over `pattern`.
    pub fn matching(pattern: &Pattern) -> Self {
        Self {
            match_: Some(pattern.as_str().to_owned()),
            ..Self::default()
        }
    }

    /// A region rule delimited by `begin` / `end`.
    pub fn region(begin: &Pattern, end: &Pattern) -> Self {
        Self {
            begin: Some(begin.as_str().to_owned()),
            end: Some(end.as_str().to_owned()),
            ..Self::default()
        }
    }

    /// A reference to another rule, e.g. `#expression` or `$self`.
    pub fn include(reference: &str) -> Self {
        Self {
            include: Some(reference.to_owned()),
            ..Self::default()
        }
    }

    /// An ordered container of sub-rules.
    pub fn container(patterns: Vec<RawRule>) -> Self {
        Self {
            patterns,
            ..Self::default()
        }
    }

    pub fn scope(mut self, name: &str) -> Self {
        self.name = Some(name.to_owned());
        self
    }

    pub fn content_scope(mut self, name: &str) -> Self {
        self.content_name = Some(name.to_owned());
        self
    }

    pub fn with_captures(mut self, captures: CaptureMap) -> Self {
        self.captures = captures;
        self
    }

    pub fn with_begin_captures(mut self, captures: CaptureMap) -> Self {
        self.begin_captures = captures;
        self
    }

    pub fn with_end_captures(mut self, captures: CaptureMap) -> Self {
        self.end_captures = captures;
        self
    }

    pub fn with_patterns(mut self, patterns: Vec<RawRule>) -> Self {
        self.patterns = patterns;
        self
    }

    pub fn end_first(mut self) -> Self {
        self.try_end_first = true;
        self
    }
}

/// A complete declarative grammar: the serializable interchange document an
/// editor host loads.
///
/// The repository maps rule names to definitions; insertion order is
/// irrelevant (every cross-reference goes through `include`). `patterns` is
/// the distinguished ordered list tried at the document root.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RawGrammar {
    /// Human-readable language name, e.g. "Standard ML".
    pub name: String,
    /// Root scope applied to every token, e.g. "source.sml".
    pub scope_name: String,
    /// File extensions this grammar applies to.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub file_types: Vec<String>,
    /// Ordered root include list.
    pub patterns: Vec<RawRule>,
    /// Named, mutually-recursive rule definitions.
    pub repository: BTreeMap<String, RawRule>,
}

impl RawGrammar {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> SmeraldoResult<Self> {
        let file = File::open(&path)?;
        let raw = serde_json::from_reader(&file)?;
        Ok(raw)
    }

    pub fn from_json(json: &str) -> SmeraldoResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> SmeraldoResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Compile into the id-indexed form used by the tokenizer, validating
    /// every include reference and every pattern. All configuration errors
    /// surface here, once, and never at scan time.
    pub fn compile(self) -> Result<CompiledGrammar, Error> {
        CompiledGrammar::from_raw(self)
    }
}
