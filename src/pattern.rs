//! Pattern composition primitives.
//!
//! Grammars in this crate are built from code, not written as raw regex
//! strings. Every function here is pure and total: it assembles a new
//! [`Pattern`] string in Oniguruma syntax and never fails; whether the
//! result is a *sensible* pattern is the grammar author's problem, and an
//! invalid one is rejected when the grammar is compiled, never at scan time.
//!
//! The two assertions that carry most of the grammar's context sensitivity
//! are [`preceded_by_last_significant_word`] and
//! [`preceded_by_last_significant_operator`]: zero-width checks that the
//! token just before the current position is one of a given set, expressed
//! as alternated fixed-width lookbehinds (Oniguruma accepts alternatives of
//! different fixed widths inside `(?<=...)`).

use std::fmt;

/// An opaque regular pattern over Unicode text. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern(String);

impl Pattern {
    /// Wrap an already-formed pattern fragment verbatim.
    pub fn raw(s: impl Into<String>) -> Self {
        Pattern(s.into())
    }

    /// A pattern matching `s` literally, with metacharacters escaped.
    pub fn literal(s: &str) -> Self {
        Pattern(escape(s))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<Pattern> for String {
    fn from(p: Pattern) -> String {
        p.0
    }
}

/// Escape every regex metacharacter in `s`.
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(
            c,
            '\\' | '.' | '+' | '*' | '?' | '(' | ')' | '|' | '[' | ']' | '{' | '}' | '^' | '$'
        ) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

// Escape for use inside a bracketed character set.
fn escape_in_set(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '\\' | '[' | ']' | '^' | '-') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

/// Concatenate patterns in order.
pub fn sequence(parts: &[Pattern]) -> Pattern {
    let mut out = String::new();
    for p in parts {
        out.push_str(p.as_str());
    }
    Pattern(out)
}

/// First-match-wins alternation, wrapped in a non-capturing group.
pub fn alternate(parts: &[Pattern]) -> Pattern {
    let inner = parts
        .iter()
        .map(|p| p.as_str())
        .collect::<Vec<_>>()
        .join("|");
    Pattern(format!("(?:{inner})"))
}

/// Non-capturing group.
pub fn group(p: &Pattern) -> Pattern {
    Pattern(format!("(?:{})", p.as_str()))
}

/// Capturing group. Group numbering is positional and 1-based, matching the
/// indices used in capture maps.
pub fn capture(p: &Pattern) -> Pattern {
    Pattern(format!("({})", p.as_str()))
}

pub fn optional(p: &Pattern) -> Pattern {
    Pattern(format!("(?:{})?", p.as_str()))
}

pub fn zero_or_more(p: &Pattern) -> Pattern {
    Pattern(format!("(?:{})*", p.as_str()))
}

pub fn one_or_more(p: &Pattern) -> Pattern {
    Pattern(format!("(?:{})+", p.as_str()))
}

/// Named character classes usable inside [`character_set`].
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CharClass {
    Letters,
    Digits,
    Whitespace,
    Upper,
    Lower,
    /// Letters, digits and underscore.
    Word,
    Printable,
}

impl CharClass {
    fn as_set_fragment(self) -> &'static str {
        match self {
            CharClass::Letters => "[:alpha:]",
            CharClass::Digits => "[:digit:]",
            CharClass::Whitespace => "[:space:]",
            CharClass::Upper => "[:upper:]",
            CharClass::Lower => "[:lower:]",
            CharClass::Word => "[:word:]",
            CharClass::Printable => "[:print:]",
        }
    }
}

/// One element of a bracketed set: a named class or literal characters.
#[derive(Debug, Copy, Clone)]
pub enum SetItem<'a> {
    Named(CharClass),
    Chars(&'a str),
}

fn set_body(items: &[SetItem<'_>]) -> String {
    let mut out = String::new();
    for item in items {
        match item {
            SetItem::Named(class) => out.push_str(class.as_set_fragment()),
            SetItem::Chars(chars) => out.push_str(&escape_in_set(chars)),
        }
    }
    out
}

/// `[...]` over the given classes and characters.
pub fn character_set(items: &[SetItem<'_>]) -> Pattern {
    Pattern(format!("[{}]", set_body(items)))
}

/// `[^...]` over the given classes and characters.
pub fn negated_character_set(items: &[SetItem<'_>]) -> Pattern {
    Pattern(format!("[^{}]", set_body(items)))
}

pub fn lookahead(p: &Pattern) -> Pattern {
    Pattern(format!("(?={})", p.as_str()))
}

pub fn negative_lookahead(p: &Pattern) -> Pattern {
    Pattern(format!("(?!{})", p.as_str()))
}

pub fn lookbehind(p: &Pattern) -> Pattern {
    Pattern(format!("(?<={})", p.as_str()))
}

pub fn negative_lookbehind(p: &Pattern) -> Pattern {
    Pattern(format!("(?<!{})", p.as_str()))
}

/// Constrain `p` to match only as a whole lexical word.
pub fn word_boundary(p: &Pattern) -> Pattern {
    Pattern(format!("\\b(?:{})\\b", p.as_str()))
}

/// Constrain `p` to match only where neither adjacent character belongs to
/// `constituents`, so multi-character operators are never split.
///
/// `constituents` is inserted verbatim as the interior of a bracketed set;
/// the caller owns its escaping (ranges like `A-Z` stay ranges, a literal
/// dash must arrive as `\-`). The token catalog curries this with the
/// language's vocabulary.
pub fn operator_boundary(p: &Pattern, constituents: &str) -> Pattern {
    Pattern(format!(
        "(?<![{constituents}])(?:{})(?![{constituents}])",
        p.as_str()
    ))
}

/// Zero-width assertion: the nearest preceding text is one of `words` as a
/// whole word, or we are at the very start of the input.
///
/// Each word contributes two fixed-width lookbehind alternatives: the word
/// at the start of a line, and the word preceded by a non-word-constituent
/// character. The right-hand word boundary is a negative lookahead outside
/// the lookbehind, keeping every lookbehind branch a plain fixed-width
/// sequence. `word_constituents` is a verbatim set interior (e.g.
/// `A-Za-z0-9'_` for SML), as in [`operator_boundary`].
pub fn preceded_by_last_significant_word(words: &[&str], word_constituents: &str) -> Pattern {
    let mut alts = Vec::with_capacity(words.len() * 2);
    for word in words {
        let w = escape(word);
        alts.push(format!("^{w}"));
        alts.push(format!("[^{word_constituents}]{w}"));
    }
    Pattern(format!(
        "(?:\\A|(?:(?<={})(?![{word_constituents}])))",
        alts.join("|")
    ))
}

/// Zero-width assertion: the nearest preceding text is one of `operators`,
/// glued to operator-constituent characters on neither side, or we are at
/// the very start of the input. `constituents` is a verbatim set interior.
pub fn preceded_by_last_significant_operator(operators: &[&str], constituents: &str) -> Pattern {
    let mut alts = Vec::with_capacity(operators.len() * 2);
    for op in operators {
        let o = escape(op);
        alts.push(format!("^{o}"));
        alts.push(format!("[^{constituents}]{o}"));
    }
    Pattern(format!(
        "(?:\\A|(?:(?<={})(?![{constituents}])))",
        alts.join("|")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_escapes_metacharacters() {
        assert_eq!(Pattern::literal("(*").as_str(), "\\(\\*");
        assert_eq!(Pattern::literal("a.b").as_str(), "a\\.b");
        assert_eq!(Pattern::literal("plain").as_str(), "plain");
    }

    #[test]
    fn composition_shapes() {
        let p = alternate(&[Pattern::literal("if"), Pattern::literal("then")]);
        assert_eq!(p.as_str(), "(?:if|then)");
        assert_eq!(optional(&p).as_str(), "(?:(?:if|then))?");
        assert_eq!(capture(&Pattern::raw("x+")).as_str(), "(x+)");
        assert_eq!(
            sequence(&[Pattern::raw("a"), Pattern::raw("b")]).as_str(),
            "ab"
        );
    }

    #[test]
    fn character_sets() {
        let set = character_set(&[SetItem::Named(CharClass::Letters), SetItem::Chars("'_")]);
        assert_eq!(set.as_str(), "[[:alpha:]'_]");
        let neg = negated_character_set(&[SetItem::Named(CharClass::Whitespace)]);
        assert_eq!(neg.as_str(), "[^[:space:]]");
    }

    #[test]
    fn boundaries() {
        assert_eq!(
            word_boundary(&Pattern::literal("val")).as_str(),
            "\\b(?:val)\\b"
        );
        assert_eq!(
            operator_boundary(&Pattern::literal("="), "=<>").as_str(),
            "(?<![=<>])(?:=)(?![=<>])"
        );
    }

    #[test]
    fn last_significant_word_includes_input_start() {
        let p = preceded_by_last_significant_word(&["of"], "A-Za-z0-9'_");
        assert!(p.as_str().starts_with("(?:\\A|(?:(?<="));
        assert!(p.as_str().contains("^of"));
        assert!(p.as_str().contains("[^A-Za-z0-9'_]of"));
        // the word may not continue past the assertion point
        assert!(p.as_str().ends_with("(?![A-Za-z0-9'_])))"));
    }

    #[test]
    fn last_significant_operator_escapes() {
        let p = preceded_by_last_significant_operator(&["|"], "!%&$#+\\-/:<=>?@~`^|*\\\\");
        assert!(p.as_str().contains("\\|"));
        assert!(p.as_str().starts_with("(?:\\A|"));
    }
}
