//! Fixed vocabularies of the language and the patterns derived from them.
//!
//! Everything here is a `const` table or a pure derivation over one, built
//! once when the grammar is assembled and shared freely afterwards.
//!
//! The terminator builders are the load-bearing part: most declaration
//! regions have no closing delimiter, so their end pattern is a lookahead
//! for "a token that can only belong to an enclosing or sibling construct".
//! The keyword sets are layered (core declarations, block closers, module
//! keywords) and two variants matter enough to get their own names: the
//! binding tier adds `and` (used by the *inner* body regions of a binding
//! so continuations fall back out to the binding's own machinery), and the
//! `where`-clause tier removes `type` (inside `where type` the keyword
//! reopens a type binding instead of ending the clause).

use crate::pattern::{
    self as p, Pattern, alternate, capture, group, lookahead, negative_lookahead,
    operator_boundary, preceded_by_last_significant_operator, preceded_by_last_significant_word,
    sequence, word_boundary,
};

/// Set interior of word-constituent characters (identifiers include `'`).
pub const WORD_SET: &str = "A-Za-z0-9'_";

/// Set interior of operator-constituent characters.
pub const OPERATOR_SET: &str = r"!%&$#+\-/:<=>?@~`^|*\\";

/// Core declaration keywords: value, type, exception and fixity forms.
pub const CORE_DECL_KEYWORDS: &[&str] = &[
    "abstype",
    "datatype",
    "eqtype",
    "exception",
    "fun",
    "infix",
    "infixr",
    "local",
    "nonfix",
    "open",
    "type",
    "val",
];

/// Keywords that close or pivot a block.
pub const BLOCK_CLOSE_KEYWORDS: &[&str] = &["end", "in"];

/// Module-level declaration keywords.
pub const MODULE_KEYWORDS: &[&str] = &[
    "functor",
    "include",
    "sharing",
    "signature",
    "structure",
];

/// Expression-level control keywords.
pub const CONTROL_KEYWORDS: &[&str] = &[
    "andalso", "case", "do", "else", "fn", "handle", "if", "of", "orelse", "raise", "then",
    "while",
];

// Reserved words not in the sets above; identifiers must not match these
// either.
const OTHER_KEYWORDS: &[&str] = &[
    "and", "as", "let", "op", "raise", "rec", "sig", "struct", "where", "with", "withtype",
];

fn literals(words: &[&str]) -> Vec<Pattern> {
    words.iter().map(|w| Pattern::literal(w)).collect()
}

/// `\b(w1|w2|...)\b` with the word in capture group 1.
pub fn keyword(words: &[&str]) -> Pattern {
    word_boundary(&capture(&alternate(&literals(words))))
}

/// `\b(?:w1|w2|...)\b` without a capture group, for whole-match scopes.
pub fn plain_keyword(words: &[&str]) -> Pattern {
    word_boundary(&alternate(&literals(words)))
}

/// A captured operator token that cannot be part of a longer operator.
pub fn symbolic(ops: &[&str]) -> Pattern {
    operator_boundary(&capture(&alternate(&literals(ops))), OPERATOR_SET)
}

/// An operator token with boundaries but no capture group.
pub fn bounded_op(ops: &[&str]) -> Pattern {
    operator_boundary(&alternate(&literals(ops)), OPERATOR_SET)
}

/// "The token just consumed was one of these keywords."
pub fn last_words(words: &[&str]) -> Pattern {
    preceded_by_last_significant_word(words, WORD_SET)
}

/// "The token just consumed was one of these operators."
pub fn last_ops(ops: &[&str]) -> Pattern {
    preceded_by_last_significant_operator(ops, OPERATOR_SET)
}

fn all_keywords() -> Vec<&'static str> {
    let mut all = Vec::new();
    all.extend_from_slice(CORE_DECL_KEYWORDS);
    all.extend_from_slice(BLOCK_CLOSE_KEYWORDS);
    all.extend_from_slice(MODULE_KEYWORDS);
    all.extend_from_slice(CONTROL_KEYWORDS);
    all.extend_from_slice(OTHER_KEYWORDS);
    all.sort_unstable();
    all.dedup();
    all
}

// Reserved words would otherwise win same-offset ties against the
// zero-width terminators, so every identifier pattern excludes them.
fn keyword_exclusion() -> Pattern {
    negative_lookahead(&sequence(&[
        alternate(&literals(&all_keywords())),
        Pattern::raw("\\b"),
    ]))
}

// The right edge of an identifier is a lookahead, not `\b`: identifiers
// may end in `'`, which regex word boundaries do not consider a word
// character, so `\b` would backtrack the prime off `x'`.
fn identifier_end() -> Pattern {
    Pattern::raw(&format!("(?![{WORD_SET}])"))
}

/// A lowercase-initial alphanumeric identifier that is not a reserved word.
pub fn identifier() -> Pattern {
    sequence(&[
        Pattern::raw("\\b"),
        keyword_exclusion(),
        Pattern::raw(&format!("[a-z][{WORD_SET}]*")),
        identifier_end(),
    ])
}

/// Any alphanumeric identifier that is not a reserved word.
pub fn any_identifier() -> Pattern {
    sequence(&[
        Pattern::raw("\\b"),
        keyword_exclusion(),
        Pattern::raw(&format!("[A-Za-z][{WORD_SET}]*")),
        identifier_end(),
    ])
}

/// An uppercase-initial identifier (structure and constructor names).
pub fn capital_identifier() -> Pattern {
    sequence(&[
        Pattern::raw(&format!("\\b[A-Z][{WORD_SET}]*")),
        identifier_end(),
    ])
}

/// A maximal run of operator-constituent characters.
pub fn symbolic_identifier() -> Pattern {
    Pattern::raw(&format!("[{OPERATOR_SET}]+"))
}

// A closing bracket of any kind.
fn closing_bracket() -> Pattern {
    Pattern::raw("[)\\]}]")
}

/// The terminator shape: a lookahead for a closing bracket, or one of
/// `keywords` as a whole word followed by end of input, whitespace or a
/// closing bracket.
fn terminator(keywords: &[&str]) -> Pattern {
    lookahead(&alternate(&[
        closing_bracket(),
        sequence(&[
            Pattern::raw("\\b"),
            group(&alternate(&literals(keywords))),
            group(&alternate(&[
                Pattern::raw("\\z"),
                Pattern::raw("\\s"),
                closing_bracket(),
            ])),
        ]),
    ]))
}

fn declaration_end_set() -> Vec<&'static str> {
    let mut set = Vec::new();
    set.extend_from_slice(CORE_DECL_KEYWORDS);
    set.extend_from_slice(BLOCK_CLOSE_KEYWORDS);
    set.extend_from_slice(MODULE_KEYWORDS);
    set
}

/// Ends a declaration-level region: the next core/module declaration
/// keyword, a block closer, or a closing bracket.
pub fn declaration_terminator() -> Pattern {
    terminator(&declaration_end_set())
}

/// [`declaration_terminator`] plus `and`: used by the regions *inside* a
/// binding (its body, its type ascription) so that an `and` continuation
/// pops back out to the enclosing binding region, whose own end must not
/// fire on `and`.
pub fn binding_terminator() -> Pattern {
    let mut set = declaration_end_set();
    set.push("and");
    terminator(&set)
}

/// [`declaration_terminator`] without `type`: inside a signature's
/// `where type` clause the `type` keyword legitimately reopens a nested
/// type binding rather than closing the clause. Using the full set there
/// silently mis-scopes every subsequent type binding.
pub fn declaration_terminator_without_type() -> Pattern {
    let set: Vec<&str> = declaration_end_set()
        .into_iter()
        .filter(|kw| *kw != "type")
        .collect();
    terminator(&set)
}

/// Ends a type sub-region: everything the binding terminator stops at,
/// any control keyword, or a structural operator (`=`, `=>`, `|`) that
/// belongs to the construct around the type.
pub fn type_terminator() -> Pattern {
    let mut set = declaration_end_set();
    set.push("and");
    set.extend_from_slice(CONTROL_KEYWORDS);
    alternate(&[
        lookahead(&operator_boundary(
            &alternate(&[
                Pattern::literal("=>"),
                Pattern::literal("="),
                Pattern::literal("|"),
            ]),
            OPERATOR_SET,
        )),
        terminator(&set),
    ])
}

/// The editor-facing "word" pattern, independent of the grammar: a
/// backslash-introduced run of non-whitespace, or a maximal run of
/// characters that are not whitespace, brackets, `#` or `.`.
pub fn word_pattern() -> Pattern {
    let excluded = p::negated_character_set(&[
        p::SetItem::Named(p::CharClass::Whitespace),
        p::SetItem::Chars("()[]{}#."),
    ]);
    alternate(&[
        sequence(&[
            Pattern::literal("\\"),
            p::one_or_more(&p::negated_character_set(&[p::SetItem::Named(
                p::CharClass::Whitespace,
            )])),
        ]),
        p::one_or_more(&excluded),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_pattern_shape() {
        let kw = keyword(&["val"]);
        assert_eq!(kw.as_str(), "\\b(?:((?:val)))\\b");
    }

    #[test]
    fn terminators_layer_keyword_sets() {
        let declaration = declaration_terminator().into_string();
        assert!(declaration.contains("val"));
        assert!(declaration.contains("structure"));
        assert!(declaration.contains("end"));
        assert!(!declaration.contains("and|"));

        let binding = binding_terminator().into_string();
        assert!(binding.contains("and"));
    }

    #[test]
    fn where_variant_drops_only_type() {
        let without_type = declaration_terminator_without_type().into_string();
        assert!(!without_type.contains("|type|"));
        // eqtype survives the filter
        assert!(without_type.contains("eqtype"));
        assert!(without_type.contains("val"));
    }

    #[test]
    fn identifiers_exclude_reserved_words() {
        let id = identifier().into_string();
        assert!(id.starts_with("\\b(?!"));
        assert!(id.contains("val"));
        assert!(id.contains("where"));
    }

    #[test]
    fn word_pattern_shape() {
        let word = word_pattern().into_string();
        assert!(word.contains("\\\\"));
        assert!(word.contains("[:space:]"));
        assert!(word.contains("#"));
    }
}
