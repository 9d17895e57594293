//! The Standard ML grammar: vocabulary tables, the rule repository, and the
//! editor-facing word pattern.

use crate::grammar::RawGrammar;
use crate::pattern::Pattern;

pub mod catalog;
mod rules;

/// Build the full SML grammar in its declarative form. Compile it with
/// [`RawGrammar::compile`] before tokenizing; compilation also validates
/// every pattern and include reference.
pub fn grammar() -> RawGrammar {
    RawGrammar {
        name: "Standard ML".to_owned(),
        scope_name: "source.sml".to_owned(),
        file_types: vec!["sml".to_owned(), "sig".to_owned(), "fun".to_owned()],
        patterns: rules::root_patterns(),
        repository: rules::repository(),
    }
}

/// The pattern defining a maximal "word" for cursor and selection
/// operations. Independent of the grammar.
pub fn word_pattern() -> Pattern {
    catalog::word_pattern()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grammar_compiles() {
        // every include resolves, every pattern is valid oniguruma
        let compiled = grammar().compile().unwrap();
        assert_eq!(compiled.scope_name, "source.sml");
        assert_eq!(compiled.root_scope.build_string(), "source.sml");
        assert_eq!(compiled.file_types, ["sml", "sig", "fun"]);
    }

    #[test]
    fn grammar_roundtrips_through_json() {
        let raw = grammar();
        let json = raw.to_json().unwrap();
        let reloaded = RawGrammar::from_json(&json).unwrap();
        assert_eq!(reloaded, raw);
        reloaded.compile().unwrap();
    }

    #[test]
    fn word_pattern_splits_on_dots_and_brackets() {
        let re = onig::Regex::new(word_pattern().as_str()).unwrap();
        let text = "List.map (fn x => #name x)";
        let words: Vec<&str> = re
            .find_iter(text)
            .map(|(start, end)| &text[start..end])
            .collect();
        assert_eq!(words, ["List", "map", "fn", "x", "=>", "name", "x"]);
    }

    #[test]
    fn word_pattern_keeps_escaped_runs_whole() {
        let re = onig::Regex::new(word_pattern().as_str()).unwrap();
        let text = "a \\na b";
        let words: Vec<&str> = re
            .find_iter(text)
            .map(|(start, end)| &text[start..end])
            .collect();
        assert_eq!(words, ["a", "\\na", "b"]);
    }
}
