//! The region-tokenization engine: a stack automaton that walks a document
//! against a compiled grammar and emits a scoped token stream.
//!
//! The whole document is scanned as one string; Oniguruma's `^`/`$` are
//! line anchors and `\A`/`\z` the text boundaries, so no line splitting is
//! needed. At every step the innermost open region (or the root) supplies
//! an ordered candidate set (its nested rules, plus its own end pattern)
//! and the leftmost match wins, ties broken by declared order. Text nothing
//! matches is emitted with only the enclosing scopes; scanning never fails.

use std::collections::HashMap;
use std::ops::Range;

use crate::grammar::{
    CaptureScopes, CompiledGrammar, END_RULE_ID, PatternSet, Rule, RuleId,
};
use crate::scope::Scope;
use crate::tokenizer::stack::ScanStack;

mod stack;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Byte span within the document (start inclusive, end exclusive).
    pub span: Range<usize>,
    /// Scopes active over the span, outermost first
    /// (e.g. source.sml -> meta.declaration.value.sml -> keyword.other.sml).
    pub scopes: Vec<Scope>,
}

/// Small wrapper making it hard to produce an invalid stream: spans come
/// out gap-free, non-overlapping and ascending by construction.
#[derive(Debug, Clone, Default)]
struct TokenAccumulator {
    tokens: Vec<Token>,
    /// Position up to which tokens have been generated
    last_end_pos: usize,
}

impl TokenAccumulator {
    fn produce(&mut self, end_pos: usize, scopes: &[Scope]) {
        // Zero-width matches produce nothing
        if self.last_end_pos >= end_pos {
            return;
        }

        #[cfg(feature = "debug")]
        log::trace!(
            "[produce] [{}..{end_pos}] {:?}",
            self.last_end_pos,
            scopes.iter().map(|s| s.build_string()).collect::<Vec<_>>()
        );

        self.tokens.push(Token {
            span: self.last_end_pos..end_pos,
            scopes: scopes.to_vec(),
        });
        self.last_end_pos = end_pos;
    }
}

/// Tokenizes documents against one compiled grammar.
///
/// Holds a per-context pattern-set cache, so reuse one tokenizer for many
/// documents of the same language. Output is a pure function of
/// (grammar, text): the cache never changes what is produced, only how fast.
/// For scanning documents in parallel, give each thread its own tokenizer.
#[derive(Debug)]
pub struct Tokenizer<'g> {
    grammar: &'g CompiledGrammar,
    pattern_cache: HashMap<RuleId, PatternSet>,
}

impl<'g> Tokenizer<'g> {
    pub fn new(grammar: &'g CompiledGrammar) -> Self {
        Self {
            grammar,
            pattern_cache: HashMap::new(),
        }
    }

    /// Tokenize `text`. Never fails: malformed input degrades to unscoped
    /// spans and regions left open at end of input simply stay open.
    pub fn tokenize(&mut self, text: &str) -> Vec<Token> {
        self.tokenize_cancellable(text, &|| false)
            .expect("uncancellable scan cannot be cancelled")
    }

    /// Like [`tokenize`](Self::tokenize), but polls `cancelled` at step
    /// boundaries and returns `None` once it reports true. Individual
    /// pattern matches are bounded, so nothing finer is needed.
    pub fn tokenize_cancellable(
        &mut self,
        text: &str,
        cancelled: &dyn Fn() -> bool,
    ) -> Option<Vec<Token>> {
        let mut stack = ScanStack::new(self.grammar.root_scope);
        let mut acc = TokenAccumulator::default();
        let mut pos = 0;

        while pos < text.len() {
            if cancelled() {
                return None;
            }

            let context = stack.top().rule;
            let Some(m) = self.pattern_set_for(context).find_at(text, pos) else {
                // Nothing matches for the rest of the document: the tail
                // keeps the enclosing scopes and the scan is done.
                break;
            };

            #[cfg(feature = "debug")]
            log::debug!(
                "[tokenize] rule {:?} matched [{}..{}] at depth {}",
                m.rule,
                m.start,
                m.end,
                stack.depth()
            );

            let has_advanced = m.end > pos;

            // The active region's own end pattern matched
            if m.rule == END_RULE_ID {
                let Rule::Region(region) = self.grammar.rule(context) else {
                    unreachable!("end sentinel outside a region context")
                };
                acc.produce(m.start, &stack.top().content_scopes);
                // End delimiters carry the region's name scopes, not its
                // content scopes
                let name_scopes = stack.top().name_scopes.clone();
                stack.set_content_scopes(name_scopes);
                emit_captures(
                    &mut acc,
                    &region.end_captures,
                    &m.capture_pos,
                    &stack.top().content_scopes,
                );
                acc.produce(m.end, &stack.top().content_scopes);

                let popped = stack.pop().expect("end matched with only the root open");
                if !has_advanced && popped.enter_offset == Some(pos) {
                    // The region was pushed and popped at the same offset:
                    // keep it open and step one unit, or the scan would spin.
                    // See microsoft/vscode-textmate#12.
                    stack.restore(popped);
                    pos = advance_one(text, pos);
                } else if has_advanced {
                    pos = m.end;
                }
                continue;
            }

            match self.grammar.rule(m.rule) {
                Rule::Match(rule) => {
                    acc.produce(m.start, &stack.top().content_scopes);
                    let mut scopes = stack.top().content_scopes.clone();
                    scopes.extend(rule.name_scopes.iter().copied());
                    emit_captures(&mut acc, &rule.captures, &m.capture_pos, &scopes);
                    acc.produce(m.end, &scopes);
                    // A zero-width match rule cannot be allowed to stall
                    pos = if has_advanced {
                        m.end
                    } else {
                        advance_one(text, pos)
                    };
                }
                Rule::Region(rule) => {
                    if !has_advanced && stack.has_open_frame_at(m.rule, pos) {
                        // A zero-width begin re-entering a region already
                        // open at this offset; step past it instead.
                        pos = advance_one(text, pos);
                        continue;
                    }

                    acc.produce(m.start, &stack.top().content_scopes);
                    let mut scopes = stack.top().content_scopes.clone();
                    scopes.extend(rule.name_scopes.iter().copied());
                    stack.push(m.rule, scopes, pos);
                    emit_captures(
                        &mut acc,
                        &rule.begin_captures,
                        &m.capture_pos,
                        &stack.top().name_scopes,
                    );
                    acc.produce(m.end, &stack.top().name_scopes);

                    let mut content = stack.top().name_scopes.clone();
                    content.extend(rule.content_scopes.iter().copied());
                    stack.set_content_scopes(content);

                    if has_advanced {
                        pos = m.end;
                    }
                    // A zero-width begin is fine: pushing the frame is
                    // progress in itself, and re-entry is guarded above.
                }
                Rule::IncludeOnly(_) | Rule::Noop => {
                    unreachable!("candidate sets contain only match and region rules")
                }
            }
        }

        // Cover any remaining tail; still-open frames are not an error,
        // their scopes simply extend to the end of the document.
        acc.produce(text.len(), &stack.top().content_scopes);
        Some(acc.tokens)
    }

    /// Candidate set for a scanning context: the flattened nested rules,
    /// plus, for a region, its own end pattern, appended after them
    /// unless the rule asks for end-first. Nested rules thereby win
    /// same-offset ties by default and may open an inner region exactly
    /// where the enclosing end would also match.
    fn pattern_set_for(&mut self, context: RuleId) -> &PatternSet {
        if !self.pattern_cache.contains_key(&context) {
            let mut candidates = self.grammar.match_candidates(context);
            if let Rule::Region(region) = self.grammar.rule(context) {
                let end_pattern = self.grammar.regex(region.end).pattern().to_owned();
                if region.try_end_first {
                    candidates.insert(0, (END_RULE_ID, end_pattern));
                } else {
                    candidates.push((END_RULE_ID, end_pattern));
                }
            }
            self.pattern_cache
                .insert(context, PatternSet::new(candidates));
        }
        &self.pattern_cache[&context]
    }
}

/// Emit one token per capture group according to its scope assignment,
/// keeping a small stack so groups nested inside other groups (group 0
/// around everything, typically) compose their scopes.
fn emit_captures(
    acc: &mut TokenAccumulator,
    capture_scopes: &CaptureScopes,
    positions: &[Option<(usize, usize)>],
    base: &[Scope],
) {
    if capture_scopes.is_empty() {
        return;
    }

    let mut open: Vec<(Vec<Scope>, usize)> = Vec::with_capacity(2);
    let count = capture_scopes.len().min(positions.len());

    for i in 0..count {
        let Some(extra) = &capture_scopes[i] else {
            continue;
        };
        let Some((start, end)) = positions[i] else {
            continue;
        };
        if start == end {
            continue;
        }

        while let Some((scopes, open_end)) = open.last() {
            if *open_end <= start {
                acc.produce(*open_end, scopes);
                open.pop();
            } else {
                break;
            }
        }

        match open.last() {
            Some((scopes, _)) => acc.produce(start, scopes),
            None => acc.produce(start, base),
        }

        let mut scopes = open
            .last()
            .map(|(s, _)| s.clone())
            .unwrap_or_else(|| base.to_vec());
        scopes.extend(extra.iter().copied());
        open.push((scopes, end));
    }

    while let Some((scopes, end)) = open.pop() {
        acc.produce(end, &scopes);
    }
}

fn advance_one(text: &str, pos: usize) -> usize {
    pos + text[pos..]
        .chars()
        .next()
        .map(char::len_utf8)
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{CaptureMap, RawGrammar, RawRule};
    use crate::pattern::Pattern;

    fn scope_names(token: &Token) -> Vec<String> {
        token.scopes.iter().map(|s| s.build_string()).collect()
    }

    fn assert_partition(text: &str, tokens: &[Token]) {
        let mut expected_start = 0;
        for token in tokens {
            assert_eq!(token.span.start, expected_start, "gap or overlap in stream");
            assert!(token.span.end > token.span.start, "empty token");
            expected_start = token.span.end;
        }
        assert_eq!(expected_start, text.len(), "stream does not cover the text");
    }

    fn grammar_with(repository: Vec<(&str, RawRule)>, root: Vec<&str>) -> CompiledGrammar {
        let mut raw = RawGrammar {
            name: "Test".to_owned(),
            scope_name: "source.test".to_owned(),
            patterns: root.into_iter().map(RawRule::include).collect(),
            ..RawGrammar::default()
        };
        for (name, rule) in repository {
            raw.repository.insert(name.to_owned(), rule);
        }
        raw.compile().unwrap()
    }

    #[test]
    fn match_rule_consumes_exact_span() {
        let grammar = grammar_with(
            vec![(
                "digits",
                RawRule::matching(&Pattern::raw("[0-9]+")).scope("constant.numeric.test"),
            )],
            vec!["#digits"],
        );
        let mut tokenizer = Tokenizer::new(&grammar);
        let tokens = tokenizer.tokenize("ab 12 cd");

        assert_partition("ab 12 cd", &tokens);
        let number = tokens.iter().find(|t| t.span == (3..5)).unwrap();
        assert!(scope_names(number).contains(&"constant.numeric.test".to_owned()));
        // surrounding text carries only the root scope
        assert_eq!(scope_names(&tokens[0]), vec!["source.test"]);
    }

    #[test]
    fn region_keeps_scope_until_end() {
        let grammar = grammar_with(
            vec![(
                "parens",
                RawRule::region(&Pattern::raw("\\("), &Pattern::raw("\\)"))
                    .scope("meta.parens.test")
                    .with_patterns(vec![RawRule::include("#parens")]),
            )],
            vec!["#parens"],
        );
        let mut tokenizer = Tokenizer::new(&grammar);
        let text = "a ((b) c) d";
        let tokens = tokenizer.tokenize(text);

        assert_partition(text, &tokens);
        let b = tokens.iter().find(|t| &text[t.span.clone()] == "b").unwrap();
        // two nested parens frames both apply
        assert_eq!(
            scope_names(b),
            vec!["source.test", "meta.parens.test", "meta.parens.test"]
        );
        let d = tokens.iter().find(|t| t.span.end == text.len()).unwrap();
        assert_eq!(scope_names(d), vec!["source.test"]);
    }

    #[test]
    fn nested_rules_win_same_offset_ties_by_default() {
        // At 'x' both the region's end (a lookahead) and the nested match
        // rule apply; declared order puts nested rules first.
        let grammar = grammar_with(
            vec![(
                "reg",
                RawRule::region(&Pattern::raw("\\["), &Pattern::raw("(?=x)"))
                    .scope("meta.region.test")
                    .with_patterns(vec![
                        RawRule::matching(&Pattern::raw("x")).scope("inner.test"),
                    ]),
            )],
            vec!["#reg"],
        );
        let mut tokenizer = Tokenizer::new(&grammar);
        let tokens = tokenizer.tokenize("[x");

        assert_partition("[x", &tokens);
        let x = tokens.iter().find(|t| t.span == (1..2)).unwrap();
        assert!(scope_names(x).contains(&"inner.test".to_owned()));
    }

    #[test]
    fn try_end_first_reverses_the_tie() {
        let grammar = grammar_with(
            vec![(
                "reg",
                RawRule::region(&Pattern::raw("\\["), &Pattern::raw("(?=x)"))
                    .scope("meta.region.test")
                    .with_patterns(vec![
                        RawRule::matching(&Pattern::raw("x")).scope("inner.test"),
                    ])
                    .end_first(),
            )],
            vec!["#reg"],
        );
        let mut tokenizer = Tokenizer::new(&grammar);
        let tokens = tokenizer.tokenize("[x");

        assert_partition("[x", &tokens);
        // the region closed before 'x', which falls back to the root scope
        let x = tokens.iter().find(|t| t.span == (1..2)).unwrap();
        assert_eq!(scope_names(x), vec!["source.test"]);
    }

    #[test]
    fn content_scope_applies_between_delimiters_only() {
        let grammar = grammar_with(
            vec![(
                "quoted",
                RawRule::region(&Pattern::raw("<"), &Pattern::raw(">"))
                    .scope("markup.quote.test")
                    .content_scope("markup.quote.inner.test"),
            )],
            vec!["#quoted"],
        );
        let mut tokenizer = Tokenizer::new(&grammar);
        let text = "<abc>";
        let tokens = tokenizer.tokenize(text);

        assert_partition(text, &tokens);
        let open = tokens.iter().find(|t| t.span == (0..1)).unwrap();
        assert_eq!(scope_names(open), vec!["source.test", "markup.quote.test"]);
        let inner = tokens.iter().find(|t| t.span == (1..4)).unwrap();
        assert_eq!(
            scope_names(inner),
            vec![
                "source.test",
                "markup.quote.test",
                "markup.quote.inner.test"
            ]
        );
        let close = tokens.iter().find(|t| t.span == (4..5)).unwrap();
        assert_eq!(scope_names(close), vec!["source.test", "markup.quote.test"]);
    }

    #[test]
    fn unterminated_region_is_not_an_error() {
        let grammar = grammar_with(
            vec![(
                "string",
                RawRule::region(&Pattern::raw("\""), &Pattern::raw("\""))
                    .scope("string.quoted.test"),
            )],
            vec!["#string"],
        );
        let mut tokenizer = Tokenizer::new(&grammar);
        let text = "a \"unclosed";
        let tokens = tokenizer.tokenize(text);

        assert_partition(text, &tokens);
        let tail = tokens.last().unwrap();
        assert!(scope_names(tail).contains(&"string.quoted.test".to_owned()));
    }

    #[test]
    fn zero_width_push_pop_cycles_terminate() {
        // begin and end match at the same offset without consuming anything
        let grammar = grammar_with(
            vec![(
                "reg",
                RawRule::region(&Pattern::raw("(?=z)"), &Pattern::raw("(?=z)"))
                    .scope("meta.region.test"),
            )],
            vec!["#reg"],
        );
        let mut tokenizer = Tokenizer::new(&grammar);
        let text = "zzz";
        let tokens = tokenizer.tokenize(text);
        assert_partition(text, &tokens);
    }

    #[test]
    fn captures_split_a_match_into_scoped_tokens() {
        let grammar = grammar_with(
            vec![(
                "kv",
                RawRule::matching(&Pattern::raw("([a-z]+)(=)([0-9]+)")).with_captures(
                    CaptureMap::new()
                        .set(1, "variable.other.test")
                        .set(2, "punctuation.separator.test")
                        .set(3, "constant.numeric.test"),
                ),
            )],
            vec!["#kv"],
        );
        let mut tokenizer = Tokenizer::new(&grammar);
        let text = "k=42";
        let tokens = tokenizer.tokenize(text);

        assert_partition(text, &tokens);
        assert_eq!(tokens.len(), 3);
        assert!(scope_names(&tokens[0]).contains(&"variable.other.test".to_owned()));
        assert!(scope_names(&tokens[1]).contains(&"punctuation.separator.test".to_owned()));
        assert!(scope_names(&tokens[2]).contains(&"constant.numeric.test".to_owned()));
    }

    #[test]
    fn whole_match_scope_composes_with_captures() {
        let grammar = grammar_with(
            vec![(
                "kv",
                RawRule::matching(&Pattern::raw("(no)go"))
                    .scope("meta.pair.test")
                    .with_captures(CaptureMap::new().set(1, "inner.test")),
            )],
            vec!["#kv"],
        );
        let mut tokenizer = Tokenizer::new(&grammar);
        let tokens = tokenizer.tokenize("nogo");

        assert_partition("nogo", &tokens);
        assert_eq!(
            scope_names(&tokens[0]),
            vec!["source.test", "meta.pair.test", "inner.test"]
        );
        assert_eq!(
            scope_names(&tokens[1]),
            vec!["source.test", "meta.pair.test"]
        );
    }

    #[test]
    fn identical_input_yields_identical_streams() {
        let grammar = grammar_with(
            vec![(
                "parens",
                RawRule::region(&Pattern::raw("\\("), &Pattern::raw("\\)"))
                    .scope("meta.parens.test")
                    .with_patterns(vec![RawRule::include("#parens")]),
            )],
            vec!["#parens"],
        );
        let text = "((a) (b (c)))";
        let first = Tokenizer::new(&grammar).tokenize(text);
        let second = Tokenizer::new(&grammar).tokenize(text);
        let mut reused = Tokenizer::new(&grammar);
        let third = reused.tokenize(text);
        let fourth = reused.tokenize(text);

        assert_eq!(first, second);
        assert_eq!(first, third);
        assert_eq!(first, fourth);
    }

    #[test]
    fn cancellation_stops_between_steps() {
        let grammar = grammar_with(
            vec![(
                "digits",
                RawRule::matching(&Pattern::raw("[0-9]+")).scope("constant.numeric.test"),
            )],
            vec!["#digits"],
        );
        let mut tokenizer = Tokenizer::new(&grammar);
        assert!(tokenizer.tokenize_cancellable("1 2 3", &|| true).is_none());
        assert!(tokenizer.tokenize_cancellable("1 2 3", &|| false).is_some());
    }

    #[test]
    fn empty_input_yields_empty_stream() {
        let grammar = grammar_with(
            vec![(
                "digits",
                RawRule::matching(&Pattern::raw("[0-9]+")).scope("constant.numeric.test"),
            )],
            vec!["#digits"],
        );
        assert!(Tokenizer::new(&grammar).tokenize("").is_empty());
    }
}
