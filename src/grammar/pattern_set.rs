use std::fmt::{Debug, Formatter};

use onig::{RegSet, RegexOptions, SearchOptions};

use crate::grammar::compiled::RuleId;

#[derive(Debug, PartialEq, Eq, Clone)]
pub struct PatternSetMatch {
    pub rule: RuleId,
    pub start: usize,
    pub end: usize,
    /// Absolute byte positions of every capture group (index 0 = whole match)
    pub capture_pos: Vec<Option<(usize, usize)>>,
}

/// The ordered candidate patterns of one scanning context, compiled as a
/// single onig RegSet so one search finds the leftmost match over all of
/// them. Ties at the same start position go to the earliest pattern in the
/// list: declared rule order is the disambiguation contract.
pub struct PatternSet {
    rules: Vec<RuleId>,
    regset: Option<RegSet>,
}

impl PatternSet {
    /// Patterns were individually validated at grammar load; if the combined
    /// set still fails to build we degrade to matching nothing, since no
    /// scan-time condition is allowed to be fatal.
    pub fn new(items: Vec<(RuleId, String)>) -> Self {
        if items.is_empty() {
            return Self {
                rules: Vec::new(),
                regset: None,
            };
        }

        let (rules, patterns): (Vec<_>, Vec<_>) = items.into_iter().unzip();
        let pattern_strs: Vec<&str> = patterns.iter().map(|s| s.as_str()).collect();

        let regset =
            RegSet::with_options(&pattern_strs, RegexOptions::REGEX_OPTION_CAPTURE_GROUP).ok();

        #[cfg(feature = "debug")]
        if regset.is_none() {
            log::warn!("pattern set with {} patterns failed to build", pattern_strs.len());
        }

        Self { rules, regset }
    }

    /// Leftmost match at or after `pos`. The full text is passed (not a
    /// slice) so lookbehind assertions can inspect text before `pos`.
    pub(crate) fn find_at(&self, text: &str, pos: usize) -> Option<PatternSetMatch> {
        let regset = self.regset.as_ref()?;

        let (pattern_index, captures) = regset.captures_with_options(
            text,
            pos,
            text.len(),
            onig::RegSetLead::Position,
            SearchOptions::SEARCH_OPTION_NONE,
        )?;
        let (start, end) = captures.pos(0)?;

        let capture_pos: Vec<Option<(usize, usize)>> =
            (0..captures.len()).map(|i| captures.pos(i)).collect();

        Some(PatternSetMatch {
            rule: self.rules[pattern_index],
            start,
            end,
            capture_pos,
        })
    }
}

impl Debug for PatternSet {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "PatternSet({} rules)", self.rules.len())
    }
}
