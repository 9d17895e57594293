mod compiled;
mod pattern_set;
mod raw;
mod regex;

pub use compiled::{
    CaptureScopes, CompiledGrammar, END_RULE_ID, IncludeOnly, Match, ROOT_RULE_ID, Region,
    RegexId, Rule, RuleId,
};
pub use pattern_set::{PatternSet, PatternSetMatch};
pub use raw::{CaptureMap, RawGrammar, RawRule};
pub use regex::Regex;
