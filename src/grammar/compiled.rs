use std::collections::{BTreeMap, HashSet};
use std::ops::Deref;

use crate::error::Error;
use crate::grammar::raw::{CaptureMap, RawGrammar, RawRule};
use crate::grammar::regex::Regex;
use crate::scope::Scope;

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct RuleId(pub u16);

impl Deref for RuleId {
    type Target = u16;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct RegexId(u16);

impl Deref for RegexId {
    type Target = u16;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

/// The rule every grammar compiles first: its root include list.
pub const ROOT_RULE_ID: RuleId = RuleId(0);

/// Sentinel used by the tokenizer for "the active region's own end pattern"
/// when it participates in a candidate set alongside real rules.
pub const END_RULE_ID: RuleId = RuleId(u16::MAX);

/// Scopes a capture group contributes, indexed by group number.
pub type CaptureScopes = Vec<Option<Vec<Scope>>>;

#[derive(Debug, Clone)]
pub struct Match {
    pub id: RuleId,
    pub name_scopes: Vec<Scope>,
    pub regex: RegexId,
    pub captures: CaptureScopes,
}

#[derive(Debug, Clone)]
pub struct Region {
    pub id: RuleId,
    pub name_scopes: Vec<Scope>,
    pub content_scopes: Vec<Scope>,
    pub begin: RegexId,
    pub begin_captures: CaptureScopes,
    pub end: RegexId,
    pub end_captures: CaptureScopes,
    pub try_end_first: bool,
    pub patterns: Vec<RuleId>,
}

#[derive(Debug, Clone)]
pub struct IncludeOnly {
    pub id: RuleId,
    pub patterns: Vec<RuleId>,
}

#[derive(Debug, Clone)]
pub enum Rule {
    Match(Match),
    Region(Region),
    IncludeOnly(IncludeOnly),
    /// A rule with no body; matches nothing. Kept so ids stay dense.
    Noop,
}

/// A grammar compiled to dense id-indexed tables.
///
/// Includes are resolved to [`RuleId`]s here, once, so the mutually
/// recursive rule table needs no lookup by name while scanning, and a
/// dangling reference is impossible after `from_raw` succeeds.
#[derive(Debug, Clone)]
pub struct CompiledGrammar {
    pub name: String,
    pub scope_name: String,
    pub root_scope: Scope,
    pub file_types: Vec<String>,
    regexes: Vec<Regex>,
    rules: Vec<Rule>,
}

impl CompiledGrammar {
    pub fn from_raw(raw: RawGrammar) -> Result<Self, Error> {
        let mut grammar = Self {
            root_scope: Scope::new(&raw.scope_name),
            name: raw.name,
            scope_name: raw.scope_name,
            file_types: raw.file_types,
            regexes: Vec::new(),
            rules: Vec::new(),
        };

        // Pass 1: reserve ids for the root and every repository entry, so
        // includes resolve to stable ids before any body is compiled and
        // cyclic references cost nothing.
        grammar.rules.push(Rule::Noop);
        let mut names: BTreeMap<String, RuleId> = BTreeMap::new();
        for name in raw.repository.keys() {
            let id = RuleId(grammar.rules.len() as u16);
            grammar.rules.push(Rule::Noop);
            names.insert(name.clone(), id);
        }

        // Pass 2: compile bodies into their reserved slots.
        for (name, rule) in raw.repository {
            let id = names[&name];
            grammar.compile_rule_into(id, rule, &names)?;
        }
        let root_patterns = grammar.compile_patterns(raw.patterns, &names)?;
        grammar.rules[*ROOT_RULE_ID as usize] = Rule::IncludeOnly(IncludeOnly {
            id: ROOT_RULE_ID,
            patterns: root_patterns,
        });

        Ok(grammar)
    }

    pub fn rule(&self, id: RuleId) -> &Rule {
        &self.rules[*id as usize]
    }

    pub fn regex(&self, id: RegexId) -> &Regex {
        &self.regexes[*id as usize]
    }

    /// The ordered nested rules of a scanning context (root or region).
    pub fn patterns_of(&self, id: RuleId) -> &[RuleId] {
        match self.rule(id) {
            Rule::Region(r) => &r.patterns,
            Rule::IncludeOnly(r) => &r.patterns,
            Rule::Match(_) | Rule::Noop => &[],
        }
    }

    /// Flatten a context's rule list into `(rule, pattern)` candidates in
    /// declared order: a match rule contributes its pattern, a region its
    /// begin pattern, a container its own candidates recursively. A visited
    /// set keeps include cycles finite.
    pub fn match_candidates(&self, context: RuleId) -> Vec<(RuleId, String)> {
        let mut out = Vec::new();
        let mut visited = HashSet::new();
        visited.insert(context);
        self.collect_candidates(self.patterns_of(context), &mut out, &mut visited);
        out
    }

    fn collect_candidates(
        &self,
        ids: &[RuleId],
        out: &mut Vec<(RuleId, String)>,
        visited: &mut HashSet<RuleId>,
    ) {
        for &id in ids {
            match self.rule(id) {
                Rule::Match(m) => out.push((id, self.regex(m.regex).pattern().to_owned())),
                Rule::Region(r) => out.push((id, self.regex(r.begin).pattern().to_owned())),
                Rule::IncludeOnly(inner) => {
                    if visited.insert(id) {
                        self.collect_candidates(&inner.patterns, out, visited);
                    }
                }
                Rule::Noop => {}
            }
        }
    }

    fn compile_rule(
        &mut self,
        raw: RawRule,
        names: &BTreeMap<String, RuleId>,
    ) -> Result<RuleId, Error> {
        let id = RuleId(self.rules.len() as u16);
        self.rules.push(Rule::Noop);
        self.compile_rule_into(id, raw, names)?;
        Ok(id)
    }

    fn compile_rule_into(
        &mut self,
        id: RuleId,
        raw: RawRule,
        names: &BTreeMap<String, RuleId>,
    ) -> Result<(), Error> {
        let name_scopes = scopes_of(raw.name.as_deref());

        let rule = if let Some(pattern) = raw.match_ {
            Rule::Match(Match {
                id,
                name_scopes,
                regex: self.add_regex(pattern)?,
                captures: compile_captures(&raw.captures),
            })
        } else if let Some(begin) = raw.begin {
            if let Some(end) = raw.end {
                let patterns = self.compile_patterns(raw.patterns, names)?;
                Rule::Region(Region {
                    id,
                    content_scopes: scopes_of(raw.content_name.as_deref()),
                    name_scopes,
                    begin: self.add_regex(begin)?,
                    begin_captures: compile_captures(&raw.begin_captures),
                    end: self.add_regex(end)?,
                    end_captures: compile_captures(&raw.end_captures),
                    try_end_first: raw.try_end_first,
                    patterns,
                })
            } else {
                // begin without end is a match rule in disguise
                Rule::Match(Match {
                    id,
                    name_scopes,
                    regex: self.add_regex(begin)?,
                    captures: compile_captures(&raw.begin_captures),
                })
            }
        } else if let Some(reference) = raw.include {
            let target = resolve_include(&reference, names)?;
            Rule::IncludeOnly(IncludeOnly {
                id,
                patterns: vec![target],
            })
        } else if raw.patterns.is_empty() {
            Rule::Noop
        } else {
            let patterns = self.compile_patterns(raw.patterns, names)?;
            Rule::IncludeOnly(IncludeOnly { id, patterns })
        };

        self.rules[*id as usize] = rule;
        Ok(())
    }

    fn compile_patterns(
        &mut self,
        rules: Vec<RawRule>,
        names: &BTreeMap<String, RuleId>,
    ) -> Result<Vec<RuleId>, Error> {
        let mut out = Vec::with_capacity(rules.len());
        for rule in rules {
            if let Some(reference) = &rule.include {
                out.push(resolve_include(reference, names)?);
            } else {
                out.push(self.compile_rule(rule, names)?);
            }
        }
        Ok(out)
    }

    fn add_regex(&mut self, pattern: String) -> Result<RegexId, Error> {
        let re = Regex::new(pattern);
        if let Err(error) = re.validate() {
            return Err(Error::InvalidPattern {
                pattern: re.pattern().to_owned(),
                error,
            });
        }
        let id = RegexId(self.regexes.len() as u16);
        self.regexes.push(re);
        Ok(id)
    }
}

fn scopes_of(name: Option<&str>) -> Vec<Scope> {
    name.map(Scope::parse_list).unwrap_or_default()
}

fn compile_captures(captures: &CaptureMap) -> CaptureScopes {
    let Some(max) = captures.max_index() else {
        return Vec::new();
    };
    let mut out: CaptureScopes = vec![None; max as usize + 1];
    for (&index, scopes) in captures.iter() {
        out[index as usize] = Some(Scope::parse_list(scopes));
    }
    out
}

fn resolve_include(reference: &str, names: &BTreeMap<String, RuleId>) -> Result<RuleId, Error> {
    if reference == "$self" {
        return Ok(ROOT_RULE_ID);
    }
    if let Some(name) = reference.strip_prefix('#')
        && let Some(&id) = names.get(name)
    {
        return Ok(id);
    }
    Err(Error::UnresolvedInclude(reference.to_owned()))
}
