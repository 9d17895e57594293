//! Scope names packed into a single u128.
//!
//! A scope like "entity.name.function.sml" is stored as up to 8 atoms of
//! 16 bits each, MSB first, where each atom is an interned-string index + 1
//! (0 marks an unused slot). Tokens carry stacks of these, so `Scope` must
//! stay `Copy` and comparisons must stay branch-free.

use std::collections::HashMap;
use std::fmt;
use std::sync::{LazyLock, Mutex, MutexGuard};

pub const MAX_ATOMS: usize = 8;
// 2^16 - 2: slot values are index + 1 and 0 is reserved for "unused"
pub const MAX_INTERNED_ATOMS: usize = 65534;

/// A hierarchical classification name attached to token spans.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Copy, Default, Hash)]
pub struct Scope {
    atoms: u128,
}

impl Scope {
    /// Intern a dot-separated name. Names longer than 8 atoms are truncated.
    pub fn new(s: &str) -> Scope {
        lock_atom_table().build(s.trim())
    }

    /// Intern a whitespace-separated list of names, as grammars write them
    /// when several classifications apply to one capture.
    pub fn parse_list(s: &str) -> Vec<Scope> {
        s.split_whitespace().map(Scope::new).collect()
    }

    /// The slot at `index` (0-7): 0 when unused, interned index + 1 otherwise.
    #[inline]
    pub fn atom_at(self, index: usize) -> u16 {
        debug_assert!(index < MAX_ATOMS);
        let shift = (MAX_ATOMS - 1 - index) * 16;
        ((self.atoms >> shift) & 0xFFFF) as u16
    }

    #[inline]
    pub fn len(self) -> u32 {
        MAX_ATOMS as u32 - self.unused_slots()
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.atoms == 0
    }

    // MSB-first packing means unused slots show up as trailing zeros
    #[inline]
    fn unused_slots(self) -> u32 {
        self.atoms.trailing_zeros() / 16
    }

    /// Whether `self` is a dotted prefix of `other`. O(1) by masking.
    #[inline]
    pub fn is_prefix_of(self, other: Scope) -> bool {
        let unused = self.unused_slots();
        if unused == MAX_ATOMS as u32 {
            return true;
        }
        let mask = u128::MAX << (unused * 16);
        (self.atoms ^ other.atoms) & mask == 0
    }

    /// Rebuild the dotted string form. Allocates; meant for display and tests.
    pub fn build_string(self) -> String {
        lock_atom_table().to_string(self)
    }
}

impl fmt::Debug for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Scope(\"{}\")", self.build_string())
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.build_string())
    }
}

/// Process-wide atom interner shared by every grammar and scan.
struct AtomTable {
    atoms: Vec<String>,
    index_of: HashMap<String, usize>,
}

impl AtomTable {
    fn new() -> Self {
        Self {
            atoms: Vec::new(),
            index_of: HashMap::new(),
        }
    }

    fn intern(&mut self, atom: &str) -> usize {
        if let Some(&index) = self.index_of.get(atom) {
            return index;
        }
        if self.atoms.len() >= MAX_INTERNED_ATOMS {
            panic!("scope atom table overflow: more than {MAX_INTERNED_ATOMS} distinct atoms");
        }
        let index = self.atoms.len();
        self.atoms.push(atom.to_owned());
        self.index_of.insert(atom.to_owned(), index);
        index
    }

    fn atom_str(&self, slot: u16) -> &str {
        debug_assert!(slot > 0);
        &self.atoms[(slot - 1) as usize]
    }

    fn build(&mut self, s: &str) -> Scope {
        if s.is_empty() {
            return Scope::default();
        }

        let mut atoms = 0u128;
        for (i, part) in s.split('.').take(MAX_ATOMS).enumerate() {
            if part.is_empty() {
                continue;
            }
            let slot = (self.intern(part) + 1) as u128;
            atoms |= slot << ((MAX_ATOMS - 1 - i) * 16);
        }
        Scope { atoms }
    }

    fn to_string(&self, scope: Scope) -> String {
        let mut parts = Vec::new();
        for i in 0..MAX_ATOMS {
            let slot = scope.atom_at(i);
            if slot == 0 {
                break;
            }
            parts.push(self.atom_str(slot));
        }
        parts.join(".")
    }
}

static ATOM_TABLE: LazyLock<Mutex<AtomTable>> = LazyLock::new(|| Mutex::new(AtomTable::new()));

fn lock_atom_table() -> MutexGuard<'static, AtomTable> {
    ATOM_TABLE.lock().expect("scope atom table poisoned")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrip() {
        let scope = Scope::new("entity.name.function.sml");
        assert_eq!(scope.len(), 4);
        assert_eq!(scope.build_string(), "entity.name.function.sml");
    }

    #[test]
    fn empty() {
        let scope = Scope::new("");
        assert!(scope.is_empty());
        assert_eq!(scope.len(), 0);
        assert_eq!(scope.build_string(), "");
    }

    #[test]
    fn prefix_matching() {
        let prefix = Scope::new("keyword.control");
        let full = Scope::new("keyword.control.sml");
        let other = Scope::new("keyword.operator.sml");

        assert!(prefix.is_prefix_of(full));
        assert!(prefix.is_prefix_of(prefix));
        assert!(!prefix.is_prefix_of(other));
        assert!(Scope::default().is_prefix_of(full));
    }

    #[test]
    fn truncates_past_eight_atoms() {
        let long = Scope::new("a.b.c.d.e.f.g.h.i.j");
        assert_eq!(long.len(), 8);
        assert_eq!(long.build_string(), "a.b.c.d.e.f.g.h");
    }

    #[test]
    fn list_parsing() {
        let scopes = Scope::parse_list("comment.block.sml  punctuation.definition.comment.sml");
        assert_eq!(scopes.len(), 2);
        assert_eq!(scopes[0].build_string(), "comment.block.sml");
        assert_eq!(scopes[1].build_string(), "punctuation.definition.comment.sml");
    }

    #[test]
    fn interning_is_stable() {
        assert_eq!(Scope::new("source.sml"), Scope::new("source.sml"));
        assert_ne!(Scope::new("source.sml"), Scope::new("source"));
    }

    #[test]
    fn ordering_follows_atom_depth() {
        let shorter = Scope::new("meta.binding");
        let longer = Scope::new("meta.binding.value");
        assert!(shorter < longer);
    }
}
