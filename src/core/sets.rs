use std::fmt::{self, Display, Formatter};

use fixedbitset::FixedBitSet;

use crate::core::lexer::SymbolTable;

/// Identifier type for atomic predicates.
pub type SymbolId = u32;

/// Identifier type for alternating-automaton states (subformula indices).
pub type NodeId = u32;

/// A symbolic letter: the conjunction of positive and negative literals
/// over the predicate alphabet.
///
/// The invariant `pos ∩ neg = ∅` holds for every letter that is ever
/// attached to a transition; [`Letter::conjoin`] enforces it by refusing
/// contradictory combinations. A letter with both sets empty denotes `true`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Letter {
    /// Predicates that must hold.
    pub pos: FixedBitSet,
    /// Predicates that must not hold.
    pub neg: FixedBitSet,
}

impl Letter {
    /// The `true` letter over an alphabet of `width` predicates.
    #[must_use]
    pub fn empty(width: usize) -> Self {
        Self {
            pos: FixedBitSet::with_capacity(width),
            neg: FixedBitSet::with_capacity(width),
        }
    }

    /// A letter requiring the single positive literal `sym`.
    #[must_use]
    pub fn positive(width: usize, sym: SymbolId) -> Self {
        let mut letter = Self::empty(width);
        letter.pos.insert(sym as usize);
        letter
    }

    /// A letter requiring the single negative literal `!sym`.
    #[must_use]
    pub fn negative(width: usize, sym: SymbolId) -> Self {
        let mut letter = Self::empty(width);
        letter.neg.insert(sym as usize);
        letter
    }

    /// Whether this letter is the unconstrained letter `true`.
    #[must_use]
    pub fn is_true(&self) -> bool {
        self.pos.is_clear() && self.neg.is_clear()
    }

    /// Conjunction of two letters, or `None` when a literal clashes.
    #[must_use]
    pub fn conjoin(&self, other: &Letter) -> Option<Letter> {
        let mut pos = self.pos.clone();
        pos.union_with(&other.pos);
        let mut neg = self.neg.clone();
        neg.union_with(&other.neg);
        if pos.is_disjoint(&neg) {
            Some(Letter { pos, neg })
        } else {
            None
        }
    }

    /// Whether every word satisfying `other` also satisfies `self`.
    ///
    /// This is the literal-set inclusion used by the dominance checks: the
    /// covering letter carries a subset of the literals of the covered one.
    #[must_use]
    pub fn covers(&self, other: &Letter) -> bool {
        self.pos.is_subset(&other.pos) && self.neg.is_subset(&other.neg)
    }

    /// Renders the letter with predicate names resolved through `symbols`.
    #[must_use]
    pub fn display<'a>(&'a self, symbols: &'a SymbolTable) -> DisplayLetter<'a> {
        DisplayLetter {
            letter: self,
            symbols,
        }
    }
}

/// Display adapter rendering a letter as a guard expression.
pub struct DisplayLetter<'a> {
    letter: &'a Letter,
    symbols: &'a SymbolTable,
}

impl Display for DisplayLetter<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.letter.is_true() {
            return write!(f, "1");
        }
        let mut first = true;
        for sym in self.letter.pos.ones() {
            if !first {
                write!(f, " && ")?;
            }
            first = false;
            write!(f, "{}", self.symbols.name(sym as SymbolId))?;
        }
        for sym in self.letter.neg.ones() {
            if !first {
                write!(f, " && ")?;
            }
            first = false;
            write!(f, "!{}", self.symbols.name(sym as SymbolId))?;
        }
        Ok(())
    }
}

/// The members of a node set as a sorted list of state indices.
#[must_use]
pub fn node_list(set: &FixedBitSet) -> Vec<NodeId> {
    set.ones().map(|i| i as NodeId).collect()
}

/// Renders a node set as `{1, 3}` for the verbose automaton dumps.
#[must_use]
pub fn fmt_nodes(set: &FixedBitSet) -> String {
    let mut out = String::from("{");
    for (i, node) in set.ones().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        out.push_str(&node.to_string());
    }
    out.push('}');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conjoin_unions_literals() {
        let a = Letter::positive(4, 0);
        let b = Letter::negative(4, 2);
        let c = a.conjoin(&b).expect("compatible letters");
        assert!(c.pos.contains(0));
        assert!(c.neg.contains(2));
    }

    #[test]
    fn test_conjoin_rejects_clash() {
        let a = Letter::positive(4, 1);
        let b = Letter::negative(4, 1);
        assert!(a.conjoin(&b).is_none());
    }

    #[test]
    fn test_true_letter_covers_everything() {
        let t = Letter::empty(4);
        let a = Letter::positive(4, 3);
        assert!(t.covers(&a));
        assert!(!a.covers(&t));
    }

    #[test]
    fn test_display_guard() {
        let mut symbols = SymbolTable::new();
        let p = symbols.intern("p");
        let q = symbols.intern("q");
        let mut letter = Letter::positive(2, p);
        letter.neg.insert(q as usize);
        assert_eq!(letter.display(&symbols).to_string(), "p && !q");
        assert_eq!(Letter::empty(2).display(&symbols).to_string(), "1");
    }
}
