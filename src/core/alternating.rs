use std::fmt::Write as _;
use std::time::Instant;

use fixedbitset::FixedBitSet;
use indexmap::IndexMap;

use crate::core::Flags;
use crate::core::ast::Formula;
use crate::core::lexer::SymbolTable;
use crate::core::sets::{Letter, NodeId, fmt_nodes};

/// A transition of the alternating automaton: a letter plus the
/// conjunction of successor states that must all accept.
///
/// An empty successor set means the obligation is discharged after one
/// step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ATrans {
    /// Guard of the transition.
    pub letter: Letter,
    /// Universal branching target: the set of states to move into.
    pub to: FixedBitSet,
}

impl ATrans {
    /// The unguarded transition with no successor obligations.
    #[must_use]
    pub fn epsilon(sym_width: usize, node_width: usize) -> Self {
        Self {
            letter: Letter::empty(sym_width),
            to: FixedBitSet::with_capacity(node_width),
        }
    }

    /// Combines two transitions by conjoining their letters and uniting
    /// their targets; `None` when the letters contradict each other.
    #[must_use]
    pub fn conjoin(&self, other: &ATrans) -> Option<ATrans> {
        let letter = self.letter.conjoin(&other.letter)?;
        let mut to = self.to.clone();
        to.union_with(&other.to);
        Some(ATrans { letter, to })
    }
}

/// A very weak alternating automaton over subformula states.
#[derive(Debug, Clone)]
pub struct Vwaa {
    /// The subformula labelling each state.
    pub labels: Vec<Formula>,
    /// Outgoing transitions per state.
    pub transitions: Vec<Vec<ATrans>>,
    /// Transitions of the root formula; only their target sets matter.
    pub initial: Vec<ATrans>,
    /// States whose subformula is an until: the acceptance marks.
    pub final_set: FixedBitSet,
    /// Bit width of node sets, fixed for the rest of the pipeline.
    pub node_width: usize,
    /// Bit width of letters, fixed for the rest of the pipeline.
    pub sym_width: usize,
}

impl Vwaa {
    /// Number of states.
    #[must_use]
    pub fn state_count(&self) -> usize {
        self.labels.len()
    }

    /// Total number of transitions, the initial ones included.
    #[must_use]
    pub fn transition_count(&self) -> usize {
        self.transitions.iter().map(Vec::len).sum::<usize>() + self.initial.len()
    }

    /// Renders the automaton for the verbose trace output.
    #[must_use]
    pub fn dump(&self, symbols: &SymbolTable) -> String {
        let mut out = String::new();
        let mut init = String::new();
        for (i, t) in self.initial.iter().enumerate() {
            if i > 0 {
                init.push_str(", ");
            }
            init.push_str(&fmt_nodes(&t.to));
        }
        let _ = writeln!(out, "init: {init}");
        for (id, label) in self.labels.iter().enumerate() {
            let marker = if self.final_set.contains(id) {
                " (eventuality)"
            } else {
                ""
            };
            let _ = writeln!(out, "state {id}{marker}: {}", label.display(symbols));
            for t in &self.transitions[id] {
                let _ = writeln!(
                    out,
                    "  ({}) -> {}",
                    t.letter.display(symbols),
                    fmt_nodes(&t.to)
                );
            }
        }
        out
    }
}

/// Builds the very weak alternating automaton for a normalized formula.
///
/// States are created for the literal and temporal subformulas in
/// construction order; boolean connectives are expanded inline, both for
/// the initial transitions and under `X`. With on-the-fly simplification
/// enabled, dominated transitions are pruned from every transition set.
pub fn mk_alternating(root: &Formula, symbols: &SymbolTable, flags: &Flags) -> Vwaa {
    let started = Instant::now();
    let node_width = state_candidates(root).max(1);
    let sym_width = symbols.len();

    let mut builder = Builder {
        flags,
        node_width,
        sym_width,
        index: IndexMap::new(),
        transitions: Vec::new(),
        finals: Vec::new(),
    };
    let mut initial = builder.boolean(root);
    if flags.simp_fly {
        prune_dominated(&mut initial);
    }

    let mut final_set = FixedBitSet::with_capacity(node_width);
    for id in &builder.finals {
        final_set.insert(*id as usize);
    }
    let vwaa = Vwaa {
        labels: builder.index.into_keys().collect(),
        transitions: builder.transitions,
        initial,
        final_set,
        node_width,
        sym_width,
    };

    if flags.stats {
        tracing::info!(
            states = vwaa.state_count(),
            transitions = vwaa.transition_count(),
            elapsed = ?started.elapsed(),
            "built the alternating automaton"
        );
    }
    if flags.verbose {
        tracing::debug!(
            "very weak alternating automaton\n{}",
            vwaa.dump(symbols)
        );
    }
    vwaa
}

/// Upper bound on the number of states the builder can create.
fn state_candidates(f: &Formula) -> usize {
    match f {
        Formula::True | Formula::False => 0,
        Formula::Pred(_) | Formula::Not(_) => 1,
        Formula::Next(p) => 1 + state_candidates(p),
        Formula::Until(l, r) | Formula::Release(l, r) => {
            1 + state_candidates(l) + state_candidates(r)
        }
        Formula::And(l, r) | Formula::Or(l, r) => state_candidates(l) + state_candidates(r),
        Formula::Implies(_, _) | Formula::Equiv(_, _) => {
            unreachable!("alternating automaton built from an unnormalized formula")
        }
    }
}

struct Builder<'a> {
    flags: &'a Flags,
    node_width: usize,
    sym_width: usize,
    index: IndexMap<Formula, NodeId>,
    transitions: Vec<Vec<ATrans>>,
    finals: Vec<NodeId>,
}

impl Builder<'_> {
    /// Transitions of a boolean combination of state obligations: each
    /// resulting transition carries the empty letter and a target set
    /// covering the combination.
    fn boolean(&mut self, f: &Formula) -> Vec<ATrans> {
        match f {
            Formula::True => vec![ATrans::epsilon(self.sym_width, self.node_width)],
            Formula::False => Vec::new(),
            Formula::And(l, r) => {
                let left = self.boolean(l);
                let right = self.boolean(r);
                product(&left, &right)
            }
            Formula::Or(l, r) => {
                let mut out = self.boolean(l);
                out.extend(self.boolean(r));
                out
            }
            other => {
                let id = self.state(other);
                let mut t = ATrans::epsilon(self.sym_width, self.node_width);
                t.to.insert(id as usize);
                vec![t]
            }
        }
    }

    /// Outgoing transitions of `f` treated as a state-like subformula.
    fn trans_of(&mut self, f: &Formula) -> Vec<ATrans> {
        match f {
            Formula::True => vec![ATrans::epsilon(self.sym_width, self.node_width)],
            Formula::False => Vec::new(),
            Formula::And(l, r) => {
                let left = self.trans_of(l);
                let right = self.trans_of(r);
                product(&left, &right)
            }
            Formula::Or(l, r) => {
                let mut out = self.trans_of(l);
                out.extend(self.trans_of(r));
                out
            }
            other => {
                let id = self.state(other);
                self.transitions[id as usize].clone()
            }
        }
    }

    /// Index of the state for a literal or temporal subformula, creating
    /// it (and its transition set) on first sight.
    fn state(&mut self, f: &Formula) -> NodeId {
        if let Some(&id) = self.index.get(f) {
            return id;
        }
        match f {
            Formula::Pred(sym) => {
                let id = self.register(f);
                let trans = vec![ATrans {
                    letter: Letter::positive(self.sym_width, *sym),
                    to: FixedBitSet::with_capacity(self.node_width),
                }];
                self.install(id, trans);
                id
            }
            Formula::Not(inner) => {
                let Formula::Pred(sym) = **inner else {
                    unreachable!("negation not over a predicate after normalization")
                };
                let id = self.register(f);
                let trans = vec![ATrans {
                    letter: Letter::negative(self.sym_width, sym),
                    to: FixedBitSet::with_capacity(self.node_width),
                }];
                self.install(id, trans);
                id
            }
            Formula::Next(p) => {
                let trans = self.boolean(p);
                let id = self.register(f);
                self.install(id, trans);
                id
            }
            Formula::Until(l, r) => {
                // p U q = q || (p && X (p U q))
                let left = self.trans_of(l);
                let mut out = self.trans_of(r);
                let id = self.register(f);
                self.finals.push(id);
                for mut t in left {
                    t.to.insert(id as usize);
                    out.push(t);
                }
                self.install(id, out);
                id
            }
            Formula::Release(l, r) => {
                // p V q = (q && p) || (q && X (p V q))
                let left = self.trans_of(l);
                let right = self.trans_of(r);
                let id = self.register(f);
                let mut out = Vec::new();
                for t1 in &right {
                    for t2 in &left {
                        if let Some(t) = t1.conjoin(t2) {
                            out.push(t);
                        }
                    }
                    let mut keep = t1.clone();
                    keep.to.insert(id as usize);
                    out.push(keep);
                }
                self.install(id, out);
                id
            }
            Formula::True
            | Formula::False
            | Formula::And(_, _)
            | Formula::Or(_, _)
            | Formula::Implies(_, _)
            | Formula::Equiv(_, _) => {
                unreachable!("boolean connectives are expanded inline, never made states")
            }
        }
    }

    fn register(&mut self, f: &Formula) -> NodeId {
        let id = self.index.len() as NodeId;
        self.index.insert(f.clone(), id);
        self.transitions.push(Vec::new());
        id
    }

    fn install(&mut self, id: NodeId, mut trans: Vec<ATrans>) {
        if self.flags.simp_fly {
            prune_dominated(&mut trans);
        }
        self.transitions[id as usize] = trans;
    }
}

/// Pairwise combination of two transition sets; contradictions drop out.
fn product(left: &[ATrans], right: &[ATrans]) -> Vec<ATrans> {
    let mut out = Vec::new();
    for a in left {
        for b in right {
            if let Some(t) = a.conjoin(b) {
                out.push(t);
            }
        }
    }
    out
}

/// Removes every transition dominated by another of the same set: a
/// dominator has a covering letter and a subset of the targets.
fn prune_dominated(trans: &mut Vec<ATrans>) {
    let mut i = 0;
    while i < trans.len() {
        let dominated = trans.iter().enumerate().any(|(j, other)| {
            j != i && other.letter.covers(&trans[i].letter) && other.to.is_subset(&trans[i].to)
        });
        if dominated {
            trans.remove(i);
        } else {
            i += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::lexer::{self, SymbolTable};
    use crate::core::parser;

    fn build(input: &str) -> (Vwaa, SymbolTable) {
        let flags = Flags::default();
        let mut symbols = SymbolTable::new();
        let tokens = lexer::lex(input, &mut symbols).unwrap();
        let formula = parser::parse(&tokens, &flags).unwrap();
        let vwaa = mk_alternating(&formula, &symbols, &flags);
        (vwaa, symbols)
    }

    #[test]
    fn test_literal_state() {
        let (vwaa, _) = build("p");
        assert_eq!(vwaa.state_count(), 1);
        let trans = &vwaa.transitions[0];
        assert_eq!(trans.len(), 1);
        assert!(trans[0].letter.pos.contains(0));
        assert!(trans[0].to.is_clear(), "a literal discharges in one step");
        // the initial transition points at the literal state
        assert_eq!(vwaa.initial.len(), 1);
        assert!(vwaa.initial[0].to.contains(0));
    }

    #[test]
    fn test_until_self_loop_and_final_mark() {
        let (vwaa, _) = build("p U q");
        // states: p, q and the until itself
        assert_eq!(vwaa.state_count(), 3);
        let until_id = 2;
        assert!(
            vwaa.final_set.contains(until_id),
            "until states carry the acceptance mark"
        );
        let trans = &vwaa.transitions[until_id];
        assert!(
            trans.iter().any(|t| t.to.contains(until_id)),
            "the until state must loop on itself while waiting"
        );
        assert!(
            trans.iter().any(|t| t.to.is_clear()),
            "satisfying q discharges the obligation"
        );
    }

    #[test]
    fn test_release_keeps_no_final_mark() {
        let (vwaa, _) = build("[] p");
        assert!(vwaa.final_set.is_clear());
    }

    #[test]
    fn test_conjunction_merges_targets() {
        let (vwaa, _) = build("X (p && q)");
        // the next state steps into both literal states at once
        let next_id = vwaa.state_count() - 1;
        let trans = &vwaa.transitions[next_id];
        assert_eq!(trans.len(), 1);
        assert_eq!(trans[0].to.count_ones(..), 2);
    }

    #[test]
    fn test_contradictory_product_dropped() {
        // logic simplification off, so the contradiction survives parsing
        let flags = Flags {
            simp_log: false,
            ..Flags::default()
        };
        let mut symbols = SymbolTable::new();
        let tokens = lexer::lex("[] (p && !p)", &mut symbols).unwrap();
        let formula = parser::parse(&tokens, &flags).unwrap();
        let vwaa = mk_alternating(&formula, &symbols, &flags);
        // p && !p has no joint transition, so the release state is empty
        let release_id = vwaa.state_count() - 1;
        assert!(vwaa.transitions[release_id].is_empty());
    }

    #[test]
    fn test_dominance_pruning() {
        let mut trans = vec![
            ATrans::epsilon(2, 2),
            ATrans {
                letter: Letter::positive(2, 0),
                to: FixedBitSet::with_capacity(2),
            },
        ];
        prune_dominated(&mut trans);
        assert_eq!(trans.len(), 1, "the guarded transition is dominated");
        assert!(trans[0].letter.is_true());
    }
}
