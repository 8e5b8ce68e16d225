use std::fmt::Write as _;
use std::time::Instant;

use fixedbitset::FixedBitSet;
use indexmap::IndexMap;
use itertools::Itertools;

use crate::core::Flags;
use crate::core::alternating::{ATrans, Vwaa};
use crate::core::lexer::SymbolTable;
use crate::core::sets::{Letter, NodeId, fmt_nodes, node_list};

/// Lifecycle of a generalized-Büchi state in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GStatus {
    /// Created but not yet expanded; sits on the work stack.
    Pending,
    /// Fully expanded.
    Solved,
    /// Tombstoned; `redirect` names the surviving representative, if any.
    Removed,
}

/// A transition of the generalized Büchi automaton, carrying the set of
/// acceptance marks it satisfies.
#[derive(Debug, Clone)]
pub struct GTrans {
    /// Guard of the transition.
    pub letter: Letter,
    /// Acceptance marks (over the eventuality nodes) this move witnesses.
    pub fin: FixedBitSet,
    /// Arena index of the target state.
    pub to: usize,
}

/// A state of the generalized Büchi automaton: a set of alternating
/// states that must all be satisfied.
#[derive(Debug, Clone)]
pub struct GState {
    /// Display id; 0 is reserved for the empty (all-accepting) state.
    pub id: u32,
    /// The set of alternating states this state stands for.
    pub nodes: FixedBitSet,
    /// In-degree during construction, SCC id after the SCC analysis.
    pub incoming: u32,
    /// Outgoing transitions.
    pub trans: Vec<GTrans>,
    /// Arena lifecycle.
    pub status: GStatus,
    /// Surviving representative for removed states.
    pub redirect: Option<usize>,
}

impl GState {
    /// Whether the state still takes part in the automaton.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.status != GStatus::Removed
    }
}

/// A generalized Büchi automaton with transition-based acceptance.
#[derive(Debug, Clone)]
pub struct Gba {
    /// State arena; removed states stay as tombstones.
    pub states: Vec<GState>,
    /// Arena indices of the initial states.
    pub init: Vec<usize>,
    /// The eventuality nodes in their fixed mark order.
    pub final_nodes: Vec<NodeId>,
    /// The same eventualities as a set.
    pub final_set: FixedBitSet,
    /// Bit width of node sets.
    pub node_width: usize,
    /// Bit width of letters.
    pub sym_width: usize,
}

impl Gba {
    /// Number of live states.
    #[must_use]
    pub fn state_count(&self) -> usize {
        self.states.iter().filter(|s| s.is_alive()).count()
    }

    /// Number of transitions of live states.
    #[must_use]
    pub fn transition_count(&self) -> usize {
        self.states
            .iter()
            .filter(|s| s.is_alive())
            .map(|s| s.trans.len())
            .sum()
    }

    /// Renders the automaton for the verbose trace output.
    #[must_use]
    pub fn dump(&self, symbols: &SymbolTable) -> String {
        let mut out = String::new();
        let init: Vec<String> = self
            .init
            .iter()
            .map(|&i| self.states[i].id.to_string())
            .collect();
        let _ = writeln!(out, "init: {}", init.join(", "));
        for s in self.states.iter().filter(|s| s.is_alive()) {
            let _ = writeln!(
                out,
                "state {} {} : {}",
                s.id,
                fmt_nodes(&s.nodes),
                s.incoming
            );
            for t in &s.trans {
                let _ = writeln!(
                    out,
                    "  ({}) -> {} : {}",
                    t.letter.display(symbols),
                    self.states[t.to].id,
                    fmt_nodes(&t.fin)
                );
            }
        }
        out
    }
}

/// Converts the alternating automaton into a generalized Büchi automaton
/// by an explicit powerset construction over node sets.
///
/// Each popped state takes the cartesian product of its members'
/// alternating transitions; surviving products receive the acceptance
/// marks they witness and, with on-the-fly simplification enabled, are
/// checked for dominance against the transitions already gathered.
/// A-posteriori simplification then interleaves SCC analysis, transition
/// pruning and state merging until a fixed point.
pub fn mk_generalized(vwaa: Vwaa, symbols: &SymbolTable, flags: &Flags) -> Gba {
    let started = Instant::now();
    let builder = GbaBuilder {
        vwaa: &vwaa,
        flags,
        states: Vec::new(),
        lookup: IndexMap::new(),
        pending: Vec::new(),
        init: Vec::new(),
        next_id: 1,
        final_nodes: node_list(&vwaa.final_set),
        bad_scc: None,
    };
    let gba = builder.run(symbols);
    if flags.stats {
        tracing::info!(
            states = gba.state_count(),
            transitions = gba.transition_count(),
            elapsed = ?started.elapsed(),
            "built the generalized Buchi automaton"
        );
    }
    gba
}

struct GbaBuilder<'a> {
    vwaa: &'a Vwaa,
    flags: &'a Flags,
    states: Vec<GState>,
    lookup: IndexMap<Vec<NodeId>, usize>,
    pending: Vec<usize>,
    init: Vec<usize>,
    next_id: u32,
    final_nodes: Vec<NodeId>,
    bad_scc: Option<FixedBitSet>,
}

impl GbaBuilder<'_> {
    fn run(mut self, symbols: &SymbolTable) -> Gba {
        for t in &self.vwaa.initial {
            let idx = self.find_or_create(&t.to);
            self.states[idx].incoming = 1;
            if !self.init.contains(&idx) {
                self.init.push(idx);
            }
        }

        while let Some(i) = self.pending.pop() {
            if self.states[i].status != GStatus::Pending {
                continue;
            }
            if self.states[i].incoming == 0 {
                // every reference was simplified away before expansion;
                // drop the state so an equal set can be rebuilt later
                let key = node_list(&self.states[i].nodes);
                self.lookup.swap_remove(&key);
                self.states[i].status = GStatus::Removed;
                continue;
            }
            self.make_gtrans(i);
        }
        self.retarget_all();

        if self.flags.verbose {
            tracing::debug!(
                "generalized Buchi automaton before simplification\n{}",
                self.snapshot().dump(symbols)
            );
        }

        if self.flags.simp_post {
            if self.flags.simp_scc {
                self.simplify_gscc();
            }
            self.simplify_gtrans();
            if self.flags.simp_scc {
                self.simplify_gscc();
            }
            while self.simplify_gstates() > 0 {
                if self.flags.simp_scc {
                    self.simplify_gscc();
                }
                self.simplify_gtrans();
                if self.flags.simp_scc {
                    self.simplify_gscc();
                }
            }
            if self.flags.verbose {
                tracing::debug!(
                    "generalized Buchi automaton after simplification\n{}",
                    self.snapshot().dump(symbols)
                );
            }
        }
        self.snapshot()
    }

    fn snapshot(&self) -> Gba {
        let mut final_set = FixedBitSet::with_capacity(self.vwaa.node_width);
        for &n in &self.final_nodes {
            final_set.insert(n as usize);
        }
        Gba {
            states: self.states.clone(),
            init: self.init.clone(),
            final_nodes: self.final_nodes.clone(),
            final_set,
            node_width: self.vwaa.node_width,
            sym_width: self.vwaa.sym_width,
        }
    }

    /// Expands one state: enumerate the product of its members'
    /// alternating transitions and turn the survivors into transitions.
    fn make_gtrans(&mut self, i: usize) {
        let vwaa = self.vwaa;
        let nodes = self.states[i].nodes.clone();
        let members = node_list(&nodes);

        // the empty state satisfies everything with a true self-loop
        let combined: Vec<ATrans> = if members.is_empty() {
            vec![ATrans::epsilon(vwaa.sym_width, vwaa.node_width)]
        } else {
            members
                .iter()
                .map(|&n| vwaa.transitions[n as usize].iter())
                .multi_cartesian_product()
                .filter_map(|tuple| {
                    let mut parts = tuple.into_iter();
                    let first = parts.next()?.clone();
                    parts.try_fold(first, |acc, t| acc.conjoin(t))
                })
                .collect()
        };

        let mut out: Vec<GTrans> = Vec::new();
        for prod in combined {
            let mut fin = FixedBitSet::with_capacity(vwaa.node_width);
            for k in 0..self.final_nodes.len() {
                let mark = self.final_nodes[k];
                if self.is_final(&nodes, &prod, mark) {
                    fin.insert(mark as usize);
                }
            }

            let mut redundant = false;
            if self.flags.simp_fly {
                let mut j = 0;
                while j < out.len() {
                    let existing_nodes = &self.states[out[j].to].nodes;
                    if prod.to.is_subset(existing_nodes)
                        && prod.letter.covers(&out[j].letter)
                        && fin == out[j].fin
                    {
                        // the new transition dominates the gathered one
                        let to = out[j].to;
                        self.states[to].incoming -= 1;
                        out.remove(j);
                    } else if existing_nodes.is_subset(&prod.to)
                        && out[j].letter.covers(&prod.letter)
                        && out[j].fin == fin
                    {
                        redundant = true;
                        break;
                    } else {
                        j += 1;
                    }
                }
            }
            if redundant {
                continue;
            }
            let to = self.find_or_create(&prod.to);
            self.states[to].incoming += 1;
            out.push(GTrans {
                letter: prod.letter,
                fin,
                to,
            });
        }

        if self.flags.simp_fly {
            if out.is_empty() {
                self.states[i].status = GStatus::Removed;
                self.states[i].redirect = None;
                return;
            }
            self.states[i].trans = out;
            let twin = (0..self.states.len()).find(|&j| {
                j != i
                    && self.states[j].status == GStatus::Solved
                    && self.all_gtrans_match(i, j, false)
            });
            if let Some(j) = twin {
                let trans = std::mem::take(&mut self.states[i].trans);
                for t in &trans {
                    self.states[t.to].incoming -= 1;
                }
                self.states[i].status = GStatus::Removed;
                self.states[i].redirect = Some(j);
                return;
            }
            self.states[i].status = GStatus::Solved;
            return;
        }
        self.states[i].trans = out;
        self.states[i].status = GStatus::Solved;
    }

    /// Does the product transition `t` out of the node set `from`
    /// witness the eventuality `mark`?
    ///
    /// It does when the eventuality is not pending at all (on the source
    /// state by default, on the target under the alternative policy), or
    /// when some transition of the eventuality node is covered by the
    /// product without re-entering the node.
    fn is_final(&self, from: &FixedBitSet, t: &ATrans, mark: NodeId) -> bool {
        let idx = mark as usize;
        if (self.flags.fin_on_target && !t.to.contains(idx))
            || (!self.flags.fin_on_target && !from.contains(idx))
        {
            return true;
        }
        let mut rest = t.to.clone();
        rest.set(idx, false);
        self.vwaa.transitions[idx]
            .iter()
            .any(|w| w.to.is_subset(&rest) && w.letter.covers(&t.letter))
    }

    /// Finds the state for a node set among the pending, solved and
    /// removed states, or creates it and puts it on the work stack.
    fn find_or_create(&mut self, to: &FixedBitSet) -> usize {
        let key = node_list(to);
        if let Some(&idx) = self.lookup.get(&key) {
            return idx;
        }
        let id = if to.is_clear() {
            0
        } else {
            let id = self.next_id;
            self.next_id += 1;
            id
        };
        let idx = self.states.len();
        self.states.push(GState {
            id,
            nodes: to.clone(),
            incoming: 0,
            trans: Vec::new(),
            status: GStatus::Pending,
            redirect: None,
        });
        self.lookup.insert(key, idx);
        self.pending.push(idx);
        idx
    }

    /// Are two transitions interchangeable, possibly ignoring acceptance
    /// marks when the SCC structure makes them immaterial?
    fn same_gtrans(&self, a: usize, s: &GTrans, b: usize, t: &GTrans, use_scc: bool) -> bool {
        if s.to != t.to || s.letter != t.letter {
            return false;
        }
        if s.fin == t.fin {
            return true;
        }
        if use_scc {
            if let Some(bad) = &self.bad_scc {
                let scc_a = self.states[a].incoming as usize;
                let scc_b = self.states[b].incoming as usize;
                if bad.contains(scc_a)
                    || bad.contains(scc_b)
                    || scc_a != self.states[s.to].incoming as usize
                    || scc_b != self.states[t.to].incoming as usize
                {
                    return true;
                }
            }
        }
        false
    }

    /// Do `a` and `b` have matching transition sets in both directions?
    fn all_gtrans_match(&self, a: usize, b: usize, use_scc: bool) -> bool {
        self.states[a].trans.iter().all(|s| {
            self.states[b]
                .trans
                .iter()
                .any(|t| self.same_gtrans(a, s, b, t, use_scc))
        }) && self.states[b].trans.iter().all(|t| {
            self.states[a]
                .trans
                .iter()
                .any(|s| self.same_gtrans(a, s, b, t, use_scc))
        })
    }

    /// Redirects transitions and initial entries that point at removed
    /// states; targets without a surviving representative are deleted.
    fn retarget_all(&mut self) {
        let mut init = Vec::new();
        for k in 0..self.init.len() {
            if let Some(j) = self.resolve(self.init[k]) {
                if !init.contains(&j) {
                    init.push(j);
                }
            }
        }
        self.init = init;

        for i in 0..self.states.len() {
            if !self.states[i].is_alive() {
                continue;
            }
            let mut trans = std::mem::take(&mut self.states[i].trans);
            let mut j = 0;
            while j < trans.len() {
                let target = trans[j].to;
                if self.states[target].is_alive() {
                    j += 1;
                } else {
                    match self.resolve(target) {
                        Some(k) => {
                            trans[j].to = k;
                            j += 1;
                        }
                        None => {
                            trans.remove(j);
                        }
                    }
                }
            }
            self.states[i].trans = trans;
        }
    }

    /// Follows redirect links to the surviving representative.
    fn resolve(&self, mut i: usize) -> Option<usize> {
        loop {
            if self.states[i].is_alive() {
                return Some(i);
            }
            match self.states[i].redirect {
                Some(j) => i = j,
                None => return None,
            }
        }
    }

    fn remove_state(&mut self, i: usize, redirect: Option<usize>) {
        self.states[i].status = GStatus::Removed;
        self.states[i].redirect = redirect;
        self.states[i].trans.clear();
    }

    /// Tarjan's SCC analysis over the live states, recording each SCC id
    /// in the `incoming` field and recomputing the bad-SCC set: an SCC is
    /// bad when its internal transitions do not cover every acceptance
    /// mark.
    fn simplify_gscc(&mut self) {
        for s in &mut self.states {
            if s.is_alive() {
                s.incoming = 0;
            }
        }
        let mut rank = 1;
        let mut scc_id = 1;
        let mut stack: Vec<(usize, u32)> = Vec::new();
        let init = self.init.clone();
        for i in init {
            if self.states[i].is_alive() && self.states[i].incoming == 0 {
                self.gdfs(i, &mut rank, &mut scc_id, &mut stack);
            }
        }

        let scc_count = scc_id as usize;
        let mut scc_final = vec![FixedBitSet::with_capacity(self.vwaa.node_width); scc_count];
        for i in 0..self.states.len() {
            if !self.states[i].is_alive() {
                continue;
            }
            if self.states[i].incoming == 0 {
                // not reached from any initial state
                self.remove_state(i, None);
                continue;
            }
            let scc = self.states[i].incoming as usize;
            for t in &self.states[i].trans {
                if self.states[t.to].incoming == self.states[i].incoming {
                    scc_final[scc].union_with(&t.fin);
                }
            }
        }

        let mut bad = FixedBitSet::with_capacity(scc_count + 1);
        for (c, covered) in scc_final.iter().enumerate().skip(1) {
            if !self.vwaa.final_set.is_subset(covered) {
                bad.insert(c);
            }
        }
        self.bad_scc = Some(bad);
    }

    fn gdfs(
        &mut self,
        i: usize,
        rank: &mut u32,
        scc_id: &mut u32,
        stack: &mut Vec<(usize, u32)>,
    ) -> u32 {
        let my_rank = *rank;
        *rank += 1;
        let mut theta = my_rank;
        let pos = stack.len();
        stack.push((i, my_rank));
        self.states[i].incoming = 1;

        let targets: Vec<usize> = self.states[i].trans.iter().map(|t| t.to).collect();
        for to in targets {
            if self.states[to].incoming == 0 {
                let sub = self.gdfs(to, rank, scc_id, stack);
                theta = theta.min(sub);
            } else if let Some(&(_, r)) = stack.iter().find(|&&(j, _)| j == to) {
                theta = theta.min(r);
            }
        }

        if theta == my_rank {
            for (j, _) in stack.drain(pos..) {
                self.states[j].incoming = *scc_id;
            }
            *scc_id += 1;
        }
        theta
    }

    /// Drops transitions dominated by a sibling to the same target; the
    /// acceptance-mark condition is waived across SCC boundaries and in
    /// bad SCCs.
    fn simplify_gtrans(&mut self) -> usize {
        let started = Instant::now();
        let mut changed = 0;
        for i in 0..self.states.len() {
            if !self.states[i].is_alive() {
                continue;
            }
            let mut trans = std::mem::take(&mut self.states[i].trans);
            let mut j = 0;
            while j < trans.len() {
                let relax = self.flags.simp_scc
                    && match &self.bad_scc {
                        Some(bad) => {
                            let scc = self.states[i].incoming as usize;
                            scc != self.states[trans[j].to].incoming as usize
                                || bad.contains(scc)
                        }
                        None => false,
                    };
                let dominated = trans.iter().enumerate().any(|(k, other)| {
                    k != j
                        && other.to == trans[j].to
                        && other.letter.covers(&trans[j].letter)
                        && (relax || trans[j].fin.is_subset(&other.fin))
                });
                if dominated {
                    trans.remove(j);
                    changed += 1;
                } else {
                    j += 1;
                }
            }
            self.states[i].trans = trans;
        }
        if self.flags.stats {
            tracing::info!(
                removed = changed,
                elapsed = ?started.elapsed(),
                "simplified generalized transitions"
            );
        }
        changed
    }

    /// Merges equivalent states and drops states without transitions,
    /// then repairs every reference.
    fn simplify_gstates(&mut self) -> usize {
        let started = Instant::now();
        let mut changed = 0;
        let n = self.states.len();
        let use_scc = self.flags.simp_scc && self.bad_scc.is_some();
        for a in 0..n {
            if !self.states[a].is_alive() {
                continue;
            }
            if self.states[a].trans.is_empty() {
                self.remove_state(a, None);
                changed += 1;
                continue;
            }
            for b in (a + 1)..n {
                if !self.states[b].is_alive() {
                    continue;
                }
                if self.all_gtrans_match(a, b, use_scc) {
                    // a trivial SCC never blocks the merge direction
                    if self.states[a].incoming > self.states[b].incoming {
                        self.remove_state(a, Some(b));
                    } else {
                        self.remove_state(b, Some(a));
                    }
                    changed += 1;
                    break;
                }
            }
        }
        self.retarget_all();
        if self.flags.stats {
            tracing::info!(
                removed = changed,
                elapsed = ?started.elapsed(),
                "simplified generalized states"
            );
        }
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::alternating::mk_alternating;
    use crate::core::lexer::{self, SymbolTable};
    use crate::core::parser;

    fn build(input: &str, flags: &Flags) -> (Gba, SymbolTable) {
        let mut symbols = SymbolTable::new();
        let tokens = lexer::lex(input, &mut symbols).unwrap();
        let formula = parser::parse(&tokens, flags).unwrap();
        let vwaa = mk_alternating(&formula, &symbols, flags);
        let gba = mk_generalized(vwaa, &symbols, flags);
        (gba, symbols)
    }

    #[test]
    fn test_true_gives_single_empty_state() {
        let (gba, _) = build("true", &Flags::default());
        assert_eq!(gba.state_count(), 1);
        let s = gba.states.iter().find(|s| s.is_alive()).unwrap();
        assert_eq!(s.id, 0, "the empty node set keeps display id 0");
        assert_eq!(s.trans.len(), 1);
        assert!(s.trans[0].letter.is_true());
        assert_eq!(s.trans[0].to, gba.init[0]);
    }

    #[test]
    fn test_false_gives_no_states() {
        let (gba, _) = build("false", &Flags::default());
        assert!(gba.init.is_empty());
        assert_eq!(gba.state_count(), 0);
    }

    #[test]
    fn test_until_marks_satisfying_transition() {
        let (gba, _) = build("p U q", &Flags::default());
        // the until state loops without the mark and exits with it
        let init = gba.init[0];
        let s = &gba.states[init];
        assert!(s.is_alive());
        let exit = s
            .trans
            .iter()
            .find(|t| gba.states[t.to].id == 0)
            .expect("transition into the accepting sink");
        assert!(
            exit.fin.count_ones(..) == gba.final_nodes.len(),
            "discharging q witnesses the eventuality"
        );
        let wait = s
            .trans
            .iter()
            .find(|t| t.to == init)
            .expect("self-loop while waiting for q");
        assert!(wait.fin.is_clear(), "waiting does not witness anything");
    }

    #[test]
    fn test_always_has_no_marks_and_self_loop() {
        let (gba, _) = build("[] p", &Flags::default());
        assert!(gba.final_nodes.is_empty());
        assert_eq!(gba.state_count(), 1);
        let init = gba.init[0];
        let s = &gba.states[init];
        assert_eq!(s.trans.len(), 1);
        assert_eq!(s.trans[0].to, init);
        assert!(s.trans[0].letter.pos.contains(0));
    }

    #[test]
    fn test_scc_ids_assigned_to_live_states() {
        let (gba, _) = build("<> p && <> q", &Flags::default());
        for s in gba.states.iter().filter(|s| s.is_alive()) {
            assert!(s.incoming > 0, "every live state sits in some SCC");
        }
    }

    #[test]
    fn test_no_dominated_transition_survives() {
        let (gba, _) = build("<> p || <> q", &Flags::default());
        for s in gba.states.iter().filter(|s| s.is_alive()) {
            for (j, t) in s.trans.iter().enumerate() {
                let dominated = s.trans.iter().enumerate().any(|(k, other)| {
                    k != j
                        && other.to == t.to
                        && other.letter.covers(&t.letter)
                        && t.fin.is_subset(&other.fin)
                });
                assert!(!dominated, "dominated transition left in place");
            }
        }
    }
}
