use std::fmt::Write as _;
use std::time::Instant;

use fixedbitset::FixedBitSet;
use indexmap::IndexMap;

use crate::core::Flags;
use crate::core::generalized::Gba;
use crate::core::lexer::SymbolTable;
use crate::core::sets::Letter;

/// Lifecycle of a Büchi state in the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BStatus {
    /// Created but not yet expanded.
    Pending,
    /// Fully expanded.
    Solved,
    /// Tombstoned; `redirect` names the surviving representative, if any.
    Removed,
}

/// A transition of the Büchi automaton; acceptance lives on states.
#[derive(Debug, Clone)]
pub struct BTrans {
    /// Guard of the transition.
    pub letter: Letter,
    /// Arena index of the target state.
    pub to: usize,
}

/// A state of the Büchi automaton: a generalized state paired with the
/// layer counting how many acceptance marks are already satisfied.
#[derive(Debug, Clone)]
pub struct BState {
    /// Display id of the underlying generalized state; -1 for the
    /// distinguished initial state, 0 for the all-accepting sink.
    pub gid: i32,
    /// Arena index of the underlying generalized state, if any.
    pub gref: Option<usize>,
    /// Number of acceptance marks satisfied so far.
    pub layer: usize,
    /// In-degree during construction.
    pub incoming: u32,
    /// Outgoing transitions.
    pub trans: Vec<BTrans>,
    /// Arena lifecycle.
    pub status: BStatus,
    /// Surviving representative for removed states.
    pub redirect: Option<usize>,
}

impl BState {
    /// Whether the state still takes part in the automaton.
    #[must_use]
    pub fn is_alive(&self) -> bool {
        self.status != BStatus::Removed
    }
}

/// The degeneralized Büchi automaton handed to the serializers.
#[derive(Debug, Clone)]
pub struct Buchi {
    /// State arena; removed states stay as tombstones.
    pub states: Vec<BState>,
    /// Arena index of the initial state.
    pub init: usize,
    /// The accepting layer: the number of acceptance marks.
    pub accept: usize,
    /// Bit width of letters.
    pub sym_width: usize,
}

impl Buchi {
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

    /// Whether state `i` is accepting.
    #[must_use]
    pub fn is_accepting(&self, i: usize) -> bool {
        self.states[i].layer == self.accept
    }

    /// The printable label of state `i`, in the never-claim convention.
    #[must_use]
    pub fn name(&self, i: usize) -> String {
        let s = &self.states[i];
        let prefix = if s.layer == self.accept {
            "accept_".to_string()
        } else {
            format!("T{}_", s.layer)
        };
        let suffix = match s.gid {
            -1 => "init".to_string(),
            0 => "all".to_string(),
            id => format!("S{id}"),
        };
        format!("{prefix}{suffix}")
    }

    /// Live state indices, the initial state first.
    #[must_use]
    pub fn live_states(&self) -> Vec<usize> {
        let mut order = vec![self.init];
        for (i, s) in self.states.iter().enumerate() {
            if i != self.init && s.is_alive() {
                order.push(i);
            }
        }
        order
    }

    /// Renders the automaton for the verbose trace output.
    #[must_use]
    pub fn dump(&self, symbols: &SymbolTable) -> String {
        let mut out = String::new();
        for i in self.live_states() {
            let _ = writeln!(out, "state {}", self.name(i));
            for t in &self.states[i].trans {
                let _ = writeln!(
                    out,
                    "  ({}) -> {}",
                    t.letter.display(symbols),
                    self.name(t.to)
                );
            }
        }
        out
    }
}

/// Degeneralizes a generalized Büchi automaton.
///
/// States are pairs of a generalized state and a layer in `0..=F`, where
/// `F` is the number of acceptance marks. A transition advances the layer
/// past every mark it satisfies, in the fixed mark order; a state at
/// layer `F` is accepting and its outgoing transitions restart from
/// layer 0. A distinguished initial state unions the transitions of all
/// initial generalized states.
pub fn mk_buchi(gba: Gba, symbols: &SymbolTable, flags: &Flags) -> Buchi {
    let started = Instant::now();
    let accept = gba.final_nodes.len();
    let mut builder = BuchiBuilder {
        gba: &gba,
        flags,
        accept,
        states: Vec::new(),
        lookup: IndexMap::new(),
        pending: Vec::new(),
    };
    let buchi = builder.run();

    if flags.stats {
        tracing::info!(
            states = buchi.state_count(),
            transitions = buchi.transition_count(),
            elapsed = ?started.elapsed(),
            "built the Buchi automaton"
        );
    }
    if flags.verbose {
        tracing::debug!("Buchi automaton\n{}", buchi.dump(symbols));
    }
    buchi
}

struct BuchiBuilder<'a> {
    gba: &'a Gba,
    flags: &'a Flags,
    accept: usize,
    states: Vec<BState>,
    lookup: IndexMap<(usize, usize), usize>,
    pending: Vec<usize>,
}

impl BuchiBuilder<'_> {
    fn run(&mut self) -> Buchi {
        let gba = self.gba;
        // the distinguished initial state merges all initial transitions
        self.states.push(BState {
            gid: -1,
            gref: None,
            layer: 0,
            incoming: 1,
            trans: Vec::new(),
            status: BStatus::Solved,
            redirect: None,
        });
        let mut out = Vec::new();
        for &gi in &gba.init {
            for t in &gba.states[gi].trans {
                let layer = self.next_final(&t.fin, 0);
                self.add_trans(&mut out, t.letter.clone(), t.to, layer);
            }
        }
        self.states[0].trans = out;

        while let Some(i) = self.pending.pop() {
            if self.states[i].status != BStatus::Pending {
                continue;
            }
            if self.states[i].incoming == 0 {
                let key = (
                    self.states[i].gref.unwrap_or(usize::MAX),
                    self.states[i].layer,
                );
                self.lookup.swap_remove(&key);
                self.states[i].status = BStatus::Removed;
                continue;
            }
            self.make_btrans(i);
        }
        self.retarget_all();

        if self.flags.simp_post {
            self.simplify_btrans();
            while self.simplify_bstates() > 0 {
                self.simplify_btrans();
            }
        }

        Buchi {
            states: std::mem::take(&mut self.states),
            init: 0,
            accept: self.accept,
            sym_width: self.gba.sym_width,
        }
    }

    /// Advances the layer past every mark the transition satisfies.
    fn next_final(&self, fin: &FixedBitSet, mut layer: usize) -> usize {
        while layer < self.accept && fin.contains(self.gba.final_nodes[layer] as usize) {
            layer += 1;
        }
        layer
    }

    /// Expands one state from the transitions of its generalized state.
    fn make_btrans(&mut self, i: usize) {
        let gba = self.gba;
        let Some(g) = self.states[i].gref else {
            unreachable!("only the prebuilt initial state lacks a generalized state")
        };
        // accepting sources restart the mark scan from the beginning
        let base = if self.states[i].layer == self.accept {
            0
        } else {
            self.states[i].layer
        };

        let mut out = Vec::new();
        for t in &gba.states[g].trans {
            let layer = self.next_final(&t.fin, base);
            self.add_trans(&mut out, t.letter.clone(), t.to, layer);
        }

        if self.flags.simp_fly {
            if out.is_empty() {
                self.states[i].status = BStatus::Removed;
                self.states[i].redirect = None;
                return;
            }
            self.states[i].trans = out;
            let twin = (0..self.states.len()).find(|&j| {
                j != i && self.states[j].status == BStatus::Solved && self.all_btrans_match(i, j)
            });
            if let Some(j) = twin {
                let trans = std::mem::take(&mut self.states[i].trans);
                for t in &trans {
                    self.states[t.to].incoming -= 1;
                }
                self.states[i].status = BStatus::Removed;
                self.states[i].redirect = Some(j);
                return;
            }
            self.states[i].status = BStatus::Solved;
            return;
        }
        self.states[i].trans = out;
        self.states[i].status = BStatus::Solved;
    }

    /// Appends a candidate transition, pruning dominated siblings when
    /// on-the-fly simplification is enabled.
    fn add_trans(&mut self, out: &mut Vec<BTrans>, letter: Letter, gtarget: usize, layer: usize) {
        let to = self.find_or_create(gtarget, layer);
        if self.flags.simp_fly {
            let mut j = 0;
            while j < out.len() {
                if out[j].to == to && letter.covers(&out[j].letter) {
                    let old = out[j].to;
                    self.states[old].incoming -= 1;
                    out.remove(j);
                } else if out[j].to == to && out[j].letter.covers(&letter) {
                    // the candidate itself is dominated
                    return;
                } else {
                    j += 1;
                }
            }
        }
        self.states[to].incoming += 1;
        out.push(BTrans { letter, to });
    }

    fn find_or_create(&mut self, g: usize, layer: usize) -> usize {
        if let Some(&idx) = self.lookup.get(&(g, layer)) {
            return idx;
        }
        let idx = self.states.len();
        self.states.push(BState {
            gid: self.gba.states[g].id as i32,
            gref: Some(g),
            layer,
            incoming: 0,
            trans: Vec::new(),
            status: BStatus::Pending,
            redirect: None,
        });
        self.lookup.insert((g, layer), idx);
        self.pending.push(idx);
        idx
    }

    /// Are the states interchangeable? They must agree on acceptance and
    /// have matching transition sets in both directions.
    fn all_btrans_match(&self, a: usize, b: usize) -> bool {
        let accepting_a = self.states[a].layer == self.accept;
        let accepting_b = self.states[b].layer == self.accept;
        if accepting_a != accepting_b {
            return false;
        }
        let matches = |s: &BTrans, t: &BTrans| s.to == t.to && s.letter == t.letter;
        self.states[a]
            .trans
            .iter()
            .all(|s| self.states[b].trans.iter().any(|t| matches(s, t)))
            && self.states[b]
                .trans
                .iter()
                .all(|t| self.states[a].trans.iter().any(|s| matches(s, t)))
    }

    fn retarget_all(&mut self) {
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

    /// Drops transitions dominated by a sibling to the same target.
    fn simplify_btrans(&mut self) -> usize {
        let mut changed = 0;
        for i in 0..self.states.len() {
            if !self.states[i].is_alive() {
                continue;
            }
            let mut trans = std::mem::take(&mut self.states[i].trans);
            let mut j = 0;
            while j < trans.len() {
                let dominated = trans.iter().enumerate().any(|(k, other)| {
                    k != j && other.to == trans[j].to && other.letter.covers(&trans[j].letter)
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
        changed
    }

    /// Merges equivalent states and drops dead ones; the initial state
    /// always survives.
    fn simplify_bstates(&mut self) -> usize {
        let mut changed = 0;
        let n = self.states.len();
        for a in 0..n {
            if !self.states[a].is_alive() {
                continue;
            }
            if a != 0 && self.states[a].trans.is_empty() {
                self.states[a].status = BStatus::Removed;
                self.states[a].redirect = None;
                changed += 1;
                continue;
            }
            for b in (a + 1)..n {
                if !self.states[b].is_alive() {
                    continue;
                }
                if self.all_btrans_match(a, b) {
                    self.states[b].status = BStatus::Removed;
                    self.states[b].redirect = Some(a);
                    self.states[b].trans.clear();
                    changed += 1;
                    break;
                }
            }
        }
        self.retarget_all();
        changed
    }
}
