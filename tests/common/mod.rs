//! Shared helpers: building translations and checking acceptance of
//! ultimately periodic words, so tests can compare automata by language.

use fixedbitset::FixedBitSet;

use ltl2buchi::core::sets::Letter;
use ltl2buchi::core::{Flags, Translation, translate};

/// Translates with the default (fully simplifying) flags.
pub fn translate_default(input: &str) -> Translation {
    translate(input, &Flags::default()).expect("formula must translate")
}

/// Translates after letting the caller adjust the flags.
pub fn translate_with(input: &str, adjust: impl FnOnce(&mut Flags)) -> Translation {
    let mut flags = Flags::default();
    adjust(&mut flags);
    translate(input, &flags).expect("formula must translate")
}

/// Does the automaton accept the ultimately periodic word `prefix`
/// followed by `cycle` repeated forever?
///
/// Each instant is the set of propositions that hold; names the formula
/// never mentions are ignored. Acceptance is decided on the product of
/// the automaton with the lasso: the word is accepted iff some accepting
/// product node inside the cyclic part lies on a reachable cycle.
pub fn accepts(t: &Translation, prefix: &[Vec<&str>], cycle: &[Vec<&str>]) -> bool {
    assert!(!cycle.is_empty(), "a lasso needs a non-empty cycle");
    let ba = &t.buchi;
    let word: Vec<FixedBitSet> = prefix
        .iter()
        .chain(cycle.iter())
        .map(|names| props_set(t, names))
        .collect();
    let total = word.len();
    let loop_start = prefix.len();
    let next_pos = |k: usize| if k + 1 == total { loop_start } else { k + 1 };

    let n = ba.states.len();
    let node = |s: usize, k: usize| s * total + k;
    let mut edges: Vec<Vec<usize>> = vec![Vec::new(); n * total];
    let mut reachable = vec![false; n * total];
    reachable[node(ba.init, 0)] = true;
    let mut stack = vec![(ba.init, 0usize)];
    while let Some((s, k)) = stack.pop() {
        for tr in &ba.states[s].trans {
            if satisfied(&tr.letter, &word[k]) {
                let dest = node(tr.to, next_pos(k));
                edges[node(s, k)].push(dest);
                if !reachable[dest] {
                    reachable[dest] = true;
                    stack.push((tr.to, next_pos(k)));
                }
            }
        }
    }

    for s in 0..n {
        if !ba.states[s].is_alive() || !ba.is_accepting(s) {
            continue;
        }
        for k in loop_start..total {
            let v = node(s, k);
            if reachable[v] && can_reach(&edges, v, v) {
                return true;
            }
        }
    }
    false
}

fn props_set(t: &Translation, names: &[&str]) -> FixedBitSet {
    let mut set = FixedBitSet::with_capacity(t.buchi.sym_width);
    for name in names {
        if let Some(idx) = t.symbols.iter().position(|n| n == *name) {
            set.insert(idx);
        }
    }
    set
}

fn satisfied(letter: &Letter, props: &FixedBitSet) -> bool {
    letter.pos.is_subset(props) && letter.neg.is_disjoint(props)
}

fn can_reach(edges: &[Vec<usize>], from: usize, to: usize) -> bool {
    let mut seen = vec![false; edges.len()];
    let mut stack = vec![from];
    while let Some(v) = stack.pop() {
        for &w in &edges[v] {
            if w == to {
                return true;
            }
            if !seen[w] {
                seen[w] = true;
                stack.push(w);
            }
        }
    }
    false
}
