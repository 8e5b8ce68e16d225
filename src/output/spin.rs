use std::fmt::Write as _;

use crate::core::buchi::Buchi;
use crate::core::lexer::SymbolTable;

/// Renders the automaton as a Spin never claim.
///
/// States become labelled if/fi blocks; the all-accepting sink becomes
/// `skip` and a state without transitions becomes `false`, so claims for
/// unsatisfiable formulas stay valid Promela.
#[must_use]
pub fn render(buchi: &Buchi, symbols: &SymbolTable, formula: &str) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "never {{ /* {formula} */");
    for i in buchi.live_states() {
        let state = &buchi.states[i];
        let _ = writeln!(out, "{}:", buchi.name(i));
        if state.trans.is_empty() {
            out.push_str("\tfalse;\n");
            continue;
        }
        let skippable = buchi.is_accepting(i)
            && state.trans.len() == 1
            && state.trans[0].to == i
            && state.trans[0].letter.is_true();
        if skippable {
            out.push_str("\tskip\n");
            continue;
        }
        out.push_str("\tif\n");
        for t in &state.trans {
            let _ = writeln!(
                out,
                "\t:: ({}) -> goto {}",
                t.letter.display(symbols),
                buchi.name(t.to)
            );
        }
        out.push_str("\tfi;\n");
    }
    out.push_str("}\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Flags, translate};

    #[test]
    fn test_never_claim_shape() {
        let t = translate("p U q", &Flags::default()).unwrap();
        let claim = render(&t.buchi, &t.symbols, "p U q");
        assert!(claim.starts_with("never { /* p U q */"));
        assert!(claim.contains("T0_init:"));
        assert!(claim.contains("goto accept_all"));
        assert!(claim.contains("\tskip\n"));
        assert!(claim.trim_end().ends_with('}'));
    }

    #[test]
    fn test_unsatisfiable_formula_renders_false() {
        let t = translate("false", &Flags::default()).unwrap();
        let claim = render(&t.buchi, &t.symbols, "false");
        assert!(claim.contains("\tfalse;\n"));
    }

    #[test]
    fn test_true_letter_prints_as_one() {
        let t = translate("<> p", &Flags::default()).unwrap();
        let claim = render(&t.buchi, &t.symbols, "<> p");
        assert!(claim.contains(":: (1) -> goto"));
    }
}
