//! Each simplification switch may change the size of the automaton but
//! never its language: every variant is compared to the fully simplified
//! run over a battery of ultimately periodic words.

mod common;

use common::{accepts, translate_default, translate_with};
use ltl2buchi::core::Flags;

const FORMULAS: &[&str] = &[
    "p",
    "p U q",
    "p V q",
    "[] p",
    "<> p",
    "[] <> p",
    "<> [] p",
    "p U (q U r)",
    "[] (p -> <> q)",
    "!(p <-> q)",
    "<> p && [] q",
    "X p || X X q",
];

/// Every subset of {p, q, r} that the battery uses as one instant.
const INSTANTS: &[&[&str]] = &[
    &[],
    &["p"],
    &["q"],
    &["r"],
    &["p", "q"],
    &["p", "r"],
    &["q", "r"],
    &["p", "q", "r"],
];

/// A modest zoo of lassos: every single-instant cycle, every ordered
/// pair as a two-instant cycle, and each of those behind a one-instant
/// prefix.
fn battery() -> Vec<(Vec<Vec<&'static str>>, Vec<Vec<&'static str>>)> {
    let mut words = Vec::new();
    for &a in INSTANTS {
        words.push((vec![], vec![a.to_vec()]));
        for &b in INSTANTS {
            words.push((vec![], vec![a.to_vec(), b.to_vec()]));
            words.push((vec![a.to_vec()], vec![b.to_vec()]));
        }
    }
    words
}

fn assert_same_language(formula: &str, adjust: fn(&mut Flags), what: &str) {
    let reference = translate_default(formula);
    let variant = translate_with(formula, adjust);
    for (prefix, cycle) in battery() {
        assert_eq!(
            accepts(&reference, &prefix, &cycle),
            accepts(&variant, &prefix, &cycle),
            "{what} changed the language of {formula} on {prefix:?} ({cycle:?})^w"
        );
    }
}

#[test]
fn test_no_logic_simplification_preserves_language() {
    for formula in FORMULAS {
        assert_same_language(formula, |f| f.simp_log = false, "-l");
    }
}

#[test]
fn test_no_posteriori_simplification_preserves_language() {
    for formula in FORMULAS {
        assert_same_language(formula, |f| f.simp_post = false, "-p");
    }
}

#[test]
fn test_no_on_the_fly_simplification_preserves_language() {
    for formula in FORMULAS {
        assert_same_language(formula, |f| f.simp_fly = false, "-o");
    }
}

#[test]
fn test_no_scc_simplification_preserves_language() {
    for formula in FORMULAS {
        assert_same_language(formula, |f| f.simp_scc = false, "-c");
    }
}

#[test]
fn test_alternative_acceptance_policy_preserves_language() {
    for formula in FORMULAS {
        assert_same_language(formula, |f| f.fin_on_target = true, "-a");
    }
}

#[test]
fn test_everything_off_preserves_language() {
    for formula in FORMULAS {
        assert_same_language(
            formula,
            |f| {
                f.simp_log = false;
                f.simp_post = false;
                f.simp_fly = false;
                f.simp_scc = false;
            },
            "all switches off",
        );
    }
}

#[test]
fn test_simplification_never_grows_the_automaton() {
    for formula in FORMULAS {
        let simplified = translate_default(formula);
        let bare = translate_with(formula, |f| {
            f.simp_post = false;
            f.simp_fly = false;
        });
        assert!(
            simplified.buchi.state_count() <= bare.buchi.state_count(),
            "simplification grew {formula}: {} > {}",
            simplified.buchi.state_count(),
            bare.buchi.state_count()
        );
    }
}
