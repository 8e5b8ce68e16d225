//! End-to-end scenarios: shapes and languages of the final automata.

mod common;

use common::{accepts, translate_default, translate_with};

fn word(instants: &[&[&'static str]]) -> Vec<Vec<&'static str>> {
    instants.iter().map(|names| names.to_vec()).collect()
}

#[test]
fn test_true_accepts_everything() {
    let t = translate_default("true");
    assert_eq!(t.buchi.state_count(), 1);
    assert!(t.buchi.is_accepting(t.buchi.init));
    assert!(accepts(&t, &[], &word(&[&[]])));
    assert!(accepts(&t, &[], &word(&[&["p"], &[]])));
}

#[test]
fn test_false_accepts_nothing() {
    let t = translate_default("false");
    assert!(t.buchi.state_count() <= 1);
    assert!(!accepts(&t, &[], &word(&[&[]])));
    assert!(!accepts(&t, &[], &word(&[&["p"]])));
}

#[test]
fn test_single_predicate() {
    let t = translate_default("p");
    assert_eq!(t.buchi.state_count(), 2);
    assert!(accepts(&t, &word(&[&["p"]]), &word(&[&[]])));
    assert!(accepts(&t, &[], &word(&[&["p"]])));
    assert!(
        !accepts(&t, &word(&[&[]]), &word(&[&["p"]])),
        "p must hold in the first instant"
    );
}

#[test]
fn test_always() {
    let t = translate_default("[] p");
    assert_eq!(t.buchi.state_count(), 1);
    let init = t.buchi.init;
    assert!(t.buchi.is_accepting(init));
    assert_eq!(t.buchi.states[init].trans.len(), 1);
    assert_eq!(t.buchi.states[init].trans[0].to, init);
    assert!(accepts(&t, &[], &word(&[&["p"]])));
    assert!(!accepts(&t, &word(&[&["p"], &["p"]]), &word(&[&[]])));
}

#[test]
fn test_eventually() {
    let t = translate_default("<> p");
    assert_eq!(t.buchi.state_count(), 2);
    assert!(accepts(&t, &word(&[&[], &[], &["p"]]), &word(&[&[]])));
    assert!(accepts(&t, &[], &word(&[&["p"]])));
    assert!(!accepts(&t, &[], &word(&[&[]])));
}

#[test]
fn test_until() {
    let t = translate_default("p U q");
    assert!(t.buchi.state_count() <= 3);
    assert!(accepts(&t, &[], &word(&[&["q"]])));
    assert!(accepts(&t, &word(&[&["p"], &["p"], &["q"]]), &word(&[&[]])));
    assert!(
        !accepts(&t, &[], &word(&[&["p"]])),
        "q must eventually arrive"
    );
    assert!(
        !accepts(&t, &word(&[&[]]), &word(&[&["q"]])),
        "p must hold until q does"
    );
}

#[test]
fn test_until_unsimplified_is_still_correct() {
    let t = translate_with("p U q", |flags| {
        flags.simp_post = false;
        flags.simp_fly = false;
        flags.simp_scc = false;
    });
    assert!(accepts(&t, &[], &word(&[&["q"]])));
    assert!(accepts(&t, &word(&[&["p"], &["q"]]), &word(&[&[]])));
    assert!(!accepts(&t, &[], &word(&[&["p"]])));
}

#[test]
fn test_negated_eventually_always_matches_always_eventually_not() {
    let a = translate_default("!(<> [] p)");
    let b = translate_default("[] <> !p");
    let battery: Vec<(Vec<Vec<&str>>, Vec<Vec<&str>>)> = vec![
        (vec![], word(&[&["p"]])),
        (vec![], word(&[&[]])),
        (vec![], word(&[&["p"], &[]])),
        (word(&[&[], &[]]), word(&[&["p"]])),
        (word(&[&["p"]]), word(&[&[], &["p"]])),
    ];
    for (prefix, cycle) in battery {
        assert_eq!(
            accepts(&a, &prefix, &cycle),
            accepts(&b, &prefix, &cycle),
            "languages must agree on {prefix:?} ({cycle:?})^w"
        );
    }
}

#[test]
fn test_release_holds_q_until_discharged() {
    let t = translate_default("p V q");
    // q forever satisfies the release
    assert!(accepts(&t, &[], &word(&[&["q"]])));
    // p and q together discharge it
    assert!(accepts(&t, &word(&[&["p", "q"]]), &word(&[&[]])));
    // q alone, then dropping q without p ever showing up, fails
    assert!(!accepts(&t, &word(&[&["q"]]), &word(&[&[]])));
}

#[test]
fn test_response_property() {
    let t = translate_default("[] (p -> <> q)");
    // every p is answered by a later q
    assert!(accepts(&t, &[], &word(&[&["p"], &["q"]])));
    // no p at all is fine
    assert!(accepts(&t, &[], &word(&[&[]])));
    // a p that is never answered is not
    assert!(!accepts(&t, &word(&[&["p"]]), &word(&[&[]])));
}

#[test]
fn test_layer_bound() {
    // the degeneralized automaton has at most |gba| * (marks + 1) states
    let t = translate_with("<> p && <> q && <> r", |flags| {
        flags.simp_post = false;
    });
    let accept = t.buchi.accept;
    assert_eq!(accept, 3);
    for s in t.buchi.states.iter().filter(|s| s.is_alive()) {
        assert!(s.layer <= accept);
    }
}
