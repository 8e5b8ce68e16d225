//! Algebraic rewriting of formulas: negation pushing, the simplification
//! rules applied during parsing, and canonical ordering of commutative
//! chains.
//!
//! All functions take formulas by value and return the rewritten tree;
//! rules are applied bottom-up because the parser invokes [`simpler`] (or
//! [`minimal`]) on every node as it is built.

use crate::core::ast::Formula;

/// Syntactic implication: a sound, incomplete check that `a` entails `b`.
///
/// Used by the simplification rules for subsumption and contradiction
/// detection. The recursion mirrors the structure of the connectives:
/// conjunction and release on the right require both operands, disjunction
/// and until on the left require both operands, and so on.
pub fn implies(a: &Formula, b: &Formula) -> bool {
    use Formula::*;
    if a == b || *b == True || *a == False {
        return true;
    }
    if let And(bl, br) = b {
        if implies(a, bl) && implies(a, br) {
            return true;
        }
    }
    if let Or(al, ar) = a {
        if implies(al, b) && implies(ar, b) {
            return true;
        }
    }
    if let And(al, ar) = a {
        if implies(al, b) || implies(ar, b) {
            return true;
        }
    }
    if let Or(bl, br) = b {
        if implies(a, bl) || implies(a, br) {
            return true;
        }
    }
    if let Until(_, br) = b {
        if implies(a, br) {
            return true;
        }
    }
    if let Release(_, ar) = a {
        if implies(ar, b) {
            return true;
        }
    }
    if let Until(al, ar) = a {
        if implies(al, b) && implies(ar, b) {
            return true;
        }
    }
    if let Release(bl, br) = b {
        if implies(a, bl) && implies(a, br) {
            return true;
        }
    }
    match (a, b) {
        (Until(al, ar), Until(bl, br)) | (Release(al, ar), Release(bl, br)) => {
            implies(al, bl) && implies(ar, br)
        }
        _ => false,
    }
}

/// Pushes the top-level negation of `f` downward until it sits on a
/// predicate, using the U/V and And/Or dualities.
///
/// `f` must be a `Not` node; the parser guarantees this at the only call
/// sites.
pub fn push_negation(f: Formula, simp_log: bool) -> Formula {
    let Formula::Not(inner) = f else {
        unreachable!("push_negation requires a negation at the root");
    };
    let pushed = match *inner {
        Formula::True => Formula::False,
        Formula::False => Formula::True,
        Formula::Not(p) => *p,
        Formula::Pred(id) => Formula::not(Formula::Pred(id)),
        Formula::Release(l, r) => Formula::until(negate(*l, simp_log), negate(*r, simp_log)),
        Formula::Until(l, r) => Formula::release(negate(*l, simp_log), negate(*r, simp_log)),
        Formula::Next(p) => Formula::next(negate(*p, simp_log)),
        Formula::And(l, r) => Formula::or(negate(*l, simp_log), negate(*r, simp_log)),
        Formula::Or(l, r) => Formula::and(negate(*l, simp_log), negate(*r, simp_log)),
        Formula::Implies(_, _) | Formula::Equiv(_, _) => {
            unreachable!("negation pushed through an unexpanded connective")
        }
    };
    rewrite(pushed, simp_log)
}

/// The negation of `f` in negation normal form.
pub fn negate(f: Formula, simp_log: bool) -> Formula {
    push_negation(Formula::not(f), simp_log)
}

/// Canonical form of a freshly built node: right-link the And/Or spines,
/// then order and absorb the top-level commutative chain.
pub fn rewrite(f: Formula, simp_log: bool) -> Formula {
    if simp_log {
        canonical_chain(right_linked(f))
    } else {
        f
    }
}

/// Minimal rewriting used when logic simplification is disabled: only the
/// derived connectives are expanded.
pub fn minimal(f: Formula) -> Formula {
    match f {
        Formula::Implies(l, r) => Formula::or(negate(*l, false), *r),
        Formula::Equiv(l, r) => Formula::or(
            Formula::and((*l).clone(), (*r).clone()),
            Formula::and(negate(*l, false), negate(*r, false)),
        ),
        other => other,
    }
}

/// Applies the logic-simplification rules to a freshly built node.
pub fn simpler(f: Formula) -> Formula {
    match f {
        Formula::Until(l, r) => simpler_until(*l, *r),
        Formula::Release(l, r) => simpler_release(*l, *r),
        Formula::Next(p) => simpler_next(*p),
        Formula::Implies(l, r) => simpler_implies(*l, *r),
        Formula::Equiv(l, r) => simpler_equiv(*l, *r),
        Formula::And(l, r) => simpler_and(*l, *r),
        Formula::Or(l, r) => simpler_or(*l, *r),
        other => other,
    }
}

/// The operand of `[]<>p`, if `f` has that shape.
fn always_eventually_operand(f: &Formula) -> Option<&Formula> {
    if let Formula::Release(l, r) = f {
        if **l == Formula::False {
            if let Formula::Until(il, ir) = &**r {
                if **il == Formula::True {
                    return Some(ir);
                }
            }
        }
    }
    None
}

/// The operand of `<>[]p`, if `f` has that shape.
fn eventually_always_operand(f: &Formula) -> Option<&Formula> {
    if let Formula::Until(l, r) = f {
        if **l == Formula::True {
            if let Formula::Release(il, ir) = &**r {
                if **il == Formula::False {
                    return Some(ir);
                }
            }
        }
    }
    None
}

fn simpler_until(l: Formula, r: Formula) -> Formula {
    // p U true = true, p U false = false, false U q = q, and q absorbs
    // the whole formula whenever p entails it
    if matches!(r, Formula::True | Formula::False) || l == Formula::False || implies(&l, &r) {
        return r;
    }
    // (p U q) U p = q U p
    if let Formula::Until(ll, lr) = &l {
        if **ll == r {
            return Formula::until((**lr).clone(), r);
        }
    }
    // p U (q U r) = q U r when p entails q
    if let Formula::Until(rl, _) = &r {
        if implies(&l, rl) {
            return r;
        }
    }
    // X p U X q = X (p U q)
    if let (Formula::Next(li), Formula::Next(ri)) = (&l, &r) {
        return Formula::next(Formula::until((**li).clone(), (**ri).clone()));
    }
    if l == Formula::True {
        // <> X p = X <> p
        if let Formula::Next(ri) = &r {
            return Formula::next(Formula::until(Formula::True, (**ri).clone()));
        }
        // <> [] <> p = [] <> p
        if always_eventually_operand(&r).is_some() {
            return r;
        }
    }
    // when !q entails p the left operand never blocks the wait for q
    if l != Formula::True && implies(&negate(r.clone(), true), &l) {
        return Formula::until(Formula::True, r);
    }
    Formula::until(l, r)
}

fn simpler_release(l: Formula, r: Formula) -> Formula {
    if matches!(r, Formula::True | Formula::False) || l == Formula::True || implies(&r, &l) {
        return r;
    }
    if l == Formula::False {
        // [] (p V q) = [] q
        if let Formula::Release(_, rr) = &r {
            return Formula::release(Formula::False, (**rr).clone());
        }
        // [] X p = X [] p
        if let Formula::Next(ri) = &r {
            return Formula::next(Formula::release(Formula::False, (**ri).clone()));
        }
        // [] <> [] p = <> [] p
        if eventually_always_operand(&r).is_some() {
            return r;
        }
    }
    if let Formula::Release(rl, _) = &r {
        if implies(rl, &l) {
            return r;
        }
    }
    // when p entails !q the left operand can never end the obligation
    if l != Formula::False && implies(&l, &negate(r.clone(), true)) {
        return Formula::release(Formula::False, r);
    }
    Formula::release(l, r)
}

fn simpler_next(p: Formula) -> Formula {
    // X [] <> p = [] <> p and X <> [] p = <> [] p
    if always_eventually_operand(&p).is_some() || eventually_always_operand(&p).is_some() {
        return p;
    }
    Formula::next(p)
}

fn simpler_implies(l: Formula, r: Formula) -> Formula {
    if implies(&l, &r) {
        return Formula::True;
    }
    rewrite(Formula::or(negate(l, true), r), true)
}

fn simpler_equiv(l: Formula, r: Formula) -> Formula {
    if implies(&l, &r) && implies(&r, &l) {
        return Formula::True;
    }
    let both = rewrite(Formula::and(l.clone(), r.clone()), true);
    let neither = rewrite(Formula::and(negate(l, true), negate(r, true)), true);
    rewrite(Formula::or(both, neither), true)
}

fn simpler_and(l: Formula, r: Formula) -> Formula {
    // p && (q U p) = p and p && (q V p) = q V p, and mirrored
    if let Formula::Until(_, rr) = &r {
        if **rr == l {
            return l;
        }
    }
    if let Formula::Until(_, lr) = &l {
        if **lr == r {
            return r;
        }
    }
    if let Formula::Release(_, rr) = &r {
        if **rr == l {
            return r;
        }
    }
    if let Formula::Release(_, lr) = &l {
        if **lr == r {
            return l;
        }
    }
    // (p U q) && (r U q) = (p && r) U q
    if let (Formula::Until(la, lb), Formula::Until(ra, rb)) = (&l, &r) {
        if lb == rb {
            return Formula::until(
                Formula::and((**la).clone(), (**ra).clone()),
                (**lb).clone(),
            );
        }
    }
    // (p V q) && (p V r) = p V (q && r)
    if let (Formula::Release(la, lb), Formula::Release(ra, rb)) = (&l, &r) {
        if la == ra {
            return Formula::release(
                (**ra).clone(),
                Formula::and((**lb).clone(), (**rb).clone()),
            );
        }
    }
    // X p && X q = X (p && q)
    if let (Formula::Next(li), Formula::Next(ri)) = (&l, &r) {
        return Formula::next(Formula::and((**ri).clone(), (**li).clone()));
    }
    // (p V q) && (r U q) = p V q
    if let (Formula::Release(_, lb), Formula::Until(_, rb)) = (&l, &r) {
        if lb == rb {
            return l;
        }
    }
    if l == r || r == Formula::False || l == Formula::True || implies(&r, &l) {
        return r;
    }
    if r == Formula::True || l == Formula::False || implies(&l, &r) {
        return l;
    }
    // <>[] p && <>[] q = <>[] (p && q)
    if let (Some(lp), Some(rp)) = (eventually_always_operand(&l), eventually_always_operand(&r)) {
        return Formula::until(
            Formula::True,
            Formula::release(Formula::False, Formula::and(lp.clone(), rp.clone())),
        );
    }
    // contradiction
    if implies(&l, &negate(r.clone(), true)) || implies(&r, &negate(l.clone(), true)) {
        return Formula::False;
    }
    Formula::and(l, r)
}

fn simpler_or(l: Formula, r: Formula) -> Formula {
    // p || (q U p) = q U p and p || (q V p) = p
    if let Formula::Until(_, rr) = &r {
        if **rr == l {
            return r;
        }
    }
    if let Formula::Release(_, rr) = &r {
        if **rr == l {
            return l;
        }
    }
    // (p U q) || (p U r) = p U (q || r)
    if let (Formula::Until(la, lb), Formula::Until(ra, rb)) = (&l, &r) {
        if la == ra {
            return Formula::until(
                (**ra).clone(),
                Formula::or((**lb).clone(), (**rb).clone()),
            );
        }
    }
    if l == r || r == Formula::False || l == Formula::True || implies(&r, &l) {
        return l;
    }
    if r == Formula::True || l == Formula::False || implies(&l, &r) {
        return r;
    }
    // (p V q) || (r V q) = (p || r) V q
    if let (Formula::Release(la, lb), Formula::Release(ra, rb)) = (&l, &r) {
        if lb == rb {
            return Formula::release(
                Formula::or((**la).clone(), (**ra).clone()),
                (**rb).clone(),
            );
        }
    }
    // (p V q) || (r U q) = r U q
    if let (Formula::Release(_, lb), Formula::Until(_, rb)) = (&l, &r) {
        if lb == rb {
            return r;
        }
    }
    // []<> p || []<> q = []<> (p || q)
    if let (Some(lp), Some(rp)) = (always_eventually_operand(&l), always_eventually_operand(&r)) {
        return Formula::release(
            Formula::False,
            Formula::until(Formula::True, Formula::or(lp.clone(), rp.clone())),
        );
    }
    // excluded middle
    if implies(&negate(r.clone(), true), &l) || implies(&negate(l.clone(), true), &r) {
        return Formula::True;
    }
    Formula::or(l, r)
}

/// Rotates left-leaning And/Or spines to the right throughout the tree.
pub fn right_linked(f: Formula) -> Formula {
    match f {
        Formula::And(l, r) => match *l {
            Formula::And(ll, lr) => {
                right_linked(Formula::And(ll, Box::new(Formula::And(lr, r))))
            }
            other => Formula::and(right_linked(other), right_linked(*r)),
        },
        Formula::Or(l, r) => match *l {
            Formula::Or(ll, lr) => right_linked(Formula::Or(ll, Box::new(Formula::Or(lr, r)))),
            other => Formula::or(right_linked(other), right_linked(*r)),
        },
        Formula::Not(p) => Formula::not(right_linked(*p)),
        Formula::Next(p) => Formula::next(right_linked(*p)),
        Formula::Until(l, r) => Formula::until(right_linked(*l), right_linked(*r)),
        Formula::Release(l, r) => Formula::release(right_linked(*l), right_linked(*r)),
        Formula::Implies(l, r) => Formula::implies(right_linked(*l), right_linked(*r)),
        Formula::Equiv(l, r) => Formula::equiv(right_linked(*l), right_linked(*r)),
        leaf => leaf,
    }
}

/// Orders the top-level And/Or chain of `f` by sort key, removes
/// duplicates, applies identity and annihilation, and absorbs terms that
/// are entailed by other members of the chain.
pub fn canonical_chain(f: Formula) -> Formula {
    let is_and = match &f {
        Formula::And(_, _) => true,
        Formula::Or(_, _) => false,
        _ => return f,
    };
    let mut terms = Vec::new();
    collect_terms(is_and, f, &mut terms);
    terms.sort_by_cached_key(Formula::key_string);
    terms.dedup();

    if is_and {
        if terms.iter().any(|t| *t == Formula::False) {
            return Formula::False;
        }
        terms.retain(|t| *t != Formula::True);
        if terms.is_empty() {
            return Formula::True;
        }
    } else {
        if terms.iter().any(|t| *t == Formula::True) {
            return Formula::True;
        }
        terms.retain(|t| *t != Formula::False);
        if terms.is_empty() {
            return Formula::False;
        }
    }

    let mut keep = vec![true; terms.len()];
    for i in 0..terms.len() {
        for j in 0..terms.len() {
            if i == j || !keep[i] || !keep[j] {
                continue;
            }
            let (k1, k2) = (&terms[i], &terms[j]);
            let absorbed = if is_and {
                // k1 entails k2 when k1 is one of k2's disjuncts, and
                // q && (p U q) = q when q is already in the chain
                any_disjunct(k1, k2)
                    || matches!(k2, Formula::Until(_, rr)
                        if conjuncts_present(rr, &terms, &keep))
            } else {
                // k2 entails k1 when all of k1's conjuncts sit inside k2,
                // and p || (false V p) = p when p is already in the chain
                all_conjuncts_in(k1, k2)
                    || matches!(k2, Formula::Release(rl, rr)
                        if **rl == Formula::False && term_present(rr, &terms, &keep))
            };
            if absorbed {
                keep[j] = false;
            }
        }
    }
    let kept: Vec<Formula> = terms
        .into_iter()
        .zip(keep)
        .filter_map(|(t, k)| k.then_some(t))
        .collect();
    rebuild_chain(is_and, kept)
}

fn collect_terms(is_and: bool, f: Formula, out: &mut Vec<Formula>) {
    match f {
        Formula::And(l, r) if is_and => {
            collect_terms(is_and, *l, out);
            collect_terms(is_and, *r, out);
        }
        Formula::Or(l, r) if !is_and => {
            collect_terms(is_and, *l, out);
            collect_terms(is_and, *r, out);
        }
        other => out.push(other),
    }
}

/// Does `srch` occur as a disjunct of `within`?
fn any_disjunct(srch: &Formula, within: &Formula) -> bool {
    if let Formula::Or(l, r) = within {
        any_disjunct(srch, l) || any_disjunct(srch, r)
    } else {
        within == srch
    }
}

/// Does `srch` occur as a conjunct of `within`?
fn any_conjunct(srch: &Formula, within: &Formula) -> bool {
    if let Formula::And(l, r) = within {
        any_conjunct(srch, l) || any_conjunct(srch, r)
    } else {
        within == srch
    }
}

/// Do all conjuncts of `srch` occur as conjuncts of `within`?
fn all_conjuncts_in(srch: &Formula, within: &Formula) -> bool {
    if let Formula::And(l, r) = srch {
        all_conjuncts_in(l, within) && all_conjuncts_in(r, within)
    } else {
        any_conjunct(srch, within)
    }
}

/// Do all conjuncts of `srch` occur among the kept chain terms?
fn conjuncts_present(srch: &Formula, terms: &[Formula], keep: &[bool]) -> bool {
    if let Formula::And(l, r) = srch {
        conjuncts_present(l, terms, keep) && conjuncts_present(r, terms, keep)
    } else {
        term_present(srch, terms, keep)
    }
}

fn term_present(srch: &Formula, terms: &[Formula], keep: &[bool]) -> bool {
    terms.iter().zip(keep).any(|(t, &k)| k && t == srch)
}

fn rebuild_chain(is_and: bool, mut terms: Vec<Formula>) -> Formula {
    let mut acc = terms.pop().expect("canonical chain is never empty");
    while let Some(t) = terms.pop() {
        acc = if is_and {
            Formula::and(t, acc)
        } else {
            Formula::or(t, acc)
        };
    }
    acc
}
