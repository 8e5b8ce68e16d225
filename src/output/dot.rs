use std::fmt::Write as _;

use crate::core::buchi::Buchi;
use crate::core::lexer::SymbolTable;

/// Renders the automaton as a Graphviz digraph.
///
/// Accepting states are drawn as double circles; an unnamed point node
/// marks the initial state.
#[must_use]
pub fn render(buchi: &Buchi, symbols: &SymbolTable) -> String {
    let mut out = String::new();
    out.push_str("digraph buchi {\n");
    out.push_str("\trankdir = LR;\n");
    out.push_str("\tnode [shape = circle];\n");
    out.push_str("\tinit [label = \"\", shape = point];\n");
    for i in buchi.live_states() {
        if buchi.is_accepting(i) {
            let _ = writeln!(out, "\t\"{}\" [shape = doublecircle];", buchi.name(i));
        }
    }
    let _ = writeln!(out, "\tinit -> \"{}\";", buchi.name(buchi.init));
    for i in buchi.live_states() {
        for t in &buchi.states[i].trans {
            let _ = writeln!(
                out,
                "\t\"{}\" -> \"{}\" [label = \"{}\"];",
                buchi.name(i),
                buchi.name(t.to),
                t.letter.display(symbols)
            );
        }
    }
    out.push_str("}\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Flags, translate};

    #[test]
    fn test_digraph_shape() {
        let t = translate("<> p", &Flags::default()).unwrap();
        let graph = render(&t.buchi, &t.symbols);
        assert!(graph.starts_with("digraph buchi {"));
        assert!(graph.contains("doublecircle"));
        assert!(graph.contains("init -> \"T0_init\";"));
        assert!(graph.contains("[label = \"p\"]"));
    }
}
