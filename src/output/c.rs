use std::fmt::Write as _;

use fixedbitset::FixedBitSet;

use crate::core::buchi::Buchi;
use crate::core::lexer::SymbolTable;

const WORD_BITS: usize = 64;

/// Renders the automaton as a C state table guarded by `prefix`.
///
/// Guards are bit masks over the symbol indices, split into as many
/// `unsigned long` words as the alphabet needs; states are renumbered
/// densely with the initial state at index 0.
#[must_use]
pub fn render(buchi: &Buchi, symbols: &SymbolTable, formula: &str, prefix: &str) -> String {
    let order = buchi.live_states();
    let number_of = |idx: usize| order.iter().position(|&i| i == idx).unwrap_or(0);
    let words = symbols.len().div_ceil(WORD_BITS).max(1);

    let mut out = String::new();
    let _ = writeln!(out, "/* Buchi automaton generated from: {formula} */");
    out.push('\n');

    let _ = writeln!(out, "#define {prefix}_SYM_COUNT {}", symbols.len());
    let _ = writeln!(out, "#define {prefix}_SYM_WORDS {words}");
    let _ = writeln!(
        out,
        "static const char *const {prefix}_sym_table[{prefix}_SYM_COUNT + 1] = {{"
    );
    for name in symbols.iter() {
        let _ = writeln!(out, "\t\"{name}\",");
    }
    out.push_str("\t0\n};\n\n");

    let _ = writeln!(out, "#define {prefix}_STATE_COUNT {}", order.len());
    let _ = writeln!(out, "static const int {prefix}_initial_state = 0;");
    let _ = write!(
        out,
        "static const unsigned char {prefix}_accepting[{prefix}_STATE_COUNT] = {{ "
    );
    for (k, &i) in order.iter().enumerate() {
        if k > 0 {
            out.push_str(", ");
        }
        out.push(if buchi.is_accepting(i) { '1' } else { '0' });
    }
    out.push_str(" };\n\n");

    out.push_str("/* a transition is taken when every pos bit holds and no neg bit does */\n");
    let _ = writeln!(out, "struct {prefix}_trans {{");
    out.push_str("\tint from;\n");
    let _ = writeln!(out, "\tunsigned long pos[{prefix}_SYM_WORDS];");
    let _ = writeln!(out, "\tunsigned long neg[{prefix}_SYM_WORDS];");
    out.push_str("\tint to;\n};\n\n");

    let _ = writeln!(
        out,
        "#define {prefix}_TRANS_COUNT {}",
        buchi.transition_count()
    );
    let _ = writeln!(
        out,
        "static const struct {prefix}_trans {prefix}_table[{prefix}_TRANS_COUNT] = {{"
    );
    for &i in &order {
        for t in &buchi.states[i].trans {
            let _ = writeln!(
                out,
                "\t{{ {}, {}, {}, {} }},",
                number_of(i),
                mask_words(&t.letter.pos, words),
                mask_words(&t.letter.neg, words),
                number_of(t.to)
            );
        }
    }
    out.push_str("};\n");
    out
}

fn mask_words(set: &FixedBitSet, words: usize) -> String {
    let mut masks = vec![0u64; words];
    for bit in set.ones() {
        masks[bit / WORD_BITS] |= 1u64 << (bit % WORD_BITS);
    }
    let mut out = String::from("{ ");
    for (k, mask) in masks.iter().enumerate() {
        if k > 0 {
            out.push_str(", ");
        }
        let _ = write!(out, "{mask:#x}UL");
    }
    out.push_str(" }");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Flags, translate};

    #[test]
    fn test_table_shape() {
        let t = translate("p U q", &Flags::default()).unwrap();
        let table = render(&t.buchi, &t.symbols, "p U q", "_never");
        assert!(table.contains("#define _never_SYM_COUNT 2"));
        assert!(table.contains("\"p\","));
        assert!(table.contains("static const int _never_initial_state = 0;"));
        assert!(table.contains("#define _never_STATE_COUNT 2"));
    }

    #[test]
    fn test_masks_encode_literals() {
        let t = translate("[] p", &Flags::default()).unwrap();
        let table = render(&t.buchi, &t.symbols, "[] p", "_x");
        // the lone self-loop requires symbol 0 positively
        assert!(table.contains("{ 0, { 0x1UL }, { 0x0UL }, 0 }"));
    }
}
