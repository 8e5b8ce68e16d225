pub mod alternating;
pub mod ast;
pub mod buchi;
pub mod generalized;
pub mod lexer;
pub mod parser;
pub mod rewrite;
pub mod sets;
pub mod tokens;

use self::ast::Formula;
use self::buchi::Buchi;
use self::lexer::SymbolTable;
use crate::errors::TranslateError;

/// The simplification switches and trace options threaded through every
/// pipeline stage.
#[derive(Debug, Clone)]
pub struct Flags {
    /// Apply the logic-level rewrite rules while parsing.
    pub simp_log: bool,
    /// Run the a-posteriori simplification loops after each builder.
    pub simp_post: bool,
    /// Prune dominated transitions and merge twin states on the fly.
    pub simp_fly: bool,
    /// Use the SCC analysis to ignore immaterial acceptance marks.
    pub simp_scc: bool,
    /// Evaluate "eventuality still pending" on the target state instead
    /// of the source state when computing acceptance marks.
    pub fin_on_target: bool,
    /// Emit the intermediate automata on the trace output.
    pub verbose: bool,
    /// Emit per-stage timing and size statistics.
    pub stats: bool,
}

impl Default for Flags {
    fn default() -> Self {
        Self {
            simp_log: true,
            simp_post: true,
            simp_fly: true,
            simp_scc: true,
            fin_on_target: false,
            verbose: false,
            stats: false,
        }
    }
}

/// The products of a completed translation.
#[derive(Debug, Clone)]
pub struct Translation {
    /// The parsed and normalized formula.
    pub formula: Formula,
    /// The predicate names, indexed by symbol id.
    pub symbols: SymbolTable,
    /// The final Büchi automaton.
    pub buchi: Buchi,
}

/// Runs the whole pipeline on a formula string.
///
/// Each stage consumes the previous one: the syntax tree feeds the
/// alternating automaton, which is given up to the generalized builder,
/// which in turn is given up to the degeneralizer.
///
/// # Errors
///
/// Returns a [`TranslateError`] for lexical and syntactic problems; the
/// automaton constructions themselves cannot fail.
pub fn translate(input: &str, flags: &Flags) -> Result<Translation, TranslateError> {
    let mut symbols = SymbolTable::new();
    let tokens = lexer::lex(input, &mut symbols)?;
    let formula = parser::parse(&tokens, flags)?;
    if flags.verbose {
        tracing::debug!("normalized formula: {}", formula.display(&symbols));
    }

    let vwaa = alternating::mk_alternating(&formula, &symbols, flags);
    let gba = generalized::mk_generalized(vwaa, &symbols, flags);
    let buchi = buchi::mk_buchi(gba, &symbols, flags);

    Ok(Translation {
        formula,
        symbols,
        buchi,
    })
}
