//! Serializers for the finished Büchi automaton.

pub mod c;
pub mod dot;
pub mod spin;

use std::str::FromStr;

use crate::core::Translation;

/// The available output syntaxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    /// A Spin never claim.
    #[default]
    Spin,
    /// A C state table.
    C,
    /// A Graphviz graph description.
    Dot,
}

impl FromStr for OutputMode {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "spin" => Ok(OutputMode::Spin),
            "c" => Ok(OutputMode::C),
            "dot" => Ok(OutputMode::Dot),
            _ => Err(()),
        }
    }
}

/// Renders a translation in the requested syntax.
///
/// `formula` is the original input text, quoted in a header comment;
/// `prefix` guards the identifiers of the C output.
#[must_use]
pub fn render(translation: &Translation, mode: OutputMode, formula: &str, prefix: &str) -> String {
    match mode {
        OutputMode::Spin => spin::render(&translation.buchi, &translation.symbols, formula),
        OutputMode::C => c::render(&translation.buchi, &translation.symbols, formula, prefix),
        OutputMode::Dot => dot::render(&translation.buchi, &translation.symbols),
    }
}
