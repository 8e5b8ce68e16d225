use indexmap::IndexSet;

use crate::core::sets::SymbolId;
use crate::core::tokens::{Token, TokenKind};
use crate::errors::LexError;

/// Interning table mapping predicate names to dense symbol indices.
///
/// Indices are handed out in first-seen order and double as bit positions
/// in the symbolic letters used by the automata stages.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    names: IndexSet<String>,
}

impl SymbolTable {
    /// Creates an empty symbol table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the index for `name`, interning it if necessary.
    pub fn intern(&mut self, name: &str) -> SymbolId {
        if let Some(idx) = self.names.get_index_of(name) {
            return idx as SymbolId;
        }
        let (idx, _) = self.names.insert_full(name.to_string());
        idx as SymbolId
    }

    /// Looks up the canonical name of a symbol.
    #[must_use]
    pub fn name(&self, id: SymbolId) -> &str {
        self.names
            .get_index(id as usize)
            .expect("symbol id out of range")
    }

    /// Number of distinct predicates seen so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether no predicate has been interned yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Iterates over all interned names in index order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

/// Lexical analysis of an LTL formula into a list of tokens.
///
/// Predicate names are interned into `symbols` as they are encountered.
/// A `;` terminates the formula; one is implied at the end of the input.
///
/// # Errors
///
/// Returns a [`LexError`] for unknown characters and for `&`, `|`, `-`,
/// `<` or `[` that do not complete an operator.
pub fn lex(input: &str, symbols: &mut SymbolTable) -> Result<Vec<Token>, LexError> {
    let mut tokens = Vec::new();
    let mut iter = input.char_indices().peekable();

    while let Some((idx, ch)) = iter.next() {
        let column = idx + 1;
        if ch.is_whitespace() {
            continue;
        }
        if ch == ';' {
            tokens.push(Token::new(TokenKind::Eos, column));
            return Ok(tokens);
        }
        let kind = match ch {
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '!' => TokenKind::Not,
            '&' => {
                expect_char(&mut iter, '&', column, "expected '&&'")?;
                TokenKind::And
            }
            '|' => {
                expect_char(&mut iter, '|', column, "expected '||'")?;
                TokenKind::Or
            }
            '-' => {
                expect_char(&mut iter, '>', column, "expected '->'")?;
                TokenKind::Implies
            }
            '[' => {
                expect_char(&mut iter, ']', column, "expected '[]'")?;
                TokenKind::Always
            }
            '<' => match iter.next() {
                Some((_, '>')) => TokenKind::Eventually,
                Some((_, '-')) => {
                    expect_char(&mut iter, '>', column, "expected '<->'")?;
                    TokenKind::Equiv
                }
                _ => return Err(LexError::new(column, "expected '<>' or '<->'")),
            },
            'U' => TokenKind::Until,
            'V' => TokenKind::Release,
            'X' => TokenKind::Next,
            c if c.is_ascii_lowercase() || c == '_' => {
                let mut name = String::new();
                name.push(c);
                while let Some(&(_, next)) = iter.peek() {
                    if next.is_ascii_alphanumeric() || next == '_' {
                        name.push(next);
                        iter.next();
                    } else {
                        break;
                    }
                }
                match name.as_str() {
                    "true" => TokenKind::True,
                    "false" => TokenKind::False,
                    _ => TokenKind::Pred(symbols.intern(&name)),
                }
            }
            other => {
                return Err(LexError::new(column, format!("unknown character '{other}'")));
            }
        };
        tokens.push(Token::new(kind, column));
    }

    tokens.push(Token::new(TokenKind::Eos, input.len() + 1));
    Ok(tokens)
}

fn expect_char<I>(iter: &mut I, want: char, column: usize, message: &str) -> Result<(), LexError>
where
    I: Iterator<Item = (usize, char)>,
{
    match iter.next() {
        Some((_, c)) if c == want => Ok(()),
        _ => Err(LexError::new(column, message)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lex_operators() {
        let mut symbols = SymbolTable::new();
        let tokens = lex("[] p -> <> q", &mut symbols).unwrap();
        let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Always,
                TokenKind::Pred(0),
                TokenKind::Implies,
                TokenKind::Eventually,
                TokenKind::Pred(1),
                TokenKind::Eos,
            ]
        );
        assert_eq!(symbols.name(0), "p");
        assert_eq!(symbols.name(1), "q");
    }

    #[test]
    fn test_lex_interns_once() {
        let mut symbols = SymbolTable::new();
        lex("p U p", &mut symbols).unwrap();
        assert_eq!(symbols.len(), 1);
    }

    #[test]
    fn test_lex_semicolon_terminates() {
        let mut symbols = SymbolTable::new();
        let tokens = lex("p ; trailing garbage $$", &mut symbols).unwrap();
        assert_eq!(tokens.last().unwrap().kind, TokenKind::Eos);
        assert_eq!(tokens.len(), 2);
    }

    #[test]
    fn test_lex_unknown_character() {
        let mut symbols = SymbolTable::new();
        let err = lex("p $ q", &mut symbols).unwrap_err();
        assert_eq!(err.column, 3);
    }

    #[test]
    fn test_lex_half_operator() {
        let mut symbols = SymbolTable::new();
        assert!(lex("p & q", &mut symbols).is_err());
        assert!(lex("p | q", &mut symbols).is_err());
        assert!(lex("p <- q", &mut symbols).is_err());
    }

    #[test]
    fn test_lex_upper_case_operators_split() {
        let mut symbols = SymbolTable::new();
        let tokens = lex("pUq", &mut symbols).unwrap();
        let kinds: Vec<TokenKind> = tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![
                TokenKind::Pred(0),
                TokenKind::Until,
                TokenKind::Pred(1),
                TokenKind::Eos,
            ]
        );
    }
}
