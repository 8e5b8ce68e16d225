use crate::core::Flags;
use crate::core::ast::Formula;
use crate::core::rewrite;
use crate::core::tokens::{Token, TokenKind};
use crate::errors::{ParseError, ParseErrorKind};

/// Converts a token stream into a normalized [`Formula`] using a
/// recursive-descent parser with five binary precedence levels.
///
/// From tightest to loosest: `U`/`V` (right-associative), `&&` (left),
/// `||` (left), `<->` (non-associative), `->` (right-associative). The
/// unary operators `!`, `[]`, `<>` and `X` bind tighter than any binary
/// operator. `[]p` and `<>p` are desugared on the spot, negations are
/// pushed to the predicates, and every node is run through the rewriter
/// as it is built, so the returned tree is already in negation normal
/// form with `->` and `<->` expanded.
pub fn parse(tokens: &[Token], flags: &Flags) -> Result<Formula, ParseError> {
    let mut parser = Parser::new(tokens, flags.simp_log);
    if parser.peek_kind() == Some(TokenKind::Eos) {
        return Err(parser.error_here(ParseErrorKind::EmptyFormula));
    }
    let formula = parser.parse_formula()?;
    parser.expect_end()?;
    Ok(formula)
}

/// Stateful parser over a token slice.
struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    simp_log: bool,
}

impl<'a> Parser<'a> {
    fn new(tokens: &'a [Token], simp_log: bool) -> Self {
        Self {
            tokens,
            pos: 0,
            simp_log,
        }
    }

    fn parse_formula(&mut self) -> Result<Formula, ParseError> {
        self.parse_implies()
    }

    /// Parses a right-associative implication chain.
    fn parse_implies(&mut self) -> Result<Formula, ParseError> {
        let lhs = self.parse_equiv()?;
        if self.matches(TokenKind::Implies) {
            let rhs = self.parse_implies()?;
            Ok(self.combine(Formula::implies(lhs, rhs)))
        } else {
            Ok(lhs)
        }
    }

    /// Parses an equivalence; chaining `<->` is a syntax error.
    fn parse_equiv(&mut self) -> Result<Formula, ParseError> {
        let lhs = self.parse_or()?;
        if self.matches(TokenKind::Equiv) {
            let rhs = self.parse_or()?;
            if self.peek_kind() == Some(TokenKind::Equiv) {
                return Err(self.error_here(ParseErrorKind::NonAssocChained));
            }
            Ok(self.combine(Formula::equiv(lhs, rhs)))
        } else {
            Ok(lhs)
        }
    }

    /// Parses a left-associative disjunction chain.
    fn parse_or(&mut self) -> Result<Formula, ParseError> {
        let mut node = self.parse_and()?;
        while self.matches(TokenKind::Or) {
            let rhs = self.parse_and()?;
            node = self.combine(Formula::or(node, rhs));
        }
        Ok(node)
    }

    /// Parses a left-associative conjunction chain.
    fn parse_and(&mut self) -> Result<Formula, ParseError> {
        let mut node = self.parse_until()?;
        while self.matches(TokenKind::And) {
            let rhs = self.parse_until()?;
            node = self.combine(Formula::and(node, rhs));
        }
        Ok(node)
    }

    /// Parses the right-associative `U`/`V` level.
    fn parse_until(&mut self) -> Result<Formula, ParseError> {
        let lhs = self.parse_factor()?;
        let release = match self.peek_kind() {
            Some(TokenKind::Until) => false,
            Some(TokenKind::Release) => true,
            _ => return Ok(lhs),
        };
        self.advance();
        let rhs = self.parse_until()?;
        let node = if release {
            Formula::release(lhs, rhs)
        } else {
            Formula::until(lhs, rhs)
        };
        Ok(self.combine(node))
    }

    /// Parses a unary-operator prefix and an atom.
    fn parse_factor(&mut self) -> Result<Formula, ParseError> {
        match self.peek_kind() {
            Some(TokenKind::LParen) => {
                self.advance();
                let inner = self.parse_formula()?;
                if !self.matches(TokenKind::RParen) {
                    return Err(self.error_here(ParseErrorKind::MissingRParen));
                }
                Ok(self.simplify(inner))
            }
            Some(TokenKind::Not) => {
                self.advance();
                let inner = self.parse_factor()?;
                let pushed = rewrite::push_negation(Formula::not(inner), self.simp_log);
                Ok(self.simplify(pushed))
            }
            Some(TokenKind::Always) => {
                self.advance();
                let mut inner = self.parse_factor()?;
                if self.simp_log {
                    if matches!(inner, Formula::True | Formula::False) {
                        return Ok(inner);
                    }
                    inner = match inner {
                        Formula::Release(l, r) => {
                            if *l == Formula::False {
                                // [] [] p = [] p
                                return Ok(Formula::Release(l, r));
                            }
                            // [] (p V q) = [] q
                            *r
                        }
                        other => other,
                    };
                }
                Ok(self.simplify(Formula::release(Formula::False, inner)))
            }
            Some(TokenKind::Eventually) => {
                self.advance();
                let mut inner = self.parse_factor()?;
                if self.simp_log {
                    if matches!(inner, Formula::True | Formula::False) {
                        return Ok(inner);
                    }
                    inner = match inner {
                        Formula::Until(l, r) => {
                            if *l == Formula::True {
                                // <> <> p = <> p
                                return Ok(Formula::Until(l, r));
                            }
                            // <> (p U q) = <> q
                            *r
                        }
                        other => other,
                    };
                }
                Ok(self.simplify(Formula::until(Formula::True, inner)))
            }
            Some(TokenKind::Next) => {
                self.advance();
                let inner = self.parse_factor()?;
                if self.simp_log && matches!(inner, Formula::True | Formula::False) {
                    // X true = true and X false = false
                    return Ok(inner);
                }
                Ok(self.simplify(Formula::next(inner)))
            }
            Some(TokenKind::Pred(id)) => {
                self.advance();
                Ok(Formula::Pred(id))
            }
            Some(TokenKind::True) => {
                self.advance();
                Ok(Formula::True)
            }
            Some(TokenKind::False) => {
                self.advance();
                Ok(Formula::False)
            }
            Some(TokenKind::Eos) | None => Err(self.error_here(ParseErrorKind::UnexpectedEnd)),
            Some(other) => Err(self.error_here(ParseErrorKind::ExpectedPredicate {
                found: other.to_string(),
            })),
        }
    }

    /// Runs a freshly built binary node through the rewriter.
    fn combine(&self, node: Formula) -> Formula {
        if self.simp_log {
            rewrite::simpler(node)
        } else {
            rewrite::minimal(node)
        }
    }

    /// Simplification hook applied by the unary-factor rules.
    fn simplify(&self, node: Formula) -> Formula {
        if self.simp_log {
            rewrite::simpler(node)
        } else {
            node
        }
    }

    fn expect_end(&mut self) -> Result<(), ParseError> {
        if self.peek_kind() == Some(TokenKind::Eos) {
            Ok(())
        } else {
            Err(self.unexpected_token_error())
        }
    }

    /// Consumes the next token if it matches the provided kind.
    fn matches(&mut self, kind: TokenKind) -> bool {
        if self.peek_kind() == Some(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn unexpected_token_error(&self) -> ParseError {
        match self.peek() {
            Some(tok) => ParseError::new(
                tok.pos,
                ParseErrorKind::UnexpectedToken {
                    found: tok.kind.to_string(),
                },
            ),
            None => ParseError::new(self.last_column(), ParseErrorKind::UnexpectedEnd),
        }
    }

    fn peek(&self) -> Option<&'a Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self) -> Option<TokenKind> {
        self.peek().map(|tok| tok.kind)
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    fn error_here(&self, kind: ParseErrorKind) -> ParseError {
        let column = self
            .peek()
            .map(|t| t.pos)
            .unwrap_or_else(|| self.last_column());
        ParseError::new(column, kind)
    }

    fn last_column(&self) -> usize {
        self.tokens.last().map(|tok| tok.pos).unwrap_or_default()
    }
}
