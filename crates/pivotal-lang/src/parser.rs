use pivotal_solver::Coefficients;
use thiserror::Error;

use crate::ast::{Coefficient, Term};
use crate::lexer::{Lexer, Span, Token, TokenKind};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Expression is empty")]
    Empty,
    #[error("No variable term found in '{0}'")]
    NoTerms(String),
    #[error("Zero denominator in fraction at position {span:?}")]
    ZeroDenominator { span: Span },
    #[error("Invalid number: {0}")]
    InvalidNumber(String),
    #[error("Missing relational operator (<=, >=, =) in '{0}'")]
    MissingOperator(String),
    #[error("Invalid right-hand side value: '{0}'")]
    InvalidValue(String),
}

/// Scanner that pulls `[sign][coefficient]letters` terms out of a token
/// stream.
///
/// Terms are found left to right. A term must start with `+` or `-`, except
/// the first one, which is implicitly positive. Tokens that cannot start a
/// term are skipped, so `2x * 3y` yields only `2x`.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    /// Parse a linear expression into variable coefficients.
    ///
    /// A variable written more than once keeps the coefficient of its last
    /// occurrence, at the position of its first.
    pub fn parse(source: &str) -> Result<Coefficients, ParseError> {
        let terms = Self::terms(source)?;
        if terms.is_empty() {
            return Err(ParseError::NoTerms(source.trim().to_string()));
        }

        let mut coefficients = Coefficients::new();
        for term in terms {
            coefficients.insert(term.variable, term.coefficient);
        }
        Ok(coefficients)
    }

    /// Every term of the expression, in source order.
    pub fn terms(source: &str) -> Result<Vec<Term>, ParseError> {
        if source.trim().is_empty() {
            return Err(ParseError::Empty);
        }
        let mut parser = Parser::new(Lexer::tokenize(source));
        parser.parse_terms()
    }

    fn peek_kind(&self) -> TokenKind {
        self.current().map(|t| t.kind).unwrap_or(TokenKind::Eof)
    }

    fn current(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn advance(&mut self) -> Option<&Token> {
        let token = self.tokens.get(self.pos);
        self.pos += 1;
        token
    }

    fn parse_terms(&mut self) -> Result<Vec<Term>, ParseError> {
        let mut terms = Vec::new();

        // A leading term without a sign counts as positive
        if !matches!(self.peek_kind(), TokenKind::Plus | TokenKind::Minus) {
            let start = self.pos;
            let span_start = self.current().map(|t| t.span.start).unwrap_or(0);
            match self.parse_unsigned_term(1.0, span_start)? {
                Some(term) => terms.push(term),
                None => self.pos = start,
            }
        }

        loop {
            match self.peek_kind() {
                TokenKind::Eof => break,
                TokenKind::Plus | TokenKind::Minus => {
                    let start = self.pos;
                    if let Some(term) = self.parse_signed_term()? {
                        terms.push(term);
                    } else {
                        self.pos = start + 1;
                    }
                }
                _ => {
                    self.advance();
                }
            }
        }

        Ok(terms)
    }

    fn parse_signed_term(&mut self) -> Result<Option<Term>, ParseError> {
        let Some(sign_token) = self.advance() else {
            return Ok(None);
        };
        let sign = if sign_token.kind == TokenKind::Minus { -1.0 } else { 1.0 };
        let span_start = sign_token.span.start;
        self.parse_unsigned_term(sign, span_start)
    }

    /// `[coefficient] ident` after the sign. Leaves the position unspecified
    /// when no term matches; callers reset it.
    fn parse_unsigned_term(&mut self, sign: f64, span_start: usize) -> Result<Option<Term>, ParseError> {
        let coefficient_start = self.current().map(|t| t.span.start).unwrap_or(span_start);
        let coefficient = self.parse_coefficient()?;
        let coefficient_end = self
            .pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map(|t| t.span.end)
            .unwrap_or(coefficient_start);

        if self.peek_kind() != TokenKind::Ident {
            return Ok(None);
        }

        // Only a fraction that scales a variable is an error
        if let Some(Coefficient::Fraction { denominator, .. }) = coefficient {
            if denominator == 0.0 {
                return Err(ParseError::ZeroDenominator {
                    span: Span::new(coefficient_start, coefficient_end),
                });
            }
        }

        let Some(ident) = self.advance() else {
            return Ok(None);
        };

        let magnitude = coefficient.map(Coefficient::value).unwrap_or(1.0);
        Ok(Some(Term {
            span: Span::new(span_start, ident.span.end),
            coefficient: sign * magnitude,
            variable: ident.text.clone(),
        }))
    }

    /// `(int/int)`, `int/int`, or a plain number. Returns `None` without
    /// consuming anything when no coefficient is written.
    fn parse_coefficient(&mut self) -> Result<Option<Coefficient>, ParseError> {
        match self.peek_kind() {
            TokenKind::LParen => {
                let start = self.pos;
                self.advance();
                match self.parse_fraction()? {
                    Some(fraction) if self.peek_kind() == TokenKind::RParen => {
                        self.advance();
                        Ok(Some(fraction))
                    }
                    _ => {
                        self.pos = start;
                        Ok(None)
                    }
                }
            }
            TokenKind::Number => {
                let start = self.pos;
                if let Some(fraction) = self.parse_fraction()? {
                    return Ok(Some(fraction));
                }
                self.pos = start;
                let Some(token) = self.advance() else {
                    return Ok(None);
                };
                let value = parse_number(&token.text)?;
                Ok(Some(Coefficient::Number(value)))
            }
            _ => Ok(None),
        }
    }

    /// `int / int`, or `None` (position unspecified) when the tokens do not
    /// form a fraction.
    fn parse_fraction(&mut self) -> Result<Option<Coefficient>, ParseError> {
        let Some(numerator) = self.current().filter(|t| t.is_integer()).map(|t| t.text.clone()) else {
            return Ok(None);
        };
        self.advance();
        if self.peek_kind() != TokenKind::Slash {
            return Ok(None);
        }
        self.advance();
        let Some(denominator) = self.current().filter(|t| t.is_integer()).map(|t| t.text.clone()) else {
            return Ok(None);
        };
        self.advance();

        Ok(Some(Coefficient::Fraction {
            numerator: parse_number(&numerator)?,
            denominator: parse_number(&denominator)?,
        }))
    }
}

fn parse_number(text: &str) -> Result<f64, ParseError> {
    text.parse::<f64>()
        .map_err(|_| ParseError::InvalidNumber(text.to_string()))
}
