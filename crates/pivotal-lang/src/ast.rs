use crate::lexer::Span;

/// One `[sign][coefficient]variable` term of a linear expression
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Term {
    pub span: Span,
    /// Signed coefficient; 1 or -1 when none was written
    pub coefficient: f64,
    pub variable: String,
}

/// Written form of a coefficient
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Coefficient {
    /// `3`, `2.5`, `.5`
    Number(f64),
    /// `1/2` or `(1/2)`
    Fraction { numerator: f64, denominator: f64 },
}

impl Coefficient {
    pub fn value(self) -> f64 {
        match self {
            Coefficient::Number(n) => n,
            Coefficient::Fraction {
                numerator,
                denominator,
            } => numerator / denominator,
        }
    }
}
