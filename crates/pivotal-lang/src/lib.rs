pub mod ast;
pub mod builder;
pub mod lexer;
pub mod parser;
pub mod scenario;

#[cfg(feature = "serde")]
pub mod store;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use ast::*;
pub use builder::{build_problem, BuildError, ConstraintSpec, DEFAULT_OBJECTIVE_NAME};
pub use lexer::{Lexer, Span, Token, TokenKind};
pub use parser::{ParseError, Parser};
pub use scenario::{Report, Scenario, ScenarioError};

#[cfg(feature = "serde")]
pub use store::{ProblemStore, SavedProblem, SavedSolution, StoreError};
