use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use pivotal_solver::{Bound, ConstraintOp, OpType, Problem};
use thiserror::Error;
use tracing::debug;

use crate::parser::{ParseError, Parser};

/// Objective row name used when none is given
pub const DEFAULT_OBJECTIVE_NAME: &str = "F";

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BuildError {
    #[error("Missing objective function")]
    MissingObjective,
    #[error("At least one constraint is required")]
    NoConstraints,
    #[error("Duplicate constraint name: {0}")]
    DuplicateConstraint(String),
    #[error("Constraint {0} has the same name as the objective")]
    ConstraintNamedAsObjective(String),
    #[error("Constraint {name} has a non-finite right-hand side {value}")]
    NonFiniteValue { name: String, value: f64 },
    #[error("Parse error in {context}: {source}")]
    Parse { context: String, source: ParseError },
}

/// A user-entered constraint: `[name:] expression operator value`
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintSpec {
    /// Optional label; blank or missing names become `C{index + 1}`
    #[cfg_attr(feature = "serde", serde(default))]
    pub name: Option<String>,
    pub expression: String,
    pub operator: ConstraintOp,
    pub value: f64,
}

impl ConstraintSpec {
    pub fn new(expression: impl Into<String>, operator: ConstraintOp, value: f64) -> Self {
        Self {
            name: None,
            expression: expression.into(),
            operator,
            value,
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// The constraint's name, falling back to `C{index + 1}`.
    pub fn resolved_name(&self, index: usize) -> String {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("C{}", index + 1),
        }
    }

    pub fn bound(&self) -> Bound {
        Bound::new(self.operator, self.value)
    }
}

impl fmt::Display for ConstraintSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(name) = self.name.as_deref().filter(|n| !n.trim().is_empty()) {
            write!(f, "{}: ", name)?;
        }
        write!(f, "{} {} {}", self.expression.trim(), self.operator, self.value)
    }
}

impl FromStr for ConstraintSpec {
    type Err = ParseError;

    /// Parse `"[name:] expression OP value"` with OP one of `<=`, `>=`,
    /// `=`, `≤`, `≥`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (name, body) = match s.split_once(':') {
            Some((name, body)) => (Some(name.trim()).filter(|n| !n.is_empty()), body),
            None => (None, s),
        };

        let (position, op_text) = find_operator(body)
            .ok_or_else(|| ParseError::MissingOperator(s.trim().to_string()))?;
        let operator = op_text
            .parse::<ConstraintOp>()
            .map_err(|_| ParseError::MissingOperator(s.trim().to_string()))?;

        let expression = body[..position].trim();
        let value_text = body[position + op_text.len()..].trim();
        let value = value_text
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| ParseError::InvalidValue(value_text.to_string()))?;

        Ok(Self {
            name: name.map(str::to_string),
            expression: expression.to_string(),
            operator,
            value,
        })
    }
}

/// Byte offset and text of the first relational operator in `text`.
fn find_operator(text: &str) -> Option<(usize, &str)> {
    let (position, c) = text.char_indices().find(|(_, c)| matches!(c, '<' | '>' | '=' | '≤' | '≥'))?;
    let len = match c {
        '<' | '>' if text[position + 1..].starts_with('=') => 2,
        '=' if text[position + 1..].starts_with('=') => 2,
        _ => c.len_utf8(),
    };
    Some((position, &text[position..position + len]))
}

/// Assemble a dense [`Problem`] from the objective text, its row name, the
/// direction, and the constraint specs.
///
/// Variables are ordered by first appearance, objective first. Every
/// (variable, row) pair the expressions do not mention is filled with 0.
pub fn build_problem(
    objective: &str,
    objective_name: &str,
    op_type: OpType,
    constraints: &[ConstraintSpec],
) -> Result<Problem, BuildError> {
    if objective.trim().is_empty() {
        return Err(BuildError::MissingObjective);
    }
    if constraints.is_empty() {
        return Err(BuildError::NoConstraints);
    }

    let objective_name = match objective_name.trim() {
        "" => DEFAULT_OBJECTIVE_NAME,
        name => name,
    };

    let mut problem = Problem::new(objective_name, op_type);

    let coefficients = Parser::parse(objective).map_err(|source| BuildError::Parse {
        context: format!("objective {}", objective_name),
        source,
    })?;
    for (variable, coef) in coefficients {
        problem.set_coefficient(variable, objective_name, coef);
    }

    let mut seen = HashSet::new();
    for (index, spec) in constraints.iter().enumerate() {
        let name = spec.resolved_name(index);
        if name == objective_name {
            return Err(BuildError::ConstraintNamedAsObjective(name));
        }
        if !seen.insert(name.clone()) {
            return Err(BuildError::DuplicateConstraint(name));
        }
        if !spec.value.is_finite() {
            return Err(BuildError::NonFiniteValue {
                name,
                value: spec.value,
            });
        }

        let coefficients = Parser::parse(&spec.expression).map_err(|source| BuildError::Parse {
            context: format!("constraint {}", name),
            source,
        })?;
        for (variable, coef) in coefficients {
            problem.set_coefficient(variable, name.as_str(), coef);
        }
        problem.add_constraint(name, spec.bound());
    }

    problem.densify();

    debug!(
        objective = %problem.optimize,
        variables = problem.num_variables(),
        constraints = problem.num_constraints(),
        "Built problem"
    );

    Ok(problem)
}
