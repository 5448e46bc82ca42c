use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use thiserror::Error;

/// Coefficients of a single linear expression, keyed by variable name in
/// first-seen order.
pub type Coefficients = IndexMap<String, f64>;

/// A linear program in the canonical shape consumed by the solver.
///
/// `variables[v][k]` holds the coefficient of variable `v` in the objective
/// (`k == optimize`) or in the constraint named `k`. Variable insertion order
/// defines the column order of every tableau built from the problem.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, PartialEq)]
pub struct Problem {
    /// Name of the objective row
    pub optimize: String,
    /// Optimization direction
    pub op_type: OpType,
    /// Variable name -> (objective or constraint name -> coefficient)
    pub variables: IndexMap<String, Coefficients>,
    /// Constraint name -> bound
    pub constraints: IndexMap<String, Bound>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpType {
    Max,
    Min,
}

/// Right-hand side of a constraint together with its relation.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Bound {
    /// `expr <= rhs`
    Max(f64),
    /// `expr >= rhs`
    Min(f64),
    /// `expr = rhs`
    Equal(f64),
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstraintOp {
    /// Less than or equal (<=)
    #[cfg_attr(feature = "serde", serde(rename = "<="))]
    Le,
    /// Greater than or equal (>=)
    #[cfg_attr(feature = "serde", serde(rename = ">="))]
    Ge,
    /// Equal (=)
    #[cfg_attr(feature = "serde", serde(rename = "="))]
    Eq,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProblemError {
    #[error("Problem has no constraints")]
    NoConstraints,
    #[error("Variable {variable} has no coefficient for {key}")]
    MissingCoefficient { variable: String, key: String },
    #[error("Variable {variable} references unknown row {key}")]
    UnknownConstraint { variable: String, key: String },
    #[error("Unknown constraint operator: {0}")]
    UnknownOperator(String),
    #[error("Non-finite value {value} in {location}")]
    NonFinite { location: String, value: f64 },
}

impl OpType {
    pub fn is_min(self) -> bool {
        self == OpType::Min
    }
}

impl fmt::Display for OpType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpType::Max => f.write_str("max"),
            OpType::Min => f.write_str("min"),
        }
    }
}

impl FromStr for OpType {
    type Err = ProblemError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "max" | "maximize" => Ok(OpType::Max),
            "min" | "minimize" => Ok(OpType::Min),
            other => Err(ProblemError::UnknownOperator(other.to_string())),
        }
    }
}

impl Bound {
    pub fn new(op: ConstraintOp, rhs: f64) -> Self {
        match op {
            ConstraintOp::Le => Bound::Max(rhs),
            ConstraintOp::Ge => Bound::Min(rhs),
            ConstraintOp::Eq => Bound::Equal(rhs),
        }
    }

    pub fn rhs(self) -> f64 {
        match self {
            Bound::Max(rhs) | Bound::Min(rhs) | Bound::Equal(rhs) => rhs,
        }
    }

    pub fn op(self) -> ConstraintOp {
        match self {
            Bound::Max(_) => ConstraintOp::Le,
            Bound::Min(_) => ConstraintOp::Ge,
            Bound::Equal(_) => ConstraintOp::Eq,
        }
    }

    /// The same relation after multiplying both sides by -1.
    pub fn negated(self) -> Self {
        match self {
            Bound::Max(rhs) => Bound::Min(-rhs),
            Bound::Min(rhs) => Bound::Max(-rhs),
            Bound::Equal(rhs) => Bound::Equal(-rhs),
        }
    }
}

impl fmt::Display for ConstraintOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintOp::Le => f.write_str("<="),
            ConstraintOp::Ge => f.write_str(">="),
            ConstraintOp::Eq => f.write_str("="),
        }
    }
}

impl FromStr for ConstraintOp {
    type Err = ProblemError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "<=" | "≤" => Ok(ConstraintOp::Le),
            ">=" | "≥" => Ok(ConstraintOp::Ge),
            "=" | "==" => Ok(ConstraintOp::Eq),
            other => Err(ProblemError::UnknownOperator(other.to_string())),
        }
    }
}

impl Problem {
    pub fn new(optimize: impl Into<String>, op_type: OpType) -> Self {
        Self {
            optimize: optimize.into(),
            op_type,
            variables: IndexMap::new(),
            constraints: IndexMap::new(),
        }
    }

    /// Set the coefficient of `variable` in row `key`, registering the
    /// variable on first use. Overwrites any previous value.
    pub fn set_coefficient(&mut self, variable: impl Into<String>, key: impl Into<String>, value: f64) {
        self.variables
            .entry(variable.into())
            .or_default()
            .insert(key.into(), value);
    }

    /// Add or replace the bound for a constraint.
    pub fn add_constraint(&mut self, name: impl Into<String>, bound: Bound) {
        self.constraints.insert(name.into(), bound);
    }

    pub fn coefficient(&self, variable: &str, key: &str) -> f64 {
        self.variables
            .get(variable)
            .and_then(|row| row.get(key))
            .copied()
            .unwrap_or(0.0)
    }

    pub fn objective_coefficient(&self, variable: &str) -> f64 {
        self.coefficient(variable, &self.optimize)
    }

    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.variables.keys().map(String::as_str)
    }

    pub fn constraint_names(&self) -> impl Iterator<Item = &str> {
        self.constraints.keys().map(String::as_str)
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }

    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    /// Zero-fill every missing (variable, objective/constraint) pair.
    pub fn densify(&mut self) {
        let keys: Vec<String> = std::iter::once(self.optimize.clone())
            .chain(self.constraints.keys().cloned())
            .collect();
        for row in self.variables.values_mut() {
            for key in &keys {
                row.entry(key.clone()).or_insert(0.0);
            }
        }
    }

    /// Check that there is at least one constraint, that every variable has
    /// exactly one coefficient per objective/constraint row, and that all
    /// numbers are finite.
    pub fn validate(&self) -> Result<(), ProblemError> {
        if self.constraints.is_empty() {
            return Err(ProblemError::NoConstraints);
        }

        for (name, bound) in &self.constraints {
            if !bound.rhs().is_finite() {
                return Err(ProblemError::NonFinite {
                    location: format!("constraint {}", name),
                    value: bound.rhs(),
                });
            }
        }

        for (variable, row) in &self.variables {
            let keys = std::iter::once(&self.optimize).chain(self.constraints.keys());
            for key in keys {
                if !row.contains_key(key) {
                    return Err(ProblemError::MissingCoefficient {
                        variable: variable.clone(),
                        key: key.clone(),
                    });
                }
            }
            for (key, value) in row {
                if !value.is_finite() {
                    return Err(ProblemError::NonFinite {
                        location: format!("{}[{}]", variable, key),
                        value: *value,
                    });
                }
            }
            for key in row.keys() {
                if key != &self.optimize && !self.constraints.contains_key(key) {
                    return Err(ProblemError::UnknownConstraint {
                        variable: variable.clone(),
                        key: key.clone(),
                    });
                }
            }
        }

        Ok(())
    }
}
