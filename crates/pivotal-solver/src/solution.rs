use indexmap::IndexMap;
use thiserror::Error;

use crate::problem::{OpType, Problem, ProblemError};
use crate::tableau::Tableau;

/// Simplex phase a tableau belongs to.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Feasibility: drive the artificial variables to zero
    One,
    /// Optimality: minimize the (sign-adjusted) original objective
    Two,
}

/// The result of a solve that produced a basic solution
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, PartialEq)]
pub struct Solution {
    /// Objective value in the problem's own max/min sense, rounded to 3 decimals
    pub objective_value: f64,
    /// Value of every non-RHS column of the final tableau, in column order
    pub variable_values: IndexMap<String, f64>,
    /// Initial tableau, one snapshot per pivot, and the phase transition
    pub tableau_history: Vec<Tableau>,
    /// False when the iteration cap stopped the run before optimality
    pub converged: bool,
    /// Phase the run ended in
    pub phase: Phase,
    /// Direction of the solved problem
    pub op_type: OpType,
}

/// Every way a solve can end, as data.
#[derive(Debug, Clone, PartialEq)]
pub enum SolveOutcome {
    Optimal(Solution),
    /// The iteration cap was reached; the solution is the state at that point
    NonConvergent(Solution),
    /// Phase 1 finished with a non-zero artificial cost
    Infeasible {
        residual: f64,
        history: Vec<Tableau>,
    },
    /// `column` entered with no positive entry to bound it
    Unbounded {
        column: String,
        phase: Phase,
        history: Vec<Tableau>,
    },
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolveError {
    #[error("Problem is infeasible (phase 1 residual {residual})")]
    Infeasible { residual: f64 },
    #[error("Problem is unbounded: column {column} can increase without limit")]
    Unbounded { column: String, phase: Phase },
    #[error("Invalid problem: {0}")]
    InvalidProblem(#[from] ProblemError),
}

impl Solution {
    /// Value of a column of the final tableau; 0 for unknown names.
    pub fn value(&self, name: &str) -> f64 {
        self.variable_values.get(name).copied().unwrap_or(0.0)
    }

    pub fn final_tableau(&self) -> Option<&Tableau> {
        self.tableau_history.last()
    }

    /// Values of the problem's own variables, without slack, surplus or
    /// artificial columns.
    pub fn decision_values(&self, problem: &Problem) -> IndexMap<String, f64> {
        problem
            .variable_names()
            .map(|name| (name.to_string(), self.value(name)))
            .collect()
    }
}

impl SolveOutcome {
    pub fn is_optimal(&self) -> bool {
        matches!(self, SolveOutcome::Optimal(_))
    }

    /// Every tableau recorded before the run ended.
    pub fn history(&self) -> &[Tableau] {
        match self {
            SolveOutcome::Optimal(solution) | SolveOutcome::NonConvergent(solution) => {
                &solution.tableau_history
            }
            SolveOutcome::Infeasible { history, .. } | SolveOutcome::Unbounded { history, .. } => history,
        }
    }

    /// Collapse into the throwing interface. Non-convergent runs are
    /// returned as `Ok` with `converged == false`.
    pub fn into_result(self) -> Result<Solution, SolveError> {
        match self {
            SolveOutcome::Optimal(solution) | SolveOutcome::NonConvergent(solution) => Ok(solution),
            SolveOutcome::Infeasible { residual, .. } => Err(SolveError::Infeasible { residual }),
            SolveOutcome::Unbounded { column, phase, .. } => Err(SolveError::Unbounded { column, phase }),
        }
    }
}

/// Round to 3 decimals, mapping -0.0 to 0.0.
pub(crate) fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0 + 0.0
}
