mod plot;
mod problem;
mod sensitivity;
mod simplex;
mod solution;
mod tableau;

pub use plot::{plot_data, PlotConstraint, PlotData};
pub use problem::{Bound, Coefficients, ConstraintOp, OpType, Problem, ProblemError};
pub use sensitivity::{sensitivity, ConstraintSensitivity};
pub use simplex::Solver;
pub use solution::{Phase, Solution, SolveError, SolveOutcome};
pub use tableau::{PivotHint, Tableau, RHS};
