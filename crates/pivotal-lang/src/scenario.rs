use pivotal_solver::{
    plot_data, sensitivity, ConstraintSensitivity, OpType, PlotData, Problem, Solution, SolveError, Solver,
};
use thiserror::Error;
use tracing::debug;

use crate::builder::{build_problem, BuildError, ConstraintSpec, DEFAULT_OBJECTIVE_NAME};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ScenarioError {
    #[error(transparent)]
    Build(#[from] BuildError),
    #[error(transparent)]
    Solve(#[from] SolveError),
    #[error("Constraint index {index} out of range ({len} constraints)")]
    IndexOutOfRange { index: usize, len: usize },
}

/// A problem as the user wrote it: objective text, direction and constraint
/// specs. This is also the persisted shape of a saved problem.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub objective_name: String,
    pub objective_function: String,
    pub optimization_type: OpType,
    pub constraints: Vec<ConstraintSpec>,
}

/// Everything derived from one solve of a scenario
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Report {
    pub problem: Problem,
    pub solution: Solution,
    /// One entry per constraint, in spec order
    pub sensitivity: Vec<ConstraintSensitivity>,
    /// Present for 2 and 3 variable problems
    pub plot: Option<PlotData>,
}

impl Scenario {
    pub fn new(objective_function: impl Into<String>, optimization_type: OpType) -> Self {
        Self {
            objective_name: DEFAULT_OBJECTIVE_NAME.to_string(),
            objective_function: objective_function.into(),
            optimization_type,
            constraints: Vec::new(),
        }
    }

    pub fn with_objective_name(mut self, name: impl Into<String>) -> Self {
        self.objective_name = name.into();
        self
    }

    pub fn constraint(mut self, spec: ConstraintSpec) -> Self {
        self.constraints.push(spec);
        self
    }

    /// Resolved constraint names, in order.
    pub fn constraint_names(&self) -> Vec<String> {
        self.constraints
            .iter()
            .enumerate()
            .map(|(i, spec)| spec.resolved_name(i))
            .collect()
    }

    pub fn build(&self) -> Result<Problem, BuildError> {
        build_problem(
            &self.objective_function,
            &self.objective_name,
            self.optimization_type,
            &self.constraints,
        )
    }

    /// Build, solve, and derive sensitivity and plot data.
    pub fn solve(&self, solver: &Solver) -> Result<Report, ScenarioError> {
        let problem = self.build()?;
        let solution = solver.solve(&problem)?;

        let sensitivity = match solution.final_tableau() {
            Some(tableau) => sensitivity(tableau, &self.constraint_names()),
            None => Vec::new(),
        };
        let plot = plot_data(&problem, &solution);

        Ok(Report {
            problem,
            solution,
            sensitivity,
            plot,
        })
    }

    /// A copy with constraint `index` moved to a new right-hand side.
    pub fn with_rhs(&self, index: usize, value: f64) -> Result<Scenario, ScenarioError> {
        let mut scenario = self.clone();
        let len = scenario.constraints.len();
        let spec = scenario
            .constraints
            .get_mut(index)
            .ok_or(ScenarioError::IndexOutOfRange { index, len })?;
        debug!(constraint = index, from = spec.value, to = value, "What-if right-hand side");
        spec.value = value;
        Ok(scenario)
    }

    /// A copy without constraint `index`. Unnamed constraints after it are
    /// renumbered.
    pub fn without_constraint(&self, index: usize) -> Result<Scenario, ScenarioError> {
        let len = self.constraints.len();
        if index >= len {
            return Err(ScenarioError::IndexOutOfRange { index, len });
        }
        let mut scenario = self.clone();
        let removed = scenario.constraints.remove(index);
        debug!(constraint = %removed.resolved_name(index), "What-if without constraint");
        Ok(scenario)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pivotal_solver::ConstraintOp;

    fn production() -> Scenario {
        Scenario::new("3x + 2y", OpType::Max)
            .constraint(ConstraintSpec::new("x + y", ConstraintOp::Le, 4.0).named("sum"))
            .constraint(ConstraintSpec::new("x", ConstraintOp::Le, 3.0))
            .constraint(ConstraintSpec::new("y", ConstraintOp::Le, 3.0))
    }

    #[test]
    fn test_solve_report() {
        let report = production().solve(&Solver::new()).unwrap();

        assert!((report.solution.objective_value - 11.0).abs() < 1e-6);
        assert_eq!(report.sensitivity.len(), 3);
        assert_eq!(report.sensitivity[0].constraint, "sum");
        assert!((report.sensitivity[0].shadow_price - 2.0).abs() < 1e-9);
        assert!((report.sensitivity[1].shadow_price - 1.0).abs() < 1e-9);
        assert!((report.sensitivity[2].binding_rhs - 2.0).abs() < 1e-9);
        assert_eq!(report.plot.as_ref().map(|p| p.dimensions()), Some(2));
    }

    #[test]
    fn test_with_rhs_matches_shadow_price() {
        let scenario = production();
        let base = scenario.solve(&Solver::new()).unwrap();
        let bumped = scenario.with_rhs(0, 5.0).unwrap().solve(&Solver::new()).unwrap();

        let delta = bumped.solution.objective_value - base.solution.objective_value;
        assert!((delta - base.sensitivity[0].shadow_price).abs() < 1e-6, "delta = {delta}");
        // The original is untouched
        assert_eq!(scenario.constraints[0].value, 4.0);
    }

    #[test]
    fn test_without_constraint_renumbers() {
        let scenario = production().without_constraint(1).unwrap();
        assert_eq!(scenario.constraint_names(), vec!["sum", "C2"]);

        let report = scenario.solve(&Solver::new()).unwrap();
        assert!((report.solution.objective_value - 12.0).abs() < 1e-6);
    }

    #[test]
    fn test_index_out_of_range() {
        assert_eq!(
            production().with_rhs(7, 1.0),
            Err(ScenarioError::IndexOutOfRange { index: 7, len: 3 })
        );
        assert!(production().without_constraint(3).is_err());
    }

    #[test]
    fn test_errors_pass_through() {
        let infeasible = Scenario::new("x", OpType::Min)
            .constraint(ConstraintSpec::new("x", ConstraintOp::Ge, 10.0))
            .constraint(ConstraintSpec::new("x", ConstraintOp::Le, 5.0));
        assert!(matches!(
            infeasible.solve(&Solver::new()),
            Err(ScenarioError::Solve(SolveError::Infeasible { .. }))
        ));

        let empty = Scenario::new("x", OpType::Min);
        assert!(matches!(
            empty.solve(&Solver::new()),
            Err(ScenarioError::Build(BuildError::NoConstraints))
        ));
    }
}
