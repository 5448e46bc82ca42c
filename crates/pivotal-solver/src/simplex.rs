use std::borrow::Cow;

use tracing::{debug, info, trace, warn};

use crate::problem::{Bound, Problem, ProblemError};
use crate::solution::{round3, Phase, Solution, SolveError, SolveOutcome};
use crate::tableau::{Tableau, RHS};

/// Two-phase tableau simplex solver
#[derive(Debug, Clone)]
pub struct Solver {
    /// Maximum pivots per phase
    max_iterations: usize,
    /// Largest phase 1 residual still accepted as feasible
    feasibility_tolerance: f64,
    /// Objective and pivot-column entries within this of zero count as zero
    tolerance: f64,
    /// Flip rows with a negative right-hand side before building the tableau
    normalize_rhs: bool,
}

impl Default for Solver {
    fn default() -> Self {
        Self {
            max_iterations: 50,
            feasibility_tolerance: 1e-8,
            tolerance: 1e-9,
            normalize_rhs: false,
        }
    }
}

/// How a single phase's pivot loop stopped.
enum Iteration {
    Optimal,
    Unbounded(usize),
    CapReached,
}

/// Mutable state of one solve.
struct Run {
    tableau: Tableau,
    artificials: Vec<String>,
    history: Vec<Tableau>,
}

impl Solver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_feasibility_tolerance(mut self, tol: f64) -> Self {
        self.feasibility_tolerance = tol;
        self
    }

    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    /// Multiply constraints with a negative right-hand side by -1 (flipping
    /// `<=` and `>=`) before solving. Off by default.
    pub fn with_rhs_normalization(mut self, enabled: bool) -> Self {
        self.normalize_rhs = enabled;
        self
    }

    pub fn max_iterations(&self) -> usize {
        self.max_iterations
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Solve the problem, reporting infeasible and unbounded problems as errors.
    pub fn solve(&self, problem: &Problem) -> Result<Solution, SolveError> {
        self.solve_outcome(problem)?.into_result()
    }

    /// Solve the problem using the two-phase simplex method, returning every
    /// terminal state as data. Only a structurally invalid problem is an error.
    pub fn solve_outcome(&self, problem: &Problem) -> Result<SolveOutcome, ProblemError> {
        problem.validate()?;
        let problem = self.prepare(problem);

        let mut run = Run::new(&problem);
        info!(
            variables = problem.num_variables(),
            constraints = problem.num_constraints(),
            artificials = run.artificials.len(),
            "Starting phase 1"
        );

        match self.iterate(&mut run, Phase::One) {
            Iteration::Optimal => {}
            Iteration::Unbounded(col) => return Ok(run.unbounded(col, Phase::One)),
            Iteration::CapReached => {
                warn!(cap = self.max_iterations, "Phase 1 hit the iteration cap");
                return Ok(SolveOutcome::NonConvergent(run.solution(&problem, Phase::One, false)));
            }
        }

        let residual = run.tableau.objective_rhs();
        // NaN residuals fail this check too
        if !(residual.abs() <= self.feasibility_tolerance) {
            info!(residual, "Phase 1 ended with artificial cost, problem is infeasible");
            return Ok(SolveOutcome::Infeasible {
                residual,
                history: run.history,
            });
        }

        run.start_phase_two(&problem);
        info!(columns = run.tableau.columns.len(), "Starting phase 2");

        match self.iterate(&mut run, Phase::Two) {
            Iteration::Optimal => {
                let solution = run.solution(&problem, Phase::Two, true);
                info!(
                    objective = solution.objective_value,
                    tableaux = solution.tableau_history.len(),
                    "Optimal solution found"
                );
                Ok(SolveOutcome::Optimal(solution))
            }
            Iteration::Unbounded(col) => Ok(run.unbounded(col, Phase::Two)),
            Iteration::CapReached => {
                warn!(cap = self.max_iterations, "Phase 2 hit the iteration cap");
                Ok(SolveOutcome::NonConvergent(run.solution(&problem, Phase::Two, false)))
            }
        }
    }

    /// The solver's private copy of the problem, normalized if configured.
    fn prepare<'a>(&self, problem: &'a Problem) -> Cow<'a, Problem> {
        let negative: Vec<String> = problem
            .constraints
            .iter()
            .filter(|(_, bound)| bound.rhs() < 0.0)
            .map(|(name, _)| name.clone())
            .collect();

        if negative.is_empty() {
            return Cow::Borrowed(problem);
        }
        if !self.normalize_rhs {
            warn!(constraints = ?negative, "Negative right-hand side left as is");
            return Cow::Borrowed(problem);
        }

        let mut normalized = problem.clone();
        for name in &negative {
            if let Some(bound) = normalized.constraints.get_mut(name) {
                *bound = bound.negated();
            }
            for row in normalized.variables.values_mut() {
                if let Some(coef) = row.get_mut(name) {
                    *coef = -*coef;
                }
            }
            debug!(constraint = %name, "Normalized negative right-hand side");
        }
        Cow::Owned(normalized)
    }

    /// Shared pivot loop for both phases.
    fn iterate(&self, run: &mut Run, phase: Phase) -> Iteration {
        for iteration in 0..self.max_iterations {
            let Some(col) = run.tableau.entering_column(self.tolerance) else {
                debug!(?phase, iteration, "Objective row has no negative entry");
                return Iteration::Optimal;
            };
            let Some(row) = run.tableau.leaving_row(col, self.tolerance) else {
                info!(?phase, column = %run.tableau.columns[col], "No leaving row, problem is unbounded");
                return Iteration::Unbounded(col);
            };

            debug!(
                ?phase,
                iteration,
                entering = %run.tableau.columns[col],
                leaving = %run.tableau.basis[row],
                ratio = run.tableau.rhs(row) / run.tableau.matrix[row][col],
                "Pivot"
            );
            run.tableau.pivot(row, col);
            run.snapshot();
        }

        // The cap may be reached exactly at optimality
        if run.tableau.entering_column(self.tolerance).is_none() {
            Iteration::Optimal
        } else {
            Iteration::CapReached
        }
    }
}

impl Run {
    /// Build the phase 1 tableau: problem columns, then per constraint a
    /// slack (`<=`), surplus and artificial (`>=`) or artificial (`=`)
    /// column, then RHS.
    fn new(problem: &Problem) -> Self {
        let mut columns: Vec<String> = problem.variable_names().map(str::to_string).collect();
        let mut artificials = Vec::new();
        // Per constraint: (basic column, surplus column) indices
        let mut augmented = Vec::with_capacity(problem.num_constraints());

        for (k, bound) in problem.constraints.values().enumerate() {
            let k = k + 1;
            match bound {
                Bound::Max(_) => {
                    columns.push(format!("s{k}"));
                    augmented.push((columns.len() - 1, None));
                }
                Bound::Min(_) => {
                    columns.push(format!("e{k}"));
                    columns.push(format!("a{k}"));
                    artificials.push(columns.len() - 1);
                    augmented.push((columns.len() - 1, Some(columns.len() - 2)));
                }
                Bound::Equal(_) => {
                    columns.push(format!("a{k}"));
                    artificials.push(columns.len() - 1);
                    augmented.push((columns.len() - 1, None));
                }
            }
        }
        columns.push(RHS.to_string());

        let width = columns.len();
        let mut matrix = Vec::with_capacity(problem.num_constraints() + 1);
        let mut basis = Vec::with_capacity(problem.num_constraints());

        for ((name, bound), &(basic, surplus)) in problem.constraints.iter().zip(&augmented) {
            let mut row = vec![0.0; width];
            for (j, variable) in problem.variable_names().enumerate() {
                row[j] = problem.coefficient(variable, name);
            }
            row[basic] = 1.0;
            if let Some(surplus) = surplus {
                row[surplus] = -1.0;
            }
            row[width - 1] = bound.rhs();
            trace!(constraint = %name, basic = %columns[basic], ?row, "Constraint row");

            basis.push(columns[basic].clone());
            matrix.push(row);
        }

        // Phase 1 objective: minimize the sum of the artificials
        let mut objective = vec![0.0; width];
        for &col in &artificials {
            objective[col] = 1.0;
        }
        matrix.push(objective);

        let artificials: Vec<String> = artificials.iter().map(|&col| columns[col].clone()).collect();
        let mut tableau = Tableau::new(columns, basis, matrix);
        for artificial in &artificials {
            if let Some(row) = tableau.basic_row(artificial) {
                tableau.eliminate_from_objective(row, 1.0);
            }
        }

        let mut run = Self {
            tableau,
            artificials,
            history: Vec::new(),
        };
        run.snapshot();
        run
    }

    fn snapshot(&mut self) {
        self.history.push(self.tableau.clone());
    }

    /// Drop the artificial columns and price the original objective against
    /// the current basis.
    fn start_phase_two(&mut self, problem: &Problem) {
        self.tableau.drop_columns(&self.artificials);

        // The engine always minimizes
        let sign = if problem.op_type.is_min() { 1.0 } else { -1.0 };
        let obj = self.tableau.num_rows();
        let rhs_col = self.tableau.rhs_index();
        let objective: Vec<f64> = self
            .tableau
            .columns
            .iter()
            .enumerate()
            .map(|(j, name)| {
                if j == rhs_col {
                    0.0
                } else {
                    sign * problem.coefficient(name, &problem.optimize)
                }
            })
            .collect();
        self.tableau.matrix[obj] = objective;

        for row in 0..obj {
            let Some(col) = self.tableau.column_index(&self.tableau.basis[row]) else {
                continue;
            };
            let factor = self.tableau.matrix[obj][col];
            if factor != 0.0 {
                self.tableau.eliminate_from_objective(row, factor);
            }
        }

        self.snapshot();
    }

    fn unbounded(self, col: usize, phase: Phase) -> SolveOutcome {
        SolveOutcome::Unbounded {
            column: self.tableau.columns[col].clone(),
            phase,
            history: self.history,
        }
    }

    fn solution(self, problem: &Problem, phase: Phase, converged: bool) -> Solution {
        let tableau = &self.tableau;
        let variable_values = tableau.columns[..tableau.rhs_index()]
            .iter()
            .map(|name| (name.clone(), tableau.value(name)))
            .collect();

        let objective_value = match phase {
            // Minimizing -z for max problems leaves +z in the RHS, and -z for min
            Phase::Two if problem.op_type.is_min() => round3(-tableau.objective_rhs()),
            Phase::Two => round3(tableau.objective_rhs()),
            // Phase 1's objective row prices the artificials; evaluate directly
            Phase::One => round3(
                problem
                    .variable_names()
                    .map(|name| problem.objective_coefficient(name) * tableau.value(name))
                    .sum(),
            ),
        };

        Solution {
            objective_value,
            variable_values,
            tableau_history: self.history,
            converged,
            phase,
            op_type: problem.op_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::OpType;

    fn problem(
        op_type: OpType,
        objective: &[(&str, f64)],
        constraints: &[(&str, &[(&str, f64)], Bound)],
    ) -> Problem {
        let mut p = Problem::new("F", op_type);
        for &(var, coef) in objective {
            p.set_coefficient(var, "F", coef);
        }
        for &(name, coefs, bound) in constraints {
            p.add_constraint(name, bound);
            for &(var, coef) in coefs {
                p.set_coefficient(var, name, coef);
            }
        }
        p.densify();
        p
    }

    fn assert_close(actual: f64, expected: f64, what: &str) {
        assert!((actual - expected).abs() < 1e-6, "{what} = {actual} (expected {expected})");
    }

    #[test]
    fn test_simple_maximization() {
        // Maximize: 3x + 2y
        // Subject to:
        //   x + y <= 4
        //   x <= 3
        //   y <= 3
        // Optimal: x=3, y=1, obj=11
        let p = problem(
            OpType::Max,
            &[("x", 3.0), ("y", 2.0)],
            &[
                ("sum", &[("x", 1.0), ("y", 1.0)], Bound::Max(4.0)),
                ("x_max", &[("x", 1.0)], Bound::Max(3.0)),
                ("y_max", &[("y", 1.0)], Bound::Max(3.0)),
            ],
        );

        let solution = Solver::new().solve(&p).unwrap();

        assert!(solution.converged);
        assert_eq!(solution.phase, Phase::Two);
        assert_close(solution.value("x"), 3.0, "x");
        assert_close(solution.value("y"), 1.0, "y");
        assert_close(solution.objective_value, 11.0, "obj");
        assert_close(solution.value("s3"), 2.0, "s3");
    }

    #[test]
    fn test_max_three_variables() {
        // Maximize 4x + 3y + 2z s.t. 2x + 3y + 2z <= 8, 3x + 2y + z <= 8
        let p = problem(
            OpType::Max,
            &[("x", 4.0), ("y", 3.0), ("z", 2.0)],
            &[
                ("c1", &[("x", 2.0), ("y", 3.0), ("z", 2.0)], Bound::Max(8.0)),
                ("c2", &[("x", 3.0), ("y", 2.0), ("z", 1.0)], Bound::Max(8.0)),
            ],
        );

        let solution = Solver::new().solve(&p).unwrap();

        assert_close(solution.objective_value, 12.0, "obj");
        assert_close(solution.value("x"), 2.0, "x");
        assert_close(solution.value("y"), 0.0, "y");
        assert_close(solution.value("z"), 2.0, "z");
        // initial, phase transition, two pivots
        assert_eq!(solution.tableau_history.len(), 4);
        assert_eq!(
            solution.final_tableau().unwrap().basis,
            vec!["z".to_string(), "x".to_string()]
        );
    }

    #[test]
    fn test_minimization_with_ge() {
        // Minimize 3x + 2y s.t. x + y >= 4, 2x + y >= 5
        let p = problem(
            OpType::Min,
            &[("x", 3.0), ("y", 2.0)],
            &[
                ("c1", &[("x", 1.0), ("y", 1.0)], Bound::Min(4.0)),
                ("c2", &[("x", 2.0), ("y", 1.0)], Bound::Min(5.0)),
            ],
        );

        let solution = Solver::new().solve(&p).unwrap();

        assert_close(solution.objective_value, 9.0, "obj");
        assert_close(solution.value("x"), 1.0, "x");
        assert_close(solution.value("y"), 3.0, "y");

        let history = &solution.tableau_history;
        assert_eq!(history.len(), 4);
        // Phase 1 starts with the artificials basic and reduced out of the objective row
        assert_eq!(history[0].basis, vec!["a1".to_string(), "a2".to_string()]);
        assert_eq!(history[0].objective_row(), &[-3.0, -2.0, 1.0, 0.0, 1.0, 0.0, -9.0]);
        // Phase 2 tableau has no artificial columns
        assert_eq!(history[3].columns, vec!["x", "y", "e1", "e2", "RHS"]);

        // Phase 1 ends with its objective at zero
        let transition = history
            .iter()
            .position(|t| t.column_index("a1").is_none())
            .unwrap();
        let residual = history[transition - 1].objective_rhs();
        assert!(residual.abs() <= 1e-8, "phase 1 residual = {residual}");
    }

    #[test]
    fn test_equality_constraint() {
        // Minimize x + 2y s.t. x + y = 10, x <= 4
        let p = problem(
            OpType::Min,
            &[("x", 1.0), ("y", 2.0)],
            &[
                ("total", &[("x", 1.0), ("y", 1.0)], Bound::Equal(10.0)),
                ("cap", &[("x", 1.0)], Bound::Max(4.0)),
            ],
        );

        let solution = Solver::new().solve(&p).unwrap();

        assert_close(solution.value("x"), 4.0, "x");
        assert_close(solution.value("y"), 6.0, "y");
        assert_close(solution.objective_value, 16.0, "obj");
    }

    #[test]
    fn test_max_with_ge_reprices_basic_columns() {
        // Maximize x + y s.t. x >= 1, x + y <= 5
        let p = problem(
            OpType::Max,
            &[("x", 1.0), ("y", 1.0)],
            &[
                ("floor", &[("x", 1.0)], Bound::Min(1.0)),
                ("cap", &[("x", 1.0), ("y", 1.0)], Bound::Max(5.0)),
            ],
        );

        let solution = Solver::new().solve(&p).unwrap();

        assert_close(solution.objective_value, 5.0, "obj");
        let last = solution.final_tableau().unwrap();
        assert!(last.is_basis_consistent(1e-9));
    }

    #[test]
    fn test_infeasible() {
        // x >= 10, x <= 5
        let p = problem(
            OpType::Min,
            &[("x", 1.0)],
            &[
                ("lower", &[("x", 1.0)], Bound::Min(10.0)),
                ("upper", &[("x", 1.0)], Bound::Max(5.0)),
            ],
        );

        let outcome = Solver::new().solve_outcome(&p).unwrap();
        match outcome {
            SolveOutcome::Infeasible { residual, ref history } => {
                assert_close(residual, -5.0, "residual");
                assert!(!history.is_empty());
            }
            other => panic!("expected infeasible, got {other:?}"),
        }

        assert!(matches!(
            Solver::new().solve(&p),
            Err(SolveError::Infeasible { .. })
        ));
    }

    #[test]
    fn test_unbounded() {
        // Maximize x with only y bounded
        let p = problem(
            OpType::Max,
            &[("x", 1.0), ("y", 0.0)],
            &[("c1", &[("y", 1.0)], Bound::Max(5.0))],
        );

        match Solver::new().solve(&p) {
            Err(SolveError::Unbounded { column, phase }) => {
                assert_eq!(column, "x");
                assert_eq!(phase, Phase::Two);
            }
            other => panic!("expected unbounded, got {other:?}"),
        }
    }

    #[test]
    fn test_iteration_cap_is_observable() {
        let p = problem(
            OpType::Max,
            &[("x", 4.0), ("y", 3.0), ("z", 2.0)],
            &[
                ("c1", &[("x", 2.0), ("y", 3.0), ("z", 2.0)], Bound::Max(8.0)),
                ("c2", &[("x", 3.0), ("y", 2.0), ("z", 1.0)], Bound::Max(8.0)),
            ],
        );

        let outcome = Solver::new().with_max_iterations(1).solve_outcome(&p).unwrap();
        let SolveOutcome::NonConvergent(solution) = outcome else {
            panic!("expected non-convergent outcome");
        };
        assert!(!solution.converged);
        assert_eq!(solution.phase, Phase::Two);
        assert_close(solution.objective_value, 10.667, "obj");

        let solution = Solver::new().with_max_iterations(1).solve(&p).unwrap();
        assert!(!solution.converged);
    }

    #[test]
    fn test_negative_rhs_normalization() {
        // Minimize x s.t. -x <= -3 (x >= 3)
        let p = problem(
            OpType::Min,
            &[("x", 1.0)],
            &[("c1", &[("x", -1.0)], Bound::Max(-3.0))],
        );

        let solution = Solver::new().with_rhs_normalization(true).solve(&p).unwrap();
        assert_close(solution.value("x"), 3.0, "x");
        assert_close(solution.objective_value, 3.0, "obj");
        assert!(solution.variable_values.contains_key("e1"));

        // Left as is the slack starts basic at -3 and the run stops right away
        let raw = Solver::new().solve(&p).unwrap();
        assert_close(raw.value("s1"), -3.0, "s1");
        assert_close(raw.value("x"), 0.0, "x");
    }

    #[test]
    fn test_solve_does_not_mutate_problem() {
        let p = problem(
            OpType::Min,
            &[("x", 1.0)],
            &[("c1", &[("x", -1.0)], Bound::Max(-3.0))],
        );
        let before = p.clone();
        let _ = Solver::new().with_rhs_normalization(true).solve(&p);
        assert_eq!(p, before);
    }

    #[test]
    fn test_tolerance_controls_pivot_selection() {
        let p = problem(
            OpType::Max,
            &[("x", 3.0), ("y", 2.0)],
            &[
                ("sum", &[("x", 1.0), ("y", 1.0)], Bound::Max(4.0)),
                ("x_max", &[("x", 1.0)], Bound::Max(3.0)),
            ],
        );

        let default = Solver::new().solve(&p).unwrap();
        assert_close(default.objective_value, 11.0, "obj");

        // Every reduced cost is within the tolerance, so the start is optimal
        let loose = Solver::new().with_tolerance(10.0).solve(&p).unwrap();
        assert_close(loose.objective_value, 0.0, "obj");
        assert_eq!(loose.tableau_history.len(), 2);
        assert_ne!(default, loose);
    }

    #[test]
    fn test_non_finite_values_are_rejected() {
        let p = problem(
            OpType::Min,
            &[("x", 1.0)],
            &[("c1", &[("x", 1.0)], Bound::Min(f64::NAN))],
        );
        assert!(matches!(
            Solver::new().solve(&p),
            Err(SolveError::InvalidProblem(ProblemError::NonFinite { .. }))
        ));

        let p = problem(
            OpType::Max,
            &[("x", 1.0)],
            &[("c1", &[("x", 1.0)], Bound::Max(f64::INFINITY))],
        );
        assert!(matches!(
            Solver::new().solve_outcome(&p),
            Err(ProblemError::NonFinite { .. })
        ));
    }

    #[test]
    fn test_invalid_problem() {
        let mut p = Problem::new("F", OpType::Max);
        p.set_coefficient("x", "F", 1.0);
        assert!(matches!(
            Solver::new().solve(&p),
            Err(SolveError::InvalidProblem(ProblemError::NoConstraints))
        ));
    }
}
