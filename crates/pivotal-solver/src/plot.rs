use indexmap::IndexMap;

use crate::problem::{Bound, Coefficients, Problem};
use crate::solution::Solution;

/// What a 2D or 3D feasible-region plot needs from a solved problem
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct PlotData {
    /// The problem's own variables, one per axis
    pub variables: Vec<String>,
    pub constraints: Vec<PlotConstraint>,
    /// Optimal value per axis
    pub optimum: Vec<f64>,
}

#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct PlotConstraint {
    pub name: String,
    pub coefficients: Coefficients,
    pub bound: Bound,
}

impl PlotData {
    pub fn dimensions(&self) -> usize {
        self.variables.len()
    }
}

/// Plot projection for problems with exactly 2 or 3 variables.
pub fn plot_data(problem: &Problem, solution: &Solution) -> Option<PlotData> {
    let variables: Vec<String> = problem.variable_names().map(str::to_string).collect();
    if !(2..=3).contains(&variables.len()) {
        return None;
    }

    let constraints = problem
        .constraints
        .iter()
        .map(|(name, &bound)| PlotConstraint {
            name: name.clone(),
            coefficients: variables
                .iter()
                .map(|v| (v.clone(), problem.coefficient(v, name)))
                .collect::<IndexMap<_, _>>(),
            bound,
        })
        .collect();

    let optimum = variables.iter().map(|v| solution.value(v)).collect();

    Some(PlotData {
        variables,
        constraints,
        optimum,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::OpType;
    use crate::simplex::Solver;

    fn problem_with(vars: &[&str]) -> Problem {
        let mut p = Problem::new("F", OpType::Max);
        p.add_constraint("c1", Bound::Max(10.0));
        for v in vars {
            p.set_coefficient(*v, "F", 1.0);
            p.set_coefficient(*v, "c1", 1.0);
        }
        p
    }

    #[test]
    fn test_plot_data_two_variables() {
        let p = problem_with(&["x", "y"]);
        let solution = Solver::new().solve(&p).unwrap();
        let plot = plot_data(&p, &solution).unwrap();

        assert_eq!(plot.dimensions(), 2);
        assert_eq!(plot.constraints.len(), 1);
        assert_eq!(plot.constraints[0].coefficients["y"], 1.0);
        assert_eq!(plot.constraints[0].bound, Bound::Max(10.0));
        assert_eq!(plot.optimum, vec![10.0, 0.0]);
    }

    #[test]
    fn test_plot_data_only_for_two_or_three_variables() {
        for vars in [&["x"][..], &["w", "x", "y", "z"][..]] {
            let p = problem_with(vars);
            let solution = Solver::new().solve(&p).unwrap();
            assert!(plot_data(&p, &solution).is_none());
        }

        let p = problem_with(&["x", "y", "z"]);
        let solution = Solver::new().solve(&p).unwrap();
        assert_eq!(plot_data(&p, &solution).unwrap().dimensions(), 3);
    }
}
