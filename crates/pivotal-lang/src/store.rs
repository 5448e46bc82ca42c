//! JSON file of saved problems.
//!
//! Only the scenario and the last solve's values are kept; tableaux and
//! sensitivity data are recomputed on load with [`SavedProblem::recompute`].

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use pivotal_solver::{Solution, Solver};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::scenario::{Report, Scenario, ScenarioError};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error on {path}: {source}")]
    Io { path: PathBuf, source: io::Error },
    #[error("Invalid problem file {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("No saved problem at index {index} ({len} saved)")]
    IndexOutOfRange { index: usize, len: usize },
}

/// Values of the last successful solve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedSolution {
    pub variables: IndexMap<String, f64>,
    #[serde(rename = "p")]
    pub objective_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SavedProblem {
    #[serde(flatten)]
    pub scenario: Scenario,
    pub solution: SavedSolution,
}

impl SavedProblem {
    pub fn new(scenario: Scenario, solution: &Solution) -> Self {
        Self {
            scenario,
            solution: SavedSolution {
                variables: solution.variable_values.clone(),
                objective_value: solution.objective_value,
            },
        }
    }

    /// Solve the saved scenario again to get its tableaux and sensitivity.
    pub fn recompute(&self, solver: &Solver) -> Result<Report, ScenarioError> {
        self.scenario.solve(solver)
    }
}

/// Saved problems backed by a JSON array on disk
#[derive(Debug)]
pub struct ProblemStore {
    path: PathBuf,
    problems: Vec<SavedProblem>,
}

impl ProblemStore {
    /// Load the store at `path`. A missing file is an empty store.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let problems = match fs::read_to_string(&path) {
            Ok(text) if text.trim().is_empty() => Vec::new(),
            Ok(text) => serde_json::from_str(&text).map_err(|source| StoreError::Json {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(source) => return Err(StoreError::Io { path, source }),
        };
        debug!(path = %path.display(), count = problems.len(), "Opened problem store");
        Ok(Self { path, problems })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn list(&self) -> &[SavedProblem] {
        &self.problems
    }

    pub fn len(&self) -> usize {
        self.problems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }

    pub fn get(&self, index: usize) -> Result<&SavedProblem, StoreError> {
        self.problems.get(index).ok_or(StoreError::IndexOutOfRange {
            index,
            len: self.problems.len(),
        })
    }

    pub fn push(&mut self, problem: SavedProblem) {
        self.problems.push(problem);
    }

    pub fn remove(&mut self, index: usize) -> Result<SavedProblem, StoreError> {
        if index >= self.problems.len() {
            return Err(StoreError::IndexOutOfRange {
                index,
                len: self.problems.len(),
            });
        }
        Ok(self.problems.remove(index))
    }

    /// Write the store back to its file.
    pub fn save(&self) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(&self.problems).map_err(|source| StoreError::Json {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&self.path, json).map_err(|source| StoreError::Io {
            path: self.path.clone(),
            source,
        })?;
        info!(path = %self.path.display(), count = self.problems.len(), "Saved problem store");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::ConstraintSpec;
    use pivotal_solver::{ConstraintOp, OpType};

    fn scenario() -> Scenario {
        Scenario::new("3x + 2y", OpType::Min)
            .with_objective_name("cost")
            .constraint(ConstraintSpec::new("x + y", ConstraintOp::Ge, 4.0))
            .constraint(ConstraintSpec::new("2x + y", ConstraintOp::Ge, 5.0).named("mix"))
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = ProblemStore::open(dir.path().join("saved.json")).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saved.json");

        let solver = Solver::new();
        let scenario = scenario();
        let report = scenario.solve(&solver).unwrap();

        let mut store = ProblemStore::open(&path).unwrap();
        store.push(SavedProblem::new(scenario.clone(), &report.solution));
        store.save().unwrap();

        let reloaded = ProblemStore::open(&path).unwrap();
        assert_eq!(reloaded.len(), 1);
        let saved = reloaded.get(0).unwrap();
        assert_eq!(saved.scenario, scenario);
        assert!((saved.solution.objective_value - 9.0).abs() < 1e-9);

        let again = saved.recompute(&solver).unwrap();
        assert_eq!(again.solution.tableau_history.len(), report.solution.tableau_history.len());
        assert_eq!(again.solution.variable_values, saved.solution.variables);
    }

    #[test]
    fn test_record_shape() {
        let solver = Solver::new();
        let scenario = scenario();
        let report = scenario.solve(&solver).unwrap();
        let value = serde_json::to_value(SavedProblem::new(scenario, &report.solution)).unwrap();

        assert_eq!(value["objectiveName"], "cost");
        assert_eq!(value["objectiveFunction"], "3x + 2y");
        assert_eq!(value["optimizationType"], "min");
        assert_eq!(value["constraints"][0]["operator"], ">=");
        assert_eq!(value["constraints"][1]["name"], "mix");
        assert_eq!(value["solution"]["p"], 9.0);
        assert!(value.get("tableauHistory").is_none());
    }

    #[test]
    fn test_remove_out_of_range() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ProblemStore::open(dir.path().join("saved.json")).unwrap();
        assert!(matches!(
            store.remove(0),
            Err(StoreError::IndexOutOfRange { index: 0, len: 0 })
        ));
    }

    #[test]
    fn test_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("saved.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(matches!(ProblemStore::open(&path), Err(StoreError::Json { .. })));
    }
}
