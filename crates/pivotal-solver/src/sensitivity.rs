use crate::tableau::Tableau;

/// Shadow price and binding RHS of one constraint, read off a final tableau
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintSensitivity {
    /// Constraint name
    pub constraint: String,
    /// Augmentation column the constraint was matched to, if any survived
    pub column: Option<String>,
    /// Objective-row entry of that column
    pub shadow_price: f64,
    /// RHS of the row where that column is basic, or 0 when non-basic
    pub binding_rhs: f64,
}

/// Project shadow prices and binding RHS values out of `tableau` for each
/// constraint, in order.
///
/// Constraint `k` (1-based) is matched to the first column present among its
/// own name, `s{k}`, `e{k}` and `a{k}`. Constraints with no surviving column
/// (equalities, whose artificial is dropped before phase 2) report zeros.
/// The objective row is read as-is: under the minimize convention a shadow
/// price is the rate of change of the internal objective per unit of RHS.
pub fn sensitivity<S: AsRef<str>>(tableau: &Tableau, constraints: &[S]) -> Vec<ConstraintSensitivity> {
    let objective = tableau.objective_row();

    constraints
        .iter()
        .enumerate()
        .map(|(i, name)| {
            let name = name.as_ref();
            let k = i + 1;
            let candidates = [
                name.to_string(),
                format!("s{k}"),
                format!("e{k}"),
                format!("a{k}"),
            ];

            let matched = candidates
                .into_iter()
                .find_map(|c| tableau.column_index(&c).map(|col| (c, col)));

            match matched {
                Some((column, col)) => ConstraintSensitivity {
                    constraint: name.to_string(),
                    shadow_price: objective[col],
                    binding_rhs: tableau.value(&column),
                    column: Some(column),
                },
                None => ConstraintSensitivity {
                    constraint: name.to_string(),
                    column: None,
                    shadow_price: 0.0,
                    binding_rhs: 0.0,
                },
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::problem::{Bound, OpType, Problem};
    use crate::simplex::Solver;

    #[test]
    fn test_sensitivity_reads_final_tableau() {
        // Maximize 4x + 3y + 2z s.t. 2x + 3y + 2z <= 8, 3x + 2y + z <= 8
        let mut p = Problem::new("F", OpType::Max);
        p.add_constraint("c1", Bound::Max(8.0));
        p.add_constraint("c2", Bound::Max(8.0));
        for (var, obj, c1, c2) in [("x", 4.0, 2.0, 3.0), ("y", 3.0, 3.0, 2.0), ("z", 2.0, 2.0, 1.0)] {
            p.set_coefficient(var, "F", obj);
            p.set_coefficient(var, "c1", c1);
            p.set_coefficient(var, "c2", c2);
        }

        let solution = Solver::new().solve(&p).unwrap();
        let last = solution.final_tableau().unwrap();
        let rows = sensitivity(last, &["c1", "c2"]);

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].column.as_deref(), Some("s1"));
        assert!((rows[0].shadow_price - 0.5).abs() < 1e-9, "c1 price = {}", rows[0].shadow_price);
        assert!((rows[1].shadow_price - 1.0).abs() < 1e-9, "c2 price = {}", rows[1].shadow_price);
        // Both slacks left the basis
        assert_eq!(rows[0].binding_rhs, 0.0);
        assert_eq!(rows[1].binding_rhs, 0.0);
    }

    #[test]
    fn test_sensitivity_prefers_constraint_name_and_handles_dropped_columns() {
        let tableau = Tableau::new(
            vec!["x".into(), "cap".into(), "RHS".into()],
            vec!["cap".into(), "x".into()],
            vec![
                vec![0.0, 1.0, 2.0],
                vec![1.0, 0.0, 3.0],
                vec![0.0, 0.0, 6.0],
            ],
        );

        let rows = sensitivity(&tableau, &["cap".to_string(), "total".to_string()]);
        assert_eq!(rows[0].column.as_deref(), Some("cap"));
        assert_eq!(rows[0].binding_rhs, 2.0);
        assert_eq!(rows[1].column, None);
        assert_eq!(rows[1].shadow_price, 0.0);
    }
}
