use std::fmt;

/// Label of the right-hand side column.
pub const RHS: &str = "RHS";

/// A dense simplex tableau.
///
/// Rows `0..basis.len()` are constraint rows, the last row is the current
/// objective row. The last column is always [`RHS`]. The objective row is
/// read under a minimize convention: a negative entry marks a column whose
/// entry would decrease the objective.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq)]
pub struct Tableau {
    /// Column labels, ending with [`RHS`]
    pub columns: Vec<String>,
    /// Basic variable of each constraint row
    pub basis: Vec<String>,
    /// `basis.len() + 1` rows by `columns.len()` entries
    pub matrix: Vec<Vec<f64>>,
}

/// The pivot the next simplex iteration would perform on a tableau.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PivotHint {
    /// Entering column
    pub column: usize,
    /// Leaving row, `None` when the column is unbounded
    pub row: Option<usize>,
}

impl Tableau {
    pub fn new(columns: Vec<String>, basis: Vec<String>, matrix: Vec<Vec<f64>>) -> Self {
        Self {
            columns,
            basis,
            matrix,
        }
    }

    /// Number of constraint rows.
    pub fn num_rows(&self) -> usize {
        self.basis.len()
    }

    pub fn rhs_index(&self) -> usize {
        self.columns.len() - 1
    }

    pub fn objective_row(&self) -> &[f64] {
        &self.matrix[self.num_rows()]
    }

    pub fn objective_rhs(&self) -> f64 {
        self.objective_row()[self.rhs_index()]
    }

    pub fn rhs(&self, row: usize) -> f64 {
        self.matrix[row][self.rhs_index()]
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns[..self.rhs_index()].iter().position(|c| c == name)
    }

    /// Row in which `name` is basic.
    pub fn basic_row(&self, name: &str) -> Option<usize> {
        self.basis.iter().position(|b| b == name)
    }

    /// Current value of a column: its row's RHS when basic, otherwise 0.
    pub fn value(&self, name: &str) -> f64 {
        self.basic_row(name).map(|row| self.rhs(row)).unwrap_or(0.0)
    }

    /// Most negative objective-row entry below `-tolerance`, first
    /// occurrence on ties.
    pub fn entering_column(&self, tolerance: f64) -> Option<usize> {
        let objective = self.objective_row();
        let mut min_val = -tolerance;
        let mut min_col = None;

        for (j, &val) in objective[..self.rhs_index()].iter().enumerate() {
            if val < min_val {
                min_val = val;
                min_col = Some(j);
            }
        }

        min_col
    }

    /// Minimum ratio test over rows whose entry in `col` exceeds `tolerance`,
    /// first occurrence on ties.
    pub fn leaving_row(&self, col: usize, tolerance: f64) -> Option<usize> {
        let rhs_col = self.rhs_index();
        let mut min_ratio = f64::INFINITY;
        let mut min_row = None;

        for (i, row) in self.matrix[..self.num_rows()].iter().enumerate() {
            let val = row[col];
            if val > tolerance {
                let ratio = row[rhs_col] / val;
                if min_row.is_none() || ratio < min_ratio {
                    min_ratio = ratio;
                    min_row = Some(i);
                }
            }
        }

        min_row
    }

    /// The pivot the next iteration would take, or `None` when the objective
    /// row has no entry below `-tolerance`.
    pub fn pivot_hint(&self, tolerance: f64) -> Option<PivotHint> {
        let column = self.entering_column(tolerance)?;
        Some(PivotHint {
            column,
            row: self.leaving_row(column, tolerance),
        })
    }

    /// Gauss-Jordan pivot on (`row`, `col`); `col` becomes basic in `row`.
    pub fn pivot(&mut self, row: usize, col: usize) {
        let pivot_val = self.matrix[row][col];
        for val in self.matrix[row].iter_mut() {
            *val /= pivot_val;
        }

        let pivot_row = self.matrix[row].clone();
        for (i, other) in self.matrix.iter_mut().enumerate() {
            if i == row {
                continue;
            }
            let factor = other[col];
            if factor == 0.0 {
                continue;
            }
            for (val, p) in other.iter_mut().zip(&pivot_row) {
                *val -= factor * p;
            }
        }

        self.basis[row] = self.columns[col].clone();
    }

    /// Subtract `factor * matrix[row]` from the objective row.
    pub(crate) fn eliminate_from_objective(&mut self, row: usize, factor: f64) {
        let obj = self.num_rows();
        let (rows, objective) = self.matrix.split_at_mut(obj);
        for (val, r) in objective[0].iter_mut().zip(&rows[row]) {
            *val -= factor * r;
        }
    }

    /// Remove the named columns from the labels and from every row.
    pub(crate) fn drop_columns(&mut self, names: &[String]) {
        let keep: Vec<bool> = self.columns.iter().map(|c| !names.contains(c)).collect();
        for row in self.matrix.iter_mut() {
            let mut flags = keep.iter();
            row.retain(|_| *flags.next().unwrap_or(&true));
        }
        self.columns.retain(|c| !names.contains(c));
    }

    /// Every basic column present in the tableau is the unit vector of its
    /// row, objective row included.
    pub fn is_basis_consistent(&self, tolerance: f64) -> bool {
        self.basis.iter().enumerate().all(|(r, name)| {
            let Some(col) = self.column_index(name) else {
                // Artificial still basic after its column was dropped
                return true;
            };
            self.matrix.iter().enumerate().all(|(i, row)| {
                let expected = if i == r { 1.0 } else { 0.0 };
                (row[col] - expected).abs() <= tolerance
            })
        })
    }
}

impl fmt::Display for Tableau {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self
            .columns
            .iter()
            .chain(self.basis.iter())
            .map(|c| c.len() + 1)
            .max()
            .unwrap_or(0)
            .max(9);

        write!(f, "{:<width$}", "Basis")?;
        for column in &self.columns {
            write!(f, "{:>width$}", column)?;
        }
        writeln!(f)?;

        for (i, row) in self.matrix.iter().enumerate() {
            let label = match self.basis.get(i) {
                Some(name) => format!("*{}", name),
                None => "Z".to_string(),
            };
            write!(f, "{:<width$}", label)?;
            for &val in row {
                // Rounding first keeps -0.0004 from printing as -0.000
                let rounded = (val * 1000.0).round() / 1000.0 + 0.0;
                write!(f, "{:>width$.3}", rounded)?;
            }
            writeln!(f)?;
        }

        Ok(())
    }
}
