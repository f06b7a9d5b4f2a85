use tracing::{debug, trace};

use crate::problem::{LpProblem, ProblemError, Sense};
use crate::solution::{Solution, SolutionStatus};

/// Primal simplex solver for `A·x <= b`, `b >= 0`, `x >= 0` problems.
///
/// The all-slack basis is feasible for this class of problems, so a single
/// phase is enough. Entering columns follow Dantzig's rule until a run of
/// degenerate pivots is seen, after which Bland's rule takes over to rule
/// out cycling.
pub struct Solver {
    /// Maximum pivots before giving up
    max_iterations: usize,
    /// Tolerance for floating point comparisons
    tolerance: f64,
}

impl Default for Solver {
    fn default() -> Self {
        Self {
            max_iterations: 10000,
            tolerance: 1e-9,
        }
    }
}

impl Solver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn with_tolerance(mut self, tol: f64) -> Self {
        self.tolerance = tol;
        self
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn solve(&self, problem: &LpProblem) -> Result<Solution, ProblemError> {
        problem.validate()?;

        let mut tableau = Tableau::new(problem);
        let bland_threshold = tableau.width();
        let mut degenerate_run = 0;
        let mut iterations = 0;

        let status = loop {
            let use_bland = degenerate_run > bland_threshold;
            let Some(col) = self.entering_column(&tableau, use_bland) else {
                break SolutionStatus::Optimal;
            };
            if iterations >= self.max_iterations {
                debug!(iterations, "simplex pivot budget exhausted");
                break SolutionStatus::IterationLimit;
            }
            let Some(row) = self.leaving_row(&tableau, col) else {
                debug!(iterations, column = col, "objective unbounded");
                return Ok(Solution::unbounded(iterations));
            };

            if tableau.rhs(row) <= self.tolerance {
                degenerate_run += 1;
            } else {
                degenerate_run = 0;
            }

            trace!(row, col, use_bland, "pivot");
            tableau.pivot(row, col);
            iterations += 1;
        };

        let solution = self.extract_solution(&tableau, problem, status, iterations);
        debug!(
            status = ?solution.status,
            objective = solution.objective_value,
            iterations,
            "simplex finished"
        );
        Ok(solution)
    }

    /// Column with a positive reduced cost, or `None` at optimality.
    fn entering_column(&self, tableau: &Tableau, bland: bool) -> Option<usize> {
        let obj = tableau.objective_row();
        let candidates = obj[..tableau.width()]
            .iter()
            .enumerate()
            .filter(|(_, v)| **v > self.tolerance);

        if bland {
            return candidates.map(|(j, _)| j).next();
        }

        candidates
            .max_by(|a, b| a.1.partial_cmp(b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(j, _)| j)
    }

    /// Minimum-ratio row for `col`; ties go to the lowest basic index.
    fn leaving_row(&self, tableau: &Tableau, col: usize) -> Option<usize> {
        let mut best: Option<(usize, f64)> = None;

        for i in 0..tableau.rows() {
            let a = tableau.data[i][col];
            if a <= self.tolerance {
                continue;
            }
            let ratio = tableau.rhs(i) / a;
            best = match best {
                None => Some((i, ratio)),
                Some((r, best_ratio)) => {
                    if ratio < best_ratio - self.tolerance
                        || ((ratio - best_ratio).abs() <= self.tolerance
                            && tableau.basic_vars[i] < tableau.basic_vars[r])
                    {
                        Some((i, ratio))
                    } else {
                        Some((r, best_ratio))
                    }
                }
            };
        }

        best.map(|(i, _)| i)
    }

    fn extract_solution(
        &self,
        tableau: &Tableau,
        problem: &LpProblem,
        status: SolutionStatus,
        iterations: usize,
    ) -> Solution {
        let n_vars = problem.num_variables();

        let mut values = vec![0.0; n_vars];
        for (i, &basic) in tableau.basic_vars.iter().enumerate() {
            if basic < n_vars {
                let v = tableau.rhs(i);
                values[basic] = if v.abs() <= self.tolerance { 0.0 } else { v };
            }
        }

        let objective_value = dot(&problem.objective.coefficients, &values);

        let slacks = problem
            .constraints
            .iter()
            .map(|c| c.rhs - dot(&c.coefficients, &values))
            .collect();

        Solution {
            status,
            values,
            objective_value,
            slacks,
            iterations,
        }
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Constraint rows followed by the objective row. Columns are the
/// structural variables, one slack per constraint, then the RHS.
struct Tableau {
    data: Vec<Vec<f64>>,
    basic_vars: Vec<usize>,
}

impl Tableau {
    fn new(problem: &LpProblem) -> Self {
        let n_vars = problem.num_variables();
        let n_rows = problem.num_constraints();
        let n_cols = n_vars + n_rows + 1;

        let mut data = vec![vec![0.0; n_cols]; n_rows + 1];
        let mut basic_vars = Vec::with_capacity(n_rows);

        for (i, c) in problem.constraints.iter().enumerate() {
            data[i][..n_vars].copy_from_slice(&c.coefficients);
            data[i][n_vars + i] = 1.0;
            data[i][n_cols - 1] = c.rhs;
            basic_vars.push(n_vars + i);
        }

        // Reduced costs are stored as `c_j - z_j` for a maximization.
        for (j, &coef) in problem.objective.coefficients.iter().enumerate() {
            data[n_rows][j] = match problem.objective.sense {
                Sense::Maximize => coef,
                Sense::Minimize => -coef,
            };
        }

        Self { data, basic_vars }
    }

    fn rows(&self) -> usize {
        self.data.len() - 1
    }

    /// Number of pivotable columns.
    fn width(&self) -> usize {
        self.data[0].len() - 1
    }

    fn rhs(&self, row: usize) -> f64 {
        self.data[row][self.width()]
    }

    fn objective_row(&self) -> &[f64] {
        &self.data[self.rows()]
    }

    fn pivot(&mut self, row: usize, col: usize) {
        self.basic_vars[row] = col;

        let pivot_val = self.data[row][col];
        for v in self.data[row].iter_mut() {
            *v /= pivot_val;
        }

        let pivot_row = self.data[row].clone();
        for (i, r) in self.data.iter_mut().enumerate() {
            if i == row {
                continue;
            }
            let factor = r[col];
            if factor == 0.0 {
                continue;
            }
            for (v, p) in r.iter_mut().zip(&pivot_row) {
                *v -= factor * p;
            }
        }
    }
}
