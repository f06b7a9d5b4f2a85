//! The LP solving capability, seen from the model builder.
//!
//! A solver receives an [`OptimizationRequest`] and answers with a
//! [`SolverResponse`] in the flat `{feasible, result, <variable>: qty}`
//! shape, or fails outright. [`SimplexSolver`] adapts the bundled simplex
//! crate; tests and the browser inject their own.

use std::collections::BTreeMap;

use opensolver_solver::{LpProblem, Sense, SolutionStatus, Solver};
use thiserror::Error;
use tracing::debug;

use crate::model::{OpType, OptimizationRequest};

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(from = "wire::RawResponse")
)]
pub struct SolverResponse {
    pub feasible: bool,
    /// False when the objective can grow without limit
    pub bounded: bool,
    /// Objective value at the optimum
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub result: Option<f64>,
    /// Quantity per variable; variables at zero may be omitted
    #[cfg_attr(feature = "serde", serde(flatten))]
    pub values: BTreeMap<String, f64>,
}

impl SolverResponse {
    pub fn optimal(result: f64, values: BTreeMap<String, f64>) -> Self {
        Self {
            feasible: true,
            bounded: true,
            result: Some(result),
            values,
        }
    }

    pub fn infeasible() -> Self {
        Self {
            feasible: false,
            bounded: true,
            result: None,
            values: BTreeMap::new(),
        }
    }

    pub fn unbounded() -> Self {
        Self {
            feasible: true,
            bounded: false,
            result: None,
            values: BTreeMap::new(),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverError {
    #[error("Malformed model: {0}")]
    InvalidModel(String),
    #[error("No optimum found within {0} iterations")]
    IterationLimit(usize),
    #[error("{0}")]
    Other(String),
}

pub trait LpSolver {
    fn solve(&self, request: &OptimizationRequest) -> Result<SolverResponse, SolverError>;
}

impl<F> LpSolver for F
where
    F: Fn(&OptimizationRequest) -> Result<SolverResponse, SolverError>,
{
    fn solve(&self, request: &OptimizationRequest) -> Result<SolverResponse, SolverError> {
        self(request)
    }
}

/// [`LpSolver`] backed by the bundled dense simplex.
#[derive(Default)]
pub struct SimplexSolver {
    solver: Solver,
}

impl SimplexSolver {
    pub fn new() -> Self {
        Self::default()
    }
}

impl From<Solver> for SimplexSolver {
    fn from(solver: Solver) -> Self {
        Self { solver }
    }
}

impl LpSolver for SimplexSolver {
    fn solve(&self, request: &OptimizationRequest) -> Result<SolverResponse, SolverError> {
        let problem = to_problem(request);
        let solution = self
            .solver
            .solve(&problem)
            .map_err(|e| SolverError::InvalidModel(e.to_string()))?;

        match solution.status {
            SolutionStatus::Optimal => {
                // Zero-valued variables are left out of the response.
                let values = problem
                    .variables
                    .iter()
                    .zip(&solution.values)
                    .filter(|(_, v)| **v > self.solver.tolerance())
                    .map(|(name, v)| (name.clone(), *v))
                    .collect();
                Ok(SolverResponse::optimal(solution.objective_value, values))
            }
            SolutionStatus::Unbounded => Ok(SolverResponse::unbounded()),
            SolutionStatus::IterationLimit => Err(SolverError::IterationLimit(solution.iterations)),
        }
    }
}

/// Dense form of a request: one column per variable, one row per constraint.
/// Fields a variable does not mention have a zero coefficient.
fn to_problem(request: &OptimizationRequest) -> LpProblem {
    let names: Vec<String> = request.variables.keys().cloned().collect();
    let mut problem = LpProblem::new(names);

    let objective = request
        .variables
        .values()
        .map(|fields| fields.get(&request.optimize).copied().unwrap_or(0.0))
        .collect();
    let sense = match request.op_type {
        OpType::Max => Sense::Maximize,
        OpType::Min => Sense::Minimize,
    };
    problem.set_objective(objective, sense);

    for (name, bound) in &request.constraints {
        let row = request
            .variables
            .values()
            .map(|fields| fields.get(name).copied().unwrap_or(0.0))
            .collect();
        problem.add_constraint(name.clone(), row, bound.max);
    }

    debug!(
        variables = problem.num_variables(),
        constraints = problem.num_constraints(),
        "request lowered to dense LP"
    );
    problem
}

#[cfg(feature = "serde")]
mod wire {
    use std::collections::BTreeMap;

    use super::SolverResponse;

    /// Solver output as received; non-numeric extra keys are dropped.
    #[derive(serde::Deserialize)]
    pub(super) struct RawResponse {
        feasible: bool,
        #[serde(default = "default_bounded")]
        bounded: bool,
        #[serde(default)]
        result: Option<f64>,
        #[serde(flatten)]
        rest: BTreeMap<String, RawField>,
    }

    #[derive(serde::Deserialize)]
    #[serde(untagged)]
    enum RawField {
        Number(f64),
        Other(serde::de::IgnoredAny),
    }

    fn default_bounded() -> bool {
        true
    }

    impl From<RawResponse> for SolverResponse {
        fn from(raw: RawResponse) -> Self {
            let values = raw
                .rest
                .into_iter()
                .filter_map(|(name, field)| match field {
                    RawField::Number(v) => Some((name, v)),
                    RawField::Other(_) => None,
                })
                .collect();
            Self {
                feasible: raw.feasible,
                bounded: raw.bounded,
                result: raw.result,
                values,
            }
        }
    }
}
