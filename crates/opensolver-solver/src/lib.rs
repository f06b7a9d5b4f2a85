mod problem;
mod simplex;
mod solution;

pub use problem::{Constraint, LpProblem, Objective, ProblemError, Sense};
pub use simplex::Solver;
pub use solution::{Solution, SolutionStatus};
