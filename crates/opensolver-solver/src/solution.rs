/// The result of solving an LP problem
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Solution {
    /// Solution status
    pub status: SolutionStatus,
    /// Optimal values for each variable
    pub values: Vec<f64>,
    /// Objective value at `values`
    pub objective_value: f64,
    /// Slack left in each constraint (`rhs - lhs`)
    pub slacks: Vec<f64>,
    /// Number of pivots performed
    pub iterations: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SolutionStatus {
    /// An optimal solution was found
    Optimal,
    /// The objective can grow without limit
    Unbounded,
    /// The pivot budget ran out before optimality was proven
    IterationLimit,
}

impl Solution {
    pub fn unbounded(iterations: usize) -> Self {
        Self {
            status: SolutionStatus::Unbounded,
            values: Vec::new(),
            objective_value: f64::INFINITY,
            slacks: Vec::new(),
            iterations,
        }
    }

    pub fn is_optimal(&self) -> bool {
        self.status == SolutionStatus::Optimal
    }

    /// Names of constraints with no slack left.
    pub fn binding<'a>(&self, names: &'a [String], tolerance: f64) -> Vec<&'a str> {
        self.slacks
            .iter()
            .zip(names)
            .filter(|(slack, _)| slack.abs() <= tolerance)
            .map(|(_, name)| name.as_str())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binding_constraints_by_slack() {
        let solution = Solution {
            status: SolutionStatus::Optimal,
            values: vec![10.0],
            objective_value: 200.0,
            slacks: vec![0.0, 4.5],
            iterations: 1,
        };
        let names = vec!["machine".to_string(), "labor".to_string()];
        assert_eq!(solution.binding(&names, 1e-9), vec!["machine"]);
    }

    #[test]
    fn test_unbounded_is_not_optimal() {
        let solution = Solution::unbounded(3);
        assert!(!solution.is_optimal());
        assert!(solution.values.is_empty());
    }
}
