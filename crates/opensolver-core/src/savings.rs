//! Goal-savings planner: the monthly contribution that grows an initial
//! deposit into a target amount.

use std::fmt::Write as _;

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SavingsGoal {
    /// Amount to reach
    pub target: f64,
    /// Number of monthly contributions
    pub months: u32,
    /// Expected annual return, in percent
    pub annual_rate_pct: f64,
    /// Amount invested up front
    pub initial: f64,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize),
    serde(tag = "outcome", rename_all = "snake_case")
)]
pub enum SavingsPlan {
    /// The initial amount already covers the target
    GoalMet { surplus: f64 },
    /// Compounding the initial amount alone reaches the target
    GrowthCoversGoal { projected_initial: f64 },
    Contribution {
        monthly: f64,
        /// Value of the initial amount after `months`
        projected_initial: f64,
        total_contributed: f64,
    },
    InvalidInput { reason: SavingsError },
}

#[derive(Error, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum SavingsError {
    #[error("{0} must be a finite number")]
    NotFinite(&'static str),
    #[error("{0} must not be negative")]
    Negative(&'static str),
    #[error("The number of months must be greater than zero")]
    NoMonths,
    #[error("The inputs do not produce a positive contribution")]
    NoContribution,
}

impl SavingsGoal {
    /// Monthly rate as a fraction.
    pub fn monthly_rate(&self) -> f64 {
        self.annual_rate_pct / 1200.0
    }

    fn validate(&self) -> Result<(), SavingsError> {
        let fields = [
            ("Target", self.target),
            ("Annual rate", self.annual_rate_pct),
            ("Initial amount", self.initial),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(SavingsError::NotFinite(name));
            }
            if value < 0.0 {
                return Err(SavingsError::Negative(name));
            }
        }
        Ok(())
    }
}

/// Required monthly contribution `(G - P(1+r)^n) r / ((1+r)^n - 1)`, or
/// `(G - P) / n` without interest.
pub fn plan(goal: &SavingsGoal) -> SavingsPlan {
    if let Err(reason) = goal.validate() {
        return SavingsPlan::InvalidInput { reason };
    }
    if goal.target <= goal.initial {
        return SavingsPlan::GoalMet {
            surplus: goal.initial - goal.target,
        };
    }
    if goal.months == 0 {
        return SavingsPlan::InvalidInput {
            reason: SavingsError::NoMonths,
        };
    }

    let n = f64::from(goal.months);
    let r = goal.monthly_rate();
    let (monthly, projected_initial) = if r > 0.0 {
        let growth = (1.0 + r).powf(n);
        let projected = goal.initial * growth;
        if projected >= goal.target {
            return SavingsPlan::GrowthCoversGoal {
                projected_initial: projected,
            };
        }
        ((goal.target - projected) * r / (growth - 1.0), projected)
    } else {
        ((goal.target - goal.initial) / n, goal.initial)
    };

    if monthly > 0.0 && monthly.is_finite() {
        SavingsPlan::Contribution {
            monthly,
            projected_initial,
            total_contributed: monthly * n,
        }
    } else {
        SavingsPlan::InvalidInput {
            reason: SavingsError::NoContribution,
        }
    }
}

impl SavingsPlan {
    pub fn render(&self, currency: &str) -> String {
        let mut out = String::new();
        match self {
            SavingsPlan::GoalMet { surplus } => {
                let _ = writeln!(
                    out,
                    "Your initial investment already meets the goal ({currency}{surplus:.2} to spare)."
                );
            }
            SavingsPlan::GrowthCoversGoal { projected_initial } => {
                let _ = writeln!(
                    out,
                    "Your initial investment grows to {currency}{projected_initial:.2}, enough to reach the goal without contributions."
                );
            }
            SavingsPlan::Contribution {
                monthly,
                projected_initial,
                total_contributed,
            } => {
                let _ = writeln!(out, "Monthly contribution needed: {currency}{monthly:.2}");
                let _ = writeln!(out, "Initial investment grows to: {currency}{projected_initial:.2}");
                let _ = writeln!(out, "Total contributed: {currency}{total_contributed:.2}");
            }
            SavingsPlan::InvalidInput { reason } => {
                let _ = writeln!(out, "Please check your inputs: {reason}");
            }
        }
        out
    }
}
