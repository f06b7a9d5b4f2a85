use std::fmt;
use std::fmt::Write as _;

use tracing::{debug, warn};

use crate::model::{ModelError, build_request};
use crate::solver::{LpSolver, SolverError, SolverResponse};
use crate::store::{ProductId, ProductMixStore, ResourceId};

pub const DEFAULT_CURRENCY: &str = "€";

pub const INFEASIBLE_MESSAGE: &str = "No feasible solution found. Please check your constraints.";

/// Planned output of one product.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ProductQuantity {
    pub product: ProductId,
    pub name: String,
    pub quantity: f64,
    /// `quantity * profit per unit`
    pub profit: f64,
}

/// How much of a resource the plan consumes.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ResourceUsage {
    pub resource: ResourceId,
    pub name: String,
    pub used: f64,
    pub capacity: f64,
}

impl ResourceUsage {
    pub fn slack(&self) -> f64 {
        self.capacity - self.used
    }

    /// Slack within `tolerance` relative to the capacity.
    pub fn is_binding(&self, tolerance: f64) -> bool {
        self.slack() <= tolerance * (1.0 + self.capacity.abs())
    }
}

/// Outcome of one solve, labeled with the grid's names.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize),
    serde(tag = "status", rename_all = "snake_case")
)]
pub enum MixReport {
    Optimal {
        /// One entry per product, in grid order
        quantities: Vec<ProductQuantity>,
        objective_value: f64,
        usage: Vec<ResourceUsage>,
    },
    Infeasible,
    Unbounded,
    SolverFailed { message: String },
}

/// Map a solver outcome back onto the grid.
///
/// Products the solver left out are reported at zero. Values are kept at
/// full precision; rounding happens in [`MixReport::render`].
pub fn map_response(
    store: &ProductMixStore,
    outcome: Result<SolverResponse, SolverError>,
) -> MixReport {
    let response = match outcome {
        Ok(response) => response,
        Err(e) => {
            warn!(error = %e, "solver failed");
            return MixReport::SolverFailed {
                message: e.to_string(),
            };
        }
    };

    if !response.feasible {
        debug!("solver reported an infeasible model");
        return MixReport::Infeasible;
    }
    if !response.bounded {
        debug!("solver reported an unbounded model");
        return MixReport::Unbounded;
    }

    let quantities: Vec<ProductQuantity> = store
        .products()
        .iter()
        .map(|p| {
            let quantity = response.values.get(&p.name).copied().unwrap_or(0.0).max(0.0);
            ProductQuantity {
                product: p.id,
                name: p.name.clone(),
                quantity,
                profit: quantity * p.profit.get(),
            }
        })
        .collect();

    let objective_value = response
        .result
        .unwrap_or_else(|| quantities.iter().map(|q| q.profit).sum());

    let usage = store
        .resources()
        .iter()
        .map(|r| {
            let used = store
                .products()
                .iter()
                .zip(&quantities)
                .map(|(p, q)| q.quantity * p.consumption_of(r.id).get())
                .sum();
            ResourceUsage {
                resource: r.id,
                name: r.name.clone(),
                used,
                capacity: r.capacity.get(),
            }
        })
        .collect();

    MixReport::Optimal {
        quantities,
        objective_value,
        usage,
    }
}

/// Build the request, run `solver`, and map its answer.
pub fn solve_mix(store: &ProductMixStore, solver: &dyn LpSolver) -> Result<MixReport, ModelError> {
    let request = build_request(store)?;
    let report = map_response(store, solver.solve(&request));
    debug!(status = report.status(), "product mix solved");
    Ok(report)
}

impl MixReport {
    pub fn status(&self) -> &'static str {
        match self {
            MixReport::Optimal { .. } => "optimal",
            MixReport::Infeasible => "infeasible",
            MixReport::Unbounded => "unbounded",
            MixReport::SolverFailed { .. } => "solver_failed",
        }
    }

    pub fn is_optimal(&self) -> bool {
        matches!(self, MixReport::Optimal { .. })
    }

    /// Quantity planned for the product called `name`, if optimal.
    pub fn quantity_of(&self, name: &str) -> Option<f64> {
        match self {
            MixReport::Optimal { quantities, .. } => {
                quantities.iter().find(|q| q.name == name).map(|q| q.quantity)
            }
            _ => None,
        }
    }

    pub fn objective_value(&self) -> Option<f64> {
        match self {
            MixReport::Optimal { objective_value, .. } => Some(*objective_value),
            _ => None,
        }
    }

    /// Human-readable report with quantities and money rounded to cents.
    pub fn render(&self, currency: &str) -> String {
        let mut out = String::new();
        match self {
            MixReport::Optimal {
                quantities,
                objective_value,
                usage,
            } => {
                let _ = writeln!(out, "Optimal mix:");
                for q in quantities {
                    let _ = writeln!(out, "  {}: {:.2} units", q.name, q.quantity);
                }
                let _ = writeln!(out, "Total profit: {}{:.2}", currency, objective_value);
                let _ = writeln!(out, "Resource usage:");
                for u in usage {
                    let marker = if u.is_binding(1e-9) { " (fully used)" } else { "" };
                    let _ = writeln!(out, "  {}: {:.2} / {:.2}{}", u.name, u.used, u.capacity, marker);
                }
            }
            MixReport::Infeasible => {
                let _ = writeln!(out, "{INFEASIBLE_MESSAGE}");
            }
            MixReport::Unbounded => {
                let _ = writeln!(
                    out,
                    "Profit is unbounded: a profitable product uses none of the limited resources."
                );
            }
            MixReport::SolverFailed { message } => {
                let _ = writeln!(out, "Solver error: {message}");
            }
        }
        out
    }
}

impl fmt::Display for MixReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(DEFAULT_CURRENCY))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::amount::Amount;
    use crate::model::OptimizationRequest;

    fn amount(v: f64) -> Amount {
        Amount::new(v).unwrap()
    }

    fn example_store() -> ProductMixStore {
        let mut store = ProductMixStore::new();
        store.rename_resource(0, "R1").unwrap();
        store.set_capacity(0, amount(100.0)).unwrap();
        store.rename_product(0, "A").unwrap();
        store.set_profit(0, amount(20.0)).unwrap();
        store.set_consumption(0, 0, amount(10.0)).unwrap();
        store.add_product().unwrap();
        store.rename_product(1, "B").unwrap();
        store.set_profit(1, amount(30.0)).unwrap();
        store.set_consumption(1, 0, amount(20.0)).unwrap();
        store
    }

    fn values(pairs: &[(&str, f64)]) -> BTreeMap<String, f64> {
        pairs.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_omitted_products_default_to_zero() {
        let store = example_store();
        let report = map_response(&store, Ok(SolverResponse::optimal(150.0, values(&[("A", 5.0)]))));

        assert_eq!(report.quantity_of("A"), Some(5.0));
        assert_eq!(report.quantity_of("B"), Some(0.0));
        assert_eq!(report.objective_value(), Some(150.0));

        let text = report.render("€");
        assert!(text.contains("A: 5.00 units"), "{text}");
        assert!(text.contains("B: 0.00 units"), "{text}");
        assert!(text.contains("Total profit: €150.00"), "{text}");
    }

    #[test]
    fn test_infeasible_has_no_quantities() {
        let store = example_store();
        let report = map_response(&store, Ok(SolverResponse::infeasible()));

        assert_eq!(report, MixReport::Infeasible);
        assert_eq!(report.quantity_of("A"), None);
        assert_eq!(report.to_string().trim(), INFEASIBLE_MESSAGE);
    }

    #[test]
    fn test_solver_error_is_distinct_from_infeasible() {
        let store = example_store();
        let report = map_response(&store, Err(SolverError::Other("crashed".to_string())));

        assert_eq!(
            report,
            MixReport::SolverFailed {
                message: "crashed".to_string()
            }
        );
        let text = report.render("$");
        assert!(text.contains("Solver error: crashed"));
        assert!(!text.contains(INFEASIBLE_MESSAGE));
    }

    #[test]
    fn test_unbounded_response() {
        let report = map_response(&example_store(), Ok(SolverResponse::unbounded()));
        assert_eq!(report.status(), "unbounded");
    }

    #[test]
    fn test_full_precision_is_kept() {
        let store = example_store();
        let report = map_response(&store, Ok(SolverResponse::optimal(66.666_666, values(&[("A", 3.333_333)]))));

        assert_eq!(report.quantity_of("A"), Some(3.333_333));
        let text = report.render("€");
        assert!(text.contains("A: 3.33 units"));
        assert!(text.contains("Total profit: €66.67"));
    }

    #[test]
    fn test_usage_and_missing_objective() {
        let store = example_store();
        let response = SolverResponse {
            feasible: true,
            bounded: true,
            result: None,
            values: values(&[("A", 2.0), ("B", 4.0)]),
        };
        let MixReport::Optimal {
            objective_value,
            usage,
            quantities,
        } = map_response(&store, Ok(response))
        else {
            panic!("expected optimal report");
        };

        assert_eq!(objective_value, 2.0 * 20.0 + 4.0 * 30.0);
        assert_eq!(quantities[1].profit, 120.0);
        assert_eq!(usage.len(), 1);
        assert_eq!(usage[0].used, 2.0 * 10.0 + 4.0 * 20.0);
        assert_eq!(usage[0].slack(), 0.0);
        assert!(usage[0].is_binding(1e-9));
    }

    #[test]
    fn test_large_capacity_is_binding_despite_round_off() {
        let mut store = example_store();
        store.set_capacity(0, amount(100_000.0)).unwrap();
        // 10 R1 per unit of A, so usage lands just under the capacity
        let response = SolverResponse::optimal(199_999.999_999_98, values(&[("A", 9_999.999_999_999)]));
        let report = map_response(&store, Ok(response));

        let MixReport::Optimal { usage, .. } = &report else {
            panic!("expected optimal report");
        };
        assert!(usage[0].slack() > 1e-9);
        assert!(usage[0].is_binding(1e-9));
        assert!(report.render("€").contains("(fully used)"));

        let half = ResourceUsage {
            resource: usage[0].resource,
            name: "R1".to_string(),
            used: 50_000.0,
            capacity: 100_000.0,
        };
        assert!(!half.is_binding(1e-9));
    }

    #[test]
    fn test_solve_mix_with_stub_solver() {
        let store = example_store();
        let stub = |request: &OptimizationRequest| {
            assert_eq!(request.num_variables(), 2);
            Ok::<_, SolverError>(SolverResponse::optimal(150.0, values(&[("A", 5.0)])))
        };

        let report = solve_mix(&store, &stub).unwrap();
        assert_eq!(report.quantity_of("B"), Some(0.0));
    }

    #[test]
    fn test_solve_mix_with_simplex() {
        let store = example_store();
        let report = solve_mix(&store, &crate::solver::SimplexSolver::new()).unwrap();

        assert!(report.is_optimal());
        assert!((report.quantity_of("A").unwrap() - 10.0).abs() < 1e-6);
        assert_eq!(report.quantity_of("B"), Some(0.0));
        assert!(report.render("€").contains("Total profit: €200.00"));
        assert!(report.render("€").contains("R1: 100.00 / 100.00 (fully used)"));
    }

    #[test]
    fn test_solve_mix_rejects_bad_names() {
        let mut store = example_store();
        store.rename_product(1, "A").unwrap();
        let never = |_: &OptimizationRequest| -> Result<SolverResponse, SolverError> {
            panic!("solver must not be called")
        };
        assert!(matches!(
            solve_mix(&store, &never),
            Err(ModelError::DuplicateProductName(_))
        ));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_report_json_is_tagged() {
        let json = serde_json::to_value(MixReport::Infeasible).unwrap();
        assert_eq!(json, serde_json::json!({ "status": "infeasible" }));
    }
}
