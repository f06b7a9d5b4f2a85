//! WASM bindings for the calculator page
//!
//! The page keeps one [`MixSession`] per product-mix form and calls back
//! into it on every row edit. Results are plain JSON-compatible objects.

use serde::Serialize;
use wasm_bindgen::prelude::*;

use crate::import::TabularInput;
use crate::model::{OptimizationRequest, build_request};
use crate::report::{DEFAULT_CURRENCY, MixReport, solve_mix};
use crate::savings::{SavingsGoal, SavingsPlan, plan};
use crate::solver::{LpSolver, SimplexSolver, SolverError, SolverResponse};
use crate::store::{ProductMixStore, StoreLimits};

fn to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(js_error)
}

fn js_error(e: impl std::fmt::Display) -> JsValue {
    js_sys::Error::new(&e.to_string()).into()
}

/// Editable product-mix grid
#[wasm_bindgen]
pub struct MixSession {
    store: ProductMixStore,
}

#[wasm_bindgen]
impl MixSession {
    #[wasm_bindgen(constructor)]
    pub fn new() -> MixSession {
        MixSession {
            store: ProductMixStore::new(),
        }
    }

    /// Session without the five-resource cap
    pub fn unbounded() -> MixSession {
        MixSession {
            store: ProductMixStore::with_limits(StoreLimits::unbounded()),
        }
    }

    pub fn can_add_resource(&self) -> bool {
        self.store.can_add_resource()
    }

    /// Returns false when the resource cap is reached
    pub fn add_resource(&mut self) -> bool {
        self.store.add_resource().is_ok()
    }

    /// Returns false when the row was kept (last resource or bad index)
    pub fn remove_resource(&mut self, index: usize) -> bool {
        self.store.remove_resource(index).is_some()
    }

    pub fn add_product(&mut self) -> bool {
        self.store.add_product().is_ok()
    }

    pub fn remove_product(&mut self, index: usize) -> bool {
        self.store.remove_product(index).is_some()
    }

    pub fn rename_resource(&mut self, index: usize, name: &str) -> Result<(), JsValue> {
        self.store.rename_resource(index, name).map_err(js_error)
    }

    pub fn rename_product(&mut self, index: usize, name: &str) -> Result<(), JsValue> {
        self.store.rename_product(index, name).map_err(js_error)
    }

    /// Unparseable text stores 0 and throws so the field can be flagged
    pub fn set_capacity(&mut self, index: usize, text: &str) -> Result<(), JsValue> {
        self.store.set_capacity_text(index, text).map_err(js_error)
    }

    pub fn set_profit(&mut self, index: usize, text: &str) -> Result<(), JsValue> {
        self.store.set_profit_text(index, text).map_err(js_error)
    }

    pub fn set_consumption(
        &mut self,
        product_index: usize,
        resource_index: usize,
        text: &str,
    ) -> Result<(), JsValue> {
        self.store
            .set_consumption_text(product_index, resource_index, text)
            .map_err(js_error)
    }

    /// Current rows for rendering
    pub fn snapshot(&self) -> Result<JsValue, JsValue> {
        to_js(&GridView::from(&self.store))
    }

    /// The model that would be handed to a solver
    pub fn request(&self) -> Result<JsValue, JsValue> {
        let request = build_request(&self.store).map_err(js_error)?;
        to_js(&request)
    }

    /// Solve with the bundled simplex
    pub fn solve(&self, currency: Option<String>) -> Result<JsValue, JsValue> {
        let report = solve_mix(&self.store, &SimplexSolver::new()).map_err(js_error)?;
        to_js(&SolveView::new(&report, currency.as_deref()))
    }

    /// Solve with a page-provided function taking the model object and
    /// returning `{feasible, result, <product>: qty}`
    pub fn solve_with(&self, solver: &js_sys::Function, currency: Option<String>) -> Result<JsValue, JsValue> {
        let report = solve_mix(&self.store, &JsSolver { function: solver }).map_err(js_error)?;
        to_js(&SolveView::new(&report, currency.as_deref()))
    }
}

impl Default for MixSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Build a session from the comma-separated entry form
#[wasm_bindgen]
pub fn import_mix(products: &str, profits: &str, usage: &str, capacities: &str) -> Result<MixSession, JsValue> {
    let input = TabularInput {
        products,
        profits,
        usage,
        capacities,
    };
    let store = input.to_store(StoreLimits::unbounded()).map_err(js_error)?;
    Ok(MixSession { store })
}

/// Monthly contribution needed to reach a savings goal
#[wasm_bindgen]
pub fn plan_savings(
    target: f64,
    months: u32,
    annual_rate_pct: f64,
    initial: f64,
    currency: Option<String>,
) -> Result<JsValue, JsValue> {
    let goal = SavingsGoal {
        target,
        months,
        annual_rate_pct,
        initial,
    };
    let plan = plan(&goal);
    let text = plan.render(currency.as_deref().unwrap_or(DEFAULT_CURRENCY));
    to_js(&PlanView { plan: &plan, text })
}

struct JsSolver<'a> {
    function: &'a js_sys::Function,
}

impl LpSolver for JsSolver<'_> {
    fn solve(&self, request: &OptimizationRequest) -> Result<SolverResponse, SolverError> {
        let model = request
            .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
            .map_err(|e| SolverError::InvalidModel(e.to_string()))?;
        let raw = self
            .function
            .call1(&JsValue::NULL, &model)
            .map_err(|e| SolverError::Other(describe_js_error(&e)))?;
        serde_wasm_bindgen::from_value(raw).map_err(|e| SolverError::Other(e.to_string()))
    }
}

fn describe_js_error(value: &JsValue) -> String {
    value
        .as_string()
        .or_else(|| value.dyn_ref::<js_sys::Error>().map(|e| String::from(e.message())))
        .unwrap_or_else(|| "the solver threw an exception".to_string())
}

#[derive(Serialize)]
struct GridView {
    resources: Vec<ResourceRow>,
    products: Vec<ProductRow>,
    can_add_resource: bool,
}

#[derive(Serialize)]
struct ResourceRow {
    name: String,
    capacity: f64,
}

#[derive(Serialize)]
struct ProductRow {
    name: String,
    profit: f64,
    /// Per resource, in row order
    consumption: Vec<f64>,
}

impl From<&ProductMixStore> for GridView {
    fn from(store: &ProductMixStore) -> Self {
        GridView {
            resources: store
                .resources()
                .iter()
                .map(|r| ResourceRow {
                    name: r.name.clone(),
                    capacity: r.capacity.get(),
                })
                .collect(),
            products: store
                .products()
                .iter()
                .map(|p| ProductRow {
                    name: p.name.clone(),
                    profit: p.profit.get(),
                    consumption: store
                        .resources()
                        .iter()
                        .map(|r| p.consumption_of(r.id).get())
                        .collect(),
                })
                .collect(),
            can_add_resource: store.can_add_resource(),
        }
    }
}

#[derive(Serialize)]
struct SolveView<'a> {
    #[serde(flatten)]
    report: &'a MixReport,
    text: String,
}

impl<'a> SolveView<'a> {
    fn new(report: &'a MixReport, currency: Option<&str>) -> Self {
        SolveView {
            report,
            text: report.render(currency.unwrap_or(DEFAULT_CURRENCY)),
        }
    }
}

#[derive(Serialize)]
struct PlanView<'a> {
    #[serde(flatten)]
    plan: &'a SavingsPlan,
    text: String,
}
