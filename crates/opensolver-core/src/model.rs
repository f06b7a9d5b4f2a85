use std::collections::{BTreeMap, HashSet};

use thiserror::Error;
use tracing::{debug, warn};

use crate::store::ProductMixStore;

/// Objective field name carried by every variable.
pub const PROFIT_FIELD: &str = "profit";

/// Keys the solver response uses alongside the per-product quantities.
pub const RESPONSE_KEYS: &[&str] = &["feasible", "bounded", "result", "isIntegral"];

/// Linear program in the shape consumed by the solver seam:
/// `{ optimize, opType, constraints: {name: {max}}, variables: {name: {field: coef}} }`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "camelCase")
)]
pub struct OptimizationRequest {
    /// Field of each variable that is optimized
    pub optimize: String,
    pub op_type: OpType,
    /// Upper bound per constraint field
    pub constraints: BTreeMap<String, Bound>,
    /// Coefficients per variable, keyed by field name
    pub variables: BTreeMap<String, BTreeMap<String, f64>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum OpType {
    Max,
    Min,
}

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Bound {
    pub max: f64,
}

impl OptimizationRequest {
    pub fn num_constraints(&self) -> usize {
        self.constraints.len()
    }

    pub fn num_variables(&self) -> usize {
        self.variables.len()
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("Resource {index} has no name")]
    EmptyResourceName { index: usize },
    #[error("Product {index} has no name")]
    EmptyProductName { index: usize },
    #[error("Resource name {0:?} is used more than once")]
    DuplicateResourceName(String),
    #[error("Product name {0:?} is used more than once")]
    DuplicateProductName(String),
    #[error("Name {0:?} is reserved by the solver")]
    ReservedName(String),
}

/// Build the request for the current grid, rejecting names that would
/// collide once resources and products are addressed by name.
pub fn build_request(store: &ProductMixStore) -> Result<OptimizationRequest, ModelError> {
    let mut seen = HashSet::new();
    for (index, resource) in store.resources().iter().enumerate() {
        if resource.name.is_empty() {
            return Err(ModelError::EmptyResourceName { index });
        }
        if resource.name == PROFIT_FIELD {
            return Err(ModelError::ReservedName(resource.name.clone()));
        }
        if !seen.insert(resource.name.as_str()) {
            return Err(ModelError::DuplicateResourceName(resource.name.clone()));
        }
    }

    let mut seen = HashSet::new();
    for (index, product) in store.products().iter().enumerate() {
        if product.name.is_empty() {
            return Err(ModelError::EmptyProductName { index });
        }
        if RESPONSE_KEYS.contains(&product.name.as_str()) {
            return Err(ModelError::ReservedName(product.name.clone()));
        }
        if !seen.insert(product.name.as_str()) {
            return Err(ModelError::DuplicateProductName(product.name.clone()));
        }
    }

    Ok(build_request_unchecked(store))
}

/// Build the request without name checks. Colliding names overwrite each
/// other, last row wins.
pub fn build_request_unchecked(store: &ProductMixStore) -> OptimizationRequest {
    let constraints: BTreeMap<String, Bound> = store
        .resources()
        .iter()
        .map(|r| (r.name.clone(), Bound { max: r.capacity.get() }))
        .collect();

    let mut variables = BTreeMap::new();
    for product in store.products() {
        let mut fields = BTreeMap::new();
        fields.insert(PROFIT_FIELD.to_string(), product.profit.get());
        for resource in store.resources() {
            fields.insert(resource.name.clone(), product.consumption_of(resource.id).get());
        }
        variables.insert(product.name.clone(), fields);
    }

    if constraints.len() != store.resources().len() || variables.len() != store.products().len() {
        warn!("duplicate names collapsed while building the request");
    }
    debug!(
        constraints = constraints.len(),
        variables = variables.len(),
        "optimization request built"
    );

    OptimizationRequest {
        optimize: PROFIT_FIELD.to_string(),
        op_type: OpType::Max,
        constraints,
        variables,
    }
}
