pub mod amount;
pub mod import;
pub mod model;
pub mod report;
pub mod savings;
pub mod solver;
pub mod store;

#[cfg(feature = "wasm")]
pub mod wasm;

pub use amount::{Amount, AmountError};
pub use import::{ImportError, ProductSpec, ResourceSpec, Scenario, TabularInput};
pub use model::{Bound, ModelError, OpType, OptimizationRequest, PROFIT_FIELD, RESPONSE_KEYS, build_request, build_request_unchecked};
pub use report::{MixReport, ProductQuantity, ResourceUsage, map_response, solve_mix};
pub use savings::{SavingsError, SavingsGoal, SavingsPlan, plan};
pub use solver::{LpSolver, SimplexSolver, SolverError, SolverResponse};
pub use store::{Product, ProductId, ProductMixStore, Resource, ResourceId, StoreError, StoreLimits};
