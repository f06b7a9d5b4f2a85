//! Whole-problem entry: the comma-separated form and scenario documents.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::debug;

use crate::amount::{Amount, AmountError};
use crate::store::{ProductMixStore, StoreError, StoreLimits};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ImportError {
    #[error("At least one product is required")]
    NoProducts,
    #[error("At least one resource is required")]
    NoResources,
    #[error("Product {0} has no name")]
    EmptyProductName(usize),
    #[error("Expected {expected} profits (one per product), found {found}")]
    ProfitCount { expected: usize, found: usize },
    #[error("Usage row {row} has {found} values, expected {expected} (one per product)")]
    UsageRow {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("Expected {expected} capacities (one per usage row), found {found}")]
    CapacityCount { expected: usize, found: usize },
    #[error("Invalid number in {location}: {source}")]
    InvalidNumber {
        location: String,
        #[source]
        source: AmountError,
    },
    #[error("Product {product:?} refers to unknown resource {resource:?}")]
    UnknownResource { product: String, resource: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The four text fields of the bulk entry form. Usage rows are resources,
/// columns are products; rows are separated by newlines or `;`.
#[derive(Debug, Clone, Copy)]
pub struct TabularInput<'a> {
    pub products: &'a str,
    pub profits: &'a str,
    pub usage: &'a str,
    pub capacities: &'a str,
}

fn split_list(text: &str) -> Vec<&str> {
    let text = text.trim();
    if text.is_empty() {
        return Vec::new();
    }
    text.split(',').map(str::trim).collect()
}

fn parse_list(text: &str, what: &str) -> Result<Vec<Amount>, ImportError> {
    split_list(text)
        .into_iter()
        .enumerate()
        .map(|(i, cell)| {
            Amount::parse(cell).map_err(|source| ImportError::InvalidNumber {
                location: format!("{what} {}", i + 1),
                source,
            })
        })
        .collect()
}

impl TabularInput<'_> {
    pub fn to_store(&self, limits: StoreLimits) -> Result<ProductMixStore, ImportError> {
        let products = split_list(self.products);
        if products.is_empty() {
            return Err(ImportError::NoProducts);
        }
        if let Some(i) = products.iter().position(|p| p.is_empty()) {
            return Err(ImportError::EmptyProductName(i + 1));
        }

        let profits = parse_list(self.profits, "profit")?;
        if profits.len() != products.len() {
            return Err(ImportError::ProfitCount {
                expected: products.len(),
                found: profits.len(),
            });
        }

        let mut usage = Vec::new();
        for (r, line) in self
            .usage
            .split(['\n', ';'])
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .enumerate()
        {
            let row = parse_list(line, &format!("usage row {}, column", r + 1))?;
            if row.len() != products.len() {
                return Err(ImportError::UsageRow {
                    row: r + 1,
                    expected: products.len(),
                    found: row.len(),
                });
            }
            usage.push(row);
        }
        if usage.is_empty() {
            return Err(ImportError::NoResources);
        }

        let capacities = parse_list(self.capacities, "capacity")?;
        if capacities.len() != usage.len() {
            return Err(ImportError::CapacityCount {
                expected: usage.len(),
                found: capacities.len(),
            });
        }

        let mut store = ProductMixStore::with_limits(limits);
        for _ in 1..usage.len() {
            store.add_resource()?;
        }
        for _ in 1..products.len() {
            store.add_product()?;
        }

        for (r, capacity) in capacities.into_iter().enumerate() {
            store.set_capacity(r, capacity)?;
        }
        for (p, (name, profit)) in products.iter().zip(profits).enumerate() {
            store.rename_product(p, name)?;
            store.set_profit(p, profit)?;
            for (r, row) in usage.iter().enumerate() {
                store.set_consumption(p, r, row[p])?;
            }
        }

        debug!(
            resources = store.resources().len(),
            products = store.products().len(),
            "tabular input imported"
        );
        Ok(store)
    }
}

/// A complete product-mix problem with consumption addressed by resource name.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Scenario {
    pub resources: Vec<ResourceSpec>,
    pub products: Vec<ProductSpec>,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResourceSpec {
    pub name: String,
    pub capacity: Amount,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ProductSpec {
    pub name: String,
    pub profit: Amount,
    /// Resources not listed are consumed at zero
    #[cfg_attr(feature = "serde", serde(default))]
    pub consumption: BTreeMap<String, Amount>,
}

impl Scenario {
    /// Snapshot of a store, consumption keyed by the current resource names.
    pub fn from_store(store: &ProductMixStore) -> Self {
        let resources = store
            .resources()
            .iter()
            .map(|r| ResourceSpec {
                name: r.name.clone(),
                capacity: r.capacity,
            })
            .collect();
        let products = store
            .products()
            .iter()
            .map(|p| ProductSpec {
                name: p.name.clone(),
                profit: p.profit,
                consumption: store
                    .resources()
                    .iter()
                    .map(|r| (r.name.clone(), p.consumption_of(r.id)))
                    .collect(),
            })
            .collect();
        Self { resources, products }
    }

    pub fn to_store(&self, limits: StoreLimits) -> Result<ProductMixStore, ImportError> {
        if self.resources.is_empty() {
            return Err(ImportError::NoResources);
        }
        if self.products.is_empty() {
            return Err(ImportError::NoProducts);
        }

        let mut store = ProductMixStore::with_limits(limits);
        for _ in 1..self.resources.len() {
            store.add_resource()?;
        }
        for _ in 1..self.products.len() {
            store.add_product()?;
        }

        for (r, spec) in self.resources.iter().enumerate() {
            store.rename_resource(r, &spec.name)?;
            store.set_capacity(r, spec.capacity)?;
        }
        for (p, spec) in self.products.iter().enumerate() {
            store.rename_product(p, &spec.name)?;
            store.set_profit(p, spec.profit)?;
            for (resource, amount) in &spec.consumption {
                let r = self
                    .resources
                    .iter()
                    .position(|res| res.name.trim() == resource.trim())
                    .ok_or_else(|| ImportError::UnknownResource {
                        product: spec.name.clone(),
                        resource: resource.clone(),
                    })?;
                store.set_consumption(p, r, *amount)?;
            }
        }

        Ok(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::build_request;

    fn form<'a>(products: &'a str, profits: &'a str, usage: &'a str, capacities: &'a str) -> TabularInput<'a> {
        TabularInput {
            products,
            profits,
            usage,
            capacities,
        }
    }

    #[test]
    fn test_tabular_import() {
        let store = form("A, B, C", "40,30,50", "2,1,3\n1,2,1", "100,80")
            .to_store(StoreLimits::default())
            .unwrap();

        assert_eq!(store.resources().len(), 2);
        assert_eq!(store.products().len(), 3);
        assert!(store.is_consistent());
        assert_eq!(store.products()[2].name, "C");
        assert_eq!(store.products()[2].profit.get(), 50.0);
        assert_eq!(store.resources()[1].name, "Resource 2");
        assert_eq!(store.resources()[1].capacity.get(), 80.0);

        let request = build_request(&store).unwrap();
        assert_eq!(request.variables["C"]["Resource 1"], 3.0);
        assert_eq!(request.variables["B"]["Resource 2"], 2.0);
    }

    #[test]
    fn test_semicolon_rows() {
        let store = form("A,B", "1,1", "1,2; 3,4;", "5,6")
            .to_store(StoreLimits::default())
            .unwrap();
        assert_eq!(store.resources().len(), 2);
    }

    #[test]
    fn test_tabular_shape_errors() {
        let limits = StoreLimits::default();
        assert_eq!(form("", "", "1", "1").to_store(limits).unwrap_err(), ImportError::NoProducts);
        assert_eq!(
            form("A,,C", "1,2,3", "1,1,1", "1").to_store(limits).unwrap_err(),
            ImportError::EmptyProductName(2)
        );
        assert_eq!(
            form("A,B", "1", "1,1", "1").to_store(limits).unwrap_err(),
            ImportError::ProfitCount { expected: 2, found: 1 }
        );
        assert_eq!(
            form("A,B", "1,2", "1,1\n1", "1,1").to_store(limits).unwrap_err(),
            ImportError::UsageRow {
                row: 2,
                expected: 2,
                found: 1
            }
        );
        assert_eq!(
            form("A", "1", "1\n2", "1").to_store(limits).unwrap_err(),
            ImportError::CapacityCount { expected: 2, found: 1 }
        );
        assert_eq!(
            form("A", "1", "  ", "").to_store(limits).unwrap_err(),
            ImportError::NoResources
        );
    }

    #[test]
    fn test_tabular_number_errors_name_the_cell() {
        let err = form("A,B", "1,2", "1,1\n1,x", "1,1")
            .to_store(StoreLimits::default())
            .unwrap_err();
        assert_eq!(
            err,
            ImportError::InvalidNumber {
                location: "usage row 2, column 2".to_string(),
                source: AmountError::NotANumber("x".to_string()),
            }
        );
        assert_eq!(err.to_string(), "Invalid number in usage row 2, column 2: Not a number: \"x\"");
    }

    #[test]
    fn test_tabular_respects_resource_limit() {
        let usage = "1\n1\n1\n1\n1\n1";
        let err = form("A", "1", usage, "1,1,1,1,1,1")
            .to_store(StoreLimits::default())
            .unwrap_err();
        assert_eq!(err, ImportError::Store(StoreError::ResourceLimit(5)));

        let store = form("A", "1", usage, "1,1,1,1,1,1")
            .to_store(StoreLimits::unbounded())
            .unwrap();
        assert_eq!(store.resources().len(), 6);
    }

    #[test]
    fn test_scenario_round_trip_through_store() {
        let scenario = Scenario {
            resources: vec![
                ResourceSpec {
                    name: "Machine".to_string(),
                    capacity: Amount::new(40.0).unwrap(),
                },
                ResourceSpec {
                    name: "Labor".to_string(),
                    capacity: Amount::new(30.0).unwrap(),
                },
            ],
            products: vec![ProductSpec {
                name: "Chair".to_string(),
                profit: Amount::new(12.0).unwrap(),
                consumption: [("Labor".to_string(), Amount::new(3.0).unwrap())].into_iter().collect(),
            }],
        };

        let store = scenario.to_store(StoreLimits::default()).unwrap();
        assert!(store.is_consistent());
        let chair = &store.products()[0];
        assert_eq!(chair.consumption_of(store.resources()[0].id), Amount::ZERO);
        assert_eq!(chair.consumption_of(store.resources()[1].id).get(), 3.0);

        let snapshot = Scenario::from_store(&store);
        assert_eq!(snapshot.resources, scenario.resources);
        assert_eq!(snapshot.products[0].consumption.len(), 2);
        assert_eq!(snapshot.products[0].consumption["Machine"], Amount::ZERO);
    }

    #[test]
    fn test_scenario_unknown_resource() {
        let scenario = Scenario {
            resources: vec![ResourceSpec {
                name: "Machine".to_string(),
                capacity: Amount::ZERO,
            }],
            products: vec![ProductSpec {
                name: "Chair".to_string(),
                profit: Amount::ZERO,
                consumption: [("Paint".to_string(), Amount::ZERO)].into_iter().collect(),
            }],
        };
        assert_eq!(
            scenario.to_store(StoreLimits::default()).unwrap_err(),
            ImportError::UnknownResource {
                product: "Chair".to_string(),
                resource: "Paint".to_string()
            }
        );
        assert_eq!(
            Scenario::default().to_store(StoreLimits::default()).unwrap_err(),
            ImportError::NoResources
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_scenario_json() {
        let scenario: Scenario = serde_json::from_str(
            r#"{
                "resources": [{ "name": "R1", "capacity": 100 }],
                "products": [
                    { "name": "A", "profit": 20, "consumption": { "R1": 10 } },
                    { "name": "B", "profit": 30 }
                ]
            }"#,
        )
        .unwrap();
        let store = scenario.to_store(StoreLimits::default()).unwrap();
        assert_eq!(store.products()[1].consumption.len(), 1);

        let bad = serde_json::from_str::<Scenario>(r#"{"resources": [{"name": "R1", "capacity": -1}], "products": []}"#);
        assert!(bad.is_err());
    }
}
