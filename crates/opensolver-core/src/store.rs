//! Editable resource/product grid.
//!
//! Every product carries exactly one consumption entry per resource. The
//! entries are keyed by [`ResourceId`], so renaming or reordering resources
//! never desynchronises them; names are only resolved when a model is built
//! or a report rendered.

use std::collections::BTreeMap;

use thiserror::Error;
use tracing::debug;

use crate::amount::{Amount, AmountError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize), serde(transparent))]
pub struct ResourceId(u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize), serde(transparent))]
pub struct ProductId(u32);

#[derive(Debug, Clone, PartialEq)]
pub struct Resource {
    pub id: ResourceId,
    pub name: String,
    pub capacity: Amount,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub profit: Amount,
    /// Amount of each resource used per unit produced
    pub consumption: BTreeMap<ResourceId, Amount>,
}

impl Product {
    pub fn consumption_of(&self, resource: ResourceId) -> Amount {
        self.consumption.get(&resource).copied().unwrap_or(Amount::ZERO)
    }
}

/// Bounds on how many rows the grid may hold. `None` means unbounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreLimits {
    pub max_resources: Option<usize>,
    pub max_products: Option<usize>,
}

impl Default for StoreLimits {
    fn default() -> Self {
        Self {
            max_resources: Some(5),
            max_products: None,
        }
    }
}

impl StoreLimits {
    pub fn unbounded() -> Self {
        Self {
            max_resources: None,
            max_products: None,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum StoreError {
    #[error("At most {0} resources are allowed")]
    ResourceLimit(usize),
    #[error("At most {0} products are allowed")]
    ProductLimit(usize),
    #[error("No resource at index {0}")]
    ResourceIndex(usize),
    #[error("No product at index {0}")]
    ProductIndex(usize),
    #[error("Invalid amount: {0}")]
    InvalidAmount(#[from] AmountError),
}

/// Owned state of the product-mix tool.
#[derive(Debug, Clone)]
pub struct ProductMixStore {
    resources: Vec<Resource>,
    products: Vec<Product>,
    limits: StoreLimits,
    next_id: u32,
}

impl Default for ProductMixStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ProductMixStore {
    /// A store holding one default resource and one default product.
    pub fn new() -> Self {
        Self::with_limits(StoreLimits::default())
    }

    pub fn with_limits(limits: StoreLimits) -> Self {
        let mut store = Self {
            resources: Vec::new(),
            products: Vec::new(),
            limits,
            next_id: 0,
        };
        store.push_resource();
        store.push_product();
        store
    }

    pub fn limits(&self) -> StoreLimits {
        self.limits
    }

    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    pub fn products(&self) -> &[Product] {
        &self.products
    }

    pub fn resource(&self, index: usize) -> Option<&Resource> {
        self.resources.get(index)
    }

    pub fn product(&self, index: usize) -> Option<&Product> {
        self.products.get(index)
    }

    pub fn resource_index(&self, id: ResourceId) -> Option<usize> {
        self.resources.iter().position(|r| r.id == id)
    }

    pub fn product_index(&self, id: ProductId) -> Option<usize> {
        self.products.iter().position(|p| p.id == id)
    }

    pub fn can_add_resource(&self) -> bool {
        self.limits
            .max_resources
            .is_none_or(|max| self.resources.len() < max)
    }

    pub fn can_add_product(&self) -> bool {
        self.limits
            .max_products
            .is_none_or(|max| self.products.len() < max)
    }

    /// Append a resource with a fresh default name and zero capacity.
    /// Every existing product gains a zero consumption entry for it.
    pub fn add_resource(&mut self) -> Result<ResourceId, StoreError> {
        if let Some(max) = self.limits.max_resources.filter(|_| !self.can_add_resource()) {
            return Err(StoreError::ResourceLimit(max));
        }
        Ok(self.push_resource())
    }

    /// Remove the resource at `index` and its entry in every product.
    /// Refuses (returns `None`) when it is the last resource.
    pub fn remove_resource(&mut self, index: usize) -> Option<Resource> {
        if self.resources.len() <= 1 || index >= self.resources.len() {
            return None;
        }
        let removed = self.resources.remove(index);
        for product in &mut self.products {
            product.consumption.remove(&removed.id);
        }
        debug!(resource = %removed.name, remaining = self.resources.len(), "resource removed");
        Some(removed)
    }

    /// Append a product with a fresh default name, zero profit and a zero
    /// entry for every resource.
    pub fn add_product(&mut self) -> Result<ProductId, StoreError> {
        if let Some(max) = self.limits.max_products.filter(|_| !self.can_add_product()) {
            return Err(StoreError::ProductLimit(max));
        }
        Ok(self.push_product())
    }

    /// Remove the product at `index`. Refuses when it is the last product.
    pub fn remove_product(&mut self, index: usize) -> Option<Product> {
        if self.products.len() <= 1 || index >= self.products.len() {
            return None;
        }
        let removed = self.products.remove(index);
        debug!(product = %removed.name, remaining = self.products.len(), "product removed");
        Some(removed)
    }

    pub fn rename_resource(&mut self, index: usize, name: &str) -> Result<(), StoreError> {
        let resource = self
            .resources
            .get_mut(index)
            .ok_or(StoreError::ResourceIndex(index))?;
        resource.name = name.trim().to_string();
        Ok(())
    }

    pub fn rename_product(&mut self, index: usize, name: &str) -> Result<(), StoreError> {
        let product = self
            .products
            .get_mut(index)
            .ok_or(StoreError::ProductIndex(index))?;
        product.name = name.trim().to_string();
        Ok(())
    }

    pub fn set_capacity(&mut self, index: usize, capacity: Amount) -> Result<(), StoreError> {
        let resource = self
            .resources
            .get_mut(index)
            .ok_or(StoreError::ResourceIndex(index))?;
        resource.capacity = capacity;
        Ok(())
    }

    pub fn set_profit(&mut self, index: usize, profit: Amount) -> Result<(), StoreError> {
        let product = self
            .products
            .get_mut(index)
            .ok_or(StoreError::ProductIndex(index))?;
        product.profit = profit;
        Ok(())
    }

    pub fn set_consumption(
        &mut self,
        product_index: usize,
        resource_index: usize,
        amount: Amount,
    ) -> Result<(), StoreError> {
        let resource = self
            .resources
            .get(resource_index)
            .ok_or(StoreError::ResourceIndex(resource_index))?
            .id;
        let product = self
            .products
            .get_mut(product_index)
            .ok_or(StoreError::ProductIndex(product_index))?;
        product.consumption.insert(resource, amount);
        Ok(())
    }

    /// Set a capacity from raw text. Unparseable text stores zero and the
    /// parse error is returned.
    pub fn set_capacity_text(&mut self, index: usize, text: &str) -> Result<(), StoreError> {
        let (amount, parsed) = parse_field(text);
        self.set_capacity(index, amount)?;
        parsed
    }

    /// Set a profit from raw text; see [`Self::set_capacity_text`].
    pub fn set_profit_text(&mut self, index: usize, text: &str) -> Result<(), StoreError> {
        let (amount, parsed) = parse_field(text);
        self.set_profit(index, amount)?;
        parsed
    }

    /// Set a consumption rate from raw text; see [`Self::set_capacity_text`].
    pub fn set_consumption_text(
        &mut self,
        product_index: usize,
        resource_index: usize,
        text: &str,
    ) -> Result<(), StoreError> {
        let (amount, parsed) = parse_field(text);
        self.set_consumption(product_index, resource_index, amount)?;
        parsed
    }

    /// True when every product has exactly one entry per current resource.
    pub fn is_consistent(&self) -> bool {
        !self.resources.is_empty()
            && !self.products.is_empty()
            && self.products.iter().all(|p| {
                p.consumption.len() == self.resources.len()
                    && self.resources.iter().all(|r| p.consumption.contains_key(&r.id))
            })
    }

    fn push_resource(&mut self) -> ResourceId {
        let id = ResourceId(self.allocate_id());
        let name = self.default_resource_name();
        for product in &mut self.products {
            product.consumption.insert(id, Amount::ZERO);
        }
        debug!(resource = %name, count = self.resources.len() + 1, "resource added");
        self.resources.push(Resource {
            id,
            name,
            capacity: Amount::ZERO,
        });
        debug_assert!(self.products.is_empty() || self.is_consistent());
        id
    }

    fn push_product(&mut self) -> ProductId {
        let id = ProductId(self.allocate_id());
        let name = self.default_product_name();
        let consumption = self.resources.iter().map(|r| (r.id, Amount::ZERO)).collect();
        debug!(product = %name, count = self.products.len() + 1, "product added");
        self.products.push(Product {
            id,
            name,
            profit: Amount::ZERO,
            consumption,
        });
        id
    }

    fn allocate_id(&mut self) -> u32 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// "Resource N" with the first N past the current count that is free.
    fn default_resource_name(&self) -> String {
        let mut n = self.resources.len() + 1;
        loop {
            let name = format!("Resource {n}");
            if !self.resources.iter().any(|r| r.name == name) {
                return name;
            }
            n += 1;
        }
    }

    /// "Product A", "Product B", ..., "Product Z", "Product AA", ...
    fn default_product_name(&self) -> String {
        let mut n = self.products.len();
        loop {
            let name = format!("Product {}", column_label(n));
            if !self.products.iter().any(|p| p.name == name) {
                return name;
            }
            n += 1;
        }
    }
}

fn parse_field(text: &str) -> (Amount, Result<(), StoreError>) {
    match Amount::parse(text) {
        Ok(amount) => (amount, Ok(())),
        Err(e) => (Amount::ZERO, Err(StoreError::InvalidAmount(e))),
    }
}

/// Spreadsheet-style column label: 0 -> A, 25 -> Z, 26 -> AA.
fn column_label(mut index: usize) -> String {
    let mut label = Vec::new();
    loop {
        label.push(b'A' + (index % 26) as u8);
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    label.reverse();
    String::from_utf8_lossy(&label).into_owned()
}
