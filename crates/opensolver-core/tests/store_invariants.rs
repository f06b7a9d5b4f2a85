//! Property-based invariant tests for the product-mix grid.
//!
//! Verifies:
//! 1. Every product has exactly one consumption entry per resource after
//!    any sequence of edits
//! 2. Resource and product counts never drop below one
//! 3. The built request has one constraint per resource, one variable per
//!    product, and `resources + 1` fields per variable
//! 4. Solving with the bundled simplex never exceeds any capacity

use opensolver_core::{
    Amount, MixReport, ProductMixStore, SimplexSolver, StoreLimits, build_request, solve_mix,
};
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Edit {
    AddResource,
    RemoveResource(usize),
    AddProduct,
    RemoveProduct(usize),
    SetCapacity(usize, f64),
    SetProfit(usize, f64),
    SetConsumption(usize, usize, f64),
}

fn arb_edit() -> impl Strategy<Value = Edit> {
    prop_oneof![
        Just(Edit::AddResource),
        (0usize..8).prop_map(Edit::RemoveResource),
        Just(Edit::AddProduct),
        (0usize..8).prop_map(Edit::RemoveProduct),
        (0usize..8, 0.0f64..500.0).prop_map(|(i, v)| Edit::SetCapacity(i, v)),
        (0usize..8, 0.0f64..100.0).prop_map(|(i, v)| Edit::SetProfit(i, v)),
        (0usize..8, 0usize..8, 0.5f64..50.0).prop_map(|(p, r, v)| Edit::SetConsumption(p, r, v)),
    ]
}

fn apply(store: &mut ProductMixStore, edit: &Edit) {
    // Out-of-range indices and limit hits are expected here; they must
    // leave the store consistent.
    let _ = match *edit {
        Edit::AddResource => store.add_resource().map(|_| ()),
        Edit::RemoveResource(i) => {
            store.remove_resource(i);
            Ok(())
        }
        Edit::AddProduct => store.add_product().map(|_| ()),
        Edit::RemoveProduct(i) => {
            store.remove_product(i);
            Ok(())
        }
        Edit::SetCapacity(i, v) => store.set_capacity(i, Amount::new(v).unwrap()),
        Edit::SetProfit(i, v) => store.set_profit(i, Amount::new(v).unwrap()),
        Edit::SetConsumption(p, r, v) => store.set_consumption(p, r, Amount::new(v).unwrap()),
    };
}

/// Give every product a positive rate on the first resource so no product
/// is free to produce.
fn bound_every_product(store: &mut ProductMixStore) {
    for p in 0..store.products().len() {
        if store.products()[p].consumption_of(store.resources()[0].id).is_zero() {
            store.set_consumption(p, 0, Amount::new(1.0).unwrap()).unwrap();
        }
    }
}

proptest! {
    #[test]
    fn consumption_matches_resources(edits in prop::collection::vec(arb_edit(), 0..60)) {
        let mut store = ProductMixStore::with_limits(StoreLimits { max_resources: Some(6), max_products: Some(6) });
        for edit in &edits {
            apply(&mut store, edit);
            prop_assert!(store.is_consistent());
            prop_assert!(!store.resources().is_empty());
            prop_assert!(!store.products().is_empty());
            prop_assert!(store.resources().len() <= 6);
            for product in store.products() {
                prop_assert_eq!(product.consumption.len(), store.resources().len());
            }
        }
    }

    #[test]
    fn request_dimensions(edits in prop::collection::vec(arb_edit(), 0..40)) {
        let mut store = ProductMixStore::with_limits(StoreLimits::unbounded());
        for edit in &edits {
            apply(&mut store, edit);
        }

        let request = build_request(&store).unwrap();
        prop_assert_eq!(request.num_constraints(), store.resources().len());
        prop_assert_eq!(request.num_variables(), store.products().len());
        for fields in request.variables.values() {
            prop_assert_eq!(fields.len(), store.resources().len() + 1);
        }
    }

    #[test]
    fn simplex_plans_respect_capacity(edits in prop::collection::vec(arb_edit(), 0..40)) {
        let mut store = ProductMixStore::with_limits(StoreLimits::unbounded());
        for edit in &edits {
            apply(&mut store, edit);
        }
        bound_every_product(&mut store);

        let report = solve_mix(&store, &SimplexSolver::new()).unwrap();
        let status = report.status();
        let MixReport::Optimal { quantities, usage, objective_value } = report else {
            return Err(TestCaseError::fail(format!("expected an optimal plan, got {status}")));
        };

        prop_assert_eq!(quantities.len(), store.products().len());
        for q in &quantities {
            prop_assert!(q.quantity >= 0.0);
        }
        for u in &usage {
            prop_assert!(u.used <= u.capacity + 1e-6 * (1.0 + u.capacity), "{} uses {} of {}", u.name, u.used, u.capacity);
        }
        let recomputed: f64 = quantities.iter().map(|q| q.profit).sum();
        prop_assert!((recomputed - objective_value).abs() <= 1e-6 * (1.0 + objective_value.abs()));
    }
}

#[test]
fn removing_last_rows_is_a_noop() {
    let mut store = ProductMixStore::new();
    store.add_resource().unwrap();
    assert!(store.remove_resource(0).is_some());
    assert!(store.remove_resource(0).is_none());
    assert_eq!(store.resources().len(), 1);
    assert_eq!(store.products()[0].consumption.len(), 1);
}
