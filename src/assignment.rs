use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use crate::models::{Dealer, Vehicle};

/// Distinct dealer ids referenced by `vehicles`, in order of first appearance.
pub fn distinct_dealer_ids(vehicles: &[Vehicle]) -> Vec<i32> {
    vehicles
        .iter()
        .map(|vehicle| vehicle.dealer_id)
        .collect::<IndexSet<_>>()
        .into_iter()
        .collect()
}

/// Attach every vehicle to the dealer it belongs to.
///
/// Returns new dealers whose vehicle lists hold exactly the matching vehicles
/// in the order they were fetched. Any vehicles already present on the input
/// dealers are replaced, so applying this twice never duplicates entries.
/// Vehicles whose dealer is not in `dealers` are left out. Dealer ids are
/// expected to be unique.
pub fn assign_vehicles(dealers: Vec<Dealer>, vehicles: &[Vehicle]) -> Vec<Dealer> {
    let mut by_dealer: IndexMap<i32, Vec<Vehicle>> = IndexMap::new();
    for vehicle in vehicles {
        by_dealer
            .entry(vehicle.dealer_id)
            .or_default()
            .push(vehicle.clone());
    }

    let assigned: Vec<Dealer> = dealers
        .into_iter()
        .map(|mut dealer| {
            dealer.vehicles = by_dealer
                .swap_remove(&dealer.dealer_id)
                .unwrap_or_default();
            dealer
        })
        .collect();

    let dropped: usize = by_dealer.values().map(Vec::len).sum();
    if dropped > 0 {
        debug!(
            "{} vehicles reference dealers that were not fetched: {:?}",
            dropped,
            by_dealer.keys().collect::<Vec<_>>()
        );
    }

    assigned
}
