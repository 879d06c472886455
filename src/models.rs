//! Entity records exchanged with the remote API.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub vehicle_id: i32,
    pub dealer_id: i32,
    pub year: i32,
    pub make: String,
    pub model: String,
}

/// A dealer and the vehicles assigned to it.
///
/// Dealers decoded from the API always start with no vehicles; the list is
/// filled in by [`crate::assignment::assign_vehicles`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Dealer {
    pub dealer_id: i32,
    pub name: String,
    #[serde(default)]
    pub vehicles: Vec<Vehicle>,
}

impl Dealer {
    pub fn new(dealer_id: i32, name: impl Into<String>) -> Self {
        Self {
            dealer_id,
            name: name.into(),
            vehicles: Vec::new(),
        }
    }
}

/// Payload posted to the answer endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    pub dealers: Vec<Dealer>,
}

impl Answer {
    pub fn new(dealers: Vec<Dealer>) -> Self {
        Self { dealers }
    }

    pub fn vehicle_count(&self) -> usize {
        self.dealers.iter().map(|dealer| dealer.vehicles.len()).sum()
    }
}
