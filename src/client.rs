//! Typed accessors for the dealer API resources.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

use crate::config::ApiConfig;
use crate::errors::{DealerApiError, Result};
use crate::models::{Dealer, Vehicle};
use crate::transport::{HttpTransport, Transport};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DatasetIdResponse {
    dataset_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct VehicleIdsResponse {
    vehicle_ids: Vec<i32>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DealerResponse {
    dealer_id: i32,
    name: String,
}

#[derive(Serialize)]
struct AnswerRequest<'a> {
    dealers: &'a [Dealer],
}

/// Client for a single API root. Cloning shares the underlying transport.
#[derive(Clone)]
pub struct ApiClient {
    transport: Arc<dyn Transport>,
}

impl ApiClient {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        Self { transport }
    }

    /// Build a client over HTTP using `config`.
    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        let transport = HttpTransport::new(config)?;
        info!("Using dealer API at {}", transport.base_url());
        Ok(Self::new(Arc::new(transport)))
    }

    #[instrument(skip(self))]
    pub async fn fetch_dataset_id(&self) -> Result<String> {
        let body = self.transport.get("datasetId").await?;
        let response: DatasetIdResponse = decode("dataset id", &body)?;
        check_dataset_id(&response.dataset_id)?;
        info!("Retrieved datasetId = {}", response.dataset_id);
        Ok(response.dataset_id)
    }

    #[instrument(skip(self))]
    pub async fn fetch_vehicle_ids(&self, dataset_id: &str) -> Result<Vec<i32>> {
        let body = self
            .transport
            .get(&format!("{}/vehicles", check_dataset_id(dataset_id)?))
            .await?;
        let response: VehicleIdsResponse = decode("vehicle ids", &body)?;
        info!(
            "Retrieved {} vehicleIds: {:?}",
            response.vehicle_ids.len(),
            response.vehicle_ids
        );
        Ok(response.vehicle_ids)
    }

    #[instrument(skip(self))]
    pub async fn fetch_vehicle(&self, dataset_id: &str, vehicle_id: i32) -> Result<Vehicle> {
        let body = self
            .transport
            .get(&format!("{}/vehicles/{}", check_dataset_id(dataset_id)?, vehicle_id))
            .await?;
        let vehicle: Vehicle = decode(&format!("vehicle {}", vehicle_id), &body)?;
        debug!("Got vehicle info = {:?}", vehicle);
        Ok(vehicle)
    }

    #[instrument(skip(self))]
    pub async fn fetch_dealer(&self, dataset_id: &str, dealer_id: i32) -> Result<Dealer> {
        let body = self
            .transport
            .get(&format!("{}/dealers/{}", check_dataset_id(dataset_id)?, dealer_id))
            .await?;
        let response: DealerResponse = decode(&format!("dealer {}", dealer_id), &body)?;
        let dealer = Dealer::new(response.dealer_id, response.name);
        debug!("Got dealer info = {:?}", dealer);
        Ok(dealer)
    }

    /// Submit all dealers with their vehicles in one request and return the
    /// raw response body.
    #[instrument(skip(self, dealers), fields(dealers = dealers.len()))]
    pub async fn post_answer(&self, dataset_id: &str, dealers: &[Dealer]) -> Result<String> {
        let payload = serde_json::to_value(AnswerRequest { dealers })
            .map_err(|e| DealerApiError::encode("answer", e))?;
        debug!("Posting answer JSON = {}", payload);

        let response = self
            .transport
            .post_json(&format!("{}/answer", check_dataset_id(dataset_id)?), &payload)
            .await?;
        info!("Posted answer. Response = {}", response);
        Ok(response)
    }
}

/// A dataset id is used as one path segment, so it must not be empty, a dot
/// segment, or contain a path separator.
fn check_dataset_id(dataset_id: &str) -> Result<&str> {
    let clean = !dataset_id.is_empty()
        && dataset_id != "."
        && dataset_id != ".."
        && !dataset_id.contains(&['/', '\\'][..]);
    if clean {
        Ok(dataset_id)
    } else {
        Err(DealerApiError::decode(
            "dataset id",
            format!("'{}' is not a single path segment", dataset_id),
        ))
    }
}

fn decode<T: DeserializeOwned>(resource: &str, body: &str) -> Result<T> {
    serde_json::from_str(body).map_err(|e| {
        DealerApiError::decode(
            resource,
            format!(
                "{} - Body: {}",
                e,
                body.chars().take(200).collect::<String>()
            ),
        )
    })
}
