//! Pipeline integration tests
//!
//! Drives a full run against an in-memory API that records every request.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use dealer_assign::errors::Result as ApiResult;
use dealer_assign::{ApiClient, DealerApiError, FanOut, Pipeline, Stage, Transport};
use serde_json::{json, Value};

#[derive(Default)]
struct FakeApi {
    responses: HashMap<String, String>,
    failing: HashSet<String>,
    delays: HashMap<String, Duration>,
    answer_response: String,
    events: Mutex<Vec<String>>,
    posts: Mutex<Vec<(String, Value)>>,
}

impl FakeApi {
    fn new() -> Self {
        Self {
            answer_response: r#"{"success":true,"message":"Congratulations."}"#.to_string(),
            ..Self::default()
        }
    }

    fn respond(mut self, path: &str, body: Value) -> Self {
        self.responses.insert(path.to_string(), body.to_string());
        self
    }

    fn respond_raw(mut self, path: &str, body: &str) -> Self {
        self.responses.insert(path.to_string(), body.to_string());
        self
    }

    fn fail(mut self, path: &str) -> Self {
        self.failing.insert(path.to_string());
        self
    }

    fn delay(mut self, path: &str, delay: Duration) -> Self {
        self.delays.insert(path.to_string(), delay);
        self
    }

    fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn requested(&self, prefix: &str) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| e.strip_prefix("start ").map(str::to_string))
            .filter(|path| path.starts_with(prefix))
            .collect()
    }

    fn posts(&self) -> Vec<(String, Value)> {
        self.posts.lock().unwrap().clone()
    }
}

#[async_trait]
impl Transport for FakeApi {
    async fn get(&self, path: &str) -> ApiResult<String> {
        self.events.lock().unwrap().push(format!("start {}", path));
        if let Some(delay) = self.delays.get(path) {
            tokio::time::sleep(*delay).await;
        }
        self.events.lock().unwrap().push(format!("end {}", path));

        if self.failing.contains(path) {
            return Err(DealerApiError::status(format!("http://fake/api/{}", path), 503));
        }
        self.responses
            .get(path)
            .cloned()
            .ok_or_else(|| DealerApiError::status(format!("http://fake/api/{}", path), 404))
    }

    async fn post_json(&self, path: &str, body: &Value) -> ApiResult<String> {
        self.posts
            .lock()
            .unwrap()
            .push((path.to_string(), body.clone()));
        if self.failing.contains(path) {
            return Err(DealerApiError::status(format!("http://fake/api/{}", path), 500));
        }
        Ok(self.answer_response.clone())
    }
}

fn vehicle(vehicle_id: i32, dealer_id: i32, year: i32, make: &str, model: &str) -> Value {
    json!({
        "dealerId": dealer_id,
        "vehicleId": vehicle_id,
        "year": year,
        "make": make,
        "model": model
    })
}

/// Dataset `abc123` with two vehicles on one dealer.
fn single_dealer_api() -> FakeApi {
    FakeApi::new()
        .respond("datasetId", json!({ "datasetId": "abc123" }))
        .respond("abc123/vehicles", json!({ "vehicleIds": [1, 2] }))
        .respond("abc123/vehicles/1", vehicle(1, 10, 2020, "Ford", "F150"))
        .respond("abc123/vehicles/2", vehicle(2, 10, 2019, "Honda", "Civic"))
        .respond("abc123/dealers/10", json!({ "dealerId": 10, "name": "Acme Motors" }))
}

/// Dataset `xyz` with vehicles spread over two dealers.
fn two_dealer_api() -> FakeApi {
    FakeApi::new()
        .respond("datasetId", json!({ "datasetId": "xyz" }))
        .respond("xyz/vehicles", json!({ "vehicleIds": [1, 2, 3, 4] }))
        .respond("xyz/vehicles/1", vehicle(1, 10, 2014, "Ford", "Focus"))
        .respond("xyz/vehicles/2", vehicle(2, 20, 2018, "Tesla", "Model 3"))
        .respond("xyz/vehicles/3", vehicle(3, 10, 2012, "Kia", "Rio"))
        .respond("xyz/vehicles/4", vehicle(4, 20, 2021, "Mazda", "CX-5"))
        .respond("xyz/dealers/10", json!({ "dealerId": 10, "name": "Acme Motors" }))
        .respond("xyz/dealers/20", json!({ "dealerId": 20, "name": "Budget Cars" }))
}

fn pipeline(api: &Arc<FakeApi>) -> Pipeline {
    Pipeline::new(ApiClient::new(api.clone()))
}

#[tokio::test]
async fn test_single_dealer_gets_both_vehicles_in_fetch_order() -> Result<()> {
    let api = Arc::new(single_dealer_api());

    let outcome = pipeline(&api).run().await?;

    assert_eq!(outcome.dataset_id, "abc123");
    assert!(outcome.submitted());
    assert_eq!(
        outcome.response.as_deref(),
        Some(r#"{"success":true,"message":"Congratulations."}"#)
    );

    let posts = api.posts();
    assert_eq!(posts.len(), 1);
    assert_eq!(posts[0].0, "abc123/answer");
    assert_eq!(
        posts[0].1,
        json!({
            "dealers": [
                {
                    "dealerId": 10,
                    "name": "Acme Motors",
                    "vehicles": [
                        vehicle(1, 10, 2020, "Ford", "F150"),
                        vehicle(2, 10, 2019, "Honda", "Civic")
                    ]
                }
            ]
        })
    );
    Ok(())
}

#[tokio::test]
async fn test_two_dealers_each_get_their_vehicles() -> Result<()> {
    let api = Arc::new(two_dealer_api());

    let outcome = pipeline(&api).run().await?;

    let dealers = &outcome.answer.dealers;
    assert_eq!(dealers.len(), 2);
    assert_eq!(dealers[0].dealer_id, 10);
    assert_eq!(
        dealers[0].vehicles.iter().map(|v| v.vehicle_id).collect::<Vec<_>>(),
        vec![1, 3]
    );
    assert_eq!(dealers[1].dealer_id, 20);
    assert_eq!(
        dealers[1].vehicles.iter().map(|v| v.vehicle_id).collect::<Vec<_>>(),
        vec![2, 4]
    );

    // Each shared dealer is looked up exactly once
    let mut dealer_requests = api.requested("xyz/dealers/");
    dealer_requests.sort();
    assert_eq!(dealer_requests, vec!["xyz/dealers/10", "xyz/dealers/20"]);
    Ok(())
}

#[tokio::test]
async fn test_dealer_fetches_wait_for_all_vehicles() -> Result<()> {
    let api = Arc::new(
        two_dealer_api()
            .delay("xyz/vehicles/1", Duration::from_millis(30))
            .delay("xyz/vehicles/2", Duration::from_millis(5))
            .delay("xyz/vehicles/3", Duration::from_millis(10))
            .delay("xyz/vehicles/4", Duration::from_millis(5)),
    );

    pipeline(&api).run().await?;

    let events = api.events();
    let last_vehicle_end = events
        .iter()
        .rposition(|e| e.starts_with("end xyz/vehicles/"))
        .expect("vehicles were fetched");
    let first_dealer_start = events
        .iter()
        .position(|e| e.starts_with("start xyz/dealers/"))
        .expect("dealers were fetched");
    assert!(last_vehicle_end < first_dealer_start);

    // All vehicle requests were in flight before the first one finished
    let first_vehicle_end = events
        .iter()
        .position(|e| e.starts_with("end xyz/vehicles/"))
        .expect("vehicles were fetched");
    let vehicle_starts = events[..first_vehicle_end]
        .iter()
        .filter(|e| e.starts_with("start xyz/vehicles/"))
        .count();
    assert_eq!(vehicle_starts, 4);
    Ok(())
}

#[tokio::test]
async fn test_empty_dataset_submits_empty_answer() -> Result<()> {
    let api = Arc::new(
        FakeApi::new()
            .respond("datasetId", json!({ "datasetId": "empty" }))
            .respond("empty/vehicles", json!({ "vehicleIds": [] })),
    );

    let outcome = pipeline(&api).run().await?;

    assert!(outcome.answer.dealers.is_empty());
    assert_eq!(api.requested("empty/vehicles/").len(), 0);
    assert_eq!(api.requested("empty/dealers/").len(), 0);
    assert_eq!(api.posts()[0].1, json!({ "dealers": [] }));
    Ok(())
}

#[tokio::test]
async fn test_vehicle_failure_aborts_before_dealers_and_submit() -> Result<()> {
    let api = Arc::new(two_dealer_api().fail("xyz/vehicles/3"));

    let err = pipeline(&api).run().await.unwrap_err();

    assert_eq!(err.stage(), Some(Stage::FetchVehicles));
    assert!(err.is_transport());
    match &err {
        DealerApiError::Stage { source, .. } => {
            assert!(matches!(**source, DealerApiError::Aggregate { id: 3, .. }));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert!(api.requested("xyz/dealers/").is_empty());
    assert!(api.posts().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_dealer_decode_failure_aborts_submit() -> Result<()> {
    let api = Arc::new(single_dealer_api().respond_raw("abc123/dealers/10", r#"{"dealerId": 10}"#));

    let err = pipeline(&api).run().await.unwrap_err();

    assert_eq!(err.stage(), Some(Stage::FetchDealers));
    assert!(err.is_decode());
    assert!(api.posts().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_dataset_failure_stops_run() -> Result<()> {
    let api = Arc::new(single_dealer_api().fail("datasetId"));

    let err = pipeline(&api).run().await.unwrap_err();

    assert_eq!(err.stage(), Some(Stage::AcquireDataset));
    assert_eq!(api.requested("abc123/").len(), 0);
    Ok(())
}

#[tokio::test]
async fn test_vehicle_list_decode_failure_is_list_stage() -> Result<()> {
    let api = Arc::new(single_dealer_api().respond_raw("abc123/vehicles", r#"{"vehicleIds": "1,2"}"#));

    let err = pipeline(&api).run().await.unwrap_err();

    assert_eq!(err.stage(), Some(Stage::ListVehicles));
    assert!(err.is_decode());
    Ok(())
}

#[tokio::test]
async fn test_submit_failure_is_reported() -> Result<()> {
    let api = Arc::new(single_dealer_api().fail("abc123/answer"));

    let err = pipeline(&api).run().await.unwrap_err();

    assert_eq!(err.stage(), Some(Stage::Submit));
    assert_eq!(api.posts().len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_dry_run_skips_submission() -> Result<()> {
    let api = Arc::new(single_dealer_api());

    let outcome = pipeline(&api).dry_run(true).run().await?;

    assert!(!outcome.submitted());
    assert_eq!(outcome.answer.vehicle_count(), 2);
    assert!(api.posts().is_empty());
    Ok(())
}

#[tokio::test]
async fn test_capped_fan_out_produces_same_answer() -> Result<()> {
    let unbounded = Arc::new(two_dealer_api());
    let capped = Arc::new(two_dealer_api());

    let expected = pipeline(&unbounded).run().await?;
    let actual = pipeline(&capped)
        .with_fan_out(FanOut::with_limit(1))
        .run()
        .await?;

    assert_eq!(actual.answer, expected.answer);
    assert_eq!(capped.posts(), unbounded.posts());
    Ok(())
}

#[tokio::test]
async fn test_dataset_id_outside_one_segment_stops_run() -> Result<()> {
    let api = Arc::new(
        single_dealer_api().respond("datasetId", json!({ "datasetId": "../admin" })),
    );

    let err = pipeline(&api).run().await.unwrap_err();

    assert_eq!(err.stage(), Some(Stage::AcquireDataset));
    assert!(err.is_decode());
    assert_eq!(api.events().len(), 2);
    assert!(api.posts().is_empty());
    Ok(())
}
