//! End-to-end run: fetch the dataset, assign vehicles, submit the answer.
//!
//! Stages run strictly one after another; the two fan-out stages are full
//! barriers, so dealer lookups only start once every vehicle is known. The
//! first failing stage aborts the run and nothing is submitted.

use std::time::{Duration, Instant};

use tracing::{info, info_span, Instrument};

use crate::assignment::{assign_vehicles, distinct_dealer_ids};
use crate::client::ApiClient;
use crate::errors::{Result, Stage};
use crate::fanout::FanOut;
use crate::models::Answer;

/// Result of a completed run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub dataset_id: String,
    pub answer: Answer,
    /// Raw body returned by the answer endpoint, `None` for dry runs.
    pub response: Option<String>,
    pub elapsed: Duration,
}

impl RunOutcome {
    pub fn submitted(&self) -> bool {
        self.response.is_some()
    }
}

pub struct Pipeline {
    client: ApiClient,
    fan_out: FanOut,
    submit: bool,
}

impl Pipeline {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            fan_out: FanOut::unbounded(),
            submit: true,
        }
    }

    pub fn with_fan_out(mut self, fan_out: FanOut) -> Self {
        self.fan_out = fan_out;
        self
    }

    /// Skip the submit stage and only report the computed answer.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.submit = !dry_run;
        self
    }

    pub async fn run(&self) -> Result<RunOutcome> {
        let started = Instant::now();

        let dataset_id = self
            .client
            .fetch_dataset_id()
            .instrument(info_span!("stage", name = %Stage::AcquireDataset))
            .await
            .map_err(|e| e.in_stage(Stage::AcquireDataset))?;

        let vehicle_ids = self
            .client
            .fetch_vehicle_ids(&dataset_id)
            .instrument(info_span!("stage", name = %Stage::ListVehicles))
            .await
            .map_err(|e| e.in_stage(Stage::ListVehicles))?;

        let vehicles = self
            .fan_out
            .fetch_all(&vehicle_ids, |vehicle_id| {
                self.client.fetch_vehicle(&dataset_id, vehicle_id)
            })
            .instrument(info_span!("stage", name = %Stage::FetchVehicles))
            .await
            .map_err(|e| e.in_stage(Stage::FetchVehicles))?;
        info!("Fetched {} vehicles", vehicles.len());

        let dealer_ids = distinct_dealer_ids(&vehicles);
        info!("Derived {} distinct dealer ids: {:?}", dealer_ids.len(), dealer_ids);

        let dealers = self
            .fan_out
            .fetch_all(&dealer_ids, |dealer_id| {
                self.client.fetch_dealer(&dataset_id, dealer_id)
            })
            .instrument(info_span!("stage", name = %Stage::FetchDealers))
            .await
            .map_err(|e| e.in_stage(Stage::FetchDealers))?;
        info!("Fetched {} dealers", dealers.len());

        let answer = Answer::new(assign_vehicles(dealers, &vehicles));
        info!(
            "Assigned {} of {} vehicles to {} dealers",
            answer.vehicle_count(),
            vehicles.len(),
            answer.dealers.len()
        );

        let response = if self.submit {
            let body = self
                .client
                .post_answer(&dataset_id, &answer.dealers)
                .instrument(info_span!("stage", name = %Stage::Submit))
                .await
                .map_err(|e| e.in_stage(Stage::Submit))?;
            Some(body)
        } else {
            info!("Dry run, answer not submitted");
            None
        };

        let elapsed = started.elapsed();
        info!("Run finished. Elapsed time = {:?}", elapsed);

        Ok(RunOutcome {
            dataset_id,
            answer,
            response,
            elapsed,
        })
    }
}
