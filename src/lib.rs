//! Batch client for the vehicle/dealer dataset API.
//!
//! A run fetches a dataset id, every vehicle in the dataset and every dealer
//! those vehicles reference, attaches vehicles to their dealers and posts the
//! result back as a single answer document. See [`pipeline::Pipeline`].

pub mod assignment;
pub mod client;
pub mod config;
pub mod errors;
pub mod fanout;
pub mod models;
pub mod pipeline;
pub mod transport;

pub use client::ApiClient;
pub use config::ApiConfig;
pub use errors::{DealerApiError, Result, Stage};
pub use fanout::FanOut;
pub use models::{Answer, Dealer, Vehicle};
pub use pipeline::{Pipeline, RunOutcome};
pub use transport::{HttpTransport, Transport};
