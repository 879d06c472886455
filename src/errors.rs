//! Error types for the dealer assignment client
//!
//! Every failure in a run is fatal. Errors are never swallowed inside the
//! library; they travel up to the binary which logs the chain and exits
//! non-zero.
//!
//! # Examples
//!
//! ```rust
//! use dealer_assign::errors::{DealerApiError, Stage};
//!
//! let err = DealerApiError::decode("dataset id", "missing field `datasetId`");
//! let err = err.in_stage(Stage::AcquireDataset);
//! assert_eq!(err.stage(), Some(Stage::AcquireDataset));
//! ```

use std::fmt;

use thiserror::Error;

/// Pipeline stage in which a failure happened. Deriving dealer ids and
/// assigning vehicles cannot fail, so only the I/O stages appear here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    AcquireDataset,
    ListVehicles,
    FetchVehicles,
    FetchDealers,
    Submit,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::AcquireDataset => "acquire dataset",
            Stage::ListVehicles => "list vehicles",
            Stage::FetchVehicles => "fetch vehicles",
            Stage::FetchDealers => "fetch dealers",
            Stage::Submit => "submit",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum DealerApiError {
    /// Request could not be sent, timed out, or came back with a non-success status
    #[error("Transport error for {url}: {message}")]
    Transport {
        url: String,
        status: Option<u16>,
        message: String,
    },

    /// Response body was not valid JSON or lacked a required field
    #[error("Failed to decode {resource}: {message}")]
    Decode { resource: String, message: String },

    /// Request payload could not be serialized
    #[error("Failed to encode {resource}: {message}")]
    Encode { resource: String, message: String },

    /// A member of a fan-out batch failed
    #[error("Fetch for id {id} failed")]
    Aggregate {
        id: i32,
        #[source]
        source: Box<DealerApiError>,
    },

    /// Failure attributed to the pipeline stage it occurred in
    #[error("Stage '{stage}' failed")]
    Stage {
        stage: Stage,
        #[source]
        source: Box<DealerApiError>,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl DealerApiError {
    pub fn transport(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transport {
            url: url.into(),
            status: None,
            message: message.into(),
        }
    }

    pub fn status(url: impl Into<String>, status: u16) -> Self {
        Self::Transport {
            url: url.into(),
            status: Some(status),
            message: format!("unexpected status {}", status),
        }
    }

    pub fn decode(resource: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Decode {
            resource: resource.into(),
            message: message.to_string(),
        }
    }

    pub fn encode(resource: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Encode {
            resource: resource.into(),
            message: message.to_string(),
        }
    }

    pub fn aggregate(id: i32, source: DealerApiError) -> Self {
        Self::Aggregate {
            id,
            source: Box::new(source),
        }
    }

    /// Tag this error with the stage it surfaced in
    pub fn in_stage(self, stage: Stage) -> Self {
        Self::Stage {
            stage,
            source: Box::new(self),
        }
    }

    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            _ => None,
        }
    }

    /// Innermost error, skipping stage and aggregate wrappers
    pub fn root(&self) -> &DealerApiError {
        match self {
            Self::Stage { source, .. } | Self::Aggregate { source, .. } => source.root(),
            other => other,
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self.root(), Self::Transport { .. })
    }

    pub fn is_decode(&self) -> bool {
        matches!(self.root(), Self::Decode { .. })
    }
}

/// Result type alias for client and pipeline operations
pub type Result<T> = std::result::Result<T, DealerApiError>;
