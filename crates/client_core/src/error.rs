use risk_model::ModelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("invalid data base url '{0}'")]
    InvalidBaseUrl(String),
    #[error("no location selected")]
    EmptySelection,
    #[error("case data unavailable at {url}: HTTP {status}")]
    CasesUnavailable { url: String, status: u16 },
    #[error("location index unavailable at {url}: HTTP {status}")]
    LocationsUnavailable { url: String, status: u16 },
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error(transparent)]
    Fetch(#[from] OrchestratorError),
    #[error("cannot report on {location}: {source}")]
    Model {
        location: String,
        #[source]
        source: ModelError,
    },
}
