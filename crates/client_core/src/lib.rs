//! Client-side core of the exposure-risk viewer: location lookup, data
//! fetching for the current selection, report construction and the
//! cascading selection controller.

pub mod controller;
pub mod error;
pub mod locations;
pub mod orchestrator;
pub mod report;

pub use controller::{ControllerConfig, RenderSink, SelectionController, SelectionState};
pub use error::{ControllerError, OrchestratorError};
pub use locations::{LocationTree, Pickers, ResolvedPath};
pub use orchestrator::{data_url, DataOrchestrator, FetchOutcome, PendingRequest, SeriesPair, Ticket};
pub use report::{build_report, Report, ReportSettings};

#[cfg(test)]
#[path = "tests/test_server.rs"]
mod test_server;
