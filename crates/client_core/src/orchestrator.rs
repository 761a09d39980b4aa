//! Fetching case and death series for the current selection.
//!
//! One [`DataOrchestrator`] serves one session. It owns the slot describing
//! the request whose result may still reach the view: starting a request
//! cancels the previous one, and results are only delivered while their
//! [`Ticket`] is still current.

use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use reqwest::Client;
use shared::{
    domain::SelectionPath,
    protocol::{Cases, Deaths, LocationData, SeriesKind},
};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use url::Url;

use crate::{error::OrchestratorError, locations::LocationTree};

/// Identifies one issued request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

/// A request that has been issued but not yet fetched. Dropping it leaves
/// the ticket current until the next request or [`DataOrchestrator::cancel_current`].
#[derive(Debug)]
pub struct PendingRequest {
    ticket: Ticket,
    cancelled: oneshot::Receiver<()>,
}

impl PendingRequest {
    pub fn ticket(&self) -> Ticket {
        self.ticket
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SeriesPair {
    pub cases: Cases,
    pub deaths: Option<Deaths>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum FetchOutcome {
    Fresh { ticket: Ticket, data: SeriesPair },
    Superseded,
}

#[derive(Debug, Default)]
struct InFlight {
    generation: u64,
    cancel: Option<oneshot::Sender<()>>,
}

impl InFlight {
    fn supersede(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            let _ = cancel.send(());
        }
        self.generation += 1;
    }
}

pub struct DataOrchestrator {
    http: Client,
    base_url: Url,
    current: Mutex<InFlight>,
}

impl DataOrchestrator {
    pub fn new(base_url: &str) -> Result<Self, OrchestratorError> {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: &str) -> Result<Self, OrchestratorError> {
        let base_url = Url::parse(base_url)
            .ok()
            .filter(|url| !url.cannot_be_a_base())
            .ok_or_else(|| OrchestratorError::InvalidBaseUrl(base_url.to_string()))?;
        Ok(Self {
            http,
            base_url,
            current: Mutex::new(InFlight::default()),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Loads `/data/locations.json`.
    pub async fn fetch_locations(&self) -> Result<LocationTree, OrchestratorError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| OrchestratorError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["data", "locations.json"]);

        info!(url = %url, "data: fetching location index");
        let response = self.http.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(OrchestratorError::LocationsUnavailable {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        let data: LocationData = response.json().await?;
        info!(countries = data.countries.len(), "data: location index loaded");
        Ok(data.into())
    }

    /// Issues a new request, cancelling whichever one was current.
    pub fn begin(&self) -> PendingRequest {
        let mut slot = self.slot();
        slot.supersede();
        let (cancel, cancelled) = oneshot::channel();
        slot.cancel = Some(cancel);
        PendingRequest {
            ticket: Ticket(slot.generation),
            cancelled,
        }
    }

    /// Cancels the current request without issuing another.
    pub fn cancel_current(&self) {
        self.slot().supersede();
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        self.slot().generation == ticket.0
    }

    /// Runs `deliver` only if `ticket` is still current. The slot stays
    /// locked meanwhile, so no newer request can be issued in between;
    /// `deliver` must not call back into this orchestrator.
    pub fn deliver<F: FnOnce()>(&self, ticket: Ticket, deliver: F) -> bool {
        let slot = self.slot();
        if slot.generation != ticket.0 {
            return false;
        }
        deliver();
        true
    }

    /// [`DataOrchestrator::begin`] followed by [`DataOrchestrator::fetch`].
    pub async fn fetch_for(
        &self,
        path: &SelectionPath,
        version: Option<&str>,
    ) -> Result<FetchOutcome, OrchestratorError> {
        let request = self.begin();
        self.fetch(request, path, version).await
    }

    /// Fetches cases and deaths for `path` concurrently.
    ///
    /// `version` is the cache-busting token; the current time is used when
    /// none is given. A superseded request yields
    /// [`FetchOutcome::Superseded`], including when its result or error was
    /// already in hand. Death data is optional and its failure is ignored;
    /// a case failure is returned without waiting for the death fetch.
    pub async fn fetch(
        &self,
        request: PendingRequest,
        path: &SelectionPath,
        version: Option<&str>,
    ) -> Result<FetchOutcome, OrchestratorError> {
        let PendingRequest {
            ticket,
            mut cancelled,
        } = request;

        let token = match version {
            Some(version) => version.to_string(),
            None => Utc::now().timestamp_millis().to_string(),
        };
        let cases_url = data_url(&self.base_url, SeriesKind::Cases, path, &token)?;
        let deaths_url = data_url(&self.base_url, SeriesKind::Deaths, path, &token)?;
        info!(selection = %path, url = %cases_url, "data: fetching series");

        // A case failure ends the join at once; deaths never hold it back.
        let joined = tokio::select! {
            biased;
            _ = &mut cancelled => {
                debug!(selection = %path, "data: request cancelled in flight");
                return Ok(FetchOutcome::Superseded);
            }
            results = async {
                tokio::try_join!(self.fetch_cases(&cases_url), async {
                    Ok::<_, OrchestratorError>(self.fetch_deaths(&deaths_url).await)
                })
            } => results,
        };

        if !self.is_current(ticket) {
            debug!(selection = %path, "data: discarding stale response");
            return Ok(FetchOutcome::Superseded);
        }

        let (cases, deaths) = joined?;
        Ok(FetchOutcome::Fresh {
            ticket,
            data: SeriesPair { cases, deaths },
        })
    }

    async fn fetch_cases(&self, url: &Url) -> Result<Cases, OrchestratorError> {
        let response = self.http.get(url.clone()).send().await?;
        let status = response.status();
        if !status.is_success() {
            warn!(url = %url, status = status.as_u16(), "data: case fetch failed");
            return Err(OrchestratorError::CasesUnavailable {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }
        Ok(response.json().await?)
    }

    async fn fetch_deaths(&self, url: &Url) -> Option<Deaths> {
        let response = match self.http.get(url.clone()).send().await {
            Ok(response) => response,
            Err(err) => {
                debug!(url = %url, error = %err, "data: death fetch failed");
                return None;
            }
        };
        if !response.status().is_success() {
            debug!(
                url = %url,
                status = response.status().as_u16(),
                "data: death data unavailable"
            );
            return None;
        }
        match response.json().await {
            Ok(deaths) => Some(deaths),
            Err(err) => {
                debug!(url = %url, error = %err, "data: death data unreadable");
                None
            }
        }
    }

    fn slot(&self) -> MutexGuard<'_, InFlight> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// `<base>/data/<kind>/<country>[/<province>[/<county>]].json?_=<token>`,
/// with each name percent-encoded as a path segment.
pub fn data_url(
    base: &Url,
    kind: SeriesKind,
    path: &SelectionPath,
    token: &str,
) -> Result<Url, OrchestratorError> {
    let Some((leaf, parents)) = path.segments().split_last() else {
        return Err(OrchestratorError::EmptySelection);
    };

    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| OrchestratorError::InvalidBaseUrl(base.to_string()))?
        .pop_if_empty()
        .extend(["data", kind.as_str()])
        .extend(parents.iter().map(String::as_str))
        .push(&format!("{leaf}.json"));
    url.query_pairs_mut().clear().append_pair("_", token);
    Ok(url)
}

#[cfg(test)]
#[path = "tests/orchestrator_tests.rs"]
mod tests;
