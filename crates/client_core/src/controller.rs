//! Cascading country → province → county selection.
//!
//! Any UI layer drives the controller through the three `on_*_changed`
//! handlers. Each handler updates the selection, shows the pickers for the
//! new selection, persists it and renders it through a [`RenderSink`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use shared::domain::SelectionPath;
use storage::SelectionStore;
use tracing::{debug, info, warn};

use crate::{
    error::ControllerError,
    locations::{LocationTree, Pickers},
    orchestrator::{DataOrchestrator, FetchOutcome, PendingRequest},
    report::{build_report, Report, ReportSettings},
};

/// Receives everything the view shows.
///
/// `render` and `clear` are called while the orchestrator decides which
/// request is current and must not call back into the controller.
pub trait RenderSink: Send + Sync {
    fn show_pickers(&self, pickers: &Pickers);
    fn render(&self, report: &Report);
    /// Blank the report area; used for an empty selection and on errors.
    fn clear(&self);
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SelectionState {
    NoSelection,
    CountrySelected {
        country: String,
    },
    ProvinceSelected {
        country: String,
        province: String,
    },
    CountySelected {
        country: String,
        province: String,
        county: String,
    },
}

impl From<&SelectionPath> for SelectionState {
    fn from(path: &SelectionPath) -> Self {
        match path.segments() {
            [] => SelectionState::NoSelection,
            [country] => SelectionState::CountrySelected {
                country: country.clone(),
            },
            [country, province] => SelectionState::ProvinceSelected {
                country: country.clone(),
                province: province.clone(),
            },
            [country, province, county, ..] => SelectionState::CountySelected {
                country: country.clone(),
                province: province.clone(),
                county: county.clone(),
            },
        }
    }
}

#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub report: ReportSettings,
    /// Cache-busting token for data URLs; the current time when unset.
    pub data_version: Option<String>,
}

struct ControllerState {
    path: SelectionPath,
    settings: ReportSettings,
}

pub struct SelectionController {
    tree: LocationTree,
    store: SelectionStore,
    orchestrator: DataOrchestrator,
    sink: Arc<dyn RenderSink>,
    data_version: Option<String>,
    state: Mutex<ControllerState>,
    persist_gate: tokio::sync::Mutex<()>,
}

impl SelectionController {
    pub fn new(
        tree: LocationTree,
        store: SelectionStore,
        orchestrator: DataOrchestrator,
        sink: Arc<dyn RenderSink>,
        config: ControllerConfig,
    ) -> Arc<Self> {
        Arc::new(Self {
            tree,
            store,
            orchestrator,
            sink,
            data_version: config.data_version,
            state: Mutex::new(ControllerState {
                path: SelectionPath::empty(),
                settings: config.report,
            }),
            persist_gate: tokio::sync::Mutex::new(()),
        })
    }

    pub fn tree(&self) -> &LocationTree {
        &self.tree
    }

    pub fn path(&self) -> SelectionPath {
        self.lock_state().path.clone()
    }

    pub fn state(&self) -> SelectionState {
        SelectionState::from(&self.lock_state().path)
    }

    pub fn pickers(&self) -> Pickers {
        self.tree.pickers(&self.lock_state().path)
    }

    pub fn report_settings(&self) -> ReportSettings {
        self.lock_state().settings.clone()
    }

    /// Re-applies the remembered selection against the current tree. Names
    /// that no longer exist drop that level and everything below it.
    pub async fn restore(&self) -> Result<SelectionState, ControllerError> {
        let saved = self.store.load().await;
        let resolved = self.tree.resolve(&saved).path;
        if resolved.len() < saved.len() {
            info!(saved = %saved, restored = %resolved, "selection: dropped stale levels");
        }
        self.apply(resolved, false).await
    }

    pub async fn on_country_changed(&self, name: &str) -> Result<SelectionState, ControllerError> {
        let next = match self.tree.find_country(name) {
            Some(country) => extended(&SelectionPath::empty(), &country.name),
            None => {
                if !name.is_empty() {
                    debug!(country = name, "selection: unknown country");
                }
                SelectionPath::empty()
            }
        };
        self.apply(next, true).await
    }

    /// No-op unless a country with provinces is selected.
    pub async fn on_province_changed(&self, name: &str) -> Result<SelectionState, ControllerError> {
        let current = self.path();
        let resolved = self.tree.resolve(&current.truncated(1));
        let Some(country) = resolved.leaf().filter(|node| node.has_children()) else {
            debug!(province = name, "selection: ignoring province without a country");
            return Ok(self.state());
        };
        let next = match country.child(name) {
            Some(province) => extended(&resolved.path, &province.name),
            None => resolved.path,
        };
        self.apply(next, true).await
    }

    /// No-op unless a province with counties is selected.
    pub async fn on_county_changed(&self, name: &str) -> Result<SelectionState, ControllerError> {
        let current = self.path();
        let resolved = self.tree.resolve(&current.truncated(2));
        let Some(province) = resolved
            .leaf()
            .filter(|node| resolved.path.len() == 2 && node.has_children())
        else {
            debug!(county = name, "selection: ignoring county without a province");
            return Ok(self.state());
        };
        let next = match province.child(name) {
            Some(county) => extended(&resolved.path, &county.name),
            None => resolved.path,
        };
        self.apply(next, true).await
    }

    /// Replaces the report inputs and re-renders the current selection.
    pub async fn set_report_settings(
        &self,
        settings: ReportSettings,
    ) -> Result<SelectionState, ControllerError> {
        let (path, request) = {
            let mut state = self.lock_state();
            state.settings = settings;
            let request = (!state.path.is_empty()).then(|| self.orchestrator.begin());
            (state.path.clone(), request)
        };
        if let Some(request) = request {
            self.render(request, &path).await?;
        }
        Ok(SelectionState::from(&path))
    }

    pub async fn set_summary_group_size(
        &self,
        group_size: u32,
    ) -> Result<SelectionState, ControllerError> {
        let mut settings = self.report_settings();
        settings.summary_group_size = group_size;
        self.set_report_settings(settings).await
    }

    /// Everything up to the first await runs synchronously, so the request
    /// issued here supersedes any issued by an earlier event.
    async fn apply(
        &self,
        next: SelectionPath,
        persist: bool,
    ) -> Result<SelectionState, ControllerError> {
        let request = {
            let mut state = self.lock_state();
            state.path = next.clone();
            if next.is_empty() {
                self.orchestrator.cancel_current();
                None
            } else {
                Some(self.orchestrator.begin())
            }
        };
        info!(selection = %next, "selection: changed");

        self.sink.show_pickers(&self.tree.pickers(&next));
        if request.is_none() {
            self.sink.clear();
        }
        if persist {
            self.persist().await;
        }
        if let Some(request) = request {
            self.render(request, &next).await?;
        }
        Ok(SelectionState::from(&next))
    }

    /// Saves whatever is selected when the save runs, so the last write
    /// always holds the latest selection.
    async fn persist(&self) {
        let _gate = self.persist_gate.lock().await;
        let path = self.path();
        self.store.save(&path).await;
    }

    async fn render(
        &self,
        request: PendingRequest,
        path: &SelectionPath,
    ) -> Result<(), ControllerError> {
        let ticket = request.ticket();
        let outcome = match self
            .orchestrator
            .fetch(request, path, self.data_version.as_deref())
            .await
        {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(selection = %path, error = %err, "selection: data fetch failed");
                self.orchestrator.deliver(ticket, || self.sink.clear());
                return Err(err.into());
            }
        };

        let FetchOutcome::Fresh { data, .. } = outcome else {
            debug!(selection = %path, "selection: render skipped for superseded request");
            return Ok(());
        };

        let settings = self.report_settings();
        match build_report(path, &data, &settings) {
            Ok(report) => {
                if !self.orchestrator.deliver(ticket, || self.sink.render(&report)) {
                    debug!(selection = %path, "selection: report superseded before render");
                }
                Ok(())
            }
            Err(source) => {
                self.orchestrator.deliver(ticket, || self.sink.clear());
                Err(ControllerError::Model {
                    location: path.to_string(),
                    source,
                })
            }
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// `path` with one more level; names come from the tree, so never empty.
fn extended(path: &SelectionPath, name: &str) -> SelectionPath {
    let mut segments: Vec<Option<String>> = path.segments().iter().cloned().map(Some).collect();
    segments.push(Some(name.to_string()));
    SelectionPath::from(segments)
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
