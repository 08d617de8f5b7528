//! Application state and the controller that owns it.

use crate::analyzer::Analyzer;
use crate::engine::AnalysisRequest;
use crate::error::AnalysisError;
use crate::history::HistoryStore;
use crate::model::InferenceModel;
use crate::payload::ImagePayload;
use crate::record::{AnalysisCore, AnalysisResult};
use serde::Serialize;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Tab {
    #[default]
    Result,
    History,
    Samples,
    Report,
}

#[derive(Debug, thiserror::Error)]
#[error("an analysis is already in progress")]
pub struct Busy;

/// UI-facing state. Mutated only through the transition methods.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    tab: Tab,
    current: Option<AnalysisResult>,
    busy: bool,
    last_error: Option<String>,
}

impl AppState {
    pub fn tab(&self) -> Tab {
        self.tab
    }

    pub fn current(&self) -> Option<&AnalysisResult> {
        self.current.as_ref()
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn select_tab(&mut self, tab: Tab) {
        self.tab = tab;
    }

    /// Marks an analysis as in flight. Rejected while another one is pending.
    pub fn start_analysis(&mut self) -> Result<(), Busy> {
        if self.busy {
            return Err(Busy);
        }
        self.busy = true;
        self.last_error = None;
        Ok(())
    }

    pub fn analysis_succeeded(&mut self, record: AnalysisResult) {
        self.busy = false;
        self.current = Some(record);
        self.tab = Tab::Result;
    }

    /// Keeps the previous result; only the error message changes.
    pub fn analysis_failed(&mut self, message: String) {
        self.busy = false;
        self.last_error = Some(message);
    }

    /// Shows a stored or sample record as the current result.
    pub fn view_entry(&mut self, record: AnalysisResult) {
        self.current = Some(record);
        self.tab = Tab::Result;
    }
}

/// Top-level controller: application state plus the history it renders.
pub struct App {
    state: AppState,
    history: HistoryStore,
}

impl App {
    pub fn new(history: HistoryStore) -> Self {
        Self {
            state: AppState::default(),
            history,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut AppState {
        &mut self.state
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    /// Runs a full submission synchronously.
    pub fn analyze<M: InferenceModel>(
        &mut self,
        analyzer: &mut Analyzer<M>,
        image: ImagePayload,
        age: Option<u32>,
    ) -> Result<&AnalysisResult, AnalysisError> {
        // callers holding `&mut self` cannot overlap submissions
        self.state
            .start_analysis()
            .map_err(|e| AnalysisError::AnalysisFailed(Box::new(e)))?;
        let outcome = analyzer.analyze(&image, age);
        self.finish_analysis(AnalysisRequest { image, age }, outcome)
    }

    /// Applies the outcome of an analysis started with [`AppState::start_analysis`].
    ///
    /// On success the record is stamped, shown and recorded. On failure nothing
    /// is persisted and the previous result stays in place.
    pub fn finish_analysis(
        &mut self,
        request: AnalysisRequest,
        outcome: Result<AnalysisCore, AnalysisError>,
    ) -> Result<&AnalysisResult, AnalysisError> {
        match outcome {
            Ok(core) => {
                let record = AnalysisResult::new(core, request.image.to_data_url(), request.age);
                log::info!(
                    "Analysis complete: {} / {} / severity {}",
                    record.core.wound_type,
                    record.core.stage,
                    record.core.severity
                );
                if let Err(e) = self.history.record(record.clone()) {
                    log::warn!("History not saved: {e}");
                }
                self.state.analysis_succeeded(record);
                self.state
                    .current()
                    .ok_or_else(|| AnalysisError::AnalysisFailed("result was not retained".into()))
            }
            Err(e) => {
                self.state.analysis_failed(e.to_string());
                Err(e)
            }
        }
    }

    /// Makes the history entry at `index` the current result.
    pub fn view_history_entry(&mut self, index: usize) -> Option<&AnalysisResult> {
        let record = self.history.select_by_index(index)?.clone();
        self.state.view_entry(record);
        self.state.current()
    }
}
