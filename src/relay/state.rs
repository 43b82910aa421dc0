//! Persisted relay state
//!
//! One JSON document, written whole on every transition. Keys are camelCase
//! to match what browser-side readers expect.

use crate::analysis::{AnalysisResult, ScoreKey};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Summary shown when the proxy cannot be reached or answers with an error.
pub const CONNECTION_FAILURE_SUMMARY: &str = "Could not connect to the fact-checking service. \
Please check your internet connection or try again later.";

/// Identifier of one analysis cycle. Strictly increasing per state document.
pub type RequestId = u64;

/// Where the current cycle stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Analyzing,
    Succeeded,
    Failed,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionState {
    #[serde(default)]
    pub last_selected_text: String,
    #[serde(default)]
    pub analysis_result: Option<AnalysisResult>,
    #[serde(default)]
    pub is_analyzing: bool,
    /// Id of the most recently dispatched cycle.
    #[serde(default)]
    pub request_id: RequestId,
    /// Failure text of the last cycle, if it failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl ExtensionState {
    pub fn phase(&self) -> Phase {
        if self.is_analyzing {
            Phase::Analyzing
        } else if self.analysis_result.is_none() {
            Phase::Idle
        } else if self.last_error.is_some() {
            Phase::Failed
        } else {
            Phase::Succeeded
        }
    }

    /// Start a new cycle for `text`, superseding any cycle in flight.
    pub(crate) fn begin(&mut self, text: &str) -> RequestId {
        self.request_id += 1;
        self.last_selected_text = text.to_string();
        self.analysis_result = None;
        self.is_analyzing = true;
        self.last_error = None;
        self.updated_at = Some(Utc::now());
        self.request_id
    }

    pub(crate) fn succeed(&mut self, result: AnalysisResult) {
        self.analysis_result = Some(result);
        self.is_analyzing = false;
        self.last_error = None;
        self.updated_at = Some(Utc::now());
    }

    pub(crate) fn fail(&mut self, error: String) {
        self.analysis_result = Some(connection_failure_result());
        self.is_analyzing = false;
        self.last_error = Some(error);
        self.updated_at = Some(Utc::now());
    }
}

/// The placeholder stored in place of a result when a cycle fails. Its score
/// is written under `reliability_score`.
pub fn connection_failure_result() -> AnalysisResult {
    AnalysisResult {
        score: Some(0.0),
        summary: CONNECTION_FAILURE_SUMMARY.to_string(),
        sources: Vec::new(),
        score_key: ScoreKey::ReliabilityScore,
    }
}
