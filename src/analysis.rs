//! Fact-check data model shared by the proxy, relay and presenter.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

/// Lowest reliability score the model may report.
pub const MIN_SCORE: f64 = 0.0;
/// Highest reliability score the model may report.
pub const MAX_SCORE: f64 = 100.0;

/// Body of `POST /fact-check`.
///
/// `text` is optional at the type level so a missing field can be reported
/// with the same client error as an empty one.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisRequest {
    #[serde(default)]
    pub text: Option<String>,
}

impl AnalysisRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
        }
    }

    /// The text to analyze, if present and not blank.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.trim().is_empty())
    }
}

/// Normalized result of a fact-check.
///
/// `score` is optional: a result synthesized on the client may carry no
/// score at all, which is distinct from a computed score of zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ResultWire", into = "ResultWire")]
pub struct AnalysisResult {
    pub score: Option<f64>,
    pub summary: String,
    pub sources: Vec<String>,
    /// JSON key the score is written under.
    pub score_key: ScoreKey,
}

/// Key carrying the score in a serialized result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScoreKey {
    /// `score`, used by the proxy response.
    #[default]
    Score,
    /// `reliability_score`, used by the stored failure placeholder.
    ReliabilityScore,
}

#[derive(Serialize, Deserialize)]
struct ResultWire {
    #[serde(default, skip_serializing_if = "Option::is_none", serialize_with = "write_score")]
    score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none", serialize_with = "write_score")]
    reliability_score: Option<f64>,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    sources: Vec<String>,
}

impl From<ResultWire> for AnalysisResult {
    fn from(wire: ResultWire) -> Self {
        let (score, score_key) = match (wire.score, wire.reliability_score) {
            (None, Some(legacy)) => (Some(legacy), ScoreKey::ReliabilityScore),
            (score, _) => (score, ScoreKey::Score),
        };
        Self {
            score,
            summary: wire.summary,
            sources: wire.sources,
            score_key,
        }
    }
}

impl From<AnalysisResult> for ResultWire {
    fn from(result: AnalysisResult) -> Self {
        let (score, reliability_score) = match result.score_key {
            ScoreKey::Score => (result.score, None),
            ScoreKey::ReliabilityScore => (None, result.score),
        };
        Self {
            score,
            reliability_score,
            summary: result.summary,
            sources: result.sources,
        }
    }
}

/// Whole-number scores are written as JSON integers, as the model sent them.
fn write_score<S: Serializer>(score: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error> {
    match *score {
        Some(s) if s.fract() == 0.0 && s.abs() <= i64::MAX as f64 => {
            serializer.serialize_some(&(s as i64))
        }
        Some(s) => serializer.serialize_some(&s),
        None => serializer.serialize_none(),
    }
}

impl AnalysisResult {
    pub fn new(score: f64, summary: impl Into<String>, sources: Vec<String>) -> Self {
        Self {
            score: Some(score),
            summary: summary.into(),
            sources,
            score_key: ScoreKey::Score,
        }
    }

    /// Validate a parsed model response against the fixed output schema.
    ///
    /// The value must be an object with a numeric `score` in `[0, 100]`, a
    /// string `summary`, and `sources` as an array of strings. Extra fields
    /// are dropped.
    pub fn from_model_output(value: &Value) -> Result<Self, ShapeError> {
        let obj = value.as_object().ok_or(ShapeError::NotAnObject)?;

        let score = obj
            .get("score")
            .ok_or(ShapeError::MissingField("score"))?
            .as_f64()
            .ok_or(ShapeError::WrongType("score", "number"))?;
        if !(MIN_SCORE..=MAX_SCORE).contains(&score) {
            return Err(ShapeError::ScoreOutOfRange(score));
        }

        let summary = obj
            .get("summary")
            .ok_or(ShapeError::MissingField("summary"))?
            .as_str()
            .ok_or(ShapeError::WrongType("summary", "string"))?
            .to_string();

        let sources = obj
            .get("sources")
            .ok_or(ShapeError::MissingField("sources"))?
            .as_array()
            .ok_or(ShapeError::WrongType("sources", "array"))?
            .iter()
            .map(|s| {
                s.as_str()
                    .map(str::to_string)
                    .ok_or(ShapeError::WrongType("sources[]", "string"))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self::new(score, summary, sources))
    }
}

/// Ways a model response can fail schema validation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ShapeError {
    #[error("expected a JSON object")]
    NotAnObject,
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    #[error("field `{0}` must be a {1}")]
    WrongType(&'static str, &'static str),
    #[error("score {0} is outside 0..=100")]
    ScoreOutOfRange(f64),
}
