//! Result presenter: a pure view of one `ExtensionState` snapshot.
//!
//! `present` decides what to show; `Display` on [`View`] renders it as text
//! for the terminal.

use crate::analysis::AnalysisResult;
use crate::relay::ExtensionState;
use std::fmt;

pub const IDLE_MESSAGE: &str =
    "Select some text, then choose \"Fact-Check Selected Text\" to analyze it.";
pub const ANALYZING_MESSAGE: &str = "Analyzing the selected text...";
pub const UNVERIFIED_SUMMARY: &str =
    "The service could not verify this claim based on immediate search results.";
pub const NO_SOURCES_MESSAGE: &str = "No specific sources were cited for this summary.";
pub const RECHECK_HINT: &str = "Select new text to run another check.";

/// Color band of a verified score.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RingColor {
    Green,
    Yellow,
    Red,
}

impl RingColor {
    pub fn for_score(score: f64) -> Self {
        if score > 70.0 {
            RingColor::Green
        } else if score > 40.0 {
            RingColor::Yellow
        } else {
            RingColor::Red
        }
    }

    pub fn hex(self) -> &'static str {
        match self {
            RingColor::Green => "#4CAF50",
            RingColor::Yellow => "#FFC107",
            RingColor::Red => "#F44336",
        }
    }
}

/// Why a result is shown as unverified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unverified {
    /// The result carried no score.
    Missing,
    /// The result carried a score of exactly zero.
    Zero,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScoreRing {
    Verified { score: f64, color: RingColor },
    Unverified(Unverified),
}

impl ScoreRing {
    pub fn for_score(score: Option<f64>) -> Self {
        match score {
            None => ScoreRing::Unverified(Unverified::Missing),
            Some(s) if s == 0.0 => ScoreRing::Unverified(Unverified::Zero),
            Some(s) => ScoreRing::Verified {
                score: s,
                color: RingColor::for_score(s),
            },
        }
    }

    /// Text inside the ring.
    pub fn label(&self) -> String {
        match self {
            ScoreRing::Verified { score, .. } => format!("{}%", score),
            ScoreRing::Unverified(_) => "--".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLink {
    pub title: String,
    pub url: String,
}

impl SourceLink {
    /// Title is the URL's host; unparseable URLs are shown as-is.
    pub fn from_url(url: &str) -> Self {
        let title = reqwest::Url::parse(url)
            .ok()
            .and_then(|u| u.host_str().map(|h| h.trim_start_matches("www.").to_string()))
            .unwrap_or_else(|| url.to_string());
        Self {
            title,
            url: url.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResultView {
    pub selected_text: String,
    pub ring: ScoreRing,
    pub summary: String,
    pub sources: Vec<SourceLink>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum View {
    Idle,
    Analyzing,
    Result(ResultView),
}

/// Build the view for `state`.
pub fn present(state: &ExtensionState) -> View {
    if state.is_analyzing {
        return View::Analyzing;
    }
    match &state.analysis_result {
        Some(result) => View::Result(result_view(&state.last_selected_text, result)),
        None => View::Idle,
    }
}

fn result_view(selected_text: &str, result: &AnalysisResult) -> ResultView {
    let ring = ScoreRing::for_score(result.score);
    let summary = match &ring {
        ScoreRing::Unverified(_) if result.summary.is_empty() => UNVERIFIED_SUMMARY.to_string(),
        _ => result.summary.clone(),
    };
    ResultView {
        selected_text: selected_text.to_string(),
        ring,
        summary,
        sources: result.sources.iter().map(|s| SourceLink::from_url(s)).collect(),
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            View::Idle => writeln!(f, "{}", IDLE_MESSAGE),
            View::Analyzing => {
                writeln!(f, "{}", ANALYZING_MESSAGE)?;
                writeln!(f)?;
                writeln!(f, "{}", RECHECK_HINT)
            }
            View::Result(view) => write!(f, "{}", view),
        }
    }
}

impl fmt::Display for ResultView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Claim: \"{}\"", self.selected_text)?;
        match &self.ring {
            ScoreRing::Verified { color, .. } => {
                writeln!(f, "Reliability: {} ({})", self.ring.label(), color.hex())?;
            }
            ScoreRing::Unverified(_) => {
                writeln!(f, "Reliability: ❓ unverified ({})", self.ring.label())?;
            }
        }
        writeln!(f)?;
        writeln!(f, "{}", self.summary)?;
        writeln!(f)?;
        writeln!(f, "Sources:")?;
        if self.sources.is_empty() {
            writeln!(f, "  {}", NO_SOURCES_MESSAGE)?;
        }
        for (i, source) in self.sources.iter().enumerate() {
            writeln!(f, "  {}. {} ({})", i + 1, source.title, source.url)?;
        }
        writeln!(f)?;
        writeln!(f, "{}", RECHECK_HINT)
    }
}
