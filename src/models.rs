//! Data models for evaluation results.
//!
//! This module contains the canonical, fully-typed shape of a site
//! evaluation as reconstructed from the backend payload, plus the
//! run-listing types returned by the runs endpoint.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Untyped payload as returned by the evaluation endpoint.
pub type RawPayload = Value;

/// Coarse quality band for a score in the 0-100 convention range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoreBand {
    /// Below 40
    Poor,
    /// 40 up to 70
    Fair,
    /// 70 and above
    Good,
}

impl ScoreBand {
    /// Classify a score.
    pub fn from_score(score: f64) -> Self {
        if score >= 70.0 {
            ScoreBand::Good
        } else if score >= 40.0 {
            ScoreBand::Fair
        } else {
            ScoreBand::Poor
        }
    }

    /// Returns an emoji representation of the band.
    pub fn emoji(&self) -> &'static str {
        match self {
            ScoreBand::Good => "🟢",
            ScoreBand::Fair => "🟡",
            ScoreBand::Poor => "🔴",
        }
    }
}

impl fmt::Display for ScoreBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScoreBand::Good => write!(f, "Good"),
            ScoreBand::Fair => write!(f, "Fair"),
            ScoreBand::Poor => write!(f, "Poor"),
        }
    }
}

/// Outcome of a single heuristic check on an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CheckStatus {
    Pass,
    Fail,
}

impl CheckStatus {
    /// Anything other than a case-insensitive `pass` counts as a failure.
    pub fn parse(s: &str) -> Self {
        if s.trim().eq_ignore_ascii_case("pass") {
            CheckStatus::Pass
        } else {
            CheckStatus::Fail
        }
    }
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CheckStatus::Pass => write!(f, "PASS"),
            CheckStatus::Fail => write!(f, "FAIL"),
        }
    }
}

/// The inspected UI element a checklist item refers to.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementInfo {
    pub tag: String,
    pub text: String,
    pub class: String,
}

/// One named check applied to an element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeuristicCheck {
    pub name: String,
    pub status: CheckStatus,
    pub message: String,
}

/// One inspected UI element and the checks that ran against it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HeuristicCheckItem {
    pub element: ElementInfo,
    pub checks: Vec<HeuristicCheck>,
}

impl HeuristicCheckItem {
    /// Number of failed checks on this element.
    pub fn failed_count(&self) -> usize {
        self.checks
            .iter()
            .filter(|c| c.status == CheckStatus::Fail)
            .count()
    }
}

/// A passed or failed check attached to a score.
///
/// The backend uses either `check` or `name` for the label; any other
/// keys are preserved in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub check: String,
    pub message: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Score for one dimension plus the checks that produced it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub score: f64,
    pub passed: Vec<CheckOutcome>,
    pub failed: Vec<CheckOutcome>,
}

/// Measured response latency of an interaction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LatencyInfo {
    pub duration_ms: f64,
    pub status: String,
    pub description: String,
}

impl LatencyInfo {
    pub fn is_slow(&self) -> bool {
        self.status.eq_ignore_ascii_case("slow")
    }
}

/// Efficiency result of an edge, optionally carrying latency.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeEfficiency {
    #[serde(flatten)]
    pub result: ScoreResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency: Option<LatencyInfo>,
}

/// Per-dimension results of an edge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EdgeResult {
    pub learnability: ScoreResult,
    pub efficiency: EdgeEfficiency,
    pub control: ScoreResult,
}

/// One user interaction between two pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeEvaluation {
    pub edge_id: String,
    /// Never empty: defaults to the first known node.
    pub from_node_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_node_id: Option<String>,
    pub action: String,
    pub result: EdgeResult,
}

/// One keystroke-level-model step of a workflow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct KlmStep {
    pub step: u64,
    pub action: String,
    pub ops: Vec<String>,
    pub est_time: f64,
}

/// Step-by-step operator/time breakdown of a workflow.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionEfficiency {
    pub klm_breakdown: Vec<KlmStep>,
    pub total_estimated_time_s: f64,
}

/// A target flagged as too small or too close to its neighbours.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FittsIssue {
    pub step: u64,
    #[serde(rename = "ID")]
    pub id: String,
    pub target: String,
    pub message: String,
    pub distance: f64,
    pub width: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetSizeSpacing {
    pub fitts_issues: Vec<FittsIssue>,
}

/// Efficiency result of a workflow with its optional breakdowns.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowEfficiency {
    #[serde(flatten)]
    pub result: ScoreResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interaction_efficiency: Option<InteractionEfficiency>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_size_spacing: Option<TargetSizeSpacing>,
}

impl WorkflowEfficiency {
    pub fn fitts_issues(&self) -> &[FittsIssue] {
        self.target_size_spacing
            .as_ref()
            .map(|t| t.fitts_issues.as_slice())
            .unwrap_or(&[])
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowResult {
    pub learnability: ScoreResult,
    pub efficiency: WorkflowEfficiency,
    pub control: ScoreResult,
}

/// One traversed path through the site.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkflowEvaluation {
    pub path_index: u64,
    /// Node identifiers joined by ` -> `.
    pub path_summary: String,
    pub result: WorkflowResult,
}

/// One analyzed page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeEvaluation {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub node_id: String,
    pub url: String,
    pub learnability_score: f64,
    pub efficiency_score: f64,
    pub control_score: f64,
    pub learnability_items: Vec<HeuristicCheckItem>,
    pub efficiency_items: Vec<HeuristicCheckItem>,
    pub control_items: Vec<HeuristicCheckItem>,
    /// Fields the backend sent that the model does not name.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Root aggregate of one run's evaluation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SiteEvaluation {
    pub id: String,
    pub run_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    pub target_url: String,
    pub total_score: f64,
    pub learnability_score: f64,
    pub efficiency_score: f64,
    pub control_score: f64,
    /// Counts are trusted as sent, not recomputed from the collections.
    pub node_count: u64,
    pub edge_count: u64,
    pub path_count: u64,
    pub node_evaluations: Vec<NodeEvaluation>,
    pub edge_evaluations: Vec<EdgeEvaluation>,
    pub workflow_evaluations: Vec<WorkflowEvaluation>,
}

impl SiteEvaluation {
    /// Look up a node by identifier.
    pub fn node(&self, node_id: &str) -> Option<&NodeEvaluation> {
        self.node_evaluations.iter().find(|n| n.node_id == node_id)
    }
}

/// Lifecycle status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
    Stopped,
    #[serde(other)]
    Unknown,
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Running => write!(f, "running"),
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::Failed => write!(f, "failed"),
            RunStatus::Stopped => write!(f, "stopped"),
            RunStatus::Unknown => write!(f, "unknown"),
        }
    }
}

/// Score summary attached to a finished run in the listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunEvaluationSummary {
    pub id: String,
    pub total_score: f64,
    pub learnability_score: f64,
    pub efficiency_score: f64,
    pub control_score: f64,
    pub created_at: String,
}

/// One entry of the runs listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunListItem {
    pub run_id: String,
    pub status: RunStatus,
    pub target_url: String,
    #[serde(default)]
    pub start_url: String,
    pub created_at: String,
    #[serde(default)]
    pub completed_at: Option<String>,
    #[serde(default)]
    pub execution_time: Option<f64>,
    #[serde(default)]
    pub evaluation: Option<RunEvaluationSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunsListResponse {
    pub runs: Vec<RunListItem>,
    pub total: u64,
    pub limit: u64,
    pub offset: u64,
}

/// Format a run's execution time, e.g. `42s` or `3m 5s`.
pub fn format_execution_time(seconds: Option<f64>) -> Option<String> {
    let seconds = seconds.filter(|s| *s > 0.0 && s.is_finite())?;
    if seconds < 60.0 {
        return Some(format!("{}s", seconds.round() as u64));
    }
    let minutes = (seconds / 60.0).floor() as u64;
    let remaining = (seconds % 60.0).round() as u64;
    Some(format!("{}m {}s", minutes, remaining))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_band_thresholds() {
        assert_eq!(ScoreBand::from_score(70.0), ScoreBand::Good);
        assert_eq!(ScoreBand::from_score(69.9), ScoreBand::Fair);
        assert_eq!(ScoreBand::from_score(40.0), ScoreBand::Fair);
        assert_eq!(ScoreBand::from_score(39.9), ScoreBand::Poor);
        assert_eq!(ScoreBand::Good.emoji(), "🟢");
    }

    #[test]
    fn test_check_status_parse() {
        assert_eq!(CheckStatus::parse("PASS"), CheckStatus::Pass);
        assert_eq!(CheckStatus::parse(" pass "), CheckStatus::Pass);
        assert_eq!(CheckStatus::parse("FAIL"), CheckStatus::Fail);
        assert_eq!(CheckStatus::parse("warning"), CheckStatus::Fail);
    }

    #[test]
    fn test_run_status_unknown_variant() {
        let item: RunListItem = serde_json::from_str(
            r#"{"run_id":"r1","status":"queued","target_url":"https://a.io","created_at":"2024-01-01"}"#,
        )
        .unwrap();
        assert_eq!(item.status, RunStatus::Unknown);
        assert!(item.evaluation.is_none());
    }

    #[test]
    fn test_format_execution_time() {
        assert_eq!(format_execution_time(None), None);
        assert_eq!(format_execution_time(Some(0.0)), None);
        assert_eq!(format_execution_time(Some(42.4)).as_deref(), Some("42s"));
        assert_eq!(format_execution_time(Some(185.0)).as_deref(), Some("3m 5s"));
    }

    #[test]
    fn test_latency_is_slow() {
        let latency = LatencyInfo {
            duration_ms: 3200.0,
            status: "Slow".to_string(),
            description: "".to_string(),
        };
        assert!(latency.is_slow());
    }
}
