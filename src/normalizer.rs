//! Payload normalization.
//!
//! The evaluation endpoint returns a flattened, partially denormalized
//! document whose shape is not guaranteed to be field-complete. This module
//! rebuilds the nested [`SiteEvaluation`] from it. Normalization never
//! fails: every absent or malformed field degrades to its default.
//!
//! Defaults:
//! - numbers: `0` (numeric strings are accepted, negative counts clamp to 0)
//! - strings: empty, except `id` (falls back to `run_id`), `created_at`
//!   (falls back to `timestamp`) and `target_url` (falls back to the first
//!   node's URL)
//! - sequences: empty
//! - edge `from_node_id`: the first node's id, or `"unknown"` without nodes
//! - edge `latency`: only built when `latency_duration_ms` is numeric
//! - workflow `path_index`: the entry's position in the list
//! - dimension results: `{score: 0, passed: [], failed: []}`

use crate::models::{
    CheckOutcome, CheckStatus, EdgeEfficiency, EdgeEvaluation, EdgeResult, ElementInfo,
    FittsIssue, HeuristicCheck, HeuristicCheckItem, InteractionEfficiency, KlmStep, LatencyInfo,
    NodeEvaluation, RawPayload, ScoreResult, SiteEvaluation, TargetSizeSpacing,
    WorkflowEfficiency, WorkflowEvaluation, WorkflowResult,
};
use serde_json::{json, Map, Value};

/// Source id used for edges when the payload carries no nodes at all.
pub const UNKNOWN_NODE_ID: &str = "unknown";

const DIMENSIONS: [&str; 3] = ["learnability", "efficiency", "control"];

/// Convert one raw payload into the canonical evaluation model.
pub fn normalize(raw: &RawPayload) -> SiteEvaluation {
    let mut root = Fields::new(raw);

    let node_evaluations: Vec<NodeEvaluation> = root
        .list("node_evaluations")
        .iter()
        .map(normalize_node)
        .collect();

    let default_source = node_evaluations
        .first()
        .map(|n| n.node_id.clone())
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| UNKNOWN_NODE_ID.to_string());

    let edge_evaluations = root
        .list("edge_evaluations")
        .iter()
        .map(|edge| normalize_edge(edge, &default_source))
        .collect();

    let workflow_evaluations = root
        .list("workflow_evaluations")
        .iter()
        .enumerate()
        .map(|(position, wf)| normalize_workflow(wf, position))
        .collect();

    let run_id = root.text("run_id");
    let timestamp = root.opt_text("timestamp");
    let target_url = root
        .opt_text("target_url")
        .or_else(|| {
            node_evaluations
                .first()
                .map(|n| n.url.clone())
                .filter(|url| !url.is_empty())
        })
        .unwrap_or_default();

    SiteEvaluation {
        id: root.opt_text("id").unwrap_or_else(|| run_id.clone()),
        created_at: root.opt_text("created_at").or_else(|| timestamp.clone()),
        timestamp,
        run_id,
        target_url,
        total_score: root.number("total_score"),
        learnability_score: root.number("learnability_score"),
        efficiency_score: root.number("efficiency_score"),
        control_score: root.number("control_score"),
        node_count: root.count("node_count"),
        edge_count: root.count("edge_count"),
        path_count: root.count("path_count"),
        node_evaluations,
        edge_evaluations,
        workflow_evaluations,
    }
}

fn normalize_node(raw: &Value) -> NodeEvaluation {
    let mut node = Fields::new(raw);
    NodeEvaluation {
        id: node.opt_text("id"),
        node_id: node.text("node_id"),
        url: node.text("url"),
        learnability_score: node.number("learnability_score"),
        efficiency_score: node.number("efficiency_score"),
        control_score: node.number("control_score"),
        learnability_items: check_items(&node.list("learnability_items")),
        efficiency_items: check_items(&node.list("efficiency_items")),
        control_items: check_items(&node.list("control_items")),
        extra: node.into_extra(),
    }
}

fn check_items(raw: &[Value]) -> Vec<HeuristicCheckItem> {
    raw.iter()
        .map(|item| {
            let mut item = Fields::new(item);
            let mut element = Fields::new(&item.take("element").unwrap_or(Value::Null));
            HeuristicCheckItem {
                element: ElementInfo {
                    tag: element.text("tag"),
                    text: element.text("text"),
                    class: element.text("class"),
                },
                checks: item
                    .list("checks")
                    .iter()
                    .map(|check| {
                        let mut check = Fields::new(check);
                        HeuristicCheck {
                            name: check.text("name"),
                            status: CheckStatus::parse(&check.text("status")),
                            message: check.text("message"),
                        }
                    })
                    .collect(),
            }
        })
        .collect()
}

fn normalize_edge(raw: &Value, default_source: &str) -> EdgeEvaluation {
    let mut edge = Fields::new(raw);

    let latency = edge.take_number("latency_duration_ms").map(|duration_ms| LatencyInfo {
        duration_ms,
        status: edge.text("latency_status"),
        description: edge.text("latency_description"),
    });

    EdgeEvaluation {
        edge_id: edge.text("edge_id"),
        from_node_id: edge
            .opt_text("from_node_id")
            .unwrap_or_else(|| default_source.to_string()),
        to_node_id: edge.opt_text("to_node_id"),
        action: edge.text("action"),
        result: EdgeResult {
            learnability: flat_score(&mut edge, "learnability"),
            efficiency: EdgeEfficiency {
                result: flat_score(&mut edge, "efficiency"),
                latency,
            },
            control: flat_score(&mut edge, "control"),
        },
    }
}

/// Rebuild a dimension's result from `<dim>_score`, `<dim>_passed` and
/// `<dim>_failed` sibling fields.
fn flat_score(edge: &mut Fields, dimension: &str) -> ScoreResult {
    ScoreResult {
        score: edge.number(&format!("{}_score", dimension)),
        passed: outcomes(&edge.list(&format!("{}_passed", dimension))),
        failed: outcomes(&edge.list(&format!("{}_failed", dimension))),
    }
}

fn normalize_workflow(raw: &Value, position: usize) -> WorkflowEvaluation {
    let data = match raw.get("workflow_data") {
        Some(inner) if inner.is_object() => inner,
        _ => raw,
    };
    let mut wf = Fields::new(data);
    let mut result = Fields::new(&wf.take("result").unwrap_or(Value::Null));

    let efficiency = result.take("efficiency").unwrap_or(Value::Null);
    let mut efficiency_fields = Fields::new(&efficiency);

    WorkflowEvaluation {
        path_index: wf.opt_count("path_index").unwrap_or(position as u64),
        path_summary: wf.text("path_summary"),
        result: WorkflowResult {
            learnability: nested_score(&result.take("learnability").unwrap_or(Value::Null)),
            efficiency: WorkflowEfficiency {
                result: nested_score(&efficiency),
                interaction_efficiency: efficiency_fields
                    .take_object("interaction_efficiency")
                    .map(|v| interaction_efficiency(&v)),
                target_size_spacing: efficiency_fields
                    .take_object("target_size_spacing")
                    .map(|v| target_size_spacing(&v)),
            },
            control: nested_score(&result.take("control").unwrap_or(Value::Null)),
        },
    }
}

fn nested_score(raw: &Value) -> ScoreResult {
    let mut score = Fields::new(raw);
    ScoreResult {
        score: score.number("score"),
        passed: outcomes(&score.list("passed")),
        failed: outcomes(&score.list("failed")),
    }
}

fn interaction_efficiency(raw: &Value) -> InteractionEfficiency {
    let mut fields = Fields::new(raw);
    InteractionEfficiency {
        klm_breakdown: fields
            .list("klm_breakdown")
            .iter()
            .map(|step| {
                let mut step = Fields::new(step);
                KlmStep {
                    step: step.count("step"),
                    action: step.text("action"),
                    ops: step
                        .list("ops")
                        .iter()
                        .map(|op| scalar_text(op).unwrap_or_default())
                        .collect(),
                    est_time: step.number("est_time"),
                }
            })
            .collect(),
        total_estimated_time_s: fields.number("total_estimated_time_s"),
    }
}

fn target_size_spacing(raw: &Value) -> TargetSizeSpacing {
    let mut fields = Fields::new(raw);
    TargetSizeSpacing {
        fitts_issues: fields
            .list("fitts_issues")
            .iter()
            .map(|issue| {
                let mut issue = Fields::new(issue);
                FittsIssue {
                    step: issue.count("step"),
                    id: issue.text("ID"),
                    target: issue.text("target"),
                    message: issue.text("message"),
                    distance: issue.number("distance"),
                    width: issue.number("width"),
                }
            })
            .collect(),
    }
}

fn outcomes(raw: &[Value]) -> Vec<CheckOutcome> {
    raw.iter()
        .map(|entry| match entry {
            Value::String(message) => CheckOutcome {
                message: message.clone(),
                ..CheckOutcome::default()
            },
            other => {
                let mut fields = Fields::new(other);
                let check = fields
                    .opt_text("check")
                    .or_else(|| fields.opt_text("name"))
                    .unwrap_or_default();
                CheckOutcome {
                    check,
                    message: fields.text("message"),
                    extra: fields.into_extra(),
                }
            }
        })
        .collect()
}

/// Re-flatten a canonical evaluation into the backend's wire shape.
///
/// Edges get their dimension results spread into prefixed sibling fields and
/// workflows are wrapped under `workflow_data`, so the output normalizes back
/// to an identical evaluation.
pub fn to_raw_payload(evaluation: &SiteEvaluation) -> RawPayload {
    let mut root = Map::new();
    root.insert("id".into(), json!(evaluation.id));
    root.insert("run_id".into(), json!(evaluation.run_id));
    if let Some(ref timestamp) = evaluation.timestamp {
        root.insert("timestamp".into(), json!(timestamp));
    }
    if let Some(ref created_at) = evaluation.created_at {
        root.insert("created_at".into(), json!(created_at));
    }
    root.insert("target_url".into(), json!(evaluation.target_url));
    root.insert("total_score".into(), json!(evaluation.total_score));
    root.insert("learnability_score".into(), json!(evaluation.learnability_score));
    root.insert("efficiency_score".into(), json!(evaluation.efficiency_score));
    root.insert("control_score".into(), json!(evaluation.control_score));
    root.insert("node_count".into(), json!(evaluation.node_count));
    root.insert("edge_count".into(), json!(evaluation.edge_count));
    root.insert("path_count".into(), json!(evaluation.path_count));
    root.insert(
        "node_evaluations".into(),
        serde_json::to_value(&evaluation.node_evaluations).unwrap_or(Value::Null),
    );
    root.insert(
        "edge_evaluations".into(),
        Value::Array(evaluation.edge_evaluations.iter().map(flatten_edge).collect()),
    );
    root.insert(
        "workflow_evaluations".into(),
        Value::Array(
            evaluation
                .workflow_evaluations
                .iter()
                .map(|wf| json!({ "workflow_data": serde_json::to_value(wf).unwrap_or(Value::Null) }))
                .collect(),
        ),
    );
    Value::Object(root)
}

fn flatten_edge(edge: &EdgeEvaluation) -> Value {
    let mut flat = Map::new();
    flat.insert("edge_id".into(), json!(edge.edge_id));
    flat.insert("from_node_id".into(), json!(edge.from_node_id));
    if let Some(ref to) = edge.to_node_id {
        flat.insert("to_node_id".into(), json!(to));
    }
    flat.insert("action".into(), json!(edge.action));

    let results = [
        &edge.result.learnability,
        &edge.result.efficiency.result,
        &edge.result.control,
    ];
    for (dimension, result) in DIMENSIONS.iter().zip(results) {
        flat.insert(format!("{}_score", dimension), json!(result.score));
        flat.insert(
            format!("{}_passed", dimension),
            serde_json::to_value(&result.passed).unwrap_or(Value::Null),
        );
        flat.insert(
            format!("{}_failed", dimension),
            serde_json::to_value(&result.failed).unwrap_or(Value::Null),
        );
    }

    if let Some(ref latency) = edge.result.efficiency.latency {
        flat.insert("latency_duration_ms".into(), json!(latency.duration_ms));
        flat.insert("latency_status".into(), json!(latency.status));
        flat.insert("latency_description".into(), json!(latency.description));
    }
    Value::Object(flat)
}

/// Owned view over a JSON object that hands out fields with defaults.
///
/// Fields are removed as they are read, so whatever remains afterwards is
/// exactly the set of unrecognised keys.
struct Fields(Map<String, Value>);

impl Fields {
    fn new(value: &Value) -> Self {
        match value {
            Value::Object(map) => Fields(map.clone()),
            _ => Fields(Map::new()),
        }
    }

    fn take(&mut self, key: &str) -> Option<Value> {
        self.0.remove(key).filter(|v| !v.is_null())
    }

    fn take_object(&mut self, key: &str) -> Option<Value> {
        self.take(key).filter(Value::is_object)
    }

    fn opt_text(&mut self, key: &str) -> Option<String> {
        self.take(key)
            .as_ref()
            .and_then(scalar_text)
            .filter(|s| !s.is_empty())
    }

    fn text(&mut self, key: &str) -> String {
        self.opt_text(key).unwrap_or_default()
    }

    fn take_number(&mut self, key: &str) -> Option<f64> {
        self.take(key).as_ref().and_then(as_number)
    }

    fn number(&mut self, key: &str) -> f64 {
        self.take_number(key).unwrap_or(0.0)
    }

    fn opt_count(&mut self, key: &str) -> Option<u64> {
        self.take_number(key).map(|n| if n > 0.0 { n as u64 } else { 0 })
    }

    fn count(&mut self, key: &str) -> u64 {
        self.opt_count(key).unwrap_or(0)
    }

    fn list(&mut self, key: &str) -> Vec<Value> {
        match self.take(key) {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        }
    }

    fn into_extra(self) -> Map<String, Value> {
        self.0
    }
}

fn as_number(value: &Value) -> Option<f64> {
    let n = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> RawPayload {
        serde_json::from_str(include_str!("../fixtures/evaluation_payload.json")).unwrap()
    }

    #[test]
    fn test_normalize_fixture_shape() {
        let evaluation = normalize(&fixture());

        assert_eq!(evaluation.run_id, "run-42");
        assert_eq!(evaluation.node_evaluations.len(), 3);
        assert_eq!(evaluation.edge_evaluations.len(), 3);
        assert_eq!(evaluation.workflow_evaluations.len(), 2);
        assert_eq!(evaluation.total_score, 72.5);
        assert_eq!(evaluation.node_count, 3);

        let edge = &evaluation.edge_evaluations[0];
        assert_eq!(edge.result.efficiency.result.score, 80.0);
        assert_eq!(edge.result.learnability.failed[0].check, "label_clarity");
        let latency = edge.result.efficiency.latency.as_ref().unwrap();
        assert_eq!(latency.duration_ms, 3400.0);
        assert!(latency.is_slow());

        let wf = &evaluation.workflow_evaluations[0];
        assert_eq!(wf.path_index, 1);
        assert_eq!(wf.path_summary, "home -> search -> checkout");
        let klm = wf.result.efficiency.interaction_efficiency.as_ref().unwrap();
        assert_eq!(klm.klm_breakdown.len(), 2);
        assert_eq!(klm.klm_breakdown[0].ops, vec!["M", "P", "K"]);
        assert_eq!(wf.result.efficiency.fitts_issues()[0].id, "btn-7");
    }

    #[test]
    fn test_missing_efficiency_fields_default() {
        let raw = json!({
            "run_id": "r",
            "edge_evaluations": [{ "edge_id": "e1", "from_node_id": "n1", "action": "click" }]
        });

        let evaluation = normalize(&raw);
        let efficiency = &evaluation.edge_evaluations[0].result.efficiency;

        assert_eq!(efficiency.result, ScoreResult::default());
        assert_eq!(efficiency.result.score, 0.0);
        assert!(efficiency.result.passed.is_empty());
        assert!(efficiency.result.failed.is_empty());
        assert!(efficiency.latency.is_none());
    }

    #[test]
    fn test_missing_source_defaults_to_first_node() {
        let raw = json!({
            "node_evaluations": [{ "node_id": "n1", "url": "https://example.com" }],
            "edge_evaluations": [{ "edge_id": "e1", "action": "click" }]
        });

        let evaluation = normalize(&raw);
        assert_eq!(evaluation.edge_evaluations[0].from_node_id, "n1");
    }

    #[test]
    fn test_missing_source_without_nodes() {
        let raw = json!({ "edge_evaluations": [{ "edge_id": "e1", "from_node_id": "" }] });

        let evaluation = normalize(&raw);
        assert_eq!(evaluation.edge_evaluations[0].from_node_id, UNKNOWN_NODE_ID);
    }

    #[test]
    fn test_root_fallbacks() {
        let raw = json!({
            "run_id": "run-1",
            "timestamp": "2024-05-01T10:00:00Z",
            "total_score": "55.5",
            "node_count": -3,
            "node_evaluations": [{ "node_id": "n1", "url": "https://shop.example" }]
        });

        let evaluation = normalize(&raw);
        assert_eq!(evaluation.id, "run-1");
        assert_eq!(evaluation.created_at.as_deref(), Some("2024-05-01T10:00:00Z"));
        assert_eq!(evaluation.target_url, "https://shop.example");
        assert_eq!(evaluation.total_score, 55.5);
        assert_eq!(evaluation.node_count, 0);
        assert_eq!(evaluation.edge_count, 0);
    }

    #[test]
    fn test_non_object_payload_is_all_defaults() {
        let evaluation = normalize(&json!(["not", "an", "object"]));
        assert_eq!(evaluation, SiteEvaluation::default());
    }

    #[test]
    fn test_node_checklists_default_and_extra_fields_kept() {
        let raw = json!({
            "node_evaluations": [{
                "node_id": 7,
                "url": "https://a.io",
                "screenshot_path": "/tmp/7.png",
                "control_items": null,
                "learnability_items": [{
                    "element": { "tag": "button", "text": "Buy", "class": "cta" },
                    "checks": [
                        { "name": "contrast", "status": "PASS", "message": "ok" },
                        { "name": "label", "status": "FAIL", "message": "vague" }
                    ]
                }]
            }]
        });

        let evaluation = normalize(&raw);
        let node = &evaluation.node_evaluations[0];
        assert_eq!(node.node_id, "7");
        assert!(node.control_items.is_empty());
        assert!(node.efficiency_items.is_empty());
        assert_eq!(node.learnability_items[0].element.tag, "button");
        assert_eq!(node.learnability_items[0].failed_count(), 1);
        assert_eq!(node.extra.get("screenshot_path"), Some(&json!("/tmp/7.png")));
    }

    #[test]
    fn test_workflow_without_result_defaults() {
        let raw = json!({
            "workflow_evaluations": [
                { "workflow_data": { "path_summary": "a -> b" } },
                { "workflow_data": null }
            ]
        });

        let evaluation = normalize(&raw);
        let first = &evaluation.workflow_evaluations[0];
        assert_eq!(first.path_index, 0);
        assert_eq!(first.result.learnability, ScoreResult::default());
        assert_eq!(first.result.control, ScoreResult::default());
        assert!(first.result.efficiency.interaction_efficiency.is_none());

        let second = &evaluation.workflow_evaluations[1];
        assert_eq!(second.path_index, 1);
        assert_eq!(second.path_summary, "");
    }

    #[test]
    fn test_check_outcome_label_variants() {
        let raw = json!({
            "edge_evaluations": [{
                "control_failed": [
                    { "name": "undo", "message": "no undo", "severity": "high" },
                    "plain message"
                ]
            }]
        });

        let evaluation = normalize(&raw);
        let failed = &evaluation.edge_evaluations[0].result.control.failed;
        assert_eq!(failed[0].check, "undo");
        assert_eq!(failed[0].extra.get("severity"), Some(&json!("high")));
        assert_eq!(failed[1].message, "plain message");
        assert_eq!(failed[1].check, "");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let first = normalize(&fixture());
        let second = normalize(&to_raw_payload(&first));
        assert_eq!(first, second);

        let third = normalize(&to_raw_payload(&second));
        assert_eq!(second, third);
    }
}
