//! Interaction aggregation and score statistics.
//!
//! This module groups interactions by the page they start from and
//! computes the derived statistics shown alongside each group.

use crate::models::{EdgeEvaluation, ScoreBand, SiteEvaluation};
use std::collections::HashMap;

/// Interactions that originate from the same page.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceGroup<'a> {
    pub source_id: &'a str,
    pub edges: Vec<&'a EdgeEvaluation>,
    /// Mean efficiency score over `edges`.
    pub mean_efficiency: f64,
}

/// Group edges by `from_node_id`, keeping the order in which each source
/// first appears.
pub fn group_by_source(edges: &[EdgeEvaluation]) -> Vec<SourceGroup<'_>> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut grouped: Vec<(&str, Vec<&EdgeEvaluation>)> = Vec::new();

    for edge in edges {
        let source = edge.from_node_id.as_str();
        match index.get(source) {
            Some(&slot) => grouped[slot].1.push(edge),
            None => {
                index.insert(source, grouped.len());
                grouped.push((source, vec![edge]));
            }
        }
    }

    // Every group holds at least one edge.
    grouped
        .into_iter()
        .map(|(source_id, edges)| {
            let total: f64 = edges.iter().map(|e| e.result.efficiency.result.score).sum();
            let mean_efficiency = total / edges.len() as f64;
            SourceGroup {
                source_id,
                edges,
                mean_efficiency,
            }
        })
        .collect()
}

/// One scored dimension of the overview.
#[derive(Debug, Clone, PartialEq)]
pub struct DimensionScore {
    pub label: &'static str,
    pub score: f64,
    pub band: ScoreBand,
}

impl DimensionScore {
    fn new(label: &'static str, score: f64) -> Self {
        Self {
            label,
            score,
            band: ScoreBand::from_score(score),
        }
    }
}

/// Overall score followed by the three dimension scores.
pub fn score_overview(evaluation: &SiteEvaluation) -> Vec<DimensionScore> {
    vec![
        DimensionScore::new("Total", evaluation.total_score),
        DimensionScore::new("Learnability", evaluation.learnability_score),
        DimensionScore::new("Efficiency", evaluation.efficiency_score),
        DimensionScore::new("User Control", evaluation.control_score),
    ]
}

/// Interactions whose measured latency was flagged as slow.
pub fn slow_interactions(evaluation: &SiteEvaluation) -> Vec<&EdgeEvaluation> {
    evaluation
        .edge_evaluations
        .iter()
        .filter(|e| {
            e.result
                .efficiency
                .latency
                .as_ref()
                .is_some_and(|l| l.is_slow())
        })
        .collect()
}

/// Total number of failed checks across all pages, interactions and workflows.
pub fn failed_check_count(evaluation: &SiteEvaluation) -> usize {
    let node_failures: usize = evaluation
        .node_evaluations
        .iter()
        .flat_map(|n| {
            n.learnability_items
                .iter()
                .chain(&n.efficiency_items)
                .chain(&n.control_items)
        })
        .map(|item| item.failed_count())
        .sum();

    let edge_failures: usize = evaluation
        .edge_evaluations
        .iter()
        .map(|e| {
            e.result.learnability.failed.len()
                + e.result.efficiency.result.failed.len()
                + e.result.control.failed.len()
        })
        .sum();

    let workflow_failures: usize = evaluation
        .workflow_evaluations
        .iter()
        .map(|w| {
            w.result.learnability.failed.len()
                + w.result.efficiency.result.failed.len()
                + w.result.control.failed.len()
        })
        .sum();

    node_failures + edge_failures + workflow_failures
}
