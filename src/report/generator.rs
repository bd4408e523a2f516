//! Markdown report generation.
//!
//! This module renders a normalized evaluation as a Markdown document
//! covering scores, pages, interactions and workflows.

use crate::analysis::{
    failed_check_count, group_by_source, resolve_path, score_overview, slow_interactions,
    Resolution, SourceGroup,
};
use crate::models::{
    format_execution_time, CheckOutcome, CheckStatus, EdgeEvaluation, NodeEvaluation,
    RunListItem, ScoreBand, SiteEvaluation, WorkflowEvaluation,
};
use anyhow::Result;
use chrono::Utc;

/// What to include in a Markdown report.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Render the heuristic checklist of every page.
    pub include_node_checklists: bool,
    /// Include efficiency items in page checklists.
    pub include_efficiency_items: bool,
    /// List passed checks of interactions and workflows.
    pub include_passed_checks: bool,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            include_node_checklists: true,
            include_efficiency_items: false,
            include_passed_checks: true,
        }
    }
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(evaluation: &SiteEvaluation, options: &ReportOptions) -> String {
    let mut output = String::new();

    output.push_str("# UXLens Evaluation Report\n\n");
    output.push_str(&generate_metadata_section(evaluation));
    output.push_str(&generate_scores_section(evaluation));
    output.push_str(&generate_pages_section(evaluation, options));
    output.push_str(&generate_interactions_section(evaluation, options));
    output.push_str(&generate_workflows_section(evaluation, options));
    output.push_str(&generate_footer());

    output
}

/// Generate a JSON report.
pub fn generate_json_report(evaluation: &SiteEvaluation) -> Result<String> {
    serde_json::to_string_pretty(evaluation).map_err(Into::into)
}

fn generate_metadata_section(evaluation: &SiteEvaluation) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    let target = if evaluation.target_url.is_empty() {
        "(unknown)"
    } else {
        evaluation.target_url.as_str()
    };
    section.push_str(&format!("- **Target:** {}\n", target));
    section.push_str(&format!("- **Run ID:** `{}`\n", evaluation.run_id));
    if let Some(ref created_at) = evaluation.created_at {
        section.push_str(&format!("- **Evaluated:** {}\n", created_at));
    }
    section.push_str(&format!(
        "- **Pages:** {} | **Interactions:** {} | **Workflows:** {}\n",
        evaluation.node_count, evaluation.edge_count, evaluation.path_count
    ));
    section.push_str(&format!(
        "- **Failed Checks:** {}\n",
        failed_check_count(evaluation)
    ));
    section.push_str(&format!(
        "- **Report Generated:** {}\n",
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push('\n');

    section
}

fn generate_scores_section(evaluation: &SiteEvaluation) -> String {
    let mut section = String::new();

    section.push_str("## Scores\n\n");
    section.push_str("| Dimension | Score | Band |\n");
    section.push_str("|:---|:---:|:---:|\n");
    for dimension in score_overview(evaluation) {
        section.push_str(&format!(
            "| {} | {:.1} | {} {} |\n",
            dimension.label,
            dimension.score,
            dimension.band.emoji(),
            dimension.band
        ));
    }
    section.push('\n');

    section
}

fn generate_pages_section(evaluation: &SiteEvaluation, options: &ReportOptions) -> String {
    let mut section = String::new();

    section.push_str("## Pages\n\n");

    if evaluation.node_evaluations.is_empty() {
        section.push_str("No page data available.\n\n");
        return section;
    }

    for node in &evaluation.node_evaluations {
        section.push_str(&generate_node_block(node, options));
    }

    section
}

fn generate_node_block(node: &NodeEvaluation, options: &ReportOptions) -> String {
    let mut block = String::new();

    block.push_str(&format!("### {}\n\n", node.url));
    block.push_str(&format!("*Node ID: `{}`*\n\n", node.node_id));
    block.push_str(&format!(
        "Learnability {} | Efficiency {} | Control {}\n\n",
        score_badge(node.learnability_score),
        score_badge(node.efficiency_score),
        score_badge(node.control_score)
    ));

    if !options.include_node_checklists {
        return block;
    }

    let mut items: Vec<_> = node
        .learnability_items
        .iter()
        .chain(&node.control_items)
        .collect();
    if options.include_efficiency_items {
        items.extend(&node.efficiency_items);
    }

    if items.is_empty() {
        return block;
    }

    block.push_str("**Heuristic Checklist**\n\n");
    for item in items {
        let text = if item.element.text.is_empty() {
            "(No text)"
        } else {
            item.element.text.as_str()
        };
        block.push_str(&format!("- `<{}>` {}", item.element.tag, text));
        if !item.element.class.is_empty() {
            block.push_str(&format!(" *.{}*", item.element.class));
        }
        block.push('\n');
        for check in &item.checks {
            let marker = match check.status {
                CheckStatus::Pass => "✅",
                CheckStatus::Fail => "❌",
            };
            block.push_str(&format!(
                "  - {} **{}** {}\n",
                marker, check.name, check.message
            ));
        }
    }
    block.push('\n');

    block
}

fn generate_interactions_section(evaluation: &SiteEvaluation, options: &ReportOptions) -> String {
    let mut section = String::new();

    section.push_str("## Interactions\n\n");

    let groups = group_by_source(&evaluation.edge_evaluations);
    if groups.is_empty() {
        section.push_str("No interaction data available.\n\n");
        return section;
    }

    let slow = slow_interactions(evaluation);
    if !slow.is_empty() {
        section.push_str(&format!(
            "⚠️ {} interaction(s) responded slowly.\n\n",
            slow.len()
        ));
    }

    for group in &groups {
        section.push_str(&generate_source_group_block(evaluation, group, options));
    }

    section
}

fn generate_source_group_block(
    evaluation: &SiteEvaluation,
    group: &SourceGroup<'_>,
    options: &ReportOptions,
) -> String {
    let mut block = String::new();

    let heading = evaluation
        .node(group.source_id)
        .map(|n| n.url.as_str())
        .filter(|url| !url.is_empty())
        .unwrap_or(group.source_id);
    block.push_str(&format!("### From {}\n\n", heading));
    block.push_str(&format!(
        "*{} interaction(s) | Avg. efficiency {}*\n\n",
        group.edges.len(),
        score_badge(group.mean_efficiency)
    ));

    for edge in &group.edges {
        block.push_str(&generate_edge_block(edge, options));
    }

    block
}

fn generate_edge_block(edge: &EdgeEvaluation, options: &ReportOptions) -> String {
    let mut block = String::new();

    block.push_str(&format!("#### `{}`\n\n", edge.action));
    block.push_str(&format!(
        "L {} | E {} | C {}\n\n",
        score_badge(edge.result.learnability.score),
        score_badge(edge.result.efficiency.result.score),
        score_badge(edge.result.control.score)
    ));

    if let Some(ref latency) = edge.result.efficiency.latency {
        if latency.is_slow() {
            block.push_str(&format!(
                "> 🐢 **Slow Response ({}ms)** {}\n\n",
                latency.duration_ms, latency.description
            ));
        }
    }

    let failed: Vec<&CheckOutcome> = edge
        .result
        .learnability
        .failed
        .iter()
        .chain(&edge.result.efficiency.result.failed)
        .chain(&edge.result.control.failed)
        .collect();
    block.push_str(&generate_check_list("Failed", "❌", &failed));

    if options.include_passed_checks {
        let passed: Vec<&CheckOutcome> = edge
            .result
            .learnability
            .passed
            .iter()
            .chain(&edge.result.efficiency.result.passed)
            .chain(&edge.result.control.passed)
            .collect();
        block.push_str(&generate_check_list("Passed", "✅", &passed));
    }

    block
}

fn generate_workflows_section(evaluation: &SiteEvaluation, options: &ReportOptions) -> String {
    let mut section = String::new();

    section.push_str("## Workflows\n\n");

    if evaluation.workflow_evaluations.is_empty() {
        section.push_str("No workflow data available.\n\n");
        return section;
    }

    for workflow in &evaluation.workflow_evaluations {
        section.push_str(&generate_workflow_block(
            workflow,
            &evaluation.node_evaluations,
            options,
        ));
    }

    section
}

fn generate_workflow_block(
    workflow: &WorkflowEvaluation,
    nodes: &[NodeEvaluation],
    options: &ReportOptions,
) -> String {
    let mut block = String::new();
    let efficiency = &workflow.result.efficiency;

    block.push_str(&format!(
        "### Path {}: `{}`\n\n",
        workflow.path_index, workflow.path_summary
    ));
    block.push_str(&format!(
        "Learn {} | Eff {} | Ctrl {}\n\n",
        score_badge(workflow.result.learnability.score),
        score_badge(efficiency.result.score),
        score_badge(workflow.result.control.score)
    ));

    let steps = resolve_path(&workflow.path_summary, nodes);
    if !steps.is_empty() {
        block.push_str("| Step | Node | Shown As |\n");
        block.push_str("|:---:|:---|:---|\n");
        for step in &steps {
            let shown = match step.resolution {
                Resolution::Direct(node) => node.url.clone(),
                Resolution::Fallback(node) => format!("{} *(fallback)*", node.node_id),
                Resolution::Unresolved => "-".to_string(),
            };
            let label = if step.label.is_empty() {
                "-".to_string()
            } else {
                format!("`{}`", step.label)
            };
            block.push_str(&format!(
                "| {} | {} | {} |\n",
                step.position + 1,
                label,
                shown
            ));
        }
        block.push('\n');
    }

    if let Some(ref klm) = efficiency.interaction_efficiency {
        block.push_str("**KLM Efficiency Breakdown**\n\n");
        block.push_str("| Step | Action | Operators | Est. Time |\n");
        block.push_str("|:---:|:---|:---|---:|\n");
        for step in &klm.klm_breakdown {
            block.push_str(&format!(
                "| {} | {} | {} | {}s |\n",
                step.step,
                step.action,
                step.ops.join(" "),
                step.est_time
            ));
        }
        block.push_str(&format!(
            "| | **Total Estimated Time** | | **{}s** |\n\n",
            klm.total_estimated_time_s
        ));
    }

    let fitts = efficiency.fitts_issues();
    if !fitts.is_empty() {
        block.push_str("**Fitts's Law & Size Issues**\n\n");
        for issue in fitts {
            block.push_str(&format!(
                "- Step {} `{}` **{}**: {} (distance {}px, width {}px)\n",
                issue.step, issue.id, issue.target, issue.message, issue.distance, issue.width
            ));
        }
        block.push('\n');
    }

    if options.include_passed_checks {
        let passed: Vec<&CheckOutcome> = efficiency.result.passed.iter().collect();
        block.push_str(&generate_check_list("Passed", "✅", &passed));
    }

    block
}

fn generate_check_list(title: &str, marker: &str, checks: &[&CheckOutcome]) -> String {
    if checks.is_empty() {
        return String::new();
    }

    let mut list = format!("**{}**\n\n", title);
    for check in checks {
        if check.check.is_empty() {
            list.push_str(&format!("- {} {}\n", marker, check.message));
        } else {
            list.push_str(&format!("- {} {}: {}\n", marker, check.check, check.message));
        }
    }
    list.push('\n');
    list
}

fn score_badge(score: f64) -> String {
    format!("{} {:.0}", ScoreBand::from_score(score).emoji(), score)
}

/// Render the runs listing as a Markdown table.
pub fn generate_runs_table(runs: &[RunListItem]) -> String {
    if runs.is_empty() {
        return "No runs found.\n".to_string();
    }

    let mut table = String::new();
    table.push_str("| Run ID | Status | Target | Created | Duration | Score |\n");
    table.push_str("|:---|:---|:---|:---|:---:|:---:|\n");
    for run in runs {
        let score = run
            .evaluation
            .as_ref()
            .map(|e| score_badge(e.total_score))
            .unwrap_or_else(|| "-".to_string());
        table.push_str(&format!(
            "| `{}` | {} | {} | {} | {} | {} |\n",
            run.run_id,
            run.status,
            run.target_url,
            run.created_at,
            format_execution_time(run.execution_time).unwrap_or_else(|| "-".to_string()),
            score
        ));
    }
    table
}

fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str("*Report generated by UXLens*\n");

    footer
}
