//! Workflow path resolution.
//!
//! A workflow's `path_summary` names the pages it traversed. Identifiers
//! that no longer match a known page (pruned or renamed after capture) are
//! mapped onto a stand-in page chosen by position, so the same path always
//! renders the same way.

use crate::models::NodeEvaluation;

/// Separator between node identifiers in a path summary.
pub const PATH_SEPARATOR: &str = "->";

/// How a path step was matched to a page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Resolution<'a> {
    /// The identifier names a known page.
    Direct(&'a NodeEvaluation),
    /// Unknown identifier; `nodes[position % nodes.len()]` stands in.
    Fallback(&'a NodeEvaluation),
    /// Unknown identifier and no pages to fall back to.
    Unresolved,
}

/// One step of a resolved workflow path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolvedStep<'a> {
    pub position: usize,
    /// The identifier exactly as it appeared in the path.
    pub label: &'a str,
    pub resolution: Resolution<'a>,
}

impl<'a> ResolvedStep<'a> {
    /// Page whose content should be displayed for this step.
    pub fn display_node(&self) -> Option<&'a NodeEvaluation> {
        match self.resolution {
            Resolution::Direct(node) | Resolution::Fallback(node) => Some(node),
            Resolution::Unresolved => None,
        }
    }

    pub fn display_node_id(&self) -> Option<&'a str> {
        self.display_node().map(|n| n.node_id.as_str())
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self.resolution, Resolution::Fallback(_))
    }
}

/// Split a path summary into its node identifiers.
///
/// Empty segments are kept so every identifier keeps its position; only a
/// blank summary yields no steps.
pub fn split_path(summary: &str) -> Vec<&str> {
    if summary.trim().is_empty() {
        return Vec::new();
    }
    summary.split(PATH_SEPARATOR).map(str::trim).collect()
}

/// Resolve every step of `summary` against the known pages.
pub fn resolve_path<'a>(summary: &'a str, nodes: &'a [NodeEvaluation]) -> Vec<ResolvedStep<'a>> {
    split_path(summary)
        .into_iter()
        .enumerate()
        .map(|(position, label)| ResolvedStep {
            position,
            label,
            resolution: resolve_token(label, position, nodes),
        })
        .collect()
}

fn resolve_token<'a>(token: &str, position: usize, nodes: &'a [NodeEvaluation]) -> Resolution<'a> {
    if let Some(node) = nodes.iter().find(|n| n.node_id == token) {
        return Resolution::Direct(node);
    }
    if nodes.is_empty() {
        return Resolution::Unresolved;
    }
    Resolution::Fallback(&nodes[position % nodes.len()])
}
