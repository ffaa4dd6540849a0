//! Structural validation of the task graph.
//!
//! Checks the integrity of a graph before the merge pass runs. Detects:
//! - Circular call dependencies (DAG validation)
//! - Asymmetric link registration
//! - Dispatch links owned by the wrong entry
//!
//! Also provides the topological ordering the merge pass consumes:
//! callers before callees, from DFS finish times. The DFS writes its
//! coloring and timestamps onto the entries for downstream inspection.
//!
//! # Reference
//! Cormen et al. (2009), "Introduction to Algorithms", Ch. 22.4 (Topological Sort)

use std::collections::HashSet;

use crate::models::{DfsStatus, TaskGraph, TaskId};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// The call graph contains a cycle.
    CyclicDependency,
    /// A link is missing from its caller's or called entry's link set.
    AsymmetricLink,
    /// An entry holds a dispatch link whose dispatch belongs to another
    /// entry.
    ForeignDispatch,
}

impl ValidationError {
    fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Validates the structural integrity of a task graph.
///
/// Checks:
/// 1. Every link is registered in exactly its caller's `calls` set and
///    its called entry's `callers` set
/// 2. Every dispatch link references a dispatch owned by the holding
///    entry
/// 3. The call graph is acyclic
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_graph(graph: &TaskGraph) -> ValidationResult {
    let mut errors = Vec::new();

    for link_id in 0..graph.links.len() {
        let link = &graph.links[link_id];
        let registered_out = graph.tasks[link.caller().index()]
            .calls()
            .iter()
            .filter(|id| id.index() == link_id)
            .count();
        let registered_in = graph.tasks[link.called().index()]
            .callers()
            .iter()
            .filter(|id| id.index() == link_id)
            .count();
        if registered_out != 1 || registered_in != 1 {
            errors.push(ValidationError::new(
                ValidationErrorKind::AsymmetricLink,
                format!(
                    "link {} from entry {} to entry {} is not registered symmetrically",
                    link_id,
                    link.caller().index(),
                    link.called().index()
                ),
            ));
        }
    }

    for task in graph.task_ids() {
        for dispatch_link in graph.task(task).dispatches() {
            let owner = graph.pool().get(dispatch_link.dispatch).task_entry;
            if owner != task {
                errors.push(ValidationError::new(
                    ValidationErrorKind::ForeignDispatch,
                    format!(
                        "entry {} links dispatch {} owned by entry {}",
                        task.index(),
                        dispatch_link.dispatch.index(),
                        owner.index()
                    ),
                ));
            }
        }
    }

    if let Some(cycle_error) = detect_cycles(graph) {
        errors.push(cycle_error);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Detects cycles in the call graph using DFS.
///
/// # Algorithm
/// Topological sort via DFS. If a back-edge is found (visiting a node
/// currently in the recursion stack), a cycle exists.
fn detect_cycles(graph: &TaskGraph) -> Option<ValidationError> {
    let mut visited = HashSet::new();
    let mut in_stack = HashSet::new();

    for task in graph.task_ids() {
        if !visited.contains(&task) && has_cycle_dfs(graph, task, &mut visited, &mut in_stack) {
            return Some(ValidationError::new(
                ValidationErrorKind::CyclicDependency,
                format!(
                    "circular call dependency detected involving entry {}",
                    task.index()
                ),
            ));
        }
    }

    None
}

fn has_cycle_dfs(
    graph: &TaskGraph,
    task: TaskId,
    visited: &mut HashSet<TaskId>,
    in_stack: &mut HashSet<TaskId>,
) -> bool {
    visited.insert(task);
    in_stack.insert(task);

    for &link_id in graph.task(task).calls() {
        let next = graph.link(link_id).called();
        if in_stack.contains(&next) {
            return true; // Back edge → cycle
        }
        if !visited.contains(&next) && has_cycle_dfs(graph, next, visited, in_stack) {
            return true;
        }
    }

    in_stack.remove(&task);
    false
}

/// Orders the entries callers-before-callees and writes the DFS coloring
/// (`dfs_status`, `discovered`, `finished`) onto them.
///
/// The merge pass requires this order: an entry's dispatch set is built
/// from its callers' sets, so every caller must be merged first.
///
/// # Errors
/// `CyclicDependency` if the call graph is not a DAG; the coloring of the
/// entries reached so far is left in place.
pub fn topological_order(graph: &mut TaskGraph) -> Result<Vec<TaskId>, ValidationError> {
    for entry in &mut graph.tasks {
        entry.dfs_status = DfsStatus::NotVisited;
        entry.discovered = -1;
        entry.finished = -1;
    }

    let mut clock: i64 = 0;
    let mut finish_order = Vec::with_capacity(graph.tasks.len());
    for task in 0..graph.tasks.len() {
        if graph.tasks[task].dfs_status() == DfsStatus::NotVisited {
            color_dfs(graph, TaskId(task), &mut clock, &mut finish_order)?;
        }
    }

    // Decreasing finish time: every caller finishes after its callees.
    finish_order.reverse();
    Ok(finish_order)
}

fn color_dfs(
    graph: &mut TaskGraph,
    task: TaskId,
    clock: &mut i64,
    finish_order: &mut Vec<TaskId>,
) -> Result<(), ValidationError> {
    let entry = &mut graph.tasks[task.index()];
    entry.dfs_status = DfsStatus::Visited;
    entry.discovered = *clock;
    *clock += 1;

    let calls = graph.tasks[task.index()].calls().to_vec();
    for link_id in calls {
        let next = graph.link(link_id).called();
        match graph.tasks[next.index()].dfs_status() {
            DfsStatus::Visited => {
                return Err(ValidationError::new(
                    ValidationErrorKind::CyclicDependency,
                    format!(
                        "circular call dependency detected involving entry {}",
                        next.index()
                    ),
                ));
            }
            DfsStatus::NotVisited => color_dfs(graph, next, clock, finish_order)?,
            DfsStatus::Finished => {}
        }
    }

    let entry = &mut graph.tasks[task.index()];
    entry.dfs_status = DfsStatus::Finished;
    entry.finished = *clock;
    *clock += 1;
    finish_order.push(task);
    Ok(())
}
