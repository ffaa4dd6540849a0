//! Real-time task descriptors.
//!
//! An `RtInfo` describes one periodic unit of work as declared by the
//! surrounding scheduler: its period, worst-case execution time,
//! importance, and what kind of node it is in the call graph — a concrete
//! operation, or a conjunctive/disjunctive combinator over its callers.

use serde::{Deserialize, Serialize};

use super::graph::TaskId;
use super::time::{Period, Time};

/// What kind of scheduling node a descriptor declares.
///
/// The kind selects the merge semantics applied to the node's incoming
/// calls: operations union their two-way callers and join their one-way
/// callers in lockstep; combinators apply a single semantic to one-way
/// callers and reject two-way callers outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum InfoKind {
    /// A concrete operation with real execution time.
    Operation,
    /// AND-combination of the callers' dispatch streams.
    Conjunction,
    /// OR-combination of the callers' dispatch streams.
    Disjunction,
}

/// How a caller invokes a called task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DependencyType {
    /// Fire-and-forget invocation.
    OneWay,
    /// Round-trip invocation.
    TwoWay,
}

/// Descriptor for one periodic task, supplied by the surrounding scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RtInfo {
    /// Declared period, in period units. Zero for pure combinators.
    pub period: Period,
    /// Worst-case execution time, in period units.
    pub worst_case_execution_time: Time,
    /// Criticality used as the final ordering tiebreaker (higher wins).
    pub importance: i32,
    /// Node kind, selecting the merge semantics.
    pub info_kind: InfoKind,
    /// Back-reference to the task entry built for this descriptor during
    /// the current pass. `None` outside a pass.
    pub volatile_token: Option<TaskId>,
}

impl RtInfo {
    /// Creates an operation descriptor.
    pub fn operation(period: Period, worst_case_execution_time: Time) -> Self {
        Self {
            period,
            worst_case_execution_time,
            importance: 0,
            info_kind: InfoKind::Operation,
            volatile_token: None,
        }
    }

    /// Creates a conjunction combinator descriptor.
    pub fn conjunction() -> Self {
        Self {
            period: 0,
            worst_case_execution_time: 0,
            importance: 0,
            info_kind: InfoKind::Conjunction,
            volatile_token: None,
        }
    }

    /// Creates a disjunction combinator descriptor.
    pub fn disjunction() -> Self {
        Self {
            period: 0,
            worst_case_execution_time: 0,
            importance: 0,
            info_kind: InfoKind::Disjunction,
            volatile_token: None,
        }
    }

    /// Sets the importance.
    pub fn with_importance(mut self, importance: i32) -> Self {
        self.importance = importance;
        self
    }

    /// Sets the period.
    pub fn with_period(mut self, period: Period) -> Self {
        self.period = period;
        self
    }
}
