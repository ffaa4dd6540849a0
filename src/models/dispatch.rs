//! Dispatches: planned executions within the hyper-frame.
//!
//! A `Dispatch` is one planned execution of a task — an arrival, a
//! deadline, and the priorities it will run at. Dispatches are created
//! only while merging and live in the pass-wide `DispatchPool`; task
//! entries hold `DispatchLink` handles into the pool rather than the
//! values themselves, so replicating a dispatch across sub-frames never
//! copies more than an index pair.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use super::graph::TaskId;
use super::rt_info::RtInfo;
use super::time::{laxity, OsPriority, Priority, Time};

/// Handle to a dispatch in the pass-wide pool.
///
/// Ids are assigned by insertion order, so they double as a pass-unique,
/// monotonically increasing dispatch id.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct DispatchId(pub(crate) usize);

impl DispatchId {
    /// Position of the dispatch in the pool.
    pub fn index(self) -> usize {
        self.0
    }
}

/// One planned execution of a task within the hyper-frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dispatch {
    /// Arrival time, in period units from the frame start.
    pub arrival: Time,
    /// Absolute deadline, in period units from the frame start.
    pub deadline: Time,
    /// Preemption priority (lower value = higher urgency).
    pub priority: Priority,
    /// OS-level priority, carried through unchanged.
    pub os_priority: OsPriority,
    /// Runtime tiebreaker slot; reserved for downstream assignment.
    pub dynamic_subpriority: i32,
    /// Static tiebreaker slot; reserved for downstream assignment.
    pub static_subpriority: i32,
    /// The task this dispatch belongs to.
    pub task_entry: TaskId,
    /// The dispatch this one was derived from, when known.
    pub original_dispatch: Option<DispatchId>,
    /// Pass-unique id, assigned at pool insertion.
    pub id: DispatchId,
}

/// The total order dispatches are kept in.
///
/// Four keys, in order: earlier arrival first; then the numerically
/// greater preemption priority; then lower laxity
/// (`deadline - worst_case_execution_time`, on the low 32 bits); then
/// higher importance. Dispatches equal on all four keys are genuine
/// duplicates and keep insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchKey {
    /// Arrival time of the dispatch.
    pub arrival: Time,
    /// Preemption priority of the dispatch.
    pub priority: Priority,
    /// Laxity of the dispatch under its owner's execution time.
    pub laxity: i32,
    /// Importance of the owning task.
    pub importance: i32,
}

impl DispatchKey {
    /// Builds a key from the raw ordering inputs.
    pub fn new(
        arrival: Time,
        deadline: Time,
        priority: Priority,
        worst_case_execution_time: Time,
        importance: i32,
    ) -> Self {
        Self {
            arrival,
            priority,
            laxity: laxity(deadline, worst_case_execution_time),
            importance,
        }
    }

    /// Builds the key of `dispatch` under its owner's descriptor.
    pub fn for_dispatch(dispatch: &Dispatch, owner: &RtInfo) -> Self {
        Self::new(
            dispatch.arrival,
            dispatch.deadline,
            dispatch.priority,
            owner.worst_case_execution_time,
            owner.importance,
        )
    }
}

impl Ord for DispatchKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.arrival
            .cmp(&other.arrival)
            .then_with(|| other.priority.cmp(&self.priority))
            .then_with(|| self.laxity.cmp(&other.laxity))
            .then_with(|| other.importance.cmp(&self.importance))
    }
}

impl PartialOrd for DispatchKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Sorted handle to a pooled dispatch.
///
/// Ordered by `DispatchKey`, with the dispatch id as the final tiebreaker
/// so equal-key duplicates stay in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatchLink {
    /// Precomputed sort key of the referenced dispatch.
    pub key: DispatchKey,
    /// The referenced dispatch.
    pub dispatch: DispatchId,
}

impl Ord for DispatchLink {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key
            .cmp(&other.key)
            .then_with(|| self.dispatch.cmp(&other.dispatch))
    }
}

impl PartialOrd for DispatchLink {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Flat pool of every dispatch created during a pass.
///
/// Dispatches are immutable once inserted and are freed collectively when
/// the pool is dropped or cleared.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DispatchPool {
    dispatches: Vec<Dispatch>,
}

impl DispatchPool {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of dispatches created so far.
    pub fn len(&self) -> usize {
        self.dispatches.len()
    }

    /// Whether the pool is empty.
    pub fn is_empty(&self) -> bool {
        self.dispatches.is_empty()
    }

    /// The dispatch behind `id`.
    pub fn get(&self, id: DispatchId) -> &Dispatch {
        &self.dispatches[id.0]
    }

    /// Iterates over all dispatches in creation order.
    pub fn iter(&self) -> std::slice::Iter<'_, Dispatch> {
        self.dispatches.iter()
    }

    /// Creates a dispatch owned by `task_entry` and returns its id.
    pub fn insert(
        &mut self,
        arrival: Time,
        deadline: Time,
        priority: Priority,
        os_priority: OsPriority,
        task_entry: TaskId,
        original_dispatch: Option<DispatchId>,
    ) -> DispatchId {
        let id = DispatchId(self.dispatches.len());
        self.dispatches.push(Dispatch {
            arrival,
            deadline,
            priority,
            os_priority,
            dynamic_subpriority: 0,
            static_subpriority: 0,
            task_entry,
            original_dispatch,
            id,
        });
        id
    }

    /// Drops every dispatch.
    pub fn clear(&mut self) {
        self.dispatches.clear();
    }
}
