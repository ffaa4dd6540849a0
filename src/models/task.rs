//! Task entries and call links.
//!
//! A `TaskEntry` is one node of the scheduling pass: it ties a descriptor
//! to the dispatch set accumulated for it, the frame that set is laid out
//! over, and the call links connecting it to other entries. Entries are
//! built and wired by [`TaskGraph`](super::graph::TaskGraph); the merge
//! pass grows their dispatch sets in topological order.

use serde::{Deserialize, Serialize};

use super::dispatch::DispatchLink;
use super::graph::{LinkId, RtInfoId, TaskId};
use super::rt_info::DependencyType;
use super::time::Period;
use crate::multiset::OrderedMultiset;

/// Depth-first search coloring of an entry, written by graph validation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DfsStatus {
    /// Not yet reached.
    #[default]
    NotVisited,
    /// On the current search path.
    Visited,
    /// Completely explored.
    Finished,
}

/// One scheduling node of the pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskEntry {
    pub(crate) rt_info: RtInfoId,
    pub(crate) effective_period: Period,
    pub(crate) dispatches: OrderedMultiset<DispatchLink>,
    pub(crate) calls: Vec<LinkId>,
    pub(crate) callers: Vec<LinkId>,
    pub(crate) dfs_status: DfsStatus,
    pub(crate) discovered: i64,
    pub(crate) finished: i64,
    pub(crate) is_thread_delineator: bool,
}

impl TaskEntry {
    pub(crate) fn new(rt_info: RtInfoId) -> Self {
        Self {
            rt_info,
            effective_period: 0,
            dispatches: OrderedMultiset::new(),
            calls: Vec::new(),
            callers: Vec::new(),
            dfs_status: DfsStatus::NotVisited,
            discovered: -1,
            finished: -1,
            is_thread_delineator: false,
        }
    }

    /// Descriptor this entry was built for.
    pub fn rt_info(&self) -> RtInfoId {
        self.rt_info
    }

    /// The frame the entry's dispatches are currently laid out over.
    /// Zero until a seed or a merge establishes one; grows monotonically
    /// by harmonic expansion afterwards.
    pub fn effective_period(&self) -> Period {
        self.effective_period
    }

    /// The entry's dispatch links, in dispatch order.
    pub fn dispatches(&self) -> &OrderedMultiset<DispatchLink> {
        &self.dispatches
    }

    /// Outgoing call links (this entry as caller).
    pub fn calls(&self) -> &[LinkId] {
        &self.calls
    }

    /// Incoming call links (this entry as called).
    pub fn callers(&self) -> &[LinkId] {
        &self.callers
    }

    /// DFS coloring from the last validation run.
    pub fn dfs_status(&self) -> DfsStatus {
        self.dfs_status
    }

    /// DFS discovery timestamp, or -1 if never visited.
    pub fn discovered(&self) -> i64 {
        self.discovered
    }

    /// DFS finish timestamp, or -1 if never finished.
    pub fn finished(&self) -> i64 {
        self.finished
    }

    /// Whether this entry originates dispatches of its own rather than
    /// deriving all of them from callers.
    pub fn is_thread_delineator(&self) -> bool {
        self.is_thread_delineator
    }
}

/// A directed call edge between two task entries.
///
/// Immutable after construction. Registered in the caller's `calls` set
/// and the called entry's `callers` set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskLink {
    pub(crate) caller: TaskId,
    pub(crate) called: TaskId,
    pub(crate) number_of_calls: u32,
    pub(crate) dependency_type: DependencyType,
}

impl TaskLink {
    /// The calling entry.
    pub fn caller(&self) -> TaskId {
        self.caller
    }

    /// The called entry.
    pub fn called(&self) -> TaskId {
        self.called
    }

    /// How many times the callee runs per caller arrival. At least 1.
    pub fn number_of_calls(&self) -> u32 {
        self.number_of_calls
    }

    /// One-way or two-way invocation.
    pub fn dependency_type(&self) -> DependencyType {
        self.dependency_type
    }
}
