//! The task graph arena.
//!
//! All cross-references between descriptors, task entries, call links, and
//! dispatches are arena indices into one `TaskGraph`, which removes the
//! ownership cycles a pointer representation would create: entries point
//! at dispatches, dispatches point back at entries, and links tie pairs of
//! entries together, all through plain ids.
//!
//! Construction order: register descriptors, build one entry per
//! descriptor, wire call links, seed the entries that originate their own
//! dispatches, then run the merge pass.

use serde::{Deserialize, Serialize};

use super::dispatch::{DispatchId, DispatchKey, DispatchLink, DispatchPool};
use super::rt_info::{DependencyType, RtInfo};
use super::task::{TaskEntry, TaskLink};
use super::time::{OsPriority, Priority, Time};

/// Handle to a descriptor in the graph.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct RtInfoId(pub(crate) usize);

/// Handle to a task entry in the graph.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct TaskId(pub(crate) usize);

/// Handle to a call link in the graph.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct LinkId(pub(crate) usize);

impl TaskId {
    /// Position of the entry in the graph.
    pub fn index(self) -> usize {
        self.0
    }
}

impl LinkId {
    /// Position of the link in the graph.
    pub fn index(self) -> usize {
        self.0
    }
}

impl RtInfoId {
    /// Position of the descriptor in the graph.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Arena holding one scheduling pass: descriptors, task entries, call
/// links, and the dispatch pool.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskGraph {
    pub(crate) rt_infos: Vec<RtInfo>,
    pub(crate) tasks: Vec<TaskEntry>,
    pub(crate) links: Vec<TaskLink>,
    pub(crate) pool: DispatchPool,
}

impl TaskGraph {
    /// Creates an empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a descriptor.
    pub fn add_rt_info(&mut self, info: RtInfo) -> RtInfoId {
        let id = RtInfoId(self.rt_infos.len());
        self.rt_infos.push(info);
        id
    }

    /// Builds a task entry for `rt_info` and records the entry in the
    /// descriptor's volatile token.
    pub fn add_task(&mut self, rt_info: RtInfoId) -> TaskId {
        let id = TaskId(self.tasks.len());
        self.tasks.push(TaskEntry::new(rt_info));
        self.rt_infos[rt_info.0].volatile_token = Some(id);
        id
    }

    /// Wires a call link from `caller` to `called` and registers it on
    /// both entries. `number_of_calls` below 1 is treated as 1.
    pub fn add_call(
        &mut self,
        caller: TaskId,
        called: TaskId,
        number_of_calls: u32,
        dependency_type: DependencyType,
    ) -> LinkId {
        let id = LinkId(self.links.len());
        self.links.push(TaskLink {
            caller,
            called,
            number_of_calls: number_of_calls.max(1),
            dependency_type,
        });
        self.tasks[caller.0].calls.push(id);
        self.tasks[called.0].callers.push(id);
        id
    }

    /// Installs one of `task`'s own dispatches ahead of the merge pass.
    ///
    /// Seeding an entry whose frame is still uninitialized adopts the
    /// descriptor's declared period as the entry's effective period and
    /// marks the entry as a thread delineator. The arrival should lie
    /// within the entry's frame.
    pub fn seed_dispatch(
        &mut self,
        task: TaskId,
        arrival: Time,
        deadline: Time,
        priority: Priority,
        os_priority: OsPriority,
    ) -> DispatchId {
        let id = self
            .pool
            .insert(arrival, deadline, priority, os_priority, task, None);
        let entry = &mut self.tasks[task.0];
        let info = &self.rt_infos[entry.rt_info.0];
        if entry.effective_period == 0 {
            entry.effective_period = info.period;
        }
        entry.is_thread_delineator = true;
        let key = DispatchKey::for_dispatch(self.pool.get(id), info);
        entry.dispatches.insert(DispatchLink { key, dispatch: id });
        id
    }

    /// Number of task entries.
    pub fn task_count(&self) -> usize {
        self.tasks.len()
    }

    /// Iterates over all task ids.
    pub fn task_ids(&self) -> impl Iterator<Item = TaskId> {
        (0..self.tasks.len()).map(TaskId)
    }

    /// The entry behind `id`.
    pub fn task(&self, id: TaskId) -> &TaskEntry {
        &self.tasks[id.0]
    }

    /// The link behind `id`.
    pub fn link(&self, id: LinkId) -> &TaskLink {
        &self.links[id.0]
    }

    /// The descriptor behind `id`.
    pub fn rt_info(&self, id: RtInfoId) -> &RtInfo {
        &self.rt_infos[id.0]
    }

    /// The descriptor of `task`'s entry.
    pub fn rt_info_of(&self, task: TaskId) -> &RtInfo {
        &self.rt_infos[self.tasks[task.0].rt_info.0]
    }

    /// The pass-wide dispatch pool.
    pub fn pool(&self) -> &DispatchPool {
        &self.pool
    }

    /// Tears the pass down: drops entries, links, and dispatches, and
    /// clears every descriptor's volatile token so no descriptor keeps a
    /// handle into the dismantled pass.
    pub fn clear(&mut self) {
        for info in &mut self.rt_infos {
            info.volatile_token = None;
        }
        self.tasks.clear();
        self.links.clear();
        self.pool.clear();
    }
}
