//! The dispatch-merging core.
//!
//! Folds every task entry's callers into its own dispatch set over a
//! common hyper-frame. Two merge semantics exist, selected by the entry's
//! descriptor kind and the dependency type of each incoming call:
//!
//! - **Disjunctive** (union): every caller contributes every one of its
//!   dispatches, replicated across all sub-frames of the combined frame
//!   and across the link's calls per arrival. Each contributed dispatch
//!   keeps its own deadline and priority.
//! - **Conjunctive** (lockstep): one merged dispatch is emitted per joint
//!   position across all contributors, until any contributor exhausts.
//!   The joint dispatch arrives when the last contributor arrives; its
//!   deadline and priority come from the [`MergePolicy`].
//!
//! Frames combine harmonically: merging a caller whose effective period
//! does not divide into (or is not divided by) the destination frame is a
//! configuration error. The pass is single-threaded and runs at
//! admission time; entries must be merged callers-before-callees, which
//! [`TaskGraph::merge_all`] enforces via topological ordering.
//!
//! # Usage
//!
//! ```
//! use u_rtsched::models::{DependencyType, RtInfo, TaskGraph};
//!
//! let mut graph = TaskGraph::new();
//! let sensor_info = graph.add_rt_info(RtInfo::operation(2, 1));
//! let filter_info = graph.add_rt_info(RtInfo::operation(2, 1));
//! let sensor = graph.add_task(sensor_info);
//! let filter = graph.add_task(filter_info);
//! graph.add_call(sensor, filter, 1, DependencyType::OneWay);
//! graph.seed_dispatch(sensor, 0, 1, 5, 0);
//!
//! let status = graph.merge_all().unwrap();
//! assert!(status.is_updated());
//! assert_eq!(graph.task(filter).dispatches().len(), 1);
//! ```

mod proxy;

pub use proxy::{DispatchProxyIterator, VirtualDispatch};

use std::fmt;
use std::mem;

use tracing::{debug, trace};

use crate::models::{
    minimum_frame_size, DependencyType, DispatchKey, DispatchLink, DispatchPool, InfoKind,
    Period, TaskEntry, TaskGraph, TaskId, Time,
};
use crate::multiset::OrderedMultiset;
use crate::validation::ValidationError;

/// Outcome of a successful merge step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeStatus {
    /// Nothing was added.
    Unchanged,
    /// At least one dispatch was emitted.
    Updated,
}

impl MergeStatus {
    /// Whether any dispatch was emitted.
    pub fn is_updated(self) -> bool {
        matches!(self, Self::Updated)
    }

    /// `Updated` if either side is.
    fn combine(self, other: Self) -> Self {
        if self.is_updated() || other.is_updated() {
            Self::Updated
        } else {
            Self::Unchanged
        }
    }
}

/// User-actionable configuration errors raised by the merge core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergeError {
    /// A dispatch set laid out over `current` cannot be reframed to
    /// `requested`: the periods are not harmonically related.
    NonHarmonicPeriods {
        /// Period the set is currently laid out over.
        current: Period,
        /// Period the merge needed.
        requested: Period,
    },
    /// A combinator entry has an incoming call of a dependency type it
    /// cannot give meaning to.
    ProhibitedDependency {
        /// The entry being merged.
        task: TaskId,
        /// The offending dependency type.
        dependency_type: DependencyType,
    },
}

impl fmt::Display for MergeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonHarmonicPeriods { current, requested } => write!(
                f,
                "cannot reframe a dispatch set from period {current} to \
                 non-harmonic period {requested}"
            ),
            Self::ProhibitedDependency {
                task,
                dependency_type,
            } => write!(
                f,
                "task entry {} does not accept {dependency_type:?} dependencies",
                task.index()
            ),
        }
    }
}

impl std::error::Error for MergeError {}

/// Error from a whole-graph merge pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PassError {
    /// The task graph failed structural validation.
    Validation(ValidationError),
    /// A task entry's merge failed.
    Merge(MergeError),
}

impl fmt::Display for PassError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation(error) => write!(f, "{error}"),
            Self::Merge(error) => write!(f, "{error}"),
        }
    }
}

impl std::error::Error for PassError {}

impl From<ValidationError> for PassError {
    fn from(error: ValidationError) -> Self {
        Self::Validation(error)
    }
}

impl From<MergeError> for PassError {
    fn from(error: MergeError) -> Self {
        Self::Merge(error)
    }
}

/// How a conjunctive joint dispatch derives its deadline.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeadlinePolicy {
    /// Latest deadline of any contributor at the joint position.
    #[default]
    LatestContributor,
    /// Earliest deadline of any contributor at the joint position.
    EarliestContributor,
}

/// How a conjunctive joint dispatch derives its priority pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PriorityPolicy {
    /// Numerically greatest priority value (least urgent) among the
    /// contributors; the OS priority follows the chosen contributor.
    #[default]
    LeastUrgent,
    /// Numerically smallest priority value (most urgent).
    MostUrgent,
}

/// Policy bundle applied by conjunctive merges.
///
/// Disjunctive merges are unaffected: contributed dispatches keep their
/// own deadline and priority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergePolicy {
    /// Deadline derivation for joint dispatches.
    pub deadline: DeadlinePolicy,
    /// Priority derivation for joint dispatches.
    pub priority: PriorityPolicy,
}

/// Ordering inputs of the entry dispatches are being emitted for.
#[derive(Debug, Clone, Copy)]
pub(crate) struct OwnerContext {
    task: TaskId,
    worst_case_execution_time: Time,
    importance: i32,
}

impl TaskGraph {
    pub(crate) fn owner_context(&self, task: TaskId) -> OwnerContext {
        let info = self.rt_info_of(task);
        OwnerContext {
            task,
            worst_case_execution_time: info.worst_case_execution_time,
            importance: info.importance,
        }
    }

    /// Merges `task`'s callers into its dispatch set under the default
    /// [`MergePolicy`].
    ///
    /// Every entry reachable through `task`'s callers must already have
    /// been merged; [`TaskGraph::merge_all`] takes care of the ordering.
    pub fn merge_dispatches(&mut self, task: TaskId) -> Result<MergeStatus, MergeError> {
        self.merge_dispatches_with(task, MergePolicy::default())
    }

    /// Merges `task`'s callers into its dispatch set.
    ///
    /// The descriptor kind selects the steps: a disjunction prohibits
    /// two-way callers and unions its one-way callers; a conjunction
    /// prohibits two-way callers and joins its one-way callers in
    /// lockstep; an operation unions its two-way callers, then joins its
    /// one-way callers. Returns the final step's status.
    pub fn merge_dispatches_with(
        &mut self,
        task: TaskId,
        policy: MergePolicy,
    ) -> Result<MergeStatus, MergeError> {
        let kind = self.rt_info_of(task).info_kind;
        debug!(task = task.index(), kind = ?kind, "merging dispatches");
        match kind {
            InfoKind::Disjunction => {
                self.prohibit_dispatches(task, DependencyType::TwoWay)?;
                self.disjunctive_merge(task, DependencyType::OneWay)
            }
            InfoKind::Conjunction => {
                self.prohibit_dispatches(task, DependencyType::TwoWay)?;
                self.conjunctive_merge(task, DependencyType::OneWay, policy)
            }
            InfoKind::Operation => {
                self.disjunctive_merge(task, DependencyType::TwoWay)?;
                self.conjunctive_merge(task, DependencyType::OneWay, policy)
            }
        }
    }

    /// Validates the graph, orders it topologically, and merges every
    /// entry callers-before-callees under the default policy.
    pub fn merge_all(&mut self) -> Result<MergeStatus, PassError> {
        self.merge_all_with(MergePolicy::default())
    }

    /// [`TaskGraph::merge_all`] with an explicit conjunctive policy.
    pub fn merge_all_with(&mut self, policy: MergePolicy) -> Result<MergeStatus, PassError> {
        let order = crate::validation::topological_order(self)?;
        let mut status = MergeStatus::Unchanged;
        for task in order {
            status = status.combine(self.merge_dispatches_with(task, policy)?);
        }
        debug!(dispatches = self.pool.len(), "merge pass complete");
        Ok(status)
    }

    /// Rejects incoming calls of `dependency_type`: such calls into this
    /// entry have no defined meaning.
    fn prohibit_dispatches(
        &self,
        task: TaskId,
        dependency_type: DependencyType,
    ) -> Result<(), MergeError> {
        for &link_id in &self.tasks[task.index()].callers {
            if self.links[link_id.index()].dependency_type == dependency_type {
                return Err(MergeError::ProhibitedDependency {
                    task,
                    dependency_type,
                });
            }
        }
        Ok(())
    }

    /// Unions every matching caller's dispatches into `task`'s set,
    /// replicated over the combined frame and the link's calls per
    /// arrival.
    fn disjunctive_merge(
        &mut self,
        task: TaskId,
        dependency_type: DependencyType,
    ) -> Result<MergeStatus, MergeError> {
        let owner = self.owner_context(task);
        let caller_links = self.tasks[task.index()].callers.clone();
        let mut dest = mem::take(&mut self.tasks[task.index()].dispatches);
        let mut dest_period = self.tasks[task.index()].effective_period;

        let mut status = MergeStatus::Unchanged;
        let mut outcome = Ok(());
        for link_id in caller_links {
            let link = &self.links[link_id.index()];
            if link.dependency_type != dependency_type {
                continue;
            }
            let caller = link.caller;
            let number_of_calls = link.number_of_calls;
            let src = self.tasks[caller.index()].dispatches.clone();
            let src_period = self.tasks[caller.index()].effective_period;
            match merge_frames(
                &mut self.pool,
                owner,
                &mut dest,
                &src,
                &mut dest_period,
                src_period,
                number_of_calls,
                0,
            ) {
                Ok(step) => status = status.combine(step),
                Err(error) => {
                    outcome = Err(error);
                    break;
                }
            }
        }

        let entry = &mut self.tasks[task.index()];
        entry.dispatches = dest;
        entry.effective_period = dest_period;
        outcome.map(|_| status)
    }

    /// Joins every matching caller's dispatches in lockstep, emitting one
    /// merged dispatch per joint position until any contributor exhausts.
    fn conjunctive_merge(
        &mut self,
        task: TaskId,
        dependency_type: DependencyType,
        policy: MergePolicy,
    ) -> Result<MergeStatus, MergeError> {
        let owner = self.owner_context(task);

        let mut contributors = Vec::new();
        let mut frame_size: Period = 1;
        for &link_id in &self.tasks[task.index()].callers {
            let link = &self.links[link_id.index()];
            if link.dependency_type == dependency_type {
                frame_size = minimum_frame_size(
                    frame_size,
                    self.tasks[link.caller.index()].effective_period,
                );
                contributors.push((link.caller, link.number_of_calls));
            }
        }

        let mut dest = mem::take(&mut self.tasks[task.index()].dispatches);
        let mut dest_period = self.tasks[task.index()].effective_period;
        let result = conjunctive_merge_frames(
            &mut self.pool,
            &self.tasks,
            owner,
            &contributors,
            frame_size,
            policy,
            &mut dest,
            &mut dest_period,
        );

        let entry = &mut self.tasks[task.index()];
        entry.dispatches = dest;
        entry.effective_period = dest_period;
        result
    }
}

/// Harmonically expands `set` from `set_period` to `new_period`,
/// replicating every existing dispatch into each sub-frame past the 0th.
///
/// A zero `set_period` means uninitialized: the new period is adopted
/// without replication. A `new_period` no larger than the current one is
/// a no-op when the current period is already a multiple of it, and a
/// configuration error otherwise.
pub(crate) fn reframe(
    pool: &mut DispatchPool,
    owner: OwnerContext,
    set: &mut OrderedMultiset<DispatchLink>,
    set_period: &mut Period,
    new_period: Period,
) -> Result<MergeStatus, MergeError> {
    if *set_period == 0 {
        *set_period = new_period;
        return Ok(MergeStatus::Unchanged);
    }
    if new_period <= *set_period {
        return if *set_period % new_period != 0 {
            Err(MergeError::NonHarmonicPeriods {
                current: *set_period,
                requested: new_period,
            })
        } else {
            Ok(MergeStatus::Unchanged)
        };
    }
    if new_period % *set_period != 0 {
        return Err(MergeError::NonHarmonicPeriods {
            current: *set_period,
            requested: new_period,
        });
    }

    trace!(
        from = *set_period,
        to = new_period,
        "reframing dispatch set"
    );

    // Shallow snapshot: the same dispatches, iterated while the real set
    // receives their replicas.
    let snapshot = set.clone();
    let old_period = *set_period;
    let mut enlarged = new_period;
    let status = merge_frames(pool, owner, set, &snapshot, &mut enlarged, old_period, 1, 1)?;
    *set_period = new_period;
    Ok(status)
}

/// Merges `src` (laid out over `src_period`) into `dest`, first enlarging
/// `dest` to the minimum frame enclosing both periods, then emitting one
/// new dispatch per virtual position of `src` over the enlarged frame,
/// starting at `starting_sub_frame`.
///
/// Contributed dispatches keep their own deadline and priority.
#[allow(clippy::too_many_arguments)]
pub(crate) fn merge_frames(
    pool: &mut DispatchPool,
    owner: OwnerContext,
    dest: &mut OrderedMultiset<DispatchLink>,
    src: &OrderedMultiset<DispatchLink>,
    dest_period: &mut Period,
    src_period: Period,
    number_of_calls: u32,
    starting_sub_frame: u64,
) -> Result<MergeStatus, MergeError> {
    reframe(
        pool,
        owner,
        dest,
        dest_period,
        minimum_frame_size(*dest_period, src_period),
    )?;

    let mut proxy = DispatchProxyIterator::new(
        src.clone(),
        src_period,
        *dest_period,
        number_of_calls,
        starting_sub_frame,
    );

    let mut status = MergeStatus::Unchanged;
    let mut hint = 0;
    while let Some(virtual_dispatch) = proxy.current(pool) {
        let id = pool.insert(
            virtual_dispatch.arrival,
            virtual_dispatch.deadline,
            virtual_dispatch.priority,
            virtual_dispatch.os_priority,
            owner.task,
            None,
        );
        let key = DispatchKey::new(
            virtual_dispatch.arrival,
            virtual_dispatch.deadline,
            virtual_dispatch.priority,
            owner.worst_case_execution_time,
            owner.importance,
        );
        hint = dest.insert_with_hint(DispatchLink { key, dispatch: id }, hint) + 1;
        status = MergeStatus::Updated;
        proxy.advance();
    }
    Ok(status)
}

/// The lockstep join behind conjunctive merges.
///
/// Reframes `dest` to the contributors' combined frame, then walks one
/// proxy per contributor in lockstep. Returns `Unchanged` without
/// emitting anything when there are no contributors or any contributor
/// starts out empty.
#[allow(clippy::too_many_arguments)]
fn conjunctive_merge_frames(
    pool: &mut DispatchPool,
    tasks: &[TaskEntry],
    owner: OwnerContext,
    contributors: &[(TaskId, u32)],
    frame_size: Period,
    policy: MergePolicy,
    dest: &mut OrderedMultiset<DispatchLink>,
    dest_period: &mut Period,
) -> Result<MergeStatus, MergeError> {
    reframe(pool, owner, dest, dest_period, frame_size)?;

    let mut proxies = Vec::with_capacity(contributors.len());
    for &(caller, number_of_calls) in contributors {
        let entry = &tasks[caller.index()];
        let proxy = DispatchProxyIterator::new(
            entry.dispatches.clone(),
            entry.effective_period,
            frame_size,
            number_of_calls,
            0,
        );
        // No joint positions exist if any contributor has none.
        if proxy.done() {
            return Ok(MergeStatus::Unchanged);
        }
        proxies.push(proxy);
    }
    if proxies.is_empty() {
        return Ok(MergeStatus::Unchanged);
    }

    let mut status = MergeStatus::Unchanged;
    let mut hint = 0;
    let mut more_dispatches = true;
    while more_dispatches {
        let mut joint: Option<VirtualDispatch> = None;
        for proxy in proxies.iter_mut() {
            if let Some(candidate) = proxy.current(pool) {
                joint = Some(match joint {
                    None => candidate,
                    Some(accumulated) => join(accumulated, candidate, policy),
                });
            }
            proxy.advance();
            if proxy.done() {
                more_dispatches = false;
            }
        }
        let Some(joint) = joint else { break };

        let id = pool.insert(
            joint.arrival,
            joint.deadline,
            joint.priority,
            joint.os_priority,
            owner.task,
            None,
        );
        let key = DispatchKey::new(
            joint.arrival,
            joint.deadline,
            joint.priority,
            owner.worst_case_execution_time,
            owner.importance,
        );
        hint = dest.insert_with_hint(DispatchLink { key, dispatch: id }, hint) + 1;
        status = MergeStatus::Updated;
    }
    Ok(status)
}

/// Joins two contributors at one lockstep position. The joint dispatch
/// arrives when the later contributor arrives; deadline and priority
/// follow the policy.
fn join(
    accumulated: VirtualDispatch,
    candidate: VirtualDispatch,
    policy: MergePolicy,
) -> VirtualDispatch {
    let arrival = accumulated.arrival.max(candidate.arrival);
    let deadline = match policy.deadline {
        DeadlinePolicy::LatestContributor => accumulated.deadline.max(candidate.deadline),
        DeadlinePolicy::EarliestContributor => accumulated.deadline.min(candidate.deadline),
    };
    let keep_candidate = match policy.priority {
        PriorityPolicy::LeastUrgent => candidate.priority >= accumulated.priority,
        PriorityPolicy::MostUrgent => candidate.priority <= accumulated.priority,
    };
    let (priority, os_priority) = if keep_candidate {
        (candidate.priority, candidate.os_priority)
    } else {
        (accumulated.priority, accumulated.os_priority)
    };
    VirtualDispatch {
        arrival,
        deadline,
        priority,
        os_priority,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RtInfo;

    fn operation(graph: &mut TaskGraph, period: u64, wcet: u64) -> TaskId {
        let info = graph.add_rt_info(RtInfo::operation(period, wcet));
        graph.add_task(info)
    }

    fn dispatch_triples(graph: &TaskGraph, task: TaskId) -> Vec<(u64, u64, i32)> {
        graph
            .task(task)
            .dispatches()
            .iter()
            .map(|link| {
                let dispatch = graph.pool().get(link.dispatch);
                (dispatch.arrival, dispatch.deadline, dispatch.priority)
            })
            .collect()
    }

    #[test]
    fn test_two_way_caller_expands_operation_frame() {
        // Callee seeded over period 2; a two-way caller over period 6
        // forces the combined frame of 6 and contributes its dispatch.
        let mut graph = TaskGraph::new();
        let caller = operation(&mut graph, 6, 1);
        let callee = operation(&mut graph, 2, 1);
        graph.add_call(caller, callee, 1, DependencyType::TwoWay);
        graph.seed_dispatch(caller, 0, 6, 2, 0);
        graph.seed_dispatch(callee, 0, 1, 5, 0);

        graph.merge_dispatches(caller).unwrap();
        graph.merge_dispatches(callee).unwrap();

        assert_eq!(graph.task(callee).effective_period(), 6);
        let triples = dispatch_triples(&graph, callee);
        // Own dispatch replicated at {0, 2, 4}; the caller's at 0.
        assert_eq!(
            triples,
            vec![(0, 1, 5), (0, 6, 2), (2, 3, 5), (4, 5, 5)]
        );
    }

    #[test]
    fn test_two_way_harmonic_expansion_both_ways() {
        // Periods 4 and 6 combine into a frame of 12: the callee's own
        // dispatch triples, the caller's doubles.
        let mut graph = TaskGraph::new();
        let caller = operation(&mut graph, 6, 1);
        let callee = operation(&mut graph, 4, 1);
        graph.add_call(caller, callee, 1, DependencyType::TwoWay);
        graph.seed_dispatch(caller, 0, 6, 0, 0);
        graph.seed_dispatch(callee, 0, 4, 0, 0);

        graph.merge_dispatches(caller).unwrap();
        graph.merge_dispatches(callee).unwrap();

        assert_eq!(graph.task(callee).effective_period(), 12);
        let arrivals: Vec<u64> = dispatch_triples(&graph, callee)
            .iter()
            .map(|&(arrival, _, _)| arrival)
            .collect();
        assert_eq!(arrivals, vec![0, 0, 4, 6, 8]);
    }

    #[test]
    fn test_conjunction_lockstep_until_exhaustion() {
        // Contributors over periods 2 and 3 join over a frame of 6; the
        // walk ends when the period-3 stream runs out.
        let mut graph = TaskGraph::new();
        let fast = operation(&mut graph, 2, 1);
        let slow = operation(&mut graph, 3, 1);
        let join_info = graph.add_rt_info(RtInfo::conjunction());
        let joint = graph.add_task(join_info);
        graph.add_call(fast, joint, 1, DependencyType::OneWay);
        graph.add_call(slow, joint, 1, DependencyType::OneWay);
        graph.seed_dispatch(fast, 0, 1, 3, 10);
        graph.seed_dispatch(slow, 0, 2, 7, 20);

        let status = graph.merge_dispatches(joint).unwrap();

        assert!(status.is_updated());
        assert_eq!(graph.task(joint).effective_period(), 6);
        // Latest arrival, latest deadline, least urgent priority per step.
        assert_eq!(dispatch_triples(&graph, joint), vec![(0, 2, 7), (3, 5, 7)]);
        let os_priorities: Vec<i32> = graph
            .task(joint)
            .dispatches()
            .iter()
            .map(|link| graph.pool().get(link.dispatch).os_priority)
            .collect();
        assert_eq!(os_priorities, vec![20, 20]);
        assert!(graph
            .task(joint)
            .dispatches()
            .iter()
            .all(|link| graph.pool().get(link.dispatch).task_entry == joint));
    }

    #[test]
    fn test_conjunction_policy_most_urgent() {
        let mut graph = TaskGraph::new();
        let fast = operation(&mut graph, 2, 1);
        let slow = operation(&mut graph, 3, 1);
        let join_info = graph.add_rt_info(RtInfo::conjunction());
        let joint = graph.add_task(join_info);
        graph.add_call(fast, joint, 1, DependencyType::OneWay);
        graph.add_call(slow, joint, 1, DependencyType::OneWay);
        graph.seed_dispatch(fast, 0, 1, 3, 0);
        graph.seed_dispatch(slow, 0, 2, 7, 0);

        let policy = MergePolicy {
            deadline: DeadlinePolicy::EarliestContributor,
            priority: PriorityPolicy::MostUrgent,
        };
        graph.merge_dispatches_with(joint, policy).unwrap();

        assert_eq!(dispatch_triples(&graph, joint), vec![(0, 1, 3), (3, 3, 3)]);
    }

    #[test]
    fn test_disjunction_prohibits_two_way_callers() {
        let mut graph = TaskGraph::new();
        let caller = operation(&mut graph, 2, 1);
        let info = graph.add_rt_info(RtInfo::disjunction());
        let either = graph.add_task(info);
        graph.add_call(caller, either, 1, DependencyType::TwoWay);
        graph.seed_dispatch(caller, 0, 1, 0, 0);

        let error = graph.merge_dispatches(either).unwrap_err();
        assert_eq!(
            error,
            MergeError::ProhibitedDependency {
                task: either,
                dependency_type: DependencyType::TwoWay,
            }
        );
        assert!(graph.task(either).dispatches().is_empty());
    }

    #[test]
    fn test_conjunction_prohibits_two_way_callers() {
        let mut graph = TaskGraph::new();
        let caller = operation(&mut graph, 2, 1);
        let info = graph.add_rt_info(RtInfo::conjunction());
        let both = graph.add_task(info);
        graph.add_call(caller, both, 1, DependencyType::TwoWay);

        assert!(matches!(
            graph.merge_dispatches(both),
            Err(MergeError::ProhibitedDependency { .. })
        ));
    }

    #[test]
    fn test_disjunction_unions_one_way_callers() {
        let mut graph = TaskGraph::new();
        let left = operation(&mut graph, 2, 1);
        let right = operation(&mut graph, 4, 1);
        let info = graph.add_rt_info(RtInfo::disjunction());
        let either = graph.add_task(info);
        graph.add_call(left, either, 1, DependencyType::OneWay);
        graph.add_call(right, either, 1, DependencyType::OneWay);
        graph.seed_dispatch(left, 0, 1, 4, 0);
        graph.seed_dispatch(right, 1, 3, 2, 0);

        let status = graph.merge_dispatches(either).unwrap();

        assert!(status.is_updated());
        assert_eq!(graph.task(either).effective_period(), 4);
        // Left contributes {0, 2}, right contributes {1}; originals keep
        // their own deadlines and priorities.
        assert_eq!(
            dispatch_triples(&graph, either),
            vec![(0, 1, 4), (1, 3, 2), (2, 3, 4)]
        );
    }

    #[test]
    fn test_non_harmonic_conjunction_fails() {
        // Owner laid out over period 4; contributor frame of 10 is not a
        // multiple, so the reframe is rejected.
        let mut graph = TaskGraph::new();
        let caller = operation(&mut graph, 10, 1);
        let callee = operation(&mut graph, 4, 1);
        graph.add_call(caller, callee, 1, DependencyType::OneWay);
        graph.seed_dispatch(caller, 0, 10, 0, 0);
        graph.seed_dispatch(callee, 0, 4, 0, 0);

        let error = graph.merge_dispatches(callee).unwrap_err();
        assert_eq!(
            error,
            MergeError::NonHarmonicPeriods {
                current: 4,
                requested: 10,
            }
        );
    }

    #[test]
    fn test_replicated_calls_get_distinct_dispatches() {
        let mut graph = TaskGraph::new();
        let caller = operation(&mut graph, 2, 1);
        let callee = operation(&mut graph, 2, 1);
        graph.add_call(caller, callee, 3, DependencyType::TwoWay);
        graph.seed_dispatch(caller, 0, 2, 1, 0);

        graph.merge_dispatches(callee).unwrap();

        let links: Vec<_> = graph.task(callee).dispatches().iter().collect();
        assert_eq!(links.len(), 3);
        let mut ids: Vec<_> = links.iter().map(|link| link.dispatch).collect();
        ids.dedup();
        assert_eq!(ids.len(), 3, "each replication is its own dispatch");
        for link in links {
            let dispatch = graph.pool().get(link.dispatch);
            assert_eq!((dispatch.arrival, dispatch.deadline), (0, 2));
        }
    }

    #[test]
    fn test_empty_contributor_leaves_set_unchanged() {
        let mut graph = TaskGraph::new();
        let seeded = operation(&mut graph, 2, 1);
        let empty = operation(&mut graph, 4, 1);
        let info = graph.add_rt_info(RtInfo::conjunction());
        let joint = graph.add_task(info);
        graph.add_call(seeded, joint, 1, DependencyType::OneWay);
        graph.add_call(empty, joint, 1, DependencyType::OneWay);
        graph.seed_dispatch(seeded, 0, 1, 0, 0);

        let status = graph.merge_dispatches(joint).unwrap();
        assert_eq!(status, MergeStatus::Unchanged);
        assert!(graph.task(joint).dispatches().is_empty());
    }

    #[test]
    fn test_operation_returns_final_step_status() {
        // The two-way union adds dispatches, but the top-level result
        // reports the one-way join step, which has nothing to do here.
        let mut graph = TaskGraph::new();
        let caller = operation(&mut graph, 2, 1);
        let callee = operation(&mut graph, 2, 1);
        graph.add_call(caller, callee, 1, DependencyType::TwoWay);
        graph.seed_dispatch(caller, 0, 2, 0, 0);

        let status = graph.merge_dispatches(callee).unwrap();
        assert_eq!(status, MergeStatus::Unchanged);
        assert_eq!(graph.task(callee).dispatches().len(), 1);
    }

    #[test]
    fn test_one_way_join_into_seeded_operation_orders_links() {
        let mut graph = TaskGraph::new();
        let caller = operation(&mut graph, 2, 1);
        let callee = operation(&mut graph, 2, 1);
        graph.add_call(caller, callee, 1, DependencyType::OneWay);
        graph.seed_dispatch(caller, 0, 2, 9, 0);
        graph.seed_dispatch(callee, 0, 1, 1, 0);

        let status = graph.merge_dispatches(callee).unwrap();
        assert!(status.is_updated());
        // Arrival tie: the numerically greater priority value sorts first.
        assert_eq!(dispatch_triples(&graph, callee), vec![(0, 2, 9), (0, 1, 1)]);
    }

    #[test]
    fn test_merge_all_runs_callers_first() {
        // Register the chain backwards to prove ordering comes from the
        // topology, not registration order.
        let mut graph = TaskGraph::new();
        let sink = operation(&mut graph, 2, 1);
        let middle = operation(&mut graph, 2, 1);
        let source = operation(&mut graph, 2, 1);
        graph.add_call(middle, sink, 1, DependencyType::OneWay);
        graph.add_call(source, middle, 1, DependencyType::OneWay);
        graph.seed_dispatch(source, 0, 1, 5, 0);

        let status = graph.merge_all().unwrap();

        assert!(status.is_updated());
        assert_eq!(dispatch_triples(&graph, middle), vec![(0, 1, 5)]);
        assert_eq!(dispatch_triples(&graph, sink), vec![(0, 1, 5)]);
        assert_eq!(
            graph.pool().get(graph.task(sink).dispatches().get(0).unwrap().dispatch).task_entry,
            sink
        );
    }

    #[test]
    fn test_merge_all_rejects_cycles() {
        let mut graph = TaskGraph::new();
        let a = operation(&mut graph, 2, 1);
        let b = operation(&mut graph, 2, 1);
        graph.add_call(a, b, 1, DependencyType::OneWay);
        graph.add_call(b, a, 1, DependencyType::OneWay);

        assert!(matches!(
            graph.merge_all(),
            Err(PassError::Validation(_))
        ));
    }

    #[test]
    fn test_reframe_same_period_is_noop() {
        let mut graph = TaskGraph::new();
        let task = operation(&mut graph, 2, 1);
        graph.seed_dispatch(task, 0, 1, 0, 0);
        let owner = graph.owner_context(task);
        let mut set = graph.task(task).dispatches().clone();
        let before = set.clone();
        let mut period = 2;

        let mut pool = graph.pool().clone();
        let status = reframe(&mut pool, owner, &mut set, &mut period, 2).unwrap();
        assert_eq!(status, MergeStatus::Unchanged);
        assert_eq!(period, 2);
        assert_eq!(set, before);
    }

    #[test]
    fn test_reframe_multiplies_cardinality() {
        let mut graph = TaskGraph::new();
        let task = operation(&mut graph, 2, 1);
        graph.seed_dispatch(task, 0, 1, 0, 0);
        graph.seed_dispatch(task, 1, 2, 0, 0);
        let owner = graph.owner_context(task);
        let mut set = graph.task(task).dispatches().clone();
        let mut period = 2;
        let mut pool = graph.pool().clone();

        let status = reframe(&mut pool, owner, &mut set, &mut period, 6).unwrap();

        assert_eq!(status, MergeStatus::Updated);
        assert_eq!(period, 6);
        assert_eq!(set.len(), 6);
        let arrivals: Vec<u64> = set
            .iter()
            .map(|link| pool.get(link.dispatch).arrival)
            .collect();
        assert_eq!(arrivals, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_reframe_uninitialized_adopts_period() {
        let mut pool = DispatchPool::new();
        let mut graph = TaskGraph::new();
        let task = operation(&mut graph, 2, 1);
        let owner = graph.owner_context(task);
        let mut set = OrderedMultiset::new();
        let mut period = 0;

        let status = reframe(&mut pool, owner, &mut set, &mut period, 6).unwrap();
        assert_eq!(status, MergeStatus::Unchanged);
        assert_eq!(period, 6);
        assert!(set.is_empty());
    }

    #[test]
    fn test_reframe_smaller_divisor_is_noop() {
        let mut pool = DispatchPool::new();
        let mut graph = TaskGraph::new();
        let task = operation(&mut graph, 6, 1);
        let owner = graph.owner_context(task);
        let mut set = OrderedMultiset::new();
        let mut period = 6;

        let status = reframe(&mut pool, owner, &mut set, &mut period, 3).unwrap();
        assert_eq!(status, MergeStatus::Unchanged);
        assert_eq!(period, 6, "the set already spans a multiple of the target");
    }

    #[test]
    fn test_reframe_non_harmonic_is_rejected() {
        let mut pool = DispatchPool::new();
        let mut graph = TaskGraph::new();
        let task = operation(&mut graph, 4, 1);
        let owner = graph.owner_context(task);
        let mut set = OrderedMultiset::new();

        let mut period = 4;
        assert!(reframe(&mut pool, owner, &mut set, &mut period, 10).is_err());
        assert_eq!(period, 4);

        let mut period = 4;
        assert!(reframe(&mut pool, owner, &mut set, &mut period, 6).is_err());
    }

    #[test]
    fn test_error_messages_are_actionable() {
        let non_harmonic = MergeError::NonHarmonicPeriods {
            current: 4,
            requested: 10,
        };
        assert!(non_harmonic.to_string().contains("non-harmonic"));
        let prohibited = MergeError::ProhibitedDependency {
            task: TaskId(3),
            dependency_type: DependencyType::TwoWay,
        };
        assert!(prohibited.to_string().contains("TwoWay"));
    }
}
