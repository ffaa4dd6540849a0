//! Scheduling domain models.
//!
//! Provides the core data types of the dispatch computation: time and
//! period arithmetic, task descriptors, dispatches with their total
//! order, task entries with call links, and the arena graph that owns a
//! whole scheduling pass.
//!
//! # Domain Mappings
//!
//! | u-rtsched | Avionics | Robotics | Telecom |
//! |-----------|----------|----------|---------|
//! | RtInfo | Rate group spec | Control-loop spec | Stream spec |
//! | TaskEntry | Frame slot owner | Node | Session leg |
//! | Dispatch | Minor-frame job | Tick | Cell transmission |
//! | TaskGraph | Rate structure | Control graph | Call topology |

mod dispatch;
mod graph;
mod rt_info;
mod task;
mod time;

pub use dispatch::{Dispatch, DispatchId, DispatchKey, DispatchLink, DispatchPool};
pub use graph::{LinkId, RtInfoId, TaskGraph, TaskId};
pub use rt_info::{DependencyType, InfoKind, RtInfo};
pub use task::{DfsStatus, TaskEntry, TaskLink};
pub use time::{gcd, laxity, minimum_frame_size, OsPriority, Period, Priority, Time};
