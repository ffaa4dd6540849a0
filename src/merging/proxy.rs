//! Virtual iteration over replicated dispatch sets.
//!
//! A `DispatchProxyIterator` walks a dispatch set as if it had been
//! replicated into every sub-frame of an enclosing virtual frame, with
//! each dispatch additionally repeated once per call the dependency makes
//! — all without materializing a single copy. The iterator owns a shallow
//! snapshot of the link vector (index pairs only); arrivals and deadlines
//! are shifted by the current sub-frame offset on the fly.
//!
//! Iteration order is dispatch order within a sub-frame, sub-frames in
//! ascending offset. A dispatch repeated for multiple calls is emitted at
//! the same arrival each time: a caller that invokes the callee N times
//! per arrival contributes N dispatches at that arrival.

use crate::models::{DispatchLink, DispatchPool, OsPriority, Period, Priority, Time};
use crate::multiset::OrderedMultiset;

/// One position of a proxy traversal: the referenced dispatch as seen
/// from the current sub-frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VirtualDispatch {
    /// Arrival shifted into the current sub-frame.
    pub arrival: Time,
    /// Deadline shifted into the current sub-frame.
    pub deadline: Time,
    /// Priority of the underlying dispatch.
    pub priority: Priority,
    /// OS priority of the underlying dispatch.
    pub os_priority: OsPriority,
}

/// Lazy iterator over a dispatch set expanded across sub-frames and
/// per-arrival call repetitions.
#[derive(Debug, Clone)]
pub struct DispatchProxyIterator {
    set: OrderedMultiset<DispatchLink>,
    actual_frame_size: Period,
    virtual_frame_size: Period,
    number_of_calls: u32,
    current_call: u32,
    current_frame_offset: Period,
    /// Index into `set`; equal to `set.len()` once exhausted.
    inner: usize,
}

impl DispatchProxyIterator {
    /// Builds a proxy over `set` laid out at `actual_frame_size`,
    /// expanded to `virtual_frame_size` (a multiple of the actual frame),
    /// repeating each dispatch `number_of_calls` times per arrival, and
    /// positioned at the start of `starting_sub_frame`.
    ///
    /// `number_of_calls` below 1 is treated as 1. A proxy that cannot be
    /// positioned (empty set, or the starting sub-frame lies outside the
    /// virtual frame) starts out exhausted.
    pub fn new(
        set: OrderedMultiset<DispatchLink>,
        actual_frame_size: Period,
        virtual_frame_size: Period,
        number_of_calls: u32,
        starting_sub_frame: u64,
    ) -> Self {
        debug_assert!(actual_frame_size > 0 || set.is_empty());
        let mut proxy = Self {
            set,
            actual_frame_size,
            virtual_frame_size,
            number_of_calls: number_of_calls.max(1),
            current_call: 0,
            current_frame_offset: 0,
            inner: 0,
        };
        if !proxy.first(starting_sub_frame) {
            proxy.inner = proxy.set.len();
        }
        proxy
    }

    /// Whether the traversal is exhausted.
    pub fn done(&self) -> bool {
        self.inner >= self.set.len()
    }

    /// Positions the traversal at the first entry of `sub_frame`.
    ///
    /// Returns `false` without repositioning if the sub-frame lies outside
    /// the virtual frame, or if the set is empty.
    pub fn first(&mut self, sub_frame: u64) -> bool {
        if self.actual_frame_size * sub_frame >= self.virtual_frame_size {
            return false;
        }
        self.current_call = 0;
        self.current_frame_offset = self.actual_frame_size * sub_frame;
        self.inner = 0;
        !self.set.is_empty()
    }

    /// Positions the traversal at the final entry of the virtual frame.
    pub fn last(&mut self) -> bool {
        if self.set.is_empty() || self.virtual_frame_size < self.actual_frame_size {
            self.inner = self.set.len();
            return false;
        }
        self.current_call = self.number_of_calls - 1;
        self.current_frame_offset = self.virtual_frame_size - self.actual_frame_size;
        self.inner = self.set.len() - 1;
        true
    }

    /// Moves to the next position. Returns `false`, leaving the traversal
    /// exhausted, once the final position has been passed.
    pub fn advance(&mut self) -> bool {
        if self.done() {
            return false;
        }
        if self.current_call + 1 < self.number_of_calls {
            self.current_call += 1;
            return true;
        }
        self.current_call = 0;
        if self.inner + 1 < self.set.len() {
            self.inner += 1;
            return true;
        }
        if self.current_frame_offset + self.actual_frame_size < self.virtual_frame_size {
            self.current_frame_offset += self.actual_frame_size;
            self.inner = 0;
            return true;
        }
        self.inner = self.set.len();
        false
    }

    /// Moves to the previous position. Returns `false`, leaving the
    /// traversal exhausted, once the first position has been passed.
    pub fn retreat(&mut self) -> bool {
        if self.done() {
            return false;
        }
        if self.current_call > 0 {
            self.current_call -= 1;
            return true;
        }
        self.current_call = self.number_of_calls - 1;
        if self.inner > 0 {
            self.inner -= 1;
            return true;
        }
        if self.current_frame_offset > 0 {
            self.current_frame_offset -= self.actual_frame_size;
            self.inner = self.set.len() - 1;
            return true;
        }
        self.inner = self.set.len();
        false
    }

    /// The dispatch at the current position, shifted into the current
    /// sub-frame. `None` once exhausted.
    pub fn current(&self, pool: &DispatchPool) -> Option<VirtualDispatch> {
        let link = self.set.get(self.inner)?;
        let dispatch = pool.get(link.dispatch);
        Some(VirtualDispatch {
            arrival: dispatch.arrival + self.current_frame_offset,
            deadline: dispatch.deadline + self.current_frame_offset,
            priority: dispatch.priority,
            os_priority: dispatch.os_priority,
        })
    }
}
