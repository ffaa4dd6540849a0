//! Real-time dispatch computation framework for the U-Engine ecosystem.
//!
//! Computes, for every task in a graph of periodic, dependency-linked
//! operations, the full set of dispatches — arrival, deadline, priority —
//! over a common hyper-frame derived from the least common multiple of
//! the involved periods. The resulting dispatch sets are the input to
//! downstream priority assignment and timeline construction, which are
//! out of scope here.
//!
//! # Modules
//!
//! - **`models`**: Domain types — `RtInfo`, `TaskEntry`, `TaskLink`,
//!   `Dispatch`, `DispatchKey`, `DispatchPool`, `TaskGraph`, and the
//!   period arithmetic (`gcd`, `minimum_frame_size`)
//! - **`multiset`**: `OrderedMultiset`, the sorted duplicate-permitting
//!   container dispatch sets live in
//! - **`merging`**: The dispatch-merging core — disjunctive and
//!   conjunctive merges, harmonic reframing, and the virtual
//!   `DispatchProxyIterator`
//! - **`validation`**: Structural graph checks (DAG, link symmetry) and
//!   the callers-first topological ordering the merge pass runs in
//!
//! # Architecture
//!
//! This crate sits at Layer 3 (Frameworks) in the U-Engine ecosystem. It
//! is a compile-/admission-time computation: single-threaded, no runtime
//! dispatching, no I/O. The surrounding scheduler supplies descriptors,
//! call links, and seed dispatches; this crate returns the merged
//! dispatch sets and the pass-wide dispatch pool.
//!
//! # References
//!
//! - Liu & Layland (1973), "Scheduling Algorithms for Multiprogramming
//!   in a Hard-Real-Time Environment"
//! - Gill, Levine & Schmidt (2001), "The Design and Performance of a
//!   Real-Time CORBA Scheduling Service"
//! - Klein et al. (1993), "A Practitioner's Handbook for Real-Time
//!   Analysis"

pub mod merging;
pub mod models;
pub mod multiset;
pub mod validation;
