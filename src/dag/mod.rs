// src/dag/mod.rs

//! Task graph, registration and scheduling.
//!
//! - [`graph`] stores typed task handles and their adjacency.
//! - [`registry`] turns named registrations into graph nodes.
//! - [`resolve`] computes a run's closure and rejects cycles and unknown
//!   references before anything executes.
//! - [`scheduler`] is the public entry point tying these to the engine.

pub mod graph;
pub mod registry;
pub mod resolve;
pub mod scheduler;

pub use graph::{DagGraph, TaskId};
pub use registry::{TaskDef, TaskRegistry, TaskSpec};
pub use resolve::{resolve, validate_all, ExecutionPlan};
pub use scheduler::Scheduler;
