//! Task lifecycle management.
//!
//! Tasks move through `unassigned`, `ongoing`, `under_review` and `done`,
//! may own one level of subtasks, and may recur after completion. The
//! module follows hexagonal architecture:
//!
//! - Domain types and the state machine in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;
