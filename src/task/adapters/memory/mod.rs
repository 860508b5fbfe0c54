//! In-memory adapters for tests and single-process deployments.

mod directory;
mod task;

pub use directory::InMemoryStaffDirectory;
pub use task::InMemoryTaskRepository;
