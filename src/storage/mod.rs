//! Collaborator interfaces and in-memory implementations.
//!
//! The traits define the contract that position, rule and record backends
//! must implement; `memory` provides the reference implementations.

mod memory;
mod traits;

pub use memory::{FaultPoint, InMemoryPositionTracker, InMemoryRecordStore, InMemoryRuleStore};
pub use traits::{PositionTracker, RecordStore, RuleStore, StorageError};
