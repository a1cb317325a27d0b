//! Model System - Active-record entities backed by a table row
//!
//! - `core_trait`: Model trait with table metadata and configuration
//! - `record`: attribute storage and lifecycle state
//! - `casts`: read-time attribute conversion
//! - `crud_operations`: persistence, finders and attribute access

pub mod casts;
pub mod core_trait;
pub mod crud_operations;
pub mod record;

pub use casts::CastType;
pub use core_trait::Model;
pub use crud_operations::CrudOperations;
pub use record::{Record, RecordState};
