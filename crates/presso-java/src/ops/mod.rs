//! Java refactoring operations.
//!
//! Each operation resolves its target through [`crate::query`], computes a
//! validated, non-overlapping [`presso_core::patch::EditPlan`] and leaves
//! applying it to the caller.

pub mod rename;

pub use rename::{plan_rename, RenameError, RenamePlan, RenameResult};
