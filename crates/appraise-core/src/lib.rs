//! appraise-core: domain logic for distributed code review on git notes.
//!
//! This crate owns the note store and its union merge, the wire records,
//! review aggregation, the submission engine, and the repository abstraction.

pub mod core;
pub mod identity;
pub mod model;
pub mod notes;
pub mod repo;
pub mod review;
pub mod submit;
