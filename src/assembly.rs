//! Assembly of global sparse matrices from element contributions.
pub mod global;
pub mod local;
