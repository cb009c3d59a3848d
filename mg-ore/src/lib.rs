//! Small utilities shared by all of the `mg` crates.
//!
//! Like the name suggests, this is the raw material other crates are built from. Keep it free of
//! dependencies.

pub mod assert;
pub mod env;
pub mod iter;
