//! Compute module - Search algorithms.

pub mod evolution;
