//! Schema module - Configuration, scope and report types for the search.

mod config;
mod report;
mod scope;

pub use config::*;
pub use report::*;
pub use scope::*;
