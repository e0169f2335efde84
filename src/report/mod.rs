//! End-of-run report emission.

mod csv_writer;

pub use csv_writer::*;
