//! Background persistence of diagnostic artifacts.

mod writer;

pub use writer::*;
