//! Utility functions

pub mod collation;
pub mod common;
pub mod id_gen;

pub use collation::TextCollator;
pub use common::*;
pub use id_gen::*;
