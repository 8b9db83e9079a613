//! Data domain: the working rows and scratch state of one transaction.

pub mod domain;

pub use domain::{Cell, ModelData, WorkingInput};
