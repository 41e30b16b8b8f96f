//! The reactive cell every store is built around.

mod cell;

pub use cell::{Cell, Computed, Lifecycle};
