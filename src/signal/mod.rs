//! Signals, memos and effects.
//!
//! Cells are built from these. A memo recomputes lazily once a signal it
//! read has changed. An effect re-runs eagerly, in registration order.

mod effect;
mod memo;
mod signal;

pub use effect::{create_effect, Effect};
pub use memo::{create_memo, Memo};
pub use signal::Signal;
