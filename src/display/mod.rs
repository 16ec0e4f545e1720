//! Human-readable renderings of a computed model.
pub mod trace;

pub use trace::format_trace;
