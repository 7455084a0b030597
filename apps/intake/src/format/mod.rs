// Output formatting for terminal display.

pub mod wrap;

pub use wrap::{wrap_text, DEFAULT_WRAP_WIDTH};
