//! Terminal presentation layer.

mod output;
mod table;

pub use output::{ConsoleReporter, Output};
pub use table::{human_bytes, render_candidates};
