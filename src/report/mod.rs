//! Report output: JSON and Markdown files, and the console summary.

pub mod console;
pub mod generator;

pub use console::print_summary;
pub use generator::{write_json_report, write_markdown_report};
