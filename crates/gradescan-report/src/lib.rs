//! gradescan-report — operator-facing report rendering.
//!
//! Renders a finished sheet analysis as a markdown feedback report or a CSV
//! per-question score export. Both renderers are pure functions over
//! [`gradescan_core::results::SheetResult`].

pub mod csv;
pub mod markdown;

pub use csv::{generate_csv, write_csv_report};
pub use markdown::{generate_markdown, write_markdown_report};
