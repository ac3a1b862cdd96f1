//! gradescan-core — Core analysis engine, traits, and scoring.
//!
//! This crate defines the fundamental data model, traits, and scoring logic
//! that the entire gradescan system builds on.

pub mod engine;
pub mod error;
pub mod feedback;
pub mod filter;
pub mod model;
pub mod parser;
pub mod results;
pub mod segmenter;
pub mod statistics;
pub mod store;
pub mod traits;
