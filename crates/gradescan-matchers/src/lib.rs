//! gradescan-matchers — rubric matching strategies.
//!
//! Implements the `RubricMatcher` trait for an AI-backed semantic matcher
//! and a deterministic keyword fallback, plus the configuration layer that
//! selects between them.

pub mod config;
pub mod keyword;
pub mod mock;
pub mod semantic;

pub use config::{create_matcher, load_config, GradescanConfig, MatcherSettings};
