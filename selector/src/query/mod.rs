//! Profile query expressions.
//!
//! # Syntax Overview
//!
//! Full pattern: `<profileName>{<label><op>"<value>", ...}`
//!
//! - **Profile name**: `process_cpu`, `memory:alloc_space:bytes` (may be empty)
//! - **Matchers**: `label="value"`, separated by commas
//! - **Operators**: `=`, `!=`, `=~`, `!~`
//! - **Empty matcher set**: `process_cpu{}`, or `{}` with no profile name
//!
//! A bare profile name without braces is accepted and normalizes to `name{}`.

mod parser;

pub use parser::{MatchOp, Matcher, Query};
