//! Profile selector core.
//!
//! Query expressions for selecting profile series, time range resolution, and
//! the immutable query selections handed to the data fetching layer.

pub mod config;
pub mod error;
pub mod labels;
pub mod query;
pub mod selection;
pub mod time_range;

pub use config::Config;
pub use error::{Error, ParseError, Result};
pub use labels::{
    LabelValuesRequest, LabelValuesResult, LabelValuesSource, LabelValuesTracker, StaticLabelValues,
    PROFILE_NAME_LABEL,
};
pub use query::{MatchOp, Matcher, Query};
pub use selection::{search_disabled, Action, Outcome, ProfileSelector, QuerySelection};
pub use time_range::{TimeRange, TimeRangeResolver, TimeSelection};
