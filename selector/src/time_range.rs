//! Time range selection.
//!
//! A selector is in one of six named states. The five relative presets are
//! resolved against the wall clock every time they are read, so two reads of
//! the same preset return different bounds as time passes. Results must not
//! be memoized across reads. `custom` is the only state backed by explicit
//! bounds.

use std::fmt::{self, Write};
use std::str::FromStr;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Named time selections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TimeSelection {
    #[default]
    #[serde(rename = "lasthour")]
    LastHour,
    #[serde(rename = "lastday")]
    LastDay,
    #[serde(rename = "last3days")]
    Last3Days,
    #[serde(rename = "last7days")]
    Last7Days,
    #[serde(rename = "last14days")]
    Last14Days,
    #[serde(rename = "custom")]
    Custom,
}

impl TimeSelection {
    pub const ALL: [TimeSelection; 6] = [
        TimeSelection::LastHour,
        TimeSelection::LastDay,
        TimeSelection::Last3Days,
        TimeSelection::Last7Days,
        TimeSelection::Last14Days,
        TimeSelection::Custom,
    ];

    pub const fn key(&self) -> &'static str {
        match self {
            TimeSelection::LastHour => "lasthour",
            TimeSelection::LastDay => "lastday",
            TimeSelection::Last3Days => "last3days",
            TimeSelection::Last7Days => "last7days",
            TimeSelection::Last14Days => "last14days",
            TimeSelection::Custom => "custom",
        }
    }

    /// Display label for relative presets. `custom` is labelled by its bounds.
    pub const fn label(&self) -> &'static str {
        match self {
            TimeSelection::LastHour => "Last hour",
            TimeSelection::LastDay => "Last day",
            TimeSelection::Last3Days => "Last 3 days",
            TimeSelection::Last7Days => "Last 7 days",
            TimeSelection::Last14Days => "Last 14 days",
            TimeSelection::Custom => "Custom",
        }
    }

    pub const fn is_relative(&self) -> bool {
        !matches!(self, TimeSelection::Custom)
    }

    /// Lookback window for relative presets.
    pub fn duration(&self) -> Option<Duration> {
        match self {
            TimeSelection::LastHour => Some(Duration::hours(1)),
            TimeSelection::LastDay => Some(Duration::days(1)),
            TimeSelection::Last3Days => Some(Duration::days(3)),
            TimeSelection::Last7Days => Some(Duration::days(7)),
            TimeSelection::Last14Days => Some(Duration::days(14)),
            TimeSelection::Custom => None,
        }
    }

    /// The presets offered for direct selection (relative ones only).
    pub fn presets() -> impl Iterator<Item = TimeSelection> {
        Self::ALL.into_iter().filter(TimeSelection::is_relative)
    }
}

impl FromStr for TimeSelection {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|sel| sel.key() == s)
            .ok_or_else(|| Error::UnknownTimeSelection(s.to_string()))
    }
}

impl fmt::Display for TimeSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// An absolute interval in Unix milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub from: i64,
    pub to: i64,
}

impl TimeRange {
    /// Create a range, rejecting inverted bounds.
    pub fn new(from: i64, to: i64) -> Result<Self> {
        if from > to {
            return Err(Error::InvalidTimeRange { from, to });
        }
        Ok(Self { from, to })
    }

    /// The window `[now - duration, now]`.
    pub fn ending_at(now: DateTime<Utc>, duration: Duration) -> Self {
        let to = now.timestamp_millis();
        Self {
            from: to - duration.num_milliseconds(),
            to,
        }
    }

    pub const fn duration_ms(&self) -> i64 {
        self.to - self.from
    }

    /// Render as `from ⇒ to` using a chrono format string, in UTC.
    pub fn label(&self, format: &str) -> String {
        format!(
            "{} \u{21d2} {}",
            format_millis(self.from, format),
            format_millis(self.to, format)
        )
    }
}

/// Render `ms` with a chrono format, falling back to the raw milliseconds
/// when the instant is out of range or the format is invalid.
fn format_millis(ms: i64, format: &str) -> String {
    let Some(t) = Utc.timestamp_millis_opt(ms).single() else {
        return ms.to_string();
    };
    let mut out = String::new();
    match write!(out, "{}", t.format(format)) {
        Ok(()) => out,
        Err(_) => {
            tracing::debug!(format, "invalid time format");
            ms.to_string()
        }
    }
}

/// Tracks the current time selection and derives absolute bounds from it.
///
/// Precedence for the current selection: a locally chosen key, then the key
/// inherited from a previous query selection, then `lasthour`.
#[derive(Debug, Clone, Default)]
pub struct TimeRangeResolver {
    selected: Option<TimeSelection>,
    custom: Option<TimeRange>,
    inherited: Option<(TimeSelection, TimeRange)>,
}

impl TimeRangeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed from a previously emitted selection. Local choices still win.
    pub fn inherit(selection: TimeSelection, range: TimeRange) -> Self {
        Self {
            selected: None,
            custom: None,
            inherited: Some((selection, range)),
        }
    }

    /// The active selection.
    pub fn current(&self) -> TimeSelection {
        self.selected
            .or(self.inherited.map(|(sel, _)| sel))
            .unwrap_or_default()
    }

    /// Record the most recently emitted selection as the fallback for
    /// `custom` without explicit bounds.
    pub fn remember(&mut self, selection: TimeSelection, range: TimeRange) {
        self.inherited = Some((selection, range));
    }

    /// Switch to a named selection.
    pub fn select(&mut self, selection: TimeSelection) {
        self.selected = Some(selection);
    }

    /// Store explicit bounds and switch to `custom`.
    pub fn set_range(&mut self, from: i64, to: i64) -> Result<TimeRange> {
        let range = TimeRange::new(from, to).inspect_err(|err| {
            tracing::warn!(from, to, error = %err, "rejected explicit time range");
        })?;
        self.selected = Some(TimeSelection::Custom);
        self.custom = Some(range);
        Ok(range)
    }

    /// Resolve the current selection against the wall clock.
    pub fn resolve(&self) -> TimeRange {
        self.resolve_at(Utc::now())
    }

    /// Resolve the current selection against a given instant.
    pub fn resolve_at(&self, now: DateTime<Utc>) -> TimeRange {
        match self.current().duration() {
            Some(duration) => TimeRange::ending_at(now, duration),
            None => self.custom_range(now),
        }
    }

    /// Bounds backing `custom`: explicit, then inherited, then the instant `now`.
    fn custom_range(&self, now: DateTime<Utc>) -> TimeRange {
        if let Some(range) = self.custom {
            return range;
        }
        if let Some((_, range)) = self.inherited {
            return range;
        }
        let now = now.timestamp_millis();
        TimeRange { from: now, to: now }
    }

    /// Label for the current selection, rendering custom bounds with `format`.
    pub fn label(&self, format: &str) -> String {
        match self.current() {
            TimeSelection::Custom => self.custom_range(Utc::now()).label(format),
            sel => sel.label().to_string(),
        }
    }
}
