//! Profile selection state and query emission.
//!
//! A [`ProfileSelector`] owns the editable query expression, the time range
//! state, and the last emitted [`QuerySelection`]. Every emission builds a
//! fresh selection from the current state and replaces the previous one.

mod action;

pub use action::{Action, Outcome};

use serde::{Deserialize, Serialize};

use crate::query::Query;
use crate::time_range::{TimeRange, TimeRangeResolver, TimeSelection};
use crate::Result;

/// Snapshot of user intent handed to the data fetching layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuerySelection {
    pub expression: String,
    pub from: i64,
    pub to: i64,
    pub merge: bool,
    pub time_selection: TimeSelection,
}

impl QuerySelection {
    /// A selection with no expression, bounded by `range`.
    pub fn empty(time_selection: TimeSelection, range: TimeRange) -> Self {
        Self {
            expression: String::new(),
            from: range.from,
            to: range.to,
            merge: false,
            time_selection,
        }
    }

    pub const fn range(&self) -> TimeRange {
        TimeRange {
            from: self.from,
            to: self.to,
        }
    }
}

/// Whether an expression is too empty to search with.
pub fn search_disabled(expression: &str) -> bool {
    let expression = expression.trim();
    expression.is_empty() || expression == "{}"
}

#[derive(Debug, Clone)]
pub struct ProfileSelector {
    selection: QuerySelection,
    expression: String,
    enforced_profile_name: String,
    resolver: TimeRangeResolver,
    comparing: bool,
}

impl ProfileSelector {
    /// Start with an empty selection resolved from `default_time`.
    pub fn new(enforced_profile_name: &str, default_time: TimeSelection) -> Self {
        let mut resolver = TimeRangeResolver::new();
        resolver.select(default_time);
        let selection = QuerySelection::empty(default_time, resolver.resolve());
        resolver.remember(default_time, selection.range());
        tracing::debug!(time_selection = %default_time, "created empty selection");

        let mut selector = Self {
            expression: String::new(),
            selection,
            enforced_profile_name: enforced_profile_name.to_string(),
            resolver,
            comparing: false,
        };
        selector.sync_expression();
        selector
    }

    /// Resume from a previously emitted selection.
    pub fn from_selection(selection: QuerySelection, enforced_profile_name: &str) -> Self {
        let resolver = TimeRangeResolver::inherit(selection.time_selection, selection.range());
        let mut selector = Self {
            expression: String::new(),
            selection,
            enforced_profile_name: enforced_profile_name.to_string(),
            resolver,
            comparing: false,
        };
        selector.sync_expression();
        selector
    }

    /// Re-derive the editable expression from the emitted selection, pinning
    /// the enforced profile name if there is one.
    fn sync_expression(&mut self) {
        if !self.enforced_profile_name.is_empty() {
            let (query, changed) =
                Query::parse(&self.selection.expression).set_profile_name(&self.enforced_profile_name);
            if changed {
                self.expression = query.to_string();
                return;
            }
        }
        self.expression = self.selection.expression.clone();
    }

    /// The last emitted selection.
    pub fn selection(&self) -> &QuerySelection {
        &self.selection
    }

    /// The expression as currently edited (not yet emitted).
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// The effective query, with the enforced profile name applied.
    pub fn query(&self) -> Query {
        let query = Query::parse(&self.expression);
        if self.enforced_profile_name.is_empty() {
            return query;
        }
        query.set_profile_name(&self.enforced_profile_name).0
    }

    pub fn profile_name(&self) -> String {
        self.query().profile_name().to_string()
    }

    pub fn time_selection(&self) -> TimeSelection {
        self.resolver.current()
    }

    pub fn time_label(&self, format: &str) -> String {
        self.resolver.label(format)
    }

    pub const fn comparing(&self) -> bool {
        self.comparing
    }

    pub fn search_disabled(&self) -> bool {
        search_disabled(&self.expression)
    }

    /// Merging needs a profile type and an executed query.
    pub fn merge_disabled(&self) -> bool {
        self.profile_name().is_empty() || self.selection.expression.is_empty()
    }

    pub fn compare_disabled(&self) -> bool {
        self.merge_disabled()
    }

    /// Compare is hidden while comparing.
    pub fn compare_visible(&self) -> bool {
        !self.comparing && !self.compare_disabled()
    }

    /// Replace the profile type. Returns whether the expression changed.
    pub fn set_profile_name(&mut self, name: &str) -> bool {
        let (query, changed) = self.query().set_profile_name(name);
        if changed {
            self.expression = query.to_string();
        }
        changed
    }

    /// Replace the matcher text between the braces.
    pub fn set_matchers_string(&mut self, matchers: &str) {
        self.expression = format!("{}{{{}}}", self.profile_name(), matchers);
    }

    pub fn select_time(&mut self, selection: TimeSelection) {
        self.resolver.select(selection);
    }

    /// Store explicit bounds; the selector switches to `custom`.
    pub fn set_time_range(&mut self, from: i64, to: i64) -> Result<()> {
        self.resolver.set_range(from, to)?;
        Ok(())
    }

    /// Bounds picked in the series view: store them and emit right away.
    pub fn adjust_time_range(&mut self, from: i64, to: i64) -> Result<QuerySelection> {
        self.resolver.set_range(from, to)?;
        let expression = self.expression.clone();
        Ok(self.emit(expression, false))
    }

    /// Add an equality matcher and emit if the query changed.
    pub fn add_label_matcher(&mut self, label: &str, value: &str) -> Option<QuerySelection> {
        let (query, changed) = Query::parse(&self.expression).set_matcher(label, value);
        if !changed {
            return None;
        }
        let expression = query.to_string();
        self.expression = expression.clone();
        Some(self.emit(expression, false))
    }

    /// Emit the current query, unless searching is disabled.
    pub fn search(&mut self) -> Option<QuerySelection> {
        if self.search_disabled() {
            tracing::debug!(expression = %self.expression, "search disabled");
            return None;
        }
        let expression = self.query().to_string();
        Some(self.emit(expression, false))
    }

    /// Emit the current query as a merge, unless merging is disabled.
    pub fn merge(&mut self) -> Option<QuerySelection> {
        if self.merge_disabled() {
            tracing::debug!("merge disabled");
            return None;
        }
        let expression = self.query().to_string();
        Some(self.emit(expression, true))
    }

    /// Enter comparison mode. Returns false when compare is unavailable.
    pub fn compare(&mut self) -> bool {
        if !self.compare_visible() {
            return false;
        }
        self.comparing = true;
        true
    }

    pub fn stop_comparing(&mut self) {
        self.comparing = false;
    }

    /// Build a new selection from the current state and replace the old one.
    ///
    /// Bounds are resolved now, not taken from an earlier read.
    fn emit(&mut self, expression: String, merge: bool) -> QuerySelection {
        let time_selection = self.resolver.current();
        let range = self.resolver.resolve();
        let selection = QuerySelection {
            expression,
            from: range.from,
            to: range.to,
            merge,
            time_selection,
        };
        tracing::debug!(
            expression = %selection.expression,
            from = selection.from,
            to = selection.to,
            merge,
            time_selection = %time_selection,
            "emitting query selection"
        );
        self.resolver.remember(time_selection, range);
        self.selection = selection.clone();
        self.sync_expression();
        selection
    }
}
