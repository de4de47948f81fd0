//! Line-oriented user actions for driving a selector.

use std::str::FromStr;

use super::{ProfileSelector, QuerySelection};
use crate::time_range::TimeSelection;
use crate::{Error, Result};

/// A single user interaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// `profile <name>`
    Profile(String),
    /// `matchers <text>` (text between the braces)
    Matchers(String),
    /// `time <key>`
    Time(TimeSelection),
    /// `range <from> <to>`
    Range { from: i64, to: i64 },
    /// `adjust <from> <to>`: range picked in the series view, emits at once
    Adjust { from: i64, to: i64 },
    /// `label <name> <value>`
    Label { name: String, value: String },
    Search,
    Merge,
    Compare,
    StopCompare,
    Status,
}

/// What applying an action did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// A new selection replaced the previous one.
    Emitted(QuerySelection),
    /// Local state changed without emitting.
    Updated,
    /// Nothing changed (disabled action or identical value).
    Unchanged,
}

fn parse_bound(s: Option<&str>, line: &str) -> Result<i64> {
    s.and_then(|v| v.parse().ok())
        .ok_or_else(|| Error::UnknownAction(line.to_string()))
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(line: &str) -> Result<Self> {
        let line = line.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        let action = match verb {
            "profile" => Action::Profile(rest.to_string()),
            "matchers" => Action::Matchers(rest.to_string()),
            "time" => Action::Time(rest.parse()?),
            "range" | "adjust" => {
                let mut parts = rest.split_whitespace();
                let from = parse_bound(parts.next(), line)?;
                let to = parse_bound(parts.next(), line)?;
                if parts.next().is_some() {
                    return Err(Error::UnknownAction(line.to_string()));
                }
                if verb == "range" {
                    Action::Range { from, to }
                } else {
                    Action::Adjust { from, to }
                }
            }
            "label" => match rest.split_once(char::is_whitespace) {
                Some((name, value)) => Action::Label {
                    name: name.to_string(),
                    value: value.trim().to_string(),
                },
                None => return Err(Error::UnknownAction(line.to_string())),
            },
            "search" if rest.is_empty() => Action::Search,
            "merge" if rest.is_empty() => Action::Merge,
            "compare" if rest.is_empty() => Action::Compare,
            "stop-compare" if rest.is_empty() => Action::StopCompare,
            "status" if rest.is_empty() => Action::Status,
            _ => return Err(Error::UnknownAction(line.to_string())),
        };
        Ok(action)
    }
}

impl ProfileSelector {
    /// Apply one action to this selector.
    pub fn apply(&mut self, action: Action) -> Result<Outcome> {
        let outcome = match action {
            Action::Profile(name) => {
                if self.set_profile_name(&name) {
                    Outcome::Updated
                } else {
                    Outcome::Unchanged
                }
            }
            Action::Matchers(text) => {
                let before = self.expression.clone();
                self.set_matchers_string(&text);
                if self.expression == before {
                    Outcome::Unchanged
                } else {
                    Outcome::Updated
                }
            }
            Action::Time(selection) => {
                if self.time_selection() == selection {
                    Outcome::Unchanged
                } else {
                    self.select_time(selection);
                    Outcome::Updated
                }
            }
            Action::Range { from, to } => {
                self.set_time_range(from, to)?;
                Outcome::Updated
            }
            Action::Adjust { from, to } => Outcome::Emitted(self.adjust_time_range(from, to)?),
            Action::Label { name, value } => self
                .add_label_matcher(&name, &value)
                .map_or(Outcome::Unchanged, Outcome::Emitted),
            Action::Search => self.search().map_or(Outcome::Unchanged, Outcome::Emitted),
            Action::Merge => self.merge().map_or(Outcome::Unchanged, Outcome::Emitted),
            Action::Compare => {
                if self.compare() {
                    Outcome::Updated
                } else {
                    Outcome::Unchanged
                }
            }
            Action::StopCompare => {
                if self.comparing() {
                    self.stop_comparing();
                    Outcome::Updated
                } else {
                    Outcome::Unchanged
                }
            }
            Action::Status => Outcome::Unchanged,
        };
        Ok(outcome)
    }
}
