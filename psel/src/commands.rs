//! CLI command implementations.

use std::io::{self, BufRead, Write};

use chrono::DateTime;
use serde::Serialize;

use selector::{
    Action, Config, Error, LabelValuesTracker, Outcome, ParseError, ProfileSelector, Query,
    QuerySelection, TimeRangeResolver, TimeSelection, PROFILE_NAME_LABEL,
};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MatcherOutput<'a> {
    label: &'a str,
    op: &'a str,
    value: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryOutput<'a> {
    expression: String,
    profile_name: &'a str,
    matchers: Vec<MatcherOutput<'a>>,
    search_disabled: bool,
}

impl<'a> QueryOutput<'a> {
    fn new(query: &'a Query) -> Self {
        let expression = query.to_string();
        Self {
            search_disabled: selector::search_disabled(&expression),
            expression,
            profile_name: query.profile_name(),
            matchers: query
                .matchers()
                .iter()
                .map(|m| MatcherOutput {
                    label: &m.label,
                    op: m.op.as_str(),
                    value: &m.value,
                })
                .collect(),
        }
    }
}

#[derive(Serialize)]
struct UpdateOutput {
    expression: String,
    changed: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RangeOutput {
    time_selection: TimeSelection,
    from: i64,
    to: i64,
    label: String,
}

/// Write default config, refusing to clobber an existing one unless forced.
pub fn init(force: bool) -> selector::Result<()> {
    let config = Config::default_location()?;
    if config.config_path().exists() && !force {
        println!("Config already exists at {}", config.config_path().display());
        return Ok(());
    }

    config.save()?;
    println!("Wrote {}", config.config_path().display());
    Ok(())
}

pub fn parse(expression: &str, strict: bool, format: &str) -> selector::Result<()> {
    let query = if strict {
        Query::try_parse(expression)?
    } else {
        Query::parse(expression)
    };

    match format {
        "json" => println!("{}", serde_json::to_string(&QueryOutput::new(&query))?),
        _ => {
            println!("expression: {}", query);
            println!("profile:    {}", display_or_dash(query.profile_name()));
            if query.matchers().is_empty() {
                println!("matchers:   -");
            } else {
                println!("matchers:");
                for m in query.matchers() {
                    println!("  {:<16} {:<2} {:?}", m.label, m.op.as_str(), m.value);
                }
            }
        }
    }
    Ok(())
}

pub fn set_profile(expression: &str, name: &str, format: &str) -> selector::Result<()> {
    let (query, changed) = Query::parse(expression).set_profile_name(name);
    print_update(&query, changed, format)
}

pub fn set_matcher(expression: &str, label: &str, value: &str, format: &str) -> selector::Result<()> {
    let (query, changed) = Query::parse(expression).set_matcher(label, value);
    print_update(&query, changed, format)
}

fn print_update(query: &Query, changed: bool, format: &str) -> selector::Result<()> {
    match format {
        "json" => {
            let out = UpdateOutput {
                expression: query.to_string(),
                changed,
            };
            println!("{}", serde_json::to_string(&out)?);
        }
        _ => {
            println!("{}", query);
            if !changed {
                eprintln!("psel: unchanged");
            }
        }
    }
    Ok(())
}

/// Parse a bound given as Unix milliseconds or an RFC 3339 timestamp.
fn parse_bound(s: &str) -> selector::Result<i64> {
    if let Ok(ms) = s.parse::<i64>() {
        return Ok(ms);
    }
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.timestamp_millis())
        .map_err(|e| Error::Parse(ParseError::new(0, format!("invalid timestamp '{}': {}", s, e))))
}

pub fn range(selection: Option<&str>, from: Option<&str>, to: Option<&str>, format: &str) -> selector::Result<()> {
    let config = Config::load()?;
    let mut resolver = TimeRangeResolver::new();

    match (from, to) {
        (Some(from), Some(to)) => {
            resolver.set_range(parse_bound(from)?, parse_bound(to)?)?;
        }
        _ => {
            let selection = match selection {
                Some(key) => key.parse::<TimeSelection>()?,
                None => config.time_selection()?,
            };
            resolver.select(selection);
        }
    }

    let resolved = resolver.resolve();
    let out = RangeOutput {
        time_selection: resolver.current(),
        from: resolved.from,
        to: resolved.to,
        label: resolver.label(&config.time_format),
    };

    match format {
        "json" => println!("{}", serde_json::to_string(&out)?),
        _ => {
            println!("selection: {} ({})", out.time_selection, out.label);
            println!("from:      {}", out.from);
            println!("to:        {}", out.to);
        }
    }
    Ok(())
}

pub fn presets() -> selector::Result<()> {
    for preset in TimeSelection::presets() {
        println!("{:<12} {}", preset.key(), preset.label());
    }
    Ok(())
}

pub fn profiles(format: &str) -> selector::Result<()> {
    let config = Config::load()?;
    let mut tracker = LabelValuesTracker::new();
    let result = tracker.fetch(&config.label_values(), PROFILE_NAME_LABEL);

    if let Some(err) = &result.error {
        eprintln!("psel: {}", err);
    }

    match format {
        "json" => println!("{}", serde_json::to_string(result.options())?),
        _ => {
            for name in result.options() {
                println!("{}", name);
            }
        }
    }
    Ok(())
}

/// Read actions from stdin and print every emitted selection as a JSON line.
///
/// Malformed actions are reported on stderr and the session continues.
pub fn session(enforce: Option<&str>, time: Option<&str>, resume: Option<&str>) -> selector::Result<()> {
    let config = Config::load()?;
    let enforced = enforce.unwrap_or(config.enforced_profile_name.as_str());
    tracing::debug!(root = %config.root.display(), enforced, "starting session");

    let mut selector = match resume {
        Some(json) => {
            let previous: QuerySelection = serde_json::from_str(json)?;
            ProfileSelector::from_selection(previous, enforced)
        }
        None => {
            let time = match time {
                Some(key) => key.parse::<TimeSelection>()?,
                None => config.time_selection()?,
            };
            ProfileSelector::new(enforced, time)
        }
    };

    let mut tracker = LabelValuesTracker::new();
    let source = config.label_values();

    let stdin = io::stdin();
    let mut stdout = io::stdout().lock();

    for line in stdin.lock().lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let action: Action = match trimmed.parse() {
            Ok(action) => action,
            Err(e) => {
                eprintln!("psel: {}", e);
                continue;
            }
        };

        if action == Action::Status {
            let result = tracker.fetch(&source, PROFILE_NAME_LABEL);
            print_status(&selector, result.options(), &config.time_format);
            continue;
        }

        match selector.apply(action) {
            Ok(Outcome::Emitted(selection)) => {
                writeln!(stdout, "{}", serde_json::to_string(&selection)?)?;
                stdout.flush()?;
            }
            Ok(Outcome::Updated) => {}
            Ok(Outcome::Unchanged) => eprintln!("psel: unchanged"),
            Err(e) => eprintln!("psel: {}", e),
        }
    }

    Ok(())
}

fn print_status(selector: &ProfileSelector, profiles: &[String], time_format: &str) {
    let enabled = |disabled: bool| if disabled { "disabled" } else { "enabled" };
    eprintln!("expression: {}", display_or_dash(selector.expression()));
    eprintln!("profile:    {}", display_or_dash(&selector.profile_name()));
    eprintln!(
        "time:       {} ({})",
        selector.time_selection(),
        selector.time_label(time_format)
    );
    eprintln!("search:     {}", enabled(selector.search_disabled()));
    eprintln!("merge:      {}", enabled(selector.merge_disabled()));
    eprintln!(
        "compare:    {}",
        if selector.compare_visible() { "available" } else { "hidden" }
    );
    eprintln!("comparing:  {}", selector.comparing());
    eprintln!("profiles:   {}", display_or_dash(&profiles.join(", ")));
}

fn display_or_dash(s: &str) -> &str {
    if s.is_empty() {
        "-"
    } else {
        s
    }
}
