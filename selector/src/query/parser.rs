//! Query parser and serializer for profile query expressions.

use std::fmt;
use std::str::FromStr;

use crate::error::ParseError;

/// A parsed query: a profile type plus label matchers.
///
/// Matchers keep source order, so formatting a parsed query is
/// deterministic. A label appears at most once; a later matcher for the same
/// label replaces the earlier one in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    profile_name: String,
    matchers: Vec<Matcher>,
}

/// A single label constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Matcher {
    /// Label name
    pub label: String,
    /// Match operator
    pub op: MatchOp,
    /// Value (unquoted)
    pub value: String,
}

/// Matcher operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchOp {
    /// `=` equals
    Eq,
    /// `!=` not equals
    NotEq,
    /// `=~` regex match
    RegexMatch,
    /// `!~` regex does not match
    RegexNoMatch,
}

impl MatchOp {
    pub const fn as_str(&self) -> &'static str {
        match self {
            MatchOp::Eq => "=",
            MatchOp::NotEq => "!=",
            MatchOp::RegexMatch => "=~",
            MatchOp::RegexNoMatch => "!~",
        }
    }

    /// Match an operator at the start of `input`, returning it and its length.
    fn strip(input: &str) -> Option<(Self, usize)> {
        // Two-char operators first
        if input.starts_with("!=") {
            Some((MatchOp::NotEq, 2))
        } else if input.starts_with("!~") {
            Some((MatchOp::RegexNoMatch, 2))
        } else if input.starts_with("=~") {
            Some((MatchOp::RegexMatch, 2))
        } else if input.starts_with('=') {
            Some((MatchOp::Eq, 1))
        } else {
            None
        }
    }
}

impl FromStr for MatchOp {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match MatchOp::strip(s) {
            Some((op, len)) if len == s.len() => Ok(op),
            _ => Err(ParseError::new(0, format!("unknown operator '{}'", s))),
        }
    }
}

impl Matcher {
    pub fn new(label: impl Into<String>, op: MatchOp, value: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            op,
            value: value.into(),
        }
    }
}

impl Query {
    /// Build a query from a profile name and matchers.
    pub fn new(profile_name: impl Into<String>, matchers: impl IntoIterator<Item = Matcher>) -> Self {
        let mut query = Self {
            profile_name: profile_name.into(),
            matchers: Vec::new(),
        };
        for matcher in matchers {
            query.upsert(matcher);
        }
        query
    }

    /// Parse an expression, degrading gracefully on malformed input.
    ///
    /// Malformed expressions yield a query with no profile name and whatever
    /// well-formed matchers can be recovered, so partially typed input stays
    /// usable.
    pub fn parse(input: &str) -> Self {
        match Self::try_parse(input) {
            Ok(query) => query,
            Err(err) => {
                let query = Self::new("", recover_matchers(input));
                tracing::debug!(
                    expression = input,
                    error = %err,
                    recovered = query.matchers.len(),
                    "malformed query expression"
                );
                query
            }
        }
    }

    /// Parse an expression, failing on the first syntax error.
    pub fn try_parse(input: &str) -> Result<Self, ParseError> {
        let mut cursor = Cursor::new(input);
        cursor.skip_whitespace();

        if cursor.at_end() {
            return Ok(Self::default());
        }

        let profile_name = cursor.take_profile_name()?;
        let mut query = Self {
            profile_name: profile_name.to_string(),
            matchers: Vec::new(),
        };

        cursor.skip_whitespace();
        if cursor.at_end() {
            // Bare profile name
            return Ok(query);
        }

        cursor.expect('{')?;
        loop {
            cursor.skip_whitespace();
            if cursor.eat('}') {
                break;
            }
            let matcher = cursor.take_matcher()?;
            query.upsert(matcher);

            cursor.skip_whitespace();
            if cursor.eat(',') {
                continue;
            }
            if cursor.eat('}') {
                break;
            }
            return Err(cursor.error("expected ',' or '}'"));
        }

        cursor.skip_whitespace();
        if !cursor.at_end() {
            return Err(cursor.error("unexpected trailing input"));
        }

        Ok(query)
    }

    /// The selected profile type, empty when unset.
    pub fn profile_name(&self) -> &str {
        &self.profile_name
    }

    pub fn matchers(&self) -> &[Matcher] {
        &self.matchers
    }

    /// Look up the matcher for a label.
    pub fn matcher(&self, label: &str) -> Option<&Matcher> {
        self.matchers.iter().find(|m| m.label == label)
    }

    /// Check if this query selects nothing (no profile name, no matchers).
    pub fn is_empty(&self) -> bool {
        self.profile_name.is_empty() && self.matchers.is_empty()
    }

    /// Return a copy with the profile name replaced.
    ///
    /// The flag is false when the name was already set to `name`, or when
    /// `name` contains characters a profile name cannot hold. An empty name
    /// clears the profile.
    pub fn set_profile_name(&self, name: &str) -> (Self, bool) {
        if self.profile_name == name {
            return (self.clone(), false);
        }
        if !name.chars().all(is_profile_name_char) {
            tracing::debug!(name, "rejected invalid profile name");
            return (self.clone(), false);
        }
        let mut query = self.clone();
        query.profile_name = name.to_string();
        (query, true)
    }

    /// Return a copy with an equality matcher for `label` inserted or replaced.
    ///
    /// The flag is false when the formatted expression did not change. A
    /// label that is not a valid label name leaves the query untouched.
    pub fn set_matcher(&self, label: &str, value: &str) -> (Self, bool) {
        if !is_label_name(label) {
            tracing::debug!(label, "rejected invalid label name");
            return (self.clone(), false);
        }
        let mut query = self.clone();
        query.upsert(Matcher::new(label, MatchOp::Eq, value));
        let changed = query.to_string() != self.to_string();
        (query, changed)
    }

    fn upsert(&mut self, matcher: Matcher) {
        match self.matchers.iter_mut().find(|m| m.label == matcher.label) {
            Some(existing) => *existing = matcher,
            None => self.matchers.push(matcher),
        }
    }
}

impl FromStr for Query {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_parse(s)
    }
}

impl fmt::Display for MatchOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for Matcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}\"", self.label, self.op)?;
        for c in self.value.chars() {
            match c {
                '"' => f.write_str("\\\"")?,
                '\\' => f.write_str("\\\\")?,
                '\n' => f.write_str("\\n")?,
                '\t' => f.write_str("\\t")?,
                c => write!(f, "{}", c)?,
            }
        }
        f.write_str("\"")
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{{", self.profile_name)?;
        for (i, matcher) in self.matchers.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", matcher)?;
        }
        f.write_str("}")
    }
}

/// Scan malformed input for any matchers that still parse on their own.
fn recover_matchers(input: &str) -> Vec<Matcher> {
    let start = input.find('{').map(|i| i + 1).unwrap_or(0);
    let mut cursor = Cursor::new(input);
    cursor.pos = start;

    let mut matchers = Vec::new();
    while !cursor.at_end() {
        let mut attempt = cursor.clone();
        if let Ok(matcher) = attempt.take_matcher() {
            matchers.push(matcher);
            cursor = attempt;
            continue;
        }
        cursor.skip_token();
    }
    matchers
}

fn is_label_name(s: &str) -> bool {
    let mut chars = s.chars();
    chars.next().is_some_and(is_label_start) && chars.all(is_label_char)
}

fn is_label_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_label_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_profile_name_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | ':' | '.' | '-')
}

#[derive(Clone)]
struct Cursor<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.pos += expected.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), ParseError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", expected)))
        }
    }

    fn error(&self, message: impl Into<String>) -> ParseError {
        ParseError::new(self.pos, message)
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(&pred) {
            self.bump();
        }
        &self.input[start..self.pos]
    }

    fn take_profile_name(&mut self) -> Result<&'a str, ParseError> {
        let name = self.take_while(is_profile_name_char);
        match self.peek() {
            None | Some('{') => Ok(name),
            Some(c) if c.is_whitespace() => Ok(name),
            Some(c) => Err(self.error(format!("unexpected character '{}' in profile name", c))),
        }
    }

    fn take_matcher(&mut self) -> Result<Matcher, ParseError> {
        self.skip_whitespace();
        if !self.peek().is_some_and(is_label_start) {
            return Err(self.error("expected label name"));
        }
        let label = self.take_while(is_label_char);

        self.skip_whitespace();
        let (op, len) = MatchOp::strip(self.rest()).ok_or_else(|| self.error("expected operator"))?;
        self.pos += len;

        self.skip_whitespace();
        let value = self.take_quoted()?;

        Ok(Matcher::new(label, op, value))
    }

    fn take_quoted(&mut self) -> Result<String, ParseError> {
        let start = self.pos;
        self.expect('"')?;
        let mut value = String::new();
        loop {
            match self.bump() {
                None => return Err(ParseError::new(start, "unterminated string")),
                Some('"') => return Ok(value),
                Some('\\') => match self.bump() {
                    Some('n') => value.push('\n'),
                    Some('t') => value.push('\t'),
                    Some(c) => value.push(c),
                    None => return Err(ParseError::new(start, "unterminated string")),
                },
                Some(c) => value.push(c),
            }
        }
    }

    /// Skip one recovery unit: a label-like word, a quoted string, or a char.
    fn skip_token(&mut self) {
        match self.peek() {
            Some(c) if is_label_char(c) => {
                self.take_while(is_label_char);
            }
            Some('"') => {
                if self.take_quoted().is_err() {
                    self.pos = self.input.len();
                }
            }
            Some(_) => {
                self.bump();
            }
            None => {}
        }
    }
}
