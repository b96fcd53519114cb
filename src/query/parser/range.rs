//! Range Expression Parser
//!
//! Parses the versioned text form of an inclusive time interval together with
//! the timezone it has to be interpreted in.
//!
//! # Grammar
//!
//! ```text
//! range    := openb min "," max closeb "@" timezone
//! openb    := "[" | "("        ; inclusive | exclusive lower bound
//! closeb   := "]" | ")"        ; inclusive | exclusive upper bound
//! min, max := "YYYY-MM-DD HH:MM:SS"
//! timezone := rest of the input, an IANA zone name
//! ```
//!
//! Whitespace around every token is ignored. This format is part of the
//! public wire contract and must stay backward compatible; a different grammar
//! needs a new version namespace.
//!
//! # Example
//!
//! ```rust
//! use kuba_dsl::query::parser::parse_range;
//!
//! let parsed = parse_range("(2020-11-13 14:15:00,2020-11-13 14:20:00]@Europe/Berlin").unwrap();
//! assert_eq!(parsed.interval.min, 1605273301);
//! assert_eq!(parsed.interval.max, 1605273600);
//! ```

use chrono::NaiveDateTime;
use chrono_tz::Tz;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use tracing::debug;

use crate::error::{Error, Result};
use crate::time::zone::{local_to_instant, parse_timezone};
use crate::types::Interval;

/// Fixed layout of the `min` and `max` literals
pub const DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Scanner state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Before the opening bracket
    Start,
    /// Inside the lower bound literal
    Min,
    /// Inside the upper bound literal
    Max,
    /// After the closing bracket, waiting for '@'
    TimeZone,
    /// '@' consumed, the rest is the zone name
    Done,
}

/// Input classes the transition table is keyed on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Class {
    OpenInclusive,
    OpenExclusive,
    Comma,
    CloseInclusive,
    CloseExclusive,
    At,
    Whitespace,
    Other,
}

impl Class {
    fn of(ch: char) -> Self {
        match ch {
            '[' => Class::OpenInclusive,
            '(' => Class::OpenExclusive,
            ',' => Class::Comma,
            ']' => Class::CloseInclusive,
            ')' => Class::CloseExclusive,
            '@' => Class::At,
            c if c.is_whitespace() => Class::Whitespace,
            _ => Class::Other,
        }
    }
}

/// Side effect of a transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    /// Stay in the current state; the character belongs to the current literal
    Consume,
    /// Lower bound opened, inclusive or not
    Open { inclusive: bool },
    /// Lower bound literal finished
    EndMin,
    /// Upper bound literal finished, inclusive or not
    Close { inclusive: bool },
    /// Zone name starts after this character
    BeginZone,
}

/// Transition table
///
/// Returns `None` when `class` is not acceptable in `state`.
fn transition(state: State, class: Class) -> Option<(State, Action)> {
    use Class::*;

    match (state, class) {
        (State::Start, Whitespace) => Some((State::Start, Action::Consume)),
        (State::Start, OpenInclusive) => Some((State::Min, Action::Open { inclusive: true })),
        (State::Start, OpenExclusive) => Some((State::Min, Action::Open { inclusive: false })),

        (State::Min, Whitespace | Other) => Some((State::Min, Action::Consume)),
        (State::Min, Comma) => Some((State::Max, Action::EndMin)),

        (State::Max, Whitespace | Other) => Some((State::Max, Action::Consume)),
        (State::Max, CloseInclusive) => Some((State::TimeZone, Action::Close { inclusive: true })),
        (State::Max, CloseExclusive) => {
            Some((State::TimeZone, Action::Close { inclusive: false }))
        }

        (State::TimeZone, Whitespace) => Some((State::TimeZone, Action::Consume)),
        (State::TimeZone, At) => Some((State::Done, Action::BeginZone)),

        _ => None,
    }
}

/// Raw tokens found by the scanner
#[derive(Debug, Default, PartialEq, Eq)]
struct Tokens<'a> {
    min: &'a str,
    max: &'a str,
    timezone: &'a str,
    min_inclusive: bool,
    max_inclusive: bool,
}

/// Run the state machine over `input`
fn scan(input: &str) -> Result<Tokens<'_>> {
    let mut state = State::Start;
    let mut tokens = Tokens::default();
    // Byte offset where the current literal starts
    let mut offset = 0;

    for (pos, ch) in input.char_indices() {
        let (next, action) =
            transition(state, Class::of(ch)).ok_or_else(|| Error::unexpected_char(ch, pos))?;

        match action {
            Action::Consume => {}
            Action::Open { inclusive } => {
                tokens.min_inclusive = inclusive;
                offset = pos + ch.len_utf8();
            }
            Action::EndMin => {
                tokens.min = input[offset..pos].trim();
                offset = pos + ch.len_utf8();
            }
            Action::Close { inclusive } => {
                tokens.max = input[offset..pos].trim();
                tokens.max_inclusive = inclusive;
            }
            Action::BeginZone => {
                tokens.timezone = input[pos + ch.len_utf8()..].trim();
            }
        }

        state = next;
        if state == State::Done {
            break;
        }
    }

    if state != State::Done || tokens.timezone.is_empty() {
        return Err(Error::Format(
            "timezone required: expected '@' followed by an IANA zone name".to_string(),
        ));
    }

    Ok(tokens)
}

/// Byte layout of a bound: `d` is an ASCII digit, anything else is literal
const DATE_TIME_LAYOUT: &[u8; 19] = b"dddd-dd-dd dd:dd:dd";

/// Check a bound against the fixed layout
///
/// chrono alone also accepts unpadded fields, a signed year and second 60.
fn matches_layout(literal: &str) -> bool {
    let bytes = literal.as_bytes();
    bytes.len() == DATE_TIME_LAYOUT.len()
        && bytes
            .iter()
            .zip(DATE_TIME_LAYOUT.iter())
            .all(|(&b, &l)| if l == b'd' { b.is_ascii_digit() } else { b == l })
        && bytes[17] <= b'5'
}

fn parse_local(literal: &str, tz: Tz) -> Result<i64> {
    if !matches_layout(literal) {
        return Err(Error::InvalidDateTime(format!(
            "'{}' does not match 'YYYY-MM-DD HH:MM:SS'",
            literal
        )));
    }

    let local = NaiveDateTime::parse_from_str(literal, DATE_TIME_FORMAT).map_err(|e| {
        Error::InvalidDateTime(format!(
            "'{}' does not match 'YYYY-MM-DD HH:MM:SS': {}",
            literal, e
        ))
    })?;
    local_to_instant(tz, local)
}

/// Result of parsing a range expression
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedRange {
    /// Inclusive interval in unix seconds
    pub interval: Interval,
    /// Zone the bounds were interpreted in
    pub timezone: Tz,
}

/// Parse a range expression into an inclusive interval and its timezone
///
/// Exclusive bounds are converted to inclusive ones by moving them one second
/// inwards.
///
/// # Errors
///
/// - `Format` for unexpected characters (with their byte position) or a
///   missing timezone
/// - `InvalidTimezone` if the zone name does not resolve
/// - `InvalidDateTime` if a bound does not match the layout or does not exist
///   in the zone
pub fn parse_range(input: &str) -> Result<ParsedRange> {
    let tokens = scan(input)?;
    let timezone = parse_timezone(tokens.timezone)?;

    let mut min = parse_local(tokens.min, timezone)?;
    let mut max = parse_local(tokens.max, timezone)?;

    if !tokens.min_inclusive {
        min += 1;
    }
    if !tokens.max_inclusive {
        max -= 1;
    }

    debug!(input, min, max, timezone = %timezone, "Parsed range expression");

    Ok(ParsedRange {
        interval: Interval::new(min, max),
        timezone,
    })
}

/// A range expression as text, validated on construction
///
/// Invalid expressions are rejected when deserializing, so a value of this
/// type always parses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct RangeExpr(String);

impl RangeExpr {
    /// Validate and wrap an expression
    pub fn new(expr: impl Into<String>) -> Result<Self> {
        let expr = expr.into();
        parse_range(&expr)?;
        Ok(Self(expr))
    }

    /// Build the canonical inclusive expression for an interval
    pub fn from_interval(interval: Interval, tz: Tz) -> Result<Self> {
        let render = |ts: i64| -> Result<String> {
            chrono::DateTime::from_timestamp(ts, 0)
                .map(|dt| dt.with_timezone(&tz).format(DATE_TIME_FORMAT).to_string())
                .ok_or_else(|| {
                    Error::InvalidArgument(format!("timestamp {} is out of range", ts))
                })
        };
        Ok(Self(format!(
            "[{},{}]@{}",
            render(interval.min)?,
            render(interval.max)?,
            tz.name()
        )))
    }

    /// Parse into interval and timezone
    pub fn parse(&self) -> Result<ParsedRange> {
        parse_range(&self.0)
    }

    /// Parse into the inclusive interval
    pub fn interval(&self) -> Result<Interval> {
        Ok(self.parse()?.interval)
    }

    /// The expression text
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RangeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for RangeExpr {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl<'de> Deserialize<'de> for RangeExpr {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let expr = String::deserialize(deserializer)?;
        RangeExpr::new(expr.as_str())
            .map_err(|e| serde::de::Error::custom(format!("invalid range '{}': {}", expr, e)))
    }
}
