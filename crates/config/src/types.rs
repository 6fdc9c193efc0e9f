//! Core configuration data types: units, modes, intervals and click plans.

use std::{fmt, slice, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::{
    Error,
    defaults::{DEFAULT_INTERVAL, DEFAULT_STEP_COUNT, DEFAULT_STEP_DELAY_MS, FALLBACK_STEP_COUNT},
};

/// Time unit the raw interval is expressed in.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum SpeedUnit {
    /// Milliseconds (`MS`).
    #[default]
    #[serde(rename = "MS")]
    Milliseconds,
    /// Microseconds (`MC`).
    #[serde(rename = "MC")]
    Microseconds,
    /// Nanoseconds (`NN`).
    #[serde(rename = "NN")]
    Nanoseconds,
}

impl SpeedUnit {
    /// Wire code used by the backend and the stored snapshot.
    pub fn code(self) -> &'static str {
        match self {
            Self::Milliseconds => "MS",
            Self::Microseconds => "MC",
            Self::Nanoseconds => "NN",
        }
    }

    /// Short human label.
    pub fn label(self) -> &'static str {
        match self {
            Self::Milliseconds => "ms",
            Self::Microseconds => "µs",
            Self::Nanoseconds => "ns",
        }
    }
}

impl fmt::Display for SpeedUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for SpeedUnit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "MS" => Ok(Self::Milliseconds),
            "MC" | "US" => Ok(Self::Microseconds),
            "NN" | "NS" => Ok(Self::Nanoseconds),
            _ => Err(Error::UnknownName {
                what: "speed mode",
                value: s.to_string(),
            }),
        }
    }
}

/// How clicks are triggered once a session is active.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum SessionMode {
    /// Each key signal runs the sequence once.
    #[default]
    Key,
    /// Each pointer signal runs the sequence once.
    Mouse,
    /// The sequence repeats until the session stops.
    Auto,
    /// Each explicit invocation runs the sequence once.
    Manual,
}

impl SessionMode {
    /// Wire code used by the backend and the stored snapshot.
    pub fn code(self) -> &'static str {
        match self {
            Self::Key => "KEY",
            Self::Mouse => "MOUSE",
            Self::Auto => "AUTO",
            Self::Manual => "MANUAL",
        }
    }

    /// True for modes where an external signal runs the sequence one-shot.
    pub fn is_triggered(self) -> bool {
        !matches!(self, Self::Auto)
    }
}

impl fmt::Display for SessionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for SessionMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "KEY" => Ok(Self::Key),
            "MOUSE" => Ok(Self::Mouse),
            "AUTO" => Ok(Self::Auto),
            "MANUAL" => Ok(Self::Manual),
            _ => Err(Error::UnknownName {
                what: "mode",
                value: s.to_string(),
            }),
        }
    }
}

/// Parse the leading integer of `s` the way a lenient form field does.
///
/// Leading whitespace and a single sign are accepted; parsing stops at the first
/// non-digit. Returns `None` when no digits are present.
pub(crate) fn parse_leading_int(s: &str) -> Option<i64> {
    let t = s.trim_start();
    let (neg, digits) = match t.as_bytes().first() {
        Some(b'-') => (true, &t[1..]),
        Some(b'+') => (false, &t[1..]),
        _ => (false, t),
    };
    let end = digits
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(digits.len());
    if end == 0 {
        return None;
    }
    let value = digits[..end].parse::<i64>().unwrap_or(i64::MAX);
    Some(if neg { -value } else { value })
}

/// A raw interval number together with its unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntervalSpec {
    /// User-entered interval in `unit`.
    pub raw: u64,
    /// Unit of `raw`.
    pub unit: SpeedUnit,
}

impl Default for IntervalSpec {
    fn default() -> Self {
        Self {
            raw: DEFAULT_INTERVAL,
            unit: SpeedUnit::Milliseconds,
        }
    }
}

impl IntervalSpec {
    /// Construct from parts.
    pub fn new(raw: u64, unit: SpeedUnit) -> Self {
        Self { raw, unit }
    }

    /// Interpret form text as a raw interval.
    ///
    /// Missing, non-numeric, zero and negative values fall back to
    /// [`DEFAULT_INTERVAL`].
    pub fn parse_raw(text: Option<&str>) -> u64 {
        text.and_then(parse_leading_int)
            .filter(|v| *v > 0)
            .map_or(DEFAULT_INTERVAL, |v| v as u64)
    }

    /// Build from form text and a unit.
    pub fn from_text(text: Option<&str>, unit: SpeedUnit) -> Self {
        Self::new(Self::parse_raw(text), unit)
    }
}

impl fmt::Display for IntervalSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.raw, self.unit.label())
    }
}

/// One step of a click plan: wait `delay_ms`, then fire `count` clicks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct DelayClickStep {
    /// Delay before the first click of the step.
    #[serde(rename = "delay")]
    delay_ms: u64,
    /// Number of clicks fired by the step (always at least 1).
    count: u32,
}

impl DelayClickStep {
    /// Create a step; a zero `count` is raised to 1.
    pub fn new(delay_ms: u64, count: u32) -> Self {
        Self {
            delay_ms,
            count: count.max(FALLBACK_STEP_COUNT),
        }
    }

    /// Create a step from loosely typed input, clamping out-of-range values.
    pub fn from_loose(delay: Option<i64>, count: Option<i64>) -> Self {
        let delay_ms = delay.unwrap_or(0).max(0) as u64;
        let count = count
            .filter(|c| *c > 0)
            .map_or(FALLBACK_STEP_COUNT, |c| u32::try_from(c).unwrap_or(u32::MAX));
        Self::new(delay_ms, count)
    }

    /// Delay before the first click, in milliseconds.
    pub fn delay_ms(&self) -> u64 {
        self.delay_ms
    }

    /// Number of clicks in this step.
    pub fn count(&self) -> u32 {
        self.count
    }
}

impl Default for DelayClickStep {
    fn default() -> Self {
        Self::new(DEFAULT_STEP_DELAY_MS, DEFAULT_STEP_COUNT)
    }
}

/// Ordered, never-empty list of [`DelayClickStep`]s.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct DelayClickSequence {
    /// Steps in execution order.
    steps: Vec<DelayClickStep>,
}

impl DelayClickSequence {
    /// Build a sequence; fails when `steps` is empty.
    pub fn new(steps: Vec<DelayClickStep>) -> Result<Self, Error> {
        if steps.is_empty() {
            return Err(Error::EmptySequence);
        }
        Ok(Self { steps })
    }

    /// Borrow the steps in execution order.
    pub fn steps(&self) -> &[DelayClickStep] {
        &self.steps
    }

    /// Number of steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// True when there are no steps (never, by construction).
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Step at `index`, if any.
    pub fn get(&self, index: usize) -> Option<&DelayClickStep> {
        self.steps.get(index)
    }

    /// Iterate over steps in order.
    pub fn iter(&self) -> slice::Iter<'_, DelayClickStep> {
        self.steps.iter()
    }

    /// Total clicks one pass over the sequence fires.
    pub fn total_clicks(&self) -> u64 {
        self.steps.iter().map(|s| u64::from(s.count())).sum()
    }

    /// Return a copy with a step appended.
    pub fn with_step(&self, delay_ms: u64, count: u32) -> Self {
        let mut steps = self.steps.clone();
        steps.push(DelayClickStep::new(delay_ms, count));
        Self { steps }
    }

    /// Return a copy with the step at `index` removed.
    ///
    /// The last remaining step can never be removed.
    pub fn without_step(&self, index: usize) -> Result<Self, Error> {
        if index >= self.steps.len() {
            return Err(Error::StepIndex {
                index,
                len: self.steps.len(),
            });
        }
        if self.steps.len() == 1 {
            return Err(Error::LastStep);
        }
        let mut steps = self.steps.clone();
        steps.remove(index);
        Ok(Self { steps })
    }
}

impl Default for DelayClickSequence {
    fn default() -> Self {
        Self {
            steps: vec![DelayClickStep::default()],
        }
    }
}

impl<'a> IntoIterator for &'a DelayClickSequence {
    type Item = &'a DelayClickStep;
    type IntoIter = slice::Iter<'a, DelayClickStep>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// The editable configuration form.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Configuration {
    /// Title of the target window; must be non-blank to start.
    pub window_title: String,
    /// Trigger mode.
    pub mode: SessionMode,
    /// Interval between clicks within a step.
    pub interval: IntervalSpec,
    /// Click plan.
    pub sequence: DelayClickSequence,
}
