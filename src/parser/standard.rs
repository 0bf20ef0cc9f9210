use std::borrow::Cow;

use async_trait::async_trait;
use uuid::Uuid;

use super::flag::looks_like_flag;
use super::{ArgumentParser, ParseResult, read_token};
use crate::context::CommandContext;
use crate::error::{ArgumentParseError, ParseErrorReason};
use crate::input::CommandInput;
use crate::suggestion::Suggestion;

/// How much input a [`StringParser`] consumes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StringMode {
    /// One token; quoted segments count as one token
    Single,
    /// Everything that remains
    Greedy,
    /// Everything up to the first flag token
    GreedyFlagYielding,
}

#[derive(Clone, Debug)]
pub struct StringParser {
    mode: StringMode,
}

impl StringParser {
    pub fn new(mode: StringMode) -> Self {
        Self { mode }
    }

    pub fn single() -> Self {
        Self::new(StringMode::Single)
    }

    pub fn greedy() -> Self {
        Self::new(StringMode::Greedy)
    }

    pub fn greedy_flag_yielding() -> Self {
        Self::new(StringMode::GreedyFlagYielding)
    }

    pub fn mode(&self) -> StringMode {
        self.mode
    }
}

impl<S: Send + Sync + 'static> ArgumentParser<S> for StringParser {
    type Output = String;

    fn name(&self) -> Cow<'static, str> {
        match self.mode {
            StringMode::Single => "string".into(),
            StringMode::Greedy => "greedy_string".into(),
            StringMode::GreedyFlagYielding => "greedy_flag_yielding_string".into(),
        }
    }

    fn parse(&self, _ctx: &mut CommandContext<S>, input: &mut CommandInput) -> ParseResult<String> {
        if input.is_blank() {
            return Err(ArgumentParseError::no_input(ArgumentParser::<S>::name(self)));
        }
        match self.mode {
            StringMode::Single => Ok(input.read_string()),
            StringMode::Greedy => Ok(input.read_input()),
            StringMode::GreedyFlagYielding => {
                let start = input.clone();
                while input.has_remaining_input() && !looks_like_flag(&input.peek_string()) {
                    input.read_string();
                }
                let text = input.difference(&start).to_string();
                if text.is_empty() {
                    return Err(ArgumentParseError::no_input(ArgumentParser::<S>::name(self)));
                }
                Ok(text)
            }
        }
    }

    fn is_greedy(&self) -> bool {
        self.mode != StringMode::Single
    }
}

/// Signed 64-bit integer within an inclusive range
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IntegerParser {
    min: i64,
    max: i64,
}

impl Default for IntegerParser {
    fn default() -> Self {
        Self::new()
    }
}

impl IntegerParser {
    pub fn new() -> Self {
        Self {
            min: i64::MIN,
            max: i64::MAX,
        }
    }

    pub fn range(min: i64, max: i64) -> Self {
        Self { min, max }
    }

    pub fn min(mut self, min: i64) -> Self {
        self.min = min;
        self
    }

    pub fn max(mut self, max: i64) -> Self {
        self.max = max;
        self
    }

    fn contains(&self, value: i64) -> bool {
        (self.min..=self.max).contains(&value)
    }
}

#[async_trait]
impl<S: Send + Sync + 'static> ArgumentParser<S> for IntegerParser {
    type Output = i64;

    fn name(&self) -> Cow<'static, str> {
        "integer".into()
    }

    fn parse(&self, _ctx: &mut CommandContext<S>, input: &mut CommandInput) -> ParseResult<i64> {
        let token = read_token("integer", input)?;
        let value: i64 = token.parse().map_err(|_| {
            ArgumentParseError::new("integer", token.clone(), ParseErrorReason::InvalidFormat)
        })?;
        if !self.contains(value) {
            return Err(ArgumentParseError::new("integer", token, ParseErrorReason::OutOfRange)
                .with_context("min", self.min)
                .with_context("max", self.max));
        }
        Ok(value)
    }

    async fn suggestions(&self, _ctx: &CommandContext<S>, input: &CommandInput) -> Vec<Suggestion> {
        number_suggestions(self.min, self.max, &input.peek_string())
    }
}

/// Numbers that extend the typed prefix by one digit, within range
fn number_suggestions(min: i64, max: i64, partial: &str) -> Vec<Suggestion> {
    let in_range = |v: i64| (min..=max).contains(&v);
    let mut values = Vec::new();

    if partial.is_empty() || partial == "-" {
        let negative = partial == "-";
        for digit in 0..=9i64 {
            let value = if negative { -digit } else { digit };
            if in_range(value) && !(negative && digit == 0) {
                values.push(value);
            }
        }
    } else if let Ok(value) = partial.parse::<i64>() {
        if in_range(value) {
            values.push(value);
        }
        let negative = partial.starts_with('-');
        for digit in 0..=9i64 {
            let next = value
                .checked_mul(10)
                .and_then(|v| if negative { v.checked_sub(digit) } else { v.checked_add(digit) });
            match next {
                Some(next) if in_range(next) && next != value => values.push(next),
                _ => {}
            }
        }
    }

    values
        .into_iter()
        .map(|v| Suggestion::simple(v.to_string()))
        .collect()
}

/// Finite 64-bit float within an inclusive range
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FloatParser {
    min: f64,
    max: f64,
}

impl Default for FloatParser {
    fn default() -> Self {
        Self::new()
    }
}

impl FloatParser {
    pub fn new() -> Self {
        Self {
            min: f64::MIN,
            max: f64::MAX,
        }
    }

    pub fn range(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

impl<S: Send + Sync + 'static> ArgumentParser<S> for FloatParser {
    type Output = f64;

    fn name(&self) -> Cow<'static, str> {
        "float".into()
    }

    fn parse(&self, _ctx: &mut CommandContext<S>, input: &mut CommandInput) -> ParseResult<f64> {
        let token = read_token("float", input)?;
        let value = match token.parse::<f64>() {
            Ok(value) if value.is_finite() => value,
            _ => return Err(ArgumentParseError::new("float", token, ParseErrorReason::InvalidFormat)),
        };
        if value < self.min || value > self.max {
            return Err(ArgumentParseError::new("float", token, ParseErrorReason::OutOfRange)
                .with_context("min", self.min)
                .with_context("max", self.max));
        }
        Ok(value)
    }
}

/// `true`/`false`, or additionally `yes/no/on/off` when liberal
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BooleanParser {
    liberal: bool,
}

const STRICT_TRUE: &[&str] = &["true"];
const STRICT_FALSE: &[&str] = &["false"];
const LIBERAL_TRUE: &[&str] = &["true", "yes", "on"];
const LIBERAL_FALSE: &[&str] = &["false", "no", "off"];

impl BooleanParser {
    pub fn new() -> Self {
        Self { liberal: false }
    }

    pub fn liberal() -> Self {
        Self { liberal: true }
    }

    fn words(&self) -> (&'static [&'static str], &'static [&'static str]) {
        if self.liberal {
            (LIBERAL_TRUE, LIBERAL_FALSE)
        } else {
            (STRICT_TRUE, STRICT_FALSE)
        }
    }
}

#[async_trait]
impl<S: Send + Sync + 'static> ArgumentParser<S> for BooleanParser {
    type Output = bool;

    fn name(&self) -> Cow<'static, str> {
        "boolean".into()
    }

    fn parse(&self, _ctx: &mut CommandContext<S>, input: &mut CommandInput) -> ParseResult<bool> {
        let token = read_token("boolean", input)?;
        let lower = token.to_lowercase();
        let (truthy, falsy) = self.words();
        if truthy.contains(&lower.as_str()) {
            Ok(true)
        } else if falsy.contains(&lower.as_str()) {
            Ok(false)
        } else {
            Err(ArgumentParseError::new("boolean", token, ParseErrorReason::InvalidFormat)
                .with_context("liberal", self.liberal))
        }
    }

    async fn suggestions(&self, _ctx: &CommandContext<S>, _input: &CommandInput) -> Vec<Suggestion> {
        let (truthy, falsy) = self.words();
        truthy
            .iter()
            .chain(falsy.iter())
            .map(|w| Suggestion::simple(*w))
            .collect()
    }
}

/// Hyphenated UUID
#[derive(Clone, Copy, Debug, Default)]
pub struct UuidParser;

impl<S: Send + Sync + 'static> ArgumentParser<S> for UuidParser {
    type Output = Uuid;

    fn name(&self) -> Cow<'static, str> {
        "uuid".into()
    }

    fn parse(&self, _ctx: &mut CommandContext<S>, input: &mut CommandInput) -> ParseResult<Uuid> {
        let token = read_token("uuid", input)?;
        Uuid::parse_str(&token)
            .map_err(|_| ArgumentParseError::new("uuid", token, ParseErrorReason::InvalidFormat))
    }
}
