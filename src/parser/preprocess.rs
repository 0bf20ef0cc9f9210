use std::sync::Arc;

use async_trait::async_trait;
use regex::Regex;

use crate::context::CommandContext;
use crate::error::{ArgumentParseError, ParseErrorReason};
use crate::input::CommandInput;
use crate::parser::ParseResult;

/// Check run on the input of an argument before its parser sees it. A
/// rejection is reported as the argument's parse failure.
#[async_trait]
pub trait ComponentPreprocessor<S>: Send + Sync {
    async fn preprocess(&self, ctx: &CommandContext<S>, input: &CommandInput) -> ParseResult<()>;
}

/// Preprocessor backed by a plain function
pub struct BlockingPreprocessor<F>(pub F);

#[async_trait]
impl<S, F> ComponentPreprocessor<S> for BlockingPreprocessor<F>
where
    S: Send + Sync + 'static,
    F: Fn(&CommandContext<S>, &CommandInput) -> ParseResult<()> + Send + Sync,
{
    async fn preprocess(&self, ctx: &CommandContext<S>, input: &CommandInput) -> ParseResult<()> {
        (self.0)(ctx, input)
    }
}

/// Build a component preprocessor from a closure
pub fn component_preprocessor<S, F>(f: F) -> Arc<dyn ComponentPreprocessor<S>>
where
    S: Send + Sync + 'static,
    F: Fn(&CommandContext<S>, &CommandInput) -> ParseResult<()> + Send + Sync + 'static,
{
    Arc::new(BlockingPreprocessor(f))
}

/// Rejects the next token unless it matches a pattern.
///
/// Blank input passes through so the parser can report the missing value.
#[derive(Clone, Debug)]
pub struct RegexPreprocessor {
    pattern: Regex,
}

impl RegexPreprocessor {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self::from_regex(Regex::new(pattern)?))
    }

    pub fn from_regex(pattern: Regex) -> Self {
        Self { pattern }
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }
}

#[async_trait]
impl<S: Send + Sync + 'static> ComponentPreprocessor<S> for RegexPreprocessor {
    async fn preprocess(&self, _ctx: &CommandContext<S>, input: &CommandInput) -> ParseResult<()> {
        if input.is_blank() {
            return Ok(());
        }
        let token = input.peek_string();
        if self.pattern.is_match(&token) {
            Ok(())
        } else {
            Err(ArgumentParseError::new("regex", token, ParseErrorReason::PatternMismatch)
                .with_context("pattern", self.pattern.as_str()))
        }
    }
}
