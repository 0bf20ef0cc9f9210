//! Argument parser contract and the parsers built on it.
//!
//! An [`ArgumentParser`] turns a prefix of the remaining [`CommandInput`] into
//! a typed value. Synchronous parsers implement [`ArgumentParser::parse`];
//! parsers that must wait on I/O override [`ArgumentParser::parse_async`]
//! instead. The router only ever awaits `parse_async`, whose default wraps
//! `parse` in an already resolved future, so both kinds are routed the same
//! way.

use std::borrow::Cow;
use std::sync::Arc;

use async_trait::async_trait;

use crate::context::{ArgumentValue, CommandContext};
use crate::error::{ArgumentParseError, ParseErrorReason};
use crate::input::CommandInput;
use crate::suggestion::Suggestion;

pub mod aggregate;
pub mod combinators;
pub mod enum_parser;
pub mod flag;
pub mod preprocess;
pub mod registry;
pub mod standard;

pub use aggregate::{AggregateBuilder, AggregateParser};
pub use combinators::{ArgumentParserExt, Either, EitherParser, FirstOf, FlatMapParser, MappedParser};
pub use enum_parser::{CommandEnum, EnumParser};
pub use flag::{CommandFlag, FlagParser};
pub use preprocess::{BlockingPreprocessor, ComponentPreprocessor, RegexPreprocessor, component_preprocessor};
pub use registry::ParserRegistry;
pub use standard::{BooleanParser, FloatParser, IntegerParser, StringMode, StringParser, UuidParser};

/// Result of a single parse attempt
pub type ParseResult<T> = Result<T, ArgumentParseError>;

/// Type-erased parser as stored in the command tree
pub type DynParser<S> = Arc<dyn ErasedParser<S>>;

/// Converts command input into a typed value
#[async_trait]
pub trait ArgumentParser<S: Send + Sync + 'static>: Send + Sync + 'static {
    type Output: Send + Sync + 'static;

    /// Parser identity reported in failures
    fn name(&self) -> Cow<'static, str>;

    /// Synchronous parse; must not block
    fn parse(
        &self,
        _ctx: &mut CommandContext<S>,
        _input: &mut CommandInput,
    ) -> ParseResult<Self::Output> {
        Err(ArgumentParseError::new(self.name(), "", ParseErrorReason::AsyncOnly))
    }

    /// Future-returning parse, resolving immediately for synchronous parsers
    async fn parse_async(
        &self,
        ctx: &mut CommandContext<S>,
        input: &mut CommandInput,
    ) -> ParseResult<Self::Output> {
        self.parse(ctx, input)
    }

    /// Completions for the input at the cursor. Independent of `parse`, but
    /// anything `parse` accepts should appear as (or extend) a suggestion.
    async fn suggestions(&self, _ctx: &CommandContext<S>, _input: &CommandInput) -> Vec<Suggestion> {
        Vec::new()
    }

    /// True when the parser consumes the rest of the input
    fn is_greedy(&self) -> bool {
        false
    }
}

/// Object-safe view of an [`ArgumentParser`] producing [`ArgumentValue`]s
#[async_trait]
pub trait ErasedParser<S>: Send + Sync {
    fn parser_name(&self) -> Cow<'static, str>;

    fn consumes_rest(&self) -> bool;

    async fn parse_value(
        &self,
        ctx: &mut CommandContext<S>,
        input: &mut CommandInput,
    ) -> ParseResult<ArgumentValue>;

    async fn suggest(&self, ctx: &CommandContext<S>, input: &CommandInput) -> Vec<Suggestion>;
}

#[async_trait]
impl<S, P> ErasedParser<S> for P
where
    S: Send + Sync + 'static,
    P: ArgumentParser<S>,
{
    fn parser_name(&self) -> Cow<'static, str> {
        self.name()
    }

    fn consumes_rest(&self) -> bool {
        self.is_greedy()
    }

    async fn parse_value(
        &self,
        ctx: &mut CommandContext<S>,
        input: &mut CommandInput,
    ) -> ParseResult<ArgumentValue> {
        let value = self.parse_async(ctx, input).await?;
        Ok(Arc::new(value) as ArgumentValue)
    }

    async fn suggest(&self, ctx: &CommandContext<S>, input: &CommandInput) -> Vec<Suggestion> {
        self.suggestions(ctx, input).await
    }
}

/// Wrap a parser for storage in the tree
pub fn erase<S, P>(parser: P) -> DynParser<S>
where
    S: Send + Sync + 'static,
    P: ArgumentParser<S>,
{
    Arc::new(parser)
}

/// Supplies suggestions in place of a parser's own
#[async_trait]
pub trait SuggestionProvider<S>: Send + Sync {
    async fn provide(&self, ctx: &CommandContext<S>, input: &CommandInput) -> Vec<Suggestion>;
}

/// Suggestion provider backed by a plain function
pub struct BlockingSuggestions<F>(pub F);

#[async_trait]
impl<S, F> SuggestionProvider<S> for BlockingSuggestions<F>
where
    S: Send + Sync + 'static,
    F: Fn(&CommandContext<S>, &CommandInput) -> Vec<Suggestion> + Send + Sync,
{
    async fn provide(&self, ctx: &CommandContext<S>, input: &CommandInput) -> Vec<Suggestion> {
        (self.0)(ctx, input)
    }
}

/// Build a suggestion provider from a closure
pub fn suggestion_provider<S, F>(f: F) -> Arc<dyn SuggestionProvider<S>>
where
    S: Send + Sync + 'static,
    F: Fn(&CommandContext<S>, &CommandInput) -> Vec<Suggestion> + Send + Sync + 'static,
{
    Arc::new(BlockingSuggestions(f))
}

/// Read one token, failing with `NoInputProvided` when the input is blank
pub(crate) fn read_token(
    parser: impl Into<Cow<'static, str>>,
    input: &mut CommandInput,
) -> ParseResult<String> {
    if input.is_blank() {
        return Err(ArgumentParseError::no_input(parser));
    }
    Ok(input.read_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Upper;

    impl ArgumentParser<()> for Upper {
        type Output = String;

        fn name(&self) -> Cow<'static, str> {
            "upper".into()
        }

        fn parse(&self, _ctx: &mut CommandContext<()>, input: &mut CommandInput) -> ParseResult<String> {
            read_token(self.name(), input).map(|t| t.to_uppercase())
        }
    }

    struct Remote;

    #[async_trait]
    impl ArgumentParser<()> for Remote {
        type Output = u32;

        fn name(&self) -> Cow<'static, str> {
            "remote".into()
        }

        async fn parse_async(
            &self,
            _ctx: &mut CommandContext<()>,
            input: &mut CommandInput,
        ) -> ParseResult<u32> {
            tokio::task::yield_now().await;
            let token = read_token(self.name(), input)?;
            Ok(token.len() as u32)
        }
    }

    #[tokio::test]
    async fn test_sync_parser_resolves_through_async_path() {
        let parser = erase::<(), _>(Upper);
        let mut ctx = CommandContext::new(());
        let mut input = CommandInput::new("abc def");

        let value = parser.parse_value(&mut ctx, &mut input).await.unwrap();
        assert_eq!(value.downcast_ref::<String>().map(String::as_str), Some("ABC"));
        assert_eq!(input.remaining_input(), " def");
    }

    #[tokio::test]
    async fn test_async_only_parser() {
        let mut ctx = CommandContext::new(());
        let mut input = CommandInput::new("four");

        let err = Remote.parse(&mut ctx, &mut input.clone()).unwrap_err();
        assert_eq!(err.reason, ParseErrorReason::AsyncOnly);

        let value = Remote.parse_async(&mut ctx, &mut input).await.unwrap();
        assert_eq!(value, 4);
    }

    #[tokio::test]
    async fn test_blank_input_fails() {
        let mut ctx = CommandContext::new(());
        let err = Upper.parse(&mut ctx, &mut CommandInput::new("   ")).unwrap_err();
        assert_eq!(err.reason, ParseErrorReason::NoInputProvided);
    }
}
