use std::borrow::Cow;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use super::{ArgumentParser, ParseResult};
use crate::context::CommandContext;
use crate::error::{ArgumentParseError, ParseErrorReason};
use crate::input::CommandInput;
use crate::suggestion::{Suggestion, dedup_suggestions};

/// Composition operators available on every parser
pub trait ArgumentParserExt<S: Send + Sync + 'static>: ArgumentParser<S> + Sized {
    /// Transform a successful value
    fn map<U, F>(self, mapper: F) -> MappedParser<S, Self, F, U>
    where
        F: Fn(Self::Output) -> U + Send + Sync + 'static,
        U: Send + Sync + 'static,
    {
        MappedParser {
            inner: self,
            mapper,
            _output: PhantomData,
        }
    }

    /// Chain a future-returning step onto a successful value
    fn flat_map_success<U, F>(self, mapper: F) -> FlatMapParser<S, Self, F, U>
    where
        F: Fn(&CommandContext<S>, Self::Output) -> BoxFuture<'static, ParseResult<U>>
            + Send
            + Sync
            + 'static,
        U: Send + Sync + 'static,
    {
        FlatMapParser {
            inner: self,
            mapper,
            _output: PhantomData,
        }
    }

    /// Try `self`, then `other` when `self` fails
    fn or<P>(self, other: P) -> FirstOf<S, Self::Output>
    where
        P: ArgumentParser<S, Output = Self::Output>,
    {
        let first: Arc<dyn ArgumentParser<S, Output = Self::Output>> = Arc::new(self);
        let second: Arc<dyn ArgumentParser<S, Output = Self::Output>> = Arc::new(other);
        FirstOf::new(vec![first, second])
    }
}

impl<S: Send + Sync + 'static, P: ArgumentParser<S>> ArgumentParserExt<S> for P {}

pub struct MappedParser<S, P, F, U> {
    inner: P,
    mapper: F,
    _output: PhantomData<fn() -> (S, U)>,
}

#[async_trait]
impl<S, P, F, U> ArgumentParser<S> for MappedParser<S, P, F, U>
where
    S: Send + Sync + 'static,
    P: ArgumentParser<S>,
    F: Fn(P::Output) -> U + Send + Sync + 'static,
    U: Send + Sync + 'static,
{
    type Output = U;

    fn name(&self) -> Cow<'static, str> {
        self.inner.name()
    }

    fn parse(&self, ctx: &mut CommandContext<S>, input: &mut CommandInput) -> ParseResult<U> {
        self.inner.parse(ctx, input).map(&self.mapper)
    }

    async fn parse_async(&self, ctx: &mut CommandContext<S>, input: &mut CommandInput) -> ParseResult<U> {
        self.inner.parse_async(ctx, input).await.map(&self.mapper)
    }

    async fn suggestions(&self, ctx: &CommandContext<S>, input: &CommandInput) -> Vec<Suggestion> {
        self.inner.suggestions(ctx, input).await
    }

    fn is_greedy(&self) -> bool {
        self.inner.is_greedy()
    }
}

pub struct FlatMapParser<S, P, F, U> {
    inner: P,
    mapper: F,
    _output: PhantomData<fn() -> (S, U)>,
}

#[async_trait]
impl<S, P, F, U> ArgumentParser<S> for FlatMapParser<S, P, F, U>
where
    S: Send + Sync + 'static,
    P: ArgumentParser<S>,
    F: Fn(&CommandContext<S>, P::Output) -> BoxFuture<'static, ParseResult<U>> + Send + Sync + 'static,
    U: Send + Sync + 'static,
{
    type Output = U;

    fn name(&self) -> Cow<'static, str> {
        self.inner.name()
    }

    async fn parse_async(&self, ctx: &mut CommandContext<S>, input: &mut CommandInput) -> ParseResult<U> {
        let value = self.inner.parse_async(ctx, input).await?;
        (self.mapper)(&*ctx, value).await
    }

    async fn suggestions(&self, ctx: &CommandContext<S>, input: &CommandInput) -> Vec<Suggestion> {
        self.inner.suggestions(ctx, input).await
    }

    fn is_greedy(&self) -> bool {
        self.inner.is_greedy()
    }
}

/// Tries parsers in order; the first success wins.
///
/// Each attempt runs on a copy of the input and context so that a failed
/// alternative leaves nothing behind.
pub struct FirstOf<S: Send + Sync + 'static, T: Send + Sync + 'static> {
    parsers: Vec<Arc<dyn ArgumentParser<S, Output = T>>>,
}

impl<S, T> FirstOf<S, T>
where
    S: Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    pub fn new(parsers: Vec<Arc<dyn ArgumentParser<S, Output = T>>>) -> Self {
        Self { parsers }
    }

    pub fn or<P>(mut self, parser: P) -> Self
    where
        P: ArgumentParser<S, Output = T>,
    {
        self.parsers.push(Arc::new(parser));
        self
    }
}

/// Shorthand for [`FirstOf::new`]
pub fn first_of<S, T>(parsers: Vec<Arc<dyn ArgumentParser<S, Output = T>>>) -> FirstOf<S, T>
where
    S: Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    FirstOf::new(parsers)
}

#[async_trait]
impl<S, T> ArgumentParser<S> for FirstOf<S, T>
where
    S: Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    type Output = T;

    fn name(&self) -> Cow<'static, str> {
        let names: Vec<_> = self.parsers.iter().map(|p| p.name()).collect();
        Cow::Owned(names.join("|"))
    }

    async fn parse_async(&self, ctx: &mut CommandContext<S>, input: &mut CommandInput) -> ParseResult<T> {
        let mut failures = Vec::new();
        for parser in &self.parsers {
            let mut attempt_input = input.clone();
            let mut attempt_ctx = ctx.clone();
            match parser.parse_async(&mut attempt_ctx, &mut attempt_input).await {
                Ok(value) => {
                    *input = attempt_input;
                    *ctx = attempt_ctx;
                    return Ok(value);
                }
                Err(err) => failures.push(err),
            }
        }
        Err(combined_failure(self.name(), input, failures))
    }

    async fn suggestions(&self, ctx: &CommandContext<S>, input: &CommandInput) -> Vec<Suggestion> {
        let mut all = Vec::new();
        for parser in &self.parsers {
            all.extend(parser.suggestions(ctx, input).await);
        }
        dedup_suggestions(all)
    }

    fn is_greedy(&self) -> bool {
        self.parsers.iter().any(|p| p.is_greedy())
    }
}

/// Value from one of two differently typed parsers
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Either<L, R> {
    Left(L),
    Right(R),
}

impl<L, R> Either<L, R> {
    pub fn left(&self) -> Option<&L> {
        match self {
            Either::Left(value) => Some(value),
            Either::Right(_) => None,
        }
    }

    pub fn right(&self) -> Option<&R> {
        match self {
            Either::Left(_) => None,
            Either::Right(value) => Some(value),
        }
    }
}

/// Parses with the primary parser, falling back to the secondary one
pub struct EitherParser<A, B> {
    primary: A,
    fallback: B,
}

impl<A, B> EitherParser<A, B> {
    pub fn new(primary: A, fallback: B) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl<S, A, B> ArgumentParser<S> for EitherParser<A, B>
where
    S: Send + Sync + 'static,
    A: ArgumentParser<S>,
    B: ArgumentParser<S>,
{
    type Output = Either<A::Output, B::Output>;

    fn name(&self) -> Cow<'static, str> {
        Cow::Owned(format!("{}|{}", self.primary.name(), self.fallback.name()))
    }

    async fn parse_async(
        &self,
        ctx: &mut CommandContext<S>,
        input: &mut CommandInput,
    ) -> ParseResult<Self::Output> {
        let mut attempt_input = input.clone();
        let mut attempt_ctx = ctx.clone();
        let primary_err = match self.primary.parse_async(&mut attempt_ctx, &mut attempt_input).await {
            Ok(value) => {
                *input = attempt_input;
                *ctx = attempt_ctx;
                return Ok(Either::Left(value));
            }
            Err(err) => err,
        };

        let mut attempt_input = input.clone();
        let mut attempt_ctx = ctx.clone();
        match self.fallback.parse_async(&mut attempt_ctx, &mut attempt_input).await {
            Ok(value) => {
                *input = attempt_input;
                *ctx = attempt_ctx;
                Ok(Either::Right(value))
            }
            Err(err) => Err(combined_failure(self.name(), input, vec![primary_err, err])),
        }
    }

    async fn suggestions(&self, ctx: &CommandContext<S>, input: &CommandInput) -> Vec<Suggestion> {
        let mut all = self.primary.suggestions(ctx, input).await;
        all.extend(self.fallback.suggestions(ctx, input).await);
        dedup_suggestions(all)
    }
}

fn combined_failure(
    name: Cow<'static, str>,
    input: &CommandInput,
    failures: Vec<ArgumentParseError>,
) -> ArgumentParseError {
    let mut err = ArgumentParseError::new(
        name,
        input.peek_string(),
        ParseErrorReason::Custom("no alternative accepted the input".to_string()),
    );
    for failure in failures {
        err = err.with_context(failure.parser.to_string(), failure.reason);
    }
    err
}
