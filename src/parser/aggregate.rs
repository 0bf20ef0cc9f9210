use std::borrow::Cow;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use super::{ArgumentParser, DynParser, ParseResult, SuggestionProvider, erase};
use crate::context::CommandContext;
use crate::input::CommandInput;
use crate::suggestion::Suggestion;

struct AggregateComponent<S> {
    name: String,
    parser: DynParser<S>,
    suggestions: Option<Arc<dyn SuggestionProvider<S>>>,
}

enum Mapper<S, T> {
    Sync(Box<dyn Fn(&CommandContext<S>) -> ParseResult<T> + Send + Sync>),
    Async(Box<dyn Fn(&CommandContext<S>) -> BoxFuture<'static, ParseResult<T>> + Send + Sync>),
}

/// Collects the sub-components of an [`AggregateParser`]
pub struct AggregateBuilder<S> {
    components: Vec<AggregateComponent<S>>,
}

impl<S: Send + Sync + 'static> Default for AggregateBuilder<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Send + Sync + 'static> AggregateBuilder<S> {
    pub fn new() -> Self {
        Self {
            components: Vec::new(),
        }
    }

    pub fn with_component<P: ArgumentParser<S>>(mut self, name: impl Into<String>, parser: P) -> Self {
        self.components.push(AggregateComponent {
            name: name.into(),
            parser: erase(parser),
            suggestions: None,
        });
        self
    }

    /// Add a component whose suggestions come from `provider` instead of its parser
    pub fn with_component_suggestions<P: ArgumentParser<S>>(
        mut self,
        name: impl Into<String>,
        parser: P,
        provider: Arc<dyn SuggestionProvider<S>>,
    ) -> Self {
        self.components.push(AggregateComponent {
            name: name.into(),
            parser: erase(parser),
            suggestions: Some(provider),
        });
        self
    }

    /// Finish with a mapper reading the parsed components from a child context
    pub fn with_mapper<T, F>(self, mapper: F) -> AggregateParser<S, T>
    where
        T: Send + Sync + 'static,
        F: Fn(&CommandContext<S>) -> ParseResult<T> + Send + Sync + 'static,
    {
        AggregateParser {
            components: self.components,
            mapper: Mapper::Sync(Box::new(mapper)),
        }
    }

    pub fn with_async_mapper<T, F>(self, mapper: F) -> AggregateParser<S, T>
    where
        T: Send + Sync + 'static,
        F: Fn(&CommandContext<S>) -> BoxFuture<'static, ParseResult<T>> + Send + Sync + 'static,
    {
        AggregateParser {
            components: self.components,
            mapper: Mapper::Async(Box::new(mapper)),
        }
    }
}

/// Parses an ordered group of named components and maps them to one value.
///
/// Components are parsed into a copy of the caller's context, so their
/// values never leak into the command's own context; only the mapped result
/// is stored, under the argument's name.
pub struct AggregateParser<S, T> {
    components: Vec<AggregateComponent<S>>,
    mapper: Mapper<S, T>,
}

impl<S, T> AggregateParser<S, T> {
    pub fn component_names(&self) -> impl Iterator<Item = &str> {
        self.components.iter().map(|c| c.name.as_str())
    }
}

#[async_trait]
impl<S, T> ArgumentParser<S> for AggregateParser<S, T>
where
    S: Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    type Output = T;

    fn name(&self) -> Cow<'static, str> {
        "aggregate".into()
    }

    async fn parse_async(&self, ctx: &mut CommandContext<S>, input: &mut CommandInput) -> ParseResult<T> {
        let mut child = ctx.clone();
        for component in &self.components {
            let value = component
                .parser
                .parse_value(&mut child, input)
                .await
                .map_err(|err| err.with_context("component", &component.name))?;
            child.store_value(component.name.clone(), value);
        }
        match &self.mapper {
            Mapper::Sync(mapper) => mapper(&child),
            Mapper::Async(mapper) => mapper(&child).await,
        }
    }

    async fn suggestions(&self, ctx: &CommandContext<S>, input: &CommandInput) -> Vec<Suggestion> {
        let mut child = ctx.clone();
        let mut input = input.clone();
        for component in &self.components {
            if input.is_last_token() {
                return match &component.suggestions {
                    Some(provider) => provider.provide(&child, &input).await,
                    None => component.parser.suggest(&child, &input).await,
                };
            }
            match component.parser.parse_value(&mut child, &mut input).await {
                Ok(value) => child.store_value(component.name.clone(), value),
                Err(_) => return Vec::new(),
            }
        }
        Vec::new()
    }

    fn is_greedy(&self) -> bool {
        self.components.iter().any(|c| c.parser.consumes_rest())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ArgumentParseError, ParseErrorReason};
    use crate::parser::{IntegerParser, StringParser, suggestion_provider};
    use futures::FutureExt;

    #[derive(Debug, PartialEq)]
    struct Location {
        x: i64,
        y: i64,
    }

    fn location() -> AggregateParser<(), Location> {
        AggregateBuilder::new()
            .with_component("x", IntegerParser::new())
            .with_component("y", IntegerParser::range(0, 255))
            .with_mapper(|ctx: &CommandContext<()>| {
                Ok(Location {
                    x: ctx.get_or("x", 0),
                    y: ctx.get_or("y", 0),
                })
            })
    }

    #[tokio::test]
    async fn test_parses_components_in_order() {
        let mut ctx = CommandContext::new(());
        let mut input = CommandInput::new("-4 12 rest");
        let loc = location().parse_async(&mut ctx, &mut input).await.unwrap();

        assert_eq!(loc, Location { x: -4, y: 12 });
        assert_eq!(input.remaining_input(), " rest");
        assert!(!ctx.contains("x"));
    }

    #[tokio::test]
    async fn test_component_failure_names_component() {
        let mut ctx = CommandContext::new(());
        let err = location()
            .parse_async(&mut ctx, &mut CommandInput::new("1 300"))
            .await
            .unwrap_err();
        assert_eq!(err.reason, ParseErrorReason::OutOfRange);
        assert_eq!(err.context_value("component"), Some("y"));
    }

    #[tokio::test]
    async fn test_async_mapper() {
        let parser = AggregateBuilder::<()>::new()
            .with_component("name", StringParser::single())
            .with_async_mapper(|ctx: &CommandContext<()>| {
                let name = ctx.get::<String>("name").cloned();
                async move {
                    tokio::task::yield_now().await;
                    name.filter(|n| n != "nobody")
                        .ok_or_else(|| ArgumentParseError::new("player", "nobody", ParseErrorReason::UnknownValue))
                }
                .boxed()
            });

        let mut ctx = CommandContext::new(());
        let ok = parser.parse_async(&mut ctx, &mut CommandInput::new("alice")).await;
        assert_eq!(ok.unwrap(), "alice");
        let err = parser.parse_async(&mut ctx, &mut CommandInput::new("nobody")).await;
        assert_eq!(err.unwrap_err().reason, ParseErrorReason::UnknownValue);
    }

    #[tokio::test]
    async fn test_suggestions_follow_current_component() {
        let parser = AggregateBuilder::<()>::new()
            .with_component("x", IntegerParser::range(0, 5))
            .with_component_suggestions(
                "label",
                StringParser::single(),
                suggestion_provider(|_ctx: &CommandContext<()>, _input: &CommandInput| {
                    vec![Suggestion::simple("home"), Suggestion::simple("spawn")]
                }),
            )
            .with_mapper(|ctx: &CommandContext<()>| Ok(ctx.get_or::<i64>("x", 0)));
        let ctx = CommandContext::new(());

        let first = parser.suggestions(&ctx, &CommandInput::new("")).await;
        assert_eq!(first.len(), 6);

        let second = parser.suggestions(&ctx, &CommandInput::new("3 ")).await;
        let values: Vec<_> = second.into_iter().map(|s| s.value).collect();
        assert_eq!(values, vec!["home", "spawn"]);

        let bad = parser.suggestions(&ctx, &CommandInput::new("9 ")).await;
        assert!(bad.is_empty());
    }
}
