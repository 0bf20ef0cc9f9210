use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::trace;

use crate::context::CommandContext;
use crate::input::CommandInput;
use crate::parser::{ArgumentParser, ParseResult};
use crate::suggestion::Suggestion;

/// Wrapper that caches the suggestions of any parser.
///
/// Entries are keyed by the remaining input only, so the wrapped parser's
/// suggestions must not depend on the sender or on earlier arguments.
pub struct CachedSuggestions<P> {
    inner: P,
    cache: Arc<RwLock<HashMap<String, CachedEntry>>>,
    ttl: Duration,
}

struct CachedEntry {
    suggestions: Vec<Suggestion>,
    timestamp: Instant,
}

impl<P> CachedSuggestions<P> {
    /// Create a new cached parser with the given TTL
    pub fn new(inner: P, ttl: Duration) -> Self {
        Self {
            inner,
            cache: Arc::new(RwLock::new(HashMap::new())),
            ttl,
        }
    }

    /// Create a cached parser with default 5 minute TTL
    pub fn with_default_ttl(inner: P) -> Self {
        Self::new(inner, Duration::from_secs(300))
    }

    pub async fn clear_cache(&self) {
        self.cache.write().await.clear();
    }

    /// Number of cached inputs, expired ones included until the next miss
    pub async fn entry_count(&self) -> usize {
        self.cache.read().await.len()
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

#[async_trait]
impl<S, P> ArgumentParser<S> for CachedSuggestions<P>
where
    S: Send + Sync + 'static,
    P: ArgumentParser<S>,
{
    type Output = P::Output;

    fn name(&self) -> Cow<'static, str> {
        self.inner.name()
    }

    fn parse(&self, ctx: &mut CommandContext<S>, input: &mut CommandInput) -> ParseResult<P::Output> {
        self.inner.parse(ctx, input)
    }

    async fn parse_async(&self, ctx: &mut CommandContext<S>, input: &mut CommandInput) -> ParseResult<P::Output> {
        self.inner.parse_async(ctx, input).await
    }

    async fn suggestions(&self, ctx: &CommandContext<S>, input: &CommandInput) -> Vec<Suggestion> {
        let key = input.remaining_input().trim_start().to_string();

        {
            let cache = self.cache.read().await;
            if let Some(entry) = cache.get(&key) {
                if entry.timestamp.elapsed() < self.ttl {
                    trace!(parser = %self.inner.name(), key = %key, "Suggestion cache hit");
                    return entry.suggestions.clone();
                }
            }
        }

        // Cache miss or expired - fetch fresh
        let suggestions = self.inner.suggestions(ctx, input).await;

        {
            let mut cache = self.cache.write().await;
            cache.retain(|_, entry| entry.timestamp.elapsed() < self.ttl);
            cache.insert(
                key,
                CachedEntry {
                    suggestions: suggestions.clone(),
                    timestamp: Instant::now(),
                },
            );
        }

        suggestions
    }

    fn is_greedy(&self) -> bool {
        self.inner.is_greedy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ArgumentParser<()> for Counting {
        type Output = String;

        fn name(&self) -> Cow<'static, str> {
            "counting".into()
        }

        fn parse(&self, _ctx: &mut CommandContext<()>, input: &mut CommandInput) -> ParseResult<String> {
            Ok(input.read_string())
        }

        async fn suggestions(&self, _ctx: &CommandContext<()>, input: &CommandInput) -> Vec<Suggestion> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            vec![Suggestion::simple(format!("{}-{}", input.peek_string(), n))]
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_caching() {
        let calls = Arc::new(AtomicUsize::new(0));
        let parser = CachedSuggestions::new(Counting { calls: Arc::clone(&calls) }, Duration::from_secs(1));
        let ctx = CommandContext::new(());
        let input = CommandInput::new("fo");

        // First call - should hit inner parser
        let result1 = parser.suggestions(&ctx, &input).await;
        assert_eq!(result1[0].value, "fo-0");

        // Second call - should return cached result
        let result2 = parser.suggestions(&ctx, &input).await;
        assert_eq!(result2, result1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Different input is a different entry
        parser.suggestions(&ctx, &CommandInput::new("bar")).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        // Wait for TTL to expire
        tokio::time::advance(Duration::from_millis(1100)).await;
        let result3 = parser.suggestions(&ctx, &input).await;
        assert_eq!(result3[0].value, "fo-2");

        parser.clear_cache().await;
        parser.suggestions(&ctx, &input).await;
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entries_are_dropped() {
        let parser = CachedSuggestions::new(
            Counting {
                calls: Arc::new(AtomicUsize::new(0)),
            },
            Duration::from_secs(1),
        );
        let ctx = CommandContext::new(());
        for partial in ["a", "ab", "abc"] {
            parser.suggestions(&ctx, &CommandInput::new(partial)).await;
        }
        assert_eq!(parser.entry_count().await, 3);

        tokio::time::advance(Duration::from_secs(2)).await;
        parser.suggestions(&ctx, &CommandInput::new("abcd")).await;
        assert_eq!(parser.entry_count().await, 1);
    }

    #[tokio::test]
    async fn test_parse_is_delegated() {
        let parser = CachedSuggestions::with_default_ttl(Counting {
            calls: Arc::new(AtomicUsize::new(0)),
        });
        let mut ctx = CommandContext::new(());
        let value = parser.parse_async(&mut ctx, &mut CommandInput::new("abc def")).await.unwrap();
        assert_eq!(value, "abc");
    }
}
