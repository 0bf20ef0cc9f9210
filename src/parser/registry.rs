use std::any::{TypeId, type_name};
use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use super::{
    ArgumentParser, BooleanParser, DynParser, FloatParser, IntegerParser, StringParser, SuggestionProvider,
    UuidParser, erase,
};

type Supplier<S> = Arc<dyn Fn() -> DynParser<S> + Send + Sync>;

/// Lookup of parsers by produced type and by name, plus named suggestion
/// providers that commands can share.
pub struct ParserRegistry<S> {
    by_type: HashMap<TypeId, Supplier<S>>,
    by_name: HashMap<String, Supplier<S>>,
    suggestions: HashMap<String, Arc<dyn SuggestionProvider<S>>>,
}

impl<S: Send + Sync + 'static> Default for ParserRegistry<S> {
    fn default() -> Self {
        Self::with_standard_parsers()
    }
}

impl<S: Send + Sync + 'static> ParserRegistry<S> {
    /// Empty registry
    pub fn new() -> Self {
        Self {
            by_type: HashMap::new(),
            by_name: HashMap::new(),
            suggestions: HashMap::new(),
        }
    }

    /// Registry holding the standard catalog
    pub fn with_standard_parsers() -> Self {
        let mut registry = Self::new();
        registry.register::<String, _, _>(StringParser::single);
        registry.register::<i64, _, _>(IntegerParser::new);
        registry.register::<f64, _, _>(FloatParser::new);
        registry.register::<bool, _, _>(BooleanParser::new);
        registry.register::<Uuid, _, _>(|| UuidParser);
        registry.register_named("greedy_string", StringParser::greedy);
        registry
    }

    /// Register the default parser for `T`, replacing any previous one.
    /// The parser is also reachable under its own name.
    pub fn register<T, P, F>(&mut self, supplier: F)
    where
        T: 'static,
        P: ArgumentParser<S, Output = T>,
        F: Fn() -> P + Send + Sync + 'static,
    {
        let supplier: Supplier<S> = Arc::new(move || erase(supplier()));
        let name = supplier().parser_name().into_owned();
        debug!(ty = type_name::<T>(), parser = %name, "Registering parser");
        self.by_type.insert(TypeId::of::<T>(), Arc::clone(&supplier));
        self.by_name.insert(name, supplier);
    }

    /// Register a parser reachable only by name
    pub fn register_named<P, F>(&mut self, name: impl Into<String>, supplier: F)
    where
        P: ArgumentParser<S>,
        F: Fn() -> P + Send + Sync + 'static,
    {
        let name = name.into();
        debug!(parser = %name, "Registering named parser");
        self.by_name.insert(name, Arc::new(move || erase(supplier())));
    }

    pub fn register_suggestions(&mut self, name: impl Into<String>, provider: Arc<dyn SuggestionProvider<S>>) {
        self.suggestions.insert(name.into(), provider);
    }

    /// Fresh parser for `T`
    pub fn parser_for<T: 'static>(&self) -> Option<DynParser<S>> {
        self.by_type.get(&TypeId::of::<T>()).map(|supplier| supplier())
    }

    pub fn named(&self, name: &str) -> Option<DynParser<S>> {
        self.by_name.get(name).map(|supplier| supplier())
    }

    pub fn named_suggestions(&self, name: &str) -> Option<Arc<dyn SuggestionProvider<S>>> {
        self.suggestions.get(name).cloned()
    }

    pub fn has_parser<T: 'static>(&self) -> bool {
        self.by_type.contains_key(&TypeId::of::<T>())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::CommandContext;
    use crate::input::CommandInput;
    use crate::parser::{EnumParser, suggestion_provider};
    use crate::parser::enum_parser::CommandEnum;
    use crate::suggestion::Suggestion;

    #[derive(Clone, Debug, PartialEq)]
    enum Color {
        Red,
        Blue,
    }

    impl CommandEnum for Color {
        fn variants() -> &'static [Self] {
            &[Color::Red, Color::Blue]
        }

        fn name(&self) -> &'static str {
            match self {
                Color::Red => "red",
                Color::Blue => "blue",
            }
        }
    }

    #[tokio::test]
    async fn test_standard_catalog() {
        let registry = ParserRegistry::<()>::with_standard_parsers();
        assert!(registry.has_parser::<i64>());
        assert!(registry.has_parser::<Uuid>());
        assert!(!registry.has_parser::<u8>());

        let parser = registry.parser_for::<i64>().unwrap();
        let mut ctx = CommandContext::new(());
        let value = parser.parse_value(&mut ctx, &mut CommandInput::new("12")).await.unwrap();
        assert_eq!(value.downcast_ref::<i64>(), Some(&12));

        let greedy = registry.named("greedy_string").unwrap();
        assert!(greedy.consumes_rest());
        assert_eq!(registry.named("integer").unwrap().parser_name(), "integer");
    }

    #[tokio::test]
    async fn test_host_registration() {
        let mut registry = ParserRegistry::<()>::new();
        registry.register::<Color, _, _>(EnumParser::<Color>::new);
        registry.register_suggestions(
            "warps",
            suggestion_provider(|_: &CommandContext<()>, _: &CommandInput| vec![Suggestion::simple("spawn")]),
        );

        let parser = registry.parser_for::<Color>().unwrap();
        let mut ctx = CommandContext::new(());
        let value = parser.parse_value(&mut ctx, &mut CommandInput::new("BLUE")).await.unwrap();
        assert_eq!(value.downcast_ref::<Color>(), Some(&Color::Blue));

        let warps = registry.named_suggestions("warps").unwrap();
        assert_eq!(warps.provide(&ctx, &CommandInput::new("")).await.len(), 1);
    }
}
