use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use crate::context::{ArgumentValue, CommandContext};
use crate::error::ArgumentParseError;
use crate::input::CommandInput;
use crate::parser::{
    ArgumentParser, CommandFlag, ComponentPreprocessor, DynParser, FlagParser, ParseResult, SuggestionProvider, erase,
};

/// What a component matches
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    /// Fixed word (or one of its aliases)
    Literal,
    /// Typed value read by a parser
    Argument,
    /// Flag post-pass over the remaining tokens
    Flag,
}

/// Value used when an optional argument is omitted
pub enum DefaultValue<S> {
    Constant(ArgumentValue),
    Dynamic(Arc<dyn Fn(&CommandContext<S>) -> ArgumentValue + Send + Sync>),
    /// Run through the component's own parser
    Parsed(String),
}

impl<S> Clone for DefaultValue<S> {
    fn clone(&self) -> Self {
        match self {
            DefaultValue::Constant(value) => DefaultValue::Constant(Arc::clone(value)),
            DefaultValue::Dynamic(supplier) => DefaultValue::Dynamic(Arc::clone(supplier)),
            DefaultValue::Parsed(text) => DefaultValue::Parsed(text.clone()),
        }
    }
}

impl<S> fmt::Debug for DefaultValue<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultValue::Constant(_) => write!(f, "Constant(..)"),
            DefaultValue::Dynamic(_) => write!(f, "Dynamic(..)"),
            DefaultValue::Parsed(text) => write!(f, "Parsed({:?})", text),
        }
    }
}

impl<S: Send + Sync + 'static> DefaultValue<S> {
    pub fn constant<T: Send + Sync + 'static>(value: T) -> Self {
        DefaultValue::Constant(Arc::new(value))
    }

    pub fn dynamic<T, F>(supplier: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&CommandContext<S>) -> T + Send + Sync + 'static,
    {
        DefaultValue::Dynamic(Arc::new(move |ctx: &CommandContext<S>| Arc::new(supplier(ctx)) as ArgumentValue))
    }

    pub fn parsed(text: impl Into<String>) -> Self {
        DefaultValue::Parsed(text.into())
    }
}

/// One position of a command: a literal, an argument or the flag group
pub struct CommandComponent<S> {
    name: String,
    aliases: Vec<String>,
    kind: ComponentKind,
    parser: Option<DynParser<S>>,
    flags: Option<FlagParser<S>>,
    required: bool,
    default: Option<DefaultValue<S>>,
    description: Option<String>,
    suggestions: Option<Arc<dyn SuggestionProvider<S>>>,
    preprocessors: Vec<Arc<dyn ComponentPreprocessor<S>>>,
}

impl<S: Send + Sync + 'static> CommandComponent<S> {
    pub fn literal(name: impl Into<String>) -> Self {
        Self::bare(name.into(), ComponentKind::Literal)
    }

    pub fn literal_with_aliases<I, A>(name: impl Into<String>, aliases: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        let mut component = Self::literal(name);
        component.aliases = aliases.into_iter().map(Into::into).collect();
        component
    }

    pub fn required<P: ArgumentParser<S>>(name: impl Into<String>, parser: P) -> Self {
        Self::from_parser(name, erase(parser))
    }

    pub fn optional<P: ArgumentParser<S>>(name: impl Into<String>, parser: P) -> Self {
        Self::required(name, parser).make_optional(None)
    }

    pub fn optional_with_default<P: ArgumentParser<S>>(
        name: impl Into<String>,
        parser: P,
        default: DefaultValue<S>,
    ) -> Self {
        Self::required(name, parser).make_optional(Some(default))
    }

    /// Required argument over an already erased parser, e.g. one taken
    /// from a [`crate::ParserRegistry`]
    pub fn from_parser(name: impl Into<String>, parser: DynParser<S>) -> Self {
        let mut component = Self::bare(name.into(), ComponentKind::Argument);
        component.parser = Some(parser);
        component
    }

    /// Flag group; always optional and always last
    pub fn flags(flags: Vec<CommandFlag<S>>) -> Self {
        let mut component = Self::bare("flags".to_string(), ComponentKind::Flag);
        component.required = false;
        component.flags = Some(FlagParser::new(flags));
        component
    }

    fn bare(name: String, kind: ComponentKind) -> Self {
        Self {
            name,
            aliases: Vec::new(),
            kind,
            parser: None,
            flags: None,
            required: true,
            default: None,
            description: None,
            suggestions: None,
            preprocessors: Vec::new(),
        }
    }

    fn make_optional(mut self, default: Option<DefaultValue<S>>) -> Self {
        self.required = false;
        self.default = default;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Replace the parser's own suggestions
    pub fn with_suggestions(mut self, provider: Arc<dyn SuggestionProvider<S>>) -> Self {
        self.suggestions = Some(provider);
        self
    }

    /// Run `preprocessor` on the input before the parser, in registration order
    pub fn with_preprocessor<P: ComponentPreprocessor<S> + 'static>(self, preprocessor: P) -> Self {
        self.with_shared_preprocessor(Arc::new(preprocessor))
    }

    pub fn with_shared_preprocessor(mut self, preprocessor: Arc<dyn ComponentPreprocessor<S>>) -> Self {
        self.preprocessors.push(preprocessor);
        self
    }

    /// Preprocess then parse the argument's value; `None` without a parser
    pub(crate) async fn read_value(
        &self,
        ctx: &mut CommandContext<S>,
        input: &mut CommandInput,
    ) -> Option<ParseResult<ArgumentValue>> {
        let parser = self.parser.as_ref()?;
        for preprocessor in &self.preprocessors {
            if let Err(err) = preprocessor.preprocess(&*ctx, &*input).await {
                return Some(Err(err));
            }
        }
        Some(parser.parse_value(ctx, input).await)
    }

    /// Resolve the default of an omitted optional argument
    pub(crate) async fn default_value(
        &self,
        ctx: &mut CommandContext<S>,
    ) -> Option<Result<ArgumentValue, ArgumentParseError>> {
        match self.default.as_ref()? {
            DefaultValue::Constant(value) => Some(Ok(Arc::clone(value))),
            DefaultValue::Dynamic(supplier) => Some(Ok(supplier(&*ctx))),
            DefaultValue::Parsed(text) => {
                let parser = self.parser.as_ref()?;
                let mut input = CommandInput::new(text.clone());
                Some(parser.parse_value(ctx, &mut input).await)
            }
        }
    }
}

impl<S> CommandComponent<S> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn kind(&self) -> ComponentKind {
        self.kind
    }

    pub fn is_literal(&self) -> bool {
        self.kind == ComponentKind::Literal
    }

    pub fn is_argument(&self) -> bool {
        self.kind == ComponentKind::Argument
    }

    pub fn is_flag(&self) -> bool {
        self.kind == ComponentKind::Flag
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn parser(&self) -> Option<&DynParser<S>> {
        self.parser.as_ref()
    }

    pub fn flag_parser(&self) -> Option<&FlagParser<S>> {
        self.flags.as_ref()
    }

    pub fn suggestion_override(&self) -> Option<&Arc<dyn SuggestionProvider<S>>> {
        self.suggestions.as_ref()
    }

    pub fn preprocessors(&self) -> &[Arc<dyn ComponentPreprocessor<S>>] {
        &self.preprocessors
    }

    /// Position among siblings: literals, then the argument, then flags
    pub fn rank(&self) -> u8 {
        match self.kind {
            ComponentKind::Literal => 0,
            ComponentKind::Argument => 1,
            ComponentKind::Flag => 2,
        }
    }

    pub fn is_greedy(&self) -> bool {
        self.parser.as_ref().is_some_and(|p| p.consumes_rest())
    }

    /// Name followed by aliases
    pub fn names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    /// Whether `token` selects this literal
    pub fn matches_literal(&self, token: &str, case_insensitive: bool) -> bool {
        self.is_literal()
            && self.names().any(|name| {
                if case_insensitive {
                    name.eq_ignore_ascii_case(token)
                } else {
                    name == token
                }
            })
    }

    pub(crate) fn add_aliases(&mut self, aliases: Vec<String>) {
        self.aliases.extend(aliases);
    }

    pub(crate) fn name_set(&self, case_insensitive: bool) -> HashSet<String> {
        self.names()
            .map(|n| if case_insensitive { n.to_lowercase() } else { n.to_string() })
            .collect()
    }

    /// How the component reads in a usage string
    pub fn syntax(&self) -> String {
        match self.kind {
            ComponentKind::Literal => self.name.clone(),
            ComponentKind::Argument if self.required => format!("<{}>", self.name),
            ComponentKind::Argument => format!("[{}]", self.name),
            ComponentKind::Flag => {
                let names: Vec<String> = self
                    .flags
                    .iter()
                    .flat_map(|f| f.flags())
                    .map(|f| format!("--{}", f.name()))
                    .collect();
                format!("[{}]", names.join("|"))
            }
        }
    }
}

impl<S> Clone for CommandComponent<S> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            aliases: self.aliases.clone(),
            kind: self.kind,
            parser: self.parser.clone(),
            flags: self.flags.clone(),
            required: self.required,
            default: self.default.clone(),
            description: self.description.clone(),
            suggestions: self.suggestions.clone(),
            preprocessors: self.preprocessors.clone(),
        }
    }
}

impl<S> fmt::Debug for CommandComponent<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandComponent")
            .field("name", &self.name)
            .field("aliases", &self.aliases)
            .field("kind", &self.kind)
            .field("required", &self.required)
            .field("default", &self.default)
            .field("preprocessors", &self.preprocessors.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{IntegerParser, StringParser};

    #[test]
    fn test_rank_orders_kinds() {
        let literal = CommandComponent::<()>::literal("give");
        let argument = CommandComponent::<()>::required("amount", IntegerParser::new());
        let flags = CommandComponent::<()>::flags(vec![CommandFlag::presence("silent")]);
        assert!(literal.rank() < argument.rank());
        assert!(argument.rank() < flags.rank());
        assert!(!flags.is_required());
    }

    #[test]
    fn test_literal_matching() {
        let tp = CommandComponent::<()>::literal_with_aliases("teleport", ["tp"]);
        assert!(tp.matches_literal("tp", false));
        assert!(!tp.matches_literal("TP", false));
        assert!(tp.matches_literal("TP", true));
        assert_eq!(tp.names().collect::<Vec<_>>(), vec!["teleport", "tp"]);
    }

    #[test]
    fn test_syntax() {
        let item = CommandComponent::<()>::required("item", StringParser::single());
        let amount = CommandComponent::<()>::optional("amount", IntegerParser::new());
        assert_eq!(item.syntax(), "<item>");
        assert_eq!(amount.syntax(), "[amount]");
    }

    #[tokio::test]
    async fn test_preprocessor_runs_before_parser() {
        use crate::parser::RegexPreprocessor;

        let amount = CommandComponent::<()>::required("amount", IntegerParser::new())
            .with_preprocessor(RegexPreprocessor::new(r"^[0-9]+$").unwrap());
        let mut ctx = CommandContext::new(());

        let mut input = CommandInput::new("-5");
        let err = amount.read_value(&mut ctx, &mut input).await.unwrap().unwrap_err();
        assert_eq!(err.parser, "regex");
        assert_eq!(input.remaining_input(), "-5");

        let mut input = CommandInput::new("12 rest");
        let value = amount.read_value(&mut ctx, &mut input).await.unwrap().unwrap();
        assert_eq!(value.downcast_ref::<i64>(), Some(&12));

        let literal = CommandComponent::<()>::literal("give");
        assert!(literal.read_value(&mut ctx, &mut input).await.is_none());
    }

    #[tokio::test]
    async fn test_default_values() {
        let mut ctx = CommandContext::new(7i64);

        let constant = CommandComponent::optional_with_default("hp", IntegerParser::new(), DefaultValue::constant(20i64));
        let value = constant.default_value(&mut ctx).await.unwrap().unwrap();
        assert_eq!(value.downcast_ref::<i64>(), Some(&20));

        let dynamic = CommandComponent::optional_with_default(
            "hp",
            IntegerParser::new(),
            DefaultValue::dynamic(|ctx: &CommandContext<i64>| *ctx.sender() * 2),
        );
        let value = dynamic.default_value(&mut ctx).await.unwrap().unwrap();
        assert_eq!(value.downcast_ref::<i64>(), Some(&14));

        let parsed = CommandComponent::optional_with_default("hp", IntegerParser::range(0, 5), DefaultValue::parsed("9"));
        assert!(parsed.default_value(&mut ctx).await.unwrap().is_err());

        let none = CommandComponent::optional("hp", IntegerParser::new());
        assert!(none.default_value(&mut ctx).await.is_none());
    }
}
