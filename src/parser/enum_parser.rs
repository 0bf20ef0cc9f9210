use std::borrow::Cow;
use std::marker::PhantomData;

use async_trait::async_trait;

use super::{ArgumentParser, ParseResult, read_token};
use crate::context::CommandContext;
use crate::error::{ArgumentParseError, ParseErrorReason};
use crate::input::CommandInput;
use crate::suggestion::Suggestion;

/// An enum whose variants are selected by name on the command line.
///
/// Usually derived with `#[command_enum]`, which names variants by their
/// lowercased identifier and takes descriptions from doc comments.
pub trait CommandEnum: Sized + Send + Sync + Clone + 'static {
    /// All variants, in declaration order
    fn variants() -> &'static [Self];

    /// Name used on the command line
    fn name(&self) -> &'static str;

    fn description(&self) -> Option<&'static str> {
        None
    }

    /// Case-insensitive lookup by name
    fn from_name(name: &str) -> Option<Self> {
        Self::variants()
            .iter()
            .find(|v| v.name().eq_ignore_ascii_case(name))
            .cloned()
    }
}

/// Parses one token into a [`CommandEnum`] variant
pub struct EnumParser<E> {
    _enum: PhantomData<fn() -> E>,
}

impl<E: CommandEnum> EnumParser<E> {
    pub fn new() -> Self {
        Self { _enum: PhantomData }
    }
}

impl<E: CommandEnum> Default for EnumParser<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<S, E> ArgumentParser<S> for EnumParser<E>
where
    S: Send + Sync + 'static,
    E: CommandEnum,
{
    type Output = E;

    fn name(&self) -> Cow<'static, str> {
        "enum".into()
    }

    fn parse(&self, _ctx: &mut CommandContext<S>, input: &mut CommandInput) -> ParseResult<E> {
        let token = read_token("enum", input)?;
        E::from_name(&token).ok_or_else(|| {
            let names: Vec<&str> = E::variants().iter().map(CommandEnum::name).collect();
            ArgumentParseError::new("enum", token, ParseErrorReason::UnknownValue)
                .with_context("values", names.join(", "))
        })
    }

    async fn suggestions(&self, _ctx: &CommandContext<S>, _input: &CommandInput) -> Vec<Suggestion> {
        E::variants()
            .iter()
            .map(|v| match v.description() {
                Some(desc) => Suggestion::with_description(v.name(), desc),
                None => Suggestion::simple(v.name()),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    enum Mode {
        Survival,
        Creative,
    }

    impl CommandEnum for Mode {
        fn variants() -> &'static [Self] {
            &[Mode::Survival, Mode::Creative]
        }

        fn name(&self) -> &'static str {
            match self {
                Mode::Survival => "survival",
                Mode::Creative => "creative",
            }
        }

        fn description(&self) -> Option<&'static str> {
            match self {
                Mode::Survival => Some("Take damage"),
                Mode::Creative => None,
            }
        }
    }

    #[test]
    fn test_parse_by_name_ignoring_case() {
        let mut ctx = CommandContext::new(());
        let parser = EnumParser::<Mode>::new();
        let mode = parser.parse(&mut ctx, &mut CommandInput::new("CREATIVE")).unwrap();
        assert_eq!(mode, Mode::Creative);

        let err = parser.parse(&mut ctx, &mut CommandInput::new("hardcore")).unwrap_err();
        assert_eq!(err.reason, ParseErrorReason::UnknownValue);
        assert_eq!(err.context_value("values"), Some("survival, creative"));
    }

    #[tokio::test]
    async fn test_suggestions_carry_descriptions() {
        let ctx = CommandContext::new(());
        let list = EnumParser::<Mode>::new()
            .suggestions(&ctx, &CommandInput::new(""))
            .await;
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].description.as_deref(), Some("Take damage"));
        assert_eq!(list[1].value, "creative");
    }
}
