use std::borrow::Cow;
use std::sync::Arc;

use async_trait::async_trait;

use super::{ArgumentParser, DynParser, ParseResult, erase};
use crate::context::CommandContext;
use crate::error::{ArgumentParseError, ParseErrorReason};
use crate::input::CommandInput;
use crate::permission::Permission;
use crate::suggestion::{Suggestion, filter_suggestions};

const FLAG_PARSER: &str = "flag";

/// A named option given as `--name` or `-alias`, anywhere after the
/// positional arguments.
///
/// Presence flags carry no value and are stored as `true`. Value flags read
/// the following token(s) with their own parser and store the result under
/// the flag name; a repeatable value flag keeps its last value and the number
/// of occurrences is available through [`crate::FlagContext::count`].
pub struct CommandFlag<S> {
    name: String,
    aliases: Vec<String>,
    parser: Option<DynParser<S>>,
    permission: Permission,
    repeatable: bool,
    description: Option<String>,
}

impl<S: Send + Sync + 'static> CommandFlag<S> {
    pub fn presence(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            aliases: Vec::new(),
            parser: None,
            permission: Permission::Empty,
            repeatable: false,
            description: None,
        }
    }

    pub fn value<P: ArgumentParser<S>>(name: impl Into<String>, parser: P) -> Self {
        let mut flag = Self::presence(name);
        flag.parser = Some(erase(parser));
        flag
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn permission(mut self, permission: impl Into<Permission>) -> Self {
        self.permission = permission.into();
        self
    }

    pub fn repeatable(mut self) -> Self {
        self.repeatable = true;
        self
    }
}

impl<S> CommandFlag<S> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn has_value(&self) -> bool {
        self.parser.is_some()
    }

    pub fn is_repeatable(&self) -> bool {
        self.repeatable
    }

    pub fn required_permission(&self) -> &Permission {
        &self.permission
    }

    pub fn flag_description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn suggestion(&self, value: String) -> Suggestion {
        match &self.description {
            Some(desc) => Suggestion::with_description(value, desc.clone()),
            None => Suggestion::simple(value),
        }
    }
}

impl<S> Clone for CommandFlag<S> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            aliases: self.aliases.clone(),
            parser: self.parser.clone(),
            permission: self.permission.clone(),
            repeatable: self.repeatable,
            description: self.description.clone(),
        }
    }
}

/// True for `--word` and `-x` tokens; negative numbers are not flags
pub(crate) fn looks_like_flag(token: &str) -> bool {
    let body = token.strip_prefix("--").or_else(|| token.strip_prefix('-'));
    body.and_then(|b| b.chars().next())
        .is_some_and(char::is_alphabetic)
}

/// Consumes every remaining token as a flag of one command
pub struct FlagParser<S> {
    flags: Vec<Arc<CommandFlag<S>>>,
}

impl<S> Clone for FlagParser<S> {
    fn clone(&self) -> Self {
        Self {
            flags: self.flags.clone(),
        }
    }
}

/// Which flags a single token refers to
enum FlagToken<'a, S> {
    One(&'a Arc<CommandFlag<S>>),
    Combined(Vec<&'a Arc<CommandFlag<S>>>),
}

impl<S> FlagParser<S> {
    pub fn new(flags: Vec<CommandFlag<S>>) -> Self {
        Self {
            flags: flags.into_iter().map(Arc::new).collect(),
        }
    }

    pub fn flags(&self) -> impl Iterator<Item = &CommandFlag<S>> {
        self.flags.iter().map(|f| f.as_ref())
    }

    /// Names and aliases in a stable order, used to compare flag sets
    pub(crate) fn signature(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .flags
            .iter()
            .flat_map(|f| {
                std::iter::once(format!("--{}", f.name)).chain(f.aliases.iter().map(|a| format!("-{}", a)))
            })
            .collect();
        keys.sort();
        keys
    }
}

impl<S: Send + Sync + 'static> FlagParser<S> {
    fn by_name(&self, name: &str) -> Option<&Arc<CommandFlag<S>>> {
        self.flags.iter().find(|f| f.name == name)
    }

    fn by_alias(&self, alias: &str) -> Option<&Arc<CommandFlag<S>>> {
        self.flags.iter().find(|f| f.aliases.iter().any(|a| a == alias))
    }

    fn resolve(&self, token: &str) -> Option<FlagToken<'_, S>> {
        if let Some(name) = token.strip_prefix("--") {
            return self.by_name(name).map(FlagToken::One);
        }
        let short = token.strip_prefix('-')?;
        if let Some(flag) = self.by_alias(short) {
            return Some(FlagToken::One(flag));
        }
        // -abc: every letter must be a presence flag alias
        let mut combined = Vec::new();
        for ch in short.chars() {
            let flag = self.by_alias(ch.encode_utf8(&mut [0; 4]))?;
            if flag.has_value() {
                return None;
            }
            combined.push(flag);
        }
        Some(FlagToken::Combined(combined))
    }

    fn admit(&self, flag: &CommandFlag<S>, ctx: &CommandContext<S>, token: &str) -> ParseResult<()> {
        if !ctx.has_permission(&flag.permission) {
            return Err(ArgumentParseError::new(FLAG_PARSER, token, ParseErrorReason::NoFlagPermission)
                .with_context("flag", &flag.name)
                .with_context("permission", &flag.permission));
        }
        if !flag.repeatable && ctx.flags().is_present(&flag.name) {
            return Err(ArgumentParseError::new(FLAG_PARSER, token, ParseErrorReason::DuplicateFlag)
                .with_context("flag", &flag.name));
        }
        Ok(())
    }

    async fn apply(
        &self,
        flag: &CommandFlag<S>,
        ctx: &mut CommandContext<S>,
        input: &mut CommandInput,
        token: &str,
    ) -> ParseResult<()> {
        self.admit(flag, ctx, token)?;
        match &flag.parser {
            Some(parser) => {
                if input.is_blank() {
                    return Err(ArgumentParseError::new(FLAG_PARSER, token, ParseErrorReason::MissingFlagValue)
                        .with_context("flag", &flag.name));
                }
                let start = input.clone();
                let value = parser
                    .parse_value(ctx, input)
                    .await
                    .map_err(|err| err.with_context("flag", &flag.name))?;
                ctx.store_value(flag.name.clone(), value);
                ctx.record_consumed(&flag.name, input.difference(&start));
            }
            None => ctx.store(flag.name.clone(), true),
        }
        ctx.flags_mut().mark(&flag.name);
        Ok(())
    }

    fn unknown(token: &str) -> ArgumentParseError {
        ArgumentParseError::new(FLAG_PARSER, token, ParseErrorReason::UnknownFlag)
    }

    fn name_suggestions(&self, ctx: &CommandContext<S>, partial: &str) -> Vec<Suggestion> {
        let with_aliases = partial.starts_with('-') && !partial.starts_with("--");
        let mut list = Vec::new();
        for flag in &self.flags {
            let used = ctx.flags().is_present(&flag.name) && !flag.repeatable;
            if used || !ctx.has_permission(&flag.permission) {
                continue;
            }
            list.push(flag.suggestion(format!("--{}", flag.name)));
            if with_aliases {
                list.extend(flag.aliases.iter().map(|a| flag.suggestion(format!("-{}", a))));
            }
        }
        filter_suggestions(list, partial)
    }
}

#[async_trait]
impl<S: Send + Sync + 'static> ArgumentParser<S> for FlagParser<S> {
    type Output = ();

    fn name(&self) -> Cow<'static, str> {
        FLAG_PARSER.into()
    }

    async fn parse_async(&self, ctx: &mut CommandContext<S>, input: &mut CommandInput) -> ParseResult<()> {
        while input.has_remaining_input() {
            let token = input.read_string();
            if !looks_like_flag(&token) {
                return Err(Self::unknown(&token));
            }
            match self.resolve(&token) {
                Some(FlagToken::One(flag)) => self.apply(flag, ctx, input, &token).await?,
                Some(FlagToken::Combined(flags)) => {
                    for flag in flags {
                        self.apply(flag, ctx, input, &token).await?;
                    }
                }
                None => return Err(Self::unknown(&token)),
            }
        }
        Ok(())
    }

    async fn suggestions(&self, ctx: &CommandContext<S>, input: &CommandInput) -> Vec<Suggestion> {
        let mut ctx = ctx.clone();
        let mut input = input.clone();

        while !input.is_last_token() {
            let token = input.read_string();
            let flags = match self.resolve(&token) {
                Some(FlagToken::One(flag)) => vec![flag],
                Some(FlagToken::Combined(flags)) => flags,
                None => return Vec::new(),
            };
            for flag in flags {
                if let Some(parser) = &flag.parser {
                    if input.is_last_token() {
                        return parser.suggest(&ctx, &input).await;
                    }
                    match parser.parse_value(&mut ctx, &mut input).await {
                        Ok(value) => ctx.store_value(flag.name.clone(), value),
                        Err(_) => return Vec::new(),
                    }
                }
                ctx.flags_mut().mark(&flag.name);
            }
        }

        let partial = input.peek_string();
        if !partial.is_empty() && !partial.starts_with('-') {
            return Vec::new();
        }
        self.name_suggestions(&ctx, &partial)
    }

    fn is_greedy(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::IntegerParser;

    fn parser() -> FlagParser<&'static str> {
        FlagParser::new(vec![
            CommandFlag::presence("silent").alias("s").description("No broadcast"),
            CommandFlag::presence("force").alias("f"),
            CommandFlag::value("speed", IntegerParser::range(1, 10)).alias("v"),
            CommandFlag::presence("verbose").repeatable(),
            CommandFlag::presence("admin").permission("cmd.admin"),
        ])
    }

    fn ctx() -> CommandContext<&'static str> {
        let checker = |sender: &&'static str, _: &str| *sender == "op";
        CommandContext::new("user").with_permissions(Arc::new(checker))
    }

    async fn run(input: &str) -> (ParseResult<()>, CommandContext<&'static str>) {
        let mut ctx = ctx();
        let result = parser().parse_async(&mut ctx, &mut CommandInput::new(input)).await;
        (result, ctx)
    }

    fn values(list: Vec<Suggestion>) -> Vec<String> {
        list.into_iter().map(|s| s.value).collect()
    }

    #[test]
    fn test_looks_like_flag() {
        assert!(looks_like_flag("--silent"));
        assert!(looks_like_flag("-s"));
        assert!(!looks_like_flag("-5"));
        assert!(!looks_like_flag("--"));
        assert!(!looks_like_flag("bob"));
    }

    #[tokio::test]
    async fn test_long_short_and_combined() {
        let (result, ctx) = run("--speed 4 -sf").await;
        assert!(result.is_ok());
        assert_eq!(ctx.get::<i64>("speed"), Some(&4));
        assert_eq!(ctx.get::<bool>("silent"), Some(&true));
        assert!(ctx.flags().is_present("force"));
        assert!(!ctx.flags().is_present("verbose"));
    }

    #[tokio::test]
    async fn test_value_flags_record_consumed_input() {
        let (result, ctx) = run("--speed   7 -s").await;
        assert!(result.is_ok());
        assert_eq!(ctx.consumed_input("speed"), Some("7"));
        assert_eq!(ctx.consumed_input("silent"), None);

        let (result, ctx) = run("-v '3'").await;
        assert!(result.is_ok());
        assert_eq!(ctx.consumed_input("speed"), Some("'3'"));
        assert_eq!(ctx.get::<i64>("speed"), Some(&3));
    }

    #[tokio::test]
    async fn test_flag_failures() {
        let (result, _) = run("--loud").await;
        assert_eq!(result.unwrap_err().reason, ParseErrorReason::UnknownFlag);

        let (result, _) = run("-s --silent").await;
        assert_eq!(result.unwrap_err().reason, ParseErrorReason::DuplicateFlag);

        let (result, _) = run("--speed").await;
        assert_eq!(result.unwrap_err().reason, ParseErrorReason::MissingFlagValue);

        let (result, _) = run("--admin").await;
        assert_eq!(result.unwrap_err().reason, ParseErrorReason::NoFlagPermission);

        let (result, _) = run("--speed 40").await;
        assert_eq!(result.unwrap_err().reason, ParseErrorReason::OutOfRange);

        let (result, _) = run("stray").await;
        assert_eq!(result.unwrap_err().input, "stray");
    }

    #[tokio::test]
    async fn test_repeatable_counts() {
        let (result, ctx) = run("--verbose --verbose").await;
        assert!(result.is_ok());
        assert_eq!(ctx.flags().count("verbose"), 2);
    }

    #[tokio::test]
    async fn test_suggests_unused_permitted_flags() {
        let list = parser().suggestions(&ctx(), &CommandInput::new("-s ")).await;
        assert_eq!(values(list), vec!["--force", "--speed", "--verbose"]);
    }

    #[tokio::test]
    async fn test_suggests_aliases_for_single_dash() {
        let list = parser().suggestions(&ctx(), &CommandInput::new("-")).await;
        let values = values(list);
        assert!(values.contains(&"-s".to_string()));
        assert!(values.contains(&"--silent".to_string()));
        assert!(!values.contains(&"--admin".to_string()));
    }

    #[tokio::test]
    async fn test_suggests_pending_flag_value() {
        let list = parser().suggestions(&ctx(), &CommandInput::new("--speed ")).await;
        assert_eq!(list.len(), 9);
        assert_eq!(list[0].value, "1");

        let list = parser().suggestions(&ctx(), &CommandInput::new("--speed 3 --")).await;
        assert!(values(list).contains(&"--silent".to_string()));
    }
}
