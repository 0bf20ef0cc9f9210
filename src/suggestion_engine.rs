//! Computes completions for a partial input at a cursor.
//!
//! The input before the cursor is replayed through the tree with the real
//! parsers on a throwaway context. Once only the token under the cursor is
//! left, the node reached so far is asked for candidates: literal names and
//! aliases first, then the argument's suggestions, then flags.

use tracing::trace;

use crate::component::CommandComponent;
use crate::context::CommandContext;
use crate::input::{CommandInput, floor_char_boundary};
use crate::parser::ArgumentParser;
use crate::parser::flag::looks_like_flag;
use crate::settings::ManagerSettings;
use crate::suggestion::{Suggestion, Suggestions, dedup_suggestions, filter_suggestions};
use crate::tree::{CommandNode, CommandTree};

pub(crate) async fn suggest<S>(
    tree: &CommandTree<S>,
    mut ctx: CommandContext<S>,
    raw: &str,
    cursor: usize,
    settings: &ManagerSettings,
) -> Suggestions
where
    S: Send + Sync + 'static,
{
    let cursor = floor_char_boundary(raw, cursor);
    let (start, end) = CommandInput::new(raw).token_bounds(cursor);
    // compare against the token text, without its opening quote
    let partial = CommandInput::new(&raw[start..cursor]).peek_string();
    let ci = tree.case_insensitive_literals();

    let mut input = CommandInput::new(&raw[..cursor]);
    let mut node = tree.root();

    let list = loop {
        if input.is_last_token() {
            break suggestions_at(node, &ctx, &input).await;
        }

        let token = input.peek_string();

        if let Some(child) = node.find_literal(&token, ci).filter(|c| c.is_permitted(&ctx)) {
            input.read_string();
            node = child;
            continue;
        }

        if let Some((child, component)) = argument(node, &ctx) {
            if looks_like_flag(&token) && !component.is_required() && flags_below(child).is_some() {
                node = child;
                continue;
            }
            let before = input.clone();
            let Some(result) = component.read_value(&mut ctx, &mut input).await else {
                break Vec::new();
            };
            match result {
                // the parser ran into the token under the cursor
                Ok(_) if input.is_empty() => break argument_suggestions(component, &ctx, &before).await,
                Ok(value) => {
                    ctx.store_value(component.name(), value);
                    node = child;
                    continue;
                }
                Err(_) if input.is_blank() => break argument_suggestions(component, &ctx, &before).await,
                Err(err) => {
                    trace!(argument = component.name(), error = %err, "Suggestion replay stopped");
                    break Vec::new();
                }
            }
        }

        if let Some(flags) = node
            .flag_child()
            .filter(|c| c.is_permitted(&ctx))
            .and_then(|c| c.component())
            .and_then(CommandComponent::flag_parser)
        {
            break flags.suggestions(&ctx, &input).await;
        }

        break Vec::new();
    };

    let mut list = dedup_suggestions(filter_suggestions(list, &partial));
    if let Some(max) = settings.max_suggestions {
        list.truncate(max);
    }
    if list.is_empty() && settings.force_suggestion {
        list.push(Suggestion::simple(""));
    }

    Suggestions {
        input: raw.to_string(),
        start,
        end,
        list,
    }
}

/// Permitted argument child of `node` with its component
fn argument<'a, S>(
    node: &'a CommandNode<S>,
    ctx: &CommandContext<S>,
) -> Option<(&'a CommandNode<S>, &'a CommandComponent<S>)> {
    let child = node.argument_child().filter(|c| c.is_permitted(ctx))?;
    Some((child, child.component()?))
}

/// Flag group at `node` or after its optional arguments
fn flags_below<S>(node: &CommandNode<S>) -> Option<&CommandNode<S>> {
    if let Some(flags) = node.flag_child() {
        return Some(flags);
    }
    node.argument_child()
        .filter(|c| c.component().is_some_and(|comp| !comp.is_required()))
        .and_then(flags_below)
}

/// Candidates for the token under the cursor at `node`
async fn suggestions_at<S>(node: &CommandNode<S>, ctx: &CommandContext<S>, input: &CommandInput) -> Vec<Suggestion>
where
    S: Send + Sync + 'static,
{
    let mut list = Vec::new();

    for child in node.literal_children().filter(|c| c.is_permitted(ctx)) {
        if let Some(component) = child.component() {
            list.extend(component.names().map(|name| match component.description() {
                Some(desc) => Suggestion::with_description(name, desc),
                None => Suggestion::simple(name),
            }));
        }
    }

    if let Some((_, component)) = argument(node, ctx) {
        list.extend(argument_suggestions(component, ctx, input).await);
    }

    let flags = flags_below(node)
        .filter(|c| c.is_permitted(ctx))
        .and_then(|c| c.component())
        .and_then(CommandComponent::flag_parser);
    if let Some(flags) = flags {
        list.extend(flags.suggestions(ctx, input).await);
    }

    list
}

async fn argument_suggestions<S>(
    component: &CommandComponent<S>,
    ctx: &CommandContext<S>,
    input: &CommandInput,
) -> Vec<Suggestion>
where
    S: Send + Sync + 'static,
{
    if let Some(provider) = component.suggestion_override() {
        return provider.provide(ctx, input).await;
    }
    match component.parser() {
        Some(parser) => parser.suggest(ctx, input).await,
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::command::CommandBuilder;
    use crate::parser::{CommandFlag, IntegerParser, StringParser, suggestion_provider};
    use crate::permission::PermissionChecker;

    fn tree() -> CommandTree<&'static str> {
        let items = suggestion_provider(|_: &CommandContext<&'static str>, _: &CommandInput| {
            vec![Suggestion::simple("sword"), Suggestion::simple("shield"), Suggestion::simple("bow")]
        });
        let mut tree = CommandTree::new();
        tree.insert(
            CommandBuilder::new("give")
                .required("amount", IntegerParser::range(1, 64))
                .component(CommandComponent::required("item", StringParser::single()).with_suggestions(items))
                .build(),
        )
        .unwrap();
        tree.insert(CommandBuilder::new("gamemode").build()).unwrap();
        tree.insert(CommandBuilder::new("ban").permission("cmd.ban").build()).unwrap();
        tree.insert(
            CommandBuilder::new("tp")
                .required("target", StringParser::single())
                .optional("distance", IntegerParser::range(1, 5))
                .flag(CommandFlag::presence("silent"))
                .build(),
        )
        .unwrap();
        tree
    }

    fn ctx() -> CommandContext<&'static str> {
        let checker: Arc<dyn PermissionChecker<&'static str>> =
            Arc::new(|_: &&'static str, permission: &str| !permission.starts_with("cmd."));
        CommandContext::for_suggestions(Arc::new("player")).with_permissions(checker)
    }

    async fn run(raw: &str, cursor: usize) -> Suggestions {
        suggest(&tree(), ctx(), raw, cursor, &ManagerSettings::default()).await
    }

    #[tokio::test]
    async fn test_root_literals_respect_permission() {
        let result = run("", 0).await;
        assert_eq!(result.values(), vec!["give", "gamemode", "tp"]);

        let result = run("g", 1).await;
        assert_eq!(result.values(), vec!["give", "gamemode"]);
        assert_eq!((result.start, result.end), (0, 1));
    }

    #[tokio::test]
    async fn test_argument_override_is_filtered() {
        let result = run("give 10 sw", 10).await;
        assert_eq!(result.values(), vec!["sword"]);
        assert_eq!(result.full_lines(), vec!["give 10 sword"]);
    }

    #[tokio::test]
    async fn test_cursor_inside_input() {
        let result = run("give 10 sw extra", 10).await;
        assert_eq!(result.values(), vec!["sword"]);
        assert_eq!(result.full_lines(), vec!["give 10 sword extra"]);
    }

    #[tokio::test]
    async fn test_failed_earlier_token_yields_nothing() {
        assert!(run("give 99 sw", 10).await.is_empty());
        assert!(run("nothing here", 12).await.is_empty());
    }

    #[tokio::test]
    async fn test_flags_after_optional_argument() {
        let result = run("tp bob ", 7).await;
        assert_eq!(result.values(), vec!["1", "2", "3", "4", "5", "--silent"]);

        let result = run("tp bob --s", 10).await;
        assert_eq!(result.values(), vec!["--silent"]);

        let result = run("tp bob --silent ", 16).await;
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_limits_and_forced_suggestion() {
        let settings = ManagerSettings {
            max_suggestions: Some(1),
            force_suggestion: true,
            ..ManagerSettings::default()
        };
        let result = suggest(&tree(), ctx(), "", 0, &settings).await;
        assert_eq!(result.values(), vec!["give"]);

        let result = suggest(&tree(), ctx(), "zzz", 3, &settings).await;
        assert_eq!(result.values(), vec![""]);
    }

    #[tokio::test]
    async fn test_cursor_clamped_to_char_boundary() {
        let result = run("tp bö", 5).await;
        assert_eq!(result.start, 3);
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_quoted_token_under_cursor() {
        let mut tree = CommandTree::new();
        let greetings = suggestion_provider(|_: &CommandContext<&'static str>, _: &CommandInput| {
            vec![Suggestion::simple("hello world"), Suggestion::simple("goodbye")]
        });
        tree.insert(
            CommandBuilder::new("msg")
                .component(CommandComponent::required("text", StringParser::single()).with_suggestions(greetings))
                .build(),
        )
        .unwrap();

        let raw = r#"msg "hello wo"#;
        let result = suggest(&tree, ctx(), raw, raw.len(), &ManagerSettings::default()).await;
        assert_eq!((result.start, result.end), (4, raw.len()));
        assert_eq!(result.values(), vec!["hello world"]);
    }

    #[tokio::test]
    async fn test_idempotent() {
        let first = run("give 1", 6).await;
        let second = run("give 1", 6).await;
        assert_eq!(first, second);
        assert_eq!(first.values(), vec!["1", "10", "11", "12", "13", "14", "15", "16", "17", "18", "19"]);
    }
}
