//! Resolves raw input against the command tree.
//!
//! Routing is a single forward pass: at every node the literal children are
//! tried first, then the argument child, then the flag group. There is no
//! backtracking; an argument parser that rejects its input ends the pass.

use std::sync::Arc;

use tracing::trace;

use crate::command::Command;
use crate::component::CommandComponent;
use crate::context::CommandContext;
use crate::error::{ArgumentParseError, ParseErrorReason, ParseFailure};
use crate::input::CommandInput;
use crate::parser::ArgumentParser;
use crate::parser::flag::looks_like_flag;
use crate::tree::{CommandNode, CommandTree};

/// A command together with the context its arguments were parsed into
pub struct ResolvedCommand<S> {
    command: Arc<Command<S>>,
    context: CommandContext<S>,
}

impl<S> ResolvedCommand<S> {
    pub fn command(&self) -> &Arc<Command<S>> {
        &self.command
    }

    pub fn context(&self) -> &CommandContext<S> {
        &self.context
    }

    pub fn into_parts(self) -> (Arc<Command<S>>, CommandContext<S>) {
        (self.command, self.context)
    }
}

impl<S> std::fmt::Debug for ResolvedCommand<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedCommand")
            .field("command", &self.command)
            .field("context", &self.context)
            .finish()
    }
}

/// Route `raw` through `tree`, filling `ctx`
pub(crate) async fn route<S>(
    tree: &CommandTree<S>,
    mut ctx: CommandContext<S>,
    raw: &str,
) -> Result<ResolvedCommand<S>, ParseFailure>
where
    S: Send + Sync + 'static,
{
    let ci = tree.case_insensitive_literals();
    let mut input = CommandInput::new(raw);
    let mut node = tree.root();

    loop {
        input.skip_whitespace();
        // first permission the sender lacked among this node's children
        let mut denied: Option<String> = None;

        if input.is_empty() {
            if node.is_root() {
                return Err(ParseFailure::NoSuchCommand { token: String::new() });
            }
            if node.is_terminal() {
                let command = select_command(node, &ctx)?;
                trace!(syntax = %command.syntax(), "Resolved command");
                return Ok(ResolvedCommand { command, context: ctx });
            }
            if let Some(child) = optional_argument(node, &ctx) {
                fill_default(child, &mut ctx).await?;
                node = child;
                continue;
            }
            if let Some(child) = node.flag_child().filter(|c| c.is_permitted(&ctx)) {
                node = child;
                continue;
            }
            return Err(no_match(node, &ctx, &input, denied));
        }

        let token = input.peek_string();

        if let Some(child) = node.find_literal(&token, ci) {
            if child.is_permitted(&ctx) {
                trace!(literal = %token, "Matched literal");
                input.read_string();
                node = child;
                continue;
            }
            denied.get_or_insert_with(|| denied_permission(child, &ctx));
        }

        if let Some(child) = node.argument_child() {
            if !child.is_permitted(&ctx) {
                denied.get_or_insert_with(|| denied_permission(child, &ctx));
            } else if let Some(component) = child.component() {
                let skip_to_flags = looks_like_flag(&token) && !component.is_required();
                if skip_to_flags && reaches_flags(child) {
                    fill_default(child, &mut ctx).await?;
                    node = child;
                    continue;
                }
                if !skip_to_flags || node.flag_child().is_none() {
                    parse_argument(component, &mut ctx, &mut input)
                        .await
                        .map_err(|failure| prefer_denied(denied.as_deref(), failure))?;
                    node = child;
                    continue;
                }
            }
        }

        if let Some(child) = node.flag_child() {
            if child.is_permitted(&ctx) {
                if let Some(flags) = child.component().and_then(CommandComponent::flag_parser) {
                    flags
                        .parse_async(&mut ctx, &mut input)
                        .await
                        .map_err(|cause| prefer_denied(denied.as_deref(), flag_failure(node, &ctx, cause)))?;
                    node = child;
                    continue;
                }
            } else {
                denied.get_or_insert_with(|| denied_permission(child, &ctx));
            }
        }

        return Err(no_match(node, &ctx, &input, denied));
    }
}

async fn parse_argument<S>(
    component: &CommandComponent<S>,
    ctx: &mut CommandContext<S>,
    input: &mut CommandInput,
) -> Result<(), ParseFailure>
where
    S: Send + Sync + 'static,
{
    let start = input.clone();
    let Some(result) = component.read_value(ctx, input).await else {
        return Ok(());
    };
    match result {
        Ok(value) => {
            trace!(argument = component.name(), consumed = input.difference(&start), "Parsed argument");
            ctx.store_value(component.name(), value);
            ctx.record_consumed(component.name(), input.difference(&start));
            Ok(())
        }
        Err(cause) => Err(ParseFailure::ArgumentParse {
            argument: component.name().to_string(),
            cause,
        }),
    }
}

/// Optional argument child that may be skipped at end of input
fn optional_argument<'a, S>(node: &'a CommandNode<S>, ctx: &CommandContext<S>) -> Option<&'a CommandNode<S>> {
    node.argument_child()
        .filter(|c| c.component().is_some_and(|comp| !comp.is_required()))
        .filter(|c| c.is_permitted(ctx))
}

/// Whether a flag group can be reached by skipping optional arguments
fn reaches_flags<S>(node: &CommandNode<S>) -> bool {
    if node.flag_child().is_some() {
        return true;
    }
    node.argument_child()
        .filter(|c| c.component().is_some_and(|comp| !comp.is_required()))
        .is_some_and(reaches_flags)
}

async fn fill_default<S>(node: &CommandNode<S>, ctx: &mut CommandContext<S>) -> Result<(), ParseFailure>
where
    S: Send + Sync + 'static,
{
    let Some(component) = node.component() else {
        return Ok(());
    };
    match component.default_value(ctx).await {
        Some(Ok(value)) => {
            trace!(argument = component.name(), "Using default value");
            ctx.store_value(component.name(), value);
            Ok(())
        }
        Some(Err(cause)) => Err(ParseFailure::ArgumentParse {
            argument: component.name().to_string(),
            cause,
        }),
        None => Ok(()),
    }
}

/// Pick the command at a terminal node for this sender
fn select_command<S>(node: &CommandNode<S>, ctx: &CommandContext<S>) -> Result<Arc<Command<S>>, ParseFailure> {
    let permitted: Vec<&Arc<Command<S>>> = node
        .commands()
        .iter()
        .filter(|c| ctx.has_permission(c.permission()))
        .collect();

    if permitted.is_empty() {
        return Err(ParseFailure::NoPermission {
            permission: denied_permission(node, ctx),
        });
    }

    permitted
        .iter()
        .find(|c| c.accepts_sender(ctx.sender()))
        .map(|c| Arc::clone(*c))
        .ok_or_else(|| ParseFailure::InvalidSender {
            required: permitted
                .iter()
                .filter_map(|c| c.sender_type_name().map(str::to_string))
                .collect(),
        })
}

/// Permission of the first command below `node` the sender lacks
fn denied_permission<S>(node: &CommandNode<S>, ctx: &CommandContext<S>) -> String {
    node.all_commands()
        .iter()
        .map(|c| c.permission())
        .find(|p| !ctx.has_permission(p))
        .map(ToString::to_string)
        .unwrap_or_default()
}

/// Syntax of the permitted children of `node`
pub(crate) fn expected_syntax<S>(node: &CommandNode<S>, ctx: &CommandContext<S>) -> Vec<String> {
    node.children()
        .iter()
        .filter(|c| c.is_permitted(ctx))
        .filter_map(|c| c.component().map(CommandComponent::syntax))
        .collect()
}

fn no_match<S>(
    node: &CommandNode<S>,
    ctx: &CommandContext<S>,
    input: &CommandInput,
    denied: Option<String>,
) -> ParseFailure {
    if let Some(permission) = denied {
        return ParseFailure::NoPermission { permission };
    }
    if node.is_root() {
        return ParseFailure::NoSuchCommand {
            token: input.peek_string(),
        };
    }
    ParseFailure::InvalidSyntax {
        input: input.remaining_input().trim().to_string(),
        expected: expected_syntax(node, ctx),
    }
}

/// A branch the sender may not use outranks a failure on its siblings
fn prefer_denied(denied: Option<&str>, failure: ParseFailure) -> ParseFailure {
    match denied {
        Some(permission) => ParseFailure::NoPermission {
            permission: permission.to_string(),
        },
        None => failure,
    }
}

fn flag_failure<S>(node: &CommandNode<S>, ctx: &CommandContext<S>, cause: ArgumentParseError) -> ParseFailure {
    match cause.reason {
        ParseErrorReason::UnknownFlag => ParseFailure::InvalidSyntax {
            input: cause.input,
            expected: expected_syntax(node, ctx),
        },
        ParseErrorReason::NoFlagPermission => ParseFailure::NoPermission {
            permission: cause.context_value("permission").unwrap_or_default().to_string(),
        },
        _ => ParseFailure::ArgumentParse {
            argument: cause.context_value("flag").unwrap_or("flags").to_string(),
            cause,
        },
    }
}
