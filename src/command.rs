use std::fmt;
use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::component::{CommandComponent, DefaultValue};
use crate::context::CommandContext;
use crate::meta::{CommandMeta, MetaKey};
use crate::parser::{ArgumentParser, CommandFlag};
use crate::permission::Permission;

/// Code run once a command has been resolved
#[async_trait]
pub trait CommandHandler<S>: Send + Sync {
    async fn execute(&self, ctx: &CommandContext<S>) -> Result<()>;
}

/// Handler backed by a closure returning a future
pub struct FnHandler<F>(pub F);

#[async_trait]
impl<S, F, Fut> CommandHandler<S> for FnHandler<F>
where
    S: Send + Sync + 'static,
    F: Fn(CommandContext<S>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    async fn execute(&self, ctx: &CommandContext<S>) -> Result<()> {
        (self.0)(ctx.clone()).await
    }
}

/// Handler that does nothing
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopHandler;

#[async_trait]
impl<S: Send + Sync + 'static> CommandHandler<S> for NoopHandler {
    async fn execute(&self, _ctx: &CommandContext<S>) -> Result<()> {
        Ok(())
    }
}

/// Capability check on the sender, scoping a command to one kind of sender
pub struct SenderType<S> {
    name: String,
    predicate: Arc<dyn Fn(&S) -> bool + Send + Sync>,
}

impl<S> SenderType<S> {
    pub fn new<F>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&S) -> bool + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            predicate: Arc::new(predicate),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn matches(&self, sender: &S) -> bool {
        (self.predicate)(sender)
    }
}

impl<S> Clone for SenderType<S> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            predicate: Arc::clone(&self.predicate),
        }
    }
}

impl<S> fmt::Debug for SenderType<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SenderType").field(&self.name).finish()
    }
}

/// An immutable, registered command definition
pub struct Command<S> {
    components: Vec<CommandComponent<S>>,
    permission: Permission,
    sender_type: Option<SenderType<S>>,
    handler: Arc<dyn CommandHandler<S>>,
    description: Option<String>,
    meta: CommandMeta,
}

impl<S: Send + Sync + 'static> Command<S> {
    pub fn builder(root: impl Into<String>) -> CommandBuilder<S> {
        CommandBuilder::new(root)
    }
}

impl<S> Command<S> {
    pub fn components(&self) -> &[CommandComponent<S>] {
        &self.components
    }

    /// The first literal's name
    pub fn root_name(&self) -> &str {
        self.components.first().map(|c| c.name()).unwrap_or_default()
    }

    pub fn permission(&self) -> &Permission {
        &self.permission
    }

    pub fn sender_type(&self) -> Option<&SenderType<S>> {
        self.sender_type.as_ref()
    }

    pub fn sender_type_name(&self) -> Option<&str> {
        self.sender_type.as_ref().map(SenderType::name)
    }

    /// Whether a sender passes the sender-type filter
    pub fn accepts_sender(&self, sender: &S) -> bool {
        self.sender_type.as_ref().is_none_or(|t| t.matches(sender))
    }

    pub fn handler(&self) -> &Arc<dyn CommandHandler<S>> {
        &self.handler
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn meta(&self) -> &CommandMeta {
        &self.meta
    }

    /// Usage string such as `give <amount> <item> [--silent]`
    pub fn syntax(&self) -> String {
        let parts: Vec<String> = self.components.iter().map(CommandComponent::syntax).collect();
        parts.join(" ")
    }
}

impl<S> fmt::Debug for Command<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Command")
            .field("syntax", &self.syntax())
            .field("permission", &self.permission)
            .field("sender_type", &self.sender_type)
            .field("meta", &self.meta)
            .finish()
    }
}

/// Fluent builder for [`Command`]
pub struct CommandBuilder<S> {
    components: Vec<CommandComponent<S>>,
    flags: Vec<CommandFlag<S>>,
    permission: Permission,
    sender_type: Option<SenderType<S>>,
    handler: Option<Arc<dyn CommandHandler<S>>>,
    description: Option<String>,
    meta: CommandMeta,
}

impl<S: Send + Sync + 'static> CommandBuilder<S> {
    /// Start a command at the root literal `root`
    pub fn new(root: impl Into<String>) -> Self {
        Self::with_root(CommandComponent::literal(root))
    }

    pub fn with_root(root: CommandComponent<S>) -> Self {
        Self {
            components: vec![root],
            flags: Vec::new(),
            permission: Permission::Empty,
            sender_type: None,
            handler: None,
            description: None,
            meta: CommandMeta::new(),
        }
    }

    pub fn literal(self, name: impl Into<String>) -> Self {
        self.component(CommandComponent::literal(name))
    }

    pub fn literal_with_aliases<I, A>(self, name: impl Into<String>, aliases: I) -> Self
    where
        I: IntoIterator<Item = A>,
        A: Into<String>,
    {
        self.component(CommandComponent::literal_with_aliases(name, aliases))
    }

    pub fn required<P: ArgumentParser<S>>(self, name: impl Into<String>, parser: P) -> Self {
        self.component(CommandComponent::required(name, parser))
    }

    pub fn optional<P: ArgumentParser<S>>(self, name: impl Into<String>, parser: P) -> Self {
        self.component(CommandComponent::optional(name, parser))
    }

    pub fn optional_with_default<P: ArgumentParser<S>>(
        self,
        name: impl Into<String>,
        parser: P,
        default: DefaultValue<S>,
    ) -> Self {
        self.component(CommandComponent::optional_with_default(name, parser, default))
    }

    pub fn component(mut self, component: CommandComponent<S>) -> Self {
        self.components.push(component);
        self
    }

    /// Add a flag; all flags of a command share one trailing flag component
    pub fn flag(mut self, flag: CommandFlag<S>) -> Self {
        self.flags.push(flag);
        self
    }

    pub fn permission(mut self, permission: impl Into<Permission>) -> Self {
        self.permission = permission.into();
        self
    }

    pub fn sender_type(mut self, sender_type: SenderType<S>) -> Self {
        self.sender_type = Some(sender_type);
        self
    }

    pub fn handler<H: CommandHandler<S> + 'static>(mut self, handler: H) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Handler from an async closure taking the resolved context
    pub fn handler_fn<F, Fut>(self, handler: F) -> Self
    where
        F: Fn(CommandContext<S>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        self.handler(FnHandler(handler))
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn meta<T: std::any::Any + Send + Sync>(mut self, key: MetaKey<T>, value: T) -> Self {
        self.meta.insert(key, value);
        self
    }

    /// Finish the definition. Structural checks happen at registration.
    pub fn build(self) -> Command<S> {
        let mut components = self.components;
        if !self.flags.is_empty() {
            components.push(CommandComponent::flags(self.flags));
        }
        Command {
            components,
            permission: self.permission,
            sender_type: self.sender_type,
            handler: self.handler.unwrap_or_else(|| Arc::new(NoopHandler)),
            description: self.description,
            meta: self.meta,
        }
    }
}
