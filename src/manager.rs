use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{Level, event, instrument};

use crate::command::{Command, CommandBuilder};
use crate::context::CommandContext;
use crate::coordinator::{ExecutionCoordinator, SimpleCoordinator};
use crate::error::{CommandError, Interrupted, ParseFailure, RegistrationError};
use crate::input::CommandInput;
use crate::parser::ParserRegistry;
use crate::permission::{AllowAll, PermissionChecker};
use crate::processor::{CommandPostprocessor, CommandPreprocessor};
use crate::router::{ResolvedCommand, route};
use crate::settings::ManagerSettings;
use crate::suggestion::{CompletionResult, Suggestions};
use crate::suggestion_engine::suggest;
use crate::tree::CommandTree;

/// Entry point tying together the command tree, permissions, parsers and
/// execution for senders of type `S`
pub struct CommandManager<S> {
    tree: CommandTree<S>,
    settings: ManagerSettings,
    permissions: Arc<dyn PermissionChecker<S>>,
    coordinator: Arc<dyn ExecutionCoordinator<S>>,
    parsers: ParserRegistry<S>,
    preprocessors: Vec<Arc<dyn CommandPreprocessor<S>>>,
    postprocessors: Vec<Arc<dyn CommandPostprocessor<S>>>,
}

impl<S: Send + Sync + 'static> Default for CommandManager<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Send + Sync + 'static> CommandManager<S> {
    /// Manager with default settings that grants every permission and runs
    /// handlers on the calling task
    pub fn new() -> Self {
        Self::with_settings(ManagerSettings::default())
    }

    pub fn with_settings(settings: ManagerSettings) -> Self {
        let mut tree = CommandTree::new();
        tree.set_case_insensitive_literals(settings.case_insensitive_literals);
        tree.set_override_existing_commands(settings.override_existing_commands);
        tree.set_allow_unsafe_registration(settings.allow_unsafe_registration);
        Self {
            tree,
            settings,
            permissions: Arc::new(AllowAll),
            coordinator: Arc::new(SimpleCoordinator),
            parsers: ParserRegistry::with_standard_parsers(),
            preprocessors: Vec::new(),
            postprocessors: Vec::new(),
        }
    }

    pub fn with_permission_checker<P: PermissionChecker<S> + 'static>(mut self, checker: P) -> Self {
        self.permissions = Arc::new(checker);
        self
    }

    pub fn with_coordinator<C: ExecutionCoordinator<S> + 'static>(mut self, coordinator: C) -> Self {
        self.coordinator = Arc::new(coordinator);
        self
    }

    pub fn settings(&self) -> &ManagerSettings {
        &self.settings
    }

    pub fn tree(&self) -> &CommandTree<S> {
        &self.tree
    }

    pub fn parsers(&self) -> &ParserRegistry<S> {
        &self.parsers
    }

    pub fn parsers_mut(&mut self) -> &mut ParserRegistry<S> {
        &mut self.parsers
    }

    /// Run `preprocessor` on every input before it is parsed or completed
    pub fn register_preprocessor<P: CommandPreprocessor<S> + 'static>(&mut self, preprocessor: P) {
        self.preprocessors.push(Arc::new(preprocessor));
    }

    /// Run `postprocessor` on every resolved command before it executes
    pub fn register_postprocessor<P: CommandPostprocessor<S> + 'static>(&mut self, postprocessor: P) {
        self.postprocessors.push(Arc::new(postprocessor));
    }

    /// Start a new command rooted at the literal `root`
    pub fn command_builder(&self, root: impl Into<String>) -> CommandBuilder<S> {
        CommandBuilder::new(root)
    }

    /// Register a command
    pub fn command(&mut self, command: Command<S>) -> Result<Arc<Command<S>>, RegistrationError> {
        self.tree.insert(command).inspect_err(|err| {
            event!(Level::WARN, error = %err, "Command registration rejected");
        })
    }

    pub fn remove_command(&mut self, command: &Arc<Command<S>>) -> Result<(), RegistrationError> {
        self.tree.remove(command)
    }

    /// Remove a root literal with every command below it
    pub fn delete_root_command(&mut self, name: &str) -> Result<Vec<Arc<Command<S>>>, RegistrationError> {
        self.tree.delete_root_command(name)
    }

    /// Stop accepting registrations
    pub fn lock_registration(&mut self) {
        event!(Level::DEBUG, "Locking command registration");
        self.tree.lock();
    }

    pub fn is_locked(&self) -> bool {
        self.tree.is_locked()
    }

    /// Names of the root literals
    pub fn root_commands(&self) -> Vec<&str> {
        self.tree.root_names()
    }

    /// Every registered command
    pub fn commands(&self) -> Vec<Arc<Command<S>>> {
        self.tree.commands()
    }

    fn context(&self, sender: Arc<S>) -> CommandContext<S> {
        CommandContext::from_arc(sender).with_permissions(Arc::clone(&self.permissions))
    }

    fn suggestion_context(&self, sender: Arc<S>) -> CommandContext<S> {
        CommandContext::for_suggestions(sender).with_permissions(Arc::clone(&self.permissions))
    }

    async fn preprocess(&self, ctx: &mut CommandContext<S>, input: &str) -> Result<(), Interrupted> {
        let input = CommandInput::new(input);
        for preprocessor in &self.preprocessors {
            preprocessor.preprocess(ctx, &input).await.inspect_err(|interrupted| {
                event!(Level::DEBUG, reason = %interrupted.reason, "Preprocessor interrupted input");
            })?;
        }
        Ok(())
    }

    /// Resolve `input` to a command and its parsed arguments
    #[instrument(level = "trace", skip(self, sender))]
    pub async fn parse(&self, sender: impl Into<Arc<S>>, input: &str) -> Result<ResolvedCommand<S>, ParseFailure> {
        let mut ctx = self.context(sender.into());
        self.preprocess(&mut ctx, input).await.map_err(ParseFailure::Interrupted)?;
        let result = route(&self.tree, ctx, input).await;
        if let Err(failure) = &result {
            event!(Level::DEBUG, failure = %failure, "Parse failed");
        }
        result
    }

    /// Suggestions for the token under `cursor` (a byte offset into `input`)
    #[instrument(level = "trace", skip(self, sender))]
    pub async fn suggest(&self, sender: impl Into<Arc<S>>, input: &str, cursor: usize) -> Suggestions {
        let mut ctx = self.suggestion_context(sender.into());
        if self.preprocess(&mut ctx, input).await.is_err() {
            let (start, end) = CommandInput::new(input).token_bounds(cursor);
            return Suggestions::empty(input, start, end);
        }
        suggest(&self.tree, ctx, input, cursor, &self.settings).await
    }

    /// Like [`CommandManager::suggest`], giving up with `None` once `token`
    /// is cancelled
    pub async fn suggest_cancellable(
        &self,
        sender: impl Into<Arc<S>>,
        input: &str,
        cursor: usize,
        token: CancellationToken,
    ) -> Option<Suggestions> {
        tokio::select! {
            biased;
            _ = token.cancelled() => {
                event!(Level::DEBUG, input, "Suggestion request cancelled");
                None
            }
            suggestions = self.suggest(sender, input, cursor) => Some(suggestions),
        }
    }

    /// Suggestions for a completion key press at the end of `input`
    pub async fn trigger_completion(&self, sender: impl Into<Arc<S>>, input: &str) -> CompletionResult {
        self.suggest(sender, input, input.len()).await.completion_result()
    }

    /// Parse `input` and hand the result to the execution coordinator
    #[instrument(level = "trace", skip(self, sender))]
    pub async fn execute(&self, sender: impl Into<Arc<S>>, input: &str) -> Result<(), CommandError> {
        let (command, mut ctx) = self.parse(sender, input).await?.into_parts();
        for postprocessor in &self.postprocessors {
            postprocessor.postprocess(&command, &mut ctx).await.inspect_err(|interrupted| {
                event!(Level::DEBUG, reason = %interrupted.reason, syntax = %command.syntax(), "Postprocessor interrupted command");
            })?;
        }
        event!(Level::DEBUG, syntax = %command.syntax(), "Dispatching command");
        self.coordinator.coordinate(command, ctx).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{IntegerParser, StringParser};
    use std::sync::atomic::{AtomicI64, Ordering};

    #[tokio::test]
    async fn test_execute_runs_handler() {
        let total = Arc::new(AtomicI64::new(0));
        let seen = Arc::clone(&total);

        let mut manager = CommandManager::<()>::new();
        let command = manager
            .command_builder("add")
            .required("n", IntegerParser::new())
            .handler_fn(move |ctx| {
                let seen = Arc::clone(&seen);
                async move {
                    seen.fetch_add(ctx.get_or::<i64>("n", 0), Ordering::SeqCst);
                    anyhow::Ok(())
                }
            })
            .build();
        manager.command(command).unwrap();

        manager.execute((), "add 5").await.unwrap();
        manager.execute((), "add 2").await.unwrap();
        assert_eq!(total.load(Ordering::SeqCst), 7);

        let err = manager.execute((), "add x").await.unwrap_err();
        assert!(matches!(err, CommandError::Parse(ParseFailure::ArgumentParse { .. })));
    }

    #[tokio::test]
    async fn test_settings_reach_tree() {
        let settings = ManagerSettings {
            case_insensitive_literals: true,
            ..ManagerSettings::default()
        };
        let mut manager = CommandManager::<()>::with_settings(settings);
        let command = manager.command_builder("Say").required("text", StringParser::greedy()).build();
        manager.command(command).unwrap();

        let resolved = manager.parse((), "SAY hello there").await.unwrap();
        assert_eq!(resolved.context().get::<String>("text").map(String::as_str), Some("hello there"));
    }

    #[tokio::test]
    async fn test_lock_registration() {
        let mut manager = CommandManager::<()>::new();
        manager.lock_registration();
        assert!(manager.is_locked());
        let command = manager.command_builder("late").build();
        assert_eq!(manager.command(command).unwrap_err(), RegistrationError::TreeLocked);
    }

    #[tokio::test]
    async fn test_processors_can_interrupt() {
        use crate::meta::MetaKey;
        const DISABLED: MetaKey<bool> = MetaKey::new("disabled");

        let mut manager = CommandManager::<()>::new();
        manager.command(manager.command_builder("ping").build()).unwrap();
        manager.command(manager.command_builder("halt").meta(DISABLED, true).build()).unwrap();
        manager.register_preprocessor(|_ctx: &mut CommandContext<()>, input: &CommandInput| {
            if input.input().starts_with('/') {
                Err(Interrupted::new("slash prefix"))
            } else {
                Ok(())
            }
        });
        manager.register_postprocessor(|command: &Command<()>, _ctx: &mut CommandContext<()>| {
            if command.meta().get_or(DISABLED, false) {
                Err(Interrupted::new("disabled"))
            } else {
                Ok(())
            }
        });

        assert!(manager.execute((), "ping").await.is_ok());
        assert_eq!(
            manager.parse((), "/ping").await.unwrap_err(),
            ParseFailure::Interrupted(Interrupted::new("slash prefix"))
        );
        assert!(manager.suggest((), "/p", 2).await.is_empty());

        // postprocessors only gate execution
        assert!(manager.parse((), "halt").await.is_ok());
        let err = manager.execute((), "halt").await.unwrap_err();
        assert!(matches!(err, CommandError::Interrupted(i) if i.reason == "disabled"));
    }

    #[tokio::test]
    async fn test_cancelled_suggestions() {
        let mut manager = CommandManager::<()>::new();
        manager.command(manager.command_builder("ping").build()).unwrap();

        let token = CancellationToken::new();
        token.cancel();
        assert!(manager.suggest_cancellable((), "p", 1, token).await.is_none());

        let live = manager.suggest_cancellable((), "p", 1, CancellationToken::new()).await;
        assert_eq!(live.unwrap().values(), vec!["ping"]);
    }
}
