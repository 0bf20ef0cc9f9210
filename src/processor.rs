//! Hooks the manager runs around routing and execution.
//!
//! Preprocessors see the raw input before it is routed, for both parsing and
//! suggestions, and may stash metadata in the context. Postprocessors see the
//! resolved command right before it is handed to the coordinator. Either can
//! stop the pipeline by returning [`Interrupted`].

use async_trait::async_trait;

use crate::command::Command;
use crate::context::CommandContext;
use crate::error::Interrupted;
use crate::input::CommandInput;

#[async_trait]
pub trait CommandPreprocessor<S>: Send + Sync {
    async fn preprocess(&self, ctx: &mut CommandContext<S>, input: &CommandInput) -> Result<(), Interrupted>;
}

#[async_trait]
impl<S, F> CommandPreprocessor<S> for F
where
    S: Send + Sync + 'static,
    F: Fn(&mut CommandContext<S>, &CommandInput) -> Result<(), Interrupted> + Send + Sync,
{
    async fn preprocess(&self, ctx: &mut CommandContext<S>, input: &CommandInput) -> Result<(), Interrupted> {
        self(ctx, input)
    }
}

#[async_trait]
pub trait CommandPostprocessor<S>: Send + Sync {
    async fn postprocess(&self, command: &Command<S>, ctx: &mut CommandContext<S>) -> Result<(), Interrupted>;
}

#[async_trait]
impl<S, F> CommandPostprocessor<S> for F
where
    S: Send + Sync + 'static,
    F: Fn(&Command<S>, &mut CommandContext<S>) -> Result<(), Interrupted> + Send + Sync,
{
    async fn postprocess(&self, command: &Command<S>, ctx: &mut CommandContext<S>) -> Result<(), Interrupted> {
        self(command, ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandBuilder;
    use crate::meta::MetaKey;

    const LOCKED: MetaKey<bool> = MetaKey::new("locked");

    #[tokio::test]
    async fn test_closure_preprocessor_tags_context() {
        let tag = |ctx: &mut CommandContext<()>, input: &CommandInput| {
            if input.input().starts_with('#') {
                return Err(Interrupted::new("comment"));
            }
            ctx.set_meta("length", input.input().len());
            Ok(())
        };

        let mut ctx = CommandContext::new(());
        tag.preprocess(&mut ctx, &CommandInput::new("ping 3")).await.unwrap();
        assert_eq!(ctx.meta::<usize>("length"), Some(&6));

        let err = tag.preprocess(&mut ctx, &CommandInput::new("# note")).await.unwrap_err();
        assert_eq!(err, Interrupted::new("comment"));
    }

    #[tokio::test]
    async fn test_closure_postprocessor_reads_meta() {
        let guard = |command: &Command<()>, _ctx: &mut CommandContext<()>| {
            if command.meta().get_or(LOCKED, false) {
                Err(Interrupted::new("locked"))
            } else {
                Ok(())
            }
        };

        let mut ctx = CommandContext::new(());
        let open = CommandBuilder::<()>::new("open").build();
        let vault = CommandBuilder::<()>::new("vault").meta(LOCKED, true).build();
        assert!(guard.postprocess(&open, &mut ctx).await.is_ok());
        assert!(guard.postprocess(&vault, &mut ctx).await.is_err());
    }
}
