use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::command::Command;
use crate::context::CommandContext;
use crate::error::ExecutionError;

/// Decides where and when a resolved command's handler runs
#[async_trait]
pub trait ExecutionCoordinator<S>: Send + Sync {
    async fn coordinate(&self, command: Arc<Command<S>>, ctx: CommandContext<S>) -> Result<(), ExecutionError>;
}

/// Runs handlers on the calling task
#[derive(Clone, Copy, Debug, Default)]
pub struct SimpleCoordinator;

#[async_trait]
impl<S: Send + Sync + 'static> ExecutionCoordinator<S> for SimpleCoordinator {
    async fn coordinate(&self, command: Arc<Command<S>>, ctx: CommandContext<S>) -> Result<(), ExecutionError> {
        debug!(syntax = %command.syntax(), "Executing command");
        command.handler().execute(&ctx).await.map_err(|err| {
            warn!(syntax = %command.syntax(), error = %err, "Command handler failed");
            ExecutionError::Handler(err)
        })
    }
}

/// Spawns each handler onto the tokio runtime and waits for it
#[derive(Clone, Copy, Debug, Default)]
pub struct TaskCoordinator;

#[async_trait]
impl<S: Send + Sync + 'static> ExecutionCoordinator<S> for TaskCoordinator {
    async fn coordinate(&self, command: Arc<Command<S>>, ctx: CommandContext<S>) -> Result<(), ExecutionError> {
        let syntax = command.syntax();
        debug!(syntax = %syntax, "Spawning command");
        let task = tokio::spawn(async move { command.handler().execute(&ctx).await });

        match task.await {
            Ok(result) => result.map_err(|err| {
                warn!(syntax = %syntax, error = %err, "Command handler failed");
                ExecutionError::Handler(err)
            }),
            Err(join) => {
                warn!(syntax = %syntax, error = %join, "Command task failed");
                Err(ExecutionError::Join(join.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandBuilder;

    fn failing() -> Arc<Command<()>> {
        Arc::new(
            CommandBuilder::new("fail")
                .handler_fn(|_ctx| async { Err::<(), _>(anyhow::anyhow!("boom")) })
                .build(),
        )
    }

    fn panicking() -> Arc<Command<()>> {
        Arc::new(
            CommandBuilder::new("panic")
                .handler_fn(|ctx: CommandContext<()>| async move {
                    assert!(ctx.contains("never"), "handler panicked");
                    anyhow::Ok(())
                })
                .build(),
        )
    }

    #[tokio::test]
    async fn test_simple_coordinator_wraps_handler_error() {
        let err = SimpleCoordinator
            .coordinate(failing(), CommandContext::new(()))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::Handler(ref e) if e.to_string() == "boom"));
    }

    #[tokio::test]
    async fn test_task_coordinator_reports_panics() {
        let err = TaskCoordinator
            .coordinate(panicking(), CommandContext::new(()))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::Join(_)));

        let ok = CommandBuilder::<()>::new("ok").build();
        assert!(TaskCoordinator.coordinate(Arc::new(ok), CommandContext::new(())).await.is_ok());
    }
}
