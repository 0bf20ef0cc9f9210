//! Platform-agnostic command tree parsing and suggestions.
//!
//! Commands are registered as paths of literals, typed arguments and flags
//! into a [`CommandTree`]. A [`CommandManager`] resolves raw input to exactly
//! one command with its parsed values, computes completions for a partial
//! input at a cursor, and hands resolved commands to an
//! [`ExecutionCoordinator`].

extern crate self as cmdtree;

pub mod cache;
pub mod command;
pub mod component;
pub mod context;
pub mod coordinator;
pub mod error;
pub mod input;
pub mod manager;
pub mod meta;
pub mod parser;
pub mod permission;
pub mod processor;
pub mod router;
pub mod settings;
pub mod suggestion;
mod suggestion_engine;
pub mod tree;

// Re-export main types
pub use cache::CachedSuggestions;
pub use command::{Command, CommandBuilder, CommandHandler, FnHandler, NoopHandler, SenderType};
pub use component::{CommandComponent, ComponentKind, DefaultValue};
pub use context::{ArgumentValue, CommandContext, FlagContext};
pub use coordinator::{ExecutionCoordinator, SimpleCoordinator, TaskCoordinator};
pub use error::{
    ArgumentParseError, CommandError, ExecutionError, Interrupted, ParseErrorReason, ParseFailure, RegistrationError,
};
pub use input::CommandInput;
pub use manager::CommandManager;
pub use meta::{CommandMeta, MetaKey};
pub use parser::{
    ArgumentParser, ArgumentParserExt, CommandEnum, CommandFlag, ComponentPreprocessor, DynParser, EnumParser,
    ParseResult, ParserRegistry, RegexPreprocessor, SuggestionProvider,
};
pub use permission::{AllowAll, Permission, PermissionChecker};
pub use processor::{CommandPostprocessor, CommandPreprocessor};
pub use router::ResolvedCommand;
pub use settings::ManagerSettings;
pub use suggestion::{CompletionResult, Suggestion, Suggestions, dedup_suggestions, filter_suggestions};
pub use tree::{CommandNode, CommandTree};

// Re-export from macros crate
pub use cmdtree_macros::command_enum;

// Re-export async_trait for implementing parsers and handlers
pub use async_trait;
