use std::borrow::Cow;
use std::fmt;

/// Why an argument parser rejected its input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorReason {
    /// Input ran out before the parser could read its token(s)
    NoInputProvided,

    /// Token could not be converted to the parser's type
    InvalidFormat,

    /// Numeric value outside of the configured range
    OutOfRange,

    /// Token did not name any known value
    UnknownValue,

    /// Parser only implements the asynchronous variant
    AsyncOnly,

    /// Token in flag position names no registered flag
    UnknownFlag,

    /// Non-repeatable flag given more than once
    DuplicateFlag,

    /// Value flag given without a value
    MissingFlagValue,

    /// Sender lacks the permission attached to a flag
    NoFlagPermission,

    /// Token was rejected by a component preprocessor's pattern
    PatternMismatch,

    /// Parser-specific failure
    Custom(String),
}

impl fmt::Display for ParseErrorReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseErrorReason::NoInputProvided => write!(f, "no input provided"),
            ParseErrorReason::InvalidFormat => write!(f, "invalid format"),
            ParseErrorReason::OutOfRange => write!(f, "out of range"),
            ParseErrorReason::UnknownValue => write!(f, "unknown value"),
            ParseErrorReason::AsyncOnly => write!(f, "parser requires asynchronous parsing"),
            ParseErrorReason::UnknownFlag => write!(f, "unknown flag"),
            ParseErrorReason::DuplicateFlag => write!(f, "duplicate flag"),
            ParseErrorReason::MissingFlagValue => write!(f, "missing flag value"),
            ParseErrorReason::NoFlagPermission => write!(f, "no permission for flag"),
            ParseErrorReason::PatternMismatch => write!(f, "does not match the expected pattern"),
            ParseErrorReason::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

/// Structured failure produced by an argument parser.
///
/// Carries the offending input, the parser identity and any parser supplied
/// key/value context (for example the valid range) so that a caption layer
/// can render it. Nothing here is meant to be shown to users verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentParseError {
    pub parser: Cow<'static, str>,
    pub input: String,
    pub reason: ParseErrorReason,
    pub context: Vec<(String, String)>,
}

impl ArgumentParseError {
    pub fn new(
        parser: impl Into<Cow<'static, str>>,
        input: impl Into<String>,
        reason: ParseErrorReason,
    ) -> Self {
        Self {
            parser: parser.into(),
            input: input.into(),
            reason,
            context: Vec::new(),
        }
    }

    pub fn no_input(parser: impl Into<Cow<'static, str>>) -> Self {
        Self::new(parser, "", ParseErrorReason::NoInputProvided)
    }

    /// Attach a piece of caption context
    pub fn with_context(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.context.push((key.into(), value.to_string()));
        self
    }

    /// Look up a caption context value
    pub fn context_value(&self, key: &str) -> Option<&str> {
        self.context
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for ArgumentParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed to parse '{}': {}", self.parser, self.input, self.reason)?;
        for (key, value) in &self.context {
            write!(f, " [{}={}]", key, value)?;
        }
        Ok(())
    }
}

impl std::error::Error for ArgumentParseError {}

/// Outcome of routing raw input through the command tree when no command
/// could be resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseFailure {
    /// First token matched no root literal or root argument
    NoSuchCommand { token: String },

    /// Input does not fit the structure below a matched prefix
    InvalidSyntax { input: String, expected: Vec<String> },

    /// Argument parser rejected its input
    ArgumentParse { argument: String, cause: ArgumentParseError },

    /// Sender lacks the permission for the branch it reached
    NoPermission { permission: String },

    /// A terminal command matched but the sender type check failed
    InvalidSender { required: Vec<String> },

    /// A command preprocessor stopped the input before routing
    Interrupted(Interrupted),
}

impl fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseFailure::NoSuchCommand { token } => write!(f, "No such command: {}", token),
            ParseFailure::InvalidSyntax { input, expected } => {
                write!(f, "Invalid syntax at '{}', expected one of [{}]", input, expected.join(", "))
            }
            ParseFailure::ArgumentParse { argument, cause } => {
                write!(f, "Invalid argument '{}': {}", argument, cause)
            }
            ParseFailure::NoPermission { permission } => {
                write!(f, "Missing permission: {}", permission)
            }
            ParseFailure::InvalidSender { required } => {
                write!(f, "Sender must be one of [{}]", required.join(", "))
            }
            ParseFailure::Interrupted(interrupted) => write!(f, "{}", interrupted),
        }
    }
}

impl std::error::Error for ParseFailure {}

/// Raised by a command pre- or postprocessor to stop processing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interrupted {
    pub reason: String,
}

impl Interrupted {
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }
}

impl fmt::Display for Interrupted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Command processing interrupted: {}", self.reason)
    }
}

impl std::error::Error for Interrupted {}

/// Errors raised while registering or removing commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// Command has no components
    EmptyCommand,

    /// Two argument children would share one node
    AmbiguousNode { node: String, existing: String, conflicting: String },

    /// Literal name or alias collides with a sibling literal
    DuplicateAlias { node: String, alias: String },

    /// Same path and sender type already registered
    DuplicateCommand { path: String },

    /// Required component declared after an optional one
    RequiredAfterOptional { path: String, component: String },

    /// Component declared after a greedy argument
    UnreachableAfterGreedy { path: String, component: String },

    /// Flag child at a node conflicts with the flags being registered
    ConflictingFlags { path: String },

    /// Two arguments or flags of one command store under the same key
    DuplicateKey { path: String, key: String },

    /// Tree was locked against further mutation
    TreeLocked,

    /// Command was not registered
    UnknownCommand(String),
}

impl fmt::Display for RegistrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegistrationError::EmptyCommand => write!(f, "Command has no components"),
            RegistrationError::AmbiguousNode { node, existing, conflicting } => write!(
                f,
                "Ambiguous node '{}': argument '{}' conflicts with existing argument '{}'",
                node, conflicting, existing
            ),
            RegistrationError::DuplicateAlias { node, alias } => {
                write!(f, "Literal '{}' below '{}' is already registered", alias, node)
            }
            RegistrationError::DuplicateCommand { path } => {
                write!(f, "Command '{}' is already registered", path)
            }
            RegistrationError::RequiredAfterOptional { path, component } => write!(
                f,
                "Required component '{}' follows an optional one in '{}'",
                component, path
            ),
            RegistrationError::UnreachableAfterGreedy { path, component } => write!(
                f,
                "Component '{}' follows a greedy argument in '{}'",
                component, path
            ),
            RegistrationError::ConflictingFlags { path } => {
                write!(f, "Conflicting flag sets registered for '{}'", path)
            }
            RegistrationError::DuplicateKey { path, key } => {
                write!(f, "Key '{}' is used by more than one component of '{}'", key, path)
            }
            RegistrationError::TreeLocked => write!(f, "Command tree is locked"),
            RegistrationError::UnknownCommand(path) => write!(f, "Unknown command: {}", path),
        }
    }
}

impl std::error::Error for RegistrationError {}

/// Errors produced once a command has been handed to the coordinator
#[derive(Debug)]
pub enum ExecutionError {
    /// Handler returned an error
    Handler(anyhow::Error),

    /// Spawned execution task panicked or was cancelled
    Join(String),
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExecutionError::Handler(err) => write!(f, "Command handler failed: {}", err),
            ExecutionError::Join(msg) => write!(f, "Command task failed: {}", msg),
        }
    }
}

impl std::error::Error for ExecutionError {}

/// Errors that can occur during command execution
#[derive(Debug)]
pub enum CommandError {
    /// Input did not resolve to a command
    Parse(ParseFailure),

    /// Command resolved but a postprocessor refused to run it
    Interrupted(Interrupted),

    /// Command resolved but failed while executing
    Execution(ExecutionError),
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandError::Parse(err) => write!(f, "Parse error: {}", err),
            CommandError::Interrupted(err) => write!(f, "{}", err),
            CommandError::Execution(err) => write!(f, "Execution error: {}", err),
        }
    }
}

impl std::error::Error for CommandError {}

impl From<ParseFailure> for CommandError {
    fn from(err: ParseFailure) -> Self {
        CommandError::Parse(err)
    }
}

impl From<Interrupted> for CommandError {
    fn from(err: Interrupted) -> Self {
        CommandError::Interrupted(err)
    }
}

impl From<ExecutionError> for CommandError {
    fn from(err: ExecutionError) -> Self {
        CommandError::Execution(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_context() {
        let err = ArgumentParseError::new("integer", "99", ParseErrorReason::OutOfRange)
            .with_context("min", 1)
            .with_context("max", 64);

        assert_eq!(err.context_value("max"), Some("64"));
        assert_eq!(err.context_value("step"), None);
        assert_eq!(err.to_string(), "integer failed to parse '99': out of range [min=1] [max=64]");
    }

    #[test]
    fn test_command_error_from_failure() {
        let err: CommandError = ParseFailure::NoSuchCommand { token: "giv".into() }.into();
        assert!(matches!(err, CommandError::Parse(ParseFailure::NoSuchCommand { .. })));
    }
}
