use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::permission::{Permission, PermissionChecker};

/// Type-erased parsed value as stored in a context
pub type ArgumentValue = Arc<dyn Any + Send + Sync>;

/// Flags seen during the flag post-pass
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FlagContext {
    present: HashMap<String, usize>,
}

impl FlagContext {
    pub fn is_present(&self, name: &str) -> bool {
        self.present.contains_key(name)
    }

    /// How many times a flag was given (repeatable flags may exceed one)
    pub fn count(&self, name: &str) -> usize {
        self.present.get(name).copied().unwrap_or(0)
    }

    pub(crate) fn mark(&mut self, name: &str) -> usize {
        let count = self.present.entry(name.to_string()).or_insert(0);
        *count += 1;
        *count
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.present.keys().map(String::as_str)
    }
}

/// Accumulating store for one parse attempt
///
/// Holds the invoking sender, parsed argument values, internal metadata that
/// parsers use to share state between arguments, and the raw substring each
/// argument consumed.
pub struct CommandContext<S> {
    sender: Arc<S>,
    values: HashMap<String, ArgumentValue>,
    meta: HashMap<String, ArgumentValue>,
    consumed: HashMap<String, String>,
    flags: FlagContext,
    suggestions: bool,
    permissions: Option<Arc<dyn PermissionChecker<S>>>,
}

impl<S> CommandContext<S> {
    pub fn new(sender: S) -> Self {
        Self::from_arc(Arc::new(sender))
    }

    pub fn from_arc(sender: Arc<S>) -> Self {
        Self {
            sender,
            values: HashMap::new(),
            meta: HashMap::new(),
            consumed: HashMap::new(),
            flags: FlagContext::default(),
            suggestions: false,
            permissions: None,
        }
    }

    /// Attach the permission predicate consulted during traversal
    pub fn with_permissions(mut self, checker: Arc<dyn PermissionChecker<S>>) -> Self {
        self.permissions = Some(checker);
        self
    }

    /// Check a permission for the sender; contexts without a checker grant all
    pub fn has_permission(&self, permission: &Permission) -> bool {
        match &self.permissions {
            Some(checker) => permission.evaluate(self.sender(), checker.as_ref()),
            None => true,
        }
    }

    /// Context used while computing suggestions
    pub fn for_suggestions(sender: Arc<S>) -> Self {
        let mut ctx = Self::from_arc(sender);
        ctx.suggestions = true;
        ctx
    }

    pub fn sender(&self) -> &S {
        &self.sender
    }

    pub fn sender_arc(&self) -> Arc<S> {
        Arc::clone(&self.sender)
    }

    /// True while the context belongs to a suggestion pass
    pub fn is_suggestions(&self) -> bool {
        self.suggestions
    }

    /// Store a typed value, replacing any previous value under `key`
    pub fn store<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.values.insert(key.into(), Arc::new(value));
    }

    pub fn store_value(&mut self, key: impl Into<String>, value: ArgumentValue) {
        self.values.insert(key.into(), value);
    }

    /// Get a parsed value if present and of type `T`
    pub fn get<T: Any>(&self, key: &str) -> Option<&T> {
        self.values.get(key).and_then(|value| (**value).downcast_ref::<T>())
    }

    pub fn get_or<T: Any + Clone>(&self, key: &str, fallback: T) -> T {
        self.get::<T>(key).cloned().unwrap_or(fallback)
    }

    pub fn get_value(&self, key: &str) -> Option<ArgumentValue> {
        self.values.get(key).cloned()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<ArgumentValue> {
        self.consumed.remove(key);
        self.values.remove(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn set_meta<T: Any + Send + Sync>(&mut self, key: impl Into<String>, value: T) {
        self.meta.insert(key.into(), Arc::new(value));
    }

    pub fn meta<T: Any>(&self, key: &str) -> Option<&T> {
        self.meta.get(key).and_then(|value| (**value).downcast_ref::<T>())
    }

    pub fn flags(&self) -> &FlagContext {
        &self.flags
    }

    pub(crate) fn flags_mut(&mut self) -> &mut FlagContext {
        &mut self.flags
    }

    /// Raw input an argument consumed, trimmed
    pub fn consumed_input(&self, key: &str) -> Option<&str> {
        self.consumed.get(key).map(String::as_str)
    }

    pub(crate) fn record_consumed(&mut self, key: &str, input: &str) {
        self.consumed.insert(key.to_string(), input.to_string());
    }
}

impl<S> Clone for CommandContext<S> {
    fn clone(&self) -> Self {
        Self {
            sender: Arc::clone(&self.sender),
            values: self.values.clone(),
            meta: self.meta.clone(),
            consumed: self.consumed.clone(),
            flags: self.flags.clone(),
            suggestions: self.suggestions,
            permissions: self.permissions.clone(),
        }
    }
}

impl<S> fmt::Debug for CommandContext<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<_> = self.values.keys().collect();
        keys.sort();
        f.debug_struct("CommandContext")
            .field("values", &keys)
            .field("flags", &self.flags)
            .field("suggestions", &self.suggestions)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_access() {
        let mut ctx = CommandContext::new("console");
        ctx.store("amount", 10i64);
        ctx.store("item", "sword".to_string());

        assert_eq!(ctx.get::<i64>("amount"), Some(&10));
        assert_eq!(ctx.get::<String>("amount"), None);
        assert_eq!(ctx.get_or::<i64>("missing", 20), 20);
        assert_eq!(*ctx.sender(), "console");
    }

    #[test]
    fn test_clone_is_independent() {
        let mut ctx = CommandContext::new(());
        ctx.store("a", 1u8);
        let mut copy = ctx.clone();
        copy.store("b", 2u8);
        copy.flags_mut().mark("silent");

        assert!(!ctx.contains("b"));
        assert!(!ctx.flags().is_present("silent"));
        assert_eq!(copy.flags().count("silent"), 1);
    }

    #[test]
    fn test_permission_checker() {
        let checker = |sender: &&str, permission: &str| *sender == "admin" || permission == "open";
        let ctx = CommandContext::new("user").with_permissions(Arc::new(checker));

        assert!(ctx.has_permission(&Permission::of("open")));
        assert!(!ctx.has_permission(&Permission::of("closed")));
        assert!(CommandContext::new(()).has_permission(&Permission::of("closed")));
    }

    #[test]
    fn test_remove_clears_consumed() {
        let mut ctx = CommandContext::new(());
        ctx.store("target", "bob".to_string());
        ctx.record_consumed("target", "bob");
        ctx.remove("target");
        assert_eq!(ctx.consumed_input("target"), None);
    }
}
