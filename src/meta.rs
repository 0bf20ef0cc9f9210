use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::context::ArgumentValue;

/// Name of a [`CommandMeta`] entry together with the type stored under it
pub struct MetaKey<T> {
    name: &'static str,
    _type: PhantomData<fn() -> T>,
}

impl<T> MetaKey<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _type: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for MetaKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for MetaKey<T> {}

impl<T> fmt::Debug for MetaKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MetaKey").field(&self.name).finish()
    }
}

/// Typed metadata attached to a command at build time and read back by
/// postprocessors or the host
#[derive(Clone, Default)]
pub struct CommandMeta {
    values: HashMap<&'static str, ArgumentValue>,
}

impl CommandMeta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert<T: Any + Send + Sync>(&mut self, key: MetaKey<T>, value: T) {
        self.values.insert(key.name, Arc::new(value));
    }

    pub fn with<T: Any + Send + Sync>(mut self, key: MetaKey<T>, value: T) -> Self {
        self.insert(key, value);
        self
    }

    /// `None` when absent or stored with another type
    pub fn get<T: Any>(&self, key: MetaKey<T>) -> Option<&T> {
        self.values.get(key.name).and_then(|value| value.downcast_ref::<T>())
    }

    pub fn get_or<T: Any + Clone>(&self, key: MetaKey<T>, fallback: T) -> T {
        self.get(key).cloned().unwrap_or(fallback)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl fmt::Debug for CommandMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut keys: Vec<&str> = self.values.keys().copied().collect();
        keys.sort_unstable();
        f.debug_set().entries(keys).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COOLDOWN: MetaKey<u64> = MetaKey::new("cooldown");
    const HIDDEN: MetaKey<bool> = MetaKey::new("hidden");

    #[test]
    fn test_typed_lookup() {
        let meta = CommandMeta::new().with(COOLDOWN, 30).with(HIDDEN, true);
        assert_eq!(meta.get(COOLDOWN), Some(&30));
        assert!(meta.get_or(HIDDEN, false));
        assert!(meta.contains("cooldown"));
        assert_eq!(format!("{:?}", meta), r#"{"cooldown", "hidden"}"#);
    }

    #[test]
    fn test_type_mismatch_reads_as_absent() {
        let wrong: MetaKey<String> = MetaKey::new("cooldown");
        let meta = CommandMeta::new().with(COOLDOWN, 30);
        assert_eq!(meta.get(wrong), None);
        assert!(!meta.get_or(HIDDEN, false));
        assert!(CommandMeta::new().is_empty());
    }
}
