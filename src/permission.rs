use std::fmt;

use serde::{Deserialize, Serialize};

/// Permission required to reach a command or flag
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Permission {
    /// Always granted
    #[default]
    Empty,

    /// Single permission string checked by the host
    Node(String),

    /// Granted when any member is granted
    AnyOf(Vec<Permission>),

    /// Granted when every member is granted
    AllOf(Vec<Permission>),
}

impl Permission {
    pub fn of(permission: impl Into<String>) -> Self {
        let permission = permission.into();
        if permission.is_empty() {
            Permission::Empty
        } else {
            Permission::Node(permission)
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Permission::Empty)
    }

    /// Evaluate against the host's permission predicate
    pub fn evaluate<S>(&self, sender: &S, checker: &dyn PermissionChecker<S>) -> bool {
        match self {
            Permission::Empty => true,
            Permission::Node(node) => checker.has_permission(sender, node),
            Permission::AnyOf(members) => members.iter().any(|p| p.evaluate(sender, checker)),
            Permission::AllOf(members) => members.iter().all(|p| p.evaluate(sender, checker)),
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Permission::Empty => Ok(()),
            Permission::Node(node) => write!(f, "{}", node),
            Permission::AnyOf(members) | Permission::AllOf(members) => {
                let sep = if matches!(self, Permission::AnyOf(_)) { "|" } else { "," };
                let parts: Vec<String> = members.iter().map(ToString::to_string).collect();
                write!(f, "({})", parts.join(sep))
            }
        }
    }
}

impl From<&str> for Permission {
    fn from(value: &str) -> Self {
        Permission::of(value)
    }
}

impl From<String> for Permission {
    fn from(value: String) -> Self {
        Permission::of(value)
    }
}

/// Host-supplied predicate deciding whether a sender holds a permission string
pub trait PermissionChecker<S>: Send + Sync {
    fn has_permission(&self, sender: &S, permission: &str) -> bool;
}

impl<S, F> PermissionChecker<S> for F
where
    F: Fn(&S, &str) -> bool + Send + Sync,
{
    fn has_permission(&self, sender: &S, permission: &str) -> bool {
        self(sender, permission)
    }
}

/// Grants every permission
#[derive(Clone, Copy, Debug, Default)]
pub struct AllowAll;

impl<S> PermissionChecker<S> for AllowAll {
    fn has_permission(&self, _sender: &S, _permission: &str) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checker(sender: &Vec<&'static str>, permission: &str) -> bool {
        sender.iter().any(|p| *p == permission)
    }

    #[test]
    fn test_evaluate_compound() {
        let sender = vec!["cmd.give"];
        let any = Permission::AnyOf(vec!["cmd.admin".into(), "cmd.give".into()]);
        let all = Permission::AllOf(vec!["cmd.admin".into(), "cmd.give".into()]);

        assert!(any.evaluate(&sender, &checker));
        assert!(!all.evaluate(&sender, &checker));
        assert!(Permission::Empty.evaluate(&sender, &checker));
        assert_eq!(any.to_string(), "(cmd.admin|cmd.give)");
    }

    #[test]
    fn test_empty_string_is_empty_permission() {
        assert!(Permission::of("").is_empty());
        assert!(AllowAll.has_permission(&(), "anything"));
    }
}
