//! The command tree.
//!
//! Every registered command is a path from one of the root's children down
//! to a terminal node. Siblings are kept ordered by [`CommandComponent::rank`]:
//! literals first (in registration order), then at most one argument, then at
//! most one flag group. That ordering is what the router and the suggestion
//! engine rely on for deterministic literal-before-argument evaluation.

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::command::Command;
use crate::component::{CommandComponent, ComponentKind};
use crate::context::CommandContext;
use crate::error::RegistrationError;
use crate::parser::CommandFlag;

/// One node of the tree; the root has no component
pub struct CommandNode<S> {
    component: Option<CommandComponent<S>>,
    children: Vec<CommandNode<S>>,
    commands: Vec<Arc<Command<S>>>,
}

impl<S> CommandNode<S> {
    fn root() -> Self {
        Self {
            component: None,
            children: Vec::new(),
            commands: Vec::new(),
        }
    }

    fn new(component: CommandComponent<S>) -> Self {
        Self {
            component: Some(component),
            children: Vec::new(),
            commands: Vec::new(),
        }
    }

    pub fn component(&self) -> Option<&CommandComponent<S>> {
        self.component.as_ref()
    }

    pub fn children(&self) -> &[CommandNode<S>] {
        &self.children
    }

    /// Commands terminating here, one per sender type
    pub fn commands(&self) -> &[Arc<Command<S>>] {
        &self.commands
    }

    pub fn is_terminal(&self) -> bool {
        !self.commands.is_empty()
    }

    pub fn is_root(&self) -> bool {
        self.component.is_none()
    }

    /// Display name for failures
    pub fn name(&self) -> &str {
        self.component.as_ref().map(CommandComponent::name).unwrap_or("<root>")
    }

    pub fn literal_children(&self) -> impl Iterator<Item = &CommandNode<S>> {
        self.children.iter().filter(|c| c.kind() == Some(ComponentKind::Literal))
    }

    pub fn argument_child(&self) -> Option<&CommandNode<S>> {
        self.children.iter().find(|c| c.kind() == Some(ComponentKind::Argument))
    }

    pub fn flag_child(&self) -> Option<&CommandNode<S>> {
        self.children.iter().find(|c| c.kind() == Some(ComponentKind::Flag))
    }

    /// Literal child selected by `token`
    pub fn find_literal(&self, token: &str, case_insensitive: bool) -> Option<&CommandNode<S>> {
        self.literal_children().find(|c| {
            c.component
                .as_ref()
                .is_some_and(|comp| comp.matches_literal(token, case_insensitive))
        })
    }

    fn kind(&self) -> Option<ComponentKind> {
        self.component.as_ref().map(CommandComponent::kind)
    }

    fn rank(&self) -> u8 {
        self.component.as_ref().map_or(0, CommandComponent::rank)
    }

    /// True when some command at or below this node grants the sender's
    /// permission. Branches failing this are treated as absent.
    pub fn is_permitted(&self, ctx: &CommandContext<S>) -> bool {
        self.commands.iter().any(|c| ctx.has_permission(c.permission()))
            || self.children.iter().any(|child| child.is_permitted(ctx))
    }

    /// Every command at or below this node
    pub fn all_commands(&self) -> Vec<Arc<Command<S>>> {
        let mut out = self.commands.clone();
        for child in &self.children {
            out.extend(child.all_commands());
        }
        out
    }

    fn insert_child(&mut self, child: CommandNode<S>) -> usize {
        let rank = child.rank();
        let index = self
            .children
            .iter()
            .position(|c| c.rank() > rank)
            .unwrap_or(self.children.len());
        self.children.insert(index, child);
        index
    }
}

/// How a component relates to the children of a node
enum Slot {
    /// An existing child represents the same component
    Existing(usize),
    /// The component needs a new child
    Vacant,
}

/// Multi-root tree of registered commands.
///
/// Mutation requires `&mut self`, so once the tree is shared behind a shared
/// reference every reader sees the same, stable structure.
pub struct CommandTree<S> {
    root: CommandNode<S>,
    case_insensitive_literals: bool,
    override_existing_commands: bool,
    allow_unsafe_registration: bool,
    locked: bool,
}

impl<S> Default for CommandTree<S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S> CommandTree<S> {
    pub fn new() -> Self {
        Self {
            root: CommandNode::root(),
            case_insensitive_literals: false,
            override_existing_commands: false,
            allow_unsafe_registration: false,
            locked: false,
        }
    }

    pub fn set_case_insensitive_literals(&mut self, value: bool) {
        self.case_insensitive_literals = value;
    }

    pub fn set_override_existing_commands(&mut self, value: bool) {
        self.override_existing_commands = value;
    }

    pub fn set_allow_unsafe_registration(&mut self, value: bool) {
        self.allow_unsafe_registration = value;
    }

    pub fn case_insensitive_literals(&self) -> bool {
        self.case_insensitive_literals
    }

    pub fn root(&self) -> &CommandNode<S> {
        &self.root
    }

    /// Reject further mutation unless unsafe registration is allowed
    pub fn lock(&mut self) {
        self.locked = true;
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    fn check_unlocked(&self) -> Result<(), RegistrationError> {
        if self.locked && !self.allow_unsafe_registration {
            return Err(RegistrationError::TreeLocked);
        }
        Ok(())
    }

    /// Add a command. Nothing is mutated when an error is returned.
    pub fn insert(&mut self, command: Command<S>) -> Result<Arc<Command<S>>, RegistrationError> {
        self.check_unlocked()?;
        validate_components(&command)?;
        self.check_conflicts(&command)?;

        let command = Arc::new(command);
        let ci = self.case_insensitive_literals;
        let replace = self.override_existing_commands;

        let mut node = &mut self.root;
        for component in command.components() {
            let index = match slot_for(node, component, ci)? {
                Slot::Existing(index) => {
                    merge_aliases(&mut node.children[index], component, ci);
                    index
                }
                Slot::Vacant => node.insert_child(CommandNode::new(component.clone())),
            };
            node = &mut node.children[index];
        }

        if replace {
            let sender_type = command.sender_type_name();
            node.commands.retain(|c| c.sender_type_name() != sender_type);
        }
        node.commands.push(Arc::clone(&command));

        debug!(syntax = %command.syntax(), sender_type = ?command.sender_type_name(), "Registered command");
        Ok(command)
    }

    /// Dry run of [`CommandTree::insert`] over the existing structure
    fn check_conflicts(&self, command: &Command<S>) -> Result<(), RegistrationError> {
        let ci = self.case_insensitive_literals;
        let mut node = &self.root;
        for component in command.components() {
            match slot_for(node, component, ci)? {
                Slot::Existing(index) => node = &node.children[index],
                Slot::Vacant => return Ok(()),
            }
        }

        let sender_type = command.sender_type_name();
        if !self.override_existing_commands && node.commands.iter().any(|c| c.sender_type_name() == sender_type) {
            return Err(RegistrationError::DuplicateCommand {
                path: command.syntax(),
            });
        }
        Ok(())
    }

    /// Unregister one command, pruning branches left without commands
    pub fn remove(&mut self, command: &Arc<Command<S>>) -> Result<(), RegistrationError> {
        self.check_unlocked()?;
        let ci = self.case_insensitive_literals;
        if remove_from(&mut self.root, command.components(), command, ci) {
            debug!(syntax = %command.syntax(), "Removed command");
            Ok(())
        } else {
            Err(RegistrationError::UnknownCommand(command.syntax()))
        }
    }

    /// Remove a root literal and every command below it
    pub fn delete_root_command(&mut self, name: &str) -> Result<Vec<Arc<Command<S>>>, RegistrationError> {
        self.check_unlocked()?;
        let ci = self.case_insensitive_literals;
        let index = self
            .root
            .children
            .iter()
            .position(|c| c.component.as_ref().is_some_and(|comp| comp.matches_literal(name, ci)))
            .ok_or_else(|| RegistrationError::UnknownCommand(name.to_string()))?;

        let removed = self.root.children.remove(index).all_commands();
        debug!(root = name, commands = removed.len(), "Deleted root command");
        Ok(removed)
    }

    /// Every registered command
    pub fn commands(&self) -> Vec<Arc<Command<S>>> {
        self.root.all_commands()
    }

    /// Names of the root literals
    pub fn root_names(&self) -> Vec<&str> {
        self.root
            .literal_children()
            .filter_map(|c| c.component().map(CommandComponent::name))
            .collect()
    }
}

/// Structural checks on one command definition
fn validate_components<S>(command: &Command<S>) -> Result<(), RegistrationError> {
    let components = command.components();
    if components.is_empty() {
        return Err(RegistrationError::EmptyCommand);
    }

    let mut keys = HashSet::new();
    for component in components {
        let names: Vec<&str> = match component.kind() {
            ComponentKind::Literal => continue,
            ComponentKind::Argument => vec![component.name()],
            ComponentKind::Flag => component
                .flag_parser()
                .map(|flags| flags.flags().map(CommandFlag::name).collect())
                .unwrap_or_default(),
        };
        if let Some(key) = names.into_iter().find(|key| !keys.insert(*key)) {
            return Err(RegistrationError::DuplicateKey {
                path: command.syntax(),
                key: key.to_string(),
            });
        }
    }

    let mut optional_seen = false;
    let mut greedy_seen = false;
    for (index, component) in components.iter().enumerate() {
        let after_flags = index > 0 && components[index - 1].is_flag();
        if after_flags || (greedy_seen && !component.is_flag()) {
            return Err(RegistrationError::UnreachableAfterGreedy {
                path: command.syntax(),
                component: component.name().to_string(),
            });
        }
        if component.is_flag() {
            continue;
        }
        if component.is_required() && optional_seen {
            return Err(RegistrationError::RequiredAfterOptional {
                path: command.syntax(),
                component: component.name().to_string(),
            });
        }
        optional_seen |= !component.is_required();
        greedy_seen |= component.is_greedy();
    }
    Ok(())
}

/// Find where `component` goes below `node`, or why it cannot go there
fn slot_for<S>(
    node: &CommandNode<S>,
    component: &CommandComponent<S>,
    ci: bool,
) -> Result<Slot, RegistrationError> {
    match component.kind() {
        ComponentKind::Literal => {
            let names = component.name_set(ci);
            let primary = if ci { component.name().to_lowercase() } else { component.name().to_string() };
            let mut same = None;
            for (index, child) in node.children.iter().enumerate() {
                let Some(existing) = child.component.as_ref().filter(|c| c.is_literal()) else {
                    continue;
                };
                let existing_names = existing.name_set(ci);
                let existing_primary = if ci { existing.name().to_lowercase() } else { existing.name().to_string() };
                if existing_primary == primary {
                    same = Some(index);
                    continue;
                }
                if let Some(alias) = names.intersection(&existing_names).next() {
                    return Err(RegistrationError::DuplicateAlias {
                        node: node.name().to_string(),
                        alias: alias.clone(),
                    });
                }
            }
            Ok(same.map_or(Slot::Vacant, Slot::Existing))
        }
        ComponentKind::Argument => {
            let existing = node
                .children
                .iter()
                .position(|c| c.kind() == Some(ComponentKind::Argument));
            match existing {
                None => Ok(Slot::Vacant),
                Some(index) if node.children[index].name() == component.name() => Ok(Slot::Existing(index)),
                Some(index) => Err(RegistrationError::AmbiguousNode {
                    node: node.name().to_string(),
                    existing: node.children[index].name().to_string(),
                    conflicting: component.name().to_string(),
                }),
            }
        }
        ComponentKind::Flag => {
            let existing = node.children.iter().position(|c| c.kind() == Some(ComponentKind::Flag));
            match existing {
                None => Ok(Slot::Vacant),
                Some(index) => {
                    let signature = |c: &CommandComponent<S>| c.flag_parser().map(|f| f.signature());
                    let same = node.children[index].component.as_ref().and_then(signature) == signature(component);
                    if same {
                        Ok(Slot::Existing(index))
                    } else {
                        Err(RegistrationError::ConflictingFlags {
                            path: node.name().to_string(),
                        })
                    }
                }
            }
        }
    }
}

/// Union the aliases of a re-registered literal into the existing node
fn merge_aliases<S>(node: &mut CommandNode<S>, component: &CommandComponent<S>, ci: bool) {
    let Some(existing) = node.component.as_mut() else {
        return;
    };
    if !existing.is_literal() {
        return;
    }
    let known = existing.name_set(ci);
    let added: Vec<String> = component
        .aliases()
        .iter()
        .filter(|a| !known.contains(&if ci { a.to_lowercase() } else { a.to_string() }))
        .cloned()
        .collect();
    if !added.is_empty() {
        trace!(literal = existing.name(), aliases = ?added, "Merging literal aliases");
        existing.add_aliases(added);
    }
}

fn remove_from<S>(
    node: &mut CommandNode<S>,
    components: &[CommandComponent<S>],
    command: &Arc<Command<S>>,
    ci: bool,
) -> bool {
    let Some((first, rest)) = components.split_first() else {
        let before = node.commands.len();
        node.commands.retain(|c| !Arc::ptr_eq(c, command));
        return node.commands.len() != before;
    };

    let Ok(Slot::Existing(index)) = slot_for(node, first, ci) else {
        return false;
    };
    let removed = remove_from(&mut node.children[index], rest, command, ci);
    let child = &node.children[index];
    if removed && child.children.is_empty() && child.commands.is_empty() {
        node.children.remove(index);
    }
    removed
}
