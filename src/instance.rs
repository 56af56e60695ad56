//! Per-agent host binding: validate a template, clone it, bind it, tick it.

use crate::blackboard::BlackboardKey;
use crate::context::ExecutionContext;
use crate::error::ValidateError;
use crate::node::Node;
use crate::symbol::Symbol;
use crate::tree::Tree;
use crate::NodeState;

/// Checks a tree template for cyclic subtree composition and invalid node
/// configuration.
///
/// Follows every subtree reference depth-first while keeping a stack of
/// currently open tree names; revisiting a name already on the stack is a
/// cycle, reported with the full path (`A -> B -> A`). Trees are identified
/// by name, so two templates sharing a name count as the same tree. Along
/// the way each node's [`Behavior::validate`] hook runs; the first complaint
/// aborts the walk ([`crate::debug::node_diagnostics`] collects them all
/// instead).
///
/// Repeated sibling-wise *use* of one subtree is fine; only a reference back
/// into an open tree is refused.
///
/// [`Behavior::validate`]: crate::Behavior::validate
pub fn validate(tree: &Tree) -> Result<(), ValidateError> {
    let mut stack = vec![tree.name().to_string()];
    validate_node(tree.root(), &mut stack)
}

fn validate_node(node: &Node, stack: &mut Vec<String>) -> Result<(), ValidateError> {
    if let Err(message) = node.behavior().validate() {
        let label = if node.title().is_empty() {
            node.guid().to_string()
        } else {
            node.title().to_string()
        };
        return Err(ValidateError::InvalidNode {
            node: label,
            message,
        });
    }
    if let Some(subtree) = node.behavior().subtree() {
        let name = subtree.name().to_string();
        if stack.contains(&name) {
            let mut path = stack.clone();
            path.push(name);
            return Err(ValidateError::SubtreeCycle { path });
        }
        stack.push(name);
        validate_node(subtree.root(), stack)?;
        stack.pop();
    }
    for child in node.children() {
        validate_node(child, stack)?;
    }
    Ok(())
}

/// One agent's runtime copy of a tree template, together with its execution
/// context.
///
/// Creation validates the template, deep-clones it, binds the context (the
/// one-time `on_init` pass) and copies any blackboard overrides value-wise
/// into the fresh instance. The host then calls [`TreeInstance::tick`] once
/// per frame.
pub struct TreeInstance {
    tree: Tree,
    ctx: ExecutionContext,
}

impl TreeInstance {
    /// Builds an instance from `template`. `ctx` should already carry every
    /// service the tree's nodes look up; `overrides` are copied by name onto
    /// same-typed keys of the cloned blackboard.
    pub fn create(
        template: &Tree,
        mut ctx: ExecutionContext,
        overrides: &[BlackboardKey],
    ) -> Result<Self, ValidateError> {
        if let Err(err) = validate(template) {
            tracing::error!(tree = template.name(), %err, "refusing to instantiate tree");
            return Err(err);
        }
        let mut tree = template.clone();
        tree.bind(&mut ctx);
        for source in overrides {
            if let Some(target) = tree.blackboard_mut().find_mut(source.name()) {
                target.copy_from(source);
            }
        }
        Ok(Self { tree, ctx })
    }

    /// Runs one tick. Once the tree has settled on Success, subsequent calls
    /// stop ticking it; the stale result log is cleared and Success is
    /// reported back.
    pub fn tick(&mut self, delta: f32) -> NodeState {
        if self.tree.last_tick_state() == NodeState::Success {
            self.ctx.clear_results();
            return NodeState::Success;
        }
        self.tree.tick(&mut self.ctx, delta)
    }

    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    pub fn context(&self) -> &ExecutionContext {
        &self.ctx
    }

    pub fn context_mut(&mut self) -> &mut ExecutionContext {
        &mut self.ctx
    }

    pub fn find(&self, name: impl Into<Symbol>) -> Option<&BlackboardKey> {
        self.tree.blackboard().find(name)
    }

    pub fn get_value<T: Clone + 'static>(&self, name: impl Into<Symbol>) -> Option<T> {
        self.tree.blackboard().get_value(name)
    }

    pub fn set_value<T: 'static>(&mut self, name: impl Into<Symbol>, value: T) -> bool {
        self.tree.blackboard_mut().set_value(name, value)
    }
}
