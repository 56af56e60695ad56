//! The tree: a named node graph plus its blackboard.

use crate::blackboard::Blackboard;
use crate::context::ExecutionContext;
use crate::error::AddChildResult;
use crate::node::Node;
use crate::{Behavior, NodeState, NumChildren};

/// The permanent behavior at the top of every tree: passes the tick through
/// to its single child, Failure if no child has been attached yet.
pub struct RootBehavior;

impl Behavior for RootBehavior {
    fn on_update(
        &mut self,
        children: &mut [Node],
        ctx: &mut ExecutionContext,
        blackboard: &mut Blackboard,
    ) -> NodeState {
        match children.first_mut() {
            Some(child) => child.update(ctx, blackboard),
            None => NodeState::Failure,
        }
    }

    fn max_children(&self) -> NumChildren {
        NumChildren::Finite(1)
    }

    fn clone_behavior(&self) -> Box<dyn Behavior> {
        Box::new(RootBehavior)
    }
}

/// A behaviour tree: the root node, every node reachable under it, and the
/// blackboard they share.
///
/// A `Tree` authored once acts as a template; [`Tree::clone`] produces
/// state-isolated runtime copies, one per agent (usually via
/// [`crate::TreeInstance`]).
pub struct Tree {
    name: String,
    root: Node,
    blackboard: Blackboard,
    last_tick_state: NodeState,
}

impl Tree {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            root: Node::new(RootBehavior).with_title("Root"),
            blackboard: Blackboard::new(),
            last_tick_state: NodeState::Running,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn blackboard(&self) -> &Blackboard {
        &self.blackboard
    }

    pub fn blackboard_mut(&mut self) -> &mut Blackboard {
        &mut self.blackboard
    }

    /// Attaches `child` under the permanent root, replacing any previous one.
    pub fn set_root_child(&mut self, child: Node) -> AddChildResult {
        self.root.children.clear();
        self.root.add_child(child)
    }

    /// One-time pre-order `on_init` pass over every node. Subtree-bearing
    /// nodes instantiate their nested trees here.
    pub fn bind(&mut self, ctx: &mut ExecutionContext) {
        tracing::trace!(tree = %self.name, "binding tree");
        self.root.init(ctx, &mut self.blackboard);
    }

    /// Runs one tick: publishes `delta` on the context, updates the root, and
    /// records the outcome as [`Tree::last_tick_state`].
    pub fn tick(&mut self, ctx: &mut ExecutionContext, delta: f32) -> NodeState {
        ctx.set_tick_delta(delta);
        let state = self.root.update(ctx, &mut self.blackboard);
        self.last_tick_state = state;
        state
    }

    /// The root's result from the most recent tick. Starts out as `Running`
    /// on a fresh tree or clone, which is what lets subtree gates tick a
    /// never-run subtree at least once.
    pub fn last_tick_state(&self) -> NodeState {
        self.last_tick_state
    }

    /// Pre-order visit over every node in the tree.
    pub fn for_each_node(&self, visitor: &mut impl FnMut(&Node)) {
        self.root.visit(visitor);
    }
}

impl Clone for Tree {
    /// Deep clone producing a state-isolated instance: nodes reset their
    /// transient state, the blackboard carries copied defaults, and
    /// `last_tick_state` starts over at `Running`.
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            root: self.root.clone(),
            blackboard: self.blackboard.clone(),
            last_tick_state: NodeState::Running,
        }
    }
}

impl std::fmt::Debug for Tree {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        fmt.debug_struct("Tree")
            .field("name", &self.name)
            .field("last_tick_state", &self.last_tick_state)
            .field("root", &self.root)
            .finish()
    }
}
