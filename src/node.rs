//! The node container: lifecycle state machine around a [`Behavior`] payload.

use crate::blackboard::Blackboard;
use crate::context::ExecutionContext;
use crate::error::{AddChildError, AddChildResult};
use crate::{Behavior, NodeState, NumChildren};
use uuid::Uuid;

/// One node of a behaviour tree.
///
/// The container owns the identity and lifecycle bookkeeping (guid, title,
/// the `started` flag, the child list); the boxed [`Behavior`] supplies the
/// actual logic. [`Node::update`] runs the state machine: start the behavior
/// if it is entered fresh, update it, record the result, stop it on a
/// terminal result.
pub struct Node {
    pub(crate) guid: Uuid,
    pub(crate) title: String,
    pub(crate) description: String,
    pub(crate) position: (f32, f32),
    pub(crate) started: bool,
    pub(crate) children: Vec<Node>,
    pub(crate) behavior: Box<dyn Behavior>,
}

impl Node {
    pub fn new(behavior: impl Behavior + 'static) -> Self {
        Self::from_box(Box::new(behavior))
    }

    pub(crate) fn from_box(behavior: Box<dyn Behavior>) -> Self {
        Self {
            guid: Uuid::new_v4(),
            title: String::new(),
            description: String::new(),
            position: (0.0, 0.0),
            started: false,
            children: vec![],
            behavior,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn guid(&self) -> Uuid {
        self.guid
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    /// Authoring-layout coordinates. Irrelevant to execution, carried so
    /// external editors can round-trip through the in-memory shape.
    pub fn position(&self) -> (f32, f32) {
        self.position
    }

    pub fn set_position(&mut self, position: (f32, f32)) {
        self.position = position;
    }

    pub fn children(&self) -> &[Node] {
        &self.children
    }

    /// Appends a child, enforcing the behavior's arity.
    pub fn add_child(&mut self, child: Node) -> AddChildResult {
        if NumChildren::Finite(self.children.len()) < self.behavior.max_children() {
            self.children.push(child);
            Ok(())
        } else {
            Err(AddChildError::TooManyNodes)
        }
    }

    pub(crate) fn behavior(&self) -> &dyn Behavior {
        &*self.behavior
    }

    /// Runs one tick of this node.
    pub fn update(&mut self, ctx: &mut ExecutionContext, blackboard: &mut Blackboard) -> NodeState {
        if !self.started {
            self.behavior.on_start(ctx, blackboard);
            self.started = true;
        }
        let state = self.behavior.on_update(&mut self.children, ctx, blackboard);
        ctx.record_result(self.guid, state);
        if state != NodeState::Running {
            self.behavior.on_stop(&mut self.children, ctx, blackboard);
            self.started = false;
        }
        state
    }

    /// Synchronously cancels this node and every descendant: clears the
    /// `started` flag and runs the stop hook on each, current state
    /// notwithstanding. No result is recorded.
    pub fn abort(&mut self, ctx: &mut ExecutionContext, blackboard: &mut Blackboard) {
        self.started = false;
        self.behavior.on_stop(&mut self.children, ctx, blackboard);
        for child in &mut self.children {
            child.abort(ctx, blackboard);
        }
    }

    /// The priority score this node offers a [`crate::UtilitySelector`]
    /// parent.
    pub fn utility(&self, ctx: &ExecutionContext, blackboard: &Blackboard) -> f32 {
        self.behavior.utility(&self.children, ctx, blackboard)
    }

    /// Pre-order one-time init, run while binding the owning tree.
    pub(crate) fn init(&mut self, ctx: &mut ExecutionContext, blackboard: &mut Blackboard) {
        self.behavior.on_init(ctx, blackboard);
        for child in &mut self.children {
            child.init(ctx, blackboard);
        }
    }

    /// Pre-order visit over this node and all descendants.
    pub fn visit(&self, visitor: &mut impl FnMut(&Node)) {
        visitor(self);
        for child in &self.children {
            child.visit(visitor);
        }
    }
}

impl Clone for Node {
    /// Deep clone. The guid and authored configuration are preserved;
    /// transient execution state (the `started` flag, behavior-internal
    /// counters) resets.
    fn clone(&self) -> Self {
        Self {
            guid: self.guid,
            title: self.title.clone(),
            description: self.description.clone(),
            position: self.position,
            started: false,
            children: self.children.clone(),
            behavior: self.behavior.clone_behavior(),
        }
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        fmt.debug_struct("Node")
            .field("guid", &self.guid)
            .field("title", &self.title)
            .field("started", &self.started)
            .field("children", &self.children)
            .finish()
    }
}
