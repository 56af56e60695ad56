//! # behaviour-tree
//!
//! A tick-driven behaviour tree execution engine for agent AI.
//!
//!
//! ## Overview
//!
//! A behaviour tree is a hierarchical scheduler for reactive agents: a tree of
//! composable decision and action nodes is evaluated ("ticked") once per frame,
//! and every node reports one of three states ([`NodeState::Running`],
//! [`NodeState::Success`] or [`NodeState::Failure`]), which propagates back up
//! through the tree's control-flow nodes to the root.
//!
//! This crate provides the runtime execution model:
//!
//! * the node lifecycle state machine (start / update / stop, plus abort),
//! * composite control flow ([`Sequencer`], [`Selector`], [`Parallel`],
//!   [`UtilitySelector`]),
//! * decorators ([`Inverter`], [`Repeat`], [`Timeout`], [`SubTreeDecorator`],
//!   [`UtilityEvaluator`]),
//! * a typed [`Blackboard`] key-value store with [`NodeProperty`] indirection,
//! * subtree composition with cycle detection, and
//! * per-agent tree instancing via [`TreeInstance`].
//!
//! Authoring tools, persistence of the on-disk asset format and engine
//! integration (frame callbacks, profiling, gizmos) are collaborator concerns;
//! the crate does ship a reference text format (see [`parse_file`] and
//! [`load`]) and a YAML variant ([`load_yaml`]) that deserialize into the
//! in-memory tree shape.
//!
//!
//! ## How it looks like
//!
//! Custom actions implement the [`Behavior`] trait. A leaf that moves an agent
//! towards a blackboard-provided target could start out like this:
//!
//! ```rust
//! use behaviour_tree::{Behavior, Blackboard, ExecutionContext, Node, NodeState};
//!
//! #[derive(Clone)]
//! struct MoveTo;
//!
//! impl Behavior for MoveTo {
//!     fn on_update(
//!         &mut self,
//!         _children: &mut [Node],
//!         _ctx: &mut ExecutionContext,
//!         bb: &mut Blackboard,
//!     ) -> NodeState {
//!         let Some(target) = bb.get_value::<f64>("target") else {
//!             return NodeState::Failure;
//!         };
//!         // ... move towards `target`, return Running until arrived ...
//!         let _ = target;
//!         NodeState::Success
//!     }
//!
//!     fn clone_behavior(&self) -> Box<dyn Behavior> {
//!         Box::new(self.clone())
//!     }
//! }
//! ```
//!
//! Trees are assembled from [`Node`] containers, each wrapping one behavior:
//!
//! ```rust
//! use behaviour_tree::nodes::{Sequencer, Wait};
//! use behaviour_tree::{
//!     BlackboardKey, ExecutionContext, Node, NodeProperty, Tree, TreeInstance,
//! };
//!
//! let mut template = Tree::new("patrol");
//! template
//!     .blackboard_mut()
//!     .add_key(BlackboardKey::new("target", 42.0f64));
//!
//! let mut root = Node::new(Sequencer::default());
//! root.add_child(Node::new(Wait::new(NodeProperty::literal(0.5))))
//!     .unwrap();
//! // MoveTo from the previous example would be appended the same way.
//! template.set_root_child(root).unwrap();
//!
//! // One isolated instance per agent; the template stays untouched.
//! let mut agent = TreeInstance::create(&template, ExecutionContext::default(), &[]).unwrap();
//! let state = agent.tick(0.016);
//! # let _ = state;
//! ```
//!
//! The host is expected to call [`TreeInstance::tick`] once per frame with the
//! frame's delta time. Before creating the instance the host registers shared
//! services on the [`ExecutionContext`], so action nodes can reach engine-side
//! capabilities:
//!
//! ```rust
//! use behaviour_tree::ExecutionContext;
//!
//! struct AgentHandle {
//!     id: u32,
//! }
//!
//! let mut ctx = ExecutionContext::default();
//! ctx.register(AgentHandle { id: 7 });
//! assert!(ctx.is_registered::<AgentHandle>());
//! assert_eq!(ctx.get::<AgentHandle>().id, 7);
//! ```
//!
//!
//! ## Loading a tree from text
//!
//! The same patrol tree can be described in the crate's text format and built
//! through a [`Registry`] of node constructors:
//!
//! ```raw
//! tree main = Sequencer {
//!     key target : float = 42.0
//!     Wait (duration <- "0.5")
//!     MoveTo (target <- target)
//! }
//! ```
//!
//! A quoted property value is a literal; a bare identifier binds the property
//! to the blackboard key of that name, so the value is re-read from the
//! blackboard on every access. A node name that is not registered resolves to
//! another `tree` definition in the same source and becomes a [`SubTree`]
//! leaf, so large behaviours can be split into modular trees. Recursive
//! subtree references are a load error rather than a stack overflow; the same
//! cycle detection runs again at instance creation for programmatically
//! assembled trees (see [`validate`]).
//!
//!
//! ## Execution model in brief
//!
//! * Single logical thread per tree instance; the [`Parallel`] composite is a
//!   sequential fan-out within one tick, not OS concurrency.
//! * A node suspends by returning `Running`; it will be resumed (not
//!   restarted) on the next tick, until it finishes or a higher-priority
//!   branch calls [`Node::abort`] on it.
//! * Traversal order within one tick is deterministic: depth-first,
//!   left-to-right, as defined by each composite's algorithm.
//! * Tree templates are cloned per instance; instances never share mutable
//!   state, so separate agents may be ticked from separate threads by the
//!   host.

mod blackboard;
mod context;
pub mod debug;
pub mod error;
mod instance;
mod node;
pub mod nodes;
pub mod parser;
mod registry;
mod symbol;
mod tree;

pub use crate::blackboard::{Blackboard, BlackboardKey, NodeProperty};
pub use crate::context::ExecutionContext;
pub use crate::instance::{validate, TreeInstance};
pub use crate::node::Node;
pub use crate::nodes::{
    Condition, ConditionNode, Inverter, Parallel, ParallelPolicy, Repeat, Selector, Sequencer,
    SubTree, SubTreeDecorator, Timeout, UtilityEvaluator, UtilitySelector,
};
pub use crate::parser::{load, load_yaml, parse_file};
pub use crate::registry::{boxify, Constructor, PropValue, Props, Registry};
pub use crate::symbol::Symbol;
pub use crate::tree::{RootBehavior, Tree};
pub use ::once_cell::sync::*;

/// The result of one node evaluation within a tick.
///
/// `Success` and `Failure` are terminal for the tick: the node's stop hook
/// runs and its `started` flag clears. `Running` suspends the node until the
/// next tick.
#[derive(PartialEq, Eq, Debug, Clone, Copy, Hash)]
pub enum NodeState {
    /// The node has not finished; tick it again next frame.
    Running,
    Failure,
    Success,
}

/// Child-list arity a behavior accepts, enforced by [`Node::add_child`].
#[derive(PartialEq, Eq, Debug, Clone, Copy)]
pub enum NumChildren {
    Finite(usize),
    Infinite,
}

impl PartialOrd for NumChildren {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(match (self, other) {
            (NumChildren::Finite(_), NumChildren::Infinite) => std::cmp::Ordering::Less,
            (NumChildren::Infinite, NumChildren::Finite(_)) => std::cmp::Ordering::Greater,
            (NumChildren::Finite(lhs), NumChildren::Finite(rhs)) => lhs.cmp(rhs),
            (NumChildren::Infinite, NumChildren::Infinite) => return None,
        })
    }
}

/// The behaviour payload of a [`Node`].
///
/// The surrounding `Node` container drives the lifecycle: `on_start` runs when
/// a node is entered fresh, `on_update` every tick while active, `on_stop`
/// when the update result is terminal or the node is aborted. `on_init` runs
/// exactly once per instance, during [`Tree::bind`].
///
/// Behaviors with children-facing logic receive the node's child list as a
/// mutable slice; leaves can ignore it (it is always empty for them, since the
/// default [`Behavior::max_children`] is zero).
pub trait Behavior {
    /// One-time hook invoked while binding the owning tree to its context.
    ///
    /// Subtree-bearing nodes use this to eagerly instantiate their nested
    /// tree.
    fn on_init(&mut self, _ctx: &mut ExecutionContext, _bb: &mut Blackboard) {}

    /// Idempotent setup, invoked when the node is entered without having been
    /// started before (or after it last finished).
    fn on_start(&mut self, _ctx: &mut ExecutionContext, _bb: &mut Blackboard) {}

    fn on_update(
        &mut self,
        children: &mut [Node],
        ctx: &mut ExecutionContext,
        bb: &mut Blackboard,
    ) -> NodeState;

    /// Teardown, invoked on terminal results and on abort.
    fn on_stop(
        &mut self,
        _children: &mut [Node],
        _ctx: &mut ExecutionContext,
        _bb: &mut Blackboard,
    ) {
    }

    /// Priority score consumed by [`UtilitySelector`]. Plain actions score 0.
    fn utility(&self, _children: &[Node], _ctx: &ExecutionContext, _bb: &Blackboard) -> f32 {
        0.0
    }

    fn max_children(&self) -> NumChildren {
        NumChildren::Finite(0)
    }

    /// Deep-copies this behavior's configuration into a fresh instance.
    ///
    /// Transient execution state (iteration counters, cached child indices,
    /// instantiated subtrees) must reset; only authored configuration survives
    /// the copy.
    fn clone_behavior(&self) -> Box<dyn Behavior>;

    /// The tree template this behavior references, if it is a subtree node.
    /// Drives the cycle detection in [`validate`].
    fn subtree(&self) -> Option<&std::rc::Rc<Tree>> {
        None
    }

    /// Authoring-time structural check; the default is unconditionally valid.
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}
