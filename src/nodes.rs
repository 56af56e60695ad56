//! Built-in composite, decorator and leaf behaviors.

use crate::blackboard::{Blackboard, NodeProperty};
use crate::context::ExecutionContext;
use crate::node::Node;
use crate::symbol::Symbol;
use crate::tree::Tree;
use crate::{Behavior, NodeState, NumChildren};
use std::rc::Rc;

/// AND composite with a resumable position.
///
/// Evaluates children strictly left to right, one per tick: Success advances
/// to the next child, Failure and Running propagate as-is. The current index
/// persists across Running ticks and resets whenever the node is entered
/// fresh or stopped.
#[derive(Default)]
pub struct Sequencer {
    current: usize,
}

impl Behavior for Sequencer {
    fn on_start(&mut self, _ctx: &mut ExecutionContext, _bb: &mut Blackboard) {
        self.current = 0;
    }

    fn on_update(
        &mut self,
        children: &mut [Node],
        ctx: &mut ExecutionContext,
        bb: &mut Blackboard,
    ) -> NodeState {
        if children.is_empty() {
            return NodeState::Failure;
        }
        self.current = self.current.min(children.len() - 1);
        match children[self.current].update(ctx, bb) {
            NodeState::Running => NodeState::Running,
            NodeState::Failure => NodeState::Failure,
            NodeState::Success => {
                self.current += 1;
                if self.current == children.len() {
                    NodeState::Success
                } else {
                    NodeState::Running
                }
            }
        }
    }

    fn on_stop(&mut self, _children: &mut [Node], _ctx: &mut ExecutionContext, _bb: &mut Blackboard) {
        self.current = 0;
    }

    fn max_children(&self) -> NumChildren {
        NumChildren::Infinite
    }

    fn clone_behavior(&self) -> Box<dyn Behavior> {
        Box::new(Sequencer::default())
    }
}

/// OR composite. Re-races its children from the leftmost on every tick; the
/// first child returning Running or Success short-circuits. Unlike
/// [`Sequencer`] it keeps no position, so a higher-priority child that starts
/// succeeding wins immediately.
#[derive(Default)]
pub struct Selector;

impl Behavior for Selector {
    fn on_update(
        &mut self,
        children: &mut [Node],
        ctx: &mut ExecutionContext,
        bb: &mut Blackboard,
    ) -> NodeState {
        for child in children.iter_mut() {
            match child.update(ctx, bb) {
                NodeState::Failure => continue,
                state => return state,
            }
        }
        NodeState::Failure
    }

    fn max_children(&self) -> NumChildren {
        NumChildren::Infinite
    }

    fn clone_behavior(&self) -> Box<dyn Behavior> {
        Box::new(Selector)
    }
}

/// Completion policy of a [`Parallel`] composite, per outcome.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParallelPolicy {
    /// One agreeing child suffices.
    RequireOne,
    /// Every child must agree.
    RequireAll,
}

impl std::str::FromStr for ParallelPolicy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "require_one" | "RequireOne" | "one" => Ok(Self::RequireOne),
            "require_all" | "RequireAll" | "all" => Ok(Self::RequireAll),
            _ => Err(()),
        }
    }
}

/// Logical fan-out: ticks every child every tick, no short-circuiting, then
/// tallies outcomes against the two policies. The success policy is checked
/// first; if neither is satisfied the composite keeps Running. Evaluation is
/// sequential within the tick, left to right.
pub struct Parallel {
    pub success_policy: ParallelPolicy,
    pub failure_policy: ParallelPolicy,
}

impl Default for Parallel {
    fn default() -> Self {
        Self {
            success_policy: ParallelPolicy::RequireAll,
            failure_policy: ParallelPolicy::RequireOne,
        }
    }
}

impl Parallel {
    pub fn new(success_policy: ParallelPolicy, failure_policy: ParallelPolicy) -> Self {
        Self {
            success_policy,
            failure_policy,
        }
    }

    fn satisfied(policy: ParallelPolicy, count: usize, total: usize) -> bool {
        match policy {
            ParallelPolicy::RequireOne => count > 0,
            ParallelPolicy::RequireAll => count == total,
        }
    }
}

impl Behavior for Parallel {
    fn on_update(
        &mut self,
        children: &mut [Node],
        ctx: &mut ExecutionContext,
        bb: &mut Blackboard,
    ) -> NodeState {
        // An empty child list never succeeds, even though RequireAll would be
        // vacuously satisfied by zero children.
        if children.is_empty() {
            return NodeState::Failure;
        }
        let mut successes = 0;
        let mut failures = 0;
        for child in children.iter_mut() {
            match child.update(ctx, bb) {
                NodeState::Success => successes += 1,
                NodeState::Failure => failures += 1,
                NodeState::Running => (),
            }
        }
        if Self::satisfied(self.success_policy, successes, children.len()) {
            NodeState::Success
        } else if Self::satisfied(self.failure_policy, failures, children.len()) {
            NodeState::Failure
        } else {
            NodeState::Running
        }
    }

    fn max_children(&self) -> NumChildren {
        NumChildren::Infinite
    }

    fn clone_behavior(&self) -> Box<dyn Behavior> {
        Box::new(Parallel::new(self.success_policy, self.failure_policy))
    }
}

/// Utility-based arbitration with priority locking.
///
/// While a child is active it is ticked exclusively; utilities are only
/// re-evaluated once the active child terminates. Selection takes the strict
/// maximum of [`Node::utility`], first child winning ties.
#[derive(Default)]
pub struct UtilitySelector {
    active: Option<usize>,
}

impl Behavior for UtilitySelector {
    fn on_update(
        &mut self,
        children: &mut [Node],
        ctx: &mut ExecutionContext,
        bb: &mut Blackboard,
    ) -> NodeState {
        if children.is_empty() {
            return NodeState::Failure;
        }
        let index = match self.active {
            Some(index) => index,
            None => {
                let mut best = 0;
                let mut best_score = children[0].utility(ctx, bb);
                for (i, child) in children.iter().enumerate().skip(1) {
                    let score = child.utility(ctx, bb);
                    if score > best_score {
                        best = i;
                        best_score = score;
                    }
                }
                self.active = Some(best);
                best
            }
        };
        let state = children[index].update(ctx, bb);
        if state != NodeState::Running {
            self.active = None;
        }
        state
    }

    fn on_stop(&mut self, children: &mut [Node], ctx: &mut ExecutionContext, bb: &mut Blackboard) {
        // A preempted stop leaves the active child mid-run; tear it down.
        if let Some(index) = self.active.take() {
            if let Some(child) = children.get_mut(index) {
                child.abort(ctx, bb);
            }
        }
    }

    fn max_children(&self) -> NumChildren {
        NumChildren::Infinite
    }

    fn clone_behavior(&self) -> Box<dyn Behavior> {
        Box::new(UtilitySelector::default())
    }
}

/// Maps child Success to Failure and vice versa; Running passes through.
#[derive(Default)]
pub struct Inverter;

impl Behavior for Inverter {
    fn on_update(
        &mut self,
        children: &mut [Node],
        ctx: &mut ExecutionContext,
        bb: &mut Blackboard,
    ) -> NodeState {
        match children.first_mut() {
            Some(child) => match child.update(ctx, bb) {
                NodeState::Running => NodeState::Running,
                NodeState::Success => NodeState::Failure,
                NodeState::Failure => NodeState::Success,
            },
            None => NodeState::Failure,
        }
    }

    fn max_children(&self) -> NumChildren {
        NumChildren::Finite(1)
    }

    fn clone_behavior(&self) -> Box<dyn Behavior> {
        Box::new(Inverter)
    }
}

/// Loops its child on the configured terminal outcomes.
///
/// With `restart_on_success`, a child Success counts one iteration and the
/// decorator keeps Running until `max_repeats` iterations completed
/// (`max_repeats == 0` loops forever); without it, Success is terminal.
/// `restart_on_failure` mirrors this for Failure.
pub struct Repeat {
    pub restart_on_success: bool,
    pub restart_on_failure: bool,
    pub max_repeats: usize,
    count: usize,
}

impl Default for Repeat {
    fn default() -> Self {
        Self {
            restart_on_success: true,
            restart_on_failure: false,
            max_repeats: 0,
            count: 0,
        }
    }
}

impl Repeat {
    pub fn new(restart_on_success: bool, restart_on_failure: bool, max_repeats: usize) -> Self {
        Self {
            restart_on_success,
            restart_on_failure,
            max_repeats,
            count: 0,
        }
    }
}

impl Behavior for Repeat {
    fn on_start(&mut self, _ctx: &mut ExecutionContext, _bb: &mut Blackboard) {
        self.count = 0;
    }

    fn on_update(
        &mut self,
        children: &mut [Node],
        ctx: &mut ExecutionContext,
        bb: &mut Blackboard,
    ) -> NodeState {
        let Some(child) = children.first_mut() else {
            return NodeState::Failure;
        };
        match child.update(ctx, bb) {
            NodeState::Running => NodeState::Running,
            NodeState::Success => {
                if self.restart_on_success {
                    self.count += 1;
                    if self.count >= self.max_repeats && self.max_repeats > 0 {
                        NodeState::Success
                    } else {
                        NodeState::Running
                    }
                } else {
                    NodeState::Success
                }
            }
            NodeState::Failure => {
                if self.restart_on_failure {
                    self.count += 1;
                    if self.count >= self.max_repeats && self.max_repeats > 0 {
                        NodeState::Failure
                    } else {
                        NodeState::Running
                    }
                } else {
                    NodeState::Failure
                }
            }
        }
    }

    fn max_children(&self) -> NumChildren {
        NumChildren::Finite(1)
    }

    fn clone_behavior(&self) -> Box<dyn Behavior> {
        Box::new(Repeat::new(
            self.restart_on_success,
            self.restart_on_failure,
            self.max_repeats,
        ))
    }
}

/// Fails once its child has been Running longer than `duration` seconds.
///
/// Time is accumulated tick delta since the node was entered, so ticking is
/// deterministic under a scripted clock. The expiry check runs before the
/// child is ticked, so an expired child is not ticked again on the failing
/// call.
pub struct Timeout {
    pub duration: NodeProperty<f32>,
    elapsed: f32,
}

impl Timeout {
    pub fn new(duration: NodeProperty<f32>) -> Self {
        Self {
            duration,
            elapsed: 0.0,
        }
    }
}

impl Behavior for Timeout {
    fn on_start(&mut self, _ctx: &mut ExecutionContext, _bb: &mut Blackboard) {
        self.elapsed = 0.0;
    }

    fn on_update(
        &mut self,
        children: &mut [Node],
        ctx: &mut ExecutionContext,
        bb: &mut Blackboard,
    ) -> NodeState {
        let Some(child) = children.first_mut() else {
            return NodeState::Failure;
        };
        if self.elapsed > self.duration.value(bb) {
            return NodeState::Failure;
        }
        self.elapsed += ctx.tick_delta();
        child.update(ctx, bb)
    }

    fn max_children(&self) -> NumChildren {
        NumChildren::Finite(1)
    }

    fn clone_behavior(&self) -> Box<dyn Behavior> {
        Box::new(Timeout::new(self.duration.clone()))
    }
}

/// Passthrough decorator that gives its subtree a utility score for
/// [`UtilitySelector`] arbitration: `score * multiplier`, where the score may
/// be driven from the blackboard.
pub struct UtilityEvaluator {
    pub score: NodeProperty<f32>,
    pub multiplier: f32,
}

impl UtilityEvaluator {
    pub fn new(score: NodeProperty<f32>, multiplier: f32) -> Self {
        Self { score, multiplier }
    }
}

impl Behavior for UtilityEvaluator {
    fn on_update(
        &mut self,
        children: &mut [Node],
        ctx: &mut ExecutionContext,
        bb: &mut Blackboard,
    ) -> NodeState {
        match children.first_mut() {
            Some(child) => child.update(ctx, bb),
            None => NodeState::Failure,
        }
    }

    fn utility(&self, _children: &[Node], _ctx: &ExecutionContext, bb: &Blackboard) -> f32 {
        self.score.value(bb) * self.multiplier
    }

    fn max_children(&self) -> NumChildren {
        NumChildren::Finite(1)
    }

    fn clone_behavior(&self) -> Box<dyn Behavior> {
        Box::new(UtilityEvaluator::new(self.score.clone(), self.multiplier))
    }
}

/// Pure substitution leaf: instantiates the referenced tree template during
/// bind and forwards every tick to the instance.
pub struct SubTree {
    tree: Rc<Tree>,
    instance: Option<Tree>,
}

impl SubTree {
    pub fn new(tree: Rc<Tree>) -> Self {
        Self {
            tree,
            instance: None,
        }
    }
}

impl Behavior for SubTree {
    fn on_init(&mut self, ctx: &mut ExecutionContext, _bb: &mut Blackboard) {
        let mut instance = (*self.tree).clone();
        instance.bind(ctx);
        self.instance = Some(instance);
    }

    fn on_update(
        &mut self,
        _children: &mut [Node],
        ctx: &mut ExecutionContext,
        _bb: &mut Blackboard,
    ) -> NodeState {
        match &mut self.instance {
            Some(instance) => {
                let delta = ctx.tick_delta();
                instance.tick(ctx, delta)
            }
            None => NodeState::Failure,
        }
    }

    fn clone_behavior(&self) -> Box<dyn Behavior> {
        Box::new(SubTree::new(self.tree.clone()))
    }

    fn subtree(&self) -> Option<&Rc<Tree>> {
        Some(&self.tree)
    }
}

/// Runs its subtree to Success, then gates through to its own child.
///
/// The subtree is instantiated once, during bind, and the instance outlives
/// the decorator's own restarts. While the instance's last tick state is
/// anything but Success the subtree is ticked and its result propagated;
/// every later entry forwards ticks to the child instead.
pub struct SubTreeDecorator {
    tree: Rc<Tree>,
    instance: Option<Tree>,
}

impl SubTreeDecorator {
    pub fn new(tree: Rc<Tree>) -> Self {
        Self {
            tree,
            instance: None,
        }
    }
}

impl Behavior for SubTreeDecorator {
    fn on_init(&mut self, ctx: &mut ExecutionContext, _bb: &mut Blackboard) {
        let mut instance = (*self.tree).clone();
        instance.bind(ctx);
        self.instance = Some(instance);
    }

    fn on_update(
        &mut self,
        children: &mut [Node],
        ctx: &mut ExecutionContext,
        bb: &mut Blackboard,
    ) -> NodeState {
        let Some(instance) = &mut self.instance else {
            return NodeState::Failure;
        };
        // A fresh instance reports Running, so the subtree always runs first.
        if instance.last_tick_state() != NodeState::Success {
            let delta = ctx.tick_delta();
            instance.tick(ctx, delta)
        } else {
            match children.first_mut() {
                Some(child) => child.update(ctx, bb),
                None => NodeState::Failure,
            }
        }
    }

    fn max_children(&self) -> NumChildren {
        NumChildren::Finite(1)
    }

    fn clone_behavior(&self) -> Box<dyn Behavior> {
        Box::new(SubTreeDecorator::new(self.tree.clone()))
    }

    fn subtree(&self) -> Option<&Rc<Tree>> {
        Some(&self.tree)
    }
}

/// A boolean predicate evaluated by [`ConditionNode`].
pub trait Condition {
    fn check(&self, ctx: &ExecutionContext, bb: &Blackboard) -> bool;
    fn clone_condition(&self) -> Box<dyn Condition>;
}

/// Leaf that maps a [`Condition`] to Success/Failure, with optional
/// inversion. Never returns Running.
pub struct ConditionNode {
    condition: Box<dyn Condition>,
    pub invert: bool,
}

impl ConditionNode {
    pub fn new(condition: impl Condition + 'static, invert: bool) -> Self {
        Self {
            condition: Box::new(condition),
            invert,
        }
    }
}

impl Behavior for ConditionNode {
    fn on_update(
        &mut self,
        _children: &mut [Node],
        ctx: &mut ExecutionContext,
        bb: &mut Blackboard,
    ) -> NodeState {
        let value = self.condition.check(ctx, bb) != self.invert;
        if value {
            NodeState::Success
        } else {
            NodeState::Failure
        }
    }

    fn clone_behavior(&self) -> Box<dyn Behavior> {
        Box::new(Self {
            condition: self.condition.clone_condition(),
            invert: self.invert,
        })
    }
}

/// Condition on a boolean blackboard value (or literal).
#[derive(Clone)]
pub struct IsTrue {
    pub input: NodeProperty<bool>,
}

impl IsTrue {
    pub fn new(input: NodeProperty<bool>) -> Self {
        Self { input }
    }
}

impl Condition for IsTrue {
    fn check(&self, _ctx: &ExecutionContext, bb: &Blackboard) -> bool {
        self.input.value(bb)
    }

    fn clone_condition(&self) -> Box<dyn Condition> {
        Box::new(self.clone())
    }
}

/// Writes a text-encoded value into a blackboard key. Fails when the key is
/// missing, not parseable, or the text does not parse as the key's type.
pub struct SetProperty {
    pub key: Symbol,
    pub value: String,
}

impl SetProperty {
    pub fn new(key: impl Into<Symbol>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl Behavior for SetProperty {
    fn on_update(
        &mut self,
        _children: &mut [Node],
        _ctx: &mut ExecutionContext,
        bb: &mut Blackboard,
    ) -> NodeState {
        match bb.find_mut(self.key).and_then(|k| k.set_parsed(&self.value)) {
            Some(true) => NodeState::Success,
            _ => NodeState::Failure,
        }
    }

    fn clone_behavior(&self) -> Box<dyn Behavior> {
        Box::new(SetProperty::new(self.key, self.value.clone()))
    }
}

/// Compares a blackboard key's value against a text-encoded constant.
pub struct CompareProperty {
    pub key: Symbol,
    pub value: String,
    pub invert: bool,
}

impl CompareProperty {
    pub fn new(key: impl Into<Symbol>, value: impl Into<String>, invert: bool) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            invert,
        }
    }
}

impl Behavior for CompareProperty {
    fn on_update(
        &mut self,
        _children: &mut [Node],
        _ctx: &mut ExecutionContext,
        bb: &mut Blackboard,
    ) -> NodeState {
        let Some(equal) = bb.find(self.key).and_then(|k| k.equals_parsed(&self.value)) else {
            return NodeState::Failure;
        };
        if equal != self.invert {
            NodeState::Success
        } else {
            NodeState::Failure
        }
    }

    fn clone_behavior(&self) -> Box<dyn Behavior> {
        Box::new(CompareProperty::new(self.key, self.value.clone(), self.invert))
    }
}

/// Stays Running until `duration` seconds of tick delta have accumulated,
/// then succeeds.
pub struct Wait {
    pub duration: NodeProperty<f32>,
    elapsed: f32,
}

impl Wait {
    pub fn new(duration: NodeProperty<f32>) -> Self {
        Self {
            duration,
            elapsed: 0.0,
        }
    }
}

impl Behavior for Wait {
    fn on_start(&mut self, _ctx: &mut ExecutionContext, _bb: &mut Blackboard) {
        self.elapsed = 0.0;
    }

    fn on_update(
        &mut self,
        _children: &mut [Node],
        ctx: &mut ExecutionContext,
        bb: &mut Blackboard,
    ) -> NodeState {
        self.elapsed += ctx.tick_delta();
        if self.elapsed >= self.duration.value(bb) {
            NodeState::Success
        } else {
            NodeState::Running
        }
    }

    fn clone_behavior(&self) -> Box<dyn Behavior> {
        Box::new(Wait::new(self.duration.clone()))
    }
}

/// Emits its message through `tracing` and succeeds. Handy while authoring.
pub struct Log {
    pub message: NodeProperty<String>,
}

impl Log {
    pub fn new(message: NodeProperty<String>) -> Self {
        Self { message }
    }
}

impl Behavior for Log {
    fn on_update(
        &mut self,
        _children: &mut [Node],
        _ctx: &mut ExecutionContext,
        bb: &mut Blackboard,
    ) -> NodeState {
        tracing::info!(target: "behaviour_tree::log_node", "{}", self.message.value(bb));
        NodeState::Success
    }

    fn clone_behavior(&self) -> Box<dyn Behavior> {
        Box::new(Log::new(self.message.clone()))
    }
}

/// Fails with the configured probability, succeeds otherwise. Never returns
/// Running. `chance_of_failure` 0 never fails, 1 always does.
pub struct RandomFailure {
    pub chance_of_failure: NodeProperty<f32>,
}

impl RandomFailure {
    pub fn new(chance_of_failure: NodeProperty<f32>) -> Self {
        Self { chance_of_failure }
    }
}

impl Behavior for RandomFailure {
    fn on_update(
        &mut self,
        _children: &mut [Node],
        _ctx: &mut ExecutionContext,
        bb: &mut Blackboard,
    ) -> NodeState {
        use rand::Rng;
        if rand::thread_rng().gen::<f32>() < self.chance_of_failure.value(bb) {
            NodeState::Failure
        } else {
            NodeState::Success
        }
    }

    fn clone_behavior(&self) -> Box<dyn Behavior> {
        Box::new(RandomFailure::new(self.chance_of_failure.clone()))
    }
}

pub struct AlwaysSucceed;

impl Behavior for AlwaysSucceed {
    fn on_update(
        &mut self,
        _children: &mut [Node],
        _ctx: &mut ExecutionContext,
        _bb: &mut Blackboard,
    ) -> NodeState {
        NodeState::Success
    }

    fn clone_behavior(&self) -> Box<dyn Behavior> {
        Box::new(AlwaysSucceed)
    }
}

pub struct AlwaysFail;

impl Behavior for AlwaysFail {
    fn on_update(
        &mut self,
        _children: &mut [Node],
        _ctx: &mut ExecutionContext,
        _bb: &mut Blackboard,
    ) -> NodeState {
        NodeState::Failure
    }

    fn clone_behavior(&self) -> Box<dyn Behavior> {
        Box::new(AlwaysFail)
    }
}

#[cfg(test)]
mod test;
