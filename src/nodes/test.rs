use super::*;
use crate::blackboard::BlackboardKey;
use crate::{Behavior, NodeState};
use std::cell::Cell;

/// A scriptable leaf: reports the state in `state` and counts its lifecycle
/// callbacks, so tests can both steer and observe it from outside.
#[derive(Clone)]
struct Probe {
    state: Rc<Cell<NodeState>>,
    score: Rc<Cell<f32>>,
    ticks: Rc<Cell<usize>>,
    starts: Rc<Cell<usize>>,
    stops: Rc<Cell<usize>>,
}

impl Probe {
    fn new(initial: NodeState) -> Self {
        Self {
            state: Rc::new(Cell::new(initial)),
            score: Rc::new(Cell::new(0.0)),
            ticks: Rc::new(Cell::new(0)),
            starts: Rc::new(Cell::new(0)),
            stops: Rc::new(Cell::new(0)),
        }
    }

    fn scored(initial: NodeState, score: f32) -> Self {
        let probe = Self::new(initial);
        probe.score.set(score);
        probe
    }

    fn node(&self) -> Node {
        Node::new(self.clone())
    }
}

impl Behavior for Probe {
    fn on_start(&mut self, _ctx: &mut ExecutionContext, _bb: &mut Blackboard) {
        self.starts.set(self.starts.get() + 1);
    }

    fn on_update(
        &mut self,
        _children: &mut [Node],
        _ctx: &mut ExecutionContext,
        _bb: &mut Blackboard,
    ) -> NodeState {
        self.ticks.set(self.ticks.get() + 1);
        self.state.get()
    }

    fn on_stop(&mut self, _children: &mut [Node], _ctx: &mut ExecutionContext, _bb: &mut Blackboard) {
        self.stops.set(self.stops.get() + 1);
    }

    fn utility(&self, _children: &[Node], _ctx: &ExecutionContext, _bb: &Blackboard) -> f32 {
        self.score.get()
    }

    fn clone_behavior(&self) -> Box<dyn Behavior> {
        Box::new(self.clone())
    }
}

fn env() -> (ExecutionContext, Blackboard) {
    (ExecutionContext::default(), Blackboard::new())
}

#[test]
fn sequencer_resumes_where_it_left_off() {
    let (mut ctx, mut bb) = env();
    let a = Probe::new(NodeState::Running);
    let b = Probe::new(NodeState::Running);
    let c = Probe::new(NodeState::Running);
    let mut seq = Node::new(Sequencer::default());
    seq.add_child(a.node()).unwrap();
    seq.add_child(b.node()).unwrap();
    seq.add_child(c.node()).unwrap();

    assert_eq!(seq.update(&mut ctx, &mut bb), NodeState::Running);
    assert_eq!((a.ticks.get(), b.ticks.get()), (1, 0));

    a.state.set(NodeState::Success);
    assert_eq!(seq.update(&mut ctx, &mut bb), NodeState::Running);
    assert_eq!((a.ticks.get(), b.ticks.get()), (2, 0));

    // Resumed at index 1; the finished child is not re-ticked.
    b.state.set(NodeState::Success);
    assert_eq!(seq.update(&mut ctx, &mut bb), NodeState::Running);
    assert_eq!((a.ticks.get(), b.ticks.get(), c.ticks.get()), (2, 1, 0));

    c.state.set(NodeState::Success);
    assert_eq!(seq.update(&mut ctx, &mut bb), NodeState::Success);
    assert_eq!(c.ticks.get(), 1);
}

#[test]
fn sequencer_restarts_after_failure() {
    let (mut ctx, mut bb) = env();
    let a = Probe::new(NodeState::Success);
    let b = Probe::new(NodeState::Failure);
    let mut seq = Node::new(Sequencer::default());
    seq.add_child(a.node()).unwrap();
    seq.add_child(b.node()).unwrap();

    assert_eq!(seq.update(&mut ctx, &mut bb), NodeState::Running);
    assert_eq!(seq.update(&mut ctx, &mut bb), NodeState::Failure);
    // Failure is terminal, so the next tick starts over from the left.
    assert_eq!(seq.update(&mut ctx, &mut bb), NodeState::Running);
    assert_eq!(a.ticks.get(), 2);
}

#[test]
fn empty_composites_fail() {
    let (mut ctx, mut bb) = env();
    for behavior in [
        Node::new(Sequencer::default()),
        Node::new(Selector),
        Node::new(Parallel::default()),
        Node::new(UtilitySelector::default()),
    ]
    .iter_mut()
    {
        assert_eq!(behavior.update(&mut ctx, &mut bb), NodeState::Failure);
    }
}

#[test]
fn selector_re_races_every_tick() {
    let (mut ctx, mut bb) = env();
    let a = Probe::new(NodeState::Failure);
    let b = Probe::new(NodeState::Running);
    let mut sel = Node::new(Selector);
    sel.add_child(a.node()).unwrap();
    sel.add_child(b.node()).unwrap();

    assert_eq!(sel.update(&mut ctx, &mut bb), NodeState::Running);

    // No persisted index: the higher-priority child wins the next race and
    // the running one is not ticked at all.
    a.state.set(NodeState::Success);
    assert_eq!(sel.update(&mut ctx, &mut bb), NodeState::Success);
    assert_eq!(a.ticks.get(), 2);
    assert_eq!(b.ticks.get(), 1);
}

#[test]
fn selector_all_failures() {
    let (mut ctx, mut bb) = env();
    let mut sel = Node::new(Selector);
    sel.add_child(Probe::new(NodeState::Failure).node()).unwrap();
    sel.add_child(Probe::new(NodeState::Failure).node()).unwrap();
    assert_eq!(sel.update(&mut ctx, &mut bb), NodeState::Failure);
}

#[test]
fn parallel_checks_success_policy_first() {
    let (mut ctx, mut bb) = env();
    let mut par = Node::new(Parallel::new(
        ParallelPolicy::RequireOne,
        ParallelPolicy::RequireOne,
    ));
    par.add_child(Probe::new(NodeState::Success).node()).unwrap();
    par.add_child(Probe::new(NodeState::Failure).node()).unwrap();
    // Both policies are satisfied; success wins.
    assert_eq!(par.update(&mut ctx, &mut bb), NodeState::Success);
}

#[test]
fn parallel_require_all_success_one_failure() {
    let (mut ctx, mut bb) = env();
    let failing = Probe::new(NodeState::Failure);
    let mut par = Node::new(Parallel::new(
        ParallelPolicy::RequireAll,
        ParallelPolicy::RequireOne,
    ));
    par.add_child(Probe::new(NodeState::Success).node()).unwrap();
    par.add_child(Probe::new(NodeState::Success).node()).unwrap();
    par.add_child(failing.node()).unwrap();
    assert_eq!(par.update(&mut ctx, &mut bb), NodeState::Failure);

    failing.state.set(NodeState::Success);
    assert_eq!(par.update(&mut ctx, &mut bb), NodeState::Success);
}

#[test]
fn parallel_ticks_every_child() {
    let (mut ctx, mut bb) = env();
    let a = Probe::new(NodeState::Failure);
    let b = Probe::new(NodeState::Running);
    let c = Probe::new(NodeState::Running);
    let mut par = Node::new(Parallel::new(
        ParallelPolicy::RequireAll,
        ParallelPolicy::RequireAll,
    ));
    par.add_child(a.node()).unwrap();
    par.add_child(b.node()).unwrap();
    par.add_child(c.node()).unwrap();

    assert_eq!(par.update(&mut ctx, &mut bb), NodeState::Running);
    // No short-circuiting on the early Failure.
    assert_eq!((a.ticks.get(), b.ticks.get(), c.ticks.get()), (1, 1, 1));
}

#[test]
fn utility_selector_locks_onto_running_child() {
    let (mut ctx, mut bb) = env();
    let a = Probe::scored(NodeState::Running, 5.0);
    let b = Probe::scored(NodeState::Running, 10.0);
    let mut sel = Node::new(UtilitySelector::default());
    sel.add_child(a.node()).unwrap();
    sel.add_child(b.node()).unwrap();

    assert_eq!(sel.update(&mut ctx, &mut bb), NodeState::Running);
    assert_eq!((a.ticks.get(), b.ticks.get()), (0, 1));

    // A higher competing utility does not preempt the locked child.
    a.score.set(20.0);
    assert_eq!(sel.update(&mut ctx, &mut bb), NodeState::Running);
    assert_eq!((a.ticks.get(), b.ticks.get()), (0, 2));

    // Once the active child terminates, utilities are re-evaluated.
    b.state.set(NodeState::Success);
    assert_eq!(sel.update(&mut ctx, &mut bb), NodeState::Success);
    assert_eq!(sel.update(&mut ctx, &mut bb), NodeState::Running);
    assert_eq!((a.ticks.get(), b.ticks.get()), (1, 3));
}

#[test]
fn utility_selector_first_wins_ties() {
    let (mut ctx, mut bb) = env();
    let a = Probe::scored(NodeState::Running, 3.0);
    let b = Probe::scored(NodeState::Running, 3.0);
    let mut sel = Node::new(UtilitySelector::default());
    sel.add_child(a.node()).unwrap();
    sel.add_child(b.node()).unwrap();

    assert_eq!(sel.update(&mut ctx, &mut bb), NodeState::Running);
    assert_eq!((a.ticks.get(), b.ticks.get()), (1, 0));
}

#[test]
fn abort_reaches_every_descendant_once() {
    let (mut ctx, mut bb) = env();
    let leaf = Probe::new(NodeState::Running);
    let mut inner = Node::new(Sequencer::default());
    inner.add_child(leaf.node()).unwrap();
    let mut outer = Node::new(Sequencer::default());
    outer.add_child(inner).unwrap();

    assert_eq!(outer.update(&mut ctx, &mut bb), NodeState::Running);
    assert!(outer.started);
    assert!(outer.children[0].started);
    assert!(outer.children[0].children[0].started);

    outer.abort(&mut ctx, &mut bb);
    assert_eq!(leaf.stops.get(), 1);
    assert!(!outer.started);
    assert!(!outer.children[0].started);
    assert!(!outer.children[0].children[0].started);
}

#[test]
fn inverter_flips_terminal_states() {
    let (mut ctx, mut bb) = env();
    let child = Probe::new(NodeState::Success);
    let mut inv = Node::new(Inverter);
    inv.add_child(child.node()).unwrap();

    assert_eq!(inv.update(&mut ctx, &mut bb), NodeState::Failure);
    child.state.set(NodeState::Failure);
    assert_eq!(inv.update(&mut ctx, &mut bb), NodeState::Success);
    child.state.set(NodeState::Running);
    assert_eq!(inv.update(&mut ctx, &mut bb), NodeState::Running);

    let mut empty = Node::new(Inverter);
    assert_eq!(empty.update(&mut ctx, &mut bb), NodeState::Failure);
}

#[test]
fn repeat_counts_bounded_iterations() {
    let (mut ctx, mut bb) = env();
    let child = Probe::new(NodeState::Success);
    let mut rep = Node::new(Repeat::new(true, false, 3));
    rep.add_child(child.node()).unwrap();

    assert_eq!(rep.update(&mut ctx, &mut bb), NodeState::Running);
    assert_eq!(rep.update(&mut ctx, &mut bb), NodeState::Running);
    assert_eq!(rep.update(&mut ctx, &mut bb), NodeState::Success);
    assert_eq!(child.ticks.get(), 3);
}

#[test]
fn repeat_zero_means_unbounded() {
    let (mut ctx, mut bb) = env();
    let child = Probe::new(NodeState::Success);
    let mut rep = Node::new(Repeat::new(true, false, 0));
    rep.add_child(child.node()).unwrap();

    for _ in 0..32 {
        assert_eq!(rep.update(&mut ctx, &mut bb), NodeState::Running);
    }
}

#[test]
fn repeat_without_restart_is_transparent() {
    let (mut ctx, mut bb) = env();
    let child = Probe::new(NodeState::Success);
    let mut rep = Node::new(Repeat::new(false, false, 3));
    rep.add_child(child.node()).unwrap();
    assert_eq!(rep.update(&mut ctx, &mut bb), NodeState::Success);

    child.state.set(NodeState::Failure);
    assert_eq!(rep.update(&mut ctx, &mut bb), NodeState::Failure);
}

#[test]
fn repeat_restarts_on_failure() {
    let (mut ctx, mut bb) = env();
    let child = Probe::new(NodeState::Failure);
    let mut rep = Node::new(Repeat::new(false, true, 2));
    rep.add_child(child.node()).unwrap();

    assert_eq!(rep.update(&mut ctx, &mut bb), NodeState::Running);
    assert_eq!(rep.update(&mut ctx, &mut bb), NodeState::Failure);
}

#[test]
fn timeout_fails_without_ticking_expired_child() {
    let (mut ctx, mut bb) = env();
    let child = Probe::new(NodeState::Running);
    let mut timeout = Node::new(Timeout::new(NodeProperty::literal(1.0)));
    timeout.add_child(child.node()).unwrap();

    ctx.set_tick_delta(0.6);
    assert_eq!(timeout.update(&mut ctx, &mut bb), NodeState::Running);
    assert_eq!(timeout.update(&mut ctx, &mut bb), NodeState::Running);
    assert_eq!(timeout.update(&mut ctx, &mut bb), NodeState::Failure);
    assert_eq!(child.ticks.get(), 2);
}

#[test]
fn timeout_resets_between_runs() {
    let (mut ctx, mut bb) = env();
    let child = Probe::new(NodeState::Running);
    let mut timeout = Node::new(Timeout::new(NodeProperty::literal(1.0)));
    timeout.add_child(child.node()).unwrap();

    ctx.set_tick_delta(0.6);
    assert_eq!(timeout.update(&mut ctx, &mut bb), NodeState::Running);
    child.state.set(NodeState::Success);
    assert_eq!(timeout.update(&mut ctx, &mut bb), NodeState::Success);

    // A fresh entry starts a fresh clock.
    child.state.set(NodeState::Running);
    assert_eq!(timeout.update(&mut ctx, &mut bb), NodeState::Running);
    assert_eq!(timeout.update(&mut ctx, &mut bb), NodeState::Running);
}

#[test]
fn wait_accumulates_tick_delta() {
    let (mut ctx, mut bb) = env();
    let mut wait = Node::new(Wait::new(NodeProperty::literal(1.0)));
    ctx.set_tick_delta(0.5);
    assert_eq!(wait.update(&mut ctx, &mut bb), NodeState::Running);
    assert_eq!(wait.update(&mut ctx, &mut bb), NodeState::Success);
}

#[test]
fn subtree_decorator_gates_child_after_subtree_success() {
    let (mut ctx, mut bb) = env();
    let inner = Probe::new(NodeState::Running);
    let mut prep = Tree::new("prep");
    prep.set_root_child(inner.node()).unwrap();

    let gated = Probe::new(NodeState::Running);
    let mut deco = Node::new(SubTreeDecorator::new(Rc::new(prep)));
    deco.add_child(gated.node()).unwrap();
    deco.init(&mut ctx, &mut bb);

    assert_eq!(deco.update(&mut ctx, &mut bb), NodeState::Running);
    assert_eq!((inner.ticks.get(), gated.ticks.get()), (1, 0));

    // The completing tick propagates the subtree's result.
    inner.state.set(NodeState::Success);
    assert_eq!(deco.update(&mut ctx, &mut bb), NodeState::Success);
    assert_eq!(gated.ticks.get(), 0);

    // The finished subtree survives the stop; fresh entries reach the child.
    assert_eq!(deco.update(&mut ctx, &mut bb), NodeState::Running);
    gated.state.set(NodeState::Success);
    assert_eq!(deco.update(&mut ctx, &mut bb), NodeState::Success);
    assert_eq!((inner.ticks.get(), gated.ticks.get()), (2, 2));
}

#[test]
fn random_failure_honors_probability_extremes() {
    let (mut ctx, mut bb) = env();
    let mut never = Node::new(RandomFailure::new(NodeProperty::literal(0.0)));
    let mut always = Node::new(RandomFailure::new(NodeProperty::literal(1.0)));
    for _ in 0..32 {
        assert_eq!(never.update(&mut ctx, &mut bb), NodeState::Success);
        assert_eq!(always.update(&mut ctx, &mut bb), NodeState::Failure);
    }
}

#[test]
fn condition_maps_bool_to_state() {
    let (mut ctx, mut bb) = env();
    bb.add_key(BlackboardKey::new("armed", false));

    let mut cond = Node::new(ConditionNode::new(
        IsTrue::new(NodeProperty::key("armed", false)),
        false,
    ));
    assert_eq!(cond.update(&mut ctx, &mut bb), NodeState::Failure);

    bb.set_value("armed", true);
    assert_eq!(cond.update(&mut ctx, &mut bb), NodeState::Success);

    let mut inverted = Node::new(ConditionNode::new(
        IsTrue::new(NodeProperty::key("armed", false)),
        true,
    ));
    assert_eq!(inverted.update(&mut ctx, &mut bb), NodeState::Failure);
}

#[test]
fn set_property_parses_into_key() {
    let (mut ctx, mut bb) = env();
    bb.add_key(BlackboardKey::new_parseable("count", 0i64));

    let mut set = Node::new(SetProperty::new("count", "42"));
    assert_eq!(set.update(&mut ctx, &mut bb), NodeState::Success);
    assert_eq!(bb.get_value::<i64>("count"), Some(42));

    let mut bad = Node::new(SetProperty::new("count", "not a number"));
    assert_eq!(bad.update(&mut ctx, &mut bb), NodeState::Failure);
    assert_eq!(bb.get_value::<i64>("count"), Some(42));

    let mut missing = Node::new(SetProperty::new("absent", "1"));
    assert_eq!(missing.update(&mut ctx, &mut bb), NodeState::Failure);
}

#[test]
fn compare_property_checks_equality() {
    let (mut ctx, mut bb) = env();
    bb.add_key(BlackboardKey::new_parseable("count", 42i64));

    let mut eq = Node::new(CompareProperty::new("count", "42", false));
    assert_eq!(eq.update(&mut ctx, &mut bb), NodeState::Success);

    let mut ne = Node::new(CompareProperty::new("count", "41", false));
    assert_eq!(ne.update(&mut ctx, &mut bb), NodeState::Failure);

    let mut inverted = Node::new(CompareProperty::new("count", "41", true));
    assert_eq!(inverted.update(&mut ctx, &mut bb), NodeState::Success);
}

#[test]
fn utility_evaluator_scores_from_blackboard() {
    let (mut ctx, mut bb) = env();
    bb.add_key(BlackboardKey::new("hunger", 0.4f32));

    let mut eval = Node::new(UtilityEvaluator::new(
        NodeProperty::key("hunger", 0.0),
        10.0,
    ));
    eval.add_child(Probe::new(NodeState::Success).node()).unwrap();

    assert!((eval.utility(&ctx, &bb) - 4.0).abs() < f32::EPSILON);
    assert_eq!(eval.update(&mut ctx, &mut bb), NodeState::Success);
}

#[test]
fn decorators_enforce_single_child() {
    let mut inv = Node::new(Inverter);
    inv.add_child(Node::new(AlwaysSucceed)).unwrap();
    assert!(inv.add_child(Node::new(AlwaysSucceed)).is_err());

    let mut leaf = Node::new(AlwaysSucceed);
    assert!(leaf.add_child(Node::new(AlwaysFail)).is_err());
}
