use crate::blackboard::{Blackboard, NodeProperty};
use crate::error::LoadError;
use crate::nodes::{
    AlwaysFail, AlwaysSucceed, CompareProperty, ConditionNode, Inverter, IsTrue, Log, Parallel,
    ParallelPolicy, RandomFailure, Repeat, Selector, Sequencer, SetProperty, Timeout,
    UtilityEvaluator, UtilitySelector, Wait,
};
use crate::symbol::Symbol;
use crate::Behavior;
use std::collections::HashMap;
use std::str::FromStr;

/// A property value as authored in a tree source: a quoted literal or a
/// reference to a blackboard key by name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PropValue {
    Literal(String),
    KeyRef(Symbol),
}

/// The parsed properties of one node, handed to a [`Constructor`].
///
/// Carries the enclosing tree's blackboard so key references can be checked
/// against the declared keys at load time instead of failing silently at
/// tick time.
pub struct Props<'a> {
    pub(crate) map: &'a HashMap<Symbol, PropValue>,
    pub(crate) blackboard: &'a Blackboard,
    pub(crate) node_type: &'a str,
}

impl<'a> Props<'a> {
    fn err_bad(&self, prop: &str, value: &str) -> LoadError {
        LoadError::BadProperty {
            node: self.node_type.to_string(),
            prop: prop.to_string(),
            value: value.to_string(),
        }
    }

    /// A literal-or-key-bound [`NodeProperty`]. Absent property means the
    /// given default; a key reference must name a declared key.
    pub fn property<T: FromStr + Clone + 'static>(
        &self,
        name: &str,
        default: T,
    ) -> Result<NodeProperty<T>, LoadError> {
        match self.map.get(&Symbol::from(name)) {
            None => Ok(NodeProperty::literal(default)),
            Some(PropValue::Literal(s)) => {
                let value = s.parse::<T>().map_err(|_| self.err_bad(name, s))?;
                Ok(NodeProperty::literal(value))
            }
            Some(PropValue::KeyRef(key)) => {
                if self.blackboard.find(*key).is_none() {
                    return Err(LoadError::MissingKey {
                        node: self.node_type.to_string(),
                        key: key.to_string(),
                    });
                }
                Ok(NodeProperty::key(*key, default))
            }
        }
    }

    /// A plain configuration value; must be a literal if present.
    pub fn parse<T: FromStr>(&self, name: &str, default: T) -> Result<T, LoadError> {
        match self.map.get(&Symbol::from(name)) {
            None => Ok(default),
            Some(PropValue::Literal(s)) => s.parse::<T>().map_err(|_| self.err_bad(name, s)),
            Some(PropValue::KeyRef(_)) => Err(LoadError::PropertyNotLiteral {
                node: self.node_type.to_string(),
                prop: name.to_string(),
            }),
        }
    }

    /// A required literal.
    pub fn required<T: FromStr>(&self, name: &str) -> Result<T, LoadError> {
        match self.map.get(&Symbol::from(name)) {
            None => Err(LoadError::MissingProperty {
                node: self.node_type.to_string(),
                prop: name.to_string(),
            }),
            Some(PropValue::Literal(s)) => s.parse::<T>().map_err(|_| self.err_bad(name, s)),
            Some(PropValue::KeyRef(_)) => Err(LoadError::PropertyNotLiteral {
                node: self.node_type.to_string(),
                prop: name.to_string(),
            }),
        }
    }

    /// A required blackboard key reference, checked against declared keys.
    pub fn key_ref(&self, name: &str) -> Result<Symbol, LoadError> {
        match self.map.get(&Symbol::from(name)) {
            None => Err(LoadError::MissingProperty {
                node: self.node_type.to_string(),
                prop: name.to_string(),
            }),
            Some(PropValue::Literal(_)) => Err(LoadError::PropertyNotKeyRef {
                node: self.node_type.to_string(),
                prop: name.to_string(),
            }),
            Some(PropValue::KeyRef(key)) => {
                if self.blackboard.find(*key).is_none() {
                    return Err(LoadError::MissingKey {
                        node: self.node_type.to_string(),
                        key: key.to_string(),
                    });
                }
                Ok(*key)
            }
        }
    }
}

pub type Constructor = Box<dyn Fn(&Props) -> Result<Box<dyn Behavior>, LoadError>>;

pub fn boxify<T>(cons: impl Fn(&Props) -> Result<T, LoadError> + 'static) -> Constructor
where
    T: Behavior + 'static,
{
    Box::new(move |props| Ok(Box::new(cons(props)?)))
}

/// Maps authored node type names to behavior constructors.
pub struct Registry {
    node_types: HashMap<String, Constructor>,
}

impl Default for Registry {
    fn default() -> Self {
        let mut ret = Self {
            node_types: HashMap::new(),
        };
        ret.register("Sequencer", boxify(|_| Ok(Sequencer::default())));
        ret.register("Selector", boxify(|_| Ok(Selector)));
        ret.register(
            "Parallel",
            boxify(|props| {
                Ok(Parallel::new(
                    props.parse("success_policy", ParallelPolicy::RequireAll)?,
                    props.parse("failure_policy", ParallelPolicy::RequireOne)?,
                ))
            }),
        );
        ret.register("UtilitySelector", boxify(|_| Ok(UtilitySelector::default())));
        ret.register("Inverter", boxify(|_| Ok(Inverter)));
        ret.register(
            "Repeat",
            boxify(|props| {
                Ok(Repeat::new(
                    props.parse("restart_on_success", true)?,
                    props.parse("restart_on_failure", false)?,
                    props.parse("max_repeats", 0)?,
                ))
            }),
        );
        ret.register(
            "Timeout",
            boxify(|props| Ok(Timeout::new(props.property("duration", 0.0)?))),
        );
        ret.register(
            "UtilityEvaluator",
            boxify(|props| {
                Ok(UtilityEvaluator::new(
                    props.property("score", 0.0)?,
                    props.parse("multiplier", 1.0)?,
                ))
            }),
        );
        ret.register(
            "IsTrue",
            boxify(|props| {
                Ok(ConditionNode::new(
                    IsTrue::new(props.property("input", false)?),
                    props.parse("invert", false)?,
                ))
            }),
        );
        ret.register(
            "SetProperty",
            boxify(|props| {
                Ok(SetProperty::new(
                    props.key_ref("key")?,
                    props.required::<String>("value")?,
                ))
            }),
        );
        ret.register(
            "CompareProperty",
            boxify(|props| {
                Ok(CompareProperty::new(
                    props.key_ref("key")?,
                    props.required::<String>("value")?,
                    props.parse("invert", false)?,
                ))
            }),
        );
        ret.register(
            "Wait",
            boxify(|props| Ok(Wait::new(props.property("duration", 0.0)?))),
        );
        ret.register(
            "Log",
            boxify(|props| Ok(Log::new(props.property("message", String::new())?))),
        );
        ret.register(
            "RandomFailure",
            boxify(|props| {
                Ok(RandomFailure::new(
                    props.property("chance_of_failure", 0.5)?,
                ))
            }),
        );
        ret.register("AlwaysSucceed", boxify(|_| Ok(AlwaysSucceed)));
        ret.register("AlwaysFail", boxify(|_| Ok(AlwaysFail)));
        ret
    }
}

impl Registry {
    pub fn register(&mut self, type_name: impl ToString, constructor: Constructor) {
        self.node_types.insert(type_name.to_string(), constructor);
    }

    pub fn contains(&self, type_name: &str) -> bool {
        self.node_types.contains_key(type_name)
    }

    /// Builds a behavior from its registered constructor; `None` if the name
    /// is unknown (the loader then tries subtree resolution).
    pub fn build(
        &self,
        type_name: &str,
        props: &Props,
    ) -> Option<Result<Box<dyn Behavior>, LoadError>> {
        self.node_types
            .get(type_name)
            .map(|constructor| constructor(props))
    }
}
