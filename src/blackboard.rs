//! The blackboard: a typed key-value store scoped to one tree instance.
//!
//! Values live behind `Rc<dyn Any>` and are never mutated in place; every
//! write replaces the `Rc` wholesale. That makes `BlackboardKey` cheap to
//! clone while keeping cloned trees isolated: a write on the clone swaps the
//! clone's `Rc`, the template's stays untouched.

use crate::symbol::Symbol;
use std::any::{type_name, Any, TypeId};
use std::rc::Rc;
use std::str::FromStr;

fn eq_impl<T: PartialEq + 'static>(lhs: &dyn Any, rhs: &dyn Any) -> bool {
    match (lhs.downcast_ref::<T>(), rhs.downcast_ref::<T>()) {
        (Some(lhs), Some(rhs)) => lhs == rhs,
        _ => false,
    }
}

fn parse_impl<T: FromStr + 'static>(s: &str) -> Option<Rc<dyn Any>> {
    s.parse::<T>().ok().map(|v| Rc::new(v) as Rc<dyn Any>)
}

/// One named, statically typed slot in a [`Blackboard`].
///
/// The type is fixed when the key is created; later writes must match it.
#[derive(Clone)]
pub struct BlackboardKey {
    name: Symbol,
    type_id: TypeId,
    type_name: &'static str,
    value: Rc<dyn Any>,
    eq_fn: fn(&dyn Any, &dyn Any) -> bool,
    parse_fn: Option<fn(&str) -> Option<Rc<dyn Any>>>,
}

impl std::fmt::Debug for BlackboardKey {
    fn fmt(&self, fmt: &mut std::fmt::Formatter) -> std::fmt::Result {
        fmt.debug_struct("BlackboardKey")
            .field("name", &self.name)
            .field("type", &self.type_name)
            .finish()
    }
}

impl BlackboardKey {
    pub fn new<T: Clone + PartialEq + 'static>(name: impl Into<Symbol>, value: T) -> Self {
        Self {
            name: name.into(),
            type_id: TypeId::of::<T>(),
            type_name: type_name::<T>(),
            value: Rc::new(value),
            eq_fn: eq_impl::<T>,
            parse_fn: None,
        }
    }

    /// Like [`BlackboardKey::new`], but the key additionally remembers how to
    /// parse its type from text, so data-driven nodes (`SetProperty`,
    /// `CompareProperty`) and the tree loaders can feed it string literals.
    pub fn new_parseable<T: Clone + PartialEq + FromStr + 'static>(
        name: impl Into<Symbol>,
        value: T,
    ) -> Self {
        Self {
            parse_fn: Some(parse_impl::<T>),
            ..Self::new(name, value)
        }
    }

    pub fn name(&self) -> Symbol {
        self.name
    }

    /// Name of the underlying value type, for diagnostics.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    /// Reads the value. `None` if `T` is not the key's underlying type.
    pub fn get<T: Clone + 'static>(&self) -> Option<T> {
        self.value.downcast_ref::<T>().cloned()
    }

    /// Replaces the value. Returns false (and leaves the slot untouched) if
    /// `T` is not the key's underlying type.
    pub fn set<T: 'static>(&mut self, value: T) -> bool {
        if self.type_id != TypeId::of::<T>() {
            tracing::warn!(
                key = %self.name,
                expected = self.type_name,
                got = type_name::<T>(),
                "blackboard write with mismatched type ignored"
            );
            return false;
        }
        self.value = Rc::new(value);
        true
    }

    /// Copies the other key's value into this key, if the underlying types
    /// match. Key identity (name, type) is never copied.
    pub fn copy_from(&mut self, other: &BlackboardKey) -> bool {
        if self.type_id != other.type_id {
            tracing::warn!(
                key = %self.name,
                expected = self.type_name,
                got = other.type_name,
                "blackboard override with mismatched type ignored"
            );
            return false;
        }
        self.value = other.value.clone();
        true
    }

    /// Compares this key's value against another key's.
    pub fn value_equals(&self, other: &BlackboardKey) -> bool {
        (self.eq_fn)(&*self.value, &*other.value)
    }

    /// Parses `s` as the underlying type and stores it. `None` if the key was
    /// not created with [`BlackboardKey::new_parseable`], `Some(false)` if the
    /// text does not parse.
    pub fn set_parsed(&mut self, s: &str) -> Option<bool> {
        let parse = self.parse_fn?;
        match parse(s) {
            Some(value) => {
                self.value = value;
                Some(true)
            }
            None => Some(false),
        }
    }

    /// Parses `s` as the underlying type and compares it against the stored
    /// value. `None` if the key is not parseable or the text does not parse.
    pub fn equals_parsed(&self, s: &str) -> Option<bool> {
        let parse = self.parse_fn?;
        let parsed = parse(s)?;
        Some((self.eq_fn)(&*self.value, &*parsed))
    }
}

/// An ordered, name-unique set of [`BlackboardKey`]s.
#[derive(Clone, Debug, Default)]
pub struct Blackboard {
    keys: Vec<BlackboardKey>,
}

impl Blackboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a key, replacing any existing key of the same name.
    pub fn add_key(&mut self, key: BlackboardKey) {
        match self.keys.iter_mut().find(|k| k.name == key.name) {
            Some(slot) => *slot = key,
            None => self.keys.push(key),
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &BlackboardKey> {
        self.keys.iter()
    }

    pub fn find(&self, name: impl Into<Symbol>) -> Option<&BlackboardKey> {
        let name = name.into();
        self.keys.iter().find(|k| k.name == name)
    }

    pub fn find_mut(&mut self, name: impl Into<Symbol>) -> Option<&mut BlackboardKey> {
        let name = name.into();
        self.keys.iter_mut().find(|k| k.name == name)
    }

    /// Finds a key by name and validates its underlying type. A name hit with
    /// the wrong type returns `None` and warns; it is never a panic.
    pub fn find_typed<T: 'static>(&self, name: impl Into<Symbol>) -> Option<&BlackboardKey> {
        let key = self.find(name)?;
        if !key.is::<T>() {
            tracing::warn!(
                key = %key.name,
                expected = key.type_name,
                got = type_name::<T>(),
                "blackboard read with mismatched type"
            );
            return None;
        }
        Some(key)
    }

    pub fn get_value<T: Clone + 'static>(&self, name: impl Into<Symbol>) -> Option<T> {
        self.find_typed::<T>(name)?.get::<T>()
    }

    /// Writes a value into an existing key. Returns false if the key is
    /// missing or of a different type; keys are never created implicitly.
    pub fn set_value<T: 'static>(&mut self, name: impl Into<Symbol>, value: T) -> bool {
        match self.find_mut(name) {
            Some(key) => key.set(value),
            None => false,
        }
    }

    /// Copies values from `other` into same-named, same-typed keys of this
    /// blackboard. Used for per-instance overrides; key identity never moves
    /// between blackboards.
    pub fn copy_values_from(&mut self, other: &Blackboard) {
        for theirs in &other.keys {
            if let Some(ours) = self.keys.iter_mut().find(|k| k.name == theirs.name) {
                ours.copy_from(theirs);
            }
        }
    }
}

/// A node parameter that is either a literal value or a late-bound reference
/// to a blackboard key by name.
///
/// Resolution happens at every read against whichever blackboard is passed
/// in, so cloned trees resolve against their own cloned keys with no fixup.
#[derive(Clone, Debug)]
pub struct NodeProperty<T> {
    default: T,
    key: Option<Symbol>,
}

impl<T: Clone + 'static> NodeProperty<T> {
    /// A property carrying a fixed literal value.
    pub fn literal(value: T) -> Self {
        Self {
            default: value,
            key: None,
        }
    }

    /// A property bound to the blackboard key `name`. `default` is returned
    /// when the key is missing or of the wrong type.
    pub fn key(name: impl Into<Symbol>, default: T) -> Self {
        Self {
            default,
            key: Some(name.into()),
        }
    }

    pub fn key_name(&self) -> Option<Symbol> {
        self.key
    }

    /// Resolves the property: the blackboard value if bound and present, the
    /// literal default otherwise.
    pub fn value(&self, blackboard: &Blackboard) -> T {
        self.key
            .and_then(|key| blackboard.get_value::<T>(key))
            .unwrap_or_else(|| self.default.clone())
    }
}
