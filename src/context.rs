//! Shared services and per-tick scratch state for one tree instance.

use crate::NodeState;
use std::any::{type_name, Any, TypeId};
use std::collections::HashMap;
use uuid::Uuid;

/// Per-instance execution state shared by every node in a tree.
///
/// Carries two things: a typed service registry the host fills before the
/// first tick (agent handles, world queries, whatever actions need), and
/// per-tick scratch (the frame delta and a guid-keyed log of each node's last
/// result, for inspection tooling).
///
/// Missing or duplicate service registrations are host wiring bugs, so
/// [`ExecutionContext::get`] and [`ExecutionContext::register`] panic instead
/// of returning errors. Use [`ExecutionContext::try_get`] for optional
/// capabilities.
#[derive(Default)]
pub struct ExecutionContext {
    services: HashMap<TypeId, Box<dyn Any>>,
    tick_delta: f32,
    tick_results: HashMap<Uuid, NodeState>,
}

impl ExecutionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a service instance under its type.
    ///
    /// # Panics
    ///
    /// Panics if a service of the same type is already registered.
    pub fn register<T: 'static>(&mut self, service: T) {
        let prev = self.services.insert(TypeId::of::<T>(), Box::new(service));
        if prev.is_some() {
            panic!(
                "service {} registered twice on the same context",
                type_name::<T>()
            );
        }
    }

    pub fn is_registered<T: 'static>(&self) -> bool {
        self.services.contains_key(&TypeId::of::<T>())
    }

    /// Retrieves a registered service.
    ///
    /// # Panics
    ///
    /// Panics if no service of type `T` was registered.
    pub fn get<T: 'static>(&self) -> &T {
        self.try_get::<T>().unwrap_or_else(|| {
            panic!("service {} was never registered", type_name::<T>());
        })
    }

    /// Mutable variant of [`ExecutionContext::get`].
    ///
    /// # Panics
    ///
    /// Panics if no service of type `T` was registered.
    pub fn get_mut<T: 'static>(&mut self) -> &mut T {
        self.try_get_mut::<T>().unwrap_or_else(|| {
            panic!("service {} was never registered", type_name::<T>());
        })
    }

    pub fn try_get<T: 'static>(&self) -> Option<&T> {
        self.services
            .get(&TypeId::of::<T>())
            .and_then(|b| b.downcast_ref())
    }

    pub fn try_get_mut<T: 'static>(&mut self) -> Option<&mut T> {
        self.services
            .get_mut(&TypeId::of::<T>())
            .and_then(|b| b.downcast_mut())
    }

    /// Seconds covered by the tick currently in progress.
    pub fn tick_delta(&self) -> f32 {
        self.tick_delta
    }

    pub(crate) fn set_tick_delta(&mut self, delta: f32) {
        self.tick_delta = delta;
    }

    /// The last recorded result of each node, keyed by node guid. Read-only
    /// introspection surface; control flow never consults it.
    pub fn tick_results(&self) -> &HashMap<Uuid, NodeState> {
        &self.tick_results
    }

    pub(crate) fn record_result(&mut self, guid: Uuid, state: NodeState) {
        self.tick_results.insert(guid, state);
    }

    pub(crate) fn clear_results(&mut self) {
        self.tick_results.clear();
    }
}
