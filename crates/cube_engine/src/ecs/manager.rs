//! Entity lifecycle manager
//!
//! Owns every live entity in a slot arena. The manager never drives entities
//! directly; all behavior reacts to bus topics. Its only algorithmic duty is
//! dropping entities that report inactive.

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use slotmap::SlotMap;

use super::entity::{share, Activate, Entity, EntityId, SerialAllocator};

/// Shared handle to a managed entity
pub type EntityRef = Rc<RefCell<dyn Entity>>;

/// Arena of live entities
///
/// Works through `&self` so bus subscribers (such as a factory) can add
/// entities while a dispatch is running.
#[derive(Default)]
pub struct EntityManager {
    entities: RefCell<SlotMap<EntityId, EntityRef>>,
    serials: SerialAllocator,
}

impl EntityManager {
    /// Create an empty manager
    pub fn new() -> Self {
        Self::default()
    }

    /// Serial number for the next entity to be created
    pub fn next_serial(&self) -> u32 {
        self.serials.next_serial()
    }

    /// Register an already activated entity
    pub fn add<E: Entity + 'static>(&self, entity: Rc<RefCell<E>>) -> EntityId {
        let entity: EntityRef = entity;
        self.entities.borrow_mut().insert(entity)
    }

    /// Create, activate and register an entity in one go
    ///
    /// Returns the slot id together with the typed handle.
    pub fn spawn<E, B>(&self, entity: E, bus: &B) -> (EntityId, Rc<RefCell<E>>)
    where
        E: Entity + Activate<B> + 'static,
        B: ?Sized,
    {
        let entity = share(entity);
        E::activate(&entity, bus);
        let id = self.add(Rc::clone(&entity));
        (id, entity)
    }

    /// Look up an entity by slot id
    pub fn get(&self, id: EntityId) -> Option<EntityRef> {
        self.entities.borrow().get(id).cloned()
    }

    /// Whether the slot still holds an entity
    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.borrow().contains_key(id)
    }

    /// Drop every entity reporting inactive, returning how many were removed
    ///
    /// An entity that is mutably borrowed right now is kept and checked again
    /// on the next call.
    pub fn reap_inactive(&self) -> usize {
        let mut entities = self.entities.borrow_mut();
        let before = entities.len();
        entities.retain(|_, entity| entity.try_borrow().map_or(true, |e| e.is_active()));
        let reaped = before - entities.len();
        if reaped > 0 {
            log::debug!("reaped {reaped} inactive entities, {} remain", entities.len());
        }
        reaped
    }

    /// Drop every entity regardless of liveness
    pub fn clear(&self) {
        self.entities.borrow_mut().clear();
    }

    /// Number of managed entities
    pub fn len(&self) -> usize {
        self.entities.borrow().len()
    }

    /// Whether no entity is managed
    pub fn is_empty(&self) -> bool {
        self.entities.borrow().is_empty()
    }

    /// Number of managed entities currently reporting active
    pub fn active_count(&self) -> usize {
        self.entities
            .borrow()
            .values()
            .filter(|entity| entity.try_borrow().map_or(true, |e| e.is_active()))
            .count()
    }

    /// Borrow the arena for inspection
    pub fn entities(&self) -> Ref<'_, SlotMap<EntityId, EntityRef>> {
        self.entities.borrow()
    }
}
