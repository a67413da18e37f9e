//! Entity implementation
//!
//! An entity is any simulation object that can report whether it is still
//! alive. Behavior is wired entirely through the message bus, so the trait
//! carries nothing else.

use std::cell::RefCell;
use std::rc::Rc;

slotmap::new_key_type! {
    /// Generational handle to an entity slot in the [`EntityManager`](super::EntityManager)
    pub struct EntityId;
}

/// Liveness capability shared by every simulation object
pub trait Entity {
    /// Whether the entity should stay in the simulation
    ///
    /// Once this reports `false` the manager drops the entity at the end of
    /// the tick.
    fn is_active(&self) -> bool;
}

/// Second construction phase for entities that subscribe to a bus
///
/// Subscriptions need a stable shared handle to the entity, which does not
/// exist until the value has been moved behind `Rc<RefCell<_>>`. Creation
/// therefore builds the value first, then `activate` wires it up.
pub trait Activate<B: ?Sized> {
    /// Register the entity's subscriptions on `bus`
    fn activate(this: &Rc<RefCell<Self>>, bus: &B);
}

/// Move a freshly created entity behind a shared handle
pub fn share<E>(entity: E) -> Rc<RefCell<E>> {
    Rc::new(RefCell::new(entity))
}

/// Monotonic serial number source for entities
///
/// Serial numbers are stable, human-readable identities carried in messages
/// (unlike [`EntityId`], which is reused after reaping).
#[derive(Debug, Default)]
pub struct SerialAllocator {
    next: std::cell::Cell<u32>,
}

impl SerialAllocator {
    /// Create an allocator starting at 0
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out the next serial number
    pub fn next_serial(&self) -> u32 {
        let serial = self.next.get();
        self.next.set(serial.wrapping_add(1));
        serial
    }
}
