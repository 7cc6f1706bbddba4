//! Session registry
//!
//! Fixed-capacity arena of session slots; the single source of truth
//! for what is open right now. A slot is registered iff it holds a live
//! session, and every handle carries the slot generation so a recycled
//! slot never answers to a stale handle.

use crate::error::AppError;
use crate::session::Session;
use crate::types::SessionId;

struct Slot {
    generation: u64,
    session: Option<Session>,
}

/// Bounded collection of live sessions
pub struct Registry {
    slots: Vec<Slot>,
}

impl Registry {
    /// Create a registry with `capacity` slots, all free
    pub fn new(capacity: usize) -> Self {
        let slots = (0..capacity)
            .map(|_| Slot {
                generation: 0,
                session: None,
            })
            .collect();
        Self { slots }
    }

    /// Total number of slots
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Number of registered sessions
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.session.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_full(&self) -> bool {
        self.slots.iter().all(|s| s.session.is_some())
    }

    /// Register a session in the lowest free slot
    pub fn acquire(&mut self, session: Session) -> Result<SessionId, AppError> {
        let (index, slot) = self
            .slots
            .iter_mut()
            .enumerate()
            .find(|(_, s)| s.session.is_none())
            .ok_or(AppError::RegistryFull)?;

        slot.session = Some(session);
        Ok(SessionId::new(index, slot.generation))
    }

    /// Free a slot, returning its session
    ///
    /// A stale or already-free handle is a no-op returning `None`;
    /// teardown is idempotent.
    pub fn release(&mut self, id: SessionId) -> Option<Session> {
        let slot = self.slot_mut(id)?;
        let session = slot.session.take();
        if session.is_some() {
            slot.generation += 1;
        }
        session
    }

    pub fn get(&self, id: SessionId) -> Option<&Session> {
        let slot = self.slots.get(id.slot())?;
        if slot.generation != id.generation() {
            return None;
        }
        slot.session.as_ref()
    }

    pub fn get_mut(&mut self, id: SessionId) -> Option<&mut Session> {
        self.slot_mut(id)?.session.as_mut()
    }

    /// Registered sessions in ascending slot order
    pub fn iter(&self) -> impl Iterator<Item = (SessionId, &Session)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.session
                .as_ref()
                .map(|session| (SessionId::new(index, slot.generation), session))
        })
    }

    fn slot_mut(&mut self, id: SessionId) -> Option<&mut Slot> {
        let slot = self.slots.get_mut(id.slot())?;
        if slot.generation != id.generation() {
            return None;
        }
        Some(slot)
    }
}
