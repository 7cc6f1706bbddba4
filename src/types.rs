//! Basic type definitions for the bot
//!
//! Provides the `SessionId` handle used to address sessions in the
//! registry without leaking raw slot indices.

/// Handle to a registered session
///
/// Pairs a registry slot index with a generation counter. The generation
/// is bumped every time a slot is released, so a handle taken before a
/// close/reopen cycle never resolves to the new occupant of the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId {
    slot: usize,
    generation: u64,
}

impl SessionId {
    pub(crate) fn new(slot: usize, generation: u64) -> Self {
        Self { slot, generation }
    }

    /// Slot index inside the registry (valid only for immediate use)
    pub(crate) fn slot(&self) -> usize {
        self.slot
    }

    /// Generation the slot had when this handle was issued
    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.slot, self.generation)
    }
}
