//! Slot arena with generation-checked handles
//!
//! Entities reference each other (worm chain links, missile targets,
//! projectile parents) by `Handle`. A freed slot is reused with a bumped
//! generation, so a stale handle can never resolve to the new occupant.
//!
//! Removal is deferred: `mark_for_removal` hides an entry from lookups and
//! iteration immediately, and `flush_removals` frees all marked slots in one
//! pass at tick end.

use serde::{Serialize, Serializer};

/// Index + generation reference into an `Arena`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Handle {
    index: u32,
    generation: u32,
}

impl Handle {
    /// Placeholder for values not yet inserted; never resolves
    pub const DANGLING: Handle = Handle {
        index: u32::MAX,
        generation: u32::MAX,
    };

    #[inline]
    pub fn index(&self) -> usize {
        self.index as usize
    }

    #[inline]
    pub fn generation(&self) -> u32 {
        self.generation
    }
}

#[derive(Debug, Clone)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
    marked: bool,
}

#[derive(Debug, Clone)]
pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    /// Occupied slots, including ones marked for removal
    len: usize,
    pending: Vec<Handle>,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
            pending: Vec::new(),
        }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::new(),
            len: 0,
            pending: Vec::new(),
        }
    }

    /// Occupied entries (marked ones count until the next flush)
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Insert a value, reusing a free slot when one exists
    pub fn insert(&mut self, value: T) -> Handle {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            slot.marked = false;
            return Handle {
                index,
                generation: slot.generation,
            };
        }
        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            value: Some(value),
            marked: false,
        });
        Handle {
            index,
            generation: 0,
        }
    }

    fn slot(&self, handle: Handle) -> Option<&Slot<T>> {
        self.slots
            .get(handle.index())
            .filter(|s| s.generation == handle.generation && s.value.is_some())
    }

    /// True if the handle refers to a live, unmarked entry
    #[inline]
    pub fn contains(&self, handle: Handle) -> bool {
        self.slot(handle).is_some_and(|s| !s.marked)
    }

    /// True if the entry exists but is scheduled for removal
    #[inline]
    pub fn is_marked(&self, handle: Handle) -> bool {
        self.slot(handle).is_some_and(|s| s.marked)
    }

    /// Live entry lookup; stale or marked handles resolve to `None`
    pub fn get(&self, handle: Handle) -> Option<&T> {
        self.slot(handle)
            .filter(|s| !s.marked)
            .and_then(|s| s.value.as_ref())
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        self.slots
            .get_mut(handle.index())
            .filter(|s| s.generation == handle.generation && !s.marked)
            .and_then(|s| s.value.as_mut())
    }

    /// Schedule removal at the next flush. Returns false if the handle was
    /// already stale or marked.
    pub fn mark_for_removal(&mut self, handle: Handle) -> bool {
        let Some(slot) = self.slots.get_mut(handle.index()) else {
            return false;
        };
        if slot.generation != handle.generation || slot.value.is_none() || slot.marked {
            return false;
        }
        slot.marked = true;
        self.pending.push(handle);
        true
    }

    /// Entries waiting for the next flush
    #[inline]
    pub fn pending_removals(&self) -> usize {
        self.pending.len()
    }

    /// Free every marked slot. Returns the number removed.
    pub fn flush_removals(&mut self) -> usize {
        let removed = self.pending.len();
        for handle in self.pending.drain(..) {
            let slot = &mut self.slots[handle.index()];
            slot.value = None;
            slot.marked = false;
            slot.generation = slot.generation.wrapping_add(1);
            self.free.push(handle.index);
        }
        self.len -= removed;
        removed
    }

    /// Live entries in slot order
    pub fn iter(&self) -> impl Iterator<Item = (Handle, &T)> {
        self.slots.iter().enumerate().filter_map(|(i, s)| {
            if s.marked {
                return None;
            }
            s.value.as_ref().map(|v| {
                (
                    Handle {
                        index: i as u32,
                        generation: s.generation,
                    },
                    v,
                )
            })
        })
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Handle, &mut T)> {
        self.slots.iter_mut().enumerate().filter_map(|(i, s)| {
            if s.marked {
                return None;
            }
            let generation = s.generation;
            s.value.as_mut().map(|v| {
                (
                    Handle {
                        index: i as u32,
                        generation,
                    },
                    v,
                )
            })
        })
    }

    /// Fill `out` with the handles of all live entries (reuses its allocation)
    pub fn collect_handles(&self, out: &mut Vec<Handle>) {
        out.clear();
        out.extend(self.iter().map(|(h, _)| h));
    }

    /// Drop everything, invalidating all outstanding handles
    pub fn clear(&mut self) {
        self.free.clear();
        self.pending.clear();
        for (i, slot) in self.slots.iter_mut().enumerate() {
            if slot.value.is_some() {
                slot.generation = slot.generation.wrapping_add(1);
            }
            slot.value = None;
            slot.marked = false;
            self.free.push(i as u32);
        }
        self.len = 0;
    }
}

/// Renderers see a flat list of live entries
impl<T: Serialize> Serialize for Arena<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter().map(|(_, v)| v))
    }
}
