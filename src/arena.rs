//! Generational arena with deferred destruction.
//!
//! Entities are addressed by [`Index`] rather than by reference, so an
//! entity can ask to be destroyed while a broadcast over the arena is still
//! running. Destruction is two-phase: [`Arena::mark`] flags the slot, and
//! [`Arena::sweep`] removes every flagged value at a single safe point.
//! A stale index (its slot freed and reused) never aliases the new value
//! because the slot generation changes on every removal.

/// Stable handle to a value in an [`Arena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Index {
    slot: u32,
    generation: u32,
}

impl Index {
    /// Slot number, for diagnostics.
    #[inline]
    pub fn slot(&self) -> u32 {
        self.slot
    }
}

#[derive(Debug)]
enum Slot<T> {
    Occupied {
        generation: u32,
        value: T,
        marked: bool,
    },
    Vacant {
        generation: u32,
    },
}

/// Slot storage with free-list reuse.
#[derive(Debug)]
pub struct Arena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    len: usize,
}

impl<T> Arena<T> {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }

    /// Number of values, marked or not.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Store a value and return its handle.
    pub fn insert(&mut self, value: T) -> Index {
        self.len += 1;
        if let Some(slot) = self.free.pop() {
            let entry = &mut self.slots[slot as usize];
            let generation = match entry {
                Slot::Vacant { generation } => *generation,
                // Free list only holds vacant slots
                Slot::Occupied { generation, .. } => generation.wrapping_add(1),
            };
            *entry = Slot::Occupied {
                generation,
                value,
                marked: false,
            };
            return Index { slot, generation };
        }

        let slot = self.slots.len() as u32;
        self.slots.push(Slot::Occupied {
            generation: 0,
            value,
            marked: false,
        });
        Index { slot, generation: 0 }
    }

    pub fn get(&self, index: Index) -> Option<&T> {
        match self.slots.get(index.slot as usize) {
            Some(Slot::Occupied { generation, value, .. }) if *generation == index.generation => {
                Some(value)
            }
            _ => None,
        }
    }

    pub fn get_mut(&mut self, index: Index) -> Option<&mut T> {
        match self.slots.get_mut(index.slot as usize) {
            Some(Slot::Occupied { generation, value, .. }) if *generation == index.generation => {
                Some(value)
            }
            _ => None,
        }
    }

    pub fn contains(&self, index: Index) -> bool {
        self.get(index).is_some()
    }

    /// Remove a value immediately.
    pub fn remove(&mut self, index: Index) -> Option<T> {
        let entry = self.slots.get_mut(index.slot as usize)?;
        match entry {
            Slot::Occupied { generation, .. } if *generation == index.generation => {}
            _ => return None,
        }
        let vacant = Slot::Vacant {
            generation: index.generation.wrapping_add(1),
        };
        match std::mem::replace(entry, vacant) {
            Slot::Occupied { value, .. } => {
                self.free.push(index.slot);
                self.len -= 1;
                Some(value)
            }
            Slot::Vacant { .. } => None,
        }
    }

    /// Flag a value for removal at the next [`sweep`](Self::sweep).
    ///
    /// Returns `false` for stale handles. Marking twice is harmless.
    pub fn mark(&mut self, index: Index) -> bool {
        match self.slots.get_mut(index.slot as usize) {
            Some(Slot::Occupied { generation, marked, .. }) if *generation == index.generation => {
                *marked = true;
                true
            }
            _ => false,
        }
    }

    pub fn is_marked(&self, index: Index) -> bool {
        matches!(
            self.slots.get(index.slot as usize),
            Some(Slot::Occupied { generation, marked: true, .. }) if *generation == index.generation
        )
    }

    /// Remove every marked value, returning them in slot order.
    pub fn sweep(&mut self) -> Vec<(Index, T)> {
        let marked: Vec<Index> = self
            .iter_with_marks()
            .filter(|(_, _, marked)| *marked)
            .map(|(index, _, _)| index)
            .collect();
        marked
            .into_iter()
            .filter_map(|index| self.remove(index).map(|value| (index, value)))
            .collect()
    }

    /// Snapshot of every handle that is not marked.
    ///
    /// Broadcasts iterate this snapshot so values inserted or marked during
    /// the broadcast do not disturb it.
    pub fn live_indices(&self) -> Vec<Index> {
        self.iter().map(|(index, _)| index).collect()
    }

    /// Unmarked values with their handles.
    pub fn iter(&self) -> impl Iterator<Item = (Index, &T)> {
        self.iter_with_marks()
            .filter(|(_, _, marked)| !*marked)
            .map(|(index, value, _)| (index, value))
    }

    /// Unmarked values, mutably.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Index, &mut T)> {
        self.slots
            .iter_mut()
            .enumerate()
            .filter_map(|(slot, entry)| match entry {
                Slot::Occupied {
                    generation,
                    value,
                    marked: false,
                } => Some((
                    Index {
                        slot: slot as u32,
                        generation: *generation,
                    },
                    value,
                )),
                _ => None,
            })
    }

    fn iter_with_marks(&self) -> impl Iterator<Item = (Index, &T, bool)> {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(slot, entry)| match entry {
                Slot::Occupied {
                    generation,
                    value,
                    marked,
                } => Some((
                    Index {
                        slot: slot as u32,
                        generation: *generation,
                    },
                    value,
                    *marked,
                )),
                Slot::Vacant { .. } => None,
            })
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}
