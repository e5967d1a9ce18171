use std::marker::PhantomData;

/// Items that can be handed out by a [Pool] more than once.
pub trait Poolable: Default {
    /// Return the item to its inert state. Called before it is put back on the free list.
    fn reset(&mut self);
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum PoolError {
    #[error("Slot {index} in the {pool} pool is not active")]
    NotActive { pool: &'static str, index: u32 },
}

/// Refers to an item handed out by a [Pool].
///
/// A handle is only valid until its item goes back to the pool. The slot's generation is bumped
/// every time it is freed, so a kept handle never resolves to a later allocation of the same slot.
pub struct PoolHandle<T> {
    index: u32,
    generation: u32,
    _marker: PhantomData<T>,
}

impl<T> PoolHandle<T> {
    fn new(index: u32, generation: u32) -> Self {
        Self {
            index,
            generation,
            _marker: PhantomData,
        }
    }

    /// Index of the slot, shared by every generation.
    pub fn as_raw(&self) -> u32 {
        self.index
    }
}

impl<T> Clone for PoolHandle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for PoolHandle<T> {}

impl<T> std::hash::Hash for PoolHandle<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.index.hash(state);
        self.generation.hash(state);
    }
}

impl<T> PartialEq for PoolHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index && self.generation == other.generation
    }
}

impl<T> Eq for PoolHandle<T> {}

impl<T> std::fmt::Debug for PoolHandle<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("PoolHandle")
            .field(&self.index)
            .field(&self.generation)
            .finish()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SlotState {
    Free,
    Active,
}

/// Recycling allocator. Every slot is either on the free list or on the active list.
pub struct Pool<T> {
    label: &'static str,
    items: Vec<T>,
    states: Vec<SlotState>,
    generations: Vec<u32>,
    /// Free slots, the last one is handed out first.
    free: Vec<u32>,
    /// Active slots in allocation order.
    active: Vec<u32>,
}

impl<T: Poolable> Pool<T> {
    pub fn new(label: &'static str) -> Self {
        Self {
            label,
            items: Vec::default(),
            states: Vec::default(),
            generations: Vec::default(),
            free: Vec::default(),
            active: Vec::default(),
        }
    }

    pub fn with_prewarm(label: &'static str, count: usize) -> Self {
        let mut pool = Self::new(label);
        pool.prewarm(count);
        pool
    }

    /// Create `count` new items and put them on the free list.
    pub fn prewarm(&mut self, count: usize) {
        self.items.reserve(count);
        for _ in 0..count {
            let index = self.push_slot(SlotState::Free);
            self.free.push(index);
        }
    }

    fn push_slot(&mut self, state: SlotState) -> u32 {
        let index = self.items.len() as u32;
        self.items.push(T::default());
        self.states.push(state);
        self.generations.push(0);
        index
    }

    /// Hand out an item, reusing a free one if available.
    pub fn allocate(&mut self) -> PoolHandle<T> {
        let index = match self.free.pop() {
            Some(index) => {
                self.states[index as usize] = SlotState::Active;
                index
            }
            None => {
                let index = self.push_slot(SlotState::Active);
                tracing::debug!("Grew the {} pool to {} items.", self.label, self.items.len());
                index
            }
        };

        self.active.push(index);
        PoolHandle::new(index, self.generations[index as usize])
    }

    /// Same as [Pool::allocate], but also returns the item so it can be filled in.
    pub fn allocate_mut(&mut self) -> (PoolHandle<T>, &mut T) {
        let handle = self.allocate();
        (handle, &mut self.items[handle.index as usize])
    }

    pub fn is_active(&self, handle: PoolHandle<T>) -> bool {
        let index = handle.index as usize;
        self.states.get(index) == Some(&SlotState::Active)
            && self.generations[index] == handle.generation
    }

    pub fn get(&self, handle: PoolHandle<T>) -> Option<&T> {
        self.is_active(handle)
            .then(|| &self.items[handle.index as usize])
    }

    pub fn get_mut(&mut self, handle: PoolHandle<T>) -> Option<&mut T> {
        if self.is_active(handle) {
            Some(&mut self.items[handle.index as usize])
        } else {
            None
        }
    }

    /// Return a single item to the pool before the end of the frame.
    pub fn release(&mut self, handle: PoolHandle<T>) -> Result<(), PoolError> {
        if !self.is_active(handle) {
            return Err(PoolError::NotActive {
                pool: self.label,
                index: handle.index,
            });
        }

        if let Some(position) = self.active.iter().position(|&index| index == handle.index) {
            self.active.remove(position);
        }
        self.free_slot(handle.index);

        Ok(())
    }

    /// Return every active item to the pool.
    pub fn recycle_all(&mut self) {
        let active = std::mem::take(&mut self.active);
        for &index in active.iter() {
            self.free_slot(index);
        }
        // Keep the allocation around for the next frame.
        self.active = active;
        self.active.clear();
    }

    fn free_slot(&mut self, index: u32) {
        self.items[index as usize].reset();
        self.states[index as usize] = SlotState::Free;
        self.generations[index as usize] = self.generations[index as usize].wrapping_add(1);
        self.free.push(index);
    }

    /// Active items in allocation order.
    pub fn active(&self) -> impl Iterator<Item = (PoolHandle<T>, &T)> + '_ {
        self.active
            .iter()
            .map(|&index| {
                let handle = PoolHandle::new(index, self.generations[index as usize]);
                (handle, &self.items[index as usize])
            })
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    /// Total amount of items owned by the pool.
    pub fn capacity(&self) -> usize {
        self.items.len()
    }
}
