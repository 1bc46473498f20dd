//! Index-stable storage for regions and tree nodes.
//!
//! Slots are handed out as `u32` indices and recycled through a free list.
//! Everything that refers to a region or tree node does so by index; the
//! pool is the only owner.

use std::ops::{Index, IndexMut};

#[derive(Debug)]
pub struct Pool<T> {
    slots: Vec<T>,
    free: Vec<u32>,
}

impl<T: Default> Pool<T> {
    pub fn new() -> Self {
        Pool {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    /// Claim a slot, reusing a freed one when available. The slot starts
    /// out as `T::default()`.
    pub fn alloc(&mut self) -> u32 {
        match self.free.pop() {
            Some(idx) => {
                self.slots[idx as usize] = T::default();
                idx
            }
            None => {
                self.slots.push(T::default());
                (self.slots.len() - 1) as u32
            }
        }
    }

    /// Return a slot to the free list.
    pub fn release(&mut self, idx: u32) {
        self.free.push(idx);
    }

    /// The raw slot storage, for read-only access alongside other borrows.
    pub fn slots(&self) -> &[T] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
    }
}

impl<T: Default> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Index<u32> for Pool<T> {
    type Output = T;
    fn index(&self, idx: u32) -> &T {
        &self.slots[idx as usize]
    }
}

impl<T> IndexMut<u32> for Pool<T> {
    fn index_mut(&mut self, idx: u32) -> &mut T {
        &mut self.slots[idx as usize]
    }
}
