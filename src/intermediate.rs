//! Per-row intermediate scratch storage.
//!
//! Grounded on `vm.rs`'s `VM` stack/frame storage: a fixed-capacity, index-addressed
//! scratch area that never grows mid-evaluation. Here each slot is a fixed 8-byte cell
//! plus a validity bit, sized once from the plan's declared intermediate count and
//! reused, overwritten in place, across every row a single `ExpressionEvaluator`
//! processes -- the same slab a real per-thread kernel invocation would hold in
//! registers or local memory.

use crate::types::ElementType;

pub struct IntermediateStorage {
    slots: Vec<[u8; 8]>,
    valid: Vec<bool>,
}

impl IntermediateStorage {
    pub fn new(num_slots: usize) -> Self {
        IntermediateStorage {
            slots: vec![[0u8; 8]; num_slots],
            valid: vec![false; num_slots],
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn write<T: ElementType>(&mut self, slot: usize, value: Option<T>) {
        assert!(
            slot < self.slots.len(),
            "intermediate slot {} out of range (storage has {} slots) -- this indicates an invalid plan",
            slot,
            self.slots.len()
        );
        match value {
            Some(v) => {
                self.slots[slot] = v.to_intermediate();
                self.valid[slot] = true;
            }
            None => self.valid[slot] = false,
        }
    }

    pub fn read<T: ElementType>(&self, slot: usize) -> Option<T> {
        assert!(
            slot < self.slots.len(),
            "intermediate slot {} out of range (storage has {} slots) -- this indicates an invalid plan",
            slot,
            self.slots.len()
        );
        if self.valid[slot] {
            Some(T::from_intermediate(self.slots[slot]))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_then_read_round_trips() {
        let mut storage = IntermediateStorage::new(4);
        storage.write(1, Some(42i64));
        assert_eq!(storage.read::<i64>(1), Some(42i64));
    }

    #[test]
    fn null_write_reads_back_null() {
        let mut storage = IntermediateStorage::new(1);
        storage.write::<f64>(0, None);
        assert_eq!(storage.read::<f64>(0), None);
    }

    #[test]
    #[should_panic]
    fn out_of_range_slot_panics() {
        let storage = IntermediateStorage::new(1);
        storage.read::<i32>(5);
    }
}
