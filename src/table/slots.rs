//! 主表槽位数组 - 每个槽位是一个原子64位条目

use crate::{
    error::HashTableError,
    memory::{DeviceBuffer, MemoryAllocator},
    types::Entry,
};
use rayon::prelude::*;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

/// 主表槽位数组
#[derive(Debug)]
pub struct SlotArray {
    slots: DeviceBuffer<AtomicU64>,
}

impl SlotArray {
    /// 分配 `len` 个空槽位
    pub fn new(allocator: &Arc<dyn MemoryAllocator>, len: usize) -> Result<Self, HashTableError> {
        let slots = DeviceBuffer::from_fn(allocator, len, |_| AtomicU64::new(Entry::EMPTY.bits()))?;
        Ok(Self { slots })
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn size_in_bytes(&self) -> usize {
        self.slots.size_in_bytes()
    }

    /// 并行清空所有槽位
    pub fn clear(&self) {
        self.slots
            .par_iter()
            .for_each(|slot| slot.store(Entry::EMPTY.bits(), Ordering::Relaxed));
    }

    #[inline]
    pub fn load(&self, index: usize) -> Entry {
        Entry::from_bits(self.slots[index].load(Ordering::Acquire))
    }

    #[inline]
    pub fn store(&self, index: usize, entry: Entry) {
        self.slots[index].store(entry.bits(), Ordering::Release);
    }

    /// 比较并交换, 失败时返回槽位中的实际条目
    #[inline]
    pub fn compare_exchange(&self, index: usize, current: Entry, new: Entry) -> Result<Entry, Entry> {
        self.slots[index]
            .compare_exchange(current.bits(), new.bits(), Ordering::AcqRel, Ordering::Acquire)
            .map(Entry::from_bits)
            .map_err(Entry::from_bits)
    }

    /// 非空槽位数
    pub fn occupied(&self) -> usize {
        self.slots
            .par_iter()
            .filter(|slot| !Entry::from_bits(slot.load(Ordering::Relaxed)).is_empty())
            .count()
    }
}
