//! 暂存区 - 容纳驱逐轮数用尽后仍未放置的少量条目

use crate::{
    error::HashTableError,
    memory::{DeviceBuffer, MemoryAllocator},
    types::{Entry, Key},
};
use crossbeam::utils::CachePadded;
use rayon::prelude::*;
use std::sync::{
    atomic::{AtomicU64, AtomicUsize, Ordering},
    Arc,
};

/// 定长暂存区
///
/// 插入通过原子计数器预留下标, 超过容量即为溢出; 溢出只是本次构建尝试的失败信号。
#[derive(Debug)]
pub struct StashTable {
    entries: DeviceBuffer<AtomicU64>,
    count: CachePadded<AtomicUsize>,
}

impl StashTable {
    pub fn new(allocator: &Arc<dyn MemoryAllocator>, capacity: usize) -> Result<Self, HashTableError> {
        let entries = DeviceBuffer::from_fn(allocator, capacity, |_| AtomicU64::new(Entry::EMPTY.bits()))?;
        Ok(Self {
            entries,
            count: CachePadded::new(AtomicUsize::new(0)),
        })
    }

    pub fn capacity(&self) -> usize {
        self.entries.len()
    }

    /// 已预留的下标数 (不超过容量)
    pub fn len(&self) -> usize {
        self.count.load(Ordering::Acquire).min(self.capacity())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 尝试插入的总次数超过了容量
    pub fn overflowed(&self) -> bool {
        self.count.load(Ordering::Acquire) > self.capacity()
    }

    pub fn size_in_bytes(&self) -> usize {
        self.entries.size_in_bytes()
    }

    pub fn clear(&self) {
        self.entries
            .iter()
            .for_each(|entry| entry.store(Entry::EMPTY.bits(), Ordering::Relaxed));
        self.count.store(0, Ordering::Release);
    }

    /// 插入一个条目, 返回其下标
    pub fn insert(&self, entry: Entry) -> Result<usize, HashTableError> {
        let index = self.count.fetch_add(1, Ordering::AcqRel);
        if index >= self.capacity() {
            return Err(HashTableError::StashOverflow {
                count: index + 1,
                capacity: self.capacity(),
            });
        }
        self.entries[index].store(entry.bits(), Ordering::Release);
        Ok(index)
    }

    /// 并行插入一批条目; 任何一个溢出即报告溢出及最终计数
    pub fn insert_all(&self, entries: &[Entry]) -> Result<(), HashTableError> {
        let overflowed = entries
            .par_iter()
            .map(|entry| self.insert(*entry).is_err())
            .reduce(|| false, |a, b| a || b);
        if overflowed {
            return Err(HashTableError::StashOverflow {
                count: self.count.load(Ordering::Acquire),
                capacity: self.capacity(),
            });
        }
        Ok(())
    }

    #[inline]
    pub fn load(&self, index: usize) -> Entry {
        Entry::from_bits(self.entries[index].load(Ordering::Acquire))
    }

    #[inline]
    pub fn store(&self, index: usize, entry: Entry) {
        self.entries[index].store(entry.bits(), Ordering::Release);
    }

    /// 线性扫描查找键, 返回下标与条目
    #[inline]
    pub fn find(&self, key: Key) -> Option<(usize, Entry)> {
        (0..self.len())
            .map(|index| (index, self.load(index)))
            .find(|(_, entry)| !entry.is_empty() && entry.key() == key)
    }

    /// 非空条目数
    pub fn occupied(&self) -> usize {
        (0..self.len()).filter(|index| !self.load(*index).is_empty()).count()
    }
}
