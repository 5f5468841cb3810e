//! 压缩阶段 - 合并重复键并分配稠密ID
//!
//! 分两步: 分组 (为每个位置标记"该键的代表") 与 ID 分配
//! (对标记做前缀和, 把代表散射到唯一键列表)。

use crate::{
    error::HashTableError,
    memory::{DeviceBuffer, MemoryAllocator},
    primitives::{ScanPrimitive, SortPrimitive},
    table::{slots::SlotArray, stash::StashTable},
    types::{Key, KEY_EMPTY},
};
use rayon::prelude::*;
use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
};

/// 分组结果: 每个位置的键及其是否为该键的代表
#[derive(Debug)]
pub struct Grouping {
    keys: DeviceBuffer<Key>,
    flags: DeviceBuffer<u32>,
}

impl Grouping {
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> &[Key] {
        &self.keys
    }

    pub fn flags(&self) -> &[u32] {
        &self.flags
    }
}

/// 压缩阶段, 借用外部的扫描与排序原语
pub struct CompactionStage<'a> {
    scan: &'a dyn ScanPrimitive,
    sort: &'a dyn SortPrimitive,
    allocator: &'a Arc<dyn MemoryAllocator>,
}

impl<'a> CompactionStage<'a> {
    pub fn new(
        scan: &'a dyn ScanPrimitive,
        sort: &'a dyn SortPrimitive,
        allocator: &'a Arc<dyn MemoryAllocator>,
    ) -> Self {
        Self {
            scan,
            sort,
            allocator,
        }
    }

    /// 以已构建的表为分组依据
    ///
    /// 表构建后每个不同的键恰好占据一个位置 (主表或暂存区),
    /// 所以被占用的位置就是代表。位置顺序: 主表槽位, 然后暂存区。
    pub fn group_by_slots(&self, slots: &SlotArray, stash: &StashTable) -> Result<Grouping, HashTableError> {
        let main_len = slots.len();
        let len = main_len + stash.len();
        let keys = DeviceBuffer::from_fn(self.allocator, len, |position| {
            let entry = if position < main_len {
                slots.load(position)
            } else {
                stash.load(position - main_len)
            };
            entry.key()
        })?;
        let mut flags = DeviceBuffer::filled(self.allocator, len, 0u32)?;
        flags
            .par_iter_mut()
            .zip(keys.par_iter())
            .for_each(|(flag, key)| *flag = u32::from(*key != KEY_EMPTY));
        Ok(Grouping { keys, flags })
    }

    /// 以排序为分组依据: 排序后与前一个不同的键为代表
    pub fn group_by_sort(&self, input: &[Key]) -> Result<Grouping, HashTableError> {
        let mut keys = DeviceBuffer::from_fn(self.allocator, input.len(), |i| input[i])?;
        let mut order = DeviceBuffer::from_fn(self.allocator, input.len(), |i| i as u32)?;
        self.sort.sort_pairs(&mut keys, &mut order)?;
        drop(order);

        let mut flags = DeviceBuffer::filled(self.allocator, keys.len(), 0u32)?;
        flags.par_iter_mut().enumerate().for_each(|(i, flag)| {
            *flag = u32::from(i == 0 || keys[i] != keys[i - 1]);
        });
        Ok(Grouping { keys, flags })
    }

    /// 前缀和分配 ID 并生成唯一键列表, `unique[id]` 为该 ID 的键
    pub fn assign_ids(&self, grouping: &Grouping) -> Result<DeviceBuffer<Key>, HashTableError> {
        let mut ids = DeviceBuffer::filled(self.allocator, grouping.len(), 0u32)?;
        let unique_count = self.scan.exclusive_scan(grouping.flags(), &mut ids)? as usize;

        let scattered = DeviceBuffer::from_fn(self.allocator, unique_count, |_| AtomicU32::new(KEY_EMPTY))?;
        grouping
            .flags()
            .par_iter()
            .zip(ids.par_iter())
            .zip(grouping.keys().par_iter())
            .filter(|((flag, _), _)| **flag != 0)
            .for_each(|((_, id), key)| scattered[*id as usize].store(*key, Ordering::Relaxed));

        let unique = DeviceBuffer::from_fn(self.allocator, unique_count, |id| {
            scattered[id].load(Ordering::Relaxed)
        })?;
        log_debug!("compaction assigned {} ids over {} positions", unique_count, grouping.len());
        Ok(unique)
    }
}
