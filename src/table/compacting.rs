//! 压缩哈希表: 把输入键 (可重复) 映射到稠密ID `[0, K)`

use crate::{
    error::HashTableError,
    hash::HashFunctionSet,
    memory::{default_allocator, DeviceBuffer, MemoryAllocator, MemoryStats},
    primitives::{ParallelScan, ParallelSort, ScanPrimitive, SortPrimitive},
    stats::{global_recorder, StatsRecorder},
    table::{
        compaction::{CompactionStage, Grouping},
        config::{GroupingStrategy, TableConfig},
        shared::TableCore,
        state::{BuildReport, BuildState, BuildStateMachine},
    },
    types::{Entry, Key, OperationType, Value, NOT_FOUND},
};
use rayon::prelude::*;
use std::{sync::Arc, time::Instant};

/// 压缩哈希表
///
/// 构建后 `retrieve` 返回键的ID, 同一键的所有出现得到同一个ID;
/// `unique_keys()[id]` 是该ID对应的键。
pub struct CompactingHashTable {
    core: TableCore,
    unique_keys: Option<DeviceBuffer<Key>>,
    scan: Arc<dyn ScanPrimitive>,
    sort: Arc<dyn SortPrimitive>,
    last_report: Option<BuildReport>,
}

impl CompactingHashTable {
    pub fn new() -> Self {
        Self::with_components(default_allocator(), global_recorder())
    }

    pub fn with_components(allocator: Arc<dyn MemoryAllocator>, stats: Arc<dyn StatsRecorder>) -> Self {
        Self::with_primitives(
            allocator,
            stats,
            Arc::new(ParallelScan::default()),
            Arc::new(ParallelSort::default()),
        )
    }

    /// 注入外部的扫描与排序原语
    pub fn with_primitives(
        allocator: Arc<dyn MemoryAllocator>,
        stats: Arc<dyn StatsRecorder>,
        scan: Arc<dyn ScanPrimitive>,
        sort: Arc<dyn SortPrimitive>,
    ) -> Self {
        Self {
            core: TableCore::new(allocator, stats),
            unique_keys: None,
            scan,
            sort,
            last_report: None,
        }
    }

    pub fn initialize(
        &mut self,
        max_input_size: u32,
        space_usage: f32,
        num_functions: u32,
    ) -> Result<(), HashTableError> {
        self.initialize_with(TableConfig::new(max_input_size, space_usage, num_functions))
    }

    pub fn initialize_with(&mut self, config: TableConfig) -> Result<(), HashTableError> {
        self.unique_keys = None;
        self.last_report = None;
        self.core.initialize(config)
    }

    /// 与 [`HashTable::build`](crate::HashTable::build) 同形, 值被忽略
    pub fn build(&mut self, keys: &[Key], _values: &[Value]) -> Result<(), HashTableError> {
        self.build_keys(keys)
    }

    pub fn build_keys(&mut self, keys: &[Key]) -> Result<(), HashTableError> {
        let start = Instant::now();
        let mut machine = BuildStateMachine::new();
        let mut report = BuildReport {
            input_size: keys.len(),
            ..Default::default()
        };

        self.unique_keys = None;
        self.core.invalidate();
        let result = self
            .core
            .validate_input(keys, None)
            .and_then(|_| self.compact(keys, &mut machine, &mut report));

        if result.is_err() {
            self.unique_keys = None;
        }
        self.last_report = Some(self.core.finish_build(&result, machine, report, start));
        result
    }

    /// 分组, 分配ID, 再以 `(unique_key[id], id)` 重建表
    fn compact(
        &mut self,
        keys: &[Key],
        machine: &mut BuildStateMachine,
        report: &mut BuildReport,
    ) -> Result<(), HashTableError> {
        let start = Instant::now();
        let strategy = self.core.config().grouping;
        let grouping = match strategy {
            GroupingStrategy::TableSlots => self.group_by_slots(keys, machine, report)?,
            GroupingStrategy::Sorted => {
                machine.advance(BuildState::Dedup);
                self.with_stage(|stage| stage.group_by_sort(keys))?
            }
        };

        machine.advance(BuildState::IdAssign);
        let unique = self.with_stage(|stage| stage.assign_ids(&grouping))?;
        drop(grouping);

        let unique_count = unique.len() as u32;
        self.core
            .stats()
            .record_operation(OperationType::Compaction, start.elapsed(), true);
        self.core
            .stats()
            .record_items(OperationType::Compaction, u64::from(unique_count));
        log_debug!("compacted {} keys into {} unique keys", keys.len(), unique_count);

        machine.advance(BuildState::RebuildWithIds);
        let entries: Vec<Entry> = unique
            .par_iter()
            .enumerate()
            .map(|(id, key)| Entry::new(*key, id as u32))
            .collect();
        self.core.build_entries(&entries, machine, report)?;

        report.unique_keys = Some(unique_count);
        self.unique_keys = Some(unique);
        Ok(())
    }

    /// 成员构建后按槽位分组
    fn group_by_slots(
        &mut self,
        keys: &[Key],
        machine: &mut BuildStateMachine,
        report: &mut BuildReport,
    ) -> Result<Grouping, HashTableError> {
        let entries: Vec<Entry> = keys
            .par_iter()
            .enumerate()
            .map(|(index, key)| Entry::new(*key, index as u32))
            .collect();
        self.core.build_entries(&entries, machine, report)?;

        machine.advance(BuildState::Dedup);
        let storage = self.core.storage().ok_or(HashTableError::NotInitialized)?;
        let allocator = self.core.allocator();
        CompactionStage::new(self.scan.as_ref(), self.sort.as_ref(), allocator)
            .group_by_slots(&storage.slots, &storage.stash)
    }

    fn with_stage<T>(
        &self,
        f: impl FnOnce(&CompactionStage<'_>) -> Result<T, HashTableError>,
    ) -> Result<T, HashTableError> {
        let stage = CompactionStage::new(self.scan.as_ref(), self.sort.as_ref(), self.core.allocator());
        f(&stage)
    }

    pub fn retrieve(&self, queries: &[Key]) -> Result<Vec<Value>, HashTableError> {
        let mut results = vec![NOT_FOUND; queries.len()];
        self.retrieve_into(queries, &mut results)?;
        Ok(results)
    }

    pub fn retrieve_into(&self, queries: &[Key], results: &mut [Value]) -> Result<(), HashTableError> {
        self.core.retrieve_into(queries, results)
    }

    /// 唯一键数量 K, 未成功构建时为 0
    pub fn unique_keys_size(&self) -> u32 {
        self.unique_keys.as_ref().map_or(0, |keys| keys.len() as u32)
    }

    /// 唯一键列表, 下标即ID
    pub fn unique_keys(&self) -> &[Key] {
        self.unique_keys.as_deref().unwrap_or(&[])
    }

    pub fn release(&mut self) {
        self.unique_keys = None;
        self.last_report = None;
        self.core.release();
    }

    pub fn config(&self) -> &TableConfig {
        self.core.config()
    }

    pub fn table_size(&self) -> u32 {
        self.core.config().table_size()
    }

    pub fn num_functions(&self) -> u32 {
        self.core.config().num_functions
    }

    pub fn max_iterations(&self) -> u32 {
        self.core.config().max_iterations()
    }

    pub fn stash_count(&self) -> usize {
        self.core.stash_count()
    }

    pub fn is_initialized(&self) -> bool {
        self.core.is_initialized()
    }

    pub fn is_built(&self) -> bool {
        self.core.is_built() && self.unique_keys.is_some()
    }

    pub fn hash_functions(&self) -> Option<&HashFunctionSet> {
        self.core.functions()
    }

    pub fn last_build_report(&self) -> Option<&BuildReport> {
        self.last_report.as_ref()
    }

    pub fn memory_stats(&self) -> MemoryStats {
        self.core.memory_stats()
    }
}

impl Default for CompactingHashTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for CompactingHashTable {
    fn drop(&mut self) {
        self.release();
    }
}
