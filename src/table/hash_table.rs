//! 基础并行 Cuckoo 哈希表: 键映射到调用方提供的值

use crate::{
    error::HashTableError,
    hash::HashFunctionSet,
    memory::{default_allocator, MemoryAllocator, MemoryStats},
    stats::{global_recorder, StatsRecorder},
    table::{
        config::TableConfig,
        shared::TableCore,
        state::{BuildReport, BuildStateMachine},
    },
    types::{Entry, Key, Value, NOT_FOUND},
};
use rayon::prelude::*;
use std::{sync::Arc, time::Instant};

/// 并行 Cuckoo 哈希表
///
/// 生命周期: `initialize` 分配存储, `build` 从空表整体构建,
/// `retrieve` 批量查询, `release` 释放。再次 `build` 会丢弃旧内容。
pub struct HashTable {
    core: TableCore,
    last_report: Option<BuildReport>,
}

impl HashTable {
    pub fn new() -> Self {
        Self::with_components(default_allocator(), global_recorder())
    }

    /// 注入分配器与统计记录器
    pub fn with_components(allocator: Arc<dyn MemoryAllocator>, stats: Arc<dyn StatsRecorder>) -> Self {
        Self {
            core: TableCore::new(allocator, stats),
            last_report: None,
        }
    }

    /// 以默认上限与种子初始化
    pub fn initialize(
        &mut self,
        max_input_size: u32,
        space_usage: f32,
        num_functions: u32,
    ) -> Result<(), HashTableError> {
        self.initialize_with(TableConfig::new(max_input_size, space_usage, num_functions))
    }

    pub fn initialize_with(&mut self, config: TableConfig) -> Result<(), HashTableError> {
        self.last_report = None;
        self.core.initialize(config)
    }

    /// 用 `keys[i] -> values[i]` 构建表
    ///
    /// 重复键只保留一份, 保留哪个值不作保证。
    pub fn build(&mut self, keys: &[Key], values: &[Value]) -> Result<(), HashTableError> {
        let start = Instant::now();
        let mut machine = BuildStateMachine::new();
        let mut report = BuildReport {
            input_size: keys.len(),
            ..Default::default()
        };

        self.core.invalidate();
        let result = self
            .core
            .validate_input(keys, Some(values))
            .and_then(|_| {
                let entries: Vec<Entry> = keys
                    .par_iter()
                    .zip(values.par_iter())
                    .map(|(key, value)| Entry::new(*key, *value))
                    .collect();
                self.core.build_entries(&entries, &mut machine, &mut report)
            });

        self.last_report = Some(self.core.finish_build(&result, machine, report, start));
        result
    }

    /// 批量查询, 未命中的位置为 [`NOT_FOUND`]
    pub fn retrieve(&self, queries: &[Key]) -> Result<Vec<Value>, HashTableError> {
        let mut results = vec![NOT_FOUND; queries.len()];
        self.retrieve_into(queries, &mut results)?;
        Ok(results)
    }

    pub fn retrieve_into(&self, queries: &[Key], results: &mut [Value]) -> Result<(), HashTableError> {
        self.core.retrieve_into(queries, results)
    }

    /// 释放全部存储, 可重复调用
    pub fn release(&mut self) {
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
        self.core.is_built()
    }

    /// 最近一次成功构建使用的哈希函数
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

impl Default for HashTable {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for HashTable {
    fn drop(&mut self) {
        self.release();
    }
}
