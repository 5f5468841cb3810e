//! 表核心 - 两种哈希表共享的存储与有界重启构建循环

use crate::{
    error::HashTableError,
    hash::{HashFunctionSet, SeedSequence},
    memory::{MemoryAllocator, MemoryStats},
    stats::StatsRecorder,
    table::{
        config::TableConfig,
        engine::CuckooBuildEngine,
        retrieve::RetrievalEngine,
        slots::SlotArray,
        stash::StashTable,
        state::{BuildReport, BuildState, BuildStateMachine},
    },
    types::{Entry, Key, OperationType, KEY_EMPTY},
};
use rayon::prelude::*;
use std::{
    sync::Arc,
    time::{Duration, Instant},
};

/// 初始化后持有的设备数组
#[derive(Debug)]
pub(crate) struct TableStorage {
    pub(crate) slots: SlotArray,
    pub(crate) stash: StashTable,
}

pub(crate) struct TableCore {
    config: TableConfig,
    storage: Option<TableStorage>,
    /// 最近一次成功构建使用的函数集合; `None` 表示不可查询
    functions: Option<HashFunctionSet>,
    seeds: SeedSequence,
    build_index: u64,
    allocator: Arc<dyn MemoryAllocator>,
    stats: Arc<dyn StatsRecorder>,
}

impl TableCore {
    pub(crate) fn new(allocator: Arc<dyn MemoryAllocator>, stats: Arc<dyn StatsRecorder>) -> Self {
        Self {
            config: TableConfig::default(),
            storage: None,
            functions: None,
            seeds: SeedSequence::default(),
            build_index: 0,
            allocator,
            stats,
        }
    }

    pub(crate) fn initialize(&mut self, config: TableConfig) -> Result<(), HashTableError> {
        let start = Instant::now();
        self.release();

        let result = config.validate().and_then(|_| {
            let slots = SlotArray::new(&self.allocator, config.table_size() as usize)?;
            let stash = StashTable::new(&self.allocator, config.limits.stash_capacity)?;
            Ok(TableStorage { slots, stash })
        });
        self.stats
            .record_operation(OperationType::Initialize, start.elapsed(), result.is_ok());

        match result {
            Ok(storage) => {
                log_info!(
                    "initialized table: max_input_size={}, table_size={}, functions={}, stash={}, max_iterations={}",
                    config.max_input_size,
                    config.table_size(),
                    config.num_functions,
                    config.limits.stash_capacity,
                    config.max_iterations()
                );
                self.seeds = SeedSequence::new(config.seed);
                self.build_index = 0;
                self.config = config;
                self.storage = Some(storage);
                Ok(())
            }
            Err(err) => {
                log_error!("initialize failed: {}", err);
                Err(err)
            }
        }
    }

    /// 释放全部设备数组, 可重复调用
    pub(crate) fn release(&mut self) {
        self.functions = None;
        if let Some(storage) = self.storage.take() {
            log_debug!(
                "releasing {} bytes of table storage",
                storage.slots.size_in_bytes() + storage.stash.size_in_bytes()
            );
            drop(storage);
            self.stats
                .record_operation(OperationType::Release, Duration::ZERO, true);
        }
    }

    /// 丢弃上一次构建, 之后的查询返回 `NotBuilt`
    pub(crate) fn invalidate(&mut self) {
        self.functions = None;
    }

    pub(crate) fn config(&self) -> &TableConfig {
        &self.config
    }

    pub(crate) fn allocator(&self) -> &Arc<dyn MemoryAllocator> {
        &self.allocator
    }

    pub(crate) fn stats(&self) -> &Arc<dyn StatsRecorder> {
        &self.stats
    }

    pub(crate) fn storage(&self) -> Option<&TableStorage> {
        self.storage.as_ref()
    }

    pub(crate) fn functions(&self) -> Option<&HashFunctionSet> {
        self.functions.as_ref()
    }

    pub(crate) fn is_initialized(&self) -> bool {
        self.storage.is_some()
    }

    pub(crate) fn is_built(&self) -> bool {
        self.functions.is_some()
    }

    pub(crate) fn memory_stats(&self) -> MemoryStats {
        self.allocator.stats()
    }

    /// 非空的暂存条目数
    pub(crate) fn stash_count(&self) -> usize {
        match (&self.storage, &self.functions) {
            (Some(storage), Some(_)) => storage.stash.occupied(),
            _ => 0,
        }
    }

    /// 校验输入键 (与可选的值数组)
    pub(crate) fn validate_input(&self, keys: &[Key], values: Option<&[u32]>) -> Result<(), HashTableError> {
        if self.storage.is_none() {
            return Err(HashTableError::NotInitialized);
        }
        let max_input_size = self.config.max_input_size as usize;
        if keys.len() > max_input_size {
            return Err(HashTableError::InputTooLarge {
                input_size: keys.len(),
                max_input_size,
            });
        }
        if let Some(values) = values {
            if values.len() != keys.len() {
                return Err(HashTableError::LengthMismatch {
                    expected: keys.len(),
                    actual: values.len(),
                });
            }
        }
        if let Some(index) = keys.par_iter().position_first(|key| *key == KEY_EMPTY) {
            return Err(HashTableError::ReservedKey { index });
        }
        Ok(())
    }

    /// 有界重启循环: 每次尝试用新的函数集合从空表开始放置
    pub(crate) fn build_entries(
        &mut self,
        entries: &[Entry],
        machine: &mut BuildStateMachine,
        report: &mut BuildReport,
    ) -> Result<(), HashTableError> {
        self.invalidate();
        let storage = self.storage.as_ref().ok_or(HashTableError::NotInitialized)?;
        let build_index = self.build_index;
        self.build_index += 1;

        let table_size = self.config.table_size();
        let max_iterations = self.config.max_iterations();
        let max_attempts = self.config.limits.max_restart_attempts;
        report.table_size = table_size;

        for attempt in 0..max_attempts {
            machine.advance(BuildState::AssignHashFuncs);
            let seed = self.seeds.attempt_seed(build_index, attempt);
            let functions = HashFunctionSet::generate(self.config.num_functions, table_size, seed)?;

            machine.advance(BuildState::CuckooInsert);
            let engine = CuckooBuildEngine::new(&storage.slots, &storage.stash, &functions, max_iterations);
            let outcome = engine.run(entries);

            report.record_attempt(outcome.rounds, outcome.evictions);
            self.stats.record_items(OperationType::Eviction, outcome.evictions);

            if outcome.unplaced > 0 {
                machine.advance(BuildState::StashFallback);
                self.stats
                    .record_items(OperationType::StashInsert, outcome.unplaced as u64);
            }

            if outcome.succeeded() {
                machine.advance(BuildState::Success);
                report.stash_count = storage.stash.occupied();
                report.seed = Some(seed);
                log_debug!(
                    "attempt {} placed {} entries in {} rounds ({} evictions, {} stashed)",
                    attempt,
                    entries.len(),
                    outcome.rounds,
                    outcome.evictions,
                    report.stash_count
                );
                self.functions = Some(functions);
                return Ok(());
            }

            log_warn!(
                "attempt {} failed: {} entries unplaced after {} rounds, stash capacity {}; restarting",
                attempt,
                outcome.unplaced,
                outcome.rounds,
                storage.stash.capacity()
            );
            machine.advance(BuildState::Restart);
            self.stats
                .record_operation(OperationType::Restart, Duration::ZERO, false);
        }

        machine.advance(BuildState::Fail);
        log_error!("build failed after {} attempts", max_attempts);
        Err(HashTableError::BuildFailed {
            attempts: max_attempts,
        })
    }

    /// 当前表的查询引擎
    pub(crate) fn retrieval(&self) -> Result<RetrievalEngine<'_>, HashTableError> {
        let storage = self.storage.as_ref().ok_or(HashTableError::NotInitialized)?;
        let functions = self.functions.as_ref().ok_or(HashTableError::NotBuilt)?;
        Ok(RetrievalEngine::new(&storage.slots, &storage.stash, functions))
    }

    /// 批量查询并记录统计
    pub(crate) fn retrieve_into(&self, queries: &[Key], results: &mut [u32]) -> Result<(), HashTableError> {
        let start = Instant::now();
        let outcome = self
            .retrieval()
            .and_then(|retrieval| retrieval.retrieve(queries, results));
        self.stats
            .record_operation(OperationType::Retrieve, start.elapsed(), outcome.is_ok());
        let misses = outcome?;
        self.stats.record_items(OperationType::Retrieve, queries.len() as u64);
        self.stats.record_misses(misses as u64);
        Ok(())
    }

    /// 结束一次构建: 补齐失败状态, 记录统计并生成报告
    pub(crate) fn finish_build(
        &self,
        result: &Result<(), HashTableError>,
        mut machine: BuildStateMachine,
        mut report: BuildReport,
        start: Instant,
    ) -> BuildReport {
        if let Err(err) = result {
            if !machine.current().is_terminal() {
                machine.advance(BuildState::Fail);
            }
            log_warn!("build of {} keys failed: {}", report.input_size, err);
        }
        report.duration = start.elapsed();
        report.states = machine.into_history();
        self.stats
            .record_operation(OperationType::Build, report.duration, result.is_ok());
        self.stats
            .record_items(OperationType::Build, report.input_size as u64);
        log_info!(
            "build finished: keys={}, attempts={}, stash={}, ok={}",
            report.input_size,
            report.attempts,
            report.stash_count,
            result.is_ok()
        );
        report
    }
}
