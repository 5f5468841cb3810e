//! 并行 Cuckoo 哈希表库
//!
//! 面向数据并行后端的静态哈希表: 一次性批量构建, 之后只做批量查询。
//!
//! ## 主要特性
//! - 无锁并行插入, 驱逐按轮推进, 每轮之间有全局屏障
//! - 暂存区兜底与有界重启, 构建总会终止
//! - `CompactingHashTable` 把重复键合并为稠密ID
//! - 可注入的分配器、统计记录器与并行原语
//!
//! ## 快速开始
//!
//! ```rust
//! use parallel_cuckoo::*;
//!
//! fn main() -> Result<(), HashTableError> {
//!     let mut table = HashTable::new();
//!     table.initialize(4, 1.25, 4)?;
//!     table.build(&[10, 20, 30, 40], &[1, 2, 3, 4])?;
//!     assert_eq!(table.retrieve(&[20, 50])?, vec![2, NOT_FOUND]);
//!
//!     let mut compacting = CompactingHashTable::new();
//!     compacting.initialize(5, 1.25, 4)?;
//!     compacting.build_keys(&[5, 3, 5, 9, 1])?;
//!     assert_eq!(compacting.unique_keys_size(), 4);
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]

#[cfg(feature = "logging")]
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {
        log::debug!($($arg)*)
    };
}

#[cfg(feature = "logging")]
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {
        log::info!($($arg)*)
    };
}

#[cfg(feature = "logging")]
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {
        log::warn!($($arg)*)
    };
}

#[cfg(feature = "logging")]
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {
        log::error!($($arg)*)
    };
}

#[cfg(not(feature = "logging"))]
#[macro_export]
macro_rules! log_debug {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "logging"))]
#[macro_export]
macro_rules! log_info {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "logging"))]
#[macro_export]
macro_rules! log_warn {
    ($($arg:tt)*) => {};
}

#[cfg(not(feature = "logging"))]
#[macro_export]
macro_rules! log_error {
    ($($arg:tt)*) => {};
}

pub mod error;
pub mod hash;
pub mod memory;
pub mod primitives;
pub mod stats;
pub mod table;
pub mod types;

pub use crate::{
    error::HashTableError,
    hash::{HashFunction, HashFunctionSet, SeedSequence},
    memory::{default_allocator, BudgetAllocator, DeviceBuffer, MemoryAllocator, MemoryStats, SystemAllocator},
    primitives::{ParallelScan, ParallelSort, ScanPrimitive, SortPrimitive},
    stats::{
        export_prometheus, global_recorder, stats_snapshot, AtomicTableStats, DisabledStatsRecorder,
        StatsRecorder, TableStatsSnapshot,
    },
    table::{
        BuildLimits, BuildReport, BuildState, CompactingHashTable, GroupingStrategy, HashTable, TableConfig,
        DEFAULT_CONFIG,
    },
    types::{Entry, Key, OperationType, Value, KEY_EMPTY, NOT_FOUND},
};
