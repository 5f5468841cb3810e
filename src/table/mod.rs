//! 哈希表模块 - 构建引擎、查询引擎、压缩阶段与两种表

pub mod compacting;
pub mod compaction;
pub mod config;
pub mod engine;
pub mod hash_table;
pub mod retrieve;
mod shared;
pub mod slots;
pub mod stash;
pub mod state;

pub use compacting::CompactingHashTable;
pub use compaction::{CompactionStage, Grouping};
pub use config::{
    BuildLimits, GroupingStrategy, TableConfig, DEFAULT_ITERATION_MULTIPLIER, DEFAULT_MAX_RESTART_ATTEMPTS,
    DEFAULT_MIN_ITERATIONS, DEFAULT_NUM_FUNCTIONS, DEFAULT_SPACE_USAGE, DEFAULT_STASH_CAPACITY,
};
pub use engine::{AttemptOutcome, CuckooBuildEngine};
pub use hash_table::HashTable;
pub use retrieve::{Location, RetrievalEngine};
pub use slots::SlotArray;
pub use stash::StashTable;
pub use state::{BuildReport, BuildState, BuildStateMachine};

use once_cell::sync::Lazy;

/// 默认表配置
pub static DEFAULT_CONFIG: Lazy<TableConfig> = Lazy::new(TableConfig::default);
