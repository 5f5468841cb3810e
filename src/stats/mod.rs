//! 统计模块 - 构建与查询的性能指标

pub mod recorder;

use std::sync::Arc;

pub use recorder::{AtomicTableStats, DisabledStatsRecorder, OperationSnapshot, StatsRecorder, TableStatsSnapshot};

/// 全局统计记录器
pub static GLOBAL_STATS: once_cell::sync::Lazy<Arc<dyn StatsRecorder>> =
    once_cell::sync::Lazy::new(|| Arc::new(AtomicTableStats::new()));

/// 获取全局记录器
pub fn global_recorder() -> Arc<dyn StatsRecorder> {
    Arc::clone(&GLOBAL_STATS)
}

/// 获取统计快照
pub fn stats_snapshot() -> TableStatsSnapshot {
    GLOBAL_STATS.snapshot()
}

/// 导出Prometheus格式指标
pub fn export_prometheus() -> String {
    GLOBAL_STATS.export_prometheus()
}
