// src/stats/recorder.rs
//! 统计记录器接口 - 按操作类型累计次数、失败、处理条目与耗时

use crate::types::{OperationType, OPERATION_COUNT};
use std::{
    fmt::Write,
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

/// 统计记录器特征
pub trait StatsRecorder: Send + Sync {
    /// 记录一次操作
    fn record_operation(&self, op_type: OperationType, duration: Duration, success: bool);

    /// 累加操作处理的条目数 (驱逐次数、查询键数等)
    fn record_items(&self, op_type: OperationType, count: u64);

    /// 记录查询未命中数
    fn record_misses(&self, count: u64);

    /// 获取统计快照
    fn snapshot(&self) -> TableStatsSnapshot;

    /// 重置所有统计
    fn reset(&self);

    /// 导出Prometheus格式指标
    fn export_prometheus(&self) -> String;
}

/// 单个操作类型的统计快照
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct OperationSnapshot {
    pub calls: u64,
    pub failures: u64,
    pub items: u64,
    pub total_duration_ns: u64,
}

/// 统计快照
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TableStatsSnapshot {
    operations: [OperationSnapshot; OPERATION_COUNT],
    pub misses: u64,
}

impl TableStatsSnapshot {
    pub fn get(&self, op_type: OperationType) -> OperationSnapshot {
        self.operations[op_index(op_type)]
    }
}

fn op_index(op_type: OperationType) -> usize {
    OperationType::ALL
        .iter()
        .position(|op| *op == op_type)
        .unwrap_or(0)
}

#[derive(Debug, Default)]
struct OperationCounters {
    calls: AtomicU64,
    failures: AtomicU64,
    items: AtomicU64,
    total_duration_ns: AtomicU64,
}

impl OperationCounters {
    fn snapshot(&self) -> OperationSnapshot {
        OperationSnapshot {
            calls: self.calls.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            items: self.items.load(Ordering::Relaxed),
            total_duration_ns: self.total_duration_ns.load(Ordering::Relaxed),
        }
    }

    fn reset(&self) {
        self.calls.store(0, Ordering::Relaxed);
        self.failures.store(0, Ordering::Relaxed);
        self.items.store(0, Ordering::Relaxed);
        self.total_duration_ns.store(0, Ordering::Relaxed);
    }
}

/// 原子统计记录器
#[derive(Debug, Default)]
pub struct AtomicTableStats {
    operations: [OperationCounters; OPERATION_COUNT],
    misses: AtomicU64,
}

impl AtomicTableStats {
    /// 创建新统计
    pub fn new() -> Self {
        Self::default()
    }

    fn counters(&self, op_type: OperationType) -> &OperationCounters {
        &self.operations[op_index(op_type)]
    }
}

impl StatsRecorder for AtomicTableStats {
    fn record_operation(&self, op_type: OperationType, duration: Duration, success: bool) {
        let counters = self.counters(op_type);
        counters.calls.fetch_add(1, Ordering::Relaxed);
        counters
            .total_duration_ns
            .fetch_add(duration.as_nanos() as u64, Ordering::Relaxed);
        if !success {
            counters.failures.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn record_items(&self, op_type: OperationType, count: u64) {
        self.counters(op_type).items.fetch_add(count, Ordering::Relaxed);
    }

    fn record_misses(&self, count: u64) {
        self.misses.fetch_add(count, Ordering::Relaxed);
    }

    fn snapshot(&self) -> TableStatsSnapshot {
        let mut snapshot = TableStatsSnapshot {
            misses: self.misses.load(Ordering::Relaxed),
            ..Default::default()
        };
        for (slot, counters) in snapshot.operations.iter_mut().zip(&self.operations) {
            *slot = counters.snapshot();
        }
        snapshot
    }

    fn reset(&self) {
        self.operations.iter().for_each(OperationCounters::reset);
        self.misses.store(0, Ordering::Relaxed);
    }

    fn export_prometheus(&self) -> String {
        let snapshot = self.snapshot();
        let mut output = String::new();

        for op in OperationType::ALL {
            let stats = snapshot.get(op);
            let name = op.label();
            let _ = writeln!(output, "# HELP cuckoo_{name}_total Total {name} operations");
            let _ = writeln!(output, "# TYPE cuckoo_{name}_total counter");
            let _ = writeln!(output, "cuckoo_{name}_total {}", stats.calls);
            let _ = writeln!(output, "cuckoo_{name}_failures_total {}", stats.failures);
            let _ = writeln!(output, "cuckoo_{name}_items_total {}", stats.items);
            let _ = writeln!(output, "cuckoo_{name}_duration_ns_total {}", stats.total_duration_ns);
        }

        output.push_str("# HELP cuckoo_retrieve_misses_total Query keys not found\n");
        output.push_str("# TYPE cuckoo_retrieve_misses_total counter\n");
        let _ = writeln!(output, "cuckoo_retrieve_misses_total {}", snapshot.misses);
        output
    }
}

/// 禁用统计
#[derive(Debug, Default)]
pub struct DisabledStatsRecorder;

impl StatsRecorder for DisabledStatsRecorder {
    fn record_operation(&self, _op_type: OperationType, _duration: Duration, _success: bool) {}
    fn record_items(&self, _op_type: OperationType, _count: u64) {}
    fn record_misses(&self, _count: u64) {}
    fn snapshot(&self) -> TableStatsSnapshot {
        TableStatsSnapshot::default()
    }
    fn reset(&self) {}
    fn export_prometheus(&self) -> String {
        String::new()
    }
}
