// src/memory/allocator.rs
//! 内存分配器接口 - 为哈希表的设备数组做容量预留与统计
//!
//! 实际的存储由 [`DeviceBuffer`](super::DeviceBuffer) 持有, 分配器只负责
//! 准入 (是否允许再占用这么多字节) 和记账。

use crate::error::HashTableError;
use crossbeam::utils::CachePadded;
use std::{
    alloc::Layout,
    sync::atomic::{AtomicU64, AtomicUsize, Ordering},
};

/// 内存统计信息
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MemoryStats {
    pub total_allocated: u64,
    pub current_used: u64,
    pub peak_used: u64,
    pub allocation_count: u64,
    pub deallocation_count: u64,
}

/// 内存分配器特征
pub trait MemoryAllocator: Send + Sync {
    /// 为指定布局预留内存, 超出能力时返回 `AllocationFailed`
    fn reserve(&self, layout: Layout) -> Result<(), HashTableError>;

    /// 归还此前预留的内存
    fn release(&self, layout: Layout);

    /// 获取内存统计信息
    fn stats(&self) -> MemoryStats;
}

/// 分配统计 - 原子计数器
#[derive(Debug, Default)]
pub struct AllocationStats {
    total_allocated: AtomicU64,
    current_used: CachePadded<AtomicUsize>,
    peak_used: AtomicUsize,
    allocation_count: AtomicU64,
    deallocation_count: AtomicU64,
}

impl AllocationStats {
    pub fn record_allocation(&self, size: usize) {
        self.allocation_count.fetch_add(1, Ordering::Relaxed);
        self.total_allocated.fetch_add(size as u64, Ordering::Relaxed);
        let new = self.current_used.fetch_add(size, Ordering::AcqRel) + size;
        self.update_peak(new);
    }

    pub fn record_deallocation(&self, size: usize) {
        self.deallocation_count.fetch_add(1, Ordering::Relaxed);
        self.current_used.fetch_sub(size, Ordering::AcqRel);
    }

    /// 仅在不超过 `limit` 时记一次分配
    fn try_record_allocation(&self, size: usize, limit: usize) -> bool {
        let mut current = self.current_used.load(Ordering::Acquire);
        loop {
            let Some(new) = current.checked_add(size).filter(|new| *new <= limit) else {
                return false;
            };
            match self.current_used.compare_exchange_weak(
                current,
                new,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    self.allocation_count.fetch_add(1, Ordering::Relaxed);
                    self.total_allocated.fetch_add(size as u64, Ordering::Relaxed);
                    self.update_peak(new);
                    return true;
                }
                Err(actual) => current = actual,
            }
        }
    }

    fn update_peak(&self, new: usize) {
        self.peak_used.fetch_max(new, Ordering::AcqRel);
    }

    pub fn current_used_bytes(&self) -> usize {
        self.current_used.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> MemoryStats {
        MemoryStats {
            total_allocated: self.total_allocated.load(Ordering::Relaxed),
            current_used: self.current_used.load(Ordering::Relaxed) as u64,
            peak_used: self.peak_used.load(Ordering::Relaxed) as u64,
            allocation_count: self.allocation_count.load(Ordering::Relaxed),
            deallocation_count: self.deallocation_count.load(Ordering::Relaxed),
        }
    }
}

/// 系统分配器 - 不设上限, 只记账
#[derive(Debug, Default)]
pub struct SystemAllocator {
    stats: AllocationStats,
}

impl SystemAllocator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemoryAllocator for SystemAllocator {
    fn reserve(&self, layout: Layout) -> Result<(), HashTableError> {
        if layout.size() > isize::MAX as usize {
            return Err(HashTableError::AllocationFailed {
                size: layout.size(),
                align: layout.align(),
            });
        }
        self.stats.record_allocation(layout.size());
        Ok(())
    }

    fn release(&self, layout: Layout) {
        self.stats.record_deallocation(layout.size());
    }

    fn stats(&self) -> MemoryStats {
        self.stats.snapshot()
    }
}

/// 限额分配器 - 模拟容量有限的设备内存
#[derive(Debug)]
pub struct BudgetAllocator {
    limit: usize,
    stats: AllocationStats,
}

impl BudgetAllocator {
    /// 创建最多允许同时占用 `limit` 字节的分配器
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            stats: AllocationStats::default(),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// 剩余可用字节
    pub fn available(&self) -> usize {
        self.limit.saturating_sub(self.stats.current_used_bytes())
    }
}

impl MemoryAllocator for BudgetAllocator {
    fn reserve(&self, layout: Layout) -> Result<(), HashTableError> {
        if self.stats.try_record_allocation(layout.size(), self.limit) {
            Ok(())
        } else {
            log_warn!(
                "device budget exhausted: requested {} bytes, {} of {} available",
                layout.size(),
                self.available(),
                self.limit
            );
            Err(HashTableError::AllocationFailed {
                size: layout.size(),
                align: layout.align(),
            })
        }
    }

    fn release(&self, layout: Layout) {
        self.stats.record_deallocation(layout.size());
    }

    fn stats(&self) -> MemoryStats {
        self.stats.snapshot()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_allocator_accounting() {
        let allocator = SystemAllocator::new();
        let layout = Layout::array::<u64>(16).unwrap();
        allocator.reserve(layout).unwrap();
        allocator.reserve(layout).unwrap();
        allocator.release(layout);

        let stats = allocator.stats();
        assert_eq!(stats.allocation_count, 2);
        assert_eq!(stats.deallocation_count, 1);
        assert_eq!(stats.current_used, 128);
        assert_eq!(stats.peak_used, 256);
        assert_eq!(stats.total_allocated, 256);
    }

    #[test]
    fn test_budget_allocator_rejects_over_limit() {
        let allocator = BudgetAllocator::new(100);
        let small = Layout::array::<u32>(20).unwrap();
        allocator.reserve(small).unwrap();
        assert_eq!(allocator.available(), 20);

        let err = allocator.reserve(small).unwrap_err();
        assert!(matches!(err, HashTableError::AllocationFailed { size: 80, .. }));

        allocator.release(small);
        assert!(allocator.reserve(small).is_ok());
    }
}
