//! 内存管理模块 - 设备内存分配与记账

pub mod allocator;
pub mod buffer;

pub use allocator::{AllocationStats, BudgetAllocator, MemoryAllocator, MemoryStats, SystemAllocator};
pub use buffer::DeviceBuffer;

use once_cell::sync::Lazy;
use std::sync::Arc;

/// 全局默认分配器实例
pub static DEFAULT_ALLOCATOR: Lazy<Arc<dyn MemoryAllocator>> =
    Lazy::new(|| Arc::new(SystemAllocator::new()));

/// 获取默认分配器
pub fn default_allocator() -> Arc<dyn MemoryAllocator> {
    Arc::clone(&DEFAULT_ALLOCATOR)
}
