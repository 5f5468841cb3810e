//! 数据并行原语 - 前缀和与排序
//!
//! 压缩阶段只通过这两个特征使用它们, 可以替换成其他后端实现。

pub mod scan;
pub mod sort;

pub use scan::{ParallelScan, ScanPrimitive};
pub use sort::{ParallelSort, SortPrimitive};
