//! 哈希模块 - 随机化哈希函数族与种子序列

pub mod function;
pub mod seed;

pub use function::{HashFunction, HashFunctionSet, MAX_FUNCTIONS, MIN_FUNCTIONS, PRIME_DIVISOR};
pub use seed::SeedSequence;

/// 哈希工具函数
#[inline]
pub fn calculate_slot(hash: u64, table_size: u32) -> usize {
    (hash % table_size as u64) as usize
}
