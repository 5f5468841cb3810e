//! 并行排序 - 按键排序键值对

use crate::error::HashTableError;
use rayon::prelude::*;

/// 排序原语
pub trait SortPrimitive: Send + Sync {
    /// 按键升序稳定排序, 值随键一起移动
    fn sort_pairs(&self, keys: &mut [u32], values: &mut [u32]) -> Result<(), HashTableError>;
}

/// 基于 rayon 归并排序的实现
#[derive(Debug, Clone, Copy, Default)]
pub struct ParallelSort;

impl SortPrimitive for ParallelSort {
    fn sort_pairs(&self, keys: &mut [u32], values: &mut [u32]) -> Result<(), HashTableError> {
        if keys.len() != values.len() {
            return Err(HashTableError::LengthMismatch {
                expected: keys.len(),
                actual: values.len(),
            });
        }

        let mut pairs: Vec<(u32, u32)> = keys
            .par_iter()
            .copied()
            .zip(values.par_iter().copied())
            .collect();
        pairs.par_sort_by_key(|(key, _)| *key);

        keys.par_iter_mut()
            .zip(values.par_iter_mut())
            .zip(pairs.par_iter())
            .for_each(|((key, value), (k, v))| {
                *key = *k;
                *value = *v;
            });
        Ok(())
    }
}
