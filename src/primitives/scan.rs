//! 并行前缀和 (exclusive scan)
//!
//! 分块两趟: 先并行求每块之和, 串行扫描块和得到块偏移,
//! 再并行地在每块内做带偏移的局部扫描。

use crate::error::HashTableError;
use rayon::prelude::*;

/// 前缀和原语
pub trait ScanPrimitive: Send + Sync {
    /// `output[i] = input[0] + ... + input[i-1]`, 返回总和
    fn exclusive_scan(&self, input: &[u32], output: &mut [u32]) -> Result<u32, HashTableError>;
}

/// 基于 rayon 的分块并行前缀和
#[derive(Debug, Clone, Copy)]
pub struct ParallelScan {
    chunk_size: usize,
}

impl ParallelScan {
    pub const DEFAULT_CHUNK_SIZE: usize = 16 * 1024;

    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunk_size: chunk_size.max(1),
        }
    }
}

impl Default for ParallelScan {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CHUNK_SIZE)
    }
}

impl ScanPrimitive for ParallelScan {
    fn exclusive_scan(&self, input: &[u32], output: &mut [u32]) -> Result<u32, HashTableError> {
        if input.len() != output.len() {
            return Err(HashTableError::LengthMismatch {
                expected: input.len(),
                actual: output.len(),
            });
        }

        let chunk_sums: Vec<u32> = input
            .par_chunks(self.chunk_size)
            .map(|chunk| chunk.iter().fold(0u32, |acc, v| acc.wrapping_add(*v)))
            .collect();

        let mut offsets = Vec::with_capacity(chunk_sums.len());
        let mut total = 0u32;
        for sum in &chunk_sums {
            offsets.push(total);
            total = total.wrapping_add(*sum);
        }

        output
            .par_chunks_mut(self.chunk_size)
            .zip(input.par_chunks(self.chunk_size))
            .zip(offsets.par_iter())
            .for_each(|((out, inp), offset)| {
                let mut running = *offset;
                for (o, v) in out.iter_mut().zip(inp) {
                    *o = running;
                    running = running.wrapping_add(*v);
                }
            });

        Ok(total)
    }
}
