//! 并行查询 - 对每个查询键探测所有候选槽位与暂存区

use crate::{
    error::HashTableError,
    hash::HashFunctionSet,
    table::{slots::SlotArray, stash::StashTable},
    types::{Entry, Key, Value, KEY_EMPTY, NOT_FOUND},
};
use rayon::prelude::*;

/// 键在表中的位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Location {
    Main(usize),
    Stash(usize),
}

/// 查询引擎, 借用一张已构建完成的表
#[derive(Debug, Clone, Copy)]
pub struct RetrievalEngine<'a> {
    slots: &'a SlotArray,
    stash: &'a StashTable,
    functions: &'a HashFunctionSet,
}

impl<'a> RetrievalEngine<'a> {
    pub fn new(slots: &'a SlotArray, stash: &'a StashTable, functions: &'a HashFunctionSet) -> Self {
        Self {
            slots,
            stash,
            functions,
        }
    }

    /// 按探测顺序 (函数 0..n-1, 然后暂存区) 找到键的第一个位置
    #[inline]
    pub fn locate(&self, key: Key) -> Option<(Location, Entry)> {
        if key == KEY_EMPTY {
            return None;
        }
        for slot in self.functions.candidate_slots(key) {
            let entry = self.slots.load(slot);
            if entry.key() == key {
                return Some((Location::Main(slot), entry));
            }
        }
        self.stash
            .find(key)
            .map(|(index, entry)| (Location::Stash(index), entry))
    }

    /// 单键查询
    #[inline]
    pub fn lookup(&self, key: Key) -> Value {
        self.locate(key).map_or(NOT_FOUND, |(_, entry)| entry.value())
    }

    /// 批量查询, 结果与查询一一对应; 返回未命中数
    pub fn retrieve(&self, queries: &[Key], results: &mut [Value]) -> Result<usize, HashTableError> {
        if queries.len() != results.len() {
            return Err(HashTableError::LengthMismatch {
                expected: queries.len(),
                actual: results.len(),
            });
        }
        let misses = results
            .par_iter_mut()
            .zip(queries.par_iter())
            .map(|(result, key)| {
                *result = self.lookup(*key);
                usize::from(*result == NOT_FOUND)
            })
            .sum();
        Ok(misses)
    }
}
