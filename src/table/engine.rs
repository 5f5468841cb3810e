//! Cuckoo 构建引擎 - 无锁的并行插入与驱逐
//!
//! 每个待放置条目是一个独立的工作单元。一轮中所有工作单元并行地把自己
//! 换入当前哈希函数指定的槽位; 换出的旧占用者带着它的下一个哈希函数
//! 进入下一轮。每轮之间由并行收集形成全局屏障, 轮数有上限,
//! 用尽后剩余条目进入暂存区。

use crate::{
    hash::HashFunctionSet,
    table::{
        retrieve::{Location, RetrievalEngine},
        slots::SlotArray,
        stash::StashTable,
    },
    types::Entry,
};
use crossbeam::utils::CachePadded;
use rayon::prelude::*;
use std::sync::atomic::{AtomicU64, Ordering};

/// 等待放置的条目及其下一次要使用的哈希函数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingEntry {
    entry: Entry,
    function: usize,
}

/// 一次构建尝试的结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AttemptOutcome {
    /// 执行的驱逐轮数
    pub rounds: u32,
    /// 驱逐次数
    pub evictions: u64,
    /// 轮数用尽后仍未放置的条目数
    pub unplaced: usize,
    /// 暂存区是否溢出
    pub stash_overflow: bool,
}

impl AttemptOutcome {
    pub fn succeeded(&self) -> bool {
        !self.stash_overflow
    }
}

/// Cuckoo 构建引擎
pub struct CuckooBuildEngine<'a> {
    slots: &'a SlotArray,
    stash: &'a StashTable,
    functions: &'a HashFunctionSet,
    max_iterations: u32,
}

impl<'a> CuckooBuildEngine<'a> {
    pub fn new(
        slots: &'a SlotArray,
        stash: &'a StashTable,
        functions: &'a HashFunctionSet,
        max_iterations: u32,
    ) -> Self {
        Self {
            slots,
            stash,
            functions,
            max_iterations,
        }
    }

    /// 从空表开始放置全部条目
    pub fn run(&self, entries: &[Entry]) -> AttemptOutcome {
        self.slots.clear();
        self.stash.clear();

        let evictions = CachePadded::new(AtomicU64::new(0));
        let mut pending: Vec<PendingEntry> = entries
            .par_iter()
            .map(|entry| PendingEntry {
                entry: *entry,
                function: 0,
            })
            .collect();

        let mut rounds = 0;
        while !pending.is_empty() && rounds < self.max_iterations {
            pending = pending
                .par_iter()
                .filter_map(|worker| self.place(*worker, &evictions))
                .collect();
            rounds += 1;
        }

        let mut outcome = AttemptOutcome {
            rounds,
            evictions: evictions.load(Ordering::Relaxed),
            unplaced: pending.len(),
            stash_overflow: false,
        };

        if !pending.is_empty() {
            log_debug!(
                "{} entries unplaced after {} rounds, moving to stash (capacity {})",
                pending.len(),
                rounds,
                self.stash.capacity()
            );
            let leftovers: Vec<Entry> = pending.iter().map(|worker| worker.entry).collect();
            if let Err(err) = self.stash.insert_all(&leftovers) {
                log_debug!("stash fallback failed: {}", err);
                outcome.stash_overflow = true;
                return outcome;
            }
        }

        self.collapse_duplicates();
        outcome
    }

    /// 一个工作单元的一步: 换入目标槽位, 返回被驱逐的条目
    ///
    /// 比较并交换失败说明有其他工作单元先写入了该槽位, 以新的占用者重试。
    #[inline]
    fn place(&self, worker: PendingEntry, evictions: &AtomicU64) -> Option<PendingEntry> {
        let key = worker.entry.key();
        let slot = self.functions.slot(worker.function, key);
        let mut current = self.slots.load(slot);
        loop {
            match self.slots.compare_exchange(slot, current, worker.entry) {
                Ok(previous) => {
                    // 空槽或同一个键: 就地合并, 不产生驱逐
                    if previous.is_empty() || previous.key() == key {
                        return None;
                    }
                    evictions.fetch_add(1, Ordering::Relaxed);
                    return Some(PendingEntry {
                        entry: previous,
                        function: self.functions.next_function(previous.key(), slot),
                    });
                }
                Err(actual) => current = actual,
            }
        }
    }

    /// 清除重复键的多余副本
    ///
    /// 保留探测顺序中的第一个副本, 查询结果因此不变。第一个副本本身永远不会
    /// 被清除, 所以并行执行的结果与执行顺序无关。
    pub fn collapse_duplicates(&self) {
        let retrieval = RetrievalEngine::new(self.slots, self.stash, self.functions);

        (0..self.slots.len()).into_par_iter().for_each(|slot| {
            let entry = self.slots.load(slot);
            if entry.is_empty() {
                return;
            }
            if let Some((first, _)) = retrieval.locate(entry.key()) {
                if first != Location::Main(slot) {
                    self.slots.store(slot, Entry::EMPTY);
                }
            }
        });

        for index in 0..self.stash.len() {
            let entry = self.stash.load(index);
            if entry.is_empty() {
                continue;
            }
            if let Some((first, _)) = retrieval.locate(entry.key()) {
                if first != Location::Stash(index) {
                    self.stash.store(index, Entry::EMPTY);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        hash::HashFunction,
        memory::{MemoryAllocator, SystemAllocator},
        types::NOT_FOUND,
    };
    use std::sync::Arc;

    struct Fixture {
        slots: SlotArray,
        stash: StashTable,
        functions: HashFunctionSet,
    }

    fn fixture(table_size: u32, stash_capacity: usize, num_functions: u32, seed: u64) -> Fixture {
        let allocator: Arc<dyn MemoryAllocator> = Arc::new(SystemAllocator::new());
        Fixture {
            slots: SlotArray::new(&allocator, table_size as usize).unwrap(),
            stash: StashTable::new(&allocator, stash_capacity).unwrap(),
            functions: HashFunctionSet::generate(num_functions, table_size, seed).unwrap(),
        }
    }

    #[test]
    fn test_places_all_entries() {
        let fx = fixture(1250, 101, 4, 3);
        let entries: Vec<Entry> = (0..1000).map(|k| Entry::new(k * 7 + 1, k)).collect();
        let engine = CuckooBuildEngine::new(&fx.slots, &fx.stash, &fx.functions, 70);
        let outcome = engine.run(&entries);
        assert!(outcome.succeeded());
        assert_eq!(fx.slots.occupied() + fx.stash.occupied(), 1000);

        let retrieval = RetrievalEngine::new(&fx.slots, &fx.stash, &fx.functions);
        for entry in &entries {
            assert_eq!(retrieval.lookup(entry.key()), entry.value());
        }
        assert_eq!(retrieval.lookup(2), NOT_FOUND);
    }

    #[test]
    fn test_duplicates_collapse_to_one_slot() {
        let fx = fixture(64, 8, 3, 11);
        let mut entries: Vec<Entry> = (0..20).map(|k| Entry::new(k, 1)).collect();
        entries.extend((0..20).map(|k| Entry::new(k, 1)));
        let engine = CuckooBuildEngine::new(&fx.slots, &fx.stash, &fx.functions, 32);
        assert!(engine.run(&entries).succeeded());
        assert_eq!(fx.slots.occupied() + fx.stash.occupied(), 20);
    }

    #[test]
    fn test_collapse_keeps_first_copy_in_lookup_order() {
        let fx = fixture(101, 4, 2, 0);
        let functions =
            HashFunctionSet::from_functions(&[HashFunction::new(3, 0), HashFunction::new(5, 1)], 101).unwrap();
        let key = 10;
        let first = functions.slot(0, key);
        let second = functions.slot(1, key);
        assert_ne!(first, second);
        fx.slots.store(first, Entry::new(key, 1));
        fx.slots.store(second, Entry::new(key, 2));
        fx.stash.insert(Entry::new(key, 3)).unwrap();

        CuckooBuildEngine::new(&fx.slots, &fx.stash, &functions, 8).collapse_duplicates();
        assert_eq!(fx.slots.load(first), Entry::new(key, 1));
        assert!(fx.slots.load(second).is_empty());
        assert_eq!(fx.stash.occupied(), 0);
    }

    #[test]
    fn test_unplaceable_entries_go_to_stash() {
        // 两个函数、三个槽位、五个键: 至少两个键只能进暂存区
        let fx = fixture(3, 8, 2, 5);
        let entries: Vec<Entry> = (0..5).map(|k| Entry::new(k, k + 100)).collect();
        let engine = CuckooBuildEngine::new(&fx.slots, &fx.stash, &fx.functions, 4);
        let outcome = engine.run(&entries);
        assert!(outcome.succeeded());
        assert!(outcome.unplaced >= 2);
        assert!(fx.stash.occupied() >= 2);

        let retrieval = RetrievalEngine::new(&fx.slots, &fx.stash, &fx.functions);
        for entry in &entries {
            assert_eq!(retrieval.lookup(entry.key()), entry.value());
        }
    }

    #[test]
    fn test_stash_overflow_is_reported() {
        let fx = fixture(2, 1, 2, 5);
        let entries: Vec<Entry> = (0..10).map(|k| Entry::new(k, k)).collect();
        let engine = CuckooBuildEngine::new(&fx.slots, &fx.stash, &fx.functions, 4);
        let outcome = engine.run(&entries);
        assert!(!outcome.succeeded());
        assert_eq!(outcome.rounds, 4);
    }
}
