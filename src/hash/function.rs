//! 哈希函数族 - 每次构建尝试随机生成 2-5 个独立的乘法哈希函数

use crate::{error::HashTableError, hash::calculate_slot, types::Key};
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::fmt;

/// 最少哈希函数数量
pub const MIN_FUNCTIONS: u32 = 2;
/// 最多哈希函数数量
pub const MAX_FUNCTIONS: u32 = 5;

/// 大于 2^32 的素数 (2^32 + 15), 作为通用哈希的模数
pub const PRIME_DIVISOR: u64 = 4_294_967_311;

/// 乘法哈希函数 `((a * k + b) mod p) mod table_size`
///
/// `a` 非零, `a` 与 `b` 都取自 u32 范围, 乘积加偏移不会溢出 u64。
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct HashFunction {
    a: u32,
    b: u32,
}

impl HashFunction {
    /// 使用给定参数创建, `a` 为零时取 1
    pub const fn new(a: u32, b: u32) -> Self {
        Self {
            a: if a == 0 { 1 } else { a },
            b,
        }
    }

    /// 随机生成参数
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::new(rng.gen_range(1..=u32::MAX), rng.gen())
    }

    pub const fn params(&self) -> (u32, u32) {
        (self.a, self.b)
    }

    /// 将键映射到 [0, table_size)
    #[inline]
    pub fn hash(&self, key: Key, table_size: u32) -> usize {
        let mixed = (self.a as u64 * key as u64 + self.b as u64) % PRIME_DIVISOR;
        calculate_slot(mixed, table_size)
    }
}

impl fmt::Debug for HashFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HashFunction(a={:#010x}, b={:#010x})", self.a, self.b)
    }
}

/// 一次构建尝试使用的哈希函数集合
#[derive(Clone, PartialEq, Eq)]
pub struct HashFunctionSet {
    functions: [HashFunction; MAX_FUNCTIONS as usize],
    count: usize,
    table_size: u32,
}

impl HashFunctionSet {
    /// 由种子确定性地生成 `num_functions` 个两两不同的哈希函数
    pub fn generate(num_functions: u32, table_size: u32, seed: u64) -> Result<Self, HashTableError> {
        Self::check_shape(num_functions, table_size)?;

        let mut rng = StdRng::seed_from_u64(seed);
        let mut functions = [HashFunction::new(1, 0); MAX_FUNCTIONS as usize];
        let mut count = 0;
        while count < num_functions as usize {
            let candidate = HashFunction::random(&mut rng);
            if !functions[..count].contains(&candidate) {
                functions[count] = candidate;
                count += 1;
            }
        }

        Ok(Self {
            functions,
            count,
            table_size,
        })
    }

    /// 使用显式给定的函数创建 (测试与复现用)
    pub fn from_functions(functions: &[HashFunction], table_size: u32) -> Result<Self, HashTableError> {
        Self::check_shape(functions.len() as u32, table_size)?;
        let mut all = [HashFunction::new(1, 0); MAX_FUNCTIONS as usize];
        all[..functions.len()].copy_from_slice(functions);
        Ok(Self {
            functions: all,
            count: functions.len(),
            table_size,
        })
    }

    fn check_shape(num_functions: u32, table_size: u32) -> Result<(), HashTableError> {
        if !(MIN_FUNCTIONS..=MAX_FUNCTIONS).contains(&num_functions) {
            return Err(HashTableError::invalid_config(format!(
                "num_functions must be in [{MIN_FUNCTIONS}, {MAX_FUNCTIONS}], got {num_functions}"
            )));
        }
        if table_size == 0 {
            return Err(HashTableError::invalid_config("table_size must be positive"));
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn table_size(&self) -> u32 {
        self.table_size
    }

    pub fn functions(&self) -> &[HashFunction] {
        &self.functions[..self.count]
    }

    /// 第 `index` 个函数给出的槽位
    #[inline]
    pub fn slot(&self, index: usize, key: Key) -> usize {
        self.functions[index].hash(key, self.table_size)
    }

    /// 按探测顺序给出键的所有候选槽位
    #[inline]
    pub fn candidate_slots(&self, key: Key) -> impl Iterator<Item = usize> + '_ {
        self.functions().iter().map(move |f| f.hash(key, self.table_size))
    }

    /// 被驱逐的键应尝试的下一个函数
    ///
    /// 找到把 `key` 放进 `slot` 的函数, 返回它之后的函数序号 (循环)。
    /// 找不到时从第一个函数重新开始。
    #[inline]
    pub fn next_function(&self, key: Key, slot: usize) -> usize {
        self.candidate_slots(key)
            .position(|candidate| candidate == slot)
            .map_or(0, |index| (index + 1) % self.count)
    }
}

impl fmt::Debug for HashFunctionSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HashFunctionSet")
            .field("table_size", &self.table_size)
            .field("functions", &self.functions())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_is_deterministic() {
        let a = HashFunctionSet::generate(4, 1000, 7).unwrap();
        let b = HashFunctionSet::generate(4, 1000, 7).unwrap();
        let c = HashFunctionSet::generate(4, 1000, 8).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.len(), 4);
    }

    #[test]
    fn test_functions_are_distinct() {
        for seed in 0..32 {
            let set = HashFunctionSet::generate(5, 97, seed).unwrap();
            let functions = set.functions();
            for i in 0..functions.len() {
                for j in i + 1..functions.len() {
                    assert_ne!(functions[i], functions[j]);
                }
            }
        }
    }

    #[test]
    fn test_rejects_bad_function_count() {
        assert!(HashFunctionSet::generate(1, 100, 0).is_err());
        assert!(HashFunctionSet::generate(6, 100, 0).is_err());
        assert!(HashFunctionSet::generate(3, 0, 0).is_err());
    }

    #[test]
    fn test_slots_in_range() {
        let set = HashFunctionSet::generate(3, 13, 99).unwrap();
        for key in [0, 1, 12, 13, 1 << 20, u32::MAX - 1] {
            for slot in set.candidate_slots(key) {
                assert!(slot < 13);
            }
        }
    }

    #[test]
    fn test_distribution_is_roughly_uniform() {
        let table_size = 64u32;
        let set = HashFunctionSet::generate(2, table_size, 1234).unwrap();
        let mut counts = vec![0u32; table_size as usize];
        for key in 0..64_000u32 {
            counts[set.slot(0, key)] += 1;
        }
        // 期望每个槽约 1000 次
        for count in counts {
            assert!((500..1500).contains(&count), "skewed bucket count {count}");
        }
    }

    #[test]
    fn test_next_function_cycles() {
        let functions = [HashFunction::new(3, 1), HashFunction::new(5, 2), HashFunction::new(7, 3)];
        let set = HashFunctionSet::from_functions(&functions, 1_000_003).unwrap();
        let key = 12345;
        let slots: Vec<usize> = set.candidate_slots(key).collect();
        assert_eq!(set.next_function(key, slots[0]), 1);
        assert_eq!(set.next_function(key, slots[1]), 2);
        assert_eq!(set.next_function(key, slots[2]), 0);
    }
}
