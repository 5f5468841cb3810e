//! 表配置 - 尺寸参数与构建上限

use crate::{
    error::HashTableError,
    hash::{MAX_FUNCTIONS, MIN_FUNCTIONS},
};

/// 默认空间倍率
pub const DEFAULT_SPACE_USAGE: f32 = 1.25;
/// 默认哈希函数数量
pub const DEFAULT_NUM_FUNCTIONS: u32 = 4;
/// 默认最大重启次数
pub const DEFAULT_MAX_RESTART_ATTEMPTS: u32 = 10;
/// 默认暂存区容量
pub const DEFAULT_STASH_CAPACITY: usize = 101;
/// 默认驱逐轮数系数, 轮数上限 = 系数 * ceil(log2(max_input_size))
pub const DEFAULT_ITERATION_MULTIPLIER: u32 = 7;
/// 驱逐轮数下限
pub const DEFAULT_MIN_ITERATIONS: u32 = 16;

/// 构建过程的有界参数
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildLimits {
    /// 每次 `build` 最多尝试的哈希函数集合数
    pub max_restart_attempts: u32,
    /// 暂存区容量
    pub stash_capacity: usize,
    pub iteration_multiplier: u32,
    pub min_iterations: u32,
}

impl Default for BuildLimits {
    fn default() -> Self {
        Self {
            max_restart_attempts: DEFAULT_MAX_RESTART_ATTEMPTS,
            stash_capacity: DEFAULT_STASH_CAPACITY,
            iteration_multiplier: DEFAULT_ITERATION_MULTIPLIER,
            min_iterations: DEFAULT_MIN_ITERATIONS,
        }
    }
}

/// 压缩表中重复键的分组方式
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum GroupingStrategy {
    /// 先按键构建一次表, 在槽位上标记并扫描; ID 按槽位顺序分配
    #[default]
    TableSlots,
    /// 排序后标记相邻不同的键; ID 按键的升序分配
    Sorted,
}

/// 哈希表配置
#[derive(Clone, Debug, PartialEq)]
pub struct TableConfig {
    /// 最大输入规模
    pub max_input_size: u32,
    /// 表大小相对输入规模的倍率
    pub space_usage: f32,
    /// 哈希函数数量, 2-5
    pub num_functions: u32,
    /// 哈希函数种子序列的基准种子
    pub seed: u64,
    pub limits: BuildLimits,
    pub grouping: GroupingStrategy,
}

impl Default for TableConfig {
    fn default() -> Self {
        Self {
            max_input_size: 1024,
            space_usage: DEFAULT_SPACE_USAGE,
            num_functions: DEFAULT_NUM_FUNCTIONS,
            seed: 0,
            limits: BuildLimits::default(),
            grouping: GroupingStrategy::default(),
        }
    }
}

impl TableConfig {
    pub fn new(max_input_size: u32, space_usage: f32, num_functions: u32) -> Self {
        Self {
            max_input_size,
            space_usage,
            num_functions,
            ..Self::default()
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn with_limits(mut self, limits: BuildLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_grouping(mut self, grouping: GroupingStrategy) -> Self {
        self.grouping = grouping;
        self
    }

    /// 校验配置
    pub fn validate(&self) -> Result<(), HashTableError> {
        if self.max_input_size == 0 {
            return Err(HashTableError::invalid_config("max_input_size must be positive"));
        }
        if !self.space_usage.is_finite() || self.space_usage < 1.0 {
            return Err(HashTableError::invalid_config(format!(
                "space_usage must be a finite value >= 1.0, got {}",
                self.space_usage
            )));
        }
        if !(MIN_FUNCTIONS..=MAX_FUNCTIONS).contains(&self.num_functions) {
            return Err(HashTableError::invalid_config(format!(
                "num_functions must be in [{MIN_FUNCTIONS}, {MAX_FUNCTIONS}], got {}",
                self.num_functions
            )));
        }
        if self.raw_table_size() > u32::MAX as f64 {
            return Err(HashTableError::invalid_config(format!(
                "table of {} x {} slots exceeds the u32 index range",
                self.space_usage, self.max_input_size
            )));
        }
        if self.limits.max_restart_attempts == 0 {
            return Err(HashTableError::invalid_config("max_restart_attempts must be positive"));
        }
        if self.limits.stash_capacity == 0 {
            return Err(HashTableError::invalid_config("stash_capacity must be positive"));
        }
        if self.max_iterations() == 0 {
            return Err(HashTableError::invalid_config(format!(
                "eviction round cap must be positive (multiplier {}, minimum {}, max_input_size {})",
                self.limits.iteration_multiplier, self.limits.min_iterations, self.max_input_size
            )));
        }
        Ok(())
    }

    fn raw_table_size(&self) -> f64 {
        (self.space_usage as f64 * self.max_input_size as f64).ceil()
    }

    /// 主表槽位数 `ceil(space_usage * max_input_size)`, 不小于输入上限
    pub fn table_size(&self) -> u32 {
        let size = self.raw_table_size().min(u32::MAX as f64) as u32;
        size.max(self.max_input_size).max(1)
    }

    /// 每次尝试的驱逐轮数上限
    pub fn max_iterations(&self) -> u32 {
        let lg = ceil_log2(self.max_input_size);
        self.limits
            .iteration_multiplier
            .saturating_mul(lg)
            .max(self.limits.min_iterations)
    }
}

fn ceil_log2(n: u32) -> u32 {
    if n <= 1 {
        0
    } else {
        u32::BITS - (n - 1).leading_zeros()
    }
}
