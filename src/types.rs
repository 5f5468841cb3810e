//! 核心类型定义 - 键、值、槽位条目与哨兵常量

use core::fmt;

/// 键类型 - 固定宽度无符号整数
pub type Key = u32;

/// 值类型 - 固定宽度无符号整数 (压缩表中为唯一ID)
pub type Value = u32;

/// 查询未命中时返回的哨兵值
pub const NOT_FOUND: Value = Value::MAX;

/// 空槽位的键标记, 不能作为输入键
pub const KEY_EMPTY: Key = Key::MAX;

/// 槽位条目 - 高32位为键, 低32位为值
///
/// 打包成一个64位字, 使得一次比较并交换即可原子地替换整个键值对。
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Entry(u64);

impl Entry {
    /// 空条目
    pub const EMPTY: Entry = Entry::new(KEY_EMPTY, NOT_FOUND);

    /// 创建新条目
    pub const fn new(key: Key, value: Value) -> Self {
        Self(((key as u64) << 32) | value as u64)
    }

    /// 从原始64位字恢复
    pub const fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    /// 原始64位字
    pub const fn bits(self) -> u64 {
        self.0
    }

    pub const fn key(self) -> Key {
        (self.0 >> 32) as Key
    }

    pub const fn value(self) -> Value {
        self.0 as Value
    }

    /// 检查是否为空槽位
    pub const fn is_empty(self) -> bool {
        self.key() == KEY_EMPTY
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            write!(f, "Entry(empty)")
        } else {
            write!(f, "Entry({} => {})", self.key(), self.value())
        }
    }
}

/// 操作类型数量
pub const OPERATION_COUNT: usize = 8;

/// 操作类型 - 用于统计记录
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationType {
    Initialize,
    Build,
    Restart,
    Eviction,
    StashInsert,
    Compaction,
    Retrieve,
    Release,
}

impl OperationType {
    /// Prometheus 标签名
    pub const fn label(self) -> &'static str {
        match self {
            Self::Initialize => "initialize",
            Self::Build => "build",
            Self::Restart => "restart",
            Self::Eviction => "eviction",
            Self::StashInsert => "stash_insert",
            Self::Compaction => "compaction",
            Self::Retrieve => "retrieve",
            Self::Release => "release",
        }
    }

    pub const ALL: [OperationType; OPERATION_COUNT] = [
        Self::Initialize,
        Self::Build,
        Self::Restart,
        Self::Eviction,
        Self::StashInsert,
        Self::Compaction,
        Self::Retrieve,
        Self::Release,
    ];
}
