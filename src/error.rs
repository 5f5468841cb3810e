//! 统一错误处理 - 哈希表生命周期中可能出现的错误类型

/// 哈希表可能发生的错误
///
/// 查询未命中不是错误，`Retrieve` 以 [`NOT_FOUND`](crate::types::NOT_FOUND) 标记。
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum HashTableError {
    #[error("无效配置: {reason}")]
    InvalidConfig {
        reason: String,
    },

    #[error("内存分配失败 (大小: {size}, 对齐: {align})")]
    AllocationFailed {
        size: usize,
        align: usize,
    },

    #[error("哈希表未初始化")]
    NotInitialized,

    #[error("哈希表尚未成功构建")]
    NotBuilt,

    #[error("输入规模超过上限 (输入: {input_size}, 上限: {max_input_size})")]
    InputTooLarge {
        input_size: usize,
        max_input_size: usize,
    },

    #[error("数组长度不匹配 (期望: {expected}, 实际: {actual})")]
    LengthMismatch {
        expected: usize,
        actual: usize,
    },

    #[error("键使用了保留的空槽标记 (位置: {index})")]
    ReservedKey {
        index: usize,
    },

    #[error("构建失败: {attempts} 次尝试后仍无法放置所有键")]
    BuildFailed {
        attempts: u32,
    },

    #[error("暂存区溢出 (数量: {count}, 容量: {capacity})")]
    StashOverflow {
        count: usize,
        capacity: usize,
    },
}

impl HashTableError {
    /// 获取错误恢复建议
    pub fn recovery_suggestion(&self) -> Option<&'static str> {
        match self {
            Self::InvalidConfig { .. } => Some("检查配置参数: 哈希函数数量须在2-5之间, space_usage >= 1.0"),
            Self::AllocationFailed { .. } => Some("检查可用内存或减小 max_input_size / space_usage"),
            Self::NotInitialized => Some("先调用 initialize"),
            Self::NotBuilt => Some("先成功调用 build"),
            Self::InputTooLarge { .. } => Some("使用更大的 max_input_size 重新初始化"),
            Self::LengthMismatch { .. } => Some("确认键、值和结果数组长度一致"),
            Self::ReservedKey { .. } => Some("键 u32::MAX 保留为空槽标记, 不能插入"),
            Self::BuildFailed { .. } => Some("释放后使用更大的 space_usage 或更多哈希函数重新初始化"),
            Self::StashOverflow { .. } => Some("更换哈希函数后重试"),
        }
    }

    /// 判断错误是否可由调用者调整参数后恢复
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::AllocationFailed { .. })
    }

    /// 判断是否属于配置类错误 (`Initialize` 阶段)
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfig { .. } | Self::AllocationFailed { .. }
        )
    }

    /// 是否为单次构建尝试内部可重试的失败
    pub fn should_retry(&self) -> bool {
        matches!(self, Self::StashOverflow { .. })
    }

    pub(crate) fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classification() {
        let err = HashTableError::invalid_config("num_functions = 7");
        assert!(err.is_config_error());
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("num_functions = 7"));

        let err = HashTableError::AllocationFailed { size: 64, align: 8 };
        assert!(err.is_config_error());
        assert!(!err.is_recoverable());

        assert!(HashTableError::StashOverflow { count: 120, capacity: 101 }.should_retry());
        assert!(!HashTableError::BuildFailed { attempts: 10 }.should_retry());
    }

    #[test]
    fn test_every_error_has_suggestion() {
        let errors = [
            HashTableError::NotInitialized,
            HashTableError::NotBuilt,
            HashTableError::ReservedKey { index: 3 },
            HashTableError::InputTooLarge { input_size: 10, max_input_size: 5 },
            HashTableError::LengthMismatch { expected: 4, actual: 2 },
        ];
        for err in errors {
            assert!(err.recovery_suggestion().is_some(), "{err:?}");
        }
    }
}
