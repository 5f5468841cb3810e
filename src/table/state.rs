//! 构建状态机与构建报告

use std::{fmt, time::Duration};

/// 构建状态
///
/// `Init -> AssignHashFuncs -> CuckooInsert -> {StashFallback -> Restart -> AssignHashFuncs | Success | Fail}`,
/// 压缩表在 `Success` 之后追加 `Dedup -> IdAssign -> RebuildWithIds`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuildState {
    Init,
    AssignHashFuncs,
    CuckooInsert,
    StashFallback,
    Restart,
    Dedup,
    IdAssign,
    RebuildWithIds,
    Success,
    Fail,
}

impl BuildState {
    pub fn can_transition_to(&self, next: &Self) -> bool {
        use BuildState::*;
        matches!(
            (self, next),
            (Init, AssignHashFuncs)
                | (Init, Dedup)
                | (Init, Fail)
                | (AssignHashFuncs, CuckooInsert)
                | (CuckooInsert, StashFallback)
                | (CuckooInsert, Success)
                | (StashFallback, Success)
                | (StashFallback, Restart)
                | (Restart, AssignHashFuncs)
                | (Restart, Fail)
                | (Success, Dedup)
                | (Dedup, IdAssign)
                | (Dedup, Fail)
                | (IdAssign, RebuildWithIds)
                | (IdAssign, Fail)
                | (RebuildWithIds, AssignHashFuncs)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Fail)
    }
}

impl fmt::Display for BuildState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Init => "INIT",
            Self::AssignHashFuncs => "ASSIGN_HASH_FUNCS",
            Self::CuckooInsert => "CUCKOO_INSERT",
            Self::StashFallback => "STASH_FALLBACK",
            Self::Restart => "RESTART",
            Self::Dedup => "DEDUP",
            Self::IdAssign => "ID_ASSIGN",
            Self::RebuildWithIds => "REBUILD_WITH_IDS",
            Self::Success => "SUCCESS",
            Self::Fail => "FAIL",
        };
        f.write_str(name)
    }
}

/// 记录状态转换路径的状态机
#[derive(Debug, Clone)]
pub struct BuildStateMachine {
    current: BuildState,
    history: Vec<BuildState>,
}

impl BuildStateMachine {
    pub fn new() -> Self {
        Self {
            current: BuildState::Init,
            history: vec![BuildState::Init],
        }
    }

    pub fn current(&self) -> BuildState {
        self.current
    }

    pub fn history(&self) -> &[BuildState] {
        &self.history
    }

    /// 转换到下一状态
    ///
    /// 非法转换只记录错误日志, 状态照常推进并写入历史。
    pub fn advance(&mut self, next: BuildState) {
        if !self.current.can_transition_to(&next) {
            log_error!("Illegal build state transition: {} -> {}", self.current, next);
        }
        log_debug!("build state {} -> {}", self.current, next);
        self.current = next;
        self.history.push(next);
    }

    pub fn into_history(self) -> Vec<BuildState> {
        self.history
    }
}

impl Default for BuildStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

/// 一次 `build` 调用的摘要
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildReport {
    /// 输入键数量
    pub input_size: usize,
    /// 主表槽位数
    pub table_size: u32,
    /// 使用过的哈希函数集合数 (含压缩表的两趟构建)
    pub attempts: u32,
    /// 累计驱逐轮数
    pub rounds: u32,
    /// 累计驱逐次数
    pub evictions: u64,
    /// 最终落入暂存区的条目数
    pub stash_count: usize,
    /// 压缩表的唯一键数量
    pub unique_keys: Option<u32>,
    /// 成功构建使用的尝试种子
    pub seed: Option<u64>,
    pub states: Vec<BuildState>,
    pub duration: Duration,
}

impl BuildReport {
    /// 累加一次尝试的计数, 达到上限后饱和
    pub(crate) fn record_attempt(&mut self, rounds: u32, evictions: u64) {
        self.attempts = self.attempts.saturating_add(1);
        self.rounds = self.rounds.saturating_add(rounds);
        self.evictions = self.evictions.saturating_add(evictions);
    }

    pub fn succeeded(&self) -> bool {
        self.states.last() == Some(&BuildState::Success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path_transitions() {
        let mut machine = BuildStateMachine::new();
        machine.advance(BuildState::AssignHashFuncs);
        machine.advance(BuildState::CuckooInsert);
        machine.advance(BuildState::StashFallback);
        machine.advance(BuildState::Restart);
        machine.advance(BuildState::AssignHashFuncs);
        machine.advance(BuildState::CuckooInsert);
        machine.advance(BuildState::Success);
        assert!(machine.current().is_terminal());
        assert_eq!(machine.history().len(), 8);
    }

    #[test]
    fn test_compaction_path_transitions() {
        use BuildState::*;
        let path = [
            Init, AssignHashFuncs, CuckooInsert, Success, Dedup, IdAssign, RebuildWithIds,
            AssignHashFuncs, CuckooInsert, Success,
        ];
        for pair in path.windows(2) {
            assert!(pair[0].can_transition_to(&pair[1]), "{} -> {}", pair[0], pair[1]);
        }
    }

    #[test]
    fn test_illegal_transitions() {
        use BuildState::*;
        assert!(!Init.can_transition_to(&Success));
        assert!(!CuckooInsert.can_transition_to(&AssignHashFuncs));
        assert!(!Fail.can_transition_to(&AssignHashFuncs));
        assert!(!Success.can_transition_to(&AssignHashFuncs));
    }

    #[test]
    fn test_illegal_advance_is_recorded() {
        let mut machine = BuildStateMachine::new();
        machine.advance(BuildState::Success);
        assert_eq!(machine.current(), BuildState::Success);
        assert_eq!(machine.history(), &[BuildState::Init, BuildState::Success]);
    }

    #[test]
    fn test_report_counters_saturate() {
        let mut report = BuildReport::default();
        report.record_attempt(u32::MAX - 1, u64::MAX - 1);
        report.record_attempt(5, 5);
        assert_eq!(report.attempts, 2);
        assert_eq!(report.rounds, u32::MAX);
        assert_eq!(report.evictions, u64::MAX);
    }

    #[test]
    fn test_display_names() {
        assert_eq!(BuildState::AssignHashFuncs.to_string(), "ASSIGN_HASH_FUNCS");
        assert_eq!(BuildState::RebuildWithIds.to_string(), "REBUILD_WITH_IDS");
    }
}
