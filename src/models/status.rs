//! 处理状态与处理结果

use serde::Serialize;
use std::fmt;

/// 单个章节的处理状态
///
/// `Pending → Working → Done | Fail`，`Done` / `Fail` 为终态。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ProcessingStatus {
    Pending,
    Working,
    Done,
    Fail,
}

impl ProcessingStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, ProcessingStatus::Done | ProcessingStatus::Fail)
    }

    /// 是否允许从当前状态转到 `next`
    pub fn can_transition_to(self, next: ProcessingStatus) -> bool {
        use ProcessingStatus::*;
        matches!(
            (self, next),
            (Pending, Working) | (Working, Done) | (Working, Fail)
        )
    }
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ProcessingStatus::Pending => "PENDING",
            ProcessingStatus::Working => "WORKING",
            ProcessingStatus::Done => "DONE",
            ProcessingStatus::Fail => "FAIL",
        };
        f.write_str(label)
    }
}

/// 失败发生的阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Stage {
    Generate,
    Persist,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Generate => f.write_str("GENERATE"),
            Stage::Persist => f.write_str("PERSIST"),
        }
    }
}

/// 单章处理结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ProcessingOutcome {
    Success {
        table_name: String,
        inserted_count: usize,
    },
    Failure {
        stage: Stage,
        message: String,
    },
}

impl ProcessingOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ProcessingOutcome::Success { .. })
    }

    pub fn failure(stage: Stage, message: impl Into<String>) -> Self {
        ProcessingOutcome::Failure {
            stage,
            message: message.into(),
        }
    }

    /// 对应的终态
    pub fn status(&self) -> ProcessingStatus {
        if self.is_success() {
            ProcessingStatus::Done
        } else {
            ProcessingStatus::Fail
        }
    }
}
